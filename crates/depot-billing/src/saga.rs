//! # Saga Runner
//!
//! Runs an ordered list of store writes, each paired with a compensation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Saga::run                                      │
//! │                                                                         │
//! │   step 1 ──ok──► step 2 ──ok──► step 3 ──ok──► Ok(())                   │
//! │                                   │                                     │
//! │                                  err                                    │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │               compensate 2 ──► compensate 1                             │
//! │               (reverse order, completed steps only)                     │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                     Err(SagaFailure { stage: step 3 })                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A step that fails is not compensated by the runner: each step is a single
//! write unit, or cleans up after itself before returning its error.
//! Compensation failures are logged and collected; they never hide the
//! original failure.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use depot_db::{DbError, DbResult};

/// One forward action and its undo.
#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    /// Stable name used in logs and in `PersistenceFailure::stage`.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut C) -> DbResult<()>;

    /// Reverts a successful `execute`.
    async fn compensate(&self, ctx: &mut C) -> DbResult<()>;
}

/// Why a saga stopped.
#[derive(Debug)]
pub struct SagaFailure {
    /// Step that failed.
    pub stage: &'static str,
    pub source: DbError,
    /// Compensations that failed in turn, in the order they ran.
    pub compensation_errors: Vec<(&'static str, DbError)>,
}

impl SagaFailure {
    /// True if every completed step was undone.
    pub fn fully_compensated(&self) -> bool {
        self.compensation_errors.is_empty()
    }
}

pub struct Saga<C: Send> {
    steps: Vec<Box<dyn SagaStep<C>>>,
}

impl<C: Send> Default for Saga<C> {
    fn default() -> Self {
        Saga { steps: Vec::new() }
    }
}

impl<C: Send> Saga<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order; on the first failure, compensates the
    /// completed steps in reverse order.
    pub async fn run(&self, ctx: &mut C) -> Result<(), SagaFailure> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = step.name(), "Saga step");

            if let Err(source) = step.execute(ctx).await {
                warn!(step = step.name(), error = %source, "Saga step failed, compensating");
                let compensation_errors = self.unwind(index, ctx).await;
                return Err(SagaFailure {
                    stage: step.name(),
                    source,
                    compensation_errors,
                });
            }
        }
        Ok(())
    }

    async fn unwind(&self, completed: usize, ctx: &mut C) -> Vec<(&'static str, DbError)> {
        let mut errors = Vec::new();
        for step in self.steps[..completed].iter().rev() {
            match step.compensate(ctx).await {
                Ok(()) => debug!(step = step.name(), "Compensated"),
                Err(e) => {
                    error!(step = step.name(), error = %e, "Compensation failed");
                    errors.push((step.name(), e));
                }
            }
        }
        errors
    }
}
