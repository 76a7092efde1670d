//! # depot-core: Pure Exit Billing Logic
//!
//! This crate is the **heart** of the exit billing engine. It turns raw
//! loading-order and exit records into canonical line items, prorates storage
//! time, computes fees and weight variance, and aggregates an invoice with VAT.
//! Every function here is pure; there is no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    depot-cli / back-office UI                   │   │
//! │  │    Search key ──► Edit weights ──► Review invoice ──► Save      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         depot-billing (ExitResolver, ExitPersister, Saga)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  normalize ─► entry_date ─► proration ─► fees ─► invoice        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, LoadingOrder, ExitDocument, ...)
//! - [`money`] - Integer money and the VAT rate
//! - [`coerce`] - Lenient numeric input handling (absent/malformed → 0)
//! - [`normalize`] - Raw order/exit rows → canonical [`ExitLineItem`]
//! - [`entry_date`] - Ordered fallback chain for the storage-clock start
//! - [`proration`] - Days and 30-day billing months between two dates
//! - [`fees`] - Storage/loading fees and weight variance per line
//! - [`invoice`] - Totals, VAT and grand total
//! - [`document`] - Editing API for an [`ExitDocument`] (refuses final docs)
//! - [`validation`] - Header/business rule validation before saving
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::money::Money;
//! use depot_core::proration::prorate;
//! use chrono::{TimeZone, Utc};
//!
//! let entry = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let exit = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
//!
//! let duration = prorate(entry, exit);
//! assert_eq!(duration.days, 45);
//! assert_eq!(duration.months, 2);
//!
//! let storage = Money::from_units(5).multiply_quantity(800 * duration.months);
//! assert_eq!(storage.units(), 8000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod coerce;
pub mod document;
pub mod entry_date;
pub mod error;
pub mod fees;
pub mod invoice;
pub mod money;
pub mod normalize;
pub mod proration;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use fees::{recompute_line, LineFees};
pub use invoice::{aggregate, AncillaryFees, Invoice};
pub use money::{Money, VatRate};
pub use proration::{prorate, StorageDuration};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// VAT applied to every exit invoice, in basis points (1000 = 10%).
///
/// Fixed for this version; not configurable per document or per tenant.
pub const VAT_RATE_BPS: u32 = 1000;

/// Length of one billable storage month, in days.
pub const DAYS_PER_BILLING_MONTH: i64 = 30;

/// Maximum line items on a single exit document.
pub const MAX_EXIT_LINES: usize = 200;
