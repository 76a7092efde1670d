//! # Repository Module
//!
//! Database repository implementations for Depot.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Read-only to billing            Owned by billing                       │
//! │  ─────────────────────           ──────────────────                     │
//! │  ProductRepository               ExitRepository                         │
//! │  ReceiptRepository               ├── headers (exits)                    │
//! │  ClearanceRepository             └── lines   (exit_items)               │
//! │  LoadingOrderRepository                                                 │
//! │                                                                         │
//! │  The insert methods on the read-only side exist for the seed binary     │
//! │  and for tests.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod clearance;
pub mod exit;
pub mod loading_order;
pub mod product;
pub mod receipt;
