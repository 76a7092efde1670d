//! # depot-db: Database Layer for Depot
//!
//! SQLite storage for reference data (products, receipts, clearances, loading
//! orders) and for the exits the billing engine writes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  depot-billing (ExitStore impl for Database)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depot-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐  ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories    │  │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ ProductRepo      │  │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ ReceiptRepo      │  │ 001_initial  │  │   │
//! │  │   │               │    │ ClearanceRepo    │  │              │  │   │
//! │  │   │               │    │ LoadingOrderRepo │  │              │  │   │
//! │  │   │               │    │ ExitRepo         │  │              │  │   │
//! │  │   └───────────────┘    └──────────────────┘  └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (path from DepotConfig)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("depot.db")).await?;
//! let order = db.loading_orders().find_by_order_no("LO-1001").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::clearance::{ClearanceRepository, NewClearance};
pub use repository::exit::ExitRepository;
pub use repository::loading_order::{LoadingOrderRepository, NewLoadingOrder, NewLoadingOrderItem};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::receipt::{NewReceipt, ReceiptRepository};
