//! # Domain Types
//!
//! Core domain types used throughout the exit billing engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference data (read-only)         Raw store shapes (lenient)          │
//! │  ─────────────────────────          ──────────────────────────          │
//! │  Product   Receipt   Clearance      OrderLineRecord  ExitItemRecord     │
//! │  LoadingOrder  LoadingOrderItem     ExitHeader                          │
//! │                                            │                            │
//! │                                            ▼  normalize                 │
//! │  Canonical (what the engine works on)                                   │
//! │  ────────────────────────────────────                                   │
//! │  ExitDocument ──owns──► Vec<ExitLineItem>                               │
//! │       │                                                                 │
//! │       └── totals: Invoice (derived)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Raw vs Canonical
//! Raw records carry `Option` for every value the store may leave empty.
//! The normalizer turns them into canonical items where every number is
//! present (absent → 0) and non-negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invoice::Invoice;
use crate::money::Money;

// =============================================================================
// Enumerations
// =============================================================================

/// What a product's storage and loading rates are charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    /// Rate × declared quantity.
    Quantity,
    /// Rate × scale-measured net weight (kg).
    Weight,
}

impl Default for FeeBasis {
    fn default() -> Self {
        FeeBasis::Quantity
    }
}

impl std::fmt::Display for FeeBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeBasis::Quantity => write!(f, "quantity"),
            FeeBasis::Weight => write!(f, "weight"),
        }
    }
}

/// Mutability state of a persisted exit document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Saved, still editable.
    Draft,
    /// Issued. Write-once.
    Final,
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Draft
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Draft => write!(f, "draft"),
            ExitStatus::Final => write!(f, "final"),
        }
    }
}

impl std::str::FromStr for ExitStatus {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ExitStatus::Draft),
            "final" => Ok(ExitStatus::Final),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["draft".to_string(), "final".to_string()],
            }),
        }
    }
}

/// How the exit invoice is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Charged to the customer's account.
    Credit,
    /// Card terminal.
    Pos,
    /// Cash at the gate.
    Cash,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(PaymentMethod::Credit),
            "pos" | "card" => Ok(PaymentMethod::Pos),
            "cash" => Ok(PaymentMethod::Cash),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["credit".to_string(), "pos".to_string(), "cash".to_string()],
            }),
        }
    }
}

// =============================================================================
// Reference Data
// =============================================================================

/// A stored product with its effective rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub fee_basis: FeeBasis,
    /// Money per unit (or per kg) per billable month.
    pub storage_rate: Money,
    /// Money per unit (or per kg), charged once.
    pub loading_rate: Money,
}

/// Goods received into the warehouse. Starts the storage clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receipt {
    pub id: i64,
    pub product_id: i64,
    pub qty: i64,
    pub received_at: DateTime<Utc>,
}

/// Customs/ownership clearance with the manifested weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Clearance {
    pub id: i64,
    pub cleared_weight_kg: i64,
    pub cleared_at: DateTime<Utc>,
}

/// A request to load cargo onto a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoadingOrder {
    pub id: i64,
    /// Business key typed by the operator.
    pub order_no: String,
    pub driver_name: Option<String>,
    pub driver_national_code: Option<String>,
    pub plate: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// A cargo line on a loading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoadingOrderItem {
    pub id: i64,
    pub loading_order_id: i64,
    pub product_id: i64,
    pub batch_no: String,
    pub qty: i64,
    pub clearance_id: Option<i64>,
}

// =============================================================================
// Raw Store Shapes
// =============================================================================

/// A loading-order item joined with its product and clearance.
///
/// Every value is optional: the joins are LEFT joins and old orders may have
/// incomplete data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLineRecord {
    pub item_id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub batch_no: Option<String>,
    pub qty: Option<i64>,
    pub fee_basis: Option<FeeBasis>,
    pub storage_rate: Option<i64>,
    pub loading_rate: Option<i64>,
    pub cleared_weight_kg: Option<i64>,
    pub cleared_at: Option<DateTime<Utc>>,
}

/// A persisted exit line as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExitItemRecord {
    pub id: i64,
    pub exit_id: i64,
    pub order_item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub batch_no: Option<String>,
    pub qty: Option<i64>,
    pub entry_date: Option<DateTime<Utc>>,
    pub fee_basis: Option<FeeBasis>,
    pub storage_rate: Option<i64>,
    pub loading_rate: Option<i64>,
    pub cleared_weight_kg: Option<i64>,
    pub weight_full_kg: Option<i64>,
    pub weight_empty_kg: Option<i64>,
    pub days_duration: Option<i64>,
    pub months_duration: Option<i64>,
    pub storage_fee: Option<i64>,
    pub loading_fee: Option<i64>,
    pub line_no: i64,
}

/// The persisted exit header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExitHeader {
    pub id: i64,
    pub loading_order_id: Option<i64>,
    pub order_no: Option<String>,
    pub driver_name: String,
    pub driver_national_code: String,
    pub plate: String,
    pub exit_date: DateTime<Utc>,
    pub reference_no: Option<String>,
    pub weighbridge_fee: Money,
    pub extra_fee: Money,
    pub extra_description: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: ExitStatus,
    pub monthly_proration: bool,
    pub issued_by: Option<String>,
    pub total_storage_fee: Money,
    pub total_loading_fee: Money,
    pub vat_fee: Money,
    pub grand_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExitHeader {
    /// The writable part of this header (used to restore it).
    pub fn input(&self) -> ExitHeaderInput {
        ExitHeaderInput {
            loading_order_id: self.loading_order_id,
            order_no: self.order_no.clone(),
            driver_name: self.driver_name.clone(),
            driver_national_code: self.driver_national_code.clone(),
            plate: self.plate.clone(),
            exit_date: self.exit_date,
            reference_no: self.reference_no.clone(),
            weighbridge_fee: self.weighbridge_fee,
            extra_fee: self.extra_fee,
            extra_description: self.extra_description.clone(),
            payment_method: self.payment_method,
            status: self.status,
            monthly_proration: self.monthly_proration,
            issued_by: self.issued_by.clone(),
            total_storage_fee: self.total_storage_fee,
            total_loading_fee: self.total_loading_fee,
            vat_fee: self.vat_fee,
            grand_total: self.grand_total,
        }
    }
}

/// Header values written by an insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitHeaderInput {
    pub loading_order_id: Option<i64>,
    pub order_no: Option<String>,
    pub driver_name: String,
    pub driver_national_code: String,
    pub plate: String,
    pub exit_date: DateTime<Utc>,
    pub reference_no: Option<String>,
    pub weighbridge_fee: Money,
    pub extra_fee: Money,
    pub extra_description: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: ExitStatus,
    pub monthly_proration: bool,
    pub issued_by: Option<String>,
    pub total_storage_fee: Money,
    pub total_loading_fee: Money,
    pub vat_fee: Money,
    pub grand_total: Money,
}

// =============================================================================
// Canonical Line Item
// =============================================================================

/// Where a canonical line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineOrigin {
    /// Derived from a loading-order item (new document).
    OrderItem(i64),
    /// Loaded from a persisted exit item (existing document).
    ExitItem(i64),
}

impl LineOrigin {
    /// The origin identity regardless of kind.
    pub fn id(&self) -> i64 {
        match self {
            LineOrigin::OrderItem(id) | LineOrigin::ExitItem(id) => *id,
        }
    }
}

/// The unit the engine operates on.
///
/// `weight_net_kg`, the durations, fees and variance are derived; call
/// [`crate::fees::recompute_line`] after changing any input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitLineItem {
    pub origin: LineOrigin,
    /// Originating loading-order item, kept across saves.
    pub order_item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub batch_no: String,
    pub qty: i64,
    pub entry_date: DateTime<Utc>,
    pub fee_basis: FeeBasis,
    pub storage_rate: Money,
    pub loading_rate: Money,
    /// Manifested weight; 0 means unknown.
    pub cleared_weight_kg: i64,
    pub weight_full_kg: i64,
    pub weight_empty_kg: i64,

    pub weight_net_kg: i64,
    pub days_duration: i64,
    pub months_duration: i64,
    pub storage_fee: Money,
    pub loading_fee: Money,
    /// Net minus cleared weight. Positive: more left than was manifested.
    pub variance_kg: i64,
}

impl ExitLineItem {
    /// Net weight from the scale readings, never negative.
    #[inline]
    pub fn net_weight_kg(&self) -> i64 {
        (self.weight_full_kg - self.weight_empty_kg).max(0)
    }

    /// True when more weight left than was manifested at clearance.
    ///
    /// Lines with an unknown cleared weight are never flagged.
    pub fn has_weight_excess(&self) -> bool {
        self.cleared_weight_kg > 0 && self.variance_kg > 0
    }
}

// =============================================================================
// Exit Document
// =============================================================================

/// The billable exit header plus its ordered lines.
///
/// `id == None` means the document was derived from a loading order and has
/// never been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitDocument {
    pub id: Option<i64>,
    pub loading_order_id: Option<i64>,
    pub order_no: Option<String>,
    pub driver_name: String,
    pub driver_national_code: String,
    pub plate: String,
    pub exit_date: DateTime<Utc>,
    pub reference_no: Option<String>,
    pub weighbridge_fee: Money,
    pub extra_fee: Money,
    pub extra_description: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: ExitStatus,
    pub monthly_proration: bool,
    pub issued_by: Option<String>,
    pub totals: Invoice,
    pub items: Vec<ExitLineItem>,
}

impl ExitDocument {
    /// True once the document has a store identity.
    #[inline]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// True if the document is final (write-once).
    #[inline]
    pub fn is_final(&self) -> bool {
        self.status == ExitStatus::Final
    }

    /// Lines whose net weight exceeds the manifested weight.
    pub fn flagged_lines(&self) -> Vec<&ExitLineItem> {
        self.items.iter().filter(|i| i.has_weight_excess()).collect()
    }

    /// Header values to write for the given target status.
    pub fn header_input(&self, status: ExitStatus) -> ExitHeaderInput {
        ExitHeaderInput {
            loading_order_id: self.loading_order_id,
            order_no: self.order_no.clone(),
            driver_name: self.driver_name.trim().to_string(),
            driver_national_code: self.driver_national_code.trim().to_string(),
            plate: self.plate.trim().to_string(),
            exit_date: self.exit_date,
            reference_no: self.reference_no.clone(),
            weighbridge_fee: self.weighbridge_fee,
            extra_fee: self.extra_fee,
            extra_description: self.extra_description.clone(),
            payment_method: self.payment_method,
            status,
            monthly_proration: self.monthly_proration,
            issued_by: self.issued_by.clone(),
            total_storage_fee: self.totals.total_storage,
            total_loading_fee: self.totals.total_loading,
            vat_fee: self.totals.vat,
            grand_total: self.totals.grand_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("draft".parse::<ExitStatus>().unwrap(), ExitStatus::Draft);
        assert_eq!(" FINAL ".parse::<ExitStatus>().unwrap(), ExitStatus::Final);
        assert!("issued".parse::<ExitStatus>().is_err());
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("pos".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pos);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pos);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_fee_basis_serializes_snake_case() {
        let json = serde_json::to_string(&FeeBasis::Weight).unwrap();
        assert_eq!(json, "\"weight\"");
    }

    #[test]
    fn test_line_origin_id() {
        assert_eq!(LineOrigin::OrderItem(7).id(), 7);
        assert_eq!(LineOrigin::ExitItem(9).id(), 9);
    }
}
