//! # Line Item Normalizer
//!
//! Two raw shapes become one canonical [`ExitLineItem`]:
//!
//! ```text
//! ┌──────────────────────┐                       ┌──────────────────────┐
//! │  OrderLineRecord     │── from_order_item ──► │                      │
//! │  (order item+product │   weights = 0         │    ExitLineItem      │
//! │   +clearance)        │   fees derived later  │    (canonical)       │
//! └──────────────────────┘                       │                      │
//! ┌──────────────────────┐                       │                      │
//! │  ExitItemRecord      │── from_exit_item ───► │                      │
//! │  (persisted line)    │   stored values kept  │                      │
//! └──────────────────────┘                       └──────────────────────┘
//! ```
//!
//! Absent, malformed or negative numbers are read as zero (see
//! [`crate::coerce`]). Text fields default to empty strings.

use chrono::{DateTime, Utc};

use crate::coerce;
use crate::money::Money;
use crate::types::{ExitItemRecord, ExitLineItem, LineOrigin, OrderLineRecord};

/// Builds a fresh line from a loading-order item.
///
/// Quantity comes from the order, scale readings start at 0 and every derived
/// field is zero until the line is recomputed.
pub fn from_order_item(record: &OrderLineRecord, entry_date: DateTime<Utc>) -> ExitLineItem {
    ExitLineItem {
        origin: LineOrigin::OrderItem(record.item_id),
        order_item_id: Some(record.item_id),
        product_id: record.product_id,
        product_name: record.product_name.clone().unwrap_or_default(),
        batch_no: record.batch_no.clone().unwrap_or_default(),
        qty: coerce::non_negative(record.qty),
        entry_date,
        fee_basis: record.fee_basis.unwrap_or_default(),
        storage_rate: coerce::money(record.storage_rate),
        loading_rate: coerce::money(record.loading_rate),
        cleared_weight_kg: coerce::non_negative(record.cleared_weight_kg),
        weight_full_kg: 0,
        weight_empty_kg: 0,
        weight_net_kg: 0,
        days_duration: 0,
        months_duration: 0,
        storage_fee: Money::zero(),
        loading_fee: Money::zero(),
        variance_kg: 0,
    }
}

/// Loads a persisted exit line.
///
/// Stored durations and fees are taken as they are; net weight and variance
/// are re-derived from the stored scale readings. `fallback_entry` is used
/// when the row has no entry date.
pub fn from_exit_item(record: &ExitItemRecord, fallback_entry: DateTime<Utc>) -> ExitLineItem {
    let weight_full_kg = coerce::non_negative(record.weight_full_kg);
    let weight_empty_kg = coerce::non_negative(record.weight_empty_kg);
    let cleared_weight_kg = coerce::non_negative(record.cleared_weight_kg);
    let weight_net_kg = (weight_full_kg - weight_empty_kg).max(0);

    ExitLineItem {
        origin: LineOrigin::ExitItem(record.id),
        order_item_id: record.order_item_id,
        product_id: record.product_id,
        product_name: record.product_name.clone().unwrap_or_default(),
        batch_no: record.batch_no.clone().unwrap_or_default(),
        qty: coerce::non_negative(record.qty),
        entry_date: record.entry_date.unwrap_or(fallback_entry),
        fee_basis: record.fee_basis.unwrap_or_default(),
        storage_rate: coerce::money(record.storage_rate),
        loading_rate: coerce::money(record.loading_rate),
        cleared_weight_kg,
        weight_full_kg,
        weight_empty_kg,
        weight_net_kg,
        days_duration: coerce::non_negative(record.days_duration),
        months_duration: coerce::non_negative(record.months_duration).max(1),
        storage_fee: coerce::money(record.storage_fee),
        loading_fee: coerce::money(record.loading_fee),
        variance_kg: weight_net_kg - cleared_weight_kg,
    }
}
