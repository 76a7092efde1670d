//! # Fee Calculator
//!
//! Per-line storage fee, loading fee and weight variance.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  net       = max(weight_full - weight_empty, 0)                         │
//! │  base      = qty             (fee basis: quantity)                      │
//! │            = net             (fee basis: weight)                        │
//! │  time      = months          (monthly proration on)                     │
//! │            = 1               (monthly proration off)                    │
//! │                                                                         │
//! │  storage   = base × storage_rate × time                                 │
//! │  loading   = base × loading_rate          (one-time service)            │
//! │  variance  = net - cleared_weight         (signed, never corrected)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There are no error states. Inputs are non-negative by the time they reach
//! a canonical line (see [`crate::normalize`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::proration::prorate;
use crate::types::{ExitLineItem, FeeBasis};

/// Result of the fee calculation for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFees {
    pub storage_fee: Money,
    pub loading_fee: Money,
    pub net_weight_kg: i64,
    pub variance_kg: i64,
}

/// Computes fees for `item` given its billable months.
///
/// ## Example
/// ```rust
/// # use depot_core::fees::compute;
/// # use depot_core::types::{ExitLineItem, FeeBasis, LineOrigin};
/// # use depot_core::money::Money;
/// # use chrono::Utc;
/// let item = ExitLineItem {
///     origin: LineOrigin::OrderItem(1),
///     order_item_id: Some(1),
///     product_id: Some(1),
///     product_name: "Cement".into(),
///     batch_no: "B-1".into(),
///     qty: 10,
///     entry_date: Utc::now(),
///     fee_basis: FeeBasis::Weight,
///     storage_rate: Money::from_units(5),
///     loading_rate: Money::from_units(2),
///     cleared_weight_kg: 750,
///     weight_full_kg: 1000,
///     weight_empty_kg: 200,
///     weight_net_kg: 0,
///     days_duration: 0,
///     months_duration: 0,
///     storage_fee: Money::zero(),
///     loading_fee: Money::zero(),
///     variance_kg: 0,
/// };
/// let fees = compute(&item, 1, true);
/// assert_eq!(fees.storage_fee.units(), 4000);
/// assert_eq!(fees.loading_fee.units(), 1600);
/// assert_eq!(fees.variance_kg, 50);
/// ```
pub fn compute(item: &ExitLineItem, months: i64, proration_enabled: bool) -> LineFees {
    let net_weight_kg = item.net_weight_kg();
    let base = match item.fee_basis {
        FeeBasis::Quantity => item.qty.max(0),
        FeeBasis::Weight => net_weight_kg,
    };
    let time_multiplier = if proration_enabled { months.max(1) } else { 1 };

    let storage_fee = item
        .storage_rate
        .non_negative()
        .multiply_quantity(base)
        .multiply_quantity(time_multiplier);
    let loading_fee = item.loading_rate.non_negative().multiply_quantity(base);

    LineFees {
        storage_fee,
        loading_fee,
        net_weight_kg,
        variance_kg: net_weight_kg - item.cleared_weight_kg.max(0),
    }
}

/// Re-derives every computed field of a line against an exit date.
///
/// Pure and idempotent: the derived fields of the input are ignored, so
/// calling it twice yields the same line.
pub fn recompute_line(
    item: &ExitLineItem,
    exit_date: DateTime<Utc>,
    proration_enabled: bool,
) -> ExitLineItem {
    let duration = prorate(item.entry_date, exit_date);
    let fees = compute(item, duration.months, proration_enabled);

    ExitLineItem {
        weight_net_kg: fees.net_weight_kg,
        days_duration: duration.days,
        months_duration: duration.months,
        storage_fee: fees.storage_fee,
        loading_fee: fees.loading_fee,
        variance_kg: fees.variance_kg,
        ..item.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::LineOrigin;
    use chrono::{Duration, TimeZone};

    pub(crate) fn exit_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()
    }

    /// A cement line billed by weight: 1000/200 kg, rates 5 and 2, cleared 750 kg.
    pub(crate) fn weight_line(entry_days_before_exit: i64) -> ExitLineItem {
        ExitLineItem {
            origin: LineOrigin::OrderItem(1),
            order_item_id: Some(1),
            product_id: Some(1),
            product_name: "Cement".to_string(),
            batch_no: "B-100".to_string(),
            qty: 10,
            entry_date: exit_date() - Duration::days(entry_days_before_exit),
            fee_basis: FeeBasis::Weight,
            storage_rate: Money::from_units(5),
            loading_rate: Money::from_units(2),
            cleared_weight_kg: 750,
            weight_full_kg: 1000,
            weight_empty_kg: 200,
            weight_net_kg: 0,
            days_duration: 0,
            months_duration: 0,
            storage_fee: Money::zero(),
            loading_fee: Money::zero(),
            variance_kg: 0,
        }
    }

    #[test]
    fn test_weight_basis_ten_days() {
        let line = recompute_line(&weight_line(10), exit_date(), true);
        assert_eq!(line.weight_net_kg, 800);
        assert_eq!(line.days_duration, 10);
        assert_eq!(line.months_duration, 1);
        assert_eq!(line.storage_fee.units(), 4000);
        assert_eq!(line.loading_fee.units(), 1600);
        assert_eq!(line.variance_kg, 50);
        assert!(line.has_weight_excess());
    }

    #[test]
    fn test_weight_basis_forty_five_days() {
        let line = recompute_line(&weight_line(45), exit_date(), true);
        assert_eq!(line.months_duration, 2);
        assert_eq!(line.storage_fee.units(), 8000);
        // Loading is never time-multiplied
        assert_eq!(line.loading_fee.units(), 1600);
    }

    #[test]
    fn test_quantity_basis_ignores_weights() {
        let mut item = weight_line(5);
        item.fee_basis = FeeBasis::Quantity;
        item.qty = 10;
        item.storage_rate = Money::from_units(100);
        item.loading_rate = Money::zero();

        let line = recompute_line(&item, exit_date(), true);
        assert_eq!(line.months_duration, 1);
        assert_eq!(line.storage_fee.units(), 1000);

        item.weight_full_kg = 99_999;
        let line = recompute_line(&item, exit_date(), true);
        assert_eq!(line.storage_fee.units(), 1000);
    }

    #[test]
    fn test_proration_disabled_charges_one_month() {
        let line = recompute_line(&weight_line(75), exit_date(), false);
        assert_eq!(line.months_duration, 3);
        assert_eq!(line.storage_fee.units(), 4000);
    }

    #[test]
    fn test_inconsistent_scale_readings_clamp_net() {
        let mut item = weight_line(10);
        item.weight_full_kg = 200;
        item.weight_empty_kg = 1000;

        let line = recompute_line(&item, exit_date(), true);
        assert_eq!(line.weight_net_kg, 0);
        assert_eq!(line.storage_fee, Money::zero());
        assert_eq!(line.variance_kg, -750);
        assert!(!line.has_weight_excess());
    }

    #[test]
    fn test_unknown_cleared_weight_is_not_flagged() {
        let mut item = weight_line(10);
        item.cleared_weight_kg = 0;
        let line = recompute_line(&item, exit_date(), true);
        assert_eq!(line.variance_kg, 800);
        assert!(!line.has_weight_excess());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let once = recompute_line(&weight_line(45), exit_date(), true);
        let twice = recompute_line(&once, exit_date(), true);
        assert_eq!(once, twice);
    }
}
