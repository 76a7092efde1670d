//! # Invoice Aggregator
//!
//! Sums line fees and ancillary fees, then applies VAT.
//!
//! ```text
//!   total_storage = Σ storage_fee
//!   total_loading = Σ loading_fee
//!   sub_total     = total_storage + total_loading + weighbridge + extra
//!   vat           = sub_total × 10%   (half-up)
//!   grand_total   = sub_total + vat
//! ```
//!
//! The invoice is a derived value. It is recomputed from the lines on every
//! change and only stored when the document is saved.

use serde::{Deserialize, Serialize};

use crate::money::{Money, VatRate};
use crate::types::ExitLineItem;

/// Header-level fees that are not tied to a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncillaryFees {
    pub weighbridge: Money,
    pub extra: Money,
}

/// Aggregated exit invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub total_storage: Money,
    pub total_loading: Money,
    pub weighbridge: Money,
    pub extra: Money,
    pub sub_total: Money,
    pub vat: Money,
    pub grand_total: Money,
}

/// Aggregates line fees and ancillary fees into an invoice.
///
/// Order-independent over `items`.
pub fn aggregate(items: &[ExitLineItem], fees: AncillaryFees) -> Invoice {
    let total_storage: Money = items.iter().map(|i| i.storage_fee).sum();
    let total_loading: Money = items.iter().map(|i| i.loading_fee).sum();
    let weighbridge = fees.weighbridge.non_negative();
    let extra = fees.extra.non_negative();

    let sub_total = total_storage + total_loading + weighbridge + extra;
    let vat = sub_total.calculate_vat(VatRate::standard());

    Invoice {
        total_storage,
        total_loading,
        weighbridge,
        extra,
        sub_total,
        vat,
        grand_total: sub_total + vat,
    }
}
