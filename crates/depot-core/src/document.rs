//! # Exit Document Editing
//!
//! Construction and editing of an [`ExitDocument`].
//!
//! Every mutator checks that the document is still editable, applies the
//! change and re-derives every line and the invoice. Nothing is stored until
//! the document is handed to the persister.
//!
//! ```text
//!   set_weights / set_exit_date / set_*_fee / ...
//!        │
//!        ├── ensure_editable()   final? ──► CoreError::ImmutableDocument
//!        ├── apply change
//!        └── recompute()         lines ──► recompute_line ──► aggregate
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::fees::recompute_line;
use crate::invoice::{aggregate, AncillaryFees, Invoice};
use crate::money::Money;
use crate::types::{ExitDocument, ExitHeader, ExitLineItem, ExitStatus, LoadingOrder, PaymentMethod};

impl ExitDocument {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Derives a new, unsaved document from a loading order.
    ///
    /// The header is prefilled from the order and every line is computed
    /// against `exit_date`.
    pub fn derive(
        order: &LoadingOrder,
        items: Vec<ExitLineItem>,
        exit_date: DateTime<Utc>,
        monthly_proration: bool,
    ) -> Self {
        let mut doc = ExitDocument {
            id: None,
            loading_order_id: Some(order.id),
            order_no: Some(order.order_no.clone()),
            driver_name: order.driver_name.clone().unwrap_or_default(),
            driver_national_code: order.driver_national_code.clone().unwrap_or_default(),
            plate: order.plate.clone().unwrap_or_default(),
            exit_date,
            reference_no: None,
            weighbridge_fee: Money::zero(),
            extra_fee: Money::zero(),
            extra_description: None,
            payment_method: PaymentMethod::default(),
            status: ExitStatus::Draft,
            monthly_proration,
            issued_by: None,
            totals: Invoice::default(),
            items,
        };
        doc.recompute();
        doc
    }

    /// Rebuilds a persisted document from its header and lines as stored.
    ///
    /// Totals are taken from the header; the subtotal is re-added from them.
    pub fn from_persisted(header: &ExitHeader, items: Vec<ExitLineItem>) -> Self {
        let sub_total = header.total_storage_fee
            + header.total_loading_fee
            + header.weighbridge_fee
            + header.extra_fee;

        ExitDocument {
            id: Some(header.id),
            loading_order_id: header.loading_order_id,
            order_no: header.order_no.clone(),
            driver_name: header.driver_name.clone(),
            driver_national_code: header.driver_national_code.clone(),
            plate: header.plate.clone(),
            exit_date: header.exit_date,
            reference_no: header.reference_no.clone(),
            weighbridge_fee: header.weighbridge_fee,
            extra_fee: header.extra_fee,
            extra_description: header.extra_description.clone(),
            payment_method: header.payment_method,
            status: header.status,
            monthly_proration: header.monthly_proration,
            issued_by: header.issued_by.clone(),
            totals: Invoice {
                total_storage: header.total_storage_fee,
                total_loading: header.total_loading_fee,
                weighbridge: header.weighbridge_fee,
                extra: header.extra_fee,
                sub_total,
                vat: header.vat_fee,
                grand_total: header.grand_total,
            },
            items,
        }
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Re-derives every line and the invoice.
    pub fn recompute(&mut self) {
        let exit_date = self.exit_date;
        let proration = self.monthly_proration;
        self.items = self
            .items
            .iter()
            .map(|item| recompute_line(item, exit_date, proration))
            .collect();
        self.totals = aggregate(&self.items, self.ancillary_fees());
    }

    /// Header-level fees as passed to the aggregator.
    pub fn ancillary_fees(&self) -> AncillaryFees {
        AncillaryFees {
            weighbridge: self.weighbridge_fee,
            extra: self.extra_fee,
        }
    }

    /// Fails with `ImmutableDocument` once the document is final.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        if self.is_final() {
            return Err(CoreError::immutable(self.id));
        }
        Ok(())
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Records scale readings for one line.
    pub fn set_weights(&mut self, line: usize, full_kg: i64, empty_kg: i64) -> CoreResult<()> {
        self.ensure_editable()?;
        let item = self.items.get_mut(line).ok_or(CoreError::LineNotFound(line))?;
        item.weight_full_kg = full_kg.max(0);
        item.weight_empty_kg = empty_kg.max(0);
        self.recompute();
        Ok(())
    }

    /// Changes the exit date; durations and storage fees follow.
    pub fn set_exit_date(&mut self, exit_date: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_editable()?;
        self.exit_date = exit_date;
        self.recompute();
        Ok(())
    }

    /// Turns monthly proration of storage fees on or off.
    pub fn set_monthly_proration(&mut self, enabled: bool) -> CoreResult<()> {
        self.ensure_editable()?;
        self.monthly_proration = enabled;
        self.recompute();
        Ok(())
    }

    pub fn set_weighbridge_fee(&mut self, fee: Money) -> CoreResult<()> {
        self.ensure_editable()?;
        self.weighbridge_fee = fee.non_negative();
        self.recompute();
        Ok(())
    }

    /// Sets the extra fee and its description. A blank description is cleared.
    pub fn set_extra_fee(&mut self, fee: Money, description: Option<String>) -> CoreResult<()> {
        self.ensure_editable()?;
        self.extra_fee = fee.non_negative();
        self.extra_description = crate::coerce::optional_text(description.as_deref());
        self.recompute();
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_editable()?;
        self.payment_method = method;
        Ok(())
    }

    pub fn set_driver(&mut self, name: &str, national_code: &str) -> CoreResult<()> {
        self.ensure_editable()?;
        self.driver_name = name.trim().to_string();
        self.driver_national_code = national_code.trim().to_string();
        Ok(())
    }

    pub fn set_plate(&mut self, plate: &str) -> CoreResult<()> {
        self.ensure_editable()?;
        self.plate = plate.trim().to_string();
        Ok(())
    }

    /// Current invoice.
    #[inline]
    pub fn invoice(&self) -> &Invoice {
        &self.totals
    }
}
