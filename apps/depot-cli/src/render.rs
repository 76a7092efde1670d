//! Plain-text rendering of an exit document.

use depot_billing::{Resolution, ResolveState};
use depot_core::ExitDocument;

fn state_label(state: ResolveState) -> &'static str {
    match state {
        ResolveState::NewFromOrder => "new (not saved)",
        ResolveState::ExistingDraft => "draft",
        ResolveState::ExistingFinal => "final (read-only)",
    }
}

pub fn print_resolution(resolution: &Resolution) {
    let doc = &resolution.document;
    println!(
        "Exit {}  [{}]",
        doc.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        state_label(resolution.state)
    );
    print_document(doc);
}

pub fn print_document(doc: &ExitDocument) {
    println!("  Loading order : {}", doc.order_no.as_deref().unwrap_or("-"));
    println!("  Reference     : {}", doc.reference_no.as_deref().unwrap_or("-"));
    println!("  Exit date     : {}", doc.exit_date.format("%Y-%m-%d %H:%M UTC"));
    println!(
        "  Driver        : {} ({})  plate {}",
        doc.driver_name, doc.driver_national_code, doc.plate
    );
    println!(
        "  Payment       : {:?}  proration {}",
        doc.payment_method,
        if doc.monthly_proration { "monthly" } else { "off" }
    );
    println!();
    println!(
        "  {:>3}  {:<24} {:<10} {:>6} {:>8} {:>8} {:>8} {:>5} {:>12} {:>12} {:>8}",
        "#", "Product", "Batch", "Qty", "Full", "Empty", "Net", "Mon", "Storage", "Loading", "Var"
    );
    for (n, item) in doc.items.iter().enumerate() {
        println!(
            "  {:>3}  {:<24} {:<10} {:>6} {:>8} {:>8} {:>8} {:>5} {:>12} {:>12} {:>8}{}",
            n + 1,
            truncate(&item.product_name, 24),
            truncate(&item.batch_no, 10),
            item.qty,
            item.weight_full_kg,
            item.weight_empty_kg,
            item.weight_net_kg,
            item.months_duration,
            item.storage_fee,
            item.loading_fee,
            item.variance_kg,
            if item.has_weight_excess() { "  !" } else { "" }
        );
    }

    let totals = doc.invoice();
    println!();
    println!("  Storage       : {:>14}", totals.total_storage);
    println!("  Loading       : {:>14}", totals.total_loading);
    println!("  Weighbridge   : {:>14}", totals.weighbridge);
    println!(
        "  Extra         : {:>14}  {}",
        totals.extra,
        doc.extra_description.as_deref().unwrap_or("")
    );
    println!("  Subtotal      : {:>14}", totals.sub_total);
    println!("  VAT           : {:>14}", totals.vat);
    println!("  Grand total   : {:>14}", totals.grand_total);

    let flagged = doc.flagged_lines().len();
    if flagged > 0 {
        println!();
        println!("  ! {} line(s) left heavier than cleared", flagged);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(std::iter::once('…')).collect()
    }
}
