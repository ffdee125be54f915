//! # Receipt Document
//!
//! Turns a persisted sale into the printable tax invoice.
//!
//! ## Receipt Layout (80mm thermal)
//! ```text
//! ┌──────────────────────────────────────────┐
//! │      JOKAMA AUTO SERVICES & SPARES       │  shop identity
//! │        Industrial Area, Naivasha         │
//! │          Tel: +254 700 000 000           │
//! │ ---------------------------------------- │
//! │          TAX INVOICE #SAL-42             │
//! │      Date: 01/03/2026, 12:30:00          │
//! │ ---------------------------------------- │
//! │ ITEM                               TOTAL │
//! │ OIL FILTER                               │
//! │ 3 x 800 (Was 1,000)                2,400 │  "Was" only when discounted
//! │ Item Discount: - KES 600                 │
//! │ ---------------------------------------- │
//! │ Subtotal:                       2,068.97 │
//! │ VAT (16%):                        331.03 │
//! │ Total Discount:               - KES 600  │  only when > 0
//! │ TOTAL:                         KES 2,400 │
//! │ Paid via:                         M-Pesa │
//! │        YOU SAVED KES 600!                │  only when > 0
//! │ ---------------------------------------- │
//! │     THANK YOU FOR SHOPPING WITH US!      │  footer
//! └──────────────────────────────────────────┘
//! ```
//!
//! Every figure comes from the backend's copy of the sale. Nothing is read
//! from the cart, which has already been cleared by the time a receipt
//! prints.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, CURRENCY_CODE};
use crate::pricing::VAT_RATE_PERCENT;
use crate::types::{Receipt, SaleId, SaleStatus};

/// Characters per line on an 80mm roll with the default font.
pub const TEXT_WIDTH: usize = 42;

/// `dd/mm/YYYY, HH:MM:SS`, the en-KE short date-time.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

// =============================================================================
// Shop Identity
// =============================================================================

/// Header and footer printed on every receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopIdentity {
    pub name: String,
    pub address: String,
    pub phone: String,
    /// Printed centered, one entry per line.
    pub footer: Vec<String>,
}

impl Default for ShopIdentity {
    fn default() -> Self {
        ShopIdentity {
            name: "JOKAMA Auto Services & SPARES".to_string(),
            address: "Industrial Area, Naivasha".to_string(),
            phone: "Tel: +254 700 000 000".to_string(),
            footer: vec![
                "THANK YOU FOR SHOPPING WITH US!".to_string(),
                "Goods once sold are not returnable.".to_string(),
                "Systems by Digital Technologies Kenya".to_string(),
            ],
        }
    }
}

// =============================================================================
// Document Model
// =============================================================================

/// One printed item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    /// Set only when the item sold below its original price.
    pub was_price: Option<Money>,
    /// Zero when `was_price` is `None`.
    pub item_discount: Money,
}

/// The invoice as it will be printed, independent of output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptDocument {
    pub sale_id: SaleId,
    pub shop: ShopIdentity,
    /// `SAL-<id>`
    pub invoice_number: String,
    /// Already formatted in the shop's local time.
    pub issued_at: String,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
    /// Sum of item discounts; the savings callout is printed when positive.
    pub total_discount: Money,
    pub payment_method: String,
    pub voided: bool,
}

/// A document rendered to both output formats, ready for a print surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RenderedReceipt {
    pub sale_id: SaleId,
    pub invoice_number: String,
    pub html: String,
    pub text: String,
}

impl ReceiptDocument {
    /// Builds the printable document from a fetched receipt.
    ///
    /// ## Errors
    /// `CoreError::Render` when the sale has no items or an item carries a
    /// non-positive quantity; such a sale cannot be printed meaningfully.
    pub fn build(receipt: &Receipt, shop: &ShopIdentity, utc_offset: FixedOffset) -> CoreResult<Self> {
        let header = &receipt.header;
        if receipt.items.is_empty() {
            return Err(CoreError::Render(format!(
                "{} has no items",
                header.id.invoice_number()
            )));
        }

        let mut lines = Vec::with_capacity(receipt.items.len());
        for item in &receipt.items {
            if item.quantity <= 0 {
                return Err(CoreError::Render(format!(
                    "{} has quantity {} for {}",
                    header.id.invoice_number(),
                    item.quantity,
                    item.part_name
                )));
            }

            let original = item.original_or_unit_price();
            let discounted = original > item.unit_price;
            lines.push(ReceiptLine {
                name: item.part_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(),
                was_price: discounted.then_some(original),
                item_discount: if discounted {
                    (original - item.unit_price).multiply_quantity(item.quantity)
                } else {
                    Money::zero()
                },
            });
        }

        let total_discount = lines.iter().map(|line| line.item_discount).sum();

        Ok(ReceiptDocument {
            sale_id: header.id,
            shop: shop.clone(),
            invoice_number: header.id.invoice_number(),
            issued_at: format_timestamp(header.created_at, utc_offset),
            lines,
            subtotal: header.subtotal,
            vat_amount: header.vat_amount,
            total_amount: header.total_amount,
            total_discount,
            payment_method: header.payment_method.clone(),
            voided: header.status == SaleStatus::Voided,
        })
    }

    pub fn has_savings(&self) -> bool {
        self.total_discount.is_positive()
    }

    /// Renders both formats.
    pub fn render(&self) -> RenderedReceipt {
        RenderedReceipt {
            sale_id: self.sale_id,
            invoice_number: self.invoice_number.clone(),
            html: self.render_html(),
            text: self.render_text(),
        }
    }

    /// Self-contained HTML page sized for a 72mm printable width.
    pub fn render_html(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(HTML_HEAD);

        out.push_str("<div class=\"center\">\n");
        let _ = writeln!(out, "<h1 class=\"brand-name\">{}</h1>", escape_html(&self.shop.name));
        let _ = writeln!(out, "<p class=\"bold\">{}</p>", escape_html(&self.shop.address));
        let _ = writeln!(out, "<p>{}</p>", escape_html(&self.shop.phone));
        out.push_str("<div class=\"divider\"></div>\n");
        let _ = writeln!(out, "<p class=\"invoice\">TAX INVOICE #{}</p>", self.invoice_number);
        if self.voided {
            out.push_str("<p class=\"invoice\">*** VOIDED ***</p>\n");
        }
        let _ = writeln!(out, "<p class=\"small\">Date: {}</p>", self.issued_at);
        out.push_str("</div>\n<div class=\"divider\"></div>\n");

        out.push_str("<table>\n<thead><tr><th class=\"left\">ITEM</th><th class=\"right\">TOTAL</th></tr></thead>\n<tbody>\n");
        for line in &self.lines {
            let was = line
                .was_price
                .map(|was| format!("<span class=\"was\"> (Was {})</span>", was.display_grouped()))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "<tr><td class=\"item\"><div class=\"item-name\">{}</div><div class=\"small\">{} x {}{}</div></td><td class=\"right bold\">{}</td></tr>",
                escape_html(&line.name.to_uppercase()),
                line.quantity,
                line.unit_price.display_grouped(),
                was,
                line.line_total.display_grouped(),
            );
            if line.was_price.is_some() {
                let _ = writeln!(
                    out,
                    "<tr><td colspan=\"2\" class=\"item-discount\">Item Discount: - {} {}</td></tr>",
                    CURRENCY_CODE,
                    line.item_discount.display_grouped(),
                );
            }
        }
        out.push_str("</tbody>\n</table>\n<div class=\"divider\"></div>\n");

        html_row(&mut out, "", "Subtotal:", &self.subtotal.display_fixed());
        html_row(&mut out, "", &vat_label(), &self.vat_amount.display_fixed());
        if self.has_savings() {
            html_row(
                &mut out,
                " bold",
                "Total Discount:",
                &format!("- {} {}", CURRENCY_CODE, self.total_discount.display_grouped()),
            );
        }
        html_row(
            &mut out,
            " total-line",
            "TOTAL:",
            &format!("{} {}", CURRENCY_CODE, self.total_amount.display_grouped()),
        );
        html_row(&mut out, " small", "Paid via:", &escape_html(&self.payment_method));
        if self.has_savings() {
            let _ = writeln!(
                out,
                "<div class=\"savings-box\">{}</div>",
                savings_callout(self.total_discount)
            );
        }

        out.push_str("<div class=\"divider\"></div>\n<div class=\"center footer-note\">\n");
        for (i, note) in self.shop.footer.iter().enumerate() {
            let class = if i == 0 { "bold" } else { "" };
            let _ = writeln!(out, "<p class=\"{}\">{}</p>", class, escape_html(note));
        }
        out.push_str("</div>\n</body>\n</html>\n");
        out
    }

    /// Plain-text rendition for line printers and logs.
    pub fn render_text(&self) -> String {
        let divider = "-".repeat(TEXT_WIDTH);
        let mut out = String::with_capacity(1024);

        push_centered(&mut out, &self.shop.name.to_uppercase());
        push_centered(&mut out, &self.shop.address);
        push_centered(&mut out, &self.shop.phone);
        out.push_str(&divider);
        out.push('\n');
        push_centered(&mut out, &format!("TAX INVOICE #{}", self.invoice_number));
        if self.voided {
            push_centered(&mut out, "*** VOIDED ***");
        }
        push_centered(&mut out, &format!("Date: {}", self.issued_at));
        out.push_str(&divider);
        out.push('\n');

        push_columns(&mut out, "ITEM", "TOTAL");
        for line in &self.lines {
            out.push_str(&line.name.to_uppercase());
            out.push('\n');
            let mut detail = format!("{} x {}", line.quantity, line.unit_price.display_grouped());
            if let Some(was) = line.was_price {
                let _ = write!(detail, " (Was {})", was.display_grouped());
            }
            push_columns(&mut out, &detail, &line.line_total.display_grouped());
            if line.was_price.is_some() {
                let _ = writeln!(
                    out,
                    "Item Discount: - {} {}",
                    CURRENCY_CODE,
                    line.item_discount.display_grouped()
                );
            }
        }
        out.push_str(&divider);
        out.push('\n');

        push_columns(&mut out, "Subtotal:", &self.subtotal.display_fixed());
        push_columns(&mut out, &vat_label(), &self.vat_amount.display_fixed());
        if self.has_savings() {
            push_columns(
                &mut out,
                "Total Discount:",
                &format!("- {} {}", CURRENCY_CODE, self.total_discount.display_grouped()),
            );
        }
        push_columns(
            &mut out,
            "TOTAL:",
            &format!("{} {}", CURRENCY_CODE, self.total_amount.display_grouped()),
        );
        push_columns(&mut out, "Paid via:", &self.payment_method);
        if self.has_savings() {
            push_centered(&mut out, &savings_callout(self.total_discount));
        }

        out.push_str(&divider);
        out.push('\n');
        for note in &self.shop.footer {
            push_centered(&mut out, note);
        }
        out
    }
}

/// Formats a sale timestamp in the shop's local time.
///
/// ```rust
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use jokama_core::receipt::format_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
/// let nairobi = FixedOffset::east_opt(3 * 3600).unwrap();
/// assert_eq!(format_timestamp(at, nairobi), "01/03/2026, 12:30:00");
/// ```
pub fn format_timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

/// Offset from minutes east of UTC; out-of-range values fall back to UTC.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

// =============================================================================
// Rendering Helpers
// =============================================================================

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
@page { margin: 0; }
body { font-family: 'Courier New', Courier, monospace; width: 72mm; margin: 0 auto; padding: 10px; font-size: 12px; color: #000; line-height: 1.4; }
p { margin: 2px 0; }
.center { text-align: center; }
.left { text-align: left; font-size: 10px; border-bottom: 1px solid #000; }
.right { text-align: right; }
.bold { font-weight: bold; }
.small { font-size: 11px; }
.divider { border-top: 1.5px dashed #000; margin: 8px 0; }
table { width: 100%; border-collapse: collapse; }
th.right { font-size: 10px; border-bottom: 1px solid #000; }
.item { padding: 6px 0; vertical-align: top; }
.item-name { font-weight: bold; font-size: 13px; }
.was { color: #666; font-style: italic; }
.item-discount { font-size: 10px; font-weight: bold; padding-bottom: 8px; border-bottom: 0.5px solid #eee; }
.brand-name { font-size: 18px; font-weight: 900; margin: 0; text-transform: uppercase; }
.invoice { font-weight: bold; font-size: 14px; margin: 5px 0; }
.row { display: flex; justify-content: space-between; margin: 2px 0; }
.total-line { font-size: 18px; font-weight: 900; margin-top: 5px; padding-top: 5px; border-top: 1px solid #000; }
.savings-box { border: 1px solid #000; padding: 5px; margin: 10px 0; text-align: center; font-weight: 900; }
.footer-note { font-size: 10px; margin-top: 20px; line-height: 1.2; }
</style>
</head>
<body>
"#;

fn html_row(out: &mut String, extra_class: &str, label: &str, value: &str) {
    let _ = writeln!(
        out,
        "<div class=\"row{}\"><span>{}</span><span>{}</span></div>",
        extra_class, label, value
    );
}

fn vat_label() -> String {
    format!("VAT ({}%):", VAT_RATE_PERCENT)
}

fn savings_callout(discount: Money) -> String {
    format!("YOU SAVED {} {}!", CURRENCY_CODE, discount.display_grouped())
}

fn push_centered(out: &mut String, text: &str) {
    let len = text.chars().count();
    let pad = TEXT_WIDTH.saturating_sub(len) / 2;
    let _ = writeln!(out, "{}{}", " ".repeat(pad), text);
}

/// Left text and right-aligned value on one line; wraps the value onto its
/// own line when both do not fit.
fn push_columns(out: &mut String, left: &str, right: &str) {
    let used = left.chars().count() + right.chars().count();
    if used < TEXT_WIDTH {
        let _ = writeln!(out, "{}{}{}", left, " ".repeat(TEXT_WIDTH - used), right);
    } else {
        let _ = writeln!(out, "{}", left);
        let _ = writeln!(out, "{:>width$}", right, width = TEXT_WIDTH);
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SaleHeader, SaleItem};
    use chrono::TimeZone;

    fn nairobi() -> FixedOffset {
        offset_from_minutes(180)
    }

    fn item(name: &str, qty: i64, unit: i64, original: Option<i64>) -> SaleItem {
        SaleItem {
            part_name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_major(unit),
            original_price: original.map(Money::from_major),
        }
    }

    fn receipt(items: Vec<SaleItem>) -> Receipt {
        let total: Money = items.iter().map(SaleItem::line_total).sum();
        let (subtotal, vat) = crate::pricing::split_vat(total);
        Receipt {
            header: SaleHeader {
                id: SaleId(42),
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
                subtotal: subtotal.rounded(),
                vat_amount: vat.rounded(),
                total_amount: total,
                payment_method: "M-Pesa".to_string(),
                status: SaleStatus::Completed,
            },
            items,
        }
    }

    #[test]
    fn test_discounted_line_shows_was_and_savings() {
        let doc = ReceiptDocument::build(
            &receipt(vec![item("Oil Filter", 3, 800, Some(1000))]),
            &ShopIdentity::default(),
            nairobi(),
        )
        .unwrap();

        assert_eq!(doc.invoice_number, "SAL-42");
        assert_eq!(doc.issued_at, "01/03/2026, 12:30:00");
        assert_eq!(doc.lines[0].was_price, Some(Money::from_major(1000)));
        assert_eq!(doc.lines[0].item_discount, Money::from_major(600));
        assert_eq!(doc.total_discount, Money::from_major(600));

        let html = doc.render_html();
        assert!(html.contains("3 x 800"));
        assert!(html.contains("(Was 1,000)"));
        assert!(html.contains("Item Discount: - KES 600"));
        assert!(html.contains("Total Discount:"));
        assert!(html.contains("YOU SAVED KES 600!"));
        assert!(html.contains("TAX INVOICE #SAL-42"));

        let text = doc.render_text();
        assert!(text.contains("3 x 800 (Was 1,000)"));
        assert!(text.contains("YOU SAVED KES 600!"));
        assert!(text.contains("TOTAL:"));
        assert!(text.contains("KES 2,400"));
    }

    #[test]
    fn test_equal_price_line_has_no_annotation() {
        let doc = ReceiptDocument::build(
            &receipt(vec![item("Spark Plug", 2, 250, Some(250))]),
            &ShopIdentity::default(),
            nairobi(),
        )
        .unwrap();

        assert_eq!(doc.lines[0].was_price, None);
        assert!(!doc.has_savings());

        let html = doc.render_html();
        assert!(!html.contains("Was"));
        assert!(!html.contains("Item Discount"));
        assert!(!html.contains("YOU SAVED"));
        assert!(!html.contains("Total Discount"));
    }

    #[test]
    fn test_missing_original_price_means_no_discount() {
        let doc = ReceiptDocument::build(
            &receipt(vec![item("Wiper Blade", 1, 900, None)]),
            &ShopIdentity::default(),
            nairobi(),
        )
        .unwrap();
        assert_eq!(doc.lines[0].was_price, None);
        assert_eq!(doc.total_discount, Money::zero());
    }

    #[test]
    fn test_marked_up_line_does_not_reduce_savings() {
        let doc = ReceiptDocument::build(
            &receipt(vec![
                item("Oil Filter", 3, 800, Some(1000)),
                item("Fan Belt", 1, 1500, Some(1200)),
            ]),
            &ShopIdentity::default(),
            nairobi(),
        )
        .unwrap();

        assert_eq!(doc.lines[1].was_price, None);
        assert_eq!(doc.total_discount, Money::from_major(600));
    }

    #[test]
    fn test_totals_come_from_header() {
        let doc = ReceiptDocument::build(
            &receipt(vec![item("Oil Filter", 3, 800, Some(1000))]),
            &ShopIdentity::default(),
            nairobi(),
        )
        .unwrap();

        let text = doc.render_text();
        assert!(text.contains("2,068.97"));
        assert!(text.contains("331.03"));
        assert!(text.contains("VAT (16%):"));
        assert!(text.contains("M-Pesa"));
    }

    #[test]
    fn test_empty_sale_cannot_render() {
        let err = ReceiptDocument::build(&receipt(vec![]), &ShopIdentity::default(), nairobi())
            .unwrap_err();
        assert!(matches!(err, CoreError::Render(_)));
    }

    #[test]
    fn test_shop_identity_and_footer_are_escaped() {
        let shop = ShopIdentity::default();
        let doc = ReceiptDocument::build(
            &receipt(vec![item("<Bolt>", 1, 10, None)]),
            &shop,
            nairobi(),
        )
        .unwrap();

        let html = doc.render_html();
        assert!(html.contains("JOKAMA Auto Services &amp; SPARES"));
        assert!(html.contains("&lt;BOLT&gt;"));
        assert!(html.contains("THANK YOU FOR SHOPPING WITH US!"));
        assert!(html.contains("Systems by Digital Technologies Kenya"));
    }

    #[test]
    fn test_voided_sale_is_marked() {
        let mut r = receipt(vec![item("Oil Filter", 1, 800, None)]);
        r.header.status = SaleStatus::Voided;
        let doc = ReceiptDocument::build(&r, &ShopIdentity::default(), nairobi()).unwrap();

        assert!(doc.render_text().contains("*** VOIDED ***"));
    }

    #[test]
    fn test_offset_from_minutes_falls_back_to_utc() {
        assert_eq!(offset_from_minutes(180).local_minus_utc(), 3 * 3600);
        assert_eq!(offset_from_minutes(i32::MAX).local_minus_utc(), 0);
        assert_eq!(offset_from_minutes(100_000).local_minus_utc(), 0);
    }
}
