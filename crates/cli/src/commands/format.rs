//! Terminal rendering.

use storefront_cart_core::{Cart, Price};

/// Format a price the way Indonesian storefronts show rupiah.
///
/// Thousands are grouped with `.`, cents follow a `,` and are only shown when
/// non-zero: `Rp 10.000`, `Rp 2.500,5`.
pub fn rupiah(price: Price) -> String {
    let amount = price.amount().round_dp(2).normalize().to_string();
    let (units, cents) = amount.split_once('.').unwrap_or((&amount, ""));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if cents.is_empty() {
        format!("Rp {grouped}")
    } else {
        format!("Rp {grouped},{cents}")
    }
}

/// Render a cart as a plain-text table.
pub fn cart_table(cart: &Cart) -> String {
    if cart.is_empty() {
        return format!("Cart for {} is empty.\n", cart.owner_id());
    }

    let mut out = format!("Cart for {}\n", cart.owner_id());
    for line in cart.lines() {
        out.push_str(&format!(
            "  {:<12} {:<28} {:>4} x {:>14} = {:>16}\n",
            line.product_id.as_str(),
            line.display_name,
            line.quantity.get(),
            rupiah(line.unit_price),
            line.line_total().map_or_else(|| "-".to_string(), rupiah),
        ));
    }
    out.push_str(&format!(
        "  {} item(s), total {}\n",
        cart.item_count(),
        rupiah(cart.total())
    ));
    out
}
