//! Profit and ROI rules.
//!
//! Pure functions over priced entities. Absent amounts count as zero and
//! rounding to two decimal places happens once, on the final figure.

use rust_decimal::{Decimal, RoundingStrategy};

use super::item::{Item, ShippingPayer};
use super::sale::Sale;

/// Decimal places carried by money and percent values.
pub const MONEY_SCALE: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn raw_item_profit(item: &Item) -> Decimal {
    let sale = item.sale_price.unwrap_or_default();
    let purchase = item.purchase_price.unwrap_or_default();
    let fees = item.fees_estimate.unwrap_or_default();
    let shipping = match item.shipping_payer {
        ShippingPayer::Seller => item.shipping_cost.unwrap_or_default(),
        ShippingPayer::Buyer | ShippingPayer::Split => Decimal::ZERO,
    };
    sale - purchase - fees - shipping
}

/// sale price − purchase price − fees − (shipping cost when the seller pays).
pub fn compute_item_profit(item: &Item) -> Decimal {
    round_money(raw_item_profit(item))
}

/// Profit as a percentage of purchase price; zero without a positive price.
pub fn compute_item_roi(item: &Item) -> Decimal {
    match item.purchase_price {
        Some(purchase) if purchase > Decimal::ZERO => {
            round_money(raw_item_profit(item) / purchase * Decimal::ONE_HUNDRED)
        }
        _ => Decimal::ZERO,
    }
}

/// sale price − fees − (shipping cost unless the buyer paid it).
pub fn compute_sale_net_profit(sale: &Sale) -> Decimal {
    let shipping = if sale.buyer_paid_shipping {
        Decimal::ZERO
    } else {
        sale.shipping_cost
    };
    round_money(sale.sale_price - sale.fees - shipping)
}

/// `amount × percent / 100`, rounded.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / Decimal::ONE_HUNDRED)
}
