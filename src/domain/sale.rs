//! Sales recorded against items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounting::compute_sale_net_profit;
use super::error::LedgerError;
use super::item::{ensure_non_negative, Item, ItemId, Platform, ShippingPayer};

entity_id!(
    /// Sale identifier.
    SaleId
);

labelled_enum! {
    pub enum PayoutStatus {
        Pending => "Pending",
        Processing => "Processing",
        Paid => "Paid",
        Failed => "Failed",
    }
}

/// Request to record a sale. Unset fees and shipping fall back to the item's
/// estimates; unset `buyer_paid_shipping` follows the item's shipping payer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    pub item_id: ItemId,
    pub order_id: String,
    pub platform: Platform,
    pub sale_price: Decimal,
    pub fees: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub buyer_paid_shipping: Option<bool>,
    pub sold_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub notes: Option<String>,
}

impl NewSale {
    pub fn new(item_id: ItemId, order_id: impl Into<String>, platform: Platform, sale_price: Decimal) -> Self {
        Self {
            item_id,
            order_id: order_id.into(),
            platform,
            sale_price,
            fees: None,
            shipping_cost: None,
            buyer_paid_shipping: None,
            sold_at: None,
            tracking_number: None,
            buyer_name: None,
            buyer_email: None,
            notes: None,
        }
    }
}

/// Sale query filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaleFilter {
    pub platform: Option<Platform>,
    pub payout_status: Option<PayoutStatus>,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        self.platform.is_none_or(|p| p == sale.platform)
            && self.payout_status.is_none_or(|s| s == sale.payout_status)
    }
}

/// A completed transaction for one item. Net profit is derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub order_id: String,
    pub platform: Platform,
    pub item_id: ItemId,
    pub item_name: String,
    pub sale_price: Decimal,
    pub fees: Decimal,
    pub shipping_cost: Decimal,
    pub buyer_paid_shipping: bool,
    pub sold_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub payout_status: PayoutStatus,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn from_request(new: NewSale, item: &Item, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if new.order_id.trim().is_empty() {
            return Err(LedgerError::validation("order id cannot be empty"));
        }
        ensure_non_negative("sale_price", Some(new.sale_price))?;
        ensure_non_negative("fees", new.fees)?;
        ensure_non_negative("shipping_cost", new.shipping_cost)?;

        Ok(Self {
            id: SaleId::new(),
            order_id: new.order_id.trim().to_string(),
            platform: new.platform,
            item_id: item.id,
            item_name: item.name.clone(),
            sale_price: new.sale_price,
            fees: new.fees.or(item.fees_estimate).unwrap_or_default(),
            shipping_cost: new.shipping_cost.or(item.shipping_cost).unwrap_or_default(),
            buyer_paid_shipping: new
                .buyer_paid_shipping
                .unwrap_or(item.shipping_payer != ShippingPayer::Seller),
            sold_at: new.sold_at.unwrap_or(now),
            shipped_at: None,
            tracking_number: new.tracking_number,
            payout_status: PayoutStatus::Pending,
            buyer_name: new.buyer_name,
            buyer_email: new.buyer_email,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn net_profit(&self) -> Decimal {
        compute_sale_net_profit(self)
    }
}
