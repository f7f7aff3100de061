//! Inventory items and their listing lifecycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounting::{compute_item_profit, compute_item_roi};
use super::error::LedgerError;

entity_id!(
    /// Item identifier.
    ItemId
);

labelled_enum! {
    pub enum Condition {
        New => "New",
        LikeNew => "Like New",
        Good => "Good",
        Fair => "Fair",
        Poor => "Poor",
    }
}

labelled_enum! {
    /// Listing status. Draft is initial and never re-entered.
    pub enum ListingStatus {
        Draft => "Draft",
        Listed => "Listed",
        Sold => "Sold",
        Returned => "Returned",
        Archived => "Archived",
    }
}

labelled_enum! {
    pub enum ShippingPayer {
        Buyer => "Buyer",
        Seller => "Seller",
        Split => "Split",
    }
}

labelled_enum! {
    pub enum Platform {
        Vinted => "Vinted",
        Ebay => "eBay",
        Depop => "Depop",
        Other => "Other",
    }
}

/// Where an imported item came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub item_id: String,
    pub query_id: String,
}

/// Fields supplied when creating an item, manually or by import.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Option<Condition>,
    pub brand: Option<String>,
    pub platforms: BTreeSet<Platform>,
    pub purchase_price: Option<Decimal>,
    pub fees_estimate: Option<Decimal>,
    pub shipping_payer: Option<ShippingPayer>,
    pub shipping_cost: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub listed_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub source: Option<SourceRef>,
}

/// Partial update. `None` leaves a field untouched; the SKU cannot be patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Option<Condition>,
    pub brand: Option<String>,
    pub platforms: Option<BTreeSet<Platform>>,
    pub purchase_price: Option<Decimal>,
    pub fees_estimate: Option<Decimal>,
    pub shipping_payer: Option<ShippingPayer>,
    pub shipping_cost: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub photos: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn touches_prices(&self) -> bool {
        self.purchase_price.is_some()
            || self.fees_estimate.is_some()
            || self.shipping_payer.is_some()
            || self.shipping_cost.is_some()
            || self.sale_price.is_some()
    }
}

/// Item query filter. Brand matches as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemFilter {
    pub status: Option<ListingStatus>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if let Some(category) = &self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            let needle = brand.to_lowercase();
            match &item.brand {
                Some(b) if b.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// A unit of inventory.
///
/// Profit and ROI are not stored: [`Item::profit`] and [`Item::roi_percent`]
/// recompute them from the priced fields on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Condition,
    pub brand: Option<String>,
    pub platforms: BTreeSet<Platform>,
    pub status: ListingStatus,
    pub purchase_price: Option<Decimal>,
    pub fees_estimate: Option<Decimal>,
    pub shipping_payer: ShippingPayer,
    pub shipping_cost: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub listed_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub source: Option<SourceRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn ensure_non_negative(field: &str, value: Option<Decimal>) -> Result<(), LedgerError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(LedgerError::validation(format!(
            "{field} must be non-negative, got {v}"
        ))),
        _ => Ok(()),
    }
}

impl NewItem {
    pub fn validate(&self) -> Result<(), LedgerError> {
        let sku = self.sku.trim();
        if sku.is_empty() {
            return Err(LedgerError::validation("sku cannot be empty"));
        }
        if sku.chars().any(char::is_whitespace) {
            return Err(LedgerError::validation(format!(
                "sku `{sku}` must not contain whitespace"
            )));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("item name cannot be empty"));
        }
        ensure_non_negative("purchase_price", self.purchase_price)?;
        ensure_non_negative("fees_estimate", self.fees_estimate)?;
        ensure_non_negative("shipping_cost", self.shipping_cost)?;
        ensure_non_negative("sale_price", self.sale_price)?;
        Ok(())
    }
}

impl Item {
    /// Admit a new item in Draft status.
    pub fn draft(new: NewItem, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        new.validate()?;
        Ok(Self {
            id: ItemId::new(),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            category: non_empty(new.category),
            size: non_empty(new.size),
            condition: new.condition.unwrap_or(Condition::Good),
            brand: non_empty(new.brand),
            platforms: new.platforms,
            status: ListingStatus::Draft,
            purchase_price: new.purchase_price,
            fees_estimate: new.fees_estimate,
            shipping_payer: new.shipping_payer.unwrap_or(ShippingPayer::Buyer),
            shipping_cost: new.shipping_cost,
            sale_price: new.sale_price,
            purchased_at: new.purchased_at,
            listed_at: new.listed_at,
            sold_at: None,
            location: non_empty(new.location),
            notes: non_empty(new.notes),
            photos: new.photos,
            source: new.source,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn profit(&self) -> Decimal {
        compute_item_profit(self)
    }

    pub fn roi_percent(&self) -> Decimal {
        compute_item_roi(self)
    }

    pub fn apply_patch(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(LedgerError::validation("item name cannot be empty"));
            }
        }
        ensure_non_negative("purchase_price", patch.purchase_price)?;
        ensure_non_negative("fees_estimate", patch.fees_estimate)?;
        ensure_non_negative("shipping_cost", patch.shipping_cost)?;
        ensure_non_negative("sale_price", patch.sale_price)?;

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if patch.category.is_some() {
            self.category = non_empty(patch.category);
        }
        if patch.size.is_some() {
            self.size = non_empty(patch.size);
        }
        if let Some(condition) = patch.condition {
            self.condition = condition;
        }
        if patch.brand.is_some() {
            self.brand = non_empty(patch.brand);
        }
        if let Some(platforms) = patch.platforms {
            self.platforms = platforms;
        }
        if patch.purchase_price.is_some() {
            self.purchase_price = patch.purchase_price;
        }
        if patch.fees_estimate.is_some() {
            self.fees_estimate = patch.fees_estimate;
        }
        if let Some(payer) = patch.shipping_payer {
            self.shipping_payer = payer;
        }
        if patch.shipping_cost.is_some() {
            self.shipping_cost = patch.shipping_cost;
        }
        if patch.sale_price.is_some() {
            self.sale_price = patch.sale_price;
        }
        if patch.purchased_at.is_some() {
            self.purchased_at = patch.purchased_at;
        }
        if patch.location.is_some() {
            self.location = non_empty(patch.location);
        }
        if patch.notes.is_some() {
            self.notes = non_empty(patch.notes);
        }
        if let Some(photos) = patch.photos {
            self.photos = photos;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Direct user transition. Only Listed and Archived can be requested;
    /// Sold and Returned are side effects of sales and returns.
    pub fn transition_to(
        &mut self,
        target: ListingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        use ListingStatus::*;

        let allowed = match (self.status, target) {
            (Draft | Returned, Listed) => true,
            (from, Archived) => from != Archived,
            _ => false,
        };
        if !allowed {
            return Err(LedgerError::invalid_transition("item", self.status, target));
        }
        if target == Listed {
            self.listed_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Side effect of recording a sale against this item.
    pub(crate) fn mark_sold(
        &mut self,
        sale_price: Decimal,
        sold_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if !matches!(self.status, ListingStatus::Draft | ListingStatus::Listed) {
            return Err(LedgerError::invalid_transition(
                "item",
                self.status,
                ListingStatus::Sold,
            ));
        }
        self.status = ListingStatus::Sold;
        self.sale_price = Some(sale_price);
        self.sold_at = Some(sold_at);
        self.updated_at = now;
        Ok(())
    }

    /// Side effect of a return case resolved with a refund.
    pub(crate) fn mark_returned(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != ListingStatus::Sold {
            return Err(LedgerError::invalid_transition(
                "item",
                self.status,
                ListingStatus::Returned,
            ));
        }
        self.status = ListingStatus::Returned;
        self.updated_at = now;
        Ok(())
    }
}
