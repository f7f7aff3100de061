//! Fulfilment records for sales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::item::Platform;
use super::sale::{Sale, SaleId};

entity_id!(
    /// Shipment identifier.
    ShipmentId
);

labelled_enum! {
    /// Forward-only except for the escape to Failed. Delivered and Failed are terminal.
    pub enum ShipmentStatus {
        Pending => "Pending",
        Packed => "Packed",
        Shipped => "Shipped",
        Delivered => "Delivered",
        Failed => "Failed",
    }
}

impl ShipmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Packed => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Failed => u8::MAX,
        }
    }

    pub fn can_advance_to(self, next: ShipmentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewShipment {
    pub buyer_address: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub sale_id: Option<SaleId>,
    pub item_name: String,
    pub platform: Platform,
    pub buyer_name: Option<String>,
    pub buyer_address: Option<String>,
    pub status: ShipmentStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// A pending shipment snapshotting the sale's item name, platform and buyer.
    pub fn for_sale(sale: &Sale, new: NewShipment, now: DateTime<Utc>) -> Self {
        Self {
            id: ShipmentId::new(),
            sale_id: Some(sale.id),
            item_name: sale.item_name.clone(),
            platform: sale.platform,
            buyer_name: sale.buyer_name.clone(),
            buyer_address: new.buyer_address,
            status: ShipmentStatus::Pending,
            tracking_number: new.tracking_number.or_else(|| sale.tracking_number.clone()),
            carrier: new.carrier,
            shipped_at: None,
            delivered_at: None,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn advance(
        &mut self,
        next: ShipmentStatus,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if !self.status.can_advance_to(next) {
            return Err(LedgerError::invalid_transition("shipment", self.status, next));
        }
        if tracking_number.is_some() {
            self.tracking_number = tracking_number;
        }
        match next {
            ShipmentStatus::Shipped => self.shipped_at = Some(now),
            ShipmentStatus::Delivered => {
                self.shipped_at.get_or_insert(now);
                self.delivered_at = Some(now);
            }
            _ => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
