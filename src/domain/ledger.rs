//! Ledger service: validated CRUD and lifecycle operations over a store.
//!
//! Each operation reads what it needs, applies the entity's state machine in
//! memory and only then writes. Cross-entity side effects (a sale marking its
//! item Sold, a refund marking it Returned, a shipment stamping its sale) are
//! checked before the first write, and a failed second write undoes the
//! first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::error::LedgerError;
use super::event::{
    EventStatus, IntegrationEvent, CONNECTION_TEST, INTEGRATION_DISABLED, INTEGRATION_ENABLED,
};
use super::item::{Item, ItemFilter, ItemId, ItemPatch, ListingStatus, NewItem};
use super::return_case::{NewReturn, Resolution, ReturnCase, ReturnId, ReturnStatus};
use super::sale::{NewSale, PayoutStatus, Sale, SaleFilter, SaleId};
use super::settings::{LedgerSettings, SettingKey};
use super::shipment::{NewShipment, Shipment, ShipmentId, ShipmentStatus};
use super::task::{NewTask, Task, TaskId, TaskStatus};
use crate::ports::candidate_source::CandidateSource;
use crate::ports::ledger_store::LedgerStore;

/// Snapshot of the integration control settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationStatus {
    pub enabled: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_interval_minutes: u32,
}

/// Result of a connection test against the candidate source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub query_id: String,
    pub candidates: usize,
}

pub struct Ledger<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: LedgerStore + ?Sized> Ledger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    // -- items --

    pub fn create_item(&self, mut new: NewItem) -> Result<Item, LedgerError> {
        if new.shipping_cost.is_none() {
            let settings = self.store.settings()?;
            new.shipping_cost = Some(settings.default_shipping_cost);
        }
        let item = Item::draft(new, Utc::now())?;
        self.store.insert_item(&item)?;
        info!(item_id = %item.id, sku = %item.sku, "item created");
        Ok(item)
    }

    pub fn get_item(&self, id: ItemId) -> Result<Item, LedgerError> {
        self.store.get_item(id)
    }

    pub fn list_items(
        &self,
        filter: &ItemFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, LedgerError> {
        self.store.list_items(filter, limit)
    }

    pub fn update_item(&self, id: ItemId, patch: ItemPatch) -> Result<Item, LedgerError> {
        let mut item = self.store.get_item(id)?;
        item.apply_patch(patch, Utc::now())?;
        self.store.update_item(&item)?;
        Ok(item)
    }

    /// Draft or Returned → Listed.
    pub fn list_item(&self, id: ItemId) -> Result<Item, LedgerError> {
        self.transition_item(id, ListingStatus::Listed)
    }

    pub fn archive_item(&self, id: ItemId) -> Result<Item, LedgerError> {
        self.transition_item(id, ListingStatus::Archived)
    }

    fn transition_item(&self, id: ItemId, target: ListingStatus) -> Result<Item, LedgerError> {
        let mut item = self.store.get_item(id)?;
        let from = item.status;
        item.transition_to(target, Utc::now())?;
        self.store.update_item(&item)?;
        info!(item_id = %id, %from, to = %target, "item transitioned");
        Ok(item)
    }

    /// Deletes the item and, through the store, its sales.
    pub fn delete_item(&self, id: ItemId) -> Result<(), LedgerError> {
        self.store.delete_item(id)?;
        info!(item_id = %id, "item deleted");
        Ok(())
    }

    // -- sales --

    /// Record a sale and move its item to Sold.
    pub fn record_sale(&self, new: NewSale) -> Result<Sale, LedgerError> {
        let now = Utc::now();
        let mut item = self.store.get_item(new.item_id)?;
        let sale = Sale::from_request(new, &item, now)?;
        item.mark_sold(sale.sale_price, sale.sold_at, now)?;

        self.store.insert_sale(&sale)?;
        if let Err(e) = self.store.update_item(&item) {
            // Undo the sale so the item and its sales stay consistent.
            if let Err(undo) = self.store.delete_sale(sale.id) {
                warn!(sale_id = %sale.id, error = %undo, "could not undo sale after item update failed");
            }
            return Err(e);
        }
        info!(sale_id = %sale.id, item_id = %item.id, order_id = %sale.order_id, "sale recorded");
        Ok(sale)
    }

    pub fn get_sale(&self, id: SaleId) -> Result<Sale, LedgerError> {
        self.store.get_sale(id)
    }

    pub fn list_sales(
        &self,
        filter: &SaleFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Sale>, LedgerError> {
        self.store.list_sales(filter, limit)
    }

    pub fn update_payout(&self, id: SaleId, status: PayoutStatus) -> Result<Sale, LedgerError> {
        let mut sale = self.store.get_sale(id)?;
        sale.payout_status = status;
        sale.updated_at = Utc::now();
        self.store.update_sale(&sale)?;
        Ok(sale)
    }

    /// Shipments, returns and tasks keep existing with their sale link nulled.
    pub fn delete_sale(&self, id: SaleId) -> Result<(), LedgerError> {
        self.store.delete_sale(id)?;
        info!(sale_id = %id, "sale deleted");
        Ok(())
    }

    // -- shipments --

    pub fn create_shipment(
        &self,
        sale_id: SaleId,
        new: NewShipment,
    ) -> Result<Shipment, LedgerError> {
        let sale = self.store.get_sale(sale_id)?;
        let shipment = Shipment::for_sale(&sale, new, Utc::now());
        self.store.insert_shipment(&shipment)?;
        Ok(shipment)
    }

    pub fn advance_shipment(
        &self,
        id: ShipmentId,
        next: ShipmentStatus,
        tracking_number: Option<String>,
    ) -> Result<Shipment, LedgerError> {
        let now = Utc::now();
        let previous = self.store.get_shipment(id)?;
        let mut shipment = previous.clone();
        shipment.advance(next, tracking_number.clone(), now)?;

        // Leaving the warehouse is recorded on the sale as well, including a
        // skip straight to Delivered.
        let just_shipped = previous.shipped_at.is_none() && shipment.shipped_at.is_some();
        let shipped_sale = match shipment.sale_id {
            Some(sale_id) if just_shipped => {
                let mut sale = self.store.get_sale(sale_id)?;
                sale.shipped_at = shipment.shipped_at;
                if tracking_number.is_some() {
                    sale.tracking_number = tracking_number;
                }
                sale.updated_at = now;
                Some(sale)
            }
            _ => None,
        };

        self.store.update_shipment(&shipment)?;
        if let Some(sale) = shipped_sale {
            if let Err(e) = self.store.update_sale(&sale) {
                if let Err(undo) = self.store.update_shipment(&previous) {
                    warn!(shipment_id = %id, error = %undo, "could not undo shipment after sale update failed");
                }
                return Err(e);
            }
        }
        info!(shipment_id = %id, status = %next, "shipment advanced");
        Ok(shipment)
    }

    pub fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Shipment>, LedgerError> {
        self.store.list_shipments(status, limit)
    }

    // -- returns --

    pub fn open_return(&self, new: NewReturn) -> Result<ReturnCase, LedgerError> {
        let sale = self.store.get_sale(new.sale_id)?;
        let case = ReturnCase::open(&sale, new, Utc::now())?;
        self.store.insert_return(&case)?;
        info!(return_id = %case.id, sale_id = %sale.id, "return opened");
        Ok(case)
    }

    pub fn start_return(&self, id: ReturnId) -> Result<ReturnCase, LedgerError> {
        let mut case = self.store.get_return(id)?;
        case.start(Utc::now())?;
        self.store.update_return(&case)?;
        Ok(case)
    }

    /// Close a case. A refund-bearing outcome moves the sale's item from Sold
    /// to Returned. An item in any other status is left alone; the case still
    /// closes.
    pub fn resolve_return(
        &self,
        id: ReturnId,
        resolution: Resolution,
    ) -> Result<ReturnCase, LedgerError> {
        let now = Utc::now();
        let previous = self.store.get_return(id)?;
        let sale = match previous.sale_id {
            Some(sale_id) => Some(self.store.get_sale(sale_id)?),
            None => None,
        };
        let mut case = previous.clone();
        case.resolve(resolution, sale.as_ref().map(|s| s.sale_price), now)?;

        let returned_item = match (&sale, resolution.outcome.is_refund()) {
            (Some(sale), true) => {
                let mut item = self.store.get_item(sale.item_id)?;
                if item.status == ListingStatus::Sold {
                    item.mark_returned(now)?;
                    Some(item)
                } else {
                    warn!(
                        return_id = %id,
                        item_id = %item.id,
                        status = %item.status,
                        "refund on an item that is not sold, leaving its status"
                    );
                    None
                }
            }
            _ => None,
        };

        self.store.update_return(&case)?;
        if let Some(item) = returned_item {
            if let Err(e) = self.store.update_item(&item) {
                // Reopen the case so it does not claim a refund the item never took.
                if let Err(undo) = self.store.update_return(&previous) {
                    warn!(return_id = %id, error = %undo, "could not undo return after item update failed");
                }
                return Err(e);
            }
            info!(item_id = %item.id, "item returned");
        }
        info!(return_id = %id, status = %case.status, "return resolved");
        Ok(case)
    }

    pub fn list_returns(
        &self,
        status: Option<ReturnStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ReturnCase>, LedgerError> {
        self.store.list_returns(status, limit)
    }

    // -- tasks --

    pub fn create_task(&self, new: NewTask) -> Result<Task, LedgerError> {
        if let Some(item_id) = new.item_id {
            self.store.get_item(item_id)?;
        }
        if let Some(sale_id) = new.sale_id {
            self.store.get_sale(sale_id)?;
        }
        let task = Task::create(new, Utc::now())?;
        self.store.insert_task(&task)?;
        Ok(task)
    }

    pub fn transition_task(&self, id: TaskId, next: TaskStatus) -> Result<Task, LedgerError> {
        let mut task = self.store.get_task(id)?;
        task.transition_to(next, Utc::now())?;
        self.store.update_task(&task)?;
        Ok(task)
    }

    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Task>, LedgerError> {
        self.store.list_tasks(status, limit)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<(), LedgerError> {
        self.store.delete_task(id)
    }

    // -- settings & events --

    pub fn settings(&self) -> Result<LedgerSettings, LedgerError> {
        self.store.settings()
    }

    /// Validate and persist one setting. Returns the stored form.
    pub fn update_setting(&self, key: SettingKey, raw: &str) -> Result<String, LedgerError> {
        let value = key.normalize_value(raw)?;
        self.store.set_setting(key.as_str(), &value)?;
        info!(setting = key.as_str(), %value, "setting updated");
        Ok(value)
    }

    pub fn list_events(&self, limit: Option<usize>) -> Result<Vec<IntegrationEvent>, LedgerError> {
        self.store.list_events(limit)
    }

    // -- integration control --

    pub fn enable_integration(&self) -> Result<(), LedgerError> {
        self.set_integration(true)
    }

    pub fn disable_integration(&self) -> Result<(), LedgerError> {
        self.set_integration(false)
    }

    fn set_integration(&self, enabled: bool) -> Result<(), LedgerError> {
        self.update_setting(SettingKey::IntegrationEnabled, &enabled.to_string())?;
        let (event_type, message) = if enabled {
            (INTEGRATION_ENABLED, "Integration enabled")
        } else {
            (INTEGRATION_DISABLED, "Integration disabled")
        };
        self.store.append_event(&IntegrationEvent::new(
            event_type,
            EventStatus::Success,
            message,
            json!({ "enabled": enabled }),
        ))
    }

    pub fn integration_status(&self) -> Result<IntegrationStatus, LedgerError> {
        let settings = self.store.settings()?;
        Ok(IntegrationStatus {
            enabled: settings.integration_enabled,
            last_sync: settings.last_sync,
            sync_interval_minutes: settings.sync_interval_minutes,
        })
    }

    /// Probe the source with one fetch and record the outcome.
    pub fn test_connection<C: CandidateSource + ?Sized>(
        &self,
        source: &C,
        query_id: &str,
    ) -> Result<ConnectionReport, LedgerError> {
        match source.fetch_candidates(query_id) {
            Ok(candidates) => {
                let (status, message) = if candidates.is_empty() {
                    (EventStatus::Warning, "Connection works but returned no candidates".to_string())
                } else {
                    (
                        EventStatus::Success,
                        format!("Connection works, {} candidates found", candidates.len()),
                    )
                };
                self.store.append_event(&IntegrationEvent::new(
                    CONNECTION_TEST,
                    status,
                    message,
                    json!({ "query_id": query_id, "candidates": candidates.len() }),
                ))?;
                Ok(ConnectionReport {
                    query_id: query_id.to_string(),
                    candidates: candidates.len(),
                })
            }
            Err(e) => {
                self.store.append_event(&IntegrationEvent::new(
                    CONNECTION_TEST,
                    EventStatus::Error,
                    format!("Connection failed: {e}"),
                    json!({ "query_id": query_id, "error": e.to_string() }),
                ))?;
                Err(match e {
                    LedgerError::SourceUnavailable { .. } => e,
                    other => LedgerError::source_unavailable(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_store::SqliteLedgerStore;
    use crate::domain::item::tests::sample_new_item;
    use crate::domain::item::Platform;
    use crate::domain::return_case::ReturnOutcome;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn store() -> SqliteLedgerStore {
        let store = SqliteLedgerStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store
    }

    #[test]
    fn create_item_fills_default_shipping_cost() {
        let store = store();
        let ledger = Ledger::new(&store);
        ledger
            .update_setting(SettingKey::DefaultShippingCost, "3.50")
            .unwrap();

        let item = ledger.create_item(sample_new_item()).unwrap();
        assert_eq!(item.shipping_cost, Some(dec!(3.50)));
        assert_eq!(ledger.get_item(item.id).unwrap(), item);
    }

    #[test]
    fn duplicate_sku_is_conflict() {
        let store = store();
        let ledger = Ledger::new(&store);
        ledger.create_item(sample_new_item()).unwrap();
        let err = ledger.create_item(sample_new_item()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn sale_marks_item_sold() {
        let store = store();
        let ledger = Ledger::new(&store);
        let item = ledger.create_item(sample_new_item()).unwrap();
        ledger.list_item(item.id).unwrap();

        let sale = ledger
            .record_sale(NewSale::new(item.id, "ORD-1", Platform::Vinted, dec!(90.00)))
            .unwrap();
        let item = ledger.get_item(item.id).unwrap();
        assert_eq!(item.status, ListingStatus::Sold);
        assert_eq!(item.sale_price, Some(dec!(90.00)));
        assert_eq!(item.sold_at, Some(sale.sold_at));
    }

    #[test]
    fn second_sale_on_sold_item_writes_nothing() {
        let store = store();
        let ledger = Ledger::new(&store);
        let item = ledger.create_item(sample_new_item()).unwrap();
        ledger
            .record_sale(NewSale::new(item.id, "ORD-1", Platform::Vinted, dec!(90)))
            .unwrap();

        let err = ledger
            .record_sale(NewSale::new(item.id, "ORD-2", Platform::Vinted, dec!(90)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(ledger.list_sales(&SaleFilter::default(), None).unwrap().len(), 1);
    }

    #[test]
    fn rejected_return_leaves_item_sold() {
        let store = store();
        let ledger = Ledger::new(&store);
        let item = ledger.create_item(sample_new_item()).unwrap();
        let sale = ledger
            .record_sale(NewSale::new(item.id, "ORD-1", Platform::Vinted, dec!(90)))
            .unwrap();
        let case = ledger
            .open_return(NewReturn {
                sale_id: sale.id,
                reason: "Changed mind".into(),
                notes: None,
            })
            .unwrap();

        ledger
            .resolve_return(
                case.id,
                Resolution {
                    status: ReturnStatus::Rejected,
                    outcome: ReturnOutcome::Rejected,
                    refund_amount: None,
                },
            )
            .unwrap();
        assert_eq!(ledger.get_item(item.id).unwrap().status, ListingStatus::Sold);
    }

    #[test]
    fn update_setting_rejects_unknown_values() {
        let store = store();
        let ledger = Ledger::new(&store);
        assert!(ledger
            .update_setting(SettingKey::VintedFeePercent, "abc")
            .is_err());
        assert_eq!(ledger.settings().unwrap(), LedgerSettings::default());
    }

    #[test]
    fn integration_toggle_records_events() {
        let store = store();
        let ledger = Ledger::new(&store);
        ledger.enable_integration().unwrap();
        assert!(ledger.integration_status().unwrap().enabled);
        ledger.disable_integration().unwrap();
        assert!(!ledger.integration_status().unwrap().enabled);

        let events = ledger.list_events(None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, INTEGRATION_DISABLED);
        assert_eq!(events[1].event_type, INTEGRATION_ENABLED);
    }

    #[test]
    fn task_links_must_exist() {
        let store = store();
        let ledger = Ledger::new(&store);
        let new = NewTask {
            item_id: Some(ItemId::new()),
            ..NewTask::titled("Relist")
        };
        assert!(matches!(
            ledger.create_task(new),
            Err(LedgerError::NotFound { .. })
        ));
    }

    fn refund(amount: Decimal) -> Resolution {
        Resolution {
            status: ReturnStatus::Resolved,
            outcome: ReturnOutcome::PartialRefund,
            refund_amount: Some(amount),
        }
    }

    fn sold_item(ledger: &Ledger<'_, SqliteLedgerStore>) -> (Item, Sale) {
        let item = ledger.create_item(sample_new_item()).unwrap();
        let sale = ledger
            .record_sale(NewSale::new(item.id, "ORD-1", Platform::Vinted, dec!(90)))
            .unwrap();
        (item, sale)
    }

    fn open_case(ledger: &Ledger<'_, SqliteLedgerStore>, sale: &Sale) -> ReturnCase {
        ledger
            .open_return(NewReturn {
                sale_id: sale.id,
                reason: "Damaged".into(),
                notes: None,
            })
            .unwrap()
    }

    #[test]
    fn refund_on_archived_item_still_closes_case() {
        let store = store();
        let ledger = Ledger::new(&store);
        let (item, sale) = sold_item(&ledger);
        ledger.archive_item(item.id).unwrap();
        let case = open_case(&ledger, &sale);

        let resolved = ledger.resolve_return(case.id, refund(dec!(15))).unwrap();
        assert_eq!(resolved.status, ReturnStatus::Resolved);
        assert_eq!(store.get_return(case.id).unwrap().status, ReturnStatus::Resolved);
        assert_eq!(ledger.get_item(item.id).unwrap().status, ListingStatus::Archived);
    }

    #[test]
    fn second_refund_on_same_sale_resolves() {
        let store = store();
        let ledger = Ledger::new(&store);
        let (item, sale) = sold_item(&ledger);
        let first = open_case(&ledger, &sale);
        let second = open_case(&ledger, &sale);

        ledger.resolve_return(first.id, refund(dec!(10))).unwrap();
        assert_eq!(ledger.get_item(item.id).unwrap().status, ListingStatus::Returned);

        let resolved = ledger.resolve_return(second.id, refund(dec!(5))).unwrap();
        assert_eq!(resolved.refund_amount, Some(dec!(5)));
        assert_eq!(ledger.get_item(item.id).unwrap().status, ListingStatus::Returned);
    }

    #[test]
    fn refund_after_relisting_leaves_listing_alone() {
        let store = store();
        let ledger = Ledger::new(&store);
        let (item, sale) = sold_item(&ledger);
        let first = open_case(&ledger, &sale);
        let late = open_case(&ledger, &sale);
        ledger.resolve_return(first.id, refund(dec!(90))).unwrap();
        ledger.list_item(item.id).unwrap();

        ledger.resolve_return(late.id, refund(dec!(5))).unwrap();
        assert_eq!(ledger.get_item(item.id).unwrap().status, ListingStatus::Listed);
    }

    #[test]
    fn shipping_stamps_the_sale() {
        let store = store();
        let ledger = Ledger::new(&store);
        let (_, sale) = sold_item(&ledger);
        let shipment = ledger.create_shipment(sale.id, NewShipment::default()).unwrap();

        ledger
            .advance_shipment(shipment.id, ShipmentStatus::Packed, None)
            .unwrap();
        assert_eq!(ledger.get_sale(sale.id).unwrap().shipped_at, None);

        let shipped = ledger
            .advance_shipment(shipment.id, ShipmentStatus::Shipped, Some("TRK42".into()))
            .unwrap();
        let stored = ledger.get_sale(sale.id).unwrap();
        assert_eq!(stored.shipped_at, shipped.shipped_at);
        assert_eq!(stored.tracking_number.as_deref(), Some("TRK42"));

        ledger
            .advance_shipment(shipment.id, ShipmentStatus::Delivered, None)
            .unwrap();
        let delivered = ledger.get_sale(sale.id).unwrap();
        assert_eq!(delivered.shipped_at, shipped.shipped_at);
        assert_eq!(delivered.tracking_number.as_deref(), Some("TRK42"));
    }

    #[test]
    fn delivery_without_shipped_step_stamps_the_sale() {
        let store = store();
        let ledger = Ledger::new(&store);
        let (_, sale) = sold_item(&ledger);
        let shipment = ledger.create_shipment(sale.id, NewShipment::default()).unwrap();

        let delivered = ledger
            .advance_shipment(shipment.id, ShipmentStatus::Delivered, None)
            .unwrap();
        let stored = ledger.get_sale(sale.id).unwrap();
        assert!(stored.shipped_at.is_some());
        assert_eq!(stored.shipped_at, delivered.shipped_at);
        assert_eq!(stored.tracking_number, None);
    }
}
