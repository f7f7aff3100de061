//! Persistence port for ledger entities, settings and integration events.

use crate::domain::error::LedgerError;
use crate::domain::event::IntegrationEvent;
use crate::domain::item::{Item, ItemFilter, ItemId};
use crate::domain::return_case::{ReturnCase, ReturnId, ReturnStatus};
use crate::domain::sale::{Sale, SaleFilter, SaleId};
use crate::domain::settings::LedgerSettings;
use crate::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
use crate::domain::task::{Task, TaskId, TaskStatus};

/// Durable storage with the referential rules the ledger relies on:
///
/// - `sku` is unique; a duplicate insert returns [`LedgerError::Conflict`].
/// - deleting an item deletes its sales.
/// - deleting a sale nulls `sale_id` on its shipments, returns and tasks.
/// - deleting an item nulls `item_id` on its tasks.
///
/// Every call is atomic on its own. `get_*` returns [`LedgerError::NotFound`]
/// for a missing id; list methods return newest first and treat `None` as no
/// limit.
pub trait LedgerStore {
    fn get_item(&self, id: ItemId) -> Result<Item, LedgerError>;
    fn find_item_by_sku(&self, sku: &str) -> Result<Option<Item>, LedgerError>;
    fn list_items(&self, filter: &ItemFilter, limit: Option<usize>)
        -> Result<Vec<Item>, LedgerError>;
    fn insert_item(&self, item: &Item) -> Result<(), LedgerError>;
    fn update_item(&self, item: &Item) -> Result<(), LedgerError>;
    fn delete_item(&self, id: ItemId) -> Result<(), LedgerError>;

    fn get_sale(&self, id: SaleId) -> Result<Sale, LedgerError>;
    fn list_sales(&self, filter: &SaleFilter, limit: Option<usize>)
        -> Result<Vec<Sale>, LedgerError>;
    fn insert_sale(&self, sale: &Sale) -> Result<(), LedgerError>;
    fn update_sale(&self, sale: &Sale) -> Result<(), LedgerError>;
    fn delete_sale(&self, id: SaleId) -> Result<(), LedgerError>;

    fn get_shipment(&self, id: ShipmentId) -> Result<Shipment, LedgerError>;
    fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Shipment>, LedgerError>;
    fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError>;
    fn update_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError>;

    fn get_return(&self, id: ReturnId) -> Result<ReturnCase, LedgerError>;
    fn list_returns(
        &self,
        status: Option<ReturnStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ReturnCase>, LedgerError>;
    fn insert_return(&self, case: &ReturnCase) -> Result<(), LedgerError>;
    fn update_return(&self, case: &ReturnCase) -> Result<(), LedgerError>;

    fn get_task(&self, id: TaskId) -> Result<Task, LedgerError>;
    fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Task>, LedgerError>;
    fn insert_task(&self, task: &Task) -> Result<(), LedgerError>;
    fn update_task(&self, task: &Task) -> Result<(), LedgerError>;
    fn delete_task(&self, id: TaskId) -> Result<(), LedgerError>;

    fn get_setting(&self, key: &str) -> Result<Option<String>, LedgerError>;
    fn set_setting(&self, key: &str, value: &str) -> Result<(), LedgerError>;
    fn list_settings(&self) -> Result<Vec<(String, String)>, LedgerError>;

    fn append_event(&self, event: &IntegrationEvent) -> Result<(), LedgerError>;
    fn list_events(&self, limit: Option<usize>) -> Result<Vec<IntegrationEvent>, LedgerError>;

    /// Typed snapshot of all settings, defaults filled in.
    fn settings(&self) -> Result<LedgerSettings, LedgerError> {
        LedgerSettings::from_lookup(|key| self.get_setting(key))
    }
}
