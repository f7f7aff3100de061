#![allow(dead_code)]

use resale_ledger::adapters::sqlite_store::SqliteLedgerStore;
use resale_ledger::domain::candidate::Candidate;
use resale_ledger::domain::error::LedgerError;
use resale_ledger::domain::event::IntegrationEvent;
use resale_ledger::domain::item::{Item, ItemFilter, ItemId};
use resale_ledger::domain::return_case::{ReturnCase, ReturnId, ReturnStatus};
use resale_ledger::domain::sale::{Sale, SaleFilter, SaleId};
use resale_ledger::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
use resale_ledger::domain::task::{Task, TaskId, TaskStatus};
use resale_ledger::ports::candidate_source::CandidateSource;
use resale_ledger::ports::ledger_store::LedgerStore;
use rust_decimal::Decimal;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

pub struct MockCandidateSource {
    pub candidates: HashMap<String, Vec<Candidate>>,
    pub errors: HashMap<String, String>,
    pub rejected: HashSet<String>,
    pub fetches: Cell<usize>,
}

impl MockCandidateSource {
    pub fn new() -> Self {
        Self {
            candidates: HashMap::new(),
            errors: HashMap::new(),
            rejected: HashSet::new(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_candidates(mut self, query_id: &str, candidates: Vec<Candidate>) -> Self {
        self.candidates.insert(query_id.to_string(), candidates);
        self
    }

    pub fn with_error(mut self, query_id: &str, reason: &str) -> Self {
        self.errors.insert(query_id.to_string(), reason.to_string());
        self
    }

    /// Make the source refuse `query_id` as malformed.
    pub fn rejecting(mut self, query_id: &str) -> Self {
        self.rejected.insert(query_id.to_string());
        self
    }
}

impl CandidateSource for MockCandidateSource {
    fn fetch_candidates(&self, query_id: &str) -> Result<Vec<Candidate>, LedgerError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = self.errors.get(query_id) {
            return Err(LedgerError::source_unavailable(reason.clone()));
        }
        if self.rejected.contains(query_id) {
            return Err(LedgerError::validation(format!("invalid query id `{query_id}`")));
        }
        Ok(self.candidates.get(query_id).cloned().unwrap_or_default())
    }
}

pub fn make_candidate(source_id: &str, brand: Option<&str>, title: &str, price: Decimal) -> Candidate {
    Candidate {
        source_id: source_id.to_string(),
        title: title.to_string(),
        brand: brand.map(String::from),
        price: Some(price),
        url: Some(format!("https://www.vinted.co.uk/items/{source_id}")),
        ..Candidate::default()
    }
}

pub fn memory_store() -> SqliteLedgerStore {
    let store = SqliteLedgerStore::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store
}

/// In-memory store with the integration switched on.
pub fn enabled_store() -> SqliteLedgerStore {
    let store = memory_store();
    store
        .set_setting("vinted_integration_enabled", "true")
        .unwrap();
    store
}

/// Store wrapper that injects write failures.
///
/// `failing_skus` make `insert_item` fail with a query error. `hidden_skus`
/// are invisible to `find_item_by_sku`, which reproduces a concurrent pass
/// storing the same key between lookup and insert. The `failing_*_updates`
/// flags make every `update_item` or `update_sale` fail.
pub struct FlakyStore {
    pub inner: SqliteLedgerStore,
    pub failing_skus: HashSet<String>,
    pub hidden_skus: HashSet<String>,
    pub failing_item_updates: bool,
    pub failing_sale_updates: bool,
}

impl FlakyStore {
    pub fn new(inner: SqliteLedgerStore) -> Self {
        Self {
            inner,
            failing_skus: HashSet::new(),
            hidden_skus: HashSet::new(),
            failing_item_updates: false,
            failing_sale_updates: false,
        }
    }

    pub fn failing_insert(mut self, sku: &str) -> Self {
        self.failing_skus.insert(sku.to_string());
        self
    }

    pub fn hiding(mut self, sku: &str) -> Self {
        self.hidden_skus.insert(sku.to_string());
        self
    }

    pub fn failing_item_update(mut self) -> Self {
        self.failing_item_updates = true;
        self
    }

    pub fn failing_sale_update(mut self) -> Self {
        self.failing_sale_updates = true;
        self
    }
}

impl LedgerStore for FlakyStore {
    fn get_item(&self, id: ItemId) -> Result<Item, LedgerError> {
        self.inner.get_item(id)
    }

    fn find_item_by_sku(&self, sku: &str) -> Result<Option<Item>, LedgerError> {
        if self.hidden_skus.contains(sku) {
            return Ok(None);
        }
        self.inner.find_item_by_sku(sku)
    }

    fn list_items(&self, filter: &ItemFilter, limit: Option<usize>) -> Result<Vec<Item>, LedgerError> {
        self.inner.list_items(filter, limit)
    }

    fn insert_item(&self, item: &Item) -> Result<(), LedgerError> {
        if self.failing_skus.contains(&item.sku) {
            return Err(LedgerError::DatabaseQuery {
                reason: format!("disk I/O error writing {}", item.sku),
            });
        }
        self.inner.insert_item(item)
    }

    fn update_item(&self, item: &Item) -> Result<(), LedgerError> {
        if self.failing_item_updates {
            return Err(LedgerError::DatabaseQuery {
                reason: format!("disk I/O error updating item {}", item.sku),
            });
        }
        self.inner.update_item(item)
    }

    fn delete_item(&self, id: ItemId) -> Result<(), LedgerError> {
        self.inner.delete_item(id)
    }

    fn get_sale(&self, id: SaleId) -> Result<Sale, LedgerError> {
        self.inner.get_sale(id)
    }

    fn list_sales(&self, filter: &SaleFilter, limit: Option<usize>) -> Result<Vec<Sale>, LedgerError> {
        self.inner.list_sales(filter, limit)
    }

    fn insert_sale(&self, sale: &Sale) -> Result<(), LedgerError> {
        self.inner.insert_sale(sale)
    }

    fn update_sale(&self, sale: &Sale) -> Result<(), LedgerError> {
        if self.failing_sale_updates {
            return Err(LedgerError::DatabaseQuery {
                reason: format!("disk I/O error updating sale {}", sale.order_id),
            });
        }
        self.inner.update_sale(sale)
    }

    fn delete_sale(&self, id: SaleId) -> Result<(), LedgerError> {
        self.inner.delete_sale(id)
    }

    fn get_shipment(&self, id: ShipmentId) -> Result<Shipment, LedgerError> {
        self.inner.get_shipment(id)
    }

    fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Shipment>, LedgerError> {
        self.inner.list_shipments(status, limit)
    }

    fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError> {
        self.inner.insert_shipment(shipment)
    }

    fn update_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError> {
        self.inner.update_shipment(shipment)
    }

    fn get_return(&self, id: ReturnId) -> Result<ReturnCase, LedgerError> {
        self.inner.get_return(id)
    }

    fn list_returns(
        &self,
        status: Option<ReturnStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ReturnCase>, LedgerError> {
        self.inner.list_returns(status, limit)
    }

    fn insert_return(&self, case: &ReturnCase) -> Result<(), LedgerError> {
        self.inner.insert_return(case)
    }

    fn update_return(&self, case: &ReturnCase) -> Result<(), LedgerError> {
        self.inner.update_return(case)
    }

    fn get_task(&self, id: TaskId) -> Result<Task, LedgerError> {
        self.inner.get_task(id)
    }

    fn list_tasks(&self, status: Option<TaskStatus>, limit: Option<usize>) -> Result<Vec<Task>, LedgerError> {
        self.inner.list_tasks(status, limit)
    }

    fn insert_task(&self, task: &Task) -> Result<(), LedgerError> {
        self.inner.insert_task(task)
    }

    fn update_task(&self, task: &Task) -> Result<(), LedgerError> {
        self.inner.update_task(task)
    }

    fn delete_task(&self, id: TaskId) -> Result<(), LedgerError> {
        self.inner.delete_task(id)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, LedgerError> {
        self.inner.get_setting(key)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        self.inner.set_setting(key, value)
    }

    fn list_settings(&self) -> Result<Vec<(String, String)>, LedgerError> {
        self.inner.list_settings()
    }

    fn append_event(&self, event: &IntegrationEvent) -> Result<(), LedgerError> {
        self.inner.append_event(event)
    }

    fn list_events(&self, limit: Option<usize>) -> Result<Vec<IntegrationEvent>, LedgerError> {
        self.inner.list_events(limit)
    }
}
