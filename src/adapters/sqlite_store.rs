//! SQLite ledger store.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::domain::config_validation::AppConfig;
use crate::domain::error::LedgerError;
use crate::domain::event::IntegrationEvent;
use crate::domain::item::{Item, ItemFilter, ItemId, Platform, SourceRef};
use crate::domain::return_case::{ReturnCase, ReturnId, ReturnStatus};
use crate::domain::sale::{Sale, SaleFilter, SaleId};
use crate::domain::shipment::{Shipment, ShipmentId, ShipmentStatus};
use crate::domain::task::{Task, TaskId, TaskStatus};
use crate::ports::ledger_store::LedgerStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    sku TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT,
    size TEXT,
    condition TEXT NOT NULL,
    brand TEXT,
    platforms TEXT NOT NULL,
    status TEXT NOT NULL,
    purchase_price TEXT,
    fees_estimate TEXT,
    shipping_payer TEXT NOT NULL,
    shipping_cost TEXT,
    sale_price TEXT,
    purchased_at TEXT,
    listed_at TEXT,
    sold_at TEXT,
    location TEXT,
    notes TEXT,
    photos TEXT NOT NULL,
    source_item_id TEXT,
    source_query_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_items_status ON items(status);

CREATE TABLE IF NOT EXISTS sales (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    item_name TEXT NOT NULL,
    sale_price TEXT NOT NULL,
    fees TEXT NOT NULL,
    shipping_cost TEXT NOT NULL,
    buyer_paid_shipping INTEGER NOT NULL,
    sold_at TEXT NOT NULL,
    shipped_at TEXT,
    tracking_number TEXT,
    payout_status TEXT NOT NULL,
    buyer_name TEXT,
    buyer_email TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sales_item ON sales(item_id);

CREATE TABLE IF NOT EXISTS shipments (
    id TEXT PRIMARY KEY,
    sale_id TEXT REFERENCES sales(id) ON DELETE SET NULL,
    item_name TEXT NOT NULL,
    platform TEXT NOT NULL,
    buyer_name TEXT,
    buyer_address TEXT,
    status TEXT NOT NULL,
    tracking_number TEXT,
    carrier TEXT,
    shipped_at TEXT,
    delivered_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS return_cases (
    id TEXT PRIMARY KEY,
    sale_id TEXT REFERENCES sales(id) ON DELETE SET NULL,
    item_name TEXT NOT NULL,
    platform TEXT NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL,
    outcome TEXT,
    refund_amount TEXT,
    opened_at TEXT NOT NULL,
    resolved_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    priority TEXT NOT NULL,
    status TEXT NOT NULL,
    due_date TEXT,
    item_id TEXT REFERENCES items(id) ON DELETE SET NULL,
    sale_id TEXT REFERENCES sales(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS integration_events (
    id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_created ON integration_events(created_at);
";

pub struct SqliteLedgerStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

/// Constraint failures become domain errors; everything else is a query error.
fn query_err(e: rusqlite::Error) -> LedgerError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &e {
        let detail = message.clone().unwrap_or_else(|| e.to_string());
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return LedgerError::conflict(detail);
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return LedgerError::validation(format!("dangling reference: {detail}"));
            }
            _ => {}
        }
    }
    LedgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err<E>(row: &Row<'_>, col: &str, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    match row.as_ref().column_index(col) {
        Ok(idx) => rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)),
        Err(lookup) => lookup,
    }
}

/// Read a TEXT column through the type's `FromStr`.
fn parse_col<T>(row: &Row<'_>, col: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(col)?;
    raw.parse().map_err(|e| conversion_err(row, col, e))
}

fn parse_opt_col<T>(row: &Row<'_>, col: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(col)?;
    raw.map(|s| s.parse().map_err(|e| conversion_err(row, col, e)))
        .transpose()
}

fn money(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn join_platforms(platforms: &BTreeSet<Platform>) -> String {
    platforms
        .iter()
        .map(Platform::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_platforms(raw: &str) -> Result<BTreeSet<Platform>, LedgerError> {
    raw.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(str::parse::<Platform>)
        .collect()
}

fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>, LedgerError> {
    rows.collect::<rusqlite::Result<Vec<T>>>().map_err(query_err)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let platforms: String = row.get("platforms")?;
    let photos: String = row.get("photos")?;
    let source_item_id: Option<String> = row.get("source_item_id")?;
    let source_query_id: Option<String> = row.get("source_query_id")?;
    Ok(Item {
        id: parse_col(row, "id")?,
        sku: row.get("sku")?,
        name: row.get("name")?,
        category: row.get("category")?,
        size: row.get("size")?,
        condition: parse_col(row, "condition")?,
        brand: row.get("brand")?,
        platforms: split_platforms(&platforms).map_err(|e| conversion_err(row, "platforms", e))?,
        status: parse_col(row, "status")?,
        purchase_price: parse_opt_col(row, "purchase_price")?,
        fees_estimate: parse_opt_col(row, "fees_estimate")?,
        shipping_payer: parse_col(row, "shipping_payer")?,
        shipping_cost: parse_opt_col(row, "shipping_cost")?,
        sale_price: parse_opt_col(row, "sale_price")?,
        purchased_at: row.get("purchased_at")?,
        listed_at: row.get("listed_at")?,
        sold_at: row.get("sold_at")?,
        location: row.get("location")?,
        notes: row.get("notes")?,
        photos: serde_json::from_str(&photos).map_err(|e| conversion_err(row, "photos", e))?,
        source: match (source_item_id, source_query_id) {
            (Some(item_id), Some(query_id)) => Some(SourceRef { item_id, query_id }),
            _ => None,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: parse_col(row, "id")?,
        order_id: row.get("order_id")?,
        platform: parse_col(row, "platform")?,
        item_id: parse_col(row, "item_id")?,
        item_name: row.get("item_name")?,
        sale_price: parse_col(row, "sale_price")?,
        fees: parse_col(row, "fees")?,
        shipping_cost: parse_col(row, "shipping_cost")?,
        buyer_paid_shipping: row.get("buyer_paid_shipping")?,
        sold_at: row.get("sold_at")?,
        shipped_at: row.get("shipped_at")?,
        tracking_number: row.get("tracking_number")?,
        payout_status: parse_col(row, "payout_status")?,
        buyer_name: row.get("buyer_name")?,
        buyer_email: row.get("buyer_email")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn shipment_from_row(row: &Row<'_>) -> rusqlite::Result<Shipment> {
    Ok(Shipment {
        id: parse_col(row, "id")?,
        sale_id: parse_opt_col(row, "sale_id")?,
        item_name: row.get("item_name")?,
        platform: parse_col(row, "platform")?,
        buyer_name: row.get("buyer_name")?,
        buyer_address: row.get("buyer_address")?,
        status: parse_col(row, "status")?,
        tracking_number: row.get("tracking_number")?,
        carrier: row.get("carrier")?,
        shipped_at: row.get("shipped_at")?,
        delivered_at: row.get("delivered_at")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn return_from_row(row: &Row<'_>) -> rusqlite::Result<ReturnCase> {
    Ok(ReturnCase {
        id: parse_col(row, "id")?,
        sale_id: parse_opt_col(row, "sale_id")?,
        item_name: row.get("item_name")?,
        platform: parse_col(row, "platform")?,
        reason: row.get("reason")?,
        status: parse_col(row, "status")?,
        outcome: parse_opt_col(row, "outcome")?,
        refund_amount: parse_opt_col(row, "refund_amount")?,
        opened_at: row.get("opened_at")?,
        resolved_at: row.get("resolved_at")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_col(row, "id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: parse_col(row, "priority")?,
        status: parse_col(row, "status")?,
        due_date: row.get("due_date")?,
        item_id: parse_opt_col(row, "item_id")?,
        sale_id: parse_opt_col(row, "sale_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<IntegrationEvent> {
    let payload: String = row.get("payload")?;
    Ok(IntegrationEvent {
        id: parse_col(row, "id")?,
        event_type: row.get("event_type")?,
        status: parse_col(row, "status")?,
        message: row.get("message")?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(row, "payload", e))?,
        created_at: row.get("created_at")?,
    })
}

impl SqliteLedgerStore {
    /// Pooled store over the database file named in the validated config.
    pub fn from_config(app: &AppConfig) -> Result<Self, LedgerError> {
        Self::build(SqliteConnectionManager::file(&app.database_path), app.pool_size)
    }

    /// Single-connection in-memory store, mainly for tests.
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::build(SqliteConnectionManager::memory(), 1)
    }

    fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<Self, LedgerError> {
        let manager = manager.with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(pool_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    fn delete_by_id(&self, table: &str, entity: &'static str, id: &str) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
            .map_err(query_err)?;
        if affected == 0 {
            return Err(LedgerError::not_found(entity, id));
        }
        Ok(())
    }

    fn get_by_id<T>(
        &self,
        table: &str,
        entity: &'static str,
        id: &str,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, LedgerError> {
        self.conn()?
            .query_row(&format!("SELECT * FROM {table} WHERE id = ?1"), params![id], map)
            .optional()
            .map_err(query_err)?
            .ok_or_else(|| LedgerError::not_found(entity, id))
    }

    fn ensure_updated(affected: usize, entity: &'static str, id: impl ToString) -> Result<(), LedgerError> {
        if affected == 0 {
            Err(LedgerError::not_found(entity, id))
        } else {
            Ok(())
        }
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn get_item(&self, id: ItemId) -> Result<Item, LedgerError> {
        self.get_by_id("items", "item", &id.to_string(), item_from_row)
    }

    fn find_item_by_sku(&self, sku: &str) -> Result<Option<Item>, LedgerError> {
        self.conn()?
            .query_row("SELECT * FROM items WHERE sku = ?1", params![sku], item_from_row)
            .optional()
            .map_err(query_err)
    }

    fn list_items(
        &self,
        filter: &ItemFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM items
                 WHERE (?1 IS NULL OR status = ?1)
                   AND (?2 IS NULL OR category = ?2)
                   AND (?3 IS NULL OR instr(lower(brand), lower(?3)) > 0)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?4",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.category,
                    filter.brand,
                    sql_limit(limit)
                ],
                item_from_row,
            )
            .map_err(query_err)?;
        collect(rows)
    }

    fn insert_item(&self, item: &Item) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO items (
                    id, sku, name, category, size, condition, brand, platforms, status,
                    purchase_price, fees_estimate, shipping_payer, shipping_cost, sale_price,
                    purchased_at, listed_at, sold_at, location, notes, photos,
                    source_item_id, source_query_id, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                           ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                params![
                    item.id.to_string(),
                    item.sku,
                    item.name,
                    item.category,
                    item.size,
                    item.condition.as_str(),
                    item.brand,
                    join_platforms(&item.platforms),
                    item.status.as_str(),
                    money(item.purchase_price),
                    money(item.fees_estimate),
                    item.shipping_payer.as_str(),
                    money(item.shipping_cost),
                    money(item.sale_price),
                    item.purchased_at,
                    item.listed_at,
                    item.sold_at,
                    item.location,
                    item.notes,
                    serde_json::to_string(&item.photos)?,
                    item.source.as_ref().map(|s| s.item_id.as_str()),
                    item.source.as_ref().map(|s| s.query_id.as_str()),
                    item.created_at,
                    item.updated_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_item(&self, item: &Item) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(
                "UPDATE items SET
                    name = ?2, category = ?3, size = ?4, condition = ?5, brand = ?6,
                    platforms = ?7, status = ?8, purchase_price = ?9, fees_estimate = ?10,
                    shipping_payer = ?11, shipping_cost = ?12, sale_price = ?13,
                    purchased_at = ?14, listed_at = ?15, sold_at = ?16, location = ?17,
                    notes = ?18, photos = ?19, updated_at = ?20
                 WHERE id = ?1",
                params![
                    item.id.to_string(),
                    item.name,
                    item.category,
                    item.size,
                    item.condition.as_str(),
                    item.brand,
                    join_platforms(&item.platforms),
                    item.status.as_str(),
                    money(item.purchase_price),
                    money(item.fees_estimate),
                    item.shipping_payer.as_str(),
                    money(item.shipping_cost),
                    money(item.sale_price),
                    item.purchased_at,
                    item.listed_at,
                    item.sold_at,
                    item.location,
                    item.notes,
                    serde_json::to_string(&item.photos)?,
                    item.updated_at,
                ],
            )
            .map_err(query_err)?;
        Self::ensure_updated(affected, "item", item.id)
    }

    fn delete_item(&self, id: ItemId) -> Result<(), LedgerError> {
        self.delete_by_id("items", "item", &id.to_string())
    }

    fn get_sale(&self, id: SaleId) -> Result<Sale, LedgerError> {
        self.get_by_id("sales", "sale", &id.to_string(), sale_from_row)
    }

    fn list_sales(
        &self,
        filter: &SaleFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Sale>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM sales
                 WHERE (?1 IS NULL OR platform = ?1)
                   AND (?2 IS NULL OR payout_status = ?2)
                 ORDER BY sold_at DESC, rowid DESC
                 LIMIT ?3",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![
                    filter.platform.map(|p| p.as_str()),
                    filter.payout_status.map(|s| s.as_str()),
                    sql_limit(limit)
                ],
                sale_from_row,
            )
            .map_err(query_err)?;
        collect(rows)
    }

    fn insert_sale(&self, sale: &Sale) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO sales (
                    id, order_id, platform, item_id, item_name, sale_price, fees,
                    shipping_cost, buyer_paid_shipping, sold_at, shipped_at, tracking_number,
                    payout_status, buyer_name, buyer_email, notes, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                           ?15, ?16, ?17, ?18)",
                params![
                    sale.id.to_string(),
                    sale.order_id,
                    sale.platform.as_str(),
                    sale.item_id.to_string(),
                    sale.item_name,
                    sale.sale_price.to_string(),
                    sale.fees.to_string(),
                    sale.shipping_cost.to_string(),
                    sale.buyer_paid_shipping,
                    sale.sold_at,
                    sale.shipped_at,
                    sale.tracking_number,
                    sale.payout_status.as_str(),
                    sale.buyer_name,
                    sale.buyer_email,
                    sale.notes,
                    sale.created_at,
                    sale.updated_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_sale(&self, sale: &Sale) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(
                "UPDATE sales SET
                    order_id = ?2, platform = ?3, sale_price = ?4, fees = ?5,
                    shipping_cost = ?6, buyer_paid_shipping = ?7, sold_at = ?8,
                    shipped_at = ?9, tracking_number = ?10, payout_status = ?11,
                    buyer_name = ?12, buyer_email = ?13, notes = ?14, updated_at = ?15
                 WHERE id = ?1",
                params![
                    sale.id.to_string(),
                    sale.order_id,
                    sale.platform.as_str(),
                    sale.sale_price.to_string(),
                    sale.fees.to_string(),
                    sale.shipping_cost.to_string(),
                    sale.buyer_paid_shipping,
                    sale.sold_at,
                    sale.shipped_at,
                    sale.tracking_number,
                    sale.payout_status.as_str(),
                    sale.buyer_name,
                    sale.buyer_email,
                    sale.notes,
                    sale.updated_at,
                ],
            )
            .map_err(query_err)?;
        Self::ensure_updated(affected, "sale", sale.id)
    }

    fn delete_sale(&self, id: SaleId) -> Result<(), LedgerError> {
        self.delete_by_id("sales", "sale", &id.to_string())
    }

    fn get_shipment(&self, id: ShipmentId) -> Result<Shipment, LedgerError> {
        self.get_by_id("shipments", "shipment", &id.to_string(), shipment_from_row)
    }

    fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Shipment>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM shipments
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![status.map(|s| s.as_str()), sql_limit(limit)],
                shipment_from_row,
            )
            .map_err(query_err)?;
        collect(rows)
    }

    fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO shipments (
                    id, sale_id, item_name, platform, buyer_name, buyer_address, status,
                    tracking_number, carrier, shipped_at, delivered_at, notes,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    shipment.id.to_string(),
                    shipment.sale_id.map(|id| id.to_string()),
                    shipment.item_name,
                    shipment.platform.as_str(),
                    shipment.buyer_name,
                    shipment.buyer_address,
                    shipment.status.as_str(),
                    shipment.tracking_number,
                    shipment.carrier,
                    shipment.shipped_at,
                    shipment.delivered_at,
                    shipment.notes,
                    shipment.created_at,
                    shipment.updated_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_shipment(&self, shipment: &Shipment) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(
                "UPDATE shipments SET
                    buyer_address = ?2, status = ?3, tracking_number = ?4, carrier = ?5,
                    shipped_at = ?6, delivered_at = ?7, notes = ?8, updated_at = ?9
                 WHERE id = ?1",
                params![
                    shipment.id.to_string(),
                    shipment.buyer_address,
                    shipment.status.as_str(),
                    shipment.tracking_number,
                    shipment.carrier,
                    shipment.shipped_at,
                    shipment.delivered_at,
                    shipment.notes,
                    shipment.updated_at,
                ],
            )
            .map_err(query_err)?;
        Self::ensure_updated(affected, "shipment", shipment.id)
    }

    fn get_return(&self, id: ReturnId) -> Result<ReturnCase, LedgerError> {
        self.get_by_id("return_cases", "return case", &id.to_string(), return_from_row)
    }

    fn list_returns(
        &self,
        status: Option<ReturnStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ReturnCase>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM return_cases
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY opened_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![status.map(|s| s.as_str()), sql_limit(limit)],
                return_from_row,
            )
            .map_err(query_err)?;
        collect(rows)
    }

    fn insert_return(&self, case: &ReturnCase) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO return_cases (
                    id, sale_id, item_name, platform, reason, status, outcome,
                    refund_amount, opened_at, resolved_at, notes, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    case.id.to_string(),
                    case.sale_id.map(|id| id.to_string()),
                    case.item_name,
                    case.platform.as_str(),
                    case.reason,
                    case.status.as_str(),
                    case.outcome.map(|o| o.as_str()),
                    money(case.refund_amount),
                    case.opened_at,
                    case.resolved_at,
                    case.notes,
                    case.created_at,
                    case.updated_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_return(&self, case: &ReturnCase) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(
                "UPDATE return_cases SET
                    reason = ?2, status = ?3, outcome = ?4, refund_amount = ?5,
                    resolved_at = ?6, notes = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    case.id.to_string(),
                    case.reason,
                    case.status.as_str(),
                    case.outcome.map(|o| o.as_str()),
                    money(case.refund_amount),
                    case.resolved_at,
                    case.notes,
                    case.updated_at,
                ],
            )
            .map_err(query_err)?;
        Self::ensure_updated(affected, "return case", case.id)
    }

    fn get_task(&self, id: TaskId) -> Result<Task, LedgerError> {
        self.get_by_id("tasks", "task", &id.to_string(), task_from_row)
    }

    fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Task>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM tasks
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![status.map(|s| s.as_str()), sql_limit(limit)],
                task_from_row,
            )
            .map_err(query_err)?;
        collect(rows)
    }

    fn insert_task(&self, task: &Task) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO tasks (
                    id, title, description, priority, status, due_date, item_id, sale_id,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    task.id.to_string(),
                    task.title,
                    task.description,
                    task.priority.as_str(),
                    task.status.as_str(),
                    task.due_date,
                    task.item_id.map(|id| id.to_string()),
                    task.sale_id.map(|id| id.to_string()),
                    task.created_at,
                    task.updated_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<(), LedgerError> {
        let affected = self
            .conn()?
            .execute(
                "UPDATE tasks SET
                    title = ?2, description = ?3, priority = ?4, status = ?5,
                    due_date = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    task.id.to_string(),
                    task.title,
                    task.description,
                    task.priority.as_str(),
                    task.status.as_str(),
                    task.due_date,
                    task.updated_at,
                ],
            )
            .map_err(query_err)?;
        Self::ensure_updated(affected, "task", task.id)
    }

    fn delete_task(&self, id: TaskId) -> Result<(), LedgerError> {
        self.delete_by_id("tasks", "task", &id.to_string())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, LedgerError> {
        self.conn()?
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, Utc::now()],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn list_settings(&self) -> Result<Vec<(String, String)>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM settings ORDER BY key")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(query_err)?;
        collect(rows)
    }

    fn append_event(&self, event: &IntegrationEvent) -> Result<(), LedgerError> {
        self.conn()?
            .execute(
                "INSERT INTO integration_events (id, event_type, status, message, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.id.to_string(),
                    event.event_type,
                    event.status.as_str(),
                    event.message,
                    serde_json::to_string(&event.payload)?,
                    event.created_at,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn list_events(&self, limit: Option<usize>) -> Result<Vec<IntegrationEvent>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM integration_events
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![sql_limit(limit)], event_from_row)
            .map_err(query_err)?;
        collect(rows)
    }
}
