//! Demo data for a fresh ledger.
//!
//! Everything goes through [`Ledger`] so seeded rows obey the same lifecycle
//! rules as real ones. Items whose SKU already exists are left alone, so
//! seeding twice is harmless.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::error::LedgerError;
use super::item::{Condition, ListingStatus, NewItem, Platform, ShippingPayer};
use super::ledger::Ledger;
use super::return_case::{NewReturn, Resolution, ReturnOutcome, ReturnStatus};
use super::sale::{NewSale, PayoutStatus};
use super::shipment::{NewShipment, ShipmentStatus};
use super::task::{NewTask, TaskPriority, TaskStatus};
use crate::ports::ledger_store::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeedReport {
    pub items_created: usize,
    pub sales_created: usize,
    pub tasks_created: usize,
    pub returns_created: usize,
}

struct DemoItem {
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    size: &'static str,
    condition: Condition,
    brand: &'static str,
    platforms: &'static [Platform],
    status: ListingStatus,
    purchase_cents: i64,
    fees_cents: i64,
    sale_cents: i64,
    purchased_days_ago: i64,
    sold_days_ago: Option<i64>,
    location: &'static str,
    notes: &'static str,
}

const DEMO_ITEMS: &[DemoItem] = &[
    DemoItem {
        sku: "VINT-NIK-001",
        name: "Nike Air Max 90 White",
        category: "Trainers",
        size: "UK 10",
        condition: Condition::LikeNew,
        brand: "Nike",
        platforms: &[Platform::Vinted],
        status: ListingStatus::Sold,
        purchase_cents: 4500,
        fees_cents: 850,
        sale_cents: 8500,
        purchased_days_ago: 30,
        sold_days_ago: Some(5),
        location: "Warehouse",
        notes: "Great condition, sold quickly",
    },
    DemoItem {
        sku: "VINT-ADI-002",
        name: "Adidas Ultraboost 21 Black",
        category: "Trainers",
        size: "UK 9",
        condition: Condition::Good,
        brand: "Adidas",
        platforms: &[Platform::Vinted, Platform::Depop],
        status: ListingStatus::Listed,
        purchase_cents: 3500,
        fees_cents: 650,
        sale_cents: 6500,
        purchased_days_ago: 20,
        sold_days_ago: None,
        location: "Home",
        notes: "Listed on multiple platforms",
    },
    DemoItem {
        sku: "VINT-LEV-003",
        name: "Levis 501 Vintage Jeans",
        category: "Jeans",
        size: "W32 L32",
        condition: Condition::New,
        brand: "Levis",
        platforms: &[Platform::Vinted],
        status: ListingStatus::Listed,
        purchase_cents: 2500,
        fees_cents: 400,
        sale_cents: 4000,
        purchased_days_ago: 10,
        sold_days_ago: None,
        location: "Warehouse",
        notes: "Brand new with tags",
    },
    DemoItem {
        sku: "VINT-NOR-004",
        name: "The North Face Jacket Green",
        category: "Outerwear",
        size: "L",
        condition: Condition::LikeNew,
        brand: "The North Face",
        platforms: &[Platform::Vinted],
        status: ListingStatus::Sold,
        purchase_cents: 6000,
        fees_cents: 1200,
        sale_cents: 12000,
        purchased_days_ago: 40,
        sold_days_ago: Some(10),
        location: "Warehouse",
        notes: "Premium item, high profit margin",
    },
    DemoItem {
        sku: "VINT-PAT-005",
        name: "Patagonia Fleece Navy",
        category: "Fleece",
        size: "M",
        condition: Condition::Good,
        brand: "Patagonia",
        platforms: &[Platform::Depop],
        status: ListingStatus::Draft,
        purchase_cents: 3000,
        fees_cents: 550,
        sale_cents: 5500,
        purchased_days_ago: 3,
        sold_days_ago: None,
        location: "Home",
        notes: "Needs photos before listing",
    },
    DemoItem {
        sku: "VINT-PUM-006",
        name: "Puma Suede Classic Red",
        category: "Trainers",
        size: "UK 8",
        condition: Condition::Good,
        brand: "Puma",
        platforms: &[Platform::Vinted],
        status: ListingStatus::Listed,
        purchase_cents: 2000,
        fees_cents: 350,
        sale_cents: 3500,
        purchased_days_ago: 7,
        sold_days_ago: None,
        location: "Warehouse",
        notes: "Classic style, should sell fast",
    },
];

const BUYERS: &[&str] = &["John Smith", "Sarah Johnson", "Mike Brown", "Emma Davis"];
const CARRIERS: &[&str] = &["Royal Mail", "DPD", "Hermes"];

const DEMO_TASKS: &[(&str, &str, TaskPriority, TaskStatus, i64)] = &[
    (
        "List new Nike trainers on eBay",
        "Take photos and create listing for VINT-NIK-007",
        TaskPriority::High,
        TaskStatus::Todo,
        2,
    ),
    (
        "Follow up on pending payout",
        "Check Vinted for delayed payout on order ORD-12345",
        TaskPriority::Medium,
        TaskStatus::InProgress,
        1,
    ),
    (
        "Research trending items",
        "Check what trainers are selling well this month",
        TaskPriority::Low,
        TaskStatus::Todo,
        7,
    ),
    (
        "Update inventory spreadsheet",
        "Export and backup inventory data",
        TaskPriority::Medium,
        TaskStatus::Done,
        -1,
    ),
];

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

pub fn seed_demo_data<S: LedgerStore + ?Sized>(store: &S) -> Result<SeedReport, LedgerError> {
    let ledger = Ledger::new(store);
    let now = Utc::now();
    let mut report = SeedReport::default();
    let mut first_sale = None;

    for (n, demo) in DEMO_ITEMS.iter().enumerate() {
        if store.find_item_by_sku(demo.sku)?.is_some() {
            info!(sku = demo.sku, "seed item already present");
            continue;
        }

        let item = ledger.create_item(NewItem {
            sku: demo.sku.to_string(),
            name: demo.name.to_string(),
            category: Some(demo.category.to_string()),
            size: Some(demo.size.to_string()),
            condition: Some(demo.condition),
            brand: Some(demo.brand.to_string()),
            platforms: demo.platforms.iter().copied().collect::<BTreeSet<_>>(),
            purchase_price: Some(cents(demo.purchase_cents)),
            fees_estimate: Some(cents(demo.fees_cents)),
            shipping_payer: Some(ShippingPayer::Buyer),
            shipping_cost: Some(Decimal::ZERO),
            sale_price: Some(cents(demo.sale_cents)),
            purchased_at: Some(now - Duration::days(demo.purchased_days_ago)),
            location: Some(demo.location.to_string()),
            notes: Some(demo.notes.to_string()),
            ..NewItem::default()
        })?;
        report.items_created += 1;

        if demo.status != ListingStatus::Draft {
            ledger.list_item(item.id)?;
        }

        let Some(sold_days_ago) = demo.sold_days_ago else {
            continue;
        };

        let platform = demo.platforms.first().copied().unwrap_or(Platform::Vinted);
        let sale = ledger.record_sale(NewSale {
            buyer_paid_shipping: Some(true),
            sold_at: Some(now - Duration::days(sold_days_ago)),
            tracking_number: Some(format!("TRK{}", 100_001 + n)),
            buyer_name: Some(BUYERS[n % BUYERS.len()].to_string()),
            notes: Some("Smooth transaction".to_string()),
            ..NewSale::new(item.id, format!("ORD-{}", 10_001 + n), platform, cents(demo.sale_cents))
        })?;
        ledger.update_payout(sale.id, PayoutStatus::Paid)?;
        report.sales_created += 1;

        let shipment = ledger.create_shipment(
            sale.id,
            NewShipment {
                buyer_address: Some("123 Main St, London, UK".to_string()),
                carrier: Some(CARRIERS[n % CARRIERS.len()].to_string()),
                ..NewShipment::default()
            },
        )?;
        ledger.advance_shipment(shipment.id, ShipmentStatus::Shipped, None)?;
        ledger.advance_shipment(shipment.id, ShipmentStatus::Delivered, None)?;

        first_sale.get_or_insert(sale);
    }

    if report.items_created > 0 {
        for (title, description, priority, status, due_in_days) in DEMO_TASKS {
            let task = ledger.create_task(NewTask {
                description: Some(description.to_string()),
                priority: *priority,
                due_date: Some(now + Duration::days(*due_in_days)),
                ..NewTask::titled(*title)
            })?;
            if *status != TaskStatus::Todo {
                ledger.transition_task(task.id, *status)?;
            }
            report.tasks_created += 1;
        }
    }

    if let Some(sale) = first_sale {
        let case = ledger.open_return(NewReturn {
            sale_id: sale.id,
            reason: "Item not as described - buyer claimed size was wrong".to_string(),
            notes: Some("Offered a partial refund, buyer accepted".to_string()),
        })?;
        ledger.start_return(case.id)?;
        ledger.resolve_return(
            case.id,
            Resolution {
                status: ReturnStatus::Resolved,
                outcome: ReturnOutcome::PartialRefund,
                refund_amount: Some(cents(2000)),
            },
        )?;
        report.returns_created += 1;
    }

    info!(
        items = report.items_created,
        sales = report.sales_created,
        tasks = report.tasks_created,
        "seed complete"
    );
    Ok(report)
}
