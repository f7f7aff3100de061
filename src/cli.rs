//! CLI definition and dispatch.
//!
//! Every command loads the INI config, validates it, installs logging and
//! opens the SQLite store before doing its work. [`execute`] returns the text
//! destined for stdout so commands can be driven from tests; [`run`] prints it
//! and maps failures to exit codes.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_source::CsvCandidateSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteLedgerStore;
use crate::domain::config_validation::{validate_app_config, AppConfig};
use crate::domain::error::LedgerError;
use crate::domain::item::{Item, ItemFilter, ListingStatus};
use crate::domain::ledger::Ledger;
use crate::domain::reconcile::Reconciler;
use crate::domain::seed::seed_demo_data;
use crate::domain::settings::SettingKey;
use crate::domain::stats::{self, ItemStats, SalesStats};
use crate::logging;
use crate::ports::ledger_store::LedgerStore;

#[derive(Parser, Debug)]
#[command(name = "resale-ledger", about = "Resale inventory ledger and reconciliation engine")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Emit JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    InitDb,
    /// Load demo inventory, sales, tasks and a return
    Seed,
    /// Run one reconciliation pass for a saved query
    Sync {
        #[arg(short, long)]
        query: String,
    },
    /// Control the marketplace integration
    Integration {
        #[command(subcommand)]
        action: IntegrationAction,
    },
    /// Profit and ROI summaries
    Stats {
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// List inventory items, newest first
    Items {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show recent integration events
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect or change ledger settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IntegrationAction {
    Enable,
    Disable,
    Status,
    /// Fetch once from the candidate source without importing
    Test {
        #[arg(short, long)]
        query: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    List,
    Set { key: String, value: String },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LedgerError> {
    FileConfigAdapter::from_file(path)
}

/// Run one command and return what it would print.
pub fn execute(cli: &Cli) -> Result<String, LedgerError> {
    let config = load_config(&cli.config)?;
    let app = validate_app_config(&config)?;
    logging::init(&app.log_level, app.log_json);

    let store = SqliteLedgerStore::from_config(&app)?;
    store.initialize_schema()?;

    match &cli.command {
        Command::InitDb => Ok(format!("database ready at {}", app.database_path)),
        Command::Seed => {
            let report = seed_demo_data(&store)?;
            render(&report, cli.json, |r| {
                format!(
                    "created {} items, {} sales, {} tasks, {} returns",
                    r.items_created, r.sales_created, r.tasks_created, r.returns_created
                )
            })
        }
        Command::Sync { query } => {
            let source = CsvCandidateSource::from_config(&app)?;
            let report = Reconciler::new(&store, &source).sync_query(query)?;
            render(&report, cli.json, |r| {
                let mut out = format!(
                    "query {}: {} imported, {} skipped, {} errors",
                    r.query_id,
                    r.imported,
                    r.skipped,
                    r.errors.len()
                );
                for err in &r.errors {
                    let _ = write!(out, "\n  {}: {}", err.candidate_ref, err.reason);
                }
                out
            })
        }
        Command::Integration { action } => run_integration(&store, &app, action, cli.json),
        Command::Stats { from, to } => run_stats(&store, *from, *to, cli.json),
        Command::Items {
            status,
            category,
            brand,
            limit,
        } => {
            let filter = ItemFilter {
                status: status
                    .as_deref()
                    .map(str::parse::<ListingStatus>)
                    .transpose()?,
                category: category.clone(),
                brand: brand.clone(),
            };
            let items = Ledger::new(&store).list_items(&filter, *limit)?;
            run_items(&items, cli.json)
        }
        Command::Events { limit } => {
            let events = Ledger::new(&store).list_events(Some(*limit))?;
            render(&events, cli.json, |events| {
                events
                    .iter()
                    .map(|e| {
                        format!(
                            "{}  {:<8} {:<20} {}",
                            e.created_at.format("%Y-%m-%d %H:%M:%S"),
                            e.status,
                            e.event_type,
                            e.message
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Settings { action } => run_settings(&store, action, cli.json),
    }
}

fn render<T: Serialize>(
    value: &T,
    json: bool,
    text: impl FnOnce(&T) -> String,
) -> Result<String, LedgerError> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(text(value))
    }
}

fn run_integration(
    store: &SqliteLedgerStore,
    app: &AppConfig,
    action: &IntegrationAction,
    json: bool,
) -> Result<String, LedgerError> {
    let ledger = Ledger::new(store);
    match action {
        IntegrationAction::Enable => {
            ledger.enable_integration()?;
            Ok("integration enabled".to_string())
        }
        IntegrationAction::Disable => {
            ledger.disable_integration()?;
            Ok("integration disabled".to_string())
        }
        IntegrationAction::Status => {
            let status = ledger.integration_status()?;
            render(&status, json, |s| {
                let last_sync = s
                    .last_sync
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                format!(
                    "enabled: {}\nlast sync: {}\nsync interval: {} min",
                    s.enabled, last_sync, s.sync_interval_minutes
                )
            })
        }
        IntegrationAction::Test { query } => {
            let source = CsvCandidateSource::from_config(app)?;
            let report = ledger.test_connection(&source, query)?;
            render(&report, json, |r| {
                format!("query {}: {} candidates available", r.query_id, r.candidates)
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsReport {
    items: ItemStats,
    sales: SalesStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<RangeProfit>,
}

#[derive(Debug, Serialize)]
struct RangeProfit {
    from: NaiveDate,
    to: NaiveDate,
    net_profit: Decimal,
}

fn run_stats(
    store: &SqliteLedgerStore,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<String, LedgerError> {
    let range = match (from, to) {
        (Some(from), Some(to)) => Some(RangeProfit {
            from,
            to,
            net_profit: stats::net_profit_between(store, from, to)?,
        }),
        _ => None,
    };
    let report = StatsReport {
        items: stats::item_stats(store)?,
        sales: stats::sales_stats(store)?,
        range,
    };

    render(&report, json, |r| {
        let mut out = String::new();
        let _ = writeln!(out, "items: {}", r.items.total);
        for (status, count) in &r.items.by_status {
            let _ = writeln!(out, "  {status}: {count}");
        }
        let _ = writeln!(
            out,
            "potential profit: {} over {} priced items (avg {})",
            r.items.total_profit, r.items.priced, r.items.average_profit
        );
        for (bucket, count) in &r.items.roi_distribution {
            let _ = writeln!(out, "  ROI {bucket}: {count}");
        }
        let _ = write!(
            out,
            "sales: {}, revenue {}, net profit {} (avg {})",
            r.sales.count, r.sales.revenue, r.sales.total_net_profit, r.sales.average_net_profit
        );
        if let Some(range) = &r.range {
            let _ = write!(
                out,
                "\nnet profit {} to {}: {}",
                range.from, range.to, range.net_profit
            );
        }
        out
    })
}

#[derive(Serialize)]
struct ItemView<'a> {
    #[serde(flatten)]
    item: &'a Item,
    profit: Decimal,
    roi_percent: Decimal,
}

fn run_items(items: &[Item], json: bool) -> Result<String, LedgerError> {
    let views: Vec<ItemView<'_>> = items
        .iter()
        .map(|item| ItemView {
            item,
            profit: item.profit(),
            roi_percent: item.roi_percent(),
        })
        .collect();
    render(&views, json, |views| {
        views
            .iter()
            .map(|v| {
                format!(
                    "{:<14} {:<9} {:>8} {:>7}%  {}",
                    v.item.sku, v.item.status, v.profit, v.roi_percent, v.item.name
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn run_settings(
    store: &SqliteLedgerStore,
    action: &SettingsAction,
    json: bool,
) -> Result<String, LedgerError> {
    match action {
        SettingsAction::List => {
            let mut effective = Vec::with_capacity(SettingKey::ALL.len());
            for key in SettingKey::ALL {
                let value = store
                    .get_setting(key.as_str())?
                    .unwrap_or_else(|| key.default_value().to_string());
                effective.push((key.as_str(), value));
            }
            render(&effective, json, |pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| format!("{k} = {v}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        SettingsAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            let stored = Ledger::new(store).update_setting(key, value)?;
            Ok(format!("{key} = {stored}"))
        }
    }
}
