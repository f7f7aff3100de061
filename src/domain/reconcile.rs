//! Reconciliation of external candidates into the ledger.
//!
//! One pass fetches every candidate for a saved query, normalises each one
//! and inserts the survivors as draft items. A failure on one candidate is
//! counted and recorded, then the pass moves on.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::candidate::{normalize, Candidate, Normalized};
use super::error::LedgerError;
use super::event::{
    EventStatus, IntegrationEvent, ITEM_FAILED, ITEM_IMPORTED, ITEM_SKIPPED, QUERY_SYNC,
};
use super::item::Item;
use super::settings::{LedgerSettings, SettingKey};
use crate::ports::candidate_source::CandidateSource;
use crate::ports::ledger_store::LedgerStore;

/// A candidate that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateError {
    pub candidate_ref: String,
    pub reason: String,
}

/// Aggregate outcome of one pass. `errors` keeps candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SyncReport {
    pub query_id: String,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<CandidateError>,
}

impl SyncReport {
    fn new(query_id: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            ..Self::default()
        }
    }
}

enum Outcome {
    Imported,
    Skipped,
    Failed(String),
}

pub struct Reconciler<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    source: &'a C,
}

impl<'a, S, C> Reconciler<'a, S, C>
where
    S: LedgerStore + ?Sized,
    C: CandidateSource + ?Sized,
{
    pub fn new(store: &'a S, source: &'a C) -> Self {
        Self { store, source }
    }

    /// Run one reconciliation pass for `query_id`.
    ///
    /// Fails with [`LedgerError::IntegrationDisabled`] before touching the
    /// source when the integration is off, and with
    /// [`LedgerError::SourceUnavailable`] when the fetch itself fails. A
    /// query id the source refuses comes back as [`LedgerError::Validation`].
    /// Everything after a successful fetch is reported in the returned
    /// [`SyncReport`].
    pub fn sync_query(&self, query_id: &str) -> Result<SyncReport, LedgerError> {
        let settings = self.store.settings()?;
        if !settings.integration_enabled {
            warn!(query_id, "sync requested while integration is disabled");
            return Err(LedgerError::IntegrationDisabled);
        }

        let candidates = match self.source.fetch_candidates(query_id) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(query_id, error = %e, "candidate fetch failed");
                self.record(IntegrationEvent::new(
                    QUERY_SYNC,
                    EventStatus::Error,
                    format!("Sync failed for query {query_id}: {e}"),
                    json!({ "query_id": query_id, "error": e.to_string() }),
                ));
                return Err(match e {
                    LedgerError::SourceUnavailable { .. } | LedgerError::Validation { .. } => e,
                    other => LedgerError::source_unavailable(other.to_string()),
                });
            }
        };
        info!(query_id, count = candidates.len(), "fetched candidates");

        let mut report = SyncReport::new(query_id);
        for candidate in &candidates {
            match self.reconcile_one(candidate, query_id, &settings) {
                Outcome::Imported => report.imported += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed(reason) => report.errors.push(CandidateError {
                    candidate_ref: candidate.source_id.clone(),
                    reason,
                }),
            }
        }

        self.finish(&report);
        Ok(report)
    }

    fn reconcile_one(
        &self,
        candidate: &Candidate,
        query_id: &str,
        settings: &LedgerSettings,
    ) -> Outcome {
        let source_id = candidate.source_id.as_str();

        let draft = match normalize(candidate, query_id, settings, self.store) {
            Ok(Normalized::Draft(draft)) => draft,
            Ok(Normalized::Rejected(reason)) => {
                let reason = reason.to_string();
                debug!(query_id, source_id, %reason, "candidate skipped");
                return self.skipped(candidate, query_id, reason);
            }
            Err(e) => return self.failed(candidate, query_id, None, e),
        };

        let sku = draft.sku.clone();
        let item = match Item::draft(draft, Utc::now()) {
            Ok(item) => item,
            Err(e) => return self.failed(candidate, query_id, Some(sku.as_str()), e),
        };

        match self.store.insert_item(&item) {
            Ok(()) => {
                info!(query_id, source_id, sku = %item.sku, "candidate imported");
                self.record(IntegrationEvent::new(
                    ITEM_IMPORTED,
                    EventStatus::Success,
                    format!("Imported {} as {}", item.name, item.sku),
                    json!({
                        "query_id": query_id,
                        "source_item_id": source_id,
                        "item_id": item.id,
                        "sku": item.sku,
                    }),
                ));
                Outcome::Imported
            }
            // Another pass stored the same identity key after our lookup.
            Err(e) if e.is_conflict() => {
                debug!(query_id, source_id, sku = %item.sku, "identity key taken at insert");
                self.skipped(candidate, query_id, format!("already exists as {}", item.sku))
            }
            Err(e) => self.failed(candidate, query_id, Some(item.sku.as_str()), e),
        }
    }

    fn skipped(&self, candidate: &Candidate, query_id: &str, reason: String) -> Outcome {
        self.record(IntegrationEvent::new(
            ITEM_SKIPPED,
            EventStatus::Warning,
            format!("Skipped {}: {reason}", candidate.title),
            json!({
                "query_id": query_id,
                "source_item_id": candidate.source_id,
                "reason": reason,
            }),
        ));
        Outcome::Skipped
    }

    fn failed(
        &self,
        candidate: &Candidate,
        query_id: &str,
        sku: Option<&str>,
        err: LedgerError,
    ) -> Outcome {
        let reason = err.to_string();
        error!(query_id, source_id = %candidate.source_id, error = %reason, "candidate failed");
        self.record(IntegrationEvent::new(
            ITEM_FAILED,
            EventStatus::Error,
            format!("Failed to import {}: {reason}", candidate.title),
            json!({
                "query_id": query_id,
                "source_item_id": candidate.source_id,
                "sku": sku,
                "error": reason,
            }),
        ));
        Outcome::Failed(reason)
    }

    fn finish(&self, report: &SyncReport) {
        let now = Utc::now().timestamp().to_string();
        if let Err(e) = self
            .store
            .set_setting(SettingKey::LastSync.as_str(), &now)
        {
            warn!(query_id = %report.query_id, error = %e, "could not record last sync time");
        }

        info!(
            query_id = %report.query_id,
            imported = report.imported,
            skipped = report.skipped,
            errors = report.errors.len(),
            "sync pass complete"
        );
        self.record(IntegrationEvent::new(
            QUERY_SYNC,
            EventStatus::Success,
            format!(
                "Query {}: {} imported, {} skipped, {} errors",
                report.query_id,
                report.imported,
                report.skipped,
                report.errors.len()
            ),
            json!({
                "query_id": report.query_id,
                "imported": report.imported,
                "skipped": report.skipped,
                "errors": report.errors.len(),
            }),
        ));
    }

    /// Audit writes never abort a pass.
    fn record(&self, event: IntegrationEvent) {
        if let Err(e) = self.store.append_event(&event) {
            warn!(event_type = %event.event_type, error = %e, "could not append integration event");
        }
    }
}
