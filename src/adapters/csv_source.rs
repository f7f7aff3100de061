//! CSV export candidate source.
//!
//! Each saved query is a file `<query_id>.csv` in the configured directory
//! with the header `id,title,brand,size,price,url,photos,country,created_at`.
//! Photos are `|`-separated; empty cells mean absent.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::domain::candidate::Candidate;
use crate::domain::config_validation::AppConfig;
use crate::domain::error::LedgerError;
use crate::ports::candidate_source::CandidateSource;

#[derive(Debug, Deserialize)]
struct CandidateRow {
    id: Option<String>,
    title: Option<String>,
    brand: Option<String>,
    size: Option<String>,
    price: Option<String>,
    url: Option<String>,
    photos: Option<String>,
    country: Option<String>,
    created_at: Option<String>,
}

pub struct CsvCandidateSource {
    base_path: PathBuf,
}

impl CsvCandidateSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Source over `[source] candidates_dir`, which only sync commands need.
    pub fn from_config(app: &AppConfig) -> Result<Self, LedgerError> {
        let dir = app
            .candidates_dir
            .clone()
            .ok_or_else(|| LedgerError::ConfigMissing {
                section: "source".into(),
                key: "candidates_dir".into(),
            })?;
        Ok(Self::new(dir))
    }

    fn csv_path(&self, query_id: &str) -> PathBuf {
        self.base_path.join(format!("{query_id}.csv"))
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
        })
}

impl CandidateRow {
    fn into_candidate(self, line: u64) -> Result<Candidate, LedgerError> {
        let price = self
            .price
            .as_deref()
            .map(|p| {
                Decimal::from_str(p.trim()).map_err(|e| {
                    LedgerError::source_unavailable(format!(
                        "line {line}: invalid price `{p}`: {e}"
                    ))
                })
            })
            .transpose()?;
        let created_at = self
            .created_at
            .as_deref()
            .map(|raw| {
                parse_timestamp(raw.trim()).ok_or_else(|| {
                    LedgerError::source_unavailable(format!(
                        "line {line}: invalid created_at `{raw}`"
                    ))
                })
            })
            .transpose()?;

        Ok(Candidate {
            source_id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            brand: self.brand,
            size: self.size,
            price,
            url: self.url,
            photos: self
                .photos
                .map(|p| {
                    p.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            country: self.country,
            created_at,
        })
    }
}

impl CandidateSource for CsvCandidateSource {
    fn fetch_candidates(&self, query_id: &str) -> Result<Vec<Candidate>, LedgerError> {
        if query_id.is_empty() || query_id.contains(['/', '\\']) || query_id.starts_with('.') {
            return Err(LedgerError::validation(format!(
                "invalid query id `{query_id}`"
            )));
        }

        let path = self.csv_path(query_id);
        let content = fs::read_to_string(&path).map_err(|e| {
            LedgerError::source_unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut candidates = Vec::new();

        for result in rdr.deserialize::<CandidateRow>() {
            let row = result.map_err(|e| {
                LedgerError::source_unavailable(format!("CSV parse error: {}", e))
            })?;
            let line = candidates.len() as u64 + 2;
            candidates.push(row.into_candidate(line)?);
        }

        debug!(query_id, count = candidates.len(), path = %path.display(), "read candidates");
        Ok(candidates)
    }
}
