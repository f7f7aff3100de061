//! External marketplace candidates and their normalisation into draft items.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounting::percent_of;
use super::error::LedgerError;
use super::item::{Condition, NewItem, Platform, ShippingPayer, SourceRef};
use super::settings::LedgerSettings;
use crate::ports::ledger_store::LedgerStore;

/// Prefix of identity keys minted for imported candidates.
pub const SOURCE_SKU_PREFIX: &str = "VINT";
/// Brand token used when a candidate has no brand.
pub const UNKNOWN_BRAND: &str = "UNKNOWN";
/// Platform every imported candidate is tagged with.
pub const SOURCE_PLATFORM: Platform = Platform::Vinted;

/// A listing discovered by the external marketplace search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub source_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub url: Option<String>,
    pub photos: Vec<String>,
    pub country: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Deterministic SKU for an external candidate: `VINT-<BRAND>-<source id>`.
pub fn identity_key(source_id: &str, brand: Option<&str>) -> String {
    let brand_token = brand
        .map(|b| {
            b.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_uppercase()
        })
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| UNKNOWN_BRAND.to_string());
    format!("{SOURCE_SKU_PREFIX}-{brand_token}-{}", source_id.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    InvalidPrice(Decimal),
    Banword(String),
    CountryNotAllowed(String),
    AlreadyImported(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "candidate has no {field}"),
            Self::InvalidPrice(price) => write!(f, "candidate price {price} is negative"),
            Self::Banword(word) => write!(f, "title contains banword: {word}"),
            Self::CountryNotAllowed(country) => {
                write!(f, "country {country} is not in the allowlist")
            }
            Self::AlreadyImported(sku) => write!(f, "already imported as {sku}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Draft(NewItem),
    Rejected(RejectReason),
}

/// Checks that need no store access, in order: required fields, banwords,
/// country allowlist.
fn screen(candidate: &Candidate, settings: &LedgerSettings) -> Option<RejectReason> {
    if candidate.source_id.trim().is_empty() {
        return Some(RejectReason::MissingField("source id"));
    }
    if candidate.title.trim().is_empty() {
        return Some(RejectReason::MissingField("title"));
    }
    if let Some(price) = candidate.price.filter(|p| *p < Decimal::ZERO) {
        return Some(RejectReason::InvalidPrice(price));
    }
    if let Some(word) = settings.banword_in(&candidate.title) {
        return Some(RejectReason::Banword(word.to_string()));
    }
    if let Some(country) = candidate.country.as_deref().filter(|c| !c.trim().is_empty()) {
        if !settings.country_allowed(country) {
            return Some(RejectReason::CountryNotAllowed(country.trim().to_uppercase()));
        }
    }
    None
}

fn to_draft(candidate: &Candidate, query_id: &str, sku: String, settings: &LedgerSettings) -> NewItem {
    NewItem {
        sku,
        name: candidate.title.trim().to_string(),
        category: None,
        size: candidate.size.clone(),
        condition: Some(Condition::Good),
        brand: candidate.brand.clone(),
        platforms: BTreeSet::from([SOURCE_PLATFORM]),
        purchase_price: None,
        fees_estimate: candidate
            .price
            .map(|p| percent_of(p, settings.fee_percent_for(SOURCE_PLATFORM))),
        shipping_payer: Some(ShippingPayer::Buyer),
        shipping_cost: Some(Decimal::ZERO),
        sale_price: candidate.price,
        purchased_at: None,
        listed_at: candidate.created_at,
        location: None,
        notes: candidate
            .url
            .as_ref()
            .map(|url| format!("Imported from {SOURCE_PLATFORM}. Original URL: {url}")),
        photos: candidate.photos.clone(),
        source: Some(SourceRef {
            item_id: candidate.source_id.trim().to_string(),
            query_id: query_id.to_string(),
        }),
    }
}

/// Map a candidate to a draft item or a rejection.
///
/// Rejections are ordinary outcomes; `Err` means the store lookup failed.
pub fn normalize<S>(
    candidate: &Candidate,
    query_id: &str,
    settings: &LedgerSettings,
    store: &S,
) -> Result<Normalized, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    if let Some(reason) = screen(candidate, settings) {
        return Ok(Normalized::Rejected(reason));
    }

    let sku = identity_key(&candidate.source_id, candidate.brand.as_deref());
    if store.find_item_by_sku(&sku)?.is_some() {
        return Ok(Normalized::Rejected(RejectReason::AlreadyImported(sku)));
    }

    Ok(Normalized::Draft(to_draft(candidate, query_id, sku, settings)))
}
