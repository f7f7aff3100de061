//! Persisted ledger settings and their typed snapshot.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::error::LedgerError;
use super::item::Platform;

labelled_enum! {
    /// Keys of the process-wide settings table.
    pub enum SettingKey {
        IntegrationEnabled => "vinted_integration_enabled",
        SyncInterval => "vinted_sync_interval",
        LastSync => "vinted_last_sync",
        VintedFeePercent => "vinted_fee_percent",
        EbayFeePercent => "ebay_fee_percent",
        DepopFeePercent => "depop_fee_percent",
        DefaultShippingCost => "default_shipping_cost",
        Banwords => "banwords",
        CountryAllowlist => "country_allowlist",
    }
}

/// Separator used by the `banwords` setting.
pub const BANWORD_SEPARATOR: &str = "|||";

impl SettingKey {
    pub fn default_value(self) -> &'static str {
        match self {
            Self::IntegrationEnabled => "false",
            Self::SyncInterval => "60",
            Self::LastSync => "0",
            Self::VintedFeePercent => "10",
            Self::EbayFeePercent => "12.8",
            Self::DepopFeePercent => "10",
            Self::DefaultShippingCost => "0",
            Self::Banwords | Self::CountryAllowlist => "",
        }
    }

    /// Check and canonicalise a value before it is written.
    pub fn normalize_value(self, raw: &str) -> Result<String, LedgerError> {
        let value = raw.trim();
        let invalid = |reason: &str| {
            LedgerError::validation(format!("setting {}: {reason}, got `{value}`", self))
        };
        match self {
            Self::IntegrationEnabled => parse_bool(value)
                .map(|b| b.to_string())
                .ok_or_else(|| invalid("expected true or false")),
            Self::SyncInterval => match value.parse::<u32>() {
                Ok(minutes) if minutes > 0 => Ok(minutes.to_string()),
                _ => Err(invalid("expected a positive number of minutes")),
            },
            Self::LastSync => value
                .parse::<i64>()
                .ok()
                .filter(|ts| *ts >= 0)
                .map(|ts| ts.to_string())
                .ok_or_else(|| invalid("expected unix seconds")),
            Self::VintedFeePercent | Self::EbayFeePercent | Self::DepopFeePercent => {
                match Decimal::from_str(value) {
                    Ok(p) if p >= Decimal::ZERO && p <= Decimal::ONE_HUNDRED => Ok(p.to_string()),
                    _ => Err(invalid("expected a percentage between 0 and 100")),
                }
            }
            Self::DefaultShippingCost => match Decimal::from_str(value) {
                Ok(c) if c >= Decimal::ZERO => Ok(c.to_string()),
                _ => Err(invalid("expected a non-negative amount")),
            },
            Self::Banwords => Ok(split_banwords(value).join(BANWORD_SEPARATOR)),
            Self::CountryAllowlist => Ok(split_countries(value).join(",")),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn split_banwords(value: &str) -> Vec<String> {
    value
        .split(BANWORD_SEPARATOR)
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn split_countries(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Settings read once at the start of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSettings {
    pub integration_enabled: bool,
    pub sync_interval_minutes: u32,
    pub last_sync: Option<DateTime<Utc>>,
    pub vinted_fee_percent: Decimal,
    pub ebay_fee_percent: Decimal,
    pub depop_fee_percent: Decimal,
    pub default_shipping_cost: Decimal,
    pub banwords: Vec<String>,
    pub country_allowlist: Vec<String>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            integration_enabled: false,
            sync_interval_minutes: 60,
            last_sync: None,
            vinted_fee_percent: Decimal::TEN,
            ebay_fee_percent: Decimal::new(128, 1),
            depop_fee_percent: Decimal::TEN,
            default_shipping_cost: Decimal::ZERO,
            banwords: Vec::new(),
            country_allowlist: Vec::new(),
        }
    }
}

impl LedgerSettings {
    /// Build a snapshot from a key lookup. Absent or unparsable values fall
    /// back to the key's default.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, LedgerError>
    where
        F: FnMut(&str) -> Result<Option<String>, LedgerError>,
    {
        let mut read = |key: SettingKey| -> Result<String, LedgerError> {
            let stored = lookup(key.as_str())?;
            Ok(match stored {
                Some(raw) => match key.normalize_value(&raw) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(setting = key.as_str(), error = %e, "ignoring invalid setting value");
                        key.default_value().to_string()
                    }
                },
                None => key.default_value().to_string(),
            })
        };

        let integration_enabled = read(SettingKey::IntegrationEnabled)? == "true";
        let sync_interval_minutes = read(SettingKey::SyncInterval)?.parse().unwrap_or(60);
        let last_sync = read(SettingKey::LastSync)?
            .parse::<i64>()
            .ok()
            .filter(|ts| *ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
        let decimal = |s: String| Decimal::from_str(&s).unwrap_or_default();

        Ok(Self {
            integration_enabled,
            sync_interval_minutes,
            last_sync,
            vinted_fee_percent: decimal(read(SettingKey::VintedFeePercent)?),
            ebay_fee_percent: decimal(read(SettingKey::EbayFeePercent)?),
            depop_fee_percent: decimal(read(SettingKey::DepopFeePercent)?),
            default_shipping_cost: decimal(read(SettingKey::DefaultShippingCost)?),
            banwords: split_banwords(&read(SettingKey::Banwords)?),
            country_allowlist: split_countries(&read(SettingKey::CountryAllowlist)?),
        })
    }

    pub fn fee_percent_for(&self, platform: Platform) -> Decimal {
        match platform {
            Platform::Vinted => self.vinted_fee_percent,
            Platform::Ebay => self.ebay_fee_percent,
            Platform::Depop => self.depop_fee_percent,
            Platform::Other => Decimal::ZERO,
        }
    }

    /// First configured banword contained in `title`, ignoring case.
    pub fn banword_in(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        self.banwords
            .iter()
            .find(|w| title.contains(w.as_str()))
            .map(String::as_str)
    }

    /// An empty allowlist admits every country.
    pub fn country_allowed(&self, country: &str) -> bool {
        self.country_allowlist.is_empty()
            || self
                .country_allowlist
                .iter()
                .any(|c| c.eq_ignore_ascii_case(country.trim()))
    }
}
