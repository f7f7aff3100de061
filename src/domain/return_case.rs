//! Return and dispute cases.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::item::{ensure_non_negative, Platform};
use super::sale::{Sale, SaleId};

entity_id!(
    /// Return case identifier.
    ReturnId
);

labelled_enum! {
    pub enum ReturnStatus {
        Open => "Open",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Rejected => "Rejected",
    }
}

impl ReturnStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

labelled_enum! {
    pub enum ReturnOutcome {
        Refunded => "Refunded",
        Replaced => "Replaced",
        Rejected => "Rejected",
        PartialRefund => "Partial Refund",
    }
}

impl ReturnOutcome {
    /// Outcomes that send money back to the buyer.
    pub fn is_refund(self) -> bool {
        matches!(self, Self::Refunded | Self::PartialRefund)
    }

    fn fits(self, status: ReturnStatus) -> bool {
        match status {
            ReturnStatus::Resolved => self != Self::Rejected,
            ReturnStatus::Rejected => self == Self::Rejected,
            ReturnStatus::Open | ReturnStatus::InProgress => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReturn {
    pub sale_id: SaleId,
    pub reason: String,
    pub notes: Option<String>,
}

/// Terminal decision for a case, applied atomically with the status change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub status: ReturnStatus,
    pub outcome: ReturnOutcome,
    pub refund_amount: Option<Decimal>,
}

/// Outcome is only set once the case is terminal, and `resolved_at` is set
/// exactly then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnCase {
    pub id: ReturnId,
    pub sale_id: Option<SaleId>,
    pub item_name: String,
    pub platform: Platform,
    pub reason: String,
    pub status: ReturnStatus,
    pub outcome: Option<ReturnOutcome>,
    pub refund_amount: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnCase {
    pub fn open(sale: &Sale, new: NewReturn, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if new.reason.trim().is_empty() {
            return Err(LedgerError::validation("return reason cannot be empty"));
        }
        Ok(Self {
            id: ReturnId::new(),
            sale_id: Some(sale.id),
            item_name: sale.item_name.clone(),
            platform: sale.platform,
            reason: new.reason.trim().to_string(),
            status: ReturnStatus::Open,
            outcome: None,
            refund_amount: None,
            opened_at: now,
            resolved_at: None,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != ReturnStatus::Open {
            return Err(LedgerError::invalid_transition(
                "return case",
                self.status,
                ReturnStatus::InProgress,
            ));
        }
        self.status = ReturnStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    /// `sale_price` bounds the refund when the owning sale is still known.
    pub fn resolve(
        &mut self,
        resolution: Resolution,
        sale_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.status.is_terminal() || !resolution.status.is_terminal() {
            return Err(LedgerError::invalid_transition(
                "return case",
                self.status,
                resolution.status,
            ));
        }
        if !resolution.outcome.fits(resolution.status) {
            return Err(LedgerError::validation(format!(
                "outcome {} does not fit status {}",
                resolution.outcome, resolution.status
            )));
        }
        ensure_non_negative("refund_amount", resolution.refund_amount)?;
        if resolution.refund_amount.is_some() && !resolution.outcome.is_refund() {
            return Err(LedgerError::validation(format!(
                "refund amount given for non-refund outcome {}",
                resolution.outcome
            )));
        }
        if let (Some(refund), Some(price)) = (resolution.refund_amount, sale_price) {
            if refund > price {
                return Err(LedgerError::validation(format!(
                    "refund {refund} exceeds sale price {price}"
                )));
            }
        }

        let refund_amount = match resolution.outcome {
            ReturnOutcome::Refunded => resolution.refund_amount.or(sale_price),
            _ => resolution.refund_amount,
        };

        self.status = resolution.status;
        self.outcome = Some(resolution.outcome);
        self.refund_amount = refund_amount;
        self.resolved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
