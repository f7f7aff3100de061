//! Workflow reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::item::ItemId;
use super::sale::SaleId;

entity_id!(
    /// Task identifier.
    TaskId
);

labelled_enum! {
    pub enum TaskPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Urgent => "Urgent",
    }
}

labelled_enum! {
    pub enum TaskStatus {
        Todo => "Todo",
        InProgress => "In Progress",
        Done => "Done",
        Cancelled => "Cancelled",
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Todo, Self::InProgress) => true,
            (Self::Todo | Self::InProgress, Self::Done | Self::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub item_id: Option<ItemId>,
    pub sale_id: Option<SaleId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: TaskPriority::Medium,
            due_date: None,
            item_id: None,
            sale_id: None,
        }
    }
}

/// Item and sale links are nulled, not cascaded, when the referent goes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub item_id: Option<ItemId>,
    pub sale_id: Option<SaleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn create(new: NewTask, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if new.title.trim().is_empty() {
            return Err(LedgerError::validation("task title cannot be empty"));
        }
        Ok(Self {
            id: TaskId::new(),
            title: new.title.trim().to_string(),
            description: new.description,
            priority: new.priority,
            status: TaskStatus::Todo,
            due_date: new.due_date,
            item_id: new.item_id,
            sale_id: new.sale_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition_to(&mut self, next: TaskStatus, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::invalid_transition("task", self.status, next));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
