//! Core domain types and logic.

#[macro_use]
mod macros;

pub mod accounting;
pub mod candidate;
pub mod config_validation;
pub mod error;
pub mod event;
pub mod item;
pub mod ledger;
pub mod reconcile;
pub mod return_case;
pub mod sale;
pub mod seed;
pub mod settings;
pub mod shipment;
pub mod stats;
pub mod task;
