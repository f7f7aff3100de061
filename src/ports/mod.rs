//! Port traits: the boundaries between domain logic and the outside world.

pub mod candidate_source;
pub mod config_port;
pub mod ledger_store;
