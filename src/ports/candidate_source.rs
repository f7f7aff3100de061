//! External candidate search port.

use crate::domain::candidate::Candidate;
use crate::domain::error::LedgerError;

pub trait CandidateSource {
    /// All candidates currently returned by the saved search `query_id`.
    ///
    /// A failed fetch is reported as [`LedgerError::SourceUnavailable`].
    fn fetch_candidates(&self, query_id: &str) -> Result<Vec<Candidate>, LedgerError>;
}
