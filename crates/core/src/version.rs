//! Optimistic concurrency expectation for a ledger key.

use crate::error::{CostingError, CostingResult};

/// Expected stream version for an append against one
/// (tenant, item, location) key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (the store still serializes the
    /// read-then-write per key).
    Any,
    /// Require the key's stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> CostingResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(CostingError::concurrent(format!(
                "stale aggregate read (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
