//! Optimistic concurrency expectations for aggregate streams.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for an aggregate.
///
/// The version is the number of events persisted in the aggregate's stream at
/// the time its baseline state was loaded. `Exact(0)` therefore means "the
/// aggregate must not exist yet".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent appends, migrations, etc.).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

impl From<u64> for ExpectedVersion {
    fn from(value: u64) -> Self {
        ExpectedVersion::Exact(value)
    }
}
