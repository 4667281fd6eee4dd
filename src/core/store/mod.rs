//! Persistence for compiled access facts
//!
//! The core only needs two things from a store: upsert by rule ID, and a scan
//! that returns a superset of the rules a filter could match. Matching itself
//! always happens in the query engine.

mod sqlite;

pub use sqlite::SqliteRuleStore;

use crate::core::acl::AccessControlRule;
use crate::error::Result;

/// A durable home for access facts
pub trait RuleStore {
    /// Insert `rule`, or replace the stored rule with the same ID in place
    fn upsert(&mut self, rule: &AccessControlRule) -> Result<()>;

    /// Upsert a batch; implementations should make the batch atomic
    fn upsert_all(&mut self, rules: &[AccessControlRule]) -> Result<()> {
        for rule in rules {
            self.upsert(rule)?;
        }
        Ok(())
    }

    /// Candidate rules for a query
    ///
    /// May pre-filter, but must never drop a rule that the query engine's
    /// matcher would accept.
    fn scan(
        &self,
        resource_patterns: &[String],
        permission_patterns: &[String],
        exact: bool,
    ) -> Result<Vec<AccessControlRule>>;

    /// Number of stored rules
    fn count(&self) -> Result<usize>;
}
