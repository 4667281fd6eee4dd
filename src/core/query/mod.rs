//! Who-can queries over stored access facts
//!
//! A rule answers a filter when its permission matches at least one
//! permission pattern and its resource matches at least one resource pattern.
//! In wildcard mode the query's permission patterns expand against the stored
//! action, while resources are compared with the symmetric matcher so that
//! stored ARN wildcards (`arn:aws:s3:::bucket/*`) meet query wildcards halfway.

mod cache;

pub use cache::{MatchCache, MatchMode};

use crate::core::acl::AccessControlRule;
use crate::core::iam::PatternMatcher;
use crate::core::store::RuleStore;
use crate::error::Result;
use tracing::debug;

/// Default number of cached match results
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Query patterns for a who-can lookup
///
/// Patterns keep insertion order; adding one twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    permissions: Vec<String>,
    resources: Vec<String>,
    exact: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission pattern
    pub fn permission(mut self, pattern: impl Into<String>) -> Self {
        self.add_permission(pattern);
        self
    }

    /// Add a resource pattern
    pub fn resource(mut self, pattern: impl Into<String>) -> Self {
        self.add_resource(pattern);
        self
    }

    /// Compare with plain equality instead of wildcards
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Returns false if the pattern was already present
    pub fn add_permission(&mut self, pattern: impl Into<String>) -> bool {
        insert_unique(&mut self.permissions, pattern.into())
    }

    /// Returns false if the pattern was already present
    pub fn add_resource(&mut self, pattern: impl Into<String>) -> bool {
        insert_unique(&mut self.resources, pattern.into())
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

fn insert_unique(set: &mut Vec<String>, pattern: String) -> bool {
    if set.contains(&pattern) {
        return false;
    }
    set.push(pattern);
    true
}

/// Applies filters to the rules held by a store
pub struct QueryEngine<S: RuleStore> {
    store: S,
    cache: MatchCache,
}

impl<S: RuleStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_cache_capacity(store, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(store: S, capacity: usize) -> Self {
        QueryEngine {
            store,
            cache: MatchCache::new(capacity),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store access for refreshes
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Rules that answer `filter`, in store order
    ///
    /// Store failures are returned unchanged.
    pub fn find(&mut self, filter: &Filter) -> Result<Vec<AccessControlRule>> {
        if filter.permissions().is_empty() || filter.resources().is_empty() {
            return Ok(Vec::new());
        }

        let candidates =
            self.store
                .scan(filter.resources(), filter.permissions(), filter.is_exact())?;
        let scanned = candidates.len();

        let hits: Vec<AccessControlRule> = candidates
            .into_iter()
            .filter(|rule| self.accepts(filter, rule))
            .collect();

        debug!(
            scanned,
            rules = hits.len(),
            exact = filter.is_exact(),
            "who-can query"
        );
        Ok(hits)
    }

    fn accepts(&mut self, filter: &Filter, rule: &AccessControlRule) -> bool {
        if filter.is_exact() {
            return filter
                .permissions()
                .iter()
                .any(|p| PatternMatcher::exact(p, &rule.permission))
                && filter
                    .resources()
                    .iter()
                    .any(|p| PatternMatcher::exact(p, &rule.resource));
        }

        let cache = &mut self.cache;
        filter
            .permissions()
            .iter()
            .any(|p| cache.check(MatchMode::Glob, p, &rule.permission))
            && filter
                .resources()
                .iter()
                .any(|p| cache.check(MatchMode::Symmetric, p, &rule.resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::GrantChain;
    use crate::core::iam::{Principal, PrincipalType};
    use crate::core::store::SqliteRuleStore;
    use crate::error::SnitchError;

    fn rule(permission: &str, resource: &str) -> AccessControlRule {
        AccessControlRule {
            principal: Principal::new(PrincipalType::Aws, "arn:aws:iam::111122223333:role/TestRole"),
            permission: permission.to_string(),
            resource: resource.to_string(),
            grant_chain: GrantChain::assumed(
                "arn:aws:iam::111122223333:role/SomeRole",
                "arn:aws:iam::111122223333:policy/TestPolicy",
            ),
        }
    }

    fn engine() -> QueryEngine<SqliteRuleStore> {
        let mut store = SqliteRuleStore::open_in_memory().unwrap();
        store
            .upsert_all(&[
                rule("*", "*"),
                rule("ec2:CreateInstance", "arn:aws:ec2:*:*:instance/someinstanceid"),
            ])
            .unwrap();
        QueryEngine::new(store)
    }

    #[test]
    fn test_wildcard_permission_query() {
        let mut engine = engine();
        let filter = Filter::new().permission("ec2:Create*").resource("*");

        let hits = engine.find(&filter).unwrap();
        assert_eq!(
            hits,
            vec![rule("ec2:CreateInstance", "arn:aws:ec2:*:*:instance/someinstanceid")]
        );
    }

    #[test]
    fn test_exact_mode_takes_star_literally() {
        let mut engine = engine();

        let filter = Filter::new().permission("ec2:Create*").resource("*").exact(true);
        assert!(engine.find(&filter).unwrap().is_empty());

        let filter = Filter::new().permission("*").resource("*").exact(true);
        assert_eq!(engine.find(&filter).unwrap(), vec![rule("*", "*")]);
    }

    #[test]
    fn test_stored_resource_wildcards_meet_query() {
        let mut engine = engine();
        let filter = Filter::new()
            .permission("ec2:CreateInstance")
            .resource("arn:aws:ec2:us-east-1:111122223333:instance/someinstanceid");

        let hits = engine.find(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].permission, "ec2:CreateInstance");
    }

    #[test]
    fn test_any_pattern_may_match() {
        let mut engine = engine();
        let filter = Filter::new()
            .permission("s3:GetObject")
            .permission("ec2:*")
            .resource("*");

        assert_eq!(engine.find(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_pattern_list_matches_nothing() {
        let mut engine = engine();
        assert!(engine.find(&Filter::new().resource("*")).unwrap().is_empty());
        assert!(engine.find(&Filter::new().permission("*")).unwrap().is_empty());
    }

    #[test]
    fn test_results_keep_store_order() {
        let mut engine = engine();
        let hits = engine.find(&Filter::new().permission("*").resource("*")).unwrap();

        let permissions: Vec<&str> = hits.iter().map(|r| r.permission.as_str()).collect();
        assert_eq!(permissions, vec!["*", "ec2:CreateInstance"]);
    }

    #[test]
    fn test_matches_are_cached() {
        let mut engine = engine();
        let filter = Filter::new().permission("ec2:Create*").resource("*");

        engine.find(&filter).unwrap();
        let cached = engine.cache().len();
        assert!(cached > 0);

        engine.find(&filter).unwrap();
        assert_eq!(engine.cache().len(), cached);
    }

    #[test]
    fn test_filter_set_semantics() {
        let mut filter = Filter::new();
        assert!(filter.add_permission("s3:*"));
        assert!(filter.add_permission("ec2:*"));
        assert!(!filter.add_permission("s3:*"));

        assert_eq!(filter.permissions(), ["s3:*", "ec2:*"]);
        assert!(!filter.is_exact());
    }

    struct BrokenStore;

    impl RuleStore for BrokenStore {
        fn upsert(&mut self, _rule: &AccessControlRule) -> Result<()> {
            Err(SnitchError::Persist("read-only".into()))
        }

        fn scan(&self, _: &[String], _: &[String], _: bool) -> Result<Vec<AccessControlRule>> {
            Err(SnitchError::Query("disk I/O error".into()))
        }

        fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_store_errors_pass_through() {
        let mut engine = QueryEngine::new(BrokenStore);
        let err = engine
            .find(&Filter::new().permission("*").resource("*"))
            .unwrap_err();

        assert!(matches!(err, SnitchError::Query(ref m) if m == "disk I/O error"));
    }
}
