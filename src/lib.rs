//! # iam-snitch - Who Can Do What
//!
//! `iam-snitch` compiles IAM trust policies and attached permission policies
//! into flat access facts ("principal P may perform action A on resource R,
//! because it can assume role X which has policy Y attached"), stores them in
//! SQLite, and answers wildcard-aware who-can queries over them.
//!
//! - **Policy parsing** absorbing the string-or-array variance of IAM JSON
//! - **ACL compilation** with a grant chain recording how each fact was derived
//! - **Symmetric wildcard matching** where stored values and query patterns may
//!   both contain `*`
//! - **Offline ingestion** from `aws iam get-account-authorization-details` output
//!
//! ## Quick Start
//!
//! ```rust
//! use iam_snitch::{Filter, Snitch, SnapshotSource, Result};
//!
//! # fn main() -> Result<()> {
//! let mut source = SnapshotSource::new();
//! source
//!     .add_role(
//!         "Deploy",
//!         "arn:aws:iam::111122223333:role/Deploy",
//!         r#"{"Statement":{"Effect":"Allow","Action":"sts:AssumeRole","Principal":{"Service":"codebuild.amazonaws.com"}}}"#,
//!         &[("Artifacts", "arn:aws:iam::111122223333:policy/Artifacts")],
//!     )
//!     .add_policy(
//!         "arn:aws:iam::111122223333:policy/Artifacts",
//!         r#"{"Statement":{"Effect":"Allow","Action":"s3:PutObject","Resource":"arn:aws:s3:::artifacts/*"}}"#,
//!     );
//!
//! let mut snitch = Snitch::open_in_memory()?;
//! snitch.refresh(&source)?;
//!
//! let rules = snitch.who_can(
//!     &Filter::new()
//!         .permission("s3:Put*")
//!         .resource("arn:aws:s3:::artifacts/build.zip"),
//! )?;
//!
//! assert_eq!(rules.len(), 1);
//! assert_eq!(rules[0].principal.to_string(), "Service[codebuild.amazonaws.com]");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::{
    acl::{AccessControlRule, AclCompiler, Grant, GrantChain, GrantKind, RuleId},
    config::SnitchConfig,
    iam::{
        decode_document, IdentityPolicy, OneOrMany, PatternMatcher, PolicyDocument, Principal,
        PrincipalResolver, PrincipalType, Statement, TrustPolicy,
    },
    query::{Filter, MatchCache, QueryEngine},
    refresh::{RefreshReport, Refresher},
    source::{IdentitySource, PageToken, PolicyRef, Role, RolePage, SnapshotSource},
    store::{RuleStore, SqliteRuleStore},
};
pub use crate::error::{Result, SnitchError};

use tracing::info;

/// A rule store together with the query engine that reads it
pub struct Snitch {
    engine: QueryEngine<SqliteRuleStore>,
}

impl Snitch {
    /// Open the rule database named by `config`
    pub fn open(config: &SnitchConfig) -> Result<Self> {
        config.check()?;
        let store = SqliteRuleStore::open(&config.database)?;
        Ok(Snitch {
            engine: QueryEngine::with_cache_capacity(store, config.match_cache_capacity),
        })
    }

    /// Open a throwaway in-memory rule database
    pub fn open_in_memory() -> Result<Self> {
        let store = SqliteRuleStore::open_in_memory()?;
        Ok(Snitch {
            engine: QueryEngine::new(store),
        })
    }

    /// Recompile every role from `source` and upsert the results
    pub fn refresh<I: IdentitySource + ?Sized>(&mut self, source: &I) -> Result<RefreshReport> {
        let report = Refresher::new(self.engine.store_mut()).run(source)?;
        info!("{} rules stored", self.engine.store().count()?);
        Ok(report)
    }

    /// Stored rules answering `filter`
    pub fn who_can(&mut self, filter: &Filter) -> Result<Vec<AccessControlRule>> {
        self.engine.find(filter)
    }

    /// Number of stored rules
    pub fn rule_count(&self) -> Result<usize> {
        self.engine.store().count()
    }

    /// Get the underlying query engine
    pub fn engine(&self) -> &QueryEngine<SqliteRuleStore> {
        &self.engine
    }

    /// Get mutable access to the underlying query engine
    pub fn engine_mut(&mut self) -> &mut QueryEngine<SqliteRuleStore> {
        &mut self.engine
    }
}
