//! Refresh driver
//!
//! Walks every role an identity source knows about, a page at a time, and
//! persists the compiled access facts. Each page's facts are written in one
//! batch before the next page is requested.
//!
//! Parse failures are isolated: a malformed attached policy is skipped and the
//! role is compiled from the rest, while a malformed trust policy skips the
//! role. Fetch and persist failures abort the refresh.

use crate::core::acl::{AccessControlRule, AclCompiler};
use crate::core::iam::{IdentityPolicy, TrustPolicy};
use crate::core::source::{IdentitySource, PageToken, Role};
use crate::core::store::RuleStore;
use crate::error::{Result, SnitchError};
use serde::Serialize;
use tracing::{error, info, warn};

/// Totals for one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Role pages fetched
    pub pages: usize,
    /// Roles visited, skipped ones included
    pub roles: usize,
    /// Rules compiled and upserted (rules sharing an ID collapse in the store)
    pub rules: usize,
    pub skipped_roles: usize,
    pub skipped_policies: usize,
}

/// Drives a full recompile of a store from an identity source
pub struct Refresher<'a, S: RuleStore> {
    store: &'a mut S,
}

impl<'a, S: RuleStore> Refresher<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Refresher { store }
    }

    /// Fetch, compile and persist every role
    pub fn run<I: IdentitySource + ?Sized>(&mut self, source: &I) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();
        let mut token: Option<PageToken> = None;

        loop {
            let page = source.list_roles(token.as_ref()).map_err(abort)?;
            report.pages += 1;

            let mut rules = Vec::new();
            for role in &page.roles {
                Self::compile_role(source, role, &mut report, &mut rules).map_err(abort)?;
            }

            self.store.upsert_all(&rules).map_err(abort)?;
            report.rules += rules.len();

            info!(
                page = report.pages,
                roles = page.roles.len(),
                rules = rules.len(),
                "page persisted"
            );

            if !page.next.has_next() {
                break;
            }
            token = Some(page.next);
        }

        info!(
            "Refresh complete: {} roles, {} rules, {} roles and {} policies skipped",
            report.roles, report.rules, report.skipped_roles, report.skipped_policies
        );
        Ok(report)
    }

    fn compile_role<I: IdentitySource + ?Sized>(
        source: &I,
        role: &Role,
        report: &mut RefreshReport,
        out: &mut Vec<AccessControlRule>,
    ) -> Result<()> {
        report.roles += 1;

        let trust = source
            .get_assume_role_policy_document(role)
            .map_err(|e| e.with_role(&role.arn))?;
        let principals = match TrustPolicy::parse(&trust) {
            Ok(trust) => trust.principals(),
            Err(e) if e.is_parse() => {
                let e = e.with_role(&role.arn);
                warn!(role = %role.arn, error = %e, "skipping role with unreadable trust policy");
                report.skipped_roles += 1;
                return Ok(());
            }
            Err(e) => return Err(e.with_role(&role.arn)),
        };

        let attached = source
            .list_attached_policies(role)
            .map_err(|e| e.with_role(&role.arn))?;

        let mut policies = Vec::with_capacity(attached.len());
        for policy_ref in &attached {
            let document = source
                .get_policy_document(policy_ref)
                .map_err(|e| e.with_policy(&policy_ref.arn).with_role(&role.arn))?;

            match IdentityPolicy::parse(&policy_ref.arn, &policy_ref.name, &document) {
                Ok(policy) => policies.push(policy),
                Err(e) if e.is_parse() => {
                    let e = e.with_role(&role.arn);
                    warn!(role = %role.arn, policy = %policy_ref.arn, error = %e, "skipping unreadable policy");
                    report.skipped_policies += 1;
                }
                Err(e) => return Err(e.with_role(&role.arn)),
            }
        }

        let rules = AclCompiler::new(&role.arn, &principals).compile(&policies);
        info!(role = %role.arn, rules = rules.len(), "{} rules found for role {}", rules.len(), role.name);
        out.extend(rules);
        Ok(())
    }
}

fn abort(err: SnitchError) -> SnitchError {
    error!(error = %err, "refresh aborted");
    err
}
