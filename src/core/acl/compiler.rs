//! ACL compiler
//!
//! Expands a role's trust principals and attached policies into atomic access
//! facts. Only `Allow` statements produce facts; there is no deny or override
//! evaluation. The compiler does no I/O and keeps every combination it sees,
//! duplicates included, so each fact carries its own provenance.

use super::grant::GrantChain;
use super::rule::AccessControlRule;
use crate::core::iam::{IdentityPolicy, Principal};
use tracing::debug;

/// Compiles access facts for one role
pub struct AclCompiler<'a> {
    role_arn: &'a str,
    principals: &'a [Principal],
}

impl<'a> AclCompiler<'a> {
    /// Create a compiler for `role_arn`, assumable by `principals`
    pub fn new(role_arn: &'a str, principals: &'a [Principal]) -> Self {
        AclCompiler {
            role_arn,
            principals,
        }
    }

    /// Compile every attached policy
    ///
    /// # Examples
    /// ```
    /// use iam_snitch::{AclCompiler, IdentityPolicy, Principal, PrincipalType};
    ///
    /// let principals = vec![Principal::new(PrincipalType::Service, "ec2.amazonaws.com")];
    /// let policy = IdentityPolicy::parse(
    ///     "arn:aws:iam::111122223333:policy/Logs",
    ///     "Logs",
    ///     r#"{"Statement":{"Effect":"Allow","Action":"logs:PutLogEvents","Resource":"*"}}"#,
    /// ).unwrap();
    ///
    /// let rules = AclCompiler::new("arn:aws:iam::111122223333:role/Web", &principals)
    ///     .compile(&[policy]);
    ///
    /// assert_eq!(rules.len(), 1);
    /// assert_eq!(rules[0].permission, "logs:PutLogEvents");
    /// ```
    pub fn compile(&self, policies: &[IdentityPolicy]) -> Vec<AccessControlRule> {
        let mut rules = Vec::new();
        for policy in policies {
            self.compile_policy(policy, &mut rules);
        }
        rules
    }

    /// Append the facts granted by a single policy
    pub fn compile_policy(&self, policy: &IdentityPolicy, out: &mut Vec<AccessControlRule>) {
        let before = out.len();
        let chain = GrantChain::assumed(self.role_arn, &policy.arn);

        for statement in policy.document.allow_statements() {
            for resource in &statement.resources {
                for action in &statement.actions {
                    for principal in self.principals {
                        out.push(AccessControlRule {
                            principal: principal.clone(),
                            permission: action.clone(),
                            resource: resource.clone(),
                            grant_chain: chain.clone(),
                        });
                    }
                }
            }
        }

        debug!(
            role = self.role_arn,
            policy = %policy.arn,
            rules = out.len() - before,
            "compiled policy"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::GrantKind;
    use crate::core::iam::{PolicyDocument, PrincipalType, Statement};

    const ROLE: &str = "arn:aws:iam::111122223333:role/SomeRole";
    const POLICY: &str = "arn:aws:iam::111122223333:policy/TestPolicy";

    fn test_principal() -> Vec<Principal> {
        vec![Principal::new(PrincipalType::Aws, "arn:aws:iam::111122223333:role/TestRole")]
    }

    fn policy(arn: &str, statements: Vec<Statement>) -> IdentityPolicy {
        IdentityPolicy {
            arn: arn.to_string(),
            name: arn.rsplit('/').next().unwrap_or(arn).to_string(),
            document: PolicyDocument {
                version: Some("2012-10-17".to_string()),
                statements,
            },
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_rule_per_resource() {
        let principals = test_principal();
        let policies = vec![policy(
            POLICY,
            vec![Statement::new(
                "Allow",
                strings(&["ec2:CreateInstance"]),
                strings(&[
                    "arn:aws:ec2:*:*:instance/someinstanceid",
                    "arn:aws:ec2:*:*:instance/someotherinstance",
                ]),
            )],
        )];

        let rules = AclCompiler::new(ROLE, &principals).compile(&policies);

        assert_eq!(rules.len(), 2);
        for (rule, resource) in rules.iter().zip([
            "arn:aws:ec2:*:*:instance/someinstanceid",
            "arn:aws:ec2:*:*:instance/someotherinstance",
        ]) {
            assert_eq!(rule.principal.to_string(), "AWS[arn:aws:iam::111122223333:role/TestRole]");
            assert_eq!(rule.permission, "ec2:CreateInstance");
            assert_eq!(rule.resource, resource);
            assert_eq!(rule.grant_chain, GrantChain::assumed(ROLE, POLICY));
        }
    }

    #[test]
    fn test_deny_compiles_to_nothing() {
        let principals = test_principal();
        let policies = vec![policy(
            POLICY,
            vec![Statement::new("Deny", strings(&["s3:*"]), strings(&["*"]))],
        )];

        assert!(AclCompiler::new(ROLE, &principals).compile(&policies).is_empty());
    }

    #[test]
    fn test_full_cross_product_order() {
        let principals = vec![
            Principal::new(PrincipalType::Service, "ec2.amazonaws.com"),
            Principal::new(PrincipalType::Aws, "arn:aws:iam::1:root"),
        ];
        let policies = vec![policy(
            POLICY,
            vec![Statement::new(
                "Allow",
                strings(&["s3:GetObject", "s3:PutObject"]),
                strings(&["arn:aws:s3:::a", "arn:aws:s3:::b"]),
            )],
        )];

        let rules = AclCompiler::new(ROLE, &principals).compile(&policies);
        let triples: Vec<(String, &str, &str)> = rules
            .iter()
            .map(|r| (r.principal.to_string(), r.permission.as_str(), r.resource.as_str()))
            .collect();

        assert_eq!(rules.len(), 8);
        assert_eq!(
            triples[..4],
            [
                ("Service[ec2.amazonaws.com]".to_string(), "s3:GetObject", "arn:aws:s3:::a"),
                ("AWS[arn:aws:iam::1:root]".to_string(), "s3:GetObject", "arn:aws:s3:::a"),
                ("Service[ec2.amazonaws.com]".to_string(), "s3:PutObject", "arn:aws:s3:::a"),
                ("AWS[arn:aws:iam::1:root]".to_string(), "s3:PutObject", "arn:aws:s3:::a"),
            ]
        );
    }

    #[test]
    fn test_no_dedup_across_policies() {
        let principals = test_principal();
        let statement = Statement::new("Allow", strings(&["s3:GetObject"]), strings(&["*"]));
        let policies = vec![
            policy("arn:aws:iam::1:policy/a", vec![statement.clone()]),
            policy("arn:aws:iam::1:policy/b", vec![statement]),
        ];

        let rules = AclCompiler::new(ROLE, &principals).compile(&policies);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].grant_chain.grants()[1].id, "arn:aws:iam::1:policy/a");
        assert_eq!(rules[1].grant_chain.grants()[1].id, "arn:aws:iam::1:policy/b");
        assert_eq!(rules[0].grant_chain.root().kind, GrantKind::Role);
    }

    #[test]
    fn test_no_principals_no_rules() {
        let policies = vec![policy(
            POLICY,
            vec![Statement::new("Allow", strings(&["*"]), strings(&["*"]))],
        )];

        assert!(AclCompiler::new(ROLE, &[]).compile(&policies).is_empty());
    }

    #[test]
    fn test_statement_without_resource_yields_nothing() {
        let principals = test_principal();
        let policies = vec![policy(
            POLICY,
            vec![Statement::new("Allow", strings(&["sts:AssumeRole"]), vec![])],
        )];

        assert!(AclCompiler::new(ROLE, &principals).compile(&policies).is_empty());
    }
}
