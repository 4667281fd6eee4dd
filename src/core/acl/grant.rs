//! Grant provenance
//!
//! Every access fact carries the chain of grants that justifies it: the role
//! the principal could assume, then the policy attached to that role.

use crate::error::{Result, SnitchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of provenance edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    /// Evidence that the principal can assume a role
    Role,
    /// Evidence that a policy is attached to the role
    Policy,
}

impl GrantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::Role => "Role",
            GrantKind::Policy => "Policy",
        }
    }
}

/// One edge of provenance, serialized as `Kind:ID`
///
/// # Examples
/// ```
/// use iam_snitch::{Grant, GrantKind};
///
/// let grant: Grant = "Role:arn:aws:iam::111122223333:role/Deploy".parse().unwrap();
/// assert_eq!(grant.kind, GrantKind::Role);
/// assert_eq!(grant.id, "arn:aws:iam::111122223333:role/Deploy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Grant {
    pub kind: GrantKind,
    pub id: String,
}

impl Grant {
    pub fn role(arn: impl Into<String>) -> Self {
        Grant {
            kind: GrantKind::Role,
            id: arn.into(),
        }
    }

    pub fn policy(arn: impl Into<String>) -> Self {
        Grant {
            kind: GrantKind::Policy,
            id: arn.into(),
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for Grant {
    type Err = SnitchError;

    fn from_str(s: &str) -> Result<Self> {
        // IDs are ARNs and contain ':' themselves
        match s.split_once(':') {
            Some(("Role", id)) => Ok(Grant::role(id)),
            Some(("Policy", id)) => Ok(Grant::policy(id)),
            _ => Err(SnitchError::parse(format!("malformed grant '{}'", s))),
        }
    }
}

impl From<Grant> for String {
    fn from(grant: Grant) -> Self {
        grant.to_string()
    }
}

impl TryFrom<String> for Grant {
    type Error = SnitchError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Ordered, non-empty justification for an access fact
///
/// The first grant is always the role grant; compiled chains are exactly
/// `[Role, Policy]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GrantChain(Vec<Grant>);

impl GrantChain {
    /// Chain for a permission reached by assuming `role_arn` and using `policy_arn`
    pub fn assumed(role_arn: &str, policy_arn: &str) -> Self {
        GrantChain(vec![Grant::role(role_arn), Grant::policy(policy_arn)])
    }

    /// Rebuild a chain from stored grants
    pub fn from_grants(grants: Vec<Grant>) -> Result<Self> {
        match grants.first() {
            None => Err(SnitchError::parse("grant chain is empty")),
            Some(first) if first.kind != GrantKind::Role => Err(SnitchError::parse(format!(
                "grant chain must start with a role grant, found '{}'",
                first
            ))),
            Some(_) => Ok(GrantChain(grants)),
        }
    }

    /// The role grant heading the chain
    pub fn root(&self) -> &Grant {
        &self.0[0]
    }

    pub fn grants(&self) -> &[Grant] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for GrantChain {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let grants = Vec::<Grant>::deserialize(deserializer)?;
        GrantChain::from_grants(grants).map_err(serde::de::Error::custom)
    }
}
