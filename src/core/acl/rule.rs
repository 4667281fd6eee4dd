//! Access facts

use super::grant::GrantChain;
use crate::core::iam::Principal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identity of an access fact, used as the upsert key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One derived Allow fact: `principal` may perform `permission` on `resource`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessControlRule {
    pub principal: Principal,
    pub permission: String,
    pub resource: String,
    pub grant_chain: GrantChain,
}

impl AccessControlRule {
    /// Stable key over principal, permission, resource and the role grant
    ///
    /// Two policies on the same role granting the same permission collapse to
    /// one key; the later upsert wins.
    pub fn id(&self) -> RuleId {
        let mut hasher = Sha256::new();
        for part in [
            self.principal.to_string(),
            self.permission.clone(),
            self.resource.clone(),
            self.grant_chain.root().to_string(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        RuleId(format!("{:x}", hasher.finalize()))
    }
}
