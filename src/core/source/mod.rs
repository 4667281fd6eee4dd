//! Identity sources
//!
//! An identity source lists roles a page at a time and hands out the raw
//! policy documents attached to them. Network clients, retries and timeouts
//! belong behind this trait; the refresh driver only sees documents.

mod snapshot;

pub use snapshot::{SnapshotSource, DEFAULT_PAGE_SIZE};

use crate::error::Result;

/// A role that may carry trust and identity policies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub arn: String,
}

/// Reference to a managed policy attached to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRef {
    pub name: String,
    pub arn: String,
}

/// Pagination cursor returned with each page of roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageToken {
    marker: Option<String>,
}

impl PageToken {
    pub fn new(marker: Option<String>) -> Self {
        PageToken { marker }
    }

    /// Cursor that signals the last page
    pub fn end() -> Self {
        PageToken { marker: None }
    }

    /// Marker to request the following page with
    pub fn next(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.marker.is_some()
    }
}

/// One page of roles plus the cursor for the next one
#[derive(Debug, Clone)]
pub struct RolePage {
    pub roles: Vec<Role>,
    pub next: PageToken,
}

/// Where roles and policy documents come from
pub trait IdentitySource {
    /// List a page of roles; `None` requests the first page
    fn list_roles(&self, page: Option<&PageToken>) -> Result<RolePage>;

    /// Managed policies attached to `role`
    fn list_attached_policies(&self, role: &Role) -> Result<Vec<PolicyRef>>;

    /// Default-version document of an attached policy, as raw (possibly percent-encoded) JSON
    fn get_policy_document(&self, policy: &PolicyRef) -> Result<String>;

    /// Trust policy of `role`, as raw (possibly percent-encoded) JSON
    fn get_assume_role_policy_document(&self, role: &Role) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_token() {
        let token = PageToken::new(Some("100".to_string()));
        assert!(token.has_next());
        assert_eq!(token.next(), Some("100"));

        assert!(!PageToken::end().has_next());
        assert_eq!(PageToken::default(), PageToken::end());
    }
}
