//! Identity source backed by an authorization-details snapshot
//!
//! Reads the JSON produced by `aws iam get-account-authorization-details`.
//! Only roles and managed policies are used; users, groups and inline policies
//! are ignored. Policy documents may be embedded as JSON objects (what the CLI
//! prints) or as percent-encoded strings (what the raw API returns).

use super::{IdentitySource, PageToken, PolicyRef, Role, RolePage};
use crate::error::{Result, SnitchError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Roles served per page unless overridden
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthorizationDetails {
    #[serde(default)]
    role_detail_list: Vec<RoleDetail>,
    #[serde(default)]
    policies: Vec<ManagedPolicyDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleDetail {
    role_name: String,
    arn: String,
    assume_role_policy_document: Value,
    #[serde(default)]
    attached_managed_policies: Vec<AttachedPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttachedPolicy {
    policy_name: String,
    policy_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManagedPolicyDetail {
    arn: String,
    default_version_id: Option<String>,
    #[serde(default)]
    policy_version_list: Vec<PolicyVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyVersion {
    document: Value,
    version_id: Option<String>,
    #[serde(default)]
    is_default_version: bool,
}

impl ManagedPolicyDetail {
    /// The default version's document
    fn default_document(&self) -> Option<&Value> {
        let by_id = self.default_version_id.as_ref().and_then(|default| {
            self.policy_version_list
                .iter()
                .find(|v| v.version_id.as_ref() == Some(default))
        });

        by_id
            .or_else(|| self.policy_version_list.iter().find(|v| v.is_default_version))
            .map(|v| &v.document)
    }
}

/// Embedded documents become JSON text; encoded strings pass through
fn document_text(document: &Value) -> Result<String> {
    match document {
        Value::String(raw) => Ok(raw.clone()),
        Value::Object(_) => serde_json::to_string(document)
            .map_err(|e| SnitchError::fetch(format!("unable to re-serialize document: {}", e))),
        _ => Err(SnitchError::fetch("policy document is neither a string nor an object")),
    }
}

#[derive(Debug, Clone)]
struct RoleEntry {
    role: Role,
    trust_document: String,
    attached: Vec<PolicyRef>,
}

/// Offline identity source
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    roles: Vec<RoleEntry>,
    documents: HashMap<String, String>,
    page_size: usize,
}

impl SnapshotSource {
    /// Empty source, populated with [`add_role`](Self::add_role) and
    /// [`add_policy`](Self::add_policy)
    pub fn new() -> Self {
        SnapshotSource {
            roles: Vec::new(),
            documents: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Load a snapshot file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading authorization details from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load a snapshot from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let details: AuthorizationDetails = serde_json::from_str(text)
            .map_err(|e| SnitchError::fetch(format!("invalid authorization details: {}", e)))?;

        let mut source = SnapshotSource::new();

        for policy in &details.policies {
            match policy.default_document() {
                Some(document) => {
                    let text = document_text(document).map_err(|e| e.with_policy(&policy.arn))?;
                    source.documents.insert(policy.arn.clone(), text);
                }
                None => debug!(policy = %policy.arn, "policy has no default version"),
            }
        }

        for detail in details.role_detail_list {
            let trust_document = document_text(&detail.assume_role_policy_document)
                .map_err(|e| e.with_role(&detail.arn))?;
            source.roles.push(RoleEntry {
                role: Role {
                    name: detail.role_name,
                    arn: detail.arn,
                },
                trust_document,
                attached: detail
                    .attached_managed_policies
                    .into_iter()
                    .map(|p| PolicyRef {
                        name: p.policy_name,
                        arn: p.policy_arn,
                    })
                    .collect(),
            });
        }

        info!(
            "Loaded {} roles and {} policies",
            source.roles.len(),
            source.documents.len()
        );
        Ok(source)
    }

    /// Serve `page_size` roles per page (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add a role with its trust document and attached policies `(name, arn)`
    pub fn add_role(
        &mut self,
        name: &str,
        arn: &str,
        trust_document: &str,
        attached: &[(&str, &str)],
    ) -> &mut Self {
        self.roles.push(RoleEntry {
            role: Role {
                name: name.to_string(),
                arn: arn.to_string(),
            },
            trust_document: trust_document.to_string(),
            attached: attached
                .iter()
                .map(|(name, arn)| PolicyRef {
                    name: name.to_string(),
                    arn: arn.to_string(),
                })
                .collect(),
        });
        self
    }

    /// Add the default-version document of a managed policy
    pub fn add_policy(&mut self, arn: &str, document: &str) -> &mut Self {
        self.documents.insert(arn.to_string(), document.to_string());
        self
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    fn entry(&self, role: &Role) -> Result<&RoleEntry> {
        self.roles
            .iter()
            .find(|entry| entry.role.arn == role.arn)
            .ok_or_else(|| SnitchError::fetch("role not found in snapshot").with_role(&role.arn))
    }
}

impl Default for SnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource for SnapshotSource {
    fn list_roles(&self, page: Option<&PageToken>) -> Result<RolePage> {
        let offset = match page.and_then(PageToken::next) {
            Some(marker) => marker
                .parse::<usize>()
                .map_err(|_| SnitchError::fetch(format!("invalid page marker '{}'", marker)))?,
            None => 0,
        };
        if offset > self.roles.len() {
            return Err(SnitchError::fetch(format!(
                "page marker {} is past the last role ({})",
                offset,
                self.roles.len()
            )));
        }

        let end = offset.saturating_add(self.page_size).min(self.roles.len());
        let roles = self
            .roles
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.role.clone())
            .collect();

        let next = if end < self.roles.len() {
            PageToken::new(Some(end.to_string()))
        } else {
            PageToken::end()
        };

        Ok(RolePage { roles, next })
    }

    fn list_attached_policies(&self, role: &Role) -> Result<Vec<PolicyRef>> {
        Ok(self.entry(role)?.attached.clone())
    }

    fn get_policy_document(&self, policy: &PolicyRef) -> Result<String> {
        self.documents.get(&policy.arn).cloned().ok_or_else(|| {
            SnitchError::fetch("policy document not found in snapshot").with_policy(&policy.arn)
        })
    }

    fn get_assume_role_policy_document(&self, role: &Role) -> Result<String> {
        Ok(self.entry(role)?.trust_document.clone())
    }
}
