//! IAM policy document structure
//!
//! Identity policies and trust policies share one document shape:
//!
//! ```json
//! {
//!   "Version": "2012-10-17",
//!   "Statement": [
//!     {"Effect": "Allow", "Action": "sts:AssumeRole", "Principal": {"Service": "ec2.amazonaws.com"}}
//!   ]
//! }
//! ```
//!
//! Parsing goes through `serde_json::Value` rather than derived `Deserialize`
//! because every list-valued field may be a bare string.

use super::principal::{Principal, PrincipalResolver};
use super::shape::OneOrMany;
use crate::error::{Result, SnitchError};
use serde_json::{Map, Value};

/// Effect value that produces access facts
pub const ALLOW: &str = "Allow";

/// A single policy statement in canonical shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement ID (optional)
    pub sid: Option<String>,

    /// Effect as written; only `"Allow"` is compiled
    pub effect: String,

    /// Actions this statement applies to, never empty
    pub actions: Vec<String>,

    /// Resources this statement applies to, empty for trust policies
    pub resources: Vec<String>,

    /// Principals named by the statement, empty for identity policies
    pub principals: Vec<Principal>,
}

impl Statement {
    /// Create an identity-policy statement
    pub fn new(effect: &str, actions: Vec<String>, resources: Vec<String>) -> Self {
        Statement {
            sid: None,
            effect: effect.to_string(),
            actions,
            resources,
            principals: Vec::new(),
        }
    }

    /// Normalize one raw statement object
    ///
    /// # Examples
    /// ```
    /// use iam_snitch::Statement;
    /// use serde_json::json;
    ///
    /// let stmt = Statement::from_value(&json!({
    ///     "Effect": "Allow",
    ///     "Action": "s3:GetObject",
    ///     "Resource": ["arn:aws:s3:::logs/*"]
    /// })).unwrap();
    ///
    /// assert_eq!(stmt.actions, vec!["s3:GetObject"]);
    /// assert!(stmt.is_allow());
    /// ```
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SnitchError::parse("statement is not a JSON object"))?;
        Self::from_map(map)
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let effect = match map.get("Effect") {
            Some(Value::String(effect)) => effect.clone(),
            Some(_) => return Err(SnitchError::parse("field Effect must be a string")),
            None => return Err(SnitchError::parse("field Effect is missing")),
        };

        let actions = match map.get("Action") {
            Some(value) => OneOrMany::strings("Action", value)?.into_vec(),
            None => return Err(SnitchError::parse("field Action is missing")),
        };

        let resources = match map.get("Resource") {
            Some(value) => OneOrMany::strings("Resource", value)?.into_vec(),
            None => Vec::new(),
        };

        let principals = PrincipalResolver::resolve(map.get("Principal"))?;

        let sid = map.get("Sid").and_then(Value::as_str).map(str::to_string);

        Ok(Statement {
            sid,
            effect,
            actions,
            resources,
            principals,
        })
    }

    /// True when the effect is exactly `"Allow"`
    pub fn is_allow(&self) -> bool {
        self.effect == ALLOW
    }
}

/// Complete IAM policy document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    /// Policy language version (e.g. "2012-10-17")
    pub version: Option<String>,

    /// Statements in document order
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    /// Parse a policy document from JSON text
    ///
    /// Accepts both plain JSON and the percent-encoded form returned by the IAM API.
    pub fn from_json(document: &str) -> Result<Self> {
        let decoded = decode_document(document)?;
        let value: Value = serde_json::from_str(&decoded)
            .map_err(|e| SnitchError::parse(format!("invalid policy JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Parse a policy document from an already-decoded JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SnitchError::parse("policy document is not a JSON object"))?;

        let version = map.get("Version").and_then(Value::as_str).map(str::to_string);

        let statements = match map.get("Statement") {
            Some(value) => OneOrMany::objects("Statement", value)?
                .into_vec()
                .into_iter()
                .map(Statement::from_map)
                .collect::<Result<Vec<_>>>()?,
            None => return Err(SnitchError::parse("field Statement is missing")),
        };

        Ok(PolicyDocument {
            version,
            statements,
        })
    }

    /// Add a statement to this policy
    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Statements with an `Allow` effect
    pub fn allow_statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| s.is_allow())
    }
}

/// Undo the percent-encoding IAM applies to policy documents
///
/// Plain JSON (anything starting with `{` after trimming) is returned unchanged.
pub fn decode_document(document: &str) -> Result<String> {
    let trimmed = document.trim_start();
    if trimmed.starts_with('{') {
        return Ok(document.to_string());
    }

    urlencoding::decode(document)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SnitchError::parse(format!("policy document is not valid UTF-8 once decoded: {}", e)))
}

/// A managed policy attached to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    pub arn: String,
    pub name: String,
    pub document: PolicyDocument,
}

impl IdentityPolicy {
    /// Parse an attached policy, tagging parse errors with its ARN
    pub fn parse(arn: &str, name: &str, document: &str) -> Result<Self> {
        let document = PolicyDocument::from_json(document).map_err(|e| e.with_policy(arn))?;
        Ok(IdentityPolicy {
            arn: arn.to_string(),
            name: name.to_string(),
            document,
        })
    }
}

/// A role's assume-role (trust) policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    pub document: PolicyDocument,
}

impl TrustPolicy {
    pub fn parse(document: &str) -> Result<Self> {
        Ok(TrustPolicy {
            document: PolicyDocument::from_json(document)?,
        })
    }

    /// Principals allowed to assume the role
    ///
    /// Collected from every `Allow` statement in document order; exact duplicates
    /// are dropped.
    pub fn principals(&self) -> Vec<Principal> {
        let mut principals: Vec<Principal> = Vec::new();
        for statement in self.document.allow_statements() {
            for principal in &statement.principals {
                if !principals.contains(principal) {
                    principals.push(principal.clone());
                }
            }
        }
        principals
    }
}
