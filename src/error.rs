//! Error types for policy ingestion, persistence and queries

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, SnitchError>;

/// Errors raised while compiling or querying access facts
#[derive(Error, Debug)]
pub enum SnitchError {
    /// Malformed or unsupported policy JSON
    ///
    /// Scoped to the statement or principal clause being parsed. The refresh
    /// driver skips the offending policy (or role, for trust policies) and
    /// keeps going.
    #[error("Parse error{}: {message}", context_suffix(.role, .policy))]
    Parse {
        message: String,
        role: Option<String>,
        policy: Option<String>,
    },

    /// Identity source failure (fatal to a refresh)
    #[error("Fetch error{}: {message}", context_suffix(.role, .policy))]
    Fetch {
        message: String,
        role: Option<String>,
        policy: Option<String>,
    },

    /// Rule store write failure (fatal to a refresh)
    #[error("Persist error: {0}")]
    Persist(String),

    /// Rule store read failure during a query
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid configuration file or values
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnitchError {
    /// Build a parse error without context
    pub fn parse(message: impl Into<String>) -> Self {
        SnitchError::Parse {
            message: message.into(),
            role: None,
            policy: None,
        }
    }

    /// Build a fetch error without context
    pub fn fetch(message: impl Into<String>) -> Self {
        SnitchError::Fetch {
            message: message.into(),
            role: None,
            policy: None,
        }
    }

    /// Attach the role being processed, keeping any role already recorded
    pub fn with_role(mut self, role_arn: &str) -> Self {
        if let SnitchError::Parse { role, .. } | SnitchError::Fetch { role, .. } = &mut self {
            role.get_or_insert_with(|| role_arn.to_string());
        }
        self
    }

    /// Attach the policy being processed, keeping any policy already recorded
    pub fn with_policy(mut self, policy_arn: &str) -> Self {
        if let SnitchError::Parse { policy, .. } | SnitchError::Fetch { policy, .. } = &mut self {
            policy.get_or_insert_with(|| policy_arn.to_string());
        }
        self
    }

    /// True for errors the refresh driver isolates instead of aborting on
    pub fn is_parse(&self) -> bool {
        matches!(self, SnitchError::Parse { .. })
    }
}

fn context_suffix(role: &Option<String>, policy: &Option<String>) -> String {
    match (role, policy) {
        (Some(r), Some(p)) => format!(" (role {}, policy {})", r, p),
        (Some(r), None) => format!(" (role {})", r),
        (None, Some(p)) => format!(" (policy {})", p),
        (None, None) => String::new(),
    }
}

impl From<toml::de::Error> for SnitchError {
    fn from(err: toml::de::Error) -> Self {
        SnitchError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for SnitchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SnitchError::Config(err.to_string())
    }
}
