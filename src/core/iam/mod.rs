//! IAM policy parsing and wildcard matching
//!
//! Provides:
//! - Normalization of policy statements (string-or-array fields)
//! - Resolution of trust-policy principals
//! - Symmetric wildcard matching for actions and ARNs

mod pattern;
mod policy;
mod principal;
mod shape;

pub use pattern::PatternMatcher;
pub use policy::{decode_document, IdentityPolicy, PolicyDocument, Statement, TrustPolicy, ALLOW};
pub use principal::{Principal, PrincipalResolver, PrincipalType};
pub use shape::OneOrMany;
