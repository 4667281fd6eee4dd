//! Trust-policy principals
//!
//! A `Principal` clause names who may assume a role. It can be a type-keyed
//! object (`{"Service": "ecs.amazonaws.com"}`), an array of such objects, or the
//! bare string `"*"`. Resolution flattens every form into an ordered list.

use super::shape::{json_kind, OneOrMany};
use crate::error::{Result, SnitchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of identity a principal refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalType {
    Service,
    Aws,
    Federated,
    CanonicalUser,
}

impl PrincipalType {
    /// Keys are scanned in this order regardless of their JSON order
    pub const SCAN_ORDER: [PrincipalType; 4] = [
        PrincipalType::Service,
        PrincipalType::Aws,
        PrincipalType::CanonicalUser,
        PrincipalType::Federated,
    ];

    /// JSON key used in policy documents
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::Service => "Service",
            PrincipalType::Aws => "AWS",
            PrincipalType::Federated => "Federated",
            PrincipalType::CanonicalUser => "CanonicalUser",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalType {
    type Err = SnitchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Service" => Ok(PrincipalType::Service),
            "AWS" => Ok(PrincipalType::Aws),
            "Federated" => Ok(PrincipalType::Federated),
            "CanonicalUser" => Ok(PrincipalType::CanonicalUser),
            other => Err(SnitchError::parse(format!("unknown principal type '{}'", other))),
        }
    }
}

/// An identity allowed to assume a role
///
/// Displayed (and stored) as `Type[ID]`, e.g. `AWS[arn:aws:iam::111122223333:root]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Principal {
    pub kind: PrincipalType,
    pub id: String,
}

impl Principal {
    pub fn new(kind: PrincipalType, id: impl Into<String>) -> Self {
        Principal {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.id)
    }
}

impl FromStr for Principal {
    type Err = SnitchError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || SnitchError::parse(format!("malformed principal '{}'", s));

        let (kind, rest) = s.split_once('[').ok_or_else(malformed)?;
        let id = rest.strip_suffix(']').ok_or_else(malformed)?;
        Ok(Principal::new(kind.parse()?, id))
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.to_string()
    }
}

impl TryFrom<String> for Principal {
    type Error = SnitchError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Resolves `Principal` clauses into flat principal lists
pub struct PrincipalResolver;

impl PrincipalResolver {
    /// Resolve an optional `Principal` clause
    ///
    /// # Examples
    /// ```
    /// use iam_snitch::{Principal, PrincipalResolver, PrincipalType};
    /// use serde_json::json;
    ///
    /// let clause = json!({"AWS": "arn:aws:iam::111122223333:root", "Service": "ec2.amazonaws.com"});
    /// let principals = PrincipalResolver::resolve(Some(&clause)).unwrap();
    ///
    /// assert_eq!(principals[0], Principal::new(PrincipalType::Service, "ec2.amazonaws.com"));
    /// assert_eq!(principals[1].to_string(), "AWS[arn:aws:iam::111122223333:root]");
    /// ```
    pub fn resolve(clause: Option<&Value>) -> Result<Vec<Principal>> {
        let Some(clause) = clause else {
            return Ok(Vec::new());
        };

        // "Principal": "*" is shorthand for {"AWS": "*"}
        if let Value::String(s) = clause {
            return if s == "*" {
                Ok(vec![Principal::new(PrincipalType::Aws, "*")])
            } else {
                Err(SnitchError::parse(format!(
                    "field Principal must be an object, an array of objects or \"*\", found string '{}'",
                    s
                )))
            };
        }

        let mut principals = Vec::new();
        for map in OneOrMany::objects("Principal", clause)?.into_vec() {
            Self::resolve_map(map, &mut principals)?;
        }
        Ok(principals)
    }

    fn resolve_map(map: &Map<String, Value>, out: &mut Vec<Principal>) -> Result<()> {
        for kind in PrincipalType::SCAN_ORDER {
            let Some(entry) = map.get(kind.as_str()) else {
                continue;
            };

            // An empty value list names nobody
            if matches!(entry, Value::Array(items) if items.is_empty()) {
                continue;
            }

            let ids = OneOrMany::strings(kind.as_str(), entry).map_err(|_| {
                SnitchError::parse(format!(
                    "unable to convert {} principal {} ({}) to a principal identifier",
                    kind,
                    entry,
                    json_kind(entry)
                ))
            })?;

            out.extend(ids.into_vec().into_iter().map(|id| Principal::new(kind, id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(clause: Value) -> Result<Vec<Principal>> {
        PrincipalResolver::resolve(Some(&clause))
    }

    #[test]
    fn test_single_service_principal() {
        let principals = resolve(json!({"Service": "ecs.amazonaws.com"})).unwrap();
        assert_eq!(
            principals,
            vec![Principal::new(PrincipalType::Service, "ecs.amazonaws.com")]
        );
    }

    #[test]
    fn test_two_service_principals() {
        let principals =
            resolve(json!({"Service": ["ecs.amazonaws.com", "s3.amazonaws.com"]})).unwrap();
        assert_eq!(
            principals,
            vec![
                Principal::new(PrincipalType::Service, "ecs.amazonaws.com"),
                Principal::new(PrincipalType::Service, "s3.amazonaws.com"),
            ]
        );
    }

    #[test]
    fn test_fixed_scan_order() {
        let principals = resolve(json!({
            "Federated": "cognito-identity.amazonaws.com",
            "CanonicalUser": "79a59df900b949e55d96a1e698fbacedfd6e09d98eacf8f8d5218e7cd47ef2be",
            "AWS": "arn:aws:iam::111122223333:user/test",
            "Service": "ecs.amazonaws.com"
        }))
        .unwrap();

        let kinds: Vec<_> = principals.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, PrincipalType::SCAN_ORDER.to_vec());
    }

    #[test]
    fn test_array_of_maps() {
        let principals = resolve(json!([
            {"AWS": ["arn:aws:iam::1:root", "arn:aws:iam::2:root"]},
            {"Service": "lambda.amazonaws.com"}
        ]))
        .unwrap();

        let shown: Vec<String> = principals.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "AWS[arn:aws:iam::1:root]",
                "AWS[arn:aws:iam::2:root]",
                "Service[lambda.amazonaws.com]",
            ]
        );
    }

    #[test]
    fn test_absent_and_unknown() {
        assert!(PrincipalResolver::resolve(None).unwrap().is_empty());
        assert!(resolve(json!({"Unknown": "x"})).unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_string() {
        assert_eq!(
            resolve(json!("*")).unwrap(),
            vec![Principal::new(PrincipalType::Aws, "*")]
        );
        assert!(resolve(json!("arn:aws:iam::1:root")).is_err());
    }

    #[test]
    fn test_non_string_values_fail() {
        assert!(resolve(json!({"AWS": 111122223333u64})).unwrap_err().is_parse());
        assert!(resolve(json!({"AWS": ["arn:aws:iam::1:root", {"x": 1}]})).is_err());
        assert!(resolve(json!([{"AWS": "a"}, 5])).is_err());
        assert!(resolve(json!(true)).is_err());
    }

    #[test]
    fn test_empty_value_list_names_nobody() {
        assert!(resolve(json!({"AWS": []})).unwrap().is_empty());

        let principals = resolve(json!({"AWS": [], "Service": "ec2.amazonaws.com"})).unwrap();
        assert_eq!(
            principals,
            vec![Principal::new(PrincipalType::Service, "ec2.amazonaws.com")]
        );
    }

    #[test]
    fn test_display_round_trip() {
        let principal = Principal::new(PrincipalType::Federated, "arn:aws:iam::1:saml-provider/[Okta]");
        let shown = principal.to_string();
        assert_eq!(shown.parse::<Principal>().unwrap(), principal);

        assert!("AWS".parse::<Principal>().is_err());
        assert!("Nobody[x]".parse::<Principal>().is_err());
    }
}
