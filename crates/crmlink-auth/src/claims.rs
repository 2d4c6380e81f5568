//! Identity claims carried by a credential.
//!
//! The identity provider embeds the tenant's endpoints and ticket in the
//! identity token under fixed claim names. Claims are kept unfiltered as a
//! flat name -> string map; non-string JSON values are stored in their JSON
//! text form.

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Base URL of the tenant's REST web API.
pub const WEBAPI_URL_CLAIM: &str = "http://schemes.superoffice.net/identity/webapi_url";

/// Base URL of the tenant's NetServer proxy endpoints.
pub const NETSERVER_URL_CLAIM: &str = "http://schemes.superoffice.net/identity/netserver_url";

/// Tenant / context identifier (e.g. `Cust12345`).
pub const CONTEXT_IDENTIFIER_CLAIM: &str = "http://schemes.superoffice.net/identity/ctx";

/// Session ticket used for proxy calls.
pub const TICKET_CLAIM: &str = "http://schemes.superoffice.net/identity/ticket";

/// Claims a session context cannot be built without, in lookup order.
pub const REQUIRED_CLAIMS: [&str; 4] = [
    WEBAPI_URL_CLAIM,
    NETSERVER_URL_CLAIM,
    CONTEXT_IDENTIFIER_CLAIM,
    TICKET_CLAIM,
];

/// Flat map of identity claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(BTreeMap<String, String>);

impl IdentityClaims {
    /// Create an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build claims from a decoded JWT payload.
    #[must_use]
    pub fn from_json(payload: &Map<String, Value>) -> Self {
        let claims = payload
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect();
        Self(claims)
    }

    /// Add or replace a claim.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a claim in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a claim. Empty values count as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Look up a claim that must be present.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingClaim` naming the claim when it is absent
    /// or empty.
    pub fn require(&self, name: &str) -> Result<&str, AuthError> {
        self.get(name)
            .ok_or_else(|| AuthError::MissingClaim(name.to_string()))
    }

    /// Context identifier, if present.
    #[must_use]
    pub fn context_identifier(&self) -> Option<&str> {
        self.get(CONTEXT_IDENTIFIER_CLAIM)
    }

    /// Iterate over all claims in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdentityClaims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_flattens_values() {
        let payload = json!({
            "sub": "user-1",
            "exp": 1700000000,
            "http://schemes.superoffice.net/identity/ctx": "Cust12345",
            "amr": ["pwd"]
        });
        let claims = IdentityClaims::from_json(payload.as_object().unwrap());

        assert_eq!(claims.get("sub"), Some("user-1"));
        assert_eq!(claims.get("exp"), Some("1700000000"));
        assert_eq!(claims.get("amr"), Some(r#"["pwd"]"#));
        assert_eq!(claims.context_identifier(), Some("Cust12345"));
        assert_eq!(claims.len(), 4);
    }

    #[test]
    fn test_require_missing() {
        let claims = IdentityClaims::new().with(WEBAPI_URL_CLAIM, "https://x/api");
        assert_eq!(claims.require(WEBAPI_URL_CLAIM).unwrap(), "https://x/api");

        let err = claims.require(TICKET_CLAIM).unwrap_err();
        assert_eq!(err, AuthError::MissingClaim(TICKET_CLAIM.to_string()));
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let claims = IdentityClaims::new().with(CONTEXT_IDENTIFIER_CLAIM, "  ");
        assert!(claims.get(CONTEXT_IDENTIFIER_CLAIM).is_none());
        assert!(claims.require(CONTEXT_IDENTIFIER_CLAIM).is_err());
    }

    #[test]
    fn test_iter_is_ordered() {
        let claims: IdentityClaims = [("b", "2"), ("a", "1")].into_iter().collect();
        let names: Vec<&str> = claims.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let claims = IdentityClaims::new().with("sub", "u1");
        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json, r#"{"sub":"u1"}"#);
    }
}
