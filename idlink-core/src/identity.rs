//! Canonical identity records.

use crate::profile::UserProfile;
use crate::token::AuthData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The normalized result of one successful linking attempt.
///
/// Field names are independent of the identity service's own naming; `kind`
/// serializes as `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    /// Provider key, e.g. `"vsts"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Stable, organization-independent id (the subject descriptor).
    pub id: String,
    /// Primary email address.
    pub email: String,
    /// Whether the email is verified.
    pub email_verified: bool,
    /// Display name.
    pub name: String,
    /// Granted scopes, sorted ascending without duplicates.
    pub scopes: Vec<String>,
    /// Opaque authentication data.
    pub data: AuthData,
}

impl CanonicalIdentity {
    /// Compose an identity from a resolved profile.
    pub fn from_profile<I, S>(kind: impl Into<String>, profile: UserProfile, scopes: I, data: AuthData) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            id: profile.id,
            email: profile.email,
            email_verified: profile.email_verified,
            name: profile.display_name,
            scopes: normalize_scopes(scopes),
            data,
        }
    }
}

/// Sort scopes ascending and drop duplicates and blanks.
pub fn normalize_scopes<I, S>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scopes
        .into_iter()
        .map(Into::into)
        .filter(|s| !s.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile() -> UserProfile {
        UserProfile {
            id: "aad.descriptor".into(),
            uuid: "account-relative-id".into(),
            display_name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            email_verified: true,
            public_alias: None,
        }
    }

    fn data() -> AuthData {
        AuthData {
            access_token: "tok".into(),
            token_type: Some("jwt-bearer".into()),
            expires: Some(42),
            refresh_token: None,
        }
    }

    #[test]
    fn test_normalize_scopes() {
        assert_eq!(
            normalize_scopes(["vso.work_write", "vso.code", "vso.graph", "vso.code", " "]),
            vec!["vso.code", "vso.graph", "vso.work_write"]
        );
        assert!(normalize_scopes(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_identity_uses_descriptor() {
        let identity = CanonicalIdentity::from_profile("vsts", profile(), ["b", "a"], data());
        assert_eq!(identity.id, "aad.descriptor");
        assert_ne!(identity.id, "account-relative-id");
        assert_eq!(identity.scopes, vec!["a", "b"]);
    }

    #[test]
    fn test_identity_serialization() {
        let identity = CanonicalIdentity::from_profile("vsts", profile(), ["vso.code"], data());
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({
                "type": "vsts",
                "id": "aad.descriptor",
                "email": "grace@example.com",
                "email_verified": true,
                "name": "Grace Hopper",
                "scopes": ["vso.code"],
                "data": {"access_token": "tok", "token_type": "jwt-bearer", "expires": 42}
            })
        );
    }
}
