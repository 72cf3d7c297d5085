//! User profile records.
//!
//! The profile endpoint returns an `id` that is only stable within one
//! account; the same person gets different ids in different organizations.
//! The subject descriptor from the connection-data endpoint is the same
//! everywhere (it is also what the Graph user listing returns), so a resolved
//! [`UserProfile`] always carries the descriptor as its id.

use crate::errors::{UpstreamEndpoint, UpstreamError};
use serde::{Deserialize, Serialize};

/// Raw body of `/_apis/profile/profiles/me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Account-relative id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Primary email address.
    pub email_address: String,
    /// Public alias, when set.
    #[serde(default)]
    pub public_alias: Option<String>,
}

impl ProfileRecord {
    /// Parse a profile endpoint body.
    pub fn from_slice(body: &[u8]) -> Result<Self, UpstreamError> {
        serde_json::from_slice(body).map_err(|e| UpstreamError::malformed(UpstreamEndpoint::Profile, e))
    }
}

/// Raw body of `/_apis/connectionData/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    /// The user the access token was issued to.
    #[serde(default)]
    pub authenticated_user: Option<AuthenticatedUser>,
}

/// `authenticatedUser` section of the connection data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Organization-independent subject descriptor.
    #[serde(default)]
    pub subject_descriptor: Option<String>,
}

impl ConnectionData {
    /// Parse a connection-data endpoint body.
    pub fn from_slice(body: &[u8]) -> Result<Self, UpstreamError> {
        serde_json::from_slice(body)
            .map_err(|e| UpstreamError::malformed(UpstreamEndpoint::ConnectionData, e))
    }

    /// The stable subject descriptor.
    pub fn subject_descriptor(&self) -> Result<&str, UpstreamError> {
        self.authenticated_user
            .as_ref()
            .and_then(|user| user.subject_descriptor.as_deref())
            .filter(|descriptor| !descriptor.is_empty())
            .ok_or_else(|| {
                UpstreamError::missing_field(
                    UpstreamEndpoint::ConnectionData,
                    "authenticatedUser.subjectDescriptor",
                )
            })
    }
}

/// A user profile with its id replaced by the subject descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Subject descriptor.
    pub id: String,
    /// The profile endpoint's own id.
    pub uuid: String,
    /// Display name.
    pub display_name: String,
    /// Primary email address.
    pub email: String,
    /// Whether the email is verified.
    pub email_verified: bool,
    /// Public alias, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_alias: Option<String>,
}

impl UserProfile {
    /// Merge a profile record with the descriptor from the connection data.
    pub fn resolve(record: ProfileRecord, connection: &ConnectionData) -> Result<Self, UpstreamError> {
        let descriptor = connection.subject_descriptor()?;
        Ok(Self {
            id: descriptor.to_string(),
            uuid: record.id,
            display_name: record.display_name,
            email: record.email_address,
            // VSTS only hands out addresses it has confirmed.
            email_verified: true,
            public_alias: record.public_alias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &[u8] = br#"{
        "displayName": "Ada Lovelace",
        "publicAlias": "a6a9b6c1-0000-0000-0000-000000000001",
        "emailAddress": "ada@example.com",
        "coreRevision": 1,
        "timeStamp": "2019-01-01T00:00:00+00:00",
        "id": "a6a9b6c1-0000-0000-0000-000000000001",
        "revision": 1
    }"#;

    const CONNECTION: &[u8] = br#"{
        "authenticatedUser": {
            "id": "a6a9b6c1-0000-0000-0000-000000000001",
            "subjectDescriptor": "msa.YTZhOWI2YzEtMDAwMC0wMDAw",
            "providerDisplayName": "Ada Lovelace"
        },
        "instanceId": "00000000-0000-0000-0000-000000000000"
    }"#;

    #[test]
    fn test_resolve_uses_descriptor() {
        let record = ProfileRecord::from_slice(PROFILE).unwrap();
        let connection = ConnectionData::from_slice(CONNECTION).unwrap();

        let profile = UserProfile::resolve(record, &connection).unwrap();
        assert_eq!(profile.id, "msa.YTZhOWI2YzEtMDAwMC0wMDAw");
        assert_eq!(profile.uuid, "a6a9b6c1-0000-0000-0000-000000000001");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.display_name, "Ada Lovelace");
        assert!(profile.email_verified);
    }

    #[test]
    fn test_missing_descriptor() {
        let record = ProfileRecord::from_slice(PROFILE).unwrap();

        let bodies: [&[u8]; 3] = [
            b"{}",
            br#"{"authenticatedUser": {}}"#,
            br#"{"authenticatedUser": {"subjectDescriptor": ""}}"#,
        ];
        for body in bodies {
            let connection = ConnectionData::from_slice(body).unwrap();
            let err = UserProfile::resolve(record.clone(), &connection).unwrap_err();
            assert_eq!(err.endpoint, UpstreamEndpoint::ConnectionData);
            assert!(err.message.contains("authenticatedUser.subjectDescriptor"));
        }
    }

    #[test]
    fn test_profile_missing_email() {
        let err = ProfileRecord::from_slice(br#"{"id": "x", "displayName": "X"}"#).unwrap_err();
        assert_eq!(err.endpoint, UpstreamEndpoint::Profile);
        assert!(err.message.contains("emailAddress"));
    }

    #[test]
    fn test_connection_not_json() {
        let err = ConnectionData::from_slice(b"<html/>").unwrap_err();
        assert_eq!(err.endpoint, UpstreamEndpoint::ConnectionData);
    }
}
