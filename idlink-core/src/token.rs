//! Token endpoint payloads.
//!
//! The token endpoint answers either with a form-urlencoded body or with
//! JSON, depending on the grant and the mood of the service. Both shapes are
//! first reduced to a flat [`TokenPayload`] and only then mapped onto the
//! typed [`TokenResponse`].

use crate::errors::TokenExchangeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Content type marking a form-urlencoded token response.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Raw key/value mapping of a token endpoint response.
pub type TokenPayload = Map<String, Value>;

/// Parse a token endpoint body according to its `Content-Type`.
///
/// Form bodies become a flat string mapping (blank values are dropped, the
/// last occurrence of a repeated key wins). Anything else is parsed as a JSON
/// object.
pub fn parse_token_body(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<TokenPayload, TokenExchangeError> {
    let is_form = content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with(FORM_URLENCODED))
        .unwrap_or(false);

    if is_form {
        return Ok(url::form_urlencoded::parse(body)
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect());
    }

    match serde_json::from_slice::<Value>(body).map_err(TokenExchangeError::malformed)? {
        Value::Object(map) => Ok(map),
        other => Err(TokenExchangeError::malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Extract the OAuth error carried by a payload, if any.
///
/// Both the RFC spelling (`error`, `error_description`) and the capitalised
/// one some Microsoft endpoints use (`Error`, `ErrorDescription`) are read.
pub fn payload_error(payload: &TokenPayload) -> Option<(String, Option<String>)> {
    let code = ["error", "Error"]
        .iter()
        .find_map(|key| payload.get(*key))
        .map(value_text)?;
    let description = ["error_description", "ErrorDescription"]
        .iter()
        .find_map(|key| payload.get(*key))
        .map(value_text);
    Some((code, description))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Tokens returned from the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for the resource endpoints.
    pub access_token: String,
    /// Token type, e.g. `jwt-bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Token for later refresh grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds. VSTS sends this as a string.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<u64>,
    /// Space separated scopes actually granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Map a parsed payload onto a token response.
    ///
    /// A payload carrying an OAuth `error` is a failed exchange even when it
    /// came with a 2xx status.
    pub fn from_payload(payload: TokenPayload) -> Result<Self, TokenExchangeError> {
        if let Some((code, description)) = payload_error(&payload) {
            let mut err = TokenExchangeError::new("token endpoint returned an error")
                .with_error_code(code);
            if let Some(description) = description {
                err = err.with_description(description);
            }
            return Err(err);
        }

        let token: TokenResponse =
            serde_json::from_value(Value::Object(payload)).map_err(TokenExchangeError::malformed)?;
        if token.access_token.is_empty() {
            return Err(TokenExchangeError::malformed("empty access_token"));
        }
        Ok(token)
    }

    /// Parse a raw token endpoint body straight into a token response.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, TokenExchangeError> {
        Self::from_payload(parse_token_body(content_type, body)?)
    }

    /// Scopes the service says it granted, if it said anything.
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        let scope = self.scope.as_deref()?.trim();
        if scope.is_empty() {
            return None;
        }
        Some(scope.split_whitespace().map(str::to_string).collect())
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Int(n)) => Ok(Some(n)),
        Some(Seconds::Float(f)) if f >= 0.0 => Ok(Some(f as u64)),
        Some(Seconds::Float(f)) => Err(serde::de::Error::custom(format!(
            "negative expires_in: {}",
            f
        ))),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid expires_in {:?}: {}", s, e))),
    }
}

/// Opaque authentication blob stored alongside a linked identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    /// Current access token.
    pub access_token: String,
    /// Token type as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Absolute expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    /// Refresh token, if the service issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthData {
    /// Build the blob from a token response received at `now`.
    pub fn from_token(token: &TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            expires: token
                .expires_in
                .map(|secs| now.timestamp().saturating_add(i64::try_from(secs).unwrap_or(i64::MAX))),
            refresh_token: token.refresh_token.clone(),
        }
    }

    /// Overlay freshly refreshed token data.
    ///
    /// Fields the refresh response did not carry keep their old values.
    pub fn merge(&mut self, refreshed: AuthData) {
        self.access_token = refreshed.access_token;
        if refreshed.token_type.is_some() {
            self.token_type = refreshed.token_type;
        }
        if refreshed.expires.is_some() {
            self.expires = refreshed.expires;
        }
        if refreshed.refresh_token.is_some() {
            self.refresh_token = refreshed.refresh_token;
        }
    }

    /// Whether the access token has expired at `now`. Unknown expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now.timestamp())
    }
}

impl From<&TokenResponse> for AuthData {
    fn from(token: &TokenResponse) -> Self {
        Self::from_token(token, Utc::now())
    }
}

impl fmt::Debug for AuthData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthData")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires", &self.expires)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
