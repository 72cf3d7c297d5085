//! OAuth client credentials.

use crate::errors::{LinkError, Result};
use std::fmt;

/// Client identifier and secret registered with the identity service.
///
/// Loaded once and never mutated. The secret doubles as the
/// `client_assertion` on every token request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Create credentials from an id and secret.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Load from environment variables with given prefix.
    ///
    /// Looks for:
    /// - `{PREFIX}_CLIENT_ID`
    /// - `{PREFIX}_CLIENT_SECRET`
    pub fn from_env(prefix: &str) -> Result<Self> {
        let id_var = format!("{}_CLIENT_ID", prefix);
        let secret_var = format!("{}_CLIENT_SECRET", prefix);

        let client_id = non_empty_var(&id_var)?;
        let client_secret = non_empty_var(&secret_var)?;
        Ok(Self::new(client_id, client_secret))
    }

    /// The client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The client secret.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

fn non_empty_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LinkError::config(format!("{} not set", name))),
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}
