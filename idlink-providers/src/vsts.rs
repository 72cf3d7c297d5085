//! Visual Studio Team Services identity provider.
//!
//! VSTS uses the JWT-bearer variant of OAuth 2.0: the authorization code and
//! the refresh token are both sent as `assertion`, and the client secret is
//! sent as `client_assertion`.

use async_trait::async_trait;
use idlink_core::{
    AuthData, ClientCredentials, ConnectionData, LinkError, ProfileRecord, Result, TokenResponse,
    UpstreamEndpoint, UpstreamError, UserProfile,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::oauth::{self, AuthorizationRequest, OAuthConfig};
use crate::provider::IdentityProvider;

/// Default VSTS identity host.
pub const VSTS_BASE_URL: &str = "https://app.vssps.visualstudio.com";

/// Scopes requested unless configured otherwise.
pub const DEFAULT_SCOPES: [&str; 4] = [
    "vso.code",
    "vso.graph",
    "vso.serviceendpoint_manage",
    "vso.work_write",
];

/// Identity type tag of linked VSTS accounts.
pub const VSTS_KEY: &str = "vsts";

const PROFILE_PATH: &str = "/_apis/profile/profiles/me?api-version=1.0";
const CONNECTION_DATA_PATH: &str = "/_apis/connectionData/";

/// VSTS identity linker.
#[derive(Clone)]
pub struct VstsIdentityProvider {
    client: Client,
    oauth: OAuthConfig,
    base_url: String,
}

impl VstsIdentityProvider {
    /// Create a provider against the public VSTS host.
    pub fn new(credentials: ClientCredentials) -> Self {
        let base_url = VSTS_BASE_URL.to_string();
        let oauth = OAuthConfig::new(
            credentials,
            format!("{}/oauth2/authorize", base_url),
            format!("{}/oauth2/token", base_url),
        )
        .with_scopes(DEFAULT_SCOPES);

        Self {
            client: Client::new(),
            oauth,
            base_url,
        }
    }

    /// Create from environment variables.
    ///
    /// Looks for:
    /// - `VSTS_CLIENT_ID`, `VSTS_CLIENT_SECRET` (required)
    /// - `VSTS_BASE_URL`
    /// - `VSTS_SCOPES` (space or comma separated)
    /// - `IDLINK_URL_PREFIX` (base for relative redirect URLs)
    pub fn from_env() -> Result<Self> {
        let mut provider = Self::new(ClientCredentials::from_env("VSTS")?);

        if let Some(base_url) = env_var("VSTS_BASE_URL") {
            provider = provider.with_base_url(base_url);
        }
        if let Some(scopes) = env_var("VSTS_SCOPES") {
            provider = provider.with_scopes(
                scopes
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty()),
            );
        }
        if let Some(prefix) = env_var("IDLINK_URL_PREFIX") {
            let prefix = Url::parse(&prefix)
                .map_err(|e| LinkError::config(format!("invalid IDLINK_URL_PREFIX: {}", e)))?;
            provider = provider.with_url_prefix(prefix);
        }

        Ok(provider)
    }

    /// Set custom base URL (token, authorize and API endpoints move with it).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self.oauth.authorize_url = format!("{}/oauth2/authorize", self.base_url);
        self.oauth.token_url = format!("{}/oauth2/token", self.base_url);
        self
    }

    /// Set custom HTTP client (e.g. one with a timeout).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.oauth = self.oauth.with_scopes(scopes);
        self
    }

    /// Set the prefix relative redirect URLs are resolved against.
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: Url) -> Self {
        self.oauth = self.oauth.with_url_prefix(prefix);
        self
    }

    /// The OAuth configuration in use.
    pub fn oauth_config(&self) -> &OAuthConfig {
        &self.oauth
    }

    /// Profile endpoint URL.
    pub fn profile_url(&self) -> String {
        format!("{}{}", self.base_url, PROFILE_PATH)
    }

    /// Connection-data endpoint URL.
    pub fn connection_data_url(&self) -> String {
        format!("{}{}", self.base_url, CONNECTION_DATA_PATH)
    }

    async fn get_api(
        &self,
        endpoint: UpstreamEndpoint,
        url: &str,
        access_token: &str,
    ) -> std::result::Result<Vec<u8>, UpstreamError> {
        debug!(endpoint = %endpoint, url = %url, "VSTS: fetching");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("bearer {}", access_token))
            .send()
            .await
            .map_err(|e| UpstreamError::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(
                endpoint = %endpoint,
                status = status_code,
                body_preview = %body.chars().take(500).collect::<String>(),
                "VSTS: API error"
            );
            return Err(UpstreamError::status(endpoint, status_code, body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(endpoint, e))?;
        Ok(body.to_vec())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl std::fmt::Debug for VstsIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VstsIdentityProvider")
            .field("base_url", &self.base_url)
            .field("client_id", &self.oauth.credentials.client_id())
            .field("scopes", &self.oauth.scopes)
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for VstsIdentityProvider {
    fn key(&self) -> &str {
        VSTS_KEY
    }

    fn name(&self) -> &str {
        "Visual Studio Team Services"
    }

    fn scopes(&self) -> &[String] {
        &self.oauth.scopes
    }

    fn authorize(&self, redirect_url: &str) -> Result<AuthorizationRequest> {
        AuthorizationRequest::new(&self.oauth, redirect_url)
    }

    async fn exchange_token(&self, code: &str, redirect_url: &str) -> Result<TokenResponse> {
        oauth::exchange_token(&self.client, &self.oauth, code, redirect_url).await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        redirect_url: Option<&str>,
    ) -> Result<TokenResponse> {
        oauth::refresh_token(&self.client, &self.oauth, refresh_token, redirect_url).await
    }

    /// Fetch the user's profile and replace its id with the subject descriptor.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile> {
        let body = self
            .get_api(UpstreamEndpoint::Profile, &self.profile_url(), access_token)
            .await?;
        let record = ProfileRecord::from_slice(&body)?;

        let body = self
            .get_api(
                UpstreamEndpoint::ConnectionData,
                &self.connection_data_url(),
                access_token,
            )
            .await?;
        let connection = ConnectionData::from_slice(&body)?;

        let profile = UserProfile::resolve(record, &connection)?;
        debug!(descriptor = %profile.id, "VSTS: resolved profile");
        Ok(profile)
    }

    async fn refresh_identity(&self, data: &AuthData, redirect_url: Option<&str>) -> Result<AuthData> {
        let refresh_token = data
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LinkError::identity_not_valid("Missing refresh token"))?;

        match self.refresh_token(refresh_token, redirect_url).await {
            Ok(token) => {
                let mut updated = data.clone();
                updated.merge(AuthData::from(&token));
                info!("VSTS: identity refreshed");
                Ok(updated)
            }
            Err(LinkError::TokenExchange(err)) if err.invalidates_identity() => {
                warn!(error = %err.summary(), "VSTS: refresh rejected, identity no longer valid");
                Err(LinkError::identity_not_valid(err.summary()))
            }
            Err(err) => Err(err),
        }
    }

    fn is_configured(&self) -> bool {
        !self.oauth.credentials.client_id().is_empty()
            && !self.oauth.credentials.client_secret().is_empty()
    }

    fn aliases(&self) -> &[&str] {
        &["azure-devops"]
    }
}
