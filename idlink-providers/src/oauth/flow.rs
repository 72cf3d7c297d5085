//! JWT-bearer token exchange.

use idlink_core::token::{parse_token_body, payload_error};
use idlink_core::{LinkError, Result, TokenExchangeError, TokenResponse};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::OAuthConfig;

/// `client_assertion_type` sent with every token request.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// `grant_type` for exchanging an authorization code.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// `grant_type` for refreshing.
pub const REFRESH_TOKEN_GRANT: &str = "refresh_token";

/// One form-encoded request to the token endpoint.
///
/// The code or refresh token travels as `assertion`; the client secret as
/// `client_assertion`.
#[derive(Clone)]
pub struct TokenExchangeRequest<'a> {
    grant_type: &'static str,
    assertion: &'a str,
    client_assertion: &'a str,
    redirect_uri: Url,
}

impl<'a> TokenExchangeRequest<'a> {
    /// Exchange an authorization code.
    pub fn authorization_code(config: &'a OAuthConfig, code: &'a str, redirect_uri: Url) -> Self {
        Self {
            grant_type: JWT_BEARER_GRANT,
            assertion: code,
            client_assertion: config.credentials.client_secret(),
            redirect_uri,
        }
    }

    /// Refresh a previously issued token.
    pub fn refresh(config: &'a OAuthConfig, refresh_token: &'a str, redirect_uri: Url) -> Self {
        Self {
            grant_type: REFRESH_TOKEN_GRANT,
            assertion: refresh_token,
            client_assertion: config.credentials.client_secret(),
            redirect_uri,
        }
    }

    /// The grant type marker.
    pub fn grant_type(&self) -> &'static str {
        self.grant_type
    }

    /// Form fields in the order they are sent.
    pub fn form(&self) -> [(&'static str, &str); 5] {
        [
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", self.client_assertion),
            ("grant_type", self.grant_type),
            ("assertion", self.assertion),
            ("redirect_uri", self.redirect_uri.as_str()),
        ]
    }
}

impl std::fmt::Debug for TokenExchangeRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeRequest")
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri.as_str())
            .finish()
    }
}

/// Exchange an authorization code for tokens.
///
/// **Important**: This function does NOT store tokens. The caller is
/// responsible for persisting them.
pub async fn exchange_token(
    client: &Client,
    config: &OAuthConfig,
    code: &str,
    redirect_url: &str,
) -> Result<TokenResponse> {
    if code.is_empty() {
        return Err(LinkError::config("authorization code is empty"));
    }
    let redirect_uri = config.absolute_redirect(redirect_url)?;
    request_token(
        client,
        config,
        TokenExchangeRequest::authorization_code(config, code, redirect_uri),
    )
    .await
}

/// Refresh an expired access token.
///
/// The redirect URL is mandatory: the service validates it against the
/// original authorization. Without one this fails before any request is made.
pub async fn refresh_token(
    client: &Client,
    config: &OAuthConfig,
    refresh_token: &str,
    redirect_url: Option<&str>,
) -> Result<TokenResponse> {
    let redirect_url = redirect_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| LinkError::config("a redirect URL is required when refreshing an identity"))?;
    if refresh_token.is_empty() {
        return Err(LinkError::config("refresh token is empty"));
    }
    let redirect_uri = config.absolute_redirect(redirect_url)?;
    request_token(
        client,
        config,
        TokenExchangeRequest::refresh(config, refresh_token, redirect_uri),
    )
    .await
}

async fn request_token(
    client: &Client,
    config: &OAuthConfig,
    request: TokenExchangeRequest<'_>,
) -> Result<TokenResponse> {
    info!(
        token_url = %config.token_url,
        grant_type = request.grant_type(),
        "Requesting token"
    );

    let response = client
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .form(&request.form())
        .send()
        .await
        .map_err(TokenExchangeError::transport)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(TokenExchangeError::transport)?;

    debug!(status = %status, content_type = ?content_type, "Token endpoint responded");

    if !status.is_success() {
        let mut err = TokenExchangeError::new("token endpoint returned an error status")
            .with_status(status.as_u16());
        if let Some((code, description)) = parse_token_body(content_type.as_deref(), &body)
            .ok()
            .as_ref()
            .and_then(payload_error)
        {
            err = err.with_error_code(code);
            if let Some(description) = description {
                err = err.with_description(description);
            }
        }
        warn!(
            status = status.as_u16(),
            grant_type = request.grant_type(),
            error = %err.summary(),
            "Token request failed"
        );
        return Err(err.into());
    }

    let token = TokenResponse::from_body(content_type.as_deref(), &body).map_err(|err| {
        let err = err.with_status(status.as_u16());
        warn!(grant_type = request.grant_type(), error = %err, "Unusable token response");
        err
    })?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlink_core::ClientCredentials;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> OAuthConfig {
        OAuthConfig::new(
            ClientCredentials::new("client-id", "client-secret"),
            format!("{}/oauth2/authorize", server.uri()),
            format!("{}/oauth2/token", server.uri()),
        )
    }

    #[test]
    fn test_form_fields() {
        let config = OAuthConfig::new(ClientCredentials::new("id", "s3cret"), "a", "t");
        let redirect = Url::parse("https://app.example.com/cb").unwrap();
        let request = TokenExchangeRequest::authorization_code(&config, "the-code", redirect);
        assert_eq!(
            request.form(),
            [
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", "s3cret"),
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", "the-code"),
                ("redirect_uri", "https://app.example.com/cb"),
            ]
        );
        assert!(!format!("{:?}", request).contains("s3cret"));
    }

    #[tokio::test]
    async fn test_exchange_form_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion=the-code"))
            .and(body_string_contains("client_assertion=client-secret"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("access_token=abc&token_type=bearer", "application/x-www-form-urlencoded"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = exchange_token(&Client::new(), &config(&server), "the-code", "https://app.example.com/cb")
            .await
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.token_type.as_deref(), Some("bearer"));
    }

    #[tokio::test]
    async fn test_exchange_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token":"abc","refresh_token":"r","expires_in":"3599","token_type":"jwt-bearer"}"#,
                "application/json; charset=utf-8",
            ))
            .mount(&server)
            .await;

        let token = exchange_token(&Client::new(), &config(&server), "code", "https://app.example.com/cb")
            .await
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
        assert_eq!(token.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn test_exchange_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                r#"{"Error":"invalid_grant","ErrorDescription":"code expired"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let err = exchange_token(&Client::new(), &config(&server), "code", "https://app.example.com/cb")
            .await
            .unwrap_err();
        match err {
            LinkError::TokenExchange(err) => {
                assert_eq!(err.status, Some(400));
                assert_eq!(err.error_code.as_deref(), Some("invalid_grant"));
                assert_eq!(err.description.as_deref(), Some("code expired"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>maintenance</html>", "text/html"))
            .mount(&server)
            .await;

        let err = exchange_token(&Client::new(), &config(&server), "code", "https://app.example.com/cb")
            .await
            .unwrap_err();
        assert!(err.is_token_exchange());
    }

    #[tokio::test]
    async fn test_refresh_without_redirect_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for redirect in [None, Some(""), Some("  ")] {
            let err = refresh_token(&Client::new(), &config(&server), "refresh", redirect)
                .await
                .unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("assertion=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token":"fresh","refresh_token":"new-refresh"}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let token = refresh_token(
            &Client::new(),
            &config(&server),
            "old-refresh",
            Some("https://app.example.com/cb"),
        )
        .await
        .unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.refresh_token.as_deref(), Some("new-refresh"));
    }
}
