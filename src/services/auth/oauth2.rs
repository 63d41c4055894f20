/*
 * Responsibility
 * - 認可サーバーへの HTTP クライアント (RFC 7662 introspection / RFC 7009 revocation /
 *   client_credentials grant)
 * - RFC 6749 error body のマッピング
 *
 * Notes
 * - すべて form-encoded POST + Basic auth
 * - client_secret は Debug に出さない
 */
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::services::auth::claims::IntrospectionResponse;
use crate::services::auth::error::AuthError;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A successful client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
struct OAuth2ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client-credentials fetch seam, so the token manager can be exercised
/// without a live authorization server.
#[async_trait]
pub trait TokenFetcher: Send + Sync + 'static {
    async fn client_credentials(&self, scopes: &[String]) -> Result<TokenResponse, AuthError>;
}

/// HTTP client for the external OAuth2 authorization server.
#[derive(Clone)]
pub struct OAuth2Client {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token_path: String,
    introspection_path: String,
    revocation_path: String,
}

impl std::fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the client secret
        f.debug_struct("OAuth2Client")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl OAuth2Client {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_path: impl Into<String>,
        introspection_path: impl Into<String>,
        revocation_path: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_path: token_path.into(),
            introspection_path: introspection_path.into(),
            revocation_path: revocation_path.into(),
        }
    }

    /// Join base and path with exactly one `/` between them.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn check_credentials(&self) -> Result<(), AuthError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(())
    }

    /// RFC 7662 token introspection.
    ///
    /// A 2xx response with `active == false` is returned as
    /// `Err(TokenInactive)` carrying the parsed body, so callers can both
    /// fail the request and inspect what the server said.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, AuthError> {
        self.check_credentials()?;
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .http
            .post(self.endpoint(&self.introspection_path))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| AuthError::IntrospectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        let body: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| AuthError::IntrospectionFailed(e.to_string()))?;

        if !body.active {
            return Err(AuthError::TokenInactive(Box::new(body)));
        }

        Ok(body)
    }

    /// RFC 7009 token revocation. Any 2xx is success, including for tokens
    /// the server has already revoked.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.check_credentials()?;
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .http
            .post(self.endpoint(&self.revocation_path))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        Ok(())
    }

    async fn fetch_client_credentials(
        &self,
        scopes: &[String],
    ) -> Result<TokenResponse, AuthError> {
        self.check_credentials()?;

        // The scope parameter is omitted entirely for an empty scope list.
        let mut params = vec![("grant_type".to_string(), "client_credentials".to_string())];
        if !scopes.is_empty() {
            params.push(("scope".to_string(), scopes.join(" ")));
        }

        let response = self
            .http
            .post(self.endpoint(&self.token_path))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::TokenFetchFailed(e.to_string()))
    }
}

#[async_trait]
impl TokenFetcher for OAuth2Client {
    async fn client_credentials(&self, scopes: &[String]) -> Result<TokenResponse, AuthError> {
        self.fetch_client_credentials(scopes).await
    }
}

/// Map a non-2xx authorization server response onto the auth error taxonomy.
///
/// - `invalid_client` → the configured credentials are wrong
/// - `invalid_grant`  → the presented token is bad
/// - anything else    → opaque server error carrying the description
async fn map_error_response(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<OAuth2ErrorBody>(&text) {
        Ok(body) => match body.error.as_str() {
            "invalid_client" => AuthError::MissingCredentials,
            "invalid_grant" => AuthError::InvalidToken(
                body.error_description
                    .unwrap_or_else(|| "invalid grant".to_string()),
            ),
            other => AuthError::ServerError(
                body.error_description.unwrap_or_else(|| other.to_string()),
            ),
        },
        Err(_) => AuthError::ServerError(format!("status {status}: {text}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> OAuth2Client {
        OAuth2Client::new(
            base,
            "svc-client",
            "svc-secret",
            "oauth2/token",
            "oauth2/introspect",
            "oauth2/revoke",
        )
    }

    #[test]
    fn endpoint_join_normalises_slashes() {
        let c = client("https://auth.example.com/");
        assert_eq!(
            c.endpoint("/oauth2/introspect"),
            "https://auth.example.com/oauth2/introspect"
        );
        assert_eq!(
            c.endpoint("oauth2/token"),
            "https://auth.example.com/oauth2/token"
        );
    }

    #[tokio::test]
    async fn introspect_requires_credentials_and_token() {
        let c = OAuth2Client::new("http://localhost", "", "", "t", "i", "r");
        assert!(matches!(
            c.introspect("tok").await,
            Err(AuthError::MissingCredentials)
        ));

        let c = client("http://localhost");
        assert!(matches!(
            c.introspect("").await,
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn introspect_parses_active_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/introspect"))
            .and(header_exists("authorization"))
            .and(body_string_contains("token_type_hint=access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "active": true,
                "sub": "3f2f0af5-9a1e-4d1c-9a6f-0d9a3b1f7c11",
                "client_id": "web",
                "scope": "users:read users:write"
            })))
            .mount(&server)
            .await;

        let resp = client(&server.uri()).introspect("tok").await.unwrap();
        assert!(resp.active);
        assert_eq!(resp.client_id.as_deref(), Some("web"));
        assert_eq!(resp.scope_list(), vec!["users:read", "users:write"]);
    }

    #[tokio::test]
    async fn inactive_token_returns_the_parsed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "active": false,
                "client_id": "web"
            })))
            .mount(&server)
            .await;

        match client(&server.uri()).introspect("tok").await {
            Err(AuthError::TokenInactive(body)) => {
                assert!(!body.active);
                assert_eq!(body.client_id.as_deref(), Some("web"));
            }
            other => panic!("expected TokenInactive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rfc6749_error_bodies_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/introspect"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server.uri()).introspect("tok").await,
            Err(AuthError::MissingCredentials)
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "grant is no longer valid"
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server.uri()).client_credentials(&[]).await,
            Err(AuthError::InvalidToken(d)) if d == "grant is no longer valid"
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/revoke"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "server_error",
                "error_description": "boom"
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server.uri()).revoke("tok").await,
            Err(AuthError::ServerError(d)) if d == "boom"
        ));
    }

    #[tokio::test]
    async fn revoke_accepts_any_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/revoke"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client(&server.uri()).revoke("already-revoked").await.is_ok());
    }

    #[tokio::test]
    async fn client_credentials_omits_scope_param_when_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let resp = client(&server.uri())
            .client_credentials(&[])
            .await
            .unwrap();
        assert_eq!(resp.access_token, "t");
        assert_eq!(resp.expires_in, 3600);

        // The mock captured exactly one request; assert the scope key is absent.
        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(!body.contains("scope="));
    }

    #[tokio::test]
    async fn network_failure_maps_per_call_kind() {
        // Nothing is listening on this port.
        let c = client("http://127.0.0.1:1");
        assert!(matches!(
            c.introspect("tok").await,
            Err(AuthError::IntrospectionFailed(_))
        ));
        assert!(matches!(
            c.client_credentials(&[]).await,
            Err(AuthError::TokenFetchFailed(_))
        ));
        assert!(matches!(
            c.revoke("tok").await,
            Err(AuthError::RequestFailed(_))
        ));
    }
}
