//! Request authentication → Principal を extensions に入れる
//!
//! Three deployment modes, fixed at construction from config:
//! - header mode: a trusted upstream gateway sets `X-User-Id`
//! - JWT mode: local HS256 validation against a shared secret
//! - introspection mode: RFC 7662 round-trip to the authorization server
//!
//! Every failure collapses into the same opaque 401; the precise kind is
//! logged, never echoed to the client.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use uuid::Uuid;

use crate::config::OAuth2Config;
use crate::error::unauthorized_response;
use crate::services::auth::claims::{IntrospectionResponse, TokenClaims, UserIdentityClaims};
use crate::services::auth::{AuthError, OAuth2Client, Principal, jwt};
use crate::state::AppState;

const USER_ID_HEADER: &str = "x-user-id";

/// Validation strategy, discriminated once at startup instead of flag checks
/// scattered through request handling.
pub enum AuthMode {
    Header,
    Jwt { secret: String },
    Introspection { client: OAuth2Client },
}

pub struct Authenticator {
    mode: AuthMode,
}

impl Authenticator {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    pub fn from_config(config: &OAuth2Config) -> Self {
        let mode = if !config.enabled {
            AuthMode::Header
        } else if config.introspection_enabled {
            AuthMode::Introspection {
                client: OAuth2Client::new(
                    config.base_url.clone(),
                    config.client_id.clone(),
                    config.client_secret.clone(),
                    config.token_path.clone(),
                    config.introspection_path.clone(),
                    config.revocation_path.clone(),
                ),
            }
        } else {
            AuthMode::Jwt {
                secret: config.jwt_secret.clone(),
            }
        };

        Self::new(mode)
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            AuthMode::Header => "header",
            AuthMode::Jwt { .. } => "jwt",
            AuthMode::Introspection { .. } => "introspection",
        }
    }

    /// Produce a Principal from the request headers, or the reason we could
    /// not (which the middleware collapses into a 401).
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        match &self.mode {
            AuthMode::Header => {
                let raw = headers
                    .get(USER_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if raw.is_empty() {
                    return Err(AuthError::MissingToken);
                }
                // Only the 36-char canonical lowercase hyphenated form is
                // accepted; Uuid::parse_str alone also takes simple,
                // braced, uppercase and urn forms.
                let user_id = Uuid::parse_str(raw)
                    .ok()
                    .filter(|id| id.to_string() == raw)
                    .ok_or_else(|| {
                        AuthError::InvalidToken("X-User-Id is not a canonical UUID".to_string())
                    })?;
                Ok(Principal::local(user_id))
            }
            AuthMode::Jwt { secret } => {
                let token = bearer_token(headers)?;
                let claims = jwt::validate(token, secret)?;
                principal_from_jwt(&claims)
            }
            AuthMode::Introspection { client } => {
                let token = bearer_token(headers)?;
                let response = client.introspect(token).await?;
                principal_from_introspection(&response)
            }
        }
    }
}

/// Extract the bearer token: scheme must be exactly `Bearer ` (single
/// space, case-sensitive).
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidTokenFormat)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidTokenFormat)?;
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// A token carrying a user identity yields a user principal; one without
/// any (pure client-credentials) yields a service principal.
fn principal_from_jwt(claims: &TokenClaims) -> Result<Principal, AuthError> {
    let client_id = claims.client_id.clone().unwrap_or_default();
    match claims.resolve_user_uuid() {
        Ok(user_id) => Ok(Principal::user(user_id, client_id, claims.scopes.clone())),
        Err(AuthError::NoUserId) => Ok(Principal::service(client_id, claims.scopes.clone())),
        Err(e) => Err(e),
    }
}

fn principal_from_introspection(
    response: &IntrospectionResponse,
) -> Result<Principal, AuthError> {
    let client_id = response.client_id.clone().unwrap_or_default();
    let scopes = response.scope_list();
    match response.resolve_user_uuid() {
        Ok(user_id) => Ok(Principal::user(user_id, client_id, scopes)),
        Err(AuthError::NoUserId) => Ok(Principal::service(client_id, scopes)),
        Err(e) => Err(e),
    }
}

/// Wrap every route in `router` with authentication. Health probes and the
/// metrics endpoints live outside this router and stay public.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, authenticate_request))
}

async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.auth.authenticate(req.headers()).await {
        Ok(principal) => {
            metrics::counter!("auth_success_total").increment(1);
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(err) => {
            metrics::counter!("auth_failures_total").increment(1);
            tracing::warn!(error = %err, "authentication failed");
            unauthorized_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{Algorithm, EncodingKey, Header as JwtHeader};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret-key-minimum-32-chars!";

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[tokio::test]
    async fn header_mode_accepts_a_canonical_uuid() {
        let auth = Authenticator::new(AuthMode::Header);
        let id = "11111111-1111-1111-1111-111111111111";

        let principal = auth
            .authenticate(&headers(&[("x-user-id", id)]))
            .await
            .unwrap();
        assert_eq!(principal.user_id.to_string(), id);
        assert_eq!(principal.client_id, "local");
        assert!(principal.scopes.is_empty());
        assert!(!principal.is_service);
    }

    #[tokio::test]
    async fn header_mode_rejects_missing_and_malformed_ids() {
        let auth = Authenticator::new(AuthMode::Header);

        assert!(matches!(
            auth.authenticate(&headers(&[])).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            auth.authenticate(&headers(&[("x-user-id", "")])).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            auth.authenticate(&headers(&[("x-user-id", "not-a-uuid")])).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn header_mode_rejects_non_canonical_uuid_forms() {
        let auth = Authenticator::new(AuthMode::Header);

        // Shapes Uuid::parse_str would accept but the header contract does not.
        for raw in [
            "11111111111111111111111111111111",
            "AAAAAAAA-AAAA-4AAA-8AAA-AAAAAAAAAAAA",
            "{11111111-1111-1111-1111-111111111111}",
            "urn:uuid:11111111-1111-1111-1111-111111111111",
        ] {
            assert!(
                matches!(
                    auth.authenticate(&headers(&[("x-user-id", raw)])).await,
                    Err(AuthError::InvalidToken(_))
                ),
                "accepted non-canonical form {raw:?}"
            );
        }
    }

    #[test]
    fn bearer_extraction_is_exact() {
        assert!(matches!(
            bearer_token(&headers(&[])),
            Err(AuthError::MissingToken)
        ));
        // Wrong scheme and wrong case are format errors.
        assert!(matches!(
            bearer_token(&headers(&[("authorization", "Token abc")])),
            Err(AuthError::InvalidTokenFormat)
        ));
        assert!(matches!(
            bearer_token(&headers(&[("authorization", "bearer abc")])),
            Err(AuthError::InvalidTokenFormat)
        ));
        // Scheme present but empty residue.
        assert!(matches!(
            bearer_token(&headers(&[("authorization", "Bearer ")])),
            Err(AuthError::MissingToken)
        ));
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc")])).unwrap(),
            "abc"
        );
    }

    fn signed_token(claims: &TokenClaims) -> String {
        jsonwebtoken::encode(
            &JwtHeader::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn jwt_mode_builds_a_user_principal() {
        let auth = Authenticator::new(AuthMode::Jwt {
            secret: SECRET.to_string(),
        });
        let user_id = Uuid::new_v4();
        let token = signed_token(&TokenClaims {
            sub: user_id.to_string(),
            user_id: None,
            client_id: Some("web".to_string()),
            scopes: vec!["users:read".to_string()],
            token_type: Some("access_token".to_string()),
            iat: None,
            exp: Some(chrono::Utc::now().timestamp() + 600),
        });

        let principal = auth
            .authenticate(&headers(&[("authorization", &format!("Bearer {token}"))]))
            .await
            .unwrap();
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.client_id, "web");
        assert!(principal.has_scope("users:read"));
        assert!(!principal.is_service);
    }

    #[tokio::test]
    async fn jwt_mode_rejects_an_expired_token() {
        let auth = Authenticator::new(AuthMode::Jwt {
            secret: SECRET.to_string(),
        });
        let token = signed_token(&TokenClaims {
            sub: Uuid::new_v4().to_string(),
            user_id: None,
            client_id: None,
            scopes: vec![],
            token_type: None,
            iat: None,
            exp: Some(chrono::Utc::now().timestamp() - 3600),
        });

        assert!(matches!(
            auth.authenticate(&headers(&[("authorization", &format!("Bearer {token}"))]))
                .await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn introspection_mode_builds_a_service_principal_without_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "active": true,
                "client_id": "svc",
                "scope": "a b"
            })))
            .mount(&server)
            .await;

        let auth = Authenticator::new(AuthMode::Introspection {
            client: OAuth2Client::new(
                server.uri(),
                "client",
                "secret",
                "oauth2/token",
                "oauth2/introspect",
                "oauth2/revoke",
            ),
        });

        let principal = auth
            .authenticate(&headers(&[("authorization", "Bearer opaque")]))
            .await
            .unwrap();
        assert!(principal.is_service);
        assert!(principal.user_id.is_nil());
        assert_eq!(principal.client_id, "svc");
        assert_eq!(principal.scopes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn introspection_mode_rejects_inactive_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/introspect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "active": false })),
            )
            .mount(&server)
            .await;

        let auth = Authenticator::new(AuthMode::Introspection {
            client: OAuth2Client::new(
                server.uri(),
                "client",
                "secret",
                "oauth2/token",
                "oauth2/introspect",
                "oauth2/revoke",
            ),
        });

        assert!(matches!(
            auth.authenticate(&headers(&[("authorization", "Bearer revoked")]))
                .await,
            Err(AuthError::TokenInactive(_))
        ));
    }
}
