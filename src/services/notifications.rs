/*
 * Responsibility
 * - 下流 notification service への fire-and-forget 呼び出し
 * - bearer は ServiceTokenManager から借りる。失敗はログのみ、呼び出し元へは返さない
 */
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::services::auth::ServiceTokenManager;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRequest<'a> {
    user_id: Uuid,
    kind: &'a str,
    body: &'a str,
}

/// HTTP client for the downstream notification service.
///
/// Every call is fire-and-forget: a failed service-token fetch skips the
/// call, a failed delivery is logged, and neither ever reaches the end user.
#[derive(Clone)]
pub struct NotificationClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<ServiceTokenManager>,
}

impl NotificationClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<ServiceTokenManager>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Dispatch a notification on a detached task.
    pub fn notify(&self, user_id: Uuid, kind: &'static str, body: String) {
        let client = self.clone();
        tokio::spawn(async move {
            client.send(user_id, kind, &body).await;
        });
    }

    async fn send(&self, user_id: Uuid, kind: &str, body: &str) {
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => {
                // Retried implicitly on the next demand.
                tracing::warn!(error = %e, kind, "skipping notification: no service token");
                return;
            }
        };

        let url = format!(
            "{}/api/v1/notifications",
            self.base_url.trim_end_matches('/')
        );

        let result = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&NotificationRequest {
                user_id,
                kind,
                body,
            })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                metrics::counter!("notifications_sent_total").increment(1);
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    kind,
                    user_id = %user_id,
                    "notification service rejected the request"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, kind, user_id = %user_id, "notification delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::error::AuthError;
    use crate::services::auth::oauth2::{TokenFetcher, TokenResponse};
    use async_trait::async_trait;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedFetcher;

    #[async_trait]
    impl TokenFetcher for FixedFetcher {
        async fn client_credentials(&self, _: &[String]) -> Result<TokenResponse, AuthError> {
            Ok(TokenResponse {
                access_token: "svc-token".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
            })
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl TokenFetcher for FailingFetcher {
        async fn client_credentials(&self, _: &[String]) -> Result<TokenResponse, AuthError> {
            Err(AuthError::MissingCredentials)
        }
    }

    #[tokio::test]
    async fn sends_with_a_borrowed_service_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications"))
            .and(bearer_token("svc-token"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(ServiceTokenManager::new(Arc::new(FixedFetcher), vec![], 0.1));
        let client = NotificationClient::new(server.uri(), tokens);

        client
            .send(Uuid::new_v4(), "new_follower", "someone followed you")
            .await;
    }

    #[tokio::test]
    async fn token_fetch_failure_skips_the_call() {
        let server = MockServer::start().await;
        // No expectation: the endpoint must never be hit.
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = Arc::new(ServiceTokenManager::new(
            Arc::new(FailingFetcher),
            vec![],
            0.1,
        ));
        let client = NotificationClient::new(server.uri(), tokens);

        // Must not error out.
        client.send(Uuid::new_v4(), "email_changed", "email updated").await;
    }
}
