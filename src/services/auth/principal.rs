/*
 * Responsibility
 * - Handler から見える「認証済み主体」の型 (Principal)
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - invariant: `is_service == true` ⇔ `user_id == Uuid::nil()`
 * - Principal はリクエスト寿命。永続化しない
 */
use uuid::Uuid;

/// The authenticated identity attached to a request.
///
/// Either an end user (`user_id` set, `is_service == false`) or a
/// client-credentials service principal (`user_id` nil, `is_service == true`).
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub is_service: bool,
}

impl Principal {
    pub fn user(user_id: Uuid, client_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            user_id,
            client_id: client_id.into(),
            scopes,
            is_service: false,
        }
    }

    pub fn service(client_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            user_id: Uuid::nil(),
            client_id: client_id.into(),
            scopes,
            is_service: true,
        }
    }

    /// Principal for header-mode deployments (trusted `X-User-Id` upstream).
    pub fn local(user_id: Uuid) -> Self {
        Self::user(user_id, "local", Vec::new())
    }

    /// Exact, case-sensitive scope membership. No normalisation.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// The end-user UUID, or `None` for service principals.
    pub fn user_uuid(&self) -> Option<Uuid> {
        if self.is_service || self.user_id.is_nil() {
            None
        } else {
            Some(self.user_id)
        }
    }
}
