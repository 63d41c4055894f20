/*
 * Responsibility
 * - 検証済みトークンの「型」 (TokenClaims / IntrospectionResponse)
 * - user UUID の導出規約 (user_id 優先 → sub フォールバック)
 *
 * Notes
 * - scope の分割は single-space split のみ。trim / case fold / dedup はしない
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::error::AuthError;

/// Claims carried by a locally-validated HS256 access token.
///
/// `exp` is kept optional at the serde level so that a missing claim can be
/// reported as an expiry failure instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub scopes: Vec<String>,

    // Must be absent or "access_token". Refresh tokens are never accepted here.
    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub exp: Option<i64>,
}

/// RFC 7662 introspection response, as returned by the authorization server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntrospectionResponse {
    pub active: bool,

    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    // Space-delimited per RFC 7662; parsed lazily via `scope_list()`.
    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub iat: Option<i64>,
}

impl IntrospectionResponse {
    /// Split the space-delimited `scope` string into an ordered list.
    ///
    /// Single ASCII space split only; an absent or empty string yields an
    /// empty list. No trimming and no deduplication.
    pub fn scope_list(&self) -> Vec<String> {
        match self.scope.as_deref() {
            Some(s) if !s.is_empty() => s.split(' ').map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

/// Shared derivation contract for the two claim shapes.
///
/// Precedence: non-empty `user_id` claim, else non-empty `sub`, else the
/// token carries no user identity at all (`NoUserId`).
pub trait UserIdentityClaims {
    fn user_id_claim(&self) -> Option<&str>;
    fn subject_claim(&self) -> Option<&str>;

    fn resolve_user_uuid(&self) -> Result<Uuid, AuthError> {
        let raw = self
            .user_id_claim()
            .filter(|s| !s.is_empty())
            .or_else(|| self.subject_claim().filter(|s| !s.is_empty()))
            .ok_or(AuthError::NoUserId)?;

        Uuid::parse_str(raw)
            .map_err(|_| AuthError::InvalidToken(format!("user id is not a UUID: {raw}")))
    }
}

impl UserIdentityClaims for TokenClaims {
    fn user_id_claim(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn subject_claim(&self) -> Option<&str> {
        Some(&self.sub)
    }
}

impl UserIdentityClaims for IntrospectionResponse {
    fn user_id_claim(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn subject_claim(&self) -> Option<&str> {
        self.sub.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: Option<&str>, sub: &str) -> TokenClaims {
        TokenClaims {
            sub: sub.to_string(),
            user_id: user_id.map(str::to_string),
            client_id: None,
            scopes: Vec::new(),
            token_type: None,
            iat: None,
            exp: None,
        }
    }

    #[test]
    fn user_id_claim_wins_over_sub() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = claims(Some(&a.to_string()), &b.to_string());
        assert_eq!(c.resolve_user_uuid().unwrap(), a);
    }

    #[test]
    fn falls_back_to_sub_when_user_id_absent_or_empty() {
        let b = Uuid::new_v4();
        assert_eq!(claims(None, &b.to_string()).resolve_user_uuid().unwrap(), b);
        assert_eq!(
            claims(Some(""), &b.to_string()).resolve_user_uuid().unwrap(),
            b
        );
    }

    #[test]
    fn no_user_id_when_both_missing() {
        let c = claims(None, "");
        assert!(matches!(c.resolve_user_uuid(), Err(AuthError::NoUserId)));
    }

    #[test]
    fn non_uuid_user_id_is_invalid_token() {
        let c = claims(Some("not-a-uuid"), "");
        assert!(matches!(
            c.resolve_user_uuid(),
            Err(AuthError::InvalidToken(_))
        ));
    }

    fn introspection(scope: Option<&str>) -> IntrospectionResponse {
        IntrospectionResponse {
            active: true,
            sub: None,
            user_id: None,
            client_id: None,
            scope: scope.map(str::to_string),
            token_type: None,
            exp: None,
            iat: None,
        }
    }

    #[test]
    fn scope_list_splits_on_single_space() {
        assert_eq!(introspection(Some("a b")).scope_list(), vec!["a", "b"]);
    }

    #[test]
    fn scope_list_empty_for_absent_or_empty_scope() {
        assert!(introspection(None).scope_list().is_empty());
        assert!(introspection(Some("")).scope_list().is_empty());
    }

    #[test]
    fn scope_list_does_not_trim_or_collapse() {
        // Double space yields an empty element; we do not normalise.
        assert_eq!(
            introspection(Some("a  b")).scope_list(),
            vec!["a", "", "b"]
        );
    }

    #[test]
    fn introspection_user_id_precedence_matches_jwt_claims() {
        let a = Uuid::new_v4();
        let mut r = introspection(None);
        r.sub = Some(Uuid::new_v4().to_string());
        r.user_id = Some(a.to_string());
        assert_eq!(r.resolve_user_uuid().unwrap(), a);
    }
}
