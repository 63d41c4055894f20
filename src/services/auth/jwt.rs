/*
 * Responsibility
 * - HS256 access token のローカル検証 (署名 / exp / token_type)
 * - アルゴリズムは HS256 に固定 (alg confusion 対策)
 */
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};

use crate::services::auth::claims::TokenClaims;
use crate::services::auth::error::AuthError;

/// Validate a compact HS256 JWS against a shared secret.
///
/// Enforced here:
/// - signing algorithm must be HS256 (anything else, including `none` and
///   RS256, is rejected before signature verification)
/// - signature must verify against `secret`
/// - `exp` must be strictly in the future, zero leeway
/// - `token_type`, when present, must be `access_token` (absence is accepted
///   for tokens issued before the claim was introduced)
pub fn validate(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    if secret.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);

    let data = jsonwebtoken::decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::MissingRequiredClaim(c) if c == "exp" => AuthError::TokenExpired,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::InvalidToken("unexpected signing method".to_string())
        }
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    let claims = data.claims;

    // jsonwebtoken accepts `exp == now`; we require strictly-future expiry.
    let now = chrono::Utc::now().timestamp();
    match claims.exp {
        Some(exp) if exp > now => {}
        _ => return Err(AuthError::TokenExpired),
    }

    if let Some(token_type) = claims.token_type.as_deref()
        && token_type != "access_token"
    {
        return Err(AuthError::InvalidTokenType(token_type.to_string()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-minimum-32-chars!";

    fn sign(claims: &TokenClaims, secret: &str, alg: Algorithm) -> String {
        jsonwebtoken::encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn base_claims() -> TokenClaims {
        TokenClaims {
            sub: Uuid::new_v4().to_string(),
            user_id: None,
            client_id: Some("web".to_string()),
            scopes: vec!["users:read".to_string()],
            token_type: Some("access_token".to_string()),
            iat: Some(chrono::Utc::now().timestamp()),
            exp: Some(chrono::Utc::now().timestamp() + 3600),
        }
    }

    #[test]
    fn accepts_a_valid_token_and_preserves_scope_order() {
        let mut claims = base_claims();
        claims.scopes = vec!["b".into(), "a".into(), "b".into()];
        let token = sign(&claims, SECRET, Algorithm::HS256);

        let out = validate(&token, SECRET).unwrap();
        assert_eq!(out.sub, claims.sub);
        assert_eq!(out.scopes, vec!["b", "a", "b"]);
    }

    #[test]
    fn rejects_empty_token_and_empty_secret() {
        assert!(matches!(validate("", SECRET), Err(AuthError::MissingToken)));
        let token = sign(&base_claims(), SECRET, Algorithm::HS256);
        assert!(matches!(
            validate(&token, ""),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let mut claims = base_claims();
        claims.exp = Some(chrono::Utc::now().timestamp() - 3600);
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert!(matches!(
            validate(&token, SECRET),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign(&base_claims(), "other-secret-with-enough-length!!", Algorithm::HS256);
        assert!(matches!(
            validate(&token, SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_non_hs256_algorithm() {
        // Same HMAC family, different digest: must still be rejected.
        let token = sign(&base_claims(), SECRET, Algorithm::HS384);
        match validate(&token, SECRET) {
            Err(AuthError::InvalidToken(msg)) => {
                assert!(msg.contains("unexpected signing method"))
            }
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_access_token_type() {
        let mut claims = base_claims();
        claims.token_type = Some("refresh_token".to_string());
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert!(matches!(
            validate(&token, SECRET),
            Err(AuthError::InvalidTokenType(t)) if t == "refresh_token"
        ));
    }

    #[test]
    fn accepts_absent_token_type() {
        let mut claims = base_claims();
        claims.token_type = None;
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert!(validate(&token, SECRET).is_ok());
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(matches!(
            validate("not.a.jwt", SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
