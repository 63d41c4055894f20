/*
 * Responsibility
 * - user-scoped read / follow 操作の認可判定 (visibility gate)
 * - 判定本体は純関数に寄せ、DB 参照は薄い async ラッパーに閉じ込める
 *
 * Notes
 * - unknown な visibility 値は private 扱い (fail-closed)
 * - private profile の read 拒否は漏えい防止のため 404 に潰せる (leak_safe)
 */
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::repos::{follow_repo, user_repo};
use crate::services::auth::Principal;

/// Privacy preference on a user profile.
///
/// Parsing is fail-closed: any value that is not exactly `public` or
/// `followers_only` is treated as `private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVisibility {
    Public,
    FollowersOnly,
    Private,
}

impl ProfileVisibility {
    pub fn parse(s: &str) -> Self {
        match s {
            "public" => Self::Public,
            "followers_only" => Self::FollowersOnly,
            _ => Self::Private,
        }
    }
}

/// The target-side facts a read decision needs.
#[derive(Debug, Clone)]
pub struct TargetUser {
    pub id: Uuid,
    pub is_active: bool,
    pub visibility: ProfileVisibility,
    pub allow_follows: bool,
}

impl TargetUser {
    pub fn from_row(row: &user_repo::VisibilityRow) -> Self {
        Self {
            id: row.id,
            is_active: row.is_active,
            visibility: ProfileVisibility::parse(&row.profile_visibility),
            allow_follows: row.allow_follows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    Allow,
    Forbidden,
    NotFound,
}

/// Decide a read of `target`'s profile / followers / following / activity.
///
/// `viewer` is `None` for service principals (they see only public data).
pub fn decide_read(
    viewer: Option<Uuid>,
    target: &TargetUser,
    viewer_follows_target: bool,
) -> ReadDecision {
    if !target.is_active {
        return ReadDecision::NotFound;
    }
    if viewer == Some(target.id) {
        return ReadDecision::Allow;
    }
    match target.visibility {
        ProfileVisibility::Public => ReadDecision::Allow,
        ProfileVisibility::FollowersOnly => {
            if viewer_follows_target {
                ReadDecision::Allow
            } else {
                ReadDecision::Forbidden
            }
        }
        ProfileVisibility::Private => ReadDecision::Forbidden,
    }
}

/// Authorize a read of a user-scoped resource, looking up the target's
/// privacy preferences and (only when needed) the follow edge.
///
/// With `leak_safe`, a forbidden outcome is reported as `NotFound` so the
/// existence of a private profile is not revealed.
///
/// Viewing one's own resource skips the privacy lookup entirely: private
/// users must still be able to read their own data.
pub async fn authorize_read(
    db: &PgPool,
    principal: &Principal,
    target_id: Uuid,
    leak_safe: bool,
) -> Result<(), AppError> {
    let viewer = principal.user_uuid();
    if viewer == Some(target_id) {
        return Ok(());
    }

    let target = user_repo::get_visibility(db, target_id)
        .await?
        .map(|row| TargetUser::from_row(&row))
        .ok_or(AppError::not_found("user"))?;

    // The follow edge only matters for followers_only profiles.
    let viewer_follows_target = match (target.visibility, viewer) {
        (ProfileVisibility::FollowersOnly, Some(viewer_id)) if target.is_active => {
            follow_repo::is_following(db, viewer_id, target_id).await?
        }
        _ => false,
    };

    match decide_read(viewer, &target, viewer_follows_target) {
        ReadDecision::Allow => Ok(()),
        ReadDecision::NotFound => Err(AppError::not_found("user")),
        ReadDecision::Forbidden if leak_safe => Err(AppError::not_found("user")),
        ReadDecision::Forbidden => Err(AppError::Forbidden),
    }
}

/// The path-level actor must be the authenticated principal, unless the
/// upstream gateway vouches for an admin via `X-User-Role`.
///
/// The header is trusted as-is: this is only safe behind a gateway that
/// strips or validates it. The service does not verify role claims itself.
pub fn ensure_actor(
    principal: &Principal,
    path_actor: Uuid,
    admin_override: bool,
) -> Result<(), AppError> {
    if admin_override {
        return Ok(());
    }
    if principal.user_uuid() == Some(path_actor) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Validate a follow from `actor` to `target` (beyond `ensure_actor`).
pub fn decide_follow(actor: Uuid, target: &TargetUser) -> Result<(), AppError> {
    if actor == target.id {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Cannot follow yourself",
        ));
    }
    if !target.is_active {
        return Err(AppError::not_found("user"));
    }
    if !target.allow_follows {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(visibility: ProfileVisibility) -> TargetUser {
        TargetUser {
            id: Uuid::new_v4(),
            is_active: true,
            visibility,
            allow_follows: true,
        }
    }

    #[test]
    fn parse_is_fail_closed() {
        assert_eq!(ProfileVisibility::parse("public"), ProfileVisibility::Public);
        assert_eq!(
            ProfileVisibility::parse("followers_only"),
            ProfileVisibility::FollowersOnly
        );
        assert_eq!(ProfileVisibility::parse("private"), ProfileVisibility::Private);
        // Unknown and near-miss values collapse to private.
        assert_eq!(ProfileVisibility::parse("PUBLIC"), ProfileVisibility::Private);
        assert_eq!(ProfileVisibility::parse("friends"), ProfileVisibility::Private);
        assert_eq!(ProfileVisibility::parse(""), ProfileVisibility::Private);
    }

    #[test]
    fn self_read_is_always_allowed() {
        let t = target(ProfileVisibility::Private);
        assert_eq!(decide_read(Some(t.id), &t, false), ReadDecision::Allow);
    }

    #[test]
    fn public_profiles_are_readable_by_anyone() {
        let t = target(ProfileVisibility::Public);
        assert_eq!(decide_read(Some(Uuid::new_v4()), &t, false), ReadDecision::Allow);
        // Service principals too.
        assert_eq!(decide_read(None, &t, false), ReadDecision::Allow);
    }

    #[test]
    fn followers_only_requires_the_follow_edge() {
        let t = target(ProfileVisibility::FollowersOnly);
        let viewer = Some(Uuid::new_v4());
        assert_eq!(decide_read(viewer, &t, false), ReadDecision::Forbidden);
        assert_eq!(decide_read(viewer, &t, true), ReadDecision::Allow);
    }

    #[test]
    fn private_profiles_are_forbidden_even_to_followers() {
        let t = target(ProfileVisibility::Private);
        assert_eq!(
            decide_read(Some(Uuid::new_v4()), &t, true),
            ReadDecision::Forbidden
        );
    }

    #[test]
    fn inactive_target_is_not_found_before_anything_else() {
        let mut t = target(ProfileVisibility::Public);
        t.is_active = false;
        assert_eq!(decide_read(Some(Uuid::new_v4()), &t, false), ReadDecision::NotFound);
        // Even for the owner: a deactivated account reads as gone.
        assert_eq!(decide_read(Some(t.id), &t, false), ReadDecision::NotFound);
    }

    #[test]
    fn ensure_actor_matches_principal_or_admin() {
        let id = Uuid::new_v4();
        let p = Principal::user(id, "web", vec![]);
        assert!(ensure_actor(&p, id, false).is_ok());
        assert!(matches!(
            ensure_actor(&p, Uuid::new_v4(), false),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_actor(&p, Uuid::new_v4(), true).is_ok());
    }

    #[test]
    fn ensure_actor_rejects_service_principals_without_override() {
        let p = Principal::service("svc", vec![]);
        assert!(matches!(
            ensure_actor(&p, Uuid::new_v4(), false),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn follow_rules() {
        let t = target(ProfileVisibility::Public);

        assert!(matches!(
            decide_follow(t.id, &t),
            Err(AppError::BadRequest { .. })
        ));

        let mut blocked = t.clone();
        blocked.allow_follows = false;
        assert!(matches!(
            decide_follow(Uuid::new_v4(), &blocked),
            Err(AppError::Forbidden)
        ));

        let mut inactive = t.clone();
        inactive.is_active = false;
        assert!(matches!(
            decide_follow(Uuid::new_v4(), &inactive),
            Err(AppError::NotFound { .. })
        ));

        assert!(decide_follow(Uuid::new_v4(), &t).is_ok());
    }
}
