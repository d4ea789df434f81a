use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use uuid::Uuid;

use scales_db::Database;
use scales_types::api::UserView;

use crate::error::ApiError;
use crate::storage::Storage;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub tokens: TokenService,
}

/// A minted token plus the user view it belongs to.
pub struct Session {
    pub token: String,
    pub user: UserView,
}

pub fn register(state: &AppStateInner, username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::Validation("username"));
    }
    if password.is_empty() {
        return Err(ApiError::Validation("password"));
    }

    if state.db.get_user_by_username(username)?.is_some() {
        return Err(ApiError::Conflict);
    }

    // Hash with Argon2id; salt is random per user
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    state
        .db
        .create_user(&Uuid::new_v4().to_string(), username, &password_hash)?;

    Ok(())
}

/// Unknown usernames and wrong passwords both come back `Unauthorized`;
/// callers see the same denied payload either way.
pub fn login(state: &AppStateInner, username: &str, password: &str) -> Result<Session, ApiError> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("credentials"));
    }

    let Some(user) = state.db.get_user_by_username(username)? else {
        return Err(ApiError::Unauthorized);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("stored hash unreadable: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let token = state.tokens.mint(&user.id)?;

    Ok(Session {
        token,
        user: UserView {
            id: user.id.into(),
            username: user.username,
        },
    })
}

/// Verifies the token and hands back an already-expired replacement plus
/// the sentinel user view. There is no server-side invalidation; expiry
/// alone ends the session.
pub fn logout(state: &AppStateInner, token: &str) -> Result<Session, ApiError> {
    let claims = state.tokens.verify(token)?;
    let expired = state.tokens.mint_expired(&claims.sub)?;

    Ok(Session {
        token: expired,
        user: UserView::sentinel(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(dir.path().join("uploads")).await.unwrap(),
            tokens: TokenService::new("test-secret", 3600),
        });
        (state, dir)
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let (state, _dir) = state().await;
        assert!(matches!(
            register(&state, "", "pw1"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            register(&state, "alice", ""),
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let (state, _dir) = state().await;
        register(&state, "alice", "pw1").unwrap();
        assert!(matches!(
            register(&state, "alice", "pw2"),
            Err(ApiError::Conflict)
        ));

        // only the first registration stuck
        let user = state.db.get_user_by_username("alice").unwrap().unwrap();
        let hash = PasswordHash::new(&user.password).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"pw1", &hash)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (state, _dir) = state().await;
        register(&state, "alice", "pw1").unwrap();

        assert!(matches!(
            login(&state, "alice", "wrong"),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            login(&state, "nobody", "pw1"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn login_mints_verifiable_token() {
        let (state, _dir) = state().await;
        register(&state, "alice", "pw1").unwrap();

        let session = login(&state, "alice", "pw1").unwrap();
        assert_eq!(session.user.username, "alice");

        let claims = state.tokens.verify(&session.token).unwrap();
        assert_eq!(claims.sub, session.user.id.as_str());
    }

    #[tokio::test]
    async fn logout_returns_sentinel_and_rejects_bad_tokens() {
        let (state, _dir) = state().await;
        register(&state, "alice", "pw1").unwrap();
        let session = login(&state, "alice", "pw1").unwrap();

        let out = logout(&state, &session.token).unwrap();
        assert_eq!(out.user.username, "0");
        assert_eq!(out.user.id.as_str(), "0");

        assert!(matches!(
            logout(&state, "not-a-token"),
            Err(ApiError::Unauthorized)
        ));
    }
}
