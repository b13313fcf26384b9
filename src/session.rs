use tower_sessions::Session;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// The logged-in user's id, or `Unauthenticated`.
pub async fn require_user(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_ID)
        .await?
        .ok_or(AppError::Unauthenticated)
}

/// Identifies the session a mutation came from so its own broadcast echo can
/// be skipped. `None` until the session has been persisted, which is fine:
/// an unidentified origin is simply never filtered.
pub fn origin_of(session: &Session) -> Option<String> {
    session.id().map(|id| id.to_string())
}
