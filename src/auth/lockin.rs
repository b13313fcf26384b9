use axum::{debug_handler, extract::{Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{AppError, AppResult, AppState, session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID}};

use super::Clients;

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// What the identity provider reports about the logged-in student. The
/// academic id doubles as the account email.
#[derive(Deserialize)]
struct IdpProfile {
    name: Option<String>,
    academic_id: String,
}

/// OAuth return leg: verify state, trade the code for a token, fetch the
/// profile, upsert the user, and mark the session as logged in.
#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or(AppError::Validation("OAuth: without state".to_owned()))?);
    let code = AuthorizationCode::new(code.ok_or(AppError::Validation("OAuth: without code".to_owned()))?);

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err(AppError::Validation("no csrf_state".to_owned()));
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(AppError::Forbidden("csrf tokens don't match"));
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err(AppError::Validation("no pkce_verifier".to_owned()));
    };

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = clients
        .idp()
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let profile: IdpProfile = http_client
        .get(&clients.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?
        .json()
        .await?;

    let name = profile.name.unwrap_or_else(|| "Nameless User".to_owned());
    let user_id = super::upsert_user(&db_pool, &name, &profile.academic_id, access_token).await?;

    info!("welcome {name} ({user_id})");
    session.insert(USER_ID, user_id).await?;

    let return_url: String = session
        .get(RETURN_URL)
        .await?
        .unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
