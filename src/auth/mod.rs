mod clients;
mod lockin;
mod login;
mod logout;

use axum::{Json, debug_handler, extract::State, routing::{get, post}, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, AppState, db, session::USER_ID};

pub use clients::Clients;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login))
        .route("/lockin", get(lockin::lockin))
        .route("/api/logout", post(logout::logout))
        .route("/api/whoami", get(whoami))
}

/// Find-or-create by academic email; an existing account gets its name and
/// token refreshed on every login.
pub(crate) async fn upsert_user(
    db_pool: &SqlitePool,
    name: &str,
    email: &str,
    access_token: &str,
) -> AppResult<String> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db_pool)
        .await?;

    if let Some((id,)) = existing {
        sqlx::query("UPDATE users SET name=?, access_token=? WHERE id=?")
            .bind(name)
            .bind(access_token)
            .bind(&id)
            .execute(db_pool)
            .await?;
        info!("{name} logged in");
        return Ok(id);
    }

    let id = db::new_id();
    sqlx::query(
        "INSERT INTO users (id,name,email,access_token,is_verified) VALUES (?,?,?,?,TRUE)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(access_token)
    .execute(db_pool)
    .await?;
    info!("{name} registered");
    Ok(id)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
struct WhoamiResponse {
    user: Option<CurrentUser>,
}

#[debug_handler]
async fn whoami(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<WhoamiResponse>> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Ok(Json(WhoamiResponse { user: None }));
    };

    let user = sqlx::query_as::<_, (String, String, String)>(
        "SELECT id,name,email FROM users WHERE id=?",
    )
    .bind(&user_id)
    .fetch_optional(&db_pool)
    .await?
    .map(|(user_id, name, email)| CurrentUser { user_id, name, email });

    Ok(Json(WhoamiResponse { user }))
}
