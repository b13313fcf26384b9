use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, db, pages, realtime::{Notifier, RealtimeEvent}, session};

use super::Lounge;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLoungeRequest {
    page_id: String,
    name: String,
}

#[derive(Serialize)]
pub(crate) struct CreateLoungeResponse {
    created: bool,
    lounge: Lounge,
}

/// Creation is deliberately not idempotent: two identical requests make two
/// lounges. The submit control is disabled in flight on the client side.
pub async fn create_lounge(
    db_pool: &SqlitePool,
    notifier: &Notifier,
    origin: Option<String>,
    requester_id: &str,
    page_id: &str,
    name: &str,
) -> AppResult<Lounge> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("lounge name must not be empty".to_owned()));
    }

    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM pages WHERE id=?")
        .bind(page_id)
        .fetch_optional(db_pool)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("page"));
    }

    if !pages::is_member(db_pool, page_id, requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }

    let lounge = Lounge {
        id: db::new_id(),
        page_id: page_id.to_owned(),
        name: name.to_owned(),
        user_ids: Vec::new(),
    };
    sqlx::query("INSERT INTO lounges (id,page_id,name) VALUES (?,?,?)")
        .bind(&lounge.id)
        .bind(&lounge.page_id)
        .bind(&lounge.name)
        .execute(db_pool)
        .await?;

    notifier
        .publish(page_id, origin, RealtimeEvent::NewLounge { lounge: lounge.clone() })
        .await;

    Ok(lounge)
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_lounge_handler(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    session: Session,
    Json(req): Json<CreateLoungeRequest>,
) -> AppResult<Json<CreateLoungeResponse>> {
    let requester_id = session::require_user(&session).await?;
    let origin = session::origin_of(&session);

    let lounge = create_lounge(&db_pool, &notifier, origin, &requester_id, &req.page_id, &req.name).await?;
    Ok(Json(CreateLoungeResponse { created: true, lounge }))
}
