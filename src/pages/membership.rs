use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, realtime::{Notifier, RealtimeEvent}, session};

use super::PageUser;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddSelfToPageRequest {
    page_id: String,
    #[serde(default)]
    semester: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoveSelfFromPageRequest {
    page_id: String,
}

#[derive(Serialize)]
pub(crate) struct AddedResponse {
    added: bool,
}

#[derive(Serialize)]
pub(crate) struct RemovedResponse {
    removed: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_self_handler(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    session: Session,
    Json(AddSelfToPageRequest { page_id, semester }): Json<AddSelfToPageRequest>,
) -> AppResult<Json<AddedResponse>> {
    let requester_id = session::require_user(&session).await?;
    let origin = session::origin_of(&session);

    if super::page_by_id(&db_pool, &page_id).await?.is_none() {
        return Err(AppError::NotFound("page"));
    }

    super::add_member(&db_pool, &page_id, &requester_id, &semester).await?;

    let (name,): (String,) = sqlx::query_as("SELECT name FROM users WHERE id=?")
        .bind(&requester_id)
        .fetch_one(&db_pool)
        .await?;
    notifier
        .publish(
            &page_id,
            origin,
            RealtimeEvent::UserJoinedPage {
                user: PageUser { user_id: requester_id, name },
            },
        )
        .await;

    Ok(Json(AddedResponse { added: true }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn remove_self_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(RemoveSelfFromPageRequest { page_id }): Json<RemoveSelfFromPageRequest>,
) -> AppResult<Json<RemovedResponse>> {
    let requester_id = session::require_user(&session).await?;

    sqlx::query("DELETE FROM page_members WHERE page_id=? AND user_id=?")
        .bind(&page_id)
        .bind(&requester_id)
        .execute(&db_pool)
        .await?;

    Ok(Json(RemovedResponse { removed: true }))
}
