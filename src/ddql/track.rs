use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, session};

#[derive(Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TrackAction {
    Add,
    Complete,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackDdqlRequest {
    object_id: String,
    action: TrackAction,
}

#[derive(Serialize)]
pub(crate) struct TrackDdqlResponse {
    done: bool,
}

/// Pins an item to (or clears it from) the requester's dashboard. Both
/// directions are set operations, so replays are harmless.
pub async fn track_ddql(
    db_pool: &SqlitePool,
    requester_id: &str,
    ddql_id: &str,
    action: TrackAction,
) -> AppResult<()> {
    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM ddqls WHERE id=?")
        .bind(ddql_id)
        .fetch_optional(db_pool)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("ddql"));
    }

    match action {
        TrackAction::Add => {
            sqlx::query("INSERT OR IGNORE INTO ddql_trackers (ddql_id,user_id) VALUES (?,?)")
                .bind(ddql_id)
                .bind(requester_id)
                .execute(db_pool)
                .await?;
        }
        TrackAction::Complete => {
            sqlx::query("DELETE FROM ddql_trackers WHERE ddql_id=? AND user_id=?")
                .bind(ddql_id)
                .bind(requester_id)
                .execute(db_pool)
                .await?;
        }
    }

    Ok(())
}

#[debug_handler(state = AppState)]
pub(crate) async fn track_ddql_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<TrackDdqlRequest>,
) -> AppResult<Json<TrackDdqlResponse>> {
    let requester_id = session::require_user(&session).await?;

    track_ddql(&db_pool, &requester_id, &req.object_id, req.action).await?;
    Ok(Json(TrackDdqlResponse { done: true }))
}
