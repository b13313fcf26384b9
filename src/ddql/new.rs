use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, db, pages, session};

use super::{Ddql, DdqlDetail, Visibility};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDdqlRequest {
    page_id: String,
    title: String,
    visibility: Visibility,
    #[serde(flatten)]
    detail: DdqlDetail,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDdqlResponse {
    created: bool,
    #[serde(rename = "DDQL")]
    ddql: Ddql,
}

pub async fn create_ddql(
    db_pool: &SqlitePool,
    requester_id: &str,
    page_id: &str,
    title: &str,
    visibility: Visibility,
    detail: DdqlDetail,
) -> AppResult<Ddql> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_owned()));
    }
    if let DdqlDetail::QuickLink { url } = &detail {
        if url.trim().is_empty() {
            return Err(AppError::Validation("quick link needs a url".to_owned()));
        }
    }

    if !pages::is_member(db_pool, page_id, requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }

    let ddql = Ddql {
        id: db::new_id(),
        page_id: page_id.to_owned(),
        user_id: requester_id.to_owned(),
        title: title.to_owned(),
        visibility,
        detail,
        added_user_ids: Vec::new(),
    };

    let (due_at, url) = match &ddql.detail {
        DdqlDetail::DueDate { due_date } => (Some(due_date.unix_timestamp()), None),
        DdqlDetail::QuickLink { url } => (None, Some(url.clone())),
    };

    sqlx::query(
        "INSERT INTO ddqls (id,page_id,user_id,title,kind,due_at,url,visibility)
         VALUES (?,?,?,?,?,?,?,?)",
    )
    .bind(&ddql.id)
    .bind(&ddql.page_id)
    .bind(&ddql.user_id)
    .bind(&ddql.title)
    .bind(ddql.detail.kind())
    .bind(due_at)
    .bind(url)
    .bind(ddql.visibility.as_str())
    .execute(db_pool)
    .await?;

    Ok(ddql)
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_ddql_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<CreateDdqlRequest>,
) -> AppResult<Json<CreateDdqlResponse>> {
    let requester_id = session::require_user(&session).await?;

    let ddql = create_ddql(
        &db_pool,
        &requester_id,
        &req.page_id,
        &req.title,
        req.visibility,
        req.detail,
    )
    .await?;
    Ok(Json(CreateDdqlResponse { created: true, ddql }))
}
