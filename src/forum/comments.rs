use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, db, pages, session};

use super::Comment;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCommentRequest {
    page_id: String,
    post_id: String,
    text: String,
}

#[derive(Serialize)]
pub(crate) struct CreateCommentResponse {
    created: bool,
    comment: Comment,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateCommentRequest {
    comment_id: String,
    #[serde(default)]
    delete: bool,
    text: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct UpdateCommentResponse {
    updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<Comment>,
}

pub async fn create_comment(
    db_pool: &SqlitePool,
    requester_id: &str,
    page_id: &str,
    post_id: &str,
    text: &str,
) -> AppResult<Comment> {
    if !pages::is_member(db_pool, page_id, requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }
    if super::post_by_id(db_pool, post_id).await?.is_none() {
        return Err(AppError::NotFound("post"));
    }

    let comment = Comment {
        id: db::new_id(),
        post_id: post_id.to_owned(),
        page_id: page_id.to_owned(),
        user_id: requester_id.to_owned(),
        text: text.to_owned(),
    };
    sqlx::query("INSERT INTO comments (id,post_id,page_id,user_id,text) VALUES (?,?,?,?,?)")
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.page_id)
        .bind(&comment.user_id)
        .bind(&comment.text)
        .execute(db_pool)
        .await?;

    Ok(comment)
}

pub async fn update_comment(
    db_pool: &SqlitePool,
    requester_id: &str,
    req: &UpdateCommentRequest,
) -> AppResult<Option<Comment>> {
    let row: Option<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id,post_id,page_id,user_id,text FROM comments WHERE id=?",
    )
    .bind(&req.comment_id)
    .fetch_optional(db_pool)
    .await?;
    let Some((id, post_id, page_id, user_id, text)) = row else {
        return Err(AppError::NotFound("comment"));
    };
    let mut comment = Comment { id, post_id, page_id, user_id, text };

    if comment.user_id != requester_id
        || !pages::is_member(db_pool, &comment.page_id, requester_id).await?
    {
        return Err(AppError::Forbidden("only the commenter may change this comment"));
    }

    if req.delete {
        sqlx::query("DELETE FROM comments WHERE id=?")
            .bind(&comment.id)
            .execute(db_pool)
            .await?;
        return Ok(None);
    }

    if let Some(text) = &req.text {
        comment.text = text.clone();
    }
    sqlx::query("UPDATE comments SET text=? WHERE id=?")
        .bind(&comment.text)
        .bind(&comment.id)
        .execute(db_pool)
        .await?;

    Ok(Some(comment))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_comment_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<CreateCommentResponse>> {
    let requester_id = session::require_user(&session).await?;

    let comment = create_comment(&db_pool, &requester_id, &req.page_id, &req.post_id, &req.text).await?;
    Ok(Json(CreateCommentResponse { created: true, comment }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_comment_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<Json<UpdateCommentResponse>> {
    let requester_id = session::require_user(&session).await?;

    let comment = update_comment(&db_pool, &requester_id, &req).await?;
    Ok(Json(UpdateCommentResponse { updated: true, comment }))
}
