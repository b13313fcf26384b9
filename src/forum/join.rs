use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, pages, session};

use super::{Comment, GroupPost};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinForumRequest {
    page_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostWithComments {
    pub post: GroupPost,
    pub comments: Vec<Comment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinForumResponse {
    success: bool,
    group_posts: Vec<PostWithComments>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn join_forum_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(JoinForumRequest { page_id }): Json<JoinForumRequest>,
) -> AppResult<Json<JoinForumResponse>> {
    let requester_id = session::require_user(&session).await?;

    if !pages::is_member(&db_pool, &page_id, &requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }

    let mut group_posts = Vec::new();
    for post in super::posts_of_page(&db_pool, &page_id).await? {
        let comments = super::comments_of_post(&db_pool, &post.id).await?;
        group_posts.push(PostWithComments { post, comments });
    }

    Ok(Json(JoinForumResponse { success: true, group_posts }))
}
