pub mod comments;
pub mod join;
pub mod posts;

use axum::{Router, routing::post};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{AppResult, AppState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupPost {
    pub id: String,
    pub page_id: String,
    pub user_id: String,
    pub title: String,
    pub text: String,
    pub labels: Vec<String>,
    pub reacts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub page_id: String,
    pub user_id: String,
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/joinForum", post(join::join_forum_handler))
        .route("/createNewGroupPost", post(posts::create_post_handler))
        .route("/updateGroupPost", post(posts::update_post_handler))
        .route("/createNewComment", post(comments::create_comment_handler))
        .route("/updateComment", post(comments::update_comment_handler))
}

type PostRow = (String, String, String, String, String, String, i64);

fn post_from_row(row: PostRow) -> GroupPost {
    let (id, page_id, user_id, title, text, labels, reacts) = row;
    GroupPost {
        id,
        page_id,
        user_id,
        title,
        text,
        labels: serde_json::from_str(&labels).unwrap_or_default(),
        reacts,
    }
}

pub(crate) async fn post_by_id(db_pool: &SqlitePool, post_id: &str) -> AppResult<Option<GroupPost>> {
    let row: Option<PostRow> = sqlx::query_as(
        "SELECT id,page_id,user_id,title,text,labels,reacts FROM group_posts WHERE id=?",
    )
    .bind(post_id)
    .fetch_optional(db_pool)
    .await?;
    Ok(row.map(post_from_row))
}

pub(crate) async fn posts_of_page(db_pool: &SqlitePool, page_id: &str) -> AppResult<Vec<GroupPost>> {
    let rows: Vec<PostRow> = sqlx::query_as(
        "SELECT id,page_id,user_id,title,text,labels,reacts FROM group_posts WHERE page_id=?",
    )
    .bind(page_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().map(post_from_row).collect())
}

pub(crate) async fn comments_of_post(db_pool: &SqlitePool, post_id: &str) -> AppResult<Vec<Comment>> {
    let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id,post_id,page_id,user_id,text FROM comments WHERE post_id=?",
    )
    .bind(post_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, post_id, page_id, user_id, text)| Comment { id, post_id, page_id, user_id, text })
        .collect())
}
