pub mod join;
pub mod membership;
pub mod ws;

use axum::{Router, routing::{get, post}};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{AppResult, AppState};

/// A community a user can belong to: a class or an interest group. Lounges
/// and forum posts hang off a page; page membership gates every mutation
/// inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub name: String,
    pub page_type: String,
    pub description: String,
}

/// The slice of a user other page members get to see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageUser {
    pub user_id: String,
    pub name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/joinPage", post(join::join_page_handler))
        .route("/api/addSelfToPage", post(membership::add_self_handler))
        .route("/api/removeSelfFromPage", post(membership::remove_self_handler))
        .route("/ws/{page_id}", get(ws::page_ws))
}

pub async fn is_member(db_pool: &SqlitePool, page_id: &str, user_id: &str) -> AppResult<bool> {
    Ok(
        sqlx::query_as::<_, (i64,)>("SELECT 1 FROM page_members WHERE page_id=? AND user_id=?")
            .bind(page_id)
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?
            .is_some(),
    )
}

pub async fn add_member(
    db_pool: &SqlitePool,
    page_id: &str,
    user_id: &str,
    semester: &str,
) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO page_members (page_id,user_id,semester) VALUES (?,?,?)")
        .bind(page_id)
        .bind(user_id)
        .bind(semester)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn page_by_id(db_pool: &SqlitePool, page_id: &str) -> AppResult<Option<Page>> {
    let row: Option<(String, String, String, String)> =
        sqlx::query_as("SELECT id,name,page_type,description FROM pages WHERE id=?")
            .bind(page_id)
            .fetch_optional(db_pool)
            .await?;
    Ok(row.map(|(id, name, page_type, description)| Page { id, name, page_type, description }))
}

pub async fn page_by_name(
    db_pool: &SqlitePool,
    page_type: &str,
    name: &str,
) -> AppResult<Option<Page>> {
    let row: Option<(String, String, String, String)> =
        sqlx::query_as("SELECT id,name,page_type,description FROM pages WHERE page_type=? AND name=?")
            .bind(page_type)
            .bind(name)
            .fetch_optional(db_pool)
            .await?;
    Ok(row.map(|(id, name, page_type, description)| Page { id, name, page_type, description }))
}

/// Directory-suppressed users stay out of every roster.
pub async fn visible_users(db_pool: &SqlitePool, page_id: &str) -> AppResult<Vec<PageUser>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT users.id, users.name FROM users
         JOIN page_members ON page_members.user_id = users.id
         WHERE page_members.page_id=? AND users.visible
         ORDER BY users.name",
    )
    .bind(page_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(user_id, name)| PageUser { user_id, name })
        .collect())
}

pub async fn pages_of_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Page>> {
    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT pages.id, pages.name, pages.page_type, pages.description FROM pages
         JOIN page_members ON page_members.page_id = pages.id
         WHERE page_members.user_id=?
         ORDER BY pages.name",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, page_type, description)| Page { id, name, page_type, description })
        .collect())
}
