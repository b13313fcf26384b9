pub mod cache;
pub mod membership;
pub mod new;

use axum::{Router, routing::post};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{AppResult, AppState};

/// A lounge as the front-end sees it: the member set rides along as
/// `userIds`. Uniqueness is the member table's composite key, not anything
/// the wire shape has to promise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lounge {
    pub id: String,
    pub page_id: String,
    pub name: String,
    pub user_ids: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createNewLounge", post(new::create_lounge_handler))
        .route("/addSelfToLounge", post(membership::add_self_handler))
        .route("/removeSelfFromLounge", post(membership::remove_self_handler))
}

pub async fn member_ids(db_pool: &SqlitePool, lounge_id: &str) -> AppResult<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM lounge_members WHERE lounge_id=? ORDER BY user_id")
            .bind(lounge_id)
            .fetch_all(db_pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Every lounge of the page that still has members. Emptied lounges keep
/// their row but never show up in a listing (soft-hide).
pub async fn list_for_page(db_pool: &SqlitePool, page_id: &str) -> AppResult<Vec<Lounge>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id,name FROM lounges WHERE page_id=?")
            .bind(page_id)
            .fetch_all(db_pool)
            .await?;

    let mut lounges = Vec::new();
    for (id, name) in rows {
        let user_ids = member_ids(db_pool, &id).await?;
        if user_ids.is_empty() {
            continue;
        }
        lounges.push(Lounge {
            id,
            page_id: page_id.to_owned(),
            name,
            user_ids,
        });
    }
    Ok(lounges)
}
