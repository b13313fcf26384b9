use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, pages, realtime::{Notifier, RealtimeEvent}, session};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoungeTarget {
    lounge_id: String,
}

#[derive(Serialize)]
pub(crate) struct AddedResponse {
    added: bool,
}

#[derive(Serialize)]
pub(crate) struct RemovedResponse {
    removed: bool,
}

async fn owning_page(db_pool: &SqlitePool, lounge_id: &str) -> AppResult<String> {
    let row: Option<(String,)> = sqlx::query_as("SELECT page_id FROM lounges WHERE id=?")
        .bind(lounge_id)
        .fetch_optional(db_pool)
        .await?;
    match row {
        Some((page_id,)) => Ok(page_id),
        None => Err(AppError::NotFound("lounge")),
    }
}

/// Set-union add: the composite key makes a repeat join a no-op at the
/// storage layer, so concurrent joins can't lose each other.
pub async fn add_self(
    db_pool: &SqlitePool,
    notifier: &Notifier,
    origin: Option<String>,
    requester_id: &str,
    lounge_id: &str,
) -> AppResult<()> {
    let page_id = owning_page(db_pool, lounge_id).await?;

    if !pages::is_member(db_pool, &page_id, requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }

    sqlx::query("INSERT OR IGNORE INTO lounge_members (lounge_id,user_id) VALUES (?,?)")
        .bind(lounge_id)
        .bind(requester_id)
        .execute(db_pool)
        .await?;

    notifier
        .publish(
            &page_id,
            origin,
            RealtimeEvent::UserAddedToLounge {
                user_id: requester_id.to_owned(),
                lounge_id: lounge_id.to_owned(),
            },
        )
        .await;

    Ok(())
}

/// Set-difference remove; leaving a lounge you are not in still succeeds.
/// An emptied lounge keeps its row and disappears from listings only.
pub async fn remove_self(
    db_pool: &SqlitePool,
    notifier: &Notifier,
    origin: Option<String>,
    requester_id: &str,
    lounge_id: &str,
) -> AppResult<()> {
    let page_id = owning_page(db_pool, lounge_id).await?;

    sqlx::query("DELETE FROM lounge_members WHERE lounge_id=? AND user_id=?")
        .bind(lounge_id)
        .bind(requester_id)
        .execute(db_pool)
        .await?;

    notifier
        .publish(
            &page_id,
            origin,
            RealtimeEvent::UserRemovedFromLounge {
                user_id: requester_id.to_owned(),
                lounge_id: lounge_id.to_owned(),
            },
        )
        .await;

    Ok(())
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_self_handler(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    session: Session,
    Json(LoungeTarget { lounge_id }): Json<LoungeTarget>,
) -> AppResult<Json<AddedResponse>> {
    let requester_id = session::require_user(&session).await?;
    let origin = session::origin_of(&session);

    add_self(&db_pool, &notifier, origin, &requester_id, &lounge_id).await?;
    Ok(Json(AddedResponse { added: true }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn remove_self_handler(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    session: Session,
    Json(LoungeTarget { lounge_id }): Json<LoungeTarget>,
) -> AppResult<Json<RemovedResponse>> {
    let requester_id = session::require_user(&session).await?;
    let origin = session::origin_of(&session);

    remove_self(&db_pool, &notifier, origin, &requester_id, &lounge_id).await?;
    Ok(Json(RemovedResponse { removed: true }))
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::{db, lounges, pages, realtime::Notifier};

    use super::*;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_page_with_members(pool: &SqlitePool, users: &[&str]) -> String {
        sqlx::query("INSERT INTO pages (id,name,page_type) VALUES ('p1','6.102','Class')")
            .execute(pool)
            .await
            .unwrap();
        for user in users {
            sqlx::query("INSERT INTO users (id,name,email) VALUES (?,?,?)")
                .bind(user)
                .bind(*user)
                .bind(format!("{user}@example.edu"))
                .execute(pool)
                .await
                .unwrap();
            pages::add_member(pool, "p1", user, "").await.unwrap();
        }
        "p1".to_owned()
    }

    async fn seed_lounge(pool: &SqlitePool, page_id: &str) -> String {
        let id = db::new_id();
        sqlx::query("INSERT INTO lounges (id,page_id,name) VALUES (?,?,'study hall')")
            .bind(&id)
            .bind(page_id)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn add_then_remove_folds_to_the_empty_set() {
        let pool = pool().await;
        let notifier = Notifier::new();
        let page = seed_page_with_members(&pool, &["alice"]).await;
        let lounge = seed_lounge(&pool, &page).await;

        add_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        assert_eq!(lounges::member_ids(&pool, &lounge).await.unwrap(), vec!["alice"]);

        remove_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        assert!(lounges::member_ids(&pool, &lounge).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adding_twice_is_adding_once() {
        let pool = pool().await;
        let notifier = Notifier::new();
        let page = seed_page_with_members(&pool, &["alice"]).await;
        let lounge = seed_lounge(&pool, &page).await;

        add_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        add_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();

        assert_eq!(lounges::member_ids(&pool, &lounge).await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn removing_a_non_member_is_a_successful_no_op() {
        let pool = pool().await;
        let notifier = Notifier::new();
        let page = seed_page_with_members(&pool, &["alice", "bob"]).await;
        let lounge = seed_lounge(&pool, &page).await;

        add_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        remove_self(&pool, &notifier, None, "bob", &lounge).await.unwrap();
        remove_self(&pool, &notifier, None, "bob", &lounge).await.unwrap();

        assert_eq!(lounges::member_ids(&pool, &lounge).await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn missing_lounge_is_not_found() {
        let pool = pool().await;
        let notifier = Notifier::new();
        seed_page_with_members(&pool, &["alice"]).await;

        let err = add_self(&pool, &notifier, None, "alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn outsiders_cannot_join_a_lounge() {
        let pool = pool().await;
        let notifier = Notifier::new();
        let page = seed_page_with_members(&pool, &["alice"]).await;
        let lounge = seed_lounge(&pool, &page).await;

        sqlx::query("INSERT INTO users (id,name,email) VALUES ('mallory','mallory','m@example.edu')")
            .execute(&pool)
            .await
            .unwrap();

        let err = add_self(&pool, &notifier, None, "mallory", &lounge).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(lounges::member_ids(&pool, &lounge).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn emptied_lounges_are_hidden_from_listings() {
        let pool = pool().await;
        let notifier = Notifier::new();
        let page = seed_page_with_members(&pool, &["alice", "bob"]).await;
        let lounge = seed_lounge(&pool, &page).await;

        add_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        add_self(&pool, &notifier, None, "bob", &lounge).await.unwrap();

        remove_self(&pool, &notifier, None, "alice", &lounge).await.unwrap();
        let listed = lounges::list_for_page(&pool, &page).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_ids, vec!["bob"]);

        remove_self(&pool, &notifier, None, "bob", &lounge).await.unwrap();
        assert!(lounges::list_for_page(&pool, &page).await.unwrap().is_empty());

        // the row itself survives the hide
        let kept: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM lounges WHERE id=?")
            .bind(&lounge)
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert!(kept.is_some());
    }
}
