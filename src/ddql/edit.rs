use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, session};

use super::{Ddql, DdqlDetail, Visibility};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditDdqlRequest {
    ddql_id: String,
    title: Option<String>,
    visibility: Option<Visibility>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    due_date: Option<OffsetDateTime>,
    url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditDdqlResponse {
    edited: bool,
    #[serde(rename = "DDQL")]
    ddql: Ddql,
}

/// Only the creator may edit, and an item keeps its kind: a due-date field
/// on a quick link (or vice versa) is ignored rather than rejected.
pub async fn edit_ddql(
    db_pool: &SqlitePool,
    requester_id: &str,
    req: &EditDdqlRequest,
) -> AppResult<Ddql> {
    let Some(mut ddql) = super::by_id(db_pool, &req.ddql_id).await? else {
        return Err(AppError::NotFound("ddql"));
    };

    if ddql.user_id != requester_id {
        return Err(AppError::Forbidden("only the creator may edit this item"));
    }

    if let Some(title) = &req.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("title must not be empty".to_owned()));
        }
        ddql.title = title.to_owned();
    }
    if let Some(visibility) = req.visibility {
        ddql.visibility = visibility;
    }
    match &mut ddql.detail {
        DdqlDetail::DueDate { due_date } => {
            if let Some(new_due) = req.due_date {
                *due_date = new_due;
            }
        }
        DdqlDetail::QuickLink { url } => {
            if let Some(new_url) = &req.url {
                *url = new_url.clone();
            }
        }
    }

    let (due_at, url) = match &ddql.detail {
        DdqlDetail::DueDate { due_date } => (Some(due_date.unix_timestamp()), None),
        DdqlDetail::QuickLink { url } => (None, Some(url.clone())),
    };
    sqlx::query("UPDATE ddqls SET title=?, visibility=?, due_at=?, url=? WHERE id=?")
        .bind(&ddql.title)
        .bind(ddql.visibility.as_str())
        .bind(due_at)
        .bind(url)
        .bind(&ddql.id)
        .execute(db_pool)
        .await?;

    Ok(ddql)
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_ddql_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<EditDdqlRequest>,
) -> AppResult<Json<EditDdqlResponse>> {
    let requester_id = session::require_user(&session).await?;

    let ddql = edit_ddql(&db_pool, &requester_id, &req).await?;
    Ok(Json(EditDdqlResponse { edited: true, ddql }))
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::{db, ddql, pages};

    use super::*;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        sqlx::query("INSERT INTO pages (id,name,page_type) VALUES ('p1','6.102','Class')")
            .execute(&pool)
            .await
            .unwrap();
        for user in ["alice", "bob"] {
            sqlx::query("INSERT INTO users (id,name,email) VALUES (?,?,?)")
                .bind(user)
                .bind(user)
                .bind(format!("{user}@example.edu"))
                .execute(&pool)
                .await
                .unwrap();
            pages::add_member(&pool, "p1", user, "").await.unwrap();
        }
        pool
    }

    fn edit_of(id: &str) -> EditDdqlRequest {
        EditDdqlRequest {
            ddql_id: id.to_owned(),
            title: Some("pset 3 (extended)".to_owned()),
            visibility: None,
            due_date: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn only_the_creator_may_edit() {
        let pool = pool().await;
        let created = ddql::new::create_ddql(
            &pool,
            "alice",
            "p1",
            "pset 3",
            Visibility::Public,
            DdqlDetail::QuickLink { url: "https://example.edu".to_owned() },
        )
        .await
        .unwrap();

        let err = edit_ddql(&pool, "bob", &edit_of(&created.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let edited = edit_ddql(&pool, "alice", &edit_of(&created.id)).await.unwrap();
        assert_eq!(edited.title, "pset 3 (extended)");
    }

    #[tokio::test]
    async fn an_item_keeps_its_kind() {
        let pool = pool().await;
        let created = ddql::new::create_ddql(
            &pool,
            "alice",
            "p1",
            "course site",
            Visibility::Public,
            DdqlDetail::QuickLink { url: "https://example.edu".to_owned() },
        )
        .await
        .unwrap();

        let mut req = edit_of(&created.id);
        req.due_date = Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let edited = edit_ddql(&pool, "alice", &req).await.unwrap();

        assert!(matches!(edited.detail, DdqlDetail::QuickLink { .. }));
    }
}
