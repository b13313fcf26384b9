use sqlx::SqlitePool;
use uuid::Uuid;

pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Creates every table on startup. Membership lives in composite-key tables:
/// add is `INSERT OR IGNORE`, remove is a plain `DELETE`, and concurrent
/// joins of the same lounge serialize on the row.
pub async fn init_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            access_token TEXT NOT NULL DEFAULT '',
            is_verified BOOLEAN NOT NULL DEFAULT FALSE,
            visible BOOLEAN NOT NULL DEFAULT TRUE,
            is_site_admin BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            page_type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            UNIQUE (page_type, name)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS page_members (
            page_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            semester TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (page_id, user_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS lounges (
            id TEXT PRIMARY KEY,
            page_id TEXT NOT NULL,
            name TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS lounge_members (
            lounge_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (lounge_id, user_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ddqls (
            id TEXT PRIMARY KEY,
            page_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            due_at INTEGER,
            url TEXT,
            visibility TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ddql_trackers (
            ddql_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (ddql_id, user_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS group_posts (
            id TEXT PRIMARY KEY,
            page_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            labels TEXT NOT NULL DEFAULT '[]',
            reacts INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            page_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            text TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
