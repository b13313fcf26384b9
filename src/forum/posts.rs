use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, db, pages, session};

use super::GroupPost;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePostRequest {
    page_id: String,
    title: String,
    text: String,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct CreatePostResponse {
    created: bool,
    post: GroupPost,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePostRequest {
    post_id: String,
    #[serde(default)]
    delete: bool,
    title: Option<String>,
    text: Option<String>,
    labels: Option<Vec<String>>,
    reacts: Option<i64>,
}

#[derive(Serialize)]
pub(crate) struct UpdatePostResponse {
    updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<GroupPost>,
}

pub async fn create_post(
    db_pool: &SqlitePool,
    requester_id: &str,
    page_id: &str,
    title: &str,
    text: &str,
    labels: &[String],
) -> AppResult<GroupPost> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("post title must not be empty".to_owned()));
    }
    if !pages::is_member(db_pool, page_id, requester_id).await? {
        return Err(AppError::Forbidden("not a member of this page"));
    }

    let post = GroupPost {
        id: db::new_id(),
        page_id: page_id.to_owned(),
        user_id: requester_id.to_owned(),
        title: title.to_owned(),
        text: text.to_owned(),
        labels: labels.to_vec(),
        reacts: 0,
    };
    sqlx::query(
        "INSERT INTO group_posts (id,page_id,user_id,title,text,labels,reacts)
         VALUES (?,?,?,?,?,?,0)",
    )
    .bind(&post.id)
    .bind(&post.page_id)
    .bind(&post.user_id)
    .bind(&post.title)
    .bind(&post.text)
    .bind(serde_json::to_string(&post.labels)?)
    .execute(db_pool)
    .await?;

    Ok(post)
}

/// Edit and delete both belong to the author alone; a delete takes the
/// post's comments with it.
pub async fn update_post(
    db_pool: &SqlitePool,
    requester_id: &str,
    req: &UpdatePostRequest,
) -> AppResult<Option<GroupPost>> {
    let Some(mut post) = super::post_by_id(db_pool, &req.post_id).await? else {
        return Err(AppError::NotFound("post"));
    };

    if post.user_id != requester_id || !pages::is_member(db_pool, &post.page_id, requester_id).await? {
        return Err(AppError::Forbidden("only the poster may change this post"));
    }

    if req.delete {
        sqlx::query("DELETE FROM comments WHERE post_id=?")
            .bind(&post.id)
            .execute(db_pool)
            .await?;
        sqlx::query("DELETE FROM group_posts WHERE id=?")
            .bind(&post.id)
            .execute(db_pool)
            .await?;
        return Ok(None);
    }

    if let Some(title) = &req.title {
        post.title = title.clone();
    }
    if let Some(text) = &req.text {
        post.text = text.clone();
    }
    if let Some(labels) = &req.labels {
        post.labels = labels.clone();
    }
    if let Some(reacts) = req.reacts {
        post.reacts = reacts;
    }

    sqlx::query("UPDATE group_posts SET title=?, text=?, labels=?, reacts=? WHERE id=?")
        .bind(&post.title)
        .bind(&post.text)
        .bind(serde_json::to_string(&post.labels)?)
        .bind(post.reacts)
        .bind(&post.id)
        .execute(db_pool)
        .await?;

    Ok(Some(post))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_post_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<CreatePostResponse>> {
    let requester_id = session::require_user(&session).await?;

    let post = create_post(&db_pool, &requester_id, &req.page_id, &req.title, &req.text, &req.labels).await?;
    Ok(Json(CreatePostResponse { created: true, post }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_post_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<UpdatePostResponse>> {
    let requester_id = session::require_user(&session).await?;

    let post = update_post(&db_pool, &requester_id, &req).await?;
    Ok(Json(UpdatePostResponse { updated: true, post }))
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::{db, forum, pages};

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

    fn delete_of(post_id: &str) -> UpdatePostRequest {
        UpdatePostRequest {
            post_id: post_id.to_owned(),
            delete: true,
            title: None,
            text: None,
            labels: None,
            reacts: None,
        }
    }

    #[tokio::test]
    async fn outsiders_cannot_post() {
        let pool = pool().await;
        sqlx::query("INSERT INTO users (id,name,email) VALUES ('mallory','mallory','m@example.edu')")
            .execute(&pool)
            .await
            .unwrap();

        let err = create_post(&pool, "mallory", "p1", "hi", "text", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(forum::posts_of_page(&pool, "p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_author_may_update_or_delete() {
        let pool = pool().await;
        let post = create_post(&pool, "alice", "p1", "pset study group?", "anyone?", &[])
            .await
            .unwrap();

        let err = update_post(&pool, "bob", &delete_of(&post.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        update_post(&pool, "alice", &delete_of(&post.id)).await.unwrap();
        assert!(forum::posts_of_page(&pool, "p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_takes_comments_along() {
        let pool = pool().await;
        let post = create_post(&pool, "alice", "p1", "office hours", "when?", &[])
            .await
            .unwrap();
        forum::comments::create_comment(&pool, "bob", "p1", &post.id, "tuesday")
            .await
            .unwrap();

        update_post(&pool, "alice", &delete_of(&post.id)).await.unwrap();
        assert!(forum::comments_of_post(&pool, &post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let pool = pool().await;
        let err = update_post(&pool, "alice", &delete_of("nope")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
