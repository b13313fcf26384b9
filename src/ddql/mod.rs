pub mod edit;
pub mod new;
pub mod track;

use axum::{Router, routing::post};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{AppResult, AppState};

/// A dashboard item pinned to a page: either a deadline or a link. The two
/// variants share title/visibility/trackers; what differs is carried by the
/// `objectType`-tagged detail, so a due date without a date can't even be
/// deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ddql {
    pub id: String,
    pub page_id: String,
    pub user_id: String,
    pub title: String,
    pub visibility: Visibility,
    #[serde(flatten)]
    pub detail: DdqlDetail,
    pub added_user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "objectType")]
pub enum DdqlDetail {
    #[serde(rename_all = "camelCase")]
    DueDate {
        #[serde(with = "time::serde::rfc3339")]
        due_date: OffsetDateTime,
    },
    QuickLink { url: String },
}

impl DdqlDetail {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            DdqlDetail::DueDate { .. } => "DueDate",
            DdqlDetail::QuickLink { .. } => "QuickLink",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Visibility {
    Public,
    #[serde(rename = "Only Me")]
    OnlyMe,
}

impl Visibility {
    fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::OnlyMe => "Only Me",
        }
    }

    fn parse(s: &str) -> Visibility {
        match s {
            "Only Me" => Visibility::OnlyMe,
            _ => Visibility::Public,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createNewDDQL", post(new::create_ddql_handler))
        .route("/editDDQL", post(edit::edit_ddql_handler))
        .route("/addOrCompleteDDQL", post(track::track_ddql_handler))
}

type DdqlRow = (String, String, String, String, String, Option<i64>, Option<String>, String);

async fn from_row(db_pool: &SqlitePool, row: DdqlRow) -> AppResult<Ddql> {
    let (id, page_id, user_id, title, kind, due_at, url, visibility) = row;

    let detail = match kind.as_str() {
        "DueDate" => DdqlDetail::DueDate {
            due_date: OffsetDateTime::from_unix_timestamp(
                due_at.ok_or_else(|| anyhow::anyhow!("due date item {id} has no timestamp"))?,
            )
            .map_err(anyhow::Error::from)?,
        },
        _ => DdqlDetail::QuickLink {
            url: url.unwrap_or_default(),
        },
    };

    let added: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM ddql_trackers WHERE ddql_id=? ORDER BY user_id")
            .bind(&id)
            .fetch_all(db_pool)
            .await?;

    Ok(Ddql {
        id,
        page_id,
        user_id,
        title,
        visibility: Visibility::parse(&visibility),
        detail,
        added_user_ids: added.into_iter().map(|(id,)| id).collect(),
    })
}

pub(crate) async fn by_id(db_pool: &SqlitePool, ddql_id: &str) -> AppResult<Option<Ddql>> {
    let row: Option<DdqlRow> = sqlx::query_as(
        "SELECT id,page_id,user_id,title,kind,due_at,url,visibility FROM ddqls WHERE id=?",
    )
    .bind(ddql_id)
    .fetch_optional(db_pool)
    .await?;

    match row {
        Some(row) => Ok(Some(from_row(db_pool, row).await?)),
        None => Ok(None),
    }
}

/// A page's items split into (due dates, quick links): everything public
/// plus the requester's own "Only Me" items.
pub async fn list_for_page(
    db_pool: &SqlitePool,
    page_id: &str,
    requester_id: &str,
) -> AppResult<(Vec<Ddql>, Vec<Ddql>)> {
    let rows: Vec<DdqlRow> = sqlx::query_as(
        "SELECT id,page_id,user_id,title,kind,due_at,url,visibility FROM ddqls
         WHERE page_id=? AND (visibility='Public' OR user_id=?)
         ORDER BY due_at, title",
    )
    .bind(page_id)
    .bind(requester_id)
    .fetch_all(db_pool)
    .await?;

    let mut due_dates = Vec::new();
    let mut quick_links = Vec::new();
    for row in rows {
        let ddql = from_row(db_pool, row).await?;
        match ddql.detail {
            DdqlDetail::DueDate { .. } => due_dates.push(ddql),
            DdqlDetail::QuickLink { .. } => quick_links.push(ddql),
        }
    }
    Ok((due_dates, quick_links))
}
