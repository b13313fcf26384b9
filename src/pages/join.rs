use std::collections::BTreeMap;

use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, AppState, ddql::{self, Ddql}, lounges::{self, Lounge}, session};

use super::{Page, PageUser};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinPageRequest {
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    #[serde(default = "default_page_type")]
    pub page_type: String,
    #[serde(default)]
    pub home: bool,
}

fn default_page_type() -> String {
    "Class".to_owned()
}

/// The bulk hydration a client runs on page load; it seeds the lounge cache
/// every later delta patches.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinPageResponse {
    pub users: Vec<PageUser>,
    pub due_dates: Vec<Ddql>,
    pub quick_links: Vec<Ddql>,
    pub lounges: Vec<Lounge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
    pub in_page: bool,
}

async fn hydrate_page(
    db_pool: &SqlitePool,
    requester_id: &str,
    page: Page,
) -> AppResult<JoinPageResponse> {
    let in_page = super::is_member(db_pool, &page.id, requester_id).await?;
    if !in_page {
        // outsiders get the page header only (the info tab), nothing inside
        return Ok(JoinPageResponse {
            users: Vec::new(),
            due_dates: Vec::new(),
            quick_links: Vec::new(),
            lounges: Vec::new(),
            page: Some(page),
            in_page: false,
        });
    }

    let users = super::visible_users(db_pool, &page.id).await?;
    let (due_dates, quick_links) = ddql::list_for_page(db_pool, &page.id, requester_id).await?;
    let lounges = lounges::list_for_page(db_pool, &page.id).await?;

    Ok(JoinPageResponse {
        users,
        due_dates,
        quick_links,
        lounges,
        page: Some(page),
        in_page: true,
    })
}

/// The home dashboard: every page the requester belongs to, folded into one
/// listing.
async fn hydrate_home(db_pool: &SqlitePool, requester_id: &str) -> AppResult<JoinPageResponse> {
    let mut users: BTreeMap<String, PageUser> = BTreeMap::new();
    let mut due_dates = Vec::new();
    let mut quick_links = Vec::new();
    let mut all_lounges = Vec::new();

    for page in super::pages_of_user(db_pool, requester_id).await? {
        for user in super::visible_users(db_pool, &page.id).await? {
            users.entry(user.user_id.clone()).or_insert(user);
        }
        let (dd, ql) = ddql::list_for_page(db_pool, &page.id, requester_id).await?;
        due_dates.extend(dd);
        quick_links.extend(ql);
        all_lounges.extend(lounges::list_for_page(db_pool, &page.id).await?);
    }

    Ok(JoinPageResponse {
        users: users.into_values().collect(),
        due_dates,
        quick_links,
        lounges: all_lounges,
        page: None,
        in_page: true,
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn join_page_handler(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(req): Json<JoinPageRequest>,
) -> AppResult<Json<JoinPageResponse>> {
    let requester_id = session::require_user(&session).await?;

    if req.home {
        return Ok(Json(hydrate_home(&db_pool, &requester_id).await?));
    }

    let page = if let Some(page_id) = &req.page_id {
        super::page_by_id(&db_pool, page_id).await?
    } else if let Some(name) = &req.page_name {
        super::page_by_name(&db_pool, &req.page_type, name).await?
    } else {
        return Err(AppError::Validation(
            "joinPage needs pageId, pageName, or home".to_owned(),
        ));
    };

    let Some(page) = page else {
        return Err(AppError::NotFound("page"));
    };

    Ok(Json(hydrate_page(&db_pool, &requester_id, page).await?))
}
