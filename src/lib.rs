pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod ddql;
pub mod forum;
pub mod lounges;
pub mod pages;
pub mod realtime;
pub mod session;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub notifier: realtime::Notifier,
}
