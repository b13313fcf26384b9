use axum::Router;
use commonroom::{AppState, auth, config::Config, db, ddql, forum, lounges, pages, realtime::Notifier};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("commonroom=debug,info")),
        )
        .init();

    let config = Config::load();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await
        .unwrap();
    db::init_schema(&db_pool).await.unwrap();

    let clients = auth::Clients::from_config(&config).unwrap();
    let app_state = AppState {
        db_pool,
        clients,
        notifier: Notifier::new(),
    };

    let api = Router::new()
        .merge(lounges::router())
        .merge(ddql::router())
        .merge(forum::router());

    let app = Router::new()
        .merge(auth::router())
        .merge(pages::router())
        .nest("/api", api)
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
