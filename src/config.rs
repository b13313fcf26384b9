use std::{fmt::Display, str::FromStr};

use tracing::info;

/// Runtime configuration, read once at startup from the environment
/// (`.env` supported via dotenv).
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub public_url: String,

    pub idp_client_id: String,
    pub idp_client_secret: String,
    pub idp_auth_url: String,
    pub idp_token_url: String,
    pub idp_userinfo_url: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "8080"),
            database_url: try_load("DATABASE_URL", "sqlite://commonroom.db?mode=rwc"),
            public_url: try_load("PUBLIC_URL", "http://localhost:8080"),

            idp_client_id: must_load("IDP_CLIENT_ID"),
            idp_client_secret: must_load("IDP_CLIENT_SECRET"),
            idp_auth_url: must_load("IDP_AUTH_URL"),
            idp_token_url: must_load("IDP_TOKEN_URL"),
            idp_userinfo_url: must_load("IDP_USERINFO_URL"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    dotenv::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("invalid {key}: {e}"))
}

fn must_load(key: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}
