use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub api_token: String,
    pub conflict_retry_limit: u32,
    pub notification_channel_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "garagebook.db".to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            conflict_retry_limit: env::var("CONFLICT_RETRY_LIMIT")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(3),
            notification_channel_capacity: env::var("NOTIFICATION_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
        }
    }
}
