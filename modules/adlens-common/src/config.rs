use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Scrape provider
    pub apify_api_key: String,

    // Object storage (media mirror destination)
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub storage_api_key: String,
    pub storage_public_url: String,

    // API server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            apify_api_key: required_env("APIFY_API_KEY"),
            storage_endpoint: required_env("STORAGE_ENDPOINT"),
            storage_bucket: required_env("STORAGE_BUCKET"),
            storage_api_key: required_env("STORAGE_API_KEY"),
            storage_public_url: required_env("STORAGE_PUBLIC_URL"),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
