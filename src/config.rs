//! Server configuration, read from environment variables with sensible
//! defaults. An optional `.env` file (loaded once at startup, missing
//! file is not an error) is merged into the process environment first.

use std::env;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub log_max_bytes: u64,
    pub log_backup_count: u32,

    pub ado_organization_url: String,
    pub ado_pat: String,
    pub ado_api_version: String,
    pub ado_tls_verify: bool,
    pub ado_webhook_secret: Option<String>,

    pub server_public_url: String,
}

impl Config {
    /// Load configuration from the process environment, first merging in
    /// a `.env` file if one is present in the working directory.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8000),
            data_dir: env_or("DATA_DIR", "data"),
            log_max_bytes: env_parse("LOG_MAX_BYTES", 5 * 1024 * 1024),
            log_backup_count: env_parse("LOG_BACKUP_COUNT", 3),

            ado_organization_url: env_or("ADO_ORGANIZATION_URL", ""),
            ado_pat: env_or("ADO_PAT", ""),
            ado_api_version: env_or("ADO_API_VERSION", "5.1-preview"),
            ado_tls_verify: env_parse("ADO_TLS_VERIFY", true),
            ado_webhook_secret: env::var("ADO_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),

            server_public_url: env_or("SERVER_PUBLIC_URL", "http://localhost:8000"),
        }
    }
}
