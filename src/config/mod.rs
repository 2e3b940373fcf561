use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub uploads_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            http_host: env_or(&lookup, "HTTP_HOST", "0.0.0.0"),
            port: env_or_parse(&lookup, "PORT", "5000")?,
            database_url: env_or(
                &lookup,
                "DATABASE_URL",
                "postgres://localhost:5432/image_converter",
            ),
            db_max_connections: env_or_parse(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            db_connect_timeout_seconds: env_or_parse(&lookup, "DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            uploads_dir: PathBuf::from(env_or(&lookup, "UPLOADS_DIR", "uploads")),
            upload_max_bytes: env_or_parse(&lookup, "UPLOAD_MAX_BYTES", "5242880")?,
            cors_allowed_origins: parse_origins(&env_or(&lookup, "CORS_ALLOWED_ORIGINS", "*")),
        };

        config.http_addr()?;
        if config.upload_max_bytes == 0 {
            return Err(anyhow!("invalid UPLOAD_MAX_BYTES: must be greater than 0"));
        }

        Ok(config)
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.http_host, self.port);
        SocketAddr::from_str(&addr).map_err(|err| anyhow!("invalid HTTP_HOST/PORT {}: {}", addr, err))
    }
}

fn env_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_or_parse<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = env_or(lookup, key, default);
    value
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
