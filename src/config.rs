use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_file: Option<PathBuf>,
    pub store_timeout: Duration,
    pub score_cache_ttl: Duration,
    pub interests_file: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_file: None,
            store_timeout: Duration::from_millis(3000),
            score_cache_ttl: Duration::from_secs(3600),
            interests_file: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            host: std::env::var("HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))
                .and_then(|port: u16| {
                    if port == 0 {
                        anyhow::bail!("PORT must be a valid number between 1-65535");
                    }
                    Ok(port)
                })?,
            log_file: std::env::var("LOG_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            store_timeout: match std::env::var("STORE_TIMEOUT_MS") {
                Ok(raw) => raw
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("STORE_TIMEOUT_MS must be a number of milliseconds"))
                    .and_then(|ms| {
                        if ms == 0 {
                            anyhow::bail!("STORE_TIMEOUT_MS must be greater than zero");
                        }
                        Ok(Duration::from_millis(ms))
                    })?,
                Err(_) => defaults.store_timeout,
            },
            score_cache_ttl: match std::env::var("SCORE_CACHE_TTL_SECS") {
                Ok(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow::anyhow!("SCORE_CACHE_TTL_SECS must be a number of seconds"))?,
                Err(_) => defaults.score_cache_ttl,
            },
            interests_file: std::env::var("INTERESTS_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_body_bytes: match std::env::var("MAX_BODY_BYTES") {
                Ok(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a number of bytes"))
                    .and_then(|bytes| {
                        if bytes == 0 {
                            anyhow::bail!("MAX_BODY_BYTES must be greater than zero");
                        }
                        Ok(bytes)
                    })?,
                Err(_) => defaults.max_body_bytes,
            },
        };

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
