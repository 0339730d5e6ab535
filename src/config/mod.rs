use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub data_path: PathBuf,
    pub admin_token: Option<String>,
    pub notify_queue_capacity: usize,
    pub expiry_sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let notify_queue_capacity: usize = env_or_parse("NOTIFY_QUEUE_CAPACITY", "256")?;
        if notify_queue_capacity == 0 {
            return Err(anyhow!("invalid NOTIFY_QUEUE_CAPACITY: must be at least 1"));
        }

        let sweep_seconds: u64 = env_or_parse("EXPIRY_SWEEP_INTERVAL_SECONDS", "60")?;
        if sweep_seconds == 0 {
            return Err(anyhow!(
                "invalid EXPIRY_SWEEP_INTERVAL_SECONDS: must be at least 1"
            ));
        }

        Ok(Self {
            http_addr,
            data_path: PathBuf::from(env_or("DATA_PATH", "data/users.json")),
            admin_token: std::env::var("ADMIN_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            notify_queue_capacity,
            expiry_sweep_interval: Duration::from_secs(sweep_seconds),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
