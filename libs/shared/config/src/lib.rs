use std::env;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Rest,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub store_backend: StoreBackend,
    pub store_url: String,
    pub store_api_key: String,
    pub store_timeout_ms: u64,
    /// Fixed offset every calendar view is computed in.
    pub calendar_offset: FixedOffset,
    pub populate_db: bool,
    pub seed_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            store_backend: StoreBackend::Memory,
            store_url: String::new(),
            store_api_key: String::new(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            calendar_offset: utc(),
            populate_db: false,
            seed_dir: ".".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| {
                    warn!("BIND_ADDRESS not set, using {}", DEFAULT_BIND_ADDRESS);
                    DEFAULT_BIND_ADDRESS.to_string()
                }),
            store_backend: match env::var("STORE_BACKEND").as_deref() {
                Ok("rest") => StoreBackend::Rest,
                Ok("memory") => StoreBackend::Memory,
                Ok(other) => {
                    warn!("Unknown STORE_BACKEND '{}', using in-memory store", other);
                    StoreBackend::Memory
                }
                Err(_) => {
                    warn!("STORE_BACKEND not set, using in-memory store");
                    StoreBackend::Memory
                }
            },
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_api_key: env::var("STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("STORE_TIMEOUT_MS not set or invalid, using {}ms", DEFAULT_STORE_TIMEOUT_MS);
                    DEFAULT_STORE_TIMEOUT_MS
                }),
            calendar_offset: env::var("CALENDAR_UTC_OFFSET")
                .ok()
                .and_then(|v| v.parse::<FixedOffset>().ok())
                .unwrap_or_else(|| {
                    warn!("CALENDAR_UTC_OFFSET not set or invalid, using UTC");
                    utc()
                }),
            populate_db: env::var("POPULATE_DB")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            seed_dir: env::var("SEED_DIR").unwrap_or_else(|_| ".".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - rest store selected without STORE_URL");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Rest => !self.store_url.is_empty(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}
