//! Service address resolution and runtime configuration overrides.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{LazyLock, RwLock},
    time::Duration,
};

pub const API_BASE_ENV: &str = "DNA_ANALYZER_API_BASE";
pub const ORIGIN_ENV: &str = "DNA_ANALYZER_ORIGIN";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const STORAGE_DIR_NAME: &str = "dna-analyzer";
pub const STORAGE_FILE_NAME: &str = "storage.json";
pub const LOG_FILE_NAME: &str = "dna_analyzer.log";
pub const LOG_LEVEL_ENV: &str = "DNA_ANALYZER_LOG";

static CONFIG_OVERRIDES: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn set_config_override(key: &str, configured: &str) {
    let Ok(mut guard) = CONFIG_OVERRIDES.write() else {
        return;
    };
    if let Some(value) = normalized_non_empty(configured) {
        guard.insert(key.to_string(), value);
    } else {
        guard.remove(key);
    }
}

pub fn get_config_override(key: &str) -> Option<String> {
    CONFIG_OVERRIDES
        .read()
        .ok()
        .and_then(|guard| guard.get(key).cloned())
}

fn override_or_env(key: &str) -> Option<String> {
    get_config_override(key).or_else(|| {
        std::env::var(key)
            .ok()
            .and_then(|v| normalized_non_empty(&v))
    })
}

/// Pure resolution rule: explicit override, then the hosting origin, then the
/// local-development default.
pub fn resolve_api_base_from(explicit: Option<&str>, origin: Option<&str>) -> String {
    if let Some(base) = explicit.and_then(normalized_non_empty) {
        return base.trim_end_matches('/').to_string();
    }
    if let Some(origin) = origin.and_then(normalized_non_empty) {
        if !origin.starts_with("file:") {
            return format!("{}/api", origin.trim_end_matches('/'));
        }
    }
    DEFAULT_API_BASE.to_string()
}

pub fn resolve_api_base() -> String {
    let explicit = override_or_env(API_BASE_ENV);
    let origin = override_or_env(ORIGIN_ENV);
    resolve_api_base_from(explicit.as_deref(), origin.as_deref())
}

pub fn active_resolution_label() -> String {
    if get_config_override(API_BASE_ENV).is_some() {
        "command line".to_string()
    } else if override_or_env(API_BASE_ENV).is_some() {
        format!("${API_BASE_ENV}")
    } else if override_or_env(ORIGIN_ENV).is_some() {
        "hosting origin".to_string()
    } else {
        "local default".to_string()
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORAGE_DIR_NAME)
}

pub fn default_storage_path() -> PathBuf {
    data_dir().join(STORAGE_FILE_NAME)
}

/// Log file used when `--log-file` is given without a path.
pub fn default_log_path() -> PathBuf {
    data_dir().join(LOG_FILE_NAME)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn resolve() -> Self {
        Self {
            api_base: resolve_api_base(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
