use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

pub const ENV_API_URL: &str = "CLEANER_API_URL";
pub const ENV_API_TOKEN: &str = "CLEANER_API_TOKEN";
pub const ENV_POLL_INTERVAL_MS: &str = "CLEANER_POLL_INTERVAL_MS";

/// Connection settings for the backend. Persisted with the app state.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            auth_token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Applies `CLEANER_*` environment variables on top of the current values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_owned();
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.auth_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.poll_interval_ms = ms,
                _ => log::warn!("ignoring invalid {ENV_POLL_INTERVAL_MS}={raw:?}"),
            }
        }
        self
    }

    /// Joins `path` onto the base URL, tolerating a trailing slash on the base.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}
