use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Crate configuration, loaded from `config.toml` when present. Every field
/// has a default so an absent or partial file still yields a working setup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_true")]
    pub enable_cookies: bool,
    #[serde(default)]
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Disabled by default: the browser bridge needs a Chrome install.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub disable_images: bool,
}

fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}
fn default_initial_retry_delay() -> u64 {
    500
}
fn default_max_retry_delay() -> u64 {
    8000
}
fn default_browser_timeout() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config deserializes via field defaults")
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        toml::from_str("").expect("empty config deserializes via field defaults")
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str::<Config>(&content) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring malformed {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn web_client_config(&self) -> crate::http_client::WebClientConfig {
        crate::http_client::WebClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            max_retries: self.http.max_retries,
            initial_retry_delay_ms: self.http.initial_retry_delay_ms,
            max_retry_delay_ms: self.http.max_retry_delay_ms,
            enable_cookies: self.http.enable_cookies,
            rate_limit_delay_ms: self.http.rate_limit_delay_ms,
        }
    }

    #[cfg(feature = "browser")]
    pub fn browser_config(&self) -> crate::browser::BrowserConfig {
        crate::browser::BrowserConfig {
            headless: self.browser.headless,
            timeout: Duration::from_secs(self.browser.timeout_secs),
            disable_images: self.browser.disable_images,
            ..crate::browser::BrowserConfig::default()
        }
    }
}
