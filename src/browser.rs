//! Headless-chrome implementation of [`WebViewBridge`], for hosts without
//! their own WebView. Optional: requires a Chrome/Chromium install, so it
//! lives behind the `browser` feature.

use crate::cloudflare::WebViewBridge;
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use regex::Regex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub timeout: Duration,
    pub disable_images: bool,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            timeout: Duration::from_secs(30),
            disable_images: true,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

pub struct BrowserBridge {
    browser: Browser,
    config: BrowserConfig,
}

impl BrowserBridge {
    pub fn new() -> Result<Self> {
        Self::with_config(BrowserConfig::default())
    }

    pub fn with_config(config: BrowserConfig) -> Result<Self> {
        use std::ffi::OsStr;

        let images_arg = config
            .disable_images
            .then(|| "--blink-settings=imagesEnabled=false".to_string());
        let ua_arg = config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--no-sandbox"),
        ];
        if let Some(ref img) = images_arg {
            args.push(OsStr::new(img));
        }
        if let Some(ref ua) = ua_arg {
            args.push(OsStr::new(ua));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .args(args)
            .build()
            .map_err(|e| ScrapeError::Bridge(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| ScrapeError::Bridge(e.to_string()))?;
        Ok(Self { browser, config })
    }

    fn eval_blocking(browser: Browser, timeout: Duration, url: String, script: String) -> Result<Option<String>> {
        let tab = browser.new_tab().map_err(|e| ScrapeError::Bridge(e.to_string()))?;

        // Hide the most obvious automation tells before any site script runs.
        let stealth = r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
        "#;
        let _ = tab.evaluate(stealth, false);

        tab.navigate_to(&url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ScrapeError::Bridge(e.to_string()))?;
        tab.wait_for_element_with_custom_timeout("body", timeout)
            .map_err(|e| ScrapeError::Bridge(e.to_string()))?;

        let result = tab
            .evaluate(&script, true)
            .map_err(|e| ScrapeError::Bridge(e.to_string()))?;
        let value = result.value.and_then(|v| match v {
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        let _ = tab.close(true);
        Ok(value)
    }
}

#[async_trait]
impl WebViewBridge for BrowserBridge {
    async fn evaluate_js(&self, url: &str, script: &str) -> Result<Option<String>> {
        let browser = self.browser.clone();
        let timeout = self.config.timeout;
        let url = url.to_string();
        let script = script.to_string();
        tokio::task::spawn_blocking(move || Self::eval_blocking(browser, timeout, url, script))
            .await
            .map_err(|e| ScrapeError::Bridge(e.to_string()))?
    }

    async fn capture_urls(&self, page_url: &str, pattern: &Regex, timeout: Duration) -> Result<Vec<String>> {
        // Resource timing covers every subresource request the page made,
        // which is all the VRF-bearing AJAX URLs we ever look for.
        let script = format!(
            r#"(() => {{
    return new Promise(resolve => {{
        setTimeout(() => {{
            const urls = performance.getEntriesByType('resource').map(e => e.name);
            resolve(JSON.stringify(urls));
        }}, {});
    }});
}})();"#,
            timeout.as_millis()
        );
        let raw = self.evaluate_js(page_url, &script).await?.unwrap_or_default();
        let urls: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
        Ok(urls.into_iter().filter(|u| pattern.is_match(u)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.disable_images);
        assert_eq!(config.window_width, 1920);
    }

    #[test]
    #[ignore] // requires a Chrome/Chromium install
    fn bridge_creation() {
        assert!(BrowserBridge::new().is_ok());
    }
}
