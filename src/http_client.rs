use crate::error::Result;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

/// User agents rotated per request to avoid trivially fingerprintable
/// traffic. All current desktop browsers.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

#[derive(Debug, Clone)]
pub struct WebClientConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub enable_cookies: bool,
    pub rate_limit_delay_ms: u64,
}

impl Default for WebClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            rate_limit_delay_ms: 0,
        }
    }
}

/// HTTP client shared by all adapters: browser-mimicking headers, cookie
/// store, and bounded retry with exponential backoff on the statuses manga
/// hosts and their CDNs actually return under load.
pub struct WebClient {
    client: Client,
    config: WebClientConfig,
}

impl WebClient {
    pub fn new() -> Result<Self> {
        Self::with_config(WebClientConfig::default())
    }

    pub fn with_config(config: WebClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .parse()
                .expect("static header"),
        );
        headers.insert("Accept-Language", "en-US,en;q=0.9".parse().expect("static header"));
        headers.insert("Upgrade-Insecure-Requests", "1".parse().expect("static header"));
        headers.insert("Sec-Fetch-Dest", "document".parse().expect("static header"));
        headers.insert("Sec-Fetch-Mode", "navigate".parse().expect("static header"));
        headers.insert("Sec-Fetch-Site", "none".parse().expect("static header"));

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .cookie_store(config.enable_cookies)
            .gzip(true)
            .brotli(true)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn random_user_agent() -> &'static str {
        let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
        USER_AGENTS[idx]
    }

    /// Exponential backoff with +-25% jitter, capped by config.
    fn retry_delay(&self, attempt: usize) -> Duration {
        let base = self.config.initial_retry_delay_ms;
        let capped = (base * 2u64.saturating_pow(attempt as u32)).min(self.config.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((capped as f64 * jitter) as u64)
    }

    /// Rate limiting, server errors, and the Cloudflare 52x family.
    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status.as_u16(),
            429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
        )
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.get_with_headers(url, None).await
    }

    pub async fn get_with_headers(&self, url: &str, extra: Option<HeaderMap>) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .get(url)
                .header("User-Agent", Self::random_user_agent());
            if let Some(ref headers) = extra {
                request = request.headers(headers.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "retryable status {} for {}, attempt {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        sleep(self.retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect() || e.is_request();
                    if transient && attempt < self.config.max_retries {
                        log::warn!("request error for {}, retrying: {}", url, e);
                        sleep(self.retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.error_for_status()?.text().await?)
    }

    pub async fn get_text_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let response = self.get_with_headers(url, Some(headers)).await?;
        Ok(response.error_for_status()?.text().await?)
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let text = self.get_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Form-encoded POST, single attempt. The sites using these AJAX
    /// endpoints (admin-ajax.php and friends) do not tolerate replays well.
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header("User-Agent", Self::random_user_agent())
            .header("X-Requested-With", "XMLHttpRequest")
            .form(form)
            .send()
            .await?;
        Ok(response)
    }

    /// Direct access for request shapes the wrappers do not cover.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub async fn rate_limit_delay(&self) {
        if self.config.rate_limit_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.rate_limit_delay_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool() {
        let ua = WebClient::random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn retry_delays_grow() {
        let client = WebClient::new().unwrap();
        let d0 = client.retry_delay(0);
        let d3 = client.retry_delay(3);
        assert!(d0.as_millis() >= 375); // 500ms - 25% jitter
        assert!(d3.as_millis() > d0.as_millis());
        assert!(d3.as_millis() <= 10_000); // 8000ms cap + 25% jitter
    }

    #[test]
    fn retryable_statuses() {
        assert!(WebClient::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(WebClient::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(WebClient::is_retryable_status(StatusCode::from_u16(522).unwrap()));
        assert!(!WebClient::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!WebClient::is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_final_response() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky");
                then.status(500);
            })
            .await;

        let client = WebClient::with_config(WebClientConfig {
            max_retries: 1,
            initial_retry_delay_ms: 1,
            max_retry_delay_ms: 2,
            ..WebClientConfig::default()
        })
        .unwrap();

        let response = client.get(&server.url("/flaky")).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        mock.assert_hits_async(2).await;
    }
}
