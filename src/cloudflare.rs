//! Bot-challenge detection and the WebView warmup step some sites need
//! before plain HTTP requests go through.

use crate::error::Result;
use crate::http_client::WebClient;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

/// JavaScript-evaluation bridge supplied by the host application. Adapters
/// use it to let a bot-mitigation challenge resolve (warmup) and to observe
/// the request URLs a page issues while loading.
#[async_trait]
pub trait WebViewBridge: Send + Sync {
    /// Load `url` in a JS-capable view, evaluate `script`, return its
    /// string result if any.
    async fn evaluate_js(&self, url: &str, script: &str) -> Result<Option<String>>;

    /// Load `page_url` and collect the request URLs matching `pattern`
    /// issued within `timeout`.
    async fn capture_urls(&self, page_url: &str, pattern: &Regex, timeout: Duration) -> Result<Vec<String>>;
}

/// Markers of an unresolved Cloudflare (or similar) challenge page. A
/// near-empty body is treated as a challenge too: interstitials often strip
/// content entirely.
pub fn is_challenge_html(html: &str) -> bool {
    if html.trim().len() < 200 {
        return true;
    }
    let lower = html.to_lowercase();
    lower.contains("cf-browser-verification")
        || lower.contains("checking if the site connection is secure")
        || lower.contains("checking your browser before accessing")
        || lower.contains("cf-chl")
        || lower.contains("cf-turnstile")
        || lower.contains("challenge-form")
        || (lower.contains("cloudflare") && lower.contains("captcha"))
}

/// Fetch HTML, returning `None` when the body is a challenge page rather
/// than real content. Callers decide whether to warm up and retry or give
/// up.
pub async fn fetch_html_checked(client: &WebClient, url: &str) -> Result<Option<String>> {
    let response = match client.get(url).await {
        Ok(r) => r,
        Err(e) => {
            log::debug!("challenge-checked fetch failed for {}: {}", url, e);
            return Ok(None);
        }
    };
    if response.status().as_u16() == 403 || response.status().as_u16() == 503 {
        return Ok(None);
    }
    let html = response.text().await?;
    if is_challenge_html(&html) {
        return Ok(None);
    }
    Ok(Some(html))
}

/// Load the page once through the bridge and wait for it to settle, giving
/// an interstitial challenge time to clear and drop its cookies into the
/// shared jar. Errors are swallowed: warmup is opportunistic.
pub async fn warm_up(bridge: &dyn WebViewBridge, url: &str, timeout_ms: u64) {
    let script = format!(
        r#"(() => {{
    return new Promise(resolve => {{
        const finish = () => resolve('done');
        if (document.readyState === 'complete') {{
            setTimeout(finish, 200);
        }} else {{
            window.addEventListener('load', () => setTimeout(finish, 200), {{ once: true }});
        }}
        setTimeout(finish, {timeout_ms});
    }});
}})();"#
    );
    if let Err(e) = bridge.evaluate_js(url, &script).await {
        log::debug!("warmup failed for {}: {}", url, e);
    }
}

/// Load a page through the bridge and return its rendered HTML, or `None`
/// when the bridge produced nothing usable.
pub async fn render_html(bridge: &dyn WebViewBridge, url: &str) -> Option<String> {
    let script = r#"(() => {
    return new Promise(resolve => {
        const finish = () => {
            resolve(document.documentElement ? document.documentElement.outerHTML : "");
        };
        if (document.readyState === "complete") {
            setTimeout(finish, 200);
        } else {
            window.addEventListener("load", () => setTimeout(finish, 200), { once: true });
        }
        setTimeout(finish, 3000);
    });
})();"#;
    let html = bridge.evaluate_js(url, script).await.ok()??;
    if html.is_empty() || is_challenge_html(&html) {
        return None;
    }
    Some(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_challenge_markers() {
        let padding = "x".repeat(300);
        for marker in [
            "cf-browser-verification",
            "Checking your browser before accessing",
            "cf-chl-widget",
            "cf-turnstile",
        ] {
            let html = format!("<html><body>{} {}</body></html>", marker, padding);
            assert!(is_challenge_html(&html), "should detect {}", marker);
        }
    }

    #[test]
    fn short_bodies_are_suspicious() {
        assert!(is_challenge_html("<html></html>"));
    }

    #[test]
    fn real_content_passes() {
        let html = format!(
            "<html><body><div class='listing'>{}</div></body></html>",
            "<a href='/manga/x'>Title</a>".repeat(20)
        );
        assert!(!is_challenge_html(&html));
    }
}
