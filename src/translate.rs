//! Minimal client for the public `translate.googleapis.com` endpoint, used
//! by machine-translation sources to localize OCR overlay text.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use std::sync::Arc;

pub struct GoogleTranslator {
    client: Arc<WebClient>,
}

impl GoogleTranslator {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self { client }
    }

    /// Translate `text` between two ISO-639-1 codes (`"auto"` allowed as
    /// source). The endpoint answers a nested array; the translated string
    /// is split into segments at `[0][i][0]`.
    pub async fn translate(&self, from: &str, to: &str, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            from,
            to,
            urlencoded(text)
        );
        let value = self.client.get_json(&url).await?;
        let segments = value
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ScrapeError::parse("unexpected translation payload", &url))?;
        let mut out = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
                out.push_str(part);
            }
        }
        Ok(out)
    }
}

fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
