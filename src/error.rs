use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors surfaced by adapter operations. Transport problems come from
/// `reqwest`; everything else is some flavour of "the site did not look the
/// way this adapter expects", which is the normal failure mode of scraping
/// an uncontrolled upstream.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected JSON shape: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse {url}: {msg}")]
    Parse { msg: String, url: String },

    #[error("bot challenge not resolved for {url}")]
    Challenge { url: String },

    #[error("token derivation failed: {0}")]
    TokenDerivation(String),

    #[error("browser bridge unavailable: {0}")]
    Bridge(String),
}

impl ScrapeError {
    /// Shorthand for the common "expected markup is absent" case.
    pub fn parse(msg: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Parse { msg: msg.into(), url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_context() {
        let e = ScrapeError::parse("chapter list not found", "https://example.com/manga/x");
        let msg = e.to_string();
        assert!(msg.contains("chapter list not found"));
        assert!(msg.contains("https://example.com/manga/x"));
    }
}
