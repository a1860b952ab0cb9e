//! Shared helpers used across source adapters: stable id derivation, URL
//! normalization, lenient date parsing and chapter-number extraction.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::ElementRef;

/// Derive a stable 64-bit identity from a source id and a site-relative URL
/// (or site-native id). FNV-1a, so repeated fetches of the same entity
/// always produce the same key.
pub fn generate_uid(source: &str, seed: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for b in source.as_bytes().iter().chain(b"/").chain(seed.as_bytes()) {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Resolve a possibly-relative href against a site's base URL.
pub fn to_absolute_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("data:") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// Strip the site origin off an absolute URL, leaving the site-relative
/// path that identity hashing is keyed on.
pub fn to_relative_url(url: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match url.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => url.to_string(),
    }
}

/// Parse a site-formatted date string, returning `None` instead of erroring:
/// upstream date strings are cosmetic and frequently malformed.
pub fn parse_date_safe(text: &str, format: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Extract the first chapter-number-looking float from a label such as
/// "Chapter 107.5 - The End". Volume markers are stripped first so
/// "Vol. 3 Ch. 12" yields 12, not 3. Returns -1.0 when nothing numeric
/// is present.
pub fn extract_chapter_number(text: &str) -> f32 {
    let vol = Regex::new(r"(?i)vol(?:ume)?[\s./-]*\d+(?:\.\d+)?").unwrap();
    let stripped = vol.replace_all(text, "");
    let re = Regex::new(r"(\d+(?:\.\d+)?)").unwrap();
    re.captures(&stripped)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .unwrap_or(-1.0)
}

/// Extract a volume number from text like "Vol. 3" or a URL slug like
/// "volume-3". 0 when absent.
pub fn extract_volume_number(text: &str) -> u32 {
    let re = Regex::new(r"(?i)vol(?:ume)?[\s./-]*(\d+)").unwrap();
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Uppercase the first letter of each word, the way tag labels are shown.
pub fn to_title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse an element's text nodes into one trimmed string.
pub fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Image URL off an `img` element, preferring the lazy-load attributes the
/// manga themes actually populate.
pub fn image_src(el: &ElementRef) -> Option<String> {
    for attr in ["data-src", "data-lazy-src", "data-original", "src"] {
        if let Some(v) = el.value().attr(attr) {
            let v = v.trim();
            if !v.is_empty() && !v.starts_with("data:image/gif") {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Returns `None` for empty/whitespace strings, `Some(trimmed)` otherwise.
pub fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Sort chapters ascending by number, breaking ties by upload date so
/// re-uploads land after originals. Unknown numbers (-1.0) keep their
/// relative listing order at the front.
pub fn sort_chapters(chapters: &mut [crate::models::MangaChapter]) {
    chapters.sort_by(|a, b| {
        a.number
            .partial_cmp(&b.number)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.upload_date.cmp(&b.upload_date))
    });
}
