use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for "this site does not expose a rating".
pub const RATING_UNKNOWN: f32 = -1.0;

/// Publication state as reported by the upstream site.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MangaState {
    Ongoing,
    Finished,
    Abandoned,
    Paused,
    Upcoming,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentRating {
    Safe,
    Suggestive,
    Adult,
}

/// Sort orders a listing endpoint may support. Adapters ignore orders the
/// upstream site has no equivalent for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Updated,
    Popularity,
    Rating,
    Newest,
    Alphabetical,
    Relevance,
}

/// A genre/tag as exposed by one source. `key` is the site-native filter
/// value, `title` the human-readable label.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct MangaTag {
    pub key: String,
    pub title: String,
    pub source: &'static str,
}

/// A series record. Created fresh on every fetch; `id` is stable across
/// fetches because it is derived from the site-relative URL.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Manga {
    pub id: u64,
    /// Site-relative URL (or site-native id for pure-API sources).
    pub url: String,
    /// Absolute URL a user could open in a browser.
    pub public_url: String,
    pub title: String,
    pub alt_titles: Vec<String>,
    pub cover_url: Option<String>,
    pub large_cover_url: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<MangaTag>,
    pub rating: f32,
    pub content_rating: Option<ContentRating>,
    pub state: Option<MangaState>,
    pub source: &'static str,
    /// Populated by `get_details`; `None` on listing summaries.
    pub chapters: Option<Vec<MangaChapter>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MangaChapter {
    pub id: u64,
    pub title: Option<String>,
    /// Numeric ordering key. Float so fractional chapters (10.5) sort
    /// between their neighbours. -1.0 when the site exposes no number.
    pub number: f32,
    /// Volume number, 0 when absent.
    pub volume: u32,
    pub url: String,
    pub scanlator: Option<String>,
    pub upload_date: Option<DateTime<Utc>>,
    /// Language/edition branch label, e.g. "English Chapter".
    pub branch: Option<String>,
    pub source: &'static str,
}

/// One page image of a chapter. `url` is either a resolved image URL
/// (possibly carrying a `#scrambled_N` descramble hint in the fragment) or
/// a `data:` URL with already-decoded content.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MangaPage {
    pub id: u64,
    pub url: String,
    pub preview: Option<String>,
    /// OCR text-overlay annotations for machine-translated sources.
    pub texts: Option<Vec<PageText>>,
}

/// A translated text overlay with its bounding box on the page image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageText {
    pub rect: Rect,
    pub text: String,
}

/// Integer pixel rectangle, left/top inclusive, right/bottom exclusive.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Filter parameters for listing/search operations. Adapters honour the
/// fields the upstream site can express and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub query: Option<String>,
    pub tags: Vec<MangaTag>,
    pub tags_exclude: Vec<MangaTag>,
    pub states: Vec<MangaState>,
    pub year_from: Option<u32>,
    pub year_to: Option<u32>,
}

impl ListFilter {
    pub fn search(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()), ..Self::default() }
    }
}

/// Tags and states a source can filter by, fetched lazily per adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub tags: Vec<MangaTag>,
    pub states: Vec<MangaState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions() {
        let r = Rect::new(10, 20, 110, 220);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 200);
    }

    #[test]
    fn search_filter_sets_query_only() {
        let f = ListFilter::search("solo leveling");
        assert_eq!(f.query.as_deref(), Some("solo leveling"));
        assert!(f.tags.is_empty());
        assert!(f.states.is_empty());
    }
}
