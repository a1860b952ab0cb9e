//! RizzComic: MangaReader theme with a JSON filter API instead of HTML
//! listing pages. Series URLs carry a rotating random `r<digits>-` slug
//! prefix which is discovered from the public listing once and memoized.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, MangaState, MangaTag, SortOrder,
    RATING_UNKNOWN,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::sources::mangareader::MangaReaderTemplate;
use crate::util::{element_text, generate_uid, non_empty, to_title_case};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const INFO: SourceInfo = SourceInfo {
    id: "rizzcomic",
    name: "RizzComic",
    locale: "en",
    content_type: ContentType::Manga,
};

pub struct RizzComic {
    template: MangaReaderTemplate,
    slug_prefix: OnceCell<String>,
    filters: OnceCell<FilterOptions>,
}

impl RizzComic {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://rizzfables.com")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        let mut template = MangaReaderTemplate::new(INFO, client, base_url);
        template.list_path = "/series";
        template.date_format = "%d %b %Y";
        Self {
            template,
            slug_prefix: OnceCell::new(),
            filters: OnceCell::new(),
        }
    }

    /// The filter API returns titles without URLs; series pages live at
    /// `/series/{prefix}{slug}` where the prefix rotates site-wide. Read it
    /// off the first card of the listing page, once.
    async fn slug_prefix(&self) -> Result<&str> {
        self.slug_prefix
            .get_or_try_init(|| async {
                let url = format!("{}/series", self.template.base_url);
                let html = self.template.client.get_text(&url).await?;
                extract_slug_prefix(&html)
                    .ok_or_else(|| ScrapeError::parse("no series card to read slug prefix from", url))
            })
            .await
            .map(String::as_str)
    }

    fn series_url(&self, prefix: &str, title: &str) -> String {
        format!("/series/{}{}", prefix, slugify(title))
    }

    fn manga_from_entry(&self, entry: &serde_json::Value, prefix: &str) -> Option<Manga> {
        let title = entry.get("title")?.as_str()?.trim().to_string();
        let rel = self.series_url(prefix, &title);
        let rating = entry
            .get("rating")
            .and_then(value_as_f32)
            .map(|r| r / 10.0)
            .unwrap_or(RATING_UNKNOWN);
        Some(Manga {
            id: generate_uid(INFO.id, &rel),
            public_url: format!("{}{}", self.template.base_url, rel),
            url: rel,
            title,
            alt_titles: Vec::new(),
            cover_url: entry.get("image_url").and_then(|v| v.as_str()).map(|img| {
                format!("{}/assets/images/{}", self.template.base_url, img)
            }),
            large_cover_url: None,
            description: entry
                .get("long_description")
                .and_then(|v| v.as_str())
                .and_then(non_empty),
            authors: entry
                .get("author")
                .and_then(|v| v.as_str())
                .and_then(non_empty)
                .into_iter()
                .collect(),
            tags: Vec::new(),
            rating,
            content_rating: None,
            state: match entry.get("status").and_then(|v| v.as_str()) {
                Some("ongoing") => Some(MangaState::Ongoing),
                Some("completed") => Some(MangaState::Finished),
                Some("hiatus") => Some(MangaState::Paused),
                _ => None,
            },
            source: INFO.id,
            chapters: None,
        })
    }

    async fn post_json(&self, url: &str, form: &[(&str, &str)]) -> Result<serde_json::Value> {
        let response = self.template.client.post_form(url, form).await?;
        let text = response.error_for_status()?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl MangaSource for RizzComic {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    /// The filter endpoint is unpaginated: everything arrives on page 1.
    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        if page > 1 {
            return Ok(Vec::new());
        }
        let value = if let Some(query) = filter.query.as_deref() {
            let url = format!("{}/Index/live_search", self.template.base_url);
            self.post_json(&url, &[("search_value", query.trim())]).await?
        } else {
            let url = format!("{}/Index/filter_series", self.template.base_url);
            let state = filter
                .states
                .first()
                .map(|s| match s {
                    MangaState::Ongoing => "ongoing",
                    MangaState::Finished => "completed",
                    MangaState::Paused => "hiatus",
                    _ => "all",
                })
                .unwrap_or("all");
            let mut form: Vec<(&str, &str)> = vec![
                ("StatusValue", state),
                ("TypeValue", "all"),
                ("OrderValue", order_payload(order)),
            ];
            for tag in &filter.tags {
                form.push(("genres_checked[]", tag.key.as_str()));
            }
            self.post_json(&url, &form).await?
        };

        let entries = value
            .as_array()
            .ok_or_else(|| ScrapeError::parse("expected a JSON array of series", self.template.base_url.clone()))?;
        let prefix = self.slug_prefix().await?.to_string();
        Ok(entries
            .iter()
            .filter_map(|e| self.manga_from_entry(e, &prefix))
            .collect())
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        self.template.get_details(manga).await
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        self.template.get_pages(chapter).await
    }

    async fn get_filter_options(&self) -> Result<FilterOptions> {
        self.filters
            .get_or_try_init(|| async {
                let url = format!("{}/series", self.template.base_url);
                let html = self.template.client.get_text(&url).await?;
                Ok(FilterOptions {
                    tags: parse_genre_inputs(&html),
                    states: vec![MangaState::Ongoing, MangaState::Finished, MangaState::Paused],
                })
            })
            .await
            .cloned()
    }
}

/// Ratings arrive as either a JSON number or a numeric string.
fn value_as_f32(v: &serde_json::Value) -> Option<f32> {
    v.as_f64()
        .map(|f| f as f32)
        .or_else(|| v.as_str()?.trim().parse::<f32>().ok())
}

/// First listing card's slug starts with the rotating prefix, e.g.
/// `/series/r38221-solo-leveling` yields `r38221-`.
fn extract_slug_prefix(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let card = Selector::parse(".utao .uta .imgu a, .listupd .bs .bsx a, .listo .bs .bsx a").unwrap();
    let re = Regex::new(r"^(r\d+-)").unwrap();
    for a in document.select(&card) {
        let Some(href) = a.value().attr("href") else { continue };
        let slug = href.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        if let Some(c) = re.captures(slug) {
            return Some(c[1].to_string());
        }
    }
    None
}

fn parse_genre_inputs(html: &str) -> Vec<MangaTag> {
    let document = Html::parse_document(html);
    let input = Selector::parse("input.genre-item").unwrap();
    document
        .select(&input)
        .filter_map(|el| {
            let key = non_empty(el.value().attr("value")?)?;
            let title = el
                .next_siblings()
                .filter_map(scraper::ElementRef::wrap)
                .next()
                .map(|l| element_text(&l))?;
            non_empty(&title).map(|t| MangaTag {
                key,
                title: to_title_case(&t),
                source: INFO.id,
            })
        })
        .collect()
}

/// Lowercased, punctuation collapsed to dashes, with the site's special
/// handling of possessives and doubled letters ("God's" becomes "gods").
fn slugify(title: &str) -> String {
    let re = Regex::new(r"[^a-z0-9]+").unwrap();
    let slug = re
        .replace_all(&title.trim().to_lowercase(), "-")
        .trim_matches('-')
        .to_string();
    slug.replace("-s-", "s-").replace("-ll-", "ll-")
}

fn order_payload(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Alphabetical => "title",
        SortOrder::Popularity | SortOrder::Rating => "popular",
        SortOrder::Updated => "update",
        SortOrder::Newest => "latest",
        SortOrder::Relevance => "all",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_handles_possessives() {
        assert_eq!(slugify("Solo Leveling"), "solo-leveling");
        assert_eq!(slugify("The God's Game"), "the-gods-game");
        assert_eq!(slugify("  Omniscient Reader!  "), "omniscient-reader");
    }

    #[test]
    fn slug_prefix_from_first_card() {
        let html = r#"<div class="listupd"><div class="bs"><div class="bsx">
            <a href="https://rizzfables.com/series/r38221-solo-leveling/">x</a>
        </div></div></div>"#;
        assert_eq!(extract_slug_prefix(html).as_deref(), Some("r38221-"));
        assert_eq!(extract_slug_prefix("<html></html>"), None);
    }

    #[test]
    fn entry_mapping() {
        let source = RizzComic::new(Arc::new(WebClient::new().unwrap()));
        let entry = json!({
            "id": 42,
            "title": "Solo Leveling",
            "author": "Chugong",
            "rating": "85",
            "image_url": "solo.webp",
            "status": "ongoing",
            "long_description": "A hunter grows stronger."
        });
        let manga = source.manga_from_entry(&entry, "r38221-").unwrap();
        assert_eq!(manga.url, "/series/r38221-solo-leveling");
        assert_eq!(manga.rating, 8.5);
        assert_eq!(manga.state, Some(MangaState::Ongoing));
        assert_eq!(manga.authors, vec!["Chugong".to_string()]);
        assert_eq!(
            manga.cover_url.as_deref(),
            Some("https://rizzfables.com/assets/images/solo.webp")
        );
    }

    #[test]
    fn genre_inputs_pair_with_labels() {
        let html = r#"<form>
            <input class="genre-item" value="1" id="g1"/><label for="g1">action</label>
            <input class="genre-item" value="" id="g2"/><label for="g2">broken</label>
        </form>"#;
        let tags = parse_genre_inputs(html);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].key, "1");
        assert_eq!(tags[0].title, "Action");
    }
}
