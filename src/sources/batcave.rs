//! BatCave, a western-comics site behind Cloudflare. Chapter metadata and
//! page lists are embedded as a `window.__DATA__` JSON blob in an inline
//! script, and the genre table as `window.__XFILTER__` on the catalog page.
//! Fetches go through a challenge ladder like the rest of the
//! Cloudflare-fronted adapters: plain request, then warmup plus refetch,
//! then a full in-view render.

use crate::cloudflare::{fetch_html_checked, render_html, warm_up, WebViewBridge};
use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, MangaState, MangaTag, SortOrder,
    RATING_UNKNOWN,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::util::{
    element_text, generate_uid, non_empty, parse_date_safe, to_absolute_url, to_relative_url,
    to_title_case,
};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const INFO: SourceInfo = SourceInfo {
    id: "batcave",
    name: "BatCave",
    locale: "en",
    content_type: ContentType::Comics,
};

const WARMUP_TIMEOUT_MS: u64 = 15000;

pub struct BatCave {
    client: Arc<WebClient>,
    base_url: String,
    bridge: Option<Arc<dyn WebViewBridge>>,
    tags: OnceCell<Vec<MangaTag>>,
}

#[derive(Deserialize)]
struct PageData {
    news_id: i64,
    #[serde(default)]
    chapters: Vec<ChapterData>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct ChapterData {
    id: i64,
    #[serde(default)]
    posi: f32,
    title: Option<String>,
    date: Option<String>,
}

impl BatCave {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://batcave.biz")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            bridge: None,
            tags: OnceCell::new(),
        }
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn WebViewBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        if let Some(html) = fetch_html_checked(&self.client, url).await? {
            return Ok(html);
        }
        if let Some(bridge) = &self.bridge {
            log::info!("{}: challenge at {}, warming up", INFO.id, url);
            warm_up(bridge.as_ref(), &self.base_url, WARMUP_TIMEOUT_MS).await;
            if let Some(html) = fetch_html_checked(&self.client, url).await? {
                return Ok(html);
            }
            if let Some(html) = render_html(bridge.as_ref(), url).await {
                return Ok(html);
            }
        }
        Err(ScrapeError::Challenge { url: url.to_string() })
    }

    fn list_url(&self, page: u32, filter: &ListFilter) -> String {
        if let Some(query) = filter.query.as_deref() {
            let encoded = query
                .split_whitespace()
                .map(urlencoded)
                .collect::<Vec<_>>()
                .join("%20");
            let mut url = format!("{}/search/{}", self.base_url, encoded);
            if page > 1 {
                url.push_str(&format!("/page/{}/", page));
            }
            return url;
        }
        let mut url = format!("{}/ComicList", self.base_url);
        if let Some(from) = filter.year_from {
            url.push_str(&format!("/y[from]={}", from));
        }
        if let Some(to) = filter.year_to {
            url.push_str(&format!("/y[to]={}", to));
        }
        if !filter.tags.is_empty() {
            let keys: Vec<&str> = filter.tags.iter().map(|t| t.key.as_str()).collect();
            url.push_str(&format!("/g={}", keys.join(",")));
        }
        url.push_str("/sort");
        if page > 1 {
            url.push_str(&format!("/page/{}/", page));
        }
        url
    }

    fn parse_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        let item = Selector::parse("div.readed.d-flex.short").unwrap();
        let link = Selector::parse("a.readed__img").unwrap();
        let title_sel = Selector::parse("h2.readed__title a").unwrap();
        let img = Selector::parse("img[data-src]").unwrap();

        document
            .select(&item)
            .filter_map(|el| {
                let a = el.select(&link).next()?;
                let href = a.value().attr("href")?;
                let title = el
                    .select(&title_sel)
                    .next()
                    .map(|t| element_text(&t))
                    .and_then(|t| non_empty(&t))?;
                let rel = to_relative_url(href, &self.base_url);
                Some(Manga {
                    id: generate_uid(INFO.id, &rel),
                    public_url: to_absolute_url(&rel, &self.base_url),
                    url: rel,
                    title,
                    alt_titles: Vec::new(),
                    cover_url: el
                        .select(&img)
                        .next()
                        .and_then(|i| i.value().attr("data-src"))
                        .map(|u| to_absolute_url(u, &self.base_url)),
                    large_cover_url: None,
                    description: None,
                    authors: Vec::new(),
                    tags: Vec::new(),
                    rating: RATING_UNKNOWN,
                    content_rating: None,
                    state: None,
                    source: INFO.id,
                    chapters: None,
                })
            })
            .collect()
    }

    async fn fetch_tags(&self) -> Result<Vec<MangaTag>> {
        let url = format!("{}/comix/", self.base_url);
        let html = self.fetch_html(&url).await?;
        parse_xfilter_genres(&html).ok_or_else(|| ScrapeError::parse("genre table not found", url))
    }
}

/// Pull the `window.__DATA__ = {...};` object out of an inline script.
fn extract_page_data(html: &str) -> Option<PageData> {
    let start = html.find("window.__DATA__ = ")? + "window.__DATA__ = ".len();
    let end = html[start..].find("};")? + start + 1;
    serde_json::from_str(&html[start..end]).ok()
}

/// The catalog page embeds its filter config as `window.__XFILTER__`; the
/// genre axis is the `"g"` entry with an id/value table.
fn parse_xfilter_genres(html: &str) -> Option<Vec<MangaTag>> {
    let marker = html.find("__XFILTER__")?;
    let g_start = html[marker..].find("\"g\":{")? + marker + "\"g\":".len();
    let tail = &html[g_start..];
    // The object nests one level deep at most; find its closing brace.
    let mut depth = 0;
    let mut end = None;
    for (i, c) in tail.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let obj: serde_json::Value = serde_json::from_str(&tail[..end?]).ok()?;
    let values = obj.get("values")?.as_array()?;
    Some(
        values
            .iter()
            .filter_map(|v| {
                Some(MangaTag {
                    key: v.get("id")?.as_i64()?.to_string(),
                    title: to_title_case(v.get("value")?.as_str()?),
                    source: INFO.id,
                })
            })
            .collect(),
    )
}

fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[async_trait]
impl MangaSource for BatCave {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    async fn get_list(&self, page: u32, _order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let url = self.list_url(page, filter);
        let html = self.fetch_html(&url).await?;
        Ok(self.parse_list(&html))
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.fetch_html(&url).await?;
        let data = extract_page_data(&html)
            .ok_or_else(|| ScrapeError::parse("__DATA__ script not found", &url))?;

        // Chapters arrive newest-first.
        let chapters: Vec<MangaChapter> = data
            .chapters
            .iter()
            .rev()
            .map(|ch| MangaChapter {
                id: generate_uid(INFO.id, &format!("{}/{}", data.news_id, ch.id)),
                title: ch.title.as_deref().and_then(non_empty),
                number: ch.posi,
                volume: 0,
                url: format!("/reader/{}/{}", data.news_id, ch.id),
                scanlator: None,
                upload_date: ch.date.as_deref().and_then(|d| parse_date_safe(d, "%d.%m.%Y")),
                branch: None,
                source: INFO.id,
            })
            .collect();

        let document = Html::parse_document(&html);
        let sel = |s: &str| Selector::parse(s).unwrap();

        let mut authors = Vec::new();
        let mut state = Some(MangaState::Finished);
        for li in document.select(&sel("ul.page__list li, li")) {
            let text = element_text(&li);
            if let Some(publisher) = text.strip_prefix("Publisher:") {
                if let Some(p) = non_empty(publisher) {
                    authors.push(p);
                }
            } else if let Some(release) = text.strip_prefix("Release type:") {
                if release.trim() == "Ongoing" {
                    state = Some(MangaState::Ongoing);
                }
            }
        }

        let description = document
            .select(&sel("div.page__text.full-text"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t));

        let tags: Vec<MangaTag> = document
            .select(&sel("a[href*=\"/genres/\"]"))
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let key = href.trim_end_matches('/').rsplit('/').next()?.to_string();
                non_empty(&element_text(&a)).map(|title| MangaTag { key, title, source: INFO.id })
            })
            .collect();

        Ok(Manga {
            authors,
            state,
            description,
            tags: if tags.is_empty() { manga.tags.clone() } else { tags },
            chapters: Some(chapters),
            ..manga.clone()
        })
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let url = to_absolute_url(&chapter.url, &self.base_url);
        let html = self.fetch_html(&url).await?;
        let data = extract_page_data(&html)
            .ok_or_else(|| ScrapeError::parse("__DATA__ script not found", &url))?;
        if data.images.is_empty() {
            return Err(ScrapeError::parse("no page images found", url));
        }
        Ok(data
            .images
            .iter()
            .map(|raw| {
                let url = to_absolute_url(&raw.replace('\\', ""), &self.base_url);
                MangaPage {
                    id: generate_uid(INFO.id, &url),
                    url,
                    preview: None,
                    texts: None,
                }
            })
            .collect())
    }

    async fn get_filter_options(&self) -> Result<FilterOptions> {
        let tags = self.tags.get_or_try_init(|| self.fetch_tags()).await?.clone();
        Ok(FilterOptions { tags, states: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> BatCave {
        BatCave::new(Arc::new(WebClient::new().unwrap()))
    }

    #[test]
    fn list_url_shapes() {
        let url = source().list_url(1, &ListFilter::search("dark knight"));
        assert_eq!(url, "https://batcave.biz/search/dark%20knight");

        let filter = ListFilter { year_from: Some(2010), year_to: Some(2020), ..Default::default() };
        let url = source().list_url(2, &filter);
        assert_eq!(url, "https://batcave.biz/ComicList/y[from]=2010/y[to]=2020/sort/page/2/");
    }

    #[test]
    fn extracts_data_blob() {
        let html = r#"<script>
            window.__DATA__ = {"news_id": 991, "chapters": [
                {"id": 12, "posi": 2.0, "title": "Issue #2", "date": "05.01.2024"},
                {"id": 11, "posi": 1.0, "title": "Issue #1", "date": "01.01.2024"}
            ]};
        </script>"#;
        let data = extract_page_data(html).unwrap();
        assert_eq!(data.news_id, 991);
        assert_eq!(data.chapters.len(), 2);
        assert_eq!(data.chapters[0].posi, 2.0);
    }

    #[test]
    fn reader_data_blob_images() {
        let html = r#"<script>
            window.__DATA__ = {"news_id": 991, "images": ["https:\/\/img.batcave.biz\/1.jpg", "/pages/2.jpg"]};
        </script>"#;
        let data = extract_page_data(html).unwrap();
        assert_eq!(data.images.len(), 2);
    }

    #[test]
    fn xfilter_genres() {
        let html = r#"<script>
            window.__XFILTER__ = {"filter_items":{"g":{"id":"g","values":[
                {"id":1,"value":"action"},{"id":2,"value":"sci-fi"}
            ]},"y":{"id":"y","values":[]}}};
        </script>"#;
        let tags = parse_xfilter_genres(html).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "1");
        assert_eq!(tags[0].title, "Action");
    }
}
