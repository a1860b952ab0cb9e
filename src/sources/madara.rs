//! Shared scraping recipe for the Madara WordPress manga theme. Individual
//! sites wrap this template and override the constants (paths, date format)
//! or whole operations where their deployment diverges.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    ContentRating, ListFilter, Manga, MangaChapter, MangaPage, MangaState, MangaTag, SortOrder,
    RATING_UNKNOWN,
};
use crate::source::SourceInfo;
use crate::util::{
    element_text, extract_chapter_number, extract_volume_number, generate_uid, image_src,
    non_empty, parse_date_safe, sort_chapters, to_absolute_url, to_relative_url, to_title_case,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;

/// Chapter-list selectors observed across Madara deployments, most common
/// first. The first selector that matches anything wins.
const CHAPTER_SELECTORS: &[&str] = &[
    "li.wp-manga-chapter a",
    "ul.main.version-chap li a",
    "div.listing-chapters_wrap a",
    "div#chapterlist a",
    "div.chapter-list a",
    "ul.chapter-list a",
    "div.chapters-list a",
];

const LIST_SELECTORS: &[(&str, &str)] = &[
    ("div.page-item-detail", "h3 > a"),
    ("div.page-listing-item", "h3 a"),
    ("div.manga-item", "a.manga-link"),
    ("div.post-item", "h2 a"),
];

pub struct MadaraTemplate {
    pub info: SourceInfo,
    pub client: Arc<WebClient>,
    pub base_url: String,
    /// Path segment series live under, usually "manga".
    pub list_path: &'static str,
    /// Href marker for genre links, usually "manga-genre".
    pub tag_prefix: &'static str,
    pub date_format: &'static str,
    /// Whether the chapter list must be fetched via admin-ajax POST.
    pub use_ajax_chapters: bool,
    pub nsfw: bool,
}

impl MadaraTemplate {
    pub fn new(info: SourceInfo, client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        Self {
            info,
            client,
            base_url: base_url.into(),
            list_path: "manga",
            tag_prefix: "manga-genre",
            date_format: "%B %d, %Y",
            use_ajax_chapters: false,
            nsfw: false,
        }
    }

    pub(crate) fn list_url(&self, page: u32, order: SortOrder, filter: &ListFilter) -> String {
        if let Some(query) = filter.query.as_deref() {
            let mut url = format!("{}/page/{}/?s={}&post_type=wp-manga", self.base_url, page, urlencode(query));
            for state in &filter.states {
                url.push_str(&format!("&status[]={}", state_key(*state)));
            }
            return url;
        }
        if let Some(tag) = filter.tags.first() {
            return format!(
                "{}/{}/{}/page/{}/?m_orderby={}",
                self.base_url,
                self.tag_prefix,
                tag.key,
                page,
                order_key(order)
            );
        }
        format!(
            "{}/{}/page/{}/?m_orderby={}",
            self.base_url,
            self.list_path,
            page,
            order_key(order)
        )
    }

    pub async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let url = self.list_url(page, order, filter);
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_list(&html))
    }

    /// Malformed entries are skipped rather than failing the whole page:
    /// listing grids routinely contain ad cards and half-rendered items.
    pub fn parse_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        let mut out = Vec::new();

        for (container_sel, link_sel) in LIST_SELECTORS {
            let container = Selector::parse(container_sel).unwrap();
            let link = Selector::parse(link_sel).unwrap();
            let img = Selector::parse("img").unwrap();

            for element in document.select(&container) {
                let Some(a) = element.select(&link).next() else { continue };
                let Some(href) = a.value().attr("href") else { continue };
                let title = a
                    .value()
                    .attr("title")
                    .map(str::to_string)
                    .and_then(|t| non_empty(&t))
                    .unwrap_or_else(|| element_text(&a));
                if title.is_empty() {
                    continue;
                }
                let rel = to_relative_url(href, &self.base_url);
                out.push(Manga {
                    id: generate_uid(self.info.id, &rel),
                    url: rel.clone(),
                    public_url: to_absolute_url(&rel, &self.base_url),
                    title,
                    alt_titles: Vec::new(),
                    cover_url: element.select(&img).next().and_then(|e| image_src(&e)),
                    large_cover_url: None,
                    description: None,
                    authors: Vec::new(),
                    tags: Vec::new(),
                    rating: RATING_UNKNOWN,
                    content_rating: self.nsfw.then_some(ContentRating::Adult),
                    state: None,
                    source: self.info.id,
                    chapters: None,
                });
            }
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    pub async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let (mut detailed, post_id) = self.parse_details(manga, &html);

        let mut chapters = self.parse_chapters(&html);
        if chapters.is_empty() {
            chapters = self.fetch_ajax_chapters(&url, post_id.as_deref()).await?;
        }
        if chapters.is_empty() {
            log::warn!("{}: no chapters found for {}", self.info.id, manga.url);
        }
        sort_chapters(&mut chapters);
        detailed.chapters = Some(chapters);
        Ok(detailed)
    }

    pub(crate) fn parse_details(&self, manga: &Manga, html: &str) -> (Manga, Option<String>) {
        let document = Html::parse_document(html);
        let sel = |s: &str| Selector::parse(s).unwrap();

        let title = document
            .select(&sel("div.post-title h1, h1.entry-title"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t))
            .unwrap_or_else(|| manga.title.clone());

        let description = document
            .select(&sel("div.description-summary div.summary__content, div.summary_content div.post-content_item > h5 + div"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t));

        let cover_url = document
            .select(&sel("div.summary_image img"))
            .next()
            .and_then(|e| image_src(&e))
            .map(|u| to_absolute_url(&u, &self.base_url))
            .or_else(|| manga.cover_url.clone());

        let authors: Vec<String> = document
            .select(&sel("div.author-content a, div.artist-content a"))
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty())
            .collect();

        // Labelled metadata rows: pair each h5 heading with its value div,
        // since the theme gives the rows no distinguishing classes.
        let mut alt_titles: Vec<String> = Vec::new();
        let mut labelled_state: Option<MangaState> = None;
        let heading_sel = sel("h5");
        let value_sel = sel("div.summary-content");
        for item in document.select(&sel("div.post-content_item, div.post-status > div")) {
            let Some(heading) = item.select(&heading_sel).next() else { continue };
            let Some(value) = item.select(&value_sel).next() else { continue };
            let heading = element_text(&heading).to_lowercase();
            let value = element_text(&value);
            if heading.contains("alt") {
                alt_titles = value
                    .split(';')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            } else if heading.contains("status") {
                labelled_state = parse_state(&value);
            }
        }

        let tag_href = format!("a[href*=\"/{}/\"]", self.tag_prefix);
        let tags: Vec<MangaTag> = document
            .select(&sel(&tag_href))
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let key = href.trim_end_matches('/').rsplit('/').next()?.to_string();
                Some(MangaTag {
                    key,
                    title: to_title_case(&element_text(&a)),
                    source: self.info.id,
                })
            })
            .collect();

        let state = labelled_state;

        // Post id for the admin-ajax chapter fallback, either on the
        // chapter holder div or inline in a script.
        let post_id = document
            .select(&sel("div#manga-chapters-holder"))
            .next()
            .and_then(|d| d.value().attr("data-id").map(str::to_string))
            .or_else(|| {
                let re = Regex::new(r#"manga_id\s*[=:]\s*"?(\d+)"#).unwrap();
                document
                    .select(&sel("script"))
                    .find_map(|s| re.captures(&s.text().collect::<String>()).map(|c| c[1].to_string()))
            });

        let detailed = Manga {
            title,
            description,
            cover_url,
            authors,
            alt_titles,
            tags,
            state,
            ..manga.clone()
        };
        (detailed, post_id)
    }

    pub fn parse_chapters(&self, html: &str) -> Vec<MangaChapter> {
        let document = Html::parse_document(html);
        for selector in CHAPTER_SELECTORS {
            let sel = Selector::parse(selector).unwrap();
            let chapters: Vec<MangaChapter> = document
                .select(&sel)
                .filter_map(|a| self.chapter_from_anchor(&a))
                .collect();
            if !chapters.is_empty() {
                log::debug!("{}: {} chapters via selector {}", self.info.id, chapters.len(), selector);
                return chapters;
            }
        }
        Vec::new()
    }

    fn chapter_from_anchor(&self, a: &scraper::ElementRef) -> Option<MangaChapter> {
        let href = a.value().attr("href").or_else(|| a.value().attr("data-href"))?;
        let label = element_text(a);
        if label.is_empty() || label == "#" {
            return None;
        }
        let rel = to_relative_url(href, &self.base_url);
        // The release date sits in a sibling span on most themes.
        let upload_date = a
            .parent()
            .and_then(scraper::ElementRef::wrap)
            .and_then(|parent| {
                let date_sel = Selector::parse("span.chapter-release-date, span.chapterdate, i").unwrap();
                parent
                    .select(&date_sel)
                    .next()
                    .and_then(|d| parse_date_safe(&element_text(&d), self.date_format))
            });
        Some(MangaChapter {
            id: generate_uid(self.info.id, &rel),
            title: Some(label.clone()),
            number: extract_chapter_number(&label),
            volume: extract_volume_number(&label),
            url: rel,
            scanlator: None,
            upload_date,
            branch: None,
            source: self.info.id,
        })
    }

    /// admin-ajax.php fallback for deployments that load chapters lazily.
    pub(crate) async fn fetch_ajax_chapters(&self, series_url: &str, post_id: Option<&str>) -> Result<Vec<MangaChapter>> {
        // Newer Madara exposes a per-series ajax/chapters endpoint; older
        // ones need the post id against admin-ajax.php.
        let response = match post_id {
            Some(pid) if !self.use_ajax_chapters => {
                let url = format!("{}/wp-admin/admin-ajax.php", self.base_url);
                self.client
                    .post_form(&url, &[("action", "manga_get_chapters"), ("manga", pid)])
                    .await?
            }
            _ => {
                let url = format!("{}ajax/chapters/", ensure_trailing_slash(series_url));
                self.client.post_form(&url, &[]).await?
            }
        };
        if !response.status().is_success() {
            return Ok(Vec::new());
        }
        let fragment = response.text().await?;
        Ok(self.parse_chapters(&fragment))
    }

    pub async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let url = to_absolute_url(&chapter.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let pages = self.parse_pages(&html);
        if pages.is_empty() {
            return Err(ScrapeError::parse("no page images found", url));
        }
        Ok(pages)
    }

    pub fn parse_pages(&self, html: &str) -> Vec<MangaPage> {
        let document = Html::parse_document(html);
        let sel = Selector::parse("div.reading-content img, div.read-container img").unwrap();
        document
            .select(&sel)
            .filter_map(|img| {
                let raw = image_src(&img)?;
                // Fragments are theme noise, not part of the image identity.
                let url = to_absolute_url(raw.split('#').next().unwrap_or(&raw), &self.base_url);
                Some(MangaPage {
                    id: generate_uid(self.info.id, &url),
                    url,
                    preview: None,
                    texts: None,
                })
            })
            .collect()
    }

    pub async fn get_filter_options(&self) -> Result<crate::models::FilterOptions> {
        let url = format!("{}/?s=&post_type=wp-manga", self.base_url);
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_filter_options(&html))
    }

    /// Genre checkboxes on the advanced-search form.
    pub(crate) fn parse_filter_options(&self, html: &str) -> crate::models::FilterOptions {
        let document = Html::parse_document(html);
        let row = Selector::parse("div.checkbox-group div.checkbox").unwrap();
        let input = Selector::parse("input[name=\"genre[]\"]").unwrap();
        let label = Selector::parse("label").unwrap();
        let tags = document
            .select(&row)
            .filter_map(|el| {
                let key = el.select(&input).next()?.value().attr("value")?.to_string();
                let title = el.select(&label).next().map(|l| element_text(&l))?;
                non_empty(&title).map(|title| MangaTag {
                    key,
                    title: to_title_case(&title),
                    source: self.info.id,
                })
            })
            .collect();
        crate::models::FilterOptions {
            tags,
            states: vec![
                MangaState::Ongoing,
                MangaState::Finished,
                MangaState::Abandoned,
                MangaState::Paused,
                MangaState::Upcoming,
            ],
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

fn order_key(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Updated => "latest",
        SortOrder::Popularity => "views",
        SortOrder::Rating => "rating",
        SortOrder::Newest => "new-manga",
        SortOrder::Alphabetical => "alphabet",
        SortOrder::Relevance => "latest",
    }
}

fn state_key(state: MangaState) -> &'static str {
    match state {
        MangaState::Ongoing => "on-going",
        MangaState::Finished => "end",
        MangaState::Abandoned => "canceled",
        MangaState::Paused => "on-hold",
        MangaState::Upcoming => "upcoming",
    }
}

pub(crate) fn parse_state(text: &str) -> Option<MangaState> {
    match text.trim().to_lowercase().as_str() {
        "ongoing" | "on-going" | "releasing" => Some(MangaState::Ongoing),
        "completed" | "complete" | "end" => Some(MangaState::Finished),
        "canceled" | "cancelled" | "dropped" | "discontinued" => Some(MangaState::Abandoned),
        "on hold" | "on-hold" | "hiatus" | "on_hiatus" => Some(MangaState::Paused),
        "upcoming" | "info" => Some(MangaState::Upcoming),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ContentType;

    fn template() -> MadaraTemplate {
        let info = SourceInfo {
            id: "test-madara",
            name: "Test Madara",
            locale: "en",
            content_type: ContentType::Manga,
        };
        MadaraTemplate::new(info, Arc::new(WebClient::new().unwrap()), "https://example.com")
    }

    #[test]
    fn parses_standard_listing() {
        let html = r#"<html><body>
            <div class="page-item-detail">
                <img data-src="https://cdn.example.com/a.jpg"/>
                <h3><a href="https://example.com/manga/alpha/">Alpha</a></h3>
            </div>
            <div class="page-item-detail">
                <h3><a href="/manga/beta/" title="Beta">x</a></h3>
            </div>
        </body></html>"#;
        let list = template().parse_list(html);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "Alpha");
        assert_eq!(list[0].url, "/manga/alpha/");
        assert_eq!(list[0].cover_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert_eq!(list[1].title, "Beta");
        // Identity is stable across parses.
        assert_eq!(list[0].id, template().parse_list(html)[0].id);
    }

    #[test]
    fn parses_chapter_list_with_dates() {
        let html = r#"<ul><li class="wp-manga-chapter">
            <a href="/manga/alpha/chapter-10-5/">Chapter 10.5</a>
            <span class="chapter-release-date">January 02, 2024</span>
        </li><li class="wp-manga-chapter">
            <a href="/manga/alpha/chapter-10/">Chapter 10</a>
        </li></ul>"#;
        let chapters = template().parse_chapters(html);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 10.5);
        assert!(chapters[0].upload_date.is_some());
        assert_eq!(chapters[1].number, 10.0);
    }

    #[test]
    fn parses_reading_content_pages() {
        let html = r#"<div class="reading-content">
            <img data-src=" https://cdn.example.com/1.jpg#watermark "/>
            <img src="https://cdn.example.com/2.jpg"/>
        </div>"#;
        let pages = template().parse_pages(html);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].url, "https://cdn.example.com/1.jpg");
        assert!(pages[0].texts.is_none());
    }

    #[test]
    fn empty_listing_yields_no_entries() {
        assert!(template().parse_list("<html><body></body></html>").is_empty());
    }

    #[test]
    fn state_mapping() {
        assert_eq!(parse_state("OnGoing"), Some(MangaState::Ongoing));
        assert_eq!(parse_state("Completed"), Some(MangaState::Finished));
        assert_eq!(parse_state("Hiatus"), Some(MangaState::Paused));
        assert_eq!(parse_state("???"), None);
    }
}
