//! Shared scraping recipe for the Mangabox/mangakakalot theme family.
//! Deployments drift between two generations of markup, so every parser
//! tries the selector chain newest-first.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    ListFilter, Manga, MangaChapter, MangaPage, MangaState, MangaTag, SortOrder, RATING_UNKNOWN,
};
use crate::source::SourceInfo;
use crate::util::{
    element_text, extract_chapter_number, extract_volume_number, generate_uid, image_src,
    non_empty, parse_date_safe, sort_chapters, to_absolute_url, to_relative_url,
};
use scraper::{Html, Selector};
use std::sync::Arc;

const LIST_SELECTORS: &[&str] = &[
    "div.list-comic-item-wrap",
    "div.itemupdate",
    "div.story_item",
    "div.manga-item",
    "div.content-genres-item",
];

pub struct MangaboxTemplate {
    pub info: SourceInfo,
    pub client: Arc<WebClient>,
    pub base_url: String,
    pub list_path: &'static str,
    pub search_path: &'static str,
    /// Both generations of the theme, tried in order.
    pub date_formats: &'static [&'static str],
}

impl MangaboxTemplate {
    pub fn new(info: SourceInfo, client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        Self {
            info,
            client,
            base_url: base_url.into(),
            list_path: "/manga-list.html",
            search_path: "/search/story",
            date_formats: &["%b-%d-%Y %H:%M", "%b %d,%Y %H:%M", "%b-%d-%y"],
        }
    }

    pub(crate) fn list_url(&self, page: u32, order: SortOrder, filter: &ListFilter) -> String {
        if let Some(query) = filter.query.as_deref() {
            // Search slugs use underscores for spaces.
            let slug = query.trim().to_lowercase().replace(' ', "_");
            return format!("{}{}/{}?page={}", self.base_url, self.search_path, slug, page);
        }
        let base = if let Some(tag) = filter.tags.first() {
            format!("{}/genre/{}", self.base_url, tag.key)
        } else {
            format!("{}{}", self.base_url, self.list_path)
        };
        let state = filter
            .states
            .first()
            .map(|s| match s {
                MangaState::Ongoing => "ongoing",
                MangaState::Finished => "completed",
                _ => "all",
            })
            .unwrap_or("all");
        format!("{}?type={}&state={}&page={}", base, order_key(order), state, page)
    }

    pub async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let url = self.list_url(page, order, filter);
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_list(&html))
    }

    pub fn parse_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        let link = Selector::parse("a").unwrap();
        let img = Selector::parse("img").unwrap();
        let heading = Selector::parse("h3, h2, .manga-title").unwrap();

        for selector in LIST_SELECTORS {
            let card = Selector::parse(selector).unwrap();
            let list: Vec<Manga> = document
                .select(&card)
                .filter_map(|div| {
                    let a = div.select(&link).next()?;
                    let href = a.value().attr("href")?;
                    let title = div
                        .select(&heading)
                        .next()
                        .map(|h| element_text(&h))
                        .and_then(|t| non_empty(&t))
                        .or_else(|| non_empty(&element_text(&a)))?;
                    let rel = to_relative_url(href, &self.base_url);
                    Some(Manga {
                        id: generate_uid(self.info.id, &rel),
                        url: rel.clone(),
                        public_url: to_absolute_url(&rel, &self.base_url),
                        title,
                        alt_titles: Vec::new(),
                        cover_url: div.select(&img).next().and_then(|e| image_src(&e)),
                        large_cover_url: None,
                        description: None,
                        authors: Vec::new(),
                        tags: Vec::new(),
                        rating: RATING_UNKNOWN,
                        content_rating: None,
                        state: None,
                        source: self.info.id,
                        chapters: None,
                    })
                })
                .collect();
            if !list.is_empty() {
                return list;
            }
        }
        Vec::new()
    }

    pub async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let mut detailed = self.parse_details(manga, &html);
        let mut chapters = self.parse_chapters(&html);
        if chapters.is_empty() {
            log::warn!("{}: no chapters found for {}", self.info.id, manga.url);
        }
        sort_chapters(&mut chapters);
        detailed.chapters = Some(chapters);
        Ok(detailed)
    }

    pub(crate) fn parse_details(&self, manga: &Manga, html: &str) -> Manga {
        let document = Html::parse_document(html);
        let sel = |s: &str| Selector::parse(s).unwrap();

        let title = document
            .select(&sel("ul.manga-info-text h1, div.story-info-right h1, h1"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t))
            .unwrap_or_else(|| manga.title.clone());

        let description = document
            .select(&sel("div#contentBox, div#panel-story-info-description, div#noidungm"))
            .next()
            .map(|e| element_text(&e))
            .map(|t| strip_description_heading(&t, &title))
            .and_then(|t| non_empty(&t));

        let cover_url = document
            .select(&sel("div.manga-info-pic img, span.info-image img"))
            .next()
            .and_then(|e| image_src(&e))
            .map(|u| to_absolute_url(&u, &self.base_url))
            .or_else(|| manga.cover_url.clone());

        let authors: Vec<String> = document
            .select(&sel("a[href*=\"/author/\"], a[href*=\"author=\"]"))
            .map(|a| element_text(&a))
            .filter(|t| !t.is_empty())
            .collect();

        let tags: Vec<MangaTag> = document
            .select(&sel("a[href*=\"/genre/\"], a[href*=\"genre=\"]"))
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let key = href
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()?
                    .split('?')
                    .next()?
                    .to_string();
                non_empty(&element_text(&a)).map(|title| MangaTag {
                    key,
                    title,
                    source: self.info.id,
                })
            })
            .collect();

        // Both generations label metadata rows with plain text.
        let mut alt_titles = Vec::new();
        let mut state = None;
        for row in document.select(&sel("ul.manga-info-text li, table.variations-tableInfo tr")) {
            let text = element_text(&row);
            if let Some(rest) = labelled_value(&text, "Alternative") {
                alt_titles = rest
                    .split(';')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            } else if let Some(rest) = labelled_value(&text, "Status") {
                state = parse_box_state(&rest);
            }
        }

        Manga {
            title,
            description,
            cover_url,
            authors,
            tags,
            alt_titles,
            state,
            ..manga.clone()
        }
    }

    pub fn parse_chapters(&self, html: &str) -> Vec<MangaChapter> {
        let document = Html::parse_document(html);

        // Older markup: div rows of spans, date in the third span's title.
        let row = Selector::parse("div.chapter-list div.row").unwrap();
        let link = Selector::parse("a").unwrap();
        let span = Selector::parse("span").unwrap();
        let mut chapters: Vec<MangaChapter> = document
            .select(&row)
            .filter_map(|r| {
                let a = r.select(&link).next()?;
                let date_text = r.select(&span).nth(2).and_then(|s| s.value().attr("title"));
                self.chapter_from_parts(&a, date_text)
            })
            .collect();

        if chapters.is_empty() {
            // Newer markup: list items with explicit classes.
            let item = Selector::parse("ul.row-content-chapter li").unwrap();
            let name = Selector::parse("a.chapter-name").unwrap();
            let time = Selector::parse("span.chapter-time").unwrap();
            chapters = document
                .select(&item)
                .filter_map(|li| {
                    let a = li.select(&name).next()?;
                    let date_text = li.select(&time).next().and_then(|s| s.value().attr("title"));
                    self.chapter_from_parts(&a, date_text)
                })
                .collect();
        }
        chapters
    }

    fn chapter_from_parts(&self, a: &scraper::ElementRef, date_text: Option<&str>) -> Option<MangaChapter> {
        let href = a.value().attr("href")?;
        let label = non_empty(&element_text(a))?;
        let rel = to_relative_url(href, &self.base_url);
        let upload_date = date_text.and_then(|t| {
            self.date_formats
                .iter()
                .find_map(|f| parse_date_safe(t, f))
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
        let sel = Selector::parse("div.container-chapter-reader img, div.vung-doc img").unwrap();
        document
            .select(&sel)
            .filter_map(|img| {
                let url = to_absolute_url(&image_src(&img)?, &self.base_url);
                Some(MangaPage {
                    id: generate_uid(self.info.id, &url),
                    url,
                    preview: None,
                    texts: None,
                })
            })
            .collect()
    }
}

/// Old-theme description blocks open with a "{title} summary:" heading
/// baked into the same element as the prose.
fn strip_description_heading(text: &str, title: &str) -> String {
    let trimmed = text.trim();
    let heading = format!("{} summary:", title);
    match trimmed.get(..heading.len()) {
        Some(head) if head.eq_ignore_ascii_case(&heading) => {
            trimmed[heading.len()..].trim_start().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// "Status : Ongoing" / "Alternative : A; B" rows, tolerant of spacing.
fn labelled_value(text: &str, label: &str) -> Option<String> {
    let rest = text.trim().strip_prefix(label)?;
    Some(rest.trim_start_matches([':', ' ']).to_string())
}

fn parse_box_state(text: &str) -> Option<MangaState> {
    match text.trim().to_lowercase().as_str() {
        "ongoing" => Some(MangaState::Ongoing),
        "completed" => Some(MangaState::Finished),
        _ => None,
    }
}

fn order_key(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Popularity | SortOrder::Rating => "topview",
        SortOrder::Newest => "newest",
        _ => "latest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ContentType;

    fn template() -> MangaboxTemplate {
        let info = SourceInfo {
            id: "test-box",
            name: "Test Box",
            locale: "en",
            content_type: ContentType::Manga,
        };
        MangaboxTemplate::new(info, Arc::new(WebClient::new().unwrap()), "https://example.com")
    }

    #[test]
    fn search_url_underscores_query() {
        let url = template().list_url(2, SortOrder::Updated, &ListFilter::search("Solo Leveling"));
        assert_eq!(url, "https://example.com/search/story/solo_leveling?page=2");
    }

    #[test]
    fn listing_url_carries_sort_and_state() {
        let filter = ListFilter { states: vec![MangaState::Ongoing], ..Default::default() };
        let url = template().list_url(1, SortOrder::Popularity, &filter);
        assert_eq!(
            url,
            "https://example.com/manga-list.html?type=topview&state=ongoing&page=1"
        );
    }

    #[test]
    fn parses_story_item_fallback() {
        let html = r#"<div class="story_item">
            <a href="/manga/gamma"><img src="/g.jpg"/></a>
            <h3>Gamma</h3>
        </div>"#;
        let list = template().parse_list(html);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Gamma");
        assert_eq!(list[0].url, "/manga/gamma");
    }

    #[test]
    fn parses_both_chapter_generations() {
        let old = r#"<div class="chapter-list">
            <div class="row">
                <span><a href="/chapter/gamma-12">Chapter 12</a></span>
                <span>1.2k</span>
                <span title="Jan-05-2024 14:30">5 hour ago</span>
            </div>
        </div>"#;
        let chapters = template().parse_chapters(old);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].number, 12.0);
        assert!(chapters[0].upload_date.is_some());

        let new = r#"<ul class="row-content-chapter">
            <li>
                <a class="chapter-name" href="/chapter/gamma-13">Chapter 13</a>
                <span class="chapter-time" title="Jan 06,2024 09:00">9 hour ago</span>
            </li>
        </ul>"#;
        let chapters = template().parse_chapters(new);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].number, 13.0);
        assert!(chapters[0].upload_date.is_some());
    }

    #[test]
    fn description_heading_is_stripped() {
        assert_eq!(
            strip_description_heading("Gamma summary: A story.", "Gamma"),
            "A story."
        );
        assert_eq!(strip_description_heading("A story.", "Gamma"), "A story.");
    }

    #[test]
    fn labelled_rows() {
        assert_eq!(labelled_value("Status : Ongoing", "Status").as_deref(), Some("Ongoing"));
        assert_eq!(labelled_value("Alternative : A; B", "Alternative").as_deref(), Some("A; B"));
        assert!(labelled_value("Author : X", "Status").is_none());
    }
}
