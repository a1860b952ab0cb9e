//! SnowMtl, a machine-translation comic site built on Tailwind markup.
//! Chapter pages interleave image panels with translated-text panels; the
//! text panels are emitted as `data:` URL pages so readers can render them
//! inline without another fetch.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    ListFilter, Manga, MangaChapter, MangaPage, SortOrder, RATING_UNKNOWN,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::util::{
    element_text, extract_chapter_number, generate_uid, image_src, non_empty, sort_chapters,
    to_absolute_url, to_relative_url,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scraper::{Html, Selector};
use std::sync::Arc;

pub const INFO: SourceInfo = SourceInfo {
    id: "snowmtl",
    name: "SnowMtl",
    locale: "en",
    content_type: ContentType::Other,
};

pub struct SnowMtl {
    client: Arc<WebClient>,
    base_url: String,
}

impl SnowMtl {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://snowmtl.ru")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    fn parse_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        // The listing grid carries only utility classes; the stable part is
        // the gap-8/p-6 combination on the wrapper.
        let card = Selector::parse("div.grid.gap-8.p-6 > div").unwrap();
        let link = Selector::parse("a").unwrap();
        let title_sel = Selector::parse("h3").unwrap();
        let img = Selector::parse("img").unwrap();

        document
            .select(&card)
            .filter_map(|div| {
                let a = div.select(&link).next()?;
                let href = a.value().attr("href")?;
                let rel = to_relative_url(href, &self.base_url);
                let title = div
                    .select(&title_sel)
                    .next()
                    .map(|h| element_text(&h))
                    .and_then(|t| non_empty(&t))?;
                Some(Manga {
                    id: generate_uid(INFO.id, &rel),
                    url: rel.clone(),
                    public_url: to_absolute_url(&rel, &self.base_url),
                    title,
                    alt_titles: Vec::new(),
                    cover_url: div
                        .select(&img)
                        .next()
                        .and_then(|i| image_src(&i))
                        .map(|u| to_absolute_url(&u, &self.base_url)),
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

    fn parse_pages(&self, html: &str) -> Vec<MangaPage> {
        let document = Html::parse_document(html);
        let panel = Selector::parse("#comic-images-container > div").unwrap();
        let img = Selector::parse("img").unwrap();
        let text_div = Selector::parse("div:nth-child(2)").unwrap();

        let mut pages = Vec::new();
        for div in document.select(&panel) {
            if let Some(url) = div.select(&img).next().and_then(|i| image_src(&i)) {
                let url = to_absolute_url(&url, &self.base_url);
                pages.push(MangaPage {
                    id: generate_uid(INFO.id, &url),
                    url,
                    preview: None,
                    texts: None,
                });
            }
            if let Some(text) = div
                .select(&text_div)
                .next()
                .map(|d| element_text(&d))
                .and_then(|t| non_empty(&t))
            {
                let url = format!("data:text/plain;base64,{}", STANDARD.encode(text.as_bytes()));
                pages.push(MangaPage {
                    id: generate_uid(INFO.id, &url),
                    url,
                    preview: None,
                    texts: None,
                });
            }
        }
        pages
    }
}

#[async_trait]
impl MangaSource for SnowMtl {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let sort = match order {
            SortOrder::Popularity => "views",
            _ => "recent",
        };
        let mut url = format!("{}/search?sort_by={}", self.base_url, sort);
        if page > 1 {
            url.push_str(&format!("&page={}", page));
        }
        if let Some(query) = filter.query.as_deref() {
            url.push_str(&format!("&q={}", query.replace(' ', "+")));
        }
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_list(&html))
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let document = Html::parse_document(&html);

        let chapter_link = Selector::parse("section ul > li > a").unwrap();
        let mut chapters: Vec<MangaChapter> = document
            .select(&chapter_link)
            .enumerate()
            .filter_map(|(index, a)| {
                let href = a.value().attr("href")?;
                let rel = to_relative_url(href, &self.base_url);
                let label = element_text(&a);
                let number = match extract_chapter_number(&label) {
                    n if n >= 0.0 => n,
                    _ => (index + 1) as f32,
                };
                Some(MangaChapter {
                    id: generate_uid(INFO.id, &rel),
                    title: non_empty(&label),
                    number,
                    volume: 0,
                    url: rel,
                    scanlator: None,
                    upload_date: None,
                    branch: None,
                    source: INFO.id,
                })
            })
            .collect();
        if chapters.is_empty() {
            return Err(ScrapeError::parse("chapter list not found", url));
        }
        sort_chapters(&mut chapters);

        let title = document
            .select(&Selector::parse("main section h1").unwrap())
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t));
        let cover_url = document
            .select(&Selector::parse("main section img").unwrap())
            .next()
            .and_then(|i| image_src(&i))
            .map(|u| to_absolute_url(&u, &self.base_url));

        Ok(Manga {
            title: title.unwrap_or_else(|| manga.title.clone()),
            cover_url: cover_url.or_else(|| manga.cover_url.clone()),
            chapters: Some(chapters),
            ..manga.clone()
        })
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let url = to_absolute_url(&chapter.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let pages = self.parse_pages(&html);
        if pages.is_empty() {
            return Err(ScrapeError::parse("no panels found", url));
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SnowMtl {
        SnowMtl::new(Arc::new(WebClient::new().unwrap()))
    }

    #[test]
    fn parses_tailwind_grid() {
        let html = r#"<div class="grid grid-cols-1 sm:grid-cols-2 gap-8 p-6">
            <div>
                <a href="/comic/tower-of-god"><div><img src="/covers/tog.jpg"/></div></a>
                <div><a href="/comic/tower-of-god"><h3>Tower of God</h3></a></div>
            </div>
        </div>"#;
        let list = source().parse_list(html);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Tower of God");
        assert_eq!(list[0].url, "/comic/tower-of-god");
    }

    #[test]
    fn text_panels_become_data_pages() {
        let html = r#"<div id="comic-images-container">
            <div>
                <img src="https://cdn.snowmtl.ru/p/1.jpg"/>
                <div>Hello there!</div>
            </div>
            <div>
                <img src="https://cdn.snowmtl.ru/p/2.jpg"/>
                <div>   </div>
            </div>
        </div>"#;
        let pages = source().parse_pages(html);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].url, "https://cdn.snowmtl.ru/p/1.jpg");
        assert!(pages[1].url.starts_with("data:text/plain;base64,"));
        let encoded = pages[1].url.strip_prefix("data:text/plain;base64,").unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"Hello there!");
        assert_eq!(pages[2].url, "https://cdn.snowmtl.ru/p/2.jpg");
    }
}
