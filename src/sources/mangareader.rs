//! Shared scraping recipe for the MangaReader/themesia theme family.
//! Listing grids use `.listupd .bsx` cards, chapters sit in `#chapterlist`,
//! and page images are embedded as a `ts_reader.run({...})` script payload.

use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    ContentRating, ListFilter, Manga, MangaChapter, MangaPage, MangaTag, SortOrder, RATING_UNKNOWN,
};
use crate::source::SourceInfo;
use crate::sources::madara::parse_state;
use crate::util::{
    element_text, extract_chapter_number, extract_volume_number, generate_uid, image_src,
    non_empty, parse_date_safe, sort_chapters, to_absolute_url, to_relative_url,
};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;

const LIST_SELECTOR: &str = ".utao .uta .imgu, .listupd .bs .bsx, .listo .bs .bsx";

pub struct MangaReaderTemplate {
    pub info: SourceInfo,
    pub client: Arc<WebClient>,
    pub base_url: String,
    /// Path the series listing lives under, usually "/manga".
    pub list_path: &'static str,
    pub date_format: &'static str,
}

#[derive(Deserialize)]
struct TsReaderPayload {
    sources: Vec<TsReaderSource>,
}

#[derive(Deserialize)]
struct TsReaderSource {
    images: Vec<String>,
}

impl MangaReaderTemplate {
    pub fn new(info: SourceInfo, client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        Self {
            info,
            client,
            base_url: base_url.into(),
            list_path: "/manga",
            date_format: "%B %d, %Y",
        }
    }

    pub async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let url = if let Some(query) = filter.query.as_deref() {
            format!("{}/page/{}/?s={}", self.base_url, page, query.replace(' ', "+"))
        } else {
            let mut url = format!(
                "{}{}/?page={}&order={}",
                self.base_url,
                self.list_path,
                page,
                order_key(order)
            );
            for tag in &filter.tags {
                url.push_str(&format!("&genre[]={}", tag.key));
            }
            url
        };
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_list(&html))
    }

    pub fn parse_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        let card = Selector::parse(LIST_SELECTOR).unwrap();
        let link = Selector::parse("a").unwrap();
        let img = Selector::parse("img").unwrap();

        document
            .select(&card)
            .filter_map(|el| {
                let a = el.select(&link).next()?;
                let href = a.value().attr("href")?;
                let title = a
                    .value()
                    .attr("title")
                    .and_then(non_empty)
                    .or_else(|| non_empty(&element_text(&a)))?;
                let rel = to_relative_url(href, &self.base_url);
                Some(Manga {
                    id: generate_uid(self.info.id, &rel),
                    url: rel.clone(),
                    public_url: to_absolute_url(&rel, &self.base_url),
                    title,
                    alt_titles: Vec::new(),
                    cover_url: el.select(&img).next().and_then(|e| image_src(&e)),
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
            .collect()
    }

    pub async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let mut detailed = self.parse_details(manga, &html);
        let mut chapters = self.parse_chapters(&html);
        sort_chapters(&mut chapters);
        detailed.chapters = Some(chapters);
        Ok(detailed)
    }

    pub(crate) fn parse_details(&self, manga: &Manga, html: &str) -> Manga {
        let document = Html::parse_document(html);
        let sel = |s: &str| Selector::parse(s).unwrap();

        let title = document
            .select(&sel("h1.entry-title"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t))
            .unwrap_or_else(|| manga.title.clone());

        let description = document
            .select(&sel("div.entry-content[itemprop=\"description\"], div.entry-content"))
            .next()
            .map(|e| element_text(&e))
            .and_then(|t| non_empty(&t));

        let cover_url = document
            .select(&sel("div.thumb img, div.seriestucontl img"))
            .next()
            .and_then(|e| image_src(&e))
            .map(|u| to_absolute_url(&u, &self.base_url))
            .or_else(|| manga.cover_url.clone());

        let tags: Vec<MangaTag> = document
            .select(&sel("span.mgen a, div.seriestugenre a"))
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let key = href.trim_end_matches('/').rsplit('/').next()?.to_string();
                Some(MangaTag { key, title: element_text(&a), source: self.info.id })
            })
            .collect();

        // Info table rows: "Status", "Author" etc. label then value.
        let mut authors = Vec::new();
        let mut state = None;
        let value_sel = sel("i, span");
        for row in document.select(&sel("div.tsinfo div.imptdt, table.infotable tr")) {
            let text = element_text(&row);
            let lower = text.to_lowercase();
            let value = row
                .select(&value_sel)
                .last()
                .map(|e| element_text(&e))
                .unwrap_or_default();
            if lower.starts_with("status") {
                state = parse_state(&value);
            } else if lower.starts_with("author") || lower.starts_with("artist") {
                if let Some(v) = non_empty(&value) {
                    authors.push(v);
                }
            }
        }

        let adult = tags.iter().any(|t| {
            matches!(t.title.to_lowercase().as_str(), "adult" | "mature" | "ecchi" | "smut")
        });

        Manga {
            title,
            description,
            cover_url,
            tags,
            authors: if authors.is_empty() { manga.authors.clone() } else { authors },
            state,
            content_rating: adult.then_some(ContentRating::Adult).or(manga.content_rating),
            ..manga.clone()
        }
    }

    pub fn parse_chapters(&self, html: &str) -> Vec<MangaChapter> {
        let document = Html::parse_document(html);
        let item = Selector::parse("div#chapterlist li").unwrap();
        let link = Selector::parse("a").unwrap();
        let num = Selector::parse("span.chapternum").unwrap();
        let date = Selector::parse("span.chapterdate").unwrap();

        document
            .select(&item)
            .filter_map(|li| {
                let a = li.select(&link).next()?;
                let href = a.value().attr("href")?;
                let rel = to_relative_url(href, &self.base_url);
                let label = li
                    .select(&num)
                    .next()
                    .map(|e| element_text(&e))
                    .and_then(|t| non_empty(&t))
                    .unwrap_or_else(|| element_text(&a));
                // data-num carries the canonical number when present.
                let number = li
                    .value()
                    .attr("data-num")
                    .and_then(|n| n.parse::<f32>().ok())
                    .unwrap_or_else(|| extract_chapter_number(&label));
                let upload_date = li
                    .select(&date)
                    .next()
                    .and_then(|d| parse_date_safe(&element_text(&d), self.date_format));
                Some(MangaChapter {
                    id: generate_uid(self.info.id, &rel),
                    title: non_empty(&label),
                    number,
                    volume: extract_volume_number(&label),
                    url: rel,
                    scanlator: None,
                    upload_date,
                    branch: None,
                    source: self.info.id,
                })
            })
            .collect()
    }

    pub async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let url = to_absolute_url(&chapter.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        self.parse_pages(&html)
            .ok_or_else(|| ScrapeError::parse("ts_reader payload not found", url))
    }

    /// The reader embeds its image list as `ts_reader.run({...})` in an
    /// inline script.
    pub fn parse_pages(&self, html: &str) -> Option<Vec<MangaPage>> {
        let re = Regex::new(r"(?s)ts_reader\.run\((\{.*?\})\)").unwrap();
        let raw = re.captures(html)?.get(1)?.as_str().to_string();
        let payload: TsReaderPayload = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("{}: malformed ts_reader payload: {}", self.info.id, e);
                return None;
            }
        };
        let images = &payload.sources.first()?.images;
        Some(
            images
                .iter()
                .map(|u| {
                    let url = to_absolute_url(u.trim(), &self.base_url);
                    MangaPage {
                        id: generate_uid(self.info.id, &url),
                        url,
                        preview: None,
                        texts: None,
                    }
                })
                .collect(),
        )
    }
}

fn order_key(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Updated => "update",
        SortOrder::Popularity => "popular",
        SortOrder::Rating => "popular",
        SortOrder::Newest => "latest",
        SortOrder::Alphabetical => "title",
        SortOrder::Relevance => "update",
    }
}
