//! Manhuarm: a Madara deployment whose chapters ship machine-OCR text
//! overlays as a sidecar JSON, index-aligned with the page list.

use crate::error::Result;
use crate::http_client::WebClient;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, PageText, Rect, SortOrder,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::sources::madara::MadaraTemplate;
use crate::translate::GoogleTranslator;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const INFO: SourceInfo = SourceInfo {
    id: "manhuarm",
    name: "Manhuarm",
    locale: "en",
    content_type: ContentType::Manga,
};

pub struct Manhuarm {
    template: MadaraTemplate,
    translator: Option<(GoogleTranslator, String)>,
    filters: OnceCell<FilterOptions>,
}

impl Manhuarm {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://manhuarmmtl.com")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        let template = MadaraTemplate::new(INFO, client, base_url);
        Self { template, translator: None, filters: OnceCell::new() }
    }

    /// Re-translate the overlay text into `lang` instead of serving the
    /// site's English MTL as-is.
    pub fn with_translation(mut self, lang: impl Into<String>) -> Self {
        let translator = GoogleTranslator::new(Arc::clone(&self.template.client));
        self.translator = Some((translator, lang.into()));
        self
    }

    /// The OCR sidecar is keyed by the numeric id embedded in the page
    /// image URLs (the last digit run).
    fn chapter_ocr_id(pages: &[MangaPage]) -> Option<String> {
        let first = pages.first()?;
        let re = Regex::new(r"\d+").unwrap();
        re.find_iter(&first.url).last().map(|m| m.as_str().to_string())
    }

    fn parse_overlays(raw: &serde_json::Value, index: usize) -> Option<Vec<PageText>> {
        let texts = raw.get(index)?.get("texts")?.as_array()?;
        let parsed: Vec<PageText> = texts
            .iter()
            .filter_map(|entry| {
                let text = entry.get("text")?.as_str()?.trim().to_string();
                if text.is_empty() {
                    return None;
                }
                let b = entry.get("box")?.as_array()?;
                let (x, y, w, h) = (
                    b.first()?.as_i64()? as i32,
                    b.get(1)?.as_i64()? as i32,
                    b.get(2)?.as_i64()? as i32,
                    b.get(3)?.as_i64()? as i32,
                );
                Some(PageText { rect: Rect::new(x, y, x + w, y + h), text })
            })
            .collect();
        if parsed.is_empty() {
            None
        } else {
            Some(parsed)
        }
    }

    /// Attach overlays to pages. Best effort: a missing or malformed
    /// sidecar leaves the pages readable without text.
    async fn attach_overlays(&self, mut pages: Vec<MangaPage>) -> Vec<MangaPage> {
        let Some(ocr_id) = Self::chapter_ocr_id(&pages) else { return pages };
        let url = format!(
            "{}/wp-content/uploads/ocr-data/{}.json",
            self.template.base_url, ocr_id
        );
        let raw = match self.template.client.get_json(&url).await {
            Ok(v) => v,
            Err(e) => {
                log::debug!("{}: no ocr sidecar for {}: {}", INFO.id, ocr_id, e);
                return pages;
            }
        };
        for (index, page) in pages.iter_mut().enumerate() {
            page.texts = Self::parse_overlays(&raw, index);
        }
        if let Some((translator, lang)) = &self.translator {
            for page in pages.iter_mut() {
                let Some(texts) = page.texts.as_mut() else { continue };
                for overlay in texts.iter_mut() {
                    match translator.translate("auto", lang, &overlay.text).await {
                        Ok(translated) if !translated.is_empty() => overlay.text = translated,
                        Ok(_) => {}
                        Err(e) => log::debug!("{}: translation failed: {}", INFO.id, e),
                    }
                }
            }
        }
        pages
    }
}

#[async_trait]
impl MangaSource for Manhuarm {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        self.template.get_list(page, order, filter).await
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        self.template.get_details(manga).await
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let pages = self.template.get_pages(chapter).await?;
        Ok(self.attach_overlays(pages).await)
    }

    async fn get_filter_options(&self) -> Result<FilterOptions> {
        self.filters
            .get_or_try_init(|| self.template.get_filter_options())
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(url: &str) -> MangaPage {
        MangaPage { id: 1, url: url.to_string(), preview: None, texts: None }
    }

    #[test]
    fn ocr_id_is_last_digit_run() {
        let pages = vec![page("https://cdn.example.com/2024/chapters/88123/001.webp")];
        assert_eq!(Manhuarm::chapter_ocr_id(&pages).as_deref(), Some("001"));
        let pages = vec![page("https://cdn.example.com/chapters/88123/page-a.webp")];
        assert_eq!(Manhuarm::chapter_ocr_id(&pages).as_deref(), Some("88123"));
        assert_eq!(Manhuarm::chapter_ocr_id(&[]), None);
    }

    #[test]
    fn overlay_boxes_become_rects() {
        let raw = json!([
            {
                "texts": [
                    { "text": "Hello", "box": [10, 20, 100, 40] },
                    { "text": "  ", "box": [0, 0, 5, 5] }
                ]
            },
            { "texts": [] }
        ]);
        let texts = Manhuarm::parse_overlays(&raw, 0).unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Hello");
        assert_eq!(texts[0].rect, Rect::new(10, 20, 110, 60));
        // Empty or out-of-range entries yield no overlay at all.
        assert!(Manhuarm::parse_overlays(&raw, 1).is_none());
        assert!(Manhuarm::parse_overlays(&raw, 9).is_none());
    }
}
