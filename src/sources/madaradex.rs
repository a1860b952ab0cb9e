//! MadaraDex: a Madara deployment behind aggressive bot mitigation. Every
//! fetch escalates through a ladder: plain request, WebView warmup plus
//! refetch, then a full in-view render as the last resort.

use crate::cloudflare::{fetch_html_checked, render_html, warm_up, WebViewBridge};
use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, SortOrder,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::sources::madara::MadaraTemplate;
use crate::util::{sort_chapters, to_absolute_url};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const INFO: SourceInfo = SourceInfo {
    id: "madaradex",
    name: "MadaraDex",
    locale: "en",
    content_type: ContentType::Hentai,
};

const WARMUP_TIMEOUT_MS: u64 = 8000;

pub struct MadaraDex {
    template: MadaraTemplate,
    bridge: Option<Arc<dyn WebViewBridge>>,
    filters: OnceCell<FilterOptions>,
}

impl MadaraDex {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://madaradex.org")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        let mut template = MadaraTemplate::new(INFO, client, base_url);
        template.list_path = "title";
        template.tag_prefix = "genre";
        template.use_ajax_chapters = true;
        template.nsfw = true;
        Self { template, bridge: None, filters: OnceCell::new() }
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn WebViewBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Escalating fetch. Without a bridge this degrades to a single checked
    /// request, surfacing `Challenge` so the host can attach one.
    async fn fetch_html(&self, url: &str) -> Result<String> {
        if let Some(html) = fetch_html_checked(&self.template.client, url).await? {
            return Ok(html);
        }
        if let Some(bridge) = &self.bridge {
            log::info!("{}: challenge at {}, warming up", INFO.id, url);
            warm_up(bridge.as_ref(), &self.template.base_url, WARMUP_TIMEOUT_MS).await;
            if let Some(html) = fetch_html_checked(&self.template.client, url).await? {
                return Ok(html);
            }
            if let Some(html) = render_html(bridge.as_ref(), url).await {
                return Ok(html);
            }
        }
        Err(ScrapeError::Challenge { url: url.to_string() })
    }
}

#[async_trait]
impl MangaSource for MadaraDex {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        let url = self.template.list_url(page, order, filter);
        let html = self.fetch_html(&url).await?;
        Ok(self.template.parse_list(&html))
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.template.base_url);
        let html = self.fetch_html(&url).await?;
        let (mut detailed, post_id) = self.template.parse_details(manga, &html);

        let mut chapters = self.template.parse_chapters(&html);
        if chapters.is_empty() {
            chapters = self.template.fetch_ajax_chapters(&url, post_id.as_deref()).await?;
        }
        sort_chapters(&mut chapters);
        detailed.chapters = Some(chapters);
        Ok(detailed)
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        let url = to_absolute_url(&chapter.url, &self.template.base_url);
        let html = self.fetch_html(&url).await?;
        let pages = self.template.parse_pages(&html);
        if pages.is_empty() {
            return Err(ScrapeError::parse("no page images found", url));
        }
        Ok(pages)
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

    #[test]
    fn template_overrides() {
        let source = MadaraDex::new(Arc::new(WebClient::new().unwrap()));
        assert_eq!(source.template.list_path, "title");
        assert!(source.template.use_ajax_chapters);
        assert_eq!(source.info().id, "madaradex");
    }

    #[test]
    fn list_url_uses_title_path() {
        let source = MadaraDex::with_base_url(
            Arc::new(WebClient::new().unwrap()),
            "https://madaradex.org",
        );
        let url = source
            .template
            .list_url(2, SortOrder::Popularity, &ListFilter::default());
        assert_eq!(url, "https://madaradex.org/title/page/2/?m_orderby=views");
    }
}
