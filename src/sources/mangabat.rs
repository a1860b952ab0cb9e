//! MangaBat, a Mangabox deployment. Tags come from the category panel on
//! the homepage; everything else is stock template behavior.

use crate::error::Result;
use crate::http_client::WebClient;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, MangaState, MangaTag, SortOrder,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::sources::mangabox::MangaboxTemplate;
use crate::util::{element_text, non_empty};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const INFO: SourceInfo = SourceInfo {
    id: "mangabat",
    name: "MangaBat",
    locale: "en",
    content_type: ContentType::Manga,
};

pub struct Mangabat {
    template: MangaboxTemplate,
    filters: OnceCell<FilterOptions>,
}

impl Mangabat {
    pub fn new(client: Arc<WebClient>) -> Self {
        Self::with_base_url(client, "https://mangabats.com")
    }

    pub fn with_base_url(client: Arc<WebClient>, base_url: impl Into<String>) -> Self {
        let template = MangaboxTemplate::new(INFO, client, base_url);
        Self { template, filters: OnceCell::new() }
    }
}

#[async_trait]
impl MangaSource for Mangabat {
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
        self.template.get_pages(chapter).await
    }

    async fn get_filter_options(&self) -> Result<FilterOptions> {
        self.filters
            .get_or_try_init(|| async {
                let html = self.template.client.get_text(&self.template.base_url).await?;
                Ok(FilterOptions {
                    tags: parse_category_panel(&html),
                    states: vec![MangaState::Ongoing, MangaState::Finished],
                })
            })
            .await
            .cloned()
    }
}

fn parse_category_panel(html: &str) -> Vec<MangaTag> {
    let document = Html::parse_document(html);
    let link =
        Selector::parse("div.panel-category p.pn-category-row:not(.pn-category-row-border) a")
            .unwrap();
    document
        .select(&link)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let key = href
                .trim_end_matches('/')
                .rsplit('/')
                .next()?
                .split('?')
                .next()?
                .to_string();
            non_empty(&element_text(&a)).map(|title| MangaTag { key, title, source: INFO.id })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_panel_tags() {
        let html = r#"<div class="panel-category">
            <p class="pn-category-row pn-category-row-border"><a href="/">All</a></p>
            <p class="pn-category-row">
                <a href="/genre/action?type=latest">Action</a>
                <a href="/genre/comedy">Comedy</a>
            </p>
        </div>"#;
        let tags = parse_category_panel(html);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "action");
        assert_eq!(tags[1].title, "Comedy");
    }
}
