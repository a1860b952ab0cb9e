use crate::error::Result;
use crate::models::{
    FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, SortOrder,
};
use async_trait::async_trait;

/// Kind of content a source predominantly hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Manga,
    Comics,
    Hentai,
    Other,
}

/// Static descriptor for one source: stable id, display name, BCP-47-ish
/// locale of the content, and the site it scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub locale: &'static str,
    pub content_type: ContentType,
}

/// The contract every site adapter implements: listing/search, detail
/// fetch (including the chapter list), and page-image resolution. Each
/// call is an independent request/response cycle against the upstream
/// site; adapters hold no mutable state beyond private memoized lookups.
#[async_trait]
pub trait MangaSource: Send + Sync {
    fn info(&self) -> &SourceInfo;

    /// One page of listing or search results. `page` is 1-based.
    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>>;

    /// Expand a summary record with full metadata and its chapter list.
    async fn get_details(&self, manga: &Manga) -> Result<Manga>;

    /// Ordered image references for one chapter.
    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>>;

    /// Tags and states the site can filter by. Default: none; adapters
    /// with a fetchable tag table override and memoize.
    async fn get_filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions::default())
    }
}
