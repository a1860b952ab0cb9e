//! Scraping adapters for manga and comic reading sites, all implementing
//! one [`source::MangaSource`] contract: listing/search, detail fetch with
//! chapter lists, and page-image resolution. Records carry stable
//! hash-derived ids so repeated fetches of the same entity agree.
//!
//! ```no_run
//! use manga_sources::http_client::WebClient;
//! use manga_sources::models::{ListFilter, SortOrder};
//! use manga_sources::registry;
//! use std::sync::Arc;
//!
//! # async fn run() -> manga_sources::error::Result<()> {
//! let client = Arc::new(WebClient::new()?);
//! let source = registry::create("mangabat", client).expect("known source");
//! let results = source
//!     .get_list(1, SortOrder::Popularity, &ListFilter::search("one piece"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cloudflare;
pub mod config;
pub mod descramble;
pub mod error;
pub mod http_client;
pub mod models;
pub mod registry;
pub mod source;
pub mod sources;
pub mod translate;
pub mod util;

#[cfg(feature = "browser")]
pub mod browser;

pub use error::{Result, ScrapeError};
pub use models::{Manga, MangaChapter, MangaPage, MangaTag};
pub use source::{MangaSource, SourceInfo};
