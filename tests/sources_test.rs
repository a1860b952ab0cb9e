//! End-to-end adapter tests against a local mock server: list, details and
//! page resolution without touching the real sites.

use httpmock::prelude::*;
use manga_sources::http_client::WebClient;
use manga_sources::models::{ListFilter, SortOrder};
use manga_sources::source::MangaSource;
use manga_sources::sources::batcave::BatCave;
use manga_sources::sources::mangabat::Mangabat;
use manga_sources::sources::mangafire::{MangaFire, INFO_EN};
use manga_sources::sources::manhuarm::Manhuarm;
use manga_sources::sources::rizzcomic::RizzComic;
use manga_sources::ScrapeError;
use std::sync::Arc;

fn client() -> Arc<WebClient> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(WebClient::new().unwrap())
}

#[tokio::test]
async fn manhuarm_list_details_pages_roundtrip() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/manga/page/1/");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body>
                <div class="page-item-detail">
                    <img data-src="/covers/iron-ruler.jpg"/>
                    <h3><a href="/manga/iron-ruler/">Iron Ruler</a></h3>
                </div>
                </body></html>"#,
            );
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/manga/iron-ruler/");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body>
                <div class="post-title"><h1>Iron Ruler</h1></div>
                <div class="description-summary"><div class="summary__content">A tyrant reborn.</div></div>
                <div class="author-content"><a href="/manga-author/kim/">Kim</a></div>
                <div class="post-content_item"><h5>Status</h5><div class="summary-content">OnGoing</div></div>
                <ul><li class="wp-manga-chapter">
                    <a href="/manga/iron-ruler/chapter-2/">Chapter 2</a>
                    <span class="chapter-release-date">February 01, 2024</span>
                </li><li class="wp-manga-chapter">
                    <a href="/manga/iron-ruler/chapter-1/">Chapter 1</a>
                    <span class="chapter-release-date">January 01, 2024</span>
                </li></ul>
                </body></html>"#,
            );
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/manga/iron-ruler/chapter-1/");
            then.status(200).header("content-type", "text/html").body(
                r#"<div class="reading-content">
                    <img data-src="/uploads/7731/001.webp"/>
                    <img data-src="/uploads/7731/002.webp"/>
                </div>"#,
            );
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/wp-content/uploads/ocr-data/001.json");
            then.status(200).header("content-type", "application/json").body(
                r#"[
                    {"texts": [{"text": "Kneel.", "box": [10, 10, 80, 20]}]},
                    {"texts": []}
                ]"#,
            );
        })
        .await;

    let source = Manhuarm::with_base_url(client(), server.base_url());

    let list = source
        .get_list(1, SortOrder::Updated, &ListFilter::default())
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "Iron Ruler");

    let details = source.get_details(&list[0]).await.unwrap();
    assert_eq!(details.description.as_deref(), Some("A tyrant reborn."));
    assert_eq!(details.authors, vec!["Kim".to_string()]);
    let chapters = details.chapters.as_ref().unwrap();
    assert_eq!(chapters.len(), 2);
    // Sorted ascending regardless of site order.
    assert_eq!(chapters[0].number, 1.0);

    let pages = source.get_pages(&chapters[0]).await.unwrap();
    assert_eq!(pages.len(), 2);
    let texts = pages[0].texts.as_ref().unwrap();
    assert_eq!(texts[0].text, "Kneel.");
    assert!(pages[1].texts.is_none());
}

#[tokio::test]
async fn rizzcomic_filter_api_listing() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/series");
            then.status(200).header("content-type", "text/html").body(
                r#"<div class="listupd"><div class="bs"><div class="bsx">
                    <a href="/series/r77-existing-title/">x</a>
                </div></div></div>"#,
            );
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/Index/filter_series")
                .x_www_form_urlencoded_tuple("OrderValue", "popular");
            then.status(200).header("content-type", "application/json").body(
                r#"[{
                    "id": 5,
                    "title": "Return of the Blade",
                    "author": "Han",
                    "rating": "92",
                    "image_url": "blade.webp",
                    "status": "ongoing",
                    "long_description": "The blade returns."
                }]"#,
            );
        })
        .await;

    let source = RizzComic::with_base_url(client(), server.base_url());
    let list = source
        .get_list(1, SortOrder::Popularity, &ListFilter::default())
        .await
        .unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].url, "/series/r77-return-of-the-blade");
    assert_eq!(list[0].rating, 9.2);
    assert_eq!(list[0].description.as_deref(), Some("The blade returns."));

    // Page 2 never hits the network: the endpoint is unpaginated.
    let empty = source
        .get_list(2, SortOrder::Popularity, &ListFilter::default())
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn mangabat_search_and_chapters() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/story/blue_lock");
            then.status(200).header("content-type", "text/html").body(
                r#"<div class="story_item">
                    <a href="/manga/blue-lock"><img src="/bl.jpg"/></a>
                    <h3>Blue Lock</h3>
                </div>"#,
            );
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/manga/blue-lock");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body>
                <ul class="manga-info-text">
                    <h1>Blue Lock</h1>
                    <li>Status : Ongoing</li>
                    <li>Alternative : Burruu Rokku</li>
                </ul>
                <div class="chapter-list">
                    <div class="row">
                        <span><a href="/chapter/blue-lock-3">Chapter 3</a></span>
                        <span>9k</span>
                        <span title="Jan-07-2024 12:00">recent</span>
                    </div>
                </div>
                </body></html>"#,
            );
        })
        .await;

    let source = Mangabat::with_base_url(client(), server.base_url());
    let list = source
        .get_list(1, SortOrder::Updated, &ListFilter::search("Blue Lock"))
        .await
        .unwrap();
    assert_eq!(list.len(), 1);

    let details = source.get_details(&list[0]).await.unwrap();
    assert_eq!(details.alt_titles, vec!["Burruu Rokku".to_string()]);
    let chapters = details.chapters.as_ref().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].number, 3.0);
    assert!(chapters[0].upload_date.is_some());
}

#[tokio::test]
async fn mangafire_pages_carry_scramble_fragments() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/ajax/read/chapter/901");
            then.status(200).header("content-type", "application/json").body(
                r#"{"result":{"images":[
                    ["https://cdn.mf/1.webp", 1, 0],
                    ["https://cdn.mf/2.webp", 1, 3]
                ]}}"#,
            );
        })
        .await;

    let source = MangaFire::new(INFO_EN, client(), server.base_url(), "en");
    let chapter = manga_sources::MangaChapter {
        id: 1,
        title: None,
        number: 1.0,
        volume: 0,
        url: "grand-blue.kx102/chapter/en/901".to_string(),
        scanlator: None,
        upload_date: None,
        branch: Some("English Chapter".to_string()),
        source: "mangafire-en",
    };

    let pages = source.get_pages(&chapter).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].url, "https://cdn.mf/1.webp");
    assert_eq!(pages[1].url, "https://cdn.mf/2.webp#scrambled_3");
    assert_eq!(
        manga_sources::descramble::scramble_offset(&pages[1].url),
        Some(3)
    );
}

#[tokio::test]
async fn batcave_surfaces_unresolved_challenge() {
    let server = MockServer::start_async().await;

    // Near-empty body, the shape an interstitial leaves behind.
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/ComicList");
            then.status(200).header("content-type", "text/html").body("<html></html>");
        })
        .await;

    let source = BatCave::with_base_url(client(), server.base_url());
    let err = source
        .get_list(1, SortOrder::Updated, &ListFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Challenge { .. }));
}

#[tokio::test]
async fn batcave_reads_embedded_data_blob() {
    let server = MockServer::start_async().await;
    let padding = format!("<!-- {} -->", "x".repeat(300));

    server
        .mock_async(|when, then| {
            when.method(GET).path("/comics/991-dark-city.html");
            then.status(200).header("content-type", "text/html").body(format!(
                r#"<html><body>{}
                <ul class="page__list">
                    <li>Publisher: DC</li>
                    <li>Release type: Ongoing</li>
                </ul>
                <div class="page__text full-text clearfix">A city with no dawn.</div>
                <script>window.__DATA__ = {{"news_id": 991, "chapters": [
                    {{"id": 12, "posi": 2.0, "title": "Issue #2", "date": "05.01.2024"}},
                    {{"id": 11, "posi": 1.0, "title": "Issue #1", "date": "01.01.2024"}}
                ]}};</script>
                </body></html>"#,
                padding
            ));
        })
        .await;

    let source = BatCave::with_base_url(client(), server.base_url());
    let seed = manga_sources::Manga {
        id: 7,
        url: "/comics/991-dark-city.html".to_string(),
        public_url: server.url("/comics/991-dark-city.html"),
        title: "Dark City".to_string(),
        alt_titles: Vec::new(),
        cover_url: None,
        large_cover_url: None,
        description: None,
        authors: Vec::new(),
        tags: Vec::new(),
        rating: manga_sources::models::RATING_UNKNOWN,
        content_rating: None,
        state: None,
        source: "batcave",
        chapters: None,
    };

    let details = source.get_details(&seed).await.unwrap();
    assert_eq!(details.authors, vec!["DC".to_string()]);
    assert_eq!(details.description.as_deref(), Some("A city with no dawn."));
    let chapters = details.chapters.as_ref().unwrap();
    assert_eq!(chapters.len(), 2);
    // Embedded list is newest-first; chapters come back oldest-first.
    assert_eq!(chapters[0].url, "/reader/991/11");
    assert_eq!(chapters[1].number, 2.0);
}
