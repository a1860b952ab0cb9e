//! MangaFire. Listing and search are plain HTML, but chapter lists and
//! page images hide behind AJAX endpoints gated by a per-request `vrf`
//! token. Tokens are derived locally (see [`vrf`]); when the site rotates
//! its cipher constants an attached WebView bridge can recover tokens by
//! observing the reader page's own requests.
//!
//! Scrambled page images keep their `#scrambled_{offset}` fragment; hosts
//! rebuild them with [`crate::descramble::descramble_plan`].

pub mod vrf;

use crate::cloudflare::WebViewBridge;
use crate::error::{Result, ScrapeError};
use crate::http_client::WebClient;
use crate::models::{
    ContentRating, FilterOptions, ListFilter, Manga, MangaChapter, MangaPage, MangaState,
    MangaTag, SortOrder, RATING_UNKNOWN,
};
use crate::source::{ContentType, MangaSource, SourceInfo};
use crate::sources::madara::parse_state;
use crate::util::{
    element_text, generate_uid, non_empty, parse_date_safe, sort_chapters, to_absolute_url,
    to_relative_url, to_title_case,
};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::sleep;

const TOKEN_RETRY_ATTEMPTS: usize = 3;
const TOKEN_RETRY_DELAY_MS: u64 = 350;
const CAPTURE_TIMEOUT_MS: u64 = 2000;

pub const INFO_EN: SourceInfo = SourceInfo {
    id: "mangafire-en",
    name: "MangaFire English",
    locale: "en",
    content_type: ContentType::Manga,
};

pub const INFO_FR: SourceInfo = SourceInfo {
    id: "mangafire-fr",
    name: "MangaFire French",
    locale: "fr",
    content_type: ContentType::Manga,
};

pub const INFO_JA: SourceInfo = SourceInfo {
    id: "mangafire-ja",
    name: "MangaFire Japanese",
    locale: "ja",
    content_type: ContentType::Manga,
};

pub struct MangaFire {
    info: SourceInfo,
    client: Arc<WebClient>,
    base_url: String,
    /// Language code the site uses in reader URLs, e.g. "en" or "pt-br".
    site_lang: &'static str,
    bridge: Option<Arc<dyn WebViewBridge>>,
    tags: OnceCell<Vec<MangaTag>>,
}

/// One language/edition chapter listing on a series page.
struct ChapterBranch {
    type_name: String,
    lang_code: String,
    lang_title: String,
}

struct ChapterItem {
    data_id: String,
    number: f32,
    href: String,
    title: Option<String>,
}

impl MangaFire {
    pub fn english(client: Arc<WebClient>) -> Self {
        Self::new(INFO_EN, client, "https://mangafire.to", "en")
    }

    pub fn french(client: Arc<WebClient>) -> Self {
        Self::new(INFO_FR, client, "https://mangafire.to", "fr")
    }

    pub fn japanese(client: Arc<WebClient>) -> Self {
        Self::new(INFO_JA, client, "https://mangafire.to", "ja")
    }

    pub fn new(
        info: SourceInfo,
        client: Arc<WebClient>,
        base_url: impl Into<String>,
        site_lang: &'static str,
    ) -> Self {
        Self {
            info,
            client,
            base_url: base_url.into(),
            site_lang,
            bridge: None,
            tags: OnceCell::new(),
        }
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn WebViewBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// AJAX fetch with token-rotation retry. A 403 usually means the derived
    /// token was rejected; short waits cover transient rejections, and the
    /// caller falls back to bridge capture after the last attempt.
    async fn get_ajax(&self, url: &str) -> Result<serde_json::Value> {
        let mut rejected = false;
        for attempt in 0..TOKEN_RETRY_ATTEMPTS {
            let response = self.client.get(url).await?;
            if response.status().as_u16() == 403 {
                rejected = true;
                log::debug!("{}: token rejected for {} (attempt {})", self.info.id, url, attempt + 1);
            } else {
                let text = response.error_for_status()?.text().await?;
                return Ok(serde_json::from_str(&text)?);
            }
            if attempt + 1 < TOKEN_RETRY_ATTEMPTS {
                sleep(Duration::from_millis(TOKEN_RETRY_DELAY_MS)).await;
            }
        }
        debug_assert!(rejected);
        Err(ScrapeError::TokenDerivation(format!("token rejected for {}", url)))
    }

    /// Recover a token by watching which `vrf`-bearing request the reader
    /// page itself makes.
    async fn capture_token(&self, reader_url: &str, ajax_pattern: &str) -> Option<String> {
        let bridge = self.bridge.as_ref()?;
        let pattern = Regex::new(&format!(r"{}\?vrf=([^&]+)", regex::escape(ajax_pattern))).ok()?;
        let urls = bridge
            .capture_urls(reader_url, &pattern, Duration::from_millis(CAPTURE_TIMEOUT_MS))
            .await
            .ok()?;
        urls.iter()
            .find_map(|u| pattern.captures(u).map(|c| c[1].to_string()))
    }

    fn parse_manga_list(&self, html: &str) -> Vec<Manga> {
        let document = Html::parse_document(html);
        let unit = Selector::parse(".original.card-lg .unit .inner, .unit .inner").unwrap();
        let info_link = Selector::parse(".info > a").unwrap();
        let img = Selector::parse("img").unwrap();

        document
            .select(&unit)
            .filter_map(|el| {
                let a = el.select(&info_link).next()?;
                let href = a.value().attr("href")?;
                let rel = to_relative_url(href, &self.base_url);
                let title = non_empty(&own_text(&a)).or_else(|| non_empty(&element_text(&a)))?;
                Some(Manga {
                    id: generate_uid(self.info.id, &rel),
                    url: rel.clone(),
                    public_url: to_absolute_url(&rel, &self.base_url),
                    title,
                    alt_titles: Vec::new(),
                    cover_url: el
                        .select(&img)
                        .next()
                        .and_then(|i| i.value().attr("src"))
                        .map(|s| to_absolute_url(s, &self.base_url)),
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

    async fn search(&self, query: &str) -> Result<Vec<Manga>> {
        let token = vrf::generate(query)?;
        let url = format!(
            "{}/ajax/manga/search?keyword={}&vrf={}",
            self.base_url,
            urlencoded(query),
            token
        );
        let value = self.get_ajax(&url).await?;
        let fragment = value
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::parse("search result missing html", &url))?;
        Ok(self.parse_manga_list(fragment))
    }

    fn filter_url(&self, page: u32, order: SortOrder, filter: &ListFilter) -> String {
        let mut url = format!(
            "{}/filter?page={}&language%5B%5D={}",
            self.base_url, page, self.site_lang
        );
        for tag in &filter.tags_exclude {
            url.push_str(&format!("&genre%5B%5D=-{}", tag.key));
        }
        for tag in &filter.tags {
            url.push_str(&format!("&genre%5B%5D={}", tag.key));
        }
        for state in &filter.states {
            let value = match state {
                MangaState::Ongoing => "releasing",
                MangaState::Finished => "completed",
                MangaState::Abandoned => "discontinued",
                MangaState::Paused => "on_hiatus",
                MangaState::Upcoming => "info",
            };
            url.push_str(&format!("&status%5B%5D={}", value));
        }
        let sort = match order {
            SortOrder::Updated => "recently_updated",
            SortOrder::Popularity => "total_views",
            SortOrder::Rating => "mal_score",
            SortOrder::Newest => "release_date",
            SortOrder::Alphabetical => "title_az",
            SortOrder::Relevance => "most_relevance",
        };
        url.push_str(&format!("&sort={}", sort));
        url
    }

    fn parse_branches(html: &str, site_lang: &str) -> Vec<ChapterBranch> {
        let document = Html::parse_document(html);
        let tab = Selector::parse(".chapvol-tab > a").unwrap();
        let content = Selector::parse(".m-list div.tab-content").unwrap();
        let item = Selector::parse(".list-menu .dropdown-item").unwrap();

        let available_types: Vec<String> = document
            .select(&tab)
            .filter_map(|a| a.value().attr("data-name").map(str::to_string))
            .collect();

        let mut branches = Vec::new();
        for tab_content in document.select(&content) {
            let Some(type_name) = tab_content.value().attr("data-name") else { continue };
            for entry in tab_content.select(&item) {
                let lang_code = entry
                    .value()
                    .attr("data-code")
                    .unwrap_or_default()
                    .to_lowercase();
                if lang_code == site_lang && available_types.iter().any(|t| t == type_name) {
                    branches.push(ChapterBranch {
                        type_name: type_name.to_string(),
                        lang_code,
                        lang_title: entry.value().attr("data-title").unwrap_or_default().to_string(),
                    });
                }
            }
        }
        branches
    }

    fn parse_chapter_items(fragment: &str) -> Vec<ChapterItem> {
        let document = Html::parse_fragment(fragment);
        let link = Selector::parse("ul li a").unwrap();
        document
            .select(&link)
            .filter_map(|a| {
                let data_id = a.value().attr("data-id")?.to_string();
                Some(ChapterItem {
                    data_id,
                    number: a
                        .value()
                        .attr("data-number")
                        .and_then(|n| n.parse().ok())
                        .unwrap_or(-1.0),
                    href: a.value().attr("href").unwrap_or_default().to_string(),
                    title: a.value().attr("title").and_then(non_empty),
                })
            })
            .collect()
    }

    /// Dates and volume-bearing titles live on a second, tokenless
    /// endpoint, index-aligned with the chapter items.
    fn parse_date_items(fragment: &str) -> Vec<(Option<String>, Option<String>)> {
        let document = Html::parse_fragment(fragment);
        let link = Selector::parse("ul li a").unwrap();
        let span = Selector::parse("span").unwrap();
        document
            .select(&link)
            .map(|a| {
                let date = a.select(&span).nth(1).map(|s| element_text(&s));
                let title = a.value().attr("title").and_then(non_empty);
                (date, title)
            })
            .collect()
    }

    async fn chapters_for_branch(
        &self,
        full_manga_id: &str,
        branch: &ChapterBranch,
    ) -> Result<Vec<MangaChapter>> {
        let id_part = full_manga_id.rsplit('.').next().unwrap_or(full_manga_id);
        let ajax_path = format!(
            "/ajax/read/{}/{}/{}",
            id_part, branch.type_name, branch.lang_code
        );

        let token = vrf::generate(id_part)?;
        let url = format!("{}{}?vrf={}", self.base_url, ajax_path, token);
        let value = match self.get_ajax(&url).await {
            Ok(v) => v,
            Err(e @ ScrapeError::TokenDerivation(_)) => {
                // The reader page for the first chapter makes the same
                // request; let the bridge observe its token.
                let reader_url = format!(
                    "{}/read/{}/{}/{}-1",
                    self.base_url, full_manga_id, branch.lang_code, branch.type_name
                );
                let Some(token) = self.capture_token(&reader_url, &ajax_path).await else {
                    return Err(e);
                };
                let url = format!("{}{}?vrf={}", self.base_url, ajax_path, token);
                self.get_ajax(&url).await?
            }
            Err(e) => return Err(e),
        };
        let fragment = value
            .get("result")
            .and_then(|r| r.get("html"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::parse("chapter list missing html", &url))?;
        let items = Self::parse_chapter_items(fragment);

        let dates = {
            let url = format!(
                "{}/ajax/manga/{}/{}/{}",
                self.base_url, id_part, branch.type_name, branch.lang_code
            );
            match self.get_ajax(&url).await {
                Ok(v) => v
                    .get("result")
                    .and_then(|r| r.as_str())
                    .map(Self::parse_date_items)
                    .unwrap_or_default(),
                Err(e) => {
                    log::debug!("{}: no date listing for {}: {}", self.info.id, url, e);
                    Vec::new()
                }
            }
        };

        let volume_re = Regex::new(r"(?i)vol(?:ume)?\s*(\d+)").unwrap();
        let branch_label = format!(
            "{} {}",
            branch.lang_title,
            to_title_case(&branch.type_name)
        );
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let (date_text, other_title) = dates
                    .get(i)
                    .cloned()
                    .unwrap_or((None, None));
                let volume = other_title
                    .as_deref()
                    .and_then(|t| volume_re.captures(t))
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or(0);
                let title = item.title.clone().unwrap_or_else(|| {
                    format!("{} {}", to_title_case(&branch.type_name), item.number)
                });
                MangaChapter {
                    id: generate_uid(self.info.id, &item.href),
                    title: Some(title),
                    number: item.number,
                    volume,
                    url: format!(
                        "{}/{}/{}/{}",
                        full_manga_id, branch.type_name, branch.lang_code, item.data_id
                    ),
                    scanlator: None,
                    upload_date: date_text.as_deref().and_then(|d| parse_date_safe(d, "%b %d, %Y")),
                    branch: Some(branch_label.clone()),
                    source: self.info.id,
                }
            })
            .collect())
    }

    fn parse_details(&self, manga: &Manga, html: &str) -> Manga {
        let document = Html::parse_document(html);
        let sel = |s: &str| Selector::parse(s).unwrap();

        let title = document
            .select(&sel(".info > h1"))
            .next()
            .map(|e| own_text(&e))
            .and_then(|t| non_empty(&t))
            .unwrap_or_else(|| manga.title.clone());

        let alt_titles = document
            .select(&sel(".info > h6"))
            .next()
            .and_then(|e| non_empty(&own_text(&e)))
            .into_iter()
            .collect();

        let rating = document
            .select(&sel("div.rating-box"))
            .next()
            .and_then(|e| e.value().attr("data-score"))
            .and_then(|s| s.parse::<f32>().ok())
            .map(|s| s / 10.0)
            .unwrap_or(RATING_UNKNOWN);

        let cover_url = document
            .select(&sel("div.manga-detail div.poster img"))
            .next()
            .and_then(|e| e.value().attr("src"))
            .map(|s| to_absolute_url(s, &self.base_url))
            .or_else(|| manga.cover_url.clone());

        let mut is_adult = false;
        let mut is_suggestive = false;
        let tags: Vec<MangaTag> = document
            .select(&sel("div.meta a[href*=\"/genre/\"]"))
            .filter_map(|a| {
                let label = own_text(&a);
                match label.as_str() {
                    "Hentai" => is_adult = true,
                    "Ecchi" => is_suggestive = true,
                    _ => {}
                }
                let href = a.value().attr("href")?;
                let key = href.trim_end_matches('/').rsplit('/').next()?.to_string();
                non_empty(&label).map(|title| MangaTag { key, title, source: self.info.id })
            })
            .collect();

        let authors = document
            .select(&sel("div.meta a[href*=\"/author/\"]"))
            .map(|a| own_text(&a))
            .filter(|t| !t.is_empty())
            .collect();

        let state = document
            .select(&sel(".info > p"))
            .next()
            .and_then(|e| parse_state(&own_text(&e)));

        let description = document
            .select(&sel("#synopsis div.modal-content"))
            .next()
            .and_then(|e| non_empty(&element_text(&e)));

        Manga {
            title,
            alt_titles,
            rating,
            cover_url,
            tags,
            authors,
            state,
            description,
            content_rating: Some(if is_adult {
                ContentRating::Adult
            } else if is_suggestive {
                ContentRating::Suggestive
            } else {
                ContentRating::Safe
            }),
            ..manga.clone()
        }
    }
}

#[async_trait]
impl MangaSource for MangaFire {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn get_list(&self, page: u32, order: SortOrder, filter: &ListFilter) -> Result<Vec<Manga>> {
        if let Some(query) = filter.query.as_deref() {
            if page > 1 {
                return Ok(Vec::new());
            }
            return self.search(query).await;
        }
        let url = self.filter_url(page, order, filter);
        let html = self.client.get_text(&url).await?;
        Ok(self.parse_manga_list(&html))
    }

    async fn get_details(&self, manga: &Manga) -> Result<Manga> {
        let url = to_absolute_url(&manga.url, &self.base_url);
        let html = self.client.get_text(&url).await?;
        let mut detailed = self.parse_details(manga, &html);
        let branches = Self::parse_branches(&html, self.site_lang);
        let full_manga_id = manga
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&manga.url)
            .to_string();

        let mut chapters = Vec::new();
        for branch in &branches {
            chapters.extend(self.chapters_for_branch(&full_manga_id, branch).await?);
        }
        sort_chapters(&mut chapters);
        detailed.chapters = Some(chapters);
        Ok(detailed)
    }

    async fn get_pages(&self, chapter: &MangaChapter) -> Result<Vec<MangaPage>> {
        // Chapter URLs are "{mangaId}/{type}/{lang}/{itemId}".
        let parts: Vec<&str> = chapter.url.split('/').collect();
        if parts.len() < 4 {
            return Err(ScrapeError::parse("malformed chapter key", chapter.url.clone()));
        }
        let (manga_id, type_name, lang, item_id) = (parts[0], parts[1], parts[2], parts[3]);

        let ajax_path = format!("/ajax/read/{}/{}", type_name, item_id);
        let token = vrf::generate(item_id)?;
        let url = format!("{}{}?vrf={}", self.base_url, ajax_path, token);
        let value = match self.get_ajax(&url).await {
            Ok(v) => v,
            Err(e @ ScrapeError::TokenDerivation(_)) => {
                let number = if chapter.number >= 0.0 && chapter.number.fract() == 0.0 {
                    format!("{}", chapter.number as i64)
                } else {
                    format!("{}", chapter.number)
                };
                let reader_url = format!(
                    "{}/read/{}/{}/{}-{}",
                    self.base_url, manga_id, lang, type_name, number
                );
                let Some(token) = self.capture_token(&reader_url, &ajax_path).await else {
                    return Err(e);
                };
                let url = format!("{}{}?vrf={}", self.base_url, ajax_path, token);
                self.get_ajax(&url).await?
            }
            Err(e) => return Err(e),
        };

        let images = value
            .get("result")
            .and_then(|r| r.get("images"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| ScrapeError::parse("page listing missing images", &url))?;

        let pages = images
            .iter()
            .filter_map(|entry| {
                let image_url = entry.get(0)?.as_str()?.to_string();
                let offset = entry.get(2).and_then(|v| v.as_i64()).unwrap_or(0);
                let url = if offset < 1 {
                    image_url
                } else {
                    format!("{}#scrambled_{}", image_url, offset)
                };
                Some(MangaPage {
                    id: generate_uid(self.info.id, &url),
                    url,
                    preview: None,
                    texts: None,
                })
            })
            .collect::<Vec<_>>();
        if pages.is_empty() {
            return Err(ScrapeError::parse("no page images found", url));
        }
        Ok(pages)
    }

    async fn get_filter_options(&self) -> Result<FilterOptions> {
        let tags = self
            .tags
            .get_or_try_init(|| async {
                let url = format!("{}/filter", self.base_url);
                let html = self.client.get_text(&url).await?;
                Ok::<_, ScrapeError>(parse_genre_filter(&html, self.info.id))
            })
            .await?
            .clone();
        Ok(FilterOptions {
            tags,
            states: vec![
                MangaState::Ongoing,
                MangaState::Finished,
                MangaState::Abandoned,
                MangaState::Paused,
                MangaState::Upcoming,
            ],
        })
    }
}

fn parse_genre_filter(html: &str, source: &'static str) -> Vec<MangaTag> {
    let document = Html::parse_document(html);
    let row = Selector::parse(".genres > li").unwrap();
    let label = Selector::parse("label").unwrap();
    let input = Selector::parse("input").unwrap();
    document
        .select(&row)
        .filter_map(|li| {
            let key = li.select(&input).next()?.value().attr("value")?.to_string();
            let title = li.select(&label).next().map(|l| own_text(&l))?;
            non_empty(&title).map(|t| MangaTag { key, title: to_title_case(&t), source })
        })
        .collect()
}

/// Direct text children only, excluding nested elements. The site nests
/// badges and counters inside the anchors we take titles from.
fn own_text(el: &ElementRef) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
        .trim()
        .to_string()
}

fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MangaFire {
        MangaFire::english(Arc::new(WebClient::new().unwrap()))
    }

    #[test]
    fn filter_url_encodes_states_and_tags() {
        let filter = ListFilter {
            tags: vec![MangaTag { key: "1".into(), title: "Action".into(), source: "mangafire-en" }],
            tags_exclude: vec![MangaTag { key: "7".into(), title: "Ecchi".into(), source: "mangafire-en" }],
            states: vec![MangaState::Ongoing],
            ..Default::default()
        };
        let url = source().filter_url(3, SortOrder::Rating, &filter);
        assert!(url.contains("page=3"));
        assert!(url.contains("language%5B%5D=en"));
        assert!(url.contains("genre%5B%5D=-7"));
        assert!(url.contains("genre%5B%5D=1"));
        assert!(url.contains("status%5B%5D=releasing"));
        assert!(url.ends_with("sort=mal_score"));
    }

    #[test]
    fn parses_listing_units() {
        let html = r#"<div class="original card-lg"><div class="unit"><div class="inner">
            <img src="/covers/x.jpg"/>
            <div class="info"><a href="/manga/grand-blue.kx102">Grand Blue <span>Dreaming</span></a></div>
        </div></div></div>"#;
        let list = source().parse_manga_list(html);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Grand Blue");
        assert_eq!(list[0].url, "/manga/grand-blue.kx102");
    }

    #[test]
    fn branches_filtered_by_language() {
        let html = r#"
        <div class="chapvol-tab"><a data-name="chapter">Chapters</a><a data-name="volume">Volumes</a></div>
        <div class="m-list">
            <div class="tab-content" data-name="chapter">
                <div class="list-menu">
                    <a class="dropdown-item" data-code="EN" data-title="English">English</a>
                    <a class="dropdown-item" data-code="JA" data-title="Japanese">Japanese</a>
                </div>
            </div>
            <div class="tab-content" data-name="volume">
                <div class="list-menu">
                    <a class="dropdown-item" data-code="EN" data-title="English">English</a>
                </div>
            </div>
        </div>"#;
        let branches = MangaFire::parse_branches(html, "en");
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].type_name, "chapter");
        assert_eq!(branches[1].type_name, "volume");
        assert!(MangaFire::parse_branches(html, "fr").is_empty());
    }

    #[test]
    fn chapter_items_from_fragment() {
        let fragment = r#"<ul>
            <li><a data-id="901" data-number="2" href="/read/x.kx1/en/chapter-2" title="Chapter 2: Deeper"></a></li>
            <li><a data-id="900" data-number="1" href="/read/x.kx1/en/chapter-1"></a></li>
        </ul>"#;
        let items = MangaFire::parse_chapter_items(fragment);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data_id, "901");
        assert_eq!(items[0].number, 2.0);
        assert_eq!(items[0].title.as_deref(), Some("Chapter 2: Deeper"));
        assert!(items[1].title.is_none());
    }

    #[test]
    fn date_items_take_second_span() {
        let fragment = r#"<ul>
            <li><a title="Vol 3"><span>Chapter 2</span><span>Jan 05, 2024</span></a></li>
        </ul>"#;
        let dates = MangaFire::parse_date_items(fragment);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].0.as_deref(), Some("Jan 05, 2024"));
        assert_eq!(dates[0].1.as_deref(), Some("Vol 3"));
    }

    #[test]
    fn genre_filter_rows() {
        let html = r#"<ul class="genres">
            <li><input type="checkbox" value="1"/><label>action <span>(1204)</span></label></li>
            <li><input type="checkbox" value="2"/><label>adventure</label></li>
        </ul>"#;
        let tags = parse_genre_filter(html, "mangafire-en");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "1");
        assert_eq!(tags[0].title, "Action");
    }
}
