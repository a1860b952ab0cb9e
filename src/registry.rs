//! Source registry: the static table of every adapter this crate ships
//! and the factory that instantiates one by id.

use crate::http_client::WebClient;
use crate::source::{MangaSource, SourceInfo};
use crate::sources::{
    batcave::BatCave, madaradex::MadaraDex, mangabat::Mangabat, mangafire, mangafire::MangaFire,
    manhuarm::Manhuarm, rizzcomic::RizzComic, snowmtl::SnowMtl,
};
use crate::sources::{batcave, madaradex, mangabat, manhuarm, rizzcomic, snowmtl};
use std::sync::Arc;

/// Every source this crate can instantiate.
pub fn all_sources() -> Vec<SourceInfo> {
    vec![
        batcave::INFO,
        madaradex::INFO,
        mangabat::INFO,
        mangafire::INFO_EN,
        mangafire::INFO_FR,
        mangafire::INFO_JA,
        manhuarm::INFO,
        rizzcomic::INFO,
        snowmtl::INFO,
    ]
}

/// Look a source up by id, or by display name (case-insensitive) as a
/// convenience for CLI-style callers.
pub fn find(id_or_name: &str) -> Option<SourceInfo> {
    all_sources()
        .into_iter()
        .find(|s| s.id == id_or_name || s.name.eq_ignore_ascii_case(id_or_name))
}

/// Instantiate the adapter for `id`, sharing `client` across sources.
/// Returns `None` for unknown ids.
pub fn create(id: &str, client: Arc<WebClient>) -> Option<Box<dyn MangaSource>> {
    Some(match id {
        "batcave" => Box::new(BatCave::new(client)),
        "madaradex" => Box::new(MadaraDex::new(client)),
        "mangabat" => Box::new(Mangabat::new(client)),
        "mangafire-en" => Box::new(MangaFire::english(client)),
        "mangafire-fr" => Box::new(MangaFire::french(client)),
        "mangafire-ja" => Box::new(MangaFire::japanese(client)),
        "manhuarm" => Box::new(Manhuarm::new(client)),
        "rizzcomic" => Box::new(RizzComic::new(client)),
        "snowmtl" => Box::new(SnowMtl::new(client)),
        _ => return None,
    })
}
