//! Site adapters. Template families (`madara`, `mangareader`, `mangabox`)
//! hold the shared scraping recipes; the per-site modules configure or
//! override them.

pub mod madara;
pub mod mangabox;
pub mod mangareader;

pub mod batcave;
pub mod madaradex;
pub mod mangabat;
pub mod mangafire;
pub mod manhuarm;
pub mod rizzcomic;
pub mod snowmtl;
