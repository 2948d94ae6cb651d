//! Domain types shared by the feed controller, the TMDB client and playback.

mod types;

pub use types::{Category, CategoryParseError, Movie};
