//! Paginated TMDB movie catalogs.
//!
//! Three feeds (Popular, Top Rated, Revenue) are loaded page by page from a
//! [`feed::MovieSource`], merged without duplicates and published through a
//! `tokio::sync::watch` value that UIs observe:
//!
//! - [`catalog`] - `Movie` and `Category`
//! - [`feed`] - per-category state and the `PaginationController`
//! - [`tmdb`] - the `discover/movie` client used in production
//! - [`config`] - `config.toml` loading
//! - [`playback`] - stream and license endpoints for the player

pub mod catalog;
pub mod config;
pub mod feed;
pub mod playback;
pub mod tmdb;
