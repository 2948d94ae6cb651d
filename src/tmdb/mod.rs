//! TMDB discover client, the production [`MovieSource`](crate::feed::MovieSource).
//!
//! - [`dto`] - response shapes and the mapping to [`Movie`](crate::catalog::Movie)
//! - `client` - HTTP transport with timeout, retry and size limits

mod client;
pub mod dto;

pub use client::{TmdbClient, TmdbError};
