//! Wire shapes of the TMDB `discover/movie` response and their mapping to
//! [`Movie`].

use crate::catalog::Movie;
use serde::Deserialize;

/// One page of `GET /discover/movie`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieResult>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

/// A movie entry inside [`DiscoverResponse::results`].
#[derive(Debug, Clone, Deserialize)]
pub struct MovieResult {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f32>,
    pub release_date: Option<String>,
}

/// Image URL prefixes used when mapping results.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    pub base_url: String,
    pub poster_size: String,
    pub backdrop_size: String,
}

impl ImageUrls {
    fn build(&self, size: &str, path: Option<String>) -> Option<String> {
        let path = path.filter(|p| !p.trim().is_empty())?;
        Some(format!("{}{}{}", self.base_url, size, path))
    }
}

/// Drops blank strings so they render as "missing" rather than empty.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl MovieResult {
    pub fn into_movie(self, images: &ImageUrls) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            poster_url: images.build(&images.poster_size, self.poster_path),
            backdrop_url: images.build(&images.backdrop_size, self.backdrop_path),
            overview: non_empty(self.overview),
            vote_average: self
                .vote_average
                .filter(|v| v.is_finite() && (0.0..=10.0).contains(v)),
            release_date: non_empty(self.release_date),
        }
    }
}
