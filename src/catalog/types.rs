use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Returned when a string does not name one of the three catalogs.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown category '{0}' (expected popular, top-rated or revenue)")]
pub struct CategoryParseError(pub String);

// ============================================================================
// Category
// ============================================================================

/// One of the three independently paginated movie catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Popular,
    TopRated,
    Revenue,
}

impl Category {
    /// All categories in display and lookup order.
    pub const ALL: [Category; 3] = [Category::Popular, Category::TopRated, Category::Revenue];

    /// Position of this category inside [`Category::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Category::Popular => 0,
            Category::TopRated => 1,
            Category::Revenue => 2,
        }
    }

    /// TMDB `sort_by` value for the discover endpoint.
    pub const fn sort_by(self) -> &'static str {
        match self {
            Category::Popular => "popularity.desc",
            Category::TopRated => "vote_average.desc",
            Category::Revenue => "revenue.desc",
        }
    }

    /// Section heading shown to users.
    pub const fn label(self) -> &'static str {
        match self {
            Category::Popular => "Popular",
            Category::TopRated => "Top Rated",
            Category::Revenue => "Revenue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popular" => Ok(Category::Popular),
            "top-rated" | "top_rated" | "toprated" => Ok(Category::TopRated),
            "revenue" => Ok(Category::Revenue),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

// ============================================================================
// Movie
// ============================================================================

/// A catalog entry as shown in a feed and on the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub overview: Option<String>,
    /// Average rating in `0.0..=10.0`.
    pub vote_average: Option<f32>,
    /// Release date as sent by the API (`YYYY-MM-DD`).
    pub release_date: Option<String>,
}

impl Movie {
    /// Creates a movie carrying only an id and a title.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_url: None,
            backdrop_url: None,
            overview: None,
            vote_average: None,
            release_date: None,
        }
    }

    /// Year part of `release_date`, if it is a well formed date.
    pub fn release_year(&self) -> Option<i32> {
        let raw = self.release_date.as_deref()?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|date| date.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_matches_index() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_sort_by_values() {
        assert_eq!(Category::Popular.sort_by(), "popularity.desc");
        assert_eq!(Category::TopRated.sort_by(), "vote_average.desc");
        assert_eq!(Category::Revenue.sort_by(), "revenue.desc");
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("popular".parse(), Ok(Category::Popular));
        assert_eq!("Top-Rated".parse(), Ok(Category::TopRated));
        assert_eq!("top_rated".parse(), Ok(Category::TopRated));
        assert_eq!(" revenue ".parse(), Ok(Category::Revenue));

        let err = "upcoming".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("upcoming"));
    }

    #[test]
    fn test_release_year() {
        let mut movie = Movie::new(1, "Heat");
        assert_eq!(movie.release_year(), None);

        movie.release_date = Some("1995-12-15".to_string());
        assert_eq!(movie.release_year(), Some(1995));

        movie.release_date = Some("sometime".to_string());
        assert_eq!(movie.release_year(), None);
    }
}
