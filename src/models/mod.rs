use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub mod identity;
pub mod view;
pub mod wishlist;

pub use identity::Identity;
pub use view::{ImageUrls, MovieCard, TrailerView};
pub use wishlist::{MovieKey, WishlistDocument, WishlistEntry};

pub const YOUTUBE_SITE: &str = "YouTube";
pub const TRAILER_TYPE: &str = "Trailer";

/// Genre tag attached to a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// A movie as returned by the catalog API
///
/// List endpoints return the summary subset; the detail endpoint also fills
/// `vote_count`, `runtime` and `genres`. Field names follow the API so that a
/// wishlist copy stores the same shape the catalog returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Genre>,
}

impl Movie {
    /// Minimal movie with only an id and title
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            vote_average: None,
            vote_count: None,
            release_date: None,
            runtime: None,
            genres: Vec::new(),
        }
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|date| date.year())
    }

    /// One-decimal rating, or "N/A" when the rating is missing or zero
    pub fn rating_label(&self) -> String {
        match self.vote_average {
            Some(rating) if rating > 0.0 => format!("{:.1}", rating),
            _ => "N/A".to_string(),
        }
    }

    pub fn overview_or_default(&self) -> &str {
        if self.overview.trim().is_empty() {
            "No description available."
        } else {
            &self.overview
        }
    }
}

/// TMDB sends `""` for unknown release dates
fn deserialize_release_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Video attached to a movie (trailers, teasers, featurettes...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.video_type == TRAILER_TYPE && self.site == YOUTUBE_SITE
    }

    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?autoplay=1&rel=0&modestbranding=1",
            self.key
        )
    }
}

/// Keep only YouTube trailers, preserving API order
pub fn trailers(videos: Vec<Video>) -> Vec<Video> {
    videos.into_iter().filter(Video::is_trailer).collect()
}

/// One page of a paginated catalog listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogPage {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

impl CatalogPage {
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}
