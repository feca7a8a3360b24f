//! Movie catalog abstraction
//!
//! The catalog is an external read-only data source. The application only
//! consumes listing, detail and video endpoints; nothing is cached locally.
use crate::{
    error::AppResult,
    models::{CatalogPage, Movie, Video},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Trait for movie metadata sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Popular movies, one page at a time (pages start at 1)
    async fn popular(&self, page: u32) -> AppResult<CatalogPage>;

    /// Free-text title search
    async fn search(&self, query: &str, page: u32) -> AppResult<CatalogPage>;

    /// Full details for one movie, `None` when the id is unknown
    async fn details(&self, movie_id: u64) -> AppResult<Option<Movie>>;

    /// All videos attached to a movie
    async fn videos(&self, movie_id: u64) -> AppResult<Vec<Video>>;

    /// First page of movies similar to the given one
    async fn similar(&self, movie_id: u64) -> AppResult<Vec<Movie>>;

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
