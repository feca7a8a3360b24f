use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{self, Genre, ImageUrls, Movie, MovieCard, TrailerView},
    services::catalog::MovieCatalog,
};

/// Similar movies shown next to the player
pub const SIMILAR_LIMIT: usize = 10;

/// Everything the detail page renders for one movie
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetailView {
    pub movie: Movie,
    pub poster_url: String,
    pub backdrop_url: Option<String>,
    pub release_year: Option<i32>,
    pub rating: String,
    pub genres: Vec<Genre>,
    pub trailers: Vec<TrailerView>,
    /// Trailer in the player; the first one unless another was picked
    pub selected_trailer: Option<TrailerView>,
    pub similar: Vec<MovieCard>,
    pub in_wishlist: bool,
}

/// Loads the detail page for `movie_id`
///
/// A missing movie is `NotFound`. Trailers and similar movies are optional
/// extras: their failures are logged and render as empty lists.
pub async fn load<F>(
    catalog: &dyn MovieCatalog,
    images: &ImageUrls,
    movie_id: u64,
    selected_trailer: Option<&str>,
    in_wishlist: F,
) -> AppResult<MovieDetailView>
where
    F: Fn(u64) -> bool,
{
    let (details, videos, similar) = tokio::join!(
        catalog.details(movie_id),
        catalog.videos(movie_id),
        catalog.similar(movie_id),
    );

    let movie = details?.ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))?;

    let trailers: Vec<TrailerView> = match videos {
        Ok(videos) => models::trailers(videos).iter().map(TrailerView::from).collect(),
        Err(e) => {
            tracing::warn!(movie_id, error = %e, "Trailer lookup failed");
            Vec::new()
        }
    };

    let similar = match similar {
        Ok(movies) => movies
            .iter()
            .take(SIMILAR_LIMIT)
            .map(|m| MovieCard::new(m, images, in_wishlist(m.id)))
            .collect(),
        Err(e) => {
            tracing::warn!(movie_id, error = %e, "Similar movies lookup failed");
            Vec::new()
        }
    };

    let selected_trailer = selected_trailer
        .and_then(|id| trailers.iter().find(|t| t.id == id))
        .or_else(|| trailers.first())
        .cloned();

    Ok(MovieDetailView {
        poster_url: images.poster(&movie),
        backdrop_url: images.backdrop(&movie),
        release_year: movie.release_year(),
        rating: movie.rating_label(),
        genres: movie.genres.clone(),
        in_wishlist: in_wishlist(movie.id),
        trailers,
        selected_trailer,
        similar,
        movie,
    })
}
