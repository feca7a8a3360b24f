use serde::Serialize;

use crate::{
    error::AppResult,
    models::{self, CatalogPage, ImageUrls, Movie, MovieCard, TrailerView},
    services::catalog::MovieCatalog,
};

/// Hero banner shown above the first page of popular movies
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Featured {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub backdrop_url: Option<String>,
    pub trailer: Option<TrailerView>,
    /// Where "Play" leads: the trailer embed, or the detail route when there is none
    pub play_target: PlayTarget,
    pub in_wishlist: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum PlayTarget {
    Trailer(String),
    Detail(String),
}

/// One page of the browse grid
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrowsePage {
    pub query: Option<String>,
    pub heading: String,
    pub page: u32,
    pub has_more: bool,
    pub featured: Option<Featured>,
    pub movies: Vec<MovieCard>,
    /// Shown instead of the grid when a search has no results
    pub notice: Option<String>,
}

/// Trimmed query, `None` when blank
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

pub fn detail_route(movie_id: u64) -> String {
    format!("/movie/{}", movie_id)
}

/// Loads one page of popular movies, or of search results when `query` is set
///
/// Only the first page of the popular listing carries a featured movie. A
/// failed trailer lookup for it leaves the featured movie without a trailer.
pub async fn browse<F>(
    catalog: &dyn MovieCatalog,
    images: &ImageUrls,
    query: Option<&str>,
    page: u32,
    in_wishlist: F,
) -> AppResult<BrowsePage>
where
    F: Fn(u64) -> bool,
{
    let page = page.max(1);
    let query = normalize_query(query);

    let listing = match query.as_deref() {
        Some(q) => catalog.search(q, page).await?,
        None => catalog.popular(page).await?,
    };

    let featured = match (&query, listing.results.first()) {
        (None, Some(first)) if page == 1 => {
            Some(featured(catalog, images, first, in_wishlist(first.id)).await)
        }
        _ => None,
    };

    let notice = match &query {
        Some(q) if page == 1 && listing.results.is_empty() => {
            Some(format!("No movies found for \"{}\"", q))
        }
        _ => None,
    };

    let heading = match &query {
        Some(q) => format!("Search Results for \"{}\"", q),
        None => "Popular Movies".to_string(),
    };

    Ok(BrowsePage {
        heading,
        page,
        has_more: listing.has_more(),
        featured,
        movies: cards(&listing, images, &in_wishlist),
        notice,
        query,
    })
}

fn cards<F>(listing: &CatalogPage, images: &ImageUrls, in_wishlist: &F) -> Vec<MovieCard>
where
    F: Fn(u64) -> bool,
{
    listing
        .results
        .iter()
        .map(|movie| MovieCard::new(movie, images, in_wishlist(movie.id)))
        .collect()
}

async fn featured(
    catalog: &dyn MovieCatalog,
    images: &ImageUrls,
    movie: &Movie,
    in_wishlist: bool,
) -> Featured {
    let trailer = match catalog.videos(movie.id).await {
        Ok(videos) => models::trailers(videos).first().map(TrailerView::from),
        Err(e) => {
            tracing::warn!(movie_id = movie.id, error = %e, "Featured trailer lookup failed");
            None
        }
    };

    let play_target = match &trailer {
        Some(t) => PlayTarget::Trailer(t.embed_url.clone()),
        None => PlayTarget::Detail(detail_route(movie.id)),
    };

    Featured {
        id: movie.id,
        title: movie.title.clone(),
        overview: movie.overview_or_default().to_string(),
        backdrop_url: images.backdrop(movie),
        trailer,
        play_target,
        in_wishlist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Video;
    use crate::services::catalog::MockMovieCatalog;
    use mockall::predicate::eq;

    fn images() -> ImageUrls {
        ImageUrls::new("https://image.tmdb.org/t/p")
    }

    fn listing(page: u32, total_pages: u32, movies: Vec<Movie>) -> CatalogPage {
        CatalogPage {
            page,
            total_results: movies.len() as u64,
            results: movies,
            total_pages,
        }
    }

    fn trailer(key: &str) -> Video {
        Video {
            id: format!("v-{}", key),
            key: key.to_string(),
            name: "Official Trailer".to_string(),
            site: "YouTube".to_string(),
            video_type: "Trailer".to_string(),
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(Some("  dune ")), Some("dune".to_string()));
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(normalize_query(None), None);
    }

    #[tokio::test]
    async fn test_first_popular_page_features_first_movie() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_popular()
            .with(eq(1))
            .returning(|_| Ok(listing(1, 5, vec![Movie::new(1, "A"), Movie::new(2, "B")])));
        catalog
            .expect_videos()
            .with(eq(1))
            .returning(|_| Ok(vec![trailer("abc")]));

        let page = browse(&catalog, &images(), None, 1, |id| id == 2).await.unwrap();

        let featured = page.featured.unwrap();
        assert_eq!(featured.id, 1);
        assert_eq!(
            featured.play_target,
            PlayTarget::Trailer(
                "https://www.youtube.com/embed/abc?autoplay=1&rel=0&modestbranding=1".to_string()
            )
        );
        assert_eq!(featured.overview, "No description available.");
        assert_eq!(page.heading, "Popular Movies");
        assert!(page.has_more);
        assert!(!page.movies[0].in_wishlist);
        assert!(page.movies[1].in_wishlist);
    }

    #[tokio::test]
    async fn test_trailer_failure_falls_back_to_detail() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_popular()
            .returning(|_| Ok(listing(1, 1, vec![Movie::new(7, "A")])));
        catalog
            .expect_videos()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));

        let page = browse(&catalog, &images(), None, 1, |_| false).await.unwrap();

        let featured = page.featured.unwrap();
        assert_eq!(featured.trailer, None);
        assert_eq!(featured.play_target, PlayTarget::Detail("/movie/7".to_string()));
    }

    #[tokio::test]
    async fn test_later_pages_have_no_featured_movie() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_popular()
            .with(eq(2))
            .returning(|_| Ok(listing(2, 2, vec![Movie::new(3, "C")])));
        catalog.expect_videos().never();

        let page = browse(&catalog, &images(), None, 2, |_| false).await.unwrap();
        assert!(page.featured.is_none());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_search_has_no_featured_movie() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search()
            .withf(|query, page| query == "dune" && *page == 1)
            .returning(|_, _| Ok(listing(1, 1, vec![Movie::new(438631, "Dune")])));
        catalog.expect_videos().never();

        let page = browse(&catalog, &images(), Some(" dune "), 1, |_| false)
            .await
            .unwrap();
        assert!(page.featured.is_none());
        assert_eq!(page.heading, "Search Results for \"dune\"");
        assert_eq!(page.movies.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_search_sets_notice() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_search()
            .returning(|_, _| Ok(CatalogPage::empty(1)));

        let page = browse(&catalog, &images(), Some("zzzz"), 1, |_| false)
            .await
            .unwrap();
        assert_eq!(page.notice.as_deref(), Some("No movies found for \"zzzz\""));
        assert!(page.movies.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_popular()
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));

        let result = browse(&catalog, &images(), None, 1, |_| false).await;
        assert!(result.is_err());
    }
}
