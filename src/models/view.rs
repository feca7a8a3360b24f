use serde::Serialize;

use super::{Movie, Video};

pub const POSTER_PLACEHOLDER: &str = "https://via.placeholder.com/500x750?text=No+Image";
const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "original";

/// Resolves catalog image paths against the image CDN
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base_url: String,
}

impl ImageUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Poster URL, or the placeholder image when the movie has no poster
    pub fn poster(&self, movie: &Movie) -> String {
        match movie.poster_path.as_deref() {
            Some(path) if !path.is_empty() => {
                format!("{}/{}{}", self.base_url, POSTER_SIZE, path)
            }
            _ => POSTER_PLACEHOLDER.to_string(),
        }
    }

    pub fn backdrop(&self, movie: &Movie) -> Option<String> {
        movie
            .backdrop_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(|path| format!("{}/{}{}", self.base_url, BACKDROP_SIZE, path))
    }
}

/// Grid tile for a movie in browse, search, similar and wishlist listings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieCard {
    pub id: u64,
    pub title: String,
    pub poster_url: String,
    pub rating: String,
    pub release_year: Option<i32>,
    pub in_wishlist: bool,
}

impl MovieCard {
    pub fn new(movie: &Movie, images: &ImageUrls, in_wishlist: bool) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_url: images.poster(movie),
            rating: movie.rating_label(),
            release_year: movie.release_year(),
            in_wishlist,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrailerView {
    pub id: String,
    pub name: String,
    pub embed_url: String,
}

impl From<&Video> for TrailerView {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            name: video.name.clone(),
            embed_url: video.embed_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poster_url_with_path() {
        let images = ImageUrls::new("https://image.tmdb.org/t/p/");
        let mut movie = Movie::new(1, "X");
        movie.poster_path = Some("/abc.jpg".to_string());

        assert_eq!(images.poster(&movie), "https://image.tmdb.org/t/p/w500/abc.jpg");
    }

    #[test]
    fn test_poster_placeholder() {
        let images = ImageUrls::new("https://image.tmdb.org/t/p");
        assert_eq!(images.poster(&Movie::new(1, "X")), POSTER_PLACEHOLDER);
    }

    #[test]
    fn test_backdrop_absent_without_path() {
        let images = ImageUrls::new("https://image.tmdb.org/t/p");
        let mut movie = Movie::new(1, "X");
        assert_eq!(images.backdrop(&movie), None);

        movie.backdrop_path = Some("/bd.jpg".to_string());
        assert_eq!(
            images.backdrop(&movie).as_deref(),
            Some("https://image.tmdb.org/t/p/original/bd.jpg")
        );
    }

    #[test]
    fn test_card_uses_fallbacks() {
        let images = ImageUrls::new("https://image.tmdb.org/t/p");
        let card = MovieCard::new(&Movie::new(7, "Untitled"), &images, true);

        assert_eq!(card.rating, "N/A");
        assert_eq!(card.release_year, None);
        assert_eq!(card.poster_url, POSTER_PLACEHOLDER);
        assert!(card.in_wishlist);
    }
}
