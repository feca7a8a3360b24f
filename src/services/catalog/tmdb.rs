//! TMDB (The Movie Database) v3 REST client
//!
//! All requests authenticate with the `api_key` query parameter.
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogPage, Movie, Video},
    services::catalog::MovieCatalog,
};

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<Video>,
}

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbCatalog {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> AppResult<Response> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbCatalog {
    #[instrument(skip(self))]
    async fn popular(&self, page: u32) -> AppResult<CatalogPage> {
        let response = self
            .get("/movie/popular", &[("page", page.to_string())])
            .await?;
        let listing: CatalogPage = Self::read_json(response).await?;

        tracing::info!(
            page = listing.page,
            results = listing.results.len(),
            catalog = self.name(),
            "Popular movies fetched"
        );

        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, page: u32) -> AppResult<CatalogPage> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let response = self
            .get(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;
        let listing: CatalogPage = Self::read_json(response).await?;

        tracing::info!(
            query = %query,
            page = listing.page,
            results = listing.results.len(),
            catalog = self.name(),
            "Movie search completed"
        );

        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn details(&self, movie_id: u64) -> AppResult<Option<Movie>> {
        let response = self.get(&format!("/movie/{}", movie_id), &[]).await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(movie_id, "Movie not found in catalog");
            return Ok(None);
        }

        Ok(Some(Self::read_json(response).await?))
    }

    #[instrument(skip(self))]
    async fn videos(&self, movie_id: u64) -> AppResult<Vec<Video>> {
        let response = self
            .get(&format!("/movie/{}/videos", movie_id), &[])
            .await?;
        let videos: VideosResponse = Self::read_json(response).await?;
        Ok(videos.results)
    }

    #[instrument(skip(self))]
    async fn similar(&self, movie_id: u64) -> AppResult<Vec<Movie>> {
        let response = self
            .get(
                &format!("/movie/{}/similar", movie_id),
                &[("page", "1".to_string())],
            )
            .await?;
        let listing: CatalogPage = Self::read_json(response).await?;
        Ok(listing.results)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let catalog = TmdbCatalog::new("key".to_string(), "https://api.themoviedb.org/3/".to_string());
        assert_eq!(
            catalog.url("/movie/popular"),
            "https://api.themoviedb.org/3/movie/popular"
        );
    }

    #[test]
    fn test_videos_response_parsing() {
        let videos: VideosResponse = serde_json::from_str(
            r#"{"id": 550, "results": [{"id": "v1", "key": "abc", "name": "Trailer", "site": "YouTube", "type": "Trailer", "official": true}]}"#,
        )
        .unwrap();

        assert_eq!(videos.results.len(), 1);
        assert!(videos.results[0].is_trailer());
    }

    #[tokio::test]
    async fn test_blank_search_rejected_without_request() {
        let catalog = TmdbCatalog::new("key".to_string(), "http://test.local".to_string());
        let result = catalog.search("   ", 1).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
