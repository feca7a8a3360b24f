use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    middleware::SignedIn,
    models::{Movie, MovieCard, MovieKey},
    services::WishlistChange,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct WishlistItemResponse {
    pub key: String,
    pub added_at: Option<DateTime<Utc>>,
    pub card: MovieCard,
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub loading: bool,
    pub count: usize,
    pub items: Vec<WishlistItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub movie_id: u64,
    pub change: WishlistChange,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub movie_id: String,
    pub in_wishlist: bool,
}

/// Last synced state of the caller's wishlist
pub async fn list(
    State(state): State<Arc<AppState>>,
    SignedIn(client): SignedIn,
) -> Json<WishlistResponse> {
    let view = client.wishlist.view();
    let items: Vec<WishlistItemResponse> = view
        .entries
        .iter()
        .map(|entry| WishlistItemResponse {
            key: entry.id.clone(),
            added_at: entry.added_at,
            card: MovieCard::new(&entry.movie, &state.images, true),
        })
        .collect();

    Json(WishlistResponse {
        loading: view.loading,
        count: items.len(),
        items,
    })
}

pub async fn toggle(
    SignedIn(client): SignedIn,
    Json(movie): Json<Movie>,
) -> AppResult<Json<ToggleResponse>> {
    let change = client.wishlist.toggle(&movie).await?;
    Ok(Json(ToggleResponse {
        movie_id: movie.id,
        change,
    }))
}

pub async fn add(
    SignedIn(client): SignedIn,
    Path(movie_id): Path<u64>,
    Json(movie): Json<Movie>,
) -> AppResult<StatusCode> {
    if movie.id != movie_id {
        return Err(AppError::InvalidInput(format!(
            "Path id {} does not match movie id {}",
            movie_id, movie.id
        )));
    }

    client.wishlist.add(&movie).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    SignedIn(client): SignedIn,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    client.wishlist.remove(MovieKey::from(key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn contains(
    SignedIn(client): SignedIn,
    Path(key): Path<String>,
) -> Json<MembershipResponse> {
    let in_wishlist = client.wishlist.is_in_wishlist(MovieKey::from(key.as_str()));
    Json(MembershipResponse {
        movie_id: key,
        in_wishlist,
    })
}
