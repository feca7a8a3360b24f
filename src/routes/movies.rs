use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::{MaybeSession, RequestId},
    services::{
        browse::{self, BrowsePage},
        movie_detail::{self, MovieDetailView},
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    q: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    trailer: Option<String>,
}

/// Popular movies or search results, one page at a time
pub async fn browse(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    MaybeSession(client): MaybeSession,
    Query(params): Query<BrowseQuery>,
) -> AppResult<Json<BrowsePage>> {
    let page = params.page.unwrap_or(1);
    let wishlist = client.as_ref().map(|c| &c.wishlist);

    let result = browse::browse(
        state.catalog.as_ref(),
        &state.images,
        params.q.as_deref(),
        page,
        |id| wishlist.map_or(false, |w| w.is_in_wishlist(id)),
    )
    .await?;

    tracing::info!(
        request_id = %request_id,
        query = ?result.query,
        page = result.page,
        results = result.movies.len(),
        "Browse page served"
    );

    Ok(Json(result))
}

/// Detail page for one movie
pub async fn detail(
    State(state): State<Arc<AppState>>,
    MaybeSession(client): MaybeSession,
    Path(movie_id): Path<u64>,
    Query(params): Query<DetailQuery>,
) -> AppResult<Json<MovieDetailView>> {
    let wishlist = client.as_ref().map(|c| &c.wishlist);

    let view = movie_detail::load(
        state.catalog.as_ref(),
        &state.images,
        movie_id,
        params.trailer.as_deref(),
        |id| wishlist.map_or(false, |w| w.is_in_wishlist(id)),
    )
    .await?;

    Ok(Json(view))
}
