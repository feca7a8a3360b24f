use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    state::{AppState, ClientSession},
};

fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

/// Client session named by the bearer token, if any
pub struct MaybeSession(pub Option<ClientSession>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let client = match bearer_token(parts) {
            Some(token) => state.sessions.get(&token).await,
            None => None,
        };
        Ok(MaybeSession(client))
    }
}

/// Client session that must be present; rejects with 401 otherwise
pub struct SignedIn(pub ClientSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SignedIn {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let MaybeSession(client) = MaybeSession::from_request_parts(parts, state).await?;
        client
            .map(SignedIn)
            .ok_or_else(|| AppError::Unauthenticated("You must be logged in".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsed() {
        let token = Uuid::new_v4();
        let parts = parts_with(Some(&format!("Bearer {}", token)));
        assert_eq!(bearer_token(&parts), Some(token));
    }

    #[test]
    fn test_missing_or_malformed_token() {
        assert_eq!(bearer_token(&parts_with(None)), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer not-a-uuid"))), None);
    }
}
