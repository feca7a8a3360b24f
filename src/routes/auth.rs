use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::{MaybeSession, SignedIn},
    models::Identity,
    state::{AppState, ClientSession},
};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub label: String,
    pub initial: Option<char>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            label: identity.display_label(),
            initial: identity.avatar_initial(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub identity: IdentityResponse,
}

fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Registers the client once the provider has accepted it and its wishlist is
/// subscribed; on failure the half-built client is unmounted
async fn establish(
    state: &AppState,
    client: ClientSession,
    identity: AppResult<Identity>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let bound = match identity {
        Ok(identity) => client
            .wishlist
            .bind(Some(&identity))
            .await
            .map(|_| identity),
        Err(e) => Err(e),
    };
    let identity = match bound {
        Ok(identity) => identity,
        Err(e) => {
            client.wishlist.unmount().await;
            return Err(e);
        }
    };

    let response = SessionResponse {
        token: client.token,
        identity: IdentityResponse::from(&identity),
    };
    state.sessions.insert(client).await;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    validate_credentials(&request.email, &request.password)?;

    let client = state.open_client().await?;
    let identity = client
        .session
        .sign_in(request.email.trim(), &request.password)
        .await;

    establish(&state, client, identity).await
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    validate_credentials(&request.email, &request.password)?;

    let client = state.open_client().await?;
    let identity = client
        .session
        .sign_up(request.email.trim(), &request.password, request.display_name)
        .await;

    establish(&state, client, identity).await
}

pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    SignedIn(client): SignedIn,
) -> AppResult<StatusCode> {
    state.close_client(&client.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(MaybeSession(client): MaybeSession) -> AppResult<Json<IdentityResponse>> {
    let identity = client
        .and_then(|c| c.session.current())
        .ok_or_else(|| AppError::Unauthenticated("Not signed in".to_string()))?;

    Ok(Json(IdentityResponse::from(&identity)))
}
