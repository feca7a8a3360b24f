//! Identity Toolkit (Firebase Authentication) REST provider
//!
//! Flow:
//! 1. Sign in: `accounts:signInWithPassword` → uid, email, display name
//! 2. Sign up: `accounts:signUp`, then `accounts:update` when a display name is given
use reqwest::{Client as HttpClient, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::Identity,
    services::auth::AuthProvider,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl From<AccountResponse> for Identity {
    fn from(account: AccountResponse) -> Self {
        Identity {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|name| !name.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct FirebaseAuthProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl FirebaseAuthProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = format!("{}/accounts:{}", self.api_url, method);
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::classify_error(status.as_u16(), &body))
    }

    /// 400 responses carry a provider code (`EMAIL_NOT_FOUND`, `INVALID_PASSWORD`,
    /// `EMAIL_EXISTS`, ...) and mean the request was rejected, not that the
    /// provider failed
    fn classify_error(status: u16, body: &str) -> AppError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.to_string());

        if status == 400 {
            AppError::InvalidCredentials(message)
        } else {
            AppError::ExternalApi(format!(
                "Auth provider returned status {}: {}",
                status, message
            ))
        }
    }
}

#[async_trait::async_trait]
impl AuthProvider for FirebaseAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        Ok(account.into())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> AppResult<Identity> {
        let account: AccountResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        let display_name = display_name.filter(|name| !name.trim().is_empty());
        let (Some(name), Some(token)) = (display_name, account.id_token.clone()) else {
            return Ok(account.into());
        };

        let updated: AccountResponse = self
            .call(
                "update",
                &UpdateProfileRequest {
                    id_token: &token,
                    display_name: &name,
                    return_secure_token: false,
                },
            )
            .await?;

        tracing::debug!(uid = %updated.local_id, "Display name set");
        Ok(Identity {
            display_name: Some(name),
            ..Identity::from(updated)
        })
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}
