//! Authentication session
//!
//! The identity itself is issued by an external provider. A [`Session`] holds
//! the identity of one client for the lifetime of that client and notifies
//! dependents (the wishlist) whenever it changes.
use std::sync::Arc;

use tokio::sync::watch;

use crate::{error::AppResult, models::Identity};

pub mod firebase;

pub use firebase::FirebaseAuthProvider;

/// Trait for external authentication providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> AppResult<Identity>;

    /// Provider-side sign-out; token-based providers have nothing to revoke
    async fn sign_out(&self, _identity: &Identity) -> AppResult<()> {
        Ok(())
    }

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Current identity of one client, or none when signed out
#[derive(Clone)]
pub struct Session {
    provider: Arc<dyn AuthProvider>,
    identity: Arc<watch::Sender<Option<Identity>>>,
}

impl Session {
    /// Signed-out session
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            provider,
            identity: Arc::new(identity),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.borrow().is_some()
    }

    /// Change notification for the identity; the current value is marked seen
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let identity = self.provider.sign_in(email, password).await?;
        tracing::info!(uid = %identity.uid, provider = self.provider.name(), "Signed in");
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> AppResult<Identity> {
        let identity = self.provider.sign_up(email, password, display_name).await?;
        tracing::info!(uid = %identity.uid, provider = self.provider.name(), "Signed up");
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Clears the identity; a no-op when already signed out
    pub async fn sign_out(&self) -> AppResult<()> {
        let Some(identity) = self.current() else {
            return Ok(());
        };

        self.provider.sign_out(&identity).await?;
        self.identity.send_replace(None);
        tracing::info!(uid = %identity.uid, "Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn provider_for(identity: Identity) -> Arc<dyn AuthProvider> {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in()
            .returning(move |_, _| Ok(identity.clone()));
        provider.expect_sign_out().returning(|_| Ok(()));
        provider.expect_name().return_const("mock");
        Arc::new(provider)
    }

    #[tokio::test]
    async fn test_new_session_is_signed_out() {
        let session = Session::new(provider_for(Identity::new("u1")));
        assert!(session.current().is_none());
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_in_and_out_notify_watchers() {
        let session = Session::new(provider_for(Identity::new("u1")));
        let mut watcher = session.watch();

        session.sign_in("a@b.c", "secret").await.unwrap();
        watcher.changed().await.unwrap();
        assert_eq!(
            watcher.borrow_and_update().as_ref().map(|i| i.uid.clone()),
            Some("u1".to_string())
        );

        session.sign_out().await.unwrap();
        watcher.changed().await.unwrap();
        assert!(watcher.borrow_and_update().is_none());
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_rejected_sign_in_keeps_session_signed_out() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in()
            .returning(|_, _| Err(AppError::InvalidCredentials("INVALID_PASSWORD".to_string())));
        provider.expect_name().return_const("mock");
        let session = Session::new(Arc::new(provider));

        let result = session.sign_in("a@b.c", "wrong").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials(_))));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_when_signed_out_is_noop() {
        let session = Session::new(provider_for(Identity::new("u1")));
        assert!(session.sign_out().await.is_ok());
    }
}
