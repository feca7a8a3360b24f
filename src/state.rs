use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::DocumentStore,
    error::AppResult,
    models::ImageUrls,
    services::{AuthProvider, MovieCatalog, Session, Wishlist},
};

/// One signed-in client: its auth session and the wishlist following it
#[derive(Clone)]
pub struct ClientSession {
    pub token: Uuid,
    pub session: Session,
    pub wishlist: Wishlist,
}

/// Upper bound on how often idle clients are looked for
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Registered {
    client: ClientSession,
    last_seen: Instant,
}

/// Client sessions keyed by bearer token
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Registered>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, client: ClientSession) {
        let registered = Registered {
            client,
            last_seen: Instant::now(),
        };
        self.sessions
            .write()
            .await
            .insert(registered.client.token, registered);
    }

    /// Looks up a client and marks it as active
    pub async fn get(&self, token: &Uuid) -> Option<ClientSession> {
        let mut sessions = self.sessions.write().await;
        let registered = sessions.get_mut(token)?;
        registered.last_seen = Instant::now();
        Some(registered.client.clone())
    }

    pub async fn remove(&self, token: &Uuid) -> Option<ClientSession> {
        self.sessions
            .write()
            .await
            .remove(token)
            .map(|registered| registered.client)
    }

    /// Removes and returns clients not seen for at least `idle_for`
    pub async fn remove_idle(&self, idle_for: Duration) -> Vec<ClientSession> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, registered)| registered.last_seen.elapsed() >= idle_for)
            .map(|(token, _)| *token)
            .collect();

        idle.iter()
            .filter_map(|token| sessions.remove(token))
            .map(|registered| registered.client)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Shared application state
pub struct AppState {
    pub catalog: Arc<dyn MovieCatalog>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub images: ImageUrls,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        images: ImageUrls,
    ) -> Self {
        Self {
            catalog,
            auth,
            store,
            images,
            sessions: SessionRegistry::new(),
        }
    }

    /// Signed-out client with its wishlist mounted; not yet registered
    pub async fn open_client(&self) -> AppResult<ClientSession> {
        let session = Session::new(self.auth.clone());
        let wishlist = Wishlist::mount(self.store.clone(), session.clone()).await?;

        Ok(ClientSession {
            token: Uuid::new_v4(),
            session,
            wishlist,
        })
    }

    /// Signs the client out and forgets it
    pub async fn close_client(&self, token: &Uuid) -> AppResult<()> {
        if let Some(client) = self.sessions.remove(token).await {
            client.session.sign_out().await?;
            client.wishlist.unmount().await;
        }
        Ok(())
    }

    /// Drops clients idle for at least `idle_for`, tearing down their wishlists
    pub async fn expire_idle_clients(&self, idle_for: Duration) -> usize {
        let expired = self.sessions.remove_idle(idle_for).await;

        for client in &expired {
            if let Err(e) = client.session.sign_out().await {
                tracing::warn!(token = %client.token, error = %e, "Sign-out of idle client failed");
            }
            client.wishlist.unmount().await;
        }

        if !expired.is_empty() {
            tracing::info!(expired = expired.len(), "Expired idle client sessions");
        }
        expired.len()
    }

    /// Periodically expires idle clients until the state is dropped
    pub fn spawn_idle_sweeper(self: &Arc<Self>, idle_for: Duration) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let period = SWEEP_INTERVAL.min(idle_for).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                state.expire_idle_clients(idle_for).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Identity;
    use crate::services::{auth::MockAuthProvider, catalog::MockMovieCatalog};

    fn test_state() -> AppState {
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_in()
            .returning(|_, _| Ok(Identity::new("u1")));
        auth.expect_sign_out().returning(|_| Ok(()));
        auth.expect_name().return_const("mock");

        AppState::new(
            Arc::new(MockMovieCatalog::new()),
            Arc::new(auth),
            Arc::new(MemoryStore::new()),
            ImageUrls::new("https://image.tmdb.org/t/p"),
        )
    }

    #[tokio::test]
    async fn test_recently_seen_client_is_kept() {
        let state = test_state();
        let client = state.open_client().await.unwrap();
        let token = client.token;
        state.sessions.insert(client).await;

        assert_eq!(state.expire_idle_clients(Duration::from_secs(3600)).await, 0);
        assert!(state.sessions.get(&token).await.is_some());
    }

    #[tokio::test]
    async fn test_idle_client_is_signed_out_and_removed() {
        let state = test_state();
        let client = state.open_client().await.unwrap();
        client.session.sign_in("u1@example.com", "pw").await.unwrap();
        let token = client.token;
        state.sessions.insert(client.clone()).await;

        assert_eq!(state.expire_idle_clients(Duration::ZERO).await, 1);
        assert!(state.sessions.is_empty().await);
        assert!(state.sessions.get(&token).await.is_none());
        assert!(!client.session.is_signed_in());
        assert!(!client.wishlist.is_loading());
    }

    #[tokio::test]
    async fn test_close_client_unknown_token_is_ok() {
        let state = test_state();
        assert!(state.close_client(&Uuid::new_v4()).await.is_ok());
        assert_eq!(state.sessions.len().await, 0);
    }
}
