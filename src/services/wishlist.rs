//! Wishlist synchronization
//!
//! A [`Wishlist`] mirrors the signed-in identity's `users/{uid}/wishlist`
//! collection into a locally observable [`WishlistView`] and writes mutations
//! straight to the store.
//!
//! Lifecycle, per identity:
//! - no identity: empty view, not loading, no subscription
//! - identity present: subscribe, view loading until the first snapshot
//! - every snapshot: view replaced wholesale, not loading
//! - identity cleared or changed, or the wishlist dropped: subscription
//!   cancelled, view emptied
//!
//! Mutations never touch the view; it only changes when the subscription
//! delivers the resulting snapshot.
use std::sync::{Arc, Weak};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::{
    db::{CollectionPath, DocumentStore, Snapshot, Subscription},
    error::{AppError, AppResult},
    models::{Identity, Movie, MovieKey, WishlistDocument, WishlistEntry},
    services::auth::Session,
};

/// Locally observable state of the wishlist
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WishlistView {
    pub entries: Vec<WishlistEntry>,
    pub loading: bool,
    /// Identity whose collection the entries came from
    #[serde(skip)]
    owner: Option<String>,
}

impl WishlistView {
    /// Signed in as `uid`, first snapshot not yet applied
    fn loading(uid: &str) -> Self {
        Self {
            entries: Vec::new(),
            loading: true,
            owner: Some(uid.to_string()),
        }
    }

    fn from_snapshot(uid: &str, collection: &CollectionPath, snapshot: &Snapshot) -> Self {
        let entries = snapshot
            .documents
            .iter()
            .filter_map(|document| match WishlistEntry::from_document(document) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        key = %document.id,
                        error = %e,
                        "Skipping unreadable wishlist document"
                    );
                    None
                }
            })
            .collect();

        Self {
            entries,
            loading: false,
            owner: Some(uid.to_string()),
        }
    }

    /// View for `uid` when the published one belongs to someone else
    fn pending(uid: Option<&str>) -> Self {
        match uid {
            Some(uid) => Self::loading(uid),
            None => Self::default(),
        }
    }

    fn is_synced_for(&self, uid: &str) -> bool {
        !self.loading && self.owner.as_deref() == Some(uid)
    }

    pub fn contains(&self, key: &MovieKey) -> bool {
        self.entries.iter().any(|entry| entry.matches(key))
    }
}

/// Outcome of [`Wishlist::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistChange {
    Added,
    Removed,
}

/// Which subscription currently owns the view
#[derive(Default)]
struct Binding {
    /// Bumped on every identity change; a pump only applies snapshots while
    /// its generation is current
    generation: u64,
    uid: Option<String>,
    pump: Option<JoinHandle<()>>,
    follower: Option<JoinHandle<()>>,
}

impl Binding {
    fn stop_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

struct WishlistInner {
    store: Arc<dyn DocumentStore>,
    session: Session,
    view: watch::Sender<WishlistView>,
    binding: Mutex<Binding>,
}

impl Drop for WishlistInner {
    fn drop(&mut self) {
        let binding = self.binding.get_mut();
        binding.stop_pump();
        if let Some(follower) = binding.follower.take() {
            follower.abort();
        }
    }
}

/// Live wishlist of one session
///
/// Cloning shares the same subscription and view. Dropping the last clone
/// cancels the subscription.
#[derive(Clone)]
pub struct Wishlist {
    inner: Arc<WishlistInner>,
}

impl Wishlist {
    /// Detached wishlist: signed-out view until [`Wishlist::bind`] is called
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        let (view, _) = watch::channel(WishlistView::default());
        Self {
            inner: Arc::new(WishlistInner {
                store,
                session,
                view,
                binding: Mutex::new(Binding::default()),
            }),
        }
    }

    /// Wishlist that follows the session's identity for as long as it lives
    pub async fn mount(store: Arc<dyn DocumentStore>, session: Session) -> AppResult<Self> {
        let wishlist = Self::new(store, session);
        let mut identities = wishlist.inner.session.watch();

        let current = identities.borrow_and_update().clone();
        wishlist.bind(current.as_ref()).await?;

        let follower = tokio::spawn(Self::follow(Arc::downgrade(&wishlist.inner), identities));
        wishlist.inner.binding.lock().await.follower = Some(follower);

        Ok(wishlist)
    }

    async fn follow(inner: Weak<WishlistInner>, mut identities: watch::Receiver<Option<Identity>>) {
        while identities.changed().await.is_ok() {
            let identity = identities.borrow_and_update().clone();
            let Some(inner) = inner.upgrade() else {
                break;
            };

            let wishlist = Wishlist { inner };
            if let Err(e) = wishlist.bind(identity.as_ref()).await {
                tracing::error!(error = %e, "Wishlist subscription failed");
            }
        }
    }

    /// Points the wishlist at `identity`, tearing down any previous subscription first
    ///
    /// Binding the identity that is already bound keeps the live subscription.
    pub async fn bind(&self, identity: Option<&Identity>) -> AppResult<()> {
        let mut binding = self.inner.binding.lock().await;
        let uid = identity.map(|i| i.uid.clone());

        let pump_alive = binding.pump.as_ref().is_some_and(|pump| !pump.is_finished());
        if binding.uid == uid && (uid.is_none() || pump_alive) {
            return Ok(());
        }

        binding.stop_pump();
        binding.generation += 1;
        binding.uid = uid.clone();

        let Some(uid) = uid else {
            self.inner.view.send_replace(WishlistView::default());
            tracing::debug!("Wishlist unbound");
            return Ok(());
        };

        self.inner.view.send_replace(WishlistView::loading(&uid));

        let collection = CollectionPath::wishlist(&uid);
        let subscription = match self.inner.store.subscribe(&collection).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.inner.view.send_replace(WishlistView::default());
                return Err(e);
            }
        };

        binding.pump = Some(tokio::spawn(Self::pump(
            Arc::downgrade(&self.inner),
            binding.generation,
            uid,
            collection.clone(),
            subscription,
        )));

        tracing::info!(
            collection = %collection,
            store = self.inner.store.name(),
            "Wishlist subscribed"
        );
        Ok(())
    }

    async fn pump(
        inner: Weak<WishlistInner>,
        generation: u64,
        uid: String,
        collection: CollectionPath,
        mut subscription: Subscription,
    ) {
        while let Some(snapshot) = subscription.next().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };

            let binding = inner.binding.lock().await;
            if binding.generation != generation {
                break;
            }

            let view = WishlistView::from_snapshot(&uid, &collection, &snapshot);
            tracing::debug!(collection = %collection, entries = view.entries.len(), "Wishlist synced");
            inner.view.send_replace(view);
        }
    }

    /// Cancels the subscription and empties the view; the session is no longer followed
    pub async fn unmount(&self) {
        let mut binding = self.inner.binding.lock().await;
        binding.stop_pump();
        if let Some(follower) = binding.follower.take() {
            follower.abort();
        }
        binding.generation += 1;
        binding.uid = None;
        self.inner.view.send_replace(WishlistView::default());
    }

    /// Current view for the session's identity
    ///
    /// Until the identity's first snapshot is applied this reports loading
    /// with no entries, even if the follower has not rebound yet.
    pub fn view(&self) -> WishlistView {
        let current = self.inner.session.current();
        let uid = current.as_ref().map(|identity| identity.uid.as_str());

        let published = self.inner.view.borrow();
        if published.owner.as_deref() == uid {
            published.clone()
        } else {
            WishlistView::pending(uid)
        }
    }

    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.view().entries
    }

    pub fn is_loading(&self) -> bool {
        self.view().loading
    }

    /// Change notification for the published view; read it through [`Wishlist::view`]
    pub fn subscribe_view(&self) -> watch::Receiver<WishlistView> {
        self.inner.view.subscribe()
    }

    /// Membership against the last synced snapshot; never touches the store
    pub fn is_in_wishlist(&self, movie_id: impl Into<MovieKey>) -> bool {
        self.view().contains(&movie_id.into())
    }

    /// Binds `identity` if needed and waits for its first snapshot
    async fn synced_view(&self, identity: &Identity) -> AppResult<WishlistView> {
        self.bind(Some(identity)).await?;

        let uid = identity.uid.as_str();
        let mut views = self.inner.view.subscribe();
        let view = views
            .wait_for(|v| v.is_synced_for(uid) || v.owner.as_deref() != Some(uid))
            .await
            .map_err(|_| AppError::Internal("Wishlist view closed".to_string()))?
            .clone();

        if view.is_synced_for(uid) {
            Ok(view)
        } else {
            Err(AppError::Unauthenticated(
                "Signed-in identity changed during the request".to_string(),
            ))
        }
    }

    fn require_identity(&self, action: &str) -> AppResult<Identity> {
        self.inner.session.current().ok_or_else(|| {
            AppError::Unauthenticated(format!("You must be logged in to {}", action))
        })
    }

    /// Writes the movie under its id, replacing any existing entry
    pub async fn add(&self, movie: &Movie) -> AppResult<()> {
        let identity = self.require_identity("add to wishlist")?;
        let collection = CollectionPath::wishlist(&identity.uid);
        let key = MovieKey::from(movie.id).document_key();

        let data = WishlistDocument::new(movie.clone(), Utc::now()).into_data()?;
        self.inner.store.set(&collection, &key, data).await?;

        tracing::info!(collection = %collection, movie_id = movie.id, "Added to wishlist");
        Ok(())
    }

    /// Deletes the entry; succeeds when the movie is not in the wishlist
    pub async fn remove(&self, movie_id: impl Into<MovieKey>) -> AppResult<()> {
        let identity = self.require_identity("remove from wishlist")?;
        let collection = CollectionPath::wishlist(&identity.uid);
        let key = movie_id.into().document_key();

        self.inner.store.delete(&collection, &key).await?;

        tracing::info!(collection = %collection, key = %key, "Removed from wishlist");
        Ok(())
    }

    /// Removes the movie when the last synced snapshot contains it, adds it otherwise
    ///
    /// Right after sign-in this waits for the identity's first snapshot. Two
    /// toggles issued before a later refresh both see the same membership;
    /// this is not guarded against.
    pub async fn toggle(&self, movie: &Movie) -> AppResult<WishlistChange> {
        let identity = self.require_identity("manage wishlist")?;
        let view = self.synced_view(&identity).await?;

        if view.contains(&MovieKey::from(movie.id)) {
            self.remove(movie.id).await?;
            Ok(WishlistChange::Removed)
        } else {
            self.add(movie).await?;
            Ok(WishlistChange::Added)
        }
    }
}
