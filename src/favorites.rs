use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{FavoriteStore, ListingStore};
use crate::error::{AppError, Result};
use crate::loadable::Loadable;
use crate::models::{Identity, Listing, ListingId};

const ACTION: &str = "save favorites";

/// Non-guest identity id, the only kind that owns favorites.
fn owner_of(identity: &Option<Identity>) -> Option<String> {
    identity
        .as_ref()
        .filter(|identity| !identity.is_guest())
        .map(|identity| identity.id.clone())
}

#[derive(Debug)]
struct FavoritesState {
    /// Session transitions already applied to the mirror
    seen: watch::Receiver<Option<Identity>>,
    /// Identity the ids belong to
    owner: Option<String>,
    /// Bumped on every session transition; loads and rollbacks started
    /// under an older generation are discarded.
    generation: u64,
    ids: BTreeSet<ListingId>,
    /// Local add (`true`) and remove (`false`) calls since the last reload
    /// started, replayed over the set that reload brings back.
    edits: BTreeMap<ListingId, bool>,
    phase: Loadable<()>,
}

impl FavoritesState {
    /// Returns whether membership changed; only changes are journaled.
    fn set(&mut self, listing_id: ListingId, favorite: bool) -> bool {
        let changed = if favorite {
            self.ids.insert(listing_id)
        } else {
            self.ids.remove(&listing_id)
        };
        if changed {
            self.edits.insert(listing_id, favorite);
        }
        changed
    }
}

/// Local mirror of the signed-in identity's favorites.
///
/// Every access first applies any session transition published since the
/// last access: the mirror is emptied on each one, including a sign-out
/// followed by a sign-in as the same account. A previous identity's
/// favorites are therefore never visible after a switch, not even before
/// the new set has loaded.
pub struct FavoritesStore {
    remote: Arc<dyn FavoriteStore>,
    listings: Arc<dyn ListingStore>,
    identity: watch::Receiver<Option<Identity>>,
    state: Mutex<FavoritesState>,
}

impl FavoritesStore {
    pub fn new(
        remote: Arc<dyn FavoriteStore>,
        listings: Arc<dyn ListingStore>,
        identity: watch::Receiver<Option<Identity>>,
    ) -> Self {
        let mut seen = identity.clone();
        let owner = owner_of(&seen.borrow_and_update());
        Self {
            remote,
            listings,
            identity,
            state: Mutex::new(FavoritesState {
                seen,
                owner,
                generation: 0,
                ids: BTreeSet::new(),
                edits: BTreeMap::new(),
                phase: Loadable::Idle,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FavoritesState> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;
        let transitioned = state.seen.has_changed().unwrap_or(false);
        let owner = owner_of(&state.seen.borrow_and_update());
        if transitioned || state.owner != owner {
            debug!("Session changed, clearing {} favorites", state.ids.len());
            state.ids.clear();
            state.edits.clear();
            state.owner = owner;
            state.generation += 1;
            state.phase = Loadable::Idle;
        }
        guard
    }

    fn member(&self) -> Result<String> {
        match self.identity.borrow().as_ref() {
            None => Err(AppError::Unauthenticated),
            Some(identity) if identity.is_guest() => Err(AppError::GuestRestricted(ACTION)),
            Some(identity) => Ok(identity.id.clone()),
        }
    }

    pub fn ids(&self) -> BTreeSet<ListingId> {
        self.state().ids.clone()
    }

    pub fn is_favorite(&self, listing_id: ListingId) -> bool {
        self.state().ids.contains(&listing_id)
    }

    pub fn len(&self) -> usize {
        self.state().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn phase(&self) -> Loadable<()> {
        self.state().phase.clone()
    }

    /// Replaces the mirror with the remote set for the current identity.
    /// Adds and removes made while the load is in flight are kept.
    pub async fn reload(&self) -> Result<()> {
        let (owner, generation) = {
            let mut state = self.state();
            match state.owner.clone() {
                Some(owner) => {
                    state.phase = Loadable::Loading;
                    state.edits.clear();
                    (owner, state.generation)
                }
                None => return Ok(()),
            }
        };

        let result = self.remote.favorite_ids(&owner).await;

        let mut guard = self.state();
        let state = &mut *guard;
        if state.generation != generation {
            debug!("Discarding favorites loaded for {}", owner);
            return Ok(());
        }
        match result {
            Ok(ids) => {
                state.ids = ids.into_iter().collect();
                for (&listing_id, &favorite) in &state.edits {
                    if favorite {
                        state.ids.insert(listing_id);
                    } else {
                        state.ids.remove(&listing_id);
                    }
                }
                state.edits.clear();
                state.phase = Loadable::Ready(());
                info!("Loaded {} favorites", state.ids.len());
                Ok(())
            }
            Err(e) => {
                error!("Loading favorites failed: {}", e);
                state.phase = Loadable::Failed(e.user_message());
                Err(e)
            }
        }
    }

    /// No-op when already a favorite. On remote failure the local
    /// change is rolled back and the error returned.
    pub async fn add(&self, listing_id: ListingId) -> Result<()> {
        let owner = self.member()?;
        let generation = {
            let mut state = self.state();
            if !state.set(listing_id, true) {
                return Ok(());
            }
            state.generation
        };

        if let Err(e) = self.remote.add_favorite(&owner, listing_id).await {
            warn!("Saving favorite {} failed: {}", listing_id, e);
            let mut state = self.state();
            if state.generation == generation {
                state.set(listing_id, false);
            }
            return Err(e);
        }
        Ok(())
    }

    /// No-op when not a favorite. Rolled back like [`FavoritesStore::add`].
    pub async fn remove(&self, listing_id: ListingId) -> Result<()> {
        let owner = self.member()?;
        let generation = {
            let mut state = self.state();
            if !state.set(listing_id, false) {
                return Ok(());
            }
            state.generation
        };

        if let Err(e) = self.remote.remove_favorite(&owner, listing_id).await {
            warn!("Removing favorite {} failed: {}", listing_id, e);
            let mut state = self.state();
            if state.generation == generation {
                state.set(listing_id, true);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Returns whether the listing is a favorite afterwards.
    pub async fn toggle(&self, listing_id: ListingId) -> Result<bool> {
        if self.is_favorite(listing_id) {
            self.remove(listing_id).await?;
            Ok(false)
        } else {
            self.add(listing_id).await?;
            Ok(true)
        }
    }

    /// Favorite listings in id order; listings that no longer exist are skipped.
    pub async fn listings(&self) -> Result<Vec<Listing>> {
        let mut listings = Vec::new();
        for id in self.ids() {
            match self.listings.fetch_listing(id).await? {
                Some(listing) => listings.push(listing),
                None => debug!("Favorite {} no longer exists", id),
            }
        }
        Ok(listings)
    }

    /// Reloads on every identity change until the session goes away.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut identity = self.identity.clone();
        tokio::spawn(async move {
            loop {
                let _ = identity.borrow_and_update();
                if let Err(e) = store.reload().await {
                    warn!("Favorites unavailable: {}", e);
                }
                if identity.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::IdentityKind;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn identity(id: &str, kind: IdentityKind) -> Option<Identity> {
        Some(Identity {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@test.com"),
            kind,
        })
    }

    fn store(backend: &Arc<MemoryBackend>) -> (watch::Sender<Option<Identity>>, FavoritesStore) {
        let (tx, rx) = watch::channel(identity("alice", IdentityKind::User));
        let store = FavoritesStore::new(backend.clone(), backend.clone(), rx);
        (tx, store)
    }

    #[tokio::test]
    async fn toggle_twice_restores_membership() {
        let backend = Arc::new(MemoryBackend::new());
        let (_tx, favorites) = store(&backend);

        assert!(favorites.toggle(2).await.unwrap());
        assert!(favorites.is_favorite(2));
        assert!(!favorites.toggle(2).await.unwrap());
        assert!(!favorites.is_favorite(2));
        assert!(backend.stored_favorites("alice").is_empty());
    }

    #[tokio::test]
    async fn add_and_remove_are_idempotent() {
        let backend = Arc::new(MemoryBackend::new());
        let (_tx, favorites) = store(&backend);

        favorites.add(1).await.unwrap();
        favorites.add(1).await.unwrap();
        assert_eq!(favorites.len(), 1);

        favorites.remove(4).await.unwrap();
        favorites.remove(1).await.unwrap();
        favorites.remove(1).await.unwrap();
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let backend = Arc::new(MemoryBackend::new());
        let (_tx, favorites) = store(&backend);
        favorites.add(3).await.unwrap();

        backend.set_fail_writes(true);
        assert!(favorites.add(5).await.is_err());
        assert!(!favorites.is_favorite(5));
        assert!(favorites.remove(3).await.is_err());
        assert!(favorites.is_favorite(3));
    }

    #[tokio::test]
    async fn guests_are_sent_to_sign_up() {
        let backend = Arc::new(MemoryBackend::new());
        let (tx, favorites) = store(&backend);
        tx.send_replace(identity("guest-1", IdentityKind::Guest));

        let err = favorites.add(1).await.unwrap_err();
        assert!(err.requires_sign_up());
        favorites.reload().await.unwrap();
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn switching_identity_clears_before_reload() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_favorite("bob", 4).await.unwrap();
        let (tx, favorites) = store(&backend);
        favorites.add(1).await.unwrap();
        favorites.add(2).await.unwrap();

        tx.send_replace(identity("bob", IdentityKind::User));
        assert!(favorites.is_empty());

        favorites.reload().await.unwrap();
        assert_eq!(favorites.ids(), [4].into_iter().collect());

        tx.send_replace(None);
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn resolves_favorite_listings() {
        let backend = Arc::new(MemoryBackend::new());
        let (_tx, favorites) = store(&backend);
        favorites.add(3).await.unwrap();
        favorites.add(1).await.unwrap();

        let ids: Vec<i64> = favorites.listings().await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn sign_out_then_same_account_starts_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let (tx, favorites) = store(&backend);
        favorites.add(1).await.unwrap();

        tx.send_replace(None);
        backend.remove_favorite("alice", 1).await.unwrap();
        tx.send_replace(identity("alice", IdentityKind::User));
        assert!(favorites.is_empty());

        favorites.reload().await.unwrap();
        assert!(favorites.is_empty());
    }

    /// Reads the remote set right away but holds the answer until released.
    struct HeldFavorites {
        inner: Arc<MemoryBackend>,
        release: Notify,
    }

    #[async_trait]
    impl FavoriteStore for HeldFavorites {
        async fn favorite_ids(&self, user_id: &str) -> Result<Vec<ListingId>> {
            let ids = self.inner.favorite_ids(user_id).await;
            self.release.notified().await;
            ids
        }
        async fn add_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
            self.inner.add_favorite(user_id, listing_id).await
        }
        async fn remove_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
            self.inner.remove_favorite(user_id, listing_id).await
        }
    }

    fn held_store(
        backend: &Arc<MemoryBackend>,
    ) -> (watch::Sender<Option<Identity>>, Arc<HeldFavorites>, Arc<FavoritesStore>) {
        let (tx, rx) = watch::channel(identity("alice", IdentityKind::User));
        let remote = Arc::new(HeldFavorites {
            inner: backend.clone(),
            release: Notify::new(),
        });
        let favorites = Arc::new(FavoritesStore::new(remote.clone(), backend.clone(), rx));
        (tx, remote, favorites)
    }

    fn spawn_reload(favorites: &Arc<FavoritesStore>) -> JoinHandle<Result<()>> {
        let favorites = favorites.clone();
        tokio::spawn(async move { favorites.reload().await })
    }

    #[tokio::test]
    async fn changes_made_during_a_load_survive_it() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_favorite("alice", 2).await.unwrap();
        let (_tx, remote, favorites) = held_store(&backend);

        let pending = spawn_reload(&favorites);
        tokio::task::yield_now().await;
        assert!(favorites.phase().is_loading());

        favorites.add(5).await.unwrap();
        remote.release.notify_one();
        pending.await.unwrap().unwrap();

        assert!(favorites.is_favorite(5));
        assert_eq!(favorites.ids(), [2, 5].into_iter().collect());
        assert_eq!(backend.stored_favorites("alice"), vec![2, 5]);
    }

    #[tokio::test]
    async fn load_for_previous_identity_is_discarded() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_favorite("alice", 1).await.unwrap();
        let (tx, remote, favorites) = held_store(&backend);

        let pending = spawn_reload(&favorites);
        tokio::task::yield_now().await;

        tx.send_replace(identity("bob", IdentityKind::User));
        remote.release.notify_one();
        pending.await.unwrap().unwrap();

        assert!(favorites.is_empty());
        assert_eq!(favorites.phase(), Loadable::Idle);
    }
}
