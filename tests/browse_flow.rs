use std::collections::BTreeSet;
use std::sync::Arc;

use estate_scout::backend::{ListingQuery, MemoryBackend};
use estate_scout::models::PropertyType;
use estate_scout::session::MemoryStorage;
use estate_scout::{
    Backend, FavoritesStore, FilterConfig, IdentityKind, ListingFeed, ListingId, SessionStore,
};

struct App {
    memory: Arc<MemoryBackend>,
    session: Arc<SessionStore>,
    favorites: Arc<FavoritesStore>,
    feed: ListingFeed,
}

fn app() -> App {
    let memory = Arc::new(MemoryBackend::new());
    let backend = Backend::from_shared(memory.clone());
    let session = Arc::new(SessionStore::new(
        backend.identity.clone(),
        Arc::new(MemoryStorage::new()),
        chrono::Duration::hours(24),
    ));
    let favorites = Arc::new(FavoritesStore::new(
        backend.favorites.clone(),
        backend.listings.clone(),
        session.subscribe(),
    ));
    App {
        memory,
        session,
        favorites,
        feed: ListingFeed::new(backend.listings),
    }
}

fn ids(set: BTreeSet<ListingId>) -> Vec<ListingId> {
    set.into_iter().collect()
}

#[tokio::test]
async fn favorites_never_leak_between_accounts() {
    let app = app();
    app.memory.insert_account("alice@test.com", "secret1", "Alice", IdentityKind::User);
    app.memory.insert_account("bob@test.com", "secret1", "Bob", IdentityKind::User);

    app.session.sign_in("alice@test.com", "secret1").await.unwrap();
    app.favorites.reload().await.unwrap();
    app.favorites.add(1).await.unwrap();
    app.favorites.add(3).await.unwrap();

    app.session.sign_in("bob@test.com", "secret1").await.unwrap();
    assert!(app.favorites.is_empty());
    app.favorites.reload().await.unwrap();
    assert!(app.favorites.is_empty());
    app.favorites.add(5).await.unwrap();

    app.session.sign_in("alice@test.com", "secret1").await.unwrap();
    app.favorites.reload().await.unwrap();
    assert_eq!(ids(app.favorites.ids()), vec![1, 3]);

    app.session.sign_out().await;
    assert!(app.favorites.is_empty());
}

#[tokio::test]
async fn guest_browses_filters_but_cannot_save() {
    let app = app();
    let guest = app.session.guest_sign_in().await.unwrap();
    assert_eq!(guest.kind, IdentityKind::Guest);

    app.feed.refresh(&ListingQuery::default()).await.unwrap();
    let filter = FilterConfig {
        property_types: [PropertyType::SingleFamily].into_iter().collect(),
        features: ["Fireplace".to_string(), "Ocean Views".to_string()].into_iter().collect(),
        ..FilterConfig::default()
    };
    let visible: Vec<ListingId> = app.feed.visible(&filter).iter().map(|l| l.id).collect();
    assert_eq!(visible, vec![4, 1]);

    let err = app.favorites.toggle(4).await.unwrap_err();
    assert!(err.requires_sign_up());
    assert!(app.favorites.is_empty());
}

#[tokio::test]
async fn watcher_reloads_after_sign_in() {
    let app = app();
    let user = app.memory.insert_account("carol@test.com", "secret1", "Carol", IdentityKind::User);
    {
        use estate_scout::backend::FavoriteStore;
        app.memory.add_favorite(&user, 2).await.unwrap();
    }

    let mut identity = app.session.subscribe();
    let sync = app.favorites.watch();
    app.session.sign_in("carol@test.com", "secret1").await.unwrap();
    identity.changed().await.unwrap();

    for _ in 0..100 {
        if app.favorites.is_favorite(2) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(ids(app.favorites.ids()), vec![2]);
    sync.abort();
}
