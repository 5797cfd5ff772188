use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::backend::{ListingQuery, ListingStore};
use crate::error::Result;
use crate::filter::FilterConfig;
use crate::loadable::Loadable;
use crate::models::Listing;

#[derive(Debug, Default)]
struct FeedState {
    generation: u64,
    detached: bool,
    listings: Loadable<Vec<Listing>>,
}

/// Listing set behind the browse screen.
///
/// Only the newest load may update the feed: a refresh supersedes any load
/// still in flight, and [`ListingFeed::detach`] makes every pending result
/// land nowhere.
pub struct ListingFeed {
    store: Arc<dyn ListingStore>,
    state: Mutex<FeedState>,
}

impl ListingFeed {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FeedState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn refresh(&self, query: &ListingQuery) -> Result<()> {
        let generation = {
            let mut state = self.state();
            if state.detached {
                return Ok(());
            }
            state.generation += 1;
            state.listings = Loadable::Loading;
            state.generation
        };

        let result = self.store.fetch_listings(query).await;

        let mut state = self.state();
        if state.detached || state.generation != generation {
            debug!("Dropping stale listing load #{}", generation);
            return Ok(());
        }
        match result {
            Ok(listings) => {
                info!("Loaded {} listings", listings.len());
                state.listings = Loadable::Ready(listings);
                Ok(())
            }
            Err(e) => {
                error!("Error loading listings: {}", e);
                state.listings = Loadable::Failed(e.user_message());
                Err(e)
            }
        }
    }

    /// The owning view is gone; pending loads are ignored from now on.
    pub fn detach(&self) {
        let mut state = self.state();
        state.detached = true;
        state.generation += 1;
    }

    pub fn snapshot(&self) -> Loadable<Vec<Listing>> {
        self.state().listings.clone()
    }

    /// Loaded listings that pass `filter`, in load order.
    pub fn visible(&self, filter: &FilterConfig) -> Vec<Listing> {
        match &self.state().listings {
            Loadable::Ready(listings) => filter.apply(listings),
            _ => Vec::new(),
        }
    }
}
