use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::ListingStore;
use crate::error::Result;
use crate::models::{Listing, ListingId};
use crate::mortgage::{MortgageEstimate, MortgageTerms};
use crate::schedule::ScheduledTask;
use crate::session::SessionStore;

/// An open listing detail screen.
///
/// Opening records a view and schedules the mortgage offer; dropping the
/// view cancels the offer if it has not shown yet.
pub struct DetailView {
    listing: Listing,
    image: usize,
    offer_visible: Arc<AtomicBool>,
    offer_timer: Option<ScheduledTask>,
}

impl DetailView {
    /// `Ok(None)` when the listing does not exist.
    pub async fn open(
        store: Arc<dyn ListingStore>,
        session: &SessionStore,
        id: ListingId,
        offer_delay: Duration,
    ) -> Result<Option<Self>> {
        let Some(listing) = store.fetch_listing(id).await? else {
            info!("Listing {} not found", id);
            return Ok(None);
        };

        let viewer = session
            .current()
            .filter(|identity| !identity.is_guest())
            .map(|identity| identity.id);
        if let Err(e) = store.record_view(id, viewer.as_deref()).await {
            warn!("Could not record view of listing {}: {}", id, e);
        }

        let offer_visible = Arc::new(AtomicBool::new(false));
        let flag = offer_visible.clone();
        let offer_timer = ScheduledTask::after(offer_delay, async move {
            debug!("Showing mortgage offer for listing {}", id);
            flag.store(true, Ordering::SeqCst);
        });

        Ok(Some(Self {
            listing,
            image: 0,
            offer_visible,
            offer_timer: Some(offer_timer),
        }))
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn mortgage_estimate(&self) -> MortgageEstimate {
        MortgageTerms::default().estimate(self.listing.price)
    }

    pub fn mortgage_offer_visible(&self) -> bool {
        self.offer_visible.load(Ordering::SeqCst)
    }

    /// Hides the offer and stops it from appearing later.
    pub fn dismiss_offer(&mut self) {
        if let Some(timer) = self.offer_timer.take() {
            timer.cancel();
        }
        self.offer_visible.store(false, Ordering::SeqCst);
    }

    pub fn current_image(&self) -> &str {
        self.listing
            .images
            .get(self.image)
            .map(String::as_str)
            .unwrap_or_else(|| self.listing.primary_image())
    }

    pub fn next_image(&mut self) -> &str {
        let count = self.listing.images.len().max(1);
        self.image = (self.image + 1) % count;
        self.current_image()
    }

    pub fn prev_image(&mut self) -> &str {
        let count = self.listing.images.len().max(1);
        self.image = (self.image + count - 1) % count;
        self.current_image()
    }
}
