use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

use crate::backend::ListingStore;
use crate::error::Result;
use crate::loadable::Loadable;
use crate::models::{format_price, Listing, ListingDraft, ListingId, ListingUpdate};
use crate::session::SessionStore;
use crate::validation;

/// Totals shown above the agent's listing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub listings: usize,
    pub total_value: i64,
    pub total_value_formatted: String,
}

/// Listing management for the signed-in agent.
///
/// Every operation checks the session first; the backend additionally
/// refuses changes to listings the agent does not own.
pub struct AgentDashboard {
    session: Arc<SessionStore>,
    store: Arc<dyn ListingStore>,
    listings: Mutex<Loadable<Vec<Listing>>>,
}

impl AgentDashboard {
    pub fn new(session: Arc<SessionStore>, store: Arc<dyn ListingStore>) -> Self {
        Self {
            session,
            store,
            listings: Mutex::new(Loadable::Idle),
        }
    }

    fn listings_mut(&self) -> MutexGuard<'_, Loadable<Vec<Listing>>> {
        self.listings.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn listings(&self) -> Loadable<Vec<Listing>> {
        self.listings_mut().clone()
    }

    pub async fn refresh(&self) -> Result<()> {
        let agent = self.session.require_agent()?;
        *self.listings_mut() = Loadable::Loading;

        match self.store.agent_listings(&agent.id).await {
            Ok(listings) => {
                info!("Agent {} has {} listings", agent.id, listings.len());
                *self.listings_mut() = Loadable::Ready(listings);
                Ok(())
            }
            Err(e) => {
                error!("Error loading agent listings: {}", e);
                *self.listings_mut() = Loadable::Failed(e.user_message());
                Err(e)
            }
        }
    }

    /// `images` in display order; the first becomes the primary image.
    pub async fn create(&self, draft: &ListingDraft, images: &[String]) -> Result<Listing> {
        let agent = self.session.require_agent()?;
        validation::validate_listing_draft(draft, Utc::now().year())?;

        let listing = self.store.create_listing(&agent.id, draft, images).await?;
        info!("Created listing {} \"{}\"", listing.id, listing.title);
        if let Loadable::Ready(listings) = &mut *self.listings_mut() {
            listings.insert(0, listing.clone());
        }
        Ok(listing)
    }

    pub async fn update(&self, id: ListingId, update: &ListingUpdate) -> Result<Listing> {
        let agent = self.session.require_agent()?;
        validation::validate_listing_update(update, Utc::now().year())?;

        let listing = self.store.update_listing(id, &agent.id, update).await?;
        if let Loadable::Ready(listings) = &mut *self.listings_mut() {
            if let Some(slot) = listings.iter_mut().find(|l| l.id == id) {
                *slot = listing.clone();
            }
        }
        Ok(listing)
    }

    pub async fn delete(&self, id: ListingId) -> Result<()> {
        let agent = self.session.require_agent()?;
        self.store.delete_listing(id, &agent.id).await?;
        info!("Deleted listing {}", id);
        if let Loadable::Ready(listings) = &mut *self.listings_mut() {
            listings.retain(|l| l.id != id);
        }
        Ok(())
    }

    pub fn summary(&self) -> PortfolioSummary {
        let guard = self.listings_mut();
        let listings = guard.ready().map(Vec::as_slice).unwrap_or_default();
        let total_value = listings.iter().map(|l| l.price).sum();
        PortfolioSummary {
            listings: listings.len(),
            total_value,
            total_value_formatted: format_price(total_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::AppError;
    use crate::models::{IdentityKind, ListingStatus, PropertyType};
    use crate::session::MemoryStorage;

    fn draft(title: &str, price: i64) -> ListingDraft {
        ListingDraft {
            title: title.to_string(),
            price,
            address: "100 Harbor Dr".to_string(),
            city: "San Diego".to_string(),
            state: "CA".to_string(),
            zip_code: "92101".to_string(),
            bedrooms: 2,
            bathrooms: 2.0,
            sqft: 1200,
            lot_size: None,
            year_built: 2015,
            property_type: PropertyType::Condo,
            status: ListingStatus::ForSale,
            description: "Harbor views".to_string(),
            features: vec!["Balcony".to_string()],
            latitude: 32.71,
            longitude: -117.17,
            virtual_tour: None,
        }
    }

    async fn signed_in(kind: IdentityKind) -> (Arc<MemoryBackend>, AgentDashboard) {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_account("someone@test.com", "secret1", "Someone", kind);
        let session = Arc::new(SessionStore::new(
            backend.clone(),
            Arc::new(MemoryStorage::new()),
            chrono::Duration::hours(24),
        ));
        session.sign_in("someone@test.com", "secret1").await.unwrap();
        let dashboard = AgentDashboard::new(session, backend.clone());
        (backend, dashboard)
    }

    #[tokio::test]
    async fn buyers_cannot_manage_listings() {
        let (_backend, dashboard) = signed_in(IdentityKind::User).await;
        assert!(matches!(dashboard.refresh().await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            dashboard.create(&draft("Condo", 500_000), &[]).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn agent_manages_own_listings() {
        let (_backend, dashboard) = signed_in(IdentityKind::Agent).await;
        dashboard.refresh().await.unwrap();
        assert_eq!(dashboard.summary().listings, 0);

        let images = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        let first = dashboard.create(&draft("Harbor Condo", 500_000), &images).await.unwrap();
        let second = dashboard.create(&draft("Loft", 250_000), &[]).await.unwrap();
        assert_eq!(first.primary_image(), "a.jpg");

        let ids: Vec<ListingId> = dashboard
            .listings()
            .ready()
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(dashboard.summary().total_value_formatted, "$750,000");

        let update = ListingUpdate {
            price: Some(550_000),
            ..ListingUpdate::default()
        };
        let updated = dashboard.update(first.id, &update).await.unwrap();
        assert_eq!(updated.price, 550_000);
        assert_eq!(dashboard.summary().total_value, 800_000);

        dashboard.delete(second.id).await.unwrap();
        assert_eq!(dashboard.summary().listings, 1);
    }

    #[tokio::test]
    async fn other_agents_listings_are_off_limits() {
        let (backend, dashboard) = signed_in(IdentityKind::Agent).await;
        let update = ListingUpdate {
            title: Some("Mine now".to_string()),
            ..ListingUpdate::default()
        };

        assert!(matches!(dashboard.update(1, &update).await, Err(AppError::NotFound(_))));
        assert!(matches!(dashboard.delete(1).await, Err(AppError::NotFound(_))));
        assert!(backend.fetch_listing(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_drafts_never_reach_the_backend() {
        let (backend, dashboard) = signed_in(IdentityKind::Agent).await;
        let err = dashboard.create(&draft("", 500_000), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "title", .. }));
        let all = backend.fetch_listings(&Default::default()).await.unwrap();
        assert_eq!(all.len(), 5);
    }
}
