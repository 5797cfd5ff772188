use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::backend::TourStore;
use crate::error::{AppError, Result};
use crate::models::{Listing, NewTour, Tour, TourStatus};
use crate::session::SessionStore;
use crate::validation;

const ACTION: &str = "schedule tours";

pub struct TourScheduler {
    session: Arc<SessionStore>,
    store: Arc<dyn TourStore>,
}

impl TourScheduler {
    pub fn new(session: Arc<SessionStore>, store: Arc<dyn TourStore>) -> Self {
        Self { session, store }
    }

    pub async fn schedule(
        &self,
        listing: &Listing,
        date: NaiveDate,
        time: NaiveTime,
        notes: Option<String>,
    ) -> Result<Tour> {
        self.schedule_at(listing, date, time, notes, Utc::now().date_naive())
            .await
    }

    pub async fn schedule_at(
        &self,
        listing: &Listing,
        date: NaiveDate,
        time: NaiveTime,
        notes: Option<String>,
        today: NaiveDate,
    ) -> Result<Tour> {
        let visitor = self.session.require_member(ACTION)?;
        validation::validate_tour_date(date, today)?;
        let agent_id = listing
            .agent_id
            .clone()
            .ok_or_else(|| AppError::NotFound("agent".to_string()))?;

        let tour = NewTour {
            property_id: listing.id,
            user_id: visitor.id,
            agent_id,
            scheduled_date: date,
            scheduled_time: time,
            notes: notes.filter(|n| !n.trim().is_empty()),
            status: TourStatus::Scheduled,
        };
        let tour = self.store.schedule_tour(&tour).await?;
        info!("Tour {} of listing {} on {} {}", tour.id, listing.id, date, time);
        Ok(tour)
    }

    /// Tours the agent hosts, or the tours a buyer booked; by date then time.
    pub async fn my_tours(&self) -> Result<Vec<Tour>> {
        let me = self.session.require_member(ACTION)?;
        if me.is_agent() {
            self.store.agent_tours(&me.id).await
        } else {
            self.store.user_tours(&me.id).await
        }
    }

    pub async fn update_status(&self, tour_id: &str, status: TourStatus) -> Result<()> {
        self.session.require_member(ACTION)?;
        self.store.update_tour_status(tour_id, status).await
    }

    pub async fn cancel(&self, tour_id: &str) -> Result<()> {
        self.update_status(tour_id, TourStatus::Cancelled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::IdentityKind;
    use crate::session::MemoryStorage;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn at(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<SessionStore>, TourScheduler, Listing) {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_account("buyer@test.com", "secret1", "Buyer", IdentityKind::User);
        let session = Arc::new(SessionStore::new(
            backend.clone(),
            Arc::new(MemoryStorage::new()),
            chrono::Duration::hours(24),
        ));
        let listing = crate::backend::sample::sample_listings().remove(1);
        let scheduler = TourScheduler::new(session.clone(), backend);
        (session, scheduler, listing)
    }

    #[tokio::test]
    async fn past_dates_are_rejected() {
        let (session, scheduler, listing) = setup().await;
        session.sign_in("buyer@test.com", "secret1").await.unwrap();

        let err = scheduler
            .schedule_at(&listing, day(9), at(10), None, day(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "date", .. }));
    }

    #[tokio::test]
    async fn guests_are_turned_away() {
        let (session, scheduler, listing) = setup().await;
        session.guest_sign_in().await.unwrap();

        let err = scheduler
            .schedule_at(&listing, day(12), at(10), None, day(10))
            .await
            .unwrap_err();
        assert!(err.requires_sign_up());
    }

    #[tokio::test]
    async fn tours_are_listed_in_date_order_and_cancellable() {
        let (session, scheduler, listing) = setup().await;
        session.sign_in("buyer@test.com", "secret1").await.unwrap();

        let later = scheduler
            .schedule_at(&listing, day(14), at(9), Some("Bring flyers".to_string()), day(10))
            .await
            .unwrap();
        let sooner = scheduler
            .schedule_at(&listing, day(10), at(15), Some("  ".to_string()), day(10))
            .await
            .unwrap();
        assert_eq!(sooner.status, TourStatus::Scheduled);
        assert_eq!(sooner.notes, None);
        assert_eq!(sooner.agent_id.as_deref(), Some("agent-michael"));

        let ids: Vec<String> = scheduler
            .my_tours()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![sooner.id.clone(), later.id.clone()]);

        scheduler.cancel(&later.id).await.unwrap();
        let tours = scheduler.my_tours().await.unwrap();
        assert_eq!(tours[1].status, TourStatus::Cancelled);
    }
}
