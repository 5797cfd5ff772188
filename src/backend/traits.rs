use async_trait::async_trait;

use crate::backend::types::{AuthUser, ListingQuery, SignUpRequest, SocialProvider};
use crate::error::Result;
use crate::models::{
    Listing, ListingDraft, ListingId, ListingUpdate, Message, NewMessage, NewTour, Profile,
    ProfileUpdate, Tour, TourStatus,
};

/// Hosted authentication service.
/// Implementations own whatever access token the provider hands out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_in_anonymously(&self) -> Result<AuthUser>;

    /// URL the browser is sent to for a social sign-in.
    fn social_authorize_url(&self, provider: SocialProvider, redirect_to: &str) -> String;

    /// Finishes a social sign-in with the token returned on the redirect.
    async fn complete_social_sign_in(&self, access_token: &str) -> Result<AuthUser>;

    async fn current_user(&self) -> Result<Option<AuthUser>>;

    async fn sign_out(&self) -> Result<()>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile>;
}

/// Listing table plus its image, school, agent joins and the view log
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// For-sale listings, newest first.
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>>;

    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>>;

    async fn agent_listings(&self, agent_id: &str) -> Result<Vec<Listing>>;

    async fn create_listing(
        &self,
        agent_id: &str,
        draft: &ListingDraft,
        images: &[String],
    ) -> Result<Listing>;

    async fn update_listing(
        &self,
        id: ListingId,
        agent_id: &str,
        update: &ListingUpdate,
    ) -> Result<Listing>;

    async fn delete_listing(&self, id: ListingId, agent_id: &str) -> Result<()>;

    async fn record_view(&self, id: ListingId, user_id: Option<&str>) -> Result<()>;
}

/// Remote favorites table keyed by (user, listing)
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<ListingId>>;

    /// Adding an existing pair succeeds.
    async fn add_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()>;

    /// Removing a missing pair succeeds.
    async fn remove_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn send_message(&self, message: &NewMessage) -> Result<Message>;

    /// Sent or received, newest first.
    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>>;

    /// Both directions between two identities, oldest first.
    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>>;

    async fn mark_read(&self, message_id: &str) -> Result<()>;

    async fn unread_count(&self, user_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait TourStore: Send + Sync {
    async fn schedule_tour(&self, tour: &NewTour) -> Result<Tour>;

    async fn user_tours(&self, user_id: &str) -> Result<Vec<Tour>>;

    async fn agent_tours(&self, agent_id: &str) -> Result<Vec<Tour>>;

    async fn update_tour_status(&self, tour_id: &str, status: TourStatus) -> Result<()>;
}
