use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::sample::{sample_agent_profiles, sample_listings};
use crate::backend::traits::{
    FavoriteStore, IdentityProvider, ListingStore, MessageStore, TourStore,
};
use crate::backend::types::{AuthUser, ListingQuery, SignUpRequest, SocialProvider};
use crate::error::{AppError, Result};
use crate::models::{
    format_price, AgentContact, IdentityKind, Listing, ListingDraft, ListingId, ListingStatus,
    ListingUpdate, Location, Message, NewMessage, NewTour, Profile, ProfileUpdate, Schools, Tour,
    TourStatus, PLACEHOLDER_IMAGE,
};

#[derive(Default)]
struct MemoryState {
    /// email -> (password, user id)
    accounts: HashMap<String, (String, String)>,
    profiles: HashMap<String, Profile>,
    /// access token -> user id
    tokens: HashMap<String, String>,
    signed_in: Option<AuthUser>,
    /// Newest first
    listings: Vec<Listing>,
    next_listing_id: ListingId,
    favorites: BTreeSet<(String, ListingId)>,
    messages: Vec<Message>,
    tours: Vec<Tour>,
    views: Vec<(ListingId, Option<String>)>,
    fail_reads: bool,
    fail_writes: bool,
    anonymous_disabled: bool,
}

/// In-process backend with the sample listings preloaded.
///
/// Used for offline runs and tests; the failure switches simulate an
/// unreachable backend.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut listings = sample_listings();
        listings.reverse();
        let next_listing_id = listings.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        let profiles = sample_agent_profiles()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Self {
            state: Mutex::new(MemoryState {
                listings,
                next_listing_id,
                profiles,
                ..MemoryState::default()
            }),
        }
    }

    /// Starts with no listings at all.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_listing_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn set_anonymous_disabled(&self, disabled: bool) {
        self.lock().anonymous_disabled = disabled;
    }

    /// Registers an account together with its profile row.
    pub fn insert_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        kind: IdentityKind,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let mut state = self.lock();
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), id.clone()));
        state.profiles.insert(
            id.clone(),
            Profile {
                id: id.clone(),
                email: email.to_string(),
                name: name.to_string(),
                user_type: kind,
                phone: None,
                company: None,
                photo_url: None,
                created_at: Some(Utc::now()),
            },
        );
        id
    }

    /// Drops a profile row so the account exists without one.
    pub fn remove_profile(&self, user_id: &str) {
        self.lock().profiles.remove(user_id);
    }

    /// Issues an access token as a social provider redirect would.
    pub fn issue_token(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.lock().tokens.insert(token.clone(), user_id.to_string());
        token
    }

    pub fn recorded_views(&self) -> Vec<(ListingId, Option<String>)> {
        self.lock().views.clone()
    }

    pub fn stored_favorites(&self, user_id: &str) -> Vec<ListingId> {
        self.lock()
            .favorites
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, id)| *id)
            .collect()
    }
}

impl MemoryState {
    fn read(&self) -> Result<()> {
        if self.fail_reads {
            return Err(AppError::remote(503, "backend unavailable"));
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::remote(503, "backend unavailable"));
        }
        Ok(())
    }

    fn owned_listing_mut(&mut self, id: ListingId, agent_id: &str) -> Result<&mut Listing> {
        self.listings
            .iter_mut()
            .find(|l| l.id == id && l.is_owned_by(agent_id))
            .ok_or_else(|| AppError::NotFound("listing".to_string()))
    }

    fn agent_contact(&self, agent_id: &str) -> AgentContact {
        match self.profiles.get(agent_id) {
            Some(profile) => AgentContact {
                name: profile.name.clone(),
                phone: profile.phone.clone().unwrap_or_default(),
                email: profile.email.clone(),
                photo: profile.photo_url.clone().unwrap_or_default(),
                company: profile.company.clone().unwrap_or_default(),
            },
            None => AgentContact::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthUser> {
        {
            let state = self.lock();
            state.write()?;
            if state.accounts.contains_key(&request.email) {
                return Err(AppError::remote(422, "User already registered"));
            }
        }
        let id = self.insert_account(
            &request.email,
            &request.password,
            &request.name,
            request.kind.into(),
        );
        let user = AuthUser {
            id,
            email: Some(request.email.clone()),
            is_anonymous: false,
        };
        self.lock().signed_in = Some(user.clone());
        info!("Registered {}", request.email);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let mut state = self.lock();
        state.read()?;
        let user = match state.accounts.get(email) {
            Some((stored, id)) if stored == password => AuthUser {
                id: id.clone(),
                email: Some(email.to_string()),
                is_anonymous: false,
            },
            _ => return Err(AppError::remote(400, "Invalid login credentials")),
        };
        state.signed_in = Some(user.clone());
        Ok(user)
    }

    async fn sign_in_anonymously(&self) -> Result<AuthUser> {
        let mut state = self.lock();
        if state.anonymous_disabled {
            return Err(AppError::remote(422, "Anonymous sign-ins are disabled"));
        }
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: None,
            is_anonymous: true,
        };
        state.signed_in = Some(user.clone());
        Ok(user)
    }

    fn social_authorize_url(&self, provider: SocialProvider, redirect_to: &str) -> String {
        format!("memory://authorize?provider={}&redirect_to={}", provider.as_str(), redirect_to)
    }

    async fn complete_social_sign_in(&self, access_token: &str) -> Result<AuthUser> {
        let mut state = self.lock();
        let id = state
            .tokens
            .get(access_token)
            .cloned()
            .ok_or(AppError::Unauthenticated)?;
        let email = state.profiles.get(&id).map(|p| p.email.clone());
        let user = AuthUser {
            id,
            email,
            is_anonymous: false,
        };
        state.signed_in = Some(user.clone());
        Ok(user)
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        let state = self.lock();
        state.read()?;
        Ok(state.signed_in.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.lock();
        state.signed_in = None;
        state.write()
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let state = self.lock();
        state.read()?;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        let mut state = self.lock();
        state.write()?;
        let profile = state
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound("profile".to_string()))?;
        if let Some(name) = &update.name {
            profile.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(company) = &update.company {
            profile.company = Some(company.clone());
        }
        if let Some(photo) = &update.photo_url {
            profile.photo_url = Some(photo.clone());
        }
        Ok(profile.clone())
    }
}

#[async_trait]
impl ListingStore for MemoryBackend {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let state = self.lock();
        state.read()?;
        let listings: Vec<Listing> = state
            .listings
            .iter()
            .filter(|l| l.status == ListingStatus::ForSale)
            .filter(|l| query.city.as_ref().map_or(true, |c| &l.location.city == c))
            .filter(|l| query.state.as_ref().map_or(true, |s| &l.location.state == s))
            .filter(|l| query.min_price.map_or(true, |p| p <= 0 || l.price >= p))
            .filter(|l| query.max_price.map_or(true, |p| p <= 0 || l.price <= p))
            .filter(|l| query.min_bedrooms.map_or(true, |b| l.bedrooms >= b))
            .filter(|l| query.min_bathrooms.map_or(true, |b| l.bathrooms >= b))
            .filter(|l| query.property_type.map_or(true, |t| l.property_type == t))
            .cloned()
            .collect();
        debug!("Memory backend returned {} listings", listings.len());
        Ok(listings)
    }

    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>> {
        let state = self.lock();
        state.read()?;
        Ok(state.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn agent_listings(&self, agent_id: &str) -> Result<Vec<Listing>> {
        let state = self.lock();
        state.read()?;
        Ok(state
            .listings
            .iter()
            .filter(|l| l.is_owned_by(agent_id))
            .cloned()
            .collect())
    }

    async fn create_listing(
        &self,
        agent_id: &str,
        draft: &ListingDraft,
        images: &[String],
    ) -> Result<Listing> {
        let mut state = self.lock();
        state.write()?;
        let id = state.next_listing_id;
        state.next_listing_id += 1;

        let images = if images.is_empty() {
            vec![PLACEHOLDER_IMAGE.to_string()]
        } else {
            images.to_vec()
        };
        let listing = Listing {
            id,
            title: draft.title.clone(),
            price: draft.price,
            price_formatted: format_price(draft.price),
            location: Location {
                address: draft.address.clone(),
                city: draft.city.clone(),
                state: draft.state.clone(),
                zip_code: draft.zip_code.clone(),
                latitude: draft.latitude,
                longitude: draft.longitude,
            },
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            sqft: draft.sqft,
            lot_size: draft.lot_size.clone(),
            year_built: draft.year_built,
            property_type: draft.property_type,
            status: draft.status,
            description: draft.description.clone(),
            features: draft.features.clone(),
            images,
            agent: state.agent_contact(agent_id),
            agent_id: Some(agent_id.to_string()),
            days_on_market: 0,
            mls_number: format!("MLS{id:07}"),
            virtual_tour: draft.virtual_tour.clone(),
            schools: Schools::default(),
        };
        state.listings.insert(0, listing.clone());
        Ok(listing)
    }

    async fn update_listing(
        &self,
        id: ListingId,
        agent_id: &str,
        update: &ListingUpdate,
    ) -> Result<Listing> {
        let mut state = self.lock();
        state.write()?;
        let listing = state.owned_listing_mut(id, agent_id)?;
        update.apply_to(listing);
        Ok(listing.clone())
    }

    async fn delete_listing(&self, id: ListingId, agent_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        state.owned_listing_mut(id, agent_id)?;
        state.listings.retain(|l| l.id != id);
        state.favorites.retain(|(_, listing)| *listing != id);
        Ok(())
    }

    async fn record_view(&self, id: ListingId, user_id: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        state.views.push((id, user_id.map(str::to_string)));
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryBackend {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<ListingId>> {
        self.lock().read()?;
        Ok(self.stored_favorites(user_id))
    }

    async fn add_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        state.favorites.insert((user_id.to_string(), listing_id));
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        state.favorites.remove(&(user_id.to_string(), listing_id));
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryBackend {
    async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        let mut state = self.lock();
        state.write()?;
        let stored = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: Some(message.sender_id.clone()),
            recipient_id: Some(message.recipient_id.clone()),
            property_id: message.property_id,
            subject: message.subject.clone(),
            content: message.content.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>> {
        let state = self.lock();
        state.read()?;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| {
                m.sender_id.as_deref() == Some(user_id)
                    || m.recipient_id.as_deref() == Some(user_id)
            })
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let state = self.lock();
        state.read()?;
        let between = |m: &&Message, from: &str, to: &str| {
            m.sender_id.as_deref() == Some(from) && m.recipient_id.as_deref() == Some(to)
        };
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| between(m, user_id, other_id) || between(m, other_id, user_id))
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
            message.is_read = true;
        }
        Ok(())
    }

    async fn unread_count(&self, user_id: &str) -> Result<usize> {
        let state = self.lock();
        state.read()?;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.recipient_id.as_deref() == Some(user_id) && !m.is_read)
            .count())
    }
}

#[async_trait]
impl TourStore for MemoryBackend {
    async fn schedule_tour(&self, tour: &NewTour) -> Result<Tour> {
        let mut state = self.lock();
        state.write()?;
        let stored = Tour {
            id: Uuid::new_v4().to_string(),
            property_id: Some(tour.property_id),
            user_id: Some(tour.user_id.clone()),
            agent_id: Some(tour.agent_id.clone()),
            scheduled_date: tour.scheduled_date,
            scheduled_time: tour.scheduled_time,
            notes: tour.notes.clone(),
            status: tour.status,
            created_at: Utc::now(),
        };
        state.tours.push(stored.clone());
        Ok(stored)
    }

    async fn user_tours(&self, user_id: &str) -> Result<Vec<Tour>> {
        let state = self.lock();
        state.read()?;
        Ok(sorted_tours(
            state.tours.iter().filter(|t| t.user_id.as_deref() == Some(user_id)),
        ))
    }

    async fn agent_tours(&self, agent_id: &str) -> Result<Vec<Tour>> {
        let state = self.lock();
        state.read()?;
        Ok(sorted_tours(
            state.tours.iter().filter(|t| t.agent_id.as_deref() == Some(agent_id)),
        ))
    }

    async fn update_tour_status(&self, tour_id: &str, status: TourStatus) -> Result<()> {
        let mut state = self.lock();
        state.write()?;
        let tour = state
            .tours
            .iter_mut()
            .find(|t| t.id == tour_id)
            .ok_or_else(|| AppError::NotFound("tour".to_string()))?;
        tour.status = status;
        Ok(())
    }
}

fn sorted_tours<'a>(tours: impl Iterator<Item = &'a Tour>) -> Vec<Tour> {
    let mut tours: Vec<Tour> = tours.cloned().collect();
    tours.sort_by_key(|t| (t.scheduled_date, t.scheduled_time));
    tours
}
