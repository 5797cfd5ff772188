pub mod guest;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{AuthUser, IdentityProvider, SignUpRequest, SocialProvider};
use crate::error::{AppError, Result};
use crate::models::{Identity, IdentityKind, ProfileUpdate};
use crate::schedule::ScheduledTask;
use crate::validation;

pub use guest::{GuestRecord, GuestStorage, JsonFileStorage, MemoryStorage};

pub const GUEST_NAME: &str = "Guest User";

/// Current identity and its lifecycle.
///
/// The store is passed explicitly to whatever needs it; identity changes are
/// published on a watch channel so dependents (favorites, views) observe the
/// transition as soon as it happens.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    guests: Arc<dyn GuestStorage>,
    guest_ttl: Duration,
    current: watch::Sender<Option<Identity>>,
}

impl SessionStore {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        guests: Arc<dyn GuestStorage>,
        guest_ttl: Duration,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            provider,
            guests,
            guest_ttl,
            current,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    pub fn guest_ttl(&self) -> Duration {
        self.guest_ttl
    }

    /// Signed-in, non-guest identity allowed to perform `action`.
    pub fn require_member(&self, action: &'static str) -> Result<Identity> {
        match self.current() {
            None => Err(AppError::Unauthenticated),
            Some(identity) if identity.is_guest() => Err(AppError::GuestRestricted(action)),
            Some(identity) => Ok(identity),
        }
    }

    pub fn require_agent(&self) -> Result<Identity> {
        match self.current() {
            None => Err(AppError::Unauthenticated),
            Some(identity) if identity.is_agent() => Ok(identity),
            Some(_) => Err(AppError::Forbidden(
                "only agents can manage listings".to_string(),
            )),
        }
    }

    async fn transition(&self, next: Option<Identity>) {
        let previous = self.current.send_replace(next.clone());
        let left_guest = matches!(&previous, Some(p) if p.is_guest())
            && previous.as_ref().map(|p| &p.id) != next.as_ref().map(|n| &n.id);
        if left_guest {
            if let Err(e) = self.guests.clear().await {
                warn!("Failed to clear guest record: {}", e);
            }
        }
        match &next {
            Some(identity) => info!("Session is now {:?} {}", identity.kind, identity.id),
            None => info!("Session signed out"),
        }
    }

    /// Loads the profile behind a provider account. No profile means no session.
    async fn enter_registered(&self, user: AuthUser) -> Result<Identity> {
        match self.provider.fetch_profile(&user.id).await {
            Ok(Some(profile)) => {
                let identity = profile.to_identity();
                self.transition(Some(identity.clone())).await;
                Ok(identity)
            }
            Ok(None) => {
                warn!("No profile for account {}, staying signed out", user.id);
                self.transition(None).await;
                if let Err(e) = self.provider.sign_out().await {
                    debug!("Provider sign-out after missing profile failed: {}", e);
                }
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                error!("Profile lookup for {} failed: {}", user.id, e);
                self.transition(None).await;
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Identity> {
        validation::validate_sign_up(request)?;
        let user = self.provider.sign_up(request).await?;
        self.enter_registered(user).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        validation::validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::validation("password", "Password is required"));
        }
        let user = self.provider.sign_in(email.trim(), password).await?;
        self.enter_registered(user).await
    }

    /// First half of a social sign-in: where to send the browser.
    pub fn social_sign_in_url(&self, provider: SocialProvider, redirect_to: &str) -> String {
        self.provider.social_authorize_url(provider, redirect_to)
    }

    /// Second half: the redirect came back with an access token.
    pub async fn complete_social_sign_in(&self, access_token: &str) -> Result<Identity> {
        let user = self.provider.complete_social_sign_in(access_token).await?;
        self.enter_registered(user).await
    }

    pub async fn guest_sign_in(&self) -> Result<Identity> {
        self.guest_sign_in_at(Utc::now()).await
    }

    /// Anonymous provider account when available, a local id otherwise.
    pub async fn guest_sign_in_at(&self, now: DateTime<Utc>) -> Result<Identity> {
        let id = match self.provider.sign_in_anonymously().await {
            Ok(user) => user.id,
            Err(e) => {
                warn!("Anonymous sign-in unavailable, using a local guest: {}", e);
                format!("guest-{}", Uuid::new_v4())
            }
        };

        let identity = Identity {
            id,
            name: GUEST_NAME.to_string(),
            email: String::new(),
            kind: IdentityKind::Guest,
        };
        let record = GuestRecord {
            identity: identity.clone(),
            created_at: now,
        };
        if let Err(e) = self.guests.save(&record).await {
            warn!("Guest session will not survive a restart: {}", e);
        }

        self.transition(Some(identity.clone())).await;
        Ok(identity)
    }

    /// Always ends signed out; remote failures are only logged.
    pub async fn sign_out(&self) {
        self.transition(None).await;
        if let Err(e) = self.guests.clear().await {
            warn!("Failed to clear guest record: {}", e);
        }
        if let Err(e) = self.provider.sign_out().await {
            error!("Remote sign-out failed: {}", e);
        }
    }

    pub async fn restore(&self) -> Result<Option<Identity>> {
        self.restore_at(Utc::now()).await
    }

    /// Picks up a previous session. Guest records past their window are dropped.
    pub async fn restore_at(&self, now: DateTime<Utc>) -> Result<Option<Identity>> {
        match self.guests.load().await {
            Ok(Some(record)) if record.is_expired(self.guest_ttl, now) => {
                info!("Guest session {} expired", record.identity.id);
                self.sign_out().await;
                return Ok(None);
            }
            Ok(Some(record)) => {
                debug!("Restoring guest session {}", record.identity.id);
                self.transition(Some(record.identity.clone())).await;
                return Ok(Some(record.identity));
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read guest record: {}", e),
        }

        match self.provider.current_user().await? {
            Some(user) if user.is_anonymous => {
                debug!("Anonymous account without a guest record, signing out");
                self.sign_out().await;
                Ok(None)
            }
            Some(user) => match self.enter_registered(user).await {
                Ok(identity) => Ok(Some(identity)),
                Err(AppError::Unauthenticated) => Ok(None),
                Err(e) => Err(e),
            },
            None => {
                self.transition(None).await;
                Ok(None)
            }
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        let identity = self.require_member("edit a profile")?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name", "Name is required"));
            }
        }
        let profile = self.provider.update_profile(&identity.id, update).await?;
        let updated = profile.to_identity();
        if self.current().map(|c| c.id) == Some(updated.id.clone()) {
            self.current.send_replace(Some(updated.clone()));
        }
        Ok(updated)
    }

    /// Signs the current guest out when its window runs out.
    ///
    /// Returns `None` unless a guest is signed in. Dropping the task cancels it.
    pub async fn schedule_guest_expiry(self: &Arc<Self>) -> Result<Option<ScheduledTask>> {
        let Some(current) = self.current().filter(Identity::is_guest) else {
            return Ok(None);
        };
        let Some(record) = self.guests.load().await? else {
            return Ok(None);
        };
        if record.identity.id != current.id {
            return Ok(None);
        }

        let remaining = (record.expires_at(self.guest_ttl) - Utc::now())
            .to_std()
            .unwrap_or_default();
        let session = Arc::clone(self);
        Ok(Some(ScheduledTask::after(remaining, async move {
            if session.current().map(|c| c.id) == Some(current.id) {
                info!("Guest window elapsed, signing out");
                session.sign_out().await;
            }
        })))
    }
}
