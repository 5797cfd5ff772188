use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::rows::{image_inserts, ListingInsert, ListingRow, LISTING_SELECT};
use crate::backend::traits::{
    FavoriteStore, IdentityProvider, ListingStore, MessageStore, TourStore,
};
use crate::backend::types::{AuthUser, ListingQuery, SignUpRequest, SocialProvider};
use crate::config::BackendConfig;
use crate::error::{AppError, Result};
use crate::models::{
    Listing, ListingDraft, ListingId, ListingStatus, ListingUpdate, Message, NewMessage, NewTour,
    Profile, ProfileUpdate, Tour, TourStatus,
};

/// Postgres unique violation, returned when a favorite already exists.
const UNIQUE_VIOLATION: &str = "23505";

/// REST client for the hosted backend (auth + PostgREST tables)
pub struct SupabaseClient {
    client: Client,
    base_url: Url,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionResponse),
    /// Email confirmation pending, no session yet
    User(AuthUser),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    property_id: Option<ListingId>,
}

#[derive(Debug, Serialize)]
struct FavoriteInsert<'a> {
    user_id: &'a str,
    property_id: ListingId,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| AppError::Config(format!("invalid SUPABASE_URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("estate-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn rest(&self, table: &str) -> String {
        self.endpoint(&format!("/rest/v1/{table}"))
    }

    fn token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Row-level security sees the signed-in user, or the anon role.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .message
            .or(body.msg)
            .or(body.error_description)
            .unwrap_or(text);
        warn!("Backend returned {}: {}", status, message);

        Err(AppError::Remote {
            status: status.as_u16(),
            code: body.code,
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = Self::check(request.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    fn start_session(&self, session: SessionResponse) -> AuthUser {
        self.set_token(Some(session.access_token));
        session.user
    }

    async fn select_listings(&self, filters: &[(&str, String)]) -> Result<Vec<Listing>> {
        let request = self
            .request(Method::GET, &self.rest("properties"))
            .query(&[("select", LISTING_SELECT), ("order", "created_at.desc")])
            .query(filters);
        let rows: Vec<ListingRow> = self.send_json(request).await?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthUser> {
        info!("Signing up {} as {:?}", request.email, request.kind);
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": { "name": request.name, "user_type": request.kind },
        });
        let response: SignUpResponse = self
            .send_json(
                self.request(Method::POST, &self.endpoint("/auth/v1/signup"))
                    .json(&body),
            )
            .await?;

        Ok(match response {
            SignUpResponse::Session(session) => self.start_session(session),
            SignUpResponse::User(user) => user,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        debug!("Password sign-in for {}", email);
        let session: SessionResponse = self
            .send_json(
                self.request(Method::POST, &self.endpoint("/auth/v1/token"))
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        Ok(self.start_session(session))
    }

    async fn sign_in_anonymously(&self) -> Result<AuthUser> {
        let session: SessionResponse = self
            .send_json(
                self.request(Method::POST, &self.endpoint("/auth/v1/signup"))
                    .json(&json!({ "data": {} })),
            )
            .await?;
        Ok(self.start_session(session))
    }

    fn social_authorize_url(&self, provider: SocialProvider, redirect_to: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_path("/auth/v1/authorize");
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        url.to_string()
    }

    async fn complete_social_sign_in(&self, access_token: &str) -> Result<AuthUser> {
        self.set_token(Some(access_token.to_string()));
        match self.current_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                self.set_token(None);
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                self.set_token(None);
                Err(e)
            }
        }
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        if self.token().is_none() {
            return Ok(None);
        }
        let response = self
            .request(Method::GET, &self.endpoint("/auth/v1/user"))
            .send()
            .await?;
        if response.status().as_u16() == 401 {
            debug!("Stored access token rejected");
            self.set_token(None);
            return Ok(None);
        }
        let user: AuthUser = serde_json::from_slice(&Self::check(response).await?.bytes().await?)?;
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<()> {
        if self.token().is_none() {
            return Ok(());
        }
        let result = self
            .send_empty(self.request(Method::POST, &self.endpoint("/auth/v1/logout")))
            .await;
        // The local token is dropped whether or not the provider answered.
        self.set_token(None);
        result
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles: Vec<Profile> = self
            .send_json(
                self.request(Method::GET, &self.rest("profiles"))
                    .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))]),
            )
            .await?;
        Ok(profiles.into_iter().next())
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        let profiles: Vec<Profile> = self
            .send_json(
                self.request(Method::PATCH, &self.rest("profiles"))
                    .header("Prefer", "return=representation")
                    .query(&[("id", format!("eq.{user_id}"))])
                    .json(update),
            )
            .await?;
        profiles
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("profile".to_string()))
    }
}

#[async_trait]
impl ListingStore for SupabaseClient {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let mut filters = vec![("status", format!("eq.{}", ListingStatus::ForSale.as_str()))];
        filters.extend(query.to_params());
        debug!("Fetching listings with {} filters", filters.len());
        self.select_listings(&filters).await
    }

    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>> {
        let listings = self.select_listings(&[("id", format!("eq.{id}"))]).await?;
        Ok(listings.into_iter().next())
    }

    async fn agent_listings(&self, agent_id: &str) -> Result<Vec<Listing>> {
        self.select_listings(&[("agent_id", format!("eq.{agent_id}"))])
            .await
    }

    async fn create_listing(
        &self,
        agent_id: &str,
        draft: &ListingDraft,
        images: &[String],
    ) -> Result<Listing> {
        let rows: Vec<ListingRow> = self
            .send_json(
                self.request(Method::POST, &self.rest("properties"))
                    .header("Prefer", "return=representation")
                    .json(&ListingInsert::new(agent_id, draft)),
            )
            .await?;
        let id = rows
            .first()
            .map(|row| row.id)
            .ok_or_else(|| AppError::remote(500, "listing insert returned no row"))?;

        if !images.is_empty() {
            self.send_empty(
                self.request(Method::POST, &self.rest("property_images"))
                    .json(&image_inserts(id, images)),
            )
            .await?;
        }

        info!("Created listing {} for agent {}", id, agent_id);
        self.fetch_listing(id)
            .await?
            .ok_or_else(|| AppError::NotFound("listing".to_string()))
    }

    async fn update_listing(
        &self,
        id: ListingId,
        agent_id: &str,
        update: &ListingUpdate,
    ) -> Result<Listing> {
        let rows: Vec<serde_json::Value> = self
            .send_json(
                self.request(Method::PATCH, &self.rest("properties"))
                    .header("Prefer", "return=representation")
                    .query(&[
                        ("id", format!("eq.{id}")),
                        ("agent_id", format!("eq.{agent_id}")),
                    ])
                    .json(update),
            )
            .await?;
        if rows.is_empty() {
            return Err(AppError::NotFound("listing".to_string()));
        }
        self.fetch_listing(id)
            .await?
            .ok_or_else(|| AppError::NotFound("listing".to_string()))
    }

    async fn delete_listing(&self, id: ListingId, agent_id: &str) -> Result<()> {
        let rows: Vec<serde_json::Value> = self
            .send_json(
                self.request(Method::DELETE, &self.rest("properties"))
                    .header("Prefer", "return=representation")
                    .query(&[
                        ("id", format!("eq.{id}")),
                        ("agent_id", format!("eq.{agent_id}")),
                    ]),
            )
            .await?;
        if rows.is_empty() {
            return Err(AppError::NotFound("listing".to_string()));
        }
        info!("Deleted listing {}", id);
        Ok(())
    }

    async fn record_view(&self, id: ListingId, user_id: Option<&str>) -> Result<()> {
        self.send_empty(
            self.request(Method::POST, &self.rest("property_views"))
                .json(&json!({ "property_id": id, "user_id": user_id })),
        )
        .await
    }
}

#[async_trait]
impl FavoriteStore for SupabaseClient {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<ListingId>> {
        let rows: Vec<FavoriteRow> = self
            .send_json(
                self.request(Method::GET, &self.rest("favorites")).query(&[
                    ("select", "property_id".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                ]),
            )
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.property_id).collect())
    }

    async fn add_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
        let result = self
            .send_empty(
                self.request(Method::POST, &self.rest("favorites"))
                    .json(&FavoriteInsert {
                        user_id,
                        property_id: listing_id,
                    }),
            )
            .await;

        match result {
            Err(AppError::Remote { code: Some(code), .. }) if code == UNIQUE_VIOLATION => {
                debug!("Listing {} already a favorite of {}", listing_id, user_id);
                Ok(())
            }
            other => other,
        }
    }

    async fn remove_favorite(&self, user_id: &str, listing_id: ListingId) -> Result<()> {
        self.send_empty(
            self.request(Method::DELETE, &self.rest("favorites")).query(&[
                ("user_id", format!("eq.{user_id}")),
                ("property_id", format!("eq.{listing_id}")),
            ]),
        )
        .await
    }
}

#[async_trait]
impl MessageStore for SupabaseClient {
    async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        let rows: Vec<Message> = self
            .send_json(
                self.request(Method::POST, &self.rest("messages"))
                    .header("Prefer", "return=representation")
                    .json(message),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::remote(500, "message insert returned no row"))
    }

    async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>> {
        self.send_json(self.request(Method::GET, &self.rest("messages")).query(&[
            ("select", "*".to_string()),
            (
                "or",
                format!("(sender_id.eq.{user_id},recipient_id.eq.{user_id})"),
            ),
            ("order", "created_at.desc".to_string()),
        ]))
        .await
    }

    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let filter = format!(
            "(and(sender_id.eq.{user_id},recipient_id.eq.{other_id}),and(sender_id.eq.{other_id},recipient_id.eq.{user_id}))"
        );
        self.send_json(self.request(Method::GET, &self.rest("messages")).query(&[
            ("select", "*".to_string()),
            ("or", filter),
            ("order", "created_at.asc".to_string()),
        ]))
        .await
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.send_empty(
            self.request(Method::PATCH, &self.rest("messages"))
                .query(&[("id", format!("eq.{message_id}"))])
                .json(&json!({ "is_read": true })),
        )
        .await
    }

    async fn unread_count(&self, user_id: &str) -> Result<usize> {
        let rows: Vec<serde_json::Value> = self
            .send_json(self.request(Method::GET, &self.rest("messages")).query(&[
                ("select", "id".to_string()),
                ("recipient_id", format!("eq.{user_id}")),
                ("is_read", "eq.false".to_string()),
            ]))
            .await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl TourStore for SupabaseClient {
    async fn schedule_tour(&self, tour: &NewTour) -> Result<Tour> {
        let rows: Vec<Tour> = self
            .send_json(
                self.request(Method::POST, &self.rest("tours"))
                    .header("Prefer", "return=representation")
                    .json(tour),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::remote(500, "tour insert returned no row"))
    }

    async fn user_tours(&self, user_id: &str) -> Result<Vec<Tour>> {
        self.send_json(self.request(Method::GET, &self.rest("tours")).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "scheduled_date.asc,scheduled_time.asc".to_string()),
        ]))
        .await
    }

    async fn agent_tours(&self, agent_id: &str) -> Result<Vec<Tour>> {
        self.send_json(self.request(Method::GET, &self.rest("tours")).query(&[
            ("select", "*".to_string()),
            ("agent_id", format!("eq.{agent_id}")),
            ("order", "scheduled_date.asc,scheduled_time.asc".to_string()),
        ]))
        .await
    }

    async fn update_tour_status(&self, tour_id: &str, status: TourStatus) -> Result<()> {
        self.send_empty(
            self.request(Method::PATCH, &self.rest("tours"))
                .query(&[("id", format!("eq.{tour_id}"))])
                .json(&json!({ "status": status })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&BackendConfig {
            url: "https://demo.supabase.co".to_string(),
            anon_key: "anon".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn rejects_malformed_url() {
        let result = SupabaseClient::new(&BackendConfig {
            url: "not a url".to_string(),
            anon_key: "anon".to_string(),
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn builds_social_authorize_url() {
        let url =
            client().social_authorize_url(SocialProvider::Google, "http://localhost:5173/main");
        assert_eq!(
            url,
            "https://demo.supabase.co/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fmain"
        );
    }

    #[test]
    fn rest_paths() {
        assert_eq!(client().rest("favorites"), "https://demo.supabase.co/rest/v1/favorites");
    }

    #[test]
    fn sign_up_response_without_session() {
        let parsed: SignUpResponse =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.co"}"#).unwrap();
        assert!(matches!(parsed, SignUpResponse::User(ref u) if u.id == "u1"));
    }

    #[tokio::test]
    async fn no_token_means_no_current_user() {
        assert_eq!(client().current_user().await.unwrap(), None);
    }
}
