use serde::{Deserialize, Serialize};

use crate::models::{AccountKind, PropertyType};

/// Server-side listing query. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingQuery {
    /// City to search in
    pub city: Option<String>,
    /// Two-letter state code
    pub state: Option<String>,
    /// Minimum price (USD)
    pub min_price: Option<i64>,
    /// Maximum price (USD)
    pub max_price: Option<i64>,
    /// Minimum number of bedrooms
    pub min_bedrooms: Option<u32>,
    /// Minimum number of bathrooms
    pub min_bathrooms: Option<f32>,
    pub property_type: Option<PropertyType>,
}

impl ListingQuery {
    /// PostgREST filter pairs, in a stable order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(city) = &self.city {
            params.push(("city", format!("eq.{city}")));
        }
        if let Some(state) = &self.state {
            params.push(("state", format!("eq.{state}")));
        }
        if let Some(min) = self.min_price.filter(|p| *p > 0) {
            params.push(("price", format!("gte.{min}")));
        }
        if let Some(max) = self.max_price.filter(|p| *p > 0) {
            params.push(("price", format!("lte.{max}")));
        }
        if let Some(beds) = self.min_bedrooms.filter(|b| *b > 0) {
            params.push(("bedrooms", format!("gte.{beds}")));
        }
        if let Some(baths) = self.min_bathrooms.filter(|b| *b > 0.0) {
            params.push(("bathrooms", format!("gte.{baths}")));
        }
        if let Some(kind) = self.property_type {
            params.push(("property_type", format!("eq.{}", kind.as_str())));
        }
        params
    }
}

/// Account record returned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub kind: AccountKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Facebook => "facebook",
        }
    }
}
