use serde::{Deserialize, Serialize};
use std::fmt;

pub mod activity;
pub mod identity;

pub use activity::{Message, NewMessage, NewTour, Tour, TourStatus};
pub use identity::{AccountKind, Identity, IdentityKind, Profile, ProfileUpdate};

pub type ListingId = i64;

/// Shown when a listing was published without photos.
pub const PLACEHOLDER_IMAGE: &str =
    "https://images.unsplash.com/photo-1580587771525-78b9dba3b914?auto=format&fit=crop&w=800&h=600";

/// Kind of property being sold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyType {
    #[serde(rename = "Single Family")]
    SingleFamily,
    Condo,
    Townhouse,
    #[serde(rename = "Multi-Family")]
    MultiFamily,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::SingleFamily,
        PropertyType::Condo,
        PropertyType::Townhouse,
        PropertyType::MultiFamily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::SingleFamily => "Single Family",
            PropertyType::Condo => "Condo",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::MultiFamily => "Multi-Family",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market status of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListingStatus {
    #[serde(rename = "For Sale")]
    ForSale,
    Pending,
    Sold,
    #[serde(rename = "Off Market")]
    OffMarket,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::ForSale => "For Sale",
            ListingStatus::Pending => "Pending",
            ListingStatus::Sold => "Sold",
            ListingStatus::OffMarket => "Off Market",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location information for a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Contact card of the listing agent, embedded in every listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub photo: String,
    pub company: String,
}

impl Default for AgentContact {
    fn default() -> Self {
        Self {
            name: "Unknown Agent".to_string(),
            phone: String::new(),
            email: String::new(),
            photo: String::new(),
            company: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schools {
    pub elementary: Option<String>,
    pub middle: Option<String>,
    pub high: Option<String>,
}

/// Flat display model of a property listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub price: i64,
    pub price_formatted: String,
    pub location: Location,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub sqft: u32,
    pub lot_size: Option<String>,
    pub year_built: i32,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub description: String,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub agent: AgentContact,
    /// Owning agent's identity id
    pub agent_id: Option<String>,
    pub days_on_market: u32,
    pub mls_number: String,
    pub virtual_tour: Option<String>,
    pub schools: Schools,
}

impl Listing {
    pub fn primary_image(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_IMAGE)
    }

    pub fn is_owned_by(&self, agent_id: &str) -> bool {
        self.agent_id.as_deref() == Some(agent_id)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Fields an agent fills in when publishing a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub price: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub sqft: u32,
    pub lot_size: Option<String>,
    pub year_built: i32,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub description: String,
    pub features: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub virtual_tour: Option<String>,
}

/// Partial update of a listing; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl ListingUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ListingUpdate::default()
    }

    /// Applies the set fields to an already normalized listing.
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(title) = &self.title {
            listing.title = title.clone();
        }
        if let Some(price) = self.price {
            listing.price = price;
            listing.price_formatted = format_price(price);
        }
        if let Some(address) = &self.address {
            listing.location.address = address.clone();
        }
        if let Some(city) = &self.city {
            listing.location.city = city.clone();
        }
        if let Some(state) = &self.state {
            listing.location.state = state.clone();
        }
        if let Some(zip) = &self.zip_code {
            listing.location.zip_code = zip.clone();
        }
        if let Some(bedrooms) = self.bedrooms {
            listing.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(sqft) = self.sqft {
            listing.sqft = sqft;
        }
        if let Some(year) = self.year_built {
            listing.year_built = year;
        }
        if let Some(kind) = self.property_type {
            listing.property_type = kind;
        }
        if let Some(status) = self.status {
            listing.status = status;
        }
        if let Some(description) = &self.description {
            listing.description = description.clone();
        }
        if let Some(features) = &self.features {
            listing.features = features.clone();
        }
    }
}

/// `$875,000`
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Short price used on map markers: `$875K`, `$1.2M`
pub fn format_price_compact(price: i64) -> String {
    let thousands = (price as f64 / 1_000.0).round() as i64;
    if thousands >= 1_000 {
        let millions = price as f64 / 1_000_000.0;
        let text = format!("{millions:.1}");
        format!("${}M", text.trim_end_matches(".0"))
    } else if price >= 1_000 {
        format!("${thousands}K")
    } else {
        format!("${price}")
    }
}
