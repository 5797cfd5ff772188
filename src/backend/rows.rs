//! Wire rows of the hosted relational store and their normalization into the
//! flat display model.

use serde::{Deserialize, Serialize};

use crate::models::{
    format_price, AgentContact, Listing, ListingDraft, ListingId, ListingStatus, Location,
    PropertyType, Schools, PLACEHOLDER_IMAGE,
};

/// Embedded resources requested alongside every listing row.
pub const LISTING_SELECT: &str = "*,\
property_images(url,is_primary,display_order),\
schools(elementary_school,middle_school,high_school),\
profiles!properties_agent_id_fkey(name,email,phone,photo_url,company)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRow {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoolRow {
    pub elementary_school: Option<String>,
    pub middle_school: Option<String>,
    pub high_school: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRow {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRow {
    pub id: ListingId,
    pub title: String,
    pub price: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub sqft: u32,
    #[serde(default)]
    pub lot_size: Option<String>,
    pub year_built: i32,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub days_on_market: Option<u32>,
    #[serde(default)]
    pub mls_number: Option<String>,
    #[serde(default)]
    pub virtual_tour_url: Option<String>,
    #[serde(default)]
    pub property_images: Vec<ImageRow>,
    #[serde(default)]
    pub schools: Vec<SchoolRow>,
    #[serde(default, rename = "profiles")]
    pub agent: Option<AgentRow>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        let mut images = row.property_images;
        images.sort_by_key(|img| img.display_order);
        let mut images: Vec<String> = images.into_iter().map(|img| img.url).collect();
        if images.is_empty() {
            images.push(PLACEHOLDER_IMAGE.to_string());
        }

        let agent = row.agent.unwrap_or_default();
        let defaults = AgentContact::default();
        let school = row.schools.into_iter().next().unwrap_or_default();

        Listing {
            id: row.id,
            title: row.title,
            price: row.price,
            price_formatted: format_price(row.price),
            location: Location {
                address: row.address,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            sqft: row.sqft,
            lot_size: row.lot_size,
            year_built: row.year_built,
            property_type: row.property_type,
            status: row.status,
            description: row.description,
            features: row.features.unwrap_or_default(),
            images,
            agent: AgentContact {
                name: agent.name.unwrap_or(defaults.name),
                phone: agent.phone.unwrap_or_default(),
                email: agent.email.unwrap_or_default(),
                photo: agent.photo_url.unwrap_or_default(),
                company: agent.company.unwrap_or_default(),
            },
            agent_id: row.agent_id,
            days_on_market: row.days_on_market.unwrap_or(0),
            mls_number: row.mls_number.unwrap_or_default(),
            virtual_tour: row.virtual_tour_url,
            schools: Schools {
                elementary: school.elementary_school,
                middle: school.middle_school,
                high: school.high_school,
            },
        }
    }
}

/// Insert payload for a new listing row
#[derive(Debug, Clone, Serialize)]
pub struct ListingInsert<'a> {
    pub title: &'a str,
    pub price: i64,
    pub address: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub zip_code: &'a str,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub sqft: u32,
    pub lot_size: Option<&'a str>,
    pub year_built: i32,
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub description: &'a str,
    pub features: &'a [String],
    pub agent_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub days_on_market: u32,
    pub virtual_tour_url: Option<&'a str>,
}

impl<'a> ListingInsert<'a> {
    pub fn new(agent_id: &'a str, draft: &'a ListingDraft) -> Self {
        Self {
            title: &draft.title,
            price: draft.price,
            address: &draft.address,
            city: &draft.city,
            state: &draft.state,
            zip_code: &draft.zip_code,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            sqft: draft.sqft,
            lot_size: draft.lot_size.as_deref(),
            year_built: draft.year_built,
            property_type: draft.property_type,
            status: draft.status,
            description: &draft.description,
            features: &draft.features,
            agent_id,
            latitude: draft.latitude,
            longitude: draft.longitude,
            days_on_market: 0,
            virtual_tour_url: draft.virtual_tour.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInsert<'a> {
    pub property_id: ListingId,
    pub url: &'a str,
    pub display_order: i32,
    pub is_primary: bool,
}

/// The first image becomes the primary one.
pub fn image_inserts(property_id: ListingId, images: &[String]) -> Vec<ImageInsert<'_>> {
    images
        .iter()
        .enumerate()
        .map(|(index, url)| ImageInsert {
            property_id,
            url,
            display_order: index as i32,
            is_primary: index == 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_json() -> serde_json::Value {
        json!({
            "id": 7,
            "title": "Craftsman",
            "price": 720000,
            "address": "3456 30th Street",
            "city": "San Diego",
            "state": "CA",
            "zip_code": "92104",
            "bedrooms": 3,
            "bathrooms": 2,
            "sqft": 1650,
            "lot_size": null,
            "year_built": 1925,
            "property_type": "Single Family",
            "status": "For Sale",
            "description": "Restored",
            "features": ["Front Porch"],
            "agent_id": "agent-1",
            "latitude": 32.7441,
            "longitude": -117.1294,
            "days_on_market": 25,
            "mls_number": null,
            "virtual_tour_url": null,
            "property_images": [
                {"url": "b.jpg", "is_primary": false, "display_order": 1},
                {"url": "a.jpg", "is_primary": true, "display_order": 0}
            ],
            "schools": [{"elementary_school": "Jefferson", "middle_school": null, "high_school": null}],
            "profiles": {"name": "Jennifer", "email": "j@example.com", "phone": null, "photo_url": null, "company": "Heritage"}
        })
    }

    #[test]
    fn normalizes_joined_row() {
        let row: ListingRow = serde_json::from_value(row_json()).unwrap();
        let listing = Listing::from(row);

        assert_eq!(listing.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(listing.price_formatted, "$720,000");
        assert_eq!(listing.agent.name, "Jennifer");
        assert_eq!(listing.agent.phone, "");
        assert_eq!(listing.schools.elementary.as_deref(), Some("Jefferson"));
        assert_eq!(listing.mls_number, "");
        assert!(listing.is_owned_by("agent-1"));
    }

    #[test]
    fn missing_joins_fall_back_to_defaults() {
        let mut value = row_json();
        let obj = value.as_object_mut().unwrap();
        obj.remove("property_images");
        obj.remove("schools");
        obj.insert("profiles".to_string(), serde_json::Value::Null);

        let listing = Listing::from(serde_json::from_value::<ListingRow>(value).unwrap());
        assert_eq!(listing.images, vec![PLACEHOLDER_IMAGE.to_string()]);
        assert_eq!(listing.agent.name, "Unknown Agent");
        assert_eq!(listing.schools, Schools::default());
    }

    #[test]
    fn first_image_is_primary() {
        let images = vec!["one.jpg".to_string(), "two.jpg".to_string()];
        let inserts = image_inserts(9, &images);
        assert!(inserts[0].is_primary);
        assert!(!inserts[1].is_primary);
        assert_eq!(inserts[1].display_order, 1);
    }
}
