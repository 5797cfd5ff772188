//! Five San Diego listings used by the offline backend and by tests.

use crate::models::{
    format_price, AgentContact, IdentityKind, Listing, ListingStatus, Location, Profile,
    PropertyType, Schools,
};

struct Seed {
    id: i64,
    title: &'static str,
    price: i64,
    address: &'static str,
    city: &'static str,
    zip: &'static str,
    beds: u32,
    baths: f32,
    sqft: u32,
    lot: Option<&'static str>,
    year: i32,
    kind: PropertyType,
    features: &'static [&'static str],
    agent: usize,
    coords: (f64, f64),
    days: u32,
    mls: &'static str,
    schools: Option<[&'static str; 3]>,
}

const PHOTOS: [&str; 4] = [
    "https://images.pexels.com/photos/1396122/pexels-photo-1396122.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/1643383/pexels-photo-1643383.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/2121121/pexels-photo-2121121.jpeg?auto=compress&cs=tinysrgb&w=800",
    "https://images.pexels.com/photos/1571460/pexels-photo-1571460.jpeg?auto=compress&cs=tinysrgb&w=800",
];

/// (id, name, email, phone, company)
pub const SAMPLE_AGENTS: [(&str, &str, &str, &str, &str); 5] = [
    (
        "agent-sarah",
        "Sarah Martinez",
        "agent@realestate.com",
        "(619) 555-0123",
        "Pacific Coast Realty",
    ),
    (
        "agent-michael",
        "Michael Chen",
        "john.agent@estate.com",
        "(619) 555-0456",
        "Urban Realty Group",
    ),
    (
        "agent-jennifer",
        "Jennifer Lopez",
        "jennifer.lopez@heritagehomes.com",
        "(619) 555-0789",
        "Heritage Homes Realty",
    ),
    (
        "agent-david",
        "David Wilson",
        "david.wilson@familyhomes.com",
        "(858) 555-0321",
        "Family Homes Realty",
    ),
    (
        "agent-amanda",
        "Amanda Rodriguez",
        "amanda.rodriguez@beachrealty.com",
        "(619) 555-0654",
        "Beach Realty Co.",
    ),
];

const SEEDS: [Seed; 5] = [
    Seed {
        id: 1,
        title: "Stunning Ocean View Home in La Jolla",
        price: 875_000,
        address: "7842 Eads Avenue",
        city: "La Jolla",
        zip: "92037",
        beds: 3,
        baths: 2.0,
        sqft: 1850,
        lot: Some("0.25 acres"),
        year: 2018,
        kind: PropertyType::SingleFamily,
        features: &[
            "Ocean Views",
            "Modern Kitchen",
            "Hardwood Floors",
            "Two-Car Garage",
            "Private Patio",
            "Walk to Beach",
        ],
        agent: 0,
        coords: (32.8328, -117.2713),
        days: 12,
        mls: "SD1234567",
        schools: Some(["La Jolla Elementary", "Muirlands Middle School", "La Jolla High School"]),
    },
    Seed {
        id: 2,
        title: "Modern Downtown Condo with City Views",
        price: 650_000,
        address: "1240 India Street #502",
        city: "San Diego",
        zip: "92101",
        beds: 2,
        baths: 2.0,
        sqft: 1200,
        lot: None,
        year: 2020,
        kind: PropertyType::Condo,
        features: &[
            "City Views",
            "Rooftop Pool",
            "Fitness Center",
            "Concierge",
            "In-Unit Laundry",
            "Balcony",
        ],
        agent: 1,
        coords: (32.7157, -117.1611),
        days: 8,
        mls: "SD2345678",
        schools: None,
    },
    Seed {
        id: 3,
        title: "Charming Craftsman in North Park",
        price: 720_000,
        address: "3456 30th Street",
        city: "San Diego",
        zip: "92104",
        beds: 3,
        baths: 2.0,
        sqft: 1650,
        lot: Some("0.15 acres"),
        year: 1925,
        kind: PropertyType::SingleFamily,
        features: &[
            "Historic Charm",
            "Hardwood Floors",
            "Updated Kitchen",
            "Front Porch",
            "Mature Trees",
        ],
        agent: 2,
        coords: (32.7441, -117.1294),
        days: 25,
        mls: "SD3456789",
        schools: None,
    },
    Seed {
        id: 4,
        title: "Family Home in Scripps Ranch",
        price: 425_000,
        address: "10234 Scripps Lake Drive",
        city: "San Diego",
        zip: "92131",
        beds: 4,
        baths: 3.0,
        sqft: 2200,
        lot: Some("0.3 acres"),
        year: 1995,
        kind: PropertyType::SingleFamily,
        features: &[
            "Vaulted Ceilings",
            "Fireplace",
            "Large Backyard",
            "Two-Car Garage",
            "Family Room",
        ],
        agent: 3,
        coords: (32.9089, -117.1311),
        days: 18,
        mls: "SD4567890",
        schools: Some([
            "Scripps Elementary",
            "Marshall Middle School",
            "Scripps Ranch High School",
        ]),
    },
    Seed {
        id: 5,
        title: "Beachside Townhouse in Mission Beach",
        price: 590_000,
        address: "742 Seagull Court",
        city: "San Diego",
        zip: "92109",
        beds: 2,
        baths: 2.0,
        sqft: 1100,
        lot: None,
        year: 2010,
        kind: PropertyType::Townhouse,
        features: &[
            "Steps to Beach",
            "Private Patio",
            "Open Layout",
            "Walk to Boardwalk",
            "Assigned Parking",
        ],
        agent: 4,
        coords: (32.7701, -117.2528),
        days: 6,
        mls: "SD5678901",
        schools: None,
    },
];

pub fn sample_listings() -> Vec<Listing> {
    SEEDS.iter().map(to_listing).collect()
}

pub fn sample_agent_profiles() -> Vec<Profile> {
    SAMPLE_AGENTS
        .iter()
        .map(|(id, name, email, phone, company)| Profile {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            user_type: IdentityKind::Agent,
            phone: Some(phone.to_string()),
            company: Some(company.to_string()),
            photo_url: None,
            created_at: None,
        })
        .collect()
}

fn to_listing(seed: &Seed) -> Listing {
    let (agent_id, name, email, phone, company) = SAMPLE_AGENTS[seed.agent];
    let images = PHOTOS
        .iter()
        .cycle()
        .skip(seed.id as usize - 1)
        .take(PHOTOS.len())
        .map(|url| url.to_string())
        .collect();

    Listing {
        id: seed.id,
        title: seed.title.to_string(),
        price: seed.price,
        price_formatted: format_price(seed.price),
        location: Location {
            address: seed.address.to_string(),
            city: seed.city.to_string(),
            state: "CA".to_string(),
            zip_code: seed.zip.to_string(),
            latitude: seed.coords.0,
            longitude: seed.coords.1,
        },
        bedrooms: seed.beds,
        bathrooms: seed.baths,
        sqft: seed.sqft,
        lot_size: seed.lot.map(str::to_string),
        year_built: seed.year,
        property_type: seed.kind,
        status: ListingStatus::ForSale,
        description: format!("{} in {}.", seed.title, seed.city),
        features: seed.features.iter().map(|f| f.to_string()).collect(),
        images,
        agent: AgentContact {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            photo: String::new(),
            company: company.to_string(),
        },
        agent_id: Some(agent_id.to_string()),
        days_on_market: seed.days,
        mls_number: seed.mls.to_string(),
        virtual_tour: None,
        schools: seed
            .schools
            .map(|[elementary, middle, high]| Schools {
                elementary: Some(elementary.to_string()),
                middle: Some(middle.to_string()),
                high: Some(high.to_string()),
            })
            .unwrap_or_default(),
    }
}
