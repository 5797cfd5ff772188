//! Real-estate browsing: sessions, listings, filters, favorites, map markers,
//! messaging and tours over a hosted backend.

pub mod agent;
pub mod backend;
pub mod config;
pub mod details;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod listings;
pub mod loadable;
pub mod map;
pub mod messages;
pub mod models;
pub mod mortgage;
pub mod schedule;
pub mod session;
pub mod tours;
pub mod validation;

pub use backend::Backend;
pub use config::Config;
pub use error::{AppError, Result};
pub use favorites::FavoritesStore;
pub use filter::FilterConfig;
pub use listings::ListingFeed;
pub use models::{Identity, IdentityKind, Listing, ListingId};
pub use session::SessionStore;
