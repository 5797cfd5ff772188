pub mod memory;
pub mod rows;
pub mod sample;
pub mod supabase;
pub mod traits;
pub mod types;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::Result;

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;
pub use traits::{FavoriteStore, IdentityProvider, ListingStore, MessageStore, TourStore};
pub use types::{AuthUser, ListingQuery, SignUpRequest, SocialProvider};

/// Every remote seam the browsing layer talks to.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub listings: Arc<dyn ListingStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub messages: Arc<dyn MessageStore>,
    pub tours: Arc<dyn TourStore>,
}

impl Backend {
    /// Uses one implementation for all seams.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: IdentityProvider + ListingStore + FavoriteStore + MessageStore + TourStore + 'static,
    {
        Self {
            identity: backend.clone(),
            listings: backend.clone(),
            favorites: backend.clone(),
            messages: backend.clone(),
            tours: backend,
        }
    }

    pub fn connect(config: &Config) -> Result<Self> {
        match &config.backend {
            Some(remote) => {
                info!("Connecting to hosted backend at {}", remote.url);
                Ok(Self::from_shared(Arc::new(SupabaseClient::new(remote)?)))
            }
            None => {
                info!("Using in-memory backend with sample listings");
                Ok(Self::from_shared(Arc::new(MemoryBackend::new())))
            }
        }
    }
}
