use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use estate_scout::backend::{ListingQuery, SocialProvider};
use estate_scout::details::DetailView;
use estate_scout::map::{LogCanvas, MapView};
use estate_scout::session::JsonFileStorage;
use estate_scout::{Backend, Config, FavoritesStore, FilterConfig, ListingFeed, SessionStore};

#[derive(Parser)]
#[command(name = "estate-scout")]
#[command(about = "Browse property listings from the command line")]
struct Args {
    /// JSON filter configuration applied to the loaded listings
    #[arg(long, short)]
    filter: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Estate Scout");
    info!("===============");

    let config = Config::from_env().context("Invalid configuration")?;
    let backend = Backend::connect(&config).context("Could not set up backend")?;

    let session = Arc::new(SessionStore::new(
        backend.identity.clone(),
        Arc::new(JsonFileStorage::new(&config.session_file)),
        config.guest_ttl,
    ));
    let identity = match session.restore().await {
        Ok(Some(identity)) => identity,
        Ok(None) => session.guest_sign_in().await.context("Guest sign-in failed")?,
        Err(e) => {
            warn!("Could not restore session: {}", e);
            session.guest_sign_in().await.context("Guest sign-in failed")?
        }
    };
    info!("Browsing as {} ({:?})", identity.name, identity.kind);
    if identity.is_guest() {
        debug!(
            "Sign in with Google: {}",
            session.social_sign_in_url(SocialProvider::Google, &config.oauth_redirect)
        );
    }
    let _guest_expiry = session.schedule_guest_expiry().await?;

    let favorites = Arc::new(FavoritesStore::new(
        backend.favorites.clone(),
        backend.listings.clone(),
        session.subscribe(),
    ));
    let _favorites_sync = favorites.watch();

    let filter = match &args.filter {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Could not read filter file {}", path.display()))?;
            serde_json::from_str::<FilterConfig>(&raw)
                .with_context(|| format!("Invalid filter file {}", path.display()))?
        }
        None => FilterConfig::default(),
    };
    if filter.is_active() {
        info!("Filters are active");
    }

    let feed = ListingFeed::new(backend.listings.clone());
    feed.refresh(&ListingQuery::default())
        .await
        .context("Could not load listings")?;
    let listings = feed.visible(&filter);

    let map = MapView::new(LogCanvas);
    map.render(&listings);

    info!("\n✅ {} listings match\n", listings.len());
    for (i, listing) in listings.iter().enumerate() {
        let saved = if favorites.is_favorite(listing.id) { " ♥" } else { "" };
        println!("{}. {} ({}){}", i + 1, listing.title, listing.price_formatted, saved);
        println!(
            "   {} bd, {} ba, {} sqft, built {}",
            listing.bedrooms, listing.bathrooms, listing.sqft, listing.year_built
        );
        println!("   {}, {}", listing.location.address, listing.location.city);
        println!("   {} | {}", listing.property_type, listing.status);
        println!("   Features: {}", listing.features.join(", "));
        println!();
    }

    if let Some(first) = listings.first() {
        if let Some(detail) = DetailView::open(
            backend.listings.clone(),
            &session,
            first.id,
            config.mortgage_offer_delay,
        )
        .await?
        {
            let estimate = detail.mortgage_estimate();
            println!(
                "💰 {}: about ${}/month with ${} down",
                detail.listing().title,
                estimate.monthly_payment,
                estimate.down_payment
            );
        }
    }

    Ok(())
}
