use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{Listing, ListingStatus, PropertyType};

/// Slider extremes offered by the browse screen. A range sitting on these
/// extremes does not count as an active filter.
pub const PRICE_SLIDER: Bounds = Bounds { min: 0, max: 2_000_000 };
pub const SQFT_SLIDER: Bounds = Bounds { min: 0, max: 5_000 };
pub const YEAR_BUILT_SLIDER: Bounds = Bounds { min: 1900, max: 2024 };

/// Inclusive range where `0` on either side means "unbounded"
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        if self.min > 0 && value < self.min {
            return false;
        }
        if self.max > 0 && value > self.max {
            return false;
        }
        true
    }

    /// True when the range excludes something the slider could show.
    fn narrows(&self, slider: Bounds) -> bool {
        self.min > slider.min || (self.max > 0 && self.max < slider.max)
    }
}

/// Client-side filter applied to fetched listings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub price_range: Bounds,
    /// "N+ beds" thresholds, OR'd together
    pub bedrooms: BTreeSet<u32>,
    /// "N+ baths" thresholds, OR'd together
    pub bathrooms: BTreeSet<u32>,
    pub property_types: BTreeSet<PropertyType>,
    pub status: BTreeSet<ListingStatus>,
    pub sqft_range: Bounds,
    pub year_built_range: Bounds,
    pub features: BTreeSet<String>,
}

impl FilterConfig {
    pub fn matches(&self, listing: &Listing) -> bool {
        matches(listing, self)
    }

    /// Stable: keeps the relative order of `listings`.
    pub fn apply<'a, I>(&self, listings: I) -> Vec<Listing>
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        listings
            .into_iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect()
    }

    pub fn reset(&mut self) {
        *self = FilterConfig::default();
    }

    /// Whether the browse screen should show the "filters on" badge.
    pub fn is_active(&self) -> bool {
        self.price_range.narrows(PRICE_SLIDER)
            || self.sqft_range.narrows(SQFT_SLIDER)
            || self.year_built_range.narrows(YEAR_BUILT_SLIDER)
            || !self.bedrooms.is_empty()
            || !self.bathrooms.is_empty()
            || !self.property_types.is_empty()
            || !self.status.is_empty()
            || !self.features.is_empty()
    }
}

/// True iff `listing` passes every clause of `config`.
pub fn matches(listing: &Listing, config: &FilterConfig) -> bool {
    config.price_range.contains(listing.price)
        && meets_any_threshold(&config.bedrooms, listing.bedrooms as f32)
        && meets_any_threshold(&config.bathrooms, listing.bathrooms)
        && (config.property_types.is_empty()
            || config.property_types.contains(&listing.property_type))
        && (config.status.is_empty() || config.status.contains(&listing.status))
        && config.sqft_range.contains(i64::from(listing.sqft))
        && config.year_built_range.contains(i64::from(listing.year_built))
        && (config.features.is_empty()
            || listing.features.iter().any(|f| config.features.contains(f)))
}

fn meets_any_threshold(thresholds: &BTreeSet<u32>, value: f32) -> bool {
    thresholds.is_empty() || thresholds.iter().any(|&t| t as f32 <= value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sample::sample_listings;

    fn listing_with(f: impl FnOnce(&mut Listing)) -> Listing {
        let mut listing = sample_listings().remove(0);
        f(&mut listing);
        listing
    }

    #[test]
    fn default_config_matches_everything() {
        let config = FilterConfig::default();
        for listing in sample_listings() {
            assert!(matches(&listing, &config), "listing {} hidden", listing.id);
        }
        assert!(!config.is_active());
    }

    #[test]
    fn price_min_above_price_hides_listing() {
        let listing = listing_with(|l| {
            l.price = 500_000;
            l.bedrooms = 9;
        });
        let mut config = FilterConfig::default();
        config.price_range = Bounds::new(500_001, 0);
        assert!(!matches(&listing, &config));

        config.price_range = Bounds::new(500_000, 500_000);
        assert!(matches(&listing, &config));
    }

    #[test]
    fn bedroom_thresholds_are_or_of_minimums() {
        let mut config = FilterConfig::default();
        config.bedrooms = [2, 4].into_iter().collect();

        assert!(matches(&listing_with(|l| l.bedrooms = 3), &config));
        assert!(!matches(&listing_with(|l| l.bedrooms = 1), &config));
    }

    #[test]
    fn bathroom_thresholds_accept_fractional_baths() {
        let mut config = FilterConfig::default();
        config.bathrooms = [3].into_iter().collect();

        assert!(matches(&listing_with(|l| l.bathrooms = 3.5), &config));
        assert!(!matches(&listing_with(|l| l.bathrooms = 2.5), &config));
    }

    #[test]
    fn features_need_one_common_tag() {
        let mut config = FilterConfig::default();
        config.features = ["Fireplace".to_string()].into_iter().collect();

        let both = listing_with(|l| l.features = vec!["Fireplace".into(), "Garage".into()]);
        let garage = listing_with(|l| l.features = vec!["Garage".into()]);
        assert!(matches(&both, &config));
        assert!(!matches(&garage, &config));
    }

    #[test]
    fn type_and_status_sets() {
        let mut config = FilterConfig::default();
        config.property_types = [PropertyType::Condo].into_iter().collect();
        assert!(!matches(&listing_with(|l| l.property_type = PropertyType::Townhouse), &config));

        config.property_types.clear();
        config.status = [ListingStatus::Pending, ListingStatus::Sold].into_iter().collect();
        assert!(matches(&listing_with(|l| l.status = ListingStatus::Sold), &config));
        assert!(!matches(&listing_with(|l| l.status = ListingStatus::ForSale), &config));
    }

    #[test]
    fn sqft_and_year_ranges() {
        let mut config = FilterConfig::default();
        config.sqft_range = Bounds::new(1_000, 2_000);
        config.year_built_range = Bounds::new(2000, 0);

        assert!(matches(&listing_with(|l| { l.sqft = 1_500; l.year_built = 2005 }), &config));
        assert!(!matches(&listing_with(|l| { l.sqft = 2_500; l.year_built = 2005 }), &config));
        assert!(!matches(&listing_with(|l| { l.sqft = 1_500; l.year_built = 1925 }), &config));
    }

    #[test]
    fn sample_scenario_selects_mid_priced_family_homes() {
        let listings = sample_listings();
        let config = FilterConfig {
            price_range: Bounds::new(600_000, 900_000),
            bedrooms: [3].into_iter().collect(),
            property_types: [PropertyType::SingleFamily].into_iter().collect(),
            ..FilterConfig::default()
        };

        let visible: Vec<i64> = config.apply(&listings).iter().map(|l| l.id).collect();
        assert_eq!(visible, vec![1, 3]);
        assert!(config.is_active());
    }

    #[test]
    fn slider_extremes_are_not_active() {
        let mut config = FilterConfig {
            price_range: PRICE_SLIDER,
            sqft_range: SQFT_SLIDER,
            year_built_range: YEAR_BUILT_SLIDER,
            ..FilterConfig::default()
        };
        assert!(!config.is_active());

        config.year_built_range.max = 2000;
        assert!(config.is_active());
        config.reset();
        assert_eq!(config, FilterConfig::default());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: FilterConfig = serde_json::from_str(
            r#"{"priceRange":{"min":600000,"max":900000},"bedrooms":[3],"propertyTypes":["Single Family"]}"#,
        )
        .unwrap();
        assert_eq!(config.price_range, Bounds::new(600_000, 900_000));
        assert!(config.features.is_empty());
    }
}
