//! Map view: listing markers and their selection events.
//!
//! Drawing is delegated to a [`MapCanvas`], the seam to whatever mapping SDK
//! hosts the map. The view owns marker placement and selection dispatch.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{format_price_compact, Listing, ListingId};

pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 32.7157,
    lng: -117.1611,
};
pub const DEFAULT_ZOOM: u8 = 11;
pub const MIN_ZOOM: u8 = 10;
pub const MAX_ZOOM: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

pub fn clamp_zoom(zoom: u8) -> u8 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub listing_id: ListingId,
    pub position: LatLng,
    pub label: String,
}

impl MapMarker {
    pub fn for_listing(listing: &Listing) -> Self {
        Self {
            listing_id: listing.id,
            position: LatLng {
                lat: listing.location.latitude,
                lng: listing.location.longitude,
            },
            label: format_price_compact(listing.price),
        }
    }
}

/// A marker was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub listing_id: ListingId,
}

pub trait MapCanvas: Send {
    fn clear_markers(&mut self);

    fn place_marker(&mut self, marker: &MapMarker);

    fn set_view(&mut self, center: LatLng, zoom: u8);
}

/// Canvas that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LogCanvas;

impl MapCanvas for LogCanvas {
    fn clear_markers(&mut self) {
        debug!("Map cleared");
    }

    fn place_marker(&mut self, marker: &MapMarker) {
        info!(
            "Marker {} at ({:.4}, {:.4}) for listing {}",
            marker.label, marker.position.lat, marker.position.lng, marker.listing_id
        );
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        info!("Map centered on ({:.4}, {:.4}) at zoom {}", center.lat, center.lng, zoom);
    }
}

struct MapState<C> {
    canvas: C,
    markers: Vec<MapMarker>,
    subscribers: Vec<mpsc::UnboundedSender<SelectionEvent>>,
}

pub struct MapView<C: MapCanvas> {
    state: Mutex<MapState<C>>,
}

impl<C: MapCanvas> MapView<C> {
    pub fn new(canvas: C) -> Self {
        Self {
            state: Mutex::new(MapState {
                canvas,
                markers: Vec::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Replaces all markers with one per listing and recenters the map on
    /// their mean position (the default center when there are none).
    pub fn render(&self, listings: &[Listing]) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;

        state.canvas.clear_markers();
        state.markers = listings.iter().map(MapMarker::for_listing).collect();
        for marker in &state.markers {
            state.canvas.place_marker(marker);
        }
        state.canvas.set_view(center_of(&state.markers), DEFAULT_ZOOM);
    }

    pub fn markers(&self) -> Vec<MapMarker> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .markers
            .clone()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SelectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .push(tx);
        rx
    }

    /// Dispatches a selection for the marker of `listing_id`. Returns `None`
    /// when no such marker is on the map.
    pub fn activate(&self, listing_id: ListingId) -> Option<SelectionEvent> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.markers.iter().any(|m| m.listing_id == listing_id) {
            debug!("No marker for listing {}", listing_id);
            return None;
        }
        let event = SelectionEvent { listing_id };
        state.subscribers.retain(|tx| tx.send(event).is_ok());
        Some(event)
    }

    pub fn set_zoom(&self, center: LatLng, zoom: u8) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.canvas.set_view(center, clamp_zoom(zoom));
    }

    pub fn into_canvas(self) -> C {
        self.state.into_inner().unwrap_or_else(|e| e.into_inner()).canvas
    }
}

fn center_of(markers: &[MapMarker]) -> LatLng {
    if markers.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = markers.len() as f64;
    let (lat, lng) = markers
        .iter()
        .fold((0.0, 0.0), |(lat, lng), m| (lat + m.position.lat, lng + m.position.lng));
    LatLng {
        lat: lat / n,
        lng: lng / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sample::sample_listings;

    #[derive(Debug, Default)]
    struct RecordingCanvas {
        placed: Vec<MapMarker>,
        clears: usize,
        view: Option<(LatLng, u8)>,
    }

    impl MapCanvas for RecordingCanvas {
        fn clear_markers(&mut self) {
            self.clears += 1;
            self.placed.clear();
        }

        fn place_marker(&mut self, marker: &MapMarker) {
            self.placed.push(marker.clone());
        }

        fn set_view(&mut self, center: LatLng, zoom: u8) {
            self.view = Some((center, zoom));
        }
    }

    #[test]
    fn renders_one_marker_per_listing() {
        let listings = sample_listings();
        let view = MapView::new(RecordingCanvas::default());
        view.render(&listings);
        view.render(&listings[..2]);

        let canvas = view.into_canvas();
        assert_eq!(canvas.clears, 2);
        assert_eq!(canvas.placed.len(), 2);
        assert_eq!(canvas.placed[0].label, "$875K");
        assert_eq!(canvas.placed[0].position.lat, 32.8328);
        assert_eq!(canvas.view.map(|(_, zoom)| zoom), Some(DEFAULT_ZOOM));
    }

    #[test]
    fn empty_map_uses_default_center() {
        let view = MapView::new(RecordingCanvas::default());
        view.render(&[]);
        assert_eq!(view.into_canvas().view, Some((DEFAULT_CENTER, DEFAULT_ZOOM)));
    }

    #[tokio::test]
    async fn activation_reaches_every_subscriber() {
        let view = MapView::new(RecordingCanvas::default());
        view.render(&sample_listings());
        let mut first = view.subscribe();
        let mut second = view.subscribe();

        assert_eq!(view.activate(3), Some(SelectionEvent { listing_id: 3 }));
        assert_eq!(first.recv().await, Some(SelectionEvent { listing_id: 3 }));
        assert_eq!(second.recv().await, Some(SelectionEvent { listing_id: 3 }));
    }

    #[test]
    fn unknown_marker_dispatches_nothing() {
        let view = MapView::new(RecordingCanvas::default());
        view.render(&sample_listings());
        let mut rx = view.subscribe();
        drop(view.subscribe());

        assert_eq!(view.activate(42), None);
        assert!(rx.try_recv().is_err());
        assert!(view.activate(1).is_some());
        assert_eq!(view.state.lock().unwrap().subscribers.len(), 1);
    }

    #[test]
    fn zoom_is_clamped() {
        assert_eq!(clamp_zoom(3), MIN_ZOOM);
        assert_eq!(clamp_zoom(12), 12);
        assert_eq!(clamp_zoom(20), MAX_ZOOM);

        let view = MapView::new(RecordingCanvas::default());
        view.set_zoom(DEFAULT_CENTER, 18);
        assert_eq!(view.into_canvas().view, Some((DEFAULT_CENTER, MAX_ZOOM)));
    }
}
