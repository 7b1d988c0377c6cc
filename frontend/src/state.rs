use std::sync::Arc;

use shared::{Coordinate, MarkerData, RouteResult};

use crate::config::MapConfig;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;
pub const DEFAULT_ZOOM: u8 = 14;

pub fn clamp_zoom(zoom: u8) -> u8 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Authoritative snapshot of what the map should show.
///
/// Only the reducer produces new values; everyone else reads.
#[derive(Debug, Clone, PartialEq)]
pub struct MapUiState {
    pub center: Coordinate,
    pub zoom: u8,
    pub markers: Vec<MarkerData>,
    pub route: Option<Arc<RouteResult>>,
    pub show_current_location: bool,
    pub current_location: Option<Coordinate>,
    pub is_loading: bool,
    pub loading_message: Option<String>,
    pub error: Option<String>,
    pub is_map_ready: bool,
    /// Id of the route request whose result is still awaited.
    pub pending_route_request: Option<u64>,
}

impl MapUiState {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            center: config.default_center,
            zoom: clamp_zoom(config.default_zoom),
            ..Self::default()
        }
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerData> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    pub fn has_route(&self) -> bool {
        self.route.is_some()
    }
}

impl Default for MapUiState {
    fn default() -> Self {
        Self {
            center: shared::DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            markers: Vec::new(),
            route: None,
            show_current_location: false,
            current_location: None,
            is_loading: false,
            loading_message: None,
            error: None,
            is_map_ready: false,
            pending_route_request: None,
        }
    }
}
