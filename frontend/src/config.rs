use std::{env, str::FromStr};

use serde::Deserialize;
use shared::{Coordinate, DEFAULT_CENTER};

use crate::state::{clamp_zoom, DEFAULT_ZOOM};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub default_center: Coordinate,
    pub default_zoom: u8,
    pub current_location_zoom: u8,
    /// Pixels of padding around fitted bounds.
    pub fit_bounds_padding: u32,
    pub command_buffer: usize,
    pub inbox_buffer: usize,
    pub event_broadcast_capacity: usize,
    pub instruction_threshold_m: f64,
    pub arrival_threshold_m: f64,
    pub off_route_threshold_m: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            current_location_zoom: 16,
            fit_bounds_padding: 50,
            command_buffer: 64,
            inbox_buffer: 64,
            event_broadcast_capacity: 64,
            instruction_threshold_m: 30.0,
            arrival_threshold_m: 20.0,
            off_route_threshold_m: 60.0,
        }
    }
}

impl MapConfig {
    /// Defaults overridden by `MAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(zoom) = parse_var::<u8, _>(&lookup, "MAP_DEFAULT_ZOOM") {
            self.default_zoom = clamp_zoom(zoom);
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "MAP_COMMAND_BUFFER") {
            // tokio rejects zero-capacity channels
            self.command_buffer = capacity.max(1);
        }
        if let Some(padding) = parse_var(&lookup, "MAP_FIT_PADDING") {
            self.fit_bounds_padding = padding;
        }
        let lat = parse_var(&lookup, "MAP_DEFAULT_LAT").unwrap_or(self.default_center.lat);
        let lon = parse_var(&lookup, "MAP_DEFAULT_LON").unwrap_or(self.default_center.lon);
        match Coordinate::try_new(lat, lon) {
            Ok(center) => self.default_center = center,
            Err(err) => tracing::warn!("ignoring configured map center: {err}"),
        }
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring unparsable {key}={raw:?}");
            None
        }
    }
}
