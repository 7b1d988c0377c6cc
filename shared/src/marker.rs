use serde::{Deserialize, Serialize};

use crate::{format::format_distance, geo::Coordinate};

pub const ROUTE_START_ID: &str = "route_start";
pub const ROUTE_END_ID: &str = "route_end";
/// Waypoint marker ids are this prefix followed by the waypoint index.
pub const WAYPOINT_ID_PREFIX: &str = "waypoint_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    #[default]
    Default,
    Start,
    End,
    Waypoint,
    CurrentLocation,
    Poi,
    SearchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    /// Unique within a marker list.
    pub id: String,
    pub position: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default)]
    pub kind: MarkerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub anchor_x: f32,
    pub anchor_y: f32,
    #[serde(default)]
    pub draggable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl MarkerData {
    /// Bottom-center anchored marker.
    pub fn new(id: impl Into<String>, position: Coordinate) -> Self {
        Self {
            id: id.into(),
            position,
            title: None,
            snippet: None,
            kind: MarkerType::Default,
            icon: None,
            anchor_x: 0.5,
            anchor_y: 1.0,
            draggable: false,
            extra: None,
        }
    }

    /// Marker with a freshly generated id.
    pub fn generated(position: Coordinate) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), position)
    }

    /// Pin dropped by a long press on the map.
    pub fn dropped_pin(position: Coordinate) -> Self {
        Self::generated(position).with_title("Dropped pin")
    }

    pub fn route_start(position: Coordinate) -> Self {
        Self::new(ROUTE_START_ID, position)
            .with_title("Start")
            .with_kind(MarkerType::Start)
    }

    pub fn route_end(position: Coordinate) -> Self {
        Self::new(ROUTE_END_ID, position)
            .with_title("Destination")
            .with_kind(MarkerType::End)
    }

    /// Intermediate stop `index` (zero-based) of a planned route.
    pub fn waypoint(index: usize, position: Coordinate) -> Self {
        Self::new(format!("{WAYPOINT_ID_PREFIX}{index}"), position)
            .with_title(format!("Waypoint {}", index + 1))
            .with_kind(MarkerType::Waypoint)
    }

    /// Start, end and waypoint markers placed for a planned route.
    pub fn is_route_marker(&self) -> bool {
        match self.kind {
            MarkerType::Start => self.id == ROUTE_START_ID,
            MarkerType::End => self.id == ROUTE_END_ID,
            MarkerType::Waypoint => self.id.starts_with(WAYPOINT_ID_PREFIX),
            _ => false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_kind(mut self, kind: MarkerType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Anchor fractions are clamped to [0, 1].
    pub fn with_anchor(mut self, x: f32, y: f32) -> Self {
        self.anchor_x = clamp_unit(x);
        self.anchor_y = clamp_unit(y);
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A point of interest as returned by the search or favorites collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub position: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Meters from the search origin, when the search computed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl PoiRecord {
    pub fn marker_id(&self) -> String {
        format!("poi_{}", self.id)
    }

    pub fn formatted_distance(&self) -> Option<String> {
        self.distance_m.map(format_distance)
    }

    /// `kind` is usually `Poi` or `SearchResult`.
    pub fn to_marker(&self, kind: MarkerType) -> MarkerData {
        let mut marker = MarkerData::new(self.marker_id(), self.position)
            .with_title(self.name.clone())
            .with_kind(kind)
            .with_extra(serde_json::json!({ "poi_id": self.id, "category": self.category }));
        if let Some(address) = &self.address {
            marker = marker.with_snippet(address.clone());
        }
        marker
    }
}
