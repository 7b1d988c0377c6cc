use std::sync::Arc;

use shared::{BoundingBox, Coordinate, MarkerData, RouteResult};

/// One-shot instruction from the state container to the render surface.
///
/// Commands are applied in issue order. Replaying a sequence is safe, but
/// reordering it is not (`ClearMarkers` then `AddMarker` differs from the
/// reverse). An `AddMarker` whose id is already drawn replaces that marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    MoveTo {
        position: Coordinate,
        zoom: Option<u8>,
        animate: bool,
    },
    ZoomTo {
        zoom: u8,
        animate: bool,
    },
    ZoomIn,
    ZoomOut,
    FitBounds {
        bounds: BoundingBox,
        padding: u32,
    },
    AddMarker(MarkerData),
    RemoveMarker(String),
    ClearMarkers,
    ShowRoute(Arc<RouteResult>),
    ClearRoute,
    Redraw,
}

impl MapCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "MoveTo",
            Self::ZoomTo { .. } => "ZoomTo",
            Self::ZoomIn => "ZoomIn",
            Self::ZoomOut => "ZoomOut",
            Self::FitBounds { .. } => "FitBounds",
            Self::AddMarker(_) => "AddMarker",
            Self::RemoveMarker(_) => "RemoveMarker",
            Self::ClearMarkers => "ClearMarkers",
            Self::ShowRoute(_) => "ShowRoute",
            Self::ClearRoute => "ClearRoute",
            Self::Redraw => "Redraw",
        }
    }

    /// Whether the command moves the camera.
    pub fn is_camera(&self) -> bool {
        matches!(
            self,
            Self::MoveTo { .. }
                | Self::ZoomTo { .. }
                | Self::ZoomIn
                | Self::ZoomOut
                | Self::FitBounds { .. }
        )
    }
}

/// User interaction reported by the render surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MapReady,
    MapClick(Coordinate),
    MapLongPress(Coordinate),
    MarkerClick(MarkerData),
    MarkerLongPress(MarkerData),
    MarkerDragEnd {
        marker: MarkerData,
        position: Coordinate,
    },
    MapMoveEnd {
        center: Coordinate,
        zoom: u8,
    },
    ZoomChanged(u8),
}
