//! Pure state transitions for the map.
//!
//! `MapReducer::reduce` maps (state, op) to the next state plus the commands
//! the render surface must receive. It performs no I/O; the container applies
//! transitions one at a time.

use std::sync::Arc;

use shared::{BoundingBox, Coordinate, MarkerData, RouteResult};

use crate::{
    command::{MapCommand, MapEvent},
    config::MapConfig,
    state::{clamp_zoom, MapUiState, MAX_ZOOM, MIN_ZOOM},
};

/// A named state transform.
#[derive(Debug, Clone, PartialEq)]
pub enum StateOp {
    MoveTo {
        position: Coordinate,
        zoom: Option<u8>,
        animate: bool,
    },
    MoveToCurrentLocation,
    ZoomTo {
        zoom: u8,
        animate: bool,
    },
    ZoomIn,
    ZoomOut,
    FitBounds {
        bounds: BoundingBox,
        padding: Option<u32>,
    },
    AddMarker(MarkerData),
    RemoveMarker(String),
    ClearMarkers,
    SetMarkers(Vec<MarkerData>),
    /// Replaces the previous start, end and waypoint markers.
    SetStartAndEndMarkers {
        start: Coordinate,
        end: Coordinate,
        waypoints: Vec<Coordinate>,
    },
    MoveMarker {
        id: String,
        position: Coordinate,
    },
    ShowRoute(Arc<RouteResult>),
    ClearRoute {
        clear_markers: bool,
    },
    SetLoading(Option<String>),
    ClearLoading,
    SetError(String),
    ClearError,
    SetCurrentLocation(Coordinate),
    SetShowCurrentLocation(bool),
    Redraw,
    SurfaceReady,
    CameraSettled {
        center: Coordinate,
        zoom: u8,
    },
    ZoomSettled(u8),
    BeginRouteRequest {
        request_id: u64,
        message: Option<String>,
    },
    CompleteRouteRequest {
        request_id: u64,
        outcome: Result<Arc<RouteResult>, String>,
    },
    CancelRouteRequest,
}

impl StateOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "move_to",
            Self::MoveToCurrentLocation => "move_to_current_location",
            Self::ZoomTo { .. } => "zoom_to",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::FitBounds { .. } => "fit_bounds",
            Self::AddMarker(_) => "add_marker",
            Self::RemoveMarker(_) => "remove_marker",
            Self::ClearMarkers => "clear_markers",
            Self::SetMarkers(_) => "set_markers",
            Self::SetStartAndEndMarkers { .. } => "set_start_and_end_markers",
            Self::MoveMarker { .. } => "move_marker",
            Self::ShowRoute(_) => "show_route",
            Self::ClearRoute { .. } => "clear_route",
            Self::SetLoading(_) => "set_loading",
            Self::ClearLoading => "clear_loading",
            Self::SetError(_) => "set_error",
            Self::ClearError => "clear_error",
            Self::SetCurrentLocation(_) => "set_current_location",
            Self::SetShowCurrentLocation(_) => "set_show_current_location",
            Self::Redraw => "redraw",
            Self::SurfaceReady => "surface_ready",
            Self::CameraSettled { .. } => "camera_settled",
            Self::ZoomSettled(_) => "zoom_settled",
            Self::BeginRouteRequest { .. } => "begin_route_request",
            Self::CompleteRouteRequest { .. } => "complete_route_request",
            Self::CancelRouteRequest => "cancel_route_request",
        }
    }

    /// Every coordinate this op would write into the state.
    fn positions(&self) -> Vec<Coordinate> {
        match self {
            Self::MoveTo { position, .. } | Self::MoveMarker { position, .. } => vec![*position],
            Self::SetCurrentLocation(position) => vec![*position],
            Self::CameraSettled { center, .. } => vec![*center],
            Self::FitBounds { bounds, .. } => vec![
                Coordinate::new(bounds.min_lat, bounds.min_lon),
                Coordinate::new(bounds.max_lat, bounds.max_lon),
            ],
            Self::AddMarker(marker) => vec![marker.position],
            Self::SetMarkers(markers) => markers.iter().map(|marker| marker.position).collect(),
            Self::SetStartAndEndMarkers {
                start,
                end,
                waypoints,
            } => [*start, *end].into_iter().chain(waypoints.iter().copied()).collect(),
            _ => Vec::new(),
        }
    }
}

/// The state op a surface event folds into, if any.
///
/// Clicks carry no state of their own; observers react to them through the
/// event broadcast.
pub fn op_for_event(event: &MapEvent) -> Option<StateOp> {
    match event {
        MapEvent::MapReady => Some(StateOp::SurfaceReady),
        MapEvent::MapLongPress(position) => {
            Some(StateOp::AddMarker(MarkerData::dropped_pin(*position)))
        }
        MapEvent::MarkerDragEnd { marker, position } => Some(StateOp::MoveMarker {
            id: marker.id.clone(),
            position: *position,
        }),
        MapEvent::MapMoveEnd { center, zoom } => Some(StateOp::CameraSettled {
            center: *center,
            zoom: *zoom,
        }),
        MapEvent::ZoomChanged(zoom) => Some(StateOp::ZoomSettled(*zoom)),
        MapEvent::MapClick(_) | MapEvent::MarkerClick(_) | MapEvent::MarkerLongPress(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: MapUiState,
    pub commands: Vec<MapCommand>,
}

impl Transition {
    fn unchanged(state: &MapUiState) -> Self {
        Self {
            state: state.clone(),
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapReducer {
    default_center: Coordinate,
    current_location_zoom: u8,
    fit_bounds_padding: u32,
}

impl MapReducer {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            default_center: config.default_center,
            current_location_zoom: clamp_zoom(config.current_location_zoom),
            fit_bounds_padding: config.fit_bounds_padding,
        }
    }

    /// Ops carrying an out-of-range coordinate leave the state untouched.
    pub fn reduce(&self, state: &MapUiState, op: StateOp) -> Transition {
        if let Some(err) = op.positions().iter().find_map(|p| p.validate().err()) {
            tracing::warn!(op = op.name(), "ignoring op: {err}");
            return Transition::unchanged(state);
        }

        let mut next = state.clone();
        let mut commands = Vec::new();

        match op {
            StateOp::MoveTo {
                position,
                zoom,
                animate,
            } => {
                let zoom = zoom.map(clamp_zoom);
                next.center = position;
                if let Some(zoom) = zoom {
                    next.zoom = zoom;
                }
                commands.push(MapCommand::MoveTo {
                    position,
                    zoom,
                    animate,
                });
            }
            StateOp::MoveToCurrentLocation => {
                let position = state.current_location.unwrap_or(self.default_center);
                next.center = position;
                next.zoom = self.current_location_zoom;
                commands.push(MapCommand::MoveTo {
                    position,
                    zoom: Some(self.current_location_zoom),
                    animate: true,
                });
            }
            StateOp::ZoomTo { zoom, animate } => {
                let zoom = clamp_zoom(zoom);
                next.zoom = zoom;
                commands.push(MapCommand::ZoomTo { zoom, animate });
            }
            // Zoom steps are always forwarded, even at the limits: the surface
            // owns the real camera and repeated steps must not be coalesced.
            StateOp::ZoomIn => {
                next.zoom = state.zoom.saturating_add(1).min(MAX_ZOOM);
                commands.push(MapCommand::ZoomIn);
            }
            StateOp::ZoomOut => {
                next.zoom = state.zoom.saturating_sub(1).max(MIN_ZOOM);
                commands.push(MapCommand::ZoomOut);
            }
            StateOp::FitBounds { bounds, padding } => {
                next.center = bounds.center();
                commands.push(MapCommand::FitBounds {
                    bounds,
                    padding: padding.unwrap_or(self.fit_bounds_padding),
                });
            }
            StateOp::AddMarker(marker) => {
                upsert_marker(&mut next.markers, marker.clone());
                commands.push(MapCommand::AddMarker(marker));
            }
            StateOp::RemoveMarker(id) => {
                let before = next.markers.len();
                next.markers.retain(|marker| marker.id != id);
                if next.markers.len() == before {
                    return Transition::unchanged(state);
                }
                commands.push(MapCommand::RemoveMarker(id));
            }
            StateOp::ClearMarkers => {
                next.markers.clear();
                commands.push(MapCommand::ClearMarkers);
            }
            StateOp::SetMarkers(markers) => {
                next.markers.clear();
                for marker in markers {
                    upsert_marker(&mut next.markers, marker);
                }
                commands.push(MapCommand::ClearMarkers);
                commands.extend(next.markers.iter().cloned().map(MapCommand::AddMarker));
            }
            StateOp::SetStartAndEndMarkers {
                start,
                end,
                waypoints,
            } => {
                let placed: Vec<MarkerData> = [MarkerData::route_start(start)]
                    .into_iter()
                    .chain(
                        waypoints
                            .into_iter()
                            .enumerate()
                            .map(|(index, position)| MarkerData::waypoint(index, position)),
                    )
                    .chain([MarkerData::route_end(end)])
                    .collect();
                for stale in state.markers.iter().filter(|marker| {
                    marker.is_route_marker() && !placed.iter().any(|new| new.id == marker.id)
                }) {
                    commands.push(MapCommand::RemoveMarker(stale.id.clone()));
                }
                next.markers.retain(|marker| !marker.is_route_marker());
                next.markers.extend(placed.iter().cloned());
                commands.extend(placed.into_iter().map(MapCommand::AddMarker));
            }
            StateOp::MoveMarker { id, position } => {
                match next.markers.iter_mut().find(|marker| marker.id == id) {
                    Some(marker) => marker.position = position,
                    None => return Transition::unchanged(state),
                }
            }
            StateOp::ShowRoute(route) => {
                self.show_route(&mut next, &mut commands, route);
            }
            StateOp::ClearRoute { clear_markers } => {
                next.route = None;
                commands.push(MapCommand::ClearRoute);
                if clear_markers {
                    next.markers.clear();
                    commands.push(MapCommand::ClearMarkers);
                }
            }
            StateOp::SetLoading(message) => {
                next.is_loading = true;
                next.loading_message = message;
            }
            StateOp::ClearLoading => {
                next.is_loading = false;
                next.loading_message = None;
            }
            StateOp::SetError(message) => next.error = Some(message),
            StateOp::ClearError => next.error = None,
            StateOp::SetCurrentLocation(location) => {
                next.current_location = Some(location);
                next.show_current_location = true;
            }
            StateOp::SetShowCurrentLocation(show) => next.show_current_location = show,
            StateOp::Redraw => commands.push(MapCommand::Redraw),
            StateOp::SurfaceReady => {
                next.is_map_ready = true;
                next.current_location = state.current_location.or(Some(self.default_center));
                next.show_current_location = true;
            }
            StateOp::CameraSettled { center, zoom } => {
                next.center = center;
                next.zoom = clamp_zoom(zoom);
            }
            StateOp::ZoomSettled(zoom) => next.zoom = clamp_zoom(zoom),
            StateOp::BeginRouteRequest {
                request_id,
                message,
            } => {
                next.pending_route_request = Some(request_id);
                next.is_loading = true;
                next.loading_message = message;
                next.error = None;
            }
            StateOp::CompleteRouteRequest {
                request_id,
                outcome,
            } => {
                if state.pending_route_request != Some(request_id) {
                    tracing::debug!(
                        request_id,
                        pending = ?state.pending_route_request,
                        "discarding stale route result"
                    );
                    return Transition::unchanged(state);
                }
                next.pending_route_request = None;
                next.is_loading = false;
                next.loading_message = None;
                match outcome {
                    Ok(route) => self.show_route(&mut next, &mut commands, route),
                    Err(message) => next.error = Some(message),
                }
            }
            StateOp::CancelRouteRequest => {
                if state.pending_route_request.is_none() {
                    return Transition::unchanged(state);
                }
                next.pending_route_request = None;
                next.is_loading = false;
                next.loading_message = None;
            }
        }

        Transition {
            state: next,
            commands,
        }
    }

    fn show_route(
        &self,
        next: &mut MapUiState,
        commands: &mut Vec<MapCommand>,
        route: Arc<RouteResult>,
    ) {
        let bounds = route.bounding_box();
        next.route = Some(Arc::clone(&route));
        commands.push(MapCommand::ShowRoute(route));
        if let Some(bounds) = bounds {
            next.center = bounds.center();
            commands.push(MapCommand::FitBounds {
                bounds,
                padding: self.fit_bounds_padding,
            });
        }
    }
}

/// Replaces a marker with the same id in place, otherwise appends.
fn upsert_marker(markers: &mut Vec<MarkerData>, marker: MarkerData) {
    match markers.iter_mut().find(|existing| existing.id == marker.id) {
        Some(existing) => *existing = marker,
        None => markers.push(marker),
    }
}
