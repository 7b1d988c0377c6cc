//! A render surface without pixels.
//!
//! Keeps the viewport a real map view would show, publishes it on a `watch`
//! channel, and answers camera commands with `MapMoveEnd` the way an
//! interactive map reports a finished camera animation.

use std::sync::Arc;

use frontend::{clamp_zoom, EventSender, MapCommand, MapEvent, RenderSurface, SurfaceError, MAX_ZOOM};
use shared::{BoundingBox, Coordinate, MarkerData, RouteResult, DEFAULT_CENTER};
use tokio::sync::watch;

const TILE_SIZE_PX: f64 = 256.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
    pub markers: Vec<MarkerData>,
    pub route: Option<Arc<RouteResult>>,
    pub redraws: usize,
    pub commands_applied: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: frontend::DEFAULT_ZOOM,
            markers: Vec::new(),
            route: None,
            redraws: 0,
            commands_applied: 0,
        }
    }
}

pub struct HeadlessSurface {
    width_px: u32,
    height_px: u32,
    viewport: Viewport,
    published: watch::Sender<Viewport>,
    events: Option<EventSender>,
    log: Vec<MapCommand>,
}

impl HeadlessSurface {
    pub fn new(width_px: u32, height_px: u32) -> (Self, watch::Receiver<Viewport>) {
        let viewport = Viewport::default();
        let (published, rx) = watch::channel(viewport.clone());
        let surface = Self {
            width_px: width_px.max(1),
            height_px: height_px.max(1),
            viewport,
            published,
            events: None,
            log: Vec::new(),
        };
        (surface, rx)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Every command applied so far, in order.
    pub fn log(&self) -> &[MapCommand] {
        &self.log
    }

    fn emit(&self, event: MapEvent) {
        if let Some(events) = &self.events {
            if events.emit(event).is_err() {
                tracing::debug!("state container gone, dropping surface event");
            }
        }
    }

    /// Zoom at which `bounds` plus `padding` fits the surface, on a web
    /// mercator tile pyramid.
    fn zoom_to_fit(&self, bounds: &BoundingBox, padding: u32) -> u8 {
        let usable_w = (f64::from(self.width_px) - 2.0 * f64::from(padding)).max(1.0);
        let usable_h = (f64::from(self.height_px) - 2.0 * f64::from(padding)).max(1.0);

        let lon_fraction = (bounds.max_lon - bounds.min_lon) / 360.0;
        let lat_fraction = (mercator_y(bounds.max_lat) - mercator_y(bounds.min_lat)) / (2.0 * std::f64::consts::PI);

        let fit = |fraction: f64, usable: f64| {
            if fraction <= 0.0 {
                f64::from(MAX_ZOOM)
            } else {
                (usable / TILE_SIZE_PX / fraction).log2()
            }
        };
        let zoom = fit(lon_fraction, usable_w).min(fit(lat_fraction, usable_h)).floor();
        zoom.clamp(0.0, f64::from(MAX_ZOOM)) as u8
    }
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-85.051_128, 85.051_128).to_radians();
    (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln()
}

impl RenderSurface for HeadlessSurface {
    fn attach(&mut self, events: EventSender) {
        tracing::info!(width = self.width_px, height = self.height_px, "headless surface attached");
        self.events = Some(events);
        self.emit(MapEvent::MapReady);
    }

    fn apply(&mut self, command: MapCommand) -> Result<(), SurfaceError> {
        tracing::debug!(command = command.name(), "applying");
        let moves_camera = command.is_camera();
        let fitted_zoom = match &command {
            MapCommand::FitBounds { bounds, padding } => Some(self.zoom_to_fit(bounds, *padding)),
            _ => None,
        };
        let viewport = &mut self.viewport;

        match &command {
            MapCommand::MoveTo { position, zoom, .. } => {
                viewport.center = *position;
                if let Some(zoom) = zoom {
                    viewport.zoom = clamp_zoom(*zoom);
                }
            }
            MapCommand::ZoomTo { zoom, .. } => viewport.zoom = clamp_zoom(*zoom),
            MapCommand::ZoomIn => viewport.zoom = clamp_zoom(viewport.zoom.saturating_add(1)),
            MapCommand::ZoomOut => viewport.zoom = viewport.zoom.saturating_sub(1),
            MapCommand::FitBounds { bounds, .. } => {
                viewport.center = bounds.center();
                if let Some(zoom) = fitted_zoom {
                    viewport.zoom = zoom;
                }
            }
            MapCommand::AddMarker(marker) => {
                match viewport.markers.iter_mut().find(|m| m.id == marker.id) {
                    Some(existing) => *existing = marker.clone(),
                    None => viewport.markers.push(marker.clone()),
                }
            }
            MapCommand::RemoveMarker(id) => viewport.markers.retain(|m| &m.id != id),
            MapCommand::ClearMarkers => viewport.markers.clear(),
            MapCommand::ShowRoute(route) => {
                if route.points.is_empty() {
                    return Err(SurfaceError::Rejected {
                        command: command.name(),
                        reason: "route has no geometry".to_string(),
                    });
                }
                viewport.route = Some(Arc::clone(route));
            }
            MapCommand::ClearRoute => viewport.route = None,
            MapCommand::Redraw => viewport.redraws += 1,
        }

        self.viewport.commands_applied += 1;
        self.log.push(command);
        self.published.send_replace(self.viewport.clone());

        if moves_camera {
            self.emit(MapEvent::MapMoveEnd {
                center: self.viewport.center,
                zoom: self.viewport.zoom,
            });
        }
        Ok(())
    }
}
