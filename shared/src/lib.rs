//! Domain model shared by the map state layer and its collaborators:
//! coordinates and bounds, computed routes with their turn instructions,
//! map markers, and the presentation formatting used by route panels.

pub mod format;
pub mod geo;
pub mod instruction;
pub mod marker;
pub mod route;

pub use format::{format_distance, format_distance_ahead, format_duration, format_remaining_time};
pub use geo::{
    BoundingBox, Coordinate, DEFAULT_CENTER, EARTH_RADIUS_M, GeoError, SERVICE_AREA,
    bounding_box_of, haversine_m, path_length_m,
};
pub use instruction::{InstructionSign, RouteInstruction, compose_instruction_text};
pub use marker::{MarkerData, MarkerType, PoiRecord, ROUTE_END_ID, ROUTE_START_ID, WAYPOINT_ID_PREFIX};
pub use route::{Place, ProfileParseError, RouteHistoryEntry, RouteResult, TravelProfile};
