//! Map presentation state: a single-writer state container, the ordered
//! command/event protocol to a render surface, route planning against an
//! external search engine, read-once handoff slots, and turn-by-turn
//! navigation progress.

pub mod channel;
pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod handoff;
pub mod navigation;
pub mod planner;
pub mod reducer;
pub mod state;

pub use channel::{
    command_channel, event_channel, CommandReceiver, CommandSender, EventReceiver, EventSender,
    RenderSurface, SurfaceLink,
};
pub use command::{MapCommand, MapEvent};
pub use config::MapConfig;
pub use container::{MapStateContainer, MapStateHandle, Snapshot};
pub use error::{ChannelError, RouteSearchError, StateError, SurfaceError};
pub use handoff::{HandoffSlot, HandoffStore};
pub use navigation::{NavigationSession, NavigationState, NAVIGATION_ZOOM};
pub use planner::{RoutePlanner, RouteQuery, RouteSearch, RouteTicket};
pub use reducer::{op_for_event, MapReducer, StateOp, Transition};
pub use state::{clamp_zoom, MapUiState, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
