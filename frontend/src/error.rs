use thiserror::Error;

use crate::command::MapCommand;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("map state container has shut down")]
    Closed,
    #[error("map state container dropped the reply")]
    NoReply,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The queue is at capacity. The command is handed back, never dropped.
    #[error("command queue is full")]
    Full(MapCommand),
    #[error("channel closed")]
    Closed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("render surface rejected {command}: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteSearchError {
    #[error("no route found")]
    NoRouteFound,
    #[error("routing engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("invalid route query: {0}")]
    InvalidQuery(String),
}
