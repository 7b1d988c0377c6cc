use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteLibraryError {
    #[error("failed to read route library: {0}")]
    Io(#[from] io::Error),
    #[error("invalid route library: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("route library has no usable routes")]
    Empty,
}
