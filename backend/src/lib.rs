pub mod error;
pub mod library;
pub mod surface;
pub mod synthetic;

use std::{path::Path, sync::Arc};

use frontend::RouteSearch;

pub use error::RouteLibraryError;
pub use library::{RecordedRoute, RouteLibrary};
pub use surface::{HeadlessSurface, Viewport};
pub use synthetic::SyntheticRouter;

/// The recorded library at `routes` when given, the synthetic router
/// otherwise.
pub fn route_search(routes: Option<&Path>) -> Result<Arc<dyn RouteSearch>, RouteLibraryError> {
    match routes {
        Some(path) => {
            let library = RouteLibrary::from_file(path)?;
            tracing::info!("routing from recorded library {}", path.display());
            Ok(Arc::new(library))
        }
        None => {
            tracing::info!("routing with the synthetic router");
            Ok(Arc::new(SyntheticRouter::default()))
        }
    }
}
