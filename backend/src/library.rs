use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use frontend::{RouteQuery, RouteSearch, RouteSearchError};
use kdtree::{distance::squared_euclidean, KdTree};
use serde::{Deserialize, Serialize};
use shared::{Coordinate, RouteResult, EARTH_RADIUS_M};

use crate::error::RouteLibraryError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRoute {
    pub name: String,
    pub route: RouteResult,
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    routes: Vec<RecordedRoute>,
}

/// Routes recorded ahead of time, answered by snapping query endpoints.
///
/// Only the query's start and end are matched; waypoints are ignored.
#[derive(Clone)]
pub struct RouteLibrary {
    routes: Vec<RecordedRoute>,
    /// Route starts as `[lon, lat]`.
    starts: KdTree<f64, usize, [f64; 2]>,
    snap_radius_m: f64,
}

impl RouteLibrary {
    pub const DEFAULT_SNAP_RADIUS_M: f64 = 150.0;

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouteLibraryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, RouteLibraryError> {
        let file: LibraryFile = serde_json::from_reader(reader)?;
        Self::from_routes(file.routes)
    }

    pub fn from_routes(routes: Vec<RecordedRoute>) -> Result<Self, RouteLibraryError> {
        let routes: Vec<_> = routes
            .into_iter()
            .filter(|recorded| {
                let usable = recorded.route.points.len() >= 2
                    && recorded.route.points.iter().all(Coordinate::is_valid);
                if !usable {
                    tracing::warn!("skipping recorded route {:?}: unusable geometry", recorded.name);
                }
                usable
            })
            .collect();
        if routes.is_empty() {
            return Err(RouteLibraryError::Empty);
        }

        let mut starts = KdTree::new(2);
        for (idx, recorded) in routes.iter().enumerate() {
            if let Some(start) = recorded.route.start() {
                let _ = starts.add([start.lon, start.lat], idx);
            }
        }
        tracing::info!("loaded {} recorded routes", routes.len());

        Ok(Self {
            routes,
            starts,
            snap_radius_m: Self::DEFAULT_SNAP_RADIUS_M,
        })
    }

    pub fn with_snap_radius(mut self, meters: f64) -> Self {
        self.snap_radius_m = meters.max(0.0);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|recorded| recorded.name.as_str())
    }

    /// Best recorded route whose endpoints both lie within the snap radius
    /// and whose profile matches.
    pub fn find(&self, query: &RouteQuery) -> Option<&RecordedRoute> {
        let start = query.start();
        let end = query.end();
        let origin = [start.lon, start.lat];
        let reach = snap_reach_deg(self.snap_radius_m, start.lat);

        self.starts
            .iter_nearest(&origin, &squared_euclidean)
            .ok()?
            .take_while(|(dist_sq, _)| *dist_sq <= reach * reach)
            .filter_map(|(_, &idx)| self.routes.get(idx))
            .filter(|recorded| recorded.route.profile == query.profile())
            .filter_map(|recorded| {
                let start_off = recorded.route.start()?.distance_to(start);
                let end_off = recorded.route.end()?.distance_to(end);
                (start_off <= self.snap_radius_m && end_off <= self.snap_radius_m)
                    .then_some((recorded, start_off + end_off))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(recorded, _)| recorded)
    }
}

/// Upper bound, in raw degrees, on how far a start within `meters` can sit
/// from a point at `lat`. Longitude degrees shrink with latitude, so they
/// bound both axes.
fn snap_reach_deg(meters: f64, lat: f64) -> f64 {
    let meters_per_deg = EARTH_RADIUS_M * 1f64.to_radians() * lat.to_radians().cos().max(1e-3);
    meters / meters_per_deg * 1.01
}

impl RouteSearch for RouteLibrary {
    fn search(&self, query: &RouteQuery) -> Result<RouteResult, RouteSearchError> {
        match self.find(query) {
            Some(recorded) => {
                tracing::debug!("answering from recorded route {:?}", recorded.name);
                Ok(recorded.route.clone())
            }
            None => Err(RouteSearchError::NoRouteFound),
        }
    }
}
