//! Route requests against an external search engine.
//!
//! A search runs on the blocking pool and its outcome is folded back into the
//! map state through the state actor. Starting a new request aborts the one
//! in flight; a result that still slips through carries a stale request id
//! and is dropped by the reducer.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{Coordinate, RouteResult, TravelProfile};
use tokio::{
    sync::Mutex,
    task::{AbortHandle, JoinHandle},
};

use crate::{
    container::MapStateHandle,
    error::{RouteSearchError, StateError},
    handoff::HandoffStore,
    reducer::StateOp,
};

const PLANNING_MESSAGE: &str = "Calculating route";

/// A routing engine. Implementations may block; they run off the runtime.
pub trait RouteSearch: Send + Sync + 'static {
    fn search(&self, query: &RouteQuery) -> Result<RouteResult, RouteSearchError>;
}

impl<F> RouteSearch for F
where
    F: Fn(&RouteQuery) -> Result<RouteResult, RouteSearchError> + Send + Sync + 'static,
{
    fn search(&self, query: &RouteQuery) -> Result<RouteResult, RouteSearchError> {
        self(query)
    }
}

/// Start, optional intermediate stops, end.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    points: Vec<Coordinate>,
    profile: TravelProfile,
}

impl RouteQuery {
    pub fn new(start: Coordinate, end: Coordinate, profile: TravelProfile) -> Self {
        Self {
            points: vec![start, end],
            profile,
        }
    }

    pub fn with_waypoints(
        start: Coordinate,
        waypoints: impl IntoIterator<Item = Coordinate>,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Self {
        let mut points = vec![start];
        points.extend(waypoints);
        points.push(end);
        Self { points, profile }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn start(&self) -> Coordinate {
        self.points[0]
    }

    pub fn end(&self) -> Coordinate {
        self.points[self.points.len() - 1]
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.points[1..self.points.len() - 1]
    }

    pub fn profile(&self) -> TravelProfile {
        self.profile
    }

    pub fn validate(&self) -> Result<(), RouteSearchError> {
        for point in &self.points {
            point
                .validate()
                .map_err(|err| RouteSearchError::InvalidQuery(err.to_string()))?;
        }
        Ok(())
    }
}

/// Handle on one submitted request.
#[derive(Debug)]
pub struct RouteTicket {
    pub id: u64,
    join: JoinHandle<Result<Arc<RouteResult>, RouteSearchError>>,
}

impl RouteTicket {
    /// The search outcome, or `None` when a newer request or `cancel`
    /// aborted this one first.
    pub async fn wait(self) -> Option<Result<Arc<RouteResult>, RouteSearchError>> {
        match self.join.await {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_cancelled() => None,
            Err(err) => Some(Err(RouteSearchError::EngineUnavailable(err.to_string()))),
        }
    }
}

pub struct RoutePlanner {
    search: Arc<dyn RouteSearch>,
    state: MapStateHandle,
    handoff: Option<Arc<HandoffStore>>,
    next_id: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl RoutePlanner {
    pub fn new(search: Arc<dyn RouteSearch>, state: MapStateHandle) -> Self {
        Self {
            search,
            state,
            handoff: None,
            next_id: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Successful routes are also left in the handoff store's route slot.
    pub fn with_handoff(mut self, handoff: Arc<HandoffStore>) -> Self {
        self.handoff = Some(handoff);
        self
    }

    pub async fn request_route(&self, query: RouteQuery) -> Result<RouteTicket, StateError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            request_id = id,
            profile = %query.profile(),
            "requesting route {} -> {}",
            query.start(),
            query.end()
        );

        self.state
            .apply(StateOp::BeginRouteRequest {
                request_id: id,
                message: Some(PLANNING_MESSAGE.to_string()),
            })
            .await?;
        self.state
            .apply(StateOp::SetStartAndEndMarkers {
                start: query.start(),
                end: query.end(),
                waypoints: query.waypoints().to_vec(),
            })
            .await?;

        let search = Arc::clone(&self.search);
        let state = self.state.clone();
        let handoff = self.handoff.clone();
        let join = tokio::spawn(async move {
            let outcome = run_search(search, query).await.map(Arc::new);
            match &outcome {
                Ok(route) => {
                    tracing::debug!(
                        request_id = id,
                        points = route.points.len(),
                        "route found ({})",
                        route.formatted_distance()
                    );
                    if let Some(handoff) = &handoff {
                        handoff.route.set(Arc::clone(route));
                    }
                }
                Err(err) => tracing::warn!(request_id = id, "route search failed: {err}"),
            }

            let folded = outcome.clone().map_err(|err| err.to_string());
            if let Err(err) = state
                .apply(StateOp::CompleteRouteRequest {
                    request_id: id,
                    outcome: folded,
                })
                .await
            {
                tracing::warn!(request_id = id, "could not record route outcome: {err}");
            }
            outcome
        });
        *in_flight = Some(join.abort_handle());

        Ok(RouteTicket { id, join })
    }

    /// Abandons the request in flight, if any.
    pub async fn cancel(&self) -> Result<(), StateError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.abort();
            tracing::debug!("route request cancelled");
        }
        self.state.apply(StateOp::CancelRouteRequest).await?;
        Ok(())
    }
}

async fn run_search(
    search: Arc<dyn RouteSearch>,
    query: RouteQuery,
) -> Result<RouteResult, RouteSearchError> {
    query.validate()?;
    tokio::task::spawn_blocking(move || search.search(&query))
        .await
        .map_err(|err| RouteSearchError::EngineUnavailable(err.to_string()))?
}
