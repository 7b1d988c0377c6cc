//! The single-writer map state actor.
//!
//! Every mutation is a [`StateOp`] sent to one task that owns the state.
//! That task runs the reducer, publishes the new snapshot, and forwards the
//! resulting commands to the surface before looking at the next message.
//! Readers get the latest snapshot from a `watch` channel without touching
//! the actor.

use std::sync::Arc;

use shared::{BoundingBox, Coordinate, MarkerData, MarkerType, PoiRecord, RouteResult};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    channel::{command_channel, event_channel, CommandSender, EventReceiver, EventSender, SurfaceLink},
    command::MapEvent,
    config::MapConfig,
    error::StateError,
    reducer::{op_for_event, MapReducer, StateOp},
    state::MapUiState,
};

pub type Snapshot = Arc<MapUiState>;

#[derive(Debug)]
enum Message {
    Apply {
        op: StateOp,
        ack: Option<oneshot::Sender<Snapshot>>,
    },
}

pub struct MapStateContainer {
    reducer: MapReducer,
    state: MapUiState,
    inbox: mpsc::Receiver<Message>,
    events: EventReceiver,
    commands: CommandSender,
    snapshots: watch::Sender<Snapshot>,
    observers: broadcast::Sender<MapEvent>,
}

impl MapStateContainer {
    /// Starts the actor on the current tokio runtime.
    ///
    /// The returned link must be attached to a render surface; until then
    /// commands accumulate in the command queue.
    pub fn spawn(config: MapConfig) -> (MapStateHandle, SurfaceLink) {
        let state = MapUiState::new(&config);
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_buffer.max(1));
        let (command_tx, command_rx) = command_channel(config.command_buffer);
        let (event_tx, event_rx) = event_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(state.clone()));
        let (observer_tx, _) = broadcast::channel(config.event_broadcast_capacity.max(1));

        let container = Self {
            reducer: MapReducer::new(&config),
            state,
            inbox: inbox_rx,
            events: event_rx,
            commands: command_tx,
            snapshots: snapshot_tx,
            observers: observer_tx.clone(),
        };
        tokio::spawn(container.run());

        let handle = MapStateHandle {
            inbox: inbox_tx,
            events: event_tx.clone(),
            snapshots: snapshot_rx,
            observers: observer_tx,
        };
        (handle, SurfaceLink::new(command_rx, event_tx))
    }

    async fn run(mut self) {
        tracing::debug!("map state container started");
        loop {
            // Unbiased so a busy inbox cannot starve surface reports.
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(Message::Apply { op, ack }) => {
                        let snapshot = self.apply(op).await;
                        if let Some(ack) = ack {
                            let _ = ack.send(snapshot);
                        }
                    }
                    None => break,
                },
                Some(event) = self.events.recv() => self.fold_event(event).await,
            }
        }
        tracing::debug!("all state handles dropped, map state container stopped");
    }

    async fn apply(&mut self, op: StateOp) -> Snapshot {
        let name = op.name();
        let transition = self.reducer.reduce(&self.state, op);
        let changed = transition.state != self.state;
        tracing::debug!(op = name, changed, commands = transition.commands.len(), "applied state op");

        if changed {
            self.state = transition.state;
            self.snapshots.send_replace(Arc::new(self.state.clone()));
        }
        for command in transition.commands {
            let command_name = command.name();
            if self.commands.send(command).await.is_err() {
                tracing::warn!(command = command_name, "render surface detached, command not delivered");
            }
        }
        self.snapshots.borrow().clone()
    }

    async fn fold_event(&mut self, event: MapEvent) {
        if let Some(op) = op_for_event(&event) {
            self.apply(op).await;
        }
        // No receivers is the normal case when nobody listens for clicks.
        let _ = self.observers.send(event);
    }
}

/// Cloneable entry point to the map state actor.
#[derive(Debug, Clone)]
pub struct MapStateHandle {
    inbox: mpsc::Sender<Message>,
    events: EventSender,
    snapshots: watch::Receiver<Snapshot>,
    observers: broadcast::Sender<MapEvent>,
}

impl MapStateHandle {
    /// Latest state, without waiting on the actor.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Surface events, after they have been folded into state.
    pub fn subscribe_events(&self) -> broadcast::Receiver<MapEvent> {
        self.observers.subscribe()
    }

    /// Sender for injecting surface events, e.g. from a platform callback.
    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    pub async fn wait_until_ready(&self) -> Result<Snapshot, StateError> {
        let mut rx = self.snapshots.clone();
        let state = rx
            .wait_for(|state| state.is_map_ready)
            .await
            .map_err(|_| StateError::Closed)?;
        Ok(state.clone())
    }

    /// Queues `op` without waiting for it to be applied.
    pub async fn dispatch(&self, op: StateOp) -> Result<(), StateError> {
        self.inbox
            .send(Message::Apply { op, ack: None })
            .await
            .map_err(|_| StateError::Closed)
    }

    /// Applies `op` and returns the snapshot it produced.
    pub async fn apply(&self, op: StateOp) -> Result<Snapshot, StateError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(Message::Apply { op, ack: Some(tx) })
            .await
            .map_err(|_| StateError::Closed)?;
        rx.await.map_err(|_| StateError::NoReply)
    }

    pub async fn move_to(
        &self,
        position: Coordinate,
        zoom: Option<u8>,
        animate: bool,
    ) -> Result<Snapshot, StateError> {
        self.apply(StateOp::MoveTo {
            position,
            zoom,
            animate,
        })
        .await
    }

    pub async fn move_to_current_location(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::MoveToCurrentLocation).await
    }

    pub async fn zoom_in(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ZoomIn).await
    }

    pub async fn zoom_out(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ZoomOut).await
    }

    pub async fn zoom_to(&self, zoom: u8, animate: bool) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ZoomTo { zoom, animate }).await
    }

    pub async fn fit_bounds(
        &self,
        bounds: BoundingBox,
        padding: Option<u32>,
    ) -> Result<Snapshot, StateError> {
        self.apply(StateOp::FitBounds { bounds, padding }).await
    }

    pub async fn add_marker(&self, marker: MarkerData) -> Result<Snapshot, StateError> {
        self.apply(StateOp::AddMarker(marker)).await
    }

    pub async fn add_poi_marker(
        &self,
        poi: &PoiRecord,
        kind: MarkerType,
    ) -> Result<Snapshot, StateError> {
        self.add_marker(poi.to_marker(kind)).await
    }

    pub async fn remove_marker(&self, id: impl Into<String>) -> Result<Snapshot, StateError> {
        self.apply(StateOp::RemoveMarker(id.into())).await
    }

    pub async fn clear_markers(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ClearMarkers).await
    }

    pub async fn set_markers(&self, markers: Vec<MarkerData>) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetMarkers(markers)).await
    }

    pub async fn set_start_and_end_markers(
        &self,
        start: Coordinate,
        end: Coordinate,
        waypoints: Vec<Coordinate>,
    ) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetStartAndEndMarkers {
            start,
            end,
            waypoints,
        })
        .await
    }

    pub async fn show_route(&self, route: impl Into<Arc<RouteResult>>) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ShowRoute(route.into())).await
    }

    pub async fn clear_route(&self, clear_markers: bool) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ClearRoute { clear_markers }).await
    }

    pub async fn set_loading(&self, message: Option<String>) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetLoading(message)).await
    }

    pub async fn clear_loading(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ClearLoading).await
    }

    pub async fn set_error(&self, message: impl Into<String>) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetError(message.into())).await
    }

    pub async fn clear_error(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::ClearError).await
    }

    pub async fn set_current_location(&self, location: Coordinate) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetCurrentLocation(location)).await
    }

    pub async fn set_show_current_location(&self, show: bool) -> Result<Snapshot, StateError> {
        self.apply(StateOp::SetShowCurrentLocation(show)).await
    }

    pub async fn redraw(&self) -> Result<Snapshot, StateError> {
        self.apply(StateOp::Redraw).await
    }
}
