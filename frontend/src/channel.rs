//! Plumbing between the state container and a render surface.
//!
//! Commands flow down a bounded queue and are applied strictly in order.
//! Events flow up an unbounded queue so the surface never blocks on a busy
//! container.

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    command::{MapCommand, MapEvent},
    error::{ChannelError, SurfaceError},
};

/// Anything able to draw a map: a native view, a web canvas, a test double.
pub trait RenderSurface: Send + 'static {
    /// Called once before the first command, with the sender the surface
    /// uses to report user interaction.
    fn attach(&mut self, _events: EventSender) {}

    fn apply(&mut self, command: MapCommand) -> Result<(), SurfaceError>;
}

pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx }, CommandReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<MapCommand>,
}

impl CommandSender {
    /// Waits for queue space when the surface lags behind.
    pub async fn send(&self, command: MapCommand) -> Result<(), ChannelError> {
        self.tx.send(command).await.map_err(|_| ChannelError::Closed)
    }

    pub fn try_send(&self, command: MapCommand) -> Result<(), ChannelError> {
        self.tx.try_send(command).map_err(|err| match err {
            mpsc::error::TrySendError::Full(command) => ChannelError::Full(command),
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<MapCommand>,
}

impl CommandReceiver {
    pub async fn recv(&mut self) -> Option<MapCommand> {
        self.rx.recv().await
    }

    /// Feeds every command to `surface` until all senders are gone.
    ///
    /// A rejected command is logged and skipped; later commands still apply.
    pub async fn drive<S: RenderSurface>(mut self, mut surface: S) -> S {
        while let Some(command) = self.rx.recv().await {
            let name = command.name();
            if let Err(err) = surface.apply(command) {
                tracing::warn!(command = name, "surface failed to apply command: {err}");
            }
        }
        tracing::debug!("command channel closed, surface detached");
        surface
    }
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<MapEvent>,
}

impl EventSender {
    /// Never blocks, so it is safe to call from a render callback.
    pub fn emit(&self, event: MapEvent) -> Result<(), ChannelError> {
        self.tx.send(event).map_err(|_| ChannelError::Closed)
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<MapEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<MapEvent> {
        self.rx.recv().await
    }
}

/// The surface-facing end of a container.
///
/// Commands issued before a surface attaches stay queued, so nothing is lost
/// while the map view is still being created.
#[derive(Debug)]
pub struct SurfaceLink {
    commands: CommandReceiver,
    events: EventSender,
}

impl SurfaceLink {
    pub(crate) fn new(commands: CommandReceiver, events: EventSender) -> Self {
        Self { commands, events }
    }

    /// Hands the surface its event sender and drives it on a new task.
    pub fn attach<S: RenderSurface>(self, mut surface: S) -> JoinHandle<S> {
        surface.attach(self.events);
        tokio::spawn(self.commands.drive(surface))
    }

    pub fn into_parts(self) -> (CommandReceiver, EventSender) {
        (self.commands, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Coordinate;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<MapCommand>,
    }

    impl RenderSurface for Recorder {
        fn apply(&mut self, command: MapCommand) -> Result<(), SurfaceError> {
            if command == MapCommand::Redraw {
                return Err(SurfaceError::Rejected {
                    command: command.name(),
                    reason: "no canvas".into(),
                });
            }
            self.applied.push(command);
            Ok(())
        }
    }

    #[tokio::test]
    async fn try_send_hands_back_command_when_full() {
        let (tx, _rx) = command_channel(1);
        tx.try_send(MapCommand::ZoomIn).unwrap();
        match tx.try_send(MapCommand::ZoomOut) {
            Err(ChannelError::Full(command)) => assert_eq!(command, MapCommand::ZoomOut),
            other => panic!("expected Full, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = command_channel(4);
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(
            tx.send(MapCommand::ClearRoute).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn drive_applies_in_order_and_skips_rejections() {
        let (tx, rx) = command_channel(8);
        let sequence = vec![
            MapCommand::ZoomIn,
            MapCommand::Redraw,
            MapCommand::ZoomOut,
            MapCommand::ZoomIn,
        ];
        for command in sequence {
            tx.send(command).await.unwrap();
        }
        drop(tx);

        let surface = rx.drive(Recorder::default()).await;
        assert_eq!(
            surface.applied,
            vec![MapCommand::ZoomIn, MapCommand::ZoomOut, MapCommand::ZoomIn]
        );
    }

    #[tokio::test]
    async fn events_are_delivered_in_emit_order() {
        let (tx, mut rx) = event_channel();
        let here = Coordinate::new(30.5, 114.3);
        tx.emit(MapEvent::MapReady).unwrap();
        tx.emit(MapEvent::MapClick(here)).unwrap();
        assert_eq!(rx.recv().await, Some(MapEvent::MapReady));
        assert_eq!(rx.recv().await, Some(MapEvent::MapClick(here)));
    }
}
