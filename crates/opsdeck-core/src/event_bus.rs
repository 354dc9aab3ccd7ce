//! Session event fan-out
//!
//! The refresh coordinator and the auth API publish [`SessionEvent`]s; a
//! host subscribes to react to sign-in, sign-out and "sign-in required"
//! without the client core knowing who is listening.
//!
//! ```ignore
//! let bus = EventBus::new();
//! let mut events = bus.subscribe();
//!
//! let registry = ClientRegistry::builder(config, storage)
//!     .events(bus.clone())
//!     .build()?;
//!
//! while let Some(event) = events.recv().await { ... }
//! ```

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::domain::SessionEvent;

/// Events buffered per subscriber before the oldest are dropped
const BACKLOG: usize = 64;

/// Broadcast hub; cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(BACKLOG)
    }

    pub fn with_capacity(backlog: usize) -> Self {
        Self {
            tx: broadcast::channel(backlog).0,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSender {
    /// Publish `event`; returns how many subscribers will see it.
    ///
    /// Publishing with nobody listening is normal for headless hosts.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let kind = event.type_name();
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!(event = kind, delivered, "[EventBus] Published");
        delivered
    }

    pub fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() != 0
    }
}

pub struct EventReceiver {
    rx: broadcast::Receiver<SessionEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once the bus is gone.
    ///
    /// A slow subscriber skips what it missed rather than failing.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => break Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "[EventBus] Subscriber fell behind");
                }
                Err(RecvError::Closed) => break None,
            }
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => break Some(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "[EventBus] Subscriber fell behind");
                }
                Err(_) => break None,
            }
        }
    }
}
