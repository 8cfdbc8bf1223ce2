use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::id::WindowId;

/// Window lifecycle events published for async consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WindowEvent {
    Opened(WindowId),
    Closed(WindowId),
    Shutdown,
}

pub struct EventBus {
    sender: broadcast::Sender<WindowEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: WindowEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
