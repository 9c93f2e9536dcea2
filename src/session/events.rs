use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::shared::AppError;

/// Notable identity events, published after the operation has committed
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    UserRegistered { user_id: Uuid },
    LoggedIn { user_id: Uuid, token_id: Uuid },
    LoggedOut { user_id: Uuid },
}

/// Receiver for session events; bound once when the service is built
#[async_trait]
pub trait SessionEventPublisher: Send + Sync {
    async fn publish(&self, event: SessionEvent) -> Result<(), AppError>;
}

/// Fans events out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<SessionEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl SessionEventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: SessionEvent) -> Result<(), AppError> {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Session event published");
            }
            Err(_) => {
                debug!("Session event published with no receivers");
            }
        }
        Ok(())
    }
}
