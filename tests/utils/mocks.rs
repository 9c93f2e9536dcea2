use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use media_identity::{AppError, SessionEvent, SessionEventPublisher};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Keeps every published event for later inspection
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<RwLock<Vec<SessionEvent>>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<SessionEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl SessionEventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: SessionEvent) -> Result<(), AppError> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Rejects every event
pub struct FailingEventPublisher;

#[async_trait]
impl SessionEventPublisher for FailingEventPublisher {
    async fn publish(&self, _event: SessionEvent) -> Result<(), AppError> {
        Err(AppError::Internal)
    }
}
