// Transition events - the hook notification/comment systems consume

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::program::types::ProgramStatus;

/// Record of a transition that occurred. Emitted after the store write
/// succeeds, once per executed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub program_id: Uuid,
    pub from_status: ProgramStatus,
    pub to_status: ProgramStatus,
    pub actor_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Consumer of transition events. Implemented by the (out-of-scope)
/// notification and comment systems; listeners must not fail the
/// transition, so the callback is infallible.
#[async_trait]
pub trait TransitionListener: Send + Sync {
    async fn on_transition(&self, event: &TransitionEvent);
}

/// Listener that records every event it sees. Used in tests and as a
/// minimal in-process audit trail.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<TransitionEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl TransitionListener for RecordingListener {
    async fn on_transition(&self, event: &TransitionEvent) {
        self.events.lock().await.push(event.clone());
    }
}
