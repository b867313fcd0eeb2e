//! Progress events broadcast during a run (spec §4.5 `status()`), mirroring
//! the teacher's `IngestionProgress`/broadcast-channel pattern.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;

/// One stage transition or counter update, sent on every state change so a
/// caller subscribed via `PipelineCoordinator::subscribe` sees a live feed
/// without polling `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: String,
    pub message: String,
    pub discovered: usize,
    pub fetched: usize,
    pub analyzed: usize,
    pub persisted: usize,
}

impl ProgressEvent {
    pub fn new(stage: &str, message: impl Into<String>) -> Self {
        Self {
            stage: stage.to_string(),
            message: message.into(),
            discovered: 0,
            fetched: 0,
            analyzed: 0,
            persisted: 0,
        }
    }
}

/// A point-in-time snapshot returned by `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub discovered: usize,
    pub fetched: usize,
    pub analyzed: usize,
    pub persisted: usize,
    pub errors_by_kind: HashMap<String, usize>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub progress_percentage: f64,
}

/// Default capacity for the progress broadcast channel; lagging subscribers
/// drop the oldest events rather than blocking publishers.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

pub fn progress_channel() -> (broadcast::Sender<ProgressEvent>, broadcast::Receiver<ProgressEvent>) {
    broadcast::channel(PROGRESS_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let (tx, mut rx) = progress_channel();
        tx.send(ProgressEvent::new("discover", "found paper a")).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.stage, "discover");
        assert_eq!(event.message, "found paper a");
    }

    #[test]
    fn send_errors_when_all_receivers_dropped() {
        let (tx, rx) = progress_channel();
        // The coordinator treats this as non-fatal: nobody is listening.
        drop(rx);
        assert!(tx.send(ProgressEvent::new("discover", "x")).is_err());
    }
}
