//! In-process progress delivery.
//!
//! A bounded single-producer single-consumer channel connects the
//! orchestrator task to the SSE writer. Consumer death never kills the
//! producer: a closed channel downgrades emission to a debug log and the job
//! runs to completion.

use tokio::sync::mpsc;
use tracing::debug;

use adgen_models::ProgressEvent;

/// Channel capacity. Progress events are small and sparse; a full buffer
/// means the consumer stalled, and the producer then waits rather than drops.
const PROGRESS_BUFFER: usize = 32;

/// Create a progress channel pair.
pub fn progress_channel() -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    (ProgressSender { tx: Some(tx) }, rx)
}

/// A progress sender that may be detached (no consumer at all).
pub struct ProgressSender {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSender {
    /// A sender with no consumer; every emit is a no-op. Used for polling
    /// clients that never attach a stream.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Emit an event. Send failures mean the consumer went away; the
    /// pipeline keeps running regardless.
    pub async fn emit(&self, event: ProgressEvent) {
        let Some(tx) = &self.tx else { return };

        if let Err(e) = tx.send(event).await {
            debug!("Progress consumer gone, dropping event: {}", e.0.event_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let (sender, mut rx) = progress_channel();

        sender.emit(ProgressEvent::step1("planning")).await;
        sender.emit(ProgressEvent::step1_complete("planned", 3)).await;
        sender.emit(ProgressEvent::step3("merging")).await;
        drop(sender);

        assert_eq!(rx.recv().await.unwrap().event_name(), "step1");
        assert_eq!(rx.recv().await.unwrap().event_name(), "step1_complete");
        assert_eq!(rx.recv().await.unwrap().event_name(), "step3");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_emit_survives_dropped_consumer() {
        let (sender, rx) = progress_channel();
        drop(rx);

        // Must not panic or block
        sender.emit(ProgressEvent::step3("merging")).await;
        sender.emit(ProgressEvent::error("boom")).await;
    }

    #[tokio::test]
    async fn test_detached_sender_is_noop() {
        let sender = ProgressSender::detached();
        sender.emit(ProgressEvent::step1("planning")).await;
    }
}
