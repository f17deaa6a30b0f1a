//! Identification events and their delivery to a downstream consumer.

use chrono::{DateTime, Utc};
use idgate_core::{Person, RgbImage};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Receiving end of the pipeline's event handoff.
pub type EventReceiver = mpsc::UnboundedReceiver<ResultEvent>;

/// Emitted once per armed period, when a live face matches an enrolled person.
#[derive(Debug, Clone)]
pub struct ResultEvent {
    pub person: Arc<Person>,
    pub similarity: f32,
    pub liveness: f32,
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
    /// Face region of the decoded frame. `None` if the box fell outside the image.
    pub cropped_face: Option<RgbImage>,
    pub identified_at: DateTime<Utc>,
}

impl ResultEvent {
    pub fn summary(&self) -> IdentificationSummary {
        IdentificationSummary {
            person_id: self.person.id,
            name: self.person.name.clone(),
            similarity: self.similarity,
            liveness: self.liveness,
            yaw: self.yaw,
            roll: self.roll,
            pitch: self.pitch,
            identified_at: self.identified_at,
        }
    }
}

/// Serializable view of a [`ResultEvent`], without pixel data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationSummary {
    pub person_id: Uuid,
    pub name: String,
    pub similarity: f32,
    pub liveness: f32,
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
    pub identified_at: DateTime<Utc>,
}

/// Downstream consumer of identification events (display, navigation, door relay, ...).
pub trait ResultSink: Send {
    fn on_identified(&mut self, event: ResultEvent);
}

impl<F> ResultSink for F
where
    F: FnMut(ResultEvent) + Send,
{
    fn on_identified(&mut self, event: ResultEvent) {
        self(event)
    }
}

/// Sink that logs each event summary as JSON.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn on_identified(&mut self, event: ResultEvent) {
        match serde_json::to_string(&event.summary()) {
            Ok(json) => tracing::info!(event = %json, "identified"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize identification"),
        }
    }
}

/// Drain `events` into `sink` until the pipeline drops its sender.
///
/// Returns the sink so callers can inspect it after shutdown.
pub async fn forward_events<S: ResultSink>(mut events: EventReceiver, mut sink: S) -> S {
    while let Some(event) = events.recv().await {
        tracing::debug!(person = %event.person.name, similarity = event.similarity, "delivering identification");
        sink.on_identified(event);
    }
    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_core::Template;

    fn event(name: &str) -> ResultEvent {
        ResultEvent {
            person: Arc::new(Person::new(name, vec![Template::new(vec![1.0])])),
            similarity: 0.91,
            liveness: 0.88,
            yaw: 1.5,
            roll: -2.0,
            pitch: 0.25,
            cropped_face: Some(RgbImage::new(4, 4)),
            identified_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_serializes_without_pixels() {
        let ev = event("alice");
        let json = serde_json::to_value(ev.summary()).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["person_id"], ev.person.id.to_string());
        assert!(json.get("cropped_face").is_none());
    }

    #[tokio::test]
    async fn test_forward_events_delivers_in_order_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(event("alice")).unwrap();
        tx.send(event("bob")).unwrap();
        drop(tx);

        let mut names = Vec::new();
        let sink = forward_events(rx, |ev: ResultEvent| names.push(ev.person.name.clone())).await;
        drop(sink);
        assert_eq!(names, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(event("carol")).unwrap();
        drop(tx);
        let _sink: TracingSink = forward_events(rx, TracingSink).await;
    }
}
