//! Frame admission and the one-shot recognized latch.
//!
//! Every decision that depends on [`PipelineState`] happens under one
//! mutex: admission, the `Armed → Recognized` transition together with
//! its event handoff, reset and stop. The lock is never held while the
//! analyzer runs.

use crate::cycle::CycleOutcome;
use crate::sink::ResultEvent;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started, or stopped. Frames are dropped.
    Idle,
    /// Accepting frames.
    Armed,
    /// An identification was emitted; frames are dropped until reset.
    Recognized,
}

/// Proof that a frame was admitted. Hand it back through
/// [`FrameGate::complete`] or [`FrameGate::abandon`].
#[must_use]
#[derive(Debug)]
pub struct Admission {
    epoch: u64,
}

/// What [`FrameGate::complete`] did with a cycle's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Latched to `Recognized` and handed the event to the sink.
    Emitted,
    /// No accepted match; still armed.
    Continued,
    /// The pipeline was stopped (or otherwise left this armed period) while
    /// the cycle ran; the outcome was dropped.
    Discarded,
}

#[derive(Debug)]
struct GateInner {
    state: PipelineState,
    in_flight: bool,
    /// Bumped on stop so late completions can be recognized as stale.
    epoch: u64,
    cycles_completed: u64,
    events_emitted: u64,
}

pub struct FrameGate {
    inner: Mutex<GateInner>,
    events: mpsc::UnboundedSender<ResultEvent>,
}

impl FrameGate {
    pub fn new(events: mpsc::UnboundedSender<ResultEvent>) -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: PipelineState::Idle,
                in_flight: false,
                epoch: 0,
                cycles_completed: 0,
                events_emitted: 0,
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight
    }

    pub fn cycles_completed(&self) -> u64 {
        self.lock().cycles_completed
    }

    pub fn events_emitted(&self) -> u64 {
        self.lock().events_emitted
    }

    /// `Idle → Armed`. Returns false in any other state.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != PipelineState::Idle {
            return false;
        }
        inner.state = PipelineState::Armed;
        tracing::info!("pipeline armed");
        true
    }

    /// Halt admission immediately. A cycle still running will be discarded.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.state = PipelineState::Idle;
        inner.epoch += 1;
        tracing::info!(in_flight = inner.in_flight, "pipeline stopped");
    }

    /// `Recognized → Armed`, allowing exactly one more emission.
    pub fn reset(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != PipelineState::Recognized {
            return false;
        }
        inner.state = PipelineState::Armed;
        tracing::info!("pipeline re-armed");
        true
    }

    /// Admit a frame if armed and nothing is in flight.
    ///
    /// A `None` means the frame must be dropped; nothing is queued.
    pub fn admit(&self) -> Option<Admission> {
        let mut inner = self.lock();
        if inner.state != PipelineState::Armed || inner.in_flight {
            return None;
        }
        inner.in_flight = true;
        Some(Admission { epoch: inner.epoch })
    }

    /// Release an admission whose frame never reached the worker.
    pub fn abandon(&self, admission: Admission) {
        let mut inner = self.lock();
        inner.in_flight = false;
        tracing::debug!(epoch = admission.epoch, "admission abandoned");
    }

    /// Finish a cycle. The latch transition and the event handoff happen
    /// in the same critical section as clearing the in-flight flag, so the
    /// next admission always observes `Recognized`.
    pub fn complete(&self, admission: Admission, outcome: CycleOutcome) -> Completion {
        let mut inner = self.lock();
        inner.in_flight = false;
        inner.cycles_completed += 1;

        let current = admission.epoch == inner.epoch && inner.state == PipelineState::Armed;
        if !current {
            tracing::debug!(state = ?inner.state, "discarding result of stale cycle");
            return Completion::Discarded;
        }

        let CycleOutcome::Identified(event) = outcome else {
            return Completion::Continued;
        };

        inner.state = PipelineState::Recognized;
        inner.events_emitted += 1;
        tracing::info!(
            person = %event.person.name,
            similarity = event.similarity,
            liveness = event.liveness,
            "identified"
        );
        if self.events.send(event).is_err() {
            tracing::warn!("result sink closed; identification dropped");
        }
        Completion::Emitted
    }
}
