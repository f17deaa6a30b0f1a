use crate::config::ConfigSource;
use crate::cycle::{CycleOutcome, Orchestrator, SkipReason};
use crate::gate::{Admission, FrameGate, PipelineState};
use crate::sink::EventReceiver;
use idgate_core::{FaceAnalyzer, Frame, GalleryStore};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One slot for the single in-flight frame, one for the shutdown message.
const JOB_CHANNEL_CAPACITY: usize = 2;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Messages sent from the capture side to the pipeline thread.
enum Job {
    Cycle { frame: Frame, admission: Admission },
    Shutdown,
}

/// Clone-safe handle used by the capture producer and controllers.
#[derive(Clone)]
pub struct PipelineHandle {
    gate: Arc<FrameGate>,
    tx: mpsc::Sender<Job>,
}

impl PipelineHandle {
    /// Offer a frame. Returns false if it was dropped: the pipeline is not
    /// armed, or a previous frame is still being processed.
    ///
    /// Never blocks; ownership of an accepted frame moves to the pipeline
    /// thread for the length of one cycle.
    pub fn admit(&self, frame: Frame) -> bool {
        let Some(admission) = self.gate.admit() else {
            return false;
        };

        match self.tx.try_send(Job::Cycle { frame, admission }) {
            Ok(()) => true,
            Err(err) => {
                if matches!(err, TrySendError::Closed(_)) {
                    tracing::warn!("pipeline thread gone; frame dropped");
                }
                if let Job::Cycle { admission, .. } = err.into_inner() {
                    self.gate.abandon(admission);
                }
                false
            }
        }
    }

    /// `Idle → Armed`.
    pub fn start(&self) -> bool {
        self.gate.start()
    }

    /// Stop admitting frames; a cycle already running is discarded.
    pub fn stop(&self) {
        self.gate.stop()
    }

    /// `Recognized → Armed`.
    pub fn reset(&self) -> bool {
        self.gate.reset()
    }

    pub fn state(&self) -> PipelineState {
        self.gate.state()
    }

    /// Number of cycles the pipeline thread has finished (including discarded ones).
    pub fn cycles_completed(&self) -> u64 {
        self.gate.cycles_completed()
    }

    pub fn events_emitted(&self) -> u64 {
        self.gate.events_emitted()
    }
}

/// Owns the pipeline thread. Dropping it shuts the thread down.
pub struct Pipeline {
    handle: PipelineHandle,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Stop, then wait for the thread to finish its current cycle and exit.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.handle.stop();
        // Capacity is reserved for this message; failure means the thread already exited.
        let _ = self.handle.tx.try_send(Job::Shutdown);
        if worker.join().is_err() {
            tracing::error!("pipeline thread panicked");
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

/// Spawn the pipeline on a dedicated OS thread.
///
/// The pipeline starts `Idle`; call [`PipelineHandle::start`] to arm it.
/// Identification events arrive on the returned receiver, off the capture
/// path.
pub fn spawn_pipeline<A, C>(
    analyzer: A,
    gallery: Arc<GalleryStore>,
    config: C,
) -> Result<(Pipeline, EventReceiver), PipelineError>
where
    A: FaceAnalyzer + 'static,
    C: ConfigSource + 'static,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let gate = Arc::new(FrameGate::new(event_tx));
    let (tx, mut rx) = mpsc::channel::<Job>(JOB_CHANNEL_CAPACITY);

    tracing::info!(persons = gallery.snapshot().len(), "starting pipeline");
    let mut orchestrator = Orchestrator::new(analyzer, gallery, config);
    let worker_gate = gate.clone();

    let worker = std::thread::Builder::new()
        .name("idgate-pipeline".into())
        .spawn(move || {
            tracing::info!("pipeline thread started");
            while let Some(job) = rx.blocking_recv() {
                match job {
                    Job::Cycle { frame, admission } => {
                        let outcome = run_guarded(&mut orchestrator, &frame);
                        drop(frame);
                        log_outcome(&outcome);
                        worker_gate.complete(admission, outcome);
                    }
                    Job::Shutdown => break,
                }
            }
            tracing::info!("pipeline thread exiting");
        })?;

    Ok((
        Pipeline {
            handle: PipelineHandle { gate, tx },
            worker: Some(worker),
        },
        event_rx,
    ))
}

/// Run a cycle, turning a panic anywhere in it into a skipped cycle so the
/// thread keeps serving frames.
fn run_guarded<A: FaceAnalyzer, C: ConfigSource>(
    orchestrator: &mut Orchestrator<A, C>,
    frame: &Frame,
) -> CycleOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| orchestrator.run_cycle(frame))).unwrap_or_else(|_| {
        tracing::warn!("cycle panicked; skipped");
        CycleOutcome::Skipped(SkipReason::Panicked)
    })
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Skipped(reason) => tracing::debug!(%reason, "cycle skipped"),
        CycleOutcome::Rejected { similarity } => {
            tracing::debug!(similarity, "no gallery match above threshold")
        }
        CycleOutcome::Identified(event) => {
            tracing::debug!(person = %event.person.name, "cycle matched")
        }
    }
}
