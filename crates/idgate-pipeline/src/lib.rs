//! idgate-pipeline — per-frame identification state machine.
//!
//! A capture producer offers frames through a [`PipelineHandle`]. At most
//! one frame is processed at a time on a dedicated thread; frames arriving
//! while busy are dropped. The first live face matching the gallery moves
//! the pipeline to [`PipelineState::Recognized`] and emits exactly one
//! [`ResultEvent`] until the pipeline is reset.

pub mod config;
pub mod cycle;
pub mod engine;
pub mod gate;
pub mod sink;

#[cfg(test)]
mod testing;

pub use config::{
    ConfigError, ConfigSource, EnvConfigSource, FileConfigSource, PipelineConfig,
    WatchConfigSource,
};
pub use cycle::{CycleOutcome, Orchestrator, SkipReason};
pub use engine::{spawn_pipeline, Pipeline, PipelineError, PipelineHandle};
pub use gate::{Admission, Completion, FrameGate, PipelineState};
pub use sink::{forward_events, EventReceiver, IdentificationSummary, ResultEvent, ResultSink, TracingSink};
