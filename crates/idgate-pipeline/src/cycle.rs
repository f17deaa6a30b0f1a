//! One recognition cycle: decode → detect → liveness gate → extract → match.

use crate::config::{ConfigSource, PipelineConfig};
use crate::sink::ResultEvent;
use chrono::Utc;
use idgate_core::frame::{self, FrameDecodeError};
use idgate_core::{
    AnalyzerError, DetectionParams, FaceAnalyzer, Frame, GalleryStore, Matcher,
    NearestNeighborMatcher,
};
use std::sync::Arc;
use thiserror::Error;

/// Why a cycle ended without a match decision. None of these are fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("frame decode failed: {0}")]
    Decode(#[from] FrameDecodeError),
    #[error("no face detected")]
    NoFace,
    #[error("liveness {liveness} not above threshold")]
    LivenessBelowThreshold { liveness: f32 },
    #[error("gallery is empty")]
    EmptyGallery,
    #[error("{0}")]
    Detection(AnalyzerError),
    #[error("{0}")]
    Extraction(AnalyzerError),
    #[error("cycle panicked")]
    Panicked,
}

/// Result of a single cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    /// A live face was compared, but nobody scored above the identify threshold.
    Rejected { similarity: f32 },
    Identified(ResultEvent),
}

/// Runs recognition cycles against the current gallery snapshot.
///
/// Holds no latch state of its own; admission and the terminal
/// transition belong to [`FrameGate`](crate::gate::FrameGate).
pub struct Orchestrator<A, C> {
    analyzer: A,
    gallery: Arc<GalleryStore>,
    config: C,
    last_good: PipelineConfig,
    config_degraded: bool,
}

impl<A: FaceAnalyzer, C: ConfigSource> Orchestrator<A, C> {
    pub fn new(analyzer: A, gallery: Arc<GalleryStore>, config: C) -> Self {
        Self {
            analyzer,
            gallery,
            config,
            last_good: PipelineConfig::default(),
            config_degraded: false,
        }
    }

    /// Settings for this cycle, falling back to the last good value on error.
    fn current_config(&mut self) -> PipelineConfig {
        match self.config.load() {
            Ok(config) => {
                if self.config_degraded {
                    tracing::info!("configuration readable again");
                    self.config_degraded = false;
                }
                self.last_good = config;
                config
            }
            Err(err) => {
                if !self.config_degraded {
                    tracing::warn!(error = %err, "config read failed; keeping last known good");
                    self.config_degraded = true;
                }
                self.last_good
            }
        }
    }

    /// Process one admitted frame.
    pub fn run_cycle(&mut self, frame: &Frame) -> CycleOutcome {
        let config = self.current_config();

        let image = match frame::decode(frame, config.camera_lens) {
            Ok(image) => image,
            Err(e) => return CycleOutcome::Skipped(e.into()),
        };

        let params = DetectionParams {
            check_liveness: true,
            liveness_level: config.liveness_level,
        };
        let faces = match self.analyzer.detect(&image, &params) {
            Ok(faces) => faces,
            Err(e) => return CycleOutcome::Skipped(SkipReason::Detection(e)),
        };

        // Single-subject: only the primary detection is considered.
        let Some(face) = faces.into_iter().next() else {
            return CycleOutcome::Skipped(SkipReason::NoFace);
        };

        // Strict, and NaN never passes.
        if !(face.liveness > config.liveness_threshold) {
            return CycleOutcome::Skipped(SkipReason::LivenessBelowThreshold {
                liveness: face.liveness,
            });
        }

        let gallery = self.gallery.snapshot();
        if gallery.is_empty() {
            return CycleOutcome::Skipped(SkipReason::EmptyGallery);
        }

        let probe = match self.analyzer.extract_template(&image, &face) {
            Ok(template) => template,
            Err(e) => return CycleOutcome::Skipped(SkipReason::Extraction(e)),
        };

        let result = NearestNeighborMatcher::new(&self.analyzer).identify(
            &probe,
            &gallery,
            config.identify_threshold,
        );

        let person = match result.person {
            Some(person) if result.accepted => person,
            _ => {
                return CycleOutcome::Rejected {
                    similarity: result.similarity,
                }
            }
        };

        CycleOutcome::Identified(ResultEvent {
            person,
            similarity: result.similarity,
            liveness: face.liveness,
            yaw: face.yaw,
            roll: face.roll,
            pitch: face.pitch,
            cropped_face: frame::crop_face(&image, &face.bbox),
            identified_at: Utc::now(),
        })
    }
}
