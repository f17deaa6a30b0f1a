//! Interface to the external face analysis capability.
//!
//! Detection, liveness scoring, template extraction and similarity are
//! provided by an opaque engine (vendor SDK, ONNX models, ...). The
//! pipeline only depends on this trait.

use crate::types::{DetectedFace, Template};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("detection failed: {0}")]
    DetectionFailed(String),
    #[error("template extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Parameters passed to every detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParams {
    pub check_liveness: bool,
    /// Engine-specific liveness model level.
    pub liveness_level: u8,
}

/// Scores two templates against each other.
pub trait TemplateSimilarity {
    /// Similarity in [0, 1]. Higher = more similar.
    fn similarity(&self, a: &Template, b: &Template) -> f32;
}

impl<T: TemplateSimilarity + ?Sized> TemplateSimilarity for &T {
    fn similarity(&self, a: &Template, b: &Template) -> f32 {
        (**self).similarity(a, b)
    }
}

/// Cosine similarity clamped to [0, 1].
///
/// Analyzers whose engine produces L2-comparable embeddings can delegate
/// their [`TemplateSimilarity`] impl to this.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl TemplateSimilarity for CosineSimilarity {
    fn similarity(&self, a: &Template, b: &Template) -> f32 {
        a.cosine(b).clamp(0.0, 1.0)
    }
}

/// Face analysis engine.
///
/// Calls are treated as bounded and synchronous. An engine with
/// asynchronous completion must block until the result is available.
pub trait FaceAnalyzer: TemplateSimilarity + Send {
    /// Detect faces, most prominent first.
    fn detect(
        &mut self,
        image: &RgbImage,
        params: &DetectionParams,
    ) -> Result<Vec<DetectedFace>, AnalyzerError>;

    /// Extract a template for `face`.
    ///
    /// Returns [`AnalyzerError::ExtractionFailed`] on malformed input.
    fn extract_template(
        &mut self,
        image: &RgbImage,
        face: &DetectedFace,
    ) -> Result<Template, AnalyzerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_clamps_negative() {
        let a = Template::new(vec![1.0, 0.0]);
        let b = Template::new(vec![-1.0, 0.0]);
        assert_eq!(CosineSimilarity.similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_through_reference() {
        let a = Template::new(vec![0.6, 0.8]);
        let scorer = &CosineSimilarity;
        assert!((scorer.similarity(&a, &a) - 1.0).abs() < 1e-6);
    }
}
