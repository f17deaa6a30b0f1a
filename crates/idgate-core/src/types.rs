use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Bounding box for a detected face, in decoded-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A face found by the analyzer in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    /// Head pose in degrees.
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
    /// Confidence in [0, 1] that the face belongs to a live subject.
    pub liveness: f32,
}

/// Biometric template (fixed-size embedding vector).
///
/// The values are private: a template is immutable once the analyzer
/// has produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    values: Vec<f32>,
}

impl Template {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cosine similarity in [-1, 1]. Zero vectors compare as 0.0.
    ///
    /// Always processes all dimensions, no early return.
    pub fn cosine(&self, other: &Template) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

impl From<Vec<f32>> for Template {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// An enrolled person.
#[derive(Debug, Clone)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    /// Enrollment templates. A [`Gallery`](crate::Gallery) rejects persons without any.
    pub templates: Vec<Template>,
    /// Representative face image captured at enrollment, if the store kept one.
    pub face: Option<RgbImage>,
}

impl Person {
    /// Create a person with a freshly generated identifier.
    pub fn new(name: impl Into<String>, templates: Vec<Template>) -> Self {
        Self::with_id(Uuid::new_v4(), name, templates)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, templates: Vec<Template>) -> Self {
        Self {
            id,
            name: name.into(),
            templates,
            face: None,
        }
    }

    pub fn with_face(mut self, face: RgbImage) -> Self {
        self.face = Some(face);
        self
    }
}

/// Result of matching a probe template against a gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Best-scoring person, present only when the match was accepted.
    pub person: Option<Arc<Person>>,
    /// Best person-level similarity seen (0.0 for an empty gallery).
    pub similarity: f32,
    pub accepted: bool,
}

impl MatchResult {
    pub fn rejected(similarity: f32) -> Self {
        Self {
            person: None,
            similarity,
            accepted: false,
        }
    }
}
