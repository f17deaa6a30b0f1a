//! idgate-core — building blocks for on-device face identification.
//!
//! Frame decoding, the opaque face analysis interface, the enrolled
//! gallery and nearest-neighbor matching. The per-frame state machine
//! lives in `idgate-pipeline`.

pub mod analyzer;
pub mod frame;
pub mod gallery;
pub mod matcher;
pub mod types;

pub use analyzer::{AnalyzerError, CosineSimilarity, DetectionParams, FaceAnalyzer, TemplateSimilarity};
pub use frame::{CameraLens, ColorFormat, Frame, FrameDecodeError, Rotation};
pub use gallery::{Gallery, GalleryError, GalleryStore};
pub use matcher::{Matcher, NearestNeighborMatcher};
pub use types::{BoundingBox, DetectedFace, MatchResult, Person, Template};

/// Re-exported so downstream crates name the same image types.
pub use image::RgbImage;
