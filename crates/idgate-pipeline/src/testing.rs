//! Test doubles shared by the pipeline unit tests.

use idgate_core::{
    AnalyzerError, BoundingBox, ColorFormat, DetectedFace, DetectionParams, FaceAnalyzer, Frame,
    Gallery, GalleryStore, Person, RgbImage, Template, TemplateSimilarity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

/// Analyzer returning canned detections.
///
/// Similarity is the first value of the enrolled template, so a gallery
/// built with [`gallery_of`] states each template's score directly.
pub(crate) struct ScriptedAnalyzer {
    pub faces: Vec<DetectedFace>,
    pub template: Result<Template, AnalyzerError>,
    pub detect_calls: Arc<AtomicUsize>,
    pub extract_calls: Arc<AtomicUsize>,
    pub last_params: Arc<Mutex<Option<DetectionParams>>>,
    /// Signalled when `detect` is entered.
    pub entered: Option<mpsc::Sender<()>>,
    /// When set, `detect` blocks until a message (or disconnect) arrives.
    pub hold: Option<mpsc::Receiver<()>>,
    pub panic_on_detect: bool,
}

impl ScriptedAnalyzer {
    pub fn new(faces: Vec<DetectedFace>) -> Self {
        Self {
            faces,
            template: Ok(Template::new(vec![1.0, 0.0])),
            detect_calls: Arc::new(AtomicUsize::new(0)),
            extract_calls: Arc::new(AtomicUsize::new(0)),
            last_params: Arc::new(Mutex::new(None)),
            entered: None,
            hold: None,
            panic_on_detect: false,
        }
    }
}

impl TemplateSimilarity for ScriptedAnalyzer {
    fn similarity(&self, _probe: &Template, enrolled: &Template) -> f32 {
        enrolled.as_slice()[0]
    }
}

impl FaceAnalyzer for ScriptedAnalyzer {
    fn detect(
        &mut self,
        _image: &RgbImage,
        params: &DetectionParams,
    ) -> Result<Vec<DetectedFace>, AnalyzerError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(*params);
        if let Some(entered) = &self.entered {
            let _ = entered.send(());
        }
        if let Some(hold) = &self.hold {
            let _ = hold.recv();
        }
        if self.panic_on_detect {
            panic!("scripted analyzer failure");
        }
        Ok(self.faces.clone())
    }

    fn extract_template(
        &mut self,
        _image: &RgbImage,
        _face: &DetectedFace,
    ) -> Result<Template, AnalyzerError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.template.clone()
    }
}

pub(crate) fn face(liveness: f32) -> DetectedFace {
    DetectedFace {
        bbox: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
        },
        yaw: 3.0,
        roll: -1.0,
        pitch: 2.0,
        liveness,
    }
}

/// Gallery of persons whose templates score the given values.
pub(crate) fn gallery_of(entries: &[(&str, &[f32])]) -> Arc<GalleryStore> {
    let persons = entries
        .iter()
        .map(|(name, scores)| {
            Person::new(*name, scores.iter().map(|&s| Template::new(vec![s])).collect())
        })
        .collect();
    Arc::new(GalleryStore::new(Gallery::new(persons).unwrap()))
}

pub(crate) fn gray_frame() -> Frame {
    Frame::new(vec![128; 16], 4, 4, ColorFormat::Gray8)
}
