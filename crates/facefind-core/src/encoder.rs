//! Face encoder seam: frame in, located face encodings out.

use crate::detector::{DetectorError, FaceDetector};
use crate::frame::Frame;
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::EncodedFace;
use std::path::Path;
use thiserror::Error;

pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("minimum detection confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f32),
}

/// Finds faces in a frame and encodes each one.
///
/// Faces come back in the detector's order, most confident first. An empty
/// vector means no face was found, which is not an error.
pub trait FaceEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>, EncodeError>;
}

/// SCRFD detection followed by ArcFace recognition.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    pub fn new(detector: FaceDetector, recognizer: FaceRecognizer) -> Self {
        Self {
            detector,
            recognizer,
        }
    }

    /// Load both models from `model_dir` using their standard file names.
    ///
    /// `min_confidence` is checked before any model is opened.
    pub fn load(model_dir: &Path, min_confidence: f32) -> Result<Self, EncodeError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(EncodeError::InvalidConfidence(min_confidence));
        }
        let detector = FaceDetector::load(&model_dir.join(SCRFD_MODEL_FILE))?
            .with_confidence_threshold(min_confidence);
        let recognizer = FaceRecognizer::load(&model_dir.join(ARCFACE_MODEL_FILE))?;
        Ok(Self::new(detector, recognizer))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>, EncodeError> {
        let faces = self.detector.detect(&frame.data, frame.width, frame.height)?;
        tracing::trace!(path = ?frame.path, faces = faces.len(), "detection done");

        let mut encoded = Vec::with_capacity(faces.len());
        for face in faces {
            if face.landmarks.is_none() {
                tracing::debug!(confidence = face.confidence, "skipping face without landmarks");
                continue;
            }
            let embedding = self
                .recognizer
                .extract(&frame.data, frame.width, frame.height, &face)?;
            encoded.push(EncodedFace {
                location: face,
                embedding,
            });
        }

        Ok(encoded)
    }
}
