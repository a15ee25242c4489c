//! ArcFace face recognizer via ONNX Runtime.
//!
//! Turns an aligned 112×112 face crop into a 512-dimensional, L2-normalized
//! face encoding using the w600k_r50 ArcFace model.

use crate::alignment::{self, ALIGNED_SIZE};
use crate::types::{BoundingBox, Embedding};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // ArcFace normalizes symmetrically, unlike SCRFD
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} (place w600k_r50.onnx from insightface in the model directory)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face has no landmarks; alignment needs the detector's five points")]
    NoLandmarks,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face recognizer.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Encode one detected face of a grayscale frame.
    pub fn extract(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<Embedding, RecognizerError> {
        let landmarks = face.landmarks.as_ref().ok_or(RecognizerError::NoLandmarks)?;

        let aligned = alignment::align_face(frame, width, height, landmarks);
        let input = Self::preprocess(&aligned);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw_data.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw_data.len()
            )));
        }

        let mut values = raw_data.to_vec();
        l2_normalize(&mut values);

        Ok(Embedding {
            values,
            model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
        })
    }

    /// Aligned grayscale crop → NCHW float tensor, Y replicated to 3 channels.
    fn preprocess(aligned_face: &[u8]) -> Array4<f32> {
        let size = ALIGNED_SIZE;
        Array4::from_shape_fn((1, 3, size, size), |(_, _, y, x)| {
            let pixel = aligned_face.get(y * size + x).copied().unwrap_or(0) as f32;
            (pixel - ARCFACE_MEAN) / ARCFACE_STD
        })
    }
}

/// Scale to unit length in place; a zero vector is left untouched.
fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|x| *x /= norm);
    }
}
