use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face encoding (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Wrap raw values with no model version attached.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Cosine similarity in [-1, 1]. Higher means more alike.
    ///
    /// A zero-length vector on either side yields 0.0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Euclidean distance between two embeddings.
    ///
    /// Embeddings of different length are never comparable and yield
    /// `f32::INFINITY`, so they can never fall within a tolerance.
    pub fn distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A face found in an image: where it is and what it looks like.
#[derive(Debug, Clone)]
pub struct EncodedFace {
    pub location: BoundingBox,
    pub embedding: Embedding,
}

/// The target face, taken from one reference image.
#[derive(Debug, Clone)]
pub struct ReferenceFace {
    pub source: PathBuf,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the reference faces.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Euclidean distance to the closest reference (`f32::INFINITY` if none).
    pub distance: f32,
    /// Index of the closest reference face (if any).
    pub reference: Option<usize>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            distance: f32::INFINITY,
            reference: None,
        }
    }

    /// Pick the closer of two results.
    pub fn closer(self, other: MatchResult) -> MatchResult {
        if other.distance < self.distance {
            other
        } else {
            self
        }
    }
}

/// Strategy for comparing a probe embedding against the reference faces.
pub trait Matcher {
    fn compare(
        &self,
        probe: &Embedding,
        references: &[ReferenceFace],
        tolerance: f32,
    ) -> MatchResult;
}

/// Euclidean distance matcher: same person when the closest reference is
/// at or below the tolerance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceMatcher;

impl Matcher for DistanceMatcher {
    fn compare(
        &self,
        probe: &Embedding,
        references: &[ReferenceFace],
        tolerance: f32,
    ) -> MatchResult {
        let mut best = MatchResult::no_match();

        for (i, reference) in references.iter().enumerate() {
            let distance = probe.distance(&reference.embedding);
            if distance < best.distance {
                best.distance = distance;
                best.reference = Some(i);
            }
        }

        best.matched = best.reference.is_some() && best.distance <= tolerance;
        best
    }
}
