//! facefind-core: find the photos in an album that show a given face.
//!
//! Uses SCRFD for face detection and ArcFace for face encoding, both
//! running via ONNX Runtime for CPU inference, and a single sequential
//! pass that copies matching album images into an output directory.

pub mod album;
pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod frame;
pub mod recognizer;
pub mod search;
pub mod types;

use std::path::PathBuf;

pub use album::{discover_images, AlbumError, DEFAULT_EXTENSIONS};
pub use encoder::{EncodeError, FaceEncoder, OnnxFaceEncoder};
pub use frame::{Frame, FrameError};
pub use search::{
    FaceFinder, SearchError, SearchProgress, SearchSummary, SkipReason, DEFAULT_TOLERANCE,
};
pub use types::{
    BoundingBox, DistanceMatcher, Embedding, EncodedFace, MatchResult, Matcher, ReferenceFace,
};

/// Where the ONNX models live when nothing else is configured:
/// `$XDG_DATA_HOME/facefind/models`, else `$HOME/.local/share/facefind/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facefind")
        .join("models")
}
