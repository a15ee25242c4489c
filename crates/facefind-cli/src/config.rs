use std::path::PathBuf;

use facefind_core::detector::DEFAULT_CONFIDENCE_THRESHOLD;
use facefind_core::{DEFAULT_EXTENSIONS, DEFAULT_TOLERANCE};

/// Run configuration: `FACEFIND_*` environment variables with defaults,
/// later overridden by command-line flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing det_10g.onnx and w600k_r50.onnx.
    pub model_dir: PathBuf,
    /// Maximum encoding distance for two faces to count as the same person.
    pub tolerance: f32,
    /// Minimum SCRFD score for a detection to count as a face.
    pub min_confidence: f32,
    /// Album file extensions to scan.
    pub extensions: Vec<String>,
}

impl Config {
    /// Load configuration from `FACEFIND_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let model_dir = lookup("FACEFIND_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(facefind_core::default_model_dir);

        let extensions = lookup("FACEFIND_EXTENSIONS")
            .map(|v| split_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());

        Self {
            model_dir,
            tolerance: parse_or(&lookup, "FACEFIND_TOLERANCE", DEFAULT_TOLERANCE),
            min_confidence: parse_or(
                &lookup,
                "FACEFIND_MIN_CONFIDENCE",
                DEFAULT_CONFIDENCE_THRESHOLD,
            ),
            extensions,
        }
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f32) -> f32 {
    match lookup(key).map(|v| v.trim().parse::<f32>()) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!(key, error = %e, default, "ignoring unparsable value");
            default
        }
        None => default,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
