//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free decoding over three strides followed by NMS. Input frames are
//! letterboxed into a 640×640 tensor, so album photos of any aspect ratio
//! map back to their own pixel coordinates.

use crate::types::BoundingBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} (place det_10g.onnx from insightface in the model directory)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Output tensor indices for one stride: (score_idx, bbox_idx, kps_idx).
type StrideOutputIndices = (usize, usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    input_height: usize,
    input_width: usize,
    confidence_threshold: f32,
    /// Per-stride output indices [(score, bbox, kps)] for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let num_outputs = output_names.len();

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if num_outputs < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {num_outputs}"
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            input_height: SCRFD_INPUT_SIZE,
            input_width: SCRFD_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            stride_indices,
        })
    }

    /// Minimum detection score for a face to be reported.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Detect faces in a grayscale frame, returning bounding boxes sorted by confidence.
    pub fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let expected = width as usize * height as usize;
        if width == 0 || height == 0 || frame.len() < expected {
            return Err(DetectorError::InferenceFailed(format!(
                "frame buffer holds {} bytes, {width}x{height} needs {expected}",
                frame.len()
            )));
        }

        let (input, letterbox) = self.preprocess(frame, width as usize, height as usize);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();

        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    DetectorError::InferenceFailed(format!("scores stride {stride}: {e}"))
                })?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}"))
                })?;
            let (_, kps) = outputs[kps_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("kps stride {stride}: {e}")))?;

            let dets = decode_stride(
                scores,
                bboxes,
                kps,
                stride,
                self.input_width,
                self.input_height,
                &letterbox,
                self.confidence_threshold,
            );
            all_detections.extend(dets);
        }

        // nms() returns survivors in descending confidence order.
        Ok(nms(all_detections, SCRFD_NMS_THRESHOLD))
    }

    /// Preprocess a grayscale frame into a NCHW float tensor with letterbox padding.
    fn preprocess(
        &self,
        frame: &[u8],
        width: usize,
        height: usize,
    ) -> (Array4<f32>, LetterboxInfo) {
        let scale_w = self.input_width as f32 / width as f32;
        let scale_h = self.input_height as f32 / height as f32;
        let scale = scale_w.min(scale_h);

        let new_w = ((width as f32 * scale).round() as usize).clamp(1, self.input_width);
        let new_h = ((height as f32 * scale).round() as usize).clamp(1, self.input_height);
        let pad_x = (self.input_width - new_w) as f32 / 2.0;
        let pad_y = (self.input_height - new_h) as f32 / 2.0;

        let letterbox = LetterboxInfo { scale, pad_x, pad_y };

        let resized = resize_bilinear(frame, width, height, new_w, new_h);

        // Pad with SCRFD_MEAN so the border normalizes to 0.0.
        let pad_x_start = pad_x.floor() as usize;
        let pad_y_start = pad_y.floor() as usize;

        let mut tensor = Array4::<f32>::zeros((1, 3, self.input_height, self.input_width));

        for y in 0..self.input_height {
            for x in 0..self.input_width {
                let pixel = if y >= pad_y_start
                    && y < pad_y_start + new_h
                    && x >= pad_x_start
                    && x < pad_x_start + new_w
                {
                    resized[(y - pad_y_start) * new_w + (x - pad_x_start)] as f32
                } else {
                    SCRFD_MEAN
                };

                let normalized = (pixel - SCRFD_MEAN) / SCRFD_STD;
                // Grayscale → 3-channel: replicate Y → [R=Y, G=Y, B=Y]
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }

        (tensor, letterbox)
    }
}

/// Resize a grayscale buffer with bilinear interpolation (pixel-center aligned).
fn resize_bilinear(src: &[u8], width: usize, height: usize, new_w: usize, new_h: usize) -> Vec<u8> {
    let inv_scale_x = width as f32 / new_w as f32;
    let inv_scale_y = height as f32 / new_h as f32;
    let mut resized = vec![0u8; new_w * new_h];

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * inv_scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * inv_scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = src[y0 * width + x0] as f32;
            let tr = src[y0 * width + x1] as f32;
            let bl = src[y1 * width + x0] as f32;
            let br = src[y1 * width + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            resized[y * new_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    resized
}

/// Discover output tensor ordering by name.
///
/// SCRFD exports either name their outputs ("score_8", "bbox_16", "kps_32", ...)
/// or use generic numeric names. Without recognizable names the standard
/// positional ordering applies:
///   [0-2] = scores (strides 8, 16, 32)
///   [3-5] = bboxes (strides 8, 16, 32)
///   [6-8] = kps    (strides 8, 16, 32)
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?, find("kps", stride)?)))
        .collect();

    match named {
        Some(indices) => {
            tracing::debug!("SCRFD: using name-based output tensor mapping");
            [indices[0], indices[1], indices[2]]
        }
        None => {
            tracing::debug!(
                ?names,
                "SCRFD: output names not recognized, using positional mapping"
            );
            [(0, 3, 6), (1, 4, 7), (2, 5, 8)]
        }
    }
}

/// Decode detections for a single stride level.
#[allow(clippy::too_many_arguments)]
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    kps: &[f32],
    stride: usize,
    input_width: usize,
    input_height: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid_h = input_height / stride;
    let grid_w = input_width / stride;
    let num_anchors = grid_h * grid_w * SCRFD_ANCHORS_PER_CELL;
    let stride_f = stride as f32;

    let unmap = |x: f32, y: f32| {
        (
            (x - letterbox.pad_x) / letterbox.scale,
            (y - letterbox.pad_y) / letterbox.scale,
        )
    };

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let anchor_idx = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_cx = (anchor_idx % grid_w) as f32 * stride_f;
        let anchor_cy = (anchor_idx / grid_w) as f32 * stride_f;

        // bbox: [left, top, right, bottom] distances from the anchor, in stride units
        let bbox_off = idx * 4;
        let Some(d) = bboxes.get(bbox_off..bbox_off + 4) else {
            continue;
        };
        let (x1, y1) = unmap(anchor_cx - d[0] * stride_f, anchor_cy - d[1] * stride_f);
        let (x2, y2) = unmap(anchor_cx + d[2] * stride_f, anchor_cy + d[3] * stride_f);

        let kps_off = idx * 10;
        let landmarks = kps.get(kps_off..kps_off + 10).map(|k| {
            std::array::from_fn(|i| {
                unmap(
                    anchor_cx + k[i * 2] * stride_f,
                    anchor_cy + k[i * 2 + 1] * stride_f,
                )
            })
        });

        detections.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }

    detections
}

/// Non-Maximum Suppression: remove overlapping detections.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|kept| iou(kept, &det) <= iou_threshold) {
            keep.push(det);
        }
    }

    keep
}

/// Compute Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union_area = a.width * a.height + b.width * b.height - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}
