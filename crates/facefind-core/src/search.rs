//! The match-and-copy pass over an album.
//!
//! One sequential sweep: every candidate is decoded, encoded, compared with
//! the reference faces and copied verbatim into the output directory when
//! any of its faces is within tolerance. Per-file problems skip the file;
//! only reference, album and output-directory failures abort the run.

use crate::album::{self, AlbumError, DEFAULT_EXTENSIONS};
use crate::encoder::FaceEncoder;
use crate::frame::Frame;
use crate::types::{DistanceMatcher, EncodedFace, MatchResult, Matcher, ReferenceFace};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default Euclidean tolerance between unit-length ArcFace encodings.
///
/// 1.10 corresponds to a cosine similarity of about 0.395.
pub const DEFAULT_TOLERANCE: f32 = 1.10;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("tolerance must be a finite, non-negative number, got {0}")]
    InvalidTolerance(f32),
    #[error("no face found in any reference image")]
    NoReferenceFace,
    #[error(transparent)]
    Album(#[from] AlbumError),
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output directory {0} is the album itself")]
    OutputIsAlbum(PathBuf),
    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why an image was passed over without a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Unreadable(String),
    EncodeFailed(String),
    NoFace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::EncodeFailed(e) => write!(f, "face encoding failed: {e}"),
            SkipReason::NoFace => f.write_str("no face detected"),
        }
    }
}

/// Progress reported while references load and the album is scanned.
#[derive(Debug)]
pub enum SearchProgress<'a> {
    ReferenceLoaded { path: &'a Path, faces: usize },
    ReferenceSkipped { path: &'a Path, reason: SkipReason },
    Started { total: usize },
    Scanning {
        current: usize,
        total: usize,
        path: &'a Path,
    },
    Matched {
        path: &'a Path,
        copied_to: &'a Path,
        distance: f32,
    },
    Rejected { path: &'a Path, distance: f32 },
    Skipped { path: &'a Path, reason: SkipReason },
    Completed(&'a SearchSummary),
}

/// Counts for one pass. `scanned = matched + rejected + no_face + unreadable + failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSummary {
    pub references: usize,
    pub scanned: usize,
    pub matched: usize,
    /// Faces found, none within tolerance.
    pub rejected: usize,
    pub no_face: usize,
    pub unreadable: usize,
    /// Decoded, but the encoder returned an error.
    pub failed: usize,
    pub output_dir: PathBuf,
}

/// Compares album images against reference faces and copies the matches.
pub struct FaceFinder<E, M = DistanceMatcher> {
    encoder: E,
    matcher: M,
    tolerance: f32,
    extensions: Vec<String>,
}

impl<E: FaceEncoder> FaceFinder<E> {
    pub fn new(encoder: E, tolerance: f32) -> Result<Self, SearchError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SearchError::InvalidTolerance(tolerance));
        }
        Ok(Self {
            encoder,
            matcher: DistanceMatcher,
            tolerance,
            extensions: album::normalize_extensions(&DEFAULT_EXTENSIONS),
        })
    }
}

impl<E: FaceEncoder, M: Matcher> FaceFinder<E, M> {
    pub fn with_matcher<N: Matcher>(self, matcher: N) -> FaceFinder<E, N> {
        FaceFinder {
            encoder: self.encoder,
            matcher,
            tolerance: self.tolerance,
            extensions: self.extensions,
        }
    }

    /// Restrict the scan to these extensions. An empty list keeps the current set.
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        let normalized = album::normalize_extensions(extensions);
        if !normalized.is_empty() {
            self.extensions = normalized;
        }
        self
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Encode the reference images, keeping the most confident face of each.
    ///
    /// Images that cannot be read or contain no face are reported and
    /// skipped. Fails with [`SearchError::NoReferenceFace`] when none is left.
    pub fn load_references(
        &mut self,
        paths: &[PathBuf],
        mut on_progress: impl FnMut(SearchProgress<'_>),
    ) -> Result<Vec<ReferenceFace>, SearchError> {
        let mut references = Vec::with_capacity(paths.len());

        for path in paths {
            match self.encode_path(path) {
                Ok(faces) if !faces.is_empty() => {
                    if faces.len() > 1 {
                        tracing::debug!(
                            path = %path.display(),
                            faces = faces.len(),
                            "reference has several faces; using the most confident"
                        );
                    }
                    on_progress(SearchProgress::ReferenceLoaded {
                        path,
                        faces: faces.len(),
                    });
                    if let Some(face) = faces.into_iter().next() {
                        references.push(ReferenceFace {
                            source: path.clone(),
                            embedding: face.embedding,
                        });
                    }
                }
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "no face detected in reference image");
                    on_progress(SearchProgress::ReferenceSkipped {
                        path,
                        reason: SkipReason::NoFace,
                    });
                }
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "skipping reference image");
                    on_progress(SearchProgress::ReferenceSkipped { path, reason });
                }
            }
        }

        if references.is_empty() {
            return Err(SearchError::NoReferenceFace);
        }
        tracing::info!(count = references.len(), "reference faces loaded");
        Ok(references)
    }

    /// The closest comparison over every face in a candidate.
    pub fn best_match(&self, faces: &[EncodedFace], references: &[ReferenceFace]) -> MatchResult {
        faces
            .iter()
            .map(|face| self.matcher.compare(&face.embedding, references, self.tolerance))
            .fold(MatchResult::no_match(), MatchResult::closer)
    }

    /// Scan `album` and copy every image with a matching face into `output`.
    ///
    /// The output directory is created if absent. A matching image is copied
    /// once under its own file name, overwriting a previous copy, so
    /// repeated runs over an unchanged album leave the same output set.
    pub fn run(
        &mut self,
        references: &[ReferenceFace],
        album_dir: &Path,
        output: &Path,
        mut on_progress: impl FnMut(SearchProgress<'_>),
    ) -> Result<SearchSummary, SearchError> {
        if references.is_empty() {
            return Err(SearchError::NoReferenceFace);
        }

        let images = album::discover_images(album_dir, &self.extensions)?;

        fs::create_dir_all(output).map_err(|source| SearchError::OutputDir {
            path: output.to_path_buf(),
            source,
        })?;
        if same_directory(album_dir, output) {
            return Err(SearchError::OutputIsAlbum(output.to_path_buf()));
        }

        let total = images.len();
        tracing::info!(
            album = %album_dir.display(),
            output = %output.display(),
            total,
            tolerance = self.tolerance,
            "searching album"
        );
        on_progress(SearchProgress::Started { total });

        let mut summary = SearchSummary {
            references: references.len(),
            output_dir: output.to_path_buf(),
            ..SearchSummary::default()
        };

        for (index, path) in images.iter().enumerate() {
            on_progress(SearchProgress::Scanning {
                current: index + 1,
                total,
                path,
            });
            summary.scanned += 1;

            let faces = match self.encode_path(path) {
                Ok(faces) => faces,
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "skipping image");
                    match reason {
                        SkipReason::Unreadable(_) => summary.unreadable += 1,
                        _ => summary.failed += 1,
                    }
                    on_progress(SearchProgress::Skipped { path, reason });
                    continue;
                }
            };

            if faces.is_empty() {
                tracing::debug!(path = %path.display(), "no face detected");
                summary.no_face += 1;
                on_progress(SearchProgress::Skipped {
                    path,
                    reason: SkipReason::NoFace,
                });
                continue;
            }

            let result = self.best_match(&faces, references);
            if !result.matched {
                tracing::debug!(
                    path = %path.display(),
                    distance = result.distance,
                    "no matching face"
                );
                summary.rejected += 1;
                on_progress(SearchProgress::Rejected {
                    path,
                    distance: result.distance,
                });
                continue;
            }

            let copied_to = copy_into(path, output)?;
            tracing::info!(
                path = %path.display(),
                distance = result.distance,
                faces = faces.len(),
                "match copied"
            );
            summary.matched += 1;
            on_progress(SearchProgress::Matched {
                path,
                copied_to: &copied_to,
                distance: result.distance,
            });
        }

        tracing::info!(
            scanned = summary.scanned,
            matched = summary.matched,
            skipped = summary.no_face + summary.unreadable + summary.failed,
            "search complete"
        );
        on_progress(SearchProgress::Completed(&summary));

        Ok(summary)
    }

    fn encode_path(&mut self, path: &Path) -> Result<Vec<EncodedFace>, SkipReason> {
        let frame = Frame::open(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
        self.encoder
            .encode(&frame)
            .map_err(|e| SkipReason::EncodeFailed(e.to_string()))
    }
}

/// Copy `source` byte-for-byte into `output_dir` under its own file name,
/// carrying over its modification time.
///
/// A failed copy leaves no file behind at the target.
fn copy_into(source: &Path, output_dir: &Path) -> Result<PathBuf, SearchError> {
    let file_name = source.file_name().unwrap_or(source.as_os_str());
    let target = output_dir.join(file_name);
    copy_with_mtime(source, &target).map_err(|e| {
        if target.is_file() {
            if let Err(cleanup) = fs::remove_file(&target) {
                tracing::warn!(path = %target.display(), %cleanup, "cannot remove partial copy");
            }
        }
        SearchError::Copy {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        }
    })?;
    Ok(target)
}

fn copy_with_mtime(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target)?;
    let modified = fs::metadata(source)?.modified()?;
    fs::OpenOptions::new()
        .write(true)
        .open(target)?
        .set_modified(modified)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorError;
    use crate::encoder::EncodeError;
    use crate::types::{BoundingBox, Embedding};
    use image::{GrayImage, Luma};
    use std::collections::HashMap;
    use std::time::{Duration, SystemTime};
    use tempfile::{tempdir, TempDir};

    // Fixture images are uniform gray; the fake encoder keys on the gray level.
    const REF: u8 = 10;
    const SAME: u8 = 20;
    const OTHER: u8 = 30;
    const NO_FACE: u8 = 40;
    const GROUP: u8 = 50;
    const BROKEN: u8 = 60;

    const TOLERANCE: f32 = 0.6;

    struct FakeEncoder {
        faces: HashMap<u8, Vec<Vec<f32>>>,
        seen: Vec<u8>,
    }

    impl FakeEncoder {
        fn new() -> Self {
            let faces = HashMap::from([
                (REF, vec![vec![1.0, 0.0]]),
                (SAME, vec![vec![0.95, 0.05]]),
                (OTHER, vec![vec![0.0, 1.0]]),
                (GROUP, vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.98, 0.0]]),
            ]);
            Self {
                faces,
                seen: Vec::new(),
            }
        }
    }

    impl FaceEncoder for FakeEncoder {
        fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>, EncodeError> {
            let key = frame.data[0];
            self.seen.push(key);
            if key == BROKEN {
                return Err(DetectorError::InferenceFailed("synthetic failure".into()).into());
            }
            let faces = self.faces.get(&key).cloned().unwrap_or_default();
            Ok(faces
                .into_iter()
                .map(|values| EncodedFace {
                    location: BoundingBox {
                        x: 0.0,
                        y: 0.0,
                        width: 4.0,
                        height: 4.0,
                        confidence: 0.9,
                        landmarks: None,
                    },
                    embedding: Embedding::from_values(values),
                })
                .collect())
        }
    }

    fn write_gray(dir: &Path, name: &str, level: u8) -> PathBuf {
        let path = dir.join(name);
        GrayImage::from_pixel(4, 4, Luma([level]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    struct Fixture {
        _root: TempDir,
        reference: PathBuf,
        album: PathBuf,
        output: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let album = root.path().join("album");
        fs::create_dir(&album).unwrap();

        let reference = write_gray(root.path(), "me.png", REF);
        write_gray(&album, "same.png", SAME);
        write_gray(&album, "other.png", OTHER);
        write_gray(&album, "empty_room.png", NO_FACE);
        write_gray(&album, "group.png", GROUP);
        fs::write(album.join("notes.jpg"), "not an image at all").unwrap();
        fs::write(album.join("readme.txt"), "ignored by extension").unwrap();

        Fixture {
            reference,
            output: root.path().join("matches"),
            album,
            _root: root,
        }
    }

    fn finder() -> FaceFinder<FakeEncoder> {
        FaceFinder::new(FakeEncoder::new(), TOLERANCE).unwrap()
    }

    fn output_names(output: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_run_copies_only_matching_images() {
        let fx = fixture();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let summary = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        assert_eq!(output_names(&fx.output), ["group.png", "same.png"]);
        for name in ["group.png", "same.png"] {
            assert_eq!(
                fs::read(fx.album.join(name)).unwrap(),
                fs::read(fx.output.join(name)).unwrap(),
                "{name} must be copied byte-for-byte"
            );
        }
        assert_eq!(
            summary,
            SearchSummary {
                references: 1,
                scanned: 5,
                matched: 2,
                rejected: 1,
                no_face: 1,
                unreadable: 1,
                failed: 0,
                output_dir: fx.output.clone(),
            }
        );
    }

    #[test]
    fn test_run_leaves_album_untouched() {
        let fx = fixture();
        let before = output_names(&fx.album);
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        assert_eq!(output_names(&fx.album), before);
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let fx = fixture();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let first = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();
        let names_first = output_names(&fx.output);
        let second = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        assert_eq!(first, second);
        assert_eq!(output_names(&fx.output), names_first);
    }

    #[test]
    fn test_group_photo_with_two_matching_faces_copied_once() {
        let fx = fixture();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let mut matched = Vec::new();
        finder
            .run(&refs, &fx.album, &fx.output, |event| {
                if let SearchProgress::Matched { path, .. } = event {
                    matched.push(path.file_name().unwrap().to_string_lossy().into_owned());
                }
            })
            .unwrap();

        assert_eq!(matched.iter().filter(|n| *n == "group.png").count(), 1);
    }

    #[test]
    fn test_reference_without_face_aborts_before_album() {
        let fx = fixture();
        let faceless = write_gray(fx.album.parent().unwrap(), "wall.png", NO_FACE);
        let mut finder = finder();

        let err = finder.load_references(&[faceless], |_| {}).unwrap_err();

        assert!(matches!(err, SearchError::NoReferenceFace));
        assert_eq!(finder.encoder.seen, [NO_FACE]);
        assert!(!fx.output.exists());
    }

    #[test]
    fn test_run_without_references_touches_nothing() {
        let fx = fixture();
        let mut finder = finder();

        let err = finder.run(&[], &fx.album, &fx.output, |_| {}).unwrap_err();

        assert!(matches!(err, SearchError::NoReferenceFace));
        assert!(finder.encoder.seen.is_empty());
        assert!(!fx.output.exists());
    }

    #[test]
    fn test_unusable_references_skipped_when_one_has_face() {
        let fx = fixture();
        let root = fx.album.parent().unwrap();
        let faceless = write_gray(root, "wall.png", NO_FACE);
        let missing = root.join("missing.png");
        let mut finder = finder();

        let mut skipped = Vec::new();
        let refs = finder
            .load_references(&[missing, faceless, fx.reference.clone()], |event| {
                if let SearchProgress::ReferenceSkipped { reason, .. } = event {
                    skipped.push(reason);
                }
            })
            .unwrap();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source, fx.reference);
        assert!(matches!(skipped[0], SkipReason::Unreadable(_)));
        assert_eq!(skipped[1], SkipReason::NoFace);
    }

    #[test]
    fn test_reference_uses_first_face() {
        let fx = fixture();
        let group_ref = write_gray(fx.album.parent().unwrap(), "group_ref.png", GROUP);
        let mut finder = finder();

        let refs = finder.load_references(&[group_ref], |_| {}).unwrap();

        assert_eq!(refs[0].embedding.values, vec![0.0, 1.0]);
    }

    #[test]
    fn test_encoder_failure_skips_candidate() {
        let fx = fixture();
        write_gray(&fx.album, "corrupt_model_input.png", BROKEN);
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let summary = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.matched, 2);
        assert!(!fx.output.join("corrupt_model_input.png").exists());
    }

    #[test]
    fn test_strict_tolerance_copies_nothing() {
        let fx = fixture();
        let mut finder = FaceFinder::new(FakeEncoder::new(), 0.0).unwrap();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let summary = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        // group.png holds an exact copy of the reference encoding.
        assert_eq!(output_names(&fx.output), ["group.png"]);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.rejected, 2);
    }

    #[test]
    fn test_output_same_as_album_rejected() {
        let fx = fixture();
        let before: Vec<Vec<u8>> = output_names(&fx.album)
            .iter()
            .map(|n| fs::read(fx.album.join(n)).unwrap())
            .collect();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let err = finder.run(&refs, &fx.album, &fx.album, |_| {}).unwrap_err();

        assert!(matches!(err, SearchError::OutputIsAlbum(_)));
        let after: Vec<Vec<u8>> = output_names(&fx.album)
            .iter()
            .map(|n| fs::read(fx.album.join(n)).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_album_is_fatal() {
        let fx = fixture();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let err = finder
            .run(&refs, &fx.album.join("nope"), &fx.output, |_| {})
            .unwrap_err();

        assert!(matches!(err, SearchError::Album(AlbumError::NotADirectory(_))));
        assert!(!fx.output.exists());
    }

    #[test]
    fn test_output_dir_under_a_file_is_fatal() {
        let fx = fixture();
        let blocker = fx.album.parent().unwrap().join("blocker");
        fs::write(&blocker, "file in the way").unwrap();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let err = finder
            .run(&refs, &fx.album, &blocker.join("out"), |_| {})
            .unwrap_err();

        assert!(matches!(err, SearchError::OutputDir { .. }));
    }

    #[test]
    fn test_empty_album_completes() {
        let fx = fixture();
        let empty = fx.album.parent().unwrap().join("empty");
        fs::create_dir(&empty).unwrap();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let summary = finder.run(&refs, &empty, &fx.output, |_| {}).unwrap();

        assert_eq!(summary.scanned, 0);
        assert!(output_names(&fx.output).is_empty());
    }

    #[test]
    fn test_custom_extensions() {
        let fx = fixture();
        let mut finder = finder().with_extensions(&[".PNG"]);
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let summary = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        assert_eq!(summary.scanned, 4);
        assert_eq!(summary.unreadable, 0);
    }

    #[test]
    fn test_progress_events_in_order() {
        let fx = fixture();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let mut events = Vec::new();
        finder
            .run(&refs, &fx.album, &fx.output, |event| {
                events.push(match event {
                    SearchProgress::Started { total } => format!("started {total}"),
                    SearchProgress::Scanning { current, total, .. } => {
                        format!("scan {current}/{total}")
                    }
                    SearchProgress::Completed(s) => format!("completed {}", s.matched),
                    _ => return,
                })
            })
            .unwrap();

        assert_eq!(
            events,
            [
                "started 5",
                "scan 1/5",
                "scan 2/5",
                "scan 3/5",
                "scan 4/5",
                "scan 5/5",
                "completed 2"
            ]
        );
    }

    #[test]
    fn test_invalid_tolerance() {
        assert!(matches!(
            FaceFinder::new(FakeEncoder::new(), -0.1),
            Err(SearchError::InvalidTolerance(_))
        ));
        assert!(FaceFinder::new(FakeEncoder::new(), f32::NAN).is_err());
        assert!(FaceFinder::new(FakeEncoder::new(), 0.0).is_ok());
    }

    #[test]
    fn test_best_match_over_all_faces() {
        let finder = finder();
        let refs = vec![ReferenceFace {
            source: PathBuf::from("me.png"),
            embedding: Embedding::from_values(vec![1.0, 0.0]),
        }];
        let face = |v: Vec<f32>| EncodedFace {
            location: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
                confidence: 1.0,
                landmarks: None,
            },
            embedding: Embedding::from_values(v),
        };

        let result = finder.best_match(&[face(vec![0.0, 1.0]), face(vec![1.0, 0.0])], &refs);
        assert!(result.matched);
        assert_eq!(result.distance, 0.0);

        assert_eq!(finder.best_match(&[], &refs), MatchResult::no_match());
    }

    #[test]
    fn test_copy_keeps_modification_time() {
        let fx = fixture();
        let taken = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        fs::OpenOptions::new()
            .write(true)
            .open(fx.album.join("same.png"))
            .unwrap()
            .set_modified(taken)
            .unwrap();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap();

        let copied = fs::metadata(fx.output.join("same.png")).unwrap();
        assert_eq!(copied.modified().unwrap(), taken);
    }

    #[test]
    fn test_copy_failure_is_fatal_and_stops_the_run() {
        let fx = fixture();
        // A directory where the copy of group.png should go cannot be overwritten.
        fs::create_dir_all(fx.output.join("group.png")).unwrap();
        let mut finder = finder();
        let refs = finder.load_references(&[fx.reference.clone()], |_| {}).unwrap();

        let err = finder.run(&refs, &fx.album, &fx.output, |_| {}).unwrap_err();

        match err {
            SearchError::Copy { from, to, .. } => {
                assert_eq!(from, fx.album.join("group.png"));
                assert_eq!(to, fx.output.join("group.png"));
            }
            other => panic!("expected a copy error, got {other:?}"),
        }
        // empty_room.png and group.png were encoded; other.png and same.png never were.
        assert_eq!(finder.encoder.seen, [REF, NO_FACE, GROUP]);
        assert!(!fx.output.join("same.png").exists());
        assert!(fx.output.join("group.png").is_dir());
    }

    #[test]
    fn test_failed_copy_leaves_no_stale_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("gone.png"), "truncated").unwrap();

        let err = copy_into(&dir.path().join("gone.png"), &out).unwrap_err();

        assert!(matches!(err, SearchError::Copy { .. }));
        assert!(!out.join("gone.png").exists());
    }
}
