use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use facefind_core::{FaceFinder, OnnxFaceEncoder, SearchProgress, SearchSummary};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(
    name = "facefind",
    version,
    about = "Copy every album photo that shows the face from the reference images"
)]
struct Cli {
    /// Folder of images to search (not recursive)
    album: PathBuf,

    /// Folder that receives copies of matching images (created if absent)
    output: PathBuf,

    /// Images of the face to look for; the most prominent face of each is used
    #[arg(required = true)]
    references: Vec<PathBuf>,

    /// Maximum encoding distance for a match; lower is stricter [env: FACEFIND_TOLERANCE]
    #[arg(short, long)]
    tolerance: Option<f32>,

    /// Comma-separated file extensions to scan, e.g. jpg,png [env: FACEFIND_EXTENSIONS]
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Directory holding det_10g.onnx and w600k_r50.onnx [env: FACEFIND_MODEL_DIR]
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Minimum face detection score (0.0-1.0) [env: FACEFIND_MIN_CONFIDENCE]
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Only report skipped files, not every match and non-match
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions.clone();
        }
        if let Some(model_dir) = &self.model_dir {
            config.model_dir = model_dir.clone();
        }
        if let Some(min_confidence) = self.min_confidence {
            config.min_confidence = min_confidence;
        }
        config
    }
}

/// Turns search progress into console lines on stderr.
struct Reporter {
    quiet: bool,
    current: usize,
    total: usize,
}

impl Reporter {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: 0,
            total: 0,
        }
    }

    fn report(&mut self, event: SearchProgress<'_>) {
        match event {
            SearchProgress::ReferenceLoaded { path, faces } => {
                eprintln!("Loaded reference face from {} ({faces} detected)", path.display());
            }
            SearchProgress::ReferenceSkipped { path, reason } => {
                eprintln!("No usable face in reference {}: {reason}", path.display());
            }
            SearchProgress::Started { total } => {
                self.total = total;
                if total == 0 {
                    eprintln!("No images found in album");
                } else {
                    eprintln!("Searching {total} images...");
                }
            }
            SearchProgress::Scanning { current, total, .. } => {
                self.current = current;
                self.total = total;
            }
            SearchProgress::Matched { path, distance, .. } => {
                if !self.quiet {
                    eprintln!(
                        "{} match    {} (distance {distance:.3})",
                        self.counter(),
                        path.display()
                    );
                }
            }
            SearchProgress::Rejected { path, distance } => {
                if !self.quiet {
                    eprintln!(
                        "{} no match {} (distance {distance:.3})",
                        self.counter(),
                        path.display()
                    );
                }
            }
            SearchProgress::Skipped { path, reason } => {
                eprintln!("{} skipped  {}: {reason}", self.counter(), path.display());
            }
            SearchProgress::Completed(_) => {}
        }
    }

    fn counter(&self) -> String {
        let width = self.total.to_string().len();
        format!("[{:>width$}/{}]", self.current, self.total)
    }
}

fn print_summary(summary: &SearchSummary) {
    println!("Scanned {} images", summary.scanned);
    println!("Found {} images with matching faces", summary.matched);
    println!(
        "Skipped {} images ({} without faces, {} unreadable, {} failed)",
        summary.no_face + summary.unreadable + summary.failed,
        summary.no_face,
        summary.unreadable,
        summary.failed
    );
    println!("Matched images saved to: {}", summary.output_dir.display());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    tracing::debug!(?config, "configuration resolved");

    let encoder = OnnxFaceEncoder::load(&config.model_dir, config.min_confidence)
        .with_context(|| format!("loading face models from {}", config.model_dir.display()))?;

    let mut finder =
        FaceFinder::new(encoder, config.tolerance)?.with_extensions(config.extensions.as_slice());
    tracing::info!(
        tolerance = finder.tolerance(),
        extensions = ?finder.extensions(),
        references = cli.references.len(),
        "facefind starting"
    );
    let mut reporter = Reporter::new(cli.quiet);

    let references = finder
        .load_references(&cli.references, |event| reporter.report(event))
        .context("cannot search without a reference face")?;

    let summary = finder
        .run(&references, &cli.album, &cli.output, |event| reporter.report(event))
        .with_context(|| format!("searching {}", cli.album.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}
