//! # Sketchbook CLI
//!
//! Command-line host for the Sketchbook drawing engine.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a recorded pointer trace and save the drawing as JSON
//! sketchbook replay --events trace.json --out drawing.json
//!
//! # Render a stored drawing to PNG
//! sketchbook render --document drawing.json --out drawing.png --format png
//! ```
//!
//! Canvas and ink settings come from flags or `SKETCHBOOK_*` environment
//! variables.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

mod trace;

pub use trace::{load_trace, replay, ReplaySummary, TraceEntry, TracePointer};

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use sketchbook_core::{
    ConfigUpdate, DrawingDocument, DrawingEngine, EngineConfig, ManualScheduler, Scheduler,
};
use sketchbook_renderer::{EngineExportExt, ExportConfig, ExportFormat};
use tracing::info;

/// Command-line arguments for sketchbook.
#[derive(Debug, Clone, Parser)]
#[command(name = "sketchbook")]
#[command(about = "Replay pointer traces and render Sketchbook drawings")]
#[command(version)]
pub struct CliArgs {
    /// Canvas and ink settings.
    #[command(flatten)]
    pub canvas: CanvasArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Engine settings shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct CanvasArgs {
    /// Logical canvas width
    #[arg(long, global = true, env = "SKETCHBOOK_WIDTH", default_value_t = 870.0)]
    pub width: f32,

    /// Logical canvas height
    #[arg(long, global = true, env = "SKETCHBOOK_HEIGHT", default_value_t = 870.0)]
    pub height: f32,

    /// Ink and shape color
    #[arg(long, global = true, env = "SKETCHBOOK_STROKE_COLOR", default_value = "#000000")]
    pub stroke_color: String,

    /// Ink and shape width
    #[arg(long, global = true, env = "SKETCHBOOK_STROKE_WIDTH", default_value_t = 3.0)]
    pub stroke_width: f32,

    /// Eraser diameter
    #[arg(long, global = true, env = "SKETCHBOOK_ERASER_WIDTH", default_value_t = 20.0)]
    pub eraser_width: f32,

    /// Draw new shapes with a hand-drawn look
    #[arg(long, global = true, env = "SKETCHBOOK_SKETCHY")]
    pub sketchy: bool,
}

impl From<&CanvasArgs> for EngineConfig {
    fn from(args: &CanvasArgs) -> Self {
        Self {
            width: args.width,
            height: args.height,
            stroke_color: args.stroke_color.clone(),
            stroke_width: args.stroke_width,
            eraser_width: args.eraser_width,
            sketchy_mode: args.sketchy,
            ..Self::default()
        }
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Feed a recorded pointer trace through the engine and save the result.
    Replay {
        /// Trace file: a JSON array of pointer events and directives
        #[arg(long)]
        events: PathBuf,

        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Load a stored drawing document and export it.
    Render {
        /// Drawing document (JSON)
        #[arg(long)]
        document: PathBuf,

        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
    },
}

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Drawing document (lossless).
    Json,
    /// SVG markup.
    Svg,
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

/// Run a parsed command line.
///
/// # Errors
///
/// Returns an error if an input cannot be loaded or the output cannot be
/// produced or written.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = EngineConfig::from(&args.canvas);
    match args.command {
        Command::Replay {
            events,
            out,
            format,
        } => {
            let entries = load_trace(&events)?;
            let (engine, _) = replay(config, &entries)?;
            write_output(&engine, format, &out).await
        }
        Command::Render {
            document,
            out,
            format,
        } => {
            let engine = load_document(config, &document)?;
            write_output(&engine, format, &out).await
        }
    }
}

/// Import a stored document into a fresh engine sized to the document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the document is rejected.
pub fn load_document(
    config: EngineConfig,
    path: &Path,
) -> anyhow::Result<DrawingEngine<ManualScheduler>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    let document = DrawingDocument::from_json_str(&text)
        .with_context(|| format!("Invalid document {}", path.display()))?;

    let mut engine = DrawingEngine::manual(config);
    engine.update_config(ConfigUpdate {
        width: Some(document.app_state.width),
        height: Some(document.app_state.height),
        ..ConfigUpdate::default()
    });
    engine
        .import_from_json(&document)
        .with_context(|| format!("Rejected document {}", path.display()))?;
    Ok(engine)
}

/// Export the engine's drawing in `format` and write it to `out`.
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written.
pub async fn write_output<S: Scheduler>(
    engine: &DrawingEngine<S>,
    format: OutputFormat,
    out: &Path,
) -> anyhow::Result<()> {
    let bytes = match format {
        OutputFormat::Json => engine
            .export_as_json()
            .to_json_string()
            .context("Failed to encode document")?
            .into_bytes(),
        OutputFormat::Svg => engine.export_as_vector_markup().into_bytes(),
        OutputFormat::Png | OutputFormat::Jpeg => {
            let raster = if format == OutputFormat::Png {
                ExportFormat::Png
            } else {
                ExportFormat::Jpeg
            };
            let bytes = engine
                .export_as_image(raster, ExportConfig::default())
                .await;
            if bytes.is_empty() {
                bail!("Raster export produced no data");
            }
            bytes
        }
    };

    std::fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    info!(path = %out.display(), bytes = bytes.len(), ?format, "Output written");
    Ok(())
}
