//! # Sketchbook Renderer
//!
//! Vector and raster export for drawings produced by `sketchbook-core`.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ DrawingEngine│──▶│ SVG markup   │──▶│ resvg / tiny-skia    │──▶ PNG / JPEG
//! │  (snapshot)  │   │ (write!)     │   │ 2x over white        │
//! └──────────────┘   └──────────────┘   └──────────────────────┘
//! ```
//!
//! Raster export runs on a blocking worker and resolves to an empty buffer on
//! failure. Callers must serialize export calls.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod sketch;

use std::future::Future;

use sketchbook_core::{DrawingEngine, Scheduler};
use tracing::{debug, warn};

pub use error::{RenderError, RenderResult};
pub use export::{DrawingExporter, DrawingSnapshot, ExportConfig, ExportFormat};

/// Export operations on a live engine.
pub trait EngineExportExt {
    /// Current drawing as portable SVG markup.
    fn export_as_vector_markup(&self) -> String;

    /// Rasterize the current drawing.
    ///
    /// The drawing is snapshotted before this returns, so later edits do not
    /// affect the result. Resolves to an empty vector if rasterization or
    /// encoding fails.
    fn export_as_image(
        &self,
        format: ExportFormat,
        config: ExportConfig,
    ) -> impl Future<Output = Vec<u8>> + Send + 'static;
}

impl<S: Scheduler> EngineExportExt for DrawingEngine<S> {
    fn export_as_vector_markup(&self) -> String {
        DrawingExporter::render_to_svg(&DrawingSnapshot::from_engine(self))
    }

    fn export_as_image(
        &self,
        format: ExportFormat,
        config: ExportConfig,
    ) -> impl Future<Output = Vec<u8>> + Send + 'static {
        let snapshot = DrawingSnapshot::from_engine(self);
        async move {
            let elements = snapshot.elements.len();
            let job = tokio::task::spawn_blocking(move || {
                DrawingExporter::new(config).export(&snapshot, format)
            });
            match job.await {
                Ok(Ok(bytes)) => {
                    debug!(elements, bytes = bytes.len(), ?format, "Raster export complete");
                    bytes
                }
                Ok(Err(e)) => {
                    warn!(error = %e, ?format, "Raster export failed");
                    Vec::new()
                }
                Err(e) => {
                    warn!(error = %e, ?format, "Raster export task did not complete");
                    Vec::new()
                }
            }
        }
    }
}

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
