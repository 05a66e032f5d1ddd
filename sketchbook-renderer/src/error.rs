//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The SVG intermediate could not be parsed or rasterized.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// The raster image could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The drawing could not be prepared for export.
    #[error("Export failed: {0}")]
    Export(String),
}
