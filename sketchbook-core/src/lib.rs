//! # Sketchbook Core
//!
//! Freehand drawing engine: pointer input in, smooth variable-width ink out.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               DrawingEngine                 │
//! ├─────────────────────────────────────────────┤
//! │  Input Normalizer │  Interaction Machine    │
//! │  - Coord mapping  │  - Tap vs drag          │
//! │  - Pressure       │  - Frame throttle       │
//! │  - Jitter buffer  │  - Erase marking        │
//! ├─────────────────────────────────────────────┤
//! │  Stroke Smoother  │  Stroke Store           │
//! │  - Thinning       │  - Ordered elements     │
//! │  - Tapers / caps  │  - Cached bounds        │
//! ├─────────────────────────────────────────────┤
//! │           Drawing Document (JSON)           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering to SVG, PNG and JPEG lives in `sketchbook-renderer`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod document;
pub mod element;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod outline;
pub mod scheduler;
pub mod smoother;
pub mod store;

pub use config::{ConfigUpdate, EngineConfig, ToolMode};
pub use document::{AppState, DrawingDocument, ElementRecord, DOCUMENT_VERSION};
pub use element::{
    BoxShape, Element, ElementId, ElementKind, Fill, LineShape, ShapeDescriptor, ShapeGeometry,
    ShapeKind, ShapeStyle, Stroke, UnknownElement,
};
pub use engine::{DrawingEngine, EngineEvent, InputSurface, InteractionState, Preview};
pub use error::{CanvasError, CanvasResult};
pub use geometry::{BoundingBox, Point, Vec2};
pub use input::{DeviceType, InputNormalizer, InputSample, PointerEvent, PointerEventKind, SurfaceBounds};
pub use outline::{Outline, PathCommand, PathParseError};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TimerTask};
pub use smoother::{single_point_outline, smooth_to_outline, StrokeOptions};
pub use store::StrokeStore;

/// Sketchbook core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
