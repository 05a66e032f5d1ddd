//! Engine configuration.
//!
//! The engine owns the authoritative copy of its tool settings; hosts change
//! them through [`ConfigUpdate`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::ShapeKind;

/// Delay before a press without movement becomes a tap.
pub const TAP_DELAY_MS: u64 = 120;

/// Distance a press must travel before it becomes a drag.
pub const MOVE_THRESHOLD_PX: f32 = 3.0;

/// Minimum spacing between preview regenerations (~60fps).
pub const FRAME_BUDGET_MS: u64 = 16;

/// Minimum travel for the release position to be added to a stroke.
pub const FINAL_SAMPLE_MIN_DISTANCE: f32 = 1.0;

/// The active tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// Freehand ink.
    #[default]
    Draw,
    /// Stroke eraser.
    Erase,
    /// Drag out a shape.
    Shape(ShapeKind),
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => f.write_str("draw"),
            Self::Erase => f.write_str("erase"),
            Self::Shape(kind) => f.write_str(kind.tag()),
        }
    }
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draw" | "pen" => Ok(Self::Draw),
            "erase" | "eraser" => Ok(Self::Erase),
            other => ShapeKind::from_tag(other)
                .map(Self::Shape)
                .ok_or_else(|| format!("unknown tool: {s}")),
        }
    }
}

/// Settings for a drawing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Logical canvas width.
    pub width: f32,
    /// Logical canvas height.
    pub height: f32,
    /// Ink and shape color.
    pub stroke_color: String,
    /// Ink and shape width.
    pub stroke_width: f32,
    /// Diameter of the eraser disc.
    pub eraser_width: f32,
    /// New shapes get a hand-drawn look.
    pub sketchy_mode: bool,
    /// Active tool.
    pub tool: ToolMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 870.0,
            height: 870.0,
            stroke_color: "#000000".to_string(),
            stroke_width: 3.0,
            eraser_width: 20.0,
            sketchy_mode: false,
            tool: ToolMode::Draw,
        }
    }
}

impl EngineConfig {
    /// Radius of the eraser disc.
    #[must_use]
    pub fn eraser_radius(&self) -> f32 {
        self.eraser_width / 2.0
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(color) = update.stroke_color {
            self.stroke_color = color;
        }
        if let Some(width) = update.stroke_width {
            self.stroke_width = width;
        }
        if let Some(width) = update.eraser_width {
            self.eraser_width = width;
        }
        if let Some(sketchy) = update.sketchy_mode {
            self.sketchy_mode = sketchy;
        }
        if let Some(tool) = update.tool {
            self.tool = tool;
        }
    }
}

/// Partial configuration; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    /// New canvas width.
    pub width: Option<f32>,
    /// New canvas height.
    pub height: Option<f32>,
    /// New ink color.
    pub stroke_color: Option<String>,
    /// New ink width.
    pub stroke_width: Option<f32>,
    /// New eraser diameter.
    pub eraser_width: Option<f32>,
    /// Toggle hand-drawn shapes.
    pub sketchy_mode: Option<bool>,
    /// Switch tool.
    pub tool: Option<ToolMode>,
}

impl ConfigUpdate {
    /// Update that only switches tool.
    #[must_use]
    pub fn tool(tool: ToolMode) -> Self {
        Self {
            tool: Some(tool),
            ..Self::default()
        }
    }

    /// Whether the update changes the canvas size.
    #[must_use]
    pub const fn resizes(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.width - 870.0).abs() < f32::EPSILON);
        assert_eq!(config.stroke_color, "#000000");
        assert!((config.eraser_radius() - 10.0).abs() < f32::EPSILON);
        assert_eq!(config.tool, ToolMode::Draw);
    }

    #[test]
    fn test_partial_update() {
        let mut config = EngineConfig::default();
        config.apply(ConfigUpdate {
            stroke_color: Some("#ff0000".into()),
            eraser_width: Some(40.0),
            ..ConfigUpdate::default()
        });
        assert_eq!(config.stroke_color, "#ff0000");
        assert!((config.eraser_width - 40.0).abs() < f32::EPSILON);
        assert!((config.stroke_width - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tool_parsing() {
        assert_eq!("erase".parse::<ToolMode>(), Ok(ToolMode::Erase));
        assert_eq!(
            "Ellipse".parse::<ToolMode>(),
            Ok(ToolMode::Shape(ShapeKind::Ellipse))
        );
        assert!("lasso".parse::<ToolMode>().is_err());
        assert_eq!(ToolMode::Shape(ShapeKind::Line).to_string(), "line");
    }

    #[test]
    fn test_update_from_json() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"strokeWidth": 8, "sketchyMode": true}"#).expect("parse");
        assert_eq!(update.stroke_width, Some(8.0));
        assert_eq!(update.sketchy_mode, Some(true));
        assert!(!update.resizes());
    }
}
