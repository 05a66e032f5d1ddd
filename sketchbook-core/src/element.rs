//! Drawing elements - the strokes and shapes that make up a page.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::geometry::{BoundingBox, Vec2};
use crate::input::DeviceType;
use crate::outline::Outline;

/// Identifier of an element, unique within a document.
///
/// Ids are handed out in increasing order and restart at 0 after a clear.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primitive shape types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rectangle,
    /// Circle inscribed in a square box.
    Circle,
    /// Ellipse inscribed in a box.
    Ellipse,
    /// Straight line segment.
    Line,
    /// Isosceles triangle inscribed in a box, apex at the top.
    Triangle,
}

impl ShapeKind {
    /// Every shape kind.
    pub const ALL: [Self; 5] = [
        Self::Rectangle,
        Self::Circle,
        Self::Ellipse,
        Self::Line,
        Self::Triangle,
    ];

    /// Type tag used in drawing documents.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Line => "line",
            Self::Triangle => "triangle",
        }
    }

    /// Look up a shape kind by its document tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// Interior fill of a closed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Whether the fill is drawn.
    pub enabled: bool,
    /// Fill color.
    pub color: String,
    /// Fill opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Presentation shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    /// Outline color.
    pub color: String,
    /// Outline width.
    pub stroke_width: f32,
    /// Optional interior fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    /// Drawn with a hand-drawn look.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sketchy: bool,
}

impl ShapeStyle {
    /// Unfilled style with the given color and width.
    #[must_use]
    pub fn new(color: impl Into<String>, stroke_width: f32) -> Self {
        Self {
            color: color.into(),
            stroke_width,
            fill: None,
            sketchy: false,
        }
    }

    /// Set the fill.
    #[must_use]
    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    /// Set the hand-drawn flag.
    #[must_use]
    pub fn with_sketchy(mut self, sketchy: bool) -> Self {
        self.sketchy = sketchy;
        self
    }
}

/// A shape described by its box: rectangle, circle, ellipse or triangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Box width.
    pub width: f32,
    /// Box height.
    pub height: f32,
    /// Presentation.
    #[serde(flatten)]
    pub style: ShapeStyle,
}

/// A straight line segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineShape {
    /// Start x.
    pub x1: f32,
    /// Start y.
    pub y1: f32,
    /// End x.
    pub x2: f32,
    /// End y.
    pub y2: f32,
    /// Presentation.
    #[serde(flatten)]
    pub style: ShapeStyle,
}

/// A committed freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// Filled silhouette of the stroke.
    pub outline: Outline,
    /// Ink color.
    pub color: String,
    /// Width the outline was generated with.
    pub stroke_width: f32,
    /// Device that drew the stroke.
    pub device_type: DeviceType,
    /// Produced by a tap rather than a drag.
    pub is_single_point: bool,
}

/// An element whose type tag this build does not know.
///
/// The raw record is kept so exporting the document again loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownElement {
    /// The unrecognised type tag.
    pub tag: String,
    /// The record exactly as it was imported.
    pub raw: serde_json::Value,
}

impl UnknownElement {
    /// Box taken from `x`, `y`, `width` and `height` when all are present.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn declared_bounds(&self) -> Option<BoundingBox> {
        let field = |name: &str| self.raw.get(name).and_then(serde_json::Value::as_f64);
        Some(BoundingBox::new(
            field("x")? as f32,
            field("y")? as f32,
            field("width")? as f32,
            field("height")? as f32,
        ))
    }
}

/// What an element is.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Freehand stroke.
    Stroke(Stroke),
    /// Rectangle.
    Rectangle(BoxShape),
    /// Circle.
    Circle(BoxShape),
    /// Ellipse.
    Ellipse(BoxShape),
    /// Line segment.
    Line(LineShape),
    /// Triangle.
    Triangle(BoxShape),
    /// Forward-compatible fallback for unrecognised tags.
    Unknown(UnknownElement),
}

impl ElementKind {
    /// Type tag used in drawing documents.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Stroke(_) => "stroke",
            Self::Rectangle(_) => ShapeKind::Rectangle.tag(),
            Self::Circle(_) => ShapeKind::Circle.tag(),
            Self::Ellipse(_) => ShapeKind::Ellipse.tag(),
            Self::Line(_) => ShapeKind::Line.tag(),
            Self::Triangle(_) => ShapeKind::Triangle.tag(),
            Self::Unknown(unknown) => &unknown.tag,
        }
    }

    /// The shape kind, for shape elements.
    #[must_use]
    pub const fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Self::Rectangle(_) => Some(ShapeKind::Rectangle),
            Self::Circle(_) => Some(ShapeKind::Circle),
            Self::Ellipse(_) => Some(ShapeKind::Ellipse),
            Self::Line(_) => Some(ShapeKind::Line),
            Self::Triangle(_) => Some(ShapeKind::Triangle),
            Self::Stroke(_) | Self::Unknown(_) => None,
        }
    }

    /// Axis-aligned bounds computed from the element's geometry.
    #[must_use]
    pub fn compute_bounds(&self) -> Option<BoundingBox> {
        match self {
            Self::Stroke(stroke) => stroke.outline.bounds(),
            Self::Rectangle(b) | Self::Circle(b) | Self::Ellipse(b) | Self::Triangle(b) => {
                Some(BoundingBox::new(b.x, b.y, b.width, b.height))
            }
            Self::Line(l) => BoundingBox::from_vertices([
                Vec2::new(l.x1, l.y1),
                Vec2::new(l.x2, l.y2),
            ]),
            Self::Unknown(unknown) => unknown.declared_bounds(),
        }
    }
}

/// An element of a drawing with its cached bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    kind: ElementKind,
    bounds: Option<BoundingBox>,
}

impl Element {
    /// Create an element, computing its bounds once.
    #[must_use]
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        let bounds = kind.compute_bounds();
        Self { id, kind, bounds }
    }

    /// Element content.
    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Cached bounding box. `None` when the element has no usable geometry.
    #[must_use]
    pub const fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Whether an eraser disc at `(x, y)` with `radius` touches this element.
    #[must_use]
    pub fn is_hit_by_disc(&self, x: f32, y: f32, radius: f32) -> bool {
        self.bounds.is_some_and(|b| b.hit_by_disc(x, y, radius))
    }
}

/// Geometry of a shape to be added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeGeometry {
    /// Box-based shapes.
    Box {
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
        /// Width.
        width: f32,
        /// Height.
        height: f32,
    },
    /// Line segments.
    Segment {
        /// Start point.
        from: Vec2,
        /// End point.
        to: Vec2,
    },
}

/// Request to add a shape to the drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDescriptor {
    /// Shape type.
    pub kind: ShapeKind,
    /// Position and size.
    pub geometry: ShapeGeometry,
    /// Presentation.
    pub style: ShapeStyle,
}

impl ShapeDescriptor {
    /// Box-based shape.
    #[must_use]
    pub fn boxed(kind: ShapeKind, x: f32, y: f32, width: f32, height: f32, style: ShapeStyle) -> Self {
        Self {
            kind,
            geometry: ShapeGeometry::Box {
                x,
                y,
                width,
                height,
            },
            style,
        }
    }

    /// Line from `from` to `to`.
    #[must_use]
    pub fn line(from: Vec2, to: Vec2, style: ShapeStyle) -> Self {
        Self {
            kind: ShapeKind::Line,
            geometry: ShapeGeometry::Segment { from, to },
            style,
        }
    }

    /// Shape spanned by a drag from `start` to `end`.
    ///
    /// Circles use the larger of the two drag extents as their side and grow
    /// from `start` in the direction of the drag.
    #[must_use]
    pub fn from_drag(kind: ShapeKind, start: Vec2, end: Vec2, style: ShapeStyle) -> Self {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        match kind {
            ShapeKind::Line => Self::line(start, end, style),
            ShapeKind::Circle => {
                let side = dx.abs().max(dy.abs());
                let x = if dx < 0.0 { start.x - side } else { start.x };
                let y = if dy < 0.0 { start.y - side } else { start.y };
                Self::boxed(kind, x, y, side, side, style)
            }
            ShapeKind::Rectangle | ShapeKind::Ellipse | ShapeKind::Triangle => Self::boxed(
                kind,
                start.x.min(end.x),
                start.y.min(end.y),
                dx.abs(),
                dy.abs(),
                style,
            ),
        }
    }

    /// Check the geometry is drawable.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidShape`] for non-finite numbers, empty
    /// boxes, zero-length lines, a non-positive stroke width, or geometry
    /// that does not match the shape kind.
    pub fn validate(&self) -> CanvasResult<()> {
        let width = self.style.stroke_width;
        if !width.is_finite() || width <= 0.0 {
            return Err(CanvasError::InvalidShape(format!(
                "stroke width must be positive, got {width}"
            )));
        }
        match (self.kind, self.geometry) {
            (ShapeKind::Line, ShapeGeometry::Segment { from, to }) => {
                if !from.is_finite() || !to.is_finite() {
                    return Err(CanvasError::InvalidShape("non-finite line endpoint".into()));
                }
                if from == to {
                    return Err(CanvasError::InvalidShape("zero-length line".into()));
                }
                Ok(())
            }
            (
                ShapeKind::Rectangle | ShapeKind::Circle | ShapeKind::Ellipse | ShapeKind::Triangle,
                ShapeGeometry::Box {
                    x,
                    y,
                    width,
                    height,
                },
            ) => {
                if ![x, y, width, height].iter().all(|v| v.is_finite()) {
                    return Err(CanvasError::InvalidShape("non-finite box".into()));
                }
                if width <= 0.0 || height <= 0.0 {
                    return Err(CanvasError::InvalidShape(format!(
                        "{} needs a positive area, got {width}x{height}",
                        self.kind.tag()
                    )));
                }
                Ok(())
            }
            (kind, _) => Err(CanvasError::InvalidShape(format!(
                "geometry does not fit a {}",
                kind.tag()
            ))),
        }
    }

    /// Validate and convert into element content.
    ///
    /// # Errors
    ///
    /// See [`ShapeDescriptor::validate`].
    pub fn into_kind(self) -> CanvasResult<ElementKind> {
        self.validate()?;
        let style = self.style;
        let kind = match self.geometry {
            ShapeGeometry::Segment { from, to } => ElementKind::Line(LineShape {
                x1: from.x,
                y1: from.y,
                x2: to.x,
                y2: to.y,
                style,
            }),
            ShapeGeometry::Box {
                x,
                y,
                width,
                height,
            } => {
                let shape = BoxShape {
                    x,
                    y,
                    width,
                    height,
                    style,
                };
                match self.kind {
                    ShapeKind::Circle => ElementKind::Circle(shape),
                    ShapeKind::Ellipse => ElementKind::Ellipse(shape),
                    ShapeKind::Triangle => ElementKind::Triangle(shape),
                    ShapeKind::Rectangle | ShapeKind::Line => ElementKind::Rectangle(shape),
                }
            }
        };
        Ok(kind)
    }
}
