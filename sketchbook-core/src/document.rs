//! Drawing documents: the persisted JSON form of a page.
//!
//! ```json
//! {
//!   "type": "drawing",
//!   "version": 1,
//!   "elements": [
//!     {"id": 0, "type": "stroke", "outline": "M0 0 L4 4 Z", "color": "#000000",
//!      "strokeWidth": 3.0, "deviceType": "mouse", "isSinglePoint": false},
//!     {"id": 1, "type": "rectangle", "x": 10.0, "y": 10.0, "width": 40.0,
//!      "height": 20.0, "color": "#ff0000", "strokeWidth": 2.0}
//!   ],
//!   "appState": {"width": 870.0, "height": 870.0}
//! }
//! ```
//!
//! Bounding boxes are never stored; they are recomputed on import.

use std::collections::BTreeSet;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::element::{
    BoxShape, Element, ElementId, ElementKind, LineShape, ShapeDescriptor, ShapeKind, Stroke,
    UnknownElement,
};
use crate::geometry::Vec2;
use crate::error::{CanvasError, CanvasResult};
use crate::input::DeviceType;
use crate::outline::Outline;

/// Value of the document's `type` field.
pub const DOCUMENT_TYPE: &str = "drawing";

/// Document format version written by this build.
pub const DOCUMENT_VERSION: u64 = 1;

/// Canvas dimensions stored alongside the elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Logical canvas width.
    pub width: f32,
    /// Logical canvas height.
    pub height: f32,
}

/// Serialized stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeRecord {
    /// Element id.
    pub id: u64,
    /// SVG path data of the filled outline.
    pub outline: String,
    /// Ink color.
    pub color: String,
    /// Width the outline was generated with.
    pub stroke_width: f32,
    /// Device that drew the stroke.
    pub device_type: DeviceType,
    /// Produced by a tap.
    pub is_single_point: bool,
}

/// Serialized box-based shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    /// Element id.
    pub id: u64,
    /// Geometry and style.
    #[serde(flatten)]
    pub shape: BoxShape,
}

/// Serialized line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Element id.
    pub id: u64,
    /// Geometry and style.
    #[serde(flatten)]
    pub shape: LineShape,
}

/// A record whose `type` tag this build understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KnownRecord {
    /// Freehand stroke.
    Stroke(StrokeRecord),
    /// Rectangle.
    Rectangle(BoxRecord),
    /// Circle.
    Circle(BoxRecord),
    /// Ellipse.
    Ellipse(BoxRecord),
    /// Line.
    Line(LineRecord),
    /// Triangle.
    Triangle(BoxRecord),
}

/// One entry of a document's `elements` array.
///
/// Records with a known tag are decoded strictly; anything else is kept
/// verbatim so it survives an import/export cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementRecord {
    /// Recognised record.
    Known(KnownRecord),
    /// Record with an unrecognised tag.
    Unknown(serde_json::Value),
}

fn is_known_tag(tag: &str) -> bool {
    tag == "stroke" || ShapeKind::from_tag(tag).is_some()
}

impl<'de> Deserialize<'de> for ElementRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let tag = value.get("type").and_then(serde_json::Value::as_str);
        match tag {
            Some(tag) if is_known_tag(tag) => KnownRecord::deserialize(value)
                .map(Self::Known)
                .map_err(de::Error::custom),
            Some(_) => Ok(Self::Unknown(value)),
            None => Err(de::Error::missing_field("type")),
        }
    }
}

impl ElementRecord {
    /// Id declared by the record, if any.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Known(KnownRecord::Stroke(r)) => Some(r.id),
            Self::Known(
                KnownRecord::Rectangle(r)
                | KnownRecord::Circle(r)
                | KnownRecord::Ellipse(r)
                | KnownRecord::Triangle(r),
            ) => Some(r.id),
            Self::Known(KnownRecord::Line(r)) => Some(r.id),
            Self::Unknown(value) => value.get("id").and_then(serde_json::Value::as_u64),
        }
    }

    /// Serialize an element.
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        let id = element.id.get();
        let boxed = |shape: &BoxShape| BoxRecord {
            id,
            shape: shape.clone(),
        };
        let known = match element.kind() {
            ElementKind::Stroke(stroke) => KnownRecord::Stroke(StrokeRecord {
                id,
                outline: stroke.outline.to_path_data(),
                color: stroke.color.clone(),
                stroke_width: stroke.stroke_width,
                device_type: stroke.device_type,
                is_single_point: stroke.is_single_point,
            }),
            ElementKind::Rectangle(shape) => KnownRecord::Rectangle(boxed(shape)),
            ElementKind::Circle(shape) => KnownRecord::Circle(boxed(shape)),
            ElementKind::Ellipse(shape) => KnownRecord::Ellipse(boxed(shape)),
            ElementKind::Triangle(shape) => KnownRecord::Triangle(boxed(shape)),
            ElementKind::Line(shape) => KnownRecord::Line(LineRecord {
                id,
                shape: shape.clone(),
            }),
            ElementKind::Unknown(unknown) => return Self::Unknown(unknown.raw.clone()),
        };
        Self::Known(known)
    }

    /// Decode into an element, parsing outlines and computing bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::MalformedPath`] for unparsable stroke outlines
    /// and [`CanvasError::InvalidDocument`] for unknown records without an id
    /// or shapes with degenerate geometry.
    pub fn into_element(self) -> CanvasResult<Element> {
        let (id, kind) = match self {
            Self::Known(KnownRecord::Stroke(r)) => {
                let outline = Outline::parse(&r.outline)
                    .map_err(|source| CanvasError::MalformedPath { id: r.id, source })?;
                (
                    r.id,
                    ElementKind::Stroke(Stroke {
                        outline,
                        color: r.color,
                        stroke_width: r.stroke_width,
                        device_type: r.device_type,
                        is_single_point: r.is_single_point,
                    }),
                )
            }
            Self::Known(KnownRecord::Rectangle(r)) => boxed_kind(ShapeKind::Rectangle, r)?,
            Self::Known(KnownRecord::Circle(r)) => boxed_kind(ShapeKind::Circle, r)?,
            Self::Known(KnownRecord::Ellipse(r)) => boxed_kind(ShapeKind::Ellipse, r)?,
            Self::Known(KnownRecord::Triangle(r)) => boxed_kind(ShapeKind::Triangle, r)?,
            Self::Known(KnownRecord::Line(r)) => {
                let LineShape {
                    x1,
                    y1,
                    x2,
                    y2,
                    style,
                } = r.shape;
                let descriptor = ShapeDescriptor::line(Vec2::new(x1, y1), Vec2::new(x2, y2), style);
                (r.id, checked_shape(r.id, descriptor)?)
            }
            Self::Unknown(raw) => {
                let id = raw.get("id").and_then(serde_json::Value::as_u64).ok_or_else(|| {
                    CanvasError::InvalidDocument("element without a numeric id".into())
                })?;
                let tag = raw
                    .get("type")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                warn!(id, tag = %tag, "importing element with unknown type");
                (id, ElementKind::Unknown(UnknownElement { tag, raw }))
            }
        };
        Ok(Element::new(ElementId(id), kind))
    }
}

fn boxed_kind(kind: ShapeKind, record: BoxRecord) -> CanvasResult<(u64, ElementKind)> {
    let BoxShape {
        x,
        y,
        width,
        height,
        style,
    } = record.shape;
    let descriptor = ShapeDescriptor::boxed(kind, x, y, width, height, style);
    Ok((record.id, checked_shape(record.id, descriptor)?))
}

/// Shapes are held to the same rules on import as when added.
fn checked_shape(id: u64, descriptor: ShapeDescriptor) -> CanvasResult<ElementKind> {
    descriptor
        .into_kind()
        .map_err(|e| CanvasError::InvalidDocument(format!("element {id}: {e}")))
}

/// A complete drawing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingDocument {
    /// Always [`DOCUMENT_TYPE`].
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Format version.
    pub version: u64,
    /// Elements in z-order.
    pub elements: Vec<ElementRecord>,
    /// Canvas dimensions.
    #[serde(rename = "appState")]
    pub app_state: AppState,
}

impl DrawingDocument {
    /// Snapshot a sequence of elements.
    #[must_use]
    pub fn from_elements<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        app_state: AppState,
    ) -> Self {
        Self {
            doc_type: DOCUMENT_TYPE.to_string(),
            version: DOCUMENT_VERSION,
            elements: elements.into_iter().map(ElementRecord::from_element).collect(),
            app_state,
        }
    }

    /// Check the header fields.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidDocument`] for a wrong `type` tag and
    /// [`CanvasError::UnsupportedVersion`] for any version other than
    /// [`DOCUMENT_VERSION`].
    pub fn validate_header(&self) -> CanvasResult<()> {
        check_header(Some(&self.doc_type), Some(self.version))
    }

    /// Decode every record into elements.
    ///
    /// Either all records decode or none are returned.
    ///
    /// # Errors
    ///
    /// Returns the first header, outline, id or duplicate-id error.
    pub fn to_elements(&self) -> CanvasResult<Vec<Element>> {
        self.validate_header()?;
        let mut seen = BTreeSet::new();
        let mut elements = Vec::with_capacity(self.elements.len());
        for record in &self.elements {
            let element = record.clone().into_element()?;
            if !seen.insert(element.id) {
                return Err(CanvasError::DuplicateId(element.id.get()));
            }
            elements.push(element);
        }
        Ok(elements)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Serialization`] if encoding fails.
    pub fn to_json_string(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document, checking the header before decoding elements.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnsupportedVersion`] or
    /// [`CanvasError::InvalidDocument`] for bad headers and
    /// [`CanvasError::Serialization`] for malformed records.
    pub fn from_json_str(json: &str) -> CanvasResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`DrawingDocument::from_json_str`].
    pub fn from_value(value: serde_json::Value) -> CanvasResult<Self> {
        if !value.is_object() {
            return Err(CanvasError::InvalidDocument(
                "document must be a JSON object".into(),
            ));
        }
        check_header(
            value.get("type").and_then(serde_json::Value::as_str),
            value.get("version").and_then(serde_json::Value::as_u64),
        )?;
        if value.get("appState").is_none() {
            return Err(CanvasError::InvalidDocument("missing appState".into()));
        }
        if !value.get("elements").is_some_and(serde_json::Value::is_array) {
            return Err(CanvasError::InvalidDocument(
                "elements must be an array".into(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn check_header(doc_type: Option<&str>, version: Option<u64>) -> CanvasResult<()> {
    match doc_type {
        Some(DOCUMENT_TYPE) => {}
        Some(other) => {
            return Err(CanvasError::InvalidDocument(format!(
                "expected type \"{DOCUMENT_TYPE}\", found \"{other}\""
            )))
        }
        None => return Err(CanvasError::InvalidDocument("missing type".into())),
    }
    match version {
        Some(DOCUMENT_VERSION) => Ok(()),
        Some(found) => Err(CanvasError::UnsupportedVersion {
            found,
            expected: DOCUMENT_VERSION,
        }),
        None => Err(CanvasError::InvalidDocument("missing version".into())),
    }
}
