//! Drawing export to vector markup and raster images.
//!
//! Every format goes through an SVG intermediate. Raster formats rasterize it
//! with resvg/tiny-skia at a fixed supersampling factor over an opaque white
//! background and encode with the `image` crate.

use std::fmt::Write;
use std::str::FromStr;

use base64::Engine as _;
use image::ImageEncoder;
use sketchbook_core::{
    BoxShape, DrawingDocument, DrawingEngine, Element, ElementKind, LineShape, Scheduler,
    ShapeStyle, Vec2,
};
use tracing::warn;

use crate::error::{RenderError, RenderResult};
use crate::sketch::{ellipse_vertices, sketch_path};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector markup (UTF-8 bytes).
    Svg,
}

impl ExportFormat {
    /// MIME type of the encoded output.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            other => Err(RenderError::Export(format!("unknown format: {other}"))),
        }
    }
}

/// Configuration for raster export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Supersampling factor (default: 2.0).
    pub scale: f32,
    /// Background color as RGBA bytes (default: opaque white).
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 92).
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: [255, 255, 255, 255],
            jpeg_quality: 92,
        }
    }
}

/// An owned copy of a drawing, safe to hand to a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSnapshot {
    /// Elements in z-order.
    pub elements: Vec<Element>,
    /// Logical canvas width.
    pub width: f32,
    /// Logical canvas height.
    pub height: f32,
}

impl DrawingSnapshot {
    /// Snapshot from parts.
    #[must_use]
    pub fn new(elements: Vec<Element>, width: f32, height: f32) -> Self {
        Self {
            elements,
            width,
            height,
        }
    }

    /// Snapshot the engine's current drawing.
    #[must_use]
    pub fn from_engine<S: Scheduler>(engine: &DrawingEngine<S>) -> Self {
        let config = engine.config();
        Self::new(engine.elements().to_vec(), config.width, config.height)
    }

    /// Decode a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if the document does not decode.
    pub fn from_document(document: &DrawingDocument) -> RenderResult<Self> {
        let elements = document
            .to_elements()
            .map_err(|e| RenderError::Export(e.to_string()))?;
        Ok(Self::new(
            elements,
            document.app_state.width,
            document.app_state.height,
        ))
    }
}

/// Outline of the box drawn for elements this build cannot render.
const PLACEHOLDER_ATTRS: &str =
    "fill=\"none\" stroke=\"#999\" stroke-width=\"1\" stroke-dasharray=\"4 4\"";

/// Exports drawings to vector and raster formats.
#[derive(Debug, Clone, Default)]
pub struct DrawingExporter {
    config: ExportConfig,
}

impl DrawingExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Export a drawing to the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be rasterized or encoded.
    pub fn export(&self, drawing: &DrawingSnapshot, format: ExportFormat) -> RenderResult<Vec<u8>> {
        match format {
            ExportFormat::Png => self.render_to_png(drawing),
            ExportFormat::Jpeg => self.render_to_jpeg(drawing),
            ExportFormat::Svg => Ok(Self::render_to_svg(drawing).into_bytes()),
        }
    }

    /// Portable vector markup at logical size, without a background.
    #[must_use]
    pub fn render_to_svg(drawing: &DrawingSnapshot) -> String {
        svg_markup(drawing, 1.0, None)
    }

    /// Export the drawing to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or encoding fails.
    pub fn render_to_png(&self, drawing: &DrawingSnapshot) -> RenderResult<Vec<u8>> {
        let pixmap = self.rasterize(drawing)?;
        pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))
    }

    /// Export the drawing to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(&self, drawing: &DrawingSnapshot) -> RenderResult<Vec<u8>> {
        let pixmap = self.rasterize(drawing)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        for pixel in pixmap.data().chunks_exact(4) {
            // Pixmap data is premultiplied; composite onto the background.
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for (channel, base) in pixel[..3].iter().zip(bg) {
                rgb_data.push(f32::from(*base).mul_add(inv, f32::from(*channel)) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| RenderError::Encode(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Encode the drawing as a `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the export itself fails.
    pub fn render_to_data_url(
        &self,
        drawing: &DrawingSnapshot,
        format: ExportFormat,
    ) -> RenderResult<String> {
        let bytes = self.export(drawing, format)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{encoded}", format.mime_type()))
    }

    /// Rasterize the drawing at the configured scale over the background.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize(&self, drawing: &DrawingSnapshot) -> RenderResult<tiny_skia::Pixmap> {
        let svg = svg_markup(drawing, self.config.scale, Some(self.config.background));
        let opt = usvg::Options::default();
        let tree = usvg::Tree::from_str(&svg, &opt)
            .map_err(|e| RenderError::Rasterize(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().ceil() as u32;
        let px_h = tree.size().height().ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Rasterize("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

/// Build the SVG document for a drawing.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn svg_markup(drawing: &DrawingSnapshot, scale: f32, background: Option<[u8; 4]>) -> String {
    let view_w = drawing.width.max(1.0);
    let view_h = drawing.height.max(1.0);
    let out_w = (view_w * scale).round().max(1.0) as u32;
    let out_h = (view_h * scale).round().max(1.0) as u32;

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
    );

    if let Some(bg) = background {
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"rgba({},{},{},{})\"/>",
            bg[0], bg[1], bg[2], bg_alpha,
        );
    }

    for element in &drawing.elements {
        render_element_svg(&mut svg, element);
    }

    svg.push_str("</svg>");
    svg
}

/// Render a single element to SVG.
fn render_element_svg(svg: &mut String, element: &Element) {
    match element.kind() {
        ElementKind::Stroke(stroke) => {
            if stroke.outline.is_empty() {
                return;
            }
            let color = escape_xml(&stroke.color);
            let _ = write!(svg, "<path d=\"{}\" fill=\"{color}\"/>", stroke.outline);
        }

        ElementKind::Rectangle(shape) => {
            let vertices = [
                Vec2::new(shape.x, shape.y),
                Vec2::new(shape.x + shape.width, shape.y),
                Vec2::new(shape.x + shape.width, shape.y + shape.height),
                Vec2::new(shape.x, shape.y + shape.height),
            ];
            render_box_shape(svg, element, shape, &vertices, |svg, attrs| {
                let _ = write!(
                    svg,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {attrs}/>",
                    shape.x, shape.y, shape.width, shape.height,
                );
            });
        }

        ElementKind::Circle(shape) => {
            let r = shape.width.min(shape.height) / 2.0;
            let (cx, cy) = center(shape);
            let vertices = ellipse_vertices(cx, cy, r, r);
            render_box_shape(svg, element, shape, &vertices, |svg, attrs| {
                let _ = write!(svg, "<circle cx=\"{cx}\" cy=\"{cy}\" r=\"{r}\" {attrs}/>");
            });
        }

        ElementKind::Ellipse(shape) => {
            let (rx, ry) = (shape.width / 2.0, shape.height / 2.0);
            let (cx, cy) = center(shape);
            let vertices = ellipse_vertices(cx, cy, rx, ry);
            render_box_shape(svg, element, shape, &vertices, |svg, attrs| {
                let _ = write!(
                    svg,
                    "<ellipse cx=\"{cx}\" cy=\"{cy}\" rx=\"{rx}\" ry=\"{ry}\" {attrs}/>"
                );
            });
        }

        ElementKind::Triangle(shape) => {
            let vertices = [
                Vec2::new(shape.x + shape.width / 2.0, shape.y),
                Vec2::new(shape.x + shape.width, shape.y + shape.height),
                Vec2::new(shape.x, shape.y + shape.height),
            ];
            render_box_shape(svg, element, shape, &vertices, |svg, attrs| {
                let points = vertices
                    .iter()
                    .map(|v| format!("{},{}", v.x, v.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(svg, "<polygon points=\"{points}\" {attrs}/>");
            });
        }

        ElementKind::Line(line) => render_line(svg, element, line),

        ElementKind::Unknown(unknown) => {
            warn!(
                id = %element.id,
                tag = %unknown.tag,
                "Rendering placeholder for unknown element"
            );
            if let Some(b) = element.bounds() {
                let _ = write!(
                    svg,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {PLACEHOLDER_ATTRS}/>",
                    b.x, b.y, b.width, b.height,
                );
            }
        }
    }
}

fn center(shape: &BoxShape) -> (f32, f32) {
    (shape.x + shape.width / 2.0, shape.y + shape.height / 2.0)
}

fn fill_attrs(style: &ShapeStyle) -> String {
    match &style.fill {
        Some(fill) if fill.enabled => format!(
            "fill=\"{}\" fill-opacity=\"{}\"",
            escape_xml(&fill.color),
            fill.opacity.clamp(0.0, 1.0)
        ),
        _ => "fill=\"none\"".to_string(),
    }
}

fn stroke_attrs(style: &ShapeStyle) -> String {
    format!(
        "stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\"",
        escape_xml(&style.color),
        style.stroke_width
    )
}

/// Render a closed shape, clean or hand-drawn.
///
/// `clean` writes the native SVG element given the attribute string.
fn render_box_shape<F>(
    svg: &mut String,
    element: &Element,
    shape: &BoxShape,
    vertices: &[Vec2],
    clean: F,
) where
    F: Fn(&mut String, &str),
{
    let style = &shape.style;
    if !style.sketchy {
        clean(svg, &format!("{} {}", fill_attrs(style), stroke_attrs(style)));
        return;
    }

    if style.fill.as_ref().is_some_and(|f| f.enabled) {
        clean(svg, &format!("{} stroke=\"none\"", fill_attrs(style)));
    }
    for pass in 0..2 {
        let d = sketch_path(vertices, true, element.id.get(), pass);
        let _ = write!(svg, "<path d=\"{d}\" fill=\"none\" {}/>", stroke_attrs(style));
    }
}

fn render_line(svg: &mut String, element: &Element, line: &LineShape) {
    let style = &line.style;
    if style.sketchy {
        let vertices = [Vec2::new(line.x1, line.y1), Vec2::new(line.x2, line.y2)];
        for pass in 0..2 {
            let d = sketch_path(&vertices, false, element.id.get(), pass);
            let _ = write!(
                svg,
                "<path d=\"{d}\" fill=\"none\" {} stroke-linecap=\"round\"/>",
                stroke_attrs(style)
            );
        }
    } else {
        let _ = write!(
            svg,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" {} stroke-linecap=\"round\"/>",
            line.x1,
            line.y1,
            line.x2,
            line.y2,
            stroke_attrs(style)
        );
    }
}

/// Escape XML special characters in attribute values.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
