//! Integration tests for drawing export (sketchbook-renderer).
//!
//! Drives a real engine, then exports across formats, including the async
//! raster path and documents loaded from JSON.

use sketchbook_core::{
    ConfigUpdate, DrawingDocument, DrawingEngine, EngineConfig, ManualScheduler, PointerEvent,
    PointerEventKind, ShapeDescriptor, ShapeKind, ShapeStyle, ToolMode,
};
use sketchbook_renderer::{
    DrawingExporter, DrawingSnapshot, EngineExportExt, ExportConfig, ExportFormat,
};

fn event(kind: PointerEventKind, x: f32, y: f32, t: u64) -> PointerEvent {
    PointerEvent::new(kind, x, y, t)
}

/// An engine with one freehand stroke, one tap dot and one rectangle.
fn sample_engine() -> DrawingEngine<ManualScheduler> {
    let mut engine = DrawingEngine::manual(EngineConfig::default());

    engine.dispatch(&event(PointerEventKind::Down, 100.0, 100.0, 0));
    for (i, t) in (1..20_u16).zip((16..).step_by(16)) {
        let d = f32::from(i) * 10.0;
        engine.dispatch(&event(PointerEventKind::Move, 100.0 + d, 100.0 + d / 2.0, t));
    }
    engine.dispatch(&event(PointerEventKind::Up, 290.0, 195.0, 400));

    engine.dispatch(&event(PointerEventKind::Down, 500.0, 500.0, 1000));
    engine.dispatch(&event(PointerEventKind::Up, 500.0, 500.0, 1040));

    engine
        .add_shape(ShapeDescriptor::boxed(
            ShapeKind::Rectangle,
            600.0,
            100.0,
            120.0,
            80.0,
            ShapeStyle::new("#1e90ff", 4.0),
        ))
        .expect("valid rectangle");

    engine
}

// ==========================================================================
// Vector markup
// ==========================================================================

#[test]
fn test_vector_markup_contains_every_element() {
    let engine = sample_engine();
    assert_eq!(engine.elements().len(), 3);

    let svg = engine.export_as_vector_markup();
    assert!(svg.starts_with("<svg"));
    assert!(svg.ends_with("</svg>"));
    assert_eq!(svg.matches("<path").count(), 2);
    assert!(svg.contains("<rect x=\"600\" y=\"100\""));
    assert!(svg.contains("stroke=\"#1e90ff\""));
}

#[test]
fn test_vector_markup_of_empty_engine() {
    let engine = DrawingEngine::manual(EngineConfig::default());
    let svg = engine.export_as_vector_markup();
    assert!(svg.contains("viewBox=\"0 0 870 870\""));
    assert!(!svg.contains("<path"));
}

#[test]
fn test_sketchy_shapes_from_drag_export_hand_drawn() {
    let mut engine = DrawingEngine::manual(EngineConfig::default());
    engine.update_config(ConfigUpdate {
        sketchy_mode: Some(true),
        tool: Some(ToolMode::Shape(ShapeKind::Ellipse)),
        ..ConfigUpdate::default()
    });
    engine.dispatch(&event(PointerEventKind::Down, 10.0, 10.0, 0));
    engine.dispatch(&event(PointerEventKind::Move, 80.0, 60.0, 20));
    engine.dispatch(&event(PointerEventKind::Up, 80.0, 60.0, 40));
    assert_eq!(engine.elements().len(), 1);

    let svg = engine.export_as_vector_markup();
    assert!(!svg.contains("<ellipse"));
    assert_eq!(svg.matches("<path").count(), 2);
}

// ==========================================================================
// Async raster export
// ==========================================================================

#[tokio::test]
async fn test_export_as_png() {
    let engine = sample_engine();
    let png = engine
        .export_as_image(ExportFormat::Png, ExportConfig::default())
        .await;
    assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    assert_eq!(width, 1740);
}

#[tokio::test]
async fn test_export_as_jpeg() {
    let engine = sample_engine();
    let jpeg = engine
        .export_as_image(ExportFormat::Jpeg, ExportConfig::default())
        .await;
    assert_eq!(jpeg[0], 0xFF);
    assert_eq!(jpeg[1], 0xD8);
}

#[tokio::test]
async fn test_export_snapshot_ignores_later_edits() {
    let mut engine = sample_engine();
    let pending = engine.export_as_image(ExportFormat::Svg, ExportConfig::default());
    engine.clear();

    let svg = String::from_utf8(pending.await).expect("utf8");
    assert!(svg.contains("<rect x=\"600\""));
}

// ==========================================================================
// Stored documents
// ==========================================================================

#[test]
fn test_document_export_matches_engine_export() {
    let engine = sample_engine();
    let json = engine.export_as_json().to_json_string().expect("encode");

    let document = DrawingDocument::from_json_str(&json).expect("decode");
    let snapshot = DrawingSnapshot::from_document(&document).expect("snapshot");

    assert_eq!(
        DrawingExporter::render_to_svg(&snapshot),
        engine.export_as_vector_markup()
    );
}

#[test]
fn test_document_with_unknown_element_renders_placeholder() {
    let json = r##"{
        "type": "drawing",
        "version": 1,
        "elements": [
            {"id": 0, "type": "sticker", "x": 10, "y": 10, "width": 50, "height": 50, "emoji": "*"},
            {"id": 1, "type": "line", "x1": 0, "y1": 0, "x2": 40, "y2": 40, "color": "#000000", "strokeWidth": 2}
        ],
        "appState": {"width": 200, "height": 200}
    }"##;
    let document = DrawingDocument::from_json_str(json).expect("decode");
    let snapshot = DrawingSnapshot::from_document(&document).expect("snapshot");
    let svg = DrawingExporter::render_to_svg(&snapshot);

    assert!(svg.contains("stroke-dasharray"));
    assert!(svg.contains("<line x1=\"0\" y1=\"0\" x2=\"40\" y2=\"40\""));
}

#[test]
fn test_custom_scale_and_background() {
    let engine = sample_engine();
    let exporter = DrawingExporter::new(ExportConfig {
        scale: 0.5,
        background: [0, 0, 0, 255],
        jpeg_quality: 50,
    });
    let png = exporter
        .export(&DrawingSnapshot::from_engine(&engine), ExportFormat::Png)
        .expect("png");
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    assert_eq!(width, 435);
}

#[test]
fn test_data_url_for_jpeg() {
    let engine = sample_engine();
    let url = DrawingExporter::with_defaults()
        .render_to_data_url(&DrawingSnapshot::from_engine(&engine), ExportFormat::Jpeg)
        .expect("data url");
    assert!(url.starts_with("data:image/jpeg;base64,/9j/"));
}
