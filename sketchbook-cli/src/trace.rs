//! Recorded pointer traces and their replay on a virtual clock.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use sketchbook_core::config::TAP_DELAY_MS;
use sketchbook_core::{
    ConfigUpdate, DeviceType, DrawingEngine, EngineConfig, EngineEvent, ManualScheduler,
    PointerEvent, PointerEventKind, ToolMode,
};
use tracing::{debug, info};

/// A pointer sample as recorded by a host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePointer {
    /// Client x coordinate.
    pub x: f32,
    /// Client y coordinate.
    pub y: f32,
    /// Device that produced the sample; mouse when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_type: Option<DeviceType>,
    /// Hardware pressure, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    /// Timestamp in milliseconds.
    pub t: u64,
}

impl TracePointer {
    fn to_event(self, kind: PointerEventKind) -> PointerEvent {
        let mut event = PointerEvent::new(kind, self.x, self.y, self.t);
        if let Some(device) = self.pointer_type {
            event = event.with_pointer_type(device);
        }
        if let Some(pressure) = self.pressure {
            event = event.with_pressure(pressure);
        }
        event
    }
}

/// One line of a trace: a pointer event or a host directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TraceEntry {
    /// Pointer pressed.
    Down(TracePointer),
    /// Pointer moved.
    Move(TracePointer),
    /// Pointer released.
    Up(TracePointer),
    /// Pointer cancelled by the platform.
    Cancel(TracePointer),
    /// Pointer entered the surface.
    Enter(TracePointer),
    /// Pointer left the surface.
    Leave(TracePointer),
    /// Undo the last element.
    Undo,
    /// Clear the drawing.
    Clear,
    /// Switch tool (`draw`, `erase` or a shape name).
    Tool {
        /// Tool name.
        tool: String,
    },
}

impl TraceEntry {
    /// The pointer event this entry replays, if it is one.
    #[must_use]
    pub fn pointer_event(&self) -> Option<PointerEvent> {
        let (kind, pointer) = match self {
            Self::Down(p) => (PointerEventKind::Down, p),
            Self::Move(p) => (PointerEventKind::Move, p),
            Self::Up(p) => (PointerEventKind::Up, p),
            Self::Cancel(p) => (PointerEventKind::Cancel, p),
            Self::Enter(p) => (PointerEventKind::Enter, p),
            Self::Leave(p) => (PointerEventKind::Leave, p),
            Self::Undo | Self::Clear | Self::Tool { .. } => return None,
        };
        Some(pointer.to_event(kind))
    }
}

/// Read a trace file (a JSON array of entries).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid trace.
pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    let entries: Vec<TraceEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid trace {}", path.display()))?;
    debug!(entries = entries.len(), path = %path.display(), "Trace loaded");
    Ok(entries)
}

/// Counts of what a replay produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Elements committed by interaction.
    pub committed: usize,
    /// Elements removed by the eraser.
    pub erased: usize,
}

/// Feed a trace through a fresh engine, advancing virtual time to each
/// pointer event's timestamp and flushing timers at the end.
///
/// # Errors
///
/// Returns an error for a tool directive naming an unknown tool.
pub fn replay(
    config: EngineConfig,
    entries: &[TraceEntry],
) -> anyhow::Result<(DrawingEngine<ManualScheduler>, ReplaySummary)> {
    let mut engine = DrawingEngine::manual(config);
    let summary = Rc::new(RefCell::new(ReplaySummary::default()));
    let sink = Rc::clone(&summary);
    engine.set_on_event(move |event| match event {
        EngineEvent::StrokeComplete(_) => sink.borrow_mut().committed += 1,
        EngineEvent::PathsErased(ids) => sink.borrow_mut().erased += ids.len(),
        _ => {}
    });

    let mut clock = 0;
    for entry in entries {
        if let Some(event) = entry.pointer_event() {
            clock = clock.max(event.timestamp_ms);
            engine.dispatch(&event);
            continue;
        }
        match entry {
            TraceEntry::Undo => {
                engine.undo();
            }
            TraceEntry::Clear => engine.clear(),
            TraceEntry::Tool { tool } => {
                let mode: ToolMode = tool.parse().map_err(|e: String| anyhow!(e))?;
                engine.update_config(ConfigUpdate::tool(mode));
            }
            _ => {}
        }
    }
    engine.advance_to(clock + TAP_DELAY_MS);

    let summary = *summary.borrow();
    info!(
        committed = summary.committed,
        erased = summary.erased,
        elements = engine.elements().len(),
        "Replay finished"
    );
    Ok((engine, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<TraceEntry> {
        serde_json::from_str(json).expect("trace")
    }

    #[test]
    fn test_trace_entry_format() {
        let entries = parse(
            r#"[
                {"kind": "down", "x": 1, "y": 2, "pointerType": "pen", "pressure": 0.4, "t": 0},
                {"kind": "up", "x": 1, "y": 2, "t": 30},
                {"kind": "tool", "tool": "eraser"},
                {"kind": "undo"}
            ]"#,
        );
        assert_eq!(entries.len(), 4);
        let down = entries[0].pointer_event().expect("pointer");
        assert_eq!(down.kind, PointerEventKind::Down);
        assert_eq!(down.device_type(), DeviceType::Pen);
        assert_eq!(down.pressure, Some(0.4));
        assert!(entries[2].pointer_event().is_none());
        assert_eq!(entries[3], TraceEntry::Undo);
    }

    #[test]
    fn test_replay_tap_and_undo() {
        let entries = parse(
            r#"[
                {"kind": "down", "x": 10, "y": 10, "t": 0},
                {"kind": "up", "x": 10, "y": 10, "t": 20},
                {"kind": "down", "x": 50, "y": 50, "t": 100},
                {"kind": "up", "x": 50, "y": 50, "t": 120},
                {"kind": "undo"}
            ]"#,
        );
        let (engine, summary) = replay(EngineConfig::default(), &entries).expect("replay");
        assert_eq!(summary.committed, 2);
        assert_eq!(engine.elements().len(), 1);
    }

    #[test]
    fn test_replay_unreleased_press_resolves_as_tap() {
        let entries = parse(r#"[{"kind": "down", "x": 10, "y": 10, "t": 0}]"#);
        let (engine, summary) = replay(EngineConfig::default(), &entries).expect("replay");
        assert_eq!(summary.committed, 1);
        assert_eq!(engine.elements().len(), 1);
    }

    #[test]
    fn test_replay_rejects_unknown_tool() {
        let entries = parse(r#"[{"kind": "tool", "tool": "spray"}]"#);
        assert!(replay(EngineConfig::default(), &entries).is_err());
    }
}
