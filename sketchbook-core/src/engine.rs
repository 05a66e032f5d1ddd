//! # Drawing Engine
//!
//! The interaction state machine and the lifecycle facade hosts talk to.
//!
//! ```text
//!            pointerdown              move ≥ 3px
//!   Idle ───────────────► Pressed ───────────────► Dragging
//!    ▲                     │  │                        │
//!    │   pointerup / tap   │  │                        │ pointerup
//!    └─────── timeout ─────┘  └────────────────────────┴──► commit
//! ```
//!
//! Erasing runs on the same lifecycle: strokes touched by the eraser disc are
//! marked while the pointer is down and removed on release.
//!
//! All input is handled on the caller's thread. The only deferred work is the
//! tap timeout and the throttled preview, both requested through a
//! [`Scheduler`] and delivered back via [`DrawingEngine::handle_timer`].

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{
    ConfigUpdate, EngineConfig, ToolMode, FINAL_SAMPLE_MIN_DISTANCE, FRAME_BUDGET_MS,
    MOVE_THRESHOLD_PX, TAP_DELAY_MS,
};
use crate::document::{AppState, DrawingDocument};
use crate::element::{Element, ElementId, ShapeDescriptor, ShapeKind, ShapeStyle};
use crate::error::CanvasResult;
use crate::geometry::{Point, Vec2};
use crate::input::{
    DeviceType, InputNormalizer, InputSample, PointerEvent, PointerEventKind, SurfaceBounds,
};
use crate::outline::Outline;
use crate::scheduler::{ManualScheduler, Scheduler, TimerHandle, TimerTask};
use crate::smoother::{single_point_outline, smooth_to_outline, StrokeOptions};
use crate::store::StrokeStore;

/// The host-side element that delivers pointer events.
pub trait InputSurface {
    /// Start delivering events of this kind to the engine.
    fn add_listener(&mut self, kind: PointerEventKind);

    /// Stop delivering events of this kind.
    fn remove_listener(&mut self, kind: PointerEventKind);

    /// Suppress or restore the surface's context menu.
    fn set_context_menu_suppressed(&mut self, suppressed: bool);

    /// Current on-screen placement, used to map client coordinates.
    fn bounds(&self) -> SurfaceBounds;
}

/// Notifications to the host, delivered synchronously as state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// An element was committed by interaction.
    StrokeComplete(ElementId),
    /// Elements were removed: marked ones on eraser release, or a tap dot
    /// that a continued drag replaced.
    PathsErased(BTreeSet<ElementId>),
    /// The set of elements marked for erasing grew.
    PathsMarkedForErase(BTreeSet<ElementId>),
    /// The eraser moved, in canvas coordinates.
    EraserMoved(Vec2),
    /// The pointer entered or left the surface in erase mode.
    EraserVisibilityChanged(bool),
    /// The live preview was regenerated.
    PreviewUpdated,
}

/// Live preview of the interaction in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// Outline of the stroke being drawn.
    Stroke(Outline),
    /// Shape being dragged out.
    Shape(ShapeDescriptor),
}

/// Coarse interaction state, for hosts and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// No pointer down.
    Idle,
    /// Pointer down, not yet moved past the threshold.
    Pressed,
    /// Drawing a stroke or dragging a shape.
    Dragging,
    /// Pointer down with the eraser.
    Erasing,
}

#[derive(Debug)]
struct Drag {
    tool: ToolMode,
    device: DeviceType,
    start: Vec2,
    current: Vec2,
    /// Raw samples, smoothed once more on commit.
    points: Vec<Point>,
    /// Jitter-smoothed samples for the live preview.
    preview_points: Vec<Point>,
}

impl Drag {
    fn new(tool: ToolMode, start: InputSample) -> Self {
        let origin = start.point.position();
        Self {
            tool,
            device: start.device_type,
            start: origin,
            current: origin,
            points: vec![start.point],
            preview_points: vec![start.point],
        }
    }

    fn push(&mut self, sample: InputSample, smoothed: Option<Point>) {
        self.points.push(sample.point);
        self.preview_points.push(smoothed.unwrap_or(sample.point));
        self.current = sample.point.position();
    }
}

#[derive(Debug, Default)]
enum Interaction {
    #[default]
    Idle,
    Pressed {
        tool: ToolMode,
        start: InputSample,
        tap_timer: Option<TimerHandle>,
        /// Dot committed by the tap timeout while the pointer is still down.
        dot: Option<ElementId>,
    },
    Dragging(Drag),
    Erasing {
        pending: BTreeSet<ElementId>,
    },
}

type EventCallback = Box<dyn FnMut(&EngineEvent)>;

/// A drawing session for one page.
///
/// # Example
///
/// ```
/// use sketchbook_core::{DrawingEngine, EngineConfig, PointerEvent, PointerEventKind};
///
/// let mut engine = DrawingEngine::manual(EngineConfig::default());
/// engine.dispatch(&PointerEvent::new(PointerEventKind::Down, 10.0, 10.0, 0));
/// engine.dispatch(&PointerEvent::new(PointerEventKind::Up, 10.0, 10.0, 40));
///
/// assert_eq!(engine.store().len(), 1);
/// ```
pub struct DrawingEngine<S: Scheduler> {
    config: EngineConfig,
    store: StrokeStore,
    normalizer: InputNormalizer,
    scheduler: S,
    interaction: Interaction,
    preview: Option<Preview>,
    frame_timer: Option<TimerHandle>,
    last_frame_ms: Option<u64>,
    surface: Option<Box<dyn InputSurface>>,
    on_event: Option<EventCallback>,
}

impl<S: Scheduler> fmt::Debug for DrawingEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingEngine")
            .field("config", &self.config)
            .field("elements", &self.store.len())
            .field("state", &self.state())
            .field("attached", &self.surface.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Scheduler> DrawingEngine<S> {
    /// Create an engine with an empty document.
    #[must_use]
    pub fn new(config: EngineConfig, scheduler: S) -> Self {
        info!(
            width = config.width,
            height = config.height,
            "Creating drawing engine"
        );
        let normalizer = InputNormalizer::new(config.width, config.height);
        Self {
            config,
            store: StrokeStore::new(),
            normalizer,
            scheduler,
            interaction: Interaction::Idle,
            preview: None,
            frame_timer: None,
            last_frame_ms: None,
            surface: None,
            on_event: None,
        }
    }

    /// Register the notification callback, replacing any previous one.
    pub fn set_on_event<F>(&mut self, callback: F)
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.on_event = Some(Box::new(callback));
    }

    fn emit(&mut self, event: EngineEvent) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(&event);
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a partial configuration update.
    ///
    /// A tool change takes effect on the next press; the interaction in
    /// progress keeps the tool it started with.
    pub fn update_config(&mut self, update: ConfigUpdate) {
        let resizes = update.resizes();
        self.config.apply(update);
        if resizes {
            self.normalizer
                .set_logical_size(self.config.width, self.config.height);
        }
        debug!(config = ?self.config, "Config updated");
    }

    /// The committed elements.
    #[must_use]
    pub const fn store(&self) -> &StrokeStore {
        &self.store
    }

    /// Committed elements in z-order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.store.elements()
    }

    /// The live preview, if an interaction is being drawn.
    #[must_use]
    pub const fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Ids currently marked by the eraser.
    #[must_use]
    pub fn marked_for_erase(&self) -> Option<&BTreeSet<ElementId>> {
        match &self.interaction {
            Interaction::Erasing { pending } => Some(pending),
            _ => None,
        }
    }

    /// Coarse interaction state.
    #[must_use]
    pub const fn state(&self) -> InteractionState {
        match self.interaction {
            Interaction::Idle => InteractionState::Idle,
            Interaction::Pressed { .. } => InteractionState::Pressed,
            Interaction::Dragging(_) => InteractionState::Dragging,
            Interaction::Erasing { .. } => InteractionState::Erasing,
        }
    }

    /// The scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    // ------------------------------------------------------------------
    // Surface lifecycle
    // ------------------------------------------------------------------

    /// Start listening to a surface.
    ///
    /// Registers every pointer listener and suppresses the context menu.
    /// Returns `false` if a surface is already attached.
    pub fn attach(&mut self, mut surface: Box<dyn InputSurface>) -> bool {
        if self.surface.is_some() {
            warn!("Surface already attached, ignoring attach");
            return false;
        }
        for kind in PointerEventKind::ALL {
            surface.add_listener(kind);
        }
        surface.set_context_menu_suppressed(true);
        self.surface = Some(surface);
        info!("Input surface attached");
        true
    }

    /// Stop listening and hand the surface back.
    ///
    /// Returns `None` when nothing is attached.
    pub fn detach(&mut self) -> Option<Box<dyn InputSurface>> {
        let mut surface = self.surface.take()?;
        for kind in PointerEventKind::ALL {
            surface.remove_listener(kind);
        }
        surface.set_context_menu_suppressed(false);
        info!("Input surface detached");
        Some(surface)
    }

    /// Whether a surface is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Tear down: cancel pending timers, drop the preview and the
    /// interaction in progress, and detach the surface.
    pub fn destroy(&mut self) {
        if let Interaction::Pressed {
            tap_timer: Some(handle),
            ..
        } = self.interaction
        {
            self.scheduler.cancel(handle);
        }
        self.cancel_frame();
        self.interaction = Interaction::Idle;
        self.preview = None;
        self.detach();
        info!("Drawing engine destroyed");
    }

    fn surface_bounds(&self) -> SurfaceBounds {
        self.surface.as_ref().map_or_else(
            || SurfaceBounds::new(0.0, 0.0, self.config.width, self.config.height),
            |surface| surface.bounds(),
        )
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Feed one pointer event.
    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        let bounds = self.surface_bounds();
        match event.kind {
            PointerEventKind::Down => self.on_down(event, &bounds),
            PointerEventKind::Move => self.on_move(event, &bounds),
            PointerEventKind::Up => self.on_release(event, &bounds, false),
            PointerEventKind::Cancel => self.on_release(event, &bounds, true),
            PointerEventKind::Enter | PointerEventKind::Leave => {
                if self.config.tool == ToolMode::Erase {
                    self.emit(EngineEvent::EraserVisibilityChanged(
                        event.kind == PointerEventKind::Enter,
                    ));
                }
            }
        }
    }

    fn on_down(&mut self, event: &PointerEvent, bounds: &SurfaceBounds) {
        if !matches!(self.interaction, Interaction::Idle) {
            debug!("pointerdown during an interaction, ignored");
            return;
        }
        let now = event.timestamp_ms;
        self.last_frame_ms = None;

        match self.config.tool {
            ToolMode::Erase => {
                let position = self
                    .normalizer
                    .map_to_canvas(event.client_x, event.client_y, bounds);
                self.interaction = Interaction::Erasing {
                    pending: BTreeSet::new(),
                };
                debug!("Idle -> Erasing");
                self.emit(EngineEvent::EraserMoved(position));
                self.erase_at(position);
            }
            tool => {
                self.normalizer.reset();
                let start = self.normalizer.sample(event, bounds);
                let tap_timer = (tool == ToolMode::Draw)
                    .then(|| self.scheduler.schedule(now, TAP_DELAY_MS, TimerTask::TapTimeout));
                self.interaction = Interaction::Pressed {
                    tool,
                    start,
                    tap_timer,
                    dot: None,
                };
                debug!(x = start.point.x, y = start.point.y, "Idle -> Pressed");
            }
        }
    }

    fn on_move(&mut self, event: &PointerEvent, bounds: &SurfaceBounds) {
        let now = event.timestamp_ms;
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle => {
                if self.config.tool == ToolMode::Erase {
                    let position = self
                        .normalizer
                        .map_to_canvas(event.client_x, event.client_y, bounds);
                    self.emit(EngineEvent::EraserMoved(position));
                }
            }
            Interaction::Pressed {
                tool,
                start,
                tap_timer,
                dot,
            } => {
                let sample = self.normalizer.sample(event, bounds);
                if sample.point.distance_to(&start.point) < MOVE_THRESHOLD_PX {
                    self.interaction = Interaction::Pressed {
                        tool,
                        start,
                        tap_timer,
                        dot,
                    };
                    return;
                }
                if let Some(handle) = tap_timer {
                    self.scheduler.cancel(handle);
                }
                // The press turned into a drag; the stroke replaces the dot.
                if let Some(id) = dot {
                    let removed = self.store.erase_matching(&BTreeSet::from([id]));
                    debug!(?id, "Dot superseded by drag");
                    if !removed.is_empty() {
                        self.emit(EngineEvent::PathsErased(removed));
                    }
                }
                let mut drag = Drag::new(tool, start);
                drag.push(sample, self.normalizer.smoothed());
                self.interaction = Interaction::Dragging(drag);
                debug!("Pressed -> Dragging");
                self.request_frame(now);
            }
            Interaction::Dragging(mut drag) => {
                let sample = self.normalizer.sample(event, bounds);
                drag.push(sample, self.normalizer.smoothed());
                self.interaction = Interaction::Dragging(drag);
                self.request_frame(now);
            }
            Interaction::Erasing { pending } => {
                self.interaction = Interaction::Erasing { pending };
                let position = self
                    .normalizer
                    .map_to_canvas(event.client_x, event.client_y, bounds);
                self.emit(EngineEvent::EraserMoved(position));
                self.erase_at(position);
            }
        }
    }

    fn on_release(&mut self, event: &PointerEvent, bounds: &SurfaceBounds, cancelled: bool) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle => {}
            Interaction::Pressed {
                tool,
                start,
                tap_timer,
                dot,
            } => {
                if let Some(handle) = tap_timer {
                    self.scheduler.cancel(handle);
                }
                debug!("Pressed -> Idle");
                if tool == ToolMode::Draw && dot.is_none() {
                    self.commit_dot(start);
                }
            }
            Interaction::Dragging(mut drag) => {
                self.cancel_frame();
                self.preview = None;
                debug!(cancelled, "Dragging -> Idle");
                match drag.tool {
                    ToolMode::Shape(kind) => {
                        if cancelled {
                            debug!("Shape preview discarded");
                        } else {
                            let end = self
                                .normalizer
                                .map_to_canvas(event.client_x, event.client_y, bounds);
                            self.commit_shape(kind, drag.start, end);
                        }
                    }
                    ToolMode::Draw | ToolMode::Erase => {
                        let end = self
                            .normalizer
                            .map_to_canvas(event.client_x, event.client_y, bounds);
                        if end.sub(&drag.current).length() > FINAL_SAMPLE_MIN_DISTANCE {
                            let sample = self.normalizer.sample(event, bounds);
                            drag.push(sample, None);
                        }
                        self.commit_stroke(&drag.points, drag.device);
                    }
                }
            }
            Interaction::Erasing { pending } => {
                let removed = self.store.erase_matching(&pending);
                debug!(removed = removed.len(), "Erasing -> Idle");
                if !removed.is_empty() {
                    self.emit(EngineEvent::PathsErased(removed));
                }
            }
        }
    }

    fn erase_at(&mut self, position: Vec2) {
        let radius = self.config.eraser_radius();
        let Interaction::Erasing { pending } = &mut self.interaction else {
            return;
        };
        let before = pending.len();
        pending.extend(
            self.store
                .hit_test(position.x, position.y, radius)
                .collect::<Vec<_>>(),
        );
        if pending.len() > before {
            let marked = pending.clone();
            self.emit(EngineEvent::PathsMarkedForErase(marked));
        }
    }

    /// Discard a shape being dragged out.
    ///
    /// Freehand strokes cannot be cancelled; returns `false` unless a shape
    /// interaction was discarded.
    pub fn cancel(&mut self) -> bool {
        let is_shape = match &self.interaction {
            Interaction::Pressed { tool, .. } => matches!(tool, ToolMode::Shape(_)),
            Interaction::Dragging(drag) => matches!(drag.tool, ToolMode::Shape(_)),
            Interaction::Idle | Interaction::Erasing { .. } => false,
        };
        if !is_shape {
            return false;
        }
        self.cancel_frame();
        self.preview = None;
        self.interaction = Interaction::Idle;
        debug!("Shape interaction cancelled");
        true
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn request_frame(&mut self, now_ms: u64) {
        if let Some(handle) = self.frame_timer.take() {
            self.scheduler.cancel(handle);
        }
        let delay = self.last_frame_ms.map_or(0, |last| {
            FRAME_BUDGET_MS.saturating_sub(now_ms.saturating_sub(last))
        });
        self.frame_timer = Some(
            self.scheduler
                .schedule(now_ms, delay, TimerTask::PreviewFrame),
        );
    }

    fn cancel_frame(&mut self) {
        if let Some(handle) = self.frame_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// Deliver a timer scheduled by this engine.
    ///
    /// Returns `false` for handles that are stale (cancelled or superseded).
    pub fn handle_timer(&mut self, handle: TimerHandle, now_ms: u64) -> bool {
        if self.frame_timer == Some(handle) {
            self.frame_timer = None;
            self.render_preview(now_ms);
            return true;
        }

        let tapped = match &self.interaction {
            Interaction::Pressed {
                tool,
                start,
                tap_timer: Some(timer),
                ..
            } if *timer == handle => Some((*tool, *start)),
            _ => None,
        };
        match tapped {
            Some((tool, start)) => {
                debug!("Tap timeout, dot committed");
                let dot = self.commit_dot(start);
                // Still pressed: a later drag replaces the dot with a stroke.
                self.interaction = Interaction::Pressed {
                    tool,
                    start,
                    tap_timer: None,
                    dot: Some(dot),
                };
                true
            }
            None => {
                debug!(?handle, "Stale timer ignored");
                false
            }
        }
    }

    fn render_preview(&mut self, now_ms: u64) {
        self.last_frame_ms = Some(now_ms);
        let Interaction::Dragging(drag) = &self.interaction else {
            return;
        };
        let preview = match drag.tool {
            ToolMode::Shape(kind) => Preview::Shape(ShapeDescriptor::from_drag(
                kind,
                drag.start,
                drag.current,
                self.shape_style(),
            )),
            ToolMode::Draw | ToolMode::Erase => {
                let options = StrokeOptions::for_device(drag.device, self.config.stroke_width);
                Preview::Stroke(smooth_to_outline(&drag.preview_points, &options))
            }
        };
        self.preview = Some(preview);
        self.emit(EngineEvent::PreviewUpdated);
    }

    // ------------------------------------------------------------------
    // Commits
    // ------------------------------------------------------------------

    fn shape_style(&self) -> ShapeStyle {
        ShapeStyle::new(self.config.stroke_color.clone(), self.config.stroke_width)
            .with_sketchy(self.config.sketchy_mode)
    }

    fn commit_stroke(&mut self, points: &[Point], device: DeviceType) {
        let options = StrokeOptions::for_device(device, self.config.stroke_width).with_last(true);
        let outline = smooth_to_outline(points, &options);
        if outline.is_empty() {
            warn!(points = points.len(), "Stroke produced no outline, dropped");
            return;
        }
        let id = self
            .store
            .append(
                outline,
                self.config.stroke_color.clone(),
                self.config.stroke_width,
                device,
                false,
            )
            .id;
        self.emit(EngineEvent::StrokeComplete(id));
    }

    fn commit_dot(&mut self, start: InputSample) -> ElementId {
        let outline = single_point_outline(start.point, self.config.stroke_width);
        let id = self
            .store
            .append(
                outline,
                self.config.stroke_color.clone(),
                self.config.stroke_width,
                start.device_type,
                true,
            )
            .id;
        self.emit(EngineEvent::StrokeComplete(id));
        id
    }

    fn commit_shape(&mut self, kind: ShapeKind, start: Vec2, end: Vec2) {
        let descriptor = ShapeDescriptor::from_drag(kind, start, end, self.shape_style());
        match self.store.add_shape(descriptor) {
            Ok(element) => {
                let id = element.id;
                self.emit(EngineEvent::StrokeComplete(id));
            }
            Err(e) => debug!(error = %e, "Dragged shape not committed"),
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Add a shape. Returns `None` when the descriptor is not drawable.
    pub fn add_shape(&mut self, descriptor: ShapeDescriptor) -> Option<&Element> {
        match self.store.add_shape(descriptor) {
            Ok(element) => Some(element),
            Err(e) => {
                warn!(error = %e, "Rejected shape");
                None
            }
        }
    }

    /// Remove the most recent element. Returns `false` when empty.
    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    /// Remove every element and restart ids at 0.
    pub fn clear(&mut self) {
        self.store.clear();
        self.reset_element_refs();
        info!("Drawing cleared");
    }

    /// Forget ids held by the interaction; they may be reissued after a
    /// clear or import.
    fn reset_element_refs(&mut self) {
        match &mut self.interaction {
            Interaction::Erasing { pending } => pending.clear(),
            Interaction::Pressed { dot, .. } => *dot = None,
            Interaction::Idle | Interaction::Dragging(_) => {}
        }
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Snapshot the drawing as a document.
    #[must_use]
    pub fn export_as_json(&self) -> DrawingDocument {
        DrawingDocument::from_elements(
            self.store.elements(),
            AppState {
                width: self.config.width,
                height: self.config.height,
            },
        )
    }

    /// Replace the drawing with a document's contents.
    ///
    /// Nothing changes unless every element decodes.
    ///
    /// # Errors
    ///
    /// Returns the reason the document was rejected.
    pub fn import_from_json(&mut self, document: &DrawingDocument) -> CanvasResult<()> {
        let result = document
            .to_elements()
            .and_then(|elements| self.store.replace(elements));
        match &result {
            Ok(()) => {
                self.reset_element_refs();
                info!(
                    elements = self.store.len(),
                    next_id = self.store.next_id(),
                    "Drawing imported"
                );
            }
            Err(e) => warn!(error = %e, "Import rejected, drawing unchanged"),
        }
        result
    }

    /// Parse and import a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the parse or validation error; the drawing is unchanged.
    pub fn import_from_str(&mut self, json: &str) -> CanvasResult<()> {
        let document = DrawingDocument::from_json_str(json).inspect_err(|e| {
            warn!(error = %e, "Import rejected, drawing unchanged");
        })?;
        self.import_from_json(&document)
    }
}

impl DrawingEngine<ManualScheduler> {
    /// Engine driven by a virtual clock.
    #[must_use]
    pub fn manual(config: EngineConfig) -> Self {
        Self::new(config, ManualScheduler::new())
    }

    /// Advance the virtual clock, delivering every timer that falls due.
    pub fn advance_to(&mut self, now_ms: u64) {
        loop {
            let fired = self.scheduler.advance_to(now_ms);
            if fired.is_empty() {
                break;
            }
            for timer in fired {
                self.handle_timer(timer.handle, timer.due_ms);
            }
        }
    }

    /// Advance to the event's timestamp, then handle the event.
    pub fn dispatch(&mut self, event: &PointerEvent) {
        self.advance_to(event.timestamp_ms);
        self.handle_pointer(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ev(kind: PointerEventKind, x: f32, y: f32, t: u64) -> PointerEvent {
        PointerEvent::new(kind, x, y, t)
    }

    fn recording(engine: &mut DrawingEngine<ManualScheduler>) -> Rc<RefCell<Vec<EngineEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        engine.set_on_event(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn test_press_moves_below_threshold_stay_pressed() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.dispatch(&ev(PointerEventKind::Down, 50.0, 50.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 51.5, 51.0, 10));
        assert_eq!(engine.state(), InteractionState::Pressed);
        engine.dispatch(&ev(PointerEventKind::Move, 56.0, 50.0, 20));
        assert_eq!(engine.state(), InteractionState::Dragging);
    }

    #[test]
    fn test_tap_timeout_commits_dot_once() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        let events = recording(&mut engine);
        engine.dispatch(&ev(PointerEventKind::Down, 50.0, 50.0, 0));
        engine.advance_to(TAP_DELAY_MS);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.state(), InteractionState::Pressed);
        engine.dispatch(&ev(PointerEventKind::Up, 50.0, 50.0, 400));
        assert_eq!(engine.state(), InteractionState::Idle);

        assert_eq!(engine.store().len(), 1);
        assert_eq!(*events.borrow(), vec![EngineEvent::StrokeComplete(ElementId(0))]);
    }

    #[test]
    fn test_preview_is_throttled() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        let events = recording(&mut engine);
        engine.dispatch(&ev(PointerEventKind::Down, 10.0, 10.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 20.0, 10.0, 1));
        // First frame is due immediately.
        engine.advance_to(1);
        assert!(engine.preview().is_some());

        for (t, x) in (2..10_u64).zip(22..30_u16) {
            engine.dispatch(&ev(PointerEventKind::Move, f32::from(x), 10.0, t));
        }
        // Only the first frame so far; the next is held to the frame budget.
        let frames = |events: &Rc<RefCell<Vec<EngineEvent>>>| {
            events
                .borrow()
                .iter()
                .filter(|e| **e == EngineEvent::PreviewUpdated)
                .count()
        };
        assert_eq!(frames(&events), 1);
        assert_eq!(engine.scheduler().pending(), 1);
        engine.advance_to(1 + FRAME_BUDGET_MS);
        assert_eq!(frames(&events), 2);
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        assert!(!engine.handle_timer(TimerHandle(99), 0));
    }

    #[test]
    fn test_shape_drag_commits_on_release() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.update_config(ConfigUpdate::tool(ToolMode::Shape(ShapeKind::Ellipse)));
        engine.dispatch(&ev(PointerEventKind::Down, 100.0, 100.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 140.0, 160.0, 20));
        engine.advance_to(40);
        assert!(matches!(engine.preview(), Some(Preview::Shape(_))));
        engine.dispatch(&ev(PointerEventKind::Up, 150.0, 170.0, 60));

        assert!(engine.preview().is_none());
        let element = &engine.elements()[0];
        assert_eq!(element.kind().shape_kind(), Some(ShapeKind::Ellipse));
        let bounds = element.bounds().expect("bounds");
        assert!((bounds.width - 50.0).abs() < 1e-3);
        assert!((bounds.height - 70.0).abs() < 1e-3);
    }

    #[test]
    fn test_shape_cancel_discards() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.update_config(ConfigUpdate::tool(ToolMode::Shape(ShapeKind::Rectangle)));
        engine.dispatch(&ev(PointerEventKind::Down, 0.0, 0.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 40.0, 40.0, 20));
        assert!(engine.cancel());
        engine.dispatch(&ev(PointerEventKind::Up, 40.0, 40.0, 30));
        assert!(engine.store().is_empty());
        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn test_freehand_cannot_be_cancelled() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.dispatch(&ev(PointerEventKind::Down, 0.0, 0.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 40.0, 40.0, 20));
        assert!(!engine.cancel());
        engine.dispatch(&ev(PointerEventKind::Up, 41.0, 41.0, 30));
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_shape_tap_commits_nothing() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.update_config(ConfigUpdate::tool(ToolMode::Shape(ShapeKind::Circle)));
        engine.dispatch(&ev(PointerEventKind::Down, 5.0, 5.0, 0));
        engine.dispatch(&ev(PointerEventKind::Up, 5.0, 5.0, 300));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_eraser_hover_and_visibility() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.update_config(ConfigUpdate::tool(ToolMode::Erase));
        let events = recording(&mut engine);
        engine.dispatch(&ev(PointerEventKind::Enter, 0.0, 0.0, 0));
        engine.dispatch(&ev(PointerEventKind::Move, 12.0, 34.0, 5));
        engine.dispatch(&ev(PointerEventKind::Leave, 0.0, 0.0, 10));
        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], EngineEvent::EraserVisibilityChanged(true));
        match events[1] {
            EngineEvent::EraserMoved(p) => {
                assert!((p.x - 12.0).abs() < 1e-3 && (p.y - 34.0).abs() < 1e-3);
            }
            ref other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[2], EngineEvent::EraserVisibilityChanged(false));
    }

    #[test]
    fn test_clear_during_long_press_keeps_new_elements() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.dispatch(&ev(PointerEventKind::Down, 50.0, 50.0, 0));
        engine.advance_to(TAP_DELAY_MS);
        engine.clear();
        let shape = ShapeDescriptor::boxed(
            ShapeKind::Rectangle,
            0.0,
            0.0,
            10.0,
            10.0,
            ShapeStyle::new("#000", 1.0),
        );
        assert_eq!(engine.add_shape(shape).map(|e| e.id), Some(ElementId(0)));

        engine.dispatch(&ev(PointerEventKind::Move, 150.0, 50.0, 200));
        engine.dispatch(&ev(PointerEventKind::Up, 150.0, 50.0, 220));
        assert_eq!(engine.store().len(), 2);
        assert!(engine.store().get(ElementId(0)).is_some());
    }

    #[test]
    fn test_destroy_cancels_pending_tap() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        engine.dispatch(&ev(PointerEventKind::Down, 5.0, 5.0, 0));
        engine.destroy();
        engine.advance_to(1_000);
        assert!(engine.store().is_empty());
        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn test_add_shape_rejects_degenerate() {
        let mut engine = DrawingEngine::manual(EngineConfig::default());
        let flat = ShapeDescriptor::boxed(
            ShapeKind::Rectangle,
            0.0,
            0.0,
            0.0,
            5.0,
            ShapeStyle::new("#000", 1.0),
        );
        assert!(engine.add_shape(flat).is_none());
        assert!(engine.store().is_empty());
    }
}
