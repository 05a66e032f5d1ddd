//! Pointer input and its normalization into pressure-weighted samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Vec2};

/// Smoothing factor for the exponential velocity filter.
pub const VELOCITY_ALPHA: f32 = 0.2;

/// Number of recent points kept for jitter smoothing.
pub const JITTER_BUFFER_LEN: usize = 4;

/// Pressure assumed for pens that report none.
const DEFAULT_PEN_PRESSURE: f32 = 0.5;

/// Kind of device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Mouse or trackpad.
    #[default]
    Mouse,
    /// Finger on a touch screen.
    Touch,
    /// Stylus with hardware pressure.
    Pen,
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventKind {
    /// Button/finger/pen pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button/finger/pen released.
    Up,
    /// The platform cancelled the pointer (e.g. palm rejection).
    Cancel,
    /// Pointer entered the surface.
    Enter,
    /// Pointer left the surface.
    Leave,
}

impl PointerEventKind {
    /// All event kinds the engine listens for.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Move,
        Self::Up,
        Self::Cancel,
        Self::Enter,
        Self::Leave,
    ];

    /// The DOM event name this kind corresponds to.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Down => "pointerdown",
            Self::Move => "pointermove",
            Self::Up => "pointerup",
            Self::Cancel => "pointercancel",
            Self::Enter => "mouseenter",
            Self::Leave => "mouseleave",
        }
    }
}

/// A raw pointer event in device (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    /// Phase of this event.
    pub kind: PointerEventKind,
    /// X position in client pixels.
    pub client_x: f32,
    /// Y position in client pixels.
    pub client_y: f32,
    /// Declared pointer type, if the platform reports one.
    #[serde(default)]
    pub pointer_type: Option<DeviceType>,
    /// Hardware pressure (0.0 to 1.0, if available).
    #[serde(default)]
    pub pressure: Option<f32>,
    /// Number of active touch points, used to infer touch input.
    #[serde(default)]
    pub touch_points: u32,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a new pointer event without a declared pointer type.
    #[must_use]
    pub const fn new(kind: PointerEventKind, client_x: f32, client_y: f32, timestamp_ms: u64) -> Self {
        Self {
            kind,
            client_x,
            client_y,
            pointer_type: None,
            pressure: None,
            touch_points: 0,
            timestamp_ms,
        }
    }

    /// Set the declared pointer type.
    #[must_use]
    pub fn with_pointer_type(mut self, pointer_type: DeviceType) -> Self {
        self.pointer_type = Some(pointer_type);
        self
    }

    /// Set the hardware pressure.
    #[must_use]
    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Set the number of active touch points.
    #[must_use]
    pub fn with_touch_points(mut self, touch_points: u32) -> Self {
        self.touch_points = touch_points;
        self
    }

    /// Determine the input device for this event.
    ///
    /// A declared pointer type wins; otherwise events carrying touch points
    /// are touch and everything else is a mouse.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        match self.pointer_type {
            Some(device) => device,
            None if self.touch_points > 0 => DeviceType::Touch,
            None => DeviceType::Mouse,
        }
    }
}

/// On-screen placement of the drawing surface, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBounds {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Displayed width.
    pub width: f32,
    /// Displayed height.
    pub height: f32,
}

impl SurfaceBounds {
    /// Create surface bounds.
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A normalized input sample in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Canvas-space position and effective pressure.
    pub point: Point,
    /// Device that produced the sample.
    pub device_type: DeviceType,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Compute the effective pressure for a sample.
///
/// Pens use hardware pressure, damped on fast strokes. Mouse and touch have
/// no usable pressure, so it is synthesized from the smoothed velocity
/// (pixels per millisecond): faster movement draws thinner.
#[must_use]
pub fn synthesize_pressure(device: DeviceType, hardware: Option<f32>, velocity: f32) -> f32 {
    match device {
        DeviceType::Pen => {
            let mut pressure = hardware.unwrap_or(DEFAULT_PEN_PRESSURE).clamp(0.1, 1.0);
            if velocity > 0.8 {
                pressure *= (1.0 - (velocity - 0.8) / 2.0).max(0.3);
            }
            pressure.clamp(0.1, 1.0)
        }
        DeviceType::Touch => (0.6 * (1.0 - velocity / 2.0).max(0.2)).clamp(0.2, 0.9),
        DeviceType::Mouse => (0.7 * (1.0 - velocity / 1.5).max(0.4)).clamp(0.3, 1.0),
    }
}

/// Maps pointer events to canvas-space samples with velocity-aware pressure.
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    logical_width: f32,
    logical_height: f32,
    device: Option<DeviceType>,
    last: Option<(Vec2, u64)>,
    velocity: f32,
    jitter: VecDeque<Point>,
}

impl InputNormalizer {
    /// Create a normalizer for a canvas of the given logical size.
    #[must_use]
    pub fn new(logical_width: f32, logical_height: f32) -> Self {
        Self {
            logical_width,
            logical_height,
            device: None,
            last: None,
            velocity: 0.0,
            jitter: VecDeque::with_capacity(JITTER_BUFFER_LEN),
        }
    }

    /// Update the logical canvas size.
    pub fn set_logical_size(&mut self, width: f32, height: f32) {
        self.logical_width = width;
        self.logical_height = height;
    }

    /// Map client coordinates into canvas logical space.
    #[must_use]
    pub fn map_to_canvas(&self, client_x: f32, client_y: f32, bounds: &SurfaceBounds) -> Vec2 {
        let x = if bounds.width > 0.0 {
            (client_x - bounds.left) / bounds.width * self.logical_width
        } else {
            client_x - bounds.left
        };
        let y = if bounds.height > 0.0 {
            (client_y - bounds.top) / bounds.height * self.logical_height
        } else {
            client_y - bounds.top
        };
        Vec2::new(x, y)
    }

    /// Normalize one pointer event into a sample.
    ///
    /// A change of device type drops all velocity and smoothing state first.
    pub fn sample(&mut self, event: &PointerEvent, bounds: &SurfaceBounds) -> InputSample {
        let device = event.device_type();
        if self.device.is_some_and(|d| d != device) {
            tracing::debug!("Input device changed to {:?}, resetting buffers", device);
            self.reset();
        }
        self.device = Some(device);

        let position = self.map_to_canvas(event.client_x, event.client_y, bounds);

        #[allow(clippy::cast_precision_loss)]
        let raw_velocity = match self.last {
            Some((last_pos, last_ts)) => {
                let dt = event.timestamp_ms.saturating_sub(last_ts).max(1) as f32;
                position.sub(&last_pos).length() / dt
            }
            None => 0.0,
        };
        self.velocity += VELOCITY_ALPHA * (raw_velocity - self.velocity);
        self.last = Some((position, event.timestamp_ms));

        let pressure = synthesize_pressure(device, event.pressure, self.velocity);
        let point = Point::new(position.x, position.y, pressure);

        self.jitter.push_back(point);
        while self.jitter.len() > JITTER_BUFFER_LEN {
            self.jitter.pop_front();
        }

        InputSample {
            point,
            device_type: device,
            timestamp_ms: event.timestamp_ms,
        }
    }

    /// Weighted average of the recent points, favoring the newest.
    ///
    /// Point `i` (oldest first) has weight `(i + 1) / len`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn smoothed(&self) -> Option<Point> {
        if self.jitter.is_empty() {
            return None;
        }
        let len = self.jitter.len() as f32;
        let (mut x, mut y, mut pressure, mut total) = (0.0, 0.0, 0.0, 0.0);
        for (i, p) in self.jitter.iter().enumerate() {
            let weight = (i as f32 + 1.0) / len;
            x += p.x * weight;
            y += p.y * weight;
            pressure += p.pressure * weight;
            total += weight;
        }
        Some(Point::new(x / total, y / total, pressure / total))
    }

    /// Current smoothed velocity in canvas units per millisecond.
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Device of the most recent sample.
    #[must_use]
    pub fn device(&self) -> Option<DeviceType> {
        self.device
    }

    /// Forget velocity and smoothing history, e.g. at the start of a stroke.
    pub fn reset(&mut self) {
        self.last = None;
        self.velocity = 0.0;
        self.jitter.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SurfaceBounds {
        SurfaceBounds::new(100.0, 50.0, 435.0, 435.0)
    }

    #[test]
    fn test_coordinate_mapping_is_resolution_independent() {
        let normalizer = InputNormalizer::new(870.0, 870.0);
        let p = normalizer.map_to_canvas(100.0 + 217.5, 50.0 + 435.0, &bounds());
        assert!((p.x - 435.0).abs() < 1e-3);
        assert!((p.y - 870.0).abs() < 1e-3);
    }

    #[test]
    fn test_device_classification() {
        let base = PointerEvent::new(PointerEventKind::Down, 0.0, 0.0, 0);
        assert_eq!(base.device_type(), DeviceType::Mouse);
        assert_eq!(base.with_touch_points(1).device_type(), DeviceType::Touch);
        assert_eq!(
            base.with_touch_points(1).with_pointer_type(DeviceType::Pen).device_type(),
            DeviceType::Pen
        );
    }

    #[test]
    fn test_velocity_is_exponentially_smoothed() {
        let mut normalizer = InputNormalizer::new(100.0, 100.0);
        let b = SurfaceBounds::new(0.0, 0.0, 100.0, 100.0);
        normalizer.sample(&PointerEvent::new(PointerEventKind::Down, 0.0, 0.0, 0), &b);
        assert!(normalizer.velocity().abs() < f32::EPSILON);
        // 10 units in 10 ms is a raw velocity of 1.0; one filter step gives 0.2.
        normalizer.sample(&PointerEvent::new(PointerEventKind::Move, 10.0, 0.0, 10), &b);
        assert!((normalizer.velocity() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_dt_does_not_divide_by_zero() {
        let mut normalizer = InputNormalizer::new(100.0, 100.0);
        let b = SurfaceBounds::new(0.0, 0.0, 100.0, 100.0);
        normalizer.sample(&PointerEvent::new(PointerEventKind::Down, 0.0, 0.0, 5), &b);
        normalizer.sample(&PointerEvent::new(PointerEventKind::Move, 3.0, 4.0, 5), &b);
        assert!((normalizer.velocity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_device_switch_resets_velocity() {
        let mut normalizer = InputNormalizer::new(100.0, 100.0);
        let b = SurfaceBounds::new(0.0, 0.0, 100.0, 100.0);
        normalizer.sample(&PointerEvent::new(PointerEventKind::Down, 0.0, 0.0, 0), &b);
        normalizer.sample(&PointerEvent::new(PointerEventKind::Move, 50.0, 0.0, 1), &b);
        assert!(normalizer.velocity() > 0.0);

        let pen = PointerEvent::new(PointerEventKind::Move, 90.0, 0.0, 2)
            .with_pointer_type(DeviceType::Pen)
            .with_pressure(0.8);
        let sample = normalizer.sample(&pen, &b);
        assert!(normalizer.velocity().abs() < f32::EPSILON);
        assert!((sample.point.pressure - 0.8).abs() < 1e-6);
        assert!(normalizer.smoothed().is_some_and(|p| (p.x - 90.0).abs() < 1e-4));
    }

    #[test]
    fn test_pressure_policies() {
        // Slow mouse: 0.7 * 1.0
        assert!((synthesize_pressure(DeviceType::Mouse, None, 0.0) - 0.7).abs() < 1e-6);
        // Fast mouse bottoms out at 0.7 * 0.4 = 0.28, clamped to 0.3
        assert!((synthesize_pressure(DeviceType::Mouse, None, 10.0) - 0.3).abs() < 1e-6);
        // Slow touch: 0.6
        assert!((synthesize_pressure(DeviceType::Touch, None, 0.0) - 0.6).abs() < 1e-6);
        // Fast touch: 0.6 * 0.2 = 0.12, clamped to 0.2
        assert!((synthesize_pressure(DeviceType::Touch, None, 10.0) - 0.2).abs() < 1e-6);
        // Pen: hardware pressure clamped from below
        assert!((synthesize_pressure(DeviceType::Pen, Some(0.01), 0.0) - 0.1).abs() < 1e-6);
        // Pen at velocity 1.2 scales by 0.8
        assert!((synthesize_pressure(DeviceType::Pen, Some(1.0), 1.2) - 0.8).abs() < 1e-6);
        // Very fast pen still stays in range
        assert!((synthesize_pressure(DeviceType::Pen, Some(0.2), 50.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_jitter_buffer_weighting() {
        let mut normalizer = InputNormalizer::new(100.0, 100.0);
        let b = SurfaceBounds::new(0.0, 0.0, 100.0, 100.0);
        for (i, x) in [0.0_f32, 10.0, 20.0, 30.0, 40.0].iter().enumerate() {
            normalizer.sample(
                &PointerEvent::new(PointerEventKind::Move, *x, 0.0, i as u64 * 1000),
                &b,
            );
        }
        // Buffer holds 10, 20, 30, 40 with weights 1, 2, 3, 4 (over 4).
        let smoothed = normalizer.smoothed().expect("non-empty");
        assert!((smoothed.x - 30.0).abs() < 1e-4);
    }
}
