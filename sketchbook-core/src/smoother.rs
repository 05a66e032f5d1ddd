//! # Stroke Smoother
//!
//! Turns a sequence of pressure-weighted points into the closed outline of a
//! variable-width ink stroke.
//!
//! ```text
//!  input points ──► stroke points ──► left/right edges ──► outline path
//!                   (streamline,      (pressure → radius,   (M, Q…, L, Z)
//!                    min length)       tapers, caps)
//! ```
//!
//! The silhouette is filled, not stroked, so width can vary along the path
//! without relying on native line-width rendering.

use std::f32::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{Point, Vec2};
use crate::input::DeviceType;
use crate::outline::Outline;

/// How quickly simulated pressure follows the stroke speed.
const RATE_OF_PRESSURE_CHANGE: f32 = 0.275;

/// Slightly more than half a turn, so rotated cap points never coincide.
const FIXED_PI: f32 = PI + 0.0001;

/// Segments in a rounded corner or start cap.
const CAP_STEPS: u16 = 13;

/// Segments in the rounded end cap.
const END_CAP_STEPS: u16 = 29;

/// Segments in a tap dot.
const DOT_SEGMENTS: u16 = 16;

/// Maximum radial jitter of a tap dot, as a fraction of its radius.
const DOT_JITTER: f32 = 0.05;

/// Points closer than this to the end of the stroke are skipped.
const END_SKIP_LENGTH: f32 = 3.0;

/// Pressure-to-width easing shared by all presets: `1 - (1 - t)^2.5`.
#[must_use]
pub fn ink_easing(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powf(2.5)
}

fn ease_taper_start(t: f32) -> f32 {
    t * (2.0 - t)
}

fn ease_taper_end(t: f32) -> f32 {
    let t = t - 1.0;
    t * t * t + 1.0
}

/// Parameters for the variable-width outline.
#[derive(Debug, Clone, Copy)]
pub struct StrokeOptions {
    /// Base diameter of the stroke.
    pub size: f32,
    /// How strongly pressure changes the width (0 = constant width).
    pub thinning: f32,
    /// How aggressively edge points are merged, rounding corners.
    pub smoothing: f32,
    /// How much input lag is traded for a steadier line.
    pub streamline: f32,
    /// Derive pressure from point spacing instead of the recorded value.
    pub simulate_pressure: bool,
    /// Length over which the start narrows to a point (0 = no taper).
    pub taper_start: f32,
    /// Length over which the end narrows to a point (0 = no taper).
    pub taper_end: f32,
    /// Round the start when it is not tapered.
    pub cap_start: bool,
    /// Round the end when it is not tapered.
    pub cap_end: bool,
    /// Pressure-to-width easing.
    pub easing: fn(f32) -> f32,
    /// Whether the input is complete (the final point is used verbatim).
    pub last: bool,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
            simulate_pressure: true,
            taper_start: 0.0,
            taper_end: 0.0,
            cap_start: true,
            cap_end: true,
            easing: ink_easing,
            last: false,
        }
    }
}

impl StrokeOptions {
    /// Preset for a device at the given stroke width.
    #[must_use]
    pub fn for_device(device: DeviceType, width: f32) -> Self {
        match device {
            DeviceType::Pen => Self {
                size: width,
                thinning: 0.7,
                smoothing: 0.85,
                streamline: 0.75,
                simulate_pressure: false,
                taper_start: 0.0,
                taper_end: width * 2.5,
                ..Self::default()
            },
            DeviceType::Mouse | DeviceType::Touch => Self {
                size: width,
                thinning: 0.5,
                smoothing: 0.75,
                streamline: 0.65,
                simulate_pressure: true,
                taper_start: width * 0.3,
                taper_end: width * 1.5,
                ..Self::default()
            },
        }
    }

    /// Options used to stroke the ring of a tap dot.
    #[must_use]
    pub fn dot(size: f32) -> Self {
        Self {
            size,
            thinning: 0.0,
            smoothing: 0.9,
            simulate_pressure: false,
            last: true,
            ..Self::default()
        }
    }

    /// Mark the input as complete or in progress.
    #[must_use]
    pub fn with_last(mut self, last: bool) -> Self {
        self.last = last;
        self
    }
}

/// A streamlined point annotated with its direction and travelled length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    /// Streamlined position.
    pub point: Vec2,
    /// Recorded pressure.
    pub pressure: f32,
    /// Unit vector pointing back towards the previous point.
    pub vector: Vec2,
    /// Distance from the previous point.
    pub distance: f32,
    /// Length of the stroke up to this point.
    pub running_length: f32,
}

fn lerp_point(a: &Point, b: &Point, t: f32) -> Point {
    Point::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.pressure + (b.pressure - a.pressure) * t,
    )
}

fn stroke_radius(size: f32, thinning: f32, pressure: f32, easing: fn(f32) -> f32) -> f32 {
    size * easing(0.5 - thinning * (0.5 - pressure))
}

/// Streamline raw input into stroke points.
///
/// Very short inputs are padded so a stroke always has a direction. Until the
/// stroke has covered `size` units, intermediate points are dropped to keep
/// the start from wobbling.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stroke_points(input: &[Point], options: &StrokeOptions) -> Vec<StrokePoint> {
    let Some(&first) = input.first() else {
        return Vec::new();
    };

    let t = 0.15 + (1.0 - options.streamline) * 0.85;
    let mut pts: Vec<Point> = input.to_vec();

    if pts.len() == 2 {
        let last = pts[1];
        pts.truncate(1);
        for i in 1..5 {
            pts.push(lerp_point(&first, &last, i as f32 / 4.0));
        }
    }
    if pts.len() == 1 {
        pts.push(Point::new(first.x + 1.0, first.y + 1.0, first.pressure));
    }

    let mut out = vec![StrokePoint {
        point: first.position(),
        pressure: first.pressure,
        vector: Vec2::new(1.0, 1.0),
        distance: 0.0,
        running_length: 0.0,
    }];

    let max = pts.len() - 1;
    let mut prev = first.position();
    let mut running_length = 0.0;
    let mut reached_min_length = false;

    for (i, p) in pts.iter().enumerate().skip(1) {
        let point = if options.last && i == max {
            p.position()
        } else {
            prev.lerp(&p.position(), t)
        };
        if point == prev {
            continue;
        }

        let distance = point.sub(&prev).length();
        running_length += distance;

        if i < max && !reached_min_length {
            if running_length < options.size {
                continue;
            }
            reached_min_length = true;
        }

        out.push(StrokePoint {
            point,
            pressure: p.pressure,
            vector: prev.sub(&point).normalize(),
            distance,
            running_length,
        });
        prev = point;
    }

    out[0].vector = out.get(1).map_or(Vec2::default(), |p| p.vector);
    out
}

/// Compute the boundary polygon around a set of stroke points.
///
/// The polygon runs along the left edge, around the end cap, back along the
/// right edge and around the start cap.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn outline_points(points: &[StrokePoint], options: &StrokeOptions) -> Vec<Vec2> {
    let size = options.size;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if size <= 0.0 {
        return Vec::new();
    }

    let n = points.len();
    let total_length = last.running_length;
    let taper_start = options.taper_start;
    let taper_end = options.taper_end;
    let min_distance = (size * options.smoothing).powi(2);

    let simulated = |prev: f32, distance: f32| {
        let speed = (distance / size).min(1.0);
        let rest = (1.0 - speed).min(1.0);
        (prev + (rest - prev) * (speed * RATE_OF_PRESSURE_CHANGE)).min(1.0)
    };

    // Seed the simulated pressure from the first few points so the start does
    // not flare.
    let mut prev_pressure = points.iter().take(10).fold(first.pressure, |acc, curr| {
        let pressure = if options.simulate_pressure {
            simulated(acc, curr.distance)
        } else {
            curr.pressure
        };
        (acc + pressure) / 2.0
    });

    let mut radius = stroke_radius(size, options.thinning, last.pressure, options.easing);
    let mut first_radius: Option<f32> = None;
    let mut prev_vector = first.vector;
    let mut pl = first.point;
    let mut pr = first.point;
    let mut tl;
    let mut tr;
    let mut prev_was_sharp = false;

    let mut left: Vec<Vec2> = Vec::with_capacity(n);
    let mut right: Vec<Vec2> = Vec::with_capacity(n);

    for (i, sp) in points.iter().enumerate() {
        let is_last = i == n - 1;
        if !is_last && total_length - sp.running_length < END_SKIP_LENGTH {
            continue;
        }

        let mut pressure = sp.pressure;
        if options.thinning == 0.0 {
            radius = size / 2.0;
        } else {
            if options.simulate_pressure {
                pressure = simulated(prev_pressure, sp.distance);
            }
            radius = stroke_radius(size, options.thinning, pressure, options.easing);
        }
        if first_radius.is_none() {
            first_radius = Some(radius);
        }

        let ts = if sp.running_length < taper_start {
            ease_taper_start(sp.running_length / taper_start)
        } else {
            1.0
        };
        let remaining = total_length - sp.running_length;
        let te = if remaining < taper_end {
            ease_taper_end(remaining / taper_end)
        } else {
            1.0
        };
        radius = (radius * ts.min(te)).max(0.01);

        let next_vector = if is_last { sp.vector } else { points[i + 1].vector };
        let next_dpr = if is_last { 1.0 } else { sp.vector.dot(&next_vector) };
        let prev_dpr = sp.vector.dot(&prev_vector);

        let is_sharp = prev_dpr < 0.0 && !prev_was_sharp;
        let next_is_sharp = next_dpr < 0.0;

        // Sharp turns get a half-circle instead of mitered edges.
        if is_sharp || next_is_sharp {
            let offset = prev_vector.perpendicular().scale(radius);
            let mut corner_left = pl;
            let mut corner_right = pr;
            for step in 0..=CAP_STEPS {
                let t = f32::from(step) / f32::from(CAP_STEPS);
                corner_left = sp.point.sub(&offset).rotate_around(&sp.point, FIXED_PI * t);
                left.push(corner_left);
                corner_right = sp.point.add(&offset).rotate_around(&sp.point, -FIXED_PI * t);
                right.push(corner_right);
            }
            pl = corner_left;
            pr = corner_right;
            if next_is_sharp {
                prev_was_sharp = true;
            }
            continue;
        }
        prev_was_sharp = false;

        if is_last {
            let offset = sp.vector.perpendicular().scale(radius);
            left.push(sp.point.sub(&offset));
            right.push(sp.point.add(&offset));
            continue;
        }

        let offset = next_vector
            .lerp(&sp.vector, next_dpr)
            .perpendicular()
            .scale(radius);

        tl = sp.point.sub(&offset);
        if i <= 1 || pl.distance_squared(&tl) > min_distance {
            left.push(tl);
            pl = tl;
        }

        tr = sp.point.add(&offset);
        if i <= 1 || pr.distance_squared(&tr) > min_distance {
            right.push(tr);
            pr = tr;
        }

        prev_pressure = pressure;
        prev_vector = sp.vector;
    }

    let first_point = first.point;
    let last_point = if n > 1 {
        last.point
    } else {
        first.point.add(&Vec2::new(1.0, 1.0))
    };

    let mut start_cap = Vec::new();
    let mut end_cap = Vec::new();

    if n == 1 {
        if (taper_start == 0.0 && taper_end == 0.0) || options.last {
            let r = first_radius.filter(|r| *r != 0.0).unwrap_or(radius);
            let start = first_point.add(
                &first_point
                    .sub(&last_point)
                    .perpendicular()
                    .normalize()
                    .scale(-r),
            );
            return (1..=CAP_STEPS)
                .map(|step| {
                    let t = f32::from(step) / f32::from(CAP_STEPS);
                    start.rotate_around(&first_point, FIXED_PI * 2.0 * t)
                })
                .collect();
        }
    } else {
        if taper_start > 0.0 {
            // Tapered start needs no cap.
        } else if options.cap_start {
            if let Some(anchor) = right.first().copied() {
                for step in 1..=CAP_STEPS {
                    let t = f32::from(step) / f32::from(CAP_STEPS);
                    start_cap.push(anchor.rotate_around(&first_point, FIXED_PI * t));
                }
            }
        } else if let (Some(l), Some(r)) = (left.first(), right.first()) {
            let corners = l.sub(r);
            let offset_a = corners.scale(0.5);
            let offset_b = corners.scale(0.51);
            start_cap.extend([
                first_point.sub(&offset_a),
                first_point.sub(&offset_b),
                first_point.add(&offset_b),
                first_point.add(&offset_a),
            ]);
        }

        let direction = last.vector.scale(-1.0).perpendicular();
        if taper_end > 0.0 {
            end_cap.push(last_point);
        } else if options.cap_end {
            let start = last_point.add(&direction.scale(radius));
            for step in 1..END_CAP_STEPS {
                let t = f32::from(step) / f32::from(END_CAP_STEPS);
                end_cap.push(start.rotate_around(&last_point, FIXED_PI * 3.0 * t));
            }
        } else {
            end_cap.extend([
                last_point.add(&direction.scale(radius)),
                last_point.add(&direction.scale(radius * 0.99)),
                last_point.sub(&direction.scale(radius * 0.99)),
                last_point.sub(&direction.scale(radius)),
            ]);
        }
    }

    let mut polygon = left;
    polygon.extend(end_cap);
    polygon.extend(right.into_iter().rev());
    polygon.extend(start_cap);
    polygon
}

/// Smooth raw points into the closed outline of a stroke.
#[must_use]
pub fn smooth_to_outline(points: &[Point], options: &StrokeOptions) -> Outline {
    let stroke = stroke_points(points, options);
    Outline::from_polygon(&outline_points(&stroke, options))
}

/// Outline of a tap: a slightly irregular filled dot.
///
/// The dot radius is `max(0.3, pressure) * width / 2`. A 16-segment ring at
/// half that radius, with up to 5% radial jitter per vertex, is stroked with
/// a constant width equal to the radius so the silhouette fills the disc.
/// The jitter is seeded by the tap position, so a tap is reproducible.
#[must_use]
pub fn single_point_outline(center: Point, width: f32) -> Outline {
    let radius = center.pressure.max(0.3) * width / 2.0;
    let seed = (u64::from(center.x.to_bits()) << 32) | u64::from(center.y.to_bits());
    let mut rng = StdRng::seed_from_u64(seed);

    let jitter: Vec<f32> = (0..DOT_SEGMENTS)
        .map(|_| 1.0 + rng.random_range(-DOT_JITTER..=DOT_JITTER))
        .collect();

    let ring: Vec<Point> = (0..=DOT_SEGMENTS)
        .map(|k| {
            let angle = f32::from(k) / f32::from(DOT_SEGMENTS) * TAU;
            let r = radius / 2.0 * jitter[usize::from(k % DOT_SEGMENTS)];
            Point::new(
                center.x + angle.cos() * r,
                center.y + angle.sin() * r,
                center.pressure,
            )
        })
        .collect();

    smooth_to_outline(&ring, &StrokeOptions::dot(radius))
}
