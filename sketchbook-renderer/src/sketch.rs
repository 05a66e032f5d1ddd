//! Hand-drawn rendering for sketchy shapes.
//!
//! Each edge is drawn as a slightly bowed quadratic whose end point is nudged
//! at random, so corners overshoot the way a quick pen sketch does. Shapes are
//! drawn twice with different randomness to get the doubled line.

use std::f32::consts::TAU;
use std::fmt::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sketchbook_core::Vec2;

/// Segments used to approximate circles and ellipses.
const ELLIPSE_SEGMENTS: u16 = 24;

/// Maximum random offset of a vertex, in canvas units.
const MAX_OFFSET: f32 = 2.0;

/// Bow applied per 200 units of edge length.
const BOWING: f32 = 1.0;

/// Points around an ellipse, in drawing order.
#[must_use]
pub fn ellipse_vertices(cx: f32, cy: f32, rx: f32, ry: f32) -> Vec<Vec2> {
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let angle = f32::from(i) / f32::from(ELLIPSE_SEGMENTS) * TAU;
            Vec2::new(cx + rx * angle.cos(), cy + ry * angle.sin())
        })
        .collect()
}

fn offset(rng: &mut StdRng, max: f32) -> f32 {
    if max <= 0.0 {
        0.0
    } else {
        rng.random_range(-max..=max)
    }
}

/// SVG path data for one hand-drawn pass over a polyline.
///
/// The same `seed` and `pass` always produce the same path.
#[must_use]
pub fn sketch_path(vertices: &[Vec2], closed: bool, seed: u64, pass: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pass.wrapping_mul(99_991)));
    let Some(first) = vertices.first() else {
        return String::new();
    };

    let mut d = String::with_capacity(vertices.len() * 32);
    let _ = write!(
        d,
        "M{:.2} {:.2}",
        first.x + offset(&mut rng, MAX_OFFSET),
        first.y + offset(&mut rng, MAX_OFFSET)
    );

    let targets = vertices
        .iter()
        .skip(1)
        .chain(closed.then_some(first).into_iter());

    let mut last = *first;
    for p in targets {
        let delta = p.sub(&last);
        let len = delta.length();
        let bow = offset(&mut rng, BOWING * len / 200.0);
        let normal = if len > 0.001 {
            Vec2::new(-delta.y / len, delta.x / len)
        } else {
            Vec2::default()
        };
        let ctrl = last.midpoint(p).add(&normal.scale(bow));
        let end = Vec2::new(
            p.x + offset(&mut rng, MAX_OFFSET),
            p.y + offset(&mut rng, MAX_OFFSET),
        );
        let _ = write!(d, " Q{:.2} {:.2} {:.2} {:.2}", ctrl.x, ctrl.y, end.x, end.y);
        last = *p;
    }
    d
}
