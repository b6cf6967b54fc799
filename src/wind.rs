//! Wind sway animation.
//!
//! Displacement is a pure function of `(rest position, sway weight, phase,
//! time)` — there is no mutable state carried between frames, so calling
//! [`apply`] twice with the same time yields identical geometry and the
//! animation can be scrubbed to any time in any order.
//!
//! The sway signal is a sinusoid modulated by a Perlin gust field (smooth in
//! time, decorrelated across phases).  Amplitude scales with
//! [`sway_weight`], which grows with branch depth and with distance from the
//! branch base — tips sway, trunks barely move, and the trunk base is pinned
//! at zero.  Leaf buffers get an extra high-frequency flutter on top of the
//! sway they inherit from their branch.

use std::f32::consts::TAU;
use std::sync::OnceLock;

use bevy::math::Vec3;
use noise::{NoiseFn, Perlin};

use crate::{
    mesh::{MeshBuffers, TreeGeometry},
    options::WindOptions,
};

/// Time scale of the gust field relative to wall-clock seconds.
const GUST_FREQ: f64 = 0.35;

/// Flutter frequency as a multiple of the base sway speed.
const FLUTTER_FREQ: f32 = 3.3;

/// Flutter amplitude as a fraction of the sway strength.
const FLUTTER_AMP: f32 = 0.35;

/// Shared gust field.  Seeded with a fixed value: gusts are scenery, not
/// part of the per-tree deterministic contract, and sharing one instance
/// keeps `apply` allocation-free.
fn gust_field() -> &'static Perlin {
    static PERLIN: OnceLock<Perlin> = OnceLock::new();
    PERLIN.get_or_init(|| Perlin::new(7))
}

/// Prevailing wind direction (unit vector, mostly horizontal).
fn wind_direction() -> Vec3 {
    Vec3::new(1.0, 0.0, 0.35).normalize()
}

/// Flutter direction for leaf cards — mostly vertical bobbing.
fn flutter_direction() -> Vec3 {
    Vec3::new(0.3, 1.0, 0.2).normalize()
}

/// Sway amplitude weight for a vertex at normalized depth `level_norm` and
/// normalized distance `arc_norm` from its branch base (both \[0, 1\]).
///
/// Monotone non-decreasing in both arguments; zero at the trunk base so the
/// tree stays planted.
#[inline]
pub fn sway_weight(level_norm: f32, arc_norm: f32) -> f32 {
    (level_norm + arc_norm * 0.5) / 1.5
}

/// Wind displacement for a single vertex at `time` seconds.
pub fn displacement(weight: f32, phase: f32, time: f32, wind: &WindOptions) -> Vec3 {
    let osc = (time * wind.speed + phase).sin();
    let gust = gust_field().get([time as f64 * GUST_FREQ, (phase / TAU) as f64]) as f32;
    // gust_scale is clamped to [0, 1] and |gust| <= 1, so amplitude never
    // flips sign.
    let amplitude = wind.strength * weight * (1.0 + wind.gust_scale * gust);
    wind_direction() * (amplitude * osc)
}

/// Extra flutter term layered onto leaf vertices.
pub fn flutter(phase: f32, time: f32, wind: &WindOptions) -> Vec3 {
    let osc = (time * wind.speed * FLUTTER_FREQ + phase * 1.7).sin();
    flutter_direction() * (wind.strength * wind.leaf_flutter * FLUTTER_AMP * osc)
}

/// Recompute the live positions of both buffer groups from their rest poses.
///
/// Operates strictly in place — no allocation, no dependence on the previous
/// frame's displaced positions.
pub fn apply(geometry: &mut TreeGeometry, time: f32, wind: &WindOptions) {
    sway_buffers(&mut geometry.branches, time, wind, false);
    sway_buffers(&mut geometry.leaves, time, wind, true);
}

fn sway_buffers(buffers: &mut MeshBuffers, time: f32, wind: &WindOptions, with_flutter: bool) {
    let MeshBuffers {
        positions,
        rest_positions,
        wind: attrs,
        ..
    } = buffers;
    for (i, rest) in rest_positions.iter().enumerate() {
        let [weight, phase] = attrs[i];
        let mut offset = displacement(weight, phase, time, wind);
        if with_flutter {
            offset += flutter(phase, time, wind);
        }
        positions[i] = (Vec3::from_array(*rest) + offset).to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TreeOptions;
    use crate::{mesh, skeleton};

    fn generated() -> (TreeGeometry, WindOptions) {
        let opts = TreeOptions::default();
        let sk = skeleton::build(&opts).unwrap();
        (mesh::emit(&sk, &opts).unwrap(), opts.wind)
    }

    #[test]
    fn weight_is_monotone_in_depth_and_arc() {
        let depths = [0.0, 0.25, 0.5, 0.75, 1.0];
        for window in depths.windows(2) {
            assert!(sway_weight(window[1], 0.5) >= sway_weight(window[0], 0.5));
            assert!(sway_weight(0.5, window[1]) >= sway_weight(0.5, window[0]));
        }
        assert_eq!(sway_weight(0.0, 0.0), 0.0);
        assert!(sway_weight(1.0, 1.0) <= 1.0);
    }

    #[test]
    fn apply_is_idempotent_per_time_value() {
        let (mut geometry, wind) = generated();
        apply(&mut geometry, 3.2, &wind);
        let first = geometry.branches.positions.clone();
        let first_leaves = geometry.leaves.positions.clone();
        apply(&mut geometry, 3.2, &wind);
        assert_eq!(geometry.branches.positions, first);
        assert_eq!(geometry.leaves.positions, first_leaves);
    }

    #[test]
    fn apply_supports_time_scrubbing() {
        let (mut a, wind) = generated();
        let (mut b, _) = generated();
        // a visits t=9 first, b goes straight to t=1.5 — same end state.
        apply(&mut a, 9.0, &wind);
        apply(&mut a, 1.5, &wind);
        apply(&mut b, 1.5, &wind);
        assert_eq!(a.branches.positions, b.branches.positions);
    }

    #[test]
    fn displacement_is_continuous_in_time() {
        let wind = WindOptions::default();
        let eps = 1e-3;
        for t in [0.0f32, 1.7, 42.0] {
            let d0 = displacement(1.0, 0.8, t, &wind);
            let d1 = displacement(1.0, 0.8, t + eps, &wind);
            assert!(
                d0.distance(d1) < 0.05,
                "discontinuity at t={t}: {}",
                d0.distance(d1)
            );
        }
    }

    #[test]
    fn rest_pose_never_mutates() {
        let (mut geometry, wind) = generated();
        let rest = geometry.branches.rest_positions.clone();
        for frame in 0..20 {
            apply(&mut geometry, frame as f32 * 0.016, &wind);
        }
        assert_eq!(geometry.branches.rest_positions, rest);
    }

    #[test]
    fn trunk_base_stays_pinned() {
        let (mut geometry, wind) = generated();
        // The first branch ring is the trunk base: weight 0 and no flutter.
        apply(&mut geometry, 5.3, &wind);
        let rest = geometry.branches.rest_positions[0];
        let displaced = geometry.branches.positions[0];
        assert_eq!(rest, displaced);
    }

    #[test]
    fn zero_strength_is_identity() {
        let (mut geometry, _) = generated();
        let wind = WindOptions {
            strength: 0.0,
            ..WindOptions::default()
        };
        apply(&mut geometry, 2.0, &wind);
        assert_eq!(geometry.branches.positions, geometry.branches.rest_positions);
        assert_eq!(geometry.leaves.positions, geometry.leaves.rest_positions);
    }
}
