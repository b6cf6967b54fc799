//! Branch skeleton construction.
//!
//! [`build`] turns a [`TreeOptions`] into a [`Skeleton`]: a flat arena of
//! [`BranchNode`]s addressed by index (root at 0), each carrying its curved
//! centerline as a run of [`SectionFrame`]s.  The mesh emitter
//! ([`crate::mesh::emit`]) skins tubes over these frames; children attach to
//! a frame interpolated along the parent, so gnarled bends propagate
//! naturally into sub-branches.
//!
//! # Determinism
//! All randomness comes from one `StdRng` seeded with `options.seed` and
//! threaded explicitly through the recursion.  Nodes are grown depth-first
//! with children in sibling order, and every random draw happens
//! unconditionally (amplitudes may be zero, draws never are), so the stream
//! position — and therefore the whole tree — is a pure function of the
//! options.

use std::f32::consts::TAU;

use bevy::math::{Quat, Vec3};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::options::{ConfigError, TreeOptions};

/// Golden angle in radians — spreads sibling azimuths so branches never
/// stack into a visible plane.
const GOLDEN_ANGLE: f32 = 2.399_963;

/// Fractional jitter applied to the per-level branch angle.
const ANGLE_JITTER: f32 = 0.15;

/// Attachment-point jitter as a fraction of the sibling spacing.
const ATTACH_JITTER: f32 = 0.25;

/// One sample of a branch centerline.
#[derive(Clone, Copy, Debug)]
pub struct SectionFrame {
    /// Position in tree-local space.
    pub position: Vec3,
    /// Orientation of the ring plane; local `+Y` points along the branch.
    pub orientation: Quat,
    /// Tube radius at this frame.
    pub radius: f32,
    /// Distance from the branch base along the centerline.
    pub arc: f32,
}

/// One branch in the skeleton arena.
#[derive(Clone, Debug)]
pub struct BranchNode {
    /// Depth in the hierarchy; 0 = trunk.
    pub level: usize,
    pub parent: Option<usize>,
    /// Arena indices of direct children, in spawn order.
    pub children: Vec<usize>,
    pub length: f32,
    pub start_radius: f32,
    pub end_radius: f32,
    /// Longitudinal tessellation — `frames.len() == sections + 1`.
    pub sections: usize,
    /// Radial tessellation used when skinning this branch.
    pub segments: usize,
    /// Cumulative bark arc length at the branch base, carried from the
    /// parent so the V texture coordinate continues seamlessly across joins.
    pub uv_offset: f32,
    pub frames: Vec<SectionFrame>,
}

impl BranchNode {
    /// Interpolated frame at fraction `t` ∈ \[0, 1\] along the centerline.
    pub fn frame_at(&self, t: f32) -> SectionFrame {
        let last = self.frames.len() - 1;
        let f = t.clamp(0.0, 1.0) * last as f32;
        let i = (f as usize).min(last.saturating_sub(1));
        let frac = f - i as f32;
        let a = &self.frames[i];
        let b = &self.frames[(i + 1).min(last)];
        SectionFrame {
            position: a.position.lerp(b.position, frac),
            orientation: a.orientation.slerp(b.orientation, frac),
            radius: a.radius + (b.radius - a.radius) * frac,
            arc: a.arc + (b.arc - a.arc) * frac,
        }
    }
}

/// Flat arena of branch nodes; root at index 0.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    pub nodes: Vec<BranchNode>,
}

impl Skeleton {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of hierarchy levels actually present (`levels + 1` for an
    /// unpruned tree, 1 for a trunk-only tree).
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level + 1).max().unwrap_or(0)
    }

    /// Indices of every node at the given level.
    pub fn nodes_at_level(&self, level: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.level == level)
            .map(|(i, _)| i)
    }
}

/// Build the branch skeleton for `options`.
///
/// Fails only on structural configuration errors; scalar ranges are clamped
/// per the policy in [`crate::options`].
pub fn build(options: &TreeOptions) -> Result<Skeleton, ConfigError> {
    let opts = options.clamped()?;
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut skeleton = Skeleton::default();
    grow_branch(
        &mut skeleton,
        &opts,
        &mut rng,
        0,
        None,
        Vec3::ZERO,
        Quat::IDENTITY,
        0.0,
    );
    Ok(skeleton)
}

/// Symmetric unit draw in \[-1, 1\].  Always consumes exactly one sample so
/// the stream position does not depend on any amplitude being zero.
#[inline]
fn jitter(rng: &mut StdRng) -> f32 {
    rng.random::<f32>() * 2.0 - 1.0
}

/// Grow one branch and, recursively, its children.  Returns the arena index
/// of the new node.
#[allow(clippy::too_many_arguments)]
fn grow_branch(
    skeleton: &mut Skeleton,
    opts: &TreeOptions,
    rng: &mut StdRng,
    level: usize,
    parent: Option<usize>,
    origin: Vec3,
    base_orientation: Quat,
    uv_offset: f32,
) -> usize {
    let b = &opts.branch;
    let length = b.length[level];
    let start_radius = b.radius[level];
    let end_radius = start_radius * b.taper[level];
    let sections = b.sections[level];
    let gnarliness = b.gnarliness[level];
    let step = length / sections as f32;

    // Walk the centerline, drifting the orientation a little per section.
    // This is what bends the tube; children inherit the bent frame at their
    // attachment point.
    let mut frames = Vec::with_capacity(sections + 1);
    let mut position = origin;
    let mut orientation = base_orientation;
    for i in 0..=sections {
        let t = i as f32 / sections as f32;
        frames.push(SectionFrame {
            position,
            orientation,
            radius: start_radius + (end_radius - start_radius) * t,
            arc: step * i as f32,
        });
        let pitch = jitter(rng) * gnarliness;
        let roll = jitter(rng) * gnarliness;
        orientation = (orientation
            * Quat::from_axis_angle(Vec3::X, pitch)
            * Quat::from_axis_angle(Vec3::Z, roll))
        .normalize();
        position += orientation * (Vec3::Y * step);
    }

    let index = skeleton.nodes.len();
    skeleton.nodes.push(BranchNode {
        level,
        parent,
        children: Vec::new(),
        length,
        start_radius,
        end_radius,
        sections,
        segments: b.segments[level],
        uv_offset,
        frames,
    });

    // Spawn children for the next level.  `children[level] == 0` prunes the
    // subtree; `level == levels` terminates the recursion.
    if level < b.levels && b.children[level] > 0 {
        let child_level = level + 1;
        let count = b.children[level];
        let start = b.start[child_level];
        let span = 1.0 - start;
        let spacing = span / count as f32;
        let base_azimuth = rng.random::<f32>() * TAU;

        for c in 0..count {
            // Even spacing over [start, 1], nudged by a bounded jitter so
            // attachment points never leave that interval.
            let t = (start
                + spacing * (c as f32 + 0.5)
                + jitter(rng) * spacing * ATTACH_JITTER)
                .clamp(start, 1.0);
            let angle = b.angle[child_level].to_radians() * (1.0 + jitter(rng) * ANGLE_JITTER);
            let azimuth = base_azimuth + GOLDEN_ANGLE * c as f32;

            let frame = skeleton.nodes[index].frame_at(t);
            let child_orientation = (frame.orientation
                * Quat::from_axis_angle(Vec3::Y, azimuth)
                * Quat::from_axis_angle(Vec3::X, angle))
            .normalize();
            let child_uv = uv_offset + frame.arc;

            let child = grow_branch(
                skeleton,
                opts,
                rng,
                child_level,
                Some(index),
                frame.position,
                child_orientation,
                child_uv,
            );
            skeleton.nodes[index].children.push(child);
        }
    }

    index
}
