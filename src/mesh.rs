//! Mesh emission: skeleton → renderable geometry.
//!
//! [`emit`] skins every [`BranchNode`](crate::skeleton::BranchNode) with a
//! tapered tube that follows its curved centerline, and scatters leaf
//! billboard quads over the terminal branches.  Bark and leaf vertices land
//! in two separate [`MeshBuffers`] so material assignment never needs a
//! per-vertex lookup.
//!
//! Each buffer keeps an immutable `rest_positions` snapshot alongside the
//! live `positions`; the wind animator always recomputes the latter from the
//! former, so sway never accumulates across frames.
//!
//! # Texture continuity
//! The V texture coordinate is `(uv_offset + arc) / texture_scale.y`, where
//! `uv_offset` is the cumulative arc length carried from parent to child by
//! the skeleton builder — bark texture flows seamlessly across branch joins.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy::{
    asset::{Assets, Handle, RenderAssetUsages},
    image::Image,
    math::{Quat, Vec3},
    mesh::{Indices, Mesh, PrimitiveTopology},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    options::{BarkType, LeafType, TreeOptions},
    skeleton::Skeleton,
    wind::sway_weight,
};

/// Stream offset for the leaf-scatter RNG, so leaf jitter draws from a
/// different sequence than the skeleton without disturbing it.
const LEAF_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Error raised when emission hits an internal inconsistency.
///
/// These are invariant violations, not bad user input: the same input will
/// fail the same way every time, so callers should surface the error rather
/// than retry.  No partial geometry is ever returned.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The skeleton has no nodes at all.
    EmptySkeleton,
    /// A node's level exceeds the configuration it is being skinned with.
    LevelOutOfRange { node: usize, level: usize, levels: usize },
    /// A node's frame count does not match its section count.
    MalformedCenterline { node: usize, frames: usize, sections: usize },
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::EmptySkeleton => write!(f, "skeleton has no nodes"),
            GenerationError::LevelOutOfRange { node, level, levels } => write!(
                f,
                "node {node} is at level {level} but the configuration has {levels} levels"
            ),
            GenerationError::MalformedCenterline { node, frames, sections } => write!(
                f,
                "node {node} has {frames} centerline frames for {sections} sections"
            ),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Raw vertex/index buffers for one material group.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    /// Live positions — overwritten in place by the wind animator.
    pub positions: Vec<[f32; 3]>,
    /// Un-animated positions; the wind animator's sole input.
    pub rest_positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    /// Per-vertex `[sway_weight, phase]` consumed by [`crate::wind`].
    pub wind: Vec<[f32; 2]>,
}

impl MeshBuffers {
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2], wind: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        let p = position.to_array();
        self.positions.push(p);
        self.rest_positions.push(p);
        self.normals.push(normal.to_array());
        self.uvs.push(uv);
        self.wind.push(wind);
        index
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// One leaf quad's placement, kept alongside the buffers.
///
/// Holds the attachment branch by arena index (a weak relation — leaves do
/// not own branches) so placements can be recomputed if the skeleton is
/// rebuilt.
#[derive(Clone, Copy, Debug)]
pub struct LeafPlacement {
    /// Arena index of the branch this leaf hangs from.
    pub branch: usize,
    /// Fraction along that branch, \[0, 1\].
    pub offset: f32,
    /// Orientation of the quad in tree-local space.
    pub orientation: Quat,
    /// Edge length of the quad, world units.
    pub size: f32,
}

/// Complete renderable output of one tree: bark tubes + leaf cards.
#[derive(Clone, Debug, Default)]
pub struct TreeGeometry {
    pub branches: MeshBuffers,
    pub leaves: MeshBuffers,
    pub placements: Vec<LeafPlacement>,
    /// Linear RGB tints for material construction.
    pub bark_tint: [f32; 3],
    pub leaf_tint: [f32; 3],
}

/// Skin `skeleton` into renderable geometry.
pub fn emit(skeleton: &Skeleton, options: &TreeOptions) -> Result<TreeGeometry, GenerationError> {
    if skeleton.nodes.is_empty() {
        return Err(GenerationError::EmptySkeleton);
    }
    let levels = options.branch.levels;
    let level_span = levels.max(1) as f32;
    let texture_scale_y = options.bark.texture_scale[1].max(f32::EPSILON);

    let mut geometry = TreeGeometry {
        bark_tint: options.bark.tint,
        leaf_tint: options.leaves.tint,
        ..TreeGeometry::default()
    };
    let mut leaf_rng = StdRng::seed_from_u64(options.seed ^ LEAF_SEED_OFFSET);

    for (index, node) in skeleton.nodes.iter().enumerate() {
        if node.level > levels {
            return Err(GenerationError::LevelOutOfRange {
                node: index,
                level: node.level,
                levels,
            });
        }
        if node.frames.len() != node.sections + 1 {
            return Err(GenerationError::MalformedCenterline {
                node: index,
                frames: node.frames.len(),
                sections: node.sections,
            });
        }

        let level_norm = node.level as f32 / level_span;
        let phase = position_phase(node.frames[0].position);
        emit_branch_tube(&mut geometry.branches, node, level_norm, phase, texture_scale_y);

        // Leaves hang off the terminal level only.  A trunk-only tree
        // (levels == 0) puts them directly on the trunk — bush presets rely
        // on this.
        if node.level == levels && options.leaves.count > 0 {
            emit_leaves(&mut geometry, index, node, options, &mut leaf_rng);
        }
    }

    Ok(geometry)
}

/// Tapered tube along one branch: a ring of `segments + 1` vertices per
/// centerline frame (seam vertex duplicated so U can wrap 0 → 1).
fn emit_branch_tube(
    buffers: &mut MeshBuffers,
    node: &crate::skeleton::BranchNode,
    level_norm: f32,
    phase: f32,
    texture_scale_y: f32,
) {
    let ring_stride = node.segments as u32 + 1;
    let base = buffers.vertex_count() as u32;

    for frame in &node.frames {
        let arc_norm = if node.length > 0.0 { frame.arc / node.length } else { 0.0 };
        let weight = sway_weight(level_norm, arc_norm);
        let v = (node.uv_offset + frame.arc) / texture_scale_y;
        for s in 0..=node.segments {
            let theta = TAU * s as f32 / node.segments as f32;
            let radial = frame.orientation * Vec3::new(theta.cos(), 0.0, theta.sin());
            buffers.push_vertex(
                frame.position + radial * frame.radius,
                radial,
                [s as f32 / node.segments as f32, v],
                [weight, phase],
            );
        }
    }

    for i in 0..node.sections as u32 {
        for s in 0..node.segments as u32 {
            let a = base + i * ring_stride + s;
            let b = a + 1;
            let c = a + ring_stride;
            let d = c + 1;
            buffers.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
}

/// Scatter leaf quads along one terminal branch.
fn emit_leaves(
    geometry: &mut TreeGeometry,
    branch_index: usize,
    node: &crate::skeleton::BranchNode,
    options: &TreeOptions,
    rng: &mut StdRng,
) {
    let leaves = &options.leaves;
    let span = 1.0 - leaves.start;
    let spacing = span / leaves.count as f32;

    for j in 0..leaves.count {
        let offset = leaves.start + spacing * (j as f32 + 0.5);
        let frame = node.frame_at(offset);
        let tilt = leaves.angle.to_radians() * (1.0 + (rng.random::<f32>() * 2.0 - 1.0) * 0.3);
        let azimuth = rng.random::<f32>() * TAU;
        let orientation = (frame.orientation
            * Quat::from_axis_angle(Vec3::Y, azimuth)
            * Quat::from_axis_angle(Vec3::X, tilt))
        .normalize();
        let size = (leaves.size + (rng.random::<f32>() * 2.0 - 1.0) * leaves.size_variance)
            .max(0.05);

        geometry.placements.push(LeafPlacement {
            branch: branch_index,
            offset,
            orientation,
            size,
        });

        let weight = sway_weight(1.0, offset);
        let phase = position_phase(frame.position);
        emit_leaf_quad(&mut geometry.leaves, frame.position, orientation, size, weight, phase);
        if leaves.billboard == crate::options::Billboard::Double {
            let crossed = orientation * Quat::from_axis_angle(Vec3::Y, FRAC_PI_2);
            emit_leaf_quad(&mut geometry.leaves, frame.position, crossed, size, weight, phase);
        }
    }
}

/// One quad anchored at `origin`, extending along its local `+Y`, facing
/// local `+Z`.  Render leaves with a double-sided alpha-masked material.
fn emit_leaf_quad(
    buffers: &mut MeshBuffers,
    origin: Vec3,
    orientation: Quat,
    size: f32,
    weight: f32,
    phase: f32,
) {
    let half = size * 0.5;
    let normal = orientation * Vec3::Z;
    let corners = [
        (Vec3::new(-half, 0.0, 0.0), [0.0, 0.0]),
        (Vec3::new(half, 0.0, 0.0), [1.0, 0.0]),
        (Vec3::new(half, size, 0.0), [1.0, 1.0]),
        (Vec3::new(-half, size, 0.0), [0.0, 1.0]),
    ];
    let base = buffers.vertex_count() as u32;
    for (corner, uv) in corners {
        buffers.push_vertex(origin + orientation * corner, normal, uv, [weight, phase]);
    }
    buffers
        .indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Deterministic per-node phase in \[0, TAU) from a rest position, so
/// neighbouring branches never sway in lockstep.
fn position_phase(p: Vec3) -> f32 {
    let h = (p.x * 12.9898 + p.y * 78.233 + p.z * 37.719).sin() * 43_758.547;
    h.fract().abs() * TAU
}

// --- Bevy upload ------------------------------------------------------------

/// Mesh handles for one uploaded tree.
#[derive(Clone, Debug)]
pub struct TreeMeshes {
    pub branches: Handle<Mesh>,
    pub leaves: Handle<Mesh>,
}

/// Upload both buffer groups into [`Assets<Mesh>`].
pub fn geometry_to_meshes(geometry: &TreeGeometry, meshes: &mut Assets<Mesh>) -> TreeMeshes {
    TreeMeshes {
        branches: meshes.add(buffers_to_mesh(&geometry.branches)),
        leaves: meshes.add(buffers_to_mesh(&geometry.leaves)),
    }
}

fn buffers_to_mesh(buffers: &MeshBuffers) -> Mesh {
    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, buffers.positions.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, buffers.normals.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, buffers.uvs.clone())
    .with_inserted_indices(Indices::U32(buffers.indices.clone()))
}

/// Write the current (wind-displaced) positions back into an uploaded mesh.
/// Called once per frame per buffer group by the animation system.
pub fn write_positions(buffers: &MeshBuffers, mesh: &mut Mesh) {
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, buffers.positions.clone());
}

// --- texture lookup surface -------------------------------------------------

/// Bark texture channel, mirroring the external PBR texture sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BarkChannel {
    Color,
    Normal,
    Roughness,
    Ao,
}

/// Supplies bark/leaf textures by key.
///
/// The generator never constructs textures itself — the rendering layer owns
/// them and hands out handles keyed by species and channel.
pub trait TreeTextureProvider {
    fn bark(&self, bark: BarkType, channel: BarkChannel) -> Handle<Image>;
    fn leaf(&self, leaf: LeafType) -> Handle<Image>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Billboard, TreeOptions};
    use crate::skeleton;

    fn default_geometry() -> TreeGeometry {
        let opts = TreeOptions::default();
        let skeleton = skeleton::build(&opts).unwrap();
        emit(&skeleton, &opts).unwrap()
    }

    #[test]
    fn branch_buffers_match_tessellation() {
        let opts = TreeOptions::default();
        let sk = skeleton::build(&opts).unwrap();
        let geometry = emit(&sk, &opts).unwrap();

        let expected_vertices: usize = sk
            .nodes
            .iter()
            .map(|n| (n.sections + 1) * (n.segments + 1))
            .sum();
        let expected_triangles: usize =
            sk.nodes.iter().map(|n| n.sections * n.segments * 2).sum();
        assert_eq!(geometry.branches.vertex_count(), expected_vertices);
        assert_eq!(geometry.branches.triangle_count(), expected_triangles);
    }

    #[test]
    fn indices_stay_in_range() {
        let geometry = default_geometry();
        for buffers in [&geometry.branches, &geometry.leaves] {
            let count = buffers.vertex_count() as u32;
            assert!(buffers.indices.iter().all(|&i| i < count));
            assert_eq!(buffers.indices.len() % 3, 0);
        }
    }

    #[test]
    fn rest_positions_snapshot_live_positions() {
        let geometry = default_geometry();
        assert_eq!(geometry.branches.positions, geometry.branches.rest_positions);
        assert_eq!(geometry.leaves.positions, geometry.leaves.rest_positions);
    }

    #[test]
    fn double_billboard_doubles_leaf_triangles() {
        let mut opts = TreeOptions::default();
        opts.leaves.billboard = Billboard::Single;
        let sk = skeleton::build(&opts).unwrap();
        let single = emit(&sk, &opts).unwrap();

        opts.leaves.billboard = Billboard::Double;
        let double = emit(&sk, &opts).unwrap();

        assert_eq!(double.leaves.triangle_count(), single.leaves.triangle_count() * 2);
        assert_eq!(double.placements.len(), single.placements.len());
    }

    #[test]
    fn leaf_placements_only_on_terminal_level() {
        let opts = TreeOptions::default();
        let sk = skeleton::build(&opts).unwrap();
        let geometry = emit(&sk, &opts).unwrap();
        assert!(!geometry.placements.is_empty());
        for placement in &geometry.placements {
            assert_eq!(sk.nodes[placement.branch].level, opts.branch.levels);
            assert!(placement.offset >= opts.leaves.start);
            assert!(placement.offset <= 1.0);
        }
    }

    #[test]
    fn bark_v_coordinate_is_monotonic_along_trunk() {
        let opts = TreeOptions::default();
        let sk = skeleton::build(&opts).unwrap();
        let geometry = emit(&sk, &opts).unwrap();
        // Trunk rings come first; the seam column (u = 0) samples one vertex
        // per ring.
        let trunk = &sk.nodes[0];
        let stride = trunk.segments + 1;
        let mut last_v = f32::NEG_INFINITY;
        for ring in 0..=trunk.sections {
            let v = geometry.branches.uvs[ring * stride][1];
            assert!(v > last_v, "bark V rewound at ring {ring}");
            last_v = v;
        }
    }

    #[test]
    fn emit_is_deterministic() {
        let a = default_geometry();
        let b = default_geometry();
        assert_eq!(a.branches.positions, b.branches.positions);
        assert_eq!(a.leaves.positions, b.leaves.positions);
        assert_eq!(a.placements.len(), b.placements.len());
    }

    #[test]
    fn empty_skeleton_is_an_error() {
        let err = emit(&Skeleton::default(), &TreeOptions::default()).unwrap_err();
        assert_eq!(err, GenerationError::EmptySkeleton);
    }

    #[test]
    fn level_out_of_range_is_an_error() {
        let opts = TreeOptions::default();
        let sk = skeleton::build(&opts).unwrap();
        let mut shallow = opts.clone();
        shallow.branch.levels = 0;
        shallow.branch.children = vec![];
        for field in [
            &mut shallow.branch.angle,
            &mut shallow.branch.start,
            &mut shallow.branch.length,
            &mut shallow.branch.radius,
            &mut shallow.branch.gnarliness,
            &mut shallow.branch.taper,
        ] {
            field.truncate(1);
        }
        shallow.branch.sections.truncate(1);
        shallow.branch.segments.truncate(1);
        let err = emit(&sk, &shallow).unwrap_err();
        assert!(matches!(err, GenerationError::LevelOutOfRange { .. }));
    }
}
