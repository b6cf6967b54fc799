//! `bevy_sylva_tree` — procedural 3D tree generation for Bevy.
//!
//! # Architecture
//! A [`TreeOptions`] (level-indexed branch tables, leaf and bark settings)
//! drives [`skeleton::build`], which grows a deterministic, seeded branch
//! arena.  [`mesh::emit`] skins that skeleton into tapered bark tubes and
//! leaf billboard cards — two separate buffer groups so materials split
//! cleanly.  [`wind::apply`] displaces the geometry from its immutable rest
//! pose as a pure function of time, so the sway can be scrubbed and never
//! drifts.  [`Tree`] composes the pipeline; [`PresetLibrary`] supplies named
//! configurations; [`forest`] generates whole batches with per-tree error
//! isolation.
//!
//! Same options (including `seed`) always produce identical geometry.

pub mod async_gen;
pub mod forest;
pub mod mesh;
pub mod options;
pub mod presets;
pub mod skeleton;
pub mod tree;
pub mod wind;

pub use mesh::{GenerationError, TreeGeometry, TreeMeshes, TreeTextureProvider, geometry_to_meshes};
pub use options::{BarkType, Billboard, ConfigError, LeafType, TreeOptions, TreeType};
pub use presets::{PresetError, PresetLibrary};
pub use tree::{Tree, TreeError};

use bevy::prelude::*;

/// Bevy plugin — registers async generation polling and wind animation.
pub struct SylvaTreePlugin;

impl Plugin for SylvaTreePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (async_gen::poll_tree_tasks, async_gen::animate_trees).chain(),
        );
    }
}
