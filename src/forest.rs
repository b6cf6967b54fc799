//! Forest batch generation.
//!
//! [`generate_batch`] turns a list of configurations into trees with
//! per-tree error isolation: one bad configuration is logged and skipped,
//! the rest of the batch still generates, and the [`BatchReport`] says how
//! many made it.  [`random_options`] is the randomized recipe used to fill a
//! scene with varied trees when no presets are in play.

use bevy::log::warn;
use bevy::math::Vec3;
use rand::Rng;

use crate::{
    options::{BarkType, Billboard, LeafType, TreeOptions, TreeType},
    tree::Tree,
};

/// Bark tint palette, linear RGB (browns, from pale to dark).
const BARK_TINTS: &[[f32; 3]] = &[
    [0.545, 0.271, 0.075],
    [0.627, 0.322, 0.176],
    [0.396, 0.263, 0.129],
    [0.569, 0.361, 0.227],
    [0.490, 0.396, 0.325],
    [0.365, 0.251, 0.216],
];

/// Leaf tint palette, linear RGB (greens plus a few autumn accents).
const LEAF_TINTS: &[[f32; 3]] = &[
    [0.133, 0.545, 0.133],
    [0.196, 0.804, 0.196],
    [0.0, 0.392, 0.0],
    [0.604, 0.804, 0.196],
    [0.561, 0.737, 0.561],
    [1.0, 0.388, 0.278],
    [1.0, 0.647, 0.0],
    [0.863, 0.078, 0.235],
];

const BARK_TYPES: &[BarkType] = &[BarkType::Birch, BarkType::Oak, BarkType::Pine, BarkType::Willow];
const LEAF_TYPES: &[LeafType] = &[LeafType::Ash, LeafType::Aspen, LeafType::Oak, LeafType::Pine];

fn pick<T: Copy>(rng: &mut impl Rng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

/// A fresh randomized tree configuration: 2–3 levels, random species,
/// tapering per-level tables.  Always structurally valid.
pub fn random_options(rng: &mut impl Rng) -> TreeOptions {
    let mut options = TreeOptions::default();
    options.seed = rng.random::<u64>();
    options.tree_type = if rng.random::<f32>() > 0.6 {
        TreeType::Evergreen
    } else {
        TreeType::Deciduous
    };

    options.bark.bark_type = pick(rng, BARK_TYPES);
    options.bark.tint = pick(rng, BARK_TINTS);
    options.bark.texture_scale[1] = 3.0 + rng.random::<f32>() * 7.0;

    let levels = 2 + rng.random_range(0..2usize);
    let b = &mut options.branch;
    b.levels = levels;
    b.angle = vec![0.0; levels + 1];
    b.children = vec![0; levels];
    b.start = vec![0.0; levels + 1];
    b.length = vec![0.0; levels + 1];
    b.radius = vec![0.0; levels + 1];
    b.gnarliness = vec![0.0; levels + 1];
    b.taper = vec![0.0; levels + 1];
    b.sections = vec![0; levels + 1];
    b.segments = vec![0; levels + 1];

    for level in 0..=levels {
        if level > 0 {
            b.angle[level] = 25.0 + rng.random::<f32>() * 40.0;
            b.children[level - 1] = 3 + rng.random_range(0..4usize);
            b.start[level] = 0.3 + rng.random::<f32>() * 0.4;
        }
        b.length[level] = (8.0 + rng.random::<f32>() * 15.0) * (1.0 - level as f32 * 0.25);
        b.radius[level] = (0.4 + rng.random::<f32>() * 0.8) * (1.0 - level as f32 * 0.15);
        b.gnarliness[level] = rng.random::<f32>() * 0.2;
        b.taper[level] = 0.5 + rng.random::<f32>() * 0.3;
        b.sections[level] = (10 - level * 2).max(4);
        b.segments[level] = (8 - level).max(4);
    }

    // Evergreens read as conifers: needle texture, flatter single cards.
    let leaves = &mut options.leaves;
    leaves.leaf_type = if options.tree_type == TreeType::Evergreen {
        LeafType::Pine
    } else {
        pick(rng, LEAF_TYPES)
    };
    leaves.billboard = if rng.random::<bool>() {
        Billboard::Double
    } else {
        Billboard::Single
    };
    leaves.count = 3 + rng.random_range(0..12usize);
    leaves.size = 1.2 + rng.random::<f32>() * 1.5;
    leaves.size_variance = 0.2 + rng.random::<f32>() * 0.4;
    leaves.angle = 5.0 + rng.random::<f32>() * 25.0;
    leaves.start = rng.random::<f32>() * 0.2;
    leaves.tint = pick(rng, LEAF_TINTS);

    options
}

/// Outcome of a batch: how many trees generated, how many were skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub generated: usize,
    pub skipped: usize,
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} trees generated, {} skipped", self.generated, self.skipped)
    }
}

/// Generate one tree per configuration, skipping failures.
///
/// A configuration that fails to generate is `warn!`-logged and dropped;
/// the batch never aborts.  The returned trees are all fully generated.
pub fn generate_batch(configs: impl IntoIterator<Item = TreeOptions>) -> (Vec<Tree>, BatchReport) {
    let mut trees = Vec::new();
    let mut report = BatchReport::default();
    for (i, options) in configs.into_iter().enumerate() {
        let mut tree = Tree::new(options);
        match tree.generate() {
            Ok(()) => {
                report.generated += 1;
                trees.push(tree);
            }
            Err(e) => {
                report.skipped += 1;
                warn!("skipping tree {i}: {e}");
            }
        }
    }
    (trees, report)
}

/// Scatter `count` random trees over a square of ±`spread`, leaving a
/// clearing of `clearing` radius at the origin.  Positions that land in the
/// clearing are simply not planted (they count neither as generated nor as
/// skipped — there was never a tree there).
pub fn plant(
    rng: &mut impl Rng,
    count: usize,
    spread: f32,
    clearing: f32,
) -> (Vec<Tree>, BatchReport) {
    let mut placed = Vec::new();
    for _ in 0..count {
        let x = (rng.random::<f32>() - 0.5) * 2.0 * spread;
        let z = (rng.random::<f32>() - 0.5) * 2.0 * spread;
        let options = random_options(rng);
        if (x * x + z * z).sqrt() < clearing {
            continue;
        }
        placed.push((options, Vec3::new(x, 0.0, z)));
    }

    let positions: Vec<Vec3> = placed.iter().map(|(_, p)| *p).collect();
    let (mut trees, report) = generate_batch(placed.into_iter().map(|(o, _)| o));
    for (tree, position) in trees.iter_mut().zip(positions) {
        tree.set_position(position.x, position.y, position.z);
    }
    (trees, report)
}
