//! Tree configuration model.
//!
//! [`TreeOptions`] is pure data: every knob the generator reads lives here,
//! with defaults for each field so a caller (or a partial JSON preset) only
//! has to override what it cares about.  Branch shape is level-indexed —
//! index 0 is the trunk, index `levels` the outermost twigs.
//!
//! # Validation policy
//! Scalar ranges are **clamped**, not rejected: this is generative art, and a
//! `taper` of 1.3 should render a slightly odd tree, not abort a forest.
//! Structural problems — a level-indexed array whose length does not match
//! `levels` — are **errors** ([`ConfigError::LevelArrayMismatch`]), because
//! silently truncating levels would produce a cosmetically plausible but
//! wrong tree.  Call [`TreeOptions::clamped`] to get the generation-ready
//! copy; it performs the structural check and then clamps.

use bevy::math::Vec2;

/// Smallest value a positive dimension (length, radius, leaf size) is
/// clamped up to.
const MIN_DIMENSION: f32 = 1e-3;

/// Minimum tube tessellation after clamping, both longitudinal and radial.
/// Below 4 sections/segments the tubes read as ribbons, not branches.
const MIN_TESSELLATION: usize = 4;

/// Error raised when a [`TreeOptions`] is structurally unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A level-indexed array has the wrong number of entries for `levels`.
    LevelArrayMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A dimension that must be strictly positive was zero or negative.
    /// Only raised by [`TreeOptions::validate`]; [`TreeOptions::clamped`]
    /// repairs these instead.
    NonPositive { field: &'static str, value: f32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LevelArrayMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "branch.{field} must have {expected} entries, got {actual}"
            ),
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be > 0 (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Overall tree habit — selects leaf/branch shaping defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeType {
    #[default]
    Deciduous,
    Evergreen,
}

/// Bark species — keys the external bark texture set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarkType {
    Birch,
    #[default]
    Oak,
    Pine,
    Willow,
}

/// Leaf species — keys the external leaf texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafType {
    Ash,
    Aspen,
    #[default]
    Oak,
    Pine,
}

/// Leaf billboard mode.
///
/// `Single` emits one quad per leaf; `Double` emits two crossed quads for a
/// fuller silhouette from every viewing angle, at twice the triangle count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Billboard {
    Single,
    #[default]
    Double,
}

/// Bark surface appearance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BarkOptions {
    pub bark_type: BarkType,
    /// Multiplied into the bark material colour, linear RGB \[0, 1\].
    pub tint: [f32; 3],
    /// Texture repeat scale; `y` stretches the bark along the branch so the
    /// V coordinate advances by `arc_length / texture_scale.y`.
    pub texture_scale: [f32; 2],
}

impl Default for BarkOptions {
    fn default() -> Self {
        Self {
            bark_type: BarkType::Oak,
            tint: [1.0, 1.0, 1.0],
            texture_scale: [1.0, 4.0],
        }
    }
}

/// Level-indexed branch shape tables.
///
/// Arrays indexed by level have `levels + 1` entries (trunk included);
/// `children` has `levels` entries because it is a per-*parent*-level count.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BranchOptions {
    /// Depth of the branch hierarchy; 0 = trunk only.
    pub levels: usize,
    /// Divergence from the parent axis in degrees (entry 0 unused).
    pub angle: Vec<f32>,
    /// Sub-branches spawned per parent at each level; `0` prunes the level.
    pub children: Vec<usize>,
    /// Fraction along the parent where children start attaching, \[0, 1\].
    pub start: Vec<f32>,
    /// Branch length per level, world units.
    pub length: Vec<f32>,
    /// Branch start radius per level, world units.
    pub radius: Vec<f32>,
    /// Curvature noise amplitude (radians of drift per section).
    pub gnarliness: Vec<f32>,
    /// Fraction of the start radius retained at the branch end, \[0, 1\].
    pub taper: Vec<f32>,
    /// Longitudinal tube sections per level.
    pub sections: Vec<usize>,
    /// Radial tube segments per level.
    pub segments: Vec<usize>,
}

impl Default for BranchOptions {
    fn default() -> Self {
        Self {
            levels: 2,
            angle: vec![0.0, 35.0, 45.0],
            children: vec![5, 4],
            start: vec![0.0, 0.4, 0.5],
            length: vec![12.0, 7.0, 3.5],
            radius: vec![0.7, 0.35, 0.15],
            gnarliness: vec![0.08, 0.12, 0.18],
            taper: vec![0.7, 0.7, 0.7],
            sections: vec![10, 8, 6],
            segments: vec![8, 6, 5],
        }
    }
}

/// Leaf distribution and appearance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LeafOptions {
    pub leaf_type: LeafType,
    pub billboard: Billboard,
    /// Leaves per terminal branch.
    pub count: usize,
    /// Base leaf quad size, world units.
    pub size: f32,
    /// Uniform size jitter, ± world units.
    pub size_variance: f32,
    /// Tilt away from the branch axis in degrees.
    pub angle: f32,
    /// Fraction along the terminal branch where leaves begin, \[0, 1\].
    pub start: f32,
    /// Multiplied into the leaf material colour, linear RGB \[0, 1\].
    pub tint: [f32; 3],
}

impl Default for LeafOptions {
    fn default() -> Self {
        Self {
            leaf_type: LeafType::Oak,
            billboard: Billboard::Double,
            count: 8,
            size: 1.5,
            size_variance: 0.3,
            angle: 15.0,
            start: 0.1,
            tint: [1.0, 1.0, 1.0],
        }
    }
}

/// Wind sway tuning.
///
/// The animation itself is a pure function of time (see [`crate::wind`]);
/// these options scale it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WindOptions {
    /// Peak sway displacement at the outermost tips, world units.
    pub strength: f32,
    /// Base oscillation frequency, radians per second.
    pub speed: f32,
    /// Blend weight of the Perlin gust field, \[0, 1\].
    pub gust_scale: f32,
    /// Extra high-frequency flutter applied to leaf quads, \[0, 1\].
    pub leaf_flutter: f32,
}

impl Default for WindOptions {
    fn default() -> Self {
        Self {
            strength: 0.25,
            speed: 1.4,
            gust_scale: 0.5,
            leaf_flutter: 0.6,
        }
    }
}

/// Complete, declarative description of one tree.
///
/// Same options (including `seed`) always generate identical geometry.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Seed for every randomized decision during generation.
    pub seed: u64,
    pub tree_type: TreeType,
    pub bark: BarkOptions,
    pub branch: BranchOptions,
    pub leaves: LeafOptions,
    pub wind: WindOptions,
}

impl TreeOptions {
    /// Strict check: structural errors *and* non-positive dimensions fail.
    ///
    /// Use this when authoring presets; generation itself goes through
    /// [`clamped`](Self::clamped), which repairs scalar problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_structure()?;
        let b = &self.branch;
        for (field, values) in [("length", &b.length), ("radius", &b.radius)] {
            if let Some(&v) = values.iter().find(|v| **v <= 0.0) {
                return Err(ConfigError::NonPositive { field, value: v });
            }
        }
        if self.leaves.size <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "leaves.size",
                value: self.leaves.size,
            });
        }
        Ok(())
    }

    /// Structural check plus range clamping; returns the generation-ready copy.
    ///
    /// Clamps `start`/`taper` into \[0, 1\], tessellation counts up to
    /// [`MIN_TESSELLATION`], dimensions up to [`MIN_DIMENSION`], and the wind
    /// blend weights into \[0, 1\].
    pub fn clamped(&self) -> Result<TreeOptions, ConfigError> {
        self.check_structure()?;
        let mut out = self.clone();
        let b = &mut out.branch;
        for v in b.start.iter_mut().chain(b.taper.iter_mut()) {
            *v = v.clamp(0.0, 1.0);
        }
        for v in b.length.iter_mut().chain(b.radius.iter_mut()) {
            *v = v.max(MIN_DIMENSION);
        }
        for v in b.sections.iter_mut().chain(b.segments.iter_mut()) {
            *v = (*v).max(MIN_TESSELLATION);
        }
        out.leaves.size = out.leaves.size.max(MIN_DIMENSION);
        out.leaves.size_variance = out.leaves.size_variance.max(0.0);
        out.leaves.start = out.leaves.start.clamp(0.0, 1.0);
        out.wind.gust_scale = out.wind.gust_scale.clamp(0.0, 1.0);
        out.wind.leaf_flutter = out.wind.leaf_flutter.clamp(0.0, 1.0);
        Ok(out)
    }

    /// Bark texture repeat scale as a vector.
    pub fn texture_scale(&self) -> Vec2 {
        Vec2::from_array(self.bark.texture_scale)
    }

    fn check_structure(&self) -> Result<(), ConfigError> {
        let b = &self.branch;
        let per_level = b.levels + 1;
        for (field, len) in [
            ("angle", b.angle.len()),
            ("start", b.start.len()),
            ("length", b.length.len()),
            ("radius", b.radius.len()),
            ("gnarliness", b.gnarliness.len()),
            ("taper", b.taper.len()),
            ("sections", b.sections.len()),
            ("segments", b.segments.len()),
        ] {
            if len != per_level {
                return Err(ConfigError::LevelArrayMismatch {
                    field,
                    expected: per_level,
                    actual: len,
                });
            }
        }
        if b.children.len() != b.levels {
            return Err(ConfigError::LevelArrayMismatch {
                field: "children",
                expected: b.levels,
                actual: b.children.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        TreeOptions::default().validate().expect("defaults must pass");
    }

    #[test]
    fn clamped_floors_tessellation() {
        let mut opts = TreeOptions::default();
        opts.branch.sections[1] = 2;
        opts.branch.segments[2] = 0;
        let fixed = opts.clamped().unwrap();
        assert_eq!(fixed.branch.sections[1], MIN_TESSELLATION);
        assert_eq!(fixed.branch.segments[2], MIN_TESSELLATION);
    }

    #[test]
    fn clamped_repairs_ranges_not_structure() {
        let mut opts = TreeOptions::default();
        opts.branch.taper[0] = 1.7;
        opts.branch.start[1] = -0.2;
        opts.branch.radius[2] = -1.0;
        let fixed = opts.clamped().unwrap();
        assert_eq!(fixed.branch.taper[0], 1.0);
        assert_eq!(fixed.branch.start[1], 0.0);
        assert!(fixed.branch.radius[2] > 0.0);

        opts.branch.length.pop();
        let err = opts.clamped().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LevelArrayMismatch { field: "length", .. }
        ));
    }

    #[test]
    fn children_length_is_per_parent_level() {
        let mut opts = TreeOptions::default();
        opts.branch.children.push(3);
        let err = opts.clamped().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LevelArrayMismatch {
                field: "children",
                expected: 2,
                actual: 3,
            }
        ));
    }

    #[test]
    fn validate_rejects_non_positive_dimensions() {
        let mut opts = TreeOptions::default();
        opts.branch.radius[1] = 0.0;
        assert!(matches!(
            opts.validate().unwrap_err(),
            ConfigError::NonPositive { field: "radius", .. }
        ));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let opts: TreeOptions =
            serde_json::from_str(r#"{ "seed": 7, "leaves": { "count": 3 } }"#).unwrap();
        assert_eq!(opts.seed, 7);
        assert_eq!(opts.leaves.count, 3);
        assert_eq!(opts.branch, BranchOptions::default());
    }

    #[test]
    fn enums_round_trip_lowercase() {
        assert_eq!(serde_json::to_string(&BarkType::Willow).unwrap(), r#""willow""#);
        let leaf: LeafType = serde_json::from_str(r#""aspen""#).unwrap();
        assert_eq!(leaf, LeafType::Aspen);
    }
}
