//! The tree instance: options in, animated geometry out.

use bevy::math::Vec3;

use crate::{
    mesh::{self, GenerationError, TreeGeometry},
    options::{ConfigError, TreeOptions},
    skeleton::{self, Skeleton},
    wind,
};

/// Any failure while turning options into geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    Config(ConfigError),
    Generation(GenerationError),
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::Config(e) => write!(f, "invalid tree configuration: {e}"),
            TreeError::Generation(e) => write!(f, "tree generation failed: {e}"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TreeError::Config(e) => Some(e),
            TreeError::Generation(e) => Some(e),
        }
    }
}

impl From<ConfigError> for TreeError {
    fn from(e: ConfigError) -> Self {
        TreeError::Config(e)
    }
}

impl From<GenerationError> for TreeError {
    fn from(e: GenerationError) -> Self {
        TreeError::Generation(e)
    }
}

/// One tree: configuration, generated skeleton/geometry, and a world
/// position for scene placement.
///
/// [`generate`](Tree::generate) is synchronous and idempotent-from-scratch —
/// calling it again rebuilds everything from the options; nothing is ever
/// partially regenerated.  [`update`](Tree::update) animates the stored rest
/// pose and is a no-op until the tree has been generated.
#[derive(Clone, Debug)]
pub struct Tree {
    options: TreeOptions,
    position: Vec3,
    skeleton: Option<Skeleton>,
    geometry: Option<TreeGeometry>,
}

impl Tree {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            position: Vec3::ZERO,
            skeleton: None,
            geometry: None,
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vec3::new(x, y, z);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Build the skeleton and emit geometry.  On error the tree keeps
    /// whatever state it had before the call.
    pub fn generate(&mut self) -> Result<(), TreeError> {
        let opts = self.options.clamped()?;
        let skeleton = skeleton::build(&opts)?;
        let geometry = mesh::emit(&skeleton, &opts)?;
        self.skeleton = Some(skeleton);
        self.geometry = Some(geometry);
        Ok(())
    }

    /// Displace the geometry for wind at `elapsed_seconds`.
    ///
    /// Always recomputes from the rest pose; repeated calls with the same
    /// time are identical and drift-free.  No-op before [`generate`].
    pub fn update(&mut self, elapsed_seconds: f32) {
        if let Some(geometry) = self.geometry.as_mut() {
            wind::apply(geometry, elapsed_seconds, &self.options.wind);
        }
    }

    pub fn is_generated(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn geometry(&self) -> Option<&TreeGeometry> {
        self.geometry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_before_generate_is_a_noop() {
        let mut tree = Tree::new(TreeOptions::default());
        tree.update(1.0);
        assert!(!tree.is_generated());
        assert!(tree.geometry().is_none());
    }

    #[test]
    fn generate_then_update() {
        let mut tree = Tree::new(TreeOptions::default());
        tree.generate().unwrap();
        assert!(tree.is_generated());
        let rest = tree.geometry().unwrap().branches.rest_positions.clone();
        tree.update(2.5);
        let geometry = tree.geometry().unwrap();
        assert_eq!(geometry.branches.rest_positions, rest);
        assert_ne!(geometry.branches.positions, rest);
    }

    #[test]
    fn regenerate_replaces_geometry_from_scratch() {
        let mut tree = Tree::new(TreeOptions::default());
        tree.generate().unwrap();
        tree.update(4.0);
        tree.generate().unwrap();
        let geometry = tree.geometry().unwrap();
        // Fresh rest pose, no leftover displacement.
        assert_eq!(geometry.branches.positions, geometry.branches.rest_positions);
    }

    #[test]
    fn structural_error_leaves_tree_ungenerated() {
        let mut options = TreeOptions::default();
        options.branch.radius.pop();
        let mut tree = Tree::new(options);
        assert!(matches!(tree.generate(), Err(TreeError::Config(_))));
        assert!(!tree.is_generated());
    }
}
