//! `forest` — plants a scattered forest of randomized trees and lets the
//! wind sway them.
//!
//! Run with:
//!   cargo run --example forest

use bevy::prelude::*;
use bevy_sylva_tree::{
    SylvaTreePlugin,
    async_gen::{PendingTree, TreeReady, TreeSway},
    forest::random_options,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const TREE_COUNT: usize = 15;
const SPREAD: f32 = 40.0;
const CLEARING: f32 = 12.0;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "bevy_sylva_tree — forest".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SylvaTreePlugin)
        .add_systems(Startup, setup_scene)
        .add_systems(Update, attach_ready_trees)
        .run();
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 18.0, 45.0).looking_at(Vec3::new(0.0, 8.0, 0.0), Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 12_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(50.0, 50.0, 50.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(200.0, 200.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.18, 0.31, 0.09),
            perceptual_roughness: 1.0,
            ..default()
        })),
    ));

    let mut rng = StdRng::seed_from_u64(2025);
    for _ in 0..TREE_COUNT {
        let x = (rng.random::<f32>() - 0.5) * 2.0 * SPREAD;
        let z = (rng.random::<f32>() - 0.5) * 2.0 * SPREAD;
        if (x * x + z * z).sqrt() < CLEARING {
            continue;
        }
        commands.spawn(PendingTree::new(
            random_options(&mut rng),
            Vec3::new(x, 0.0, z),
        ));
    }
}

/// Once a tree's meshes are uploaded, give its entity a transform and
/// spawn the bark/leaf mesh children with tinted materials.
fn attach_ready_trees(
    mut commands: Commands,
    ready: Query<(Entity, &TreeReady, &TreeSway)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut shown: Local<Vec<Entity>>,
) {
    for (entity, meshes, sway) in &ready {
        if shown.contains(&entity) {
            continue;
        }
        shown.push(entity);

        let geometry = sway.0.geometry().expect("ready tree has geometry");
        let bark = materials.add(StandardMaterial {
            base_color: Color::linear_rgb(
                geometry.bark_tint[0],
                geometry.bark_tint[1],
                geometry.bark_tint[2],
            ),
            perceptual_roughness: 0.95,
            ..default()
        });
        let leaves = materials.add(StandardMaterial {
            base_color: Color::linear_rgb(
                geometry.leaf_tint[0],
                geometry.leaf_tint[1],
                geometry.leaf_tint[2],
            ),
            perceptual_roughness: 0.8,
            double_sided: true,
            cull_mode: None,
            ..default()
        });

        commands
            .entity(entity)
            .insert((
                Transform::from_translation(sway.0.position()),
                Visibility::default(),
            ))
            .with_children(|parent| {
                parent.spawn((Mesh3d(meshes.0.branches.clone()), MeshMaterial3d(bark)));
                parent.spawn((Mesh3d(meshes.0.leaves.clone()), MeshMaterial3d(leaves)));
            });

        info!("tree ready at {}", sway.0.position());
    }
}
