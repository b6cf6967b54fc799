//! Async tree generation and per-frame wind animation systems.
//!
//! Generation (skeleton build + mesh emission) is CPU-bound and can take
//! tens of milliseconds for a large tree, so it runs on a private, bounded
//! [`rayon`] thread pool instead of the main thread.  The pool caps
//! concurrency at [`MAX_GENERATION_THREADS`]; excess requests queue inside
//! the pool rather than spawning unbounded OS threads.  When a task finishes
//! the geometry is uploaded to [`Assets<Mesh>`] and the entity receives
//! [`TreeReady`] plus a [`TreeSway`] component that drives the wind.
//!
//! # Usage
//! ```rust,ignore
//! commands.spawn(PendingTree::new(PresetLibrary::builtin()?.load("Oak Medium"),
//!                                 Vec3::new(4.0, 0.0, -7.0)));
//! // Later, query for TreeReady to attach materials and spawn Mesh3d.
//! ```

/// Maximum number of tree generation tasks that run concurrently.
const MAX_GENERATION_THREADS: usize = 4;

/// Returns the library-private rayon thread pool used for tree generation.
///
/// Isolated from the application's global rayon pool so generation bursts
/// (e.g. planting a whole forest at startup) do not starve unrelated
/// parallel workloads.
fn gen_pool() -> &'static rayon::ThreadPool {
    static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(MAX_GENERATION_THREADS)
            .thread_name(|i| format!("tree-gen-{i}"))
            .build()
            .expect("failed to build tree generation thread pool")
    })
}

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
    mpsc,
};

use bevy::{
    asset::Assets,
    ecs::{
        component::Component,
        entity::Entity,
        system::{Commands, Query, Res, ResMut},
    },
    math::Vec3,
    mesh::Mesh,
    time::Time,
};

use crate::{
    mesh::{TreeMeshes, geometry_to_meshes, write_positions},
    options::TreeOptions,
    tree::{Tree, TreeError},
};

/// Spawned onto an entity to request background tree generation.
///
/// Dropping `PendingTree` (e.g. when the entity is despawned) sets an atomic
/// cancellation flag; queued tasks that have not yet started see the flag
/// and exit without doing any work.
#[derive(Component)]
pub struct PendingTree {
    // Wrapped in Mutex so the struct is Sync, which Bevy's Component bound requires.
    pub(crate) rx: std::sync::Mutex<mpsc::Receiver<Result<Tree, TreeError>>>,
    /// Set to `true` on drop; the background task checks this before starting.
    cancelled: Arc<AtomicBool>,
}

impl Drop for PendingTree {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl PendingTree {
    /// Queue generation of one tree at `position`.
    pub fn new(options: TreeOptions, position: Vec3) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::sync_channel(1);
        gen_pool().spawn(move || {
            if !flag.load(Ordering::Relaxed) {
                let mut tree = Tree::new(options);
                tree.set_position(position.x, position.y, position.z);
                let result = tree.generate().map(|()| tree);
                tx.send(result).ok();
            }
        });
        PendingTree {
            rx: std::sync::Mutex::new(rx),
            cancelled,
        }
    }
}

/// Added by [`poll_tree_tasks`] when generation is complete and uploaded.
#[derive(Component)]
pub struct TreeReady(pub TreeMeshes);

/// CPU-side tree kept alive for wind animation write-back.
#[derive(Component)]
pub struct TreeSway(pub Tree);

/// Bevy system — polls pending generation tasks and uploads finished trees.
pub fn poll_tree_tasks(
    mut commands: Commands,
    tasks: Query<(Entity, &PendingTree)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, pending) in &tasks {
        let poll = pending
            .rx
            .lock()
            .expect("tree generation thread poisoned")
            .try_recv();
        match poll {
            Ok(Ok(tree)) => {
                let Some(geometry) = tree.geometry() else {
                    bevy::log::error!("generated tree arrived without geometry");
                    commands.entity(entity).remove::<PendingTree>();
                    continue;
                };
                let handles = geometry_to_meshes(geometry, &mut meshes);
                commands
                    .entity(entity)
                    .remove::<PendingTree>()
                    .insert((TreeReady(handles), TreeSway(tree)));
            }
            Ok(Err(e)) => {
                bevy::log::warn!("Tree generation failed, skipping: {e}");
                commands.entity(entity).remove::<PendingTree>();
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                bevy::log::error!("Tree generation thread panicked");
                commands.entity(entity).remove::<PendingTree>();
            }
            Err(mpsc::TryRecvError::Empty) => {}
        }
    }
}

/// Bevy system — advances wind sway and writes displaced positions back
/// into the uploaded meshes.  The CPU-side buffers are mutated in place;
/// nothing beyond the attribute upload is reallocated per frame.
pub fn animate_trees(
    time: Res<Time>,
    mut swaying: Query<(&mut TreeSway, &TreeReady)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let elapsed = time.elapsed_secs();
    for (mut sway, ready) in &mut swaying {
        sway.0.update(elapsed);
        let Some(geometry) = sway.0.geometry() else { continue };
        if let Some(mesh) = meshes.get_mut(&ready.0.branches) {
            write_positions(&geometry.branches, mesh);
        }
        if let Some(mesh) = meshes.get_mut(&ready.0.leaves) {
            write_positions(&geometry.leaves, mesh);
        }
    }
}
