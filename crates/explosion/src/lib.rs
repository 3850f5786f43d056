//! Volumetric explosions in a chunked voxel world.
//!
//! An [`Explosion`] runs in one synchronous call: a pre-explosion gate,
//! ray tracing, a post-trace gate, entity damage and finally the world commit.
//! Either gate may cancel, in which case nothing in the world changes.
//!
//! # Invariants
//! - Radius is positive and yield stays within `[0, 100]` at every observation point.
//! - Affected and ignition sets never hold two records for the same voxel.
//! - Given the same seed and world contents, runs produce identical sets.
//! - Blocks below the minimum height are never destroyed.

pub mod damage;
pub mod error;
pub mod explosion;
pub mod los;
pub mod mutator;
pub mod negotiation;
pub mod options;
pub mod random;
pub mod tracer;
pub mod world;

pub use damage::{DamageReport, EntityDamageModel};
pub use error::ExplosionError;
pub use explosion::{Causer, Explosion, ExplosionOutcome, ExplosionSummary, Phase};
pub use los::{LineOfSight, line_of_sight};
pub use mutator::{CommitStats, WorldMutator};
pub use negotiation::{
    Cancellable, Dispatcher, EventPriority, ExplosionObserver, NoObservers, ObserverRegistry,
    PostExplosionContext, PostHook, PreExplosionContext, PreHook, Verdict,
};
pub use options::ExplosionOptions;
pub use random::{RandomSource, RngSource, SeededRandom};
pub use tracer::{BlockSet, TraceStats, VoxelRayTracer, ray_count};
pub use world::{BlastWorld, ChunkStatus, EntityAccess, ResistanceLookup, VoxelMutate, VoxelQuery};
