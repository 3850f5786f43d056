//! World Kernel: authoritative voxel world state used by the explosion core.
//!
//! # Invariants
//! - All state mutations flow through explicit operations and are logged.
//! - Blocks can only be read or written inside loaded sub-chunks.
//! - Entity ids are allocated sequentially, so identical operation sequences
//!   produce identical worlds.

pub mod block;
pub mod chunk;
pub mod entity;
pub mod world;

pub use block::{Block, BlockRegistry, BlockType, BlockTypeId, Structure};
pub use chunk::{CHUNK_SIZE, ChunkCoord, SubChunk};
pub use entity::{ArmorTier, DamageCause, EntityData, EntityKind, ItemKind, ItemStack};
pub use world::{DamageResult, Effect, KernelError, TileState, World, WorldEvent};
