//! Shared value types used by the voxel world and the explosion core.
//!
//! # Invariants
//! - `BlockPos::hash_key` is injective inside the packed coordinate range.
//! - `Aabb` keeps `min <= max` on every axis when built through its constructors.

pub mod types;

pub use types::{Aabb, BlockPos, EntityId};
