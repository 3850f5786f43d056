//! The narrow world interfaces an explosion consumes, and their
//! implementation for the reference [`voxblast_kernel::World`].

use glam::DVec3;
use voxblast_common::{Aabb, BlockPos, EntityId};
use voxblast_kernel::{
    Block, BlockRegistry, BlockTypeId, DamageCause, DamageResult, Effect, EntityData, ItemStack,
    Structure, World,
};

use crate::error::ExplosionError;

/// Paging state of the sub-chunk holding a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Loaded,
    Unloaded,
}

/// Per-block blast resistance.
pub trait ResistanceLookup {
    fn blast_resistance(&self, block: &Block) -> f32;
}

/// Read access to voxels.
pub trait VoxelQuery {
    fn chunk_status(&self, pos: BlockPos) -> ChunkStatus;

    /// `None` when the voxel's chunk is not loaded.
    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    fn is_air(&self, block: &Block) -> bool {
        block.is_air()
    }

    /// Whether the voxel blocks line of sight.
    fn is_solid(&self, pos: BlockPos) -> bool;

    /// Collision boxes of the voxel in world space.
    fn collision_boxes(&self, pos: BlockPos) -> Vec<Aabb>;

    /// Every block that must be destroyed together with `block`, itself included.
    fn affected_blocks(&self, block: &Block) -> Vec<Block>;

    /// Volatile blocks prime themselves instead of breaking.
    fn is_volatile(&self, block: &Block) -> bool;

    fn drops(&self, block: &Block) -> Vec<ItemStack>;

    fn has_tile(&self, pos: BlockPos) -> bool;
}

/// Write access to voxels and world-level side effects.
pub trait VoxelMutate {
    fn set_block_at(&mut self, pos: BlockPos, kind: BlockTypeId) -> Result<(), ExplosionError>;

    /// Start the delayed ignition of a volatile block.
    fn ignite_volatile(&mut self, block: &Block, fuse: u32) -> Result<(), ExplosionError>;

    fn drop_item(&mut self, at: DVec3, item: ItemStack);

    fn notify_tile_destroyed(&mut self, pos: BlockPos);

    fn emit_effect(&mut self, pos: BlockPos, effect: Effect);
}

/// Snapshot of the entity state the damage model reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub bounds: Aabb,
    pub position: DVec3,
    pub eye_position: DVec3,
    pub facing: DVec3,
    pub top_tier_armor: u32,
    /// Defensive stance (sneaking).
    pub blocking: bool,
    pub holds_blocking_item: bool,
    pub explosive: bool,
    pub underwater: bool,
}

impl From<&EntityData> for EntityView {
    fn from(data: &EntityData) -> Self {
        Self {
            bounds: data.bounding_box(),
            position: data.position,
            eye_position: data.eye_position(),
            facing: data.facing,
            top_tier_armor: data.top_tier_armor_count(),
            blocking: data.sneaking,
            holds_blocking_item: data.holds_shield(),
            explosive: data.is_explosive(),
            underwater: data.underwater,
        }
    }
}

/// A single damage request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub amount: f32,
    pub cause: DamageCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Applied,
    Cancelled,
}

/// Entity lookup and the cancellable damage interface.
pub trait EntityAccess {
    /// Entities whose bounds intersect `area`, minus `exclude`.
    fn nearby_entities(&self, area: &Aabb, exclude: Option<EntityId>) -> Vec<EntityId>;

    fn entity(&self, id: EntityId) -> Option<EntityView>;

    fn attack(&mut self, id: EntityId, hit: Hit) -> Result<DamageOutcome, ExplosionError>;

    fn add_velocity(&mut self, id: EntityId, delta: DVec3) -> Result<(), ExplosionError>;
}

/// Everything [`crate::Explosion::run`] needs from a world.
pub trait BlastWorld: ResistanceLookup + VoxelQuery + VoxelMutate + EntityAccess {}

impl<T: ResistanceLookup + VoxelQuery + VoxelMutate + EntityAccess> BlastWorld for T {}

// --- reference world ---

impl ResistanceLookup for BlockRegistry {
    fn blast_resistance(&self, block: &Block) -> f32 {
        BlockRegistry::blast_resistance(self, block.kind)
    }
}

impl ResistanceLookup for World {
    fn blast_resistance(&self, block: &Block) -> f32 {
        self.registry().blast_resistance(block.kind)
    }
}

impl VoxelQuery for World {
    fn chunk_status(&self, pos: BlockPos) -> ChunkStatus {
        if self.is_loaded(pos) {
            ChunkStatus::Loaded
        } else {
            ChunkStatus::Unloaded
        }
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        World::block_at(self, pos)
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.is_solid_at(pos)
    }

    fn collision_boxes(&self, pos: BlockPos) -> Vec<Aabb> {
        if self.is_solid_at(pos) {
            vec![Aabb::from_block(pos)]
        } else {
            Vec::new()
        }
    }

    fn affected_blocks(&self, block: &Block) -> Vec<Block> {
        let structure = self
            .registry()
            .get(block.kind)
            .map_or(Structure::Single, |t| t.structure);
        let partner = match structure {
            Structure::Single => None,
            Structure::LowerHalf => World::block_at(self, block.pos.up())
                .filter(|b| self.registry().get(b.kind).map(|t| t.structure) == Some(Structure::UpperHalf)),
            Structure::UpperHalf => World::block_at(self, block.pos.down())
                .filter(|b| self.registry().get(b.kind).map(|t| t.structure) == Some(Structure::LowerHalf)),
        };
        std::iter::once(*block).chain(partner).collect()
    }

    fn is_volatile(&self, block: &Block) -> bool {
        self.registry().get(block.kind).is_some_and(|t| t.volatile)
    }

    fn drops(&self, block: &Block) -> Vec<ItemStack> {
        self.registry()
            .get(block.kind)
            .map(|t| t.drops.clone())
            .unwrap_or_default()
    }

    fn has_tile(&self, pos: BlockPos) -> bool {
        self.tile(pos).is_some()
    }
}

impl VoxelMutate for World {
    fn set_block_at(&mut self, pos: BlockPos, kind: BlockTypeId) -> Result<(), ExplosionError> {
        self.set_block(pos, kind)?;
        Ok(())
    }

    fn ignite_volatile(&mut self, block: &Block, fuse: u32) -> Result<(), ExplosionError> {
        self.prime_explosive(block.pos, fuse)?;
        Ok(())
    }

    fn drop_item(&mut self, at: DVec3, item: ItemStack) {
        World::drop_item(self, at, item);
    }

    fn notify_tile_destroyed(&mut self, pos: BlockPos) {
        self.destroy_tile(pos);
    }

    fn emit_effect(&mut self, pos: BlockPos, effect: Effect) {
        World::emit_effect(self, pos, effect);
    }
}

impl EntityAccess for World {
    fn nearby_entities(&self, area: &Aabb, exclude: Option<EntityId>) -> Vec<EntityId> {
        self.entities_in(area, exclude)
    }

    fn entity(&self, id: EntityId) -> Option<EntityView> {
        self.get(id).map(EntityView::from)
    }

    fn attack(&mut self, id: EntityId, hit: Hit) -> Result<DamageOutcome, ExplosionError> {
        Ok(match self.damage(id, hit.amount, hit.cause)? {
            DamageResult::Applied => DamageOutcome::Applied,
            DamageResult::Cancelled => DamageOutcome::Cancelled,
        })
    }

    fn add_velocity(&mut self, id: EntityId, delta: DVec3) -> Result<(), ExplosionError> {
        World::add_velocity(self, id, delta)?;
        Ok(())
    }
}
