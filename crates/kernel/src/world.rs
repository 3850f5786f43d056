use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use voxblast_common::{Aabb, BlockPos, EntityId};

use crate::block::{Block, BlockRegistry, BlockTypeId};
use crate::chunk::{ChunkCoord, SubChunk};
use crate::entity::{DamageCause, EntityData, ItemStack};

/// Errors from world operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("no loaded chunk at {0}")]
    ChunkNotLoaded(BlockPos),
    #[error("unknown block type {0:?}")]
    UnknownBlockType(BlockTypeId),
    #[error("entity {0:?} not found")]
    EntityNotFound(EntityId),
}

/// Ambient effects played at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    ExplosionParticle,
    ExplosionSound,
}

/// Outcome of a damage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageResult {
    Applied,
    Cancelled,
}

/// State attached to a block that carries a tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileState {
    pub contents: Vec<ItemStack>,
}

/// An event record produced by every mutation to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    ChunkLoaded {
        coord: ChunkCoord,
    },
    BlockChanged {
        pos: BlockPos,
        old: BlockTypeId,
        new: BlockTypeId,
    },
    TileDestroyed {
        pos: BlockPos,
    },
    ItemDropped {
        id: EntityId,
        at: DVec3,
        item: ItemStack,
    },
    FusePrimed {
        pos: BlockPos,
        id: EntityId,
        fuse: u32,
    },
    Spawned {
        id: EntityId,
    },
    Damaged {
        id: EntityId,
        amount: f32,
        cause: DamageCause,
    },
    DamageCancelled {
        id: EntityId,
        amount: f32,
    },
    VelocityChanged {
        id: EntityId,
        old: DVec3,
        new: DVec3,
    },
    EffectEmitted {
        pos: BlockPos,
        effect: Effect,
    },
}

/// The authoritative voxel world.
///
/// Blocks live in 16³ sub-chunks that must be loaded before use; entities
/// live in a BTreeMap for deterministic iteration. Every mutation is appended
/// to the event log.
#[derive(Debug, Clone, Default)]
pub struct World {
    registry: BlockRegistry,
    chunks: HashMap<ChunkCoord, SubChunk>,
    tiles: BTreeMap<BlockPos, TileState>,
    entities: BTreeMap<EntityId, EntityData>,
    next_entity: u128,
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world using the built-in block palette.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: BlockRegistry) -> Self {
        Self {
            registry,
            ..Default::default()
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    // --- Chunks ---

    /// Load a sub-chunk filled with air. Loading twice is a no-op.
    pub fn load_chunk(&mut self, coord: ChunkCoord) {
        if self.chunks.contains_key(&coord) {
            return;
        }
        tracing::trace!(?coord, "loading chunk");
        self.chunks.insert(coord, SubChunk::empty());
        self.event_log.push(WorldEvent::ChunkLoaded { coord });
    }

    /// Load every sub-chunk overlapping the inclusive voxel range.
    pub fn load_area(&mut self, a: BlockPos, b: BlockPos) {
        let lo = ChunkCoord::containing(BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)));
        let hi = ChunkCoord::containing(BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)));
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    self.load_chunk(ChunkCoord::new(x, y, z));
                }
            }
        }
    }

    pub fn unload_chunk(&mut self, coord: ChunkCoord) -> Option<SubChunk> {
        let chunk = self.chunks.remove(&coord)?;
        let origin = coord.origin();
        let size = crate::chunk::CHUNK_SIZE;
        self.tiles.retain(|pos, _| {
            !(pos.x >= origin.x
                && pos.x < origin.x + size
                && pos.y >= origin.y
                && pos.y < origin.y + size
                && pos.z >= origin.z
                && pos.z < origin.z + size)
        });
        Some(chunk)
    }

    pub fn is_loaded(&self, pos: BlockPos) -> bool {
        self.chunks.contains_key(&ChunkCoord::containing(pos))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    // --- Blocks ---

    /// Snapshot of the block at `pos`, or `None` if its chunk is not loaded.
    pub fn block_at(&self, pos: BlockPos) -> Option<Block> {
        self.chunks
            .get(&ChunkCoord::containing(pos))
            .map(|chunk| Block::new(pos, chunk.get(pos)))
    }

    /// Replace the block at `pos`. Returns the previous block type.
    pub fn set_block(&mut self, pos: BlockPos, kind: BlockTypeId) -> Result<BlockTypeId, KernelError> {
        let block_type = self
            .registry
            .get(kind)
            .ok_or(KernelError::UnknownBlockType(kind))?;
        let has_tile = block_type.has_tile;
        let chunk = self
            .chunks
            .get_mut(&ChunkCoord::containing(pos))
            .ok_or(KernelError::ChunkNotLoaded(pos))?;

        let old = chunk.set(pos, kind);
        if old != kind {
            if has_tile {
                self.tiles.insert(pos, TileState::default());
            } else {
                self.tiles.remove(&pos);
            }
            self.event_log
                .push(WorldEvent::BlockChanged { pos, old, new: kind });
        }
        Ok(old)
    }

    /// Fill the inclusive box between two corners.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, kind: BlockTypeId) -> Result<(), KernelError> {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.set_block(BlockPos::new(x, y, z), kind)?;
                }
            }
        }
        Ok(())
    }

    pub fn is_solid_at(&self, pos: BlockPos) -> bool {
        self.block_at(pos)
            .is_some_and(|b| self.registry.is_solid(b.kind))
    }

    // --- Tiles ---

    pub fn tile(&self, pos: BlockPos) -> Option<&TileState> {
        self.tiles.get(&pos)
    }

    pub fn tile_mut(&mut self, pos: BlockPos) -> Option<&mut TileState> {
        self.tiles.get_mut(&pos)
    }

    /// Tear down the tile at `pos`, spilling its contents at the block centre.
    /// Returns false if there was no tile.
    pub fn destroy_tile(&mut self, pos: BlockPos) -> bool {
        let Some(tile) = self.tiles.remove(&pos) else {
            return false;
        };
        self.event_log.push(WorldEvent::TileDestroyed { pos });
        for item in tile.contents {
            self.drop_item(pos.center(), item);
        }
        true
    }

    // --- Entities ---

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Read-only access to all entities (BTreeMap for deterministic iteration).
    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    /// Spawn an entity and return its id.
    pub fn spawn(&mut self, data: EntityData) -> EntityId {
        self.next_entity += 1;
        let id = EntityId(Uuid::from_u128(self.next_entity));
        self.spawn_with_id(id, data);
        id
    }

    /// Spawn an entity with a specific id.
    pub fn spawn_with_id(&mut self, id: EntityId, data: EntityData) {
        self.entities.insert(id, data);
        self.event_log.push(WorldEvent::Spawned { id });
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityData> {
        self.entities.get_mut(&id)
    }

    /// Entities whose bounding box intersects `area`, in id order.
    pub fn entities_in(&self, area: &Aabb, exclude: Option<EntityId>) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(_, data)| data.bounding_box().intersects(area))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Apply damage. Invulnerable entities cancel the hit.
    pub fn damage(
        &mut self,
        id: EntityId,
        amount: f32,
        cause: DamageCause,
    ) -> Result<DamageResult, KernelError> {
        let data = self
            .entities
            .get_mut(&id)
            .ok_or(KernelError::EntityNotFound(id))?;
        if data.invulnerable {
            self.event_log
                .push(WorldEvent::DamageCancelled { id, amount });
            return Ok(DamageResult::Cancelled);
        }
        data.health = (data.health - amount).max(0.0);
        self.event_log
            .push(WorldEvent::Damaged { id, amount, cause });
        Ok(DamageResult::Applied)
    }

    pub fn add_velocity(&mut self, id: EntityId, delta: DVec3) -> Result<(), KernelError> {
        let data = self
            .entities
            .get_mut(&id)
            .ok_or(KernelError::EntityNotFound(id))?;
        let old = data.velocity;
        data.velocity += delta;
        self.event_log.push(WorldEvent::VelocityChanged {
            id,
            old,
            new: data.velocity,
        });
        Ok(())
    }

    /// Spawn an item entity at `at`.
    pub fn drop_item(&mut self, at: DVec3, item: ItemStack) -> EntityId {
        let id = self.spawn(EntityData::item(at, item.clone()));
        self.event_log.push(WorldEvent::ItemDropped { id, at, item });
        id
    }

    /// Replace the block at `pos` with air and spawn a lit explosive in its place.
    pub fn prime_explosive(&mut self, pos: BlockPos, fuse: u32) -> Result<EntityId, KernelError> {
        self.set_block(pos, BlockTypeId::AIR)?;
        let feet = pos.as_dvec3() + DVec3::new(0.5, 0.0, 0.5);
        let id = self.spawn(EntityData::primed_explosive(feet, fuse));
        self.event_log.push(WorldEvent::FusePrimed { pos, id, fuse });
        Ok(id)
    }

    pub fn emit_effect(&mut self, pos: BlockPos, effect: Effect) {
        self.event_log.push(WorldEvent::EffectEmitted { pos, effect });
    }

    /// Compute a deterministic hash of blocks, tiles and entities.
    /// Chunks are visited in sorted coordinate order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };

        let mut coords: Vec<&ChunkCoord> = self.chunks.keys().collect();
        coords.sort();
        for coord in coords {
            mix(&mut h, &coord.x.to_le_bytes());
            mix(&mut h, &coord.y.to_le_bytes());
            mix(&mut h, &coord.z.to_le_bytes());
            for kind in self.chunks[coord].blocks() {
                mix(&mut h, &kind.0.to_le_bytes());
            }
        }
        for (pos, tile) in &self.tiles {
            mix(&mut h, &pos.hash_key().to_le_bytes());
            mix(&mut h, &(tile.contents.len() as u64).to_le_bytes());
        }
        for (id, data) in &self.entities {
            mix(&mut h, id.0.as_bytes());
            for v in [data.position, data.velocity] {
                mix(&mut h, &v.x.to_le_bytes());
                mix(&mut h, &v.y.to_le_bytes());
                mix(&mut h, &v.z.to_le_bytes());
            }
            mix(&mut h, &data.health.to_le_bytes());
        }
        h
    }
}
