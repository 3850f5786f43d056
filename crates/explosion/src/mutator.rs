use glam::DVec3;
use voxblast_common::BlockPos;
use voxblast_kernel::{BlockTypeId, Effect};

use crate::error::ExplosionError;
use crate::random::RandomSource;
use crate::tracer::BlockSet;
use crate::world::{ChunkStatus, VoxelMutate, VoxelQuery};

/// Fuse range, in ticks, for volatile blocks caught in a blast.
pub const FUSE_TICKS: (u32, u32) = (10, 30);

/// What a commit changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub destroyed: usize,
    pub primed: usize,
    pub drops: usize,
    pub fires: usize,
    pub skipped_unloaded: usize,
}

/// Applies the negotiated candidate sets to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMutator {
    pub source: DVec3,
    /// Drop probability in percent.
    pub yield_percent: f64,
}

impl WorldMutator {
    pub fn new(source: DVec3, yield_percent: f64) -> Self {
        Self {
            source,
            yield_percent,
        }
    }

    /// Destroy `affected`, then place fire at `ignitions`, then emit effects.
    pub fn commit<W: VoxelQuery + VoxelMutate + ?Sized>(
        &self,
        world: &mut W,
        affected: &BlockSet,
        ignitions: &BlockSet,
        rng: &mut dyn RandomSource,
    ) -> Result<CommitStats, ExplosionError> {
        let mut stats = CommitStats::default();

        for block in affected.iter() {
            let pos = block.pos;
            if world.chunk_status(pos) == ChunkStatus::Unloaded {
                tracing::debug!(%pos, "skipping block in unloaded chunk");
                stats.skipped_unloaded += 1;
                continue;
            }

            if world.is_volatile(block) {
                let fuse = rng.range_inclusive(FUSE_TICKS.0, FUSE_TICKS.1);
                world.ignite_volatile(block, fuse)?;
                stats.primed += 1;
                continue;
            }

            if rng.next_f64() * 100.0 < self.yield_percent {
                for item in world.drops(block) {
                    world.drop_item(pos.center(), item);
                    stats.drops += 1;
                }
            }
            if world.has_tile(pos) {
                world.notify_tile_destroyed(pos);
            }
            world.set_block_at(pos, BlockTypeId::AIR)?;
            stats.destroyed += 1;
        }

        for candidate in ignitions.iter() {
            let pos = candidate.pos;
            let Some(current) = world.block_at(pos) else {
                continue;
            };
            if world.is_air(&current) && world.is_solid(pos.up()) {
                world.set_block_at(pos, BlockTypeId::FIRE)?;
                stats.fires += 1;
            }
        }

        let at = BlockPos::floored(self.source);
        world.emit_effect(at, Effect::ExplosionParticle);
        world.emit_effect(at, Effect::ExplosionSound);

        tracing::debug!(?stats, "commit complete");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use voxblast_kernel::{Block, ItemKind, ItemStack, World, WorldEvent};

    fn world() -> World {
        let mut w = World::new();
        w.load_area(BlockPos::new(-16, -16, -16), BlockPos::new(15, 15, 15));
        w
    }

    fn set_of(w: &World, positions: &[BlockPos]) -> BlockSet {
        positions
            .iter()
            .filter_map(|pos| w.block_at(*pos))
            .collect()
    }

    #[test]
    fn destroys_blocks_and_emits_effects() {
        let mut w = world();
        let pos = BlockPos::new(1, 0, 0);
        w.set_block(pos, BlockTypeId::STONE).unwrap();
        let affected = set_of(&w, &[pos]);
        w.drain_events();

        let stats = WorldMutator::new(DVec3::new(0.5, 0.5, 0.5), 100.0)
            .commit(&mut w, &affected, &BlockSet::new(), &mut SeededRandom::seeded(1))
            .unwrap();

        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.drops, 1);
        assert!(w.block_at(pos).unwrap().is_air());
        let effects = w
            .events()
            .iter()
            .filter(|e| matches!(e, WorldEvent::EffectEmitted { .. }))
            .count();
        assert_eq!(effects, 2);
    }

    #[test]
    fn zero_yield_never_drops() {
        let mut w = world();
        w.fill(BlockPos::new(0, 0, 0), BlockPos::new(3, 3, 3), BlockTypeId::STONE)
            .unwrap();
        let before = w.entity_count();
        let affected: BlockSet = (0..4)
            .flat_map(|x| (0..4).map(move |y| BlockPos::new(x, y, 0)))
            .filter_map(|pos| w.block_at(pos))
            .collect();

        let stats = WorldMutator::new(DVec3::ZERO, 0.0)
            .commit(&mut w, &affected, &BlockSet::new(), &mut SeededRandom::seeded(9))
            .unwrap();

        assert_eq!(stats.destroyed, 16);
        assert_eq!(stats.drops, 0);
        assert_eq!(w.entity_count(), before);
        assert!(affected.iter().all(|b| w.block_at(b.pos).unwrap().is_air()));
    }

    #[test]
    fn volatile_blocks_are_primed_not_destroyed() {
        let mut w = world();
        let pos = BlockPos::new(2, 0, 0);
        w.set_block(pos, BlockTypeId::TNT).unwrap();
        let affected = set_of(&w, &[pos]);

        let stats = WorldMutator::new(DVec3::ZERO, 100.0)
            .commit(&mut w, &affected, &BlockSet::new(), &mut SeededRandom::seeded(3))
            .unwrap();

        assert_eq!(stats.primed, 1);
        assert_eq!(stats.destroyed, 0);
        assert_eq!(stats.drops, 0);
        let fuse = w.events().iter().find_map(|e| match e {
            WorldEvent::FusePrimed { fuse, .. } => Some(*fuse),
            _ => None,
        });
        assert!(fuse.is_some_and(|f| (10..=30).contains(&f)));
    }

    #[test]
    fn tile_is_notified_before_air_replacement() {
        let mut w = world();
        let pos = BlockPos::new(0, 1, 0);
        w.set_block(pos, BlockTypeId::CHEST).unwrap();
        w.tile_mut(pos)
            .unwrap()
            .contents
            .push(ItemStack::new(ItemKind::Misc("coal".into()), 8));
        let affected = set_of(&w, &[pos]);
        w.drain_events();

        WorldMutator::new(DVec3::ZERO, 0.0)
            .commit(&mut w, &affected, &BlockSet::new(), &mut SeededRandom::seeded(4))
            .unwrap();

        let events = w.events();
        let tile_at = events
            .iter()
            .position(|e| matches!(e, WorldEvent::TileDestroyed { .. }))
            .unwrap();
        let air_at = events
            .iter()
            .position(|e| matches!(e, WorldEvent::BlockChanged { new, .. } if *new == BlockTypeId::AIR))
            .unwrap();
        assert!(tile_at < air_at);
        // container contents spill even with zero yield
        assert_eq!(w.entity_count(), 1);
    }

    #[test]
    fn fire_needs_air_under_solid() {
        let mut w = world();
        let ceiling = BlockPos::new(0, 3, 0);
        w.set_block(ceiling, BlockTypeId::STONE).unwrap();
        let under_ceiling = Block::new(ceiling.down(), BlockTypeId::AIR);
        let open_air = Block::new(BlockPos::new(5, 0, 5), BlockTypeId::AIR);
        let ignitions: BlockSet = [under_ceiling, open_air].into_iter().collect();

        let stats = WorldMutator::new(DVec3::ZERO, 0.0)
            .commit(&mut w, &BlockSet::new(), &ignitions, &mut SeededRandom::seeded(5))
            .unwrap();

        assert_eq!(stats.fires, 1);
        assert_eq!(w.block_at(ceiling.down()).unwrap().kind, BlockTypeId::FIRE);
        assert!(w.block_at(open_air.pos).unwrap().is_air());
    }

    #[test]
    fn destroyed_voxel_can_catch_fire() {
        let mut w = world();
        let pos = BlockPos::new(0, 0, 0);
        w.set_block(pos, BlockTypeId::PLANKS).unwrap();
        w.set_block(pos.up(), BlockTypeId::STONE).unwrap();
        let affected = set_of(&w, &[pos]);
        let ignitions = affected.clone();

        let stats = WorldMutator::new(DVec3::ZERO, 0.0)
            .commit(&mut w, &affected, &ignitions, &mut SeededRandom::seeded(6))
            .unwrap();

        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.fires, 1);
        assert_eq!(w.block_at(pos).unwrap().kind, BlockTypeId::FIRE);
    }

    #[test]
    fn unloaded_blocks_are_skipped() {
        let mut w = world();
        let far = Block::new(BlockPos::new(100, 0, 0), BlockTypeId::STONE);
        let affected: BlockSet = [far].into_iter().collect();

        let stats = WorldMutator::new(DVec3::ZERO, 100.0)
            .commit(&mut w, &affected, &BlockSet::new(), &mut SeededRandom::seeded(7))
            .unwrap();
        assert_eq!(stats.skipped_unloaded, 1);
        assert_eq!(stats.destroyed, 0);
    }
}
