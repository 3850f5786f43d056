use glam::DVec3;
use std::collections::BTreeMap;
use voxblast_common::BlockPos;
use voxblast_kernel::Block;

use crate::error::ExplosionError;
use crate::random::RandomSource;
use crate::world::{ChunkStatus, ResistanceLookup, VoxelQuery};

/// Block snapshots keyed by [`BlockPos::hash_key`]. Inserting a position twice
/// keeps the first snapshot.
///
/// Iteration follows key order, so consumers that roll dice per block stay
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    blocks: BTreeMap<u64, Block>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the position was already present.
    pub fn insert(&mut self, block: Block) -> bool {
        let key = block.pos.hash_key();
        if self.blocks.contains_key(&key) {
            return false;
        }
        self.blocks.insert(key, block);
        true
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos.hash_key())
    }

    pub fn get(&self, pos: BlockPos) -> Option<&Block> {
        self.blocks.get(&pos.hash_key())
    }

    pub fn remove(&mut self, pos: BlockPos) -> Option<Block> {
        self.blocks.remove(&pos.hash_key())
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Block) -> bool) {
        self.blocks.retain(|_, block| keep(block));
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.keys().copied()
    }
}

impl FromIterator<Block> for BlockSet {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Block> for BlockSet {
    fn extend<I: IntoIterator<Item = Block>>(&mut self, iter: I) {
        for block in iter {
            self.insert(block);
        }
    }
}

impl IntoIterator for BlockSet {
    type Item = Block;
    type IntoIter = std::collections::btree_map::IntoValues<u64, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_values()
    }
}

/// Inputs of a single trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceParams {
    pub source: DVec3,
    pub radius: f64,
    pub ray_resolution: u32,
    pub step_length: f64,
    pub fire_chance: f64,
    pub block_breaking: bool,
    pub min_height: i32,
}

/// Counters gathered while tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub rays: usize,
    pub steps: usize,
    pub skipped_unloaded: usize,
}

/// Raw candidate sets produced by tracing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceResult {
    pub affected: BlockSet,
    pub ignitions: BlockSet,
    pub stats: TraceStats,
}

/// Number of rays cast for a resolution: the surface of an `r³` cube.
pub fn ray_count(resolution: u32) -> usize {
    let r = resolution as usize;
    if r < 2 {
        return r;
    }
    r.pow(3) - (r - 2).pow(3)
}

/// Unit directions on the surface of the sampling cube, in `(i, j, k)` order.
pub fn ray_directions(resolution: u32) -> Vec<DVec3> {
    if resolution < 2 {
        return Vec::new();
    }
    let last = resolution - 1;
    let scale = |n: u32| f64::from(n) / f64::from(last) * 2.0 - 1.0;

    let mut dirs = Vec::with_capacity(ray_count(resolution));
    for i in 0..resolution {
        for j in 0..resolution {
            for k in 0..resolution {
                let on_surface = i == 0 || i == last || j == 0 || j == last || k == 0 || k == last;
                if on_surface {
                    dirs.push(DVec3::new(scale(i), scale(j), scale(k)).normalize());
                }
            }
        }
    }
    dirs
}

/// Marches rays outward from the source and collects the blocks they break
/// and the voxels that may catch fire.
pub struct VoxelRayTracer<'r, R: ?Sized> {
    resistance: &'r R,
}

impl<'r, R: ResistanceLookup + ?Sized> VoxelRayTracer<'r, R> {
    pub fn new(resistance: &'r R) -> Self {
        Self { resistance }
    }

    pub fn trace<W: VoxelQuery + ?Sized>(
        &self,
        world: &W,
        params: &TraceParams,
        rng: &mut dyn RandomSource,
    ) -> Result<TraceResult, ExplosionError> {
        let mut result = TraceResult::default();
        let incendiary = params.fire_chance > 0.0;
        let step = params.step_length;

        for dir in ray_directions(params.ray_resolution) {
            result.stats.rays += 1;
            let shift = dir * step;
            let mut pointer = params.source;
            let mut energy = params.radius * (0.7 + rng.next_f64() * 0.6);

            while energy > 0.0 {
                let pos = BlockPos::floored(pointer);
                pointer += shift;
                result.stats.steps += 1;

                if world.chunk_status(pos) == ChunkStatus::Unloaded {
                    result.stats.skipped_unloaded += 1;
                    energy -= step * 0.75;
                    continue;
                }

                let block = world
                    .block_at(pos)
                    .ok_or(ExplosionError::InconsistentWorld { pos })?;

                if !world.is_air(&block) {
                    let resistance = f64::from(self.resistance.blast_resistance(&block));
                    energy -= (resistance / 5.0 + 0.3) * step;

                    if params.block_breaking
                        && energy > 0.0
                        && pos.y >= params.min_height
                        && !result.affected.contains(pos)
                    {
                        result.affected.extend(world.affected_blocks(&block));
                    }

                    if incendiary && rng.next_f64() < params.fire_chance {
                        result.ignitions.insert(block);
                    }
                }

                energy -= step * 0.75;
            }
        }

        tracing::debug!(
            rays = result.stats.rays,
            steps = result.stats.steps,
            skipped = result.stats.skipped_unloaded,
            affected = result.affected.len(),
            ignitions = result.ignitions.len(),
            "trace complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use voxblast_kernel::{BlockTypeId, World};

    fn params(source: DVec3, radius: f64) -> TraceParams {
        TraceParams {
            source,
            radius,
            ray_resolution: 16,
            step_length: 0.3,
            fire_chance: 0.0,
            block_breaking: true,
            min_height: i32::MIN,
        }
    }

    fn stone_world() -> World {
        let mut w = World::new();
        w.load_area(BlockPos::new(-16, -16, -16), BlockPos::new(15, 15, 15));
        w.fill(BlockPos::new(-6, -6, -6), BlockPos::new(6, -1, 6), BlockTypeId::DIRT)
            .unwrap();
        w
    }

    /// Fixed-value source for geometry-only tests.
    struct Constant(f64);

    impl RandomSource for Constant {
        fn next_f64(&mut self) -> f64 {
            self.0
        }

        fn range_inclusive(&mut self, lo: u32, _hi: u32) -> u32 {
            lo
        }
    }

    #[test]
    fn ray_count_is_cube_surface() {
        assert_eq!(ray_count(16), 1352);
        assert_eq!(ray_count(2), 8);
        assert_eq!(ray_count(3), 26);
        for r in [2, 3, 5, 16] {
            assert_eq!(ray_directions(r).len(), ray_count(r));
        }
    }

    #[test]
    fn directions_are_unit_length() {
        for dir in ray_directions(16) {
            assert!((dir.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn trace_casts_every_ray() {
        let w = World::new();
        let tracer = VoxelRayTracer::new(w.registry());
        let result = tracer
            .trace(&w, &params(DVec3::splat(0.5), 4.0), &mut Constant(0.5))
            .unwrap();
        assert_eq!(result.stats.rays, 1352);
        assert!(result.affected.is_empty());
        // nothing is loaded
        assert_eq!(result.stats.skipped_unloaded, result.stats.steps);
    }

    #[test]
    fn breaks_blocks_near_the_source() {
        let w = stone_world();
        let tracer = VoxelRayTracer::new(w.registry());
        let result = tracer
            .trace(&w, &params(DVec3::new(0.5, 0.5, 0.5), 4.0), &mut SeededRandom::seeded(1))
            .unwrap();

        assert!(result.affected.contains(BlockPos::new(0, -1, 0)));
        assert!(!result.affected.contains(BlockPos::new(0, -6, 0)));
        assert!(result.affected.iter().all(|b| b.kind == BlockTypeId::DIRT));
        assert!(result.ignitions.is_empty());
    }

    #[test]
    fn energy_spent_to_exactly_zero_breaks_nothing() {
        let mut w = World::new();
        w.load_area(BlockPos::new(-16, -16, -16), BlockPos::new(15, 15, 15));
        w.set_block(BlockPos::new(0, 0, 0), BlockTypeId::DIRT).unwrap();
        let tracer = VoxelRayTracer::new(w.registry());

        // Constant(0.5) makes the starting energy exactly the radius.
        let cost = (f64::from(w.registry().blast_resistance(BlockTypeId::DIRT)) / 5.0 + 0.3) * 0.3;
        let spent = tracer
            .trace(&w, &params(DVec3::splat(0.5), cost), &mut Constant(0.5))
            .unwrap();
        assert!(spent.affected.is_empty());
        assert_eq!(spent.stats.steps, spent.stats.rays);

        let spare = tracer
            .trace(&w, &params(DVec3::splat(0.5), cost * 1.01), &mut Constant(0.5))
            .unwrap();
        assert!(spare.affected.contains(BlockPos::new(0, 0, 0)));
    }

    #[test]
    fn rays_cross_unloaded_gaps() {
        let mut w = World::new();
        w.load_area(BlockPos::new(16, -16, -16), BlockPos::new(31, 15, 15));
        w.set_block(BlockPos::new(16, 0, 0), BlockTypeId::DIRT).unwrap();
        let tracer = VoxelRayTracer::new(w.registry());

        let result = tracer
            .trace(&w, &params(DVec3::new(13.5, 0.5, 0.5), 6.0), &mut Constant(0.5))
            .unwrap();
        assert!(result.stats.skipped_unloaded > 0);
        assert!(result.affected.contains(BlockPos::new(16, 0, 0)));
    }

    #[test]
    fn resistant_block_stops_the_ray() {
        let mut w = World::new();
        w.load_area(BlockPos::new(-16, -16, -16), BlockPos::new(15, 15, 15));
        // dirt directly below, obsidian below that
        w.set_block(BlockPos::new(0, -1, 0), BlockTypeId::DIRT).unwrap();
        w.set_block(BlockPos::new(0, -2, 0), BlockTypeId::OBSIDIAN).unwrap();

        let tracer = VoxelRayTracer::new(w.registry());
        let result = tracer
            .trace(&w, &params(DVec3::new(0.5, 0.5, 0.5), 4.0), &mut Constant(0.5))
            .unwrap();

        assert!(result.affected.contains(BlockPos::new(0, -1, 0)));
        assert!(!result.affected.contains(BlockPos::new(0, -2, 0)));
    }

    #[test]
    fn min_height_is_inclusive() {
        let w = stone_world();
        let tracer = VoxelRayTracer::new(w.registry());
        let p = TraceParams {
            min_height: -1,
            ..params(DVec3::new(0.5, 0.5, 0.5), 4.0)
        };
        let result = tracer.trace(&w, &p, &mut Constant(0.5)).unwrap();

        assert!(!result.affected.is_empty());
        assert!(result.affected.iter().all(|b| b.pos.y >= -1));
    }

    #[test]
    fn block_breaking_off_still_rolls_fire() {
        let w = stone_world();
        let tracer = VoxelRayTracer::new(w.registry());
        let p = TraceParams {
            block_breaking: false,
            fire_chance: 1.0,
            ..params(DVec3::new(0.5, 0.5, 0.5), 4.0)
        };
        let result = tracer.trace(&w, &p, &mut Constant(0.5)).unwrap();

        assert!(result.affected.is_empty());
        assert!(!result.ignitions.is_empty());
    }

    #[test]
    fn door_hit_by_many_rays_is_recorded_once_per_half() {
        let mut w = World::new();
        w.load_area(BlockPos::new(-16, -16, -16), BlockPos::new(15, 15, 15));
        let lower = BlockPos::new(1, 0, 0);
        let upper = BlockPos::new(1, 1, 0);
        w.set_block(lower, BlockTypeId::DOOR_LOWER).unwrap();
        w.set_block(upper, BlockTypeId::DOOR_UPPER).unwrap();

        let tracer = VoxelRayTracer::new(w.registry());
        let p = TraceParams {
            fire_chance: 1.0,
            ..params(DVec3::new(0.5, 0.5, 0.5), 3.0)
        };
        let result = tracer.trace(&w, &p, &mut Constant(0.5)).unwrap();

        assert_eq!(result.affected.len(), 2);
        assert_eq!(result.affected.get(lower).unwrap().kind, BlockTypeId::DOOR_LOWER);
        assert_eq!(result.affected.get(upper).unwrap().kind, BlockTypeId::DOOR_UPPER);
        assert_eq!(result.ignitions.len(), 2);
    }

    #[test]
    fn block_set_extend_keeps_first_snapshot() {
        let pos = BlockPos::new(1, 0, 0);
        let set: BlockSet = [
            Block::new(pos, BlockTypeId::DOOR_LOWER),
            Block::new(pos, BlockTypeId::AIR),
            Block::new(pos.up(), BlockTypeId::DOOR_UPPER),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(pos).unwrap().kind, BlockTypeId::DOOR_LOWER);
    }

    #[test]
    fn inconsistent_world_aborts() {
        struct Liar;
        impl VoxelQuery for Liar {
            fn chunk_status(&self, _: BlockPos) -> ChunkStatus {
                ChunkStatus::Loaded
            }
            fn block_at(&self, _: BlockPos) -> Option<Block> {
                None
            }
            fn is_solid(&self, _: BlockPos) -> bool {
                false
            }
            fn collision_boxes(&self, _: BlockPos) -> Vec<voxblast_common::Aabb> {
                Vec::new()
            }
            fn affected_blocks(&self, block: &Block) -> Vec<Block> {
                vec![*block]
            }
            fn is_volatile(&self, _: &Block) -> bool {
                false
            }
            fn drops(&self, _: &Block) -> Vec<voxblast_kernel::ItemStack> {
                Vec::new()
            }
            fn has_tile(&self, _: BlockPos) -> bool {
                false
            }
        }

        let registry = voxblast_kernel::BlockRegistry::minimal();
        let tracer = VoxelRayTracer::new(&registry);
        let err = tracer.trace(&Liar, &params(DVec3::ZERO, 2.0), &mut Constant(0.5));
        assert!(matches!(err, Err(ExplosionError::InconsistentWorld { .. })));
    }

    #[test]
    fn block_set_keeps_first_snapshot() {
        let pos = BlockPos::new(4, 5, 6);
        let mut set = BlockSet::new();
        assert!(set.insert(Block::new(pos, BlockTypeId::STONE)));
        assert!(!set.insert(Block::new(pos, BlockTypeId::DIRT)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(pos).unwrap().kind, BlockTypeId::STONE);
        assert!(set.remove(pos).is_some());
        assert!(set.is_empty());
    }
}
