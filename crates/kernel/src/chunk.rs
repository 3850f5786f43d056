use serde::{Deserialize, Serialize};
use voxblast_common::BlockPos;

use crate::block::BlockTypeId;

/// Edge length of a sub-chunk in voxels.
pub const CHUNK_SIZE: i32 = 16;
const VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Coordinate of a 16³ sub-chunk in the world grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The sub-chunk containing a voxel.
    pub fn containing(pos: BlockPos) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE),
            y: pos.y.div_euclid(CHUNK_SIZE),
            z: pos.z.div_euclid(CHUNK_SIZE),
        }
    }

    /// Lowest-corner voxel of this sub-chunk.
    pub fn origin(self) -> BlockPos {
        BlockPos::new(
            self.x * CHUNK_SIZE,
            self.y * CHUNK_SIZE,
            self.z * CHUNK_SIZE,
        )
    }
}

/// Dense block storage for one sub-chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubChunk {
    blocks: Vec<BlockTypeId>,
    non_air: usize,
}

impl SubChunk {
    /// A sub-chunk filled with air.
    pub fn empty() -> Self {
        Self {
            blocks: vec![BlockTypeId::AIR; VOLUME],
            non_air: 0,
        }
    }

    /// Index of a world voxel inside whichever sub-chunk contains it.
    fn index(pos: BlockPos) -> usize {
        let lx = pos.x.rem_euclid(CHUNK_SIZE) as usize;
        let ly = pos.y.rem_euclid(CHUNK_SIZE) as usize;
        let lz = pos.z.rem_euclid(CHUNK_SIZE) as usize;
        (ly * CHUNK_SIZE as usize + lz) * CHUNK_SIZE as usize + lx
    }

    pub fn get(&self, pos: BlockPos) -> BlockTypeId {
        self.blocks[Self::index(pos)]
    }

    /// Store a block, returning the previous one.
    pub fn set(&mut self, pos: BlockPos, kind: BlockTypeId) -> BlockTypeId {
        let slot = &mut self.blocks[Self::index(pos)];
        let old = std::mem::replace(slot, kind);
        match (old == BlockTypeId::AIR, kind == BlockTypeId::AIR) {
            (true, false) => self.non_air += 1,
            (false, true) => self.non_air -= 1,
            _ => {}
        }
        old
    }

    /// Number of non-air voxels.
    pub fn non_air_count(&self) -> usize {
        self.non_air
    }

    pub fn is_all_air(&self) -> bool {
        self.non_air == 0
    }

    /// Raw block ids in storage order (y, z, x).
    pub fn blocks(&self) -> &[BlockTypeId] {
        &self.blocks
    }
}

impl Default for SubChunk {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(
            ChunkCoord::containing(BlockPos::new(0, 15, 16)),
            ChunkCoord::new(0, 0, 1)
        );
        assert_eq!(
            ChunkCoord::containing(BlockPos::new(-1, -16, -17)),
            ChunkCoord::new(-1, -1, -2)
        );
    }

    #[test]
    fn origin_is_lowest_corner() {
        assert_eq!(ChunkCoord::new(-1, 2, 0).origin(), BlockPos::new(-16, 32, 0));
    }

    #[test]
    fn set_tracks_non_air_count() {
        let mut chunk = SubChunk::empty();
        assert!(chunk.is_all_air());

        let pos = BlockPos::new(3, 4, 5);
        assert_eq!(chunk.set(pos, BlockTypeId::STONE), BlockTypeId::AIR);
        assert_eq!(chunk.get(pos), BlockTypeId::STONE);
        assert_eq!(chunk.non_air_count(), 1);

        chunk.set(pos, BlockTypeId::DIRT);
        assert_eq!(chunk.non_air_count(), 1);

        chunk.set(pos, BlockTypeId::AIR);
        assert!(chunk.is_all_air());
    }

    #[test]
    fn local_index_wraps_per_chunk() {
        let mut chunk = SubChunk::empty();
        chunk.set(BlockPos::new(-1, 0, 0), BlockTypeId::STONE);
        // same local slot as (15, 0, 0)
        assert_eq!(chunk.get(BlockPos::new(15, 0, 0)), BlockTypeId::STONE);
    }
}
