use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

const XZ_BITS: u32 = 26;
const Y_BITS: u32 = 12;
const XZ_MASK: u64 = (1 << XZ_BITS) - 1;
const Y_MASK: u64 = (1 << Y_BITS) - 1;

/// Integer coordinate of a single voxel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel containing the given point.
    pub fn floored(v: DVec3) -> Self {
        Self {
            x: v.x.floor() as i32,
            y: v.y.floor() as i32,
            z: v.z.floor() as i32,
        }
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub const fn up(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub const fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Minimum corner of the voxel as a world-space point.
    pub fn as_dvec3(self) -> DVec3 {
        DVec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    pub fn center(self) -> DVec3 {
        self.as_dvec3() + DVec3::splat(0.5)
    }

    /// Packs the coordinate into a single 64-bit key.
    ///
    /// Layout: x in bits 38..64, y in bits 26..38, z in bits 0..26, each two's
    /// complement. Keys are unique for x and z in `[-2^25, 2^25)` and y in
    /// `[-2048, 2048)`.
    pub fn hash_key(self) -> u64 {
        ((self.x as u64 & XZ_MASK) << (XZ_BITS + Y_BITS))
            | ((self.y as u64 & Y_MASK) << XZ_BITS)
            | (self.z as u64 & XZ_MASK)
    }

    /// Inverse of [`BlockPos::hash_key`].
    pub fn from_hash_key(key: u64) -> Self {
        Self {
            x: sign_extend(key >> (XZ_BITS + Y_BITS), XZ_BITS),
            y: sign_extend((key >> XZ_BITS) & Y_MASK, Y_BITS),
            z: sign_extend(key & XZ_MASK, XZ_BITS),
        }
    }
}

fn sign_extend(value: u64, bits: u32) -> i32 {
    let shift = 64 - bits;
    (((value << shift) as i64) >> shift) as i32
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Build a box from two opposite corners in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The unit cube occupied by a voxel.
    pub fn from_block(pos: BlockPos) -> Self {
        let min = pos.as_dvec3();
        Self {
            min,
            max: min + DVec3::ONE,
        }
    }

    /// A box of the given width and height standing on `feet`.
    pub fn from_feet(feet: DVec3, width: f64, height: f64) -> Self {
        let half = width / 2.0;
        Self {
            min: DVec3::new(feet.x - half, feet.y, feet.z - half),
            max: DVec3::new(feet.x + half, feet.y + height, feet.z + half),
        }
    }

    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn expand_all(&self, amount: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(amount),
            max: self.max + DVec3::splat(amount),
        }
    }

    pub fn translate(&self, by: DVec3) -> Self {
        Self {
            min: self.min + by,
            max: self.max + by,
        }
    }

    /// Overlap test with open bounds: boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Strict containment: points on the boundary are outside.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.x > self.min.x
            && p.x < self.max.x
            && p.y > self.min.y
            && p.y < self.max.y
            && p.z > self.min.z
            && p.z < self.max.z
    }

    /// First point where the segment `start -> end` passes through the box
    /// interior, if any.
    ///
    /// A segment that merely grazes a face or ends exactly on one does not
    /// count as a hit. A segment starting inside the box hits at `start`.
    pub fn clip_segment(&self, start: DVec3, end: DVec3) -> Option<DVec3> {
        let delta = end - start;
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;

        for axis in 0..3 {
            let (s, d, lo, hi) = (start[axis], delta[axis], self.min[axis], self.max[axis]);
            if d == 0.0 {
                if s <= lo || s >= hi {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((lo - s) / d, (hi - s) / d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter >= t_exit {
                return None;
            }
        }

        Some(start + delta * t_enter)
    }
}
