use glam::DVec3;
use voxblast_common::BlockPos;

use crate::world::VoxelQuery;

/// Result of a line-of-sight query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOfSight {
    Clear,
    /// The first voxel whose collision geometry cuts the segment.
    Blocked(BlockPos),
}

impl LineOfSight {
    pub fn is_clear(self) -> bool {
        self == Self::Clear
    }
}

fn step_sign(d: f64) -> i32 {
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

/// Parametric distance from `start` to the first grid boundary along one axis.
fn boundary(start: f64, dir: f64) -> f64 {
    if dir == 0.0 {
        return f64::MAX;
    }
    let (start, dir) = if dir < 0.0 {
        if start.floor() == start {
            return 0.0;
        }
        (-start, -dir)
    } else {
        (start, dir)
    };
    (1.0 - (start - start.floor())) / dir
}

/// Walks the voxels between `start` and `end` (Amanatides–Woo) and reports the
/// first solid voxel whose collision boxes intersect the segment.
pub fn line_of_sight<W: VoxelQuery + ?Sized>(world: &W, start: DVec3, end: DVec3) -> LineOfSight {
    let delta = end - start;
    let distance = delta.length();
    if distance == 0.0 {
        return LineOfSight::Clear;
    }
    let dir = delta / distance;

    let step = [step_sign(dir.x), step_sign(dir.y), step_sign(dir.z)];
    let mut t_max = [
        boundary(start.x, dir.x),
        boundary(start.y, dir.y),
        boundary(start.z, dir.z),
    ];
    let t_delta = [dir.x, dir.y, dir.z].map(|d| if d == 0.0 { 0.0 } else { 1.0 / d.abs() });

    let mut current = BlockPos::floored(start);
    loop {
        if world.is_solid(current)
            && world
                .collision_boxes(current)
                .iter()
                .any(|bb| bb.clip_segment(start, end).is_some())
        {
            return LineOfSight::Blocked(current);
        }

        let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
            0
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] > distance {
            return LineOfSight::Clear;
        }
        match axis {
            0 => current.x += step[0],
            1 => current.y += step[1],
            _ => current.z += step[2],
        }
        t_max[axis] += t_delta[axis];
    }
}
