use glam::DVec3;
use voxblast_common::BlockPos;
use voxblast_kernel::KernelError;

/// Errors from constructing or running an explosion.
#[derive(Debug, thiserror::Error)]
pub enum ExplosionError {
    #[error("explosion source must be finite, got {0}")]
    InvalidSource(DVec3),
    #[error("explosion radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("yield must be within [0, 100], got {0}")]
    YieldOutOfRange(f64),
    #[error("fire chance must be within [0, 1], got {0}")]
    FireChanceOutOfRange(f64),
    #[error("ray resolution must be at least 2, got {0}")]
    InvalidRayResolution(u32),
    #[error("ray step length must be positive and finite, got {0}")]
    InvalidStepLength(f64),
    #[error("world reported a loaded chunk at {pos} but returned no block")]
    InconsistentWorld { pos: BlockPos },
    #[error("world mutation failed: {0}")]
    World(#[from] KernelError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported options format: {0:?}")]
    UnsupportedFormat(String),
}
