use glam::DVec3;
use serde::{Deserialize, Serialize};
use voxblast_common::{Aabb, BlockPos, EntityId};

use crate::block::BlockTypeId;

/// Material class of an armor piece, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorTier {
    Leather,
    Gold,
    Chainmail,
    Iron,
    Diamond,
    Netherite,
}

impl ArmorTier {
    pub fn is_top_tier(self) -> bool {
        self == Self::Netherite
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Block(BlockTypeId),
    Armor(ArmorTier),
    Shield,
    Misc(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub count: u32,
}

impl ItemStack {
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self { kind, count }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Mob,
    /// A lit explosive counting down its fuse.
    PrimedExplosive { fuse: u32 },
    /// An item lying on the ground.
    Item(ItemStack),
}

/// What dealt a hit, for attribution by damage handlers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageCause {
    EntityExplosion { by: EntityId },
    /// `by` is `None` when the explosion has no attributable source.
    BlockExplosion { by: Option<BlockPos> },
}

/// Per-entity data stored in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub kind: EntityKind,
    /// Feet position.
    pub position: DVec3,
    pub velocity: DVec3,
    pub width: f64,
    pub height: f64,
    pub eye_height: f64,
    /// Look direction, not necessarily normalized.
    pub facing: DVec3,
    pub health: f32,
    pub armor: Vec<ItemStack>,
    pub held: Option<ItemStack>,
    pub sneaking: bool,
    pub underwater: bool,
    /// Rejects all damage; hits against it are reported as cancelled.
    pub invulnerable: bool,
}

impl EntityData {
    fn base(kind: EntityKind, position: DVec3, width: f64, height: f64) -> Self {
        Self {
            kind,
            position,
            velocity: DVec3::ZERO,
            width,
            height,
            eye_height: height * 0.85,
            facing: DVec3::Z,
            health: 20.0,
            armor: Vec::new(),
            held: None,
            sneaking: false,
            underwater: false,
            invulnerable: false,
        }
    }

    pub fn player(position: DVec3) -> Self {
        let mut data = Self::base(EntityKind::Player, position, 0.6, 1.8);
        data.eye_height = 1.62;
        data
    }

    pub fn mob(position: DVec3, width: f64, height: f64) -> Self {
        Self::base(EntityKind::Mob, position, width, height)
    }

    pub fn primed_explosive(position: DVec3, fuse: u32) -> Self {
        let mut data = Self::base(EntityKind::PrimedExplosive { fuse }, position, 0.98, 0.98);
        data.eye_height = 0.15;
        data
    }

    pub fn item(position: DVec3, stack: ItemStack) -> Self {
        let mut data = Self::base(EntityKind::Item(stack), position, 0.25, 0.25);
        data.health = 5.0;
        data
    }

    pub fn with_armor(mut self, armor: Vec<ItemStack>) -> Self {
        self.armor = armor;
        self
    }

    pub fn holding(mut self, item: ItemStack) -> Self {
        self.held = Some(item);
        self
    }

    pub fn facing(mut self, direction: DVec3) -> Self {
        self.facing = direction;
        self
    }

    pub fn sneaking(mut self, sneaking: bool) -> Self {
        self.sneaking = sneaking;
        self
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_feet(self.position, self.width, self.height)
    }

    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }

    pub fn is_explosive(&self) -> bool {
        matches!(self.kind, EntityKind::PrimedExplosive { .. })
    }

    pub fn holds_shield(&self) -> bool {
        matches!(
            self.held,
            Some(ItemStack {
                kind: ItemKind::Shield,
                ..
            })
        )
    }

    /// Worn armor pieces of the highest tier.
    pub fn top_tier_armor_count(&self) -> u32 {
        self.armor
            .iter()
            .filter(|stack| matches!(stack.kind, ItemKind::Armor(tier) if tier.is_top_tier()))
            .count() as u32
    }
}
