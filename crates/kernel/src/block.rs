use serde::{Deserialize, Serialize};
use voxblast_common::BlockPos;

use crate::entity::{ItemKind, ItemStack};

/// Index of a block type inside a [`BlockRegistry`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    pub const AIR: Self = Self(0);
    pub const FIRE: Self = Self(1);
    pub const STONE: Self = Self(2);
    pub const DIRT: Self = Self(3);
    pub const PLANKS: Self = Self(4);
    pub const TNT: Self = Self(5);
    pub const OBSIDIAN: Self = Self(6);
    pub const BEDROCK: Self = Self(7);
    pub const DOOR_LOWER: Self = Self(8);
    pub const DOOR_UPPER: Self = Self(9);
    pub const CHEST: Self = Self(10);
}

/// How a block participates in a multi-block structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    #[default]
    Single,
    /// Bottom half of a two-block-tall structure; its partner sits above.
    LowerHalf,
    /// Top half of a two-block-tall structure; its partner sits below.
    UpperHalf,
}

/// Static properties shared by every block of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockType {
    pub name: String,
    pub blast_resistance: f32,
    #[serde(default)]
    pub solid: bool,
    /// Primes itself instead of breaking when caught in an explosion.
    #[serde(default)]
    pub volatile: bool,
    /// Carries tile state (e.g. container contents).
    #[serde(default)]
    pub has_tile: bool,
    #[serde(default)]
    pub structure: Structure,
    #[serde(default)]
    pub drops: Vec<ItemStack>,
}

impl BlockType {
    pub fn new(name: impl Into<String>, blast_resistance: f32) -> Self {
        Self {
            name: name.into(),
            blast_resistance,
            solid: true,
            volatile: false,
            has_tile: false,
            structure: Structure::Single,
            drops: Vec::new(),
        }
    }

    fn passable(mut self) -> Self {
        self.solid = false;
        self
    }

    fn dropping(mut self, item: ItemKind) -> Self {
        self.drops.push(ItemStack::new(item, 1));
        self
    }
}

/// Snapshot of the block at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub pos: BlockPos,
    pub kind: BlockTypeId,
}

impl Block {
    pub fn new(pos: BlockPos, kind: BlockTypeId) -> Self {
        Self { pos, kind }
    }

    pub fn is_air(&self) -> bool {
        self.kind == BlockTypeId::AIR
    }
}

/// Table of block types, indexed by [`BlockTypeId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRegistry {
    types: Vec<BlockType>,
}

impl BlockRegistry {
    /// Registry holding only air and fire, the two types the world relies on.
    pub fn minimal() -> Self {
        Self {
            types: vec![
                BlockType::new("air", 0.0).passable(),
                BlockType::new("fire", 0.0).passable(),
            ],
        }
    }

    /// The built-in palette. Ids match the constants on [`BlockTypeId`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::minimal();
        let id = |n: u16| ItemKind::Block(BlockTypeId(n));

        registry.register(BlockType::new("stone", 6.0).dropping(id(2)));
        registry.register(BlockType::new("dirt", 0.5).dropping(id(3)));
        registry.register(BlockType::new("planks", 3.0).dropping(id(4)));

        let mut tnt = BlockType::new("tnt", 0.0).dropping(id(5));
        tnt.volatile = true;
        registry.register(tnt);

        registry.register(BlockType::new("obsidian", 1200.0).dropping(id(6)));
        registry.register(BlockType::new("bedrock", 3_600_000.0));

        let mut lower = BlockType::new("door_lower", 3.0).dropping(id(8));
        lower.structure = Structure::LowerHalf;
        registry.register(lower);
        let mut upper = BlockType::new("door_upper", 3.0);
        upper.structure = Structure::UpperHalf;
        registry.register(upper);

        let mut chest = BlockType::new("chest", 2.5).dropping(id(10));
        chest.has_tile = true;
        registry.register(chest);

        registry
    }

    /// Add a block type and return its id.
    pub fn register(&mut self, block_type: BlockType) -> BlockTypeId {
        let id = BlockTypeId(self.types.len() as u16);
        tracing::debug!(name = %block_type.name, id = id.0, "registered block type");
        self.types.push(block_type);
        id
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&BlockType> {
        self.types.get(usize::from(id.0))
    }

    pub fn by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| BlockTypeId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn blast_resistance(&self, id: BlockTypeId) -> f32 {
        self.get(id).map_or(0.0, |t| t.blast_resistance)
    }

    pub fn is_solid(&self, id: BlockTypeId) -> bool {
        self.get(id).is_some_and(|t| t.solid)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
