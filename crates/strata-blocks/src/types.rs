use serde::{Deserialize, Serialize};

/// Material of a voxel. The set is closed; ids are stable and fit a byte,
/// which is also the on-disk encoding.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Water = 5,
    Ice = 6,
    Snow = 7,
    Gravel = 8,
    Wood = 9,
    Leaves = 10,
    Cactus = 11,
    Flower = 12,
    TallGrass = 13,
    Mud = 14,
    Lava = 15,
}

pub const BLOCK_TYPE_COUNT: usize = 16;

impl BlockType {
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Decodes a byte id; unknown ids read as `Air`.
    #[inline]
    pub const fn from_id(id: u8) -> BlockType {
        match id {
            1 => BlockType::Stone,
            2 => BlockType::Dirt,
            3 => BlockType::Grass,
            4 => BlockType::Sand,
            5 => BlockType::Water,
            6 => BlockType::Ice,
            7 => BlockType::Snow,
            8 => BlockType::Gravel,
            9 => BlockType::Wood,
            10 => BlockType::Leaves,
            11 => BlockType::Cactus,
            12 => BlockType::Flower,
            13 => BlockType::TallGrass,
            14 => BlockType::Mud,
            15 => BlockType::Lava,
            _ => BlockType::Air,
        }
    }

    /// Occupies its cell for collision and face-culling purposes.
    /// Fluids and cross-model plants do not.
    #[inline]
    pub const fn is_solid(self) -> bool {
        !matches!(
            self,
            BlockType::Air | BlockType::Water | BlockType::Flower | BlockType::TallGrass
        )
    }

    /// Fully hides faces behind it. Opaque implies solid; ice and leaves are
    /// solid but see-through.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.is_solid() && !matches!(self, BlockType::Ice | BlockType::Leaves)
    }

    #[inline]
    pub const fn is_water(self) -> bool {
        matches!(self, BlockType::Water)
    }

    /// Rendered with alpha: fluids, ice, foliage.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        matches!(
            self,
            BlockType::Water
                | BlockType::Ice
                | BlockType::Leaves
                | BlockType::Flower
                | BlockType::TallGrass
        )
    }

    /// Drawn as two crossed quads instead of a cube.
    #[inline]
    pub const fn is_cross_model(self) -> bool {
        matches!(self, BlockType::Flower | BlockType::TallGrass)
    }
}

/// Compact voxel representation. Immutable once constructed; chunks replace
/// blocks wholesale rather than mutating in place.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug, Serialize, Deserialize)]
pub struct Block {
    pub ty: BlockType,
    pub data: u8,
}

impl Block {
    pub const AIR: Block = Block {
        ty: BlockType::Air,
        data: 0,
    };
    pub const WATER: Block = Block {
        ty: BlockType::Water,
        data: 0,
    };

    #[inline]
    pub const fn new(ty: BlockType) -> Block {
        Block { ty, data: 0 }
    }

    #[inline]
    pub const fn with_data(ty: BlockType, data: u8) -> Block {
        Block { ty, data }
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self.ty, BlockType::Air)
    }

    #[inline]
    pub const fn is_solid(self) -> bool {
        self.ty.is_solid()
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.ty.is_opaque()
    }

    #[inline]
    pub const fn is_water(self) -> bool {
        self.ty.is_water()
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.ty.is_transparent()
    }

    #[inline]
    pub const fn is_cross_model(self) -> bool {
        self.ty.is_cross_model()
    }
}
