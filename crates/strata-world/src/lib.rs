//! World sizing, chunk coordinates, and deterministic terrain synthesis.
#![forbid(unsafe_code)]

mod chunk_pos;
mod gen_ctx;
pub mod generation;
pub mod worldgen;
mod world;

pub use chunk_pos::ChunkPos;
pub use gen_ctx::GenCtx;
pub use generation::ColumnProfile;
pub use world::World;
pub use worldgen::{BiomeDef, BiomeKind, WorldGenConfig};
