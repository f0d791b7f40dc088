//! Chunk streaming: the spatial index, load/unload policy, block mutation
//! API, fluid scheduling, and voxel raycasting.
#![forbid(unsafe_code)]

mod config;
mod manager;
mod raycast;

pub use config::StreamConfig;
pub use manager::{BlockHit, ChunkManager, MAX_FLUID_LEVEL};
pub use raycast::{RayHit, raycast_first_hit};
