//! CPU greedy mesher: chunk grids in, vertex/index buffers out.
#![forbid(unsafe_code)]

mod build;
mod face;
mod neighbors;
mod vertex;

pub use build::build_chunk_mesh;
pub use face::{ALL_FACES, Face};
pub use neighbors::ChunkNeighbors;
pub use vertex::{MeshBucket, MeshData, Vertex};
