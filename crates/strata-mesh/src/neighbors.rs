use std::sync::Arc;

use strata_chunk::ChunkBuf;

use crate::face::Face;

/// Fixed-arity map from face direction to the neighbor chunk's block grid.
/// Shared read-only for the duration of a mesh job. A missing neighbor reads
/// as air, so boundary faces against unloaded chunks are always drawn.
#[derive(Default, Clone)]
pub struct ChunkNeighbors {
    faces: [Option<Arc<ChunkBuf>>; 6],
}

impl ChunkNeighbors {
    pub fn empty() -> ChunkNeighbors {
        ChunkNeighbors::default()
    }

    pub fn set(&mut self, face: Face, buf: Arc<ChunkBuf>) {
        self.faces[face.index()] = Some(buf);
    }

    #[inline]
    pub fn get(&self, face: Face) -> Option<&ChunkBuf> {
        self.faces[face.index()].as_deref()
    }

    pub fn loaded_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }
}
