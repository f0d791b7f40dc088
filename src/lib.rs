//! Headless voxel engine core: chunk streaming, procedural generation,
//! greedy meshing, and persistence, driven as one tick loop.
//!
//! The renderer, input, and gameplay layers live elsewhere; they consume
//! this crate through [`MeshSink`] and the [`ChunkManager`] read API.
#![forbid(unsafe_code)]

use std::sync::Arc;

pub use strata_blocks::{Block, BlockType};
pub use strata_chunk::{Chunk, ChunkBuf, ChunkState};
pub use strata_geom::Vec3;
pub use strata_io::{LoadedWorld, WorldIoError, list_worlds, load_world, save_world};
pub use strata_mesh::{ALL_FACES, ChunkNeighbors, Face, MeshData, Vertex, build_chunk_mesh};
pub use strata_runtime::Runtime;
pub use strata_stream::{BlockHit, ChunkManager, StreamConfig};
pub use strata_world::{ChunkPos, World, WorldGenConfig};

use strata_runtime::{GenerateJob, JobOut, MeshJob};

/// Receives finished meshes. Implemented by the presentation layer; each
/// upload replaces any prior mesh for that chunk wholesale.
pub trait MeshSink {
    fn upload_chunk_mesh(&mut self, pos: ChunkPos, mesh: &MeshData);
}

/// Owns the chunk index and the worker pool, and advances the
/// stream -> generate -> mesh -> upload pipeline one tick at a time on the
/// calling thread. All state-machine transitions into driver-owned states
/// happen here.
pub struct Pipeline {
    mgr: ChunkManager,
    runtime: Runtime,
    next_job_id: u64,
}

impl Pipeline {
    pub fn new(world: Arc<World>, cfg: StreamConfig) -> Self {
        let workers = cfg.workers;
        Self {
            mgr: ChunkManager::new(world.clone(), cfg),
            runtime: Runtime::new(world, workers),
            next_job_id: 0,
        }
    }

    #[inline]
    pub fn manager(&self) -> &ChunkManager {
        &self.mgr
    }

    #[inline]
    pub fn manager_mut(&mut self) -> &mut ChunkManager {
        &mut self.mgr
    }

    #[inline]
    fn job_id(&mut self) -> u64 {
        self.next_job_id += 1;
        self.next_job_id
    }

    /// One pipeline tick around the viewer's chunk position.
    pub fn pump(&mut self, sink: &mut impl MeshSink, viewer: ChunkPos) {
        self.dispatch_generation(viewer);
        self.mgr.update_lods(viewer);
        self.dispatch_meshing(viewer);
        self.drain(sink);
        self.mgr.unload_distant(viewer);
        let budget = self.mgr.config().fluid_budget_per_tick;
        self.mgr.step_fluids(budget);
    }

    fn dispatch_generation(&mut self, viewer: ChunkPos) {
        let radius = self.mgr.config().radius_chunks;
        let max = self.mgr.config().max_generate_per_tick;
        for pos in self.mgr.chunks_to_generate(viewer, radius, max) {
            let Some(chunk) = self.mgr.request_generation(pos) else {
                continue;
            };
            let preloaded = self.mgr.take_preloaded(pos);
            let job_id = self.job_id();
            self.mgr.begin_job(pos);
            self.runtime.submit_generate(GenerateJob {
                chunk,
                preloaded,
                job_id,
            });
        }
    }

    fn dispatch_meshing(&mut self, viewer: ChunkPos) {
        let max = self.mgr.config().max_mesh_per_tick;
        for pos in self.mgr.chunks_to_mesh(viewer, max) {
            let Some(chunk) = self.mgr.chunk(pos) else {
                continue;
            };
            let mut neighbors = ChunkNeighbors::empty();
            for face in ALL_FACES {
                let (dx, dy, dz) = face.delta();
                if let Some(n) = self.mgr.chunk(pos.offset(dx, dy, dz)) {
                    // Generating chunks still hold air; sampling them would
                    // bake wrong seams into this mesh.
                    if !matches!(n.state(), ChunkState::Unloaded | ChunkState::Generating) {
                        neighbors.set(face, Arc::new(n.snapshot()));
                    }
                }
            }
            let lod = self.mgr.lod_for(pos, viewer);
            // Edits landing after this point re-mark dirty and force another
            // build once this one uploads.
            chunk.set_dirty(false);
            let buf = chunk.snapshot();
            let job_id = self.job_id();
            self.mgr.begin_job(pos);
            self.runtime.submit_mesh(MeshJob {
                chunk,
                buf,
                neighbors,
                lod,
                job_id,
            });
        }
    }

    fn drain(&mut self, sink: &mut impl MeshSink) {
        for out in self.runtime.drain_results() {
            match out {
                JobOut::Generated { pos, t_gen_ms, .. } => {
                    self.mgr.end_job(pos);
                    // Neighbors meshed before these blocks existed drew
                    // their shared seam against air.
                    self.mgr.invalidate_seam_neighbors(pos);
                    log::trace!(target: "pipeline", "generated {pos:?} in {t_gen_ms}ms");
                }
                JobOut::Meshed {
                    pos,
                    lod,
                    mesh,
                    t_mesh_ms,
                    ..
                } => {
                    self.mgr.end_job(pos);
                    let Some(chunk) = self.mgr.chunk(pos) else {
                        continue;
                    };
                    sink.upload_chunk_mesh(pos, &mesh);
                    chunk.set_current_lod(lod);
                    chunk.set_state(ChunkState::GpuUploaded);
                    if chunk.is_dirty() {
                        // An edit raced the build; the uploaded mesh is
                        // stale, so rebuild.
                        chunk.set_state(ChunkState::MeshBuild);
                    }
                    log::trace!(target: "pipeline", "meshed {pos:?} lod {lod} in {t_mesh_ms}ms");
                }
            }
        }
    }

    /// Debug counters: (queued jobs, running jobs).
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        self.runtime.queue_debug_counts()
    }
}
