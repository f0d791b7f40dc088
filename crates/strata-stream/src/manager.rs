use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use strata_blocks::{Block, BlockType};
use strata_chunk::{Chunk, ChunkBuf, ChunkState};
use strata_geom::Vec3;
use strata_world::{ChunkPos, World};

use crate::config::StreamConfig;
use crate::raycast::{RayHit, raycast_first_hit};

/// Water spreads laterally until `Block::data` reaches this level.
pub const MAX_FLUID_LEVEL: u8 = 7;

/// A raycast resolved against the chunk index: the raw traversal result plus
/// the owning chunk and local coordinates of the hit block.
#[derive(Clone, Copy, Debug)]
pub struct BlockHit {
    pub ray: RayHit,
    pub chunk: ChunkPos,
    pub local: (usize, usize, usize),
}

#[inline]
fn chebyshev(a: ChunkPos, b: ChunkPos) -> i32 {
    (a.cx - b.cx)
        .abs()
        .max((a.cy - b.cy).abs())
        .max((a.cz - b.cz).abs())
}

const ORTHO: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Spatial chunk index plus streaming policy. Owned by the driving thread;
/// worker jobs only ever see `Arc<Chunk>` handles and buffer snapshots, so
/// none of the maps here need their own locks.
pub struct ChunkManager {
    world: Arc<World>,
    cfg: StreamConfig,
    chunks: HashMap<ChunkPos, Arc<Chunk>>,
    inflight: HashSet<ChunkPos>,
    pending_unload: HashMap<ChunkPos, Instant>,
    preloaded: HashMap<ChunkPos, Vec<Block>>,
    fluid_queue: VecDeque<(i32, i32, i32)>,
    fluid_pending: HashSet<(i32, i32, i32)>,
    spiral: Vec<(i32, i32, i32)>,
    spiral_radius: i32,
}

impl ChunkManager {
    pub fn new(world: Arc<World>, cfg: StreamConfig) -> Self {
        let mut mgr = Self {
            world,
            cfg,
            chunks: HashMap::new(),
            inflight: HashSet::new(),
            pending_unload: HashMap::new(),
            preloaded: HashMap::new(),
            fluid_queue: VecDeque::new(),
            fluid_pending: HashSet::new(),
            spiral: Vec::new(),
            spiral_radius: -1,
        };
        let r = mgr.cfg.radius_chunks;
        mgr.ensure_spiral(r);
        mgr
    }

    #[inline]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = (&ChunkPos, &Arc<Chunk>)> {
        self.chunks.iter()
    }

    #[inline]
    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.get(&pos).cloned()
    }

    /// Chunk-grid coordinate owning a world position.
    #[inline]
    pub fn chunk_pos_at(&self, wx: i32, wy: i32, wz: i32) -> ChunkPos {
        ChunkPos::new(
            wx.div_euclid(self.world.chunk_size_x as i32),
            wy.div_euclid(self.world.chunk_size_y as i32),
            wz.div_euclid(self.world.chunk_size_z as i32),
        )
    }

    #[inline]
    fn local_of(&self, wx: i32, wy: i32, wz: i32) -> (usize, usize, usize) {
        (
            wx.rem_euclid(self.world.chunk_size_x as i32) as usize,
            wy.rem_euclid(self.world.chunk_size_y as i32) as usize,
            wz.rem_euclid(self.world.chunk_size_z as i32) as usize,
        )
    }

    #[inline]
    pub fn chunk_at_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Arc<Chunk>> {
        self.chunk(self.chunk_pos_at(wx, wy, wz))
    }

    /// Total read; absent chunks read as air.
    pub fn block_at(&self, wx: i32, wy: i32, wz: i32) -> Block {
        match self.chunks.get(&self.chunk_pos_at(wx, wy, wz)) {
            Some(c) => {
                let (lx, ly, lz) = self.local_of(wx, wy, wz);
                c.block_local(lx, ly, lz)
            }
            None => Block::AIR,
        }
    }

    /// Writes a block at world coordinates. A write that does not change the
    /// block type is a complete no-op and returns false. A type change marks
    /// the chunk dirty and modified, drives an uploaded chunk back to
    /// MeshBuild (including border neighbors whose mesh sampled this block),
    /// and queues the position plus its six neighbors for fluid evaluation.
    pub fn set_block_at(&mut self, wx: i32, wy: i32, wz: i32, b: Block) -> bool {
        let pos = self.chunk_pos_at(wx, wy, wz);
        let Some(chunk) = self.chunks.get(&pos).cloned() else {
            return false;
        };
        let (lx, ly, lz) = self.local_of(wx, wy, wz);
        if chunk.block_local(lx, ly, lz).ty == b.ty {
            return false;
        }
        chunk.write_block_local(lx, ly, lz, b);
        chunk.set_dirty(true);
        chunk.set_modified();
        if chunk.state() == ChunkState::GpuUploaded {
            chunk.set_state(ChunkState::MeshBuild);
        }
        self.mark_border_neighbors(pos, lx, ly, lz);
        self.enqueue_fluid(wx, wy, wz);
        for (dx, dy, dz) in ORTHO {
            self.enqueue_fluid(wx + dx, wy + dy, wz + dz);
        }
        log::trace!(target: "stream", "set block {:?} at ({wx},{wy},{wz})", b.ty);
        true
    }

    /// An edit on a chunk border invalidates the neighbor mesh that sampled
    /// across the seam.
    fn mark_border_neighbors(&self, pos: ChunkPos, lx: usize, ly: usize, lz: usize) {
        let mut dirs: Vec<(i32, i32, i32)> = Vec::new();
        if lx == 0 {
            dirs.push((-1, 0, 0));
        }
        if lx == self.world.chunk_size_x - 1 {
            dirs.push((1, 0, 0));
        }
        if ly == 0 {
            dirs.push((0, -1, 0));
        }
        if ly == self.world.chunk_size_y - 1 {
            dirs.push((0, 1, 0));
        }
        if lz == 0 {
            dirs.push((0, 0, -1));
        }
        if lz == self.world.chunk_size_z - 1 {
            dirs.push((0, 0, 1));
        }
        for (dx, dy, dz) in dirs {
            if let Some(n) = self.chunks.get(&pos.offset(dx, dy, dz)) {
                n.set_dirty(true);
                if n.state() == ChunkState::GpuUploaded {
                    n.set_state(ChunkState::MeshBuild);
                }
            }
        }
    }

    /// A chunk meshed while a face neighbor was still generating sampled
    /// air across that seam. Called when the neighbor's blocks land: every
    /// face neighbor with a mesh built or building goes back through
    /// MeshBuild so the seam faces are re-culled against real blocks.
    pub fn invalidate_seam_neighbors(&self, pos: ChunkPos) -> usize {
        let mut flipped = 0;
        for (dx, dy, dz) in ORTHO {
            let Some(n) = self.chunks.get(&pos.offset(dx, dy, dz)) else {
                continue;
            };
            if matches!(n.state(), ChunkState::Unloaded | ChunkState::Generating) {
                continue;
            }
            n.set_dirty(true);
            if n.state() == ChunkState::GpuUploaded {
                n.set_state(ChunkState::MeshBuild);
            }
            flipped += 1;
        }
        flipped
    }

    fn ensure_spiral(&mut self, radius: i32) {
        if radius <= self.spiral_radius {
            return;
        }
        let mut offs = Vec::new();
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    offs.push((dx, dy, dz));
                }
            }
        }
        // Ring-by-ring outward, nearest-first inside each ring.
        offs.sort_by_key(|&(dx, dy, dz)| {
            let ring = dx.abs().max(dy.abs()).max(dz.abs());
            let d2 = i64::from(dx) * i64::from(dx)
                + i64::from(dy) * i64::from(dy)
                + i64::from(dz) * i64::from(dz);
            (ring, d2)
        });
        self.spiral = offs;
        self.spiral_radius = radius;
    }

    /// Up to `max` chunk positions within `radius` of the center that are
    /// absent or Unloaded, nearest-first so load quality degrades outward.
    pub fn chunks_to_generate(&mut self, center: ChunkPos, radius: i32, max: usize) -> Vec<ChunkPos> {
        self.ensure_spiral(radius);
        let mut out = Vec::new();
        for &(dx, dy, dz) in &self.spiral {
            if dx.abs().max(dy.abs()).max(dz.abs()) > radius {
                break;
            }
            let pos = center.offset(dx, dy, dz);
            let wanted = match self.chunks.get(&pos) {
                None => true,
                Some(c) => c.state() == ChunkState::Unloaded,
            };
            if wanted && !self.inflight.contains(&pos) {
                out.push(pos);
                if out.len() >= max {
                    break;
                }
            }
        }
        out
    }

    /// Idempotent: creates the entry only if absent, flips Unloaded to
    /// Generating, and never touches an in-flight or completed chunk.
    /// Returns the chunk only when this call claimed it for generation.
    pub fn request_generation(&mut self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.pending_unload.remove(&pos);
        match self.chunks.entry(pos) {
            Entry::Occupied(e) => {
                let c = e.get();
                if c.state() == ChunkState::Unloaded {
                    c.set_state(ChunkState::Generating);
                    Some(c.clone())
                } else {
                    None
                }
            }
            Entry::Vacant(v) => {
                let c = Arc::new(Chunk::new(
                    pos,
                    self.world.chunk_size_x,
                    self.world.chunk_size_y,
                    self.world.chunk_size_z,
                ));
                c.set_state(ChunkState::Generating);
                log::debug!(target: "stream", "chunk {pos:?} queued for generation");
                Some(v.insert(c).clone())
            }
        }
    }

    /// Chunks awaiting a mesh build, nearest-first, skipping any with a job
    /// already running.
    pub fn chunks_to_mesh(&self, center: ChunkPos, max: usize) -> Vec<ChunkPos> {
        let mut out: Vec<ChunkPos> = self
            .chunks
            .iter()
            .filter(|(pos, c)| {
                c.state() == ChunkState::MeshBuild && !self.inflight.contains(*pos)
            })
            .map(|(pos, _)| *pos)
            .collect();
        out.sort_by_key(|p| p.distance_sq(center));
        out.truncate(max);
        out
    }

    /// Marks a chunk as having a worker job running; the driving thread
    /// never dispatches a second job against a marked chunk.
    pub fn begin_job(&mut self, pos: ChunkPos) {
        self.inflight.insert(pos);
    }

    pub fn end_job(&mut self, pos: ChunkPos) {
        self.inflight.remove(&pos);
    }

    #[inline]
    pub fn job_inflight(&self, pos: ChunkPos) -> bool {
        self.inflight.contains(&pos)
    }

    /// First solid block along the ray, if any.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<BlockHit> {
        let ray = raycast_first_hit(origin, dir, max_dist, |x, y, z| {
            self.block_at(x, y, z).is_solid()
        })?;
        Some(BlockHit {
            ray,
            chunk: self.chunk_pos_at(ray.bx, ray.by, ray.bz),
            local: self.local_of(ray.bx, ray.by, ray.bz),
        })
    }

    /// Marks chunks beyond `radius + hysteresis` for removal and erases the
    /// ones continuously out of range for the grace period. Re-entering
    /// range clears the mark; chunks with a running job are never erased.
    /// Edited chunks are staged back into the preload area on eviction so
    /// the edits survive re-entry and the next save.
    pub fn unload_distant(&mut self, center: ChunkPos) {
        let limit = self.cfg.radius_chunks + self.cfg.hysteresis_chunks;
        let grace = Duration::from_secs_f32(self.cfg.unload_grace_secs.max(0.0));
        let now = Instant::now();
        let mut evict = Vec::new();
        for pos in self.chunks.keys() {
            if chebyshev(*pos, center) > limit {
                let marked = *self.pending_unload.entry(*pos).or_insert(now);
                if now.duration_since(marked) >= grace && !self.inflight.contains(pos) {
                    evict.push(*pos);
                }
            } else {
                self.pending_unload.remove(pos);
            }
        }
        for pos in evict {
            if let Some(c) = self.chunks.remove(&pos)
                && c.is_modified()
            {
                self.preloaded.insert(pos, c.snapshot().blocks);
            }
            self.pending_unload.remove(&pos);
            log::debug!(target: "stream", "evicted chunk {pos:?}");
        }
    }

    #[inline]
    pub fn is_marked_for_unload(&self, pos: ChunkPos) -> bool {
        self.pending_unload.contains_key(&pos)
    }

    /// Stages persisted blocks for a chunk that has not been created yet.
    /// The generation path consumes them verbatim instead of generating.
    pub fn preload_chunk_data(&mut self, pos: ChunkPos, blocks: Vec<Block>) {
        self.preloaded.insert(pos, blocks);
    }

    #[inline]
    pub fn has_preloaded(&self, pos: ChunkPos) -> bool {
        self.preloaded.contains_key(&pos)
    }

    pub fn take_preloaded(&mut self, pos: ChunkPos) -> Option<Vec<Block>> {
        self.preloaded.remove(&pos)
    }

    /// Empties the staging area, handing back everything still staged.
    pub fn drain_preloaded(&mut self) -> Vec<(ChunkPos, Vec<Block>)> {
        self.preloaded.drain().collect()
    }

    /// Staged blocks not yet installed into a resident chunk, for
    /// persistence. Covers evicted edits and loads the viewer never
    /// revisited.
    pub fn staged_preloads(&self) -> impl Iterator<Item = (ChunkPos, &[Block])> {
        self.preloaded
            .iter()
            .map(|(pos, blocks)| (*pos, blocks.as_slice()))
    }

    fn enqueue_fluid(&mut self, x: i32, y: i32, z: i32) {
        if self.fluid_pending.insert((x, y, z)) {
            self.fluid_queue.push_back((x, y, z));
        }
    }

    #[inline]
    pub fn pending_fluid_count(&self) -> usize {
        self.fluid_queue.len()
    }

    /// Breadth-first water spreading: down into air first (as a full
    /// column), otherwise laterally with the level in `Block::data`
    /// increasing by one per step up to [`MAX_FLUID_LEVEL`]. Settled water
    /// is never re-leveled. Returns the number of positions evaluated.
    pub fn step_fluids(&mut self, budget: usize) -> usize {
        let mut processed = 0;
        while processed < budget {
            let Some((x, y, z)) = self.fluid_queue.pop_front() else {
                break;
            };
            self.fluid_pending.remove(&(x, y, z));
            processed += 1;
            let b = self.block_at(x, y, z);
            if !b.is_water() {
                continue;
            }
            if self.block_at(x, y - 1, z).is_air() {
                self.set_block_at(x, y - 1, z, Block::new(BlockType::Water));
                continue;
            }
            if b.data >= MAX_FLUID_LEVEL {
                continue;
            }
            for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                if self.block_at(x + dx, y, z + dz).is_air() {
                    self.set_block_at(
                        x + dx,
                        y,
                        z + dz,
                        Block::with_data(BlockType::Water, b.data + 1),
                    );
                }
            }
        }
        processed
    }

    /// LOD a chunk at `pos` should be meshed at for the given viewer chunk.
    #[inline]
    pub fn lod_for(&self, pos: ChunkPos, center: ChunkPos) -> u8 {
        self.cfg.lod_for_distance(chebyshev(pos, center))
    }

    /// Flips uploaded chunks whose distance band changed back to MeshBuild.
    pub fn update_lods(&self, center: ChunkPos) -> usize {
        let mut flipped = 0;
        for (pos, c) in &self.chunks {
            if c.state() != ChunkState::GpuUploaded {
                continue;
            }
            if self.lod_for(*pos, center) != c.current_lod() {
                c.set_dirty(true);
                c.set_state(ChunkState::MeshBuild);
                flipped += 1;
            }
        }
        if flipped > 0 {
            log::debug!(target: "stream", "{flipped} chunks re-meshing for LOD change");
        }
        flipped
    }

    /// Buffer snapshots of every modified chunk, for persistence.
    pub fn modified_snapshots(&self) -> Vec<(ChunkPos, ChunkBuf)> {
        self.chunks
            .iter()
            .filter(|(_, c)| c.is_modified())
            .map(|(pos, c)| (*pos, c.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_chunk::generate_chunk_buffer;
    use strata_world::WorldGenConfig;

    fn manager_with(cfg: StreamConfig) -> ChunkManager {
        let world = Arc::new(World::new(42, WorldGenConfig::default()));
        ChunkManager::new(world, cfg)
    }

    fn manager() -> ChunkManager {
        manager_with(StreamConfig::default())
    }

    /// Creates a chunk, fills it from the generator, and marks it uploaded.
    fn install_uploaded(mgr: &mut ChunkManager, pos: ChunkPos) -> Arc<Chunk> {
        let chunk = mgr.request_generation(pos).expect("fresh chunk");
        let ctx = mgr.world().make_gen_ctx();
        chunk.install_blocks(generate_chunk_buffer(mgr.world(), &ctx, pos));
        chunk.set_state(ChunkState::GpuUploaded);
        chunk
    }

    #[test]
    fn spiral_is_nearest_first_and_bounded() {
        let mut mgr = manager();
        let center = ChunkPos::new(10, 0, -5);
        let got = mgr.chunks_to_generate(center, 3, 1000);
        assert_eq!(got[0], center);
        // Ring-by-ring outward, euclidean-ascending within each ring.
        let keys: Vec<(i32, i64)> = got
            .iter()
            .map(|p| (chebyshev(*p, center), p.distance_sq(center)))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "spiral out of order");
        assert_eq!(got.len(), 7 * 7 * 7);
        assert_eq!(mgr.chunks_to_generate(center, 3, 5).len(), 5);
    }

    #[test]
    fn generated_chunks_drop_out_of_the_spiral() {
        let mut mgr = manager();
        let center = ChunkPos::new(0, 0, 0);
        let first = mgr.chunks_to_generate(center, 2, 4);
        for pos in &first {
            mgr.request_generation(*pos);
        }
        let second = mgr.chunks_to_generate(center, 2, 1000);
        for pos in &first {
            assert!(!second.contains(pos), "{pos:?} still offered");
        }
    }

    #[test]
    fn request_generation_is_idempotent() {
        let mut mgr = manager();
        let pos = ChunkPos::new(1, 2, 3);
        let first = mgr.request_generation(pos);
        assert!(first.is_some());
        assert_eq!(first.unwrap().state(), ChunkState::Generating);
        assert!(mgr.request_generation(pos).is_none());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn set_block_marks_dirty_modified_and_drives_back_edge() {
        let mut mgr = manager();
        let pos = ChunkPos::new(0, 0, 0);
        let chunk = install_uploaded(&mut mgr, pos);

        // Find a stone block to remove.
        let buf = chunk.snapshot();
        let mut target = None;
        'scan: for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    if buf.get_local(x, y, z).ty == BlockType::Stone {
                        target = Some((x as i32, y as i32, z as i32));
                        break 'scan;
                    }
                }
            }
        }
        let (x, y, z) = target.expect("generated chunk has stone");

        assert!(mgr.set_block_at(x, y, z, Block::AIR));
        assert!(chunk.is_dirty());
        assert!(chunk.is_modified());
        assert_eq!(chunk.state(), ChunkState::MeshBuild);

        // Same-type rewrite is a complete no-op.
        chunk.set_state(ChunkState::GpuUploaded);
        chunk.set_dirty(false);
        assert!(!mgr.set_block_at(x, y, z, Block::AIR));
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.state(), ChunkState::GpuUploaded);
    }

    #[test]
    fn set_block_on_border_invalidates_neighbor() {
        let mut mgr = manager();
        let a = ChunkPos::new(0, 0, 0);
        let b = ChunkPos::new(1, 0, 0);
        install_uploaded(&mut mgr, a);
        let nb = install_uploaded(&mut mgr, b);

        // Local x == 15 in chunk a touches chunk b's mesh.
        mgr.set_block_at(15, 3, 3, Block::new(BlockType::Wood));
        assert!(nb.is_dirty());
        assert_eq!(nb.state(), ChunkState::MeshBuild);
    }

    #[test]
    fn set_block_outside_loaded_chunks_is_noop() {
        let mut mgr = manager();
        assert!(!mgr.set_block_at(500, 500, 500, Block::new(BlockType::Stone)));
        assert_eq!(mgr.block_at(500, 500, 500), Block::AIR);
    }

    #[test]
    fn eviction_waits_for_grace_period() {
        let mut cfg = StreamConfig::default();
        cfg.radius_chunks = 2;
        cfg.hysteresis_chunks = 1;
        cfg.unload_grace_secs = 60.0;
        let mut mgr = manager_with(cfg);
        let far = ChunkPos::new(10, 0, 0);
        mgr.request_generation(far);

        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.is_marked_for_unload(far));
        assert!(mgr.chunk(far).is_some(), "erased before grace elapsed");

        // Viewer moves back in range: the mark clears.
        mgr.unload_distant(ChunkPos::new(9, 0, 0));
        assert!(!mgr.is_marked_for_unload(far));
        assert!(mgr.chunk(far).is_some());
    }

    #[test]
    fn eviction_erases_after_grace() {
        let mut cfg = StreamConfig::default();
        cfg.radius_chunks = 2;
        cfg.hysteresis_chunks = 1;
        cfg.unload_grace_secs = 0.0;
        let mut mgr = manager_with(cfg);
        let far = ChunkPos::new(10, 0, 0);
        mgr.request_generation(far);
        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.chunk(far).is_none());
    }

    #[test]
    fn inflight_chunks_survive_eviction() {
        let mut cfg = StreamConfig::default();
        cfg.radius_chunks = 2;
        cfg.hysteresis_chunks = 1;
        cfg.unload_grace_secs = 0.0;
        let mut mgr = manager_with(cfg);
        let far = ChunkPos::new(10, 0, 0);
        mgr.request_generation(far);
        mgr.begin_job(far);
        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.chunk(far).is_some());
        mgr.end_job(far);
        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.chunk(far).is_none());
    }

    #[test]
    fn finished_generation_invalidates_built_neighbors() {
        let mut mgr = manager();
        let center = ChunkPos::new(0, 0, 0);
        let built = install_uploaded(&mut mgr, ChunkPos::new(1, 0, 0));
        let generating = mgr.request_generation(ChunkPos::new(-1, 0, 0)).unwrap();
        // Diagonal neighbors do not share a seam face.
        let diagonal = install_uploaded(&mut mgr, ChunkPos::new(1, 1, 0));

        assert_eq!(mgr.invalidate_seam_neighbors(center), 1);
        assert!(built.is_dirty());
        assert_eq!(built.state(), ChunkState::MeshBuild);
        assert_eq!(generating.state(), ChunkState::Generating);
        assert!(!diagonal.is_dirty());
        assert_eq!(diagonal.state(), ChunkState::GpuUploaded);
    }

    #[test]
    fn eviction_stages_modified_blocks_for_reload() {
        let mut cfg = StreamConfig::default();
        cfg.radius_chunks = 2;
        cfg.hysteresis_chunks = 1;
        cfg.unload_grace_secs = 0.0;
        let mut mgr = manager_with(cfg);
        let far = ChunkPos::new(10, 0, 0);
        install_uploaded(&mut mgr, far);
        let edit = (10 * 16 + 3, 3, 3);
        mgr.set_block_at(edit.0, edit.1, edit.2, Block::new(BlockType::Wood));

        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.chunk(far).is_none());
        assert!(mgr.has_preloaded(far), "edits discarded on eviction");
        let blocks = mgr.take_preloaded(far).unwrap();
        let world = mgr.world().clone();
        let buf = ChunkBuf::from_blocks_local(
            far,
            world.chunk_size_x,
            world.chunk_size_y,
            world.chunk_size_z,
            blocks,
        );
        assert_eq!(buf.get_local(3, 3, 3).ty, BlockType::Wood);

        // Pristine chunks evict without leaving staged data behind.
        let clean = ChunkPos::new(-10, 0, 0);
        install_uploaded(&mut mgr, clean);
        mgr.unload_distant(ChunkPos::new(0, 0, 0));
        assert!(mgr.chunk(clean).is_none());
        assert!(!mgr.has_preloaded(clean));
    }

    #[test]
    fn preload_staging_is_consumed_once() {
        let mut mgr = manager();
        let pos = ChunkPos::new(2, 0, 2);
        let blocks = vec![Block::new(BlockType::Gravel); mgr.world().chunk_volume()];
        mgr.preload_chunk_data(pos, blocks);
        assert!(mgr.has_preloaded(pos));
        let taken = mgr.take_preloaded(pos).unwrap();
        assert_eq!(taken[0].ty, BlockType::Gravel);
        assert!(!mgr.has_preloaded(pos));
        assert!(mgr.take_preloaded(pos).is_none());
    }

    #[test]
    fn raycast_resolves_chunk_and_local_coords() {
        let mut mgr = manager();
        let pos = ChunkPos::new(0, 0, 0);
        let chunk = mgr.request_generation(pos).unwrap();
        let mut buf = ChunkBuf::new_air(pos, 16, 16, 16);
        buf.set_local(8, 8, 8, Block::new(BlockType::Stone));
        chunk.install_blocks(buf);
        chunk.set_state(ChunkState::GpuUploaded);

        let hit = mgr
            .raycast(Vec3::new(8.5, 8.5, 0.5), Vec3::new(0.0, 0.0, 1.0), 32.0)
            .expect("hit the stone block");
        assert_eq!((hit.ray.bx, hit.ray.by, hit.ray.bz), (8, 8, 8));
        assert_eq!((hit.ray.nx, hit.ray.ny, hit.ray.nz), (0, 0, -1));
        assert_eq!(hit.chunk, pos);
        assert_eq!(hit.local, (8, 8, 8));

        assert!(
            mgr.raycast(Vec3::new(0.5, 0.5, 0.5), Vec3::UP, 4.0).is_none(),
            "air column should miss"
        );
    }

    #[test]
    fn water_spreads_down_then_laterally_with_levels() {
        let mut mgr = manager();
        let pos = ChunkPos::new(0, 0, 0);
        let chunk = mgr.request_generation(pos).unwrap();
        // Stone floor at y=4 with an air basin above it.
        let mut buf = ChunkBuf::new_air(pos, 16, 16, 16);
        for z in 0..16 {
            for x in 0..16 {
                buf.set_local(x, 4, z, Block::new(BlockType::Stone));
            }
        }
        chunk.install_blocks(buf);
        chunk.set_state(ChunkState::GpuUploaded);

        // Drop a source above the floor.
        assert!(mgr.set_block_at(4, 7, 4, Block::new(BlockType::Water)));
        assert!(mgr.pending_fluid_count() > 0);
        while mgr.step_fluids(256) > 0 {}

        // Fell to rest on the floor.
        assert!(mgr.block_at(4, 5, 4).is_water());
        // And spread across it with increasing level.
        let side = mgr.block_at(5, 5, 4);
        assert!(side.is_water());
        assert!(side.data >= 1);
        // The level cap bounds the spread well inside the chunk.
        let far = mgr.block_at(4 + i32::from(MAX_FLUID_LEVEL), 5, 4);
        let too_far = mgr.block_at(5 + i32::from(MAX_FLUID_LEVEL), 5, 4);
        assert!(far.is_water());
        assert!(too_far.is_air(), "spread past the maximum level");
    }

    #[test]
    fn lod_change_reenters_mesh_build() {
        let mut mgr = manager();
        let near = ChunkPos::new(0, 0, 0);
        let chunk = install_uploaded(&mut mgr, near);
        chunk.set_current_lod(0);

        // Viewer far away: the chunk's band is now a coarser LOD.
        let viewer = ChunkPos::new(7, 0, 0);
        assert_eq!(mgr.lod_for(near, viewer), 1);
        assert_eq!(mgr.update_lods(viewer), 1);
        assert_eq!(chunk.state(), ChunkState::MeshBuild);

        // Already at the right LOD: nothing to do.
        chunk.set_current_lod(1);
        chunk.set_state(ChunkState::GpuUploaded);
        assert_eq!(mgr.update_lods(viewer), 0);
        assert_eq!(chunk.state(), ChunkState::GpuUploaded);
    }

    #[test]
    fn modified_snapshots_only_cover_edited_chunks() {
        let mut mgr = manager();
        install_uploaded(&mut mgr, ChunkPos::new(0, 0, 0));
        install_uploaded(&mut mgr, ChunkPos::new(1, 0, 0));
        mgr.set_block_at(0, 0, 0, Block::new(BlockType::Wood));
        let snaps = mgr.modified_snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].0, ChunkPos::new(0, 0, 0));
        assert_eq!(snaps[0].1.get_local(0, 0, 0).ty, BlockType::Wood);
    }
}
