//! Chunk buffers, the chunk state machine, and generation helpers.
#![forbid(unsafe_code)]

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use strata_blocks::Block;
use strata_world::{ChunkPos, GenCtx, World};

/// Fixed-size 3D block grid, indexed `(y * sz + z) * sx + x`.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub pos: ChunkPos,
    pub sx: usize,
    pub sy: usize,
    pub sz: usize,
    pub blocks: Vec<Block>,
}

impl ChunkBuf {
    pub fn new_air(pos: ChunkPos, sx: usize, sy: usize, sz: usize) -> Self {
        ChunkBuf {
            pos,
            sx,
            sy,
            sz,
            blocks: vec![Block::AIR; sx * sy * sz],
        }
    }

    pub fn from_blocks_local(
        pos: ChunkPos,
        sx: usize,
        sy: usize,
        sz: usize,
        blocks: Vec<Block>,
    ) -> Self {
        let mut b = blocks;
        let expect = sx * sy * sz;
        if b.len() != expect {
            b.resize(expect, Block::AIR);
        }
        ChunkBuf {
            pos,
            sx,
            sy,
            sz,
            blocks: b,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    /// Out-of-range local coordinates read as air.
    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        if x >= self.sx || y >= self.sy || z >= self.sz {
            return Block::AIR;
        }
        self.blocks[self.idx(x, y, z)]
    }

    /// Out-of-range local coordinates are a no-op on write.
    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, b: Block) {
        if x >= self.sx || y >= self.sy || z >= self.sz {
            return;
        }
        let i = self.idx(x, y, z);
        self.blocks[i] = b;
    }

    #[inline]
    pub fn base(&self) -> (i32, i32, i32) {
        (
            self.pos.cx * self.sx as i32,
            self.pos.cy * self.sy as i32,
            self.pos.cz * self.sz as i32,
        )
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        let (bx, by, bz) = self.base();
        wx >= bx
            && wx < bx + self.sx as i32
            && wy >= by
            && wy < by + self.sy as i32
            && wz >= bz
            && wz < bz + self.sz as i32
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Block> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let (bx, by, bz) = self.base();
        Some(self.get_local(
            (wx - bx) as usize,
            (wy - by) as usize,
            (wz - bz) as usize,
        ))
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != Block::AIR)
    }
}

/// Pipeline position of a chunk. Stored as an atomic byte so the scheduling
/// thread and workers can read it without a lock; each transition has a
/// single writer (the thread that completed that stage).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkState {
    Unloaded = 0,
    Generating = 1,
    MeshBuild = 2,
    Ready = 3,
    GpuUploaded = 4,
}

impl ChunkState {
    #[inline]
    pub fn from_u8(v: u8) -> ChunkState {
        match v {
            1 => ChunkState::Generating,
            2 => ChunkState::MeshBuild,
            3 => ChunkState::Ready,
            4 => ChunkState::GpuUploaded,
            _ => ChunkState::Unloaded,
        }
    }
}

/// A resident chunk: block storage plus streaming bookkeeping. Shared across
/// pipeline stages behind an `Arc`; jobs snapshot the buffer rather than
/// holding the lock.
#[derive(Debug)]
pub struct Chunk {
    pub pos: ChunkPos,
    state: AtomicU8,
    dirty: AtomicBool,
    modified: AtomicBool,
    current_lod: AtomicU8,
    blocks: RwLock<ChunkBuf>,
}

impl Chunk {
    pub fn new(pos: ChunkPos, sx: usize, sy: usize, sz: usize) -> Chunk {
        Chunk {
            pos,
            state: AtomicU8::new(ChunkState::Unloaded as u8),
            dirty: AtomicBool::new(false),
            modified: AtomicBool::new(false),
            current_lod: AtomicU8::new(0),
            blocks: RwLock::new(ChunkBuf::new_air(pos, sx, sy, sz)),
        }
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_state(&self, s: ChunkState) {
        self.state.store(s as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_dirty(&self, v: bool) {
        self.dirty.store(v, Ordering::Release);
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    /// Set on block edits and preloaded restores; never cleared.
    #[inline]
    pub fn set_modified(&self) {
        self.modified.store(true, Ordering::Release);
    }

    #[inline]
    pub fn current_lod(&self) -> u8 {
        self.current_lod.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_current_lod(&self, lod: u8) {
        self.current_lod.store(lod, Ordering::Release);
    }

    /// Point read; out-of-range local coordinates read as air.
    pub fn block_local(&self, x: usize, y: usize, z: usize) -> Block {
        match self.blocks.read() {
            Ok(buf) => buf.get_local(x, y, z),
            Err(poisoned) => poisoned.into_inner().get_local(x, y, z),
        }
    }

    /// Clones the whole block grid for a pipeline job. A 16^3 chunk is 8 KiB,
    /// so snapshots are cheaper than sharing the lock into workers.
    pub fn snapshot(&self) -> ChunkBuf {
        match self.blocks.read() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the block grid wholesale (generation result or preload).
    pub fn install_blocks(&self, buf: ChunkBuf) {
        match self.blocks.write() {
            Ok(mut guard) => *guard = buf,
            Err(poisoned) => *poisoned.into_inner() = buf,
        }
    }

    /// Writes one local block. Returns the previous block. Callers decide
    /// what a type change means for dirty/modified.
    pub fn write_block_local(&self, x: usize, y: usize, z: usize, b: Block) -> Block {
        match self.blocks.write() {
            Ok(mut guard) => {
                let prev = guard.get_local(x, y, z);
                guard.set_local(x, y, z, b);
                prev
            }
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                let prev = guard.get_local(x, y, z);
                guard.set_local(x, y, z, b);
                prev
            }
        }
    }
}

/// Fills a fresh buffer for a chunk position. Pure in `(pos, seed)`: two
/// calls with the same inputs produce byte-identical grids.
pub fn generate_chunk_buffer(world: &World, ctx: &GenCtx, pos: ChunkPos) -> ChunkBuf {
    let sx = world.chunk_size_x;
    let sy = world.chunk_size_y;
    let sz = world.chunk_size_z;
    let mut buf = ChunkBuf::new_air(pos, sx, sy, sz);
    let (bx, by, bz) = buf.base();
    for z in 0..sz {
        let wz = bz + z as i32;
        for x in 0..sx {
            let wx = bx + x as i32;
            let col = world.sample_column(ctx, wx, wz);
            for y in 0..sy {
                let wy = by + y as i32;
                let b = world.block_in_column(ctx, &col, wx, wy, wz);
                let i = buf.idx(x, y, z);
                buf.blocks[i] = b;
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::WorldGenConfig;

    #[test]
    fn generation_is_deterministic() {
        let world = World::new(99, WorldGenConfig::default());
        let ctx_a = world.make_gen_ctx();
        let ctx_b = world.make_gen_ctx();
        for pos in [
            ChunkPos::new(0, 0, 0),
            ChunkPos::new(-3, 1, 7),
            ChunkPos::new(100, 0, -100),
        ] {
            let a = generate_chunk_buffer(&world, &ctx_a, pos);
            let b = generate_chunk_buffer(&world, &ctx_b, pos);
            assert_eq!(a.blocks, b.blocks, "chunk {pos:?} diverged");
        }
    }

    #[test]
    fn state_machine_roundtrip() {
        let c = Chunk::new(ChunkPos::new(0, 0, 0), 16, 16, 16);
        assert_eq!(c.state(), ChunkState::Unloaded);
        c.set_state(ChunkState::Generating);
        c.set_state(ChunkState::MeshBuild);
        c.set_state(ChunkState::Ready);
        c.set_state(ChunkState::GpuUploaded);
        assert_eq!(c.state(), ChunkState::GpuUploaded);
        // The only back-edge: an edited uploaded chunk re-enters MeshBuild.
        c.set_state(ChunkState::MeshBuild);
        assert_eq!(c.state(), ChunkState::MeshBuild);
    }

    #[test]
    fn poisoned_lock_still_reads_installed_blocks() {
        let c = Chunk::new(ChunkPos::new(0, 0, 0), 16, 16, 16);
        let mut buf = ChunkBuf::new_air(ChunkPos::new(0, 0, 0), 16, 16, 16);
        buf.set_local(1, 2, 3, Block::WATER);
        c.install_blocks(buf);

        let poison = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = c.blocks.write().unwrap();
            panic!("poison the buffer lock");
        }));
        assert!(poison.is_err());

        assert_eq!(c.block_local(1, 2, 3), Block::WATER);
        assert_eq!(c.snapshot().get_local(1, 2, 3), Block::WATER);
    }

    #[test]
    fn out_of_range_local_access_is_air_and_noop() {
        let mut buf = ChunkBuf::new_air(ChunkPos::new(0, 0, 0), 4, 4, 4);
        assert_eq!(buf.get_local(4, 0, 0), Block::AIR);
        buf.set_local(0, 4, 0, Block::WATER);
        assert!(!buf.has_non_air());
    }
}
