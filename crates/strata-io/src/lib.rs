//! Binary world persistence: player state plus the modified-chunk snapshot.
//! Unmodified chunks are never written; they regenerate from the seed.
#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use strata_blocks::{Block, BlockType};
use strata_geom::Vec3;
use strata_stream::ChunkManager;
use strata_world::ChunkPos;
use thiserror::Error;

pub const CHUNKS_MAGIC: u32 = 0x4D43_4350;
pub const CHUNKS_VERSION: u32 = 1;

const LEVEL_FILE: &str = "level.dat";
const CHUNKS_FILE: &str = "chunks.dat";

#[derive(Debug, Error)]
pub enum WorldIoError {
    #[error("world i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Player state and chunk count recovered by [`load_world`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedWorld {
    pub player_pos: Vec3,
    /// `None` when `level.dat` predates the seed field; the caller keeps
    /// its default seed.
    pub seed: Option<i64>,
    pub chunks_loaded: usize,
}

fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_le_bytes(b))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_le_bytes(b))
}

fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

fn write_chunk_record<W: Write>(w: &mut W, pos: ChunkPos, blocks: &[Block]) -> io::Result<()> {
    w.write_all(&pos.cx.to_le_bytes())?;
    w.write_all(&pos.cy.to_le_bytes())?;
    w.write_all(&pos.cz.to_le_bytes())?;
    for b in blocks {
        w.write_all(&[b.ty.id(), b.data])?;
    }
    Ok(())
}

/// Writes `level.dat` and `chunks.dat` under `dir`, creating it if needed.
/// Persists every chunk with the modified flag plus any staged preload
/// blocks (edits whose chunk was evicted before this save).
pub fn save_world(
    dir: impl AsRef<Path>,
    mgr: &ChunkManager,
    player_pos: Vec3,
    seed: i64,
) -> Result<(), WorldIoError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut level = BufWriter::new(File::create(dir.join(LEVEL_FILE))?);
    level.write_all(&player_pos.x.to_le_bytes())?;
    level.write_all(&player_pos.y.to_le_bytes())?;
    level.write_all(&player_pos.z.to_le_bytes())?;
    level.write_all(&seed.to_le_bytes())?;
    level.flush()?;

    let snapshots = mgr.modified_snapshots();
    let staged: Vec<(ChunkPos, &[Block])> = mgr.staged_preloads().collect();
    let count = snapshots.len() + staged.len();
    let mut out = BufWriter::new(File::create(dir.join(CHUNKS_FILE))?);
    out.write_all(&CHUNKS_MAGIC.to_le_bytes())?;
    out.write_all(&CHUNKS_VERSION.to_le_bytes())?;
    out.write_all(&(count as i32).to_le_bytes())?;
    for (pos, buf) in &snapshots {
        write_chunk_record(&mut out, *pos, &buf.blocks)?;
    }
    for (pos, blocks) in &staged {
        write_chunk_record(&mut out, *pos, blocks)?;
    }
    out.flush()?;
    log::info!(
        target: "io",
        "saved world to {}: {} modified chunks ({} staged)",
        dir.display(),
        count,
        staged.len()
    );
    Ok(())
}

/// Restores player state and stages every persisted chunk's blocks into the
/// manager's preload area. Malformed `chunks.dat` (bad magic or version) is
/// skipped with a warning, not an error; a missing `chunks.dat` means no
/// modified chunks.
pub fn load_world(
    dir: impl AsRef<Path>,
    mgr: &mut ChunkManager,
) -> Result<LoadedWorld, WorldIoError> {
    let dir = dir.as_ref();
    let mut level = BufReader::new(File::open(dir.join(LEVEL_FILE))?);
    let player_pos = Vec3::new(
        read_f32(&mut level)?,
        read_f32(&mut level)?,
        read_f32(&mut level)?,
    );
    let seed = match read_i64(&mut level) {
        Ok(s) => Some(s),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(e.into()),
    };

    let chunks_loaded = match File::open(dir.join(CHUNKS_FILE)) {
        Ok(f) => load_chunks(BufReader::new(f), mgr)?,
        Err(e) if e.kind() == ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    log::info!(
        target: "io",
        "loaded world from {}: {chunks_loaded} chunks staged",
        dir.display()
    );
    Ok(LoadedWorld {
        player_pos,
        seed,
        chunks_loaded,
    })
}

fn load_chunks<R: Read>(mut r: R, mgr: &mut ChunkManager) -> Result<usize, WorldIoError> {
    let magic = read_u32(&mut r)?;
    let version = read_u32(&mut r)?;
    if magic != CHUNKS_MAGIC || version != CHUNKS_VERSION {
        log::warn!(
            target: "io",
            "chunks.dat rejected: magic {magic:#010x} version {version}"
        );
        return Ok(0);
    }
    let count = read_i32(&mut r)?;
    if count < 0 {
        log::warn!(target: "io", "chunks.dat rejected: negative count {count}");
        return Ok(0);
    }
    let volume = mgr.world().chunk_volume();
    let mut loaded = 0;
    for _ in 0..count {
        let pos = ChunkPos::new(read_i32(&mut r)?, read_i32(&mut r)?, read_i32(&mut r)?);
        let mut raw = vec![0u8; volume * 2];
        r.read_exact(&mut raw)?;
        let blocks: Vec<Block> = raw
            .chunks_exact(2)
            .map(|pair| Block::with_data(BlockType::from_id(pair[0]), pair[1]))
            .collect();
        mgr.preload_chunk_data(pos, blocks);
        loaded += 1;
    }
    Ok(loaded)
}

/// Every subdirectory of the saves root is a candidate world name.
pub fn list_worlds(saves_root: impl AsRef<Path>) -> Result<Vec<String>, WorldIoError> {
    let mut names = Vec::new();
    let entries = match fs::read_dir(saves_root.as_ref()) {
        Ok(e) => e,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if entry.file_type()?.is_dir()
            && let Some(name) = name.to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
