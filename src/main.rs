use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hashbrown::HashMap;
use strata::{
    ChunkPos, MeshData, MeshSink, Pipeline, StreamConfig, Vec3, World, WorldGenConfig,
    load_world, save_world,
};

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless voxel streaming pipeline")]
struct Args {
    /// World seed (overridden by a loaded world's saved seed).
    #[arg(long, default_value_t = 1337)]
    seed: i64,
    /// Number of pipeline ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Streaming config TOML path.
    #[arg(long)]
    stream_config: Option<PathBuf>,
    /// World generation config TOML path.
    #[arg(long)]
    gen_config: Option<PathBuf>,
    /// World directory to load on start and save on exit.
    #[arg(long)]
    world_dir: Option<PathBuf>,
}

/// Keeps the latest mesh per chunk, standing in for a renderer.
#[derive(Default)]
struct CollectSink {
    meshes: HashMap<ChunkPos, MeshData>,
    uploads: u64,
}

impl MeshSink for CollectSink {
    fn upload_chunk_mesh(&mut self, pos: ChunkPos, mesh: &MeshData) {
        self.uploads += 1;
        self.meshes.insert(pos, mesh.clone());
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let gen_cfg = match &args.gen_config {
        Some(path) => match WorldGenConfig::load_from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("failed to read {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => WorldGenConfig::default(),
    };
    let stream_cfg = match &args.stream_config {
        Some(path) => match StreamConfig::load_from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("failed to read {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => StreamConfig::default(),
    };

    let mut seed = args.seed;
    let mut player_pos = Vec3::new(8.0, 32.0, 8.0);

    // A saved seed must win before the world is constructed, so peek at the
    // save with a throwaway manager first.
    let mut staged = None;
    if let Some(dir) = &args.world_dir {
        let probe_world = Arc::new(World::new(seed, gen_cfg.clone()));
        let mut probe = strata::ChunkManager::new(probe_world, stream_cfg.clone());
        match load_world(dir, &mut probe) {
            Ok(loaded) => {
                if let Some(s) = loaded.seed {
                    seed = s;
                }
                player_pos = loaded.player_pos;
                staged = Some(probe);
            }
            Err(e) => log::warn!("no world loaded from {}: {e}", dir.display()),
        }
    }

    let world = Arc::new(World::new(seed, gen_cfg));
    let mut pipeline = Pipeline::new(world.clone(), stream_cfg);
    if let Some(probe) = &mut staged {
        // Re-stage the persisted chunks into the live manager.
        for (pos, blocks) in probe.drain_preloaded() {
            pipeline.manager_mut().preload_chunk_data(pos, blocks);
        }
    }

    let viewer = ChunkPos::new(
        (player_pos.x.floor() as i32).div_euclid(world.chunk_size_x as i32),
        (player_pos.y.floor() as i32).div_euclid(world.chunk_size_y as i32),
        (player_pos.z.floor() as i32).div_euclid(world.chunk_size_z as i32),
    );

    let mut sink = CollectSink::default();
    for tick in 0..args.ticks {
        pipeline.pump(&mut sink, viewer);
        if tick % 100 == 0 {
            let (queued, running) = pipeline.queue_debug_counts();
            log::info!(
                "tick {tick}: {} chunks resident, {} uploads, {queued} queued, {running} running",
                pipeline.manager().len(),
                sink.uploads
            );
        }
    }

    let verts: usize = sink
        .meshes
        .values()
        .map(|m| m.opaque.vertices.len() + m.transparent.vertices.len())
        .sum();
    log::info!(
        "done: {} chunks resident, {} meshes uploaded, {verts} vertices",
        pipeline.manager().len(),
        sink.meshes.len()
    );

    if let Some(dir) = &args.world_dir
        && let Err(e) = save_world(dir, pipeline.manager(), player_pos, seed)
    {
        log::error!("save failed: {e}");
    }
}
