//! Worker pool executing generation and meshing jobs off the driving thread.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_blocks::Block;
use strata_chunk::{Chunk, ChunkBuf, ChunkState, generate_chunk_buffer};
use strata_mesh::{ChunkNeighbors, MeshData, build_chunk_mesh};
use strata_world::{ChunkPos, GenCtx, World};

/// Fill a chunk's block grid, either from generation or from preloaded
/// persisted blocks.
pub struct GenerateJob {
    pub chunk: Arc<Chunk>,
    /// Persisted blocks staged before the chunk existed. Used verbatim;
    /// the chunk is marked modified since it diverged from generation.
    pub preloaded: Option<Vec<Block>>,
    pub job_id: u64,
}

/// Build a mesh from a snapshot of a chunk plus its six face neighbors.
pub struct MeshJob {
    pub chunk: Arc<Chunk>,
    pub buf: ChunkBuf,
    pub neighbors: ChunkNeighbors,
    pub lod: u8,
    pub job_id: u64,
}

enum Job {
    Generate(GenerateJob),
    Mesh(MeshJob),
}

/// Completed work handed back to the driving thread.
pub enum JobOut {
    Generated {
        pos: ChunkPos,
        job_id: u64,
        t_gen_ms: u32,
    },
    Meshed {
        pos: ChunkPos,
        lod: u8,
        mesh: MeshData,
        job_id: u64,
        t_mesh_ms: u32,
    },
}

impl JobOut {
    #[inline]
    pub fn pos(&self) -> ChunkPos {
        match self {
            JobOut::Generated { pos, .. } | JobOut::Meshed { pos, .. } => *pos,
        }
    }
}

#[inline]
fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn process_job(job: Job, world: &World, ctx: &GenCtx, tx: &Sender<JobOut>) {
    match job {
        Job::Generate(job) => {
            let t0 = Instant::now();
            let pos = job.chunk.pos;
            match job.preloaded {
                Some(blocks) => {
                    let buf = ChunkBuf::from_blocks_local(
                        pos,
                        world.chunk_size_x,
                        world.chunk_size_y,
                        world.chunk_size_z,
                        blocks,
                    );
                    job.chunk.install_blocks(buf);
                    job.chunk.set_modified();
                }
                None => {
                    job.chunk
                        .install_blocks(generate_chunk_buffer(world, ctx, pos));
                }
            }
            // This worker owns the Generating -> MeshBuild transition.
            job.chunk.set_state(ChunkState::MeshBuild);
            let _ = tx.send(JobOut::Generated {
                pos,
                job_id: job.job_id,
                t_gen_ms: elapsed_ms(t0),
            });
        }
        Job::Mesh(job) => {
            let t0 = Instant::now();
            let pos = job.chunk.pos;
            let mesh = build_chunk_mesh(&job.buf, &job.neighbors, job.lod);
            job.chunk.set_state(ChunkState::Ready);
            let _ = tx.send(JobOut::Meshed {
                pos,
                lod: job.lod,
                mesh,
                job_id: job.job_id,
                t_mesh_ms: elapsed_ms(t0),
            });
        }
    }
}

/// Fixed-size worker pool. Jobs are dispatched by the driving thread, which
/// guarantees at most one in-flight job per chunk; workers only ever touch
/// the chunk a job names. Dropping the runtime closes the job channel;
/// workers finish what is queued and the pool joins on drop, so no job
/// closure outlives its chunks.
pub struct Runtime {
    job_tx: Sender<Job>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    pub workers: usize,
}

impl Runtime {
    pub fn new(world: Arc<World>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strata-worker-{i}"))
                .build()
                .expect("worker pool"),
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let world = world.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            pool.spawn(move || {
                // One noise context per worker, reused across jobs.
                let ctx = world.make_gen_ctx();
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_job(job, world.as_ref(), &ctx, &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }

        log::info!(target: "runtime", "worker pool started: {workers} workers");
        Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
            workers,
        }
    }

    pub fn submit_generate(&self, job: GenerateJob) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(Job::Generate(job)).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn submit_mesh(&self, job: MeshJob) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(Job::Mesh(job)).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Non-blocking drain of completed jobs; called once per tick on the
    /// driving thread.
    pub fn drain_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// Blocks until one result is available. Test/shutdown helper; the
    /// driving thread's tick path uses [`Runtime::drain_results`].
    pub fn recv_result(&self) -> Option<JobOut> {
        self.res_rx.recv().ok()
    }

    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}
