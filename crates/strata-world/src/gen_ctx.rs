use std::sync::Arc;

use fastnoise_lite::FastNoiseLite;

use crate::worldgen::WorldGenConfig;

/// Reusable per-worker bundle of seeded noise samplers. Building one is not
/// free, so workers hold on to theirs across jobs.
pub struct GenCtx {
    pub terrain: FastNoiseLite,
    pub mountain: FastNoiseLite,
    pub temperature: FastNoiseLite,
    pub humidity: FastNoiseLite,
    pub cave_a: FastNoiseLite,
    pub cave_b: FastNoiseLite,
    pub cfg: Arc<WorldGenConfig>,
}
