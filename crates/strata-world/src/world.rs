use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::worldgen::WorldGenConfig;

use super::GenCtx;

/// Immutable world description: seed plus generation parameters. All block
/// synthesis flows through a [`GenCtx`] made from this.
pub struct World {
    pub chunk_size_x: usize,
    pub chunk_size_y: usize,
    pub chunk_size_z: usize,
    pub sea_level: i32,
    pub seed: i64,
    cfg: Arc<WorldGenConfig>,
}

impl World {
    pub fn new(seed: i64, cfg: WorldGenConfig) -> Self {
        Self {
            chunk_size_x: cfg.chunk_size_x,
            chunk_size_y: cfg.chunk_size_y,
            chunk_size_z: cfg.chunk_size_z,
            sea_level: cfg.sea_level,
            seed,
            cfg: Arc::new(cfg),
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldGenConfig {
        &self.cfg
    }

    #[inline]
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size_x * self.chunk_size_y * self.chunk_size_z
    }

    fn noise(&self, salt: i32, kind: NoiseType, frequency: f32) -> FastNoiseLite {
        let mut n = FastNoiseLite::with_seed((self.seed as i32) ^ salt);
        n.set_noise_type(Some(kind));
        n.set_frequency(Some(frequency));
        n
    }

    pub fn make_gen_ctx(&self) -> GenCtx {
        let cfg = Arc::clone(&self.cfg);
        let terrain = self.noise(0, NoiseType::OpenSimplex2, cfg.height.frequency);
        let mountain = self.noise(0x4D1B_77A3u32 as i32, NoiseType::OpenSimplex2, cfg.height.mountain_frequency);
        let temperature = self.noise(0x1203_5F31, NoiseType::OpenSimplex2, cfg.climate.temperature_frequency);
        let humidity = self.noise(0x92E3_A1B2u32 as i32, NoiseType::OpenSimplex2, cfg.climate.humidity_frequency);
        let cave_a = self.noise(0x0099_173B, NoiseType::OpenSimplex2, cfg.caves.frequency);
        let cave_b = self.noise(0x0041_337D, NoiseType::OpenSimplex2, cfg.caves.frequency);
        GenCtx {
            terrain,
            mountain,
            temperature,
            humidity,
            cave_a,
            cave_b,
            cfg,
        }
    }
}
