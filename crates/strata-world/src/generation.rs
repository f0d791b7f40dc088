use strata_blocks::{Block, BlockType};

use crate::worldgen::{BiomeDef, BiomeKind};

use super::{GenCtx, World};

/// Everything terrain synthesis needs to know about one (x, z) column.
/// Computed once per column, then queried per vertical cell.
#[derive(Clone, Debug)]
pub struct ColumnProfile {
    pub height: i32,
    pub surface: BlockType,
    pub subsurface: BlockType,
    pub surface_depth: i32,
    pub freeze: bool,
}

#[inline]
fn normalize(noise: f32) -> f32 {
    ((noise + 1.0) * 0.5).clamp(0.0, 1.0)
}

impl World {
    /// Climate lookup: normalized (temperature, humidity) at a column.
    pub fn climate_at(&self, ctx: &GenCtx, wx: i32, wz: i32) -> (f32, f32) {
        let t = normalize(ctx.temperature.get_noise_2d(wx as f32, wz as f32));
        let m = normalize(ctx.humidity.get_noise_2d(wx as f32, wz as f32));
        (t, m)
    }

    fn biome_at<'c>(&self, ctx: &'c GenCtx, wx: i32, wz: i32) -> &'c BiomeDef {
        let (t, m) = self.climate_at(ctx, wx, wz);
        ctx.cfg
            .biomes
            .iter()
            .find(|b| t >= b.temp_min && t < b.temp_max && m >= b.humidity_min && m < b.humidity_max)
            // The built-in table is total; a sparse user table falls back to its first row.
            .unwrap_or(&ctx.cfg.biomes[0])
    }

    /// Deterministic column profile: same `(wx, wz, seed)` always yields the
    /// same result.
    pub fn sample_column(&self, ctx: &GenCtx, wx: i32, wz: i32) -> ColumnProfile {
        let cfg = &ctx.cfg;
        let biome = self.biome_at(ctx, wx, wz);
        let n = normalize(ctx.terrain.get_noise_2d(wx as f32, wz as f32));
        let span = (cfg.height.max - cfg.height.min).max(0) as f32;
        let mut height = cfg.height.min + (n * span * biome.height_weight) as i32;
        match biome.kind {
            BiomeKind::Ocean => {
                height = height.min(self.sea_level - 3);
            }
            BiomeKind::Mountains => {
                let ridge = normalize(ctx.mountain.get_noise_2d(wx as f32, wz as f32));
                height += (ridge * cfg.height.mountain_amplitude as f32) as i32;
            }
            BiomeKind::Normal => {}
        }
        ColumnProfile {
            height: height.max(1),
            surface: biome.surface,
            subsurface: biome.subsurface,
            surface_depth: biome.surface_depth.max(1),
            freeze: biome.freeze,
        }
    }

    #[inline]
    fn in_cave(&self, ctx: &GenCtx, wx: i32, wy: i32, wz: i32) -> bool {
        let cfg = &ctx.cfg;
        if wy <= cfg.caves.floor || wy >= self.sea_level + cfg.caves.ceiling_above_sea {
            return false;
        }
        let (x, y, z) = (wx as f32, wy as f32, wz as f32);
        ctx.cave_a.get_noise_3d(x, y, z).abs() < cfg.caves.threshold
            && ctx.cave_b.get_noise_3d(x, y, z).abs() < cfg.caves.threshold
    }

    /// Block for one vertical cell of a sampled column.
    pub fn block_in_column(
        &self,
        ctx: &GenCtx,
        col: &ColumnProfile,
        wx: i32,
        wy: i32,
        wz: i32,
    ) -> Block {
        // Cave cavities override strata: air, or water when flooded.
        if self.in_cave(ctx, wx, wy, wz) {
            return if wy < self.sea_level {
                Block::WATER
            } else {
                Block::AIR
            };
        }
        if wy < col.height - col.surface_depth {
            return Block::new(BlockType::Stone);
        }
        if wy < col.height - 1 {
            return Block::new(col.subsurface);
        }
        if wy == col.height - 1 {
            return Block::new(col.surface);
        }
        if wy < self.sea_level {
            return if col.freeze && wy == self.sea_level - 1 {
                Block::new(BlockType::Ice)
            } else {
                Block::WATER
            };
        }
        Block::AIR
    }
}
