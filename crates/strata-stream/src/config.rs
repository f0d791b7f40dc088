use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Streaming and scheduling knobs. LOD distances are inclusive upper bounds
/// in chunk units; a distance past the last band uses one LOD level more
/// than the last entry's index.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_radius_chunks")]
    pub radius_chunks: i32,
    #[serde(default = "default_hysteresis_chunks")]
    pub hysteresis_chunks: i32,
    #[serde(default = "default_unload_grace_secs")]
    pub unload_grace_secs: f32,
    #[serde(default = "default_lod_distances")]
    pub lod_distances: Vec<i32>,
    #[serde(default = "default_max_generate_per_tick")]
    pub max_generate_per_tick: usize,
    #[serde(default = "default_max_mesh_per_tick")]
    pub max_mesh_per_tick: usize,
    #[serde(default = "default_fluid_budget_per_tick")]
    pub fluid_budget_per_tick: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_radius_chunks() -> i32 {
    8
}
fn default_hysteresis_chunks() -> i32 {
    2
}
fn default_unload_grace_secs() -> f32 {
    5.0
}
fn default_lod_distances() -> Vec<i32> {
    vec![4, 8, 12]
}
fn default_max_generate_per_tick() -> usize {
    16
}
fn default_max_mesh_per_tick() -> usize {
    16
}
fn default_fluid_budget_per_tick() -> usize {
    64
}
fn default_workers() -> usize {
    4
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            radius_chunks: default_radius_chunks(),
            hysteresis_chunks: default_hysteresis_chunks(),
            unload_grace_secs: default_unload_grace_secs(),
            lod_distances: default_lod_distances(),
            max_generate_per_tick: default_max_generate_per_tick(),
            max_mesh_per_tick: default_max_mesh_per_tick(),
            fluid_budget_per_tick: default_fluid_budget_per_tick(),
            workers: default_workers(),
        }
    }
}

impl StreamConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    /// LOD level for a viewer distance in chunk units (Chebyshev).
    #[inline]
    pub fn lod_for_distance(&self, dist: i32) -> u8 {
        for (i, bound) in self.lod_distances.iter().enumerate() {
            if dist <= *bound {
                return i as u8;
            }
        }
        self.lod_distances.len() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: StreamConfig = toml::from_str("radius_chunks = 12").unwrap();
        assert_eq!(cfg.radius_chunks, 12);
        assert_eq!(cfg.hysteresis_chunks, 2);
        assert_eq!(cfg.unload_grace_secs, 5.0);
        assert_eq!(cfg.lod_distances, vec![4, 8, 12]);
    }

    #[test]
    fn lod_bands_are_inclusive_upper_bounds() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.lod_for_distance(0), 0);
        assert_eq!(cfg.lod_for_distance(4), 0);
        assert_eq!(cfg.lod_for_distance(5), 1);
        assert_eq!(cfg.lod_for_distance(8), 1);
        assert_eq!(cfg.lod_for_distance(12), 2);
        assert_eq!(cfg.lod_for_distance(13), 3);
        assert_eq!(cfg.lod_for_distance(1000), 3);
    }
}
