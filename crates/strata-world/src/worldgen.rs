use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use strata_blocks::BlockType;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size_x: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size_y: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size_z: usize,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub climate: Climate,
    #[serde(default)]
    pub caves: Carvers,
    #[serde(default = "default_biomes")]
    pub biomes: Vec<BiomeDef>,
}

fn default_chunk_size() -> usize {
    16
}
fn default_sea_level() -> i32 {
    20
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            chunk_size_x: default_chunk_size(),
            chunk_size_y: default_chunk_size(),
            chunk_size_z: default_chunk_size(),
            sea_level: default_sea_level(),
            height: Height::default(),
            climate: Climate::default(),
            caves: Carvers::default(),
            biomes: default_biomes(),
        }
    }
}

impl WorldGenConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    /// Chunk volume in blocks.
    #[inline]
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size_x * self.chunk_size_y * self.chunk_size_z
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_frequency")]
    pub frequency: f32,
    #[serde(default = "default_height_min")]
    pub min: i32,
    #[serde(default = "default_height_max")]
    pub max: i32,
    #[serde(default = "default_mountain_frequency")]
    pub mountain_frequency: f32,
    #[serde(default = "default_mountain_amplitude")]
    pub mountain_amplitude: i32,
}
fn default_height_frequency() -> f32 {
    0.01
}
fn default_height_min() -> i32 {
    8
}
fn default_height_max() -> i32 {
    40
}
fn default_mountain_frequency() -> f32 {
    0.02
}
fn default_mountain_amplitude() -> i32 {
    24
}
impl Default for Height {
    fn default() -> Self {
        Self {
            frequency: default_height_frequency(),
            min: default_height_min(),
            max: default_height_max(),
            mountain_frequency: default_mountain_frequency(),
            mountain_amplitude: default_mountain_amplitude(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Climate {
    #[serde(default = "default_temp_frequency")]
    pub temperature_frequency: f32,
    #[serde(default = "default_humidity_frequency")]
    pub humidity_frequency: f32,
}
fn default_temp_frequency() -> f32 {
    0.004
}
fn default_humidity_frequency() -> f32 {
    0.005
}
impl Default for Climate {
    fn default() -> Self {
        Self {
            temperature_frequency: default_temp_frequency(),
            humidity_frequency: default_humidity_frequency(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Carvers {
    #[serde(default = "default_cave_frequency")]
    pub frequency: f32,
    #[serde(default = "default_cave_threshold")]
    pub threshold: f32,
    #[serde(default = "default_cave_floor")]
    pub floor: i32,
    #[serde(default = "default_cave_ceiling_above_sea")]
    pub ceiling_above_sea: i32,
}
fn default_cave_frequency() -> f32 {
    0.05
}
fn default_cave_threshold() -> f32 {
    0.08
}
fn default_cave_floor() -> i32 {
    5
}
fn default_cave_ceiling_above_sea() -> i32 {
    10
}
impl Default for Carvers {
    fn default() -> Self {
        Self {
            frequency: default_cave_frequency(),
            threshold: default_cave_threshold(),
            floor: default_cave_floor(),
            ceiling_above_sea: default_cave_ceiling_above_sea(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BiomeKind {
    Normal,
    Ocean,
    Mountains,
}

/// One row of the climate lookup table. Temperature/humidity ranges are
/// half-open `[min, max)` over normalized `[0, 1]` noise.
#[derive(Clone, Debug, Deserialize)]
pub struct BiomeDef {
    pub name: String,
    pub temp_min: f32,
    pub temp_max: f32,
    pub humidity_min: f32,
    pub humidity_max: f32,
    pub surface: BlockType,
    pub subsurface: BlockType,
    #[serde(default = "default_surface_depth")]
    pub surface_depth: i32,
    #[serde(default = "default_height_weight")]
    pub height_weight: f32,
    #[serde(default = "default_biome_kind")]
    pub kind: BiomeKind,
    /// Frozen biomes cap standing water with ice.
    #[serde(default)]
    pub freeze: bool,
}
fn default_surface_depth() -> i32 {
    3
}
fn default_height_weight() -> f32 {
    1.0
}
fn default_biome_kind() -> BiomeKind {
    BiomeKind::Normal
}

fn biome(
    name: &str,
    temp: (f32, f32),
    humidity: (f32, f32),
    surface: BlockType,
    subsurface: BlockType,
    kind: BiomeKind,
    freeze: bool,
) -> BiomeDef {
    BiomeDef {
        name: name.to_string(),
        temp_min: temp.0,
        temp_max: temp.1,
        humidity_min: humidity.0,
        humidity_max: humidity.1,
        surface,
        subsurface,
        surface_depth: default_surface_depth(),
        height_weight: default_height_weight(),
        kind,
        freeze,
    }
}

/// Built-in biome table covering the whole `[0,1]²` climate square, so the
/// lookup is total without a fallback row.
fn default_biomes() -> Vec<BiomeDef> {
    use BlockType::*;
    let mut defs = vec![
        biome("tundra", (0.0, 0.25), (0.0, 1.01), Snow, Dirt, BiomeKind::Normal, true),
        biome("mountains", (0.25, 0.45), (0.0, 0.4), Stone, Stone, BiomeKind::Mountains, false),
        biome("taiga", (0.25, 0.45), (0.4, 1.01), Grass, Dirt, BiomeKind::Normal, true),
        biome("plains", (0.45, 0.7), (0.0, 0.55), Grass, Dirt, BiomeKind::Normal, false),
        biome("forest", (0.45, 0.7), (0.55, 1.01), Grass, Dirt, BiomeKind::Normal, false),
        biome("desert", (0.7, 1.01), (0.0, 0.45), Sand, Sand, BiomeKind::Normal, false),
        biome("swamp", (0.7, 1.01), (0.45, 0.75), Mud, Dirt, BiomeKind::Normal, false),
        biome("ocean", (0.7, 1.01), (0.75, 1.01), Sand, Gravel, BiomeKind::Ocean, false),
    ];
    for def in &mut defs {
        if def.kind == BiomeKind::Mountains {
            def.height_weight = 1.2;
            def.surface_depth = 1;
        }
    }
    defs
}
