use std::sync::Arc;

use strata_blocks::{Block, BlockType};
use strata_chunk::ChunkBuf;
use strata_mesh::{ChunkNeighbors, Face, MeshData, build_chunk_mesh};
use strata_world::ChunkPos;

const N: usize = 16;

fn chunk_with<F: Fn(usize, usize, usize) -> Block>(f: F) -> ChunkBuf {
    let mut buf = ChunkBuf::new_air(ChunkPos::new(0, 0, 0), N, N, N);
    for y in 0..N {
        for z in 0..N {
            for x in 0..N {
                let b = f(x, y, z);
                buf.set_local(x, y, z, b);
            }
        }
    }
    buf
}

fn quad_areas(mesh: &MeshData) -> Vec<u32> {
    // Every quad's 4 vertices carry the same tile dims; sample one per quad.
    let mut areas: Vec<u32> = mesh
        .opaque
        .vertices
        .chunks(4)
        .chain(mesh.transparent.vertices.chunks(4))
        .map(|q| u32::from(q[0].tile[0]) * u32::from(q[0].tile[1]))
        .collect();
    areas.sort_unstable();
    areas
}

#[test]
fn half_stone_chunk_meshes_to_six_boundary_quads() {
    let buf = chunk_with(|_, y, _| {
        if y < 8 {
            Block::new(BlockType::Stone)
        } else {
            Block::AIR
        }
    });
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 0);

    // Top 16x16, bottom 16x16 (absent neighbor below reads as air, so the
    // bottom face IS drawn), four 16x8 sides.
    assert_eq!(mesh.opaque.quad_count(), 6);
    assert_eq!(mesh.opaque.vertices.len(), 24);
    assert_eq!(mesh.opaque.indices.len(), 36);
    assert!(mesh.transparent.is_empty());
    assert_eq!(quad_areas(&mesh), vec![128, 128, 128, 128, 256, 256]);
}

#[test]
fn opaque_neighbor_suppresses_boundary_faces() {
    let solid = chunk_with(|_, _, _| Block::new(BlockType::Stone));
    let alone = build_chunk_mesh(&solid, &ChunkNeighbors::empty(), 0);
    assert_eq!(alone.opaque.quad_count(), 6);

    let mut neighbors = ChunkNeighbors::empty();
    let mut east = solid.clone();
    east.pos = ChunkPos::new(1, 0, 0);
    neighbors.set(Face::PosX, Arc::new(east));
    let blocked = build_chunk_mesh(&solid, &neighbors, 0);
    assert_eq!(blocked.opaque.quad_count(), 5);
    assert!(
        blocked
            .opaque
            .vertices
            .iter()
            .all(|v| v.normal != Face::PosX.index() as u8)
    );
}

#[test]
fn meshing_is_idempotent() {
    let buf = chunk_with(|x, y, z| {
        // A bumpy heightfield with a pond.
        let h = 4 + (x * 31 + z * 17) % 7;
        if y < h {
            Block::new(BlockType::Stone)
        } else if y < 6 {
            Block::WATER
        } else if x == z && y == h {
            Block::new(BlockType::Ice)
        } else {
            Block::AIR
        }
    });
    let nb = ChunkNeighbors::empty();
    let a = build_chunk_mesh(&buf, &nb, 0);
    let b = build_chunk_mesh(&buf, &nb, 0);
    assert_eq!(a.opaque.vertices.len(), b.opaque.vertices.len());
    assert_eq!(a.opaque.indices.len(), b.opaque.indices.len());
    assert_eq!(a.transparent.vertices.len(), b.transparent.vertices.len());
    assert_eq!(a.transparent.indices.len(), b.transparent.indices.len());
    assert_eq!(quad_areas(&a), quad_areas(&b));
}

#[test]
fn water_and_ice_stay_unit_quads_in_transparent_stream() {
    let buf = chunk_with(|x, y, z| {
        if y == 0 && x < 4 && z < 4 {
            Block::WATER
        } else if y == 0 && x >= 8 && x < 12 && z < 4 {
            Block::new(BlockType::Ice)
        } else {
            Block::AIR
        }
    });
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 0);
    assert!(mesh.opaque.is_empty());
    assert!(!mesh.transparent.is_empty());
    assert!(
        mesh.transparent
            .vertices
            .iter()
            .all(|v| v.tile == [1, 1])
    );
    // 4x4 water sheet: 16 unit top faces rather than one merged quad.
    let water_top = mesh
        .transparent
        .vertices
        .chunks(4)
        .filter(|q| {
            q[0].material == BlockType::Water.id() && q[0].normal == Face::PosY.index() as u8
        })
        .count();
    assert_eq!(water_top, 16);
}

#[test]
fn water_does_not_draw_against_ice_or_itself() {
    let buf = chunk_with(|x, y, _| {
        if y > 0 {
            Block::AIR
        } else if x < 2 {
            Block::WATER
        } else if x == 2 {
            Block::new(BlockType::Ice)
        } else {
            Block::AIR
        }
    });
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 0);
    // The water column at x=1 faces ice at x=2: no +X water face there.
    let water_pos_x = mesh
        .transparent
        .vertices
        .chunks(4)
        .filter(|q| {
            q[0].material == BlockType::Water.id()
                && q[0].normal == Face::PosX.index() as u8
                && q.iter().all(|v| v.pos[0] == 2)
        })
        .count();
    assert_eq!(water_pos_x, 0);
    // Between the two water columns (x=0 and x=1) no internal faces appear.
    let internal = mesh
        .transparent
        .vertices
        .chunks(4)
        .filter(|q| q[0].material == BlockType::Water.id() && q.iter().all(|v| v.pos[0] == 1))
        .count();
    assert_eq!(internal, 0);
}

#[test]
fn ao_corner_extremes() {
    // Stone at (1,0,1); two solid blocks one level up flanking one corner of
    // its top face.
    let buf = chunk_with(|x, y, z| {
        if (x, y, z) == (1, 0, 1) || (x, y, z) == (0, 1, 1) || (x, y, z) == (1, 1, 0) {
            Block::new(BlockType::Stone)
        } else {
            Block::AIR
        }
    });
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 0);
    let top_quad: Vec<_> = mesh
        .opaque
        .vertices
        .chunks(4)
        .find(|q| {
            q[0].normal == Face::PosY.index() as u8
                && q.iter().all(|v| v.pos[1] == 1)
                && q.iter().any(|v| v.pos == [1, 1, 1])
        })
        .expect("top face of the buried stone")
        .to_vec();
    for v in &top_quad {
        match (v.pos[0], v.pos[2]) {
            // Both edge-adjacent neighbors solid: fully occluded.
            (1, 1) => assert_eq!(v.ao, 0),
            // No neighbors at all: fully open.
            (2, 2) => assert_eq!(v.ao, 3),
            _ => {}
        }
    }
}

#[test]
fn lod_halves_cells_but_keeps_extent() {
    let buf = chunk_with(|_, _, _| Block::new(BlockType::Stone));
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 1);
    // A full cube still merges each face into one quad spanning the chunk.
    assert_eq!(mesh.opaque.quad_count(), 6);
    assert!(
        mesh.opaque
            .vertices
            .iter()
            .all(|v| v.pos.iter().all(|&c| c == 0 || c == 16))
    );
    assert!(mesh.opaque.vertices.iter().all(|v| v.tile == [16, 16]));
}

#[test]
fn empty_chunk_meshes_to_nothing() {
    let buf = ChunkBuf::new_air(ChunkPos::new(0, 0, 0), N, N, N);
    let mesh = build_chunk_mesh(&buf, &ChunkNeighbors::empty(), 0);
    assert!(mesh.is_empty());
}
