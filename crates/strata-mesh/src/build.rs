use strata_blocks::{Block, BlockType};
use strata_chunk::ChunkBuf;

use crate::face::{ALL_FACES, Face};
use crate::neighbors::ChunkNeighbors;
use crate::vertex::{MeshData, Vertex};

/// Samples a block at chunk-local coordinates, deferring to the matching
/// face neighbor when exactly one axis is out of range. Diagonal
/// out-of-range samples (AO probes at chunk corners) and missing neighbors
/// read as air.
fn sample(buf: &ChunkBuf, neighbors: &ChunkNeighbors, x: i32, y: i32, z: i32) -> Block {
    let sx = buf.sx as i32;
    let sy = buf.sy as i32;
    let sz = buf.sz as i32;
    let x_in = (0..sx).contains(&x);
    let y_in = (0..sy).contains(&y);
    let z_in = (0..sz).contains(&z);
    if x_in && y_in && z_in {
        return buf.get_local(x as usize, y as usize, z as usize);
    }
    let (face, nx, ny, nz) = match (x_in, y_in, z_in) {
        (false, true, true) => {
            if x < 0 {
                (Face::NegX, x + sx, y, z)
            } else {
                (Face::PosX, x - sx, y, z)
            }
        }
        (true, false, true) => {
            if y < 0 {
                (Face::NegY, x, y + sy, z)
            } else {
                (Face::PosY, x, y - sy, z)
            }
        }
        (true, true, false) => {
            if z < 0 {
                (Face::NegZ, x, y, z + sz)
            } else {
                (Face::PosZ, x, y, z - sz)
            }
        }
        _ => return Block::AIR,
    };
    neighbors
        .get(face)
        .map(|nb| nb.get_local(nx as usize, ny as usize, nz as usize))
        .unwrap_or(Block::AIR)
}

/// Face-visibility rule for a block against the sample on the far side of
/// the face. Water never draws against water, opaque blocks, or ice (which
/// would z-fight); other transparents self-occlude against their own type;
/// solids draw against anything non-opaque.
#[inline]
fn face_visible(b: Block, nb: Block) -> bool {
    if b.is_water() {
        !nb.is_water() && !nb.is_opaque() && nb.ty != BlockType::Ice
    } else if b.is_transparent() {
        !nb.is_opaque() && nb.ty != b.ty
    } else {
        !nb.is_opaque()
    }
}

/// Water and ice are always emitted as unit quads; merged rectangles would
/// show seams once per-vertex displacement is applied downstream.
#[inline]
fn exempt_from_merging(ty: BlockType) -> bool {
    matches!(ty, BlockType::Water | BlockType::Ice)
}

struct FaceSweep<'a> {
    buf: &'a ChunkBuf,
    neighbors: &'a ChunkNeighbors,
    face: Face,
    step: i32,
    nu: i32,
    nv: i32,
    nw: i32,
}

impl<'a> FaceSweep<'a> {
    fn new(buf: &'a ChunkBuf, neighbors: &'a ChunkNeighbors, face: Face, lod: u8) -> Self {
        let step = 1i32 << lod;
        let sx = (buf.sx as i32) >> lod;
        let sy = (buf.sy as i32) >> lod;
        let sz = (buf.sz as i32) >> lod;
        let (nu, nv, nw) = match face {
            Face::PosX | Face::NegX => (sz, sy, sx),
            Face::PosY | Face::NegY => (sx, sz, sy),
            Face::PosZ | Face::NegZ => (sx, sy, sz),
        };
        FaceSweep {
            buf,
            neighbors,
            face,
            step,
            nu,
            nv,
            nw,
        }
    }

    /// Point-samples the block for a plane cell. LOD cells resolve to the
    /// block at the scaled corner, not an average.
    #[inline]
    fn cell(&self, u: i32, v: i32, w: i32) -> Block {
        let (x, y, z) = self.face.plane_to_grid(u, v, w);
        sample(
            self.buf,
            self.neighbors,
            x * self.step,
            y * self.step,
            z * self.step,
        )
    }

    #[inline]
    fn air_side(&self, w: i32) -> i32 {
        if self.face.is_positive() { w + 1 } else { w - 1 }
    }

    /// AO for one quad corner at plane-corner `(cu, cv)` of a quad spanning
    /// `[u0, u0+qw) x [v0, v0+qh)`: the two edge-adjacent cells plus the
    /// diagonal cell on the air side of the face. Both edges solid pins the
    /// corner fully dark.
    #[allow(clippy::too_many_arguments)]
    fn corner_ao(&self, cu: i32, cv: i32, u0: i32, v0: i32, qw: i32, qh: i32, w_air: i32) -> u8 {
        let u_out = if cu == u0 { u0 - 1 } else { u0 + qw };
        let v_out = if cv == v0 { v0 - 1 } else { v0 + qh };
        let u_in = if cu == u0 { u0 } else { u0 + qw - 1 };
        let v_in = if cv == v0 { v0 } else { v0 + qh - 1 };
        let side_u = self.cell(u_out, v_in, w_air).is_solid();
        let side_v = self.cell(u_in, v_out, w_air).is_solid();
        if side_u && side_v {
            return 0;
        }
        let corner = self.cell(u_out, v_out, w_air).is_solid();
        3 - (side_u as u8 + side_v as u8 + corner as u8)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(&self, out: &mut MeshData, ty: BlockType, u0: i32, v0: i32, w: i32, qw: i32, qh: i32) {
        let w_air = self.air_side(w);
        let w_blk = if self.face.is_positive() {
            (w + 1) * self.step
        } else {
            w * self.step
        };
        // Corner order: (u0,v0), (u0+qw,v0), (u0+qw,v0+qh), (u0,v0+qh).
        let corners = [(u0, v0), (u0 + qw, v0), (u0 + qw, v0 + qh), (u0, v0 + qh)];
        let tile = [(qw * self.step) as u8, (qh * self.step) as u8];
        let mut verts = [Vertex::new([0, 0, 0], 0, 0, tile, 0); 4];
        let mut ao = [0u8; 4];
        for (i, (cu, cv)) in corners.iter().copied().enumerate() {
            ao[i] = self.corner_ao(cu, cv, u0, v0, qw, qh, w_air);
            let (x, y, z) = self.face.plane_to_grid(cu * self.step, cv * self.step, w_blk);
            verts[i] = Vertex::new(
                [x as i16, y as i16, z as i16],
                self.face.index() as u8,
                ty.id(),
                tile,
                ao[i],
            );
        }
        // Split along whichever diagonal joins the brighter corner pair, so
        // AO interpolation does not carve a dark crease across the quad.
        let flip_diagonal = ao[1] + ao[3] > ao[0] + ao[2];
        let bucket = if matches!(ty, BlockType::Water | BlockType::Ice) {
            &mut out.transparent
        } else {
            &mut out.opaque
        };
        bucket.push_quad(verts, flip_diagonal, self.face.reversed_winding());
    }

    fn run(&self, out: &mut MeshData) {
        let (nu, nv) = (self.nu, self.nv);
        let mut mask: Vec<Option<BlockType>> = vec![None; (nu * nv) as usize];
        for w in 0..self.nw {
            mask.fill(None);
            let dw = if self.face.is_positive() { 1 } else { -1 };
            for v in 0..nv {
                for u in 0..nu {
                    let b = self.cell(u, v, w);
                    if !(b.is_solid() || b.is_water()) {
                        continue;
                    }
                    let nb = self.cell(u, v, w + dw);
                    if face_visible(b, nb) {
                        mask[(v * nu + u) as usize] = Some(b.ty);
                    }
                }
            }
            // Greedy maximal rectangles: grow a run along u, then extend it
            // down v while every covered cell still matches.
            for v in 0..nv {
                for u in 0..nu {
                    let Some(ty) = mask[(v * nu + u) as usize] else {
                        continue;
                    };
                    let mut qw = 1;
                    let mut qh = 1;
                    if !exempt_from_merging(ty) {
                        while u + qw < nu && mask[(v * nu + u + qw) as usize] == Some(ty) {
                            qw += 1;
                        }
                        'grow: while v + qh < nv {
                            for du in 0..qw {
                                if mask[((v + qh) * nu + u + du) as usize] != Some(ty) {
                                    break 'grow;
                                }
                            }
                            qh += 1;
                        }
                    }
                    for dv in 0..qh {
                        for du in 0..qw {
                            mask[((v + dv) * nu + u + du) as usize] = None;
                        }
                    }
                    self.emit(out, ty, u, v, w, qw, qh);
                }
            }
        }
    }
}

/// Builds the renderable mesh for one chunk at the given LOD.
///
/// Total over its inputs: absent neighbors read as air and an empty chunk
/// yields an empty mesh. Sampling steps by `1 << lod` blocks per cell
/// (point sampling, a documented quality/perf tradeoff for distant chunks).
pub fn build_chunk_mesh(buf: &ChunkBuf, neighbors: &ChunkNeighbors, lod: u8) -> MeshData {
    let mut out = MeshData::default();
    for face in ALL_FACES {
        FaceSweep::new(buf, neighbors, face, lod).run(&mut out);
    }
    log::trace!(
        target: "mesh",
        "built chunk {:?} lod={} opaque_quads={} transparent_quads={}",
        buf.pos,
        lod,
        out.opaque.quad_count(),
        out.transparent.quad_count()
    );
    out
}
