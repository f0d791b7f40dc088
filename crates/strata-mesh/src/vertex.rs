use bytemuck::{Pod, Zeroable};

/// Compact mesh vertex, 12 bytes, uploaded verbatim.
///
/// Positions are chunk-local block units; at LOD `L` they reach
/// `chunk_size` in steps of `1 << L`, which i16 holds with room to spare.
/// `tile` carries the merged quad's width/height in blocks so the shader can
/// tile the material texture across it. `ao` is 0 (fully occluded corner)
/// through 3 (open).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [i16; 3],
    pub normal: u8,
    pub material: u8,
    pub tile: [u8; 2],
    pub ao: u8,
    pub _pad: u8,
}

impl Vertex {
    #[inline]
    pub fn new(pos: [i16; 3], normal: u8, material: u8, tile: [u8; 2], ao: u8) -> Vertex {
        Vertex {
            pos,
            normal,
            material,
            tile,
            ao,
            _pad: 0,
        }
    }
}

/// One (vertex, index) buffer pair.
#[derive(Default, Clone, Debug)]
pub struct MeshBucket {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshBucket {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Appends one quad: 4 vertices, 2 triangles.
    ///
    /// `flip_diagonal` selects which pair of opposite corners shares the
    /// split edge; `reverse` flips winding for faces whose natural order is
    /// back-facing.
    pub fn push_quad(&mut self, verts: [Vertex; 4], flip_diagonal: bool, reverse: bool) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&verts);
        let order: [u32; 6] = match (flip_diagonal, reverse) {
            (false, false) => [0, 1, 2, 0, 2, 3],
            (false, true) => [0, 2, 1, 0, 3, 2],
            (true, false) => [1, 2, 3, 1, 3, 0],
            (true, true) => [1, 3, 2, 1, 0, 3],
        };
        self.indices.extend(order.iter().map(|i| base + i));
    }
}

/// Output of one mesh build: independent opaque and transparent streams,
/// replacing any prior mesh for the chunk atomically at upload time.
#[derive(Default, Clone, Debug)]
pub struct MeshData {
    pub opaque: MeshBucket,
    pub transparent: MeshBucket,
}

impl MeshData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 12);
        assert_eq!(std::mem::align_of::<Vertex>(), 2);
    }

    #[test]
    fn push_quad_emits_two_triangles() {
        let mut b = MeshBucket::default();
        let v = Vertex::new([0, 0, 0], 0, 1, [1, 1], 3);
        b.push_quad([v; 4], false, false);
        b.push_quad([v; 4], true, true);
        assert_eq!(b.vertices.len(), 8);
        assert_eq!(b.indices.len(), 12);
        assert_eq!(b.quad_count(), 2);
        // Second quad indexes into its own vertices only.
        assert!(b.indices[6..].iter().all(|&i| (4..8).contains(&i)));
    }
}
