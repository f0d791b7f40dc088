#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
}

pub const ALL_FACES: [Face; 6] = [
    Face::PosY,
    Face::NegY,
    Face::PosX,
    Face::NegX,
    Face::PosZ,
    Face::NegZ,
];

impl Face {
    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a face index `[0..6)` back into a `Face` value.
    /// Falls back to `PosY` for out-of-range indices.
    #[inline]
    pub fn from_index(i: usize) -> Face {
        match i {
            0 => Face::PosY,
            1 => Face::NegY,
            2 => Face::PosX,
            3 => Face::NegX,
            4 => Face::PosZ,
            5 => Face::NegZ,
            _ => Face::PosY,
        }
    }

    /// Returns the integer grid delta `(dx,dy,dz)` when stepping out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
            Face::PosX => (1, 0, 0),
            Face::NegX => (-1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegZ => (0, 0, -1),
        }
    }

    /// Sweep direction is positive along the fixed axis.
    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Face::PosX | Face::PosY | Face::PosZ)
    }

    /// Faces whose base winding must be reversed so every emitted triangle is
    /// front-facing under one fixed convention.
    #[inline]
    pub fn reversed_winding(self) -> bool {
        matches!(self, Face::NegX | Face::PosY | Face::NegZ)
    }

    /// Maps sweep-plane coordinates `(u, v, w)` onto grid axes `(x, y, z)`.
    /// `w` is the fixed axis for this face; `u` and `v` span the mask.
    #[inline]
    pub fn plane_to_grid(self, u: i32, v: i32, w: i32) -> (i32, i32, i32) {
        match self {
            Face::PosX | Face::NegX => (w, v, u),
            Face::PosY | Face::NegY => (u, w, v),
            Face::PosZ | Face::NegZ => (u, v, w),
        }
    }
}
