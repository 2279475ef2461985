//! Axial/cubic hex coordinates.
//!
//! Axial `(q, r)` maps to cubic `(x, y, z)` as `x = q`, `z = r`, `y = -q - r`.

use serde::{Deserialize, Serialize};

/// One of the six neighbour directions, `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Direction(u8);

impl Direction {
    pub const COUNT: u8 = 6;

    pub const ALL: [Direction; 6] = [
        Direction(0),
        Direction(1),
        Direction(2),
        Direction(3),
        Direction(4),
        Direction(5),
    ];

    /// Build a direction from any integer, wrapping modulo 6.
    pub fn new(value: i32) -> Self {
        Direction(value.rem_euclid(Self::COUNT as i32) as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Rotate by `steps` (positive is counter-clockwise in index order).
    pub fn rotate(self, steps: i32) -> Self {
        Self::new(self.0 as i32 + steps)
    }

    pub fn opposite(self) -> Self {
        self.rotate(3)
    }

    /// Unit delta in cubic space.
    pub fn delta(self) -> Cubic {
        let (x, y, z) = match self.0 {
            0 => (1, -1, 0),
            1 => (0, -1, 1),
            2 => (-1, 0, 1),
            3 => (-1, 1, 0),
            4 => (0, 1, -1),
            5 => (1, 0, -1),
            _ => unreachable!("direction out of range: {}", self.0),
        };
        Cubic { x, y, z }
    }

    /// Screen angle of this direction in radians, as drawn by renderers.
    pub fn angle(self) -> f32 {
        self.0 as f32 / 6.0 * std::f32::consts::TAU + std::f32::consts::PI / 6.0
    }
}

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

/// Cubic hex coordinate with `x + y + z == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cubic {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Axial {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn to_cubic(self) -> Cubic {
        Cubic {
            x: self.q,
            y: -self.q - self.r,
            z: self.r,
        }
    }

    /// Neighbouring coordinate in `direction`.
    pub fn step(self, direction: Direction) -> Axial {
        self.to_cubic().step(direction).to_axial()
    }

    /// Coordinate reached after `distance` steps in `direction`.
    pub fn project(self, direction: Direction, distance: u32) -> Axial {
        let mut cubic = self.to_cubic();
        for _ in 0..distance {
            cubic = cubic.step(direction);
        }
        cubic.to_axial()
    }

    /// The six neighbours in direction order.
    pub fn neighbors(self) -> [Axial; 6] {
        Direction::ALL.map(|d| self.step(d))
    }

    pub fn distance(self, other: Axial) -> u32 {
        self.to_cubic().distance(other.to_cubic())
    }

    /// Pixel-space centre of this hex for a layout with the given hex size.
    pub fn to_pixel(self, hex_size: f32) -> (f32, f32) {
        let q = self.q as f32;
        let r = self.r as f32;
        (
            hex_size * 1.5 * q,
            hex_size * 3.0f32.sqrt() * (r + q / 2.0),
        )
    }
}

impl Cubic {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn to_axial(self) -> Axial {
        debug_assert_eq!(self.x + self.y + self.z, 0, "cubic invariant broken: {self:?}");
        Axial {
            q: self.x,
            r: self.z,
        }
    }

    pub fn step(self, direction: Direction) -> Cubic {
        let d = direction.delta();
        Cubic {
            x: self.x + d.x,
            y: self.y + d.y,
            z: self.z + d.z,
        }
    }

    /// Chebyshev distance in cubic space.
    pub fn distance(self, other: Cubic) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
            .max((self.z - other.z).unsigned_abs())
    }
}

impl From<(i32, i32)> for Axial {
    fn from((q, r): (i32, i32)) -> Self {
        Axial { q, r }
    }
}
