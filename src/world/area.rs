use crate::world::position::{Direction, Position, PositionDelta};
use serde::Deserialize;

/// Height, width and depth of an object, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Dimensions {
    #[serde(default = "one")]
    pub height: u16,
    #[serde(default = "one")]
    pub width: u16,
    #[serde(default = "one")]
    pub depth: u16,
}

fn one() -> u16 {
    1
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            height: 1,
            width: 1,
            depth: 1,
        }
    }
}

impl Dimensions {
    pub const fn new(height: u16, width: u16, depth: u16) -> Self {
        Self {
            height,
            width,
            depth,
        }
    }

    /// Zero extents are treated as one so every object covers its anchor.
    pub fn normalized(self) -> Self {
        Self {
            height: self.height.max(1),
            width: self.width.max(1),
            depth: self.depth.max(1),
        }
    }

    pub fn volume(self) -> u64 {
        let dims = self.normalized();
        u64::from(dims.height) * u64::from(dims.width) * u64::from(dims.depth)
    }
}

/// Axis-aligned box of cells anchored at its lowest `(y, x, z)` corner.
///
/// Coordinates are kept as `i32` so a box may extend past the grid; callers
/// check bounds cell by cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub y: i32,
    pub x: i32,
    pub z: i32,
    pub dims: Dimensions,
}

impl Footprint {
    pub fn new(anchor: Position, dims: Dimensions) -> Self {
        Self {
            y: i32::from(anchor.y),
            x: i32::from(anchor.x),
            z: i32::from(anchor.z),
            dims: dims.normalized(),
        }
    }

    pub fn shifted(self, delta: PositionDelta) -> Self {
        Self {
            y: self.y + delta.dy,
            x: self.x + delta.dx,
            z: self.z + delta.dz,
            dims: self.dims,
        }
    }

    pub fn anchor(&self) -> Option<Position> {
        to_position(self.y, self.x, self.z)
    }

    pub fn cell_count(&self) -> usize {
        self.dims.volume() as usize
    }

    /// Every cell of the box in `(y, x, z)` order; `None` marks a cell with a
    /// negative or overflowing coordinate.
    pub fn cells(&self) -> impl Iterator<Item = Option<Position>> + '_ {
        let (h, w, d) = (
            i32::from(self.dims.height),
            i32::from(self.dims.width),
            i32::from(self.dims.depth),
        );
        (0..h).flat_map(move |dy| {
            (0..w).flat_map(move |dx| {
                (0..d).map(move |dz| to_position(self.y + dy, self.x + dx, self.z + dz))
            })
        })
    }

    /// Cells directly underneath the bottom face of the box.
    pub fn cells_below(&self) -> Vec<Option<Position>> {
        let w = i32::from(self.dims.width);
        let d = i32::from(self.dims.depth);
        let mut cells = Vec::with_capacity((w * d) as usize);
        for dx in 0..w {
            for dz in 0..d {
                cells.push(to_position(self.y - 1, self.x + dx, self.z + dz));
            }
        }
        cells
    }

    pub fn contains(&self, position: Position) -> bool {
        let (y, x, z) = (
            i32::from(position.y),
            i32::from(position.x),
            i32::from(position.z),
        );
        y >= self.y
            && y < self.y + i32::from(self.dims.height)
            && x >= self.x
            && x < self.x + i32::from(self.dims.width)
            && z >= self.z
            && z < self.z + i32::from(self.dims.depth)
    }

    /// Chebyshev gap between two boxes; touching or overlapping boxes are 0.
    pub fn distance(&self, other: &Footprint) -> u32 {
        let gap = |a0: i32, a_len: u16, b0: i32, b_len: u16| -> i32 {
            let a1 = a0 + i32::from(a_len) - 1;
            let b1 = b0 + i32::from(b_len) - 1;
            if a1 < b0 {
                b0 - a1
            } else if b1 < a0 {
                a0 - b1
            } else {
                0
            }
        };
        let dy = gap(self.y, self.dims.height, other.y, other.dims.height);
        let dx = gap(self.x, self.dims.width, other.x, other.dims.width);
        let dz = gap(self.z, self.dims.depth, other.z, other.dims.depth);
        dy.max(dx).max(dz) as u32
    }
}

fn to_position(y: i32, x: i32, z: i32) -> Option<Position> {
    Some(Position {
        y: u16::try_from(y).ok()?,
        x: u16::try_from(x).ok()?,
        z: u16::try_from(z).ok()?,
    })
}

pub fn line_positions(origin: Position, direction: Direction, length: u32) -> Vec<Position> {
    if length == 0 {
        return Vec::new();
    }

    let mut positions = Vec::new();
    let mut current = origin;
    for _ in 0..length {
        let Some(next) = current.step(direction) else {
            break;
        };
        positions.push(next);
        current = next;
    }
    positions
}
