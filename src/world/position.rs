use serde::Deserialize;

/// Grid coordinate. `y` is the vertical axis; "down" is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct Position {
    pub y: u16,
    pub x: u16,
    pub z: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionDelta {
    pub dy: i32,
    pub dx: i32,
    pub dz: i32,
}

impl Position {
    pub const fn new(y: u16, x: u16, z: u16) -> Self {
        Self { y, x, z }
    }

    pub fn offset(self, delta: PositionDelta) -> Option<Self> {
        let y = i32::from(self.y) + delta.dy;
        let x = i32::from(self.x) + delta.dx;
        let z = i32::from(self.z) + delta.dz;

        if y < 0 || x < 0 || z < 0 {
            return None;
        }

        if y > i32::from(u16::MAX) || x > i32::from(u16::MAX) || z > i32::from(u16::MAX) {
            return None;
        }

        Some(Self {
            y: y as u16,
            x: x as u16,
            z: z as u16,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Self> {
        self.offset(direction.delta())
    }

    pub fn below(self) -> Option<Self> {
        self.step(Direction::Down)
    }
}

impl PositionDelta {
    pub const fn new(dy: i32, dx: i32, dz: i32) -> Self {
        Self { dy, dx, dz }
    }

    pub fn is_zero(self) -> bool {
        self.dy == 0 && self.dx == 0 && self.dz == 0
    }
}

impl Direction {
    pub fn delta(self) -> PositionDelta {
        match self {
            Direction::North => PositionDelta { dy: 0, dx: 0, dz: -1 },
            Direction::East => PositionDelta { dy: 0, dx: 1, dz: 0 },
            Direction::South => PositionDelta { dy: 0, dx: 0, dz: 1 },
            Direction::West => PositionDelta { dy: 0, dx: -1, dz: 0 },
            Direction::Northeast => PositionDelta { dy: 0, dx: 1, dz: -1 },
            Direction::Northwest => PositionDelta { dy: 0, dx: -1, dz: -1 },
            Direction::Southeast => PositionDelta { dy: 0, dx: 1, dz: 1 },
            Direction::Southwest => PositionDelta { dy: 0, dx: -1, dz: 1 },
            Direction::Up => PositionDelta { dy: 1, dx: 0, dz: 0 },
            Direction::Down => PositionDelta { dy: -1, dx: 0, dz: 0 },
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}
