use std::fmt;

use glam::IVec2;

use crate::error::LaserError;

/// Grid coordinate. `y` grows upward, row 0 is the floor.
pub type Position = IVec2;

/// One of the four axis-aligned directions a beam can travel or a part can face.
///
/// The discriminants double as rotation steps: turning counter-clockwise by a
/// quarter adds one, modulo four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Direction {
    #[default]
    East = 0,
    North = 1,
    West = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    pub fn index(self) -> i64 {
        self as i64
    }

    /// Builds a direction from any integer, wrapping it into `0..4`.
    pub fn wrapping(value: i64) -> Self {
        Self::ALL[value.rem_euclid(4) as usize]
    }

    /// Rotates by `steps` quarter turns (positive is counter-clockwise).
    pub fn rotate(self, steps: i64) -> Self {
        Self::wrapping(self.index() + steps)
    }

    /// `(k - self) mod 4`, the form every excitation rule is written in.
    pub fn reflected_from(self, k: i64) -> Self {
        Self::wrapping(k - self.index())
    }

    pub fn vector(self) -> IVec2 {
        match self {
            Direction::East => IVec2::X,
            Direction::North => IVec2::Y,
            Direction::West => IVec2::NEG_X,
            Direction::South => IVec2::NEG_Y,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }
}

impl TryFrom<i64> for Direction {
    type Error = LaserError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0..=3 => Ok(Self::ALL[value as usize]),
            _ => Err(LaserError::InvalidDirection(value)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::East => "east",
            Direction::North => "north",
            Direction::West => "west",
            Direction::South => "south",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(0, Direction::East, IVec2::new(1, 0))]
    #[case(1, Direction::North, IVec2::new(0, 1))]
    #[case(2, Direction::West, IVec2::new(-1, 0))]
    #[case(3, Direction::South, IVec2::new(0, -1))]
    fn converts_and_maps_to_unit_vectors(
        #[case] raw: i64,
        #[case] expected: Direction,
        #[case] vector: IVec2,
    ) -> miette::Result<()> {
        let direction = Direction::try_from(raw)?;
        assert_eq!(expected, direction);
        assert_eq!(vector, direction.vector());
        assert_eq!(1, direction.vector().abs().element_sum());
        Ok(())
    }

    #[rstest]
    #[case(-1)]
    #[case(4)]
    #[case(90)]
    fn rejects_values_outside_the_compass(#[case] raw: i64) {
        assert_eq!(
            Err(LaserError::InvalidDirection(raw)),
            Direction::try_from(raw)
        );
    }

    #[test]
    fn rotation_wraps_modulo_four() {
        assert_eq!(Direction::South, Direction::East.rotate(-1));
        assert_eq!(Direction::East, Direction::South.rotate(1));
        assert_eq!(Direction::West, Direction::North.rotate(5));
        assert_eq!(Direction::West, Direction::East.reflected_from(2));
        assert_eq!(Direction::South, Direction::North.reflected_from(0));
    }
}
