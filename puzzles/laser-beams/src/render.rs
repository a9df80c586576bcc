use std::fmt;

use crate::geometry::Position;
use crate::grid::Grid;
use crate::part::{Part, PartKind};

fn part_glyph(part: &Part) -> char {
    match part.kind() {
        PartKind::Emitter => '>',
        PartKind::Frame => 'O',
        PartKind::Mirror if part.rotation().index() % 2 == 1 => '/',
        PartKind::Mirror => '\\',
        PartKind::Splitter => char::from_digit(part.rotation().index() as u32, 10).unwrap_or('T'),
        PartKind::Target if part.is_active() => 'U',
        PartKind::Target => 'X',
    }
}

impl Grid {
    fn glyph_at(&self, position: Position) -> char {
        if let Some(part) = self.part_at(position).and_then(|id| self.part(id).ok()) {
            return part_glyph(part);
        }

        let mut horizontal = false;
        let mut vertical = false;
        for beam in self.beams_at(position).iter().filter_map(|&id| self.beam(id)) {
            if beam.direction().is_horizontal() {
                horizontal = true;
            } else {
                vertical = true;
            }
        }
        match (horizontal, vertical) {
            (true, true) => '+',
            (true, false) => '-',
            (false, true) => '|',
            (false, false) => ' ',
        }
    }
}

/// Draws the board top row first, between `=` rulers.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ruler = "=".repeat(self.width());
        writeln!(f, "{ruler}")?;
        for y in (0..self.height() as i32).rev() {
            let row: String = (0..self.width() as i32)
                .map(|x| self.glyph_at(Position::new(x, y)))
                .collect();
            writeln!(f, "{row}")?;
        }
        writeln!(f, "{ruler}")
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Result;
    use crate::geometry::{Direction, Position};
    use crate::grid::Grid;
    use crate::part::PartKind;

    #[test]
    fn draws_parts_and_beam_crossings() -> Result<()> {
        let mut grid = Grid::new(5, 3);
        grid.insert(PartKind::Emitter, Position::new(0, 1), Direction::East)?;
        grid.insert(PartKind::Emitter, Position::new(2, 0), Direction::North)?;
        grid.insert(PartKind::Target, Position::new(4, 1), Direction::West)?;
        grid.insert(PartKind::Frame, Position::new(3, 0), Direction::East)?;

        assert_eq!(
            "=====\n  |  \n>-+-U\n  >O \n=====\n",
            grid.to_string()
        );
        Ok(())
    }

    #[test]
    fn mirrors_splitters_and_dark_targets() -> Result<()> {
        let mut grid = Grid::new(4, 1);
        grid.insert(PartKind::Mirror, Position::new(0, 0), Direction::East)?;
        grid.insert(PartKind::Mirror, Position::new(1, 0), Direction::South)?;
        grid.insert(PartKind::Splitter, Position::new(2, 0), Direction::West)?;
        grid.insert(PartKind::Target, Position::new(3, 0), Direction::North)?;

        assert_eq!("====\n\\/2X\n====\n", grid.to_string());
        Ok(())
    }
}
