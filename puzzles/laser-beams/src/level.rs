use std::fmt::Display;
use std::str::FromStr;

use chumsky::prelude::*;
use miette::{bail, miette};

use crate::error::Result;
use crate::geometry::{Direction, Position};
use crate::grid::Grid;
use crate::part::{PartId, PartKind};

/// The "laser beams and pyramid" campaign level.
pub const LASER_PYRAMID: &str = include_str!("../levels/laser-pyramid.txt");

/// A part with a fixed spot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    pub kind: PartKind,
    pub position: Position,
    pub rotation: Direction,
}

/// An inventory entry: the solver decides where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub kind: PartKind,
    pub rotation: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub width: usize,
    pub height: usize,
    pub fixed: Vec<PartSpec>,
    pub inventory: Vec<Template>,
}

/// A level laid out on a grid: fixed parts placed, inventory registered but
/// detached.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub grid: Grid,
    pub targets: Vec<PartId>,
    pub placeables: Vec<PartId>,
}

#[derive(Debug, Clone)]
enum Statement {
    Grid { width: usize, height: usize },
    Fixed(PartSpec),
    Place(Template),
}

fn integer<'a, T>() -> impl Parser<'a, &'a str, T, extra::Err<Rich<'a, char>>> + Clone
where
    T: FromStr,
    T::Err: Display,
{
    text::int(10).try_map(|digits: &str, span| digits.parse::<T>().map_err(|e| Rich::custom(span, e)))
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Option<Statement>>, extra::Err<Rich<'a, char>>> {
    // Whitespace that never crosses a line break
    let hspace = any().filter(|c: &char| *c == ' ' || *c == '\t').repeated();
    let gap = any()
        .filter(|c: &char| *c == ' ' || *c == '\t')
        .repeated()
        .at_least(1);

    let kind = choice((
        just("frame").to(PartKind::Frame),
        just("emitter").to(PartKind::Emitter),
        just("mirror").to(PartKind::Mirror),
        just("splitter").to(PartKind::Splitter),
        just("target").to(PartKind::Target),
    ));

    // ` rot 3`, defaulting to east when absent
    let rotation = gap
        .clone()
        .ignore_then(just("rot"))
        .ignore_then(gap.clone())
        .ignore_then(integer::<i64>())
        .try_map(|value, span| Direction::try_from(value).map_err(|e| Rich::custom(span, e)))
        .or_not()
        .map(Option::unwrap_or_default);

    let grid = just("grid")
        .ignore_then(gap.clone())
        .ignore_then(integer::<usize>())
        .then_ignore(gap.clone())
        .then(integer::<usize>())
        .map(|(width, height)| Statement::Grid { width, height });

    let fixed = kind
        .clone()
        .then_ignore(gap.clone())
        .then(integer::<i32>())
        .then_ignore(gap.clone())
        .then(integer::<i32>())
        .then(rotation.clone())
        .map(|(((kind, x), y), rotation)| {
            Statement::Fixed(PartSpec {
                kind,
                position: Position::new(x, y),
                rotation,
            })
        });

    let place = just("place")
        .ignore_then(gap)
        .ignore_then(kind)
        .then(rotation)
        .map(|(kind, rotation)| Statement::Place(Template { kind, rotation }));

    let comment = just('#').then(none_of("\r\n").repeated()).ignored();

    hspace
        .clone()
        .ignore_then(choice((grid, place, fixed)).or_not())
        .then_ignore(hspace)
        .then_ignore(comment.or_not())
        .separated_by(text::newline())
        .collect()
}

impl Level {
    #[tracing::instrument(skip(input), fields(bytes = input.len()))]
    pub fn parse(input: &str) -> miette::Result<Self> {
        let statements = parser()
            .parse(input)
            .into_result()
            .map_err(|e| miette!("Parse failed: {:?}", e))?;

        let mut size = None;
        let mut fixed = Vec::new();
        let mut inventory = Vec::new();
        for statement in statements.into_iter().flatten() {
            match statement {
                Statement::Grid { width, height } => {
                    if size.replace((width, height)).is_some() {
                        bail!("level declares its `grid` size more than once");
                    }
                }
                Statement::Fixed(spec) => fixed.push(spec),
                Statement::Place(template) => inventory.push(template),
            }
        }

        let (width, height) = size.ok_or_else(|| {
            miette!(
                help = "start the level with a line such as `grid 23 6`",
                "level has no `grid` line"
            )
        })?;
        if width == 0 || height == 0 {
            bail!("grid must be at least 1x1, got {width}x{height}");
        }

        Ok(Self {
            width,
            height,
            fixed,
            inventory,
        })
    }

    pub fn laser_pyramid() -> miette::Result<Self> {
        Self::parse(LASER_PYRAMID)
    }

    /// Places every fixed part and registers the inventory.
    pub fn build(&self) -> Result<Puzzle> {
        let mut grid = Grid::new(self.width, self.height);
        let mut targets = Vec::new();
        for spec in &self.fixed {
            let id = grid.insert(spec.kind, spec.position, spec.rotation)?;
            if spec.kind == PartKind::Target {
                targets.push(id);
            }
        }
        let placeables = self
            .inventory
            .iter()
            .map(|template| grid.spawn(template.kind, Position::ZERO, template.rotation))
            .collect();

        Ok(Puzzle {
            grid,
            targets,
            placeables,
        })
    }
}

impl Puzzle {
    pub fn targets_active(&self) -> bool {
        self.targets
            .iter()
            .all(|&id| self.grid.part(id).is_ok_and(|part| part.is_active()))
    }

    /// Empty cells a part may rest on: the floor row, or directly above an
    /// occupied cell. Row-major, floor first.
    pub fn valid_cells(&self) -> Vec<Position> {
        self.empty_cells()
            .filter(|&cell| cell.y == 0 || self.grid.part_at(cell - Position::Y).is_some())
            .collect()
    }

    /// Every empty cell, for levels played without gravity.
    pub fn open_cells(&self) -> Vec<Position> {
        self.empty_cells().collect()
    }

    fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        let (width, height) = (self.grid.width() as i32, self.grid.height() as i32);
        (0..height)
            .flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
            .filter(|&cell| self.grid.part_at(cell).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn parses_the_bundled_level() -> miette::Result<()> {
        let level = Level::laser_pyramid()?;

        assert_eq!((23, 6), (level.width, level.height));
        assert_eq!(12, level.fixed.len());
        assert_eq!(
            PartSpec {
                kind: PartKind::Emitter,
                position: Position::new(0, 1),
                rotation: Direction::East,
            },
            level.fixed[0]
        );
        assert_eq!(
            5,
            level
                .fixed
                .iter()
                .filter(|spec| spec.kind == PartKind::Target && spec.rotation == Direction::North)
                .count()
        );
        assert_eq!(8, level.inventory.len());
        assert_eq!(
            Template {
                kind: PartKind::Splitter,
                rotation: Direction::West,
            },
            level.inventory[5]
        );
        Ok(())
    }

    #[test]
    fn comments_blank_lines_and_default_rotation() -> miette::Result<()> {
        let level = Level::parse(
            "# tiny\n\ngrid 3 2   # size\r\n  emitter 0 0\nframe 1 0 rot 2\t\nplace mirror\n",
        )?;

        assert_eq!((3, 2), (level.width, level.height));
        assert_eq!(Direction::East, level.fixed[0].rotation);
        assert_eq!(Direction::West, level.fixed[1].rotation);
        assert_eq!(
            vec![Template {
                kind: PartKind::Mirror,
                rotation: Direction::East
            }],
            level.inventory
        );
        Ok(())
    }

    #[rstest]
    #[case::missing_grid("emitter 0 0")]
    #[case::duplicate_grid("grid 2 2\ngrid 3 3")]
    #[case::empty_grid("grid 0 4")]
    #[case::bad_rotation("grid 2 2\nmirror 1 1 rot 4")]
    #[case::unknown_part("grid 2 2\nprism 1 1")]
    #[case::missing_coordinate("grid 2 2\ntarget 1")]
    fn rejects_malformed_levels(#[case] input: &str) {
        assert!(Level::parse(input).is_err());
    }

    #[test]
    fn build_places_fixed_parts_and_detaches_inventory() -> miette::Result<()> {
        let puzzle = Level::laser_pyramid()?.build()?;

        assert_eq!(5, puzzle.targets.len());
        assert_eq!(8, puzzle.placeables.len());
        for &id in &puzzle.placeables {
            assert!(!puzzle.grid.part(id)?.is_placed());
        }
        assert!(!puzzle.targets_active());
        // The emitter's beam runs along row 1 to the east edge.
        assert_eq!(22, puzzle.grid.beam_cells());
        Ok(())
    }

    #[test]
    fn valid_cells_respect_gravity() -> miette::Result<()> {
        let puzzle = Level::laser_pyramid()?.build()?;
        let cells = puzzle.valid_cells();

        assert_eq!(24, cells.len());
        assert_eq!(Position::new(0, 0), cells[0]);
        assert!(!cells.contains(&Position::new(4, 0)));
        assert!(cells.contains(&Position::new(4, 1)));
        assert!(cells.contains(&Position::new(0, 2)));
        assert!(!cells.contains(&Position::new(1, 1)));
        assert_eq!(23 * 6 - 12, puzzle.open_cells().len());
        Ok(())
    }

    #[test]
    fn overlapping_fixed_parts_fail_to_build() -> miette::Result<()> {
        let level = Level::parse("grid 3 1\nframe 1 0\ntarget 1 0")?;
        assert!(matches!(
            level.build(),
            Err(crate::error::LaserError::OccupiedCell { .. })
        ));
        Ok(())
    }
}
