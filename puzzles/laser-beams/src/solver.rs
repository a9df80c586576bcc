use tracing::{debug, info};

use crate::error::Result;
use crate::geometry::{Direction, Position};
use crate::grid::Grid;
use crate::level::Puzzle;
use crate::part::{PartId, PartKind};

/// Search rules. The defaults are the game's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Parts must rest on the floor or on another part.
    pub gravity: bool,
    /// Skip cells no beam crosses; a part there cannot change any target.
    pub prune_dark_cells: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            gravity: true,
            prune_dark_cells: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub part: PartId,
    pub kind: PartKind,
    pub rotation: Direction,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// In the order the search placed them.
    pub placements: Vec<Placement>,
    /// Search nodes visited, including the successful leaf.
    pub nodes: u64,
}

/// Depth-first search over (cell, part) pairs. Every tentative placement is
/// undone before the next one is tried unless it led to a solution, so the
/// grid is left either untouched or holding the first solution found.
pub struct Solver<'g> {
    grid: &'g mut Grid,
    targets: &'g [PartId],
    options: SolverOptions,
    nodes: u64,
    placed: Vec<PartId>,
}

impl<'g> Solver<'g> {
    pub fn new(grid: &'g mut Grid, targets: &'g [PartId], options: SolverOptions) -> Self {
        Self {
            grid,
            targets,
            options,
            nodes: 0,
            placed: Vec::new(),
        }
    }

    #[tracing::instrument(skip_all, fields(cells = cells.len(), parts = placeables.len()))]
    pub fn solve(mut self, cells: &[Position], placeables: &[PartId]) -> Result<Option<Solution>> {
        let found = self.backtrack(cells, placeables)?;
        info!(nodes = self.nodes, found, "search finished");
        if !found {
            return Ok(None);
        }

        let placements = self
            .placed
            .iter()
            .map(|&id| {
                let part = self.grid.part(id)?;
                Ok(Placement {
                    part: id,
                    kind: part.kind(),
                    rotation: part.rotation(),
                    position: part.position(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Some(Solution {
            placements,
            nodes: self.nodes,
        }))
    }

    fn targets_active(&self) -> bool {
        self.targets
            .iter()
            .all(|&id| self.grid.part(id).is_ok_and(|part| part.is_active()))
    }

    fn backtrack(&mut self, cells: &[Position], placeables: &[PartId]) -> Result<bool> {
        self.nodes += 1;
        if placeables.is_empty() {
            return Ok(self.targets_active());
        }

        for &cell in cells {
            if self.options.prune_dark_cells && self.grid.beams_at(cell).is_empty() {
                continue;
            }
            for (slot, &part) in placeables.iter().enumerate() {
                self.grid.relocate(part, cell)?;
                self.grid.place(part)?;
                self.placed.push(part);

                let outcome = self.descend(cells, cell, placeables, slot);
                if let Ok(true) = outcome {
                    return Ok(true);
                }

                // Undo even when the subtree failed, but report its error first.
                self.placed.pop();
                let undo = self.grid.remove(part);
                outcome?;
                undo?;
            }
        }
        Ok(false)
    }

    fn descend(
        &mut self,
        cells: &[Position],
        used: Position,
        placeables: &[PartId],
        slot: usize,
    ) -> Result<bool> {
        let mut remaining_cells: Vec<Position> =
            cells.iter().copied().filter(|&cell| cell != used).collect();
        if self.options.gravity {
            let above = used + Position::Y;
            if self.grid.contains(above) && self.grid.part_at(above).is_none() {
                remaining_cells.push(above);
            }
        }

        let remaining_parts: Vec<PartId> = placeables
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != slot)
            .map(|(_, &id)| id)
            .collect();

        if self.placed.len() <= 2 {
            debug!(depth = self.placed.len(), %used, nodes = self.nodes, "descending");
        }
        self.backtrack(&remaining_cells, &remaining_parts)
    }
}

impl Puzzle {
    /// Searches for a placement of the whole inventory that lights every
    /// target. On success the solution is left on the grid.
    pub fn solve(&mut self, options: SolverOptions) -> Result<Option<Solution>> {
        let cells = if options.gravity {
            self.valid_cells()
        } else {
            self.open_cells()
        };
        Solver::new(&mut self.grid, &self.targets, options).solve(&cells, &self.placeables)
    }
}
