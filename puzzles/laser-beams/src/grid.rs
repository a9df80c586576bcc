use itertools::Itertools;
use slotmap::SlotMap;
use tracing::debug;

use crate::beam::{Beam, BeamId};
use crate::error::{LaserError, Result};
use crate::geometry::{Direction, Position};
use crate::part::{Part, PartId, PartKind};

/// The playfield: one part slot per cell plus the beams crossing each cell.
///
/// Parts are registered once and keep their [`PartId`] for the lifetime of
/// the grid; they can be placed, removed, moved while detached and placed
/// again. Beams are created and destroyed by the engine alone.
#[derive(Debug, Clone)]
pub struct Grid {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) cells: Vec<Option<PartId>>,
    pub(crate) beams_at: Vec<Vec<BeamId>>,
    pub(crate) parts: Vec<Part>,
    pub(crate) beams: SlotMap<BeamId, Beam>,
    /// Current nesting of beam recomputations.
    pub(crate) depth: usize,
}

/// Everything a caller can observe about a grid, with beams identified by
/// their source and direction so snapshots compare across beam re-creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub occupants: Vec<Option<PartId>>,
    pub beams: Vec<Vec<(PartId, Direction)>>,
    pub active: Vec<PartId>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
            beams_at: vec![Vec::new(); width * height],
            parts: Vec::new(),
            beams: SlotMap::with_key(),
            depth: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        self.index(position).is_some()
    }

    pub(crate) fn index(&self, position: Position) -> Option<usize> {
        let (x, y) = (usize::try_from(position.x).ok()?, usize::try_from(position.y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn part_at(&self, position: Position) -> Option<PartId> {
        self.index(position).and_then(|index| self.cells[index])
    }

    /// Beams crossing `position`; empty outside the grid.
    pub fn beams_at(&self, position: Position) -> &[BeamId] {
        match self.index(position) {
            Some(index) => &self.beams_at[index],
            None => &[],
        }
    }

    pub fn part(&self, id: PartId) -> Result<&Part> {
        self.parts.get(id.0).ok_or(LaserError::UnknownPart(id))
    }

    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts.iter().enumerate().map(|(index, part)| (PartId(index), part))
    }

    pub fn beam(&self, id: BeamId) -> Option<&Beam> {
        self.beams.get(id)
    }

    pub fn beams(&self) -> impl Iterator<Item = (BeamId, &Beam)> {
        self.beams.iter()
    }

    /// Number of cells carrying at least one beam.
    pub fn beam_cells(&self) -> usize {
        self.beams_at.iter().filter(|beams| !beams.is_empty()).count()
    }

    /// Registers a detached part. It takes no effect until [`Grid::place`].
    pub fn spawn(&mut self, kind: PartKind, position: Position, rotation: Direction) -> PartId {
        let id = PartId(self.parts.len());
        self.parts.push(Part::new(kind, position, rotation));
        id
    }

    /// Moves a detached part to a new cell.
    pub fn relocate(&mut self, id: PartId, position: Position) -> Result<()> {
        let part = self.parts.get_mut(id.0).ok_or(LaserError::UnknownPart(id))?;
        if part.placed {
            return Err(LaserError::AlreadyPlaced(id));
        }
        part.position = position;
        Ok(())
    }

    /// Registers and places a part in one step.
    pub fn insert(&mut self, kind: PartKind, position: Position, rotation: Direction) -> Result<PartId> {
        let id = self.spawn(kind, position, rotation);
        self.place(id)?;
        Ok(id)
    }

    /// Puts a part on its cell. Beams crossing the cell are cut short at the
    /// newcomer, then the part starts its own beams.
    pub fn place(&mut self, id: PartId) -> Result<()> {
        let part = self.part(id)?;
        if part.placed {
            return Err(LaserError::AlreadyPlaced(id));
        }
        let position = part.position;
        let transparent = part.is_transparent();
        let index = self.index(position).ok_or(LaserError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        })?;
        if let Some(occupant) = self.cells[index] {
            return Err(LaserError::OccupiedCell { position, occupant });
        }

        self.cells[index] = Some(id);
        self.parts[id.0].placed = true;
        debug!(%id, kind = %self.parts[id.0].kind(), %position, "part placed");

        if !transparent {
            let crossing = self.beams_at[index].clone();
            for beam in crossing {
                // An earlier reaction may already have pulled this beam back.
                if self.beams_at[index].contains(&beam) {
                    self.react_to_new_block(beam, id)?;
                }
            }
        }
        self.on_placed(id)
    }

    /// Takes a part off the grid and undoes every beam effect it caused.
    pub fn remove(&mut self, id: PartId) -> Result<()> {
        let position = self.part(id)?.position;
        let index = self
            .index(position)
            .filter(|&index| self.cells[index] == Some(id))
            .ok_or(LaserError::NotPresent { part: id, position })?;

        self.cells[index] = None;
        debug!(%id, kind = %self.parts[id.0].kind(), %position, "part removed");
        self.on_removed(id)
    }

    fn on_placed(&mut self, id: PartId) -> Result<()> {
        let part = &self.parts[id.0];
        if part.kind() == PartKind::Emitter {
            let facing = part.rotation();
            self.emit(id, facing, None)?;
        }
        Ok(())
    }

    fn on_removed(&mut self, id: PartId) -> Result<()> {
        for beam in self.parts[id.0].detach() {
            self.destroy_beam(beam)?;
        }
        let incoming = self.parts[id.0].beams_in.clone();
        for beam in incoming {
            if self.parts[id.0].beams_in.contains(&beam) {
                self.react_to_removed_block(beam, id)?;
            }
        }
        Ok(())
    }

    /// Delivers `beam` to `part` and emits whatever the part fires in response.
    pub(crate) fn hit(&mut self, part: PartId, beam: BeamId) -> Result<()> {
        let Some(incoming) = self.beams.get(beam).map(Beam::direction) else {
            return Ok(());
        };
        let emissions = self.parts[part.0].hit(part, beam, incoming)?;
        for direction in emissions {
            self.emit(part, direction, Some(beam))?;
        }
        Ok(())
    }

    /// Withdraws `beam` from `part`, destroying the beams it had caused.
    pub(crate) fn unhit(&mut self, part: PartId, beam: BeamId) -> Result<()> {
        let Some(incoming) = self.beams.get(beam).map(Beam::direction) else {
            return Ok(());
        };
        for outgoing in self.parts[part.0].unhit(beam, incoming) {
            self.destroy_beam(outgoing)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let beams = self
            .beams_at
            .iter()
            .map(|cell| {
                cell.iter()
                    .filter_map(|&id| self.beams.get(id))
                    .map(|beam| (beam.source(), beam.direction()))
                    .sorted()
                    .collect()
            })
            .collect();
        let active = self
            .parts()
            .filter(|(_, part)| part.is_active())
            .map(|(id, _)| id)
            .collect();
        Snapshot {
            occupants: self.cells.clone(),
            beams,
            active,
        }
    }

    /// Cross-checks cells, parts and beams against each other, including that
    /// every beam's trail is exactly what a fresh trace would produce.
    pub fn check_invariants(&self) -> Result<()> {
        let broken = |detail: String| Err(LaserError::BrokenInvariant(detail));

        for (index, occupant) in self.cells.iter().enumerate() {
            let Some(id) = *occupant else { continue };
            let part = self.part(id)?;
            if !part.placed || self.index(part.position) != Some(index) {
                return broken(format!("cell {index} lists {id} which sits elsewhere"));
            }
        }

        for (id, part) in self.parts() {
            if let Some(beam) = part.beams_in().iter().duplicates().next() {
                return Err(LaserError::DuplicateHit { part: id, beam: *beam });
            }
            for &beam in part.beams_in() {
                match self.beams.get(beam) {
                    Some(b) if b.destination() == Some(id) => {}
                    _ => return broken(format!("{id} is hit by {beam:?} which does not end there")),
                }
            }
            for &beam in part.beams_out() {
                match self.beams.get(beam) {
                    Some(b) if b.source() == id => {}
                    _ => return broken(format!("{id} owns {beam:?} which it did not emit")),
                }
            }
        }

        for (id, beam) in self.beams.iter() {
            let source = self.part(beam.source())?;
            if !source.placed || !source.beams_out().contains(&id) {
                return broken(format!("{id:?} outlived its source {}", beam.source()));
            }
            if let Some(destination) = beam.destination() {
                if !self.part(destination)?.beams_in().contains(&id) {
                    return broken(format!("{id:?} ends at {destination} without hitting it"));
                }
            }

            let step = beam.direction().vector();
            let mut position = source.position + step;
            let mut expected = Vec::new();
            let destination = loop {
                let Some(index) = self.index(position) else { break None };
                match self.cells[index] {
                    Some(part) if !self.parts[part.0].is_transparent() => break Some(part),
                    _ => {}
                }
                expected.push(position);
                position += step;
            };
            if expected != beam.trail() || destination != beam.destination() {
                return broken(format!("{id:?} trail is stale"));
            }
            for &position in beam.trail() {
                if !self.beams_at(position).contains(&id) {
                    return broken(format!("{id:?} crosses {position} unrecorded"));
                }
            }
        }

        let recorded: usize = self.beams_at.iter().map(Vec::len).sum();
        let traced: usize = self.beams.iter().map(|(_, beam)| beam.trail().len()).sum();
        if recorded != traced {
            return broken(format!("{recorded} cell entries for {traced} trail cells"));
        }
        Ok(())
    }
}
