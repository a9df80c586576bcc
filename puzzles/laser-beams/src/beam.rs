use tracing::trace;

use crate::error::{LaserError, Result};
use crate::geometry::{Direction, Position};
use crate::grid::Grid;
use crate::part::PartId;

slotmap::new_key_type! {
    /// Handle to a live beam. Once the beam is destroyed the handle stops
    /// resolving, even after its slot is reused.
    pub struct BeamId;
}

/// Destroyed beams leave the grid's map entirely, so there is no phase for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamPhase {
    /// Created but not yet traced across the grid.
    Uncomputed,
    /// Has a trail and possibly a destination.
    Traced,
}

/// A straight ray leaving `source` in `direction`.
#[derive(Debug, Clone)]
pub struct Beam {
    source: PartId,
    direction: Direction,
    trail: Vec<Position>,
    destination: Option<PartId>,
    phase: BeamPhase,
}

impl Beam {
    fn new(source: PartId, direction: Direction) -> Self {
        Self {
            source,
            direction,
            trail: Vec::new(),
            destination: None,
            phase: BeamPhase::Uncomputed,
        }
    }

    pub fn source(&self) -> PartId {
        self.source
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Empty or transparent cells the beam currently spans, nearest first.
    pub fn trail(&self) -> &[Position] {
        &self.trail
    }

    pub fn destination(&self) -> Option<PartId> {
        self.destination
    }

    pub fn phase(&self) -> BeamPhase {
        self.phase
    }
}

impl Grid {
    /// Creates a beam owned by `source` and traces it.
    pub(crate) fn emit(
        &mut self,
        source: PartId,
        direction: Direction,
        cause: Option<BeamId>,
    ) -> Result<BeamId> {
        let id = self.beams.insert(Beam::new(source, direction));
        self.parts[source.0].adopt(id, cause);
        trace!(?id, %source, %direction, "beam emitted");
        self.recompute_destination(id, None)?;
        Ok(id)
    }

    /// Walks from `start` until the grid edge or the first opaque part,
    /// registering every crossed cell. Returns the part that stopped the beam.
    fn trace(&mut self, id: BeamId, start: Position) -> Option<PartId> {
        let Some(beam) = self.beams.get_mut(id) else {
            return None;
        };
        let step = beam.direction.vector();
        let mut trail = std::mem::take(&mut beam.trail);

        let mut position = start;
        let destination = loop {
            let Some(index) = self.index(position) else {
                break None;
            };
            if let Some(part) = self.cells[index] {
                if !self.parts[part.0].is_transparent() {
                    break Some(part);
                }
            }
            self.beams_at[index].push(id);
            trail.push(position);
            position += step;
        };

        if let Some(beam) = self.beams.get_mut(id) {
            beam.trail = trail;
        }
        destination
    }

    /// Single entry point for every destination change: unhits the old
    /// destination, re-traces from `start` (default: the cell in front of the
    /// source) and hits whatever now stops the beam.
    pub(crate) fn recompute_destination(&mut self, id: BeamId, start: Option<Position>) -> Result<()> {
        self.depth += 1;
        let outcome = self.retrace(id, start);
        self.depth -= 1;
        outcome
    }

    fn retrace(&mut self, id: BeamId, start: Option<Position>) -> Result<()> {
        if self.depth > self.cascade_limit() {
            return Err(LaserError::CascadeOverflow { depth: self.depth });
        }

        let Some(beam) = self.beams.get_mut(id) else {
            return Ok(());
        };
        if let Some(previous) = beam.destination.take() {
            self.unhit(previous, id)?;
        }

        // Bail out if the unhit cascade retired this beam.
        let Some(beam) = self.beams.get(id) else {
            return Ok(());
        };
        let start = start
            .unwrap_or_else(|| self.parts[beam.source.0].position + beam.direction.vector());
        let destination = self.trace(id, start);

        let Some(beam) = self.beams.get_mut(id) else {
            return Ok(());
        };
        beam.destination = destination;
        beam.phase = BeamPhase::Traced;
        trace!(?id, cells = beam.trail.len(), ?destination, "beam traced");

        match destination {
            Some(part) => self.hit(part, id),
            None => Ok(()),
        }
    }

    /// A part landed on a cell this beam crosses: drop the trail and trace
    /// again from the source so the beam stops at the newcomer.
    pub(crate) fn react_to_new_block(&mut self, id: BeamId, blocker: PartId) -> Result<()> {
        trace!(?id, %blocker, "beam blocked");
        self.retract_trail(id);
        self.recompute_destination(id, None)
    }

    /// The part this beam was hitting left the grid: resume from its cell.
    pub(crate) fn react_to_removed_block(&mut self, id: BeamId, removed: PartId) -> Result<()> {
        trace!(?id, %removed, "beam unblocked");
        let vacated = self.parts[removed.0].position;
        self.recompute_destination(id, Some(vacated))
    }

    /// Retracts the trail, releases the destination and frees the slot.
    /// Destroying an already destroyed beam is a no-op.
    pub(crate) fn destroy_beam(&mut self, id: BeamId) -> Result<()> {
        self.retract_trail(id);
        let Some(beam) = self.beams.get_mut(id) else {
            return Ok(());
        };
        if let Some(destination) = beam.destination.take() {
            self.unhit(destination, id)?;
        }
        if let Some(beam) = self.beams.remove(id) {
            trace!(?id, source = %beam.source, "beam destroyed");
        }
        Ok(())
    }

    fn retract_trail(&mut self, id: BeamId) {
        let Some(beam) = self.beams.get_mut(id) else {
            return;
        };
        for position in std::mem::take(&mut beam.trail) {
            if let Some(index) = self.index(position) {
                if let Some(slot) = self.beams_at[index].iter().position(|&b| b == id) {
                    self.beams_at[index].remove(slot);
                }
            }
        }
    }

    fn cascade_limit(&self) -> usize {
        4 * self.width * self.height
    }
}
