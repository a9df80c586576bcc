use glam::IVec2;
use miette::Diagnostic;
use thiserror::Error;

use crate::beam::BeamId;
use crate::part::PartId;

/// Invariant violations raised by the beam engine.
///
/// None of these are expected at runtime: the simulation is deterministic, so
/// every variant points at a logic defect in the caller or the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LaserError {
    #[error("cell {position} is already occupied by part {occupant}")]
    #[diagnostic(
        code(laser::grid::occupied_cell),
        help("remove the occupant first or move the part to an empty cell")
    )]
    OccupiedCell { position: IVec2, occupant: PartId },

    #[error("part {part} is not recorded at {position}")]
    #[diagnostic(code(laser::grid::not_present))]
    NotPresent { part: PartId, position: IVec2 },

    #[error("beam {beam:?} hit part {part} twice")]
    #[diagnostic(
        code(laser::part::duplicate_hit),
        help("trace/notify bookkeeping is out of sync")
    )]
    DuplicateHit { part: PartId, beam: BeamId },

    #[error("{0} is not a direction, expected 0 (east), 1 (north), 2 (west) or 3 (south)")]
    #[diagnostic(code(laser::geometry::invalid_direction))]
    InvalidDirection(i64),

    #[error("{position} lies outside the {width}x{height} grid")]
    #[diagnostic(code(laser::grid::out_of_bounds))]
    OutOfBounds {
        position: IVec2,
        width: usize,
        height: usize,
    },

    #[error("part {0} is already on the grid")]
    #[diagnostic(
        code(laser::grid::already_placed),
        help("remove the part before placing or moving it again")
    )]
    AlreadyPlaced(PartId),

    #[error("part {0} was never registered with this grid")]
    #[diagnostic(code(laser::grid::unknown_part))]
    UnknownPart(PartId),

    #[error("beam cascade nested {depth} levels deep")]
    #[diagnostic(
        code(laser::beam::cascade_overflow),
        help("beam recomputation kept recursing without settling")
    )]
    CascadeOverflow { depth: usize },

    #[error("grid bookkeeping is inconsistent: {0}")]
    #[diagnostic(code(laser::grid::broken_invariant))]
    BrokenInvariant(String),
}

pub type Result<T, E = LaserError> = std::result::Result<T, E>;
