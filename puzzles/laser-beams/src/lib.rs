pub mod beam;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod level;
pub mod part;
pub mod render;
pub mod solver;

pub use beam::{Beam, BeamId};
pub use error::{LaserError, Result};
pub use geometry::{Direction, Position};
pub use grid::{Grid, Snapshot};
pub use level::{Level, Puzzle};
pub use part::{Part, PartId, PartKind};
pub use solver::{Solution, Solver, SolverOptions};
