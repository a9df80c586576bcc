use std::fmt;

use crate::beam::BeamId;
use crate::error::{LaserError, Result};
use crate::geometry::{Direction, Position};

/// Index of a part registered with a [`Grid`](crate::grid::Grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub(crate) usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Frame,
    Emitter,
    Mirror,
    Splitter,
    Target,
}

impl PartKind {
    pub fn is_transparent(self) -> bool {
        matches!(self, PartKind::Frame)
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartKind::Frame => "frame",
            PartKind::Emitter => "emitter",
            PartKind::Mirror => "mirror",
            PartKind::Splitter => "splitter",
            PartKind::Target => "target",
        };
        f.write_str(name)
    }
}

/// Outgoing direction of a beam travelling `incoming` into a mirror turned
/// `rotation` quarter turns, or `None` when the mirror absorbs it.
pub fn mirror_reflection(rotation: Direction, incoming: Direction) -> Option<Direction> {
    if rotation.reflected_from(3) == incoming {
        Some(incoming.rotate(1))
    } else if rotation.reflected_from(2) == incoming {
        Some(incoming.rotate(-1))
    } else {
        None
    }
}

/// A splitter only fires when struck head-on; it then emits to both sides.
pub fn splitter_outputs(rotation: Direction, incoming: Direction) -> Option<[Direction; 2]> {
    (rotation.reflected_from(2) == incoming).then(|| [rotation.rotate(-1), rotation.rotate(1)])
}

pub fn target_activated_by(rotation: Direction, incoming: Direction) -> bool {
    rotation.reflected_from(2) == incoming
}

/// Per-variant state. Mirrors remember which incoming beam produced which
/// outgoing one; splitters remember the single beam that excited them.
#[derive(Debug, Clone)]
enum Role {
    Frame,
    Emitter,
    Mirror { excitations: Vec<(BeamId, BeamId)> },
    Splitter { exciter: Option<BeamId> },
    Target { active: bool },
}

impl Role {
    fn new(kind: PartKind) -> Self {
        match kind {
            PartKind::Frame => Role::Frame,
            PartKind::Emitter => Role::Emitter,
            PartKind::Mirror => Role::Mirror {
                excitations: Vec::new(),
            },
            PartKind::Splitter => Role::Splitter { exciter: None },
            PartKind::Target => Role::Target { active: false },
        }
    }

    fn kind(&self) -> PartKind {
        match self {
            Role::Frame => PartKind::Frame,
            Role::Emitter => PartKind::Emitter,
            Role::Mirror { .. } => PartKind::Mirror,
            Role::Splitter { .. } => PartKind::Splitter,
            Role::Target { .. } => PartKind::Target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Part {
    role: Role,
    pub(crate) position: Position,
    rotation: Direction,
    pub(crate) placed: bool,
    pub(crate) beams_in: Vec<BeamId>,
    pub(crate) beams_out: Vec<BeamId>,
}

impl Part {
    pub(crate) fn new(kind: PartKind, position: Position, rotation: Direction) -> Self {
        Self {
            role: Role::new(kind),
            position,
            rotation,
            placed: false,
            beams_in: Vec::new(),
            beams_out: Vec::new(),
        }
    }

    pub fn kind(&self) -> PartKind {
        self.role.kind()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn rotation(&self) -> Direction {
        self.rotation
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_transparent(&self) -> bool {
        self.kind().is_transparent()
    }

    /// Only targets can be active.
    pub fn is_active(&self) -> bool {
        matches!(self.role, Role::Target { active: true })
    }

    pub fn beams_in(&self) -> &[BeamId] {
        &self.beams_in
    }

    pub fn beams_out(&self) -> &[BeamId] {
        &self.beams_out
    }

    /// Records an incoming beam and returns the directions this part now has
    /// to emit new beams in.
    pub(crate) fn hit(
        &mut self,
        id: PartId,
        beam: BeamId,
        incoming: Direction,
    ) -> Result<Vec<Direction>> {
        if self.beams_in.contains(&beam) {
            return Err(LaserError::DuplicateHit { part: id, beam });
        }
        self.beams_in.push(beam);

        let emissions = match &mut self.role {
            Role::Frame | Role::Emitter => Vec::new(),
            Role::Mirror { .. } => mirror_reflection(self.rotation, incoming)
                .into_iter()
                .collect(),
            Role::Splitter { .. } => splitter_outputs(self.rotation, incoming)
                .map(Vec::from)
                .unwrap_or_default(),
            Role::Target { active } => {
                if target_activated_by(self.rotation, incoming) {
                    *active = true;
                }
                Vec::new()
            }
        };
        Ok(emissions)
    }

    /// Takes ownership of a freshly emitted beam, remembering which incoming
    /// beam caused it.
    pub(crate) fn adopt(&mut self, outgoing: BeamId, cause: Option<BeamId>) {
        self.beams_out.push(outgoing);
        match (&mut self.role, cause) {
            (Role::Mirror { excitations }, Some(incoming)) => {
                excitations.push((incoming, outgoing));
            }
            (Role::Splitter { exciter }, Some(incoming)) => *exciter = Some(incoming),
            _ => {}
        }
    }

    /// Forgets an incoming beam and returns the outgoing beams that must be
    /// destroyed as a consequence.
    pub(crate) fn unhit(&mut self, beam: BeamId, incoming: Direction) -> Vec<BeamId> {
        self.beams_in.retain(|&b| b != beam);

        match &mut self.role {
            Role::Frame | Role::Emitter => Vec::new(),
            Role::Mirror { excitations } => {
                let Some(slot) = excitations.iter().position(|&(cause, _)| cause == beam) else {
                    return Vec::new();
                };
                let (_, outgoing) = excitations.swap_remove(slot);
                let Some(owned) = self.beams_out.iter().position(|&b| b == outgoing) else {
                    return Vec::new();
                };
                vec![self.beams_out.remove(owned)]
            }
            Role::Splitter { exciter } => {
                if *exciter != Some(beam) {
                    return Vec::new();
                }
                *exciter = None;
                std::mem::take(&mut self.beams_out)
            }
            Role::Target { active } => {
                if target_activated_by(self.rotation, incoming) {
                    *active = false;
                }
                Vec::new()
            }
        }
    }

    /// Marks the part as off the grid and hands back every beam it owned.
    /// Excitation records are dropped with them.
    pub(crate) fn detach(&mut self) -> Vec<BeamId> {
        self.placed = false;
        match &mut self.role {
            Role::Mirror { excitations } => excitations.clear(),
            Role::Splitter { exciter } => *exciter = None,
            _ => {}
        }
        std::mem::take(&mut self.beams_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use crate::geometry::Direction::{East as E, North as N, South as S, West as W};

    #[rstest]
    #[case(E, E, None)]
    #[case(E, N, None)]
    #[case(E, W, Some(N))]
    #[case(E, S, Some(E))]
    #[case(N, E, None)]
    #[case(N, N, Some(E))]
    #[case(N, W, Some(S))]
    #[case(N, S, None)]
    #[case(W, E, Some(S))]
    #[case(W, N, Some(W))]
    #[case(W, W, None)]
    #[case(W, S, None)]
    #[case(S, E, Some(N))]
    #[case(S, N, None)]
    #[case(S, W, None)]
    #[case(S, S, Some(W))]
    fn mirror_reflection_table(
        #[case] rotation: Direction,
        #[case] incoming: Direction,
        #[case] expected: Option<Direction>,
    ) {
        assert_eq!(expected, mirror_reflection(rotation, incoming));
    }

    #[rstest]
    #[case(E, W)]
    #[case(N, N)]
    #[case(W, E)]
    #[case(S, S)]
    fn target_activation_table(#[case] rotation: Direction, #[case] activating: Direction) {
        for incoming in Direction::ALL {
            assert_eq!(
                incoming == activating,
                target_activated_by(rotation, incoming),
                "target rotated {rotation} hit travelling {incoming}"
            );
        }
    }

    #[rstest]
    #[case(E, W, [S, N])]
    #[case(N, N, [E, W])]
    #[case(W, E, [N, S])]
    #[case(S, S, [W, E])]
    fn splitter_fires_only_head_on(
        #[case] rotation: Direction,
        #[case] head_on: Direction,
        #[case] outputs: [Direction; 2],
    ) {
        for incoming in Direction::ALL {
            let expected = (incoming == head_on).then_some(outputs);
            assert_eq!(expected, splitter_outputs(rotation, incoming));
        }
    }

    fn beam_keys(count: usize) -> Vec<BeamId> {
        let mut beams = slotmap::SlotMap::<BeamId, ()>::with_key();
        (0..count).map(|_| beams.insert(())).collect()
    }

    #[test]
    fn duplicate_hit_is_rejected() {
        let beams = beam_keys(1);
        let id = PartId(0);
        let mut target = Part::new(PartKind::Target, Position::ZERO, N);

        assert!(target.hit(id, beams[0], N).is_ok());
        assert!(target.is_active());
        assert_eq!(
            Err(LaserError::DuplicateHit {
                part: id,
                beam: beams[0]
            }),
            target.hit(id, beams[0], N)
        );
    }

    #[test]
    fn mirror_forgets_only_the_beam_its_cause_produced() {
        let beams = beam_keys(4);
        let (from_above, from_right, out_east, out_north) = (beams[0], beams[1], beams[2], beams[3]);
        let mut mirror = Part::new(PartKind::Mirror, Position::ZERO, E);

        assert_eq!(vec![E], mirror.hit(PartId(0), from_above, S).unwrap());
        mirror.adopt(out_east, Some(from_above));
        assert_eq!(vec![N], mirror.hit(PartId(0), from_right, W).unwrap());
        mirror.adopt(out_north, Some(from_right));

        assert_eq!(vec![out_north], mirror.unhit(from_right, W));
        assert_eq!(vec![from_above], mirror.beams_in());
        assert_eq!(vec![out_east], mirror.beams_out());
    }

    #[test]
    fn splitter_ignores_beams_that_did_not_excite_it() {
        let beams = beam_keys(4);
        let mut splitter = Part::new(PartKind::Splitter, Position::ZERO, W);

        assert_eq!(vec![N, S], splitter.hit(PartId(0), beams[0], E).unwrap());
        splitter.adopt(beams[1], Some(beams[0]));
        splitter.adopt(beams[2], Some(beams[0]));
        assert!(splitter.hit(PartId(0), beams[3], S).unwrap().is_empty());

        assert!(splitter.unhit(beams[3], S).is_empty());
        assert_eq!(vec![beams[1], beams[2]], splitter.unhit(beams[0], E));
        assert!(splitter.beams_out().is_empty());
    }
}
