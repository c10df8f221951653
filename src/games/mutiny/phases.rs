//! Phase machine for a mutiny game.
//!
//! Phases only change through named [`Transition`]s. Each transition
//! declares the phases it may leave from, so the backward edge out of a
//! successful mutiny and the "team persists" shortcut are visible here
//! instead of hiding in index arithmetic.

use serde::{Deserialize, Serialize};

/// A phase of the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Players are joining.
    Lobby,
    /// Roles have been dealt; nobody has taken the helm yet.
    Night,
    /// The captain picks a lieutenant and a navigator.
    NavigationSelection,
    /// The crew may secretly commit guns to depose the captain.
    Mutiny,
    /// Captain and lieutenant propose, navigator commits a heading.
    Navigation,
    /// Open discussion and an elimination ballot.
    Voting,
    /// Terminal.
    Completed,
}

impl Phase {
    /// Whether this phase belongs to the repeating turn cycle.
    pub fn in_cycle(self) -> bool {
        matches!(
            self,
            Phase::NavigationSelection | Phase::Mutiny | Phase::Navigation | Phase::Voting
        )
    }

    /// The transition `next_phase` takes from here, if any.
    ///
    /// Walks the cycle forward; from `Voting` (past the end) and from
    /// `Night` (outside the cycle) it starts a new turn.
    pub fn successor(self) -> Option<Transition> {
        match self {
            Phase::Night => Some(Transition::Dawn),
            Phase::NavigationSelection => Some(Transition::TeamConfirmed),
            Phase::Mutiny => Some(Transition::MutinyFailed),
            Phase::Navigation => Some(Transition::ShipMoved),
            Phase::Voting => Some(Transition::NewTurn),
            Phase::Lobby | Phase::Completed => None,
        }
    }
}

/// A named edge of the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Transition {
    /// LOBBY → NIGHT when the host starts the game.
    Begin,
    /// NIGHT → NAVIGATION_SELECTION; first turn.
    Dawn,
    /// NAVIGATION_SELECTION → MUTINY once the captain confirms a team.
    TeamConfirmed,
    /// NAVIGATION_SELECTION → MUTINY when last turn's team is still valid.
    TeamRetained,
    /// NAVIGATION_SELECTION → NAVIGATION when a post-mutiny team is
    /// confirmed and no second mutiny is held.
    TeamReconfirmed,
    /// MUTINY → NAVIGATION; the captain keeps command.
    MutinyFailed,
    /// MUTINY → NAVIGATION_SELECTION; the new captain picks a team.
    MutinySucceeded,
    /// NAVIGATION → VOTING once the navigator commits.
    ShipMoved,
    /// VOTING → NAVIGATION_SELECTION; next turn.
    NewTurn,
    /// Any in-progress phase → COMPLETED with a winner.
    Victory,
    /// Any phase → COMPLETED without a winner.
    Abandon,
}

impl Transition {
    /// Whether this transition may leave `from`.
    pub fn permits(self, from: Phase) -> bool {
        match self {
            Transition::Begin => from == Phase::Lobby,
            Transition::Dawn => from == Phase::Night,
            Transition::TeamConfirmed
            | Transition::TeamRetained
            | Transition::TeamReconfirmed => from == Phase::NavigationSelection,
            Transition::MutinyFailed | Transition::MutinySucceeded => from == Phase::Mutiny,
            Transition::ShipMoved => from == Phase::Navigation,
            Transition::NewTurn => from == Phase::Voting,
            Transition::Victory => from == Phase::Night || from.in_cycle(),
            Transition::Abandon => from != Phase::Completed,
        }
    }

    /// The phase this transition enters.
    pub fn target(self) -> Phase {
        match self {
            Transition::Begin => Phase::Night,
            Transition::Dawn | Transition::MutinySucceeded | Transition::NewTurn => {
                Phase::NavigationSelection
            }
            Transition::TeamConfirmed | Transition::TeamRetained => Phase::Mutiny,
            Transition::TeamReconfirmed | Transition::MutinyFailed => Phase::Navigation,
            Transition::ShipMoved => Phase::Voting,
            Transition::Victory | Transition::Abandon => Phase::Completed,
        }
    }

    /// Whether taking this transition starts a new turn.
    pub fn begins_turn(self) -> bool {
        matches!(self, Transition::Dawn | Transition::NewTurn)
    }
}
