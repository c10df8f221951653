//! Hidden-role mutiny game: roles, phases, rounds and the turn controller.

mod action;
mod contracts;
mod controller;
mod error;
mod game;
pub mod invariants;
mod mutiny_round;
mod navigation;
mod phases;
mod roles;
mod round;
pub mod rules;
mod selection;
mod types;
mod voting;

pub use action::{Command, Correlation, FormSubmission, PlayerAction, Prompt};
pub use contracts::{
    Contract, IsCaptain, IsHost, StartContract, TeamContract, TeamProposal, ValidCandidate,
};
pub use controller::{
    CONFIRM, Effect, GUNS_FIELD, SessionEvent, TimerKey, TimerStage, TurnController,
};
pub use error::{ErrorKind, GameError};
pub use game::GameSession;
pub use mutiny_round::{MutinyResolver, MutinyRound, MutinyTally};
pub use navigation::{Helm, NavigationRound, OFFERED_HEADINGS};
pub use phases::{Phase, Transition};
pub use roles::{MIN_PLAYERS, RoleAssigner, RoleDistribution};
pub use round::{Resolution, WriteOnce};
pub use selection::{Seat, TeamSelection};
pub use types::{
    Faction, GameStatus, Heading, Player, PlayerId, Role, SessionId, ShipPosition,
};
pub use voting::{Ballot, MIN_ABOARD, VotingRound, VotingTally};
