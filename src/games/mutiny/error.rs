//! Errors raised by game operations.
//!
//! Every error is recoverable: it is reported privately to whoever caused
//! it and the game state is left untouched.

use super::navigation::Helm;
use super::phases::{Phase, Transition};
use super::types::{Heading, PlayerId};
use serde::{Deserialize, Serialize};

/// How an error should be understood by the person who triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ErrorKind {
    /// The wrong person tried to act, or the input is out of range.
    Validation,
    /// The action collides with the current state (duplicate, locked, stale).
    StateConflict,
    /// Something has to happen first.
    Precondition,
}

/// Error that can occur when validating or applying a game action.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum GameError {
    /// The player is already in the session.
    #[display("{} has already joined", _0)]
    AlreadyJoined(PlayerId),

    /// The lobby is closed.
    #[display("The game has already started")]
    GameAlreadyStarted,

    /// Too few players to deal roles.
    #[display("Need at least {} players to start (have {})", need, have)]
    NotEnoughPlayers {
        /// Players currently in the lobby.
        have: usize,
        /// Minimum required.
        need: usize,
    },

    /// The game has not started yet (or has finished).
    #[display("The game is not in progress")]
    GameNotInProgress,

    /// The game is over.
    #[display("The game is over")]
    GameOver,

    /// The identity is not part of this session.
    #[display("{} is not in this game", _0)]
    NotAPlayer(PlayerId),

    /// Only the host may do this.
    #[display("Only the host can do that")]
    NotHost,

    /// Only the captain may do this.
    #[display("Only the captain can do that")]
    NotCaptain,

    /// Only the holder of a navigation seat may answer its prompt.
    #[display("Only the {} can answer that", _0)]
    NotYourPrompt(Helm),

    /// The captain tried to vote in a mutiny against themself.
    #[display("The captain cannot vote in a mutiny")]
    CaptainCannotVote,

    /// The player is not on this round's voter list.
    #[display("You are not eligible to vote this round")]
    NotEligibleVoter,

    /// A team pick that breaks the team rules.
    #[display("{} cannot be chosen: {}", player, reason)]
    InvalidCandidate {
        /// The rejected pick.
        player: PlayerId,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Confirmation before both seats are filled.
    #[display("Choose both a lieutenant and a navigator before confirming")]
    IncompleteSelection,

    /// More guns committed than the player owns.
    #[display("You have {} guns and cannot commit {}", available, requested)]
    GunsOutOfRange {
        /// Guns the player tried to commit.
        requested: u32,
        /// Guns the player owns.
        available: u32,
    },

    /// A write-once choice was already made.
    #[display("Your choice is already locked in")]
    AlreadyLocked,

    /// A second ballot from the same voter.
    #[display("You have already voted")]
    AlreadySubmitted,

    /// A heading that was not among the offered options.
    #[display("{} was not one of your options", _0)]
    NotOffered(Heading),

    /// A submission for a choice that has not been offered yet.
    #[display("You have not been asked for that yet")]
    NotPrompted,

    /// A prompt from an earlier phase.
    #[display("That prompt has expired")]
    PromptExpired,

    /// The action belongs to another phase.
    #[display("That belongs to {}, but the game is in {}", expected, actual)]
    WrongPhase {
        /// Phase the action belongs to.
        expected: Phase,
        /// Current phase.
        actual: Phase,
    },

    /// A transition from a phase it does not leave.
    #[display("Cannot take {} from {}", transition, from)]
    IllegalTransition {
        /// The refused transition.
        transition: Transition,
        /// The phase it was attempted from.
        from: Phase,
    },

    /// Input that could not be parsed.
    #[display("Could not read your answer: {}", _0)]
    MalformedInput(String),

    /// A postcondition failed after a state change.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl GameError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::NotAPlayer(_)
            | GameError::NotHost
            | GameError::NotCaptain
            | GameError::NotYourPrompt(_)
            | GameError::CaptainCannotVote
            | GameError::NotEligibleVoter
            | GameError::InvalidCandidate { .. }
            | GameError::GunsOutOfRange { .. }
            | GameError::NotOffered(_)
            | GameError::MalformedInput(_) => ErrorKind::Validation,
            GameError::AlreadyJoined(_)
            | GameError::GameAlreadyStarted
            | GameError::GameOver
            | GameError::AlreadyLocked
            | GameError::AlreadySubmitted
            | GameError::PromptExpired
            | GameError::WrongPhase { .. }
            | GameError::IllegalTransition { .. }
            | GameError::InvariantViolation(_) => ErrorKind::StateConflict,
            GameError::NotEnoughPlayers { .. }
            | GameError::GameNotInProgress
            | GameError::IncompleteSelection
            | GameError::NotPrompted => ErrorKind::Precondition,
        }
    }
}

impl std::error::Error for GameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert_eq!(GameError::NotCaptain.kind(), ErrorKind::Validation);
        assert_eq!(GameError::CaptainCannotVote.kind(), ErrorKind::Validation);
        assert_eq!(
            GameError::AlreadyJoined("ann".into()).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(GameError::AlreadyLocked.kind(), ErrorKind::StateConflict);
        assert_eq!(
            GameError::NotEnoughPlayers { have: 3, need: 5 }.kind(),
            ErrorKind::Precondition
        );
        assert_eq!(GameError::IncompleteSelection.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_messages_read_naturally() {
        let err = GameError::GunsOutOfRange {
            requested: 5,
            available: 3,
        };
        assert_eq!(err.to_string(), "You have 3 guns and cannot commit 5");
        assert_eq!(
            GameError::NotYourPrompt(Helm::Navigator).to_string(),
            "Only the navigator can answer that"
        );
    }
}
