//! Contract-based validation for session commands.
//!
//! Contracts pair the preconditions an action needs with the
//! postconditions the session must satisfy afterwards: {P} action {Q}

use super::error::GameError;
use super::game::GameSession;
use super::invariants::{InvariantSet, MutinyInvariants};
use super::types::{GameStatus, PlayerId};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Preconditions and postconditions for a state change.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), GameError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), GameError>;
}

fn invariants_hold(game: &GameSession) -> Result<(), GameError> {
    MutinyInvariants::check_all(game).map_err(|violations| {
        let descriptions = violations
            .iter()
            .map(|v| v.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        GameError::InvariantViolation(format!("Postcondition failed: {}", descriptions))
    })
}

// ─────────────────────────────────────────────────────────────
//  Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the actor hosts the session.
pub struct IsHost;

impl IsHost {
    /// Fails with [`GameError::NotHost`] for anyone but the host.
    #[instrument(skip(game))]
    pub fn check(game: &GameSession, actor: &str) -> Result<(), GameError> {
        if game.host() != actor {
            warn!(actor, "Host-only command refused");
            return Err(GameError::NotHost);
        }
        Ok(())
    }
}

/// Precondition: the actor is the captain.
pub struct IsCaptain;

impl IsCaptain {
    /// Fails with [`GameError::NotCaptain`] for anyone but the captain.
    #[instrument(skip(game))]
    pub fn check(game: &GameSession, actor: &str) -> Result<(), GameError> {
        if !game.is_captain(actor) {
            warn!(actor, "Captain-only action refused");
            return Err(GameError::NotCaptain);
        }
        Ok(())
    }
}

/// Precondition: a player may fill a seat on the captain's team.
pub struct ValidCandidate;

impl ValidCandidate {
    /// Candidates must be living players other than the captain.
    #[instrument(skip(game))]
    pub fn check(game: &GameSession, candidate: &str) -> Result<(), GameError> {
        let reason = match game.player(candidate) {
            None => "not in this game",
            Some(player) if !player.is_alive() => "no longer aboard",
            Some(_) if game.is_captain(candidate) => "the captain cannot serve on their own team",
            Some(_) => return Ok(()),
        };
        Err(GameError::InvalidCandidate {
            player: candidate.to_string(),
            reason,
        })
    }
}

// ─────────────────────────────────────────────────────────────
//  Start Contract
// ─────────────────────────────────────────────────────────────

/// Contract for the host starting the game.
///
/// Preconditions:
/// - Requested by the host
/// - Lobby still open with enough players
///
/// Postconditions:
/// - Session in progress
/// - Invariants hold
pub struct StartContract;

impl Contract<GameSession, PlayerId> for StartContract {
    fn pre(game: &GameSession, requester: &PlayerId) -> Result<(), GameError> {
        IsHost::check(game, requester)?;
        if game.status() != GameStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if !game.can_start() {
            return Err(GameError::NotEnoughPlayers {
                have: game.player_count(),
                need: game.min_players(),
            });
        }
        Ok(())
    }

    fn post(_before: &GameSession, after: &GameSession) -> Result<(), GameError> {
        if after.status() != GameStatus::InProgress {
            return Err(GameError::InvariantViolation(
                "Postcondition failed: game not in progress after start".to_string(),
            ));
        }
        invariants_hold(after)
    }
}

// ─────────────────────────────────────────────────────────────
//  Team Contract
// ─────────────────────────────────────────────────────────────

/// A team the captain asks to confirm.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct TeamProposal {
    /// Who is confirming.
    pub actor: PlayerId,
    /// Drafted lieutenant.
    pub lieutenant: Option<PlayerId>,
    /// Drafted navigator.
    pub navigator: Option<PlayerId>,
}

/// Contract for confirming a navigation team.
///
/// Preconditions:
/// - Confirmed by the captain
/// - Both seats drafted with valid, different candidates
///
/// Postconditions:
/// - Captain unchanged
/// - Invariants hold
pub struct TeamContract;

impl Contract<GameSession, TeamProposal> for TeamContract {
    fn pre(game: &GameSession, proposal: &TeamProposal) -> Result<(), GameError> {
        IsCaptain::check(game, &proposal.actor)?;
        let (Some(lieutenant), Some(navigator)) = (&proposal.lieutenant, &proposal.navigator)
        else {
            return Err(GameError::IncompleteSelection);
        };
        ValidCandidate::check(game, lieutenant)?;
        ValidCandidate::check(game, navigator)?;
        if lieutenant == navigator {
            return Err(GameError::InvalidCandidate {
                player: navigator.clone(),
                reason: "already holds the other seat",
            });
        }
        Ok(())
    }

    fn post(before: &GameSession, after: &GameSession) -> Result<(), GameError> {
        if before.captain() != after.captain() {
            return Err(GameError::InvariantViolation(
                "Postcondition failed: captain changed while confirming a team".to_string(),
            ));
        }
        invariants_hold(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn lobby(count: usize) -> GameSession {
        let config = GameConfig::default().with_seed(17);
        let mut game = GameSession::new("c".into(), "p0".into(), &config);
        for i in 0..count {
            game.add_player(format!("p{i}"), format!("P{i}")).unwrap();
        }
        game
    }

    fn at_sea() -> GameSession {
        let mut game = lobby(6);
        game.start().unwrap();
        game.captain = Some("p0".into());
        game
    }

    #[test]
    fn test_start_requires_host() {
        let game = lobby(5);
        assert_eq!(
            StartContract::pre(&game, &"p1".to_string()),
            Err(GameError::NotHost)
        );
        assert!(StartContract::pre(&game, &"p0".to_string()).is_ok());
    }

    #[test]
    fn test_start_requires_players() {
        let game = lobby(4);
        assert_eq!(
            StartContract::pre(&game, &"p0".to_string()),
            Err(GameError::NotEnoughPlayers { have: 4, need: 5 })
        );
    }

    #[test]
    fn test_start_postcondition() {
        let before = lobby(5);
        let mut after = before.clone();
        assert!(StartContract::post(&before, &after).is_err());
        after.start().unwrap();
        assert!(StartContract::post(&before, &after).is_ok());
    }

    #[test]
    fn test_team_requires_captain() {
        let game = at_sea();
        let proposal = TeamProposal::new("p1".into(), Some("p2".into()), Some("p3".into()));
        assert_eq!(TeamContract::pre(&game, &proposal), Err(GameError::NotCaptain));
    }

    #[test]
    fn test_team_requires_both_seats() {
        let game = at_sea();
        let proposal = TeamProposal::new("p0".into(), Some("p2".into()), None);
        assert_eq!(
            TeamContract::pre(&game, &proposal),
            Err(GameError::IncompleteSelection)
        );
    }

    #[test]
    fn test_team_rejects_captain_dead_and_duplicates() {
        let mut game = at_sea();
        game.players[4].alive = false;

        for (lieutenant, navigator) in [("p0", "p2"), ("p4", "p2"), ("p2", "p2"), ("ghost", "p2")] {
            let proposal = TeamProposal::new(
                "p0".into(),
                Some(lieutenant.into()),
                Some(navigator.into()),
            );
            assert!(
                matches!(
                    TeamContract::pre(&game, &proposal),
                    Err(GameError::InvalidCandidate { .. })
                ),
                "{lieutenant}/{navigator} accepted"
            );
        }
    }

    #[test]
    fn test_team_postcondition_checks_invariants() {
        let before = at_sea();
        let mut after = before.clone();
        after.set_team("p1".into(), "p2".into());
        assert!(TeamContract::post(&before, &after).is_ok());

        after.set_team("p1".into(), "p1".into());
        assert!(matches!(
            TeamContract::post(&before, &after),
            Err(GameError::InvariantViolation(_))
        ));
    }
}
