//! MUTINY: a secret, gun-weighted vote to depose the captain.

use super::error::GameError;
use super::game::GameSession;
use super::phases::{Phase, Transition};
use super::round::Resolution;
use super::rules;
use super::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Ephemeral state of one MUTINY phase.
#[derive(Debug, Clone)]
pub struct MutinyRound {
    commitments: HashMap<PlayerId, u32>,
    /// Fixed when the round opens.
    eligible: Vec<PlayerId>,
    deadline: Instant,
    resolution: Resolution,
}

/// Outcome of counting a mutiny vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutinyTally {
    /// Guns committed against the captain.
    pub total_guns_used: u32,
    /// Guns held by every eligible voter.
    pub total_crew_guns: u32,
    /// Guns needed to succeed.
    pub threshold: u32,
    /// Whether the captain falls.
    pub succeeded: bool,
}

impl MutinyRound {
    /// Opens a vote among the living crew.
    #[instrument(skip(game), fields(session_id = %game.id()))]
    pub fn open(game: &GameSession, timeout: Duration) -> Self {
        let eligible = game.crew();
        debug!(voters = eligible.len(), "Mutiny opened");
        Self {
            commitments: HashMap::new(),
            eligible,
            deadline: Instant::now() + timeout,
            resolution: Resolution::default(),
        }
    }

    /// Players who may vote.
    pub fn eligible(&self) -> &[PlayerId] {
        &self.eligible
    }

    /// When the vote closes on its own, on the runtime clock the session
    /// timers use.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether `voter` has already committed.
    pub fn has_submitted(&self, voter: &str) -> bool {
        self.commitments.contains_key(voter)
    }

    /// Records `guns` from `voter`. Returns whether every eligible voter
    /// has now committed.
    #[instrument(skip(self, game), fields(session_id = %game.id()))]
    pub fn submit(&mut self, game: &GameSession, voter: &str, guns: u32) -> Result<bool, GameError> {
        if self.resolution.is_resolved() {
            return Err(GameError::PromptExpired);
        }
        if game.is_captain(voter) {
            warn!(voter, "Captain tried to vote in mutiny");
            return Err(GameError::CaptainCannotVote);
        }
        if !self.eligible.iter().any(|id| id == voter) {
            return Err(GameError::NotEligibleVoter);
        }
        if self.has_submitted(voter) {
            return Err(GameError::AlreadySubmitted);
        }
        let available = game.player(voter).map_or(0, |p| p.guns());
        if guns > available {
            return Err(GameError::GunsOutOfRange {
                requested: guns,
                available,
            });
        }

        self.commitments.insert(voter.to_string(), guns);
        debug!(
            submitted = self.commitments.len(),
            eligible = self.eligible.len(),
            "Mutiny vote recorded"
        );
        Ok(self.commitments.len() == self.eligible.len())
    }

    /// Counts the vote. Voters who stayed silent commit nothing.
    pub fn tally(&self, game: &GameSession) -> MutinyTally {
        let total_crew_guns = self
            .eligible
            .iter()
            .filter_map(|id| game.player(id))
            .map(|p| p.guns())
            .sum();
        let total_guns_used = self.commitments.values().sum();
        MutinyTally {
            total_guns_used,
            total_crew_guns,
            threshold: rules::mutiny_threshold(total_crew_guns),
            succeeded: rules::mutiny_succeeds(total_guns_used, total_crew_guns),
        }
    }

    /// Claims the round's resolution.
    pub fn try_resolve(&mut self) -> bool {
        self.resolution.try_resolve()
    }

    /// Whether the round has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }
}

/// Applies a counted mutiny to the session.
pub struct MutinyResolver;

impl MutinyResolver {
    /// On success the captain is deposed, a new one elected by guns and the
    /// game returns to NAVIGATION_SELECTION. On failure it moves on to
    /// NAVIGATION under the same captain. Guns are never spent.
    #[instrument(skip(game, tally), fields(session_id = %game.id()))]
    pub fn resolve(game: &mut GameSession, tally: &MutinyTally) -> Result<Phase, GameError> {
        info!(
            used = tally.total_guns_used,
            crew = tally.total_crew_guns,
            threshold = tally.threshold,
            succeeded = tally.succeeded,
            "Mutiny resolved"
        );
        if tally.succeeded {
            game.elect_captain_by_guns();
            game.apply(Transition::MutinySucceeded)
        } else {
            game.apply(Transition::MutinyFailed)
        }
    }
}
