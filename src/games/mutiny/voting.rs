//! VOTING: discussion closes with an elimination ballot.

use super::error::GameError;
use super::game::GameSession;
use super::round::Resolution;
use super::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, instrument};

const ELIMINATE_PREFIX: &str = "eliminate:";
const ABSTAIN: &str = "abstain";

/// Fewest living players a ballot may leave aboard. Below this no team can
/// be formed, so the ballot becomes advisory.
pub const MIN_ABOARD: usize = 3;

/// One player's ballot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    /// Throw this player overboard.
    Eliminate(PlayerId),
    /// Vote for nobody.
    Abstain,
}

impl std::fmt::Display for Ballot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ballot::Eliminate(id) => write!(f, "{ELIMINATE_PREFIX}{id}"),
            Ballot::Abstain => f.write_str(ABSTAIN),
        }
    }
}

impl FromStr for Ballot {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ABSTAIN) {
            return Ok(Ballot::Abstain);
        }
        match s.strip_prefix(ELIMINATE_PREFIX) {
            Some(id) if !id.is_empty() => Ok(Ballot::Eliminate(id.to_string())),
            _ => Err(GameError::MalformedInput(format!("unknown ballot '{s}'"))),
        }
    }
}

/// Result of counting the ballots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingTally {
    /// Who goes overboard, if anyone reached a majority.
    pub eliminated: Option<PlayerId>,
    /// Votes each named player received.
    pub votes: HashMap<PlayerId, usize>,
    /// Ballots cast for nobody.
    pub abstentions: usize,
    /// Votes needed to eliminate.
    pub majority: usize,
}

/// Ephemeral state of one VOTING phase.
#[derive(Debug, Clone)]
pub struct VotingRound {
    ballots: HashMap<PlayerId, Ballot>,
    /// Every living player, fixed when the round opens.
    eligible: Vec<PlayerId>,
    resolution: Resolution,
}

impl VotingRound {
    /// Opens a ballot among all living players.
    #[instrument(skip(game), fields(session_id = %game.id()))]
    pub fn open(game: &GameSession) -> Self {
        let eligible: Vec<PlayerId> = game.alive_players().map(|p| p.id().clone()).collect();
        debug!(voters = eligible.len(), "Ballot opened");
        Self {
            ballots: HashMap::new(),
            eligible,
            resolution: Resolution::default(),
        }
    }

    /// Players who may vote.
    pub fn eligible(&self) -> &[PlayerId] {
        &self.eligible
    }

    /// Records a ballot. Returns whether everyone has now voted.
    #[instrument(skip(self, game), fields(session_id = %game.id()))]
    pub fn cast(
        &mut self,
        game: &GameSession,
        voter: &str,
        ballot: Ballot,
    ) -> Result<bool, GameError> {
        if self.resolution.is_resolved() {
            return Err(GameError::PromptExpired);
        }
        if !self.eligible.iter().any(|id| id == voter) {
            return Err(GameError::NotEligibleVoter);
        }
        if self.ballots.contains_key(voter) {
            return Err(GameError::AlreadySubmitted);
        }
        if let Ballot::Eliminate(target) = &ballot {
            if !game.is_alive(target) {
                return Err(GameError::InvalidCandidate {
                    player: target.clone(),
                    reason: "no longer aboard",
                });
            }
        }

        self.ballots.insert(voter.to_string(), ballot);
        Ok(self.ballots.len() == self.eligible.len())
    }

    /// Counts ballots. A strict majority of eligible voters eliminates,
    /// unless that would leave fewer than [`MIN_ABOARD`] players.
    pub fn tally(&self) -> VotingTally {
        let mut votes: HashMap<PlayerId, usize> = HashMap::new();
        let mut abstentions = 0;
        for ballot in self.ballots.values() {
            match ballot {
                Ballot::Eliminate(target) => *votes.entry(target.clone()).or_default() += 1,
                Ballot::Abstain => abstentions += 1,
            }
        }

        let majority = self.eligible.len() / 2 + 1;
        let eliminated = votes
            .iter()
            .find(|(_, count)| **count >= majority)
            .map(|(id, _)| id.clone())
            .filter(|_| self.eligible.len() > MIN_ABOARD);
        info!(
            cast = self.ballots.len(),
            abstentions,
            majority,
            eliminated = ?eliminated,
            "Ballot counted"
        );
        VotingTally {
            eliminated,
            votes,
            abstentions,
            majority,
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
