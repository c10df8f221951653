//! NAVIGATION_SELECTION: the captain drafts and confirms a team.

use super::contracts::{Contract, IsCaptain, TeamContract, TeamProposal, ValidCandidate};
use super::error::GameError;
use super::game::GameSession;
use super::round::Resolution;
use super::types::PlayerId;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A seat on the captain's team.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Seat {
    /// Proposes a heading alongside the captain.
    Lieutenant,
    /// Commits the heading.
    Navigator,
}

impl Seat {
    /// The seat that must not hold the same player.
    pub fn other(self) -> Seat {
        match self {
            Seat::Lieutenant => Seat::Navigator,
            Seat::Navigator => Seat::Lieutenant,
        }
    }
}

/// Ephemeral state of one NAVIGATION_SELECTION phase.
#[derive(Debug, Clone, Default)]
pub struct TeamSelection {
    lieutenant: Option<PlayerId>,
    navigator: Option<PlayerId>,
    resolution: Resolution,
}

impl TeamSelection {
    /// Opens an empty draft.
    pub fn open() -> Self {
        Self::default()
    }

    /// Players the captain may draft: alive, not the captain, and not
    /// `excluding`.
    pub fn candidates(game: &GameSession, excluding: Option<&str>) -> Vec<PlayerId> {
        game.crew()
            .into_iter()
            .filter(|id| Some(id.as_str()) != excluding)
            .collect()
    }

    /// The player drafted into `seat`.
    pub fn drafted(&self, seat: Seat) -> Option<&PlayerId> {
        match seat {
            Seat::Lieutenant => self.lieutenant.as_ref(),
            Seat::Navigator => self.navigator.as_ref(),
        }
    }

    fn seat_mut(&mut self, seat: Seat) -> &mut Option<PlayerId> {
        match seat {
            Seat::Lieutenant => &mut self.lieutenant,
            Seat::Navigator => &mut self.navigator,
        }
    }

    /// Drafts `candidate` into `seat`, replacing any earlier pick.
    #[instrument(skip(self, game), fields(session_id = %game.id()))]
    pub fn pick(
        &mut self,
        game: &GameSession,
        actor: &str,
        seat: Seat,
        candidate: &str,
    ) -> Result<(), GameError> {
        IsCaptain::check(game, actor)?;
        ValidCandidate::check(game, candidate)?;
        if self.drafted(seat.other()).map(String::as_str) == Some(candidate) {
            return Err(GameError::InvalidCandidate {
                player: candidate.to_string(),
                reason: "already holds the other seat",
            });
        }

        *self.seat_mut(seat) = Some(candidate.to_string());
        debug!(%seat, candidate, "Seat drafted");
        Ok(())
    }

    /// Confirms the draft and installs the team on the session.
    #[instrument(skip(self, game), fields(session_id = %game.id()))]
    pub fn confirm(&mut self, game: &mut GameSession, actor: &str) -> Result<(), GameError> {
        let proposal = TeamProposal::new(
            actor.to_string(),
            self.lieutenant.clone(),
            self.navigator.clone(),
        );
        TeamContract::pre(game, &proposal)?;
        self.install(game, proposal)
    }

    /// Fills any empty seat at random and installs the team.
    ///
    /// Used when the selection window closes before the captain confirms.
    #[instrument(skip(self, game), fields(session_id = %game.id()))]
    pub fn fill_randomly(&mut self, game: &mut GameSession) -> Result<(), GameError> {
        for seat in [Seat::Lieutenant, Seat::Navigator] {
            let keep = self
                .drafted(seat)
                .is_some_and(|id| ValidCandidate::check(game, id).is_ok());
            if keep {
                continue;
            }
            let other = self.drafted(seat.other()).cloned();
            let pool = Self::candidates(game, other.as_deref());
            let pick = pool.choose(game.rng_mut()).cloned();
            debug!(%seat, pick = ?pick, "Seat filled at random");
            *self.seat_mut(seat) = pick;
        }

        let Some(captain) = game.captain().cloned() else {
            return Err(GameError::NotCaptain);
        };
        let proposal = TeamProposal::new(captain, self.lieutenant.clone(), self.navigator.clone());
        TeamContract::pre(game, &proposal)?;
        self.install(game, proposal)
    }

    fn install(&mut self, game: &mut GameSession, proposal: TeamProposal) -> Result<(), GameError> {
        let (Some(lieutenant), Some(navigator)) = (proposal.lieutenant, proposal.navigator) else {
            return Err(GameError::IncompleteSelection);
        };
        let before = game.clone();
        game.set_team(lieutenant, navigator);
        TeamContract::post(&before, game)?;
        info!(
            lieutenant = ?game.lieutenant(),
            navigator = ?game.navigator(),
            "Team confirmed"
        );
        Ok(())
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
