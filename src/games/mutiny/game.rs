//! The long-lived state of one game.

use super::error::GameError;
use super::invariants::{InvariantSet, MutinyInvariants};
use super::phases::{Phase, Transition};
use super::roles::RoleAssigner;
use super::rules;
use super::types::{
    Faction, GameStatus, Heading, Player, PlayerId, Role, SessionId, ShipPosition,
};
use crate::config::GameConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, instrument, warn};

/// A game session: the players, who holds which seat, and where the ship is.
///
/// This is the only long-lived mutable state of a game. Ephemeral round
/// state (votes, proposals) lives with the [`TurnController`] that drives it.
///
/// [`TurnController`]: super::TurnController
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(crate) id: SessionId,
    pub(crate) host: PlayerId,
    /// Join order.
    pub(crate) players: Vec<Player>,
    pub(crate) status: GameStatus,
    pub(crate) turn: u32,
    pub(crate) phase: Phase,
    pub(crate) captain: Option<PlayerId>,
    pub(crate) lieutenant: Option<PlayerId>,
    pub(crate) navigator: Option<PlayerId>,
    pub(crate) position: ShipPosition,
    pub(crate) cult_leader: Option<PlayerId>,
    pub(crate) winner: Option<Faction>,
    /// Set by an election; suppresses the next new-turn rotation.
    pub(crate) captain_elected: bool,
    starting_guns: u32,
    min_players: usize,
    rng: StdRng,
}

impl GameSession {
    /// Creates an empty lobby hosted by `host`.
    #[instrument(skip(config))]
    pub fn new(id: SessionId, host: PlayerId, config: &GameConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(*seed),
            None => StdRng::from_os_rng(),
        };
        info!(session_id = %id, host = %host, "Creating new game session");
        Self {
            id,
            host,
            players: Vec::new(),
            status: GameStatus::Waiting,
            turn: 0,
            phase: Phase::Lobby,
            captain: None,
            lieutenant: None,
            navigator: None,
            position: ShipPosition::default(),
            cult_leader: None,
            winner: None,
            captain_elected: false,
            starting_guns: *config.starting_guns(),
            min_players: *config.min_players(),
            rng,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Identity of the host.
    pub fn host(&self) -> &PlayerId {
        &self.host
    }

    /// Players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks up a player.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Number of players who joined.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Living players in join order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// Fewest players the host may start with.
    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Whether `id` names a living player.
    pub fn is_alive(&self, id: &str) -> bool {
        self.player(id).is_some_and(Player::is_alive)
    }

    /// Lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Completed turn cycles.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current captain.
    pub fn captain(&self) -> Option<&PlayerId> {
        self.captain.as_ref()
    }

    /// Whether `id` is the captain.
    pub fn is_captain(&self, id: &str) -> bool {
        self.captain.as_deref() == Some(id)
    }

    /// Current lieutenant.
    pub fn lieutenant(&self) -> Option<&PlayerId> {
        self.lieutenant.as_ref()
    }

    /// Current navigator.
    pub fn navigator(&self) -> Option<&PlayerId> {
        self.navigator.as_ref()
    }

    /// Where the ship is.
    pub fn position(&self) -> ShipPosition {
        self.position
    }

    /// The player dealt the cult leader role.
    pub fn cult_leader(&self) -> Option<&PlayerId> {
        self.cult_leader.as_ref()
    }

    /// The winning faction, once decided.
    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    /// Display name for `id`, falling back to the raw identity.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.player(id).map(Player::name).unwrap_or(id)
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Adds a player to the lobby and returns the new player count.
    #[instrument(skip(self, name), fields(session_id = %self.id))]
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<usize, GameError> {
        if self.player(&id).is_some() {
            warn!(player_id = %id, "Player already joined");
            return Err(GameError::AlreadyJoined(id));
        }
        if self.status != GameStatus::Waiting {
            warn!(player_id = %id, "Join after start refused");
            return Err(GameError::GameAlreadyStarted);
        }

        self.players.push(Player::new(id.clone(), name, self.starting_guns));
        info!(player_id = %id, count = self.players.len(), "Player joined");
        Ok(self.players.len())
    }

    /// Whether the host may start now.
    pub fn can_start(&self) -> bool {
        self.status == GameStatus::Waiting && self.players.len() >= self.min_players
    }

    /// Closes the lobby, deals roles and picks the first captain.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if !self.can_start() {
            return Err(GameError::NotEnoughPlayers {
                have: self.players.len(),
                need: self.min_players,
            });
        }

        let ids: Vec<PlayerId> = self.players.iter().map(|p| p.id.clone()).collect();
        let dealt = RoleAssigner::assign_roles(&ids, &mut self.rng)?;

        self.apply(Transition::Begin)?;
        self.status = GameStatus::InProgress;

        for (id, role) in dealt {
            if role == Role::CultLeader {
                self.cult_leader = Some(id.clone());
            }
            if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
                player.role = Some(role);
            }
        }

        let alive: Vec<PlayerId> = self.alive_players().map(|p| p.id.clone()).collect();
        self.captain = alive.choose(&mut self.rng).cloned();

        info!(
            players = self.players.len(),
            captain = ?self.captain,
            "Game started"
        );
        Ok(())
    }

    /// Hands command to the next living player after the captain in join order.
    ///
    /// Starts from the captain's seat even if the captain is dead. With no
    /// captain the first living player takes command. A new captain who held
    /// a team seat breaks up the team.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn rotate_captain(&mut self) -> Option<&PlayerId> {
        let start = self
            .captain
            .as_deref()
            .and_then(|c| self.players.iter().position(|p| p.id == c));

        let count = self.players.len();
        let next = match start {
            Some(seat) => (1..=count)
                .map(|offset| &self.players[(seat + offset) % count])
                .find(|p| p.alive),
            None => self.players.iter().find(|p| p.alive),
        };

        self.captain = next.map(|p| p.id.clone());
        debug!(captain = ?self.captain, "Captain rotated");
        let on_team = self.captain.is_some()
            && (self.lieutenant == self.captain || self.navigator == self.captain);
        if on_team {
            debug!(captain = ?self.captain, "New captain was on the team; team dismissed");
            self.clear_team();
        }
        self.captain.as_ref()
    }

    /// Elects the best-armed crew member other than the deposed captain.
    ///
    /// Ties at the top gun count are broken uniformly at random.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn elect_captain_by_guns(&mut self) -> Option<&PlayerId> {
        let previous = self.captain.clone();
        let crew: Vec<(PlayerId, u32)> = self
            .alive_players()
            .filter(|p| Some(&p.id) != previous.as_ref())
            .map(|p| (p.id.clone(), p.guns))
            .collect();

        let top = crew.iter().map(|(_, guns)| *guns).max()?;
        let leaders: Vec<PlayerId> = crew
            .into_iter()
            .filter(|(_, guns)| *guns == top)
            .map(|(id, _)| id)
            .collect();

        let elected = leaders.choose(&mut self.rng).cloned()?;
        info!(
            previous = ?previous,
            elected = %elected,
            guns = top,
            tied = leaders.len(),
            "Captain elected"
        );
        self.captain = Some(elected);
        self.captain_elected = true;
        self.captain.as_ref()
    }

    /// Marks a player dead. A dead captain is replaced at once; a dead
    /// lieutenant or navigator leaves the team.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn eliminate_player(&mut self, id: &str) -> Result<(), GameError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::NotAPlayer(id.to_string()))?;
        player.alive = false;
        info!(player_id = %id, "Player eliminated");

        if self.lieutenant.as_deref() == Some(id) {
            self.lieutenant = None;
        }
        if self.navigator.as_deref() == Some(id) {
            self.navigator = None;
        }
        if self.is_captain(id) {
            self.rotate_captain();
        }
        Ok(())
    }

    /// Who has won, judging only by where the ship is.
    pub fn check_win_condition(&self) -> Option<Faction> {
        rules::check_winner(self.position)
    }

    /// Moves the ship one step.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn move_ship(&mut self, heading: Heading) -> ShipPosition {
        self.position = self.position.moved(heading);
        info!(position = %self.position, "Ship moved");
        self.position
    }

    /// Installs a confirmed navigation team.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn set_team(&mut self, lieutenant: PlayerId, navigator: PlayerId) {
        self.lieutenant = Some(lieutenant);
        self.navigator = Some(navigator);
    }

    /// Dismisses the navigation team.
    pub fn clear_team(&mut self) {
        self.lieutenant = None;
        self.navigator = None;
    }

    /// Whether last turn's team can sail again under the current captain.
    ///
    /// Both seats must be filled by living players who are distinct from
    /// each other and from the captain.
    pub fn team_is_valid(&self) -> bool {
        match (&self.lieutenant, &self.navigator) {
            (Some(lieutenant), Some(navigator)) => {
                lieutenant != navigator
                    && !self.is_captain(lieutenant)
                    && !self.is_captain(navigator)
                    && self.is_alive(lieutenant)
                    && self.is_alive(navigator)
            }
            _ => false,
        }
    }

    /// Living players other than the captain.
    pub fn crew(&self) -> Vec<PlayerId> {
        self.alive_players()
            .filter(|p| !self.is_captain(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Takes a named transition out of the current phase.
    ///
    /// Transitions that begin a turn bump the turn counter and rotate the
    /// captain, unless an election already set one since the last turn began.
    #[instrument(skip(self), fields(session_id = %self.id, from = %self.phase))]
    pub fn apply(&mut self, transition: Transition) -> Result<Phase, GameError> {
        if !transition.permits(self.phase) {
            warn!(%transition, "Illegal transition refused");
            return Err(GameError::IllegalTransition {
                transition,
                from: self.phase,
            });
        }

        self.phase = transition.target();
        if transition.begins_turn() {
            self.turn += 1;
            if std::mem::take(&mut self.captain_elected) {
                debug!("Elected captain keeps command");
            } else {
                self.rotate_captain();
            }
        }
        if transition == Transition::MutinySucceeded {
            self.clear_team();
        }
        if self.phase == Phase::Completed {
            self.status = GameStatus::Completed;
        }

        debug!(to = %self.phase, turn = self.turn, "Phase changed");
        debug_assert!(
            MutinyInvariants::check_all(self).is_ok(),
            "Invariants violated after {transition}"
        );
        Ok(self.phase)
    }

    /// Advances along the turn cycle.
    ///
    /// Within the cycle this steps forward; past its end, or from NIGHT, it
    /// starts the next turn at NAVIGATION_SELECTION with a rotated captain.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn next_phase(&mut self) -> Result<Phase, GameError> {
        let transition = self.phase.successor().ok_or(GameError::GameNotInProgress)?;
        self.apply(transition)
    }

    /// Ends the game, with a winner or abandoned.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn finish(&mut self, winner: Option<Faction>) -> Result<(), GameError> {
        let transition = match winner {
            Some(_) => Transition::Victory,
            None => Transition::Abandon,
        };
        self.apply(transition)?;
        self.winner = winner;
        info!(winner = ?winner, turn = self.turn, "Game finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby(count: usize, seed: u64) -> GameSession {
        let config = GameConfig::default().with_seed(seed);
        let mut game = GameSession::new("s1".into(), "p0".into(), &config);
        for i in 0..count {
            game.add_player(format!("p{i}"), format!("Player {i}")).unwrap();
        }
        game
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut game = lobby(2, 1);
        let result = game.add_player("p1".into(), "Again".into());
        assert_eq!(result, Err(GameError::AlreadyJoined("p1".into())));
        assert_eq!(game.player_count(), 2);
    }

    #[test]
    fn test_join_after_start_rejected() {
        let mut game = lobby(5, 1);
        game.start().unwrap();
        let result = game.add_player("late".into(), "Late".into());
        assert_eq!(result, Err(GameError::GameAlreadyStarted));
        assert_eq!(game.player_count(), 5);
    }

    #[test]
    fn test_can_start_threshold() {
        let mut game = lobby(4, 1);
        assert!(!game.can_start());
        assert_eq!(
            game.start(),
            Err(GameError::NotEnoughPlayers { have: 4, need: 5 })
        );
        game.add_player("p4".into(), "Player 4".into()).unwrap();
        assert!(game.can_start());
        game.start().unwrap();
        assert!(!game.can_start());
    }

    #[test]
    fn test_start_deals_roles_and_picks_captain() {
        let mut game = lobby(7, 4);
        game.start().unwrap();

        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.phase(), Phase::Night);
        assert!(game.players().iter().all(|p| p.role().is_some()));
        let leader = game.cult_leader().unwrap().clone();
        assert_eq!(game.player(&leader).unwrap().role(), Some(Role::CultLeader));
        assert!(game.is_alive(game.captain().unwrap()));
    }

    #[test]
    fn test_first_advance_begins_turn_one() {
        let mut game = lobby(5, 2);
        game.start().unwrap();
        assert_eq!(game.turn(), 0);
        assert_eq!(game.next_phase().unwrap(), Phase::NavigationSelection);
        assert_eq!(game.turn(), 1);
        assert!(game.captain().is_some());
    }

    #[test]
    fn test_rotation_skips_the_dead_and_wraps() {
        let mut game = lobby(5, 3);
        game.start().unwrap();
        game.captain = Some("p3".into());
        game.players[4].alive = false;
        assert_eq!(game.rotate_captain().unwrap(), "p0");
        game.players[1].alive = false;
        assert_eq!(game.rotate_captain().unwrap(), "p2");
    }

    #[test]
    fn test_eliminating_captain_rotates() {
        let mut game = lobby(5, 3);
        game.start().unwrap();
        game.captain = Some("p1".into());
        game.eliminate_player("p1").unwrap();
        assert_eq!(game.captain().unwrap(), "p2");
        assert!(!game.is_alive("p1"));
    }

    #[test]
    fn test_eliminating_team_member_clears_seat() {
        let mut game = lobby(5, 3);
        game.start().unwrap();
        game.captain = Some("p0".into());
        game.set_team("p1".into(), "p2".into());
        game.eliminate_player("p2").unwrap();
        assert_eq!(game.lieutenant().unwrap(), "p1");
        assert_eq!(game.navigator(), None);
        assert!(!game.team_is_valid());
    }

    #[test]
    fn test_election_picks_most_guns() {
        let mut game = lobby(5, 5);
        game.start().unwrap();
        game.captain = Some("p0".into());
        game.players[0].guns = 9;
        game.players[3].guns = 5;
        assert_eq!(game.elect_captain_by_guns().unwrap(), "p3");
    }

    #[test]
    fn test_election_tie_is_roughly_fair() {
        let mut hits = std::collections::HashMap::new();
        let mut game = lobby(5, 6);
        game.start().unwrap();
        for p in game.players.iter_mut() {
            p.guns = 1;
        }
        game.players[1].guns = 4;
        game.players[2].guns = 4;

        for _ in 0..2000 {
            game.captain = Some("p0".into());
            let elected = game.elect_captain_by_guns().unwrap().clone();
            *hits.entry(elected).or_insert(0u32) += 1;
        }

        assert_eq!(hits.len(), 2);
        let p1 = hits["p1"];
        let p2 = hits["p2"];
        assert!((800..=1200).contains(&p1), "p1 elected {p1} times");
        assert!((800..=1200).contains(&p2), "p2 elected {p2} times");
    }

    #[test]
    fn test_elected_captain_survives_next_rotation() {
        let mut game = lobby(5, 8);
        game.start().unwrap();
        game.next_phase().unwrap();
        game.apply(Transition::TeamConfirmed).unwrap();
        let elected = game.elect_captain_by_guns().unwrap().clone();
        game.apply(Transition::MutinySucceeded).unwrap();
        game.apply(Transition::TeamReconfirmed).unwrap();
        game.apply(Transition::ShipMoved).unwrap();
        game.next_phase().unwrap();
        assert_eq!(game.captain().unwrap(), &elected);

        game.apply(Transition::TeamConfirmed).unwrap();
        game.apply(Transition::MutinyFailed).unwrap();
        game.apply(Transition::ShipMoved).unwrap();
        game.next_phase().unwrap();
        assert_ne!(game.captain().unwrap(), &elected);
    }

    #[test]
    fn test_rotation_onto_team_member_dismisses_team() {
        let mut game = lobby(5, 10);
        game.start().unwrap();
        game.next_phase().unwrap();
        game.captain = Some("p0".into());
        game.set_team("p1".into(), "p2".into());
        game.apply(Transition::TeamConfirmed).unwrap();
        game.apply(Transition::MutinyFailed).unwrap();
        game.apply(Transition::ShipMoved).unwrap();

        assert_eq!(game.next_phase().unwrap(), Phase::NavigationSelection);
        assert_eq!(game.captain().unwrap(), "p1");
        assert_eq!(game.lieutenant(), None);
        assert_eq!(game.navigator(), None);
    }

    #[test]
    fn test_eliminating_captain_onto_team_member_dismisses_team() {
        let mut game = lobby(5, 11);
        game.start().unwrap();
        game.captain = Some("p0".into());
        game.set_team("p2".into(), "p1".into());
        game.eliminate_player("p0").unwrap();
        assert_eq!(game.captain().unwrap(), "p1");
        assert_eq!(game.lieutenant(), None);
        assert_eq!(game.navigator(), None);
        assert!(MutinyInvariants::check_all(&game).is_ok());
    }

    #[test]
    fn test_team_validity() {
        let mut game = lobby(5, 9);
        game.start().unwrap();
        game.captain = Some("p0".into());
        game.set_team("p1".into(), "p2".into());
        assert!(game.team_is_valid());

        game.captain = Some("p1".into());
        assert!(!game.team_is_valid());
    }

    #[test]
    fn test_next_phase_from_lobby_fails() {
        let mut game = lobby(5, 1);
        assert_eq!(game.next_phase(), Err(GameError::GameNotInProgress));
    }

    #[test]
    fn test_finish_freezes_status() {
        let mut game = lobby(5, 1);
        game.start().unwrap();
        game.next_phase().unwrap();
        game.finish(Some(Faction::Cult)).unwrap();
        assert_eq!(game.status(), GameStatus::Completed);
        assert_eq!(game.winner(), Some(Faction::Cult));
        assert!(game.next_phase().is_err());
        assert!(game.finish(None).is_err());
    }

    #[test]
    fn test_move_ship_and_win() {
        let mut game = lobby(5, 1);
        game.position = ShipPosition::new(9, 5);
        assert_eq!(game.check_win_condition(), None);
        game.move_ship(Heading::East);
        assert_eq!(game.check_win_condition(), Some(Faction::Sailors));
    }
}
