//! Drives a session through its phases.
//!
//! The controller is synchronous: each inbound [`SessionEvent`] runs to
//! completion and yields a list of [`Effect`]s for the session task to carry
//! out (deliver a message, arm or cancel a timer, close the session).

use super::action::{Command, Correlation, FormSubmission, PlayerAction, Prompt};
use super::contracts::{Contract, IsHost, StartContract};
use super::error::GameError;
use super::game::GameSession;
use super::mutiny_round::{MutinyResolver, MutinyRound};
use super::navigation::{Helm, NavigationRound};
use super::phases::{Phase, Transition};
use super::selection::{Seat, TeamSelection};
use super::types::{Faction, GameStatus, Heading, PlayerId, Role, SessionId};
use super::voting::{Ballot, VotingRound};
use crate::config::GameConfig;
use crate::notifier::{ChoiceOption, FormField, Notification};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Form field carrying a mutiny commitment.
pub const GUNS_FIELD: &str = "guns";

/// Option value confirming a drafted team.
pub const CONFIRM: &str = "confirm";

/// Which wait a timer ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TimerStage {
    /// Captain picking a team.
    Selection,
    /// Crew committing guns.
    Mutiny,
    /// Captain and lieutenant proposing.
    Proposals,
    /// Navigator committing.
    Commit,
    /// Discussion and ballot.
    Discussion,
}

/// Identifies one armed timer. Only the latest key is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerKey {
    /// Phase entry the timer belongs to.
    pub epoch: u64,
    /// What it waits for.
    pub stage: TimerStage,
}

/// Something that happened to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A text command.
    Command(Command),
    /// A choice prompt was answered.
    Action(PlayerAction),
    /// A form prompt was submitted.
    Form(FormSubmission),
    /// A timer fired.
    Timer(TimerKey),
}

impl SessionEvent {
    /// Who caused the event; timers have no actor.
    pub fn actor(&self) -> Option<&PlayerId> {
        match self {
            SessionEvent::Command(command) => Some(command.user_id()),
            SessionEvent::Action(action) => Some(&action.user_id),
            SessionEvent::Form(form) => Some(&form.user_id),
            SessionEvent::Timer(_) => None,
        }
    }
}

/// Work the session task must do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a message.
    Notify(Notification),
    /// Arm a timer that feeds `key` back after `after`.
    ScheduleTimer {
        /// Key to feed back.
        key: TimerKey,
        /// Delay.
        after: Duration,
    },
    /// Disarm a timer.
    CancelTimer(TimerKey),
    /// The game is over; tear the session down.
    Closed {
        /// Winning faction, if the game was not abandoned.
        winner: Option<Faction>,
    },
}

#[derive(Debug)]
enum Round {
    Idle,
    Selection(TeamSelection),
    Mutiny(MutinyRound),
    Navigation(NavigationRound),
    Voting(VotingRound),
}

/// Owns a [`GameSession`] and the round in progress.
#[derive(Debug)]
pub struct TurnController {
    game: GameSession,
    config: GameConfig,
    round: Round,
    epoch: u64,
    pending_timer: Option<TimerKey>,
    /// Set by a successful mutiny until the new team is confirmed.
    reselecting: bool,
    effects: Vec<Effect>,
}

impl TurnController {
    /// Creates a controller for a fresh lobby.
    #[instrument(skip(config))]
    pub fn new(session_id: SessionId, host: PlayerId, config: GameConfig) -> Self {
        Self {
            game: GameSession::new(session_id, host, &config),
            config,
            round: Round::Idle,
            epoch: 0,
            pending_timer: None,
            reselecting: false,
            effects: Vec::new(),
        }
    }

    /// The session being driven.
    pub fn game(&self) -> &GameSession {
        &self.game
    }

    /// Current phase entry counter.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The timer whose firing will be honoured.
    pub fn pending_timer(&self) -> Option<TimerKey> {
        self.pending_timer
    }

    /// Builds the correlation for a prompt issued now.
    pub fn correlation(&self, prompt: Prompt) -> Correlation {
        Correlation::new(self.game.id().clone(), prompt, self.epoch)
    }

    /// Processes one event and returns the effects it produced.
    ///
    /// Errors are reported privately to whoever caused them and leave the
    /// session unchanged.
    #[instrument(skip(self, event), fields(session_id = %self.game.id(), phase = %self.game.phase()))]
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let actor = event.actor().cloned();
        if let Err(e) = self.dispatch(event) {
            warn!(actor = ?actor, error = %e, kind = %e.kind(), "Event rejected");
            if let Some(user_id) = actor {
                self.private(&user_id, e.to_string());
            }
        }
        std::mem::take(&mut self.effects)
    }

    fn dispatch(&mut self, event: SessionEvent) -> Result<(), GameError> {
        if self.game.status() == GameStatus::Completed {
            if let SessionEvent::Timer(key) = event {
                debug!(?key, "Timer after game over ignored");
                return Ok(());
            }
            return Err(GameError::GameOver);
        }
        match event {
            SessionEvent::Command(command) => self.on_command(command),
            SessionEvent::Action(action) => self.on_action(action),
            SessionEvent::Form(form) => self.on_form(form),
            SessionEvent::Timer(key) => self.on_timer(key),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Commands
    // ─────────────────────────────────────────────────────────────

    fn on_command(&mut self, command: Command) -> Result<(), GameError> {
        match command {
            Command::Join { user_id, name } => {
                let count = self.game.add_player(user_id, name.clone())?;
                self.announce(format!(
                    "{name} joined the crew ({count} aboard, {} needed to sail).",
                    self.game.min_players()
                ));
                Ok(())
            }
            Command::Start { user_id } => self.start(&user_id),
            Command::End { user_id } => {
                IsHost::check(&self.game, &user_id)?;
                self.announce("The host has ended the game.".to_string());
                self.finish(None)
            }
            Command::Status { user_id } => {
                let status = self.status_line();
                self.private(&user_id, status);
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(session_id = %self.game.id()))]
    fn start(&mut self, requester: &PlayerId) -> Result<(), GameError> {
        StartContract::pre(&self.game, requester)?;
        let before = self.game.clone();
        self.game.start()?;
        StartContract::post(&before, &self.game)?;

        self.deal_role_messages();
        self.announce(format!(
            "Roles have been dealt to {} players. Night falls over the ship...",
            self.game.player_count()
        ));
        self.start_turn()
    }

    fn deal_role_messages(&mut self) {
        let pirates: Vec<(PlayerId, String)> = self
            .game
            .players()
            .iter()
            .filter(|p| p.role() == Some(Role::Pirate))
            .map(|p| (p.id().clone(), p.name().to_string()))
            .collect();

        let dealt: Vec<(PlayerId, Role)> = self
            .game
            .players()
            .iter()
            .filter_map(|p| p.role().map(|role| (p.id().clone(), role)))
            .collect();

        for (user_id, role) in dealt {
            let mut text = format!("You are a {role}. You sail for the {}.", role.faction());
            if role == Role::Pirate {
                let fellows: Vec<&str> = pirates
                    .iter()
                    .filter(|(id, _)| *id != user_id)
                    .map(|(_, name)| name.as_str())
                    .collect();
                text.push_str(&format!(" Your fellow pirates: {}.", fellows.join(", ")));
            }
            self.direct(&user_id, text);
        }
    }

    fn status_line(&self) -> String {
        let game = &self.game;
        match game.status() {
            GameStatus::Waiting => format!(
                "Waiting in port: {} of {} players joined.",
                game.player_count(),
                game.min_players()
            ),
            GameStatus::InProgress => format!(
                "Turn {}, {}. Captain: {}. Ship at {}. {} of {} aboard.",
                game.turn(),
                game.phase(),
                game.captain().map_or("nobody", |c| game.display_name(c)),
                game.position(),
                game.alive_players().count(),
                game.player_count()
            ),
            GameStatus::Completed => "The game is over.".to_string(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Prompt answers
    // ─────────────────────────────────────────────────────────────

    fn check_correlation(&self, correlation: &Correlation, user_id: &str) -> Result<(), GameError> {
        if correlation.session_id != *self.game.id() {
            return Err(GameError::MalformedInput(format!(
                "answer for session {}",
                correlation.session_id
            )));
        }
        if self.game.player(user_id).is_none() {
            return Err(GameError::NotAPlayer(user_id.to_string()));
        }
        if correlation.epoch != self.epoch {
            debug!(
                epoch = correlation.epoch,
                current = self.epoch,
                "Stale prompt answered"
            );
            return Err(GameError::PromptExpired);
        }
        let expected = correlation.prompt.phase();
        if expected != self.game.phase() {
            return Err(GameError::WrongPhase {
                expected,
                actual: self.game.phase(),
            });
        }
        Ok(())
    }

    fn on_action(&mut self, action: PlayerAction) -> Result<(), GameError> {
        let PlayerAction {
            correlation,
            user_id,
            payload,
        } = action;
        self.check_correlation(&correlation, &user_id)?;

        match correlation.prompt {
            Prompt::SelectLieutenant => self.on_pick(&user_id, Seat::Lieutenant, &payload),
            Prompt::SelectNavigator => self.on_pick(&user_id, Seat::Navigator, &payload),
            Prompt::ConfirmTeam => self.on_confirm(&user_id, &payload),
            Prompt::MutinyGuns => self.on_guns(&user_id, parse_guns(&payload)?),
            Prompt::CaptainHeading => self.on_heading(&user_id, Helm::Captain, &payload),
            Prompt::LieutenantHeading => self.on_heading(&user_id, Helm::Lieutenant, &payload),
            Prompt::NavigatorHeading => self.on_heading(&user_id, Helm::Navigator, &payload),
            Prompt::Ballot => self.on_ballot(&user_id, &payload),
        }
    }

    fn on_form(&mut self, form: FormSubmission) -> Result<(), GameError> {
        let FormSubmission {
            correlation,
            user_id,
            values,
        } = form;
        self.check_correlation(&correlation, &user_id)?;

        if correlation.prompt != Prompt::MutinyGuns {
            return Err(GameError::MalformedInput(format!(
                "{} is not a form",
                correlation.prompt
            )));
        }
        let raw = values
            .get(GUNS_FIELD)
            .ok_or_else(|| GameError::MalformedInput(format!("missing '{GUNS_FIELD}'")))?;
        self.on_guns(&user_id, parse_guns(raw)?)
    }

    fn on_timer(&mut self, key: TimerKey) -> Result<(), GameError> {
        if self.pending_timer != Some(key) {
            debug!(?key, pending = ?self.pending_timer, "Stale timer ignored");
            return Ok(());
        }
        self.pending_timer = None;
        info!(stage = %key.stage, epoch = key.epoch, "Timer fired");

        match key.stage {
            TimerStage::Selection => self.selection_timed_out(),
            TimerStage::Mutiny => self.resolve_mutiny(),
            TimerStage::Proposals => self.proposals_timed_out(),
            TimerStage::Commit => self.commit_timed_out(),
            TimerStage::Discussion => self.resolve_voting(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Turn structure
    // ─────────────────────────────────────────────────────────────

    /// Advances to the next turn, keeping a still-valid team.
    #[instrument(skip(self), fields(session_id = %self.game.id()))]
    fn start_turn(&mut self) -> Result<(), GameError> {
        let from = self.game.phase();
        self.game.next_phase()?;
        self.reselecting = false;

        let captain = self.captain_name();
        self.announce(format!(
            "Turn {} begins. {} has command of the ship.",
            self.game.turn(),
            captain
        ));

        if from == Phase::Voting {
            if self.game.team_is_valid() {
                self.game.apply(Transition::TeamRetained)?;
                let team = self.team_names();
                self.announce(format!("{team} stay on as the navigation team."));
            } else {
                self.game.clear_team();
            }
        }
        self.enter_phase()
    }

    /// Checks for a winner after the ballot, then starts the next turn.
    fn end_turn(&mut self) -> Result<(), GameError> {
        if let Some(winner) = self.game.check_win_condition() {
            return self.finish(Some(winner));
        }
        self.start_turn()
    }

    fn enter_phase(&mut self) -> Result<(), GameError> {
        self.epoch += 1;
        self.cancel_timer();
        debug!(phase = %self.game.phase(), epoch = self.epoch, "Entering phase");

        match self.game.phase() {
            Phase::NavigationSelection => self.enter_selection(),
            Phase::Mutiny => self.enter_mutiny(),
            Phase::Navigation => self.enter_navigation(),
            Phase::Voting => self.enter_voting(),
            Phase::Lobby | Phase::Night | Phase::Completed => {
                self.round = Round::Idle;
                Ok(())
            }
        }
    }

    fn finish(&mut self, winner: Option<Faction>) -> Result<(), GameError> {
        self.cancel_timer();
        self.round = Round::Idle;
        self.game.finish(winner)?;

        match winner {
            Some(faction) => {
                let position = self.game.position();
                self.announce(format!("Land ho at {position}! The {faction} win!"));
            }
            None => self.announce("The voyage was abandoned.".to_string()),
        }
        let reveal = self
            .game
            .players()
            .iter()
            .map(|p| match p.role() {
                Some(role) => format!("{} was a {role}", p.name()),
                None => format!("{} never sailed", p.name()),
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.announce(format!("Roles: {reveal}."));
        self.effects.push(Effect::Closed { winner });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    //  Team selection
    // ─────────────────────────────────────────────────────────────

    fn enter_selection(&mut self) -> Result<(), GameError> {
        self.round = Round::Selection(TeamSelection::open());
        let captain = self.captain_name();
        self.announce(format!(
            "{captain} is choosing a lieutenant and a navigator."
        ));
        self.prompt_seat(Seat::Lieutenant, None)?;
        self.schedule(TimerStage::Selection, self.config.selection_timeout());
        Ok(())
    }

    fn prompt_seat(&mut self, seat: Seat, excluding: Option<&str>) -> Result<(), GameError> {
        let captain = self.game.captain().cloned().ok_or(GameError::NotCaptain)?;
        let options = TeamSelection::candidates(&self.game, excluding)
            .into_iter()
            .map(|id| {
                let label = self.game.display_name(&id).to_string();
                ChoiceOption::new(id, label)
            })
            .collect();
        let prompt = match seat {
            Seat::Lieutenant => Prompt::SelectLieutenant,
            Seat::Navigator => Prompt::SelectNavigator,
        };
        self.choice(&captain, options, prompt);
        Ok(())
    }

    fn on_pick(&mut self, user_id: &str, seat: Seat, candidate: &str) -> Result<(), GameError> {
        let lieutenant = {
            let Round::Selection(selection) = &mut self.round else {
                return Err(GameError::PromptExpired);
            };
            if selection.is_resolved() {
                return Err(GameError::PromptExpired);
            }
            selection.pick(&self.game, user_id, seat, candidate)?;
            selection.drafted(Seat::Lieutenant).cloned()
        };

        let name = self.game.display_name(candidate).to_string();
        self.private(user_id, format!("{name} drafted as {seat}."));
        match seat {
            Seat::Lieutenant => self.prompt_seat(Seat::Navigator, lieutenant.as_deref()),
            Seat::Navigator => {
                let captain = user_id.to_string();
                self.choice(
                    &captain,
                    vec![ChoiceOption::new(CONFIRM.to_string(), "Confirm team".to_string())],
                    Prompt::ConfirmTeam,
                );
                Ok(())
            }
        }
    }

    fn on_confirm(&mut self, user_id: &str, payload: &str) -> Result<(), GameError> {
        if payload != CONFIRM {
            return Err(GameError::MalformedInput(format!("unknown answer '{payload}'")));
        }
        {
            let Round::Selection(selection) = &mut self.round else {
                return Err(GameError::PromptExpired);
            };
            if selection.is_resolved() {
                return Err(GameError::PromptExpired);
            }
            selection.confirm(&mut self.game, user_id)?;
            selection.try_resolve();
        }
        self.finish_selection()
    }

    fn selection_timed_out(&mut self) -> Result<(), GameError> {
        {
            let Round::Selection(selection) = &mut self.round else {
                return Ok(());
            };
            if !selection.try_resolve() {
                return Ok(());
            }
            selection.fill_randomly(&mut self.game)?;
        }
        self.announce("Time is up. A team was chosen at random.".to_string());
        self.finish_selection()
    }

    fn finish_selection(&mut self) -> Result<(), GameError> {
        self.cancel_timer();
        let team = self.team_names();
        self.announce(format!("{team} will take the helm."));

        let transition = if self.reselecting && !*self.config.remutiny_after_reselection() {
            Transition::TeamReconfirmed
        } else {
            Transition::TeamConfirmed
        };
        self.reselecting = false;
        self.game.apply(transition)?;
        self.enter_phase()
    }

    // ─────────────────────────────────────────────────────────────
    //  Mutiny
    // ─────────────────────────────────────────────────────────────

    fn enter_mutiny(&mut self) -> Result<(), GameError> {
        let round = MutinyRound::open(&self.game, self.config.mutiny_timeout());
        let voters: Vec<(PlayerId, u32)> = round
            .eligible()
            .iter()
            .filter_map(|id| self.game.player(id).map(|p| (id.clone(), p.guns())))
            .collect();
        self.round = Round::Mutiny(round);

        let captain = self.captain_name();
        self.announce(format!(
            "The crew may now secretly commit guns to overthrow {captain}."
        ));
        if voters.is_empty() {
            return self.resolve_mutiny();
        }
        for (user_id, guns) in voters {
            let field = FormField::new(
                GUNS_FIELD.to_string(),
                "Guns to commit to the mutiny".to_string(),
                0,
                guns,
            );
            self.form(&user_id, vec![field], Prompt::MutinyGuns);
        }
        self.schedule(TimerStage::Mutiny, self.config.mutiny_timeout());
        Ok(())
    }

    fn on_guns(&mut self, user_id: &str, guns: u32) -> Result<(), GameError> {
        let everyone_in = {
            let Round::Mutiny(round) = &mut self.round else {
                return Err(GameError::PromptExpired);
            };
            round.submit(&self.game, user_id, guns)?
        };
        self.private(user_id, format!("You committed {guns} guns."));
        if everyone_in {
            self.resolve_mutiny()?;
        }
        Ok(())
    }

    fn resolve_mutiny(&mut self) -> Result<(), GameError> {
        let tally = {
            let Round::Mutiny(round) = &mut self.round else {
                return Ok(());
            };
            if !round.try_resolve() {
                return Ok(());
            }
            round.tally(&self.game)
        };
        self.cancel_timer();

        let deposed = self.captain_name();
        MutinyResolver::resolve(&mut self.game, &tally)?;
        if tally.succeeded {
            self.reselecting = true;
            let elected = self.captain_name();
            self.announce(format!(
                "Mutiny! {} guns rose against {deposed} (needed {}). {elected} takes command.",
                tally.total_guns_used, tally.threshold
            ));
        } else {
            self.announce(format!(
                "The mutiny fails with {} guns (needed {}). {deposed} keeps command.",
                tally.total_guns_used, tally.threshold
            ));
        }
        self.enter_phase()
    }

    // ─────────────────────────────────────────────────────────────
    //  Navigation
    // ─────────────────────────────────────────────────────────────

    fn enter_navigation(&mut self) -> Result<(), GameError> {
        let round = NavigationRound::open(self.game.rng_mut());
        let proposers = [
            (Helm::Captain, self.game.captain().cloned(), Prompt::CaptainHeading),
            (
                Helm::Lieutenant,
                self.game.lieutenant().cloned(),
                Prompt::LieutenantHeading,
            ),
        ];
        let mut prompts = Vec::new();
        for (helm, holder, prompt) in proposers {
            let holder = holder.ok_or_else(|| {
                GameError::InvariantViolation(format!("no {helm} at the helm"))
            })?;
            prompts.push((holder, heading_options(round.options(helm)), prompt));
        }
        self.round = Round::Navigation(round);

        self.announce("The captain and lieutenant are plotting a course.".to_string());
        for (holder, options, prompt) in prompts {
            self.choice(&holder, options, prompt);
        }
        self.schedule(TimerStage::Proposals, self.config.navigation_timeout());
        Ok(())
    }

    fn on_heading(&mut self, user_id: &str, helm: Helm, payload: &str) -> Result<(), GameError> {
        let heading: Heading = payload
            .parse()
            .map_err(|_| GameError::MalformedInput(format!("unknown heading '{payload}'")))?;
        let holder = match helm {
            Helm::Captain => self.game.captain(),
            Helm::Lieutenant => self.game.lieutenant(),
            Helm::Navigator => self.game.navigator(),
        };
        if holder.map(String::as_str) != Some(user_id) {
            return Err(GameError::NotYourPrompt(helm));
        }

        let proposals_in = {
            let Round::Navigation(round) = &mut self.round else {
                return Err(GameError::PromptExpired);
            };
            if round.is_resolved() {
                return Err(GameError::PromptExpired);
            }
            round.submit(helm, heading)?;
            round.proposals_locked()
        };
        self.private(user_id, format!("You chose {heading}."));

        match helm {
            Helm::Navigator => self.resolve_navigation(),
            Helm::Captain | Helm::Lieutenant if proposals_in => self.open_commit(),
            Helm::Captain | Helm::Lieutenant => Ok(()),
        }
    }

    fn open_commit(&mut self) -> Result<(), GameError> {
        let options = {
            let Round::Navigation(round) = &mut self.round else {
                return Ok(());
            };
            round.open_commit()
        };
        let Some(options) = options else {
            return Ok(());
        };
        self.cancel_timer();

        let navigator = self
            .game
            .navigator()
            .cloned()
            .ok_or_else(|| GameError::InvariantViolation("no navigator at the helm".into()))?;
        self.announce("Both proposals are in. The navigator must choose.".to_string());
        self.choice(&navigator, heading_options(&options), Prompt::NavigatorHeading);
        self.schedule(TimerStage::Commit, self.config.navigation_timeout());
        Ok(())
    }

    fn proposals_timed_out(&mut self) -> Result<(), GameError> {
        let filled = {
            let Round::Navigation(round) = &mut self.round else {
                return Ok(());
            };
            round.fill_proposals(self.game.rng_mut())
        };
        for (helm, heading) in filled {
            self.announce(format!("The {helm} hesitated; the wind chose {heading}."));
        }
        self.open_commit()
    }

    fn commit_timed_out(&mut self) -> Result<(), GameError> {
        let filled = {
            let Round::Navigation(round) = &mut self.round else {
                return Ok(());
            };
            round.fill_commit(self.game.rng_mut())
        };
        if let Some(heading) = filled {
            self.announce(format!("The navigator hesitated; the wind chose {heading}."));
        }
        self.resolve_navigation()
    }

    fn resolve_navigation(&mut self) -> Result<(), GameError> {
        let heading = {
            let Round::Navigation(round) = &mut self.round else {
                return Ok(());
            };
            let Some(heading) = round.committed() else {
                return Ok(());
            };
            if !round.try_resolve() {
                return Ok(());
            }
            heading
        };
        self.cancel_timer();

        let position = self.game.move_ship(heading);
        self.announce(format!("The ship sails {heading} to {position}."));
        if let Some(winner) = self.game.check_win_condition() {
            return self.finish(Some(winner));
        }
        self.game.apply(Transition::ShipMoved)?;
        self.enter_phase()
    }

    // ─────────────────────────────────────────────────────────────
    //  Voting
    // ─────────────────────────────────────────────────────────────

    fn enter_voting(&mut self) -> Result<(), GameError> {
        let round = VotingRound::open(&self.game);
        let voters = round.eligible().to_vec();
        self.round = Round::Voting(round);

        self.announce(
            "Discuss! Vote to throw someone overboard, or abstain.".to_string(),
        );
        for voter in &voters {
            let mut options: Vec<ChoiceOption> = voters
                .iter()
                .filter(|id| *id != voter)
                .map(|id| {
                    ChoiceOption::new(
                        Ballot::Eliminate(id.clone()).to_string(),
                        self.game.display_name(id).to_string(),
                    )
                })
                .collect();
            options.push(ChoiceOption::new(
                Ballot::Abstain.to_string(),
                "Abstain".to_string(),
            ));
            self.choice(voter, options, Prompt::Ballot);
        }
        self.schedule(TimerStage::Discussion, self.config.discussion_timeout());
        Ok(())
    }

    fn on_ballot(&mut self, user_id: &str, payload: &str) -> Result<(), GameError> {
        let ballot: Ballot = payload.parse()?;
        let everyone_in = {
            let Round::Voting(round) = &mut self.round else {
                return Err(GameError::PromptExpired);
            };
            round.cast(&self.game, user_id, ballot)?
        };
        self.private(user_id, "Your vote is in.".to_string());
        if everyone_in {
            self.resolve_voting()?;
        }
        Ok(())
    }

    fn resolve_voting(&mut self) -> Result<(), GameError> {
        let tally = {
            let Round::Voting(round) = &mut self.round else {
                return Ok(());
            };
            if !round.try_resolve() {
                return Ok(());
            }
            round.tally()
        };
        self.cancel_timer();

        match tally.eliminated {
            Some(id) => {
                let name = self.game.display_name(&id).to_string();
                self.game.eliminate_player(&id)?;
                self.announce(format!("{name} has been thrown overboard."));
            }
            None => self.announce("Nobody is thrown overboard.".to_string()),
        }
        self.end_turn()
    }

    // ─────────────────────────────────────────────────────────────
    //  Effects
    // ─────────────────────────────────────────────────────────────

    fn schedule(&mut self, stage: TimerStage, after: Duration) {
        let key = TimerKey {
            epoch: self.epoch,
            stage,
        };
        self.pending_timer = Some(key);
        self.effects.push(Effect::ScheduleTimer { key, after });
    }

    fn cancel_timer(&mut self) {
        if let Some(key) = self.pending_timer.take() {
            self.effects.push(Effect::CancelTimer(key));
        }
    }

    fn announce(&mut self, text: String) {
        let session_id = self.game.id().clone();
        self.effects
            .push(Effect::Notify(Notification::Announce { session_id, text }));
    }

    fn private(&mut self, user_id: &str, text: String) {
        let session_id = self.game.id().clone();
        self.effects.push(Effect::Notify(Notification::Private {
            session_id,
            user_id: user_id.to_string(),
            text,
        }));
    }

    fn direct(&mut self, user_id: &str, text: String) {
        self.effects.push(Effect::Notify(Notification::Direct {
            user_id: user_id.to_string(),
            text,
        }));
    }

    fn choice(&mut self, user_id: &str, options: Vec<ChoiceOption>, prompt: Prompt) {
        let correlation = self.correlation(prompt);
        self.effects.push(Effect::Notify(Notification::Choice {
            user_id: user_id.to_string(),
            options,
            correlation,
        }));
    }

    fn form(&mut self, user_id: &str, fields: Vec<FormField>, prompt: Prompt) {
        let correlation = self.correlation(prompt);
        self.effects.push(Effect::Notify(Notification::Form {
            user_id: user_id.to_string(),
            fields,
            correlation,
        }));
    }

    fn captain_name(&self) -> String {
        self.game
            .captain()
            .map_or("Nobody", |c| self.game.display_name(c))
            .to_string()
    }

    fn team_names(&self) -> String {
        let name = |id: Option<&PlayerId>| {
            id.map_or("nobody", |id| self.game.display_name(id)).to_string()
        };
        format!(
            "Lieutenant {} and navigator {}",
            name(self.game.lieutenant()),
            name(self.game.navigator())
        )
    }
}

fn parse_guns(raw: &str) -> Result<u32, GameError> {
    raw.trim()
        .parse()
        .map_err(|_| GameError::MalformedInput(format!("'{raw}' is not a number of guns")))
}

fn heading_options(headings: &[Heading]) -> Vec<ChoiceOption> {
    headings
        .iter()
        .map(|h| ChoiceOption::new(h.to_string(), format!("Sail {h}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby(count: usize, config: GameConfig) -> TurnController {
        let mut controller = TurnController::new("s".into(), "p0".into(), config);
        for i in 0..count {
            controller.handle(SessionEvent::Command(Command::Join {
                user_id: format!("p{i}"),
                name: format!("P{i}"),
            }));
        }
        controller
    }

    fn started(seed: u64) -> TurnController {
        let mut controller = lobby(5, GameConfig::default().with_seed(seed));
        controller.handle(SessionEvent::Command(Command::Start {
            user_id: "p0".into(),
        }));
        controller
    }

    fn privately_told(effects: &[Effect], user: &str) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify(Notification::Private { user_id, text, .. }) if user_id == user => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_by_non_host_rejected_privately() {
        let mut controller = lobby(5, GameConfig::default().with_seed(1));
        let effects = controller.handle(SessionEvent::Command(Command::Start {
            user_id: "p3".into(),
        }));
        assert_eq!(controller.game().status(), GameStatus::Waiting);
        assert_eq!(privately_told(&effects, "p3"), vec!["Only the host can do that"]);
    }

    #[test]
    fn test_start_enters_selection_with_timer() {
        let controller = started(2);
        assert_eq!(controller.game().phase(), Phase::NavigationSelection);
        assert_eq!(controller.game().turn(), 1);
        assert_eq!(
            controller.pending_timer().map(|k| k.stage),
            Some(TimerStage::Selection)
        );
    }

    #[test]
    fn test_start_messages_every_player_their_role() {
        let mut controller = lobby(6, GameConfig::default().with_seed(3));
        let effects = controller.handle(SessionEvent::Command(Command::Start {
            user_id: "p0".into(),
        }));
        let directs = effects
            .iter()
            .filter(|e| matches!(e, Effect::Notify(Notification::Direct { .. })))
            .count();
        assert_eq!(directs, 6);
    }

    #[test]
    fn test_stale_timer_ignored() {
        let mut controller = started(4);
        let stale = TimerKey {
            epoch: controller.epoch() - 1,
            stage: TimerStage::Selection,
        };
        let effects = controller.handle(SessionEvent::Timer(stale));
        assert!(effects.is_empty());
        assert_eq!(controller.game().phase(), Phase::NavigationSelection);
    }

    #[test]
    fn test_selection_timeout_fills_team() {
        let mut controller = started(5);
        let key = controller.pending_timer().unwrap();
        controller.handle(SessionEvent::Timer(key));
        assert_eq!(controller.game().phase(), Phase::Mutiny);
        assert!(controller.game().team_is_valid());
    }

    #[test]
    fn test_events_after_game_over_rejected() {
        let mut controller = started(6);
        controller.handle(SessionEvent::Command(Command::End {
            user_id: "p0".into(),
        }));
        assert_eq!(controller.game().status(), GameStatus::Completed);

        let effects = controller.handle(SessionEvent::Command(Command::Status {
            user_id: "p1".into(),
        }));
        assert_eq!(privately_told(&effects, "p1"), vec!["The game is over"]);
    }

    #[test]
    fn test_end_closes_session() {
        let mut controller = started(7);
        let effects = controller.handle(SessionEvent::Command(Command::End {
            user_id: "p0".into(),
        }));
        assert!(effects.contains(&Effect::Closed { winner: None }));
        assert!(effects.iter().any(|e| matches!(e, Effect::CancelTimer(_))));
    }
}
