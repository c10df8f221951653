//! Session registry for concurrent games.
//!
//! Each session runs on its own task, which is the only writer to its
//! [`TurnController`]. Commands, prompt answers and timer firings are queued
//! on an unbounded channel and handled one at a time.

use crate::config::GameConfig;
use crate::games::mutiny::{
    Command, Effect, Faction, FormSubmission, PlayerAction, PlayerId, SessionEvent, SessionId,
    ShipPosition, TimerKey, TurnController,
};
use crate::notifier::{Notifier, deliver};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Session lookup and delivery errors.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// No such session.
    #[display("No game in {}", _0)]
    NotFound(SessionId),
    /// A session with this id is already running.
    #[display("A game is already running in {}", _0)]
    AlreadyExists(SessionId),
    /// The session finished while the event was in flight.
    #[display("The game in {} has finished", _0)]
    Closed(SessionId),
}

impl std::error::Error for SessionError {}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: SessionId,
    /// Winning faction; `None` if abandoned.
    pub winner: Option<Faction>,
    /// Turns played.
    pub turns: u32,
    /// Where the ship ended up.
    pub position: ShipPosition,
}

#[derive(Debug, Clone)]
struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

type Registry = Arc<Mutex<HashMap<SessionId, SessionHandle>>>;

/// Manages all game sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Registry,
    notifier: Arc<dyn Notifier>,
    config: GameConfig,
}

impl SessionManager {
    /// Creates a session manager delivering through `notifier`.
    #[instrument(skip(notifier, config))]
    pub fn new(notifier: Arc<dyn Notifier>, config: GameConfig) -> Self {
        info!("Creating session manager");
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            notifier,
            config,
        }
    }

    /// Configuration new sessions start with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Spawns a session task hosted by `host`.
    ///
    /// The returned handle resolves when the game completes or is ended.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        id: SessionId,
        host: PlayerId,
    ) -> Result<JoinHandle<SessionSummary>, SessionError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&id) {
            warn!(session_id = %id, "Session already exists");
            return Err(SessionError::AlreadyExists(id));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        sessions.insert(id.clone(), SessionHandle { events: tx.clone() });
        let controller = TurnController::new(id.clone(), host, self.config.clone());
        let task = tokio::spawn(run_session(
            controller,
            rx,
            tx.downgrade(),
            Arc::clone(&self.notifier),
            Arc::clone(&self.sessions),
        ));

        info!(session_id = %id, "Session created");
        Ok(task)
    }

    /// Ids of running sessions.
    pub async fn list_sessions(&self) -> Vec<SessionId> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    /// Routes a command to its session.
    ///
    /// A `Join` for an unknown session opens it with the joiner as host.
    #[instrument(skip(self))]
    pub async fn command(&self, session_id: &str, command: Command) -> Result<(), SessionError> {
        if let Command::Join { user_id, .. } = &command {
            let exists = self.sessions.lock().await.contains_key(session_id);
            if !exists {
                match self
                    .create_session(session_id.to_string(), user_id.clone())
                    .await
                {
                    Ok(_) | Err(SessionError::AlreadyExists(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        self.send(session_id, SessionEvent::Command(command)).await
    }

    /// Routes a choice answer by the session in its correlation.
    #[instrument(skip(self))]
    pub async fn player_action(&self, action: PlayerAction) -> Result<(), SessionError> {
        let session_id = action.correlation.session_id.clone();
        self.send(&session_id, SessionEvent::Action(action)).await
    }

    /// Routes a form submission by the session in its correlation.
    #[instrument(skip(self))]
    pub async fn form_submission(&self, form: FormSubmission) -> Result<(), SessionError> {
        let session_id = form.correlation.session_id.clone();
        self.send(&session_id, SessionEvent::Form(form)).await
    }

    async fn send(&self, session_id: &str, event: SessionEvent) -> Result<(), SessionError> {
        let sessions = self.sessions.lock().await;
        let handle = sessions.get(session_id).ok_or_else(|| {
            debug!(session_id, "Event for unknown session");
            SessionError::NotFound(session_id.to_string())
        })?;
        handle
            .events
            .send(event)
            .map_err(|_| SessionError::Closed(session_id.to_string()))
    }
}

/// Timers armed by one session, keyed so they can be cancelled.
#[derive(Debug, Default)]
struct Timers {
    armed: HashMap<TimerKey, JoinHandle<()>>,
}

impl Timers {
    /// Spawns a sleeper that feeds `key` back after `after`.
    fn arm(&mut self, key: TimerKey, after: Duration, tx: WeakUnboundedSender<SessionEvent>) {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SessionEvent::Timer(key));
            }
        });
        debug!(?key, ?after, "Timer armed");
        if let Some(previous) = self.armed.insert(key, timer) {
            previous.abort();
        }
    }

    fn cancel(&mut self, key: &TimerKey) {
        if let Some(timer) = self.armed.remove(key) {
            timer.abort();
            debug!(?key, "Timer cancelled");
        }
    }

    /// Forgets a timer whose event has been dequeued.
    fn fired(&mut self, key: &TimerKey) {
        self.armed.remove(key);
    }

    fn len(&self) -> usize {
        self.armed.len()
    }

    fn abort_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.abort();
        }
    }
}

/// Single writer for one session.
///
/// A closing session leaves the registry and stops accepting events before
/// its final notifications go out.
#[instrument(skip_all, fields(session_id = %controller.game().id()))]
async fn run_session(
    mut controller: TurnController,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    timer_tx: WeakUnboundedSender<SessionEvent>,
    notifier: Arc<dyn Notifier>,
    sessions: Registry,
) -> SessionSummary {
    let mut timers = Timers::default();
    let mut winner = None;

    while let Some(event) = events.recv().await {
        if let SessionEvent::Timer(key) = &event {
            timers.fired(key);
        }
        let effects = controller.handle(event);
        let closed = effects.iter().find_map(|effect| match effect {
            Effect::Closed { winner } => Some(*winner),
            _ => None,
        });
        if let Some(outcome) = closed {
            winner = outcome;
            sessions.lock().await.remove(controller.game().id());
            events.close();
        }

        for effect in effects {
            match effect {
                Effect::Notify(notification) => deliver(notifier.as_ref(), &notification).await,
                Effect::ScheduleTimer { key, after } => timers.arm(key, after, timer_tx.clone()),
                Effect::CancelTimer(key) => timers.cancel(&key),
                Effect::Closed { .. } => {}
            }
        }
        if closed.is_some() {
            break;
        }
    }

    timers.abort_all();
    while let Ok(event) = events.try_recv() {
        debug!(?event, "Event after close dropped");
    }
    let game = controller.game();
    info!(winner = ?winner, turns = game.turn(), "Session closed");

    SessionSummary {
        session_id: game.id().clone(),
        winner,
        turns: game.turn(),
        position: game.position(),
    }
}
