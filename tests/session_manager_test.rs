//! Tests for the session registry and its per-session tasks.

use async_trait::async_trait;
use mutiny::{
    ChoiceOption, Command, Correlation, Faction, FormField, GameConfig, Notification, Notifier,
    NotifyError, SessionError, SessionManager, run_simulation,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Stalls an announcement starting with `prefix` until released.
struct Gate {
    prefix: &'static str,
    reached: Notify,
    release: Notify,
}

/// Notifier that remembers everything it was asked to deliver.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<Notification>>,
    gate: Option<Arc<Gate>>,
}

impl Recorder {
    fn gated(gate: Arc<Gate>) -> Self {
        Self {
            sent: Mutex::default(),
            gate: Some(gate),
        }
    }

    fn push(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }

    fn announcements(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::Announce { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn private_to(&self, user: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::Private { user_id, text, .. } if user_id == user => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for Recorder {
    async fn announce(&self, session_id: &str, text: &str) -> Result<(), NotifyError> {
        if let Some(gate) = &self.gate {
            if text.starts_with(gate.prefix) {
                gate.reached.notify_one();
                gate.release.notified().await;
            }
        }
        self.push(Notification::Announce {
            session_id: session_id.into(),
            text: text.into(),
        })
    }

    async fn notify_privately(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), NotifyError> {
        self.push(Notification::Private {
            session_id: session_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        })
    }

    async fn direct(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        self.push(Notification::Direct {
            user_id: user_id.into(),
            text: text.into(),
        })
    }

    async fn prompt_choice(
        &self,
        user_id: &str,
        options: &[ChoiceOption],
        correlation: &Correlation,
    ) -> Result<(), NotifyError> {
        self.push(Notification::Choice {
            user_id: user_id.into(),
            options: options.to_vec(),
            correlation: correlation.clone(),
        })
    }

    async fn prompt_form(
        &self,
        user_id: &str,
        fields: &[FormField],
        correlation: &Correlation,
    ) -> Result<(), NotifyError> {
        self.push(Notification::Form {
            user_id: user_id.into(),
            fields: fields.to_vec(),
            correlation: correlation.clone(),
        })
    }
}

fn manager(seed: u64) -> (Arc<Recorder>, SessionManager) {
    let recorder = Arc::new(Recorder::default());
    let manager = SessionManager::new(recorder.clone(), GameConfig::default().with_seed(seed));
    (recorder, manager)
}

async fn join(manager: &SessionManager, session: &str, user: &str) {
    manager
        .command(
            session,
            Command::Join {
                user_id: user.into(),
                name: user.to_uppercase(),
            },
        )
        .await
        .unwrap();
}

/// Lets the session tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_first_join_opens_session() {
    let (recorder, manager) = manager(1);
    join(&manager, "C1", "ann").await;
    join(&manager, "C1", "bo").await;
    settle().await;

    assert_eq!(manager.list_sessions().await, vec!["C1".to_string()]);
    assert_eq!(recorder.announcements().len(), 2);
}

#[tokio::test]
async fn test_duplicate_session_rejected() {
    let (_recorder, manager) = manager(1);
    let _task = manager
        .create_session("C1".into(), "ann".into())
        .await
        .unwrap();
    assert!(matches!(
        manager.create_session("C1".into(), "bo".into()).await,
        Err(SessionError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_unknown_session_not_found() {
    let (_recorder, manager) = manager(1);
    let result = manager
        .command("nowhere", Command::Start { user_id: "ann".into() })
        .await;
    assert_eq!(result, Err(SessionError::NotFound("nowhere".into())));
}

#[tokio::test]
async fn test_errors_reach_only_the_actor() {
    let (recorder, manager) = manager(2);
    join(&manager, "C1", "ann").await;
    join(&manager, "C1", "bo").await;
    manager
        .command("C1", Command::Start { user_id: "bo".into() })
        .await
        .unwrap();
    settle().await;

    assert_eq!(recorder.private_to("bo"), vec!["Only the host can do that"]);
    assert!(recorder.private_to("ann").is_empty());
}

#[tokio::test]
async fn test_host_end_tears_session_down() {
    let (_recorder, manager) = manager(3);
    let task = manager
        .create_session("C1".into(), "ann".into())
        .await
        .unwrap();
    for user in ["ann", "bo", "cy", "di", "ed"] {
        join(&manager, "C1", user).await;
    }
    manager
        .command("C1", Command::Start { user_id: "ann".into() })
        .await
        .unwrap();
    manager
        .command("C1", Command::End { user_id: "ann".into() })
        .await
        .unwrap();

    let summary = task.await.unwrap();
    assert_eq!(summary.winner, None);
    assert_eq!(summary.turns, 1);
    assert!(manager.list_sessions().await.is_empty());
}

#[tokio::test]
async fn test_closing_session_refuses_late_events() {
    let gate = Arc::new(Gate {
        prefix: "Roles:",
        reached: Notify::new(),
        release: Notify::new(),
    });
    let recorder = Arc::new(Recorder::gated(gate.clone()));
    let manager = SessionManager::new(recorder.clone(), GameConfig::default().with_seed(5));
    let task = manager
        .create_session("C1".into(), "ann".into())
        .await
        .unwrap();
    for user in ["ann", "bo", "cy", "di", "ed"] {
        join(&manager, "C1", user).await;
    }
    manager
        .command("C1", Command::Start { user_id: "ann".into() })
        .await
        .unwrap();
    manager
        .command("C1", Command::End { user_id: "ann".into() })
        .await
        .unwrap();

    // The session is still delivering its final announcement here.
    gate.reached.notified().await;
    let late = manager
        .command("C1", Command::Status { user_id: "bo".into() })
        .await;
    assert_eq!(late, Err(SessionError::NotFound("C1".into())));
    assert!(manager.list_sessions().await.is_empty());

    gate.release.notify_one();
    let summary = task.await.unwrap();
    assert_eq!(summary.winner, None);
    assert!(recorder.private_to("bo").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timers_advance_an_idle_table() {
    let (recorder, manager) = manager(4);
    let task = manager
        .create_session("C1".into(), "ann".into())
        .await
        .unwrap();
    for user in ["ann", "bo", "cy", "di", "ed"] {
        join(&manager, "C1", user).await;
    }
    manager
        .command("C1", Command::Start { user_id: "ann".into() })
        .await
        .unwrap();

    // Selection, mutiny, both navigation stages and discussion all lapse.
    tokio::time::sleep(Duration::from_secs(120 + 60 + 90 + 90 + 120 + 5)).await;
    let announcements = recorder.announcements();
    assert!(announcements.iter().any(|t| t.contains("chosen at random")));
    assert!(announcements.iter().any(|t| t.contains("Turn 2 begins")));

    manager
        .command("C1", Command::End { user_id: "ann".into() })
        .await
        .unwrap();
    let summary = task.await.unwrap();
    assert_eq!(summary.turns, 2);
}

#[tokio::test]
async fn test_bot_simulation_finishes() {
    let config = GameConfig::default().with_seed(11);
    let summary = run_simulation(config, 7, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(summary.session_id, "simulation");
    assert!(summary.turns >= 1);
    if let Some(winner) = summary.winner {
        assert!([Faction::Sailors, Faction::Pirates, Faction::Cult].contains(&winner));
    }
}
