//! Bot-driven sessions for trying the rules end to end.
//!
//! Bots are just another [`Notifier`]: every prompt they receive is queued,
//! answered at random and fed back through the [`SessionManager`].

use crate::config::GameConfig;
use crate::games::mutiny::{Command, Correlation, FormSubmission, PlayerAction};
use crate::notifier::{ChoiceOption, FormField, Notifier, NotifyError};
use crate::session::{SessionManager, SessionSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

const BOT_NAMES: [&str; 12] = [
    "Anne", "Bart", "Calico", "Drake", "Edward", "Flint", "Grace", "Henry", "Israel", "Jack",
    "Kidd", "Lafitte",
];

/// A prompt waiting for a bot's answer.
#[derive(Debug, Clone)]
enum BotPrompt {
    Choice {
        user_id: String,
        options: Vec<ChoiceOption>,
        correlation: Correlation,
    },
    Form {
        user_id: String,
        fields: Vec<FormField>,
        correlation: Correlation,
    },
}

/// Notifier that queues prompts for bots and logs everything else.
#[derive(Debug, Clone)]
pub struct BotNotifier {
    prompts: mpsc::UnboundedSender<BotPrompt>,
}

impl BotNotifier {
    fn queue(&self, prompt: BotPrompt) -> Result<(), NotifyError> {
        self.prompts
            .send(prompt)
            .map_err(|_| NotifyError::new("bots have left the table"))
    }
}

#[async_trait]
impl Notifier for BotNotifier {
    async fn announce(&self, session_id: &str, text: &str) -> Result<(), NotifyError> {
        info!(session_id, "📣 {}", text);
        Ok(())
    }

    async fn notify_privately(
        &self,
        _session_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), NotifyError> {
        debug!(user_id, "🔒 {}", text);
        Ok(())
    }

    async fn direct(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        debug!(user_id, "✉️ {}", text);
        Ok(())
    }

    async fn prompt_choice(
        &self,
        user_id: &str,
        options: &[ChoiceOption],
        correlation: &Correlation,
    ) -> Result<(), NotifyError> {
        self.queue(BotPrompt::Choice {
            user_id: user_id.to_string(),
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
        self.queue(BotPrompt::Form {
            user_id: user_id.to_string(),
            fields: fields.to_vec(),
            correlation: correlation.clone(),
        })
    }
}

/// Plays one game with `players` bots and returns how it ended.
///
/// The host ends the game once `limit` has passed without a winner.
#[instrument(skip(config))]
pub async fn run_simulation(
    config: GameConfig,
    players: usize,
    limit: Duration,
) -> Result<SessionSummary> {
    let (tx, mut prompts) = mpsc::unbounded_channel();
    let manager = SessionManager::new(Arc::new(BotNotifier { prompts: tx }), config.clone());
    let mut rng = match config.seed() {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };

    let session_id = "simulation".to_string();
    let host = bot_id(0);
    let mut session = manager
        .create_session(session_id.clone(), host.clone())
        .await?;
    for seat in 0..players {
        let name = BOT_NAMES[seat % BOT_NAMES.len()].to_string();
        manager
            .command(&session_id, Command::Join { user_id: bot_id(seat), name })
            .await?;
    }
    manager
        .command(&session_id, Command::Start { user_id: host.clone() })
        .await?;

    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);
    let mut ended = false;

    loop {
        tokio::select! {
            summary = &mut session => {
                let summary = summary.context("session task failed")?;
                info!(winner = ?summary.winner, turns = summary.turns, "Simulation finished");
                return Ok(summary);
            }
            Some(prompt) = prompts.recv() => {
                if let Err(e) = answer(&manager, prompt, &mut rng).await {
                    debug!(error = %e, "Answer not delivered");
                }
            }
            _ = &mut deadline, if !ended => {
                warn!(?limit, "Time limit reached, host ends the game");
                ended = true;
                let end = Command::End { user_id: host.clone() };
                if let Err(e) = manager.command(&session_id, end).await {
                    debug!(error = %e, "Game already over");
                }
            }
        }
    }
}

fn bot_id(seat: usize) -> String {
    format!("bot-{seat}")
}

async fn answer<R: Rng>(manager: &SessionManager, prompt: BotPrompt, rng: &mut R) -> Result<()> {
    match prompt {
        BotPrompt::Choice {
            user_id,
            options,
            correlation,
        } => {
            let Some(option) = options.choose(rng) else {
                return Ok(());
            };
            debug!(user_id, %correlation, pick = %option.label, "Bot chose");
            let action = PlayerAction::new(correlation, user_id, option.value.clone());
            manager.player_action(action).await?;
        }
        BotPrompt::Form {
            user_id,
            fields,
            correlation,
        } => {
            let values: HashMap<String, String> = fields
                .iter()
                .map(|f| (f.name.clone(), rng.random_range(f.min..=f.max).to_string()))
                .collect();
            debug!(user_id, %correlation, ?values, "Bot filled form");
            let form = FormSubmission::new(correlation, user_id, values);
            manager.form_submission(form).await?;
        }
    }
    Ok(())
}
