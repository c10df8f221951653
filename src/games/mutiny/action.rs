//! Inbound events for a session.
//!
//! Commands, prompt answers and form submissions are plain values. They
//! carry who acted and, for answers, which prompt they answer, so they can
//! be validated before anything changes.

use super::error::GameError;
use super::phases::Phase;
use super::types::{PlayerId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Which question a prompt asked.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Prompt {
    /// Captain drafts a lieutenant.
    SelectLieutenant,
    /// Captain drafts a navigator.
    SelectNavigator,
    /// Captain confirms the draft.
    ConfirmTeam,
    /// Crew commits guns to a mutiny.
    MutinyGuns,
    /// Captain proposes a heading.
    CaptainHeading,
    /// Lieutenant proposes a heading.
    LieutenantHeading,
    /// Navigator commits a heading.
    NavigatorHeading,
    /// Elimination ballot.
    Ballot,
}

impl Prompt {
    /// The phase in which the prompt can be answered.
    pub fn phase(self) -> Phase {
        match self {
            Prompt::SelectLieutenant | Prompt::SelectNavigator | Prompt::ConfirmTeam => {
                Phase::NavigationSelection
            }
            Prompt::MutinyGuns => Phase::Mutiny,
            Prompt::CaptainHeading | Prompt::LieutenantHeading | Prompt::NavigatorHeading => {
                Phase::Navigation
            }
            Prompt::Ballot => Phase::Voting,
        }
    }
}

/// Token routing a prompt answer back to its session and phase entry.
///
/// Renders as `session|prompt|epoch`. The session id may itself contain
/// `|`; the last two fields never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Correlation {
    /// Session the prompt belongs to.
    pub session_id: SessionId,
    /// What was asked.
    pub prompt: Prompt,
    /// Phase entry the prompt was issued in.
    pub epoch: u64,
}

impl std::fmt::Display for Correlation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.session_id, self.prompt, self.epoch)
    }
}

impl FromStr for Correlation {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GameError::MalformedInput(format!("bad correlation '{s}'"));
        let mut parts = s.rsplitn(3, '|');
        let epoch = parts
            .next()
            .and_then(|e| e.parse().ok())
            .ok_or_else(malformed)?;
        let prompt = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let session_id = parts
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(malformed)?;
        Ok(Self {
            session_id: session_id.to_string(),
            prompt,
            epoch,
        })
    }
}

/// A text command addressed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Join the lobby. The first joiner of a new session hosts it.
    Join {
        /// Who is joining.
        user_id: PlayerId,
        /// Display name.
        name: String,
    },
    /// Host starts the game.
    Start {
        /// Who asked.
        user_id: PlayerId,
    },
    /// Host ends the game.
    End {
        /// Who asked.
        user_id: PlayerId,
    },
    /// Ask for a status line, answered privately to the asker.
    Status {
        /// Who asked.
        user_id: PlayerId,
    },
}

impl Command {
    /// Who issued the command.
    pub fn user_id(&self) -> &PlayerId {
        match self {
            Command::Join { user_id, .. }
            | Command::Start { user_id }
            | Command::End { user_id }
            | Command::Status { user_id } => user_id,
        }
    }
}

/// A button press or menu pick answering a choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct PlayerAction {
    /// Prompt being answered.
    pub correlation: Correlation,
    /// Who answered.
    pub user_id: PlayerId,
    /// The chosen option's value.
    pub payload: String,
}

/// A submitted form answering a form prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct FormSubmission {
    /// Prompt being answered.
    pub correlation: Correlation,
    /// Who submitted.
    pub user_id: PlayerId,
    /// Field name to raw value.
    pub values: HashMap<String, String>,
}
