//! Mutiny - rules engine for a hidden-role ship game
//!
//! Players crew a ship. Sailors, pirates and a cult each want it in
//! different waters, and nobody knows who is who. Every turn a captain
//! picks a team, the crew may mutiny, the helm steers one step, and
//! everyone votes on who goes overboard.
//!
//! # Architecture
//!
//! - **Games**: the mutiny rules, phase machine and [`TurnController`]
//! - **Session**: one single-writer task per game, with timers
//! - **Notifier**: outbound delivery, implemented by the transport
//! - **Simulate**: bot players for trying the rules end to end
//!
//! # Example
//!
//! ```no_run
//! use mutiny::{Command, GameConfig, LogNotifier, SessionManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mutiny::SessionError> {
//! let manager = SessionManager::new(Arc::new(LogNotifier), GameConfig::default());
//! manager
//!     .command("C042", Command::Join { user_id: "U1".into(), name: "Anne".into() })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod games;
mod notifier;
mod session;
mod simulate;

// Crate-level exports - Configuration
pub use config::{ConfigError, GameConfig};

// Crate-level exports - Delivery
pub use notifier::{
    ChoiceOption, FormField, LogNotifier, Notification, Notifier, NotifyError, deliver,
};

// Crate-level exports - Session management
pub use session::{SessionError, SessionManager, SessionSummary};

// Crate-level exports - Simulation
pub use simulate::{BotNotifier, run_simulation};

// Crate-level exports - Game types
pub use games::mutiny::*;
