//! Pure rule functions for the mutiny game.

mod threshold;
mod win;

pub use threshold::{mutiny_succeeds, mutiny_threshold};
pub use win::check_winner;
