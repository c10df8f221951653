//! Captain invariant: whoever holds command is alive.

use super::super::GameSession;
use super::Invariant;

/// Invariant: a non-null captain references a living player.
pub struct CaptainAliveInvariant;

impl Invariant<GameSession> for CaptainAliveInvariant {
    fn holds(game: &GameSession) -> bool {
        game.captain().is_none_or(|captain| game.is_alive(captain))
    }

    fn description() -> &'static str {
        "The captain is a living player"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_no_captain_holds() {
        let game = GameSession::new("s".into(), "h".into(), &GameConfig::default());
        assert!(CaptainAliveInvariant::holds(&game));
    }

    #[test]
    fn test_unknown_captain_violates() {
        let mut game = GameSession::new("s".into(), "h".into(), &GameConfig::default());
        game.captain = Some("ghost".into());
        assert!(!CaptainAliveInvariant::holds(&game));
    }
}
