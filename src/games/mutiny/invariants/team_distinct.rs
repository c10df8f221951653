//! Team invariant: three different people share the helm.

use super::super::GameSession;
use super::Invariant;

/// Invariant: lieutenant and navigator differ from each other and from
/// the captain.
pub struct TeamDistinctInvariant;

impl Invariant<GameSession> for TeamDistinctInvariant {
    fn holds(game: &GameSession) -> bool {
        let lieutenant = game.lieutenant();
        let navigator = game.navigator();

        if lieutenant.is_some() && lieutenant == navigator {
            return false;
        }
        [lieutenant, navigator]
            .into_iter()
            .flatten()
            .all(|member| !game.is_captain(member))
    }

    fn description() -> &'static str {
        "Captain, lieutenant and navigator are different players"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_empty_team_holds() {
        let game = GameSession::new("s".into(), "h".into(), &GameConfig::default());
        assert!(TeamDistinctInvariant::holds(&game));
    }

    #[test]
    fn test_same_lieutenant_and_navigator_violates() {
        let mut game = GameSession::new("s".into(), "h".into(), &GameConfig::default());
        game.set_team("x".into(), "x".into());
        assert!(!TeamDistinctInvariant::holds(&game));
    }

    #[test]
    fn test_captain_on_team_violates() {
        let mut game = GameSession::new("s".into(), "h".into(), &GameConfig::default());
        game.captain = Some("x".into());
        game.set_team("x".into(), "y".into());
        assert!(!TeamDistinctInvariant::holds(&game));
    }
}
