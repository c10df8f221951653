//! Cult invariant: exactly one cult leader once roles are dealt.

use super::super::{GameSession, Role};
use super::Invariant;

/// Invariant: before dealing nobody has a role; after dealing exactly one
/// player is the cult leader and the session records who.
pub struct SingleCultLeaderInvariant;

impl Invariant<GameSession> for SingleCultLeaderInvariant {
    fn holds(game: &GameSession) -> bool {
        let dealt = game.players().iter().filter(|p| p.role().is_some()).count();
        if dealt == 0 {
            return game.cult_leader().is_none();
        }

        let mut leaders = game
            .players()
            .iter()
            .filter(|p| p.role() == Some(Role::CultLeader));
        match (leaders.next(), leaders.next()) {
            (Some(leader), None) => {
                dealt == game.player_count() && game.cult_leader() == Some(leader.id())
            }
            _ => false,
        }
    }

    fn description() -> &'static str {
        "Exactly one cult leader, recorded on the session"
    }
}
