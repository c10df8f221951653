//! Hidden role dealing.

use super::error::GameError;
use super::types::{PlayerId, Role};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

/// Fewest players the role table covers.
pub const MIN_PLAYERS: usize = 5;

/// How many of each role a table of a given size receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDistribution {
    /// Number of pirates.
    pub pirates: usize,
    /// Always one.
    pub cult_leaders: usize,
    /// Number of cultists besides the leader.
    pub cultists: usize,
    /// Everyone else.
    pub sailors: usize,
}

impl RoleDistribution {
    /// Looks up the distribution for `count` players.
    #[instrument]
    pub fn for_player_count(count: usize) -> Result<Self, GameError> {
        let (pirates, cultists) = match count {
            0..MIN_PLAYERS => {
                return Err(GameError::NotEnoughPlayers {
                    have: count,
                    need: MIN_PLAYERS,
                });
            }
            5 | 6 => (2, 0),
            7 => (2, 1),
            8 => (3, 1),
            _ => (3, 2),
        };
        Ok(Self {
            pirates,
            cult_leaders: 1,
            cultists,
            sailors: count - pirates - 1 - cultists,
        })
    }

    /// Total number of roles.
    pub fn total(&self) -> usize {
        self.pirates + self.cult_leaders + self.cultists + self.sailors
    }

    /// The roles in dealing order.
    fn roles(&self) -> impl Iterator<Item = Role> {
        std::iter::repeat_n(Role::Pirate, self.pirates)
            .chain(std::iter::repeat_n(Role::CultLeader, self.cult_leaders))
            .chain(std::iter::repeat_n(Role::Cultist, self.cultists))
            .chain(std::iter::repeat_n(Role::Sailor, self.sailors))
    }
}

/// Deals hidden roles to a table of players.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAssigner;

impl RoleAssigner {
    /// Shuffles `players` and deals roles from the table for their count.
    ///
    /// The result pairs every player with exactly one role; its order is
    /// the shuffled order, not the input order.
    #[instrument(skip(rng), fields(count = players.len()))]
    pub fn assign_roles<R: Rng + ?Sized>(
        players: &[PlayerId],
        rng: &mut R,
    ) -> Result<Vec<(PlayerId, Role)>, GameError> {
        let distribution = RoleDistribution::for_player_count(players.len())?;

        let mut seating = players.to_vec();
        seating.shuffle(rng);

        let dealt: Vec<_> = seating.into_iter().zip(distribution.roles()).collect();
        debug!(?distribution, "Roles dealt");
        Ok(dealt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn players(count: usize) -> Vec<PlayerId> {
        (0..count).map(|i| format!("p{i}")).collect()
    }

    fn count_role(dealt: &[(PlayerId, Role)], role: Role) -> usize {
        dealt.iter().filter(|(_, r)| *r == role).count()
    }

    #[test]
    fn test_table_matches_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 5..=12 {
            let expected = RoleDistribution::for_player_count(count).unwrap();
            let dealt = RoleAssigner::assign_roles(&players(count), &mut rng).unwrap();

            assert_eq!(dealt.len(), count);
            assert_eq!(expected.total(), count);
            assert_eq!(count_role(&dealt, Role::CultLeader), 1);
            assert_eq!(count_role(&dealt, Role::Pirate), expected.pirates);
            assert_eq!(count_role(&dealt, Role::Cultist), expected.cultists);
            assert_eq!(count_role(&dealt, Role::Sailor), expected.sailors);
        }
    }

    #[test]
    fn test_known_rows() {
        let five = RoleDistribution::for_player_count(5).unwrap();
        assert_eq!((five.pirates, five.cultists, five.sailors), (2, 0, 2));
        let seven = RoleDistribution::for_player_count(7).unwrap();
        assert_eq!((seven.pirates, seven.cultists, seven.sailors), (2, 1, 3));
        let eight = RoleDistribution::for_player_count(8).unwrap();
        assert_eq!((eight.pirates, eight.cultists, eight.sailors), (3, 1, 3));
        let twelve = RoleDistribution::for_player_count(12).unwrap();
        assert_eq!((twelve.pirates, twelve.cultists, twelve.sailors), (3, 2, 6));
    }

    #[test]
    fn test_every_player_dealt_once() {
        let mut rng = StdRng::seed_from_u64(11);
        let table = players(9);
        let dealt = RoleAssigner::assign_roles(&table, &mut rng).unwrap();
        let mut ids: Vec<_> = dealt.iter().map(|(id, _)| id.clone()).collect();
        ids.sort();
        let mut expected = table.clone();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_too_few_players_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = RoleAssigner::assign_roles(&players(4), &mut rng);
        assert_eq!(result, Err(GameError::NotEnoughPlayers { have: 4, need: 5 }));
    }

    #[test]
    fn test_cult_leader_seat_varies() {
        let table = players(6);
        let mut leaders = std::collections::HashSet::new();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let dealt = RoleAssigner::assign_roles(&table, &mut rng).unwrap();
            let leader = dealt
                .iter()
                .find(|(_, role)| *role == Role::CultLeader)
                .map(|(id, _)| id.clone())
                .unwrap();
            leaders.insert(leader);
        }
        assert_eq!(leaders.len(), table.len());
    }
}
