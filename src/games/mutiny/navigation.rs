//! Two-stage navigation: captain and lieutenant propose, navigator commits.

use super::error::GameError;
use super::round::{Resolution, WriteOnce};
use super::types::Heading;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Headings offered to each proposer.
pub const OFFERED_HEADINGS: usize = 2;

/// A seat at the helm during navigation.
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
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Helm {
    /// Proposes one of two offered headings.
    Captain,
    /// Proposes one of two offered headings.
    Lieutenant,
    /// Commits one of the two proposals.
    Navigator,
}

/// Ephemeral state of one NAVIGATION phase.
#[derive(Debug, Clone)]
pub struct NavigationRound {
    captain: WriteOnce<Heading>,
    lieutenant: WriteOnce<Heading>,
    navigator: WriteOnce<Heading>,
    resolution: Resolution,
}

impl NavigationRound {
    /// Opens a round, dealing each proposer a random pair of headings.
    #[instrument(skip(rng))]
    pub fn open<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut round = Self {
            captain: WriteOnce::Unset,
            lieutenant: WriteOnce::Unset,
            navigator: WriteOnce::Unset,
            resolution: Resolution::default(),
        };
        round.captain.offer(deal_headings(rng));
        round.lieutenant.offer(deal_headings(rng));
        debug!(
            captain = ?round.captain.options(),
            lieutenant = ?round.lieutenant.options(),
            "Headings dealt"
        );
        round
    }

    fn slot(&self, helm: Helm) -> &WriteOnce<Heading> {
        match helm {
            Helm::Captain => &self.captain,
            Helm::Lieutenant => &self.lieutenant,
            Helm::Navigator => &self.navigator,
        }
    }

    fn slot_mut(&mut self, helm: Helm) -> &mut WriteOnce<Heading> {
        match helm {
            Helm::Captain => &mut self.captain,
            Helm::Lieutenant => &mut self.lieutenant,
            Helm::Navigator => &mut self.navigator,
        }
    }

    /// Headings currently on offer to `helm`.
    pub fn options(&self, helm: Helm) -> &[Heading] {
        self.slot(helm).options()
    }

    /// The heading `helm` locked in, if any.
    pub fn choice(&self, helm: Helm) -> Option<Heading> {
        self.slot(helm).locked().copied()
    }

    /// Records a heading for `helm`. The first submission is final.
    ///
    /// The navigator is only prompted once both proposals are in; before
    /// that a navigator submission fails with [`GameError::NotPrompted`].
    #[instrument(skip(self))]
    pub fn submit(&mut self, helm: Helm, heading: Heading) -> Result<(), GameError> {
        self.slot_mut(helm).lock(heading, GameError::NotOffered)?;
        debug!(%helm, %heading, "Heading locked");
        Ok(())
    }

    /// Whether both proposers have locked in.
    pub fn proposals_locked(&self) -> bool {
        self.captain.is_locked() && self.lieutenant.is_locked()
    }

    /// Offers the two proposals to the navigator.
    ///
    /// Returns the options, or `None` while a proposal is outstanding.
    /// Identical proposals give the navigator two equivalent options.
    pub fn open_commit(&mut self) -> Option<Vec<Heading>> {
        let options = vec![self.choice(Helm::Captain)?, self.choice(Helm::Lieutenant)?];
        self.navigator.offer(options.clone());
        Some(options)
    }

    /// The navigator's committed heading.
    pub fn committed(&self) -> Option<Heading> {
        self.choice(Helm::Navigator)
    }

    /// Locks a random offered heading for every proposer still deciding.
    ///
    /// Returns the seats that were filled.
    #[instrument(skip(self, rng))]
    pub fn fill_proposals<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<(Helm, Heading)> {
        let mut filled = Vec::new();
        for helm in [Helm::Captain, Helm::Lieutenant] {
            if let Some(heading) = fill(self.slot_mut(helm), rng) {
                filled.push((helm, heading));
            }
        }
        filled
    }

    /// Locks a random proposal for the navigator if they have not chosen.
    #[instrument(skip(self, rng))]
    pub fn fill_commit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Heading> {
        fill(&mut self.navigator, rng)
    }

    /// Claims the round's resolution.
    pub fn try_resolve(&mut self) -> bool {
        self.resolution.try_resolve()
    }

    /// Whether the round has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }
}

fn deal_headings<R: Rng + ?Sized>(rng: &mut R) -> Vec<Heading> {
    let mut headings = Heading::ALL.to_vec();
    headings.shuffle(rng);
    headings.truncate(OFFERED_HEADINGS);
    headings
}

fn fill<R: Rng + ?Sized>(slot: &mut WriteOnce<Heading>, rng: &mut R) -> Option<Heading> {
    let heading = *slot.options().choose(rng)?;
    slot.lock(heading, GameError::NotOffered).ok()?;
    Some(heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn round(seed: u64) -> NavigationRound {
        NavigationRound::open(&mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_proposers_get_two_distinct_headings() {
        for seed in 0..20 {
            let round = round(seed);
            for helm in [Helm::Captain, Helm::Lieutenant] {
                let options = round.options(helm);
                assert_eq!(options.len(), OFFERED_HEADINGS);
                assert_ne!(options[0], options[1]);
            }
            assert!(round.options(Helm::Navigator).is_empty());
        }
    }

    #[test]
    fn test_second_submission_rejected_first_kept() {
        let mut round = round(1);
        let [first, second] = [round.options(Helm::Captain)[0], round.options(Helm::Captain)[1]];
        round.submit(Helm::Captain, first).unwrap();
        assert_eq!(
            round.submit(Helm::Captain, second),
            Err(GameError::AlreadyLocked)
        );
        assert_eq!(round.choice(Helm::Captain), Some(first));
    }

    #[test]
    fn test_navigator_waits_for_both_proposals() {
        let mut round = round(2);
        let heading = round.options(Helm::Captain)[0];
        round.submit(Helm::Captain, heading).unwrap();
        assert_eq!(round.open_commit(), None);
        assert_eq!(
            round.submit(Helm::Navigator, heading),
            Err(GameError::NotPrompted)
        );
    }

    #[test]
    fn test_identical_proposals_offer_two_equivalent_options() {
        let mut round = round(3);
        round.captain = WriteOnce::Pending(vec![Heading::North, Heading::East]);
        round.lieutenant = WriteOnce::Pending(vec![Heading::North, Heading::West]);
        round.submit(Helm::Captain, Heading::North).unwrap();
        round.submit(Helm::Lieutenant, Heading::North).unwrap();

        assert_eq!(
            round.open_commit(),
            Some(vec![Heading::North, Heading::North])
        );
        assert_eq!(
            round.submit(Helm::Navigator, Heading::East),
            Err(GameError::NotOffered(Heading::East))
        );
        round.submit(Helm::Navigator, Heading::North).unwrap();
        assert_eq!(round.committed(), Some(Heading::North));
    }

    #[test]
    fn test_fill_only_touches_open_slots() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut round = NavigationRound::open(&mut rng);
        let chosen = round.options(Helm::Lieutenant)[1];
        round.submit(Helm::Lieutenant, chosen).unwrap();

        let filled = round.fill_proposals(&mut rng);
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].0, Helm::Captain);
        assert_eq!(round.choice(Helm::Lieutenant), Some(chosen));

        let options = round.open_commit().unwrap();
        let committed = round.fill_commit(&mut rng).unwrap();
        assert!(options.contains(&committed));
        assert_eq!(round.fill_commit(&mut rng), None);
    }
}
