//! Building blocks shared by the ephemeral phase rounds.

use super::error::GameError;
use tracing::debug;

/// Run-once guard for a round's resolution.
///
/// Both the eager path (everyone answered) and the timer path call into
/// resolution; only the first call wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    resolved: bool,
}

impl Resolution {
    /// Claims the resolution. Returns `false` if it was already claimed.
    pub fn try_resolve(&mut self) -> bool {
        if self.resolved {
            debug!("Round already resolved");
            return false;
        }
        self.resolved = true;
        true
    }

    /// Whether the round has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// A choice that can be made exactly once from a set of offered options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOnce<T> {
    /// Nothing has been offered yet.
    Unset,
    /// Options are on the table.
    Pending(Vec<T>),
    /// The choice is final.
    Locked(T),
}

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        WriteOnce::Unset
    }
}

impl<T: Clone + PartialEq> WriteOnce<T> {
    /// Puts `options` on the table. Has no effect on a locked slot.
    pub fn offer(&mut self, options: Vec<T>) {
        if !self.is_locked() {
            *self = WriteOnce::Pending(options);
        }
    }

    /// Locks `choice` if it was offered.
    ///
    /// `not_offered` builds the error for a choice outside the options.
    pub fn lock(
        &mut self,
        choice: T,
        not_offered: impl FnOnce(T) -> GameError,
    ) -> Result<(), GameError> {
        match self {
            WriteOnce::Unset => Err(GameError::NotPrompted),
            WriteOnce::Locked(_) => Err(GameError::AlreadyLocked),
            WriteOnce::Pending(options) if !options.contains(&choice) => Err(not_offered(choice)),
            WriteOnce::Pending(_) => {
                *self = WriteOnce::Locked(choice);
                Ok(())
            }
        }
    }

    /// The offered options, while pending.
    pub fn options(&self) -> &[T] {
        match self {
            WriteOnce::Pending(options) => options,
            _ => &[],
        }
    }

    /// The locked choice.
    pub fn locked(&self) -> Option<&T> {
        match self {
            WriteOnce::Locked(choice) => Some(choice),
            _ => None,
        }
    }

    /// Whether the choice is final.
    pub fn is_locked(&self) -> bool {
        matches!(self, WriteOnce::Locked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::mutiny::Heading;

    #[test]
    fn test_resolution_runs_once() {
        let mut resolution = Resolution::default();
        assert!(resolution.try_resolve());
        assert!(!resolution.try_resolve());
        assert!(resolution.is_resolved());
    }

    #[test]
    fn test_second_lock_rejected_first_kept() {
        let mut slot = WriteOnce::default();
        slot.offer(vec![Heading::North, Heading::East]);
        slot.lock(Heading::East, GameError::NotOffered).unwrap();

        assert_eq!(
            slot.lock(Heading::North, GameError::NotOffered),
            Err(GameError::AlreadyLocked)
        );
        assert_eq!(slot.locked(), Some(&Heading::East));
    }

    #[test]
    fn test_unoffered_choice_rejected() {
        let mut slot = WriteOnce::default();
        assert_eq!(
            slot.lock(Heading::West, GameError::NotOffered),
            Err(GameError::NotPrompted)
        );
        slot.offer(vec![Heading::North, Heading::South]);
        assert_eq!(
            slot.lock(Heading::West, GameError::NotOffered),
            Err(GameError::NotOffered(Heading::West))
        );
        assert!(!slot.is_locked());
    }

    #[test]
    fn test_offer_does_not_reopen_locked_slot() {
        let mut slot = WriteOnce::Locked(Heading::South);
        slot.offer(vec![Heading::North]);
        assert_eq!(slot.locked(), Some(&Heading::South));
    }
}
