//! Quorum arithmetic for mutiny votes.

use tracing::instrument;

/// Guns needed for a mutiny to succeed: a strict majority of the crew's guns.
#[instrument]
pub fn mutiny_threshold(total_crew_guns: u32) -> u32 {
    total_crew_guns / 2 + 1
}

/// Whether `guns_used` meets the threshold for `total_crew_guns`.
#[instrument]
pub fn mutiny_succeeds(guns_used: u32, total_crew_guns: u32) -> bool {
    guns_used >= mutiny_threshold(total_crew_guns)
}
