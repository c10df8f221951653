//! Win detection from the ship's position.

use super::super::{Faction, ShipPosition};
use tracing::instrument;

/// East edge both harbours sit behind.
pub const HARBOUR_X: i32 = 10;

/// Northern latitude the sailors' harbour starts at.
pub const SAILOR_Y: i32 = 5;

/// Southern latitude the pirate cove starts at.
pub const PIRATE_Y: i32 = -5;

/// Latitude of the cult's island.
pub const CULT_Y: i32 = 10;

/// Checks whether the ship has reached a faction's waters.
///
/// Returns `Some(faction)` once a boundary is crossed, `None` otherwise.
/// The sailors' and pirates' waters are checked before the cult's.
#[instrument]
pub fn check_winner(position: ShipPosition) -> Option<Faction> {
    let ShipPosition { x, y } = position;
    if x >= HARBOUR_X && y >= SAILOR_Y {
        Some(Faction::Sailors)
    } else if x >= HARBOUR_X && y <= PIRATE_Y {
        Some(Faction::Pirates)
    } else if y >= CULT_Y {
        Some(Faction::Cult)
    } else {
        None
    }
}
