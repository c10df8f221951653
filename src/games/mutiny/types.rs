//! Core domain types for the mutiny game.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Opaque identity of a participant, as supplied by the transport.
pub type PlayerId = String;

/// Hidden role dealt to a player at the start of the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Role {
    /// Loyal crew; wants the ship to reach the northeast harbour.
    Sailor,
    /// Wants the ship to reach the southeast pirate cove.
    Pirate,
    /// Leads the cult; wants the ship to sail far north.
    #[strum(to_string = "Cult Leader")]
    CultLeader,
    /// Follower of the cult leader.
    Cultist,
}

impl Role {
    /// Returns the faction this role plays for.
    pub fn faction(self) -> Faction {
        match self {
            Role::Sailor => Faction::Sailors,
            Role::Pirate => Faction::Pirates,
            Role::CultLeader | Role::Cultist => Faction::Cult,
        }
    }
}

/// A side that can win the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Faction {
    /// Sailors win.
    Sailors,
    /// Pirates win.
    Pirates,
    /// The cult wins.
    Cult,
}

/// One of the four unit moves the ship can make in a turn.
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
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Heading {
    /// (0, 1)
    North,
    /// (0, -1)
    South,
    /// (1, 0)
    East,
    /// (-1, 0)
    West,
}

impl Heading {
    /// Every heading, in a fixed order.
    pub const ALL: [Heading; 4] = [Heading::North, Heading::South, Heading::East, Heading::West];

    /// Returns the unit vector for this heading.
    pub fn vector(self) -> (i32, i32) {
        match self {
            Heading::North => (0, 1),
            Heading::South => (0, -1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }
}

/// Ship coordinates on the open sea.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new,
)]
pub struct ShipPosition {
    /// East-west coordinate (east is positive).
    pub x: i32,
    /// North-south coordinate (north is positive).
    pub y: i32,
}

impl ShipPosition {
    /// Returns the position one step along `heading`.
    #[instrument]
    pub fn moved(self, heading: Heading) -> Self {
        let (dx, dy) = heading.vector();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl std::fmt::Display for ShipPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Lifecycle status of a session. Only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum GameStatus {
    /// Lobby is open and players may join.
    Waiting,
    /// Roles are dealt and the ship is sailing.
    InProgress,
    /// A faction won or the host ended the game.
    Completed,
}

/// A participant in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) role: Option<Role>,
    pub(crate) alive: bool,
    pub(crate) guns: u32,
    /// Reserved for character cards; the rules engine never reads it.
    pub(crate) character: Option<String>,
}

impl Player {
    /// Creates a living player with no role yet.
    pub fn new(id: PlayerId, name: String, guns: u32) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            guns,
            character: None,
        }
    }

    /// Returns the player's identity.
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hidden role, once dealt.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether the player is still aboard.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Current gun count.
    pub fn guns(&self) -> u32 {
        self.guns
    }

    /// Reserved character card slot.
    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }
}
