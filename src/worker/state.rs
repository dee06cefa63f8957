//! Worker generation lifecycle
//!
//! ```text
//! Registered -> Installing -> Installed -> Activating -> Active
//!                    |                                     |
//!                    +--------> Redundant <----------------+
//! ```
//!
//! `Redundant` is where the host puts a generation it discards: one whose
//! install failed, or one superseded by a newer active generation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one worker generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Known to the host, install not started
    Registered,
    /// Populating its bucket
    Installing,
    /// Bucket populated, waiting to activate
    Installed,
    /// Cleaning up stale buckets and claiming clients
    Activating,
    /// Serving fetches
    Active,
    /// Discarded by the host
    Redundant,
}

impl WorkerState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Registered, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Active, Redundant)
        )
    }

    /// Whether fetch interception is allowed
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registered => "registered",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Redundant => "redundant",
        };
        f.write_str(name)
    }
}
