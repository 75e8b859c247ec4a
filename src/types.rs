//! Core types for quick-export

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Unique identifier for an export run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    /// Create a new RunId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Origin classification of a CAD document
///
/// Determines which optional export tasks are planned: geometry, docket and
/// drawing exports only exist for self-made items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The CAD host does not know where the item comes from (0)
    #[default]
    Unknown,
    /// Self-made item (1)
    Made,
    /// Purchased item (2)
    Bought,
}

impl Origin {
    /// Convert the CAD host's integer source code to an Origin
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Origin::Unknown),
            1 => Ok(Origin::Made),
            2 => Ok(Origin::Bought),
            other => Err(Error::InvalidOrigin(other)),
        }
    }

    /// Convert to the CAD host's integer source code
    pub fn to_i32(self) -> i32 {
        match self {
            Origin::Unknown => 0,
            Origin::Made => 1,
            Origin::Bought => 2,
        }
    }

    /// Whether the item is self-made
    pub fn is_made(self) -> bool {
        self == Origin::Made
    }
}

/// UI language of the CAD host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// German
    De,
}

/// Lifecycle state of a [`Runner`](crate::runner::Runner)
///
/// `Idle -> Running -> {Completed, Failed}`. Terminal states stay until the
/// next run is started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// No run has been started yet
    #[default]
    Idle,
    /// A run is executing; `cursor` is the index of the next task to run
    Running {
        /// The run in progress
        run: RunId,
        /// Index of the next task to execute
        cursor: usize,
        /// Number of tasks in the queue
        total: usize,
    },
    /// Every task returned successfully
    Completed {
        /// The finished run
        run: RunId,
    },
    /// A task failed; nothing after `cursor` was executed
    Failed {
        /// The failed run
        run: RunId,
        /// Index of the failing task
        cursor: usize,
        /// Name of the failing task
        task: String,
    },
}

impl RunState {
    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    /// Whether the last run reached Completed or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed { .. } | RunState::Failed { .. })
    }

    /// The run this state belongs to, if any
    pub fn run(&self) -> Option<RunId> {
        match self {
            RunState::Idle => None,
            RunState::Running { run, .. }
            | RunState::Completed { run }
            | RunState::Failed { run, .. } => Some(*run),
        }
    }
}

/// Event emitted during a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Run accepted and transient directory prepared
    RunStarted {
        /// Run ID
        run: RunId,
        /// Number of tasks in the queue
        total: usize,
    },

    /// A task is about to execute (live status label)
    TaskStarted {
        /// Run ID
        run: RunId,
        /// Zero-based task position
        index: usize,
        /// Task name
        name: String,
    },

    /// A task returned successfully
    TaskComplete {
        /// Run ID
        run: RunId,
        /// Zero-based task position
        index: usize,
        /// Task name
        name: String,
    },

    /// Progress after a completed task
    Progress {
        /// Run ID
        run: RunId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
    },

    /// All tasks completed
    RunComplete {
        /// Run ID
        run: RunId,
    },

    /// A task failed and the run stopped
    RunFailed {
        /// Run ID
        run: RunId,
        /// Zero-based position of the failing task
        index: usize,
        /// Name of the failing task
        name: String,
        /// Error message
        error: String,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_round_trips_through_i32() {
        for (variant, code) in [
            (Origin::Unknown, 0),
            (Origin::Made, 1),
            (Origin::Bought, 2),
        ] {
            assert_eq!(variant.to_i32(), code);
            assert_eq!(Origin::from_i32(code).unwrap(), variant);
        }
    }

    #[test]
    fn origin_rejects_unknown_codes() {
        let err = Origin::from_i32(7).unwrap_err();
        assert!(matches!(err, Error::InvalidOrigin(7)));
    }

    #[test]
    fn run_state_helpers() {
        let running = RunState::Running {
            run: RunId(1),
            cursor: 0,
            total: 4,
        };
        assert!(running.is_running());
        assert!(!running.is_terminal());
        assert_eq!(running.run(), Some(RunId(1)));

        let failed = RunState::Failed {
            run: RunId(2),
            cursor: 3,
            task: "Docket export".to_string(),
        };
        assert!(failed.is_terminal());
        assert!(!RunState::Idle.is_running());
        assert_eq!(RunState::Idle.run(), None);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::Progress {
            run: RunId(5),
            percent: 25.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["run"], 5);
        assert_eq!(json["percent"], 25.0);
    }
}
