//! Error types for quick-export
//!
//! This module provides the error handling for the library:
//! - Domain-specific error types (Run, Cleanup, Config, etc.)
//! - Task context (index and name of the failing task) wrapped around task errors
//! - Conversions from the I/O, JSON, zip and spreadsheet errors of the collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for quick-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for quick-export
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "paths.temp_dir")
        key: Option<String>,
    },

    /// Runner or task queue error
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// Cleanup/move error
    #[error("cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// A task of a run failed; the wrapped error is what the task body returned
    #[error("task {index} ({name}) failed: {source}")]
    Task {
        /// Zero-based position of the task in its queue
        index: usize,
        /// Task name as shown to the user
        name: String,
        /// The error raised by the task body
        #[source]
        source: Box<Error>,
    },

    /// A document property could not be read
    #[error("property {name:?}: {reason}")]
    Property {
        /// Property name as requested from the document
        name: String,
        /// Why the lookup failed
        reason: String,
    },

    /// The user's export parameters were rejected before anything ran
    #[error("invalid {field}: {reason}")]
    InvalidRequest {
        /// The offending form field (e.g., "quantity")
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Unknown CAD origin value
    #[error("invalid document origin value: {0}")]
    InvalidOrigin(i32),

    /// Data produced by an earlier task is not available
    #[error("missing export data: {0}")]
    MissingData(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attachment archive error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Spreadsheet writer error
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// External collaborator failed (CAD host, mail client, ...)
    #[error("external collaborator error: {0}")]
    External(String),

    /// Operation not supported (missing collaborator, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Runner and task queue errors
#[derive(Debug, Error)]
pub enum RunError {
    /// A run is already in progress on this runner
    #[error("run {run} is already in progress")]
    AlreadyRunning {
        /// The run currently executing
        run: u64,
    },

    /// The transient directory could not be created before the run started
    #[error("cannot create transient directory {path}: {reason}")]
    Precondition {
        /// The directory the runner tried to create
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// A queue was built without any task
    #[error("task queue is empty")]
    EmptyQueue,

    /// Two tasks with the same name were pushed to a queue
    #[error("duplicate task name {name:?}")]
    DuplicateTask {
        /// The repeated name
        name: String,
    },

    /// A task did not finish within the configured timeout
    #[error("task {name:?} timed out after {seconds:.1}s")]
    TaskTimeout {
        /// Task name
        name: String,
        /// Configured timeout in seconds
        seconds: f64,
    },

    /// The run was dropped before it reached a terminal state
    #[error("run {run} was aborted: {reason}")]
    Aborted {
        /// The run that did not finish
        run: u64,
        /// Why the run stopped (panic, runtime shutdown)
        reason: String,
    },
}

/// Cleanup/move errors
#[derive(Debug, Error)]
pub enum CleanupError {
    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// File collision at the destination
    #[error("file collision at {path}: {reason}")]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
        /// Description of the collision
        reason: String,
    },

    /// Invalid path
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path
        path: PathBuf,
        /// Why the path is invalid
        reason: String,
    },
}

impl Error {
    /// Wrap an error raised by a task body with the task's position and name
    pub fn task(index: usize, name: impl Into<String>, source: Error) -> Self {
        Error::Task {
            index,
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Build a configuration error for the given key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Name of the failing task, if this error came out of a run
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Error::Task { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether the error happened before any task was executed
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Run(RunError::Precondition { .. }) | Error::Run(RunError::AlreadyRunning { .. })
        )
    }
}
