//! # quick-export
//!
//! Export pipeline for CAD documents: turns a document's metadata and a few
//! user-entered parameters into a spreadsheet, geometry, docket, drawing and a
//! notification mail, and finally places the files in a destination folder.
//!
//! ## Design Philosophy
//!
//! quick-export is designed to be:
//! - **Host-agnostic** - The CAD host, office formats and the mail client are
//!   collaborator traits
//! - **Cooperative** - Tasks run one at a time and the runner yields to the
//!   host between them
//! - **Observable** - Progress is a watchable value, every transition is a
//!   broadcast [`Event`]
//! - **Fail-fast** - The first failing step stops the run; nothing is retried
//!
//! ## Quick Start
//!
//! ```no_run
//! use quick_export::{
//!     Collaborators, Config, ExportJob, ExportRequest, ProgressSink, ProjectSelection,
//!     Runner, StaticDocument, XlsxSpreadsheetWriter,
//! };
//! # use quick_export::collaborators::{DocketGenerator, GeometryExporter};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     geometry: Arc<dyn GeometryExporter>,
//! #     docket: Arc<dyn DocketGenerator>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_file("quick_export.json")?);
//! let document = Arc::new(
//!     StaticDocument::new("P-100", "C")
//!         .with_property("project", "4711")
//!         .with_property("product", "Bracket")
//!         .with_property("machine", "M12"),
//! );
//! let collaborators = Collaborators {
//!     spreadsheet: Arc::new(XlsxSpreadsheetWriter),
//!     geometry,
//!     docket,
//!     drawing: None,
//!     mail: None,
//! };
//! let request = ExportRequest {
//!     project: ProjectSelection::Keep,
//!     condition: "New".to_string(),
//!     quantity: "1".to_string(),
//!     note: String::new(),
//!     receiver: "jane.doe@example.com".to_string(),
//!     destination: "/srv/exports".into(),
//! };
//!
//! let runner = Runner::from_config(&config);
//! let mut events = runner.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let job = ExportJob::new(config, document, request, collaborators)?;
//! let outcome = job.run(&runner, ProgressSink::new()).await?;
//! println!("next: {:?}", outcome.after);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Cleanup stage: move or discard exported files
pub mod cleanup;
/// Export step collaborators
pub mod collaborators;
/// Export data collection
pub mod collect;
/// Configuration types
pub mod config;
/// Document context provider
pub mod document;
/// Error types
pub mod error;
/// Export job wiring
pub mod export;
/// Notification mail preparation
pub mod mail;
/// Export pipeline assembly
pub mod pipeline;
/// Cooperative task runner
pub mod runner;
/// Tasks and task queues
pub mod task;
/// Core types
pub mod types;
/// Path helpers
pub mod utils;

pub use cleanup::{CleanupReport, run_cleanup_stage};
pub use collaborators::{Collaborators, XlsxSpreadsheetWriter};
pub use collect::{ExportData, ProjectSelection};
pub use config::{AppUsage, Config, FileCollisionAction};
pub use document::{DocumentContext, PropertyLookup, StaticDocument};
pub use error::{CleanupError, Error, Result, RunError};
pub use export::{AfterExport, ExportJob, ExportOutcome, ExportRequest};
pub use pipeline::{Capabilities, StepKind};
pub use runner::{ProgressSink, RunHandle, Runner};
pub use task::{Task, TaskAction, TaskQueue};
pub use types::{Event, Language, Origin, RunId, RunState};
