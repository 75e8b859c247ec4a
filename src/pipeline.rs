//! Export pipeline assembly
//!
//! Plans which export steps a run contains and assembles them into a
//! [`TaskQueue`]:
//! 1. Collect data - gather the document's export data
//! 2. Spreadsheet - write the data spreadsheet
//! 3. Geometry - STEP/STL export (self-made items only)
//! 4. Docket - docket document (self-made items only)
//! 5. Drawing - linked 2D drawing (self-made items with a drawing exporter only)
//! 6. Notify - compose the notification mail
//! 7. Cleanup - move artifacts to the destination, discard transient files

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::Result;
use crate::task::{TaskAction, TaskQueue};
use crate::types::Origin;

/// One step of the export pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Gather the export data from the document
    CollectData,
    /// Write the data spreadsheet
    Spreadsheet,
    /// Export STEP (and STL for parts)
    Geometry,
    /// Generate the docket document
    Docket,
    /// Export the linked drawing as PDF and DXF
    Drawing,
    /// Compose the notification mail
    Notify,
    /// Move artifacts and discard transient files
    Cleanup,
}

impl StepKind {
    /// Label shown to the user while the step runs; also the task name
    pub fn label(self) -> &'static str {
        match self {
            StepKind::CollectData => "Collect data",
            StepKind::Spreadsheet => "Spreadsheet export",
            StepKind::Geometry => "STEP/STL export",
            StepKind::Docket => "Docket export",
            StepKind::Drawing => "Drawing export",
            StepKind::Notify => "Sending mail",
            StepKind::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Availability of optional downstream collaborators
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// A mail client is available
    pub mail: bool,
    /// The CAD host can open and export linked drawings
    pub drawing: bool,
}

impl Capabilities {
    /// Every collaborator available
    pub fn all() -> Self {
        Self {
            mail: true,
            drawing: true,
        }
    }
}

/// Supplies the task body for each planned step
pub trait StepFactory {
    /// Create the action that performs `kind`
    fn action(&self, kind: StepKind) -> Box<dyn TaskAction>;
}

/// Plan the ordered steps for a document of the given origin
///
/// The always-present steps keep their relative order; the self-made steps are
/// inserted between the spreadsheet and the notification. A missing mail client
/// does not remove the notification step, which then skips itself.
pub fn plan(origin: Origin, capabilities: Capabilities) -> Vec<StepKind> {
    let mut steps = vec![StepKind::CollectData, StepKind::Spreadsheet];

    if origin.is_made() {
        steps.push(StepKind::Geometry);
        steps.push(StepKind::Docket);
        if capabilities.drawing {
            steps.push(StepKind::Drawing);
        }
    }

    steps.push(StepKind::Notify);
    steps.push(StepKind::Cleanup);
    steps
}

/// Assemble the task queue for one export run
pub fn build(
    origin: Origin,
    capabilities: Capabilities,
    steps: &dyn StepFactory,
) -> Result<TaskQueue> {
    let planned = plan(origin, capabilities);
    debug!(?origin, ?capabilities, ?planned, "planned export pipeline");

    let mut builder = TaskQueue::builder();
    for kind in planned {
        builder.push_boxed(kind.label().to_string(), steps.action(kind))?;
    }
    builder.build()
}
