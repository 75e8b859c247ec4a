//! Export step collaborators
//!
//! Each export step delegates the actual file production to a collaborator:
//! the CAD host for geometry, dockets and drawings, a mail client for the
//! notification, and a spreadsheet writer for the data sheet. Collaborators
//! either complete or return an error; they never see the runner.

use async_trait::async_trait;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::collect::ExportData;
use crate::error::{Error, Result};
use crate::mail::MailDraft;
use crate::pipeline::Capabilities;

/// Maximum length of a worksheet name
const MAX_SHEET_NAME_LEN: usize = 31;

/// Writes the data spreadsheet
#[async_trait]
pub trait SpreadsheetWriter: Send + Sync {
    /// Write `data` as a header row and a value row to `path`
    async fn write(&self, path: &Path, data: &ExportData) -> Result<()>;
}

/// Exports 3D geometry from the CAD host
#[async_trait]
pub trait GeometryExporter: Send + Sync {
    /// Export STEP to `stp_path`, and STL to `stl_path` when given (parts only)
    async fn export(&self, stp_path: &Path, stl_path: Option<&Path>) -> Result<()>;
}

/// Values printed on the docket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketInput {
    /// Resolved project number
    pub project: String,
    /// Product name
    pub product: String,
    /// Part number
    pub part_number: String,
    /// Revision
    pub revision: String,
    /// Selected condition
    pub condition: String,
    /// Quantity as entered
    pub quantity: String,
}

/// Generates the docket document
#[async_trait]
pub trait DocketGenerator: Send + Sync {
    /// Render the docket to `path`
    async fn generate(&self, path: &Path, input: &DocketInput) -> Result<()>;
}

/// Exports the document's linked 2D drawing
#[async_trait]
pub trait DrawingExporter: Send + Sync {
    /// Export the drawing file `drawing` as PDF and DXF
    async fn export(&self, drawing: &Path, pdf_path: &Path, dxf_path: &Path) -> Result<()>;
}

/// Hands a prepared mail to the user's mail client
#[async_trait]
pub trait MailComposer: Send + Sync {
    /// Compose (display or send) the mail
    async fn compose(&self, draft: &MailDraft) -> Result<()>;
}

/// The set of collaborators one export uses
#[derive(Clone)]
pub struct Collaborators {
    /// Spreadsheet writer
    pub spreadsheet: Arc<dyn SpreadsheetWriter>,
    /// Geometry exporter
    pub geometry: Arc<dyn GeometryExporter>,
    /// Docket generator
    pub docket: Arc<dyn DocketGenerator>,
    /// Drawing exporter, if the host supports drawings
    pub drawing: Option<Arc<dyn DrawingExporter>>,
    /// Mail client, if one is available
    pub mail: Option<Arc<dyn MailComposer>>,
}

impl Collaborators {
    /// Which optional collaborators are present
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            mail: self.mail.is_some(),
            drawing: self.drawing.is_some(),
        }
    }
}

/// Spreadsheet writer producing an `.xlsx` workbook
///
/// One worksheet named after the file stem: bold headers in the first row,
/// values in the second.
#[derive(Clone, Copy, Debug, Default)]
pub struct XlsxSpreadsheetWriter;

#[async_trait]
impl SpreadsheetWriter for XlsxSpreadsheetWriter {
    async fn write(&self, path: &Path, data: &ExportData) -> Result<()> {
        let path = path.to_path_buf();
        let data = data.clone();

        tokio::task::spawn_blocking(move || write_workbook(&path, &data))
            .await
            .map_err(|e| Error::External(format!("spreadsheet writer panicked: {}", e)))?
    }
}

fn write_workbook(path: &Path, data: &ExportData) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(path))?;

        for (col, datum) in data.items.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| {
                Error::External(format!("too many spreadsheet columns: {}", data.items.len()))
            })?;
            sheet.write_string_with_format(0, col, &datum.name, &header_format)?;
            sheet.write_string(1, col, &datum.value)?;
        }
    }

    workbook.save(path)?;
    info!(?path, columns = data.items.len(), "saved spreadsheet");
    Ok(())
}

/// Worksheet name derived from the file stem, restricted to what workbooks accept
fn sheet_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Export");
    let name: String = stem
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let name = name.trim_matches('\'').trim();
    if name.is_empty() {
        debug!(?path, "file stem unusable as sheet name");
        "Export".to_string()
    } else {
        name.to_string()
    }
}
