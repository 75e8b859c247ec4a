//! Recording collaborators
//!
//! Every mock appends a line to a shared call log and writes a small file to
//! the requested path, so cleanup has real artifacts to move.

use async_trait::async_trait;
use quick_export::collaborators::{
    DocketGenerator, DocketInput, DrawingExporter, GeometryExporter, MailComposer,
};
use quick_export::mail::MailDraft;
use quick_export::{Collaborators, Error, Result, XlsxSpreadsheetWriter};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared, ordered log of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Record one call
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Whether a call starting with `prefix` was made
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

fn touch(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)?;
    Ok(())
}

/// Writes STEP and, for parts, STL
pub struct FakeGeometry(pub CallLog);

#[async_trait]
impl GeometryExporter for FakeGeometry {
    async fn export(&self, stp_path: &Path, stl_path: Option<&Path>) -> Result<()> {
        self.0.push(format!("geometry stl={}", stl_path.is_some()));
        touch(stp_path, "ISO-10303-21;")?;
        if let Some(stl) = stl_path {
            touch(stl, "solid part")?;
        }
        Ok(())
    }
}

/// Writes a docket, or fails when `fail` is set
pub struct FakeDocket {
    /// Call log
    pub log: CallLog,
    /// Fail every call
    pub fail: bool,
    /// Inputs received
    pub inputs: Arc<Mutex<Vec<DocketInput>>>,
}

#[async_trait]
impl DocketGenerator for FakeDocket {
    async fn generate(&self, path: &Path, input: &DocketInput) -> Result<()> {
        self.log.push("docket");
        self.inputs.lock().unwrap().push(input.clone());
        if self.fail {
            return Err(Error::External("docket template missing".to_string()));
        }
        touch(path, "%PDF-1.7")
    }
}

/// Writes PDF and DXF of the drawing
pub struct FakeDrawing(pub CallLog);

#[async_trait]
impl DrawingExporter for FakeDrawing {
    async fn export(&self, drawing: &Path, pdf_path: &Path, dxf_path: &Path) -> Result<()> {
        assert!(drawing.is_file(), "drawing {drawing:?} must exist");
        self.0.push("drawing");
        touch(pdf_path, "%PDF-1.7")?;
        touch(dxf_path, "0\nSECTION")
    }
}

/// Captures drafts; records whether the attachment existed when composing
pub struct FakeMail {
    /// Call log
    pub log: CallLog,
    /// Drafts received
    pub drafts: Arc<Mutex<Vec<MailDraft>>>,
}

#[async_trait]
impl MailComposer for FakeMail {
    async fn compose(&self, draft: &MailDraft) -> Result<()> {
        self.log.push(format!(
            "mail attachment_exists={}",
            draft.attachment.is_file()
        ));
        self.drafts.lock().unwrap().push(draft.clone());
        Ok(())
    }
}

/// A full set of fakes plus handles to inspect them
pub struct Fakes {
    /// Collaborators to hand to the export job
    pub collaborators: Collaborators,
    /// Call log shared by all fakes
    pub log: CallLog,
    /// Mail drafts
    pub drafts: Arc<Mutex<Vec<MailDraft>>>,
    /// Docket inputs
    pub dockets: Arc<Mutex<Vec<DocketInput>>>,
}

/// Fakes with the real xlsx writer; `fail_docket` makes the docket step fail
pub fn fakes(fail_docket: bool) -> Fakes {
    let log = CallLog::default();
    let drafts = Arc::new(Mutex::new(Vec::new()));
    let dockets = Arc::new(Mutex::new(Vec::new()));

    let collaborators = Collaborators {
        spreadsheet: Arc::new(XlsxSpreadsheetWriter),
        geometry: Arc::new(FakeGeometry(log.clone())),
        docket: Arc::new(FakeDocket {
            log: log.clone(),
            fail: fail_docket,
            inputs: dockets.clone(),
        }),
        drawing: Some(Arc::new(FakeDrawing(log.clone()))),
        mail: Some(Arc::new(FakeMail {
            log: log.clone(),
            drafts: drafts.clone(),
        })),
    };

    Fakes {
        collaborators,
        log,
        drafts,
        dockets,
    }
}
