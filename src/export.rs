//! Export job: one user-triggered export of the open document
//!
//! An [`ExportJob`] resolves everything that is fixed for the run up front
//! (project, artifact names, transient folders) and then hands the pipeline to
//! a [`Runner`]. Each planned step becomes a task that reads the shared job
//! state; only the collect step writes to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

use crate::cleanup::{CleanupReport, run_cleanup_stage};
use crate::collaborators::{Collaborators, DocketInput};
use crate::collect::{ExportData, ProjectSelection, Selection, collect_data, export_name, resolve_project};
use crate::config::Config;
use crate::document::DocumentContext;
use crate::error::{Error, Result};
use crate::mail::{MailDraft, create_attachment, is_valid_address, subject};
use crate::pipeline::{self, StepFactory, StepKind};
use crate::runner::{ProgressSink, Runner};
use crate::task::{TaskAction, TaskQueue};
use crate::types::RunId;
use crate::utils::{is_destination_dir, resolve_drawing_path};

/// The user's export parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Project choice
    pub project: ProjectSelection,
    /// Condition, e.g. "New" or "Modified"
    pub condition: String,
    /// Quantity as entered
    pub quantity: String,
    /// Note for the notification mail
    pub note: String,
    /// Receiver of the notification mail; invalid addresses skip the mail,
    /// a valid one needs a mail client
    pub receiver: String,
    /// Folder the artifacts are moved to; anything but an absolute existing
    /// directory discards them
    pub destination: PathBuf,
}

impl ExportRequest {
    /// Check the form before an export is prepared
    ///
    /// Requires a project, one of the configured conditions and a whole
    /// quantity above zero. The export must also reach someone: either the
    /// receiver is a valid address or the destination is an absolute existing
    /// directory.
    pub fn validate(&self, config: &Config) -> Result<()> {
        if let ProjectSelection::Project(project) = &self.project
            && project.trim().is_empty()
        {
            return Err(invalid("project", "no project selected"));
        }

        let conditions = &config.condition;
        if self.condition != conditions.new && self.condition != conditions.modified.name {
            return Err(invalid(
                "condition",
                format!(
                    "{:?} is neither {:?} nor {:?}",
                    self.condition, conditions.new, conditions.modified.name
                ),
            ));
        }

        match self.quantity.trim().parse::<i64>() {
            Ok(quantity) if quantity > 0 => {}
            Ok(_) => return Err(invalid("quantity", "must be greater than zero")),
            Err(_) => {
                return Err(invalid(
                    "quantity",
                    format!("{:?} is not a whole number", self.quantity),
                ));
            }
        }

        if !is_valid_address(&self.receiver) && !is_destination_dir(&self.destination) {
            return Err(invalid(
                "receiver",
                "neither a valid mail address nor an existing absolute destination folder",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidRequest {
        field,
        reason: reason.into(),
    }
}

/// Where one export writes its files
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Transient export folder
    pub export_dir: PathBuf,
    /// Transient attachments folder
    pub attachments_dir: PathBuf,
    /// Data spreadsheet
    pub xlsx: PathBuf,
    /// Docket document
    pub docket: PathBuf,
    /// STEP geometry
    pub stp: PathBuf,
    /// STL geometry (parts only)
    pub stl: PathBuf,
    /// Drawing as PDF
    pub drawing_pdf: PathBuf,
    /// Drawing as DXF
    pub dxf: PathBuf,
}

impl ArtifactPaths {
    /// Paths for an export named `name` (`name_with_project` for the files
    /// carrying the project) below the given transient folders
    pub fn new(
        export_dir: PathBuf,
        attachments_dir: PathBuf,
        name: &str,
        name_with_project: &str,
    ) -> Self {
        let file = |name: &str, ext: &str| export_dir.join(format!("{}.{}", name, ext));
        Self {
            xlsx: file(name_with_project, "xlsx"),
            docket: file(name_with_project, "pdf"),
            stp: file(name, "stp"),
            stl: file(name, "stl"),
            drawing_pdf: file(name, "pdf"),
            dxf: file(name, "dxf"),
            export_dir,
            attachments_dir,
        }
    }
}

/// What the host should do once an export completed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterExport {
    /// Close the application
    Close,
    /// Re-enable the export form for another export
    ReenableForm,
}

/// Result of a completed export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutcome {
    /// The run that performed the export
    pub run: RunId,
    /// Follow-up action for the host
    pub after: AfterExport,
}

/// One export of one document
#[derive(Clone)]
pub struct ExportJob {
    inner: Arc<JobInner>,
}

struct JobInner {
    config: Arc<Config>,
    document: Arc<dyn DocumentContext>,
    request: ExportRequest,
    collaborators: Collaborators,
    project: String,
    product: String,
    paths: ArtifactPaths,
    data: OnceLock<ExportData>,
    cleanup: OnceLock<CleanupReport>,
}

impl ExportJob {
    /// Prepare an export
    ///
    /// Fails when the request does not pass [`ExportRequest::validate`] or
    /// when the project, product or machine property required for the
    /// artifact names cannot be read.
    pub fn new(
        config: Arc<Config>,
        document: Arc<dyn DocumentContext>,
        request: ExportRequest,
        collaborators: Collaborators,
    ) -> Result<Self> {
        request.validate(&config)?;

        let props = &config.properties;
        let project = resolve_project(&request.project, document.as_ref(), props)?;
        if project.trim().is_empty() {
            return Err(invalid("project", "the document has an empty project"));
        }
        let product = document
            .property(&props.product)
            .into_result(&props.product)?;
        let name = export_name(document.as_ref(), props, None)?;
        let name_with_project = export_name(document.as_ref(), props, Some(&project))?;

        let stamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S").to_string();
        let paths = ArtifactPaths::new(
            config.export_root().join(&stamp),
            config.attachments_root().join(&stamp),
            &name,
            &name_with_project,
        );
        debug!(%project, %name, ?paths, "prepared export job");

        Ok(Self {
            inner: Arc::new(JobInner {
                config,
                document,
                request,
                collaborators,
                project,
                product,
                paths,
                data: OnceLock::new(),
                cleanup: OnceLock::new(),
            }),
        })
    }

    /// Resolved project number
    pub fn project(&self) -> &str {
        &self.inner.project
    }

    /// Artifact locations
    pub fn paths(&self) -> &ArtifactPaths {
        &self.inner.paths
    }

    /// Export data, once the collect step has run
    pub fn data(&self) -> Option<&ExportData> {
        self.inner.data.get()
    }

    /// Cleanup result, once the cleanup step has run
    pub fn cleanup_report(&self) -> Option<&CleanupReport> {
        self.inner.cleanup.get()
    }

    /// The task queue for this document
    pub fn queue(&self) -> Result<TaskQueue> {
        pipeline::build(
            self.inner.document.origin(),
            self.inner.collaborators.capabilities(),
            self,
        )
    }

    /// Run the export on `runner` and wait for it
    pub async fn run(&self, runner: &Runner, progress: ProgressSink) -> Result<ExportOutcome> {
        let queue = self.queue()?;
        let project = self.inner.project.clone();
        let handle = runner.start_in(&self.inner.paths.export_dir, queue, progress, move || {
            info!(%project, "export completed successfully");
        })?;
        let run = handle.id();
        handle.wait().await?;

        let after = if self.inner.config.export.close_app_after {
            AfterExport::Close
        } else {
            AfterExport::ReenableForm
        };
        Ok(ExportOutcome { run, after })
    }
}

impl StepFactory for ExportJob {
    fn action(&self, kind: StepKind) -> Box<dyn TaskAction> {
        Box::new(Step {
            kind,
            job: self.inner.clone(),
        })
    }
}

struct Step {
    kind: StepKind,
    job: Arc<JobInner>,
}

#[async_trait]
impl TaskAction for Step {
    async fn run(&self) -> Result<()> {
        let job = &self.job;
        match self.kind {
            StepKind::CollectData => job.collect(),
            StepKind::Spreadsheet => {
                let data = job.data()?;
                job.collaborators
                    .spreadsheet
                    .write(&job.paths.xlsx, data)
                    .await
            }
            StepKind::Geometry => {
                let stl = job.document.is_part().then_some(job.paths.stl.as_path());
                job.collaborators
                    .geometry
                    .export(&job.paths.stp, stl)
                    .await
            }
            StepKind::Docket => {
                let input = job.docket_input();
                job.collaborators
                    .docket
                    .generate(&job.paths.docket, &input)
                    .await
            }
            StepKind::Drawing => {
                let Some(drawing) = &job.collaborators.drawing else {
                    debug!("no drawing exporter, skipping drawing");
                    return Ok(());
                };
                match job.drawing_file()? {
                    Some(file) => {
                        drawing
                            .export(&file, &job.paths.drawing_pdf, &job.paths.dxf)
                            .await
                    }
                    None => Ok(()),
                }
            }
            StepKind::Notify => job.notify().await,
            StepKind::Cleanup => {
                let report = run_cleanup_stage(
                    &job.paths.export_dir,
                    &job.paths.attachments_dir,
                    &job.request.destination,
                    job.config.export.file_collision,
                )
                .await?;
                job.cleanup.set(report).ok();
                Ok(())
            }
        }
    }
}

impl JobInner {
    fn collect(&self) -> Result<()> {
        let selection = Selection {
            project: &self.project,
            condition: &self.request.condition,
            quantity: &self.request.quantity,
        };
        let data = collect_data(self.document.as_ref(), &self.config, &selection)?;
        debug!(columns = data.items.len(), "collected export data");
        self.data
            .set(data)
            .map_err(|_| Error::External("export data collected twice".to_string()))
    }

    fn data(&self) -> Result<&ExportData> {
        self.data
            .get()
            .ok_or_else(|| Error::MissingData("export data has not been collected".to_string()))
    }

    fn docket_input(&self) -> DocketInput {
        DocketInput {
            project: self.project.clone(),
            product: self.product.clone(),
            part_number: self.document.part_number(),
            revision: self.document.revision(),
            condition: self.request.condition.clone(),
            quantity: self.request.quantity.clone(),
        }
    }

    /// The linked drawing, or `None` when there is nothing to export
    fn drawing_file(&self) -> Result<Option<PathBuf>> {
        let name = &self.config.properties.drawing_path;
        let Some(value) = self.document.property(name).into_option(name)? else {
            info!(part_number = %self.document.part_number(), "drawing path not set, skipping drawing");
            return Ok(None);
        };
        let file = resolve_drawing_path(&value, self.document.workspace_folder());
        if !file.is_file() {
            error!(?file, "drawing path is not valid, skipping drawing");
            return Ok(None);
        }
        Ok(Some(file))
    }

    async fn notify(&self) -> Result<()> {
        let receiver = self.request.receiver.trim();
        if !is_valid_address(receiver) {
            info!(%receiver, "no valid receiver, skipping notification");
            return Ok(());
        }
        let Some(composer) = &self.collaborators.mail else {
            return Err(Error::NotSupported(
                "no mail client available on this machine".to_string(),
            ));
        };

        let attachment = create_attachment(
            &self.paths.export_dir,
            &self.paths.attachments_dir,
            &self.project,
        )
        .await?;
        let draft = MailDraft {
            to: receiver.to_string(),
            subject: subject(&self.project, &self.config.mail.subject),
            project: self.project.clone(),
            condition: self.request.condition.clone(),
            note: self.request.note.clone(),
            data: self.data()?.clone(),
            attachment,
        };
        composer.compose(&draft).await
    }
}

impl std::fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("project", &self.inner.project)
            .field("paths", &self.inner.paths)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
