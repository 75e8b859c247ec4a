use super::*;
use crate::collaborators::{
    DocketGenerator, DrawingExporter, GeometryExporter, MailComposer, SpreadsheetWriter,
};
use crate::config::PathsConfig;
use crate::document::StaticDocument;
use crate::types::{Origin, RunState};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Collaborator that accepts everything and writes nothing
struct Accept;

#[async_trait]
impl SpreadsheetWriter for Accept {
    async fn write(&self, _path: &Path, _data: &ExportData) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl GeometryExporter for Accept {
    async fn export(&self, _stp_path: &Path, _stl_path: Option<&Path>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DocketGenerator for Accept {
    async fn generate(&self, _path: &Path, _input: &DocketInput) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DrawingExporter for Accept {
    async fn export(&self, _drawing: &Path, _pdf_path: &Path, _dxf_path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Drawing exporter remembering which drawing files it was given
#[derive(Default)]
struct Drawings(Mutex<Vec<PathBuf>>);

#[async_trait]
impl DrawingExporter for Drawings {
    async fn export(&self, drawing: &Path, _pdf_path: &Path, _dxf_path: &Path) -> Result<()> {
        self.0.lock().unwrap().push(drawing.to_path_buf());
        Ok(())
    }
}

#[async_trait]
impl MailComposer for Accept {
    async fn compose(&self, _draft: &MailDraft) -> Result<()> {
        Ok(())
    }
}

fn collaborators(mail: bool, drawing: bool) -> Collaborators {
    let accept = Arc::new(Accept);
    Collaborators {
        spreadsheet: accept.clone(),
        geometry: accept.clone(),
        docket: accept.clone(),
        drawing: drawing.then(|| accept.clone() as Arc<dyn DrawingExporter>),
        mail: mail.then(|| accept.clone() as Arc<dyn MailComposer>),
    }
}

fn config(temp_dir: &Path) -> Arc<Config> {
    Arc::new(Config {
        paths: PathsConfig {
            temp_dir: temp_dir.to_path_buf(),
        },
        ..Default::default()
    })
}

fn document(origin: Origin) -> Arc<dyn DocumentContext> {
    Arc::new(
        StaticDocument::new("P-100", "C")
            .with_origin(origin)
            .with_property("project", "4711")
            .with_property("product", "Bracket")
            .with_property("machine", "M12"),
    )
}

fn request(project: ProjectSelection) -> ExportRequest {
    ExportRequest {
        project,
        condition: "New".to_string(),
        quantity: "2".to_string(),
        note: String::new(),
        receiver: String::new(),
        destination: std::env::temp_dir(),
    }
}

fn invalid_field(result: Result<()>) -> &'static str {
    match result.unwrap_err() {
        Error::InvalidRequest { field, .. } => field,
        other => panic!("expected an invalid request, got {other}"),
    }
}

#[test]
fn validate_requires_a_project() {
    let config = Config::default();
    let empty = request(ProjectSelection::Project("  ".to_string()));
    assert_eq!(invalid_field(empty.validate(&config)), "project");

    request(ProjectSelection::Keep).validate(&config).unwrap();
    request(ProjectSelection::Project("0815".to_string()))
        .validate(&config)
        .unwrap();
}

#[test]
fn validate_accepts_only_configured_conditions() {
    let mut config = Config::default();
    config.condition.modified.name = "Changed".to_string();

    let mut req = request(ProjectSelection::Keep);
    req.condition = "Bogus".to_string();
    assert_eq!(invalid_field(req.validate(&config)), "condition");

    req.condition = "Modified".to_string();
    assert_eq!(invalid_field(req.validate(&config)), "condition");

    req.condition = "Changed".to_string();
    req.validate(&config).unwrap();
    req.condition = "New".to_string();
    req.validate(&config).unwrap();
}

#[test]
fn validate_requires_a_positive_whole_quantity() {
    let config = Config::default();
    let mut req = request(ProjectSelection::Keep);
    for quantity in ["0", "-1", "abc", "2.5", ""] {
        req.quantity = quantity.to_string();
        assert_eq!(invalid_field(req.validate(&config)), "quantity", "{quantity:?}");
    }

    req.quantity = " 3 ".to_string();
    req.validate(&config).unwrap();
}

#[test]
fn validate_requires_receiver_or_destination() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::default();
    let mut req = request(ProjectSelection::Keep);

    req.receiver = String::new();
    req.destination = PathBuf::from("relative/nowhere");
    assert_eq!(invalid_field(req.validate(&config)), "receiver");

    req.destination = temp_dir.path().join("missing");
    assert_eq!(invalid_field(req.validate(&config)), "receiver");

    req.receiver = "buyer@example.com".to_string();
    req.validate(&config).unwrap();

    req.receiver = "not an address".to_string();
    req.destination = temp_dir.path().to_path_buf();
    req.validate(&config).unwrap();
}

#[test]
fn invalid_request_prepares_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let req = ExportRequest {
        quantity: "0".to_string(),
        condition: "Bogus".to_string(),
        receiver: String::new(),
        destination: PathBuf::from("relative/nowhere"),
        ..request(ProjectSelection::Keep)
    };

    let err = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Made),
        req,
        collaborators(true, true),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));
    assert!(!temp_dir.path().join("export").exists());
}

#[test]
fn keep_with_empty_document_project_fails() {
    let temp_dir = TempDir::new().unwrap();
    let doc: Arc<dyn DocumentContext> = Arc::new(
        StaticDocument::new("P-100", "C")
            .with_property("project", "")
            .with_property("product", "Bracket")
            .with_property("machine", "M12"),
    );

    let err = ExportJob::new(
        config(temp_dir.path()),
        doc,
        request(ProjectSelection::Keep),
        collaborators(true, true),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { field: "project", .. }));
}

#[test]
fn artifact_names_follow_the_document() {
    let temp_dir = TempDir::new().unwrap();
    let job = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Made),
        request(ProjectSelection::Project("0815".to_string())),
        collaborators(true, true),
    )
    .unwrap();

    assert_eq!(job.project(), "0815");
    let paths = job.paths();
    assert!(paths.export_dir.starts_with(temp_dir.path().join("export")));
    assert!(
        paths
            .attachments_dir
            .starts_with(temp_dir.path().join("attachments"))
    );
    assert_eq!(
        paths.export_dir.file_name(),
        paths.attachments_dir.file_name()
    );

    let file = |p: &PathBuf| p.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(file(&paths.xlsx), "0815 M12 P-100 RevC.xlsx");
    assert_eq!(file(&paths.docket), "0815 M12 P-100 RevC.pdf");
    assert_eq!(file(&paths.stp), "M12 P-100 RevC.stp");
    assert_eq!(file(&paths.stl), "M12 P-100 RevC.stl");
    assert_eq!(file(&paths.drawing_pdf), "M12 P-100 RevC.pdf");
    assert_eq!(file(&paths.dxf), "M12 P-100 RevC.dxf");
    assert!(paths.xlsx.starts_with(&paths.export_dir));
}

#[test]
fn keep_uses_the_document_project() {
    let temp_dir = TempDir::new().unwrap();
    let job = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Bought),
        request(ProjectSelection::Keep),
        collaborators(false, false),
    )
    .unwrap();
    assert_eq!(job.project(), "4711");
}

#[test]
fn missing_machine_property_fails_preparation() {
    let temp_dir = TempDir::new().unwrap();
    let doc: Arc<dyn DocumentContext> = Arc::new(
        StaticDocument::new("P-100", "C")
            .with_property("project", "4711")
            .with_property("product", "Bracket"),
    );

    let err = ExportJob::new(
        config(temp_dir.path()),
        doc,
        request(ProjectSelection::Keep),
        collaborators(false, false),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Property { ref name, .. } if name == "machine"));
}

#[test]
fn queue_depends_on_origin_and_capabilities() {
    let temp_dir = TempDir::new().unwrap();
    let made = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Made),
        request(ProjectSelection::Keep),
        collaborators(false, false),
    )
    .unwrap();
    assert_eq!(
        made.queue().unwrap().names(),
        vec![
            "Collect data",
            "Spreadsheet export",
            "STEP/STL export",
            "Docket export",
            "Sending mail",
            "Cleaning up",
        ]
    );

    let bought = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Bought),
        request(ProjectSelection::Keep),
        collaborators(true, true),
    )
    .unwrap();
    assert_eq!(bought.queue().unwrap().len(), 4);
}

#[tokio::test]
async fn spreadsheet_step_without_data_fails() {
    let temp_dir = TempDir::new().unwrap();
    let job = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Bought),
        request(ProjectSelection::Keep),
        collaborators(false, false),
    )
    .unwrap();

    let err = job.action(StepKind::Spreadsheet).run().await.unwrap_err();
    assert!(matches!(err, Error::MissingData(_)));
}

#[tokio::test]
async fn run_reports_follow_up_action() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Config {
        paths: PathsConfig {
            temp_dir: temp_dir.path().to_path_buf(),
        },
        ..Default::default()
    };
    settings.export.close_app_after = true;
    let settings = Arc::new(settings);

    let destination = temp_dir.path().join("out");
    std::fs::create_dir_all(&destination).unwrap();

    let job = ExportJob::new(
        settings.clone(),
        document(Origin::Bought),
        ExportRequest {
            destination,
            ..request(ProjectSelection::Keep)
        },
        collaborators(false, false),
    )
    .unwrap();
    let runner = Runner::from_config(&settings);

    let outcome = job.run(&runner, ProgressSink::new()).await.unwrap();

    assert_eq!(outcome.after, AfterExport::Close);
    assert_eq!(runner.state(), RunState::Completed { run: outcome.run });
    assert_eq!(job.data().unwrap().get("Project"), Some("4711"));
    assert!(job.cleanup_report().unwrap().moved.is_empty());
}

#[tokio::test]
async fn valid_receiver_without_mail_client_fails() {
    let temp_dir = TempDir::new().unwrap();
    let job = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Bought),
        ExportRequest {
            receiver: "buyer@example.com".to_string(),
            ..request(ProjectSelection::Keep)
        },
        collaborators(false, false),
    )
    .unwrap();

    job.action(StepKind::CollectData).run().await.unwrap();
    let err = job.action(StepKind::Notify).run().await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
    assert!(!job.paths().attachments_dir.exists());
}

#[tokio::test]
async fn invalid_receiver_skips_mail_without_client() {
    let temp_dir = TempDir::new().unwrap();
    let job = ExportJob::new(
        config(temp_dir.path()),
        document(Origin::Bought),
        request(ProjectSelection::Keep),
        collaborators(false, false),
    )
    .unwrap();

    job.action(StepKind::Notify).run().await.unwrap();
}

fn drawing_job(temp_dir: &Path, doc: StaticDocument) -> (ExportJob, Arc<Drawings>) {
    let drawings = Arc::new(Drawings::default());
    let mut collaborators = collaborators(false, false);
    collaborators.drawing = Some(drawings.clone() as Arc<dyn DrawingExporter>);
    let job = ExportJob::new(
        config(temp_dir),
        Arc::new(doc),
        request(ProjectSelection::Keep),
        collaborators,
    )
    .unwrap();
    (job, drawings)
}

fn made_document() -> StaticDocument {
    StaticDocument::new("P-100", "C")
        .with_origin(Origin::Made)
        .with_property("project", "4711")
        .with_property("product", "Bracket")
        .with_property("machine", "M12")
}

#[tokio::test]
async fn drawing_resolves_against_the_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("workspace");
    std::fs::create_dir_all(workspace.join("drawings")).unwrap();
    let file = workspace.join("drawings").join("P-100.CATDrawing");
    std::fs::write(&file, "drawing").unwrap();

    let doc = made_document()
        .with_workspace_folder(&workspace)
        .with_property("drawing_path", "./drawings/P-100.CATDrawing");
    let (job, drawings) = drawing_job(temp_dir.path(), doc);

    job.action(StepKind::Drawing).run().await.unwrap();
    assert_eq!(*drawings.0.lock().unwrap(), vec![file]);
}

#[tokio::test]
async fn drawing_without_valid_path_is_skipped() {
    let temp_dir = TempDir::new().unwrap();

    let (job, drawings) = drawing_job(temp_dir.path(), made_document());
    job.action(StepKind::Drawing).run().await.unwrap();
    assert!(drawings.0.lock().unwrap().is_empty());

    let missing = temp_dir.path().join("missing.CATDrawing");
    let doc = made_document().with_property("drawing_path", missing.to_string_lossy());
    let (job, drawings) = drawing_job(temp_dir.path(), doc);
    job.action(StepKind::Drawing).run().await.unwrap();
    assert!(drawings.0.lock().unwrap().is_empty());
}
