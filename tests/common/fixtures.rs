//! Documents, configurations and requests used across the integration tests

use quick_export::config::PathsConfig;
use quick_export::{
    Config, DocumentContext, Event, ExportRequest, Origin, ProjectSelection, StaticDocument,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Configuration keeping all transient folders below `temp_dir`
pub fn test_config(temp_dir: &Path) -> Arc<Config> {
    Arc::new(Config {
        paths: PathsConfig {
            temp_dir: temp_dir.to_path_buf(),
        },
        ..Default::default()
    })
}

/// A purchased part with every property the default header items read
pub fn purchased_part() -> Arc<dyn DocumentContext> {
    Arc::new(
        StaticDocument::new("N-912", "A")
            .with_origin(Origin::Bought)
            .with_description("Hex socket screw M6x20")
            .with_property("project", "4711")
            .with_property("product", "Screw")
            .with_property("machine", "M12")
            .with_property("manufacturer", "Acme")
            .with_property("creator", "jdoe"),
    )
}

/// A self-made part whose drawing lies in `workspace`
pub fn self_made_part(workspace: &Path) -> Arc<dyn DocumentContext> {
    Arc::new(self_made_document(workspace))
}

/// A self-made assembly (no STL export) whose drawing lies in `workspace`
pub fn self_made_assembly(workspace: &Path) -> Arc<dyn DocumentContext> {
    Arc::new(self_made_document(workspace).assembly())
}

fn self_made_document(workspace: &Path) -> StaticDocument {
    std::fs::create_dir_all(workspace).unwrap();
    std::fs::write(workspace.join("P-100.CATDrawing"), "drawing").unwrap();

    StaticDocument::new("P-100", "C")
        .with_origin(Origin::Made)
        .with_definition("Bracket left")
        .with_workspace_folder(workspace)
        .with_property("project", "4711")
        .with_property("product", "Bracket")
        .with_property("machine", "M12")
        .with_property("material", "S235")
        .with_property("drawing_path", ".\\P-100.CATDrawing")
}

/// Request keeping the document's project, sending mail to `receiver`
pub fn request(receiver: &str, destination: impl Into<PathBuf>) -> ExportRequest {
    ExportRequest {
        project: ProjectSelection::Keep,
        condition: "New".to_string(),
        quantity: "4".to_string(),
        note: "Please order by Friday".to_string(),
        receiver: receiver.to_string(),
        destination: destination.into(),
    }
}

/// Drain all buffered events
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Progress values among `events`
pub fn progress_values(events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// Sorted file names in `dir` (empty when it does not exist)
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
