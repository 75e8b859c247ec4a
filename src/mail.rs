//! Notification mail preparation
//!
//! Validates the receiver, zips the export folder into the attachments folder
//! and describes the mail as a [`MailDraft`] for the mail client.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::collect::ExportData;
use crate::error::{Error, Result};

// The pattern is a constant, so building it cannot fail at runtime
#[allow(clippy::expect_used)]
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid address pattern")
});

/// A mail ready to be handed to the mail client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailDraft {
    /// Receiver address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Resolved project number
    pub project: String,
    /// Selected condition
    pub condition: String,
    /// Free-text note from the user
    pub note: String,
    /// Export data for the mail body
    pub data: ExportData,
    /// Zip archive of all exported files
    pub attachment: PathBuf,
}

/// Whether `address` looks like a deliverable mail address
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address.trim())
}

/// Mail subject: `"{project} | {subject}"`
pub fn subject(project: &str, subject: &str) -> String {
    format!("{} | {}", project, subject)
}

/// Zip every file below `source_dir` into `attachments_dir/{project}_{timestamp}.zip`
pub async fn create_attachment(
    source_dir: &Path,
    attachments_dir: &Path,
    project: &str,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(attachments_dir).await?;

    let file_name = format!(
        "{}_{}.zip",
        project,
        chrono::Local::now().format("%Y_%m_%d_%H_%M_%S")
    );
    let archive = attachments_dir.join(file_name);
    let source = source_dir.to_path_buf();
    let target = archive.clone();

    let entries = tokio::task::spawn_blocking(move || zip_directory(&source, &target))
        .await
        .map_err(|e| Error::External(format!("archiver panicked: {}", e)))??;

    info!(?archive, entries, "created mail attachment");
    Ok(archive)
}

/// Write all files below `source_dir` into a new zip at `archive`; returns the entry count
fn zip_directory(source_dir: &Path, archive: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(source_dir, &mut files)?;
    files.sort();

    let mut zip = zip::ZipWriter::new(File::create(archive)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let relative = path.strip_prefix(source_dir).map_err(|_| {
            Error::External(format!("{} is outside {}", path.display(), source_dir.display()))
        })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!(entry = %name, "adding to attachment");
        zip.start_file(name, options)?;
        let mut input = File::open(path)?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    Ok(files.len())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}
