//! Cleanup stage: place exported files and discard transient ones
//!
//! The stage first decides what happens to every entry (a [`CleanupPlan`]) and
//! then applies it. Attachments are always discarded. Export files are moved to
//! the destination when it is an absolute existing directory, otherwise they
//! are discarded too.

use crate::config::FileCollisionAction;
use crate::error::{CleanupError, Error, Result};
use crate::utils::{get_unique_path, is_destination_dir};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// What the cleanup stage did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Final paths of the files placed in the destination
    pub moved: Vec<PathBuf>,
    /// Number of transient entries deleted
    pub discarded: usize,
}

/// Planned cleanup actions, applied by [`CleanupPlan::apply`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// `(source, target)` pairs to move
    pub moves: Vec<(PathBuf, PathBuf)>,
    /// Entries to delete
    pub deletes: Vec<PathBuf>,
}

impl CleanupPlan {
    /// Plan the cleanup of one export run
    pub async fn new(export_dir: &Path, attachments_dir: &Path, destination: &Path) -> Result<Self> {
        let mut plan = CleanupPlan::default();

        plan.deletes.extend(list_entries(attachments_dir).await?);

        let exported = list_entries(export_dir).await?;
        if is_destination_dir(destination) {
            for source in exported {
                if let Some(name) = source.file_name() {
                    let target = destination.join(name);
                    plan.moves.push((source, target));
                }
            }
        } else {
            debug!(
                ?destination,
                "destination is not an absolute existing directory, discarding export files"
            );
            plan.deletes.extend(exported);
        }

        Ok(plan)
    }

    /// Apply the plan: deletions first, then moves
    ///
    /// Failed deletions are logged and tolerated. A failed move fails the stage.
    pub async fn apply(self, collision: FileCollisionAction) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for path in &self.deletes {
            if remove_entry(path).await {
                report.discarded += 1;
            }
        }

        for (source, target) in &self.moves {
            match move_entry(source, target, collision).await? {
                Some(placed) => report.moved.push(placed),
                None => {
                    if remove_entry(source).await {
                        report.discarded += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Execute the cleanup stage
pub async fn run_cleanup_stage(
    export_dir: &Path,
    attachments_dir: &Path,
    destination: &Path,
    collision: FileCollisionAction,
) -> Result<CleanupReport> {
    debug!(
        ?export_dir,
        ?attachments_dir,
        ?destination,
        ?collision,
        "running cleanup stage"
    );

    let plan = CleanupPlan::new(export_dir, attachments_dir, destination).await?;
    let report = plan.apply(collision).await?;

    info!(
        moved = report.moved.len(),
        discarded = report.discarded,
        "cleanup complete"
    );
    Ok(report)
}

/// Entries of `dir`, sorted; a missing directory has none
async fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?dir, "directory does not exist, nothing to clean");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

async fn remove_entry(path: &Path) -> bool {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            debug!(?path, "discarded transient file");
            true
        }
        Err(e) => {
            warn!(?path, error = %e, "failed to discard transient file");
            false
        }
    }
}

/// Move `source` to `target`; `None` when the collision action skipped it
async fn move_entry(
    source: &Path,
    target: &Path,
    collision: FileCollisionAction,
) -> Result<Option<PathBuf>> {
    let meta = fs::symlink_metadata(source).await?;
    if meta.is_dir() {
        move_directory_contents(source, target, collision).await?;
        fs::remove_dir(source).await?;
        return Ok(Some(target.to_path_buf()));
    }

    let final_target = match get_unique_path(target, collision) {
        Ok(path) => path,
        Err(Error::Cleanup(CleanupError::FileCollision { path, .. }))
            if collision == FileCollisionAction::Skip =>
        {
            warn!(?source, existing = ?path, "destination exists, skipping file");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    move_file(source, &final_target).await?;
    info!(?source, target = ?final_target, "moved export file");
    Ok(Some(final_target))
}

fn move_directory_contents<'a>(
    source_dir: &'a Path,
    target_dir: &'a Path,
    collision: FileCollisionAction,
) -> BoxFuture<'a, Result<()>> {
    async move {
        fs::create_dir_all(target_dir).await?;

        for source in list_entries(source_dir).await? {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = target_dir.join(name);
            if move_entry(&source, &target, collision).await?.is_none() {
                remove_entry(&source).await;
            }
        }
        Ok(())
    }
    .boxed()
}

/// Rename, falling back to copy and delete across filesystems
async fn move_file(source: &Path, target: &Path) -> Result<()> {
    if fs::rename(source, target).await.is_ok() {
        return Ok(());
    }

    debug!(?source, ?target, "rename failed, copying instead");
    fs::copy(source, target).await.map_err(|e| {
        Error::Cleanup(CleanupError::MoveFailed {
            source_path: source.to_path_buf(),
            dest_path: target.to_path_buf(),
            reason: e.to_string(),
        })
    })?;
    fs::remove_file(source).await?;
    Ok(())
}
