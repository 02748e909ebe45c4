//! Bounded-concurrency directory walker
//!
//! Every entry below the sync root becomes one task in a [`JoinSet`].
//! A directory task returns its children, which the walk loop schedules
//! into the same set, so the walk finishes exactly when the set drains.
//! A semaphore caps how many entries are being stat'ed or processed at once;
//! tasks beyond the cap wait for a permit instead of failing.
//!
//! Outcomes travel back through the join handles and are appended by the
//! walk loop alone, so the result accumulators need no locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::filter;
use crate::options::SyncOptions;
use crate::path::RelativeKey;
use crate::sink::{ErrorSink, Stage, SyncError};

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices
    Other,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "special file",
        };
        f.write_str(name)
    }
}

/// Result of a single stat call
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Unix permission bits
    pub mode: u32,
    pub len: u64,
    pub mtime: Option<Timestamp>,
    pub atime: Option<Timestamp>,
}

impl LocalEntry {
    /// Stat `path`, following symlinks only when `dereference` is set
    pub async fn stat(path: &Path, dereference: bool) -> std::io::Result<Self> {
        let metadata = if dereference {
            tokio::fs::metadata(path).await?
        } else {
            tokio::fs::symlink_metadata(path).await?
        };

        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            mode: mode_bits(&metadata),
            len: metadata.len(),
            mtime: metadata.modified().ok().and_then(|t| Timestamp::try_from(t).ok()),
            atime: metadata.accessed().ok().and_then(|t| Timestamp::try_from(t).ok()),
        })
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// What happened to a regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Uploaded; `bytes` is the body size
    Changed { key: RelativeKey, bytes: u64 },
    /// Remote copy already identical
    Skipped(RelativeKey),
}

/// Receives every regular file the walker finds
#[async_trait]
pub trait FileHandler: Send + Sync {
    async fn handle_file(&self, entry: &LocalEntry, key: RelativeKey) -> Result<FileOutcome>;
}

/// Entry counts for one walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub directories: usize,
    pub files: usize,
    pub unsupported: usize,
    pub filtered: usize,
}

/// Keys produced by one walk
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Keys uploaded during this run
    pub changed: Vec<RelativeKey>,
    /// Keys whose remote copy was already up to date
    pub skipped: Vec<RelativeKey>,
    /// Entries that exist locally but could not be processed
    pub failed: Vec<RelativeKey>,
    /// The sync root itself could not be read
    pub root_failed: bool,
    pub uploaded_bytes: u64,
    pub stats: WalkStats,
}

impl SyncResult {
    /// Every key known to exist locally
    pub fn present_keys(&self) -> impl Iterator<Item = &RelativeKey> {
        self.changed.iter().chain(self.skipped.iter())
    }
}

/// Everything a walk produced
#[derive(Debug)]
pub struct WalkOutput {
    pub result: SyncResult,
    pub errors: ErrorSink,
    /// Set when `stop_on_error` cut the walk short
    pub aborted: bool,
}

/// A directory child and whether it leads to a directory
struct Child {
    path: PathBuf,
    is_dir: bool,
}

enum EntryOutcome {
    Directory(Vec<Child>),
    File(FileOutcome),
    Unsupported(EntryKind),
}

struct EntryFailure {
    stage: Stage,
    error: Error,
}

impl From<Error> for EntryFailure {
    fn from(error: Error) -> Self {
        Self {
            stage: Stage::Walk,
            error,
        }
    }
}

impl From<std::io::Error> for EntryFailure {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error).into()
    }
}

struct WalkContext<H> {
    root: PathBuf,
    options: Arc<SyncOptions>,
    handler: Arc<H>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

type TaskOutput = (PathBuf, std::result::Result<EntryOutcome, EntryFailure>);

/// Walks a source directory and dispatches files to a [`FileHandler`]
pub struct Walker<H> {
    context: Arc<WalkContext<H>>,
}

impl<H: FileHandler + 'static> Walker<H> {
    pub fn new(options: Arc<SyncOptions>, handler: Arc<H>, cancel: CancellationToken) -> Self {
        let root = std::path::absolute(&options.source_dir)
            .unwrap_or_else(|_| options.source_dir.clone());
        let semaphore = Arc::new(Semaphore::new(options.concurrency_limit));
        Self {
            context: Arc::new(WalkContext {
                root,
                options,
                handler,
                semaphore,
                cancel,
            }),
        }
    }

    /// Walk the whole tree, collecting errors into `errors`
    pub async fn run(&self, mut errors: ErrorSink) -> WalkOutput {
        let mut result = SyncResult::default();
        let mut aborted = false;
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

        tracing::debug!(root = %self.context.root.display(), "Starting walk");
        self.spawn(&mut tasks, self.context.root.clone());

        while let Some(joined) = tasks.join_next().await {
            let (path, outcome) = match joined {
                Ok(output) => output,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => {
                    errors.push(SyncError::new(
                        Stage::Walk,
                        self.context.root.display().to_string(),
                        Error::General(format!("walker task failed: {e}")),
                    ));
                    continue;
                }
            };

            match outcome {
                Ok(EntryOutcome::Directory(children)) => {
                    result.stats.directories += 1;
                    if aborted {
                        continue;
                    }
                    for child in children {
                        let filter = self.context.options.filter.as_ref();
                        if filter::included(filter, &child.path, child.is_dir) {
                            self.spawn(&mut tasks, child.path);
                        } else {
                            tracing::trace!(path = %child.path.display(), "Filtered out");
                            result.stats.filtered += 1;
                        }
                    }
                }
                Ok(EntryOutcome::File(file)) => {
                    result.stats.files += 1;
                    match file {
                        FileOutcome::Changed { key, bytes } => {
                            result.uploaded_bytes += bytes;
                            result.changed.push(key);
                        }
                        FileOutcome::Skipped(key) => result.skipped.push(key),
                    }
                }
                Ok(EntryOutcome::Unsupported(kind)) => {
                    result.stats.unsupported += 1;
                    tracing::warn!("{kind} not supported, skipping: {}", path.display());
                }
                Err(failure) => {
                    if matches!(failure.error, Error::Cancelled) {
                        continue;
                    }

                    // A path with no key cannot collide with any uploaded object
                    if path == self.context.root {
                        result.root_failed = true;
                    } else if let Ok(key) = RelativeKey::from_root(&self.context.root, &path) {
                        result.failed.push(key);
                    }
                    errors.push(SyncError::new(
                        failure.stage,
                        path.display().to_string(),
                        failure.error,
                    ));

                    if self.context.options.stop_on_error && !aborted {
                        tracing::warn!("Stopping on first error");
                        aborted = true;
                        self.context.cancel.cancel();
                        tasks.abort_all();
                    }
                }
            }
        }

        tracing::debug!(
            changed = result.changed.len(),
            skipped = result.skipped.len(),
            "Walk finished"
        );

        WalkOutput {
            result,
            errors,
            aborted,
        }
    }

    fn spawn(&self, tasks: &mut JoinSet<TaskOutput>, path: PathBuf) {
        let context = Arc::clone(&self.context);
        tasks.spawn(async move {
            let outcome = process_entry(&context, &path).await;
            (path, outcome)
        });
    }
}

async fn process_entry<H: FileHandler>(
    context: &WalkContext<H>,
    path: &Path,
) -> std::result::Result<EntryOutcome, EntryFailure> {
    let _permit = Arc::clone(&context.semaphore)
        .acquire_owned()
        .await
        .map_err(|_| Error::Cancelled)?;
    context.cancel.check()?;

    // The root is always followed so a symlinked source directory still syncs
    let dereference = context.options.dereference_symlinks || path == context.root;
    let entry = LocalEntry::stat(path, dereference).await?;

    match entry.kind {
        EntryKind::Directory => {
            let mut children = Vec::new();
            let mut dir = tokio::fs::read_dir(path).await?;
            while let Some(child) = dir.next_entry().await? {
                let is_dir = match child.file_type().await {
                    Ok(t) if t.is_symlink() && context.options.dereference_symlinks => {
                        tokio::fs::metadata(child.path()).await.is_ok_and(|m| m.is_dir())
                    }
                    Ok(t) => t.is_dir(),
                    Err(_) => false,
                };
                children.push(Child {
                    path: child.path(),
                    is_dir,
                });
            }
            Ok(EntryOutcome::Directory(children))
        }
        EntryKind::File => {
            let key = RelativeKey::from_root(&context.root, path)?;
            context.cancel.check()?;
            tracing::debug!(key = %key, "Analysing");
            let outcome = context
                .handler
                .handle_file(&entry, key)
                .await
                .map_err(|error| EntryFailure {
                    stage: Stage::Upload,
                    error,
                })?;
            Ok(EntryOutcome::File(outcome))
        }
        kind => Ok(EntryOutcome::Unsupported(kind)),
    }
}
