//! Concurrent directory traversal.
//!
//! A single driver thread walks the tree depth-first with the `ignore`
//! crate's `WalkBuilder` (its own gitignore/hidden filters disabled, since
//! filtering is done by the [`PatternMatcher`]) and hands regular files to a
//! fixed pool of worker threads that read and classify them.
//!
//! Dispatch goes through a zero-capacity channel, so the driver blocks while
//! every worker is busy and at most `workers` files are open at once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::FileClassifier;
use crate::filter::PatternMatcher;
use crate::record::FileRecord;

/// Default number of concurrent file reads.
pub const DEFAULT_WORKERS: usize = 10;

/// Default size ceiling above which files are not read.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Errors that abort a walk.
///
/// Problems with individual entries are logged and skipped instead.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start worker thread while scanning {path}: {source}")]
    WorkerSpawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker thread panicked while scanning {path}")]
    WorkerPanicked { path: PathBuf },
}

impl WalkError {
    fn from_root_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => WalkError::NotFound { path },
            io::ErrorKind::PermissionDenied => WalkError::PermissionDenied { path },
            _ => WalkError::Io { path, source },
        }
    }
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Files larger than this are emitted without being read.
    pub max_file_size: u64,
    /// Size of the worker pool.
    pub workers: usize,
    /// Keep raw bytes of non-text files.
    pub read_binary: bool,
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            workers: DEFAULT_WORKERS,
            read_binary: false,
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

impl WalkOptions {
    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the worker pool size (at least one).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the size ceiling.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

/// A regular file waiting for a worker.
#[derive(Debug)]
struct FileTask {
    path: PathBuf,
    relative: String,
}

/// Walks one root at a time with a bounded pool of readers.
#[derive(Debug)]
pub struct ConcurrentWalker {
    matcher: Arc<PatternMatcher>,
    classifier: FileClassifier,
    options: WalkOptions,
}

impl ConcurrentWalker {
    pub fn new(matcher: Arc<PatternMatcher>, classifier: FileClassifier, options: WalkOptions) -> Self {
        Self {
            matcher,
            classifier,
            options,
        }
    }

    /// Walk `root` and return its records in completion order.
    ///
    /// Fails only when the root itself cannot be read or the pool cannot be
    /// started. Returns after every dispatched file has been processed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use std::sync::Arc;
    /// use diffdeck::classify::FileClassifier;
    /// use diffdeck::filter::{PatternMatcher, PatternSet};
    /// use diffdeck::walker::{ConcurrentWalker, WalkOptions};
    ///
    /// let matcher = Arc::new(PatternMatcher::new(&PatternSet::default()));
    /// let walker = ConcurrentWalker::new(matcher, FileClassifier::new(), WalkOptions::default());
    /// for record in walker.walk(Path::new(".")).unwrap() {
    ///     println!("{}", record.path);
    /// }
    /// ```
    pub fn walk(&self, root: &Path) -> Result<Vec<FileRecord>, WalkError> {
        let metadata = fs::metadata(root).map_err(|e| WalkError::from_root_io(root, e))?;

        if !metadata.is_dir() {
            return Ok(self.walk_file_root(root));
        }

        let records = Mutex::new(Vec::new());
        let workers = self.options.workers.max(1);

        thread::scope(|scope| -> Result<(), WalkError> {
            let (sender, receiver) = bounded::<FileTask>(0);

            let mut handles = Vec::with_capacity(workers);
            for worker_idx in 0..workers {
                let tasks = receiver.clone();
                let records = &records;
                let handle = thread::Builder::new()
                    .name(format!("diffdeck-worker-{worker_idx}"))
                    .spawn_scoped(scope, move || self.run_worker(tasks, records))
                    .map_err(|source| WalkError::WorkerSpawn {
                        path: root.to_path_buf(),
                        source,
                    })?;
                handles.push(handle);
            }

            // Workers hold the only receivers now; they exit once the sender is gone.
            drop(receiver);

            self.dispatch(root, &sender, &records);
            drop(sender);

            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }
            if panicked {
                return Err(WalkError::WorkerPanicked {
                    path: root.to_path_buf(),
                });
            }
            Ok(())
        })?;

        let records = records.into_inner().unwrap_or_else(PoisonError::into_inner);
        info!(root = %root.display(), records = records.len(), "walk finished");
        Ok(records)
    }

    /// Drive the depth-first traversal, pruning ignored directories.
    fn dispatch(&self, root: &Path, sender: &Sender<FileTask>, records: &Mutex<Vec<FileRecord>>) {
        let mut builder = WalkBuilder::new(root);

        builder
            .standard_filters(false)
            .follow_links(self.options.follow_symlinks)
            .max_depth(self.options.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b));

        let matcher = Arc::clone(&self.matcher);
        let prune_root = root.to_path_buf();
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            match relative_path(&prune_root, entry.path()) {
                Some(relative) if matcher.should_ignore(&relative) => {
                    debug!(path = %relative, "ignored");
                    false
                }
                _ => true,
            }
        });

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let Some(relative) = relative_path(root, entry.path()) else {
                continue;
            };

            // Directories failing include are still descended
            if !self.matcher.should_include(&relative) {
                debug!(path = %relative, "not included");
                continue;
            }

            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                push_record(records, FileRecord::directory(relative));
            } else if file_type.is_file() {
                let task = FileTask {
                    path: entry.into_path(),
                    relative,
                };
                if sender.send(task).is_err() {
                    warn!(root = %root.display(), "worker pool stopped early");
                    break;
                }
            } else {
                debug!(path = %relative, "skipping special file");
            }
        }
    }

    fn run_worker(&self, tasks: Receiver<FileTask>, records: &Mutex<Vec<FileRecord>>) {
        for task in tasks.iter() {
            match self.read_file(&task.path, &task.relative) {
                Ok(record) => push_record(records, record),
                Err(err) => {
                    warn!(path = %task.relative, error = %err, "skipping unreadable file");
                }
            }
        }
    }

    /// Read and classify one file, honoring the size ceiling.
    fn read_file(&self, path: &Path, relative: &str) -> io::Result<FileRecord> {
        let size = fs::metadata(path)?.len();

        if size > self.options.max_file_size {
            debug!(path = %relative, size, "over size limit, not read");
            return Ok(FileRecord::unread(relative, size));
        }

        let bytes = fs::read(path)?;
        Ok(FileRecord::from_bytes(
            relative,
            bytes,
            &self.classifier,
            self.options.read_binary,
        ))
    }

    /// A root that is a plain file yields one record named after it.
    fn walk_file_root(&self, root: &Path) -> Vec<FileRecord> {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned());

        if !self.matcher.should_include(&name) {
            debug!(path = %name, "root file not included");
            return Vec::new();
        }

        match self.read_file(root, &name) {
            Ok(record) => vec![record],
            Err(err) => {
                warn!(path = %root.display(), error = %err, "skipping unreadable file");
                Vec::new()
            }
        }
    }
}

fn push_record(records: &Mutex<Vec<FileRecord>>, record: FileRecord) {
    records
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(record);
}

/// Slash-separated path of `path` relative to `root`; `None` for the root.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
