//! Credentials-file watcher with debounced reloads.
//!
//! Raw [`notify`] events for the watched file feed a dedicated worker thread
//! that runs a [`Debounce`] state machine: every event (re)arms a quiet-period
//! deadline, and the callback fires exactly once when the deadline passes
//! without further events.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by rename-and-replace keep triggering reloads, and so
//! that re-pointing a symlinked credentials file is seen.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{CoreError, CoreResult};

/// Messages from the notify callback (and [`ConfigWatcher::stop`]) to the worker.
#[derive(Debug)]
enum WatchMessage {
    /// The watched file changed.
    Changed,
    /// The notify backend reported an error.
    Error(String),
    Shutdown,
}

/// Debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    PendingReload { deadline: Instant },
}

/// Quiet-period debouncer driven by explicit timestamps.
#[derive(Debug)]
pub struct Debounce {
    quiet: Duration,
    state: DebounceState,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Records a change notification, pushing the deadline out to `now + quiet`.
    pub fn notify(&mut self, now: Instant) {
        self.state = DebounceState::PendingReload {
            deadline: now + self.quiet,
        };
    }

    /// Returns `true` exactly once per burst, when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::PendingReload { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }

    /// How long the worker may block before the next [`Debounce::poll`] is due.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::PendingReload { deadline } => {
                Some(deadline.saturating_duration_since(now))
            }
        }
    }
}

/// Owned watch on a single file.
///
/// Dropping the handle (or calling [`ConfigWatcher::stop`]) removes the
/// filesystem watch and joins the worker thread.
pub struct ConfigWatcher {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<WatchMessage>,
    worker: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Starts watching `path`, calling `on_change` once per debounced burst
    /// of modifications.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Watch`] if the path has no usable parent directory
    /// or the notify backend cannot be initialised, and [`CoreError::Io`] if
    /// the worker thread cannot be spawned.
    pub fn spawn<F>(path: &Path, quiet: Duration, mut on_change: F) -> CoreResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let WatchTargets { dirs, names } = WatchTargets::resolve(path)?;

        let (tx, rx) = mpsc::channel::<WatchMessage>();

        let notify_tx = tx.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => {
                        let relevant = !matches!(event.kind, EventKind::Access(_))
                            && event.paths.iter().any(|p| {
                                p.file_name()
                                    .is_some_and(|name| names.iter().any(|n| n == name))
                            });
                        if relevant {
                            let _ = notify_tx.send(WatchMessage::Changed);
                        }
                    }
                    Err(e) => {
                        let _ = notify_tx.send(WatchMessage::Error(e.to_string()));
                    }
                }
            })?;
        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        let path = path.to_path_buf();

        let worker = thread::Builder::new()
            .name("tollgate-config-watch".to_string())
            .spawn(move || {
                let mut debounce = Debounce::new(quiet);
                loop {
                    let received = match debounce.wait_time(Instant::now()) {
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                        Some(wait) => rx.recv_timeout(wait),
                    };
                    match received {
                        Ok(WatchMessage::Changed) => debounce.notify(Instant::now()),
                        Ok(WatchMessage::Error(e)) => tracing::warn!("Watch error: {e}"),
                        Ok(WatchMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    if debounce.poll(Instant::now()) {
                        on_change();
                    }
                }
                tracing::debug!("Config watch worker stopped");
            })?;

        tracing::info!(path = %path.display(), "Watching credentials file");

        Ok(Self {
            watcher: Some(watcher),
            tx,
            worker: Some(worker),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the filesystem watch and stops the worker. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the notify watcher unregisters the watch.
        if self.watcher.take().is_none() {
            return;
        }
        let _ = self.tx.send(WatchMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            // The worker may itself drop the last owner of this handle.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
        tracing::info!(path = %self.path.display(), "Stopped watching credentials file");
    }
}

/// Directories to watch, and the file names that count as a change within them.
struct WatchTargets {
    dirs: Vec<PathBuf>,
    names: Vec<OsString>,
}

impl WatchTargets {
    /// The path as given is always watched in its own parent, so a symlink
    /// replaced there is seen. When `path` is a symlink, the directory of the
    /// file it points to is watched too so in-place edits of the target are seen.
    fn resolve(path: &Path) -> CoreResult<Self> {
        let (dir, name) = split_file_path(path)?;
        let mut targets = Self {
            dirs: vec![dir],
            names: vec![name],
        };

        let is_symlink = std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            return Ok(targets);
        }
        if let Ok(resolved) = std::fs::canonicalize(path) {
            let (target_dir, target_name) = split_file_path(&resolved)?;
            let link_dir = std::fs::canonicalize(&targets.dirs[0])
                .unwrap_or_else(|_| targets.dirs[0].clone());
            if target_dir != link_dir {
                targets.dirs.push(target_dir);
            }
            if !targets.names.contains(&target_name) {
                targets.names.push(target_name);
            }
        }
        Ok(targets)
    }
}

/// Splits `path` into its parent directory (`.` for a bare name) and file name.
fn split_file_path(path: &Path) -> CoreResult<(PathBuf, OsString)> {
    let name = path
        .file_name()
        .ok_or_else(|| CoreError::Watch(format!("not a file path: {}", path.display())))?
        .to_os_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, name))
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
