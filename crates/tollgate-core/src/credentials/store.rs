//! Tenant credential store with live reload.
//!
//! The current [`CredentialMap`] sits behind an [`ArcSwap`]. A reload parses
//! the whole file into a fresh map and publishes it with a single pointer
//! swap, so a concurrent [`CredentialStore::validate`] sees either the old
//! or the new map in full and never blocks on the parse.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwap;

use super::parse::{parse_credentials, CredentialMap};
use super::secret::EntryCheck;
use crate::config::WatchSettings;
use crate::error::{CoreError, CoreResult};
use crate::tenant::TenantId;
use crate::watcher::ConfigWatcher;

/// Resolves `(tenant, secret)` pairs against the configured credentials.
pub struct CredentialStore {
    source: Option<PathBuf>,
    current: ArcSwap<CredentialMap>,
    /// Serialises reloads so two parses never race to publish.
    reload_lock: Mutex<()>,
    generation: AtomicU64,
    last_error: Mutex<Option<String>>,
    watcher: Mutex<Option<ConfigWatcher>>,
}

impl CredentialStore {
    /// Opens the credentials file at `path` and, if `watch.enabled`, starts
    /// reloading it whenever it changes.
    ///
    /// # Errors
    ///
    /// Fails if the initial load fails (missing file, unreadable file, parse
    /// error) or the watch cannot be established.
    pub fn open(path: impl Into<PathBuf>, watch: &WatchSettings) -> CoreResult<Arc<Self>> {
        let path = path.into();
        let loaded = read_source(&path)?;
        let map = parse_credentials(&loaded)?;
        let store = Arc::new(Self::with_map(Some(path.clone()), map));
        store.record_success(&store.current.load());

        if watch.enabled {
            let weak: Weak<Self> = Arc::downgrade(&store);
            let watcher = ConfigWatcher::spawn(&path, watch.debounce(), move || {
                if let Some(store) = weak.upgrade() {
                    // Failures are logged and kept in `last_reload_error`.
                    let _ = store.reload();
                }
            })?;
            *store.watcher.lock().unwrap_or_else(|e| e.into_inner()) = Some(watcher);

            // Edits that landed before the watch was registered raised no event.
            let _ = store.reload_if_changed(&loaded);
        }

        Ok(store)
    }

    /// Builds a store over an in-process map. [`CredentialStore::reload`] is a no-op.
    pub fn in_memory(map: CredentialMap) -> Self {
        let store = Self::with_map(None, map);
        store.record_success(&store.current.load());
        store
    }

    /// Parses `text` in the credentials-file format into an in-process store.
    pub fn from_text(text: &str) -> CoreResult<Self> {
        parse_credentials(text).map(Self::in_memory)
    }

    fn with_map(source: Option<PathBuf>, map: CredentialMap) -> Self {
        Self {
            source,
            current: ArcSwap::from_pointee(map),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_error: Mutex::new(None),
            watcher: Mutex::new(None),
        }
    }

    /// Returns `Ok(true)` if `secret` matches any entry configured for `tenant`.
    ///
    /// Unknown tenants and wrong secrets both yield `Ok(false)`. Every entry
    /// is tried before concluding a mismatch; a malformed digest is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] only when no entry matched and the
    /// hashing routine itself failed on at least one entry.
    pub fn validate(&self, tenant: &TenantId, secret: &str) -> CoreResult<bool> {
        let snapshot = self.current.load_full();
        let Some(entries) = snapshot.entries(tenant) else {
            tracing::debug!(tenant = %tenant, "Credential check failed: unknown tenant");
            return Ok(false);
        };

        let mut fault = None;
        for (index, entry) in entries.iter().enumerate() {
            match entry.check(secret) {
                EntryCheck::Match => return Ok(true),
                EntryCheck::Mismatch => {}
                EntryCheck::Malformed(reason) => {
                    tracing::warn!(tenant = %tenant, index, "Skipping malformed hash entry: {reason}");
                }
                EntryCheck::Fault(reason) => {
                    tracing::error!(tenant = %tenant, index, "Hash verification fault: {reason}");
                    fault = Some(reason);
                }
            }
        }

        if let Some(reason) = fault {
            return Err(CoreError::Internal(reason));
        }
        tracing::debug!(
            tenant = %tenant,
            entries = entries.len(),
            "Credential check failed: no entry matched"
        );
        Ok(false)
    }

    /// Re-reads the credentials file and atomically replaces the live map.
    ///
    /// On failure the previous map stays in effect and the error is kept for
    /// [`CredentialStore::last_reload_error`]. A reload that would replace a
    /// non-empty map with an empty one is treated as a failure.
    pub fn reload(&self) -> CoreResult<()> {
        let Some(path) = self.source.as_deref() else {
            return Ok(());
        };
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = load_file(path).and_then(|map| {
            if map.is_empty() && !self.current.load().is_empty() {
                Err(CoreError::EmptySource(path.to_path_buf()))
            } else {
                Ok(map)
            }
        });

        match result {
            Ok(map) => {
                let map = Arc::new(map);
                self.current.store(map.clone());
                self.record_success(&map);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    generation = self.generation(),
                    "Credential reload failed, keeping previous credentials: {e}"
                );
                *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Reloads only if the source no longer reads back as `loaded`.
    ///
    /// Returns whether a reload was attempted.
    fn reload_if_changed(&self, loaded: &str) -> CoreResult<bool> {
        let Some(path) = self.source.as_deref() else {
            return Ok(false);
        };
        match read_source(path) {
            Ok(current) if current == loaded => Ok(false),
            _ => self.reload().map(|()| true),
        }
    }

    /// Stops watching the credentials file. Safe to call more than once.
    pub fn close(&self) -> CoreResult<()> {
        let watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut watcher) = watcher {
            watcher.stop();
        }
        Ok(())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Number of successful loads, including the initial one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Message of the most recent failed reload, cleared by the next success.
    pub fn last_reload_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The map currently used for validation.
    pub fn snapshot(&self) -> Arc<CredentialMap> {
        self.current.load_full()
    }

    fn source_label(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "memory".to_string(),
        }
    }

    fn record_success(&self, map: &CredentialMap) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
        tracing::info!(
            source = %self.source_label(),
            generation,
            tenants = map.tenant_count(),
            entries = map.entry_count(),
            "Credentials loaded"
        );
    }
}

impl Drop for CredentialStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn read_source(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
        _ => CoreError::Io(e),
    })
}

fn load_file(path: &Path) -> CoreResult<CredentialMap> {
    parse_credentials(&read_source(path)?)
}
