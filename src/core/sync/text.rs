// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text mirror: a UTF-8 file kept synchronized with an in-memory string.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::StoreResult;
use crate::core::sync::mirror::{ReloadEvent, SyncFile};

/// A UTF-8 text file mirrored in memory.
///
/// Reads are served from the cache; every mutation rewrites the whole file.
/// External modifications are picked up by the poller (or an explicit
/// [`reload`](Self::reload)) within one poll interval.
///
/// Cloning yields another handle to the same mirror. The mirror itself does
/// not serialize read-modify-write sequences spanning several calls; callers
/// needing that combine their own lock or use the dict/list stores.
#[derive(Clone)]
pub struct TextMirror {
    file: SyncFile<String>,
}

impl TextMirror {
    /// Open (or create) the file and load its content.
    ///
    /// With `manual_reload` no polling thread is spawned and external changes
    /// are only picked up by explicit [`reload`](Self::reload) calls.
    pub fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        manual_reload: bool,
    ) -> StoreResult<Self> {
        Ok(Self {
            file: SyncFile::open(path, poll_interval, manual_reload)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn poll_interval(&self) -> Duration {
        self.file.poll_interval()
    }

    /// Bumped on every content change; layered views use this to invalidate
    /// their parse caches.
    pub fn generation(&self) -> u64 {
        self.file.generation()
    }

    /// Current in-memory content. Never touches disk.
    pub fn content(&self) -> String {
        self.file.content()
    }

    pub(crate) fn snapshot(&self) -> (String, u64) {
        self.file.snapshot()
    }

    /// Overwrite the file and cache. Returns the new content.
    pub fn write(&self, new_content: impl Into<String>) -> StoreResult<String> {
        self.file.write(new_content.into())
    }

    /// Add text to the end of the file.
    pub fn append(&self, text: &str) -> StoreResult<String> {
        let mut content = self.content();
        content.push_str(text);
        self.write(content)
    }

    /// Add text to the top of the file.
    pub fn prepend(&self, text: &str) -> StoreResult<String> {
        let mut content = text.to_string();
        content.push_str(&self.content());
        self.write(content)
    }

    /// Rewrite the file from the current cache.
    pub fn flush(&self) -> StoreResult<String> {
        self.file.flush()
    }

    /// Explicit poll; see the engine docs for the change-detection rule.
    pub fn reload(&self) -> StoreResult<String> {
        self.file.reload()
    }

    /// Register an observer fired whenever a reload picked up an external
    /// change.
    pub fn add_reload_hook(
        &self,
        hook: impl Fn(&ReloadEvent<'_, String>) + Send + Sync + 'static,
    ) {
        self.file.add_reload_hook(Box::new(hook));
    }

    /// Equivalent to writing an empty string.
    pub fn clear(&self) -> StoreResult<String> {
        self.write(String::new())
    }

    /// Stop the poller and remove the file from disk.
    pub fn delete(&self) -> StoreResult<()> {
        self.file.delete()
    }
}

impl std::fmt::Debug for TextMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextMirror")
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_prepend() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            TextMirror::open(dir.path().join("t.txt"), Duration::from_millis(50), true).unwrap();
        mirror.write("middle").unwrap();
        assert_eq!(mirror.append(" end").unwrap(), "middle end");
        assert_eq!(mirror.prepend("start ").unwrap(), "start middle end");
        assert_eq!(
            std::fs::read_to_string(mirror.path()).unwrap(),
            "start middle end"
        );
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            TextMirror::open(dir.path().join("c.txt"), Duration::from_millis(50), true).unwrap();
        mirror.write("something").unwrap();
        assert_eq!(mirror.clear().unwrap(), "");
        assert_eq!(std::fs::read_to_string(mirror.path()).unwrap(), "");
    }

    #[test]
    fn test_generation_advances_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            TextMirror::open(dir.path().join("g.txt"), Duration::from_millis(50), true).unwrap();
        let before = mirror.generation();
        mirror.write("x").unwrap();
        assert!(mirror.generation() > before);
    }
}
