// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bytes mirror: the binary counterpart of
//! [`TextMirror`](crate::core::sync::TextMirror).

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::StoreResult;
use crate::core::sync::mirror::{ReloadEvent, SyncFile};

/// A binary file mirrored in memory as `Vec<u8>`.
#[derive(Clone)]
pub struct BytesMirror {
    file: SyncFile<Vec<u8>>,
}

impl BytesMirror {
    /// Open (or create) the file and load its content.
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

    pub fn generation(&self) -> u64 {
        self.file.generation()
    }

    /// Current in-memory content. Never touches disk.
    pub fn content(&self) -> Vec<u8> {
        self.file.content()
    }

    /// Overwrite the file and cache. Returns the new content.
    pub fn write(&self, new_content: impl Into<Vec<u8>>) -> StoreResult<Vec<u8>> {
        self.file.write(new_content.into())
    }

    /// Add data to the end of the file.
    pub fn append(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        let mut content = self.content();
        content.extend_from_slice(data);
        self.write(content)
    }

    /// Add data to the top of the file.
    pub fn prepend(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        let mut content = data.to_vec();
        content.extend_from_slice(&self.content());
        self.write(content)
    }

    /// Rewrite the file from the current cache.
    pub fn flush(&self) -> StoreResult<Vec<u8>> {
        self.file.flush()
    }

    /// Explicit poll.
    pub fn reload(&self) -> StoreResult<Vec<u8>> {
        self.file.reload()
    }

    /// Register an observer fired whenever a reload picked up an external
    /// change.
    pub fn add_reload_hook(
        &self,
        hook: impl Fn(&ReloadEvent<'_, Vec<u8>>) + Send + Sync + 'static,
    ) {
        self.file.add_reload_hook(Box::new(hook));
    }

    /// Equivalent to writing an empty buffer.
    pub fn clear(&self) -> StoreResult<Vec<u8>> {
        self.write(Vec::new())
    }

    /// Stop the poller and remove the file from disk.
    pub fn delete(&self) -> StoreResult<()> {
        self.file.delete()
    }
}

impl std::fmt::Debug for BytesMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesMirror")
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
            BytesMirror::open(dir.path().join("b.dat"), Duration::from_millis(50), true).unwrap();
        mirror.write(vec![2u8, 3]).unwrap();
        assert_eq!(mirror.append(&[4]).unwrap(), vec![2, 3, 4]);
        assert_eq!(mirror.prepend(&[1]).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(std::fs::read(mirror.path()).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            BytesMirror::open(dir.path().join("c.dat"), Duration::from_millis(50), true).unwrap();
        mirror.write(vec![9u8; 16]).unwrap();
        assert_eq!(mirror.clear().unwrap(), Vec::<u8>::new());
        assert_eq!(std::fs::read(mirror.path()).unwrap(), Vec::<u8>::new());
    }
}
