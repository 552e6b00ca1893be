// SPDX-License-Identifier: MIT OR Apache-2.0

//! # File Mirror Engine
//!
//! The shared machinery behind every synchronized file: an in-memory content
//! cache, a modification-time polling loop, and reload observers.
//!
//! The cache is authoritative between polls. Any mutation rewrites the whole
//! file and records the resulting modification time under the same lock, so
//! the poller never re-triggers on the mutator's own write. External writes
//! become visible within one poll interval (eventual consistency).
//!
//! No OS file-watch API is used; a timed stat loop keeps the engine portable
//! at the cost of bounded-latency detection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::core::error::StoreResult;

/// Raw content form a mirror can hold.
///
/// Implemented for `String` (text files) and `Vec<u8>` (binary files); one
/// trait seam lets the text and binary mirrors share the whole engine.
pub trait MirrorContent: Clone + Send + Sync + 'static {
    fn empty() -> Self;
    fn load(path: &Path) -> io::Result<Self>;
    fn store(path: &Path, content: &Self) -> io::Result<()>;
}

impl MirrorContent for String {
    fn empty() -> Self {
        String::new()
    }

    fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path)
    }

    fn store(path: &Path, content: &Self) -> io::Result<()> {
        fs::write(path, content)
    }
}

impl MirrorContent for Vec<u8> {
    fn empty() -> Self {
        Vec::new()
    }

    fn load(path: &Path) -> io::Result<Self> {
        fs::read(path)
    }

    fn store(path: &Path, content: &Self) -> io::Result<()> {
        fs::write(path, content)
    }
}

/// Snapshot handed to reload hooks after an external change was picked up.
pub struct ReloadEvent<'a, C> {
    /// Content before the reload.
    pub old: &'a C,
    /// Content read from disk.
    pub new: &'a C,
    /// Generation the mirror advanced to.
    pub generation: u64,
}

/// Observer fired after every reload that found the file changed.
///
/// Hooks run outside the content lock but on the reloading thread (the
/// poller, or whichever caller invoked `reload`). A hook must not register
/// further hooks on the same mirror.
pub type ReloadHook<C> = Box<dyn Fn(&ReloadEvent<'_, C>) + Send + Sync>;

struct FileState<C> {
    content: C,
    mod_time: Option<SystemTime>,
    generation: u64,
}

struct SyncFileInner<C: MirrorContent> {
    path: PathBuf,
    poll_interval: Duration,
    state: Mutex<FileState<C>>,
    hooks: Mutex<Vec<ReloadHook<C>>>,
    stopped: Arc<AtomicBool>,
}

impl<C: MirrorContent> Drop for SyncFileInner<C> {
    fn drop(&mut self) {
        // The poller exits at its next wake once every handle is gone.
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Shared handle to one synchronized file.
///
/// Cloning yields another handle to the same cache and poller.
pub(crate) struct SyncFile<C: MirrorContent> {
    inner: Arc<SyncFileInner<C>>,
}

impl<C: MirrorContent> Clone for SyncFile<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: MirrorContent> SyncFile<C> {
    /// Open the file, creating it empty if absent, and start polling unless
    /// `manual_reload` is set.
    ///
    /// Construction is the one place where I/O failures are fatal: an
    /// unreadable existing file or an unwritable parent directory propagates.
    pub(crate) fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        manual_reload: bool,
    ) -> StoreResult<Self> {
        let path = path.into();
        let content = match C::load(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let empty = C::empty();
                C::store(&path, &empty)?;
                empty
            }
            Err(e) => return Err(e.into()),
        };
        let mod_time = fs::metadata(&path)?.modified().ok();

        let inner = Arc::new(SyncFileInner {
            path,
            poll_interval,
            state: Mutex::new(FileState {
                content,
                mod_time,
                generation: 0,
            }),
            hooks: Mutex::new(Vec::new()),
            stopped: Arc::new(AtomicBool::new(false)),
        });

        if !manual_reload {
            Self::spawn_poller(&inner);
        }

        Ok(Self { inner })
    }

    /// Background stat loop. Holds only a weak reference so dropping every
    /// handle lets the thread wind down at its next wake.
    fn spawn_poller(inner: &Arc<SyncFileInner<C>>) {
        let weak: Weak<SyncFileInner<C>> = Arc::downgrade(inner);
        let stopped = Arc::clone(&inner.stopped);
        let interval = inner.poll_interval;

        thread::spawn(move || {
            while !stopped.load(Ordering::SeqCst) {
                match weak.upgrade() {
                    Some(inner) => {
                        if let Err(e) = Self::reload_inner(&inner) {
                            // Transient poll failure: skip this tick, retry
                            // on the next one.
                            warn!("poll tick skipped for {:?}: {}", inner.path, e);
                        }
                    }
                    None => break,
                }
                thread::sleep(interval);
            }
        });
    }

    pub(crate) fn path(&self) -> &Path {
        &self.inner.path
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Current in-memory content. Never touches disk.
    pub(crate) fn content(&self) -> C {
        self.inner.state.lock().unwrap().content.clone()
    }

    /// Content together with the generation it belongs to.
    pub(crate) fn snapshot(&self) -> (C, u64) {
        let state = self.inner.state.lock().unwrap();
        (state.content.clone(), state.generation)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.inner.state.lock().unwrap().generation
    }

    /// Overwrite the file and the cache atomically with respect to `reload`.
    pub(crate) fn write(&self, new_content: C) -> StoreResult<C> {
        let mut state = self.inner.state.lock().unwrap();
        C::store(&self.inner.path, &new_content)?;
        state.mod_time = fs::metadata(&self.inner.path)?.modified().ok();
        state.content = new_content;
        state.generation += 1;
        Ok(state.content.clone())
    }

    /// Rewrite the file from the current cache.
    pub(crate) fn flush(&self) -> StoreResult<C> {
        let mut state = self.inner.state.lock().unwrap();
        C::store(&self.inner.path, &state.content)?;
        state.mod_time = fs::metadata(&self.inner.path)?.modified().ok();
        Ok(state.content.clone())
    }

    /// Explicit poll: stat the file and, if the modification time moved,
    /// re-read it and fire the reload hooks. A no-op when the time is
    /// unchanged. Returns the current content either way.
    pub(crate) fn reload(&self) -> StoreResult<C> {
        Self::reload_inner(&self.inner)
    }

    fn reload_inner(inner: &Arc<SyncFileInner<C>>) -> StoreResult<C> {
        let mod_time = fs::metadata(&inner.path)?.modified().ok();

        let (old, new, generation) = {
            let mut state = inner.state.lock().unwrap();
            if mod_time == state.mod_time {
                return Ok(state.content.clone());
            }
            let new = C::load(&inner.path)?;
            let old = std::mem::replace(&mut state.content, new.clone());
            state.mod_time = mod_time;
            state.generation += 1;
            (old, new, state.generation)
        };

        debug!(
            "external change picked up for {:?} (generation {})",
            inner.path, generation
        );

        let event = ReloadEvent {
            old: &old,
            new: &new,
            generation,
        };
        let hooks = inner.hooks.lock().unwrap();
        for hook in hooks.iter() {
            hook(&event);
        }

        Ok(new)
    }

    pub(crate) fn add_reload_hook(&self, hook: ReloadHook<C>) {
        self.inner.hooks.lock().unwrap().push(hook);
    }

    /// Stop the poller and unlink the file. The handle is not usable
    /// afterwards.
    pub(crate) fn delete(&self) -> StoreResult<()> {
        self.inner.stopped.store(true, Ordering::SeqCst);
        fs::remove_file(&self.inner.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "fresh.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        assert!(path.exists());
        assert_eq!(file.content(), "");
    }

    #[test]
    fn test_open_loads_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "existing.txt");
        fs::write(&path, "hello").unwrap();
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        assert_eq!(file.content(), "hello");
    }

    #[test]
    fn test_write_updates_cache_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "w.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        file.write("abc".to_string()).unwrap();
        assert_eq!(file.content(), "abc");
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc");
    }

    #[test]
    fn test_own_write_does_not_fire_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "own.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_hook = Arc::clone(&fired);
        file.add_reload_hook(Box::new(move |_| {
            fired_in_hook.fetch_add(1, Ordering::SeqCst);
        }));

        file.write("one".to_string()).unwrap();
        file.reload().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_reload_sees_external_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "ext.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        file.write("before".to_string()).unwrap();

        // Simulate another process rewriting the file. Sleep long enough for
        // the mtime to move on filesystems with coarse timestamps.
        thread::sleep(Duration::from_millis(20));
        fs::write(&path, "after").unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_hook = Arc::clone(&fired);
        file.add_reload_hook(Box::new(move |event| {
            assert_eq!(event.old, "before");
            assert_eq!(event.new, "after");
            fired_in_hook.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(file.reload().unwrap(), "after");
        assert_eq!(file.content(), "after");
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Unchanged mtime means the second reload is a no-op.
        assert_eq!(file.reload().unwrap(), "after");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_background_poller_picks_up_external_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "poll.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(20), false).unwrap();

        thread::sleep(Duration::from_millis(30));
        fs::write(&path, "external").unwrap();
        thread::sleep(Duration::from_millis(200));

        assert_eq!(file.content(), "external");
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "gone.txt");
        let file: SyncFile<String> =
            SyncFile::open(&path, Duration::from_millis(20), false).unwrap();
        file.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_bytes_content_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "bin.dat");
        let file: SyncFile<Vec<u8>> =
            SyncFile::open(&path, Duration::from_millis(50), true).unwrap();
        file.write(vec![0u8, 159, 146, 150]).unwrap();
        assert_eq!(file.content(), vec![0u8, 159, 146, 150]);
        assert_eq!(fs::read(&path).unwrap(), vec![0u8, 159, 146, 150]);
    }
}
