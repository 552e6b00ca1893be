// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON mirror: a lazily parsed `serde_json::Value` view over a text mirror.
//!
//! Parsing is lenient by design: a malformed file leaves the last
//! successfully decoded value in place instead of surfacing an error, on the
//! theory that a config store must never take down its host process. The
//! optional decode-error hook gives operators a signal without changing that
//! default.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::core::error::{StoreError, StoreResult};
use crate::core::sync::mirror::ReloadEvent;
use crate::core::sync::text::TextMirror;

/// Observer for failed JSON decodes (see the module docs).
pub type DecodeErrorHook = Arc<dyn Fn(&serde_json::Error) + Send + Sync>;

pub(crate) struct ParsedState {
    pub(crate) value: Value,
    /// Text-mirror generation the value was parsed from. When it trails the
    /// mirror the next access re-parses; a failed parse leaves it trailing so
    /// every access retries until the content becomes valid again.
    pub(crate) generation: u64,
}

/// A JSON file mirrored in memory, parsed on demand.
#[derive(Clone)]
pub struct JsonMirror {
    text: TextMirror,
    parsed: Arc<Mutex<ParsedState>>,
    decode_error_hook: Arc<Mutex<Option<DecodeErrorHook>>>,
}

/// Serialize a value the way the stores persist it: sorted object keys
/// (the `serde_json` map default) and two-space indentation.
pub(crate) fn to_canonical_json(value: &Value) -> StoreResult<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| StoreError::other(format!("non-UTF-8 JSON output: {e}")))
}

impl JsonMirror {
    /// Open (or create) the file. An empty file is seeded with the literal
    /// `null` before the first parse; an unparseable file leaves the value
    /// at `null` until it becomes valid.
    pub fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        manual_reload: bool,
    ) -> StoreResult<Self> {
        let text = TextMirror::open(path, poll_interval, manual_reload)?;
        if text.content().is_empty() {
            text.write("null")?;
        }
        let (content, generation) = text.snapshot();
        let value = serde_json::from_str(&content).unwrap_or(Value::Null);
        Ok(Self {
            text,
            parsed: Arc::new(Mutex::new(ParsedState { value, generation })),
            decode_error_hook: Arc::new(Mutex::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        self.text.path()
    }

    pub fn poll_interval(&self) -> Duration {
        self.text.poll_interval()
    }

    /// Raw text content underneath the JSON view.
    pub fn content(&self) -> String {
        self.text.content()
    }

    pub(crate) fn text(&self) -> &TextMirror {
        &self.text
    }

    pub(crate) fn parsed_cell(&self) -> Arc<Mutex<ParsedState>> {
        Arc::clone(&self.parsed)
    }

    /// Decoded JSON value.
    ///
    /// Re-parses only when the content changed since the last successful
    /// parse. A decode failure returns the last good value (lenient read).
    pub fn value(&self) -> Value {
        let (content, generation) = self.text.snapshot();
        let mut failure = None;

        let value = {
            let mut parsed = self.parsed.lock().unwrap();
            if parsed.generation != generation {
                match serde_json::from_str(&content) {
                    Ok(value) => {
                        parsed.value = value;
                        parsed.generation = generation;
                    }
                    Err(e) => {
                        debug!("keeping stale value for {:?}: {}", self.text.path(), e);
                        failure = Some(e);
                    }
                }
            }
            parsed.value.clone()
        };

        // The hook runs with no mirror lock held, so it may read the mirror.
        // A read of still-invalid content fires it again.
        if let Some(e) = failure {
            let hook = self.decode_error_hook.lock().unwrap().clone();
            if let Some(hook) = hook {
                hook(&e);
            }
        }
        value
    }

    /// Serialize `value` canonically and overwrite the file.
    pub fn set_value(&self, value: &Value) -> StoreResult<Value> {
        let content = to_canonical_json(value)?;
        self.text.write(content)?;
        let mut parsed = self.parsed.lock().unwrap();
        parsed.value = value.clone();
        parsed.generation = self.text.generation();
        Ok(value.clone())
    }

    /// Reset the stored value to `null`.
    pub fn clear(&self) -> StoreResult<Value> {
        self.set_value(&Value::Null)
    }

    /// Explicit poll; returns the (possibly refreshed) decoded value.
    pub fn reload(&self) -> StoreResult<Value> {
        self.text.reload()?;
        Ok(self.value())
    }

    /// Register an observer fired whenever a reload picked up an external
    /// change of the raw content.
    pub fn add_reload_hook(
        &self,
        hook: impl Fn(&ReloadEvent<'_, String>) + Send + Sync + 'static,
    ) {
        self.text.add_reload_hook(hook);
    }

    /// Install an observer for failed decodes. Decode failures still fall
    /// back to the last good value; the hook only adds visibility.
    ///
    /// The hook is invoked after the mirror's locks are released and may read
    /// the mirror it is installed on. Reading while the content is still
    /// invalid re-parses and so fires the hook again; a hook that reads its
    /// own mirror must tolerate that.
    pub fn set_decode_error_hook(
        &self,
        hook: impl Fn(&serde_json::Error) + Send + Sync + 'static,
    ) {
        *self.decode_error_hook.lock().unwrap() = Some(Arc::new(hook));
    }

    /// Stop the poller and remove the file from disk.
    pub fn delete(&self) -> StoreResult<()> {
        self.text.delete()
    }
}

impl std::fmt::Debug for JsonMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonMirror")
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_file_becomes_null() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            JsonMirror::open(dir.path().join("n.json"), Duration::from_millis(50), true).unwrap();
        assert_eq!(mirror.value(), Value::Null);
        assert_eq!(mirror.content(), "null");
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            JsonMirror::open(dir.path().join("r.json"), Duration::from_millis(50), true).unwrap();
        let value = json!({"b": [1, 2, 3], "a": {"nested": null}});
        mirror.set_value(&value).unwrap();
        assert_eq!(mirror.value(), value);
    }

    #[test]
    fn test_canonical_form_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            JsonMirror::open(dir.path().join("c.json"), Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!({"b": 1, "a": 2})).unwrap();
        assert_eq!(mirror.content(), "{\n  \"a\": 2,\n  \"b\": 1\n}");
    }

    #[test]
    fn test_clear_resets_to_null() {
        let dir = tempfile::tempdir().unwrap();
        let mirror =
            JsonMirror::open(dir.path().join("cl.json"), Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!({"a": 1})).unwrap();
        assert_eq!(mirror.clear().unwrap(), Value::Null);
        assert_eq!(mirror.content(), "null");
    }

    #[test]
    fn test_malformed_external_content_keeps_last_good_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mirror = JsonMirror::open(&path, Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!({"ok": true})).unwrap();

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "{not json").unwrap();
        mirror.reload().unwrap();

        assert_eq!(mirror.value(), json!({"ok": true}));
    }

    #[test]
    fn test_decode_error_hook_fires() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hook.json");
        let mirror = JsonMirror::open(&path, Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!(1)).unwrap();

        let errors = Arc::new(AtomicUsize::new(0));
        let errors_in_hook = Arc::clone(&errors);
        mirror.set_decode_error_hook(move |_| {
            errors_in_hook.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "][").unwrap();
        mirror.reload().unwrap();

        assert!(errors.load(Ordering::SeqCst) >= 1);
        assert_eq!(mirror.value(), json!(1));
    }

    #[test]
    fn test_decode_error_hook_may_read_its_own_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reent.json");
        let mirror = JsonMirror::open(&path, Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!({"stable": 1})).unwrap();

        // The hook reads the mirror it is installed on; the guard keeps the
        // still-invalid re-read from recursing.
        let seen = Arc::new(Mutex::new(None));
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = mirror.clone();
        let seen_in_hook = Arc::clone(&seen);
        let fired_in_hook = Arc::clone(&fired);
        mirror.set_decode_error_hook(move |_| {
            if fired_in_hook.fetch_add(1, Ordering::SeqCst) == 0 {
                *seen_in_hook.lock().unwrap() = Some(handle.value());
            }
        });

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "{broken").unwrap();
        mirror.reload().unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(json!({"stable": 1})));
    }

    #[test]
    fn test_recovers_once_content_valid_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.json");
        let mirror = JsonMirror::open(&path, Duration::from_millis(50), true).unwrap();
        mirror.set_value(&json!("old")).unwrap();

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "oops").unwrap();
        mirror.reload().unwrap();
        assert_eq!(mirror.value(), json!("old"));

        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "\"new\"").unwrap();
        mirror.reload().unwrap();
        assert_eq!(mirror.value(), json!("new"));
    }
}
