// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON dict store: an object view with per-key change handlers.
//!
//! Handlers observe logical keys. They fire when `set` changes a watched
//! key's value and when an external edit to the backing file, picked up by a
//! reload, changes one. Handler failures are isolated: a panicking handler
//! is logged and never aborts the triggering call.
//!
//! Writes are value-idempotent: `set` with the current value is a complete
//! no-op (no disk write, no handler firing). This keeps handler chains from
//! storming when the same value is written repeatedly.

use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::error;
use serde_json::{Map, Value};

use crate::core::error::StoreResult;
use crate::core::sync::json::JsonMirror;

/// Reserved key read by the access-policy layer above the store. The store
/// itself treats it as an ordinary key.
pub const PRIVATE_KEY: &str = "__private__";
/// Reserved key read by the access-policy layer above the store.
pub const ACCESS_TOKEN_KEY: &str = "__access_token__";

/// Callback observing value changes of watched keys.
///
/// `None` stands for "key absent", so a stored JSON `null` is distinguishable
/// from a missing key. Implemented for any matching closure; state the
/// callback needs is captured at registration time.
///
/// A handler runs while the store's operation lock is held and therefore
/// must not call back into the store it is registered on; mutating other
/// stores or external state is fine.
pub trait ChangeHandler: Send + Sync {
    fn on_change(&self, key: &str, old_value: Option<&Value>, new_value: Option<&Value>);
}

impl<F> ChangeHandler for F
where
    F: Fn(&str, Option<&Value>, Option<&Value>) + Send + Sync,
{
    fn on_change(&self, key: &str, old_value: Option<&Value>, new_value: Option<&Value>) {
        self(key, old_value, new_value)
    }
}

struct HandlerEntry {
    keys: Vec<String>,
    handler: Arc<dyn ChangeHandler>,
}

#[derive(Default)]
struct HandlerRegistry {
    handlers: HashMap<String, HandlerEntry>,
    /// Reverse index: watched key -> names of the handlers observing it.
    watched: HashMap<String, BTreeSet<String>>,
}

impl HandlerRegistry {
    fn insert(&mut self, name: &str, keys: Vec<String>, handler: Arc<dyn ChangeHandler>) {
        if self.handlers.contains_key(name) {
            self.remove(name);
        }
        for key in &keys {
            self.watched
                .entry(key.clone())
                .or_default()
                .insert(name.to_string());
        }
        self.handlers
            .insert(name.to_string(), HandlerEntry { keys, handler });
    }

    fn remove(&mut self, name: &str) -> bool {
        match self.handlers.remove(name) {
            Some(entry) => {
                for key in &entry.keys {
                    if let Some(names) = self.watched.get_mut(key) {
                        names.remove(name);
                        if names.is_empty() {
                            self.watched.remove(key);
                        }
                    }
                }
                true
            }
            None => false,
        }
    }

    fn watching(&self, key: &str) -> Vec<(String, Arc<dyn ChangeHandler>)> {
        match self.watched.get(key) {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    self.handlers
                        .get(name)
                        .map(|entry| (name.clone(), Arc::clone(&entry.handler)))
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Run one handler, containing any panic it raises.
fn dispatch(
    name: &str,
    handler: &Arc<dyn ChangeHandler>,
    key: &str,
    old_value: Option<&Value>,
    new_value: Option<&Value>,
) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        handler.on_change(key, old_value, new_value);
    }));
    if result.is_err() {
        error!("change handler '{}' panicked for key '{}'", name, key);
    }
}

/// A JSON object file with typed access and change notification.
#[derive(Clone)]
pub struct JsonDictStore {
    json: JsonMirror,
    handlers: Arc<Mutex<HandlerRegistry>>,
    /// Serializes mutations and the reload diff so in-process writers cannot
    /// lose updates to each other.
    op_lock: Arc<Mutex<()>>,
}

impl JsonDictStore {
    /// Open (or create) the backing file. A value that is not a JSON object
    /// is coerced to an empty object and persisted.
    pub fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        manual_reload: bool,
    ) -> StoreResult<Self> {
        let json = JsonMirror::open(path, poll_interval, manual_reload)?;
        if !json.value().is_object() {
            json.set_value(&Value::Object(Map::new()))?;
        }

        let handlers: Arc<Mutex<HandlerRegistry>> = Arc::new(Mutex::new(HandlerRegistry::default()));
        let op_lock = Arc::new(Mutex::new(()));

        // External edits arrive through the text layer's reload. Refresh the
        // parse cache (coercing non-objects), then fire handlers for watched
        // keys whose value changed. Keys absent on either side are skipped;
        // only value-to-value transitions are reported here.
        let parsed = json.parsed_cell();
        let hook_handlers = Arc::clone(&handlers);
        let hook_op_lock = Arc::clone(&op_lock);
        json.add_reload_hook(move |event| {
            let _guard = hook_op_lock.lock().unwrap();

            let new_value = match serde_json::from_str::<Value>(event.new) {
                Ok(Value::Object(map)) => Value::Object(map),
                Ok(_) => Value::Object(Map::new()),
                // Leave the cache trailing; lenient reads keep the last good
                // object until the content is valid again.
                Err(_) => return,
            };

            let old_value = {
                let mut cell = parsed.lock().unwrap();
                let old = std::mem::replace(&mut cell.value, new_value.clone());
                cell.generation = event.generation;
                old
            };

            let empty = Map::new();
            let old_map = old_value.as_object().unwrap_or(&empty);
            let new_map = new_value.as_object().unwrap_or(&empty);

            let registry = hook_handlers.lock().unwrap();
            for (key, names) in &registry.watched {
                let (old_item, new_item) = match (old_map.get(key), new_map.get(key)) {
                    (Some(o), Some(n)) => (o, n),
                    _ => continue,
                };
                if old_item == new_item {
                    continue;
                }
                for name in names {
                    if let Some(entry) = registry.handlers.get(name) {
                        dispatch(name, &entry.handler, key, Some(old_item), Some(new_item));
                    }
                }
            }
        });

        Ok(Self {
            json,
            handlers,
            op_lock,
        })
    }

    pub fn path(&self) -> &Path {
        self.json.path()
    }

    pub fn poll_interval(&self) -> Duration {
        self.json.poll_interval()
    }

    fn current_map(&self) -> Map<String, Value> {
        match self.json.value() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.current_map().get(key).cloned()
    }

    /// Value stored under `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// The whole object.
    pub fn get_all(&self) -> Map<String, Value> {
        self.current_map()
    }

    /// True when the stored value under `key` equals `value`.
    pub fn check(&self, key: &str, value: &Value) -> bool {
        self.get(key).as_ref() == Some(value)
    }

    pub fn len(&self) -> usize {
        self.current_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_map().is_empty()
    }

    /// Assign `value` to `key`.
    ///
    /// Value-idempotent: if the stored value already equals `value` nothing
    /// happens at all. Otherwise the handlers watching `key` fire first with
    /// `(key, old, new)` and then the assignment is persisted.
    pub fn set(&self, key: &str, value: Value) -> StoreResult<Map<String, Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut map = self.current_map();

        if map.get(key) == Some(&value) {
            return Ok(map);
        }

        let old_value = map.get(key).cloned();
        let targets = self.handlers.lock().unwrap().watching(key);
        for (name, handler) in &targets {
            dispatch(name, handler, key, old_value.as_ref(), Some(&value));
        }

        map.insert(key.to_string(), value);
        self.json.set_value(&Value::Object(map.clone()))?;
        Ok(map)
    }

    /// Drop `key` if present and persist the object either way.
    pub fn remove(&self, key: &str) -> StoreResult<Map<String, Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut map = self.current_map();
        map.remove(key);
        self.json.set_value(&Value::Object(map.clone()))?;
        Ok(map)
    }

    /// Persist an empty object.
    pub fn clear(&self) -> StoreResult<Map<String, Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let map = Map::new();
        self.json.set_value(&Value::Object(map.clone()))?;
        Ok(map)
    }

    /// Explicit poll. External changes fire the watched handlers through the
    /// reload hook installed at construction.
    pub fn reload(&self) -> StoreResult<Map<String, Value>> {
        self.json.reload()?;
        Ok(self.current_map())
    }

    /// Register a handler observing `keys`. A handler registered under an
    /// existing name replaces it.
    pub fn add_handler(
        &self,
        name: &str,
        keys: &[&str],
        handler: impl ChangeHandler + 'static,
    ) {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.handlers
            .lock()
            .unwrap()
            .insert(name, keys, Arc::new(handler));
    }

    /// Deregister by name. Returns false when no such handler exists.
    pub fn remove_handler(&self, name: &str) -> bool {
        self.handlers.lock().unwrap().remove(name)
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.lock().unwrap().handlers.contains_key(name)
    }

    /// Install an observer for failed JSON decodes of the backing file.
    pub fn set_decode_error_hook(
        &self,
        hook: impl Fn(&serde_json::Error) + Send + Sync + 'static,
    ) {
        self.json.set_decode_error_hook(hook);
    }

    /// Stop the poller and remove the file from disk.
    pub fn delete(&self) -> StoreResult<()> {
        self.json.delete()
    }
}

impl std::fmt::Debug for JsonDictStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDictStore")
            .field("path", &self.path())
            .finish()
    }
}
