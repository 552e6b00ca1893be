// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON list store: an array view with optional de-duplication.
//!
//! With `deduplicate` enabled every persisted list passes through a set
//! keyed on canonical serialization. Insertion order is NOT preserved in
//! that mode; callers must treat the list as a set. This order loss is a
//! long-standing behavior downstream callers rely on, not a bug.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::core::error::{StoreError, StoreResult};
use crate::core::sync::json::JsonMirror;

/// Total order over JSON values used by [`JsonListStore::sort`]:
/// null < bool < number < string < array < object, then by value within a
/// type. Numbers compare as f64; arrays element-wise; objects by canonical
/// text.
pub fn json_cmp(a: &Value, b: &Value) -> Ordering {
    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = json_cmp(xi, yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => Ordering::Equal,
    }
}

/// A JSON array file with list semantics.
#[derive(Clone)]
pub struct JsonListStore {
    json: JsonMirror,
    deduplicate: bool,
    op_lock: Arc<Mutex<()>>,
}

impl JsonListStore {
    /// Open (or create) the backing file. A value that is not a JSON array
    /// is coerced to an empty array and persisted. `deduplicate` is fixed
    /// for the lifetime of the store.
    pub fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        deduplicate: bool,
        manual_reload: bool,
    ) -> StoreResult<Self> {
        let json = JsonMirror::open(path, poll_interval, manual_reload)?;
        if !json.value().is_array() {
            json.set_value(&Value::Array(Vec::new()))?;
        }

        // Keep the parse cache coherent (and coerced) on external edits.
        let parsed = json.parsed_cell();
        json.add_reload_hook(move |event| {
            let new_value = match serde_json::from_str::<Value>(event.new) {
                Ok(Value::Array(items)) => Value::Array(items),
                Ok(_) => Value::Array(Vec::new()),
                Err(_) => return,
            };
            let mut cell = parsed.lock().unwrap();
            cell.value = new_value;
            cell.generation = event.generation;
        });

        Ok(Self {
            json,
            deduplicate,
            op_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        self.json.path()
    }

    pub fn poll_interval(&self) -> Duration {
        self.json.poll_interval()
    }

    pub fn deduplicate(&self) -> bool {
        self.deduplicate
    }

    /// Current list content.
    pub fn items(&self) -> Vec<Value> {
        match self.json.value() {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// True when `item` is in the list.
    pub fn contains(&self, item: &Value) -> bool {
        self.items().iter().any(|x| x == item)
    }

    /// Apply the dedup rule and persist. Every mutation funnels through here.
    fn persist(&self, items: Vec<Value>) -> StoreResult<Vec<Value>> {
        let items = if self.deduplicate {
            // Set semantics through a hash map keyed on canonical text:
            // duplicates collapse and the original order is lost.
            let mut set: HashMap<String, Value> = HashMap::with_capacity(items.len());
            for item in items {
                set.insert(item.to_string(), item);
            }
            set.into_values().collect()
        } else {
            items
        };
        self.json.set_value(&Value::Array(items.clone()))?;
        Ok(items)
    }

    /// Append `item` and persist. Returns the updated list.
    pub fn append(&self, item: Value) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        items.push(item);
        self.persist(items)
    }

    /// Append every element of `data` and persist.
    pub fn extend(&self, data: Vec<Value>) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        items.extend(data);
        self.persist(items)
    }

    /// Insert `item` at `index` (clamped to the list length) and persist.
    pub fn insert(&self, index: usize, item: Value) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        let index = index.min(items.len());
        items.insert(index, item);
        self.persist(items)
    }

    /// Remove the first occurrence of `item` and persist. Errors when the
    /// item is not present.
    pub fn remove(&self, item: &Value) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        match items.iter().position(|x| x == item) {
            Some(index) => {
                items.remove(index);
                self.persist(items)
            }
            None => Err(StoreError::item_not_found(format!(
                "{} is not in the list",
                item
            ))),
        }
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> StoreResult<Value> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        match items.pop() {
            Some(item) => {
                self.persist(items)?;
                Ok(item)
            }
            None => Err(StoreError::index_out_of_range(0, 0)),
        }
    }

    /// Remove and return the element at `index`.
    pub fn pop_at(&self, index: usize) -> StoreResult<Value> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        if index >= items.len() {
            return Err(StoreError::index_out_of_range(index, items.len()));
        }
        let item = items.remove(index);
        self.persist(items)?;
        Ok(item)
    }

    /// Sort by [`json_cmp`] and persist.
    pub fn sort(&self) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let mut items = self.items();
        items.sort_by(json_cmp);
        self.persist(items)
    }

    /// Keep only `[start, stop)` (bounds clamped) and persist.
    pub fn slice(&self, start: usize, stop: usize) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        let items = self.items();
        let start = start.min(items.len());
        let stop = stop.clamp(start, items.len());
        self.persist(items[start..stop].to_vec())
    }

    /// Persist an empty list.
    pub fn clear(&self) -> StoreResult<Vec<Value>> {
        let _guard = self.op_lock.lock().unwrap();
        self.persist(Vec::new())
    }

    /// Explicit poll; returns the (possibly refreshed) list.
    pub fn reload(&self) -> StoreResult<Vec<Value>> {
        self.json.reload()?;
        Ok(self.items())
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

impl std::fmt::Debug for JsonListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonListStore")
            .field("path", &self.path())
            .field("deduplicate", &self.deduplicate)
            .finish()
    }
}
