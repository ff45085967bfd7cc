//! Per-call request context.
//!
//! Every item of a batch gets its own [`Context`], built from a structural
//! clone of the caller's base context plus the call metadata
//! (`batchId`, `requestId`, `route`, `headers`). The handlers of one call's
//! chain share that instance, so a `before` handler can leave values for the
//! terminal handler; no other call ever sees it.
//!
//! Values stored in a context are plain JSON snapshots. Nothing inside a
//! context refers to state outside of it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::dispatch::batch::BatchItem;

/// Key under which the batch identifier is stored.
pub const BATCH_ID: &str = "batchId";
/// Key under which the caller-supplied item id is stored.
pub const REQUEST_ID: &str = "requestId";
/// Key under which the route name is stored.
pub const ROUTE: &str = "route";
/// Key under which the item headers are stored (`null` when absent).
pub const HEADERS: &str = "headers";

/// Mutable JSON context shared by the handlers of a single call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl Context {
    /// Create a context owning `values`.
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(values)),
        }
    }

    /// Build the context for one batch item.
    pub(crate) fn for_item(base: &Map<String, Value>, batch_id: &str, item: &BatchItem) -> Self {
        let mut values = base.clone();
        values.insert(BATCH_ID.to_string(), Value::String(batch_id.to_string()));
        values.insert(REQUEST_ID.to_string(), Value::String(item.id.clone()));
        values.insert(ROUTE.to_string(), Value::String(item.route.clone()));
        values.insert(
            HEADERS.to_string(),
            item.headers.clone().map(Value::Object).unwrap_or(Value::Null),
        );
        Self::new(values)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        // A handler that panicked mid-update cannot leave the map structurally broken.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Get a string value, if `key` holds one.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.lock().get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// The batch this call belongs to.
    pub fn batch_id(&self) -> Option<String> {
        self.get_str(BATCH_ID)
    }

    /// The caller-supplied id of this call.
    pub fn request_id(&self) -> Option<String> {
        self.get_str(REQUEST_ID)
    }

    /// Copy of every entry, as a JSON object.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().clone()
    }

    /// Copy of every entry, as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.snapshot())
    }
}

impl From<Map<String, Value>> for Context {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}
