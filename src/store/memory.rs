//! In-memory [`PersistentStore`] implementation.
//!
//! Backs the test suite and offline operation. Semantics mirror the remote
//! contract: subscriptions deliver the current state immediately on attach
//! and a fresh full snapshot after every write that touches their target;
//! collection snapshots arrive ordered. Writes can be switched to fail for
//! fault-injection tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::store::{
    CollectionCallback, CollectionPath, DocPath, ErrorCallback, OrderBy, PersistentStore,
    SnapshotCallback, StoreError, Unsubscribe,
};

struct DocListener {
    id: u64,
    path: String,
    callback: Arc<dyn Fn(Value) + Send + Sync>,
}

struct CollListener {
    id: u64,
    path: String,
    order: OrderBy,
    callback: Arc<dyn Fn(Vec<Value>) + Send + Sync>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Value>,
    doc_listeners: Vec<DocListener>,
    coll_listeners: Vec<CollListener>,
    next_listener_id: u64,
    fail_writes: bool,
}

impl Inner {
    fn collection_docs(&self, path: &str, order: &OrderBy) -> Vec<Value> {
        let prefix = format!("{path}/");
        let mut docs: Vec<Value> = self
            .docs
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(_, value)| value.clone())
            .collect();

        docs.sort_by_key(|doc| order_key(doc, &order.field));
        if order.descending {
            docs.reverse();
        }
        docs
    }
}

fn order_key(doc: &Value, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn merge_into(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(update)) => {
            for (key, value) in update {
                current.insert(key, value);
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Fault injection: while enabled, every write fails with a transport
    /// error. Reads and subscriptions are unaffected.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    /// Snapshots and callbacks affected by a write, collected under the lock
    /// and invoked outside it.
    #[allow(clippy::type_complexity)]
    fn pending_notifications(
        inner: &Inner,
        doc_path: &str,
    ) -> (
        Vec<(Arc<dyn Fn(Value) + Send + Sync>, Value)>,
        Vec<(Arc<dyn Fn(Vec<Value>) + Send + Sync>, Vec<Value>)>,
    ) {
        let doc = inner.docs.get(doc_path);
        let doc_notifications = inner
            .doc_listeners
            .iter()
            .filter(|listener| listener.path == doc_path)
            .filter_map(|listener| {
                doc.map(|value| (listener.callback.clone(), value.clone()))
            })
            .collect();

        let parent = doc_path.rsplit_once('/').map(|(parent, _)| parent);
        let coll_notifications = inner
            .coll_listeners
            .iter()
            .filter(|listener| Some(listener.path.as_str()) == parent)
            .map(|listener| {
                (
                    listener.callback.clone(),
                    inner.collection_docs(&listener.path, &listener.order),
                )
            })
            .collect();

        (doc_notifications, coll_notifications)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get_doc(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        Ok(self.inner.lock().unwrap().docs.get(path.as_str()).cloned())
    }

    async fn set_doc(&self, path: &DocPath, data: Value, merge: bool) -> Result<(), StoreError> {
        let (doc_notifications, coll_notifications) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_writes {
                return Err(StoreError::Transport(
                    "write rejected by fault injection".to_string(),
                ));
            }

            let key = path.as_str().to_string();
            if merge {
                let slot = inner.docs.entry(key).or_insert(Value::Null);
                merge_into(slot, data);
            } else {
                inner.docs.insert(key, data);
            }

            Self::pending_notifications(&inner, path.as_str())
        };

        for (callback, snapshot) in doc_notifications {
            callback(snapshot);
        }
        for (callback, snapshot) in coll_notifications {
            callback(snapshot);
        }
        Ok(())
    }

    fn subscribe_doc(
        &self,
        path: &DocPath,
        on_snapshot: SnapshotCallback,
        _on_error: ErrorCallback,
    ) -> Unsubscribe {
        let callback: Arc<dyn Fn(Value) + Send + Sync> = Arc::from(on_snapshot);
        let (id, initial) = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_listener_id += 1;
            let id = inner.next_listener_id;
            inner.doc_listeners.push(DocListener {
                id,
                path: path.as_str().to_string(),
                callback: callback.clone(),
            });
            (id, inner.docs.get(path.as_str()).cloned())
        };
        if let Some(doc) = initial {
            callback(doc);
        }

        let inner = self.inner.clone();
        Box::new(move || {
            inner
                .lock()
                .unwrap()
                .doc_listeners
                .retain(|listener| listener.id != id);
        })
    }

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
        order: OrderBy,
        on_snapshot: CollectionCallback,
        _on_error: ErrorCallback,
    ) -> Unsubscribe {
        let callback: Arc<dyn Fn(Vec<Value>) + Send + Sync> = Arc::from(on_snapshot);
        let (id, initial) = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_listener_id += 1;
            let id = inner.next_listener_id;
            let initial = inner.collection_docs(path.as_str(), &order);
            inner.coll_listeners.push(CollListener {
                id,
                path: path.as_str().to_string(),
                order,
                callback: callback.clone(),
            });
            (id, initial)
        };
        callback(initial);

        let inner = self.inner.clone();
        Box::new(move || {
            inner
                .lock()
                .unwrap()
                .coll_listeners
                .retain(|listener| listener.id != id);
        })
    }
}
