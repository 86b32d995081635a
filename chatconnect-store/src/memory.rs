use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    Document, DocumentPath, DocumentStore, Fields, Id, Query, Result, Snapshot, SnapshotSender,
    StoreError, Subscription, Timestamp, Transaction, TransactionOps,
};

type WatcherId = Id<Watcher>;

/// An in-memory document store, used by tests and single-process embedders.
///
/// All mutation happens under one lock, so concurrent transactions are fully
/// serialized and the conflict retry path of [DocumentStore] never triggers
/// in-process.
pub struct MemoryStore {
    state: Mutex<State>,
    watchers: Arc<Mutex<Vec<Watcher>>>,
    online: AtomicBool,
    clock: Mutex<Timestamp>,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Fields>,
}

/// A registered standing query, re-evaluated after every committed mutation.
struct Watcher {
    id: WatcherId,
    query: Query,
    sender: SnapshotSender,
    /// The last snapshot sent, to suppress no-op notifications.
    last: Snapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Default::default(),
            watchers: Default::default(),
            online: AtomicBool::new(true),
            clock: Mutex::new(Utc::now()),
        }
    }

    /// Simulates losing the connection to the store.
    ///
    /// While offline, reads keep answering from held state and writes are
    /// refused with [StoreError::Offline].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Offline)
        }
    }

    fn evaluate(state: &State, query: &Query) -> Snapshot {
        let prefix = format!("{}/", query.collection.as_str());

        state
            .documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .filter(|(_, fields)| query.filter.matches(fields))
            .map(|(path, fields)| Document {
                path: DocumentPath::new(path.clone()),
                fields: fields.clone(),
            })
            .collect()
    }

    /// Re-evaluates every watcher, sending a snapshot to those whose result
    /// set changed.
    fn notify(&self) {
        let state = self.state.lock();
        let mut watchers = self.watchers.lock();

        for watcher in watchers.iter_mut() {
            let snapshot = Self::evaluate(&state, &watcher.query);

            if snapshot != watcher.last {
                watcher.last = snapshot.clone();
                // A failed send means the subscription is mid-teardown
                let _ = watcher.sender.send(snapshot);
            }
        }
    }

    #[cfg(test)]
    fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        let state = self.state.lock();

        Ok(state.documents.get(path.as_str()).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn set(&self, path: &DocumentPath, fields: Fields) -> Result<()> {
        self.ensure_online()?;

        self.state
            .lock()
            .documents
            .insert(path.as_str().to_string(), fields);

        self.notify();
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        self.ensure_online()?;

        self.state.lock().documents.remove(path.as_str());

        self.notify();
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let state = self.state.lock();
        Ok(Self::evaluate(&state, query))
    }

    async fn run_transaction<T, F>(&self, mut op: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&mut Transaction) -> Result<T> + Send,
    {
        self.ensure_online()?;

        let value = {
            let mut state = self.state.lock();

            let mut ops = MemoryTransaction {
                state: &*state,
                writes: Vec::new(),
            };

            let value = {
                let mut transaction = Transaction::new(&mut ops);
                op(&mut transaction)?
            };

            let MemoryTransaction { writes, .. } = ops;

            for write in writes {
                match write {
                    Write::Set { path, fields } => {
                        state.documents.insert(path, fields);
                    }
                    Write::Delete { path } => {
                        state.documents.remove(&path);
                    }
                }
            }

            value
        };

        self.notify();
        Ok(value)
    }

    fn subscribe(&self, query: &Query) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = WatcherId::new();

        // The initial snapshot and the registration happen under the state
        // lock, so no committed change can fall between them
        {
            let state = self.state.lock();
            let mut watchers = self.watchers.lock();

            let initial = Self::evaluate(&state, query);
            let _ = sender.send(initial.clone());

            watchers.push(Watcher {
                id,
                query: query.clone(),
                sender,
                last: initial,
            });
        }

        debug!("Subscription {:?} opened on {}", id, query.collection);

        let watchers = Arc::downgrade(&self.watchers);

        Subscription::new(receiver, move || {
            if let Some(watchers) = watchers.upgrade() {
                debug!("Subscription {:?} torn down", id);
                watchers.lock().retain(|w| w.id != id);
            }
        })
    }

    async fn server_timestamp(&self) -> Result<Timestamp> {
        let mut clock = self.clock.lock();
        let now = Utc::now();

        let next = if now > *clock {
            now
        } else {
            *clock + Duration::microseconds(1)
        };

        *clock = next;
        Ok(next)
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Stages the writes of one transaction against a snapshot of the state.
struct MemoryTransaction<'a> {
    state: &'a State,
    writes: Vec<Write>,
}

enum Write {
    Set { path: String, fields: Fields },
    Delete { path: String },
}

impl TransactionOps for MemoryTransaction<'_> {
    fn get(&mut self, path: &DocumentPath) -> Result<Option<Document>> {
        Ok(self
            .state
            .documents
            .get(path.as_str())
            .map(|fields| Document {
                path: path.clone(),
                fields: fields.clone(),
            }))
    }

    fn query(&mut self, query: &Query) -> Result<Vec<Document>> {
        Ok(MemoryStore::evaluate(self.state, query))
    }

    fn set(&mut self, path: &DocumentPath, fields: Fields) {
        self.writes.push(Write::Set {
            path: path.as_str().to_string(),
            fields,
        });
    }

    fn delete(&mut self, path: &DocumentPath) {
        self.writes.push(Write::Delete {
            path: path.as_str().to_string(),
        });
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::CollectionPath;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(fields) => fields,
            _ => unreachable!(),
        }
    }

    fn rooms() -> CollectionPath {
        CollectionPath::new("artifacts/app/rooms")
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        let path = rooms().doc("AAAAAA");

        assert!(store.get(&path).await.unwrap().is_none());

        store
            .set(&path, fields(json!({ "users": ["A"] })))
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().expect("document exists");
        assert_eq!(doc.fields, fields(json!({ "users": ["A"] })));

        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());

        // Deleting again is a no-op
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = MemoryStore::new();

        store
            .set(&rooms().doc("AAAAAA"), fields(json!({ "users": ["A"] })))
            .await
            .unwrap();
        store
            .set(&rooms().doc("BBBBBB"), fields(json!({ "users": ["A", "B"] })))
            .await
            .unwrap();
        store
            .set(&rooms().doc("CCCCCC"), fields(json!({ "users": ["C"] })))
            .await
            .unwrap();

        let all = store.query(&Query::all(rooms())).await.unwrap();
        assert_eq!(all.len(), 3);

        let with_a = store
            .query(&Query::array_contains(rooms(), "users", "A"))
            .await
            .unwrap();
        assert_eq!(with_a.len(), 2);

        let exact = store
            .query(&Query::field_equals(rooms(), "users", json!(["C"])))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].path.id(), "CCCCCC");
    }

    #[tokio::test]
    async fn test_query_ignores_subcollections() {
        let store = MemoryStore::new();
        let users = CollectionPath::new("artifacts/app/users");

        store
            .set(&users.doc("A"), fields(json!({ "userId": "A" })))
            .await
            .unwrap();
        store
            .set(
                &DocumentPath::new("artifacts/app/users/A/profile/userProfile"),
                fields(json!({ "username": "alice" })),
            )
            .await
            .unwrap();

        let found = store.query(&Query::all(users)).await.unwrap();
        assert_eq!(
            found.len(),
            1,
            "only direct children should match a collection query"
        );
        assert_eq!(found[0].path.id(), "A");
    }

    #[tokio::test]
    async fn test_transaction_commits_atomically() {
        let store = MemoryStore::new();
        let first = rooms().doc("AAAAAA");
        let second = rooms().doc("BBBBBB");

        store
            .run_transaction(|tx: &mut Transaction| {
                tx.set(&first, fields(json!({ "users": ["A"] })));
                tx.set(&second, fields(json!({ "users": ["B"] })));
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.get(&first).await.unwrap().is_some());
        assert!(store.get(&second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_transaction_discards_writes() {
        let store = MemoryStore::new();
        let path = rooms().doc("AAAAAA");

        let result: Result<()> = store
            .run_transaction(|tx: &mut Transaction| {
                tx.set(&path, fields(json!({ "users": ["A"] })));
                Err(StoreError::Internal("boom".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(
            store.get(&path).await.unwrap().is_none(),
            "staged writes should be discarded on failure"
        );
    }

    #[tokio::test]
    async fn test_transaction_reads_and_queries() {
        let store = MemoryStore::new();
        let path = rooms().doc("AAAAAA");

        store
            .set(&path, fields(json!({ "users": ["A"] })))
            .await
            .unwrap();

        let count = store
            .run_transaction(|tx: &mut Transaction| {
                let existing = tx.get(&path)?.expect("document visible in transaction");
                assert_eq!(existing.fields, fields(json!({ "users": ["A"] })));

                let matched = tx.query(&Query::array_contains(rooms(), "users", "A"))?;
                Ok(matched.len())
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_offline_refuses_writes_but_serves_reads() {
        let store = MemoryStore::new();
        let path = rooms().doc("AAAAAA");

        store
            .set(&path, fields(json!({ "users": ["A"] })))
            .await
            .unwrap();

        store.set_online(false);

        assert!(matches!(
            store.set(&path, fields(json!({}))).await,
            Err(StoreError::Offline)
        ));
        assert!(matches!(
            store.delete(&path).await,
            Err(StoreError::Offline)
        ));
        assert!(matches!(
            store
                .run_transaction(|_tx: &mut Transaction| Ok(()))
                .await,
            Err(StoreError::Offline)
        ));

        let doc = store.get(&path).await.unwrap();
        assert!(doc.is_some(), "reads should still serve from held state");

        store.set_online(true);
        store.set(&path, fields(json!({}))).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let store = MemoryStore::new();
        let query = Query::array_contains(rooms(), "users", "A");

        let mut subscription = store.subscribe(&query);

        let initial = subscription.next().await.expect("initial snapshot");
        assert!(initial.is_empty());

        // A non-matching write should not produce a snapshot
        store
            .set(&rooms().doc("BBBBBB"), fields(json!({ "users": ["B"] })))
            .await
            .unwrap();

        store
            .set(&rooms().doc("AAAAAA"), fields(json!({ "users": ["A"] })))
            .await
            .unwrap();

        let snapshot = subscription.next().await.expect("snapshot after change");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].path.id(), "AAAAAA");

        assert_eq!(store.watcher_count(), 1);
        drop(subscription);
        assert_eq!(
            store.watcher_count(),
            0,
            "dropping the subscription should tear the watcher down"
        );
    }

    #[tokio::test]
    async fn test_server_timestamp_is_monotonic() {
        let store = MemoryStore::new();

        let mut previous = store.server_timestamp().await.unwrap();

        for _ in 0..100 {
            let next = store.server_timestamp().await.unwrap();
            assert!(next > previous, "timestamps should strictly increase");
            previous = next;
        }
    }
}
