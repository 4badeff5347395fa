//! Sync engine orchestration
//!
//! The engine drains the mutation queue against the remote authority in
//! bounded concurrent batches, classifies failures, and reports through the
//! status broadcaster. It is an explicitly constructed service object meant
//! to be owned by the application root and cloned into whatever needs it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::{
    diff_fields, entity_id, now_ms, ConflictItem, OfflineRecord, SyncAction, SyncQueueItem,
    SyncStatus,
};
use crate::queue::MutationQueue;
use crate::remote::{ConflictDetails, RemoteApi, RemoteError};
use crate::status::StatusBroadcaster;
use crate::store::{shared, DurableStore, SharedStore};

/// Offline-first sync engine.
///
/// Cloning is cheap and every clone drives the same underlying state; there
/// is no hidden global instance. The engine starts offline - feed it the
/// network presence signal via [`SyncEngine::set_online`] or
/// [`SyncEngine::watch_presence`].
#[derive(Clone)]
pub struct SyncEngine {
    store: SharedStore,
    queue: MutationQueue,
    remote: Arc<dyn RemoteApi>,
    config: SyncConfig,
    conflicts: Arc<Mutex<Vec<ConflictItem>>>,
    errors: Arc<Mutex<Vec<String>>>,
    last_sync_time: Arc<Mutex<Option<i64>>>,
    syncing: Arc<AtomicBool>,
    online: Arc<AtomicBool>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    broadcaster: StatusBroadcaster,
}

/// Outcome of one remote call for one queue item
enum ItemOutcome {
    /// Remote accepted the mutation; canonical payload present for
    /// create/update, absent for delete
    Success(Option<Value>),
    /// Remote failed; classified once the retry budget is exhausted
    Failure(RemoteError),
}

impl SyncEngine {
    /// Create an engine over the given store and remote client
    pub fn new(
        store: impl DurableStore + 'static,
        remote: Arc<dyn RemoteApi>,
        config: SyncConfig,
    ) -> Self {
        let store = shared(store);
        let queue = MutationQueue::new(Arc::clone(&store));
        Self {
            store,
            queue,
            remote,
            config,
            conflicts: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            last_sync_time: Arc::new(Mutex::new(None)),
            syncing: Arc::new(AtomicBool::new(false)),
            online: Arc::new(AtomicBool::new(false)),
            timer: Arc::new(Mutex::new(None)),
            broadcaster: StatusBroadcaster::new(),
        }
    }

    /// Whether the engine currently believes the network is reachable
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Queue a local mutation.
    ///
    /// The mutation is applied to the local replica immediately, persisted
    /// into the queue, and - when online - an opportunistic sync pass is
    /// started without waiting for it. This call never fails for remote
    /// reasons.
    pub async fn enqueue(
        &self,
        action: SyncAction,
        collection: &str,
        payload: Value,
    ) -> Result<SyncQueueItem> {
        let item = self.queue.enqueue(action, collection, payload).await?;
        self.apply_local(&item).await?;
        self.broadcast_status().await?;

        if self.is_online() {
            self.spawn_pass();
        }

        Ok(item)
    }

    /// Trigger a sync pass now, joining it before returning.
    ///
    /// Fails synchronously with [`Error::Offline`] when the network is
    /// down. If a pass is already in flight the call coalesces into it and
    /// returns without starting a second one.
    pub async fn manual_sync(&self) -> Result<()> {
        if !self.is_online() {
            return Err(Error::Offline);
        }
        self.sync_once().await
    }

    /// Current status snapshot
    pub async fn status(&self) -> Result<SyncStatus> {
        self.compute_status().await
    }

    /// Subscribe to status snapshots; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.broadcaster.subscribe()
    }

    /// Read a replica record
    pub async fn get_record(&self, collection: &str, id: &str) -> Result<Option<OfflineRecord>> {
        self.store.lock().await.get(collection, id)
    }

    /// Read all replica records in a collection
    pub async fn get_records(&self, collection: &str) -> Result<Vec<OfflineRecord>> {
        self.store.lock().await.get_all(collection)
    }

    /// Feed a network presence transition.
    ///
    /// Going online resumes the periodic timer and starts an immediate
    /// pass; going offline cancels the timer without interrupting a pass
    /// that is already in flight. Repeated signals in the same state are
    /// no-ops.
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return;
        }

        if online {
            tracing::info!("network online; resuming periodic sync");
            self.start_timer();
            self.spawn_pass();
        } else {
            tracing::info!("network offline; suspending periodic sync");
            self.stop_timer();
        }
    }

    /// Forward an external presence signal into the engine.
    ///
    /// The returned task runs until the sender side of the channel is
    /// dropped.
    pub fn watch_presence(&self, mut presence: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.set_online(*presence.borrow());
            while presence.changed().await.is_ok() {
                let online = *presence.borrow();
                engine.set_online(online);
            }
        })
    }

    /// Resolve a conflict by re-submitting the local payload as a fresh
    /// update, subject to the normal queue and retry path
    pub async fn resolve_with_local(
        &self,
        collection: &str,
        conflict_id: &str,
    ) -> Result<SyncQueueItem> {
        let conflict = self.take_conflict(collection, conflict_id)?;
        tracing::info!(
            "resolving conflict for {}/{} with local payload",
            conflict.collection,
            conflict.id
        );
        self.enqueue(SyncAction::Update, &conflict.collection, conflict.local_payload)
            .await
    }

    /// Resolve a conflict by adopting the server payload into the local
    /// replica; no new queue item is created
    pub async fn resolve_with_server(&self, collection: &str, conflict_id: &str) -> Result<()> {
        let conflict = self.take_conflict(collection, conflict_id)?;
        tracing::info!(
            "resolving conflict for {}/{} with server payload",
            conflict.collection,
            conflict.id
        );
        let record =
            OfflineRecord::from_server(&conflict.collection, conflict.server_payload, now_ms())?;
        self.store.lock().await.put(&record)?;
        self.broadcast_status().await?;
        Ok(())
    }

    /// Resolve a conflict with a caller-merged payload; behaves like
    /// [`SyncEngine::resolve_with_local`] with the supplied data
    pub async fn resolve_with_merge(
        &self,
        collection: &str,
        conflict_id: &str,
        merged: Value,
    ) -> Result<SyncQueueItem> {
        if entity_id(&merged) != Some(conflict_id) {
            return Err(Error::InvalidInput(
                "merged payload must carry the conflicted entity id".to_string(),
            ));
        }
        let conflict = self.take_conflict(collection, conflict_id)?;
        tracing::info!(
            "resolving conflict for {}/{} with merged payload",
            conflict.collection,
            conflict.id
        );
        self.enqueue(SyncAction::Update, &conflict.collection, merged)
            .await
    }

    /// Apply a queued mutation to the local replica
    async fn apply_local(&self, item: &SyncQueueItem) -> Result<()> {
        let store = self.store.lock().await;
        match item.action {
            SyncAction::Create | SyncAction::Update => {
                let mut record = OfflineRecord::from_local(
                    &item.collection,
                    item.payload.clone(),
                    item.enqueued_at,
                )?;
                // Local edits never advance the server-owned version
                if let Some(existing) = store.get(&item.collection, &record.id)? {
                    record.version = record.version.max(existing.version);
                }
                store.put(&record)
            }
            SyncAction::Delete => {
                let entity = item.entity_id().unwrap_or_default();
                store.delete(&item.collection, entity)
            }
        }
    }

    /// Start a pass in the background, coalescing into any pass already
    /// running
    fn spawn_pass(&self) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(error) = engine.sync_once().await {
                tracing::warn!("background sync pass failed: {error}");
            }
        });
    }

    /// Run one sync pass, enforcing the single-flight invariant.
    ///
    /// A trigger arriving while a pass is in flight collapses into that
    /// pass and returns immediately; it does not queue a follow-up.
    async fn sync_once(&self) -> Result<()> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync already in flight; coalescing trigger");
            return Ok(());
        }

        let result = self.run_pass().await;
        self.syncing.store(false, Ordering::SeqCst);

        if let Err(broadcast_error) = self.broadcast_status().await {
            tracing::warn!("failed to broadcast status after pass: {broadcast_error}");
        }

        result
    }

    /// Drain a snapshot of the queue in bounded batches
    async fn run_pass(&self) -> Result<()> {
        let snapshot = self.queue.snapshot().await?;
        self.broadcast_status().await?;
        tracing::debug!("sync pass started with {} pending items", snapshot.len());

        let mut pass_errors = Vec::new();
        let mut any_failed = false;
        for batch in snapshot.chunks(self.config.batch_size) {
            // Dispatch the whole batch concurrently and join only after
            // every item settles; one failure never cancels siblings, and
            // the next batch waits for this one
            let outcomes = join_all(batch.iter().map(|item| self.dispatch(item))).await;
            for (item, outcome) in batch.iter().zip(outcomes) {
                any_failed |= matches!(outcome, ItemOutcome::Failure(_));
                self.apply_outcome(item, outcome, &mut pass_errors).await?;
            }
        }

        *lock(&self.last_sync_time) = Some(now_ms());
        {
            let mut errors = lock(&self.errors);
            // Accumulated errors reset only on a fully successful pass;
            // a below-cap failure keeps them visible even though it adds
            // no terminal message of its own
            if !any_failed {
                errors.clear();
            }
            errors.append(&mut pass_errors);
        }

        tracing::debug!("sync pass finished");
        Ok(())
    }

    /// Invoke the remote operation matching the item's action
    async fn dispatch(&self, item: &SyncQueueItem) -> ItemOutcome {
        // Enqueue validated the payload, so the entity id is present
        let entity = item.entity_id().unwrap_or_default();
        let result = match item.action {
            SyncAction::Create => self
                .remote
                .create(&item.collection, &item.payload)
                .await
                .map(Some),
            SyncAction::Update => self
                .remote
                .update(&item.collection, entity, &item.payload)
                .await
                .map(Some),
            SyncAction::Delete => self
                .remote
                .delete(&item.collection, entity)
                .await
                .map(|()| None),
        };

        match result {
            Ok(canonical) => ItemOutcome::Success(canonical),
            Err(error) => ItemOutcome::Failure(error),
        }
    }

    /// Update queue, replica, and conflict state for one settled item
    async fn apply_outcome(
        &self,
        item: &SyncQueueItem,
        outcome: ItemOutcome,
        pass_errors: &mut Vec<String>,
    ) -> Result<()> {
        match outcome {
            ItemOutcome::Success(canonical) => {
                self.queue.dequeue(&item.id).await?;
                if let Some(payload) = canonical {
                    let record = OfflineRecord::from_server(&item.collection, payload, now_ms())?;
                    self.store.lock().await.put(&record)?;
                }
                tracing::debug!("synced {}", item.id);
                Ok(())
            }
            ItemOutcome::Failure(error) => {
                let mut item = item.clone();
                item.retry_count += 1;
                item.last_error = Some(error.to_string());

                if item.retry_count < self.config.max_retries {
                    tracing::debug!(
                        "attempt {}/{} failed for {}: {error}",
                        item.retry_count,
                        self.config.max_retries,
                        item.id
                    );
                    // Persist progress so retries survive a restart
                    return self.queue.persist(&item).await;
                }

                match error {
                    RemoteError::Conflict(details) => {
                        tracing::warn!(
                            "conflict for {} after {} attempts; awaiting explicit resolution",
                            item.id,
                            item.retry_count
                        );
                        let conflict = build_conflict(&item, details);
                        lock(&self.conflicts).push(conflict);
                        self.queue.dequeue(&item.id).await
                    }
                    RemoteError::Transient(message) => {
                        tracing::warn!(
                            "dropping {} after {} attempts: {message}",
                            item.id,
                            item.retry_count
                        );
                        pass_errors.push(format!(
                            "{} {}/{} failed after {} attempts: {message}",
                            item.action,
                            item.collection,
                            item.entity_id().unwrap_or_default(),
                            item.retry_count
                        ));
                        self.queue.dequeue(&item.id).await
                    }
                }
            }
        }
    }

    /// Remove and return a conflict, keyed by collection and entity id;
    /// entities in different collections may share ids
    fn take_conflict(&self, collection: &str, conflict_id: &str) -> Result<ConflictItem> {
        let mut conflicts = lock(&self.conflicts);
        let index = conflicts
            .iter()
            .position(|conflict| conflict.collection == collection && conflict.id == conflict_id)
            .ok_or_else(|| Error::ConflictNotFound(format!("{collection}/{conflict_id}")))?;
        Ok(conflicts.remove(index))
    }

    async fn compute_status(&self) -> Result<SyncStatus> {
        let pending_count = self.queue.len().await?;
        Ok(SyncStatus {
            is_syncing: self.syncing.load(Ordering::SeqCst),
            last_sync_time: *lock(&self.last_sync_time),
            pending_count,
            conflicts: lock(&self.conflicts).clone(),
            errors: lock(&self.errors).clone(),
        })
    }

    async fn broadcast_status(&self) -> Result<()> {
        let status = self.compute_status().await?;
        self.broadcaster.publish(status);
        Ok(())
    }

    /// Start the periodic trigger; each fire runs as its own task so that
    /// cancelling the timer never interrupts an in-flight pass
    fn start_timer(&self) {
        let engine = self.clone();
        let interval = self.config.sync_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The transition itself already fires a pass
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.spawn_pass();
            }
        });

        if let Some(previous) = lock(&self.timer).replace(handle) {
            previous.abort();
        }
    }

    fn stop_timer(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

/// Build the conflict record handed to the caller for explicit resolution
fn build_conflict(item: &SyncQueueItem, details: ConflictDetails) -> ConflictItem {
    let conflicting_fields = if details.conflicting_fields.is_empty() {
        diff_fields(&item.payload, &details.server_payload)
    } else {
        details.conflicting_fields
    };

    ConflictItem {
        id: item.entity_id().unwrap_or_default().to_string(),
        collection: item.collection.clone(),
        local_payload: item.payload.clone(),
        server_payload: details.server_payload,
        local_timestamp: item.enqueued_at,
        server_timestamp: details.server_timestamp,
        conflicting_fields,
    }
}

/// Lock a std mutex, recovering from poisoning (state stays usable)
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
