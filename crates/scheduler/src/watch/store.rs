use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use api_types::NamespacedName;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Objects and collection version of the mirror.
#[derive(Debug)]
pub(crate) struct Snapshot<T> {
    pub(crate) objects: BTreeMap<NamespacedName, T>,
    pub(crate) resource_version: String,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            resource_version: String::new(),
        }
    }
}

/// State shared between a [`WatchStore`] and its background task.
#[derive(Debug)]
pub(crate) struct Shared<T> {
    snapshot: RwLock<Snapshot<T>>,
    synced: AtomicBool,
    failing: AtomicBool,
    /// Cancelled once the background task has exited.
    finished: CancellationToken,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Self {
            snapshot: RwLock::new(Snapshot::default()),
            synced: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            finished: CancellationToken::new(),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Snapshot<T>> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Snapshot<T>> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.cancel();
    }
}

/// Read handle on the local mirror of one resource collection.
///
/// Cloning the handle is cheap; all clones observe the same mirror.
#[derive(Debug)]
pub struct WatchStore<T> {
    shared: Arc<Shared<T>>,
    relist_tx: mpsc::UnboundedSender<oneshot::Sender<()>>,
    token: CancellationToken,
}

impl<T> Clone for WatchStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            relist_tx: self.relist_tx.clone(),
            token: self.token.clone(),
        }
    }
}

impl<T: Clone> WatchStore<T> {
    pub(crate) fn new(
        shared: Arc<Shared<T>>,
        relist_tx: mpsc::UnboundedSender<oneshot::Sender<()>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            shared,
            relist_tx,
            token,
        }
    }

    pub fn get(&self, key: &NamespacedName) -> Option<T> {
        self.shared.read().objects.get(key).cloned()
    }

    /// All objects, ordered by namespace and name.
    pub fn items(&self) -> Vec<T> {
        self.shared.read().objects.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().objects.is_empty()
    }

    /// Collection version of the most recently processed list or event.
    pub fn resource_version(&self) -> String {
        self.shared.read().resource_version.clone()
    }

    /// Whether the initial list has been applied.
    pub fn is_synced(&self) -> bool {
        self.shared.synced.load(Ordering::Acquire)
    }

    /// Whether the most recent list or watch attempt failed.
    pub fn is_failing(&self) -> bool {
        self.shared.failing.load(Ordering::Acquire)
    }

    /// Asks the background task to replace the mirror with a fresh list.
    ///
    /// The returned receiver resolves once the relist has been applied, or
    /// with an error if the watch stops first.
    pub fn relist(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        // a closed channel drops `tx`, which resolves `rx` with an error
        let _ = self.relist_tx.send(tx);
        rx
    }

    /// Requests the background task to stop.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether the background task has exited.
    pub fn stopped(&self) -> bool {
        self.shared.finished.is_cancelled()
    }

    /// Waits until the background task has exited.
    pub async fn wait_stopped(&self) {
        self.shared.finished.cancelled().await;
    }
}
