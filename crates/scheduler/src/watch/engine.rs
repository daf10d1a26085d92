use std::sync::Arc;

use error_stack::Report;
use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;
use utils::time_range::TimeRange;

use super::error::requires_relist;
use super::store::Shared;
use super::InitMode;
use super::ListWatch;
use super::WatchConfig;
use super::WatchError;
use super::WatchEvent;
use super::WatchHandlers;
use super::WatchObject;
use super::WatchStore;

/// Starts mirroring the collection behind `client`.
///
/// In [`InitMode::Sync`] the initial list is applied, and `on_add` delivered
/// for every item, before this returns; an error is returned only if that
/// list fails more than [`WatchConfig::initial_list_attempts`] times or
/// `token` is cancelled first. From then on a background task keeps the
/// mirror current until `token` is cancelled, retrying every failure.
pub async fn watch<C, H>(
    client: C,
    config: WatchConfig,
    mode: InitMode,
    handlers: H,
    token: CancellationToken,
) -> Result<WatchStore<C::Item>, Report<WatchError>>
where
    C: ListWatch,
    H: WatchHandlers<C::Item>,
{
    let shared = Arc::new(Shared::new());
    let (relist_tx, relist_rx) = mpsc::unbounded_channel();
    let store = WatchStore::new(shared.clone(), relist_tx, token.clone());

    let mut runner = Runner {
        client,
        config,
        handlers,
        shared,
        relist_rx,
        token,
    };

    match mode {
        InitMode::Sync => {
            if let Err(e) = runner.initial_list().await {
                runner.shared.mark_finished();
                return Err(e);
            }
            tokio::spawn(runner.run());
        }
        InitMode::Async => {
            tokio::spawn(async move {
                if runner.relist().await.is_ok() {
                    runner.shared.mark_synced();
                    runner.run().await;
                } else {
                    runner.shared.mark_finished();
                }
            });
        }
    }

    Ok(store)
}

/// Why a watch stream stopped being consumed.
enum Interrupt {
    Cancelled,
    Closed,
    Failed(Report<WatchError>),
    Expired(Report<WatchError>),
    RelistRequested(oneshot::Sender<()>),
}

struct Cancelled;

struct Runner<C: ListWatch, H> {
    client: C,
    config: WatchConfig,
    handlers: H,
    shared: Arc<Shared<C::Item>>,
    relist_rx: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    token: CancellationToken,
}

impl<C, H> Runner<C, H>
where
    C: ListWatch,
    H: WatchHandlers<C::Item>,
{
    #[tracing::instrument(skip_all, fields(watch = %self.config.log_name))]
    async fn initial_list(&mut self) -> Result<(), Report<WatchError>> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = select! {
                _ = self.token.cancelled() => {
                    return Err(Report::new(WatchError::Cancelled {
                        name: self.config.log_name.clone(),
                    }));
                }
                result = self.client.list() => result,
            };

            match result {
                Ok(list) => {
                    self.apply_list(list);
                    self.shared.set_failing(false);
                    self.shared.mark_synced();
                    info!(attempts, "Initial list complete");
                    return Ok(());
                }
                Err(e) => {
                    self.shared.set_failing(true);
                    if let Some(limit) = self.config.initial_list_attempts {
                        if attempts >= limit.get() {
                            return Err(e.change_context(WatchError::InitialListFailed {
                                name: self.config.log_name.clone(),
                                attempts,
                            }));
                        }
                    }
                    warn!(attempts, "Initial list failed, retrying: {e:?}");
                    let retry = self.config.retry_relist_after;
                    if sleep(&self.token, retry).await.is_err() {
                        return Err(Report::new(WatchError::Cancelled {
                            name: self.config.log_name.clone(),
                        }));
                    }
                }
            }
        }
    }

    #[tracing::instrument(skip_all, fields(watch = %self.config.log_name))]
    async fn run(mut self) {
        info!("Watch started");

        loop {
            let interrupt = self.consume_watch().await;

            let relist_done = match interrupt {
                Interrupt::Cancelled => break,
                Interrupt::Closed => {
                    debug!("Watch stream closed, reopening");
                    let retry = self.config.retry_watch_after;
                    if sleep(&self.token, retry).await.is_err() {
                        break;
                    }
                    continue;
                }
                Interrupt::Failed(e) => {
                    self.shared.set_failing(true);
                    warn!("Watch failed, retrying: {e:?}");
                    let retry = self.config.retry_watch_after;
                    if sleep(&self.token, retry).await.is_err() {
                        break;
                    }
                    continue;
                }
                Interrupt::Expired(e) => {
                    info!("Resource version expired, relisting: {e:?}");
                    None
                }
                Interrupt::RelistRequested(done) => {
                    info!("Relist requested");
                    Some(done)
                }
            };

            if self.relist().await.is_err() {
                break;
            }
            if let Some(done) = relist_done {
                let _ = done.send(());
            }
        }

        info!("Watch stopped");
        self.shared.mark_finished();
    }

    /// Opens a watch from the current resource version and applies its
    /// events until something interrupts it.
    async fn consume_watch(&mut self) -> Interrupt {
        let resource_version = self.shared.read().resource_version.clone();

        let opened = select! {
            _ = self.token.cancelled() => return Interrupt::Cancelled,
            opened = self.client.watch(&resource_version) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) if requires_relist(&e) => return Interrupt::Expired(e),
            Err(e) => return Interrupt::Failed(e),
        };
        self.shared.set_failing(false);
        debug!(resource_version = %resource_version, "Watch opened");

        loop {
            select! {
                biased;
                _ = self.token.cancelled() => return Interrupt::Cancelled,
                Some(done) = self.relist_rx.recv() => return Interrupt::RelistRequested(done),
                event = stream.next() => match event {
                    None => return Interrupt::Closed,
                    Some(Ok(event)) => self.apply_event(event),
                    Some(Err(e)) if requires_relist(&e) => return Interrupt::Expired(e),
                    Some(Err(e)) => return Interrupt::Failed(e),
                },
            }
        }
    }

    /// Lists until success, replacing the mirror with the result.
    async fn relist(&mut self) -> Result<(), Cancelled> {
        loop {
            let result = select! {
                _ = self.token.cancelled() => return Err(Cancelled),
                result = self.client.list() => result,
            };

            match result {
                Ok(list) => {
                    self.apply_list(list);
                    self.shared.set_failing(false);
                    return Ok(());
                }
                Err(e) => {
                    self.shared.set_failing(true);
                    warn!("Relist failed, retrying: {e:?}");
                    let retry = self.config.retry_relist_after;
                    sleep(&self.token, retry).await?;
                }
            }
        }
    }

    /// Replaces the mirror with a list result, delivering the difference to
    /// the handlers. Objects that disappeared are reported as possibly stale
    /// deletions.
    fn apply_list(&mut self, list: C::List) {
        let resource_version = self.client.list_resource_version(&list);
        let items = self.client.items(list);

        let mut snapshot = self.shared.write();
        let mut previous = std::mem::take(&mut snapshot.objects);
        let (mut added, mut updated) = (0usize, 0usize);

        for item in items {
            let key = item.key();
            match previous.remove(&key) {
                Some(old) => {
                    if old.resource_version() != item.resource_version() {
                        self.handlers.on_update(&old, &item);
                        updated += 1;
                    }
                }
                None => {
                    self.handlers.on_add(&item);
                    added += 1;
                }
            }
            snapshot.objects.insert(key, item);
        }

        let removed = previous.len();
        for old in previous.values() {
            self.handlers.on_delete(old, true);
        }

        snapshot.resource_version = resource_version.unwrap_or_default();
        info!(
            objects = snapshot.objects.len(),
            added,
            updated,
            removed,
            resource_version = %snapshot.resource_version,
            "Applied list"
        );
    }

    /// Applies one stream event to the mirror and delivers it to the
    /// handlers while the write lock is held.
    fn apply_event(&mut self, event: WatchEvent<C::Item>) {
        let mut snapshot = self.shared.write();

        match event {
            WatchEvent::Bookmark { resource_version } => {
                snapshot.resource_version = resource_version;
            }
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                if let Some(resource_version) = obj.resource_version() {
                    snapshot.resource_version = resource_version;
                }
                let key = obj.key();
                let old = snapshot.objects.insert(key.clone(), obj);
                if let Some(new) = snapshot.objects.get(&key) {
                    match old {
                        Some(old) => self.handlers.on_update(&old, new),
                        None => self.handlers.on_add(new),
                    }
                }
            }
            WatchEvent::Deleted(obj) => {
                if let Some(resource_version) = obj.resource_version() {
                    snapshot.resource_version = resource_version;
                }
                snapshot.objects.remove(&obj.key());
                self.handlers.on_delete(&obj, false);
            }
        }
    }
}

/// Sleeps for a random duration from `range`, returning early if `token` is
/// cancelled.
async fn sleep(token: &CancellationToken, range: TimeRange) -> Result<(), Cancelled> {
    let delay = range.random();
    select! {
        _ = token.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
