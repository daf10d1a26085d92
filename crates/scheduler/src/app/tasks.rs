use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::core::Application;
use crate::plugin::Reconciler;
use crate::plugin::StoreClusterView;
use crate::plugin::WorkQueue;
use crate::watch::WatchStore;

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Tasks {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token,
        }
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &Application, work_queue: WorkQueue) {
        let reconciler_task = self.spawn_reconciler_task(app, work_queue);
        self.tasks.push(reconciler_task);

        // the watches run on their own tasks; these only report when they exit
        let pod_watch_task = Self::spawn_watch_monitor_task("pods", app.services().pod_store.clone());
        self.tasks.push(pod_watch_task);

        let vm_watch_task = Self::spawn_watch_monitor_task("VMs", app.services().vm_store.clone());
        self.tasks.push(vm_watch_task);
    }

    /// Waits for a shutdown signal, or for any task to exit on its own.
    pub async fn wait_for_completion(&mut self, shutdown_timeout: Duration) -> Result<()> {
        let signal_handler = {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                let mut sigint = signal(SignalKind::interrupt())?;

                tokio::spawn(async move {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown");
                        }
                        _ = sigint.recv() => {
                            tracing::info!("Received SIGINT, initiating graceful shutdown");
                        }
                    }
                })
            }
            #[cfg(not(unix))]
            {
                tokio::spawn(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                })
            }
        };

        tokio::select! {
            _ = signal_handler => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.cancellation_token.cancel();
                self.wait_for_tasks_with_timeout(shutdown_timeout).await;
                Ok(())
            }
            (result, index, remaining) = futures::future::select_all(&mut self.tasks) => {
                drop(remaining);
                self.tasks.remove(index);
                self.cancellation_token.cancel();
                self.wait_for_tasks_with_timeout(shutdown_timeout).await;
                match result {
                    Err(e) => {
                        tracing::error!("Task completed with error: {e}");
                        Err(e.into())
                    }
                    Ok(()) => {
                        tracing::warn!("Task completed unexpectedly");
                        Err(anyhow::anyhow!("background task exited before shutdown"))
                    }
                }
            }
        }
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_reconciler_task(&self, app: &Application, work_queue: WorkQueue) -> JoinHandle<()> {
        let services = app.services();
        let cluster = StoreClusterView::new(services.pod_store.clone(), services.vm_store.clone());
        let reconciler = Reconciler::new(services.ledger.clone(), Arc::new(cluster));
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting reconciler task");
            reconciler.run(work_queue, token).await;
            tracing::info!("Reconciler task completed");
        })
    }

    fn spawn_watch_monitor_task<T>(name: &'static str, store: WatchStore<T>) -> JoinHandle<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            store.wait_stopped().await;
            tracing::info!(watch = name, "Watch stopped");
        })
    }
}
