use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::RunArgs;
use crate::plugin::WorkQueue;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    run_args: RunArgs,
    work_queue: Option<WorkQueue>,
    cancellation_token: CancellationToken,
}

impl Application {
    pub fn new(
        services: ApplicationServices,
        run_args: RunArgs,
        work_queue: WorkQueue,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            services,
            run_args,
            work_queue: Some(work_queue),
            cancellation_token,
        }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn run_args(&self) -> &RunArgs {
        &self.run_args
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting all application tasks...");

        let work_queue = self
            .work_queue
            .take()
            .ok_or_else(|| anyhow::anyhow!("Application has already been run"))?;

        let mut tasks = Tasks::new(self.cancellation_token.clone());
        tasks.spawn_all_tasks(self, work_queue);

        if let Err(e) = tasks.wait_for_completion(self.run_args.shutdown_timeout()).await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }

    /// Stops the watches and waits for them to exit.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application...");

        self.cancellation_token.cancel();
        let stopped = async {
            self.services.pod_store.wait_stopped().await;
            self.services.vm_store.wait_stopped().await;
        };
        if tokio::time::timeout(self.run_args.shutdown_timeout(), stopped)
            .await
            .is_err()
        {
            tracing::warn!("Watches did not stop within {:?}", self.run_args.shutdown_timeout());
        }

        let totals = self.services.ledger.total_buffer();
        tracing::info!(
            entries = self.services.ledger.len(),
            cpu_buffer = totals.cpu,
            mem_buffer = totals.mem,
            "Application shutdown completed"
        );
        Ok(())
    }
}
