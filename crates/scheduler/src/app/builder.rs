use std::sync::Arc;

use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::app::Application;
use crate::app::ApplicationServices;
use crate::config::RunArgs;
use crate::infrastructure::k8s::VirtualMachine;
use crate::infrastructure::kube_client::init_kube_client;
use crate::plugin::Ledger;
use crate::plugin::PodEventHandlers;
use crate::plugin::VmEventHandlers;
use crate::plugin::WorkQueue;
use crate::watch;
use crate::watch::InitMode;
use crate::watch::KubeListWatch;

/// Application builder
pub struct ApplicationBuilder {
    run_args: RunArgs,
}

impl ApplicationBuilder {
    pub fn new(run_args: RunArgs) -> Self {
        Self { run_args }
    }

    /// Connects to the cluster and starts both watches.
    ///
    /// Pods are watched first so that no completion is missed for a pod whose
    /// VM is reserved by the initial VM list. Both initial lists complete
    /// before this returns.
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let client = init_kube_client(self.run_args.kubeconfig.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {e:?}"))?;

        let cancellation_token = CancellationToken::new();
        let (submitter, work_queue) = WorkQueue::new();
        let ledger = Arc::new(Ledger::new());

        let pod_store = watch::watch(
            KubeListWatch::new(self.api::<Pod>(&client)),
            self.run_args.pod_watch_config(),
            InitMode::Sync,
            PodEventHandlers::new(submitter.clone()),
            cancellation_token.child_token(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start pod watch: {e:?}"))?;

        let vm_store = match watch::watch(
            KubeListWatch::new(self.api::<VirtualMachine>(&client)),
            self.run_args.vm_watch_config(),
            InitMode::Sync,
            VmEventHandlers::new(submitter),
            cancellation_token.child_token(),
        )
        .await
        {
            Ok(store) => store,
            Err(e) => {
                pod_store.stop();
                return Err(anyhow::anyhow!("Failed to start VM watch: {e:?}"));
            }
        };

        tracing::info!(
            pods = pod_store.len(),
            vms = vm_store.len(),
            "Initial cluster state loaded"
        );

        let services = ApplicationServices {
            ledger,
            pod_store,
            vm_store,
        };

        Ok(Application::new(
            services,
            self.run_args,
            work_queue,
            cancellation_token,
        ))
    }

    fn api<K>(&self, client: &Client) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.run_args.namespace {
            Some(namespace) => Api::namespaced(client.clone(), namespace),
            None => Api::all(client.clone()),
        }
    }
}
