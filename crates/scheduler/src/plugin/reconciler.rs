use std::sync::Arc;

use api_types::NamespacedName;
use api_types::VmInfo;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::cluster::ClusterView;
use super::ledger::Ledger;
use super::ledger::LedgerEntry;
use super::queue::WorkItem;
use super::queue::WorkQueue;
use crate::infrastructure::k8s::pod::pod_completed;
use crate::infrastructure::k8s::vm::extract_vm_info;

/// Single consumer of the work queue; the only writer of the [`Ledger`].
///
/// Entries are created only for pods the cluster view shows as present and
/// not completed, and bounds changes only update existing entries. A pod's
/// removal is queued after its watch store reflects it, so a reservation
/// can never outlive the release of its pod.
#[derive(Debug, Clone)]
pub struct Reconciler {
    ledger: Arc<Ledger>,
    cluster: Arc<dyn ClusterView>,
}

impl Reconciler {
    pub fn new(ledger: Arc<Ledger>, cluster: Arc<dyn ClusterView>) -> Self {
        Self { ledger, cluster }
    }

    /// Applies work items until `token` is cancelled or every submitter is
    /// dropped.
    #[tracing::instrument(skip_all)]
    pub async fn run(self, mut queue: WorkQueue, token: CancellationToken) {
        info!("Reconciler started");
        loop {
            select! {
                _ = token.cancelled() => {
                    info!("Reconciler shutdown requested");
                    break;
                }
                item = queue.recv() => match item {
                    Some(item) => self.apply(item),
                    None => {
                        info!("Work queue closed");
                        break;
                    }
                },
            }
        }
    }

    pub fn apply(&self, item: WorkItem) {
        match item {
            WorkItem::VmObserved { info, pod } => self.reserve(&info, pod),
            WorkItem::VmPodStarted { pod, vm } => {
                let Some(vm_object) = self.cluster.vm(&vm) else {
                    debug!(pod = %pod, vm = %vm, "VM not seen yet, not reserving buffer");
                    return;
                };
                if vm_object.pod_name() != Some(pod.name.as_str()) {
                    debug!(pod = %pod, vm = %vm, "VM does not run on this pod");
                    return;
                }
                match extract_vm_info(&vm_object) {
                    Ok(info) => self.reserve(&info, pod),
                    Err(e) => warn!(pod = %pod, vm = %vm, "Error extracting VM info: {e}"),
                }
            }
            WorkItem::VmBoundsChanged { info, pod } => {
                if !info.scaling_enabled {
                    debug!(pod = %pod, "Scaling disabled, ignoring bounds change");
                    return;
                }
                let entry = LedgerEntry::from_vm_info(&info);
                let cpu_buffer = entry.cpu.buffer;
                let mem_buffer = entry.mem.buffer;
                match self.ledger.update_existing(&pod, entry) {
                    Some(_) => info!(
                        pod = %pod,
                        vm = %info.namespaced_name(),
                        cpu_buffer,
                        mem_buffer,
                        "Updated VM buffer"
                    ),
                    None => debug!(pod = %pod, "Nothing reserved for pod, ignoring bounds change"),
                }
            }
            WorkItem::VmDisabledScaling { pod } => self.release(pod, "scaling disabled"),
            WorkItem::VmDeletion { pod } => self.release(pod, "VM pod removed"),
            WorkItem::PodDeletion { pod } => self.release(pod, "pod removed"),
        }
    }

    fn reserve(&self, info: &VmInfo, pod: NamespacedName) {
        if !info.scaling_enabled {
            debug!(pod = %pod, "Scaling disabled, not reserving buffer");
            return;
        }
        if !self.pod_is_live(&pod) {
            debug!(pod = %pod, "Pod is gone or completed, not reserving buffer");
            return;
        }
        let entry = LedgerEntry::from_vm_info(info);
        let cpu_buffer = entry.cpu.buffer;
        let mem_buffer = entry.mem.buffer;
        let vm = info.namespaced_name();
        match self.ledger.upsert(pod.clone(), entry) {
            Some(_) => info!(pod = %pod, vm = %vm, cpu_buffer, mem_buffer, "Updated VM buffer"),
            None => info!(pod = %pod, vm = %vm, cpu_buffer, mem_buffer, "Reserved VM buffer"),
        }
    }

    fn pod_is_live(&self, pod: &NamespacedName) -> bool {
        self.cluster
            .pod(pod)
            .is_some_and(|pod| !pod_completed(&pod))
    }

    fn release(&self, pod: NamespacedName, reason: &str) {
        match self.ledger.remove(&pod) {
            Some(entry) => info!(
                pod = %pod,
                vm = %entry.vm,
                cpu_buffer = entry.cpu.buffer,
                mem_buffer = entry.mem.buffer,
                "Released VM buffer: {reason}"
            ),
            None => debug!(pod = %pod, "Nothing reserved: {reason}"),
        }
    }
}
