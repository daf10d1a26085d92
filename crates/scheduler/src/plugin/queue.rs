use api_types::NamespacedName;
use api_types::VmInfo;
use tokio::sync::mpsc;
use tracing::warn;

/// A ledger mutation requested by the event handlers.
///
/// Every item is keyed by the pod that runs the VM (or the pod itself for
/// non-VM pods).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A VM pod completed or was deleted.
    VmDeletion { pod: NamespacedName },
    /// A non-VM pod completed or was deleted.
    PodDeletion { pod: NamespacedName },
    VmDisabledScaling { pod: NamespacedName },
    VmBoundsChanged { info: VmInfo, pod: NamespacedName },
    /// A scaling-enabled VM was seen running on `pod`.
    VmObserved { info: VmInfo, pod: NamespacedName },
    /// A pod running the VM `vm` appeared.
    VmPodStarted {
        pod: NamespacedName,
        vm: NamespacedName,
    },
}

impl WorkItem {
    pub fn pod(&self) -> &NamespacedName {
        match self {
            WorkItem::VmDeletion { pod }
            | WorkItem::PodDeletion { pod }
            | WorkItem::VmDisabledScaling { pod }
            | WorkItem::VmBoundsChanged { pod, .. }
            | WorkItem::VmObserved { pod, .. }
            | WorkItem::VmPodStarted { pod, .. } => pod,
        }
    }
}

/// Receiving end of the work queue, drained by the reconciler.
#[derive(Debug)]
pub struct WorkQueue {
    receiver: mpsc::UnboundedReceiver<WorkItem>,
}

impl WorkQueue {
    pub fn new() -> (WorkSubmitter, WorkQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (WorkSubmitter { sender }, WorkQueue { receiver })
    }

    /// Waits for the next item; `None` once every submitter is gone.
    pub async fn recv(&mut self) -> Option<WorkItem> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WorkItem> {
        self.receiver.try_recv().ok()
    }
}

/// Non-blocking sending end of the work queue.
///
/// Submissions never wait, so they are safe to make from watch callbacks.
#[derive(Debug, Clone)]
pub struct WorkSubmitter {
    sender: mpsc::UnboundedSender<WorkItem>,
}

impl WorkSubmitter {
    pub fn submit_vm_deletion(&self, pod: NamespacedName) {
        self.submit(WorkItem::VmDeletion { pod });
    }

    pub fn submit_pod_deletion(&self, pod: NamespacedName) {
        self.submit(WorkItem::PodDeletion { pod });
    }

    pub fn submit_vm_disabled_scaling(&self, pod: NamespacedName) {
        self.submit(WorkItem::VmDisabledScaling { pod });
    }

    /// `pod_name` is the VM's pod, in the VM's namespace.
    pub fn submit_vm_bounds_changed(&self, info: VmInfo, pod_name: &str) {
        let pod = NamespacedName::new(&info.namespace, pod_name);
        self.submit(WorkItem::VmBoundsChanged { info, pod });
    }

    pub fn submit_vm_observed(&self, info: VmInfo, pod_name: &str) {
        let pod = NamespacedName::new(&info.namespace, pod_name);
        self.submit(WorkItem::VmObserved { info, pod });
    }

    /// `vm_name` is in the pod's namespace.
    pub fn submit_vm_pod_started(&self, pod: NamespacedName, vm_name: &str) {
        let vm = NamespacedName::new(&pod.namespace, vm_name);
        self.submit(WorkItem::VmPodStarted { pod, vm });
    }

    fn submit(&self, item: WorkItem) {
        if let Err(e) = self.sender.send(item) {
            warn!(pod = %e.0.pod(), "Work queue closed, dropping item");
        }
    }
}

#[cfg(test)]
mod tests {
    use api_types::Bounds;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn submissions_arrive_in_order() {
        let (submitter, mut queue) = WorkQueue::new();
        let info = VmInfo {
            name: "vm1".to_string(),
            namespace: "ns".to_string(),
            cpu: Bounds {
                min: 1000,
                max: 2000,
                current: 1000,
            },
            mem: Bounds {
                min: 1,
                max: 2,
                current: 1,
            },
            mem_slot_size: 1 << 30,
            scaling_enabled: true,
        };

        submitter.submit_vm_observed(info.clone(), "pod1");
        submitter.submit_pod_deletion(NamespacedName::new("ns", "pod2"));

        assert_eq!(
            queue.try_recv(),
            Some(WorkItem::VmObserved {
                info,
                pod: NamespacedName::new("ns", "pod1"),
            })
        );
        assert_eq!(
            queue.try_recv(),
            Some(WorkItem::PodDeletion {
                pod: NamespacedName::new("ns", "pod2"),
            })
        );
        assert_eq!(queue.try_recv(), None);
    }

    #[test]
    fn submitting_to_closed_queue_does_not_block() {
        let (submitter, queue) = WorkQueue::new();
        drop(queue);
        submitter.submit_vm_deletion(NamespacedName::new("ns", "pod1"));
    }
}
