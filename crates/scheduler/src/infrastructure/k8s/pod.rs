use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use super::labels::LABEL_VM;

/// Whether the pod reached a terminal phase.
pub fn pod_completed(pod: &Pod) -> bool {
    let phase = pod.status.as_ref().and_then(|status| status.phase.as_deref());
    matches!(phase, Some("Succeeded") | Some("Failed"))
}

/// Whether the pod runs a VM and so may hold a ledger entry.
pub fn is_vm_pod(pod: &Pod) -> bool {
    vm_name(pod).is_some()
}

/// Name of the VM the pod runs, in the pod's namespace.
pub fn vm_name(pod: &Pod) -> Option<&str> {
    pod.labels().get(LABEL_VM).map(String::as_str)
}
