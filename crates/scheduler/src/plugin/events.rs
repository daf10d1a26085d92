use api_types::NamespacedName;
use k8s_openapi::api::core::v1::Pod;
use tracing::error;
use tracing::info;

use super::queue::WorkSubmitter;
use super::transitions::BoundsTransition;
use super::transitions::CompletionTransition;
use super::transitions::ScalingTransition;
use crate::infrastructure::k8s::pod::is_vm_pod;
use crate::infrastructure::k8s::pod::pod_completed;
use crate::infrastructure::k8s::pod::vm_name;
use crate::infrastructure::k8s::vm::extract_vm_info;
use crate::infrastructure::k8s::VirtualMachine;
use crate::watch::WatchHandlers;
use crate::watch::WatchObject;

/// Turns pod completions and deletions into buffer releases, and reports
/// new VM pods so their VM's buffer can be reserved.
#[derive(Debug, Clone)]
pub struct PodEventHandlers {
    submitter: WorkSubmitter,
}

impl PodEventHandlers {
    pub fn new(submitter: WorkSubmitter) -> Self {
        Self { submitter }
    }

    fn release(&self, pod: &Pod) {
        let name = pod.key();
        if is_vm_pod(pod) {
            self.submitter.submit_vm_deletion(name);
        } else {
            self.submitter.submit_pod_deletion(name);
        }
    }
}

impl WatchHandlers<Pod> for PodEventHandlers {
    fn on_add(&mut self, pod: &Pod) {
        if pod_completed(pod) {
            return;
        }
        if let Some(vm) = vm_name(pod) {
            self.submitter.submit_vm_pod_started(pod.key(), vm);
        }
    }

    fn on_update(&mut self, old: &Pod, new: &Pod) {
        let transition = CompletionTransition::on_update(pod_completed(old), pod_completed(new));
        if transition == CompletionTransition::Released {
            info!(pod = %new.key(), "Pod completed");
            self.release(new);
        }
    }

    fn on_delete(&mut self, pod: &Pod, may_be_stale: bool) {
        match CompletionTransition::on_delete(pod_completed(pod)) {
            CompletionTransition::Released => {
                info!(pod = %pod.key(), may_be_stale, "Pod deleted");
                self.release(pod);
            }
            CompletionTransition::Unchanged => {
                info!(pod = %pod.key(), may_be_stale, "Completed pod deleted");
            }
        }
    }
}

/// Tracks VM scaling settings: reserves buffer for newly seen VMs, updates
/// it when bounds change and releases it when scaling is disabled.
///
/// VM deletions are not handled here; the VM's pod going away releases its
/// buffer.
#[derive(Debug, Clone)]
pub struct VmEventHandlers {
    submitter: WorkSubmitter,
}

impl VmEventHandlers {
    pub fn new(submitter: WorkSubmitter) -> Self {
        Self { submitter }
    }
}

impl WatchHandlers<VirtualMachine> for VmEventHandlers {
    fn on_add(&mut self, vm: &VirtualMachine) {
        if !vm.scaling_enabled() {
            return;
        }
        let Some(pod_name) = vm.pod_name() else {
            info!(vm = %vm.key(), "VM has no pod yet, not reserving buffer");
            return;
        };
        match extract_vm_info(vm) {
            Ok(vm_info) => self.submitter.submit_vm_observed(vm_info, pod_name),
            Err(e) => error!(vm = %vm.key(), "Error extracting VM info: {e}"),
        }
    }

    fn on_update(&mut self, old: &VirtualMachine, new: &VirtualMachine) {
        let old_info = match extract_vm_info(old) {
            Ok(vm_info) => vm_info,
            Err(e) => {
                error!(vm = %old.key(), "Error extracting VM info: {e}");
                return;
            }
        };
        let new_info = match extract_vm_info(new) {
            Ok(vm_info) => vm_info,
            Err(e) => {
                error!(vm = %new.key(), "Error extracting VM info: {e}");
                return;
            }
        };

        let Some(pod_name) = new.pod_name() else {
            info!(vm = %new.key(), "Skipping update for VM because .status.podName is empty");
            return;
        };

        match ScalingTransition::between(old_info.scaling_enabled, new_info.scaling_enabled) {
            ScalingTransition::Disabled => {
                let pod = NamespacedName::new(&new_info.namespace, pod_name);
                info!(pod = %pod, "Autoscaling disabled");
                self.submitter.submit_vm_disabled_scaling(pod);
            }
            ScalingTransition::Enabled => {
                info!(vm = %new.key(), pod = pod_name, "Autoscaling enabled");
                self.submitter.submit_vm_observed(new_info, pod_name);
                return;
            }
            ScalingTransition::Unchanged => {}
        }

        match BoundsTransition::between(&old_info, old.pod_name(), &new_info, Some(pod_name)) {
            BoundsTransition::Unchanged => {}
            // the old pod is released by its own deletion
            BoundsTransition::PodChanged => {
                if new_info.scaling_enabled {
                    info!(vm = %new.key(), pod = pod_name, "VM moved to a new pod");
                    self.submitter.submit_vm_observed(new_info, pod_name);
                }
            }
            BoundsTransition::Changed => {
                info!(vm = %new.key(), pod = pod_name, "Scaling bounds changed");
                self.submitter.submit_vm_bounds_changed(new_info, pod_name);
            }
        }
    }
}
