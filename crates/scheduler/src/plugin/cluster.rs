use std::fmt;

use api_types::NamespacedName;
use k8s_openapi::api::core::v1::Pod;

use crate::infrastructure::k8s::VirtualMachine;
use crate::watch::WatchStore;

/// Read access to the mirrored cluster state, consulted by the reconciler
/// before it reserves buffer.
pub trait ClusterView: fmt::Debug + Send + Sync + 'static {
    fn pod(&self, key: &NamespacedName) -> Option<Pod>;

    fn vm(&self, key: &NamespacedName) -> Option<VirtualMachine>;
}

/// [`ClusterView`] backed by the pod and VM watch stores.
#[derive(Debug, Clone)]
pub struct StoreClusterView {
    pods: WatchStore<Pod>,
    vms: WatchStore<VirtualMachine>,
}

impl StoreClusterView {
    pub fn new(pods: WatchStore<Pod>, vms: WatchStore<VirtualMachine>) -> Self {
        Self { pods, vms }
    }
}

impl ClusterView for StoreClusterView {
    fn pod(&self, key: &NamespacedName) -> Option<Pod> {
        self.pods.get(key)
    }

    fn vm(&self, key: &NamespacedName) -> Option<VirtualMachine> {
        self.vms.get(key)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use k8s_openapi::api::core::v1::PodStatus;
    use kube::api::ObjectMeta;
    use serde_json::json;

    use super::*;
    use crate::infrastructure::k8s::labels::LABEL_VM;
    use crate::watch::WatchObject;

    /// Pod `ns/<name>` in `phase`, labelled as running `vm` if given.
    pub(crate) fn pod(name: &str, phase: &str, vm: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                labels: vm.map(|vm| [(LABEL_VM.to_string(), vm.to_string())].into()),
                ..Default::default()
            },
            spec: None,
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    /// VM `ns/vm1` with 1 to `cpu_max` CPUs, 1 to 4 one-GiB memory slots
    /// and everything at its minimum, running on `pod_name`.
    pub(crate) fn vm(cpu_max: u32, scaling: bool, pod_name: &str) -> VirtualMachine {
        let enabled = if scaling { "true" } else { "false" };
        serde_json::from_value(json!({
            "metadata": {
                "name": "vm1",
                "namespace": "ns",
                "labels": {
                    "autoscaling.neon.tech/enabled": enabled
                }
            },
            "spec": {
                "guest": {
                    "cpus": { "min": 1, "max": cpu_max, "use": 1 },
                    "memorySlots": { "min": 1, "max": 4, "use": 1 },
                    "memorySlotSize": "1Gi"
                }
            },
            "status": { "podName": pod_name }
        }))
        .expect("should deserialize VirtualMachine")
    }

    /// In-memory [`ClusterView`] that tests update alongside the events they
    /// deliver, the way a watch store is updated before its handlers run.
    #[derive(Debug, Default)]
    pub(crate) struct FakeCluster {
        pods: Mutex<BTreeMap<NamespacedName, Pod>>,
        vms: Mutex<BTreeMap<NamespacedName, VirtualMachine>>,
    }

    impl FakeCluster {
        pub(crate) fn set_pod(&self, pod: &Pod) {
            self.pods
                .lock()
                .expect("pods lock poisoned")
                .insert(pod.key(), pod.clone());
        }

        pub(crate) fn remove_pod(&self, pod: &Pod) {
            self.pods
                .lock()
                .expect("pods lock poisoned")
                .remove(&pod.key());
        }

        pub(crate) fn set_vm(&self, vm: &VirtualMachine) {
            self.vms
                .lock()
                .expect("vms lock poisoned")
                .insert(vm.key(), vm.clone());
        }
    }

    impl ClusterView for FakeCluster {
        fn pod(&self, key: &NamespacedName) -> Option<Pod> {
            self.pods.lock().expect("pods lock poisoned").get(key).cloned()
        }

        fn vm(&self, key: &NamespacedName) -> Option<VirtualMachine> {
            self.vms.lock().expect("vms lock poisoned").get(key).cloned()
        }
    }
}
