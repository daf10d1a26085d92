use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;

use crate::infrastructure::k8s::VirtualMachine;
use crate::plugin::Ledger;
use crate::watch::WatchStore;

/// Long-lived components shared by the application tasks.
pub struct ApplicationServices {
    pub ledger: Arc<Ledger>,
    pub pod_store: WatchStore<Pod>,
    pub vm_store: WatchStore<VirtualMachine>,
}
