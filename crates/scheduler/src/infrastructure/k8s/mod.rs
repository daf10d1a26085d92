//! Kubernetes integration module.
//!
//! Resource definitions and object helpers for the two collections the
//! scheduler watches:
//! - [`Pod`](k8s_openapi::api::core::v1::Pod): completion and VM ownership
//! - [`VirtualMachine`]: scaling settings, projected into
//!   [`VmInfo`](api_types::VmInfo)

pub mod labels;
pub mod pod;
pub mod types;
pub mod vm;

pub use types::KubernetesError;
pub use vm::VirtualMachine;
