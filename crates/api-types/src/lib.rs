//! Shared API type definitions
//!
//! This crate contains the domain types exchanged between the watch pipeline
//! and the scheduler state: object identities and the scheduling-relevant
//! projection of a VM.

mod vm_info;

use std::fmt;

pub use vm_info::Bounds;
pub use vm_info::MilliCpu;
pub use vm_info::ResourceAmounts;
pub use vm_info::ResourceKind;
pub use vm_info::ScalingBoundsOverride;
pub use vm_info::VmInfo;
pub use vm_info::VmInfoError;

/// Identity of a namespaced cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn display_joins_with_slash() {
        assert_eq!(NamespacedName::new("ns", "pod1").to_string(), "ns/pod1");
    }
}
