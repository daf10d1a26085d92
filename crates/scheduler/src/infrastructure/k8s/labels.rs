//! Well-known labels and annotations on pods and VMs.

/// Present on every pod that runs a VM; its value is the VM name.
pub const LABEL_VM: &str = "vm.neon.tech/name";

/// Set to `"true"` on VMs whose resources may be scaled.
pub const LABEL_ENABLE_AUTOSCALING: &str = "autoscaling.neon.tech/enabled";

/// JSON scaling bounds narrowing the VM spec, see
/// [`api_types::ScalingBoundsOverride`].
pub const ANNOTATION_AUTOSCALING_BOUNDS: &str = "autoscaling.neon.tech/bounds";
