//! Edge detection for pod and VM changes.
//!
//! Each transition is computed from the old and new state of one object and
//! only reports a change on the edge, so replaying an update that changed
//! nothing produces no work.

use api_types::VmInfo;

/// Effect of a pod change on the resources reserved for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTransition {
    /// Still running, or already released when it completed.
    Unchanged,
    /// The pod stopped holding resources.
    Released,
}

impl CompletionTransition {
    pub fn on_update(was_completed: bool, is_completed: bool) -> Self {
        if !was_completed && is_completed {
            Self::Released
        } else {
            Self::Unchanged
        }
    }

    /// A completed pod was released when it completed, so its deletion is a
    /// no-op.
    pub fn on_delete(was_completed: bool) -> Self {
        if was_completed {
            Self::Unchanged
        } else {
            Self::Released
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingTransition {
    Unchanged,
    Enabled,
    Disabled,
}

impl ScalingTransition {
    pub fn between(was_enabled: bool, is_enabled: bool) -> Self {
        match (was_enabled, is_enabled) {
            (false, true) => Self::Enabled,
            (true, false) => Self::Disabled,
            _ => Self::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsTransition {
    Unchanged,
    /// The VM moved to another pod; bounds are not compared.
    PodChanged,
    Changed,
}

impl BoundsTransition {
    pub fn between(
        old: &VmInfo,
        old_pod: Option<&str>,
        new: &VmInfo,
        new_pod: Option<&str>,
    ) -> Self {
        if old_pod != new_pod {
            Self::PodChanged
        } else if old.equal_scaling_bounds(new) {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }
}

#[cfg(test)]
mod tests {
    use api_types::Bounds;
    use similar_asserts::assert_eq;

    use super::*;

    fn info(cpu_max: u32, mem_current: u32) -> VmInfo {
        VmInfo {
            name: "vm1".to_string(),
            namespace: "ns".to_string(),
            cpu: Bounds {
                min: 1000,
                max: cpu_max,
                current: 1000,
            },
            mem: Bounds {
                min: 1,
                max: 4,
                current: mem_current,
            },
            mem_slot_size: 1 << 30,
            scaling_enabled: true,
        }
    }

    #[test]
    fn completion_fires_on_edge_only() {
        assert_eq!(
            CompletionTransition::on_update(false, true),
            CompletionTransition::Released
        );
        assert_eq!(
            CompletionTransition::on_update(true, true),
            CompletionTransition::Unchanged
        );
        assert_eq!(
            CompletionTransition::on_update(false, false),
            CompletionTransition::Unchanged
        );
        assert_eq!(
            CompletionTransition::on_update(true, false),
            CompletionTransition::Unchanged
        );
    }

    #[test]
    fn deleting_completed_pod_releases_nothing() {
        assert_eq!(
            CompletionTransition::on_delete(true),
            CompletionTransition::Unchanged
        );
        assert_eq!(
            CompletionTransition::on_delete(false),
            CompletionTransition::Released
        );
    }

    #[test]
    fn scaling_transitions() {
        assert_eq!(
            ScalingTransition::between(true, false),
            ScalingTransition::Disabled
        );
        assert_eq!(
            ScalingTransition::between(false, true),
            ScalingTransition::Enabled
        );
        assert_eq!(
            ScalingTransition::between(true, true),
            ScalingTransition::Unchanged
        );
        assert_eq!(
            ScalingTransition::between(false, false),
            ScalingTransition::Unchanged
        );
    }

    #[test]
    fn bounds_compare_range_only() {
        let pod = Some("pod1");
        assert_eq!(
            BoundsTransition::between(&info(4000, 1), pod, &info(4000, 3), pod),
            BoundsTransition::Unchanged
        );
        assert_eq!(
            BoundsTransition::between(&info(4000, 1), pod, &info(8000, 1), pod),
            BoundsTransition::Changed
        );
    }

    #[test]
    fn pod_change_takes_precedence() {
        assert_eq!(
            BoundsTransition::between(&info(4000, 1), Some("pod1"), &info(8000, 1), Some("pod2")),
            BoundsTransition::PodChanged
        );
        assert_eq!(
            BoundsTransition::between(&info(4000, 1), None, &info(4000, 1), Some("pod1")),
            BoundsTransition::PodChanged
        );
    }
}
