use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use thiserror::Error;

use crate::NamespacedName;

/// CPU amount in thousandths of a core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MilliCpu(pub u32);

impl MilliCpu {
    /// Parses the Kubernetes quantity forms used for VM CPUs: `"250m"`,
    /// `"1"` or `"1.5"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(milli) = s.strip_suffix('m') {
            return milli.parse().ok().map(Self);
        }
        s.parse::<f64>().ok().and_then(Self::from_cores)
    }

    /// Converts a number of cores, rejecting negative and out of range
    /// amounts.
    pub fn from_cores(cores: f64) -> Option<Self> {
        let milli = (cores * 1000.0).round();
        if milli.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&milli) {
            Some(Self(milli as u32))
        } else {
            None
        }
    }
}

/// Accepts both string quantities and bare numbers of cores, since the API
/// server hands back whichever form the object was written with.
impl<'de> Deserialize<'de> for MilliCpu {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(f64),
        }

        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => Self::parse(&s).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid CPU quantity '{s}'"))
            }),
            StringOrNumber::Number(n) => Self::from_cores(n)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid CPU amount {n}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => write!(f, "cpu"),
            ResourceKind::Memory => write!(f, "memory"),
        }
    }
}

/// Reasons a VM object cannot be projected into a [`VmInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmInfoError {
    #[error("{resource} is missing its {field} value")]
    MissingValue {
        resource: ResourceKind,
        field: &'static str,
    },

    #[error("invalid quantity for {field}: '{value}'")]
    InvalidQuantity { field: &'static str, value: String },

    #[error("{resource} min {min} is greater than max {max}")]
    MinAboveMax {
        resource: ResourceKind,
        min: u32,
        max: u32,
    },

    #[error("{resource} current value {current} is outside [{min}, {max}]")]
    CurrentOutOfBounds {
        resource: ResourceKind,
        min: u32,
        max: u32,
        current: u32,
    },

    #[error("invalid scaling bounds annotation: {message}")]
    BoundsAnnotation { message: String },

    #[error(
        "{resource} bounds override [{min}, {max}] is outside the VM's bounds [{spec_min}, {spec_max}]"
    )]
    OverrideOutOfBounds {
        resource: ResourceKind,
        min: u32,
        max: u32,
        spec_min: u32,
        spec_max: u32,
    },
}

/// Min, max and current allocation of one resource, in resource units
/// (milli-CPU for CPU, slots for memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
    pub current: u32,
}

impl Bounds {
    pub fn new(
        resource: ResourceKind,
        min: Option<u32>,
        max: Option<u32>,
        current: Option<u32>,
    ) -> Result<Self, VmInfoError> {
        let missing = |field| VmInfoError::MissingValue { resource, field };
        let min = min.ok_or_else(|| missing("min"))?;
        let max = max.ok_or_else(|| missing("max"))?;
        let current = current.ok_or_else(|| missing("use"))?;
        if min > max {
            return Err(VmInfoError::MinAboveMax { resource, min, max });
        }
        if current < min || current > max {
            return Err(VmInfoError::CurrentOutOfBounds {
                resource,
                min,
                max,
                current,
            });
        }
        Ok(Self { min, max, current })
    }

    /// Capacity held between the current allocation and the maximum.
    pub fn buffer(&self) -> u32 {
        self.max.saturating_sub(self.current)
    }

    pub fn same_range(&self, other: &Bounds) -> bool {
        self.min == other.min && self.max == other.max
    }

    fn narrow(&mut self, resource: ResourceKind, min: u32, max: u32) -> Result<(), VmInfoError> {
        if min > max {
            return Err(VmInfoError::MinAboveMax { resource, min, max });
        }
        if min < self.min || max > self.max {
            return Err(VmInfoError::OverrideOutOfBounds {
                resource,
                min,
                max,
                spec_min: self.min,
                spec_max: self.max,
            });
        }
        self.min = min;
        self.max = max;
        Ok(())
    }
}

/// One CPU and memory amount inside a bounds override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResourceAmounts {
    pub cpu: MilliCpu,
    /// Memory slots.
    pub mem: u32,
}

/// Contents of the bounds annotation, which narrows the scaling range a VM
/// declares in its spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScalingBoundsOverride {
    pub min: ResourceAmounts,
    pub max: ResourceAmounts,
}

impl ScalingBoundsOverride {
    pub fn from_json(raw: &str) -> Result<Self, VmInfoError> {
        serde_json::from_str(raw).map_err(|e| VmInfoError::BoundsAnnotation {
            message: e.to_string(),
        })
    }
}

/// Scheduling-relevant projection of a VM object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInfo {
    pub name: String,
    pub namespace: String,
    /// Milli-CPU bounds.
    pub cpu: Bounds,
    /// Memory bounds in slots.
    pub mem: Bounds,
    /// Size of one memory slot in bytes.
    pub mem_slot_size: u64,
    pub scaling_enabled: bool,
}

impl VmInfo {
    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }

    /// Compares only the scaling range; current usage and slot size are
    /// ignored.
    pub fn equal_scaling_bounds(&self, other: &VmInfo) -> bool {
        self.cpu.same_range(&other.cpu) && self.mem.same_range(&other.mem)
    }

    pub fn apply_bounds_override(
        &mut self,
        bounds: &ScalingBoundsOverride,
    ) -> Result<(), VmInfoError> {
        self.cpu
            .narrow(ResourceKind::Cpu, bounds.min.cpu.0, bounds.max.cpu.0)?;
        self.mem
            .narrow(ResourceKind::Memory, bounds.min.mem, bounds.max.mem)
    }

    /// Memory buffer in bytes.
    pub fn mem_buffer_bytes(&self) -> u64 {
        u64::from(self.mem.buffer()).saturating_mul(self.mem_slot_size)
    }
}
