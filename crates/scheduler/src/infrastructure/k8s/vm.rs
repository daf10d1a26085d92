use std::borrow::Cow;

use api_types::Bounds;
use api_types::MilliCpu;
use api_types::ResourceKind;
use api_types::ScalingBoundsOverride;
use api_types::VmInfo;
use api_types::VmInfoError;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use serde::Deserialize;
use serde::Serialize;

use super::labels::ANNOTATION_AUTOSCALING_BOUNDS;
use super::labels::LABEL_ENABLE_AUTOSCALING;

/// NeonVM virtual machine, reduced to the fields the scheduler reads.
///
/// Every field is optional so that a single malformed object surfaces as an
/// extraction error instead of failing the whole list.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<VirtualMachineSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VirtualMachineStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    #[serde(default)]
    pub guest: Option<Guest>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    #[serde(default)]
    pub cpus: Option<ResourceRange<CpuQuantity>>,
    #[serde(default)]
    pub memory_slots: Option<ResourceRange<u32>>,
    #[serde(default)]
    pub memory_slot_size: Option<Quantity>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResourceRange<T> {
    #[serde(default)]
    pub min: Option<T>,
    #[serde(default)]
    pub max: Option<T>,
    #[serde(default, rename = "use")]
    pub current: Option<T>,
}

impl<T> Default for ResourceRange<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            current: None,
        }
    }
}

/// CPU amount as written in the object: a quantity string or a bare number of
/// cores. Parsed during extraction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CpuQuantity {
    Text(String),
    Cores(f64),
}

impl CpuQuantity {
    fn to_milli(&self, field: &'static str) -> Result<u32, VmInfoError> {
        let invalid = || VmInfoError::InvalidQuantity {
            field,
            value: self.to_string(),
        };
        match self {
            CpuQuantity::Text(text) => MilliCpu::parse(text).map(|cpu| cpu.0).ok_or_else(invalid),
            CpuQuantity::Cores(cores) => MilliCpu::from_cores(*cores)
                .map(|cpu| cpu.0)
                .ok_or_else(invalid),
        }
    }
}

impl std::fmt::Display for CpuQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuQuantity::Text(text) => f.write_str(text),
            CpuQuantity::Cores(cores) => write!(f, "{cores}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineStatus {
    #[serde(default)]
    pub pod_name: Option<String>,
}

impl kube::Resource for VirtualMachine {
    type DynamicType = ();
    type Scope = NamespaceResourceScope;

    fn group(_dt: &()) -> Cow<'_, str> {
        "vm.neon.tech".into()
    }

    fn version(_dt: &()) -> Cow<'_, str> {
        "v1".into()
    }

    fn kind(_dt: &()) -> Cow<'_, str> {
        "VirtualMachine".into()
    }

    fn plural(_dt: &()) -> Cow<'_, str> {
        "virtualmachines".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl VirtualMachine {
    /// Name of the pod currently running the VM, if one has been assigned.
    pub fn pod_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.pod_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn scaling_enabled(&self) -> bool {
        self.labels()
            .get(LABEL_ENABLE_AUTOSCALING)
            .is_some_and(|value| value == "true")
    }
}

/// Projects a VM object into the information the scheduler tracks.
pub fn extract_vm_info(vm: &VirtualMachine) -> Result<VmInfo, VmInfoError> {
    let guest = vm
        .spec
        .as_ref()
        .and_then(|spec| spec.guest.clone())
        .unwrap_or_default();

    let cpus = guest.cpus.unwrap_or_default();
    let cpu_value = |value: &Option<CpuQuantity>, field: &'static str| {
        value
            .as_ref()
            .map(|quantity| quantity.to_milli(field))
            .transpose()
    };
    let cpu = Bounds::new(
        ResourceKind::Cpu,
        cpu_value(&cpus.min, "spec.guest.cpus.min")?,
        cpu_value(&cpus.max, "spec.guest.cpus.max")?,
        cpu_value(&cpus.current, "spec.guest.cpus.use")?,
    )?;

    let slots = guest.memory_slots.unwrap_or_default();
    let mem = Bounds::new(ResourceKind::Memory, slots.min, slots.max, slots.current)?;

    let slot_size = guest
        .memory_slot_size
        .ok_or(VmInfoError::MissingValue {
            resource: ResourceKind::Memory,
            field: "slot size",
        })?;
    let mem_slot_size = parse_bytes(&slot_size.0).ok_or_else(|| VmInfoError::InvalidQuantity {
        field: "spec.guest.memorySlotSize",
        value: slot_size.0.clone(),
    })?;

    let mut info = VmInfo {
        name: vm.name_any(),
        namespace: vm.namespace().unwrap_or_default(),
        cpu,
        mem,
        mem_slot_size,
        scaling_enabled: vm.scaling_enabled(),
    };

    if let Some(raw) = vm.annotations().get(ANNOTATION_AUTOSCALING_BOUNDS) {
        let bounds = ScalingBoundsOverride::from_json(raw)?;
        info.apply_bounds_override(&bounds)?;
    }

    Ok(info)
}

const BYTE_SUFFIXES: [(&str, u64); 12] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// Parses a memory quantity (`"1Gi"`, `"512M"`, `"1073741824"`) into bytes.
fn parse_bytes(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    let (number, multiplier) = BYTE_SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            quantity
                .strip_suffix(suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((quantity, 1));

    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier);
    }
    let fractional = number.parse::<f64>().ok()?;
    let bytes = (fractional * multiplier as f64).round();
    (bytes.is_finite() && bytes >= 0.0 && bytes <= u64::MAX as f64).then_some(bytes as u64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn vm_from_json(value: serde_json::Value) -> VirtualMachine {
        serde_json::from_value(value).expect("should deserialize VirtualMachine")
    }

    fn sample_vm() -> serde_json::Value {
        json!({
            "apiVersion": "vm.neon.tech/v1",
            "kind": "VirtualMachine",
            "metadata": {
                "name": "vm1",
                "namespace": "ns",
                "resourceVersion": "7",
                "labels": { "autoscaling.neon.tech/enabled": "true" }
            },
            "spec": {
                "guest": {
                    "cpus": { "min": "250m", "max": 4, "use": 1 },
                    "memorySlots": { "min": 1, "max": 8, "use": 2 },
                    "memorySlotSize": "1Gi"
                }
            },
            "status": { "podName": "vm1-abcde" }
        })
    }

    #[test]
    fn extracts_vm_info() {
        let vm = vm_from_json(sample_vm());

        let info = extract_vm_info(&vm).expect("should extract");
        assert_eq!(
            info,
            VmInfo {
                name: "vm1".to_string(),
                namespace: "ns".to_string(),
                cpu: Bounds {
                    min: 250,
                    max: 4000,
                    current: 1000,
                },
                mem: Bounds {
                    min: 1,
                    max: 8,
                    current: 2,
                },
                mem_slot_size: 1 << 30,
                scaling_enabled: true,
            }
        );
        assert_eq!(vm.pod_name(), Some("vm1-abcde"));
    }

    #[test]
    fn scaling_requires_label_value_true() {
        let mut value = sample_vm();
        value["metadata"]["labels"]["autoscaling.neon.tech/enabled"] = json!("false");
        let info = extract_vm_info(&vm_from_json(value)).expect("should extract");
        assert!(!info.scaling_enabled);

        let mut value = sample_vm();
        value["metadata"]["labels"] = json!({});
        let info = extract_vm_info(&vm_from_json(value)).expect("should extract");
        assert!(!info.scaling_enabled);
    }

    #[test]
    fn empty_pod_name_is_absent() {
        let mut value = sample_vm();
        value["status"]["podName"] = json!("");
        assert_eq!(vm_from_json(value).pod_name(), None);

        let mut value = sample_vm();
        value["status"] = json!({});
        assert_eq!(vm_from_json(value).pod_name(), None);
    }

    #[test]
    fn bounds_annotation_narrows_range() {
        let mut value = sample_vm();
        value["metadata"]["annotations"] = json!({
            "autoscaling.neon.tech/bounds":
                r#"{"min":{"cpu":"500m","mem":1},"max":{"cpu":2,"mem":4}}"#
        });

        let info = extract_vm_info(&vm_from_json(value)).expect("should extract");
        assert_eq!((info.cpu.min, info.cpu.max), (500, 2000));
        assert_eq!((info.mem.min, info.mem.max), (1, 4));
    }

    #[test]
    fn malformed_objects_fail_extraction_not_decoding() {
        let mut value = sample_vm();
        value["spec"]["guest"]["memorySlots"] = json!({ "min": 1, "max": 8 });
        assert_eq!(
            extract_vm_info(&vm_from_json(value)),
            Err(VmInfoError::MissingValue {
                resource: ResourceKind::Memory,
                field: "use",
            })
        );

        let mut value = sample_vm();
        value["spec"]["guest"]["cpus"]["max"] = json!("four");
        assert_eq!(
            extract_vm_info(&vm_from_json(value)),
            Err(VmInfoError::InvalidQuantity {
                field: "spec.guest.cpus.max",
                value: "four".to_string(),
            })
        );

        let mut value = sample_vm();
        value["spec"]["guest"]["memorySlotSize"] = json!("lots");
        assert!(matches!(
            extract_vm_info(&vm_from_json(value)),
            Err(VmInfoError::InvalidQuantity { .. })
        ));

        let mut value = sample_vm();
        value["metadata"]["annotations"] = json!({ "autoscaling.neon.tech/bounds": "{" });
        assert!(matches!(
            extract_vm_info(&vm_from_json(value)),
            Err(VmInfoError::BoundsAnnotation { .. })
        ));

        let vm = vm_from_json(json!({ "metadata": { "name": "bare", "namespace": "ns" } }));
        assert!(matches!(
            extract_vm_info(&vm),
            Err(VmInfoError::MissingValue {
                resource: ResourceKind::Cpu,
                ..
            })
        ));
    }

    #[test]
    fn parses_memory_quantities() {
        assert_eq!(parse_bytes("1Gi"), Some(1 << 30));
        assert_eq!(parse_bytes("512Mi"), Some(512 << 20));
        assert_eq!(parse_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_bytes("0.5Gi"), Some(1 << 29));
        assert_eq!(parse_bytes("4096"), Some(4096));
        assert_eq!(parse_bytes("20Ei"), None);
        assert_eq!(parse_bytes("Gi"), None);
        assert_eq!(parse_bytes("-1Gi"), None);
    }

    #[test]
    fn resource_metadata() {
        use kube::Resource;

        assert_eq!(VirtualMachine::group(&()), "vm.neon.tech");
        assert_eq!(VirtualMachine::version(&()), "v1");
        assert_eq!(VirtualMachine::plural(&()), "virtualmachines");
        assert_eq!(VirtualMachine::api_version(&()), "vm.neon.tech/v1");
    }
}
