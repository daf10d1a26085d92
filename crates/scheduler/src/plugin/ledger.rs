use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use api_types::NamespacedName;
use api_types::VmInfo;

/// Amount of one resource in use by a VM, and the capacity held back so it
/// can scale up to its maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reservation {
    pub used: u64,
    pub buffer: u64,
}

/// Reservations of one VM. CPU is in milli-CPU, memory in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub vm: NamespacedName,
    pub cpu: Reservation,
    pub mem: Reservation,
}

impl LedgerEntry {
    pub fn from_vm_info(info: &VmInfo) -> Self {
        Self {
            vm: info.namespaced_name(),
            cpu: Reservation {
                used: u64::from(info.cpu.current),
                buffer: u64::from(info.cpu.buffer()),
            },
            mem: Reservation {
                used: u64::from(info.mem.current).saturating_mul(info.mem_slot_size),
                buffer: info.mem_buffer_bytes(),
            },
        }
    }
}

/// Sum of the buffers held across all VMs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferTotals {
    /// Milli-CPU.
    pub cpu: u64,
    /// Bytes.
    pub mem: u64,
}

/// Buffer reserved per VM, keyed by the VM's pod.
///
/// Only the reconciler writes to the ledger; placement reads it
/// concurrently.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: RwLock<BTreeMap<NamespacedName, LedgerEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<NamespacedName, LedgerEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<NamespacedName, LedgerEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces the entry for `pod`, returning the previous one.
    pub fn upsert(&self, pod: NamespacedName, entry: LedgerEntry) -> Option<LedgerEntry> {
        self.write().insert(pod, entry)
    }

    /// Replaces the entry for `pod` only if one exists, returning the
    /// previous one. Never creates an entry.
    pub fn update_existing(&self, pod: &NamespacedName, entry: LedgerEntry) -> Option<LedgerEntry> {
        self.write()
            .get_mut(pod)
            .map(|current| std::mem::replace(current, entry))
    }

    /// Removes the entry for `pod`. Removing an absent entry is a no-op.
    pub fn remove(&self, pod: &NamespacedName) -> Option<LedgerEntry> {
        self.write().remove(pod)
    }

    pub fn get(&self, pod: &NamespacedName) -> Option<LedgerEntry> {
        self.read().get(pod).cloned()
    }

    /// Consistent copy of all entries, ordered by pod.
    pub fn snapshot(&self) -> BTreeMap<NamespacedName, LedgerEntry> {
        self.read().clone()
    }

    pub fn total_buffer(&self) -> BufferTotals {
        self.read()
            .values()
            .fold(BufferTotals::default(), |totals, entry| BufferTotals {
                cpu: totals.cpu.saturating_add(entry.cpu.buffer),
                mem: totals.mem.saturating_add(entry.mem.buffer),
            })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use api_types::Bounds;
    use similar_asserts::assert_eq;

    use super::*;

    fn info(name: &str, cpu: (u32, u32, u32), mem: (u32, u32, u32)) -> VmInfo {
        VmInfo {
            name: name.to_string(),
            namespace: "ns".to_string(),
            cpu: Bounds {
                min: cpu.0,
                max: cpu.1,
                current: cpu.2,
            },
            mem: Bounds {
                min: mem.0,
                max: mem.1,
                current: mem.2,
            },
            mem_slot_size: 1 << 30,
            scaling_enabled: true,
        }
    }

    #[test]
    fn entry_buffer_is_max_minus_use() {
        let entry = LedgerEntry::from_vm_info(&info("vm1", (1000, 4000, 1500), (1, 8, 2)));
        assert_eq!(
            entry,
            LedgerEntry {
                vm: NamespacedName::new("ns", "vm1"),
                cpu: Reservation {
                    used: 1500,
                    buffer: 2500,
                },
                mem: Reservation {
                    used: 2 << 30,
                    buffer: 6 << 30,
                },
            }
        );
    }

    #[test]
    fn upsert_replaces_and_remove_is_idempotent() {
        let ledger = Ledger::new();
        let pod = NamespacedName::new("ns", "pod1");

        let first = LedgerEntry::from_vm_info(&info("vm1", (1000, 4000, 1000), (1, 4, 1)));
        let second = LedgerEntry::from_vm_info(&info("vm1", (1000, 8000, 1000), (1, 4, 1)));
        assert_eq!(ledger.upsert(pod.clone(), first.clone()), None);
        assert_eq!(ledger.upsert(pod.clone(), second.clone()), Some(first));
        assert_eq!(ledger.get(&pod), Some(second.clone()));

        assert_eq!(ledger.remove(&pod), Some(second));
        assert_eq!(ledger.remove(&pod), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn update_existing_never_creates_entries() {
        let ledger = Ledger::new();
        let pod = NamespacedName::new("ns", "pod1");
        let first = LedgerEntry::from_vm_info(&info("vm1", (1000, 4000, 1000), (1, 4, 1)));
        let second = LedgerEntry::from_vm_info(&info("vm1", (1000, 8000, 1000), (1, 4, 1)));

        assert_eq!(ledger.update_existing(&pod, first.clone()), None);
        assert!(ledger.is_empty());

        ledger.upsert(pod.clone(), first.clone());
        assert_eq!(ledger.update_existing(&pod, second.clone()), Some(first));
        assert_eq!(ledger.get(&pod), Some(second));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn totals_sum_all_entries() {
        let ledger = Ledger::new();
        ledger.upsert(
            NamespacedName::new("ns", "pod1"),
            LedgerEntry::from_vm_info(&info("vm1", (1000, 4000, 1000), (1, 4, 1))),
        );
        ledger.upsert(
            NamespacedName::new("ns", "pod2"),
            LedgerEntry::from_vm_info(&info("vm2", (1000, 2000, 2000), (1, 4, 2))),
        );

        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.total_buffer(),
            BufferTotals {
                cpu: 3000,
                mem: 5 << 30,
            }
        );
        assert_eq!(
            ledger.snapshot().keys().cloned().collect::<Vec<_>>(),
            vec![
                NamespacedName::new("ns", "pod1"),
                NamespacedName::new("ns", "pod2"),
            ]
        );
    }
}
