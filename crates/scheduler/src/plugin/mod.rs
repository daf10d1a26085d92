//! Scheduler-side handling of pod and VM events.
//!
//! Watch callbacks classify each change with the [`transitions`] and push
//! the resulting [`WorkItem`]s onto a non-blocking [`WorkQueue`]. The
//! [`Reconciler`] drains the queue and is the only writer of the [`Ledger`]
//! of per-VM buffer. It checks each reservation against the current
//! [`ClusterView`], so pod and VM events may arrive in either order.

pub mod cluster;
pub mod events;
pub mod ledger;
pub mod queue;
pub mod reconciler;
pub mod transitions;

pub use cluster::ClusterView;
pub use cluster::StoreClusterView;
pub use events::PodEventHandlers;
pub use events::VmEventHandlers;
pub use ledger::Ledger;
pub use ledger::LedgerEntry;
pub use ledger::Reservation;
pub use queue::WorkItem;
pub use queue::WorkQueue;
pub use queue::WorkSubmitter;
pub use reconciler::Reconciler;
