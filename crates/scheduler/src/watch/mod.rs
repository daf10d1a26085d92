//! Generic list-then-watch mirroring of cluster resource collections.
//!
//! A watch lists a collection once, then follows its change stream from the
//! listed resource version, keeping a local [`WatchStore`] current and
//! delivering every transition to a [`WatchHandlers`] implementation. Failed
//! lists and watches are retried forever after a random delay; an expired
//! resource version triggers a relist whose diff is delivered as regular
//! adds/updates plus possibly stale deletions.
//!
//! The main components are:
//! - [`watch`]: starts a watch and returns its store
//! - [`ListWatch`]: per-kind list/watch access, implemented for Kubernetes
//!   collections by [`KubeListWatch`]
//! - [`WatchHandlers`]: callbacks for adds, updates and deletions

mod config;
mod engine;
mod error;
mod handlers;
mod kube_api;
mod list_watch;
mod store;

pub use config::InitMode;
pub use config::WatchConfig;
pub use engine::watch;
pub use error::WatchError;
pub use handlers::WatchHandlers;
pub use kube_api::KubeListWatch;
pub use list_watch::ListWatch;
pub use list_watch::WatchEvent;
pub use list_watch::WatchEventStream;
pub use list_watch::WatchObject;
pub use store::WatchStore;
