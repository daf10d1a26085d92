pub mod app;
pub mod config;
pub mod infrastructure;
pub mod plugin;
pub mod watch;

pub use infrastructure::k8s;
pub use infrastructure::kube_client;
