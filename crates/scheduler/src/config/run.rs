use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use utils::time_range::TimeRange;

use crate::watch::WatchConfig;

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, help = "Kubernetes namespace to watch (empty for all namespaces)")]
    pub namespace: Option<String>,

    #[arg(
        long,
        default_value_t = 250,
        help = "Minimum delay in milliseconds before retrying a failed pod list or watch"
    )]
    pub pod_retry_min_ms: u32,

    #[arg(
        long,
        default_value_t = 750,
        help = "Maximum delay in milliseconds before retrying a failed pod list or watch"
    )]
    pub pod_retry_max_ms: u32,

    #[arg(
        long,
        default_value_t = 250,
        help = "Minimum delay in milliseconds before retrying a failed VM list or watch"
    )]
    pub vm_retry_min_ms: u32,

    #[arg(
        long,
        default_value_t = 750,
        help = "Maximum delay in milliseconds before retrying a failed VM list or watch"
    )]
    pub vm_retry_max_ms: u32,

    #[arg(
        long,
        default_value_t = 5,
        help = "Attempts for the initial list of each collection at startup (0 retries forever)"
    )]
    pub initial_list_attempts: u32,

    #[arg(
        long,
        default_value_t = 30,
        help = "Seconds to wait for background tasks to stop on shutdown"
    )]
    pub shutdown_timeout_secs: u64,
}

impl RunArgs {
    pub fn pod_watch_config(&self) -> WatchConfig {
        self.watch_config("pods", self.pod_retry_min_ms, self.pod_retry_max_ms)
    }

    pub fn vm_watch_config(&self) -> WatchConfig {
        self.watch_config("VMs", self.vm_retry_min_ms, self.vm_retry_max_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    fn watch_config(&self, name: &str, min_ms: u32, max_ms: u32) -> WatchConfig {
        let retry = TimeRange::new(Duration::from_millis(1), min_ms, max_ms);
        WatchConfig::new(name)
            .retry_relist_after(retry)
            .retry_watch_after(retry)
            .initial_list_attempts(NonZeroU32::new(self.initial_list_attempts))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::config::Cli;
    use crate::config::Commands;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).expect("should parse arguments");
        match cli.command {
            Commands::Run(args) => args,
        }
    }

    #[test]
    fn defaults_match_watch_defaults() {
        let args = parse(&["autoscale-scheduler", "run"]);
        let config = args.pod_watch_config();

        assert_eq!(config.log_name, "pods");
        assert_eq!(config.retry_relist_after.min(), Duration::from_millis(250));
        assert_eq!(config.retry_watch_after.max(), Duration::from_millis(750));
        assert_eq!(config.initial_list_attempts, NonZeroU32::new(5));
        assert_eq!(args.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn retry_ranges_are_per_collection() {
        let args = parse(&[
            "autoscale-scheduler",
            "run",
            "--vm-retry-min-ms",
            "1000",
            "--vm-retry-max-ms",
            "2000",
            "--initial-list-attempts",
            "0",
        ]);

        let vm = args.vm_watch_config();
        assert_eq!(vm.log_name, "VMs");
        assert_eq!(vm.retry_relist_after.min(), Duration::from_secs(1));
        assert_eq!(vm.retry_relist_after.max(), Duration::from_secs(2));
        assert_eq!(vm.initial_list_attempts, None);

        let pods = args.pod_watch_config();
        assert_eq!(pods.retry_watch_after.max(), Duration::from_millis(750));
    }
}
