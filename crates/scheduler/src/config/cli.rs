use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::run::RunArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch pods and VMs and keep the buffer ledger current
    Run(RunArgs),
}
