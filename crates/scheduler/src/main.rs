use anyhow::Result;
use autoscale_scheduler::app::ApplicationBuilder;
use autoscale_scheduler::config::Cli;
use autoscale_scheduler::config::Commands;
use autoscale_scheduler::config::RunArgs;
use clap::Parser;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_args) => run(run_args).await,
    }
}

async fn run(run_args: RunArgs) -> Result<()> {
    let _guard = logging::init();

    tracing::info!("Starting autoscale scheduler {}", &**version::VERSION);

    let mut app = ApplicationBuilder::new(run_args).build().await?;

    let result = app.run().await;
    app.shutdown().await?;

    result
}
