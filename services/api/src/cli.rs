use crate::demo::{run_demo, run_sweep, DemoArgs, SweepArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rozgar_match::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rozgar Match",
    about = "Match job postings to worker profiles and announce new matches",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the sweep scheduler (default command)
    Serve(ServeArgs),
    /// Run a single sweep over CSV registries and exit
    Sweep(SweepArgs),
    /// Run two sweeps over a built-in sample marketplace and print the results
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed empty in-memory registries with the sample marketplace
    #[arg(long)]
    pub(crate) seed_samples: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sweep(args) => run_sweep(args).await,
        Command::Demo(args) => run_demo(args),
    }
}
