use crate::demo::{run_demo, run_eligibility, DemoArgs, EligibilityArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scholarship_ledger::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Scholarship Ledger",
    about = "Run the departmental scholarship and stipend service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a GPA against the scholarship and stipend bands
    Eligibility(EligibilityArgs),
    /// Run an end-to-end demo: candidates, a stipend approval and a bulk scholarship run
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
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Eligibility(args) => run_eligibility(args),
        Command::Demo(args) => run_demo(args),
    }
}
