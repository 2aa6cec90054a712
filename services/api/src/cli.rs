use crate::demo::{run_assess, run_demo, AssessArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use underwriting::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Motor Underwriting",
    about = "Score, decide, and route motor insurance assessments from the command line",
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
    /// Evaluate a submission stored as JSON and print the underwriting report
    Assess(AssessArgs),
    /// Walk sample assessments through evaluation, approval authority, and the review workflow
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
        Command::Assess(args) => run_assess(args),
        Command::Demo(args) => run_demo(args),
    }
}
