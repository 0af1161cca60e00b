use crate::infra::build_service;
use crate::server;
use clap::{Args, Parser, Subcommand, ValueEnum};
use portfolio_scoring::config::AppConfig;
use portfolio_scoring::error::AppError;
use portfolio_scoring::portfolio::{IndicatorRequest, ModuleRequest, PortfolioRequest};
use portfolio_scoring::telemetry;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Portfolio Scoring",
    about = "Evaluate teacher portfolio evidence against achievement-level rubrics",
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
    /// Evaluate a request read from a JSON file and print the result
    Evaluate(EvaluateArgs),
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

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON request matching the chosen scope
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Which evaluation the request describes
    #[arg(long, value_enum, default_value_t = EvaluationScope::Portfolio)]
    pub(crate) scope: EvaluationScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EvaluationScope {
    Indicator,
    Module,
    Portfolio,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluation(args).await,
    }
}

async fn run_evaluation(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let payload = std::fs::read(&args.request)?;
    let (service, sink) = build_service(&config)?;

    let output = match args.scope {
        EvaluationScope::Indicator => {
            let request: IndicatorRequest = serde_json::from_slice(&payload)?;
            render(&service.evaluate_indicator(&request).await?)?
        }
        EvaluationScope::Module => {
            let request: ModuleRequest = serde_json::from_slice(&payload)?;
            render(&service.evaluate_module(&request).await?)?
        }
        EvaluationScope::Portfolio => {
            let request: PortfolioRequest = serde_json::from_slice(&payload)?;
            render(&service.evaluate_portfolio(&request).await?)?
        }
    };

    info!(scope = ?args.scope, records = sink.len(), "evaluation finished");
    println!("{output}");
    Ok(())
}

fn render<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}
