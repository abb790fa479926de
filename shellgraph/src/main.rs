//! Natural-language shell agent CLI.
//!
//! Turns a request such as "show disk usage here" into shell commands, asks
//! before anything risky runs, and prints the final answer to stdout.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use shellgraph::exit_codes;
use shellgraph::graph::ExecutionGraph;
use shellgraph::io::config::{CONFIG_FILE_NAME, load_config};
use shellgraph::io::console::StdinOperator;
use shellgraph::io::gateway::{MockGateway, ModelGateway, OpenAiGateway};
use shellgraph::io::shell::SystemShell;
use shellgraph::logging;
use shellgraph::nodes::RunSettings;

#[derive(Parser)]
#[command(
    name = "shellgraph",
    version,
    about = "Natural-language shell agent with a safety gate"
)]
struct Cli {
    /// What you want done, in plain language.
    request: Vec<String>,

    /// Use the offline keyword-driven model instead of the API.
    #[arg(long)]
    mock: bool,

    /// Debug-level tracing on stderr (RUST_LOG overrides).
    #[arg(short, long)]
    verbose: bool,

    /// Skip the safety review and confirmation. Suggested alternatives are still asked.
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    /// Config file (defaults to `.shellgraph.toml` in the current directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here, on stdout.
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    logging::init(cli.verbose);

    let request = cli.request.join(" ");
    if request.trim().is_empty() {
        eprintln!("usage: shellgraph [--mock] [-y] [-v] [--config <path>] <request>...");
        std::process::exit(exit_codes::INVALID);
    }

    match run(&cli, request.trim()) {
        Ok(result) => {
            println!("{result}");
            std::process::exit(exit_codes::OK);
        }
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli, request: &str) -> Result<String> {
    let working_dir = env::current_dir().context("resolve current directory")?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| working_dir.join(CONFIG_FILE_NAME));
    let config = load_config(&config_path)?;
    debug!(config = %config_path.display(), mock = cli.mock, "configuration loaded");

    let gateway: Box<dyn ModelGateway> = if cli.mock {
        Box::new(MockGateway)
    } else {
        Box::new(OpenAiGateway::from_env(&config.model))
    };
    let shell = SystemShell::new(
        config.shell.command.clone(),
        config.command_timeout(),
        config.output_limit_bytes,
    );

    let graph = ExecutionGraph::new(gateway, StdinOperator, shell)?
        .configured(&config)
        .with_settings(RunSettings {
            force_approve: cli.yes,
            max_alternatives: config.max_alternatives,
        });
    graph.run(request, working_dir)
}
