use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use dso_core::{init_tracing, Dispatcher, OrchestratorConfig, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("dso")
        .version(dso_core::VERSION)
        .about("Design Session Orchestrator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Read JSON requests from stdin, write JSON responses to stdout")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Orchestrator config (.toml, .yaml or .yml)"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON lines on stderr"),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a config file and print the resolved settings")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Config file to check"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => {
            if let Err(e) = init_tracing(args.get_flag("log-json")) {
                eprintln!("tracing already initialized: {e}");
            }
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => OrchestratorConfig::load(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => OrchestratorConfig::default(),
            };
            serve(config).await
        }
        Some(("check-config", args)) => {
            let path = args
                .get_one::<PathBuf>("path")
                .context("missing config path")?;
            let config = OrchestratorConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        _ => unreachable!("subcommand_required"),
    }
}

async fn serve(config: OrchestratorConfig) -> anyhow::Result<()> {
    let manager = SessionManager::new(config).context("starting session manager")?;
    tracing::info!(
        version = dso_core::VERSION,
        sessions = manager.session_count(),
        "dso serving on stdio"
    );
    let dispatcher = Dispatcher::new(Arc::new(manager));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let handler = dispatcher.clone();
        // lock waits are blocking; keep them off the runtime threads
        let response = tokio::task::spawn_blocking(move || handler.handle_line(&line)).await?;

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
