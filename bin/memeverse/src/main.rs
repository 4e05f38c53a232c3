//! memeverse deploys the Memeverse contracts at deterministic addresses and
//! wires their cross-chain routes.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command, OutputFormat, RoutesCommand};
use memeverse_deploy::{
    DeployConfig, DeployOptions, DeploySummary, Deployer, Environment, FileConfig, Prediction,
    RouteTable, VerificationOutcome,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Deploy {
            tags,
            all,
            parallel,
            skip_verify,
            max_verify_attempts,
        } => {
            let config = load_config(&cli.config)?;
            let options = DeployOptions {
                tags,
                all,
                parallel,
                skip_verify,
                max_verify_attempts,
            };

            let summary = Deployer::new(&config).deploy(&options).await?;
            print_summary(&summary);

            if !summary.is_success() {
                let networks = summary
                    .failures
                    .iter()
                    .map(|(network, _)| network.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow::bail!("Deployment failed on: {}", networks);
            }
        }
        Command::Predict { tags, all, format } => {
            let config = load_config(&cli.config)?;
            let predictions = Deployer::new(&config).predict(&tags, all)?;
            print_predictions(&predictions, format)?;
        }
        Command::Tasks { format } => {
            let config = load_config(&cli.config)?;
            print_tasks(&config, format)?;
        }
        Command::Routes { command } => match command {
            RoutesCommand::Validate { file } => {
                let (path, table) = load_routes(&cli.config, file)?;
                table
                    .validate()
                    .with_context(|| format!("Route table {} is invalid", path.display()))?;
                tracing::info!(
                    path = %path.display(),
                    contracts = table.contracts.len(),
                    connections = table.connections.len(),
                    "Route table is valid"
                );
            }
            RoutesCommand::Export { file, out } => {
                let (path, table) = load_routes(&cli.config, file)?;
                table
                    .validate()
                    .with_context(|| format!("Route table {} is invalid", path.display()))?;
                let json = table.to_json_pretty()?;
                match out {
                    Some(out) => {
                        std::fs::write(&out, json)
                            .with_context(|| format!("Failed to write {}", out.display()))?;
                        tracing::info!(path = %out.display(), "Route table exported");
                    }
                    None => println!("{json}"),
                }
            }
        },
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<DeployConfig> {
    let env = Environment::from_process();
    let config = DeployConfig::load(path, &env)?;

    tracing::debug!(
        config_path = %path.display(),
        networks = config.networks.len(),
        tasks = config.tasks.len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// The route table from `--file`, or the one the configuration names.
fn load_routes(config_path: &Path, file: Option<PathBuf>) -> Result<(PathBuf, RouteTable)> {
    let path = match file {
        Some(path) => path,
        None => FileConfig::load(config_path)?
            .routes
            .context("No --file given and the configuration names no route table")?,
    };
    let table = RouteTable::load(&path)?;
    Ok((path, table))
}

fn verification_cell(outcome: Option<&VerificationOutcome>) -> String {
    match outcome {
        None => "skipped".to_string(),
        Some(VerificationOutcome::Verified { attempts }) => format!("verified ({attempts})"),
        Some(VerificationOutcome::Exhausted { attempts, .. }) => {
            format!("unverified after {attempts}")
        }
    }
}

fn print_summary(summary: &DeploySummary) {
    if summary.reports.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Task",
        "Network",
        "Contract",
        "Address",
        "Verification",
        "Admin calls",
    ]);
    for report in &summary.reports {
        table.add_row(vec![
            report.tag.clone(),
            report.network.clone(),
            report.contract_name.clone(),
            report.address.to_string(),
            verification_cell(report.verification.as_ref()),
            report.configured_calls.to_string(),
        ]);
    }
    println!("{table}");
}

fn prediction_rows(predictions: &[Prediction]) -> Vec<serde_json::Value> {
    predictions
        .iter()
        .map(|p| {
            serde_json::json!({
                "tag": p.tag,
                "network": p.network,
                "contract": p.contract_name,
                "saltSeed": p.salt_seed,
                "salt": p.salt,
                "initCodeHash": p.init_code_hash,
                "factory": p.factory,
                "create2FactoryPrediction": p.address,
            })
        })
        .collect()
}

fn prediction_table(predictions: &[Prediction]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Task",
        "Network",
        "Contract",
        "Salt seed",
        "Salt",
        "Init code hash",
        "CREATE2 (factory) prediction",
    ]);
    for p in predictions {
        table.add_row(vec![
            p.tag.clone(),
            p.network.clone(),
            p.contract_name.clone(),
            p.salt_seed.to_string(),
            p.salt.to_string(),
            p.init_code_hash.to_string(),
            p.address.to_string(),
        ]);
    }
    table
}

fn print_predictions(predictions: &[Prediction], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&prediction_rows(predictions))?
            );
        }
        OutputFormat::Table => println!("{}", prediction_table(predictions)),
    }
    Ok(())
}

fn print_tasks(config: &DeployConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = config
                .tasks
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "tag": t.tag,
                        "network": t.network,
                        "contract": t.spec.contract_name,
                        "saltSeed": t.spec.salt_seed,
                        "constructor": t.spec.constructor_args.signature_string(),
                        "configure": t.configure.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                "Task",
                "Network",
                "Contract",
                "Salt seed",
                "Constructor",
                "Admin calls",
            ]);
            for t in &config.tasks {
                table.add_row(vec![
                    t.tag.clone(),
                    t.network.clone(),
                    t.spec.contract_name.clone(),
                    t.spec.salt_seed.to_string(),
                    t.spec.constructor_args.signature_string(),
                    t.configure
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
