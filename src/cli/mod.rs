//! Command-line interface for the attestation client.
//!
//! Provides commands for browsing recipes, running the pay-and-attest
//! workflow, and inspecting runs held by the registry.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{EthRpcSubmitter, HttpAttestationService, HttpRegistry, Registry};
use crate::config;
use crate::core::{RunWorkflow, WorkflowSettings, WorkflowStatus};
use crate::domain::{run_id_from_hex, run_id_hex, Run};

/// attestor - client for a recipe-based attestation engine
#[derive(Parser, Debug)]
#[command(name = "attestor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recipes known to the registry
    Recipes,

    /// Show details of a recipe
    Recipe {
        /// Recipe name
        name: String,
    },

    /// Run a recipe: create a run, pay for it, create the attestation
    Run {
        /// Recipe name
        recipe: String,

        /// Target chain id (defaults to the configured chain)
        #[arg(short, long)]
        chain: Option<u64>,
    },

    /// List your runs
    Runs,

    /// Show the registry's view of a run
    Status {
        /// Run id (hex)
        run_id: String,
    },

    /// Cancel a run that has not been paid for
    Cancel {
        /// Run id (hex)
        run_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Recipes => list_recipes().await,
            Commands::Recipe { name } => show_recipe(&name).await,
            Commands::Run { recipe, chain } => run_recipe(&recipe, chain).await,
            Commands::Runs => list_runs().await,
            Commands::Status { run_id } => show_status(&run_id).await,
            Commands::Cancel { run_id } => cancel_run(&run_id).await,
            Commands::Config => show_config(),
        }
    }
}

fn registry() -> Result<HttpRegistry> {
    Ok(HttpRegistry::new(&config::config()?.registry_url))
}

/// Run the full workflow for a recipe
async fn run_recipe(recipe_name: &str, chain: Option<u64>) -> Result<()> {
    let config = config::config()?;
    let chain_id = chain.unwrap_or(config.default_chain_id);
    let payment_contract = config.payment_contract(chain_id)?.to_string();
    let from = config
        .eth_from
        .clone()
        .context("No sender account configured; set eth_from or ATTESTOR_ETH_FROM")?;

    let registry = HttpRegistry::new(&config.registry_url);
    let recipe = registry.get_recipe(recipe_name).await?;

    let payment = EthRpcSubmitter::new(&config.eth_rpc_url, from).with_receipt_timing(
        Duration::from_millis(config.receipt.poll_interval_ms),
        Duration::from_millis(config.receipt.timeout_ms),
    );
    let attestation = HttpAttestationService::new(&config.registry_url);

    let settings = WorkflowSettings {
        chain_id,
        payment_contract,
        uid_poll: config.uid_poll.clone(),
    };

    eprintln!(
        "Running recipe '{}' on {}",
        recipe.display_name(),
        config.chain_name(chain_id)
    );

    let workflow = RunWorkflow::new(registry, payment, attestation, settings);
    workflow.select_recipe(Some(recipe));

    // Stream progress lines while the workflow runs
    let mut rx = workflow.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if state.progress_message != last {
                if let Some(ref message) = state.progress_message {
                    eprintln!("[{}] {}", state.status.label(), message);
                }
                last = state.progress_message;
            }
        }
    });

    workflow.init_and_run().await;

    let state = workflow.current_state();
    drop(workflow);
    let _ = printer.await;

    match state.status {
        WorkflowStatus::AttestationResolved => {
            if let Some(run) = state.run_in_progress {
                println!("Run:             {}", run.id_hex());
                if let Some(tx) = run.payment_transaction_hash {
                    println!("Payment tx:      {}", tx);
                }
                if let Some(tx) = run.attestation_transaction_hash {
                    println!("Attestation tx:  {}", tx);
                }
                if let Some(uid) = run.attestation_uid {
                    println!("Attestation UID: {}", uid);
                }
            }
            Ok(())
        }
        WorkflowStatus::AttestationUnresolved => {
            if let Some(run) = state.run_in_progress {
                eprintln!(
                    "[attestation submitted, UID not resolved yet; check with: attestor status {}]",
                    run.id_hex()
                );
            }
            Ok(())
        }
        WorkflowStatus::Errored => {
            eprintln!(
                "[run failed: {}]",
                state
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string())
            );
            std::process::exit(1);
        }
        _ => {
            eprintln!("[run ended in state: {}]", state.status.label());
            Ok(())
        }
    }
}

/// List recipes from the registry
async fn list_recipes() -> Result<()> {
    let recipes = registry()?.list_recipes().await?;

    if recipes.is_empty() {
        println!("No recipes found");
        return Ok(());
    }

    println!("{:<28} {:<12} {}", "NAME", "STATE", "DISPLAY NAME");
    println!("{}", "-".repeat(70));

    for recipe in recipes {
        println!(
            "{:<28} {:<12} {}",
            recipe.name,
            format!("{:?}", recipe.publish_state).to_lowercase(),
            recipe.display_name()
        );
    }

    Ok(())
}

/// Show details of one recipe
async fn show_recipe(name: &str) -> Result<()> {
    let recipe = registry()?.get_recipe(name).await?;

    println!("Name:         {}", recipe.name);
    println!("Display name: {}", recipe.display_name());
    println!("Creator:      {}", recipe.creator);
    println!("Created:      {}", format_timestamp(recipe.created));
    println!("State:        {:?}", recipe.publish_state);
    println!("Schema:       {}", recipe.schema);
    println!("Resolver:     {}", recipe.resolver);
    println!("Revokable:    {}", recipe.revokable);
    if let Some(description) = &recipe.description {
        println!("\n{}", description);
    }
    if let Some(keywords) = &recipe.keywords {
        println!("Keywords:     {}", keywords.join(", "));
    }

    println!("\nQueries:");
    for (i, query) in recipe.queries.iter().enumerate() {
        println!("  {}. {}", i + 1, query.endpoint);
        println!("     {}", query.query);
    }

    Ok(())
}

/// List the user's runs
async fn list_runs() -> Result<()> {
    let runs = registry()?.list_runs().await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:<12} {:<22} {}",
        "RUN ID", "CHAIN", "STAGE", "FEE (WEI)", "CREATED"
    );
    println!("{}", "-".repeat(96));

    for run in runs {
        println!(
            "{:<28} {:<10} {:<12} {:<22} {}",
            run.id_hex(),
            run.chain_id,
            run_stage(&run),
            run.fee,
            format_timestamp(run.created)
        );
    }

    Ok(())
}

/// Show the registry's view of a run
async fn show_status(run_id_str: &str) -> Result<()> {
    let run_id = run_id_from_hex(run_id_str)
        .with_context(|| format!("Invalid run id: {}", run_id_str))?;

    let run = registry()?.get_run(&run_id).await?;

    println!("Run ID:      {}", run.id_hex());
    println!("Recipe:      {}", run_id_hex(&run.recipe_id));
    println!("Creator:     {}", run.creator);
    println!("Chain:       {}", run.chain_id);
    println!("Fee (wei):   {}", run.fee);
    println!("Created:     {}", format_timestamp(run.created));
    println!("Stage:       {}", run_stage(&run));
    if let Some(tx) = &run.payment_transaction_hash {
        println!("Payment tx:  {}", tx);
    }
    if let Some(status) = &run.payment_verified_status {
        println!("Payment:     {:?}", status);
    }
    if let Some(error) = &run.payment_verify_error {
        println!("Payment err: {}", error);
    }
    if let Some(tx) = &run.attestation_transaction_hash {
        println!("Attest tx:   {}", tx);
    }
    if let Some(uid) = &run.attestation_uid {
        println!("UID:         {}", uid);
    }
    if let Some(error) = &run.attestation_create_error {
        println!("Attest err:  {}", error);
    }

    Ok(())
}

/// Cancel an unpaid run
async fn cancel_run(run_id_str: &str) -> Result<()> {
    let run_id = run_id_from_hex(run_id_str)
        .with_context(|| format!("Invalid run id: {}", run_id_str))?;

    let run = registry()?.cancel_run(&run_id).await?;
    println!("Run {} cancelled", run.id_hex());

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Registry URL:  {}", config.registry_url);
    println!("Eth RPC URL:   {}", config.eth_rpc_url);
    println!(
        "Sender:        {}",
        config.eth_from.as_deref().unwrap_or("(not set)")
    );
    println!("Default chain: {}", config.default_chain_id);
    match &config.config_file {
        Some(path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none found, using defaults)"),
    }

    println!("\nChains:");
    if config.chains.is_empty() {
        println!("  (none configured)");
    }
    for (chain_id, entry) in &config.chains {
        println!(
            "  {:<12} {} ({})",
            chain_id,
            entry.payment_contract,
            entry.display_name.as_deref().unwrap_or("unnamed")
        );
    }

    println!(
        "\nUID poll:      {} attempts, {}ms delay",
        config.uid_poll.max_attempts, config.uid_poll.delay_ms
    );
    println!(
        "Receipt wait:  every {}ms, up to {}ms",
        config.receipt.poll_interval_ms, config.receipt.timeout_ms
    );

    Ok(())
}

/// How far a run has progressed, derived from the registry record
fn run_stage(run: &Run) -> &'static str {
    if run.is_cancelled {
        "cancelled"
    } else if run.is_resolved() {
        "resolved"
    } else if run.is_attested() {
        "attested"
    } else if run.is_paid() {
        "paid"
    } else {
        "created"
    }
}

fn format_timestamp(unix_seconds: u64) -> String {
    chrono::DateTime::from_timestamp(unix_seconds as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stage_ordering() {
        let mut run = Run {
            id: [0u8; 12],
            recipe_id: [0u8; 12],
            creator: String::new(),
            chain_id: 1,
            fee: 0,
            created: 0,
            payment_transaction_hash: None,
            payment_verified_status: None,
            payment_verify_error: None,
            attestation_transaction_hash: None,
            attestation_uid: None,
            attestation_create_error: None,
            is_cancelled: false,
        };

        assert_eq!(run_stage(&run), "created");
        run.payment_transaction_hash = Some("0xA".to_string());
        assert_eq!(run_stage(&run), "paid");
        run.attestation_transaction_hash = Some("0xB".to_string());
        assert_eq!(run_stage(&run), "attested");
        run.attestation_uid = Some("U1".to_string());
        assert_eq!(run_stage(&run), "resolved");
        run.is_cancelled = true;
        assert_eq!(run_stage(&run), "cancelled");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
