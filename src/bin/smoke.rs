//! MSA Workflow Smoke Run
//!
//! Runs one owner and then one customer through their full workflow over a
//! plain HTTP client and prints every step's outcome. Useful to check a
//! deployment before starting a real attack.
//!
//! Usage:
//!   MSA_HOST=http://localhost:8080 cargo run --bin load-msa-smoke
//!   RUST_LOG=debug cargo run --bin load-msa-smoke

use anyhow::{bail, Context, Result};
use msa_load::agent::{Agent, StepStatus};
use msa_load::credentials::{Credentials, Role};
use msa_load::customer::{self, CustomerState};
use msa_load::owner::{self, OwnerState};
use msa_load::transport::DirectTransport;
use msa_load::LoadConfig;

fn print_steps(title: &str, username: &str, steps: &[(&'static str, StepStatus)]) {
    eprintln!("\n--- {title} ({username}) ---");
    for (step, status) in steps {
        eprintln!("  {step:<14} {status:?}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LoadConfig::from_env().context("invalid MSA_* configuration")?;
    eprintln!("=== MSA Workflow Smoke Run ===");
    eprintln!("Host: {}", config.host);

    let mut halted = Vec::new();

    if config.scenario.includes_owner() {
        let mut transport = DirectTransport::with_options(&config.host, config.accept_invalid_certs)
            .context("failed to build HTTP client")?;
        let mut agent = Agent::new(Credentials::generate(Role::Owner), OwnerState::default());
        let run = owner::run(&mut transport, &mut agent).await;
        print_steps("Owner", &agent.credentials.username, &run.steps());
        if let Some(store_id) = &agent.state.store_id {
            log::info!("owner created store {store_id}");
        }
        if let Some(reason) = agent.halt_reason() {
            halted.push(format!("owner: {reason}"));
        }
        for failure in transport.failures() {
            log::warn!("{} {} -> {}", failure.name, failure.path, failure.failure.as_deref().unwrap_or(""));
        }
    }

    if config.scenario.includes_customer() {
        let mut transport = DirectTransport::with_options(&config.host, config.accept_invalid_certs)
            .context("failed to build HTTP client")?;
        let mut agent = Agent::new(
            Credentials::generate(Role::Customer),
            CustomerState::new(config.catalog.clone()),
        );
        let run = customer::run(&mut transport, &mut agent).await;
        print_steps("Customer", &agent.credentials.username, &run.steps());
        log::info!(
            "cart quantity {} total {}",
            agent.state.cart_quantity,
            agent.state.cart_total
        );
        if let Some(reason) = agent.halt_reason() {
            halted.push(format!("customer: {reason}"));
        }
        for failure in transport.failures() {
            log::warn!("{} {} -> {}", failure.name, failure.path, failure.failure.as_deref().unwrap_or(""));
        }
    }

    if !halted.is_empty() {
        bail!("agents stopped early: {}", halted.join("; "));
    }
    eprintln!("\nSmoke run complete");
    Ok(())
}
