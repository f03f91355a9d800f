//! MSA Workflow Load Test
//!
//! Runs customer and owner agents against the MSA gateway. Each agent signs
//! up, logs in and walks its workflow once (or until the run time ends).
//!
//! Usage:
//!   cargo run --release --bin load-msa
//!   MSA_SCENARIO=customer MSA_TEST_VUS=100 MSA_TEST_DURATION=300 cargo run --release --bin load-msa
//!
//! Goose flags such as `--users` or `--report-file` override the MSA_*
//! defaults.
//!
//! Output: Results written to RESULTS.md (or MSA_RESULTS_FILE)

use goose::prelude::*;
use msa_load::scenario::{run_attack, AttackSummary};
use msa_load::{latency_table, update_section_in_results, LoadConfig, TestResult, LATENCY_TRACKER};

const SECTION_TITLE: &str = "MSA Workflow Performance";

/// Goose's success and failure counts per request name
fn outcome_table(summary: &AttackSummary) -> String {
    let mut table = String::from("| Request | OK | Failed |\n|---------|----|--------|\n");
    for request in &summary.requests {
        table.push_str(&format!("| {} | {} | {} |\n", request.name, request.success, request.fail));
    }
    table
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let config = LoadConfig::from_env().map_err(|e| GooseError::InvalidOption {
        option: "MSA_SCENARIO".to_string(),
        value: std::env::var("MSA_SCENARIO").unwrap_or_default(),
        detail: e.to_string(),
    })?;

    eprintln!("=== MSA Workflow Load Test ===");
    eprintln!(
        "Host: {} | Scenario: {} | Users: {} | {}",
        config.host,
        config.scenario.as_str(),
        config.users,
        match config.run_time {
            Some(secs) => format!("Run time: {secs}s"),
            None => format!("Iterations: {}", config.iterations),
        }
    );

    eprintln!("\n--- Running Attack ---");
    let summary = run_attack(&config).await?;
    let rps = summary.throughput();

    let test_result = TestResult {
        test: "msa-workflow".to_string(),
        scenario: config.scenario.as_str().to_string(),
        users: config.users,
        throughput: rps,
        p50: summary.p50,
        p95: summary.p95,
        p99: summary.p99,
        total: summary.total,
        errors: summary.errors,
        success_rate: summary.success_rate,
        duration_secs: summary.duration_secs,
        summary: format!(
            "{:.1} req/s, p50={:.2}ms p99={:.2}ms, {:.1}% ok",
            rps, summary.p50, summary.p99, summary.success_rate
        ),
    };
    if let Err(e) = test_result.emit() {
        eprintln!("Failed to write result: {e}");
    }

    let section = format!(
        "\n**Scenario**: {} | **Users**: {} | **Total**: {} | **Duration**: {:.1}s\n\n\
         | p50 | p95 | p99 | Throughput | Success |\n\
         |-----|-----|-----|-----------|--------|\n\
         | {:.2}ms | {:.2}ms | {:.2}ms | {:.1} req/s | {:.1}% |\n\n\
         {}\n{}\n",
        config.scenario.as_str(),
        config.users,
        summary.total,
        summary.duration_secs,
        summary.p50,
        summary.p95,
        summary.p99,
        rps,
        summary.success_rate,
        latency_table(&LATENCY_TRACKER),
        outcome_table(&summary),
    );
    match update_section_in_results(&config.results_file, SECTION_TITLE, &section) {
        Ok(()) => eprintln!("\nResults written to {}", config.results_file),
        Err(e) => eprintln!("\nFailed to update {}: {e}", config.results_file),
    }

    Ok(())
}
