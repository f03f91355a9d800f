//! Goose load tests for the user/store/order MSA backend
//!
//! Two kinds of simulated users hit the backend through its gateway:
//! customers sign up, log in and buy the fixed menu of the fixed store;
//! owners sign up, log in and provision a store, a menu and its stock.
//!
//! ## Layout
//! - [`credentials`], [`payload`], [`envelope`]: what goes over the wire
//! - [`transport`]: goose and plain reqwest transports behind one trait
//! - [`agent`], [`customer`], [`owner`]: the workflows
//! - [`scenario`]: goose scenarios and the attack runner
//! - this module: latency tracking, configuration and results reporting
//!
//! Usage:
//!   cargo run --release --bin load-msa
//!   MSA_SCENARIO=owner MSA_TEST_VUS=50 cargo run --release --bin load-msa
//!   cargo run --bin load-msa-smoke

pub mod agent;
pub mod cart;
pub mod credentials;
pub mod customer;
pub mod envelope;
pub mod error;
pub mod owner;
pub mod payload;
pub mod scenario;
pub mod transport;

use crate::error::{ConfigError, ReportError};
use crate::payload::FixedCatalog;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

// ============================================================================
// High-Precision Latency Tracking
// ============================================================================
//
// Goose reports whole milliseconds. Every request sent through the goose
// transport is also timed here in fractional milliseconds, keyed by its
// request name.

/// Thread-safe latency tracker keyed by request name
#[derive(Default)]
pub struct LatencyTracker {
    latencies: Mutex<HashMap<String, Vec<f64>>>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a latency measurement for a request name
    pub fn record(&self, operation: &str, latency_ms: f64) {
        if let Ok(mut map) = self.latencies.lock() {
            map.entry(operation.to_string())
                .or_default()
                .push(latency_ms);
        }
    }

    /// p50, p95 and p99 for a request name; zeros when nothing was recorded
    pub fn percentiles(&self, operation: &str) -> (f64, f64, f64) {
        self.latencies
            .lock()
            .ok()
            .and_then(|map| map.get(operation).map(|times| percentiles(times)))
            .unwrap_or((0.0, 0.0, 0.0))
    }

    pub fn count(&self, operation: &str) -> usize {
        self.latencies
            .lock()
            .map(|map| map.get(operation).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Every recorded request name, sorted
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .latencies
            .lock()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Percentiles over every sample of every request name
    pub fn overall(&self) -> (f64, f64, f64) {
        self.latencies
            .lock()
            .map(|map| {
                let all: Vec<f64> = map.values().flatten().copied().collect();
                percentiles(&all)
            })
            .unwrap_or((0.0, 0.0, 0.0))
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.latencies.lock() {
            map.clear();
        }
    }
}

/// Nearest-rank p50/p95/p99 of unsorted samples
pub fn percentiles(samples: &[f64]) -> (f64, f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let len = sorted.len();
    let at = |q: f64| sorted[((len as f64 * q) as usize).min(len - 1)];
    (at(0.50), at(0.95), at(0.99))
}

/// Global latency tracker instance
pub static LATENCY_TRACKER: LazyLock<LatencyTracker> = LazyLock::new(LatencyTracker::new);

pub fn record_latency(operation: &str, latency_ms: f64) {
    LATENCY_TRACKER.record(operation, latency_ms);
}

/// Clear all latency data (call before each attack)
pub fn reset_latency_tracker() {
    LATENCY_TRACKER.clear();
}

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_HOST: &str = "http://localhost:8080";
pub const DEFAULT_VUS: usize = 10;
pub const DEFAULT_HATCH_RATE: f64 = 2.0;
pub const DEFAULT_ITERATIONS: usize = 1;
pub const DEFAULT_RESULTS_FILE: &str = "RESULTS.md";

/// Which agent types take part in the attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioSelection {
    Customer,
    Owner,
    All,
}

impl ScenarioSelection {
    pub fn includes_customer(&self) -> bool {
        matches!(self, Self::Customer | Self::All)
    }

    pub fn includes_owner(&self) -> bool {
        matches!(self, Self::Owner | Self::All)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
            Self::All => "all",
        }
    }
}

impl FromStr for ScenarioSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customers" => Ok(Self::Customer),
            "owner" | "owners" => Ok(Self::Owner),
            "all" | "both" | "" => Ok(Self::All),
            other => Err(ConfigError::UnknownScenario(other.to_string())),
        }
    }
}

/// Numeric variable with silent fallback: unset or unparsable reads as `None`
fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse().ok())
}

/// Boolean variable: `1`/`true`/`yes` or `0`/`false`/`no`, anything else
/// reads as `None`
fn flag(value: Option<String>) -> Option<bool> {
    match value?.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Attack configuration. Goose's own command line flags still override the
/// values applied as defaults.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub host: String,
    pub scenario: ScenarioSelection,
    pub users: usize,
    pub hatch_rate: f64,
    /// Seconds; when set the attack is time-bound instead of iteration-bound
    pub run_time: Option<u64>,
    pub iterations: usize,
    pub customer_weight: usize,
    pub owner_weight: usize,
    pub catalog: FixedCatalog,
    pub results_file: String,
    pub accept_invalid_certs: bool,
    /// Randomised pauses between steps
    pub think_time: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            scenario: ScenarioSelection::All,
            users: DEFAULT_VUS,
            hatch_rate: DEFAULT_HATCH_RATE,
            run_time: None,
            iterations: DEFAULT_ITERATIONS,
            customer_weight: 1,
            owner_weight: 1,
            catalog: FixedCatalog::default(),
            results_file: DEFAULT_RESULTS_FILE.to_string(),
            accept_invalid_certs: false,
            think_time: true,
        }
    }
}

impl LoadConfig {
    /// Load configuration from MSA_* environment variables or defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Unparsable numbers fall back to their
    /// defaults; an unknown scenario name is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let scenario = match lookup("MSA_SCENARIO") {
            Some(value) => value.parse()?,
            None => defaults.scenario,
        };
        let catalog = FixedCatalog {
            store_id: lookup("MSA_STORE_ID")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.catalog.store_id),
            menu_id: lookup("MSA_MENU_ID")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.catalog.menu_id),
        };
        Ok(Self {
            host: lookup("MSA_HOST")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.host),
            scenario,
            users: parsed::<usize>(lookup("MSA_TEST_VUS"))
                .filter(|&n| n > 0)
                .unwrap_or(defaults.users),
            hatch_rate: parsed::<f64>(lookup("MSA_HATCH_RATE"))
                .filter(|&r| r > 0.0)
                .unwrap_or(defaults.hatch_rate),
            run_time: parsed::<u64>(lookup("MSA_TEST_DURATION")).filter(|&s| s > 0),
            iterations: parsed::<usize>(lookup("MSA_ITERATIONS"))
                .filter(|&n| n > 0)
                .unwrap_or(defaults.iterations),
            customer_weight: parsed::<usize>(lookup("MSA_CUSTOMER_WEIGHT"))
                .filter(|&w| w > 0)
                .unwrap_or(defaults.customer_weight),
            owner_weight: parsed::<usize>(lookup("MSA_OWNER_WEIGHT"))
                .filter(|&w| w > 0)
                .unwrap_or(defaults.owner_weight),
            catalog,
            results_file: lookup("MSA_RESULTS_FILE")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.results_file),
            accept_invalid_certs: flag(lookup("MSA_ACCEPT_INVALID_CERTS"))
                .unwrap_or(defaults.accept_invalid_certs),
            think_time: flag(lookup("MSA_THINK_TIME")).unwrap_or(defaults.think_time),
        })
    }
}

// ============================================================================
// Results File Management
// ============================================================================

/// Header written when the results file does not exist yet
pub fn results_header() -> String {
    format!(
        "# MSA Load Test Results\n\n\
         **Test Date**: {}\n\
         **Load Tester**: Goose (Rust-based)\n\n\
         ---\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    )
}

/// Replace the `## {section_title}` section of `existing` up to the next
/// `## ` heading, or append it at the end when absent.
pub fn replace_section(existing: &str, section_title: &str, content: &str) -> String {
    let section_marker = format!("## {section_title}");

    let Some(section_start) = existing.find(&section_marker) else {
        let mut new_content = existing.to_string();
        if !new_content.is_empty() && !new_content.ends_with('\n') {
            new_content.push('\n');
        }
        new_content.push_str(&section_marker);
        new_content.push('\n');
        new_content.push_str(content);
        new_content.push('\n');
        return new_content;
    };

    let after_section = &existing[section_start + section_marker.len()..];
    let section_end = match after_section.find("\n## ") {
        Some(next_section_pos) => section_start + section_marker.len() + next_section_pos,
        None => existing.len(),
    };

    let mut new_content = String::new();
    new_content.push_str(&existing[..section_start]);
    new_content.push_str(&section_marker);
    new_content.push('\n');
    new_content.push_str(content);
    if section_end < existing.len() {
        new_content.push_str(&existing[section_end..]);
    }
    new_content
}

/// Replace or append a section in the results file, creating it with a
/// header first if needed.
pub fn update_section_in_results(
    path: impl AsRef<Path>,
    section_title: &str,
    content: &str,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    let existing = if path.exists() {
        fs::read_to_string(path)?
    } else {
        results_header()
    };
    fs::write(path, replace_section(&existing, section_title, content))?;
    Ok(())
}

/// Markdown table of per-request latencies
pub fn latency_table(tracker: &LatencyTracker) -> String {
    let mut table = String::from(
        "| Request | Count | p50 | p95 | p99 |\n\
         |---------|-------|-----|-----|-----|\n",
    );
    for name in tracker.operations() {
        let (p50, p95, p99) = tracker.percentiles(&name);
        table.push_str(&format!(
            "| {} | {} | {:.2}ms | {:.2}ms | {:.2}ms |\n",
            name,
            tracker.count(&name),
            p50,
            p95,
            p99
        ));
    }
    table
}

// ============================================================================
// Test Result Output
// ============================================================================

/// JSON result line for a finished attack
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestResult {
    pub test: String,
    pub scenario: String,
    pub users: usize,
    pub throughput: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub total: usize,
    pub errors: usize,
    #[serde(rename = "successRate")]
    pub success_rate: f64,
    #[serde(rename = "durationSecs")]
    pub duration_secs: f64,
    pub summary: String,
}

impl TestResult {
    /// Write JSON result to MSA_RESULT_FILE (if set) and stdout
    pub fn emit(&self) -> Result<(), ReportError> {
        let json = serde_json::to_string(self)?;
        if let Ok(path) = std::env::var("MSA_RESULT_FILE") {
            fs::write(&path, &json)?;
        }
        println!("{json}");
        Ok(())
    }
}
