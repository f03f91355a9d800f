//! Goose scenarios for both agent types and the attack runner.
//!
//! Each goose user owns one [`Agent`] stored as session data. Signup and
//! login run once per user lifetime as `on_start` transactions; the workflow
//! steps follow as sequenced transactions, once per iteration.

use crate::agent::{self, Agent};
use crate::credentials::{Credentials, Role};
use crate::customer::{self, CustomerAgent, CustomerState};
use crate::owner::{self, OwnerAgent, OwnerState};
use crate::payload::FixedCatalog;
use crate::transport::GooseTransport;
use crate::{reset_latency_tracker, LoadConfig, LATENCY_TRACKER};
use goose::metrics::GooseMetrics;
use goose::prelude::*;
use std::sync::OnceLock;
use std::time::Duration;

static CATALOG: OnceLock<FixedCatalog> = OnceLock::new();

/// Fix the store and menu every customer uses. Only the first call takes
/// effect; returns whether this call did.
pub fn install_catalog(catalog: FixedCatalog) -> bool {
    CATALOG.set(catalog).is_ok()
}

/// The installed catalog, or the built-in one
pub fn catalog() -> FixedCatalog {
    CATALOG.get().cloned().unwrap_or_default()
}

/// Generate a goose transaction that runs one workflow step on the user's
/// agent. A user whose agent is missing does nothing.
macro_rules! goose_step {
    ($name:ident, $agent:ty, $step:path) => {
        async fn $name(user: &mut GooseUser) -> TransactionResult {
            let Some(mut agent) = user
                .get_session_data_mut::<Option<$agent>>()
                .and_then(Option::take)
            else {
                return Ok(());
            };
            let mut transport = GooseTransport::new(user, agent.token.clone());
            $step(&mut transport, &mut agent).await;
            let result = transport.finish();
            user.set_session_data(Some(agent));
            result
        }
    };
}

// ============================================================================
// Customer
// ============================================================================

pub const CUSTOMER_WAIT: (Duration, Duration) = (Duration::from_secs(1), Duration::from_secs(3));

fn new_customer() -> CustomerAgent {
    Agent::new(Credentials::generate(Role::Customer), CustomerState::new(catalog()))
}

async fn customer_signup(user: &mut GooseUser) -> TransactionResult {
    user.set_session_data(Some(new_customer()));
    customer_signup_step(user).await
}

goose_step!(customer_signup_step, CustomerAgent, agent::signup);
goose_step!(customer_login, CustomerAgent, agent::login);
goose_step!(customer_add_address, CustomerAgent, customer::add_address);
goose_step!(customer_list_stores, CustomerAgent, customer::list_stores);
goose_step!(customer_list_menus, CustomerAgent, customer::list_menus);
goose_step!(customer_add_cart_item, CustomerAgent, customer::add_cart_item);
goose_step!(customer_read_cart, CustomerAgent, customer::read_cart);
goose_step!(customer_create_order, CustomerAgent, customer::create_order);

/// Pause between transactions, or none when think time is off.
fn paced(scenario: Scenario, wait: (Duration, Duration), think_time: bool) -> Result<Scenario, GooseError> {
    if think_time {
        scenario.set_wait_time(wait.0, wait.1)
    } else {
        Ok(scenario)
    }
}

pub fn customer_scenario(weight: usize, think_time: bool) -> Result<Scenario, GooseError> {
    let scenario = paced(scenario!("CustomerUser").set_weight(weight)?, CUSTOMER_WAIT, think_time)?;
    Ok(scenario
        .register_transaction(transaction!(customer_signup).set_name("Signup").set_on_start().set_sequence(1))
        .register_transaction(transaction!(customer_login).set_name("Login").set_on_start().set_sequence(2))
        .register_transaction(transaction!(customer_add_address).set_name("Add Address").set_sequence(3))
        .register_transaction(transaction!(customer_list_stores).set_name("Get Stores").set_sequence(4))
        .register_transaction(transaction!(customer_list_menus).set_name("Get Menus").set_sequence(5))
        .register_transaction(transaction!(customer_add_cart_item).set_name("Add Cart Item").set_sequence(6))
        .register_transaction(transaction!(customer_read_cart).set_name("Get Cart").set_sequence(7))
        .register_transaction(transaction!(customer_create_order).set_name("Create Order").set_sequence(8)))
}

// ============================================================================
// Owner
// ============================================================================

pub const OWNER_WAIT: (Duration, Duration) = (Duration::from_secs(5), Duration::from_secs(10));

async fn owner_signup(user: &mut GooseUser) -> TransactionResult {
    user.set_session_data(Some(Agent::new(
        Credentials::generate(Role::Owner),
        OwnerState::default(),
    )));
    owner_signup_step(user).await
}

goose_step!(owner_signup_step, OwnerAgent, agent::signup);
goose_step!(owner_login, OwnerAgent, agent::login);
goose_step!(owner_create_store, OwnerAgent, owner::create_store);
goose_step!(owner_create_menu, OwnerAgent, owner::create_menu);
goose_step!(owner_update_stock, OwnerAgent, owner::update_stock);

pub fn owner_scenario(weight: usize, think_time: bool) -> Result<Scenario, GooseError> {
    let scenario = paced(scenario!("OwnerUser").set_weight(weight)?, OWNER_WAIT, think_time)?;
    Ok(scenario
        .register_transaction(transaction!(owner_signup).set_name("Signup").set_on_start().set_sequence(1))
        .register_transaction(transaction!(owner_login).set_name("Login").set_on_start().set_sequence(2))
        .register_transaction(transaction!(owner_create_store).set_name("Create Store").set_sequence(3))
        .register_transaction(transaction!(owner_create_menu).set_name("Create Menu").set_sequence(4))
        .register_transaction(transaction!(owner_update_stock).set_name("Update Stock").set_sequence(5)))
}

// ============================================================================
// Attack
// ============================================================================

/// Success and failure counts of one request name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTally {
    pub name: String,
    pub success: usize,
    pub fail: usize,
}

/// Aggregate numbers of one finished attack
#[derive(Debug, Clone, PartialEq)]
pub struct AttackSummary {
    pub total: usize,
    pub errors: usize,
    pub success_rate: f64,
    pub duration_secs: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    /// Per request name, sorted by name
    pub requests: Vec<RequestTally>,
}

impl AttackSummary {
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.total as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    pub fn request(&self, name: &str) -> Option<&RequestTally> {
        self.requests.iter().find(|r| r.name == name)
    }

    fn from_metrics(metrics: &GooseMetrics) -> Self {
        // Aggregates carry the request name in `path`.
        let mut requests: Vec<RequestTally> = metrics
            .requests
            .values()
            .map(|agg| RequestTally {
                name: agg.path.clone(),
                success: agg.success_count,
                fail: agg.fail_count,
            })
            .collect();
        requests.sort_by(|a, b| a.name.cmp(&b.name));

        let total_success: usize = requests.iter().map(|r| r.success).sum();
        let total_fail: usize = requests.iter().map(|r| r.fail).sum();
        let total = total_success + total_fail;
        let success_rate = if total > 0 {
            (total_success as f64 / total as f64) * 100.0
        } else {
            100.0
        };
        let (p50, p95, p99) = LATENCY_TRACKER.overall();

        Self {
            total,
            errors: total_fail,
            success_rate,
            duration_secs: metrics.duration as f64,
            p50,
            p95,
            p99,
            requests,
        }
    }
}

/// Run the attack with goose's command line applied on top of `config`.
pub async fn run_attack(config: &LoadConfig) -> Result<AttackSummary, GooseError> {
    run_attack_with(GooseAttack::initialize()?, config).await
}

/// Register the selected scenarios on `attack`, apply `config` as goose
/// defaults and run the attack to completion.
pub async fn run_attack_with(attack: GooseAttack, config: &LoadConfig) -> Result<AttackSummary, GooseError> {
    reset_latency_tracker();
    if !install_catalog(config.catalog.clone()) && catalog() != config.catalog {
        log::warn!("catalog already installed, keeping store {}", catalog().store_id);
    }

    let mut attack = attack;
    if config.scenario.includes_customer() {
        attack = attack.register_scenario(customer_scenario(config.customer_weight, config.think_time)?);
    }
    if config.scenario.includes_owner() {
        attack = attack.register_scenario(owner_scenario(config.owner_weight, config.think_time)?);
    }

    // Signup and login run while users are still hatching; resetting the
    // metrics once all users are up would drop them.
    let hatch_rate = config.hatch_rate.to_string();
    let attack = attack
        .set_default(GooseDefault::Host, config.host.as_str())?
        .set_default(GooseDefault::AcceptInvalidCerts, config.accept_invalid_certs)?
        .set_default(GooseDefault::Users, config.users)?
        .set_default(GooseDefault::HatchRate, hatch_rate.as_str())?
        .set_default(GooseDefault::NoResetMetrics, true)?;
    let attack = match config.run_time {
        Some(secs) => attack.set_default(GooseDefault::RunTime, secs as usize)?,
        None => attack.set_default(GooseDefault::Iterations, config.iterations)?,
    };

    let metrics = attack.execute().await?;
    Ok(AttackSummary::from_metrics(&metrics))
}
