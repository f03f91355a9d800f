//! Owner provisioning workflow: create a store, add a menu to it, stock it.

use crate::agent::{self, expect_success, Agent, OnFailure, StepFailure, StepStatus};
use crate::envelope;
use crate::payload::{self, OWNER_MENU_PATH, OWNER_STOCK_PATH, OWNER_STORE_PATH};
use crate::transport::{ApiRequest, Transport};

pub const CREATE_STORE_POLICY: OnFailure = OnFailure::Halt;
pub const CREATE_MENU_POLICY: OnFailure = OnFailure::Halt;
pub const UPDATE_STOCK_POLICY: OnFailure = OnFailure::Continue;

/// Identifiers an owner creates along the way. Both start unset; stock is
/// only ever updated for a menu this owner created.
#[derive(Debug, Clone, Default)]
pub struct OwnerState {
    pub store_id: Option<String>,
    pub menu_id: Option<String>,
}

pub type OwnerAgent = Agent<OwnerState>;

pub async fn create_store<T: Transport + ?Sized>(transport: &mut T, agent: &mut OwnerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let request = ApiRequest::post(OWNER_STORE_PATH, agent.request_name("Create Store"), payload::store());
    let result = match expect_success(transport, request, "failed to create store").await {
        Ok(reply) => match envelope::store_id(&reply.body) {
            Some(id) => {
                agent.state.store_id = Some(id);
                Ok(())
            }
            None => Err(StepFailure::on(&reply, "store id not found in response")),
        },
        Err(failure) => Err(failure),
    };
    agent.settle(transport, CREATE_STORE_POLICY, result)
}

pub async fn create_menu<T: Transport + ?Sized>(transport: &mut T, agent: &mut OwnerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let Some(store_id) = agent.state.store_id.clone() else {
        return StepStatus::Skipped;
    };
    let request = ApiRequest::post(OWNER_MENU_PATH, agent.request_name("Create Menu"), payload::menu(&store_id));
    let result = match expect_success(transport, request, "failed to create menu").await {
        Ok(reply) => match envelope::menu_id(&reply.body) {
            Some(id) => {
                agent.state.menu_id = Some(id);
                Ok(())
            }
            None => Err(StepFailure::on(&reply, "menu id not found in response")),
        },
        Err(failure) => Err(failure),
    };
    agent.settle(transport, CREATE_MENU_POLICY, result)
}

pub async fn update_stock<T: Transport + ?Sized>(transport: &mut T, agent: &mut OwnerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let Some(menu_id) = agent.state.menu_id.clone() else {
        return StepStatus::Skipped;
    };
    let request = ApiRequest::put(OWNER_STOCK_PATH, agent.request_name("Update Stock"), payload::stock(&menu_id));
    let result = expect_success(transport, request, "failed to update stock")
        .await
        .map(|_| ());
    agent.settle(transport, UPDATE_STOCK_POLICY, result)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRun {
    pub signup: StepStatus,
    pub login: StepStatus,
    pub create_store: StepStatus,
    pub create_menu: StepStatus,
    pub update_stock: StepStatus,
}

impl OwnerRun {
    pub fn steps(&self) -> [(&'static str, StepStatus); 5] {
        [
            ("Signup", self.signup),
            ("Login", self.login),
            ("Create Store", self.create_store),
            ("Create Menu", self.create_menu),
            ("Update Stock", self.update_stock),
        ]
    }
}

pub async fn run<T: Transport + ?Sized>(transport: &mut T, agent: &mut OwnerAgent) -> OwnerRun {
    OwnerRun {
        signup: agent::signup(transport, agent).await,
        login: agent::login(transport, agent).await,
        create_store: create_store(transport, agent).await,
        create_menu: create_menu(transport, agent).await,
        update_stock: update_stock(transport, agent).await,
    }
}
