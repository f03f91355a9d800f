//! Customer purchase workflow: address, catalog, cart, checkout.
//!
//! | Step         | On failure |
//! |--------------|------------|
//! | Add address  | continue   |
//! | List stores  | halt       |
//! | List menus   | halt       |
//! | Add to cart  | continue   |
//! | Read cart    | continue, total reads as 0 |
//! | Create order | continue   |

use crate::agent::{self, expect_success, Agent, OnFailure, StepFailure, StepStatus};
use crate::cart::{cart_total, CartSnapshot, MenuPrices, OrderDraft};
use crate::envelope;
use crate::payload::{self, menus_path, FixedCatalog, ADDRESS_PATH, CART_ITEM_PATH, CART_PATH, ORDER_PATH, STORES_PATH};
use crate::transport::{ApiRequest, Transport};

pub const ADD_ADDRESS_POLICY: OnFailure = OnFailure::Continue;
pub const LIST_STORES_POLICY: OnFailure = OnFailure::Halt;
pub const LIST_MENUS_POLICY: OnFailure = OnFailure::Halt;
pub const ADD_CART_ITEM_POLICY: OnFailure = OnFailure::Continue;
pub const READ_CART_POLICY: OnFailure = OnFailure::Continue;
pub const CREATE_ORDER_POLICY: OnFailure = OnFailure::Continue;

/// What a customer carries from one step to the next.
#[derive(Debug, Clone, Default)]
pub struct CustomerState {
    pub catalog: FixedCatalog,
    pub store_id: Option<String>,
    pub menu_id: Option<String>,
    pub menu_price: Option<i64>,
    pub cart_quantity: u32,
    pub address_id: Option<String>,
    pub cart_total: i64,
}

impl CustomerState {
    pub fn new(catalog: FixedCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }
}

pub type CustomerAgent = Agent<CustomerState>;

pub async fn add_address<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let request = ApiRequest::post(ADDRESS_PATH, agent.request_name("Add Address"), payload::address());
    let result = match expect_success(transport, request, "failed to add address").await {
        Ok(reply) => match envelope::address_id(&reply.body) {
            Some(id) => {
                agent.state.address_id = Some(id);
                Ok(())
            }
            None => Err(StepFailure::on(&reply, "address id not found in response")),
        },
        Err(failure) => Err(failure),
    };
    agent.settle(transport, ADD_ADDRESS_POLICY, result)
}

/// Select the fixed store and menu, then list stores.
pub async fn list_stores<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    agent.state.store_id = Some(agent.state.catalog.store_id.clone());
    agent.state.menu_id = Some(agent.state.catalog.menu_id.clone());

    let request = ApiRequest::get(STORES_PATH, agent.request_name("Get Stores"));
    let result = expect_success(transport, request, "failed to get stores")
        .await
        .map(|_| ());
    agent.settle(transport, LIST_STORES_POLICY, result)
}

/// List the fixed store's menus and look up the fixed menu's price.
pub async fn list_menus<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let Some(store_id) = agent.state.store_id.clone() else {
        return agent.halt("no store selected");
    };
    let wanted = agent.state.catalog.menu_id.clone();

    let request = ApiRequest::get(menus_path(&store_id), agent.request_name("Get Menus"));
    let result = match expect_success(transport, request, "failed to get menus").await {
        Ok(reply) => {
            let menus = envelope::menu_entries(&reply.body);
            if menus.is_empty() {
                Err(StepFailure::on(&reply, "no menus available"))
            } else if let Some(menu) = menus.iter().find(|m| m.menu_id == wanted) {
                agent.state.menu_price = Some(menu.price);
                Ok(())
            } else {
                Err(StepFailure::on(&reply, format!("menu {wanted} not found in store {store_id}")))
            }
        }
        Err(failure) => Err(failure),
    };
    agent.settle(transport, LIST_MENUS_POLICY, result)
}

/// Add one unit of the selected menu. The response is not inspected.
pub async fn add_cart_item<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let (Some(store_id), Some(menu_id)) = (agent.state.store_id.clone(), agent.state.menu_id.clone()) else {
        return StepStatus::Skipped;
    };
    agent.state.cart_quantity += 1;

    let request = ApiRequest::post(
        CART_ITEM_PATH,
        agent.request_name("Add Cart Item"),
        payload::cart_item(&store_id, &menu_id),
    );
    let result = transport.send(request).await.map(|_| ()).map_err(|e| StepFailure {
        ticket: None,
        reason: e.to_string(),
    });
    agent.settle(transport, ADD_CART_ITEM_POLICY, result)
}

/// Read the cart and compute its total. A list cart is priced against a
/// fresh menu listing; an object cart carries its own `totalPrice`.
pub async fn read_cart<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let request = ApiRequest::get(CART_PATH, agent.request_name("Get Cart"));
    let reply = match expect_success(transport, request, "failed to get cart").await {
        Ok(reply) => reply,
        Err(failure) => {
            agent.state.cart_total = 0;
            return agent.settle(transport, READ_CART_POLICY, Err(failure));
        }
    };

    let snapshot = CartSnapshot::from_body(&reply.body);
    let result = match &snapshot {
        CartSnapshot::Lines(lines) => {
            let store_id = agent
                .state
                .store_id
                .clone()
                .unwrap_or_else(|| agent.state.catalog.store_id.clone());
            let price_request = ApiRequest::get(menus_path(&store_id), agent.request_name("Get Menus for Price"));
            match expect_success(transport, price_request, "failed to get menus for price").await {
                Ok(menus) => {
                    let prices: MenuPrices = envelope::menu_entries(&menus.body).into_iter().collect();
                    if let Some(first) = snapshot.first_line() {
                        agent.state.menu_id = first.menu_id.clone();
                        agent.state.cart_quantity = first.quantity;
                    }
                    agent.state.cart_total = cart_total(lines, &prices);
                    Ok(())
                }
                Err(lookup) => {
                    agent.state.cart_total = 0;
                    // The price lookup reports itself; the cart read fails with it.
                    if let Some(ticket) = lookup.ticket {
                        transport.fail(ticket, &lookup.reason);
                    }
                    Err(StepFailure::on(&reply, lookup.reason))
                }
            }
        }
        CartSnapshot::Summary { total_price } => {
            agent.state.cart_total = *total_price;
            Ok(())
        }
        CartSnapshot::Empty => {
            agent.state.cart_total = 0;
            Ok(())
        }
    };
    agent.settle(transport, READ_CART_POLICY, result)
}

/// Place the order, unless the cart is empty or has no total.
pub async fn create_order<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let Some(draft) = OrderDraft::from_cart(agent.state.cart_quantity, agent.state.cart_total) else {
        log::debug!(
            "{}: skipping order, cart quantity {} total {}",
            agent.credentials.username,
            agent.state.cart_quantity,
            agent.state.cart_total
        );
        return StepStatus::Skipped;
    };

    let request = ApiRequest::post(ORDER_PATH, agent.request_name("Create Order"), payload::order(&draft));
    let result = expect_success(transport, request, "failed to create order")
        .await
        .map(|_| ());
    agent.settle(transport, CREATE_ORDER_POLICY, result)
}

/// Statuses of a full customer run, in step order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRun {
    pub signup: StepStatus,
    pub login: StepStatus,
    pub add_address: StepStatus,
    pub list_stores: StepStatus,
    pub list_menus: StepStatus,
    pub add_cart_item: StepStatus,
    pub read_cart: StepStatus,
    pub create_order: StepStatus,
}

impl CustomerRun {
    pub fn steps(&self) -> [(&'static str, StepStatus); 8] {
        [
            ("Signup", self.signup),
            ("Login", self.login),
            ("Add Address", self.add_address),
            ("Get Stores", self.list_stores),
            ("Get Menus", self.list_menus),
            ("Add Cart Item", self.add_cart_item),
            ("Get Cart", self.read_cart),
            ("Create Order", self.create_order),
        ]
    }
}

/// Bootstrap and run the whole customer workflow once, in order.
pub async fn run<T: Transport + ?Sized>(transport: &mut T, agent: &mut CustomerAgent) -> CustomerRun {
    CustomerRun {
        signup: agent::signup(transport, agent).await,
        login: agent::login(transport, agent).await,
        add_address: add_address(transport, agent).await,
        list_stores: list_stores(transport, agent).await,
        list_menus: list_menus(transport, agent).await,
        add_cart_item: add_cart_item(transport, agent).await,
        read_cart: read_cart(transport, agent).await,
        create_order: create_order(transport, agent).await,
    }
}
