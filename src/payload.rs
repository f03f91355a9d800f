//! Request bodies and the endpoint map of the backend under test.

use crate::cart::OrderDraft;
use crate::credentials::{random_phone_number, uuid_fragment, Credentials};
use serde_json::{json, Value};

// ============================================================================
// Endpoints
// ============================================================================

pub const SIGNUP_PATH: &str = "/user/user/signup";
pub const LOGIN_PATH: &str = "/auth/auth/login";
pub const ADDRESS_PATH: &str = "/user/user/address/add";
pub const STORES_PATH: &str = "/store/store/customer";
pub const CART_ITEM_PATH: &str = "/order/order/item";
pub const CART_PATH: &str = "/order/order/cart";
pub const ORDER_PATH: &str = "/order/order";
pub const OWNER_STORE_PATH: &str = "/store/store/owner";
pub const OWNER_MENU_PATH: &str = "/store/store/owner/menu";
pub const OWNER_STOCK_PATH: &str = "/store/store/owner/menu/stock";

/// Menu listing for one store
pub fn menus_path(store_id: &str) -> String {
    format!("/store/store/menu/{store_id}")
}

// ============================================================================
// Fixed data
// ============================================================================

/// Store every customer browses unless overridden
pub const DEFAULT_STORE_ID: &str = "5d55692d-4573-4c7a-9ae5-c9d211b3e80b";

/// Menu every customer buys unless overridden
pub const DEFAULT_MENU_ID: &str = "202943ac-7a28-4909-acce-e2f86c2eb5a2";

pub const REGION_ID: &str = "3bf1fca4-32b4-45b7-bf99-1822aefcec7a";
pub const CATEGORY_ID: &str = "6530a750-89b7-44af-aebc-0e008fbeccd7";

/// Price of every owner-created menu
pub const MENU_PRICE: i64 = 17_000;

/// Stock level owners set on their new menu
pub const STOCK_QUANTITY: u32 = 100;

pub const MIN_ORDER_AMOUNT: i64 = 10_000;

pub const DELIVERY_ADDRESS: &str = "123 Main St, Apt 101";

/// Store and menu identifiers shared read-only by all customer agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCatalog {
    pub store_id: String,
    pub menu_id: String,
}

impl Default for FixedCatalog {
    fn default() -> Self {
        Self {
            store_id: DEFAULT_STORE_ID.to_string(),
            menu_id: DEFAULT_MENU_ID.to_string(),
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn signup(creds: &Credentials) -> Value {
    json!({
        "username": creds.username,
        "password": creds.password,
        "email": creds.email,
        "nickname": creds.nickname,
        "realName": creds.real_name,
        "phoneNumber": creds.phone_number,
        "userRole": creds.role.as_str(),
    })
}

pub fn login(creds: &Credentials) -> Value {
    json!({
        "username": creds.username,
        "password": creds.password,
    })
}

pub fn address() -> Value {
    json!({
        "alias": "My Home",
        "address": uuid_fragment(12),
        "addressDetail": "Apt 101",
        "isDefault": "true",
    })
}

pub fn cart_item(store_id: &str, menu_id: &str) -> Value {
    json!({
        "menuId": menu_id,
        "storeId": store_id,
        "quantity": 1,
    })
}

/// Order body. Only constructible from a validated [`OrderDraft`].
pub fn order(draft: &OrderDraft) -> Value {
    json!({
        "paymentMethod": "CREDIT_CARD",
        "orderChannel": "ONLINE",
        "receiptMethod": "DELIVERY",
        "requestMessage": "Load test order",
        "totalPrice": draft.total_price(),
        "deliveryAddress": DELIVERY_ADDRESS,
    })
}

pub fn store() -> Value {
    json!({
        "storeName": format!("Load Store {}", uuid_fragment(12)),
        "regionId": REGION_ID,
        "categoryId": CATEGORY_ID,
        "desc": "A great store for testing.",
        "address": "123 Load St.",
        "phoneNumber": random_phone_number(),
        "minOrderAmount": MIN_ORDER_AMOUNT,
    })
}

pub fn menu(store_id: &str) -> Value {
    json!({
        "storeId": store_id,
        "name": format!("Load Menu {}", uuid_fragment(12)),
        "price": MENU_PRICE,
        "description": "Test menu for load testing.",
    })
}

pub fn stock(menu_id: &str) -> Value {
    json!({
        "menuId": menu_id,
        "quantity": STOCK_QUANTITY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Role;

    #[test]
    fn signup_carries_role_and_identity() {
        let creds = Credentials::for_username(Role::Owner, "owner_x");
        let body = signup(&creds);
        assert_eq!(body["username"], "owner_x");
        assert_eq!(body["email"], "owner_x@example.com");
        assert_eq!(body["userRole"], "OWNER");
        assert_eq!(body["realName"], "Owner");
        assert_eq!(login(&creds), json!({"username": "owner_x", "password": "password123!"}));
    }

    #[test]
    fn menu_uses_constant_price() {
        let body = menu("store-1");
        assert_eq!(body["storeId"], "store-1");
        assert_eq!(body["price"], 17_000);
        assert!(body["name"].as_str().unwrap().starts_with("Load Menu "));
    }

    #[test]
    fn order_embeds_draft_total() {
        let draft = OrderDraft::from_cart(2, 34_000).unwrap();
        let body = order(&draft);
        assert_eq!(body["totalPrice"], 34_000);
        assert_eq!(body["paymentMethod"], "CREDIT_CARD");
    }

    #[test]
    fn address_is_random_hex() {
        let body = address();
        let value = body["address"].as_str().unwrap();
        assert_eq!(value.len(), 12);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stock_and_cart_bodies() {
        assert_eq!(stock("m-1"), json!({"menuId": "m-1", "quantity": 100}));
        assert_eq!(
            cart_item("s-1", "m-1"),
            json!({"menuId": "m-1", "storeId": "s-1", "quantity": 1})
        );
        assert_eq!(menus_path("s-1"), "/store/store/menu/s-1");
    }
}
