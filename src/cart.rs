//! Cart snapshots, total computation and order gating.

use crate::envelope::{self, MenuEntry};
use serde_json::Value;
use std::collections::HashMap;

/// One line of a cart listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub menu_id: Option<String>,
    pub quantity: u32,
}

/// What `GET /order/order/cart` reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartSnapshot {
    /// Non-empty list of lines; prices must be looked up separately
    Lines(Vec<CartLine>),
    /// Object form carrying the backend-computed `totalPrice`
    Summary { total_price: i64 },
    Empty,
}

impl CartSnapshot {
    /// Interpret a cart response body. Non-object list entries are ignored,
    /// a missing quantity reads as 0.
    pub fn from_body(body: &str) -> Self {
        match envelope::result(body) {
            Some(Value::Array(items)) if !items.is_empty() => Self::Lines(
                items
                    .iter()
                    .filter(|item| item.is_object())
                    .map(|item| CartLine {
                        menu_id: envelope::id_field(item, "menuId"),
                        quantity: item
                            .get("quantity")
                            .and_then(Value::as_u64)
                            .and_then(|q| u32::try_from(q).ok())
                            .unwrap_or(0),
                    })
                    .collect(),
            ),
            Some(Value::Object(summary)) => Self::Summary {
                total_price: summary
                    .get("totalPrice")
                    .and_then(envelope::amount)
                    .unwrap_or(0),
            },
            _ => Self::Empty,
        }
    }

    pub fn first_line(&self) -> Option<&CartLine> {
        match self {
            Self::Lines(lines) => lines.first(),
            _ => None,
        }
    }
}

/// Menu id to unit price
#[derive(Debug, Clone, Default)]
pub struct MenuPrices(HashMap<String, i64>);

impl MenuPrices {
    pub fn price(&self, menu_id: &str) -> Option<i64> {
        self.0.get(menu_id).copied()
    }
}

impl FromIterator<MenuEntry> for MenuPrices {
    fn from_iter<I: IntoIterator<Item = MenuEntry>>(iter: I) -> Self {
        Self(iter.into_iter().map(|m| (m.menu_id, m.price)).collect())
    }
}

/// Sum of `price * quantity`, saturating at the `i64` bounds. Lines whose
/// menu is unknown contribute 0.
pub fn cart_total(lines: &[CartLine], prices: &MenuPrices) -> i64 {
    lines
        .iter()
        .map(|line| {
            let price = line
                .menu_id
                .as_deref()
                .and_then(|id| prices.price(id))
                .unwrap_or(0);
            price.saturating_mul(i64::from(line.quantity))
        })
        .fold(0i64, i64::saturating_add)
}

/// An order that is worth submitting: non-empty cart with a non-zero total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDraft {
    quantity: u32,
    total_price: i64,
}

impl OrderDraft {
    pub fn from_cart(quantity: u32, total_price: i64) -> Option<Self> {
        if quantity == 0 || total_price == 0 {
            return None;
        }
        Some(Self {
            quantity,
            total_price,
        })
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_price(&self) -> i64 {
        self.total_price
    }
}
