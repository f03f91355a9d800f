//! Parsing of the backend's `{"result": ...}` response envelope.
//!
//! All accessors are lenient: malformed bodies and missing fields read as
//! `None`, and the calling step decides whether that is a failure.

use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
}

/// The `result` member of an envelope, or `None` when the body is not JSON
/// or carries no result.
pub fn result(body: &str) -> Option<Value> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) if !envelope.result.is_null() => Some(envelope.result),
        _ => None,
    }
}

/// Identifier under `key`, normalised to a string. Numbers are accepted,
/// empty strings are not.
pub fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer amount, accepting JSON floats by rounding.
pub fn amount(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

fn result_id(body: &str, key: &str) -> Option<String> {
    result(body).and_then(|r| id_field(&r, key))
}

pub fn access_token(body: &str) -> Option<String> {
    result_id(body, "accessToken")
}

pub fn address_id(body: &str) -> Option<String> {
    result_id(body, "address_id")
}

pub fn store_id(body: &str) -> Option<String> {
    result_id(body, "storeId")
}

pub fn menu_id(body: &str) -> Option<String> {
    result_id(body, "menuId")
}

/// One entry of a store's menu page
#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    pub menu_id: String,
    pub price: i64,
}

/// Entries of `result.content`. Entries without a menu id are dropped and a
/// missing price reads as 0.
pub fn menu_entries(body: &str) -> Vec<MenuEntry> {
    let Some(result) = result(body) else {
        return Vec::new();
    };
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return Vec::new();
    };
    content
        .iter()
        .filter_map(|menu| {
            let menu_id = id_field(menu, "menuId")?;
            let price = menu.get("price").and_then(amount).unwrap_or(0);
            Some(MenuEntry { menu_id, price })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_token_from_result() {
        let body = json!({"result": {"accessToken": "T"}}).to_string();
        assert_eq!(access_token(&body).as_deref(), Some("T"));
    }

    #[test]
    fn missing_or_empty_fields_are_none() {
        assert_eq!(access_token(r#"{"result": {}}"#), None);
        assert_eq!(access_token(r#"{"result": {"accessToken": ""}}"#), None);
        assert_eq!(access_token(r#"{"message": "nope"}"#), None);
        assert_eq!(access_token("<html>502</html>"), None);
        assert_eq!(store_id(r#"{"result": null}"#), None);
    }

    #[test]
    fn numeric_ids_become_strings() {
        assert_eq!(address_id(r#"{"result": {"address_id": 42}}"#).as_deref(), Some("42"));
        assert_eq!(menu_id(r#"{"result": {"menuId": "m-1"}}"#).as_deref(), Some("m-1"));
    }

    #[test]
    fn menu_entries_tolerate_partial_records() {
        let body = json!({"result": {"content": [
            {"menuId": "a", "price": 17000},
            {"menuId": "b"},
            {"price": 3},
            {"menuId": "c", "price": 1500.0},
        ]}})
        .to_string();
        assert_eq!(
            menu_entries(&body),
            vec![
                MenuEntry { menu_id: "a".into(), price: 17_000 },
                MenuEntry { menu_id: "b".into(), price: 0 },
                MenuEntry { menu_id: "c".into(), price: 1_500 },
            ]
        );
        assert!(menu_entries(r#"{"result": []}"#).is_empty());
    }
}
