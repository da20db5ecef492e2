use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One line of a cart, identified by product and size.
///
/// The wire form is `"{product_id}-{size}"`, a flat string key in a JSON
/// object. Product ids are integers, so the first `-` always separates the
/// id from the size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CartKey {
    pub product_id: i32,
    pub size: String,
}

impl CartKey {
    pub fn new(product_id: i32, size: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
        }
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.product_id, self.size)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid cart key: {0:?}")]
pub struct ParseCartKeyError(String);

impl FromStr for CartKey {
    type Err = ParseCartKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, size) = s.split_once('-').ok_or_else(|| ParseCartKeyError(s.into()))?;
        let product_id = id.parse().map_err(|_| ParseCartKeyError(s.into()))?;
        if size.is_empty() {
            return Err(ParseCartKeyError(s.into()));
        }
        Ok(Self {
            product_id,
            size: size.to_string(),
        })
    }
}

/// The cart document: a sparse mapping of cart key to quantity.
///
/// Invariant: a key is present iff its quantity is >= 1. Removing the last
/// unit deletes the key instead of storing zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct Cart(BTreeMap<String, i64>);

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from the stored JSON document. Anything that is not
    /// an object of positive integer quantities is dropped, so a null or
    /// damaged column yields an empty cart instead of an error.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut cart = Self::new();
        if let Some(map) = value.as_object() {
            for (key, qty) in map {
                if let Some(qty) = qty.as_i64().filter(|q| *q >= 1) {
                    cart.0.insert(key.clone(), qty);
                }
            }
        }
        cart
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
                .collect(),
        )
    }

    /// Increment the quantity at `key` by one, creating it at 1 if absent.
    /// Returns the new quantity.
    pub fn add(&mut self, key: &CartKey) -> i64 {
        let qty = self.0.entry(key.to_string()).or_insert(0);
        *qty += 1;
        *qty
    }

    /// Decrement-or-delete: the key is deleted entirely when `remove_all`
    /// is set or the quantity is <= 1, otherwise decremented by exactly
    /// one. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &CartKey, remove_all: bool) {
        let wire_key = key.to_string();
        let Some(qty) = self.0.get_mut(&wire_key) else {
            return;
        };
        if remove_all || *qty <= 1 {
            self.0.remove(&wire_key);
        } else {
            *qty -= 1;
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn quantity(&self, key: &CartKey) -> i64 {
        self.0.get(&key.to_string()).copied().unwrap_or(0)
    }

    /// Sum of all quantities across keys.
    pub fn total_items(&self) -> i64 {
        self.0.values().sum()
    }

    /// Iterate entries in wire form.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate entries with parsed keys, dropping any that do not parse.
    pub fn lines(&self) -> impl Iterator<Item = (CartKey, i64)> + '_ {
        self.0
            .iter()
            .filter_map(|(k, v)| k.parse::<CartKey>().ok().map(|key| (key, *v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i32, size: &str) -> CartKey {
        CartKey::new(id, size)
    }

    #[test]
    fn add_n_times_yields_quantity_n() {
        let mut cart = Cart::new();
        for _ in 0..5 {
            cart.add(&key(1, "M"));
        }
        cart.add(&key(2, "L"));
        assert_eq!(cart.quantity(&key(1, "M")), 5);
        assert_eq!(cart.quantity(&key(2, "L")), 1);
    }

    #[test]
    fn add_then_get_round_trip() {
        let mut cart = Cart::new();
        cart.add(&key(7, "S"));
        assert_eq!(cart.quantity(&key(7, "S")), 1);
        cart.add(&key(7, "S"));
        assert_eq!(cart.quantity(&key(7, "S")), 2);
    }

    #[test]
    fn remove_all_deletes_key_from_any_quantity() {
        let mut cart = Cart::new();
        for _ in 0..4 {
            cart.add(&key(1, "M"));
        }
        cart.remove(&key(1, "M"), true);
        assert_eq!(cart.quantity(&key(1, "M")), 0);

        // removeAll on an absent key is still a no-op that leaves it absent
        cart.remove(&key(1, "M"), true);
        assert_eq!(cart.quantity(&key(1, "M")), 0);
    }

    #[test]
    fn remove_at_quantity_one_deletes_key() {
        let mut cart = Cart::new();
        cart.add(&key(3, "XL"));
        cart.remove(&key(3, "XL"), false);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_above_one_decrements_and_keeps_key() {
        let mut cart = Cart::new();
        cart.add(&key(3, "XL"));
        cart.add(&key(3, "XL"));
        cart.add(&key(3, "XL"));
        cart.remove(&key(3, "XL"), false);
        assert_eq!(cart.quantity(&key(3, "XL")), 2);
    }

    #[test]
    fn remove_missing_key_is_a_noop() {
        let mut cart = Cart::new();
        cart.add(&key(1, "M"));
        let before = cart.clone();
        cart.remove(&key(9, "S"), false);
        assert_eq!(cart, before);
    }

    #[test]
    fn clear_then_get_is_empty() {
        let mut cart = Cart::new();
        cart.add(&key(1, "M"));
        cart.add(&key(2, "L"));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn total_items_sums_quantities() {
        let mut cart = Cart::new();
        cart.add(&key(1, "M"));
        cart.add(&key(1, "M"));
        cart.add(&key(2, "L"));
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn wire_key_round_trip() {
        let k = key(42, "XXL");
        assert_eq!(k.to_string(), "42-XXL");
        assert_eq!("42-XXL".parse::<CartKey>().unwrap(), k);
    }

    #[test]
    fn malformed_keys_do_not_parse() {
        assert!("".parse::<CartKey>().is_err());
        assert!("42".parse::<CartKey>().is_err());
        assert!("42-".parse::<CartKey>().is_err());
        assert!("abc-M".parse::<CartKey>().is_err());
    }

    #[test]
    fn from_value_drops_junk_entries() {
        let value = serde_json::json!({
            "1-M": 2,
            "2-L": 0,
            "3-S": -4,
            "4-XL": "two",
        });
        let cart = Cart::from_value(&value);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity(&key(1, "M")), 2);

        assert!(Cart::from_value(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn to_value_serializes_flat_object() {
        let mut cart = Cart::new();
        cart.add(&key(1, "M"));
        cart.add(&key(1, "M"));
        cart.add(&key(2, "L"));
        assert_eq!(
            cart.to_value(),
            serde_json::json!({ "1-M": 2, "2-L": 1 })
        );
    }
}
