/* stilgar-firebase - Rudderstack events to Firebase Analytics calls
 * Copyright (C) 2023 Withings
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>. */

//! Parameter helpers: key normalisation, defensive coercions, generic
//! attachment of custom properties and product mapping

use crate::destinations::firebase::mapping::{
    FieldType, MAX_KEY_LENGTH, MAX_VALUE_LENGTH, PRODUCT_FIELDS, TRACK_RESERVED_KEYWORDS, param, property,
};
use crate::events::common::Properties;

use std::collections::HashMap;
use serde_json::Value;

/// Convenience type: a Firebase parameter bag
pub type Params = HashMap<String, Value>;

/// Keeps the first `max` characters of a string
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Turns any property name into a Firebase-compatible parameter name
///
/// Lowercased, trimmed, spaces replaced with underscores and capped at
/// 40 characters. Whitespace left at the end by the cut is trimmed as well
/// so that normalising twice changes nothing.
pub fn normalize_key(raw: &str) -> String {
    let key = raw.to_lowercase().trim().replace(' ', "_");
    truncate(&key, MAX_KEY_LENGTH).trim_end().to_string()
}

/// Whether a value is worth forwarding at all
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Parses a string as a finite float
fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Numbers, and strings holding a number
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => parse_float(s).is_some(),
        _ => false,
    }
}

/// Best-effort float conversion, 0.0 when there is nothing to convert
pub fn to_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_float(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Best-effort integer conversion, 0 when there is nothing to convert
///
/// Fractional numbers are truncated towards zero.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().ok()
            .or_else(|| parse_float(s).map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Canonical string form of a property value
///
/// Strings are kept as they are, numbers use their JSON form (`3`, `2.5`,
/// `10.0`), booleans become `true`/`false`, collections are rendered as
/// compact JSON. Null has no string form.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

/// A float parameter value
pub fn float_value(f: f64) -> Value {
    Value::from(f)
}

/// Forwards every custom property not otherwise handled
///
/// Runs last, so a custom property wins over a parameter set by an earlier
/// rule under the same key. On e-commerce events, reserved properties are
/// skipped since dedicated rules took care of them.
pub fn attach_custom_properties(params: &mut Params, properties: &Properties, is_ecommerce_event: bool) {
    for (key, value) in properties.iter() {
        let key = normalize_key(key);
        if is_ecommerce_event && TRACK_RESERVED_KEYWORDS.contains(key.as_str()) {
            continue;
        }
        if is_empty(value) {
            continue;
        }

        if is_numeric(value) {
            params.insert(key, float_value(to_float(value)));
        } else if let Value::String(s) = value {
            params.insert(key, Value::String(truncate(s, MAX_VALUE_LENGTH)));
        } else if let Some(s) = stringify(value) {
            /* Unlike actual strings, long renderings are dropped rather than cut */
            if s.chars().count() <= MAX_VALUE_LENGTH {
                params.insert(key, Value::String(s));
            }
        }
    }
}

/// Maps a single product, skipping fields which do not fit their type
pub fn map_product(fields: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    let mut product = serde_json::Map::new();
    for (source, destination, field_type) in PRODUCT_FIELDS.iter() {
        let value = match fields.get(*source) {
            Some(v) if !is_empty(v) => v,
            _ => continue,
        };

        let mapped = match field_type {
            FieldType::String => stringify(value).map(Value::String),
            FieldType::Integer if is_numeric(value) => Some(Value::from(to_int(value))),
            FieldType::Float if is_numeric(value) => Some(float_value(to_float(value))),
            _ => None,
        };

        if let Some(mapped) = mapped {
            product.insert(destination.to_string(), mapped);
        }
    }
    product
}

/// Maps the `products` array of an event, if any
pub fn map_products_array(properties: &Properties) -> Option<Value> {
    let products = properties.get(property::PRODUCTS)?.as_array()?;
    let items: Vec<Value> = products.iter()
        .filter_map(|p| p.as_object())
        .map(map_product)
        .filter(|p| !p.is_empty())
        .map(Value::Object)
        .collect();

    match items.is_empty() {
        true => None,
        false => Some(Value::Array(items)),
    }
}

/// Maps an event describing a single product with root-level properties
pub fn map_root_product(properties: &Properties) -> Option<Value> {
    let fields: serde_json::Map<String, Value> = properties.iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let product = map_product(&fields);

    match product.is_empty() {
        true => None,
        false => Some(Value::Array(vec!(Value::Object(product)))),
    }
}

/// Sets the `items` parameter from the products array or root-level product
pub fn attach_products(params: &mut Params, properties: &Properties, array_mode: bool) {
    let items = match array_mode {
        true => map_products_array(properties),
        false => map_root_product(properties),
    };
    if let Some(items) = items {
        params.insert(param::ITEMS.to_string(), items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn keys_are_normalized() {
        assert_eq!(normalize_key("  Cart Value "), "cart_value");
        assert_eq!(normalize_key("ALREADY_fine"), "already_fine");
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key(&"x".repeat(50)).len(), MAX_KEY_LENGTH);
    }

    #[test]
    fn key_normalization_is_idempotent() {
        let samples = [
            "  Mixed Case Key  ",
            "tab\tinside",
            "a very long property name which goes well beyond forty characters",
            "ends with a tab at forty characters.....\tand then more",
            "Ünïcödé Kéy",
            "",
            "   ",
        ];
        for sample in samples.iter() {
            let once = normalize_key(sample);
            assert_eq!(normalize_key(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn emptiness() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!({})));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
        assert!(!is_empty(&json!(" ")));
        assert!(!is_empty(&json!([null])));
    }

    #[test]
    fn numeric_coercions_never_fail() {
        assert!(is_numeric(&json!(3)));
        assert!(is_numeric(&json!("12.5")));
        assert!(!is_numeric(&json!("12.5€")));
        assert!(!is_numeric(&json!("NaN")));
        assert!(!is_numeric(&json!(true)));

        assert_eq!(to_float(&json!("12.5")), 12.5);
        assert_eq!(to_float(&json!(7)), 7.0);
        assert_eq!(to_float(&json!("abc")), 0.0);
        assert_eq!(to_float(&json!([1])), 0.0);

        assert_eq!(to_int(&json!(3)), 3);
        assert_eq!(to_int(&json!("4")), 4);
        assert_eq!(to_int(&json!(2.9)), 2);
        assert_eq!(to_int(&json!("2.9")), 2);
        assert_eq!(to_int(&json!("two")), 0);
    }

    #[test]
    fn stringification() {
        assert_eq!(stringify(&json!("x")).as_deref(), Some("x"));
        assert_eq!(stringify(&json!(true)).as_deref(), Some("true"));
        assert_eq!(stringify(&json!(42)).as_deref(), Some("42"));
        assert_eq!(stringify(&json!(2.5)).as_deref(), Some("2.5"));
        assert_eq!(stringify(&json!([1, "a"])).as_deref(), Some("[1,\"a\"]"));
        assert_eq!(stringify(&Value::Null), None);
    }

    #[test]
    fn long_strings_are_cut_but_long_renderings_are_dropped() {
        let long_string = "s".repeat(150);
        let long_list: Vec<u32> = (0..100).collect();
        let mut params = Params::new();
        attach_custom_properties(&mut params, &props(json!({
            "long string": long_string,
            "long list": long_list,
            "short list": [1, 2],
        })), false);

        assert_eq!(params["long_string"], json!("s".repeat(100)));
        assert!(!params.contains_key("long_list"));
        assert_eq!(params["short_list"], json!("[1,2]"));
    }

    #[test]
    fn custom_properties_are_coerced() {
        let mut params = Params::new();
        attach_custom_properties(&mut params, &props(json!({
            "Count": 3,
            "zip": "02134",
            "flag": false,
            "label": "hello",
            "nothing": null,
            "blank": "",
        })), false);

        assert_eq!(params.len(), 4);
        assert_eq!(params["count"], json!(3.0));
        assert_eq!(params["zip"], json!(2134.0));
        assert_eq!(params["flag"], json!("false"));
        assert_eq!(params["label"], json!("hello"));
    }

    #[test]
    fn reserved_keys_only_skipped_on_ecommerce_events() {
        let properties = props(json!({ "Coupon": "SUMMER", "products": [{ "product_id": "p1" }], "color": "red" }));

        let mut ecommerce = Params::new();
        attach_custom_properties(&mut ecommerce, &properties, true);
        assert_eq!(ecommerce.len(), 1);
        assert_eq!(ecommerce["color"], json!("red"));

        let mut custom = Params::new();
        attach_custom_properties(&mut custom, &properties, false);
        assert_eq!(custom["coupon"], json!("SUMMER"));
        assert_eq!(custom["products"], json!("[{\"product_id\":\"p1\"}]"));
        assert_eq!(custom["color"], json!("red"));
    }

    #[test]
    fn custom_properties_overwrite_earlier_parameters() {
        let mut params = Params::new();
        params.insert("screen_name".into(), json!("Home"));
        params.insert("content_type".into(), json!("product"));
        attach_custom_properties(&mut params, &props(json!({
            "Screen Name": "Other",
            "content_type": "",
        })), false);
        assert_eq!(params["screen_name"], json!("Other"));
        assert_eq!(params["content_type"], json!("product"));
    }

    #[test]
    fn products_skip_mistyped_fields() {
        let product = map_product(json!({
            "product_id": 123,
            "name": "Shoe",
            "category": "",
            "quantity": "2",
            "price": "cheap",
            "brand": "Acme",
        }).as_object().unwrap());

        assert_eq!(Value::Object(product), json!({
            "item_id": "123",
            "item_name": "Shoe",
            "quantity": 2,
        }));
    }

    #[test]
    fn products_array_ignores_empty_entries() {
        let properties = props(json!({
            "products": [
                { "product_id": "p1", "price": 10 },
                { "brand": "nothing we map" },
                "not a product",
                { "product_id": "p2", "quantity": 3 },
            ]
        }));
        let mut params = Params::new();
        attach_products(&mut params, &properties, true);
        assert_eq!(params["items"], json!([
            { "item_id": "p1", "price": 10.0 },
            { "item_id": "p2", "quantity": 3 },
        ]));

        let mut params = Params::new();
        attach_products(&mut params, &props(json!({ "products": [{ "brand": "x" }] })), true);
        assert!(params.is_empty());
    }

    #[test]
    fn root_product_becomes_a_single_item() {
        let mut params = Params::new();
        attach_products(&mut params, &props(json!({ "product_id": "p1", "price": 99.99, "currency": "USD" })), false);
        assert_eq!(params["items"], json!([{ "item_id": "p1", "price": 99.99 }]));

        let mut params = Params::new();
        attach_products(&mut params, &props(json!({ "currency": "USD" })), false);
        assert!(!params.contains_key("items"));
    }
}
