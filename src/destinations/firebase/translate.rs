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

//! Rudderstack events to Firebase calls, without side effects

use crate::destinations::firebase::mapping::{
    self, DEFAULT_CURRENCY, ECOMMERCE_EVENTS, ECOMMERCE_FIELDS, EVENTS_WITH_PRODUCTS_ARRAY,
    EVENTS_WITH_PRODUCT_AT_ROOT, IDENTIFY_RESERVED_KEYWORDS, VALUE_PROPERTIES, event, param, property,
};
use crate::destinations::firebase::params::{
    Params, attach_custom_properties, attach_products, float_value, is_empty, is_numeric, normalize_key,
    stringify, to_float,
};
use crate::events::common::Properties;

use serde_json::Value;

/// What an identify event turns into
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyCalls {
    /// The user id to set, if any
    pub user_id: Option<String>,
    /// User properties as (name, value)
    pub user_properties: Vec<(String, Option<String>)>,
}

/// A Firebase event, ready to be logged
#[derive(Debug, Clone, PartialEq)]
pub struct FirebaseEvent {
    pub name: String,
    pub params: Params,
}

/// How a track event is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackKind {
    /// Application Opened, logged as app_open
    AppOpened,
    /// A known e-commerce event, with its Firebase name
    ECommerce(&'static str),
    /// Anything else, under its normalised name
    Custom(String),
}

impl TrackKind {
    /// Classifies a track event by name
    pub fn classify(event_name: &str) -> Self {
        if event_name == mapping::source::APPLICATION_OPENED {
            return TrackKind::AppOpened;
        }
        match ECOMMERCE_EVENTS.get(event_name) {
            Some(firebase_name) => TrackKind::ECommerce(*firebase_name),
            None => TrackKind::Custom(normalize_key(event_name)),
        }
    }

    /// Firebase event name
    pub fn event_name(&self) -> &str {
        match self {
            TrackKind::AppOpened => event::APP_OPEN,
            TrackKind::ECommerce(name) => *name,
            TrackKind::Custom(name) => name.as_str(),
        }
    }
}

/// Looks up a non-empty property
fn non_empty<'a>(properties: &'a Properties, key: &str) -> Option<&'a Value> {
    properties.get(key).filter(|v| !is_empty(v))
}

/// Sets a string parameter from a non-empty property
fn set_string_from(params: &mut Params, destination: &str, properties: &Properties, source: &str) -> bool {
    match non_empty(properties, source).and_then(stringify) {
        Some(s) => {
            params.insert(destination.to_string(), Value::String(s));
            true
        },
        None => false,
    }
}

/// Translates an identify call
pub fn translate_identify(user_id: Option<&str>, traits: &Properties) -> IdentifyCalls {
    let user_id = user_id
        .filter(|id| !id.is_empty())
        .map(String::from);

    let user_properties = traits.iter()
        .filter(|(key, _)| key.as_str() != property::USER_ID)
        .map(|(key, value)| (normalize_key(key), value))
        .filter(|(key, _)| !IDENTIFY_RESERVED_KEYWORDS.contains(key.as_str()))
        .map(|(key, value)| (key, stringify(value)))
        .collect();

    IdentifyCalls { user_id, user_properties }
}

/// Parameters specific to some e-commerce events
fn add_event_specific_params(params: &mut Params, firebase_name: &str, properties: &Properties) {
    match firebase_name {
        event::SHARE => {
            if !set_string_from(params, param::ITEM_ID, properties, property::CART_ID) {
                set_string_from(params, param::ITEM_ID, properties, property::PRODUCT_ID);
            }
        },
        event::VIEW_PROMOTION | event::SELECT_PROMOTION => {
            set_string_from(params, param::PROMOTION_NAME, properties, property::NAME);
        },
        event::SELECT_CONTENT => {
            set_string_from(params, param::ITEM_ID, properties, property::PRODUCT_ID);
            params.insert(param::CONTENT_TYPE.into(), Value::String("product".into()));
        },
        _ => {},
    }
}

/// Parameters implied by the source event name
fn add_constant_params(params: &mut Params, event_name: &str) {
    let content_type = match event_name {
        mapping::source::PRODUCT_SHARED => "product",
        mapping::source::CART_SHARED => "cart",
        _ => return,
    };
    params.insert(param::CONTENT_TYPE.into(), Value::String(content_type.into()));
}

/// Value, products, currency, e-commerce fields, shipping, tax and order id
fn add_commerce_properties(params: &mut Params, firebase_name: &str, properties: &Properties) {
    if let Some(value) = VALUE_PROPERTIES.iter()
        .filter_map(|key| properties.get(*key))
        .find(|v| is_numeric(v)) {
        params.insert(param::VALUE.into(), float_value(to_float(value)));
    }

    if EVENTS_WITH_PRODUCTS_ARRAY.contains(firebase_name) && properties.contains_key(property::PRODUCTS) {
        attach_products(params, properties, true);
    }
    if EVENTS_WITH_PRODUCT_AT_ROOT.contains(firebase_name) {
        attach_products(params, properties, false);
    }

    let currency = non_empty(properties, property::CURRENCY)
        .and_then(stringify)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    params.insert(param::CURRENCY.into(), Value::String(currency));

    for (source, destination) in ECOMMERCE_FIELDS.iter() {
        set_string_from(params, destination, properties, source);
    }

    for (source, destination) in [(property::SHIPPING, param::SHIPPING), (property::TAX, param::TAX)] {
        if let Some(v) = properties.get(source).filter(|v| is_numeric(v)) {
            params.insert(destination.into(), float_value(to_float(v)));
        }
    }

    /* order_id is kept alongside transaction_id for existing reports */
    if let Some(order_id) = non_empty(properties, property::ORDER_ID).and_then(stringify) {
        params.insert(param::TRANSACTION_ID.into(), Value::String(order_id.clone()));
        params.insert(property::ORDER_ID.into(), Value::String(order_id));
    }
}

/// Translates a track call, None if the event should be dropped
pub fn translate_track(event_name: &str, properties: &Properties) -> Option<FirebaseEvent> {
    if event_name.trim().is_empty() {
        return None;
    }

    let kind = TrackKind::classify(event_name);
    let mut params = Params::new();

    match &kind {
        TrackKind::ECommerce(firebase_name) => {
            add_event_specific_params(&mut params, firebase_name, properties);
            add_constant_params(&mut params, event_name);
            add_commerce_properties(&mut params, firebase_name, properties);
            attach_custom_properties(&mut params, properties, true);
        },
        TrackKind::AppOpened | TrackKind::Custom(_) => {
            attach_custom_properties(&mut params, properties, false);
        },
    }

    let name = kind.event_name();
    match name.is_empty() {
        true => None,
        false => Some(FirebaseEvent { name: name.to_string(), params }),
    }
}

/// Translates a screen call into a screen_view event, None if unnamed
pub fn translate_screen(screen_name: &str, properties: &Properties) -> Option<FirebaseEvent> {
    if screen_name.is_empty() {
        return None;
    }

    let mut params = Params::new();
    params.insert(param::SCREEN_NAME.into(), Value::String(screen_name.into()));
    attach_custom_properties(&mut params, properties, false);

    Some(FirebaseEvent { name: event::SCREEN_VIEW.into(), params })
}
