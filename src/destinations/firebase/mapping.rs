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

//! Static mapping tables between Rudderstack's e-commerce vocabulary and Firebase's

use std::collections::{HashMap, HashSet};
use lazy_static::lazy_static;

/// Maximum length of a parameter or user property key
pub const MAX_KEY_LENGTH: usize = 40;
/// Maximum length of a string parameter value
pub const MAX_VALUE_LENGTH: usize = 100;

/// Source event names with a fixed treatment
pub mod source {
    pub const APPLICATION_OPENED: &str = "Application Opened";
    pub const PRODUCT_SHARED: &str = "Product Shared";
    pub const CART_SHARED: &str = "Cart Shared";
}

/// Firebase event names
pub mod event {
    pub const ADD_PAYMENT_INFO: &str = "add_payment_info";
    pub const ADD_TO_CART: &str = "add_to_cart";
    pub const ADD_TO_WISHLIST: &str = "add_to_wishlist";
    pub const APP_OPEN: &str = "app_open";
    pub const BEGIN_CHECKOUT: &str = "begin_checkout";
    pub const PURCHASE: &str = "purchase";
    pub const REFUND: &str = "refund";
    pub const REMOVE_FROM_CART: &str = "remove_from_cart";
    pub const SCREEN_VIEW: &str = "screen_view";
    pub const SEARCH: &str = "search";
    pub const SELECT_CONTENT: &str = "select_content";
    pub const SELECT_PROMOTION: &str = "select_promotion";
    pub const SHARE: &str = "share";
    pub const VIEW_CART: &str = "view_cart";
    pub const VIEW_ITEM: &str = "view_item";
    pub const VIEW_ITEM_LIST: &str = "view_item_list";
    pub const VIEW_PROMOTION: &str = "view_promotion";
}

/// Firebase parameter names
pub mod param {
    pub const AFFILIATION: &str = "affiliation";
    pub const CONTENT_TYPE: &str = "content_type";
    pub const COUPON: &str = "coupon";
    pub const CREATIVE_NAME: &str = "creative_name";
    pub const CURRENCY: &str = "currency";
    pub const ITEMS: &str = "items";
    pub const ITEM_CATEGORY: &str = "item_category";
    pub const ITEM_ID: &str = "item_id";
    pub const ITEM_LIST_ID: &str = "item_list_id";
    pub const ITEM_NAME: &str = "item_name";
    pub const METHOD: &str = "method";
    pub const PAYMENT_TYPE: &str = "payment_type";
    pub const PRICE: &str = "price";
    pub const PROMOTION_ID: &str = "promotion_id";
    pub const PROMOTION_NAME: &str = "promotion_name";
    pub const QUANTITY: &str = "quantity";
    pub const SCREEN_NAME: &str = "screen_name";
    pub const SEARCH_TERM: &str = "search_term";
    pub const SHIPPING: &str = "shipping";
    pub const TAX: &str = "tax";
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const VALUE: &str = "value";
}

/// Rudderstack property names with a dedicated rule
pub mod property {
    pub const CART_ID: &str = "cart_id";
    pub const CURRENCY: &str = "currency";
    pub const NAME: &str = "name";
    pub const ORDER_ID: &str = "order_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCTS: &str = "products";
    pub const REVENUE: &str = "revenue";
    pub const SHIPPING: &str = "shipping";
    pub const TAX: &str = "tax";
    pub const TOTAL: &str = "total";
    pub const USER_ID: &str = "userId";
    pub const VALUE: &str = "value";
}

/// Currency used when an e-commerce event does not specify one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Properties checked, in order, for the monetary value of an e-commerce event
pub const VALUE_PROPERTIES: [&str; 3] = [property::REVENUE, property::VALUE, property::TOTAL];

/// Type a product field is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
}

/// Product fields: (Rudderstack key, Firebase key, target type)
pub const PRODUCT_FIELDS: [(&str, &str, FieldType); 5] = [
    (property::PRODUCT_ID, param::ITEM_ID, FieldType::String),
    (property::NAME, param::ITEM_NAME, FieldType::String),
    ("category", param::ITEM_CATEGORY, FieldType::String),
    ("quantity", param::QUANTITY, FieldType::Integer),
    ("price", param::PRICE, FieldType::Float),
];

/// E-commerce fields, always forwarded as strings: (Rudderstack key, Firebase key)
pub const ECOMMERCE_FIELDS: [(&str, &str); 8] = [
    ("payment_method", param::PAYMENT_TYPE),
    ("coupon", param::COUPON),
    ("query", param::SEARCH_TERM),
    ("list_id", param::ITEM_LIST_ID),
    ("promotion_id", param::PROMOTION_ID),
    ("creative", param::CREATIVE_NAME),
    ("affiliation", param::AFFILIATION),
    ("share_via", param::METHOD),
];

lazy_static! {
    /// Rudderstack e-commerce event names and their Firebase counterparts
    pub static ref ECOMMERCE_EVENTS: HashMap<&'static str, &'static str> = HashMap::from([
        ("Payment Info Entered", event::ADD_PAYMENT_INFO),
        ("Product Added", event::ADD_TO_CART),
        ("Product Added to Wishlist", event::ADD_TO_WISHLIST),
        ("Checkout Started", event::BEGIN_CHECKOUT),
        ("Order Completed", event::PURCHASE),
        ("Order Refunded", event::REFUND),
        ("Products Searched", event::SEARCH),
        (source::CART_SHARED, event::SHARE),
        (source::PRODUCT_SHARED, event::SHARE),
        ("Product Viewed", event::VIEW_ITEM),
        ("Product List Viewed", event::VIEW_ITEM_LIST),
        ("Product Removed", event::REMOVE_FROM_CART),
        ("Product Clicked", event::SELECT_CONTENT),
        ("Promotion Viewed", event::VIEW_PROMOTION),
        ("Promotion Clicked", event::SELECT_PROMOTION),
        ("Cart Viewed", event::VIEW_CART),
    ]);

    /// Traits Firebase collects on its own and which must not be set as user properties
    pub static ref IDENTIFY_RESERVED_KEYWORDS: HashSet<&'static str> = HashSet::from([
        "age", "gender", "interest",
    ]);

    /// Properties already handled by a dedicated rule on e-commerce events
    pub static ref TRACK_RESERVED_KEYWORDS: HashSet<&'static str> = HashSet::from([
        property::PRODUCT_ID, property::NAME, "category", "quantity", "price",
        property::CURRENCY, property::VALUE, property::REVENUE, property::TOTAL,
        property::TAX, property::SHIPPING, "coupon", property::CART_ID,
        "payment_method", "query", "list_id", "promotion_id", "creative",
        "affiliation", "share_via", property::PRODUCTS, property::ORDER_ID,
    ]);

    /// Firebase events expecting a products array
    pub static ref EVENTS_WITH_PRODUCTS_ARRAY: HashSet<&'static str> = HashSet::from([
        event::BEGIN_CHECKOUT,
        event::PURCHASE,
        event::REFUND,
        event::VIEW_CART,
        event::VIEW_ITEM_LIST,
    ]);

    /// Firebase events describing a single product with root-level properties
    pub static ref EVENTS_WITH_PRODUCT_AT_ROOT: HashSet<&'static str> = HashSet::from([
        event::ADD_TO_CART,
        event::ADD_TO_WISHLIST,
        event::REMOVE_FROM_CART,
        event::VIEW_ITEM,
    ]);
}
