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

use crate::events::any::{EventOrBatch, Batch};
use crate::events::identify::Identify;
use crate::events::reset::Reset;
use crate::events::screen::Screen;
use crate::events::track::Track;

use serde_json;

/// Attempts to parse a single event as various event types and explains why not
fn explain_event_rejection(event: serde_json::Value) -> Option<String> {
    match event.get("type").and_then(|t| t.as_str()) {
        Some(t) => {
            match t {
                "identify" => serde_json::from_value::<Identify>(event).map_err(|e| e.to_string()).err(),
                "track" => serde_json::from_value::<Track>(event).map_err(|e| e.to_string()).err(),
                "screen" => serde_json::from_value::<Screen>(event).map_err(|e| e.to_string()).err(),
                "reset" => serde_json::from_value::<Reset>(event).map_err(|e| e.to_string()).err(),
                t => Some(format!("unsupported event type for firebase: {}", t))
            }
        },
        None => Some("missing type key in event".into()),
    }
}

/// Attempts to explain why a payload is being rejected, with log-friendly messages
pub fn explain_rejection(payload: &str) -> Vec<String> {
    let generic_json = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(j) => j,
        Err(_) => return vec!("invalid JSON structure".into())
    };

    let mut messages: Vec<String> = vec!();
    let global_message = match serde_json::from_str::<EventOrBatch>(payload) {
        Ok(_) => return vec!(),
        Err(e) => e.to_string()
    };
    messages.push(global_message);

    match generic_json.as_object() {
        Some(generic_map) => {
            if let Some(generic_batch) = generic_map.get("batch").and_then(|b| b.as_array()) {
                if let Err(e) = serde_json::from_value::<Batch>(generic_json.clone()) {
                    messages.push(e.to_string());
                }
                messages.extend(
                    generic_batch.iter().enumerate()
                        .filter_map(|(i, v)| explain_event_rejection(v.clone()).map(|e| (i, e)))
                        .map(|(i, e)| format!("subevent {}: {}", i, e))
                );
            } else if generic_map.get("type").and_then(|t| t.as_str()).is_some() {
                if let Some(e) = explain_event_rejection(generic_json.clone()) {
                    messages.push(e);
                }
            } else {
                messages.push("missing batch or type key".into())
            }
        },
        None => messages.push("root element is not a map".into())
    }

    messages.iter().enumerate()
        .map(|(i, m)| format!("({}) {}", i + 1, m))
        .collect::<Vec<String>>()
}
