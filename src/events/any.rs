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

use crate::events::common::CommonFields;
use crate::events::identify::Identify;
use crate::events::reset::Reset;
use crate::events::screen::Screen;
use crate::events::track::Track;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenience enum: can accept any event
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum AnyEvent {
    #[serde(rename = "identify")]
    Identify(Identify),
    #[serde(rename = "track")]
    Track(Track),
    #[serde(rename = "screen")]
    Screen(Screen),
    #[serde(rename = "reset")]
    Reset(Reset),
}

impl AnyEvent {
    /// The event type, as found in the payload
    pub fn type_name(&self) -> &'static str {
        match self {
            AnyEvent::Identify(_) => "identify",
            AnyEvent::Track(_) => "track",
            AnyEvent::Screen(_) => "screen",
            AnyEvent::Reset(_) => "reset",
        }
    }

    /// Fields shared by all event types
    pub fn common(&self) -> &CommonFields {
        match self {
            AnyEvent::Identify(e) => &e.common,
            AnyEvent::Track(e) => &e.common,
            AnyEvent::Screen(e) => &e.common,
            AnyEvent::Reset(e) => &e.common,
        }
    }

    /// Mutable access to the fields shared by all event types
    pub fn common_mut(&mut self) -> &mut CommonFields {
        match self {
            AnyEvent::Identify(e) => &mut e.common,
            AnyEvent::Track(e) => &mut e.common,
            AnyEvent::Screen(e) => &mut e.common,
            AnyEvent::Reset(e) => &mut e.common,
        }
    }
}

/// A batch event, as sent to /v1/batch
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch: Vec<AnyEvent>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// Splits the batch into individual events, passing the batch's sentAt down
    pub fn into_events(self) -> Vec<AnyEvent> {
        let sent_at = self.sent_at;
        self.batch.into_iter()
            .map(|mut event| {
                let common = event.common_mut();
                if common.sent_at.is_none() {
                    common.sent_at = sent_at;
                }
                event
            })
            .collect()
    }
}

/// Convenience enum: accepts any event or a batch of events
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum EventOrBatch {
    Event(AnyEvent),
    Batch(Batch),
}

impl EventOrBatch {
    /// Flattens the payload into a list of events
    pub fn into_events(self) -> Vec<AnyEvent> {
        match self {
            EventOrBatch::Event(event) => vec!(event),
            EventOrBatch::Batch(batch) => batch.into_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn batch_sent_at_is_passed_down() {
        let payload: EventOrBatch = serde_json::from_str(indoc! {r#"
            {
                "sentAt": "2023-05-01T10:00:00Z",
                "batch": [
                    { "type": "track", "event": "Product Viewed", "messageId": "m1" },
                    { "type": "screen", "name": "Home", "sentAt": "2023-05-01T09:00:00Z" },
                    { "type": "reset" }
                ]
            }
        "#}).unwrap();

        let events = payload.into_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].type_name(), "track");
        assert_eq!(events[0].common().message_id, "m1");
        assert_eq!(events[0].common().sent_at.unwrap().to_rfc3339(), "2023-05-01T10:00:00+00:00");
        assert_eq!(events[1].common().sent_at.unwrap().to_rfc3339(), "2023-05-01T09:00:00+00:00");
        assert_eq!(events[2].type_name(), "reset");
    }

    #[test]
    fn both_timestamps_are_accepted() {
        let event = r#"{ "type": "track", "event": "Product Viewed", "originalTimestamp": "2023-05-01T10:00:00Z", "timestamp": "2023-05-01T10:00:01Z" }"#;

        let events = serde_json::from_str::<EventOrBatch>(event).unwrap().into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].common().original_timestamp.unwrap().to_rfc3339(), "2023-05-01T10:00:00+00:00");
        assert_eq!(events[0].common().timestamp.unwrap().to_rfc3339(), "2023-05-01T10:00:01+00:00");

        let batch = format!(r#"{{ "batch": [{}, {{ "type": "reset" }}] }}"#, event);
        let events = serde_json::from_str::<EventOrBatch>(&batch).unwrap().into_events();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn null_bags_are_empty_bags() {
        let payload: EventOrBatch = serde_json::from_str(indoc! {r#"
            {
                "batch": [
                    { "type": "track", "event": "Product Viewed", "properties": null, "integrations": null },
                    { "type": "screen", "name": null, "properties": null, "context": null },
                    { "type": "identify", "userId": "u1", "traits": null, "context": { "traits": null, "device": null } }
                ]
            }
        "#}).unwrap();

        let events = payload.into_events();
        assert_eq!(events.len(), 3);
        match &events[0] {
            AnyEvent::Track(track) => {
                assert_eq!(track.event, "Product Viewed");
                assert!(track.properties.is_empty());
            },
            _ => panic!("expected a track event"),
        }
        match &events[1] {
            AnyEvent::Screen(screen) => assert!(screen.name.is_empty() && screen.properties.is_empty()),
            _ => panic!("expected a screen event"),
        }
        match &events[2] {
            AnyEvent::Identify(identify) => assert!(identify.all_traits().is_empty()),
            _ => panic!("expected an identify event"),
        }
    }

    #[test]
    fn mobile_sdk_batch() {
        let payload: EventOrBatch = serde_json::from_str(indoc! {r#"
            {
                "sentAt": "2023-05-01T10:00:05.123Z",
                "batch": [
                    {
                        "type": "identify",
                        "messageId": "1682935200000-0b1e6f8e",
                        "anonymousId": "a7c2f9d0-54b1-4d0e-9a43-1f2e3d4c5b6a",
                        "userId": "u1",
                        "channel": "mobile",
                        "originalTimestamp": "2023-05-01T10:00:00.000Z",
                        "timestamp": "2023-05-01T10:00:01.000Z",
                        "receivedAt": "2023-05-01T10:00:06.000Z",
                        "integrations": { "All": true, "Firebase": true },
                        "context": {
                            "app": { "build": "412", "name": "Health Mate", "namespace": "com.withings.wiscale2", "version": "6.1.0" },
                            "device": { "id": "d1", "manufacturer": "Google", "model": "Pixel 7", "name": "panther", "type": "Android", "adTrackingEnabled": false },
                            "library": { "name": "com.rudderstack.android.sdk.core", "version": "1.12.0" },
                            "locale": "fr-FR",
                            "network": { "carrier": "Orange", "wifi": true },
                            "os": { "name": "Android", "version": "13" },
                            "screen": { "density": 420, "width": 1080, "height": 2400 },
                            "timezone": "Europe/Paris",
                            "traits": { "anonymousId": "a7c2f9d0-54b1-4d0e-9a43-1f2e3d4c5b6a", "plan": "free" }
                        },
                        "traits": { "plan": "premium", "age": 42 }
                    },
                    {
                        "type": "track",
                        "messageId": "1682935201000-7d3a1c44",
                        "anonymousId": "a7c2f9d0-54b1-4d0e-9a43-1f2e3d4c5b6a",
                        "userId": "u1",
                        "channel": "mobile",
                        "event": "Order Completed",
                        "originalTimestamp": "2023-05-01T10:00:02.000Z",
                        "timestamp": "2023-05-01T10:00:03.000Z",
                        "integrations": { "All": true },
                        "context": { "locale": "fr-FR", "timezone": "Europe/Paris", "traits": {} },
                        "properties": {
                            "order_id": "o-42",
                            "revenue": 99.9,
                            "currency": "EUR",
                            "products": [ { "product_id": "p1", "name": "Body Scan", "price": 99.9, "quantity": 1 } ]
                        }
                    },
                    {
                        "type": "screen",
                        "messageId": "1682935202000-5e9b2d10",
                        "name": "Dashboard",
                        "originalTimestamp": "2023-05-01T10:00:04.000Z",
                        "properties": { "name": "Dashboard", "automatic": true }
                    }
                ]
            }
        "#}).unwrap();

        let events = payload.into_events();
        assert_eq!(events.iter().map(|e| e.type_name()).collect::<Vec<_>>(), vec!["identify", "track", "screen"]);
        assert!(events.iter().all(|e| e.common().sent_at.is_some()));

        match &events[0] {
            AnyEvent::Identify(identify) => {
                assert_eq!(identify.common.context.device["model"], "Pixel 7");
                assert_eq!(identify.common.context.locale.as_deref(), Some("fr-FR"));
                assert_eq!(identify.common.integrations["Firebase"], true);
                assert!(identify.common.received_at.is_some());
                assert_eq!(identify.all_traits()["plan"], "premium");
            },
            _ => panic!("expected an identify event"),
        }
        match &events[1] {
            AnyEvent::Track(track) => {
                assert_eq!(track.event, "Order Completed");
                assert_eq!(track.properties["order_id"], "o-42");
                assert_eq!(track.common.timestamp.unwrap().to_rfc3339(), "2023-05-01T10:00:03+00:00");
            },
            _ => panic!("expected a track event"),
        }
    }

    #[test]
    fn single_event_is_not_a_batch() {
        let payload: EventOrBatch = serde_json::from_str(
            r#"{ "type": "identify", "userId": "u1" }"#
        ).unwrap();
        let events = payload.into_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            AnyEvent::Identify(identify) => assert_eq!(identify.user_id.as_deref(), Some("u1")),
            _ => panic!("expected an identify event"),
        }
    }
}
