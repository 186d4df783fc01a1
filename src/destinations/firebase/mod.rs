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

pub mod mapping;
pub mod params;
pub mod sink;
pub mod translate;

use crate::destinations::{Destination, DestinationResult, DestinationError};
use crate::destinations::firebase::params::Params;
use crate::destinations::firebase::sink::{FirebaseSink, InstanceHandle};
use crate::destinations::firebase::translate::{translate_identify, translate_screen, translate_track};
use crate::events::common::Properties;
use crate::events::identify::Identify;
use crate::events::reset::Reset;
use crate::events::screen::Screen;
use crate::events::track::Track;
use crate::config::Settings;

use std::sync::Arc;
use std::fmt::Display;
use async_trait::async_trait;
use itertools::Itertools;
use log;

/// Firebase Analytics destination
pub struct Firebase {
    sink: Arc<dyn FirebaseSink>,
    settings: Settings,
}

/// Renders user properties with sorted names, for logs
fn format_user_properties(user_properties: &[(String, Option<String>)]) -> String {
    user_properties.iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|(name, value)| match value {
            Some(value) => format!("{}={}", name, value),
            None => format!("{}=<unset>", name),
        })
        .join(", ")
}

/// Renders a parameter bag with sorted keys, for logs
fn format_params(params: &Params) -> String {
    params.iter()
        .sorted_by(|a, b| a.0.cmp(b.0))
        .map(|(k, v)| format!("{}={}", k, v))
        .join(", ")
}

impl Firebase {
    /// Creates the destination, configuring the SDK behind the sink if needed
    pub fn new(settings: &Settings, sink: Arc<dyn FirebaseSink>) -> Result<Arc<Self>, DestinationError> {
        if !sink.is_configured() {
            sink.configure()?;
        }
        if !sink.is_configured() {
            return Err(DestinationError::Initialisation("firebase sink still not ready after configuration".into()));
        }

        log::debug!("firebase destination ready with {} setting(s)", settings.len());
        Ok(Arc::new(Self {
            sink,
            settings: settings.clone(),
        }))
    }

    /// Destination settings, as given in the configuration
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The SDK instance behind the sink
    pub fn instance(&self) -> Option<InstanceHandle> {
        self.sink.instance()
    }

    /// Sets the user id and user properties
    pub fn identify_user(&self, user_id: Option<&str>, traits: &Properties) {
        let calls = translate_identify(user_id, traits);
        if let Some(user_id) = calls.user_id.as_deref() {
            self.sink.set_user_id(Some(user_id));
        }
        for (name, value) in calls.user_properties.iter() {
            self.sink.set_user_property(value.as_deref(), name);
        }
        log::debug!("identify: user {:?} [{}]", calls.user_id, format_user_properties(&calls.user_properties));
    }

    /// Logs a track event, if it has a name
    pub fn track(&self, event_name: &str, properties: &Properties) {
        match translate_track(event_name, properties) {
            Some(event) => {
                log::debug!("track: {} -> {} [{}]", event_name, event.name, format_params(&event.params));
                self.sink.log_event(&event.name, &event.params);
            },
            None => log::debug!("track: dropping event without a name"),
        }
    }

    /// Logs a screen_view event, if the screen has a name
    pub fn screen(&self, screen_name: &str, properties: &Properties) {
        match translate_screen(screen_name, properties) {
            Some(event) => {
                log::debug!("screen: {} -> {} [{}]", screen_name, event.name, format_params(&event.params));
                self.sink.log_event(&event.name, &event.params);
            },
            None => log::debug!("screen: dropping screen without a name"),
        }
    }

    /// Forgets the current user
    pub fn reset_user(&self) {
        log::debug!("reset: clearing user id");
        self.sink.set_user_id(None);
    }
}

/// Implementing the Destination trait for Firebase
#[async_trait]
impl Destination for Firebase {
    async fn identify(&self, identify: &Identify) -> DestinationResult {
        self.identify_user(identify.user_id.as_deref(), &identify.all_traits());
        Ok(())
    }

    async fn store_track(&self, track: &Track) -> DestinationResult {
        self.track(&track.event, &track.properties);
        Ok(())
    }

    async fn store_screen(&self, screen: &Screen) -> DestinationResult {
        self.screen(&screen.name, &screen.properties);
        Ok(())
    }

    async fn reset(&self, _reset: &Reset) -> DestinationResult {
        self.reset_user();
        Ok(())
    }
}

impl Display for Firebase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.write_str("firebase")
    }
}
