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

pub mod firebase;

use crate::events::any::AnyEvent;
use crate::events::identify::Identify;
use crate::events::reset::Reset;
use crate::events::screen::Screen;
use crate::events::track::Track;

use std::fmt::Display;
use thiserror::Error;
use async_trait::async_trait;
use log;

/// Enum used by destinations to report errors
/// Shaping an event never fails: events which cannot be forwarded are
/// dropped, only getting the destination ready can go wrong
#[derive(Error, Debug, Clone)]
pub enum DestinationError {
    /// Error in ::new(), getting the destination ready
    #[error("failed to initialise destination: {0}")]
    Initialisation(String),
}

/// Convenience type: destination result (reply given to the forwarder)
pub type DestinationResult = Result<(), DestinationError>;

/// The Destination trait, all destinations must implement this
#[async_trait]
pub trait Destination: Display + Send + Sync {
    async fn identify(&self, identify: &Identify) -> DestinationResult;
    async fn store_track(&self, track: &Track) -> DestinationResult;
    async fn store_screen(&self, screen: &Screen) -> DestinationResult;
    async fn reset(&self, reset: &Reset) -> DestinationResult;
}

/// Forwards an event to a destination
pub async fn forward_event(destination: &dyn Destination, event: &AnyEvent) -> DestinationResult {
    let result = match event {
        AnyEvent::Identify(identify) => destination.identify(identify).await,
        AnyEvent::Track(track) => destination.store_track(track).await,
        AnyEvent::Screen(screen) => destination.store_screen(screen).await,
        AnyEvent::Reset(reset) => destination.reset(reset).await,
    };

    let mid = event.common().message_id.as_str();
    match &result {
        Ok(_) => log::debug!(mid = mid; "forwarded {} event to destination: {}", event.type_name(), destination),
        Err(e) => log::warn!(mid = mid; "destination error: {}: {}", destination, e),
    }
    result
}
