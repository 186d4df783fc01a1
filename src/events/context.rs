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

use crate::events::common::{null_as_default, Properties};

use serde::{Deserialize, Serialize};

/// Context fields
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, deserialize_with = "null_as_default")]
    pub app: Properties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub device: Properties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub library: Properties,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub os: Properties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screen: Properties,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Identify traits travel here with the mobile SDKs
    #[serde(default, deserialize_with = "null_as_default")]
    pub traits: Properties,
}
