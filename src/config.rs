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

use crate::logging;

use serde::{Serialize, Deserialize};
use std::fs::File;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use flexi_logger::writers::SyslogFacility;
use serde_yaml;
use log;

/// Configuration defaults
pub mod defaults {
    pub fn logging_level() -> log::LevelFilter { log::LevelFilter::Info }

    pub fn syslog_port() -> u16 { 514 }
    pub fn syslog_protocol() -> String { String::from("udp") }
}

/// Syslog block, within the logging block
#[derive(Deserialize)]
pub struct Syslog {
    /// The syslog server
    pub host: String,
    #[serde(default = "defaults::syslog_port")]
    pub port: u16,
    /// tcp or udp
    #[serde(default = "defaults::syslog_protocol")]
    pub protocol: String,
    #[serde(deserialize_with = "logging::parse_facility")]
    pub facility: SyslogFacility,
}

/// Logging block
#[derive(Deserialize)]
pub struct Logging {
    #[serde(default = "defaults::logging_level")]
    pub level: log::LevelFilter,
    /// Log to syslog instead of stdout
    #[serde(default)]
    pub syslog: Option<Syslog>,
}

impl Default for Logging {
    /// Builds a default logging block in case none is provided
    fn default() -> Self {
        Self {
            level: defaults::logging_level(),
            syslog: None,
        }
    }
}

/// Convenience type: arbitrary key-value settings (for the destination)
pub type Settings = HashMap<String, serde_yaml::Value>;

/// The overall configuration file
#[derive(Deserialize, Default)]
pub struct Configuration {
    /// A logging block
    #[serde(default)]
    pub logging: Logging,
    /// Firebase destination settings, passed as-is
    #[serde(default)]
    pub firebase: Settings,
}

/// Settings are not checked but they should at least be serialisable
#[derive(Serialize)]
struct SettingsDump<'a> {
    firebase: &'a Settings,
}

impl Configuration {
    /// Renders the destination settings, for logs
    pub fn settings_summary(&self) -> String {
        serde_yaml::to_string(&SettingsDump { firebase: &self.firebase })
            .unwrap_or_else(|e| format!("<unprintable settings: {}>", e))
    }
}

/// Parse a configuration file given a path
fn parse_configuration_file(path: &Path) -> Result<Configuration, String> {
    let path_str = path.display();
    let file = File::open(path).map_err(|e| format!("{}: {}", path_str, e))?;
    let configuration = serde_yaml::from_reader(file).map_err(|e| format!("{}: {}", path_str, e))?;
    Ok(configuration)
}

/// Locates and parses the configuration file, None when there is none to be found
pub fn get_configuration(cmd_arg: Option<&Path>) -> Result<Option<Configuration>, String> {
    let given_location = cmd_arg
        .map(PathBuf::from)
        .or(std::env::var("STILGAR_FIREBASE_CONFIG").map(PathBuf::from).ok());

    /* If a path was given on the command line, ignore all other options */
    if let Some(path) = given_location {
        return parse_configuration_file(path.as_path()).map(Some);
    }

    /* Otherwise, try and guess */
    let xdg_dirs = ProjectDirs::from("com", "withings", "stilgar-firebase");
    let inferred_locations = [
        Some(PathBuf::from("/etc/withings/stilgar-firebase.yml")),
        Some(PathBuf::from("/etc/withings/stilgar-firebase.yaml")),
        xdg_dirs.as_ref().map(|dirs| PathBuf::from(dirs.config_dir()).join("stilgar-firebase.yml")),
        xdg_dirs.as_ref().map(|dirs| PathBuf::from(dirs.config_dir()).join("stilgar-firebase.yaml")),
        std::env::current_dir().map(|p| p.join("stilgar-firebase.yml")).ok(),
        std::env::current_dir().map(|p| p.join("stilgar-firebase.yaml")).ok(),
    ];

    match inferred_locations.iter().flatten().find(|p| p.as_path().is_file()) {
        Some(path) => {
            log::debug!("using configuration file {}", path.display());
            parse_configuration_file(path).map(Some)
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_configuration_uses_defaults() {
        let configuration: Configuration = serde_yaml::from_str("{}").unwrap();
        assert_eq!(configuration.logging.level, log::LevelFilter::Info);
        assert!(configuration.logging.syslog.is_none());
        assert!(configuration.firebase.is_empty());
    }

    #[test]
    fn full_configuration() {
        let configuration: Configuration = serde_yaml::from_str(indoc! {"
            logging:
              level: debug
              syslog:
                host: 127.0.0.1
                protocol: tcp
                facility: local3
            firebase:
              app: my-app
              debug_view: true
        "}).unwrap();

        assert_eq!(configuration.logging.level, log::LevelFilter::Debug);
        let syslog = configuration.logging.syslog.as_ref().unwrap();
        assert_eq!(syslog.host, "127.0.0.1");
        assert_eq!(syslog.port, 514);
        assert_eq!(syslog.protocol, "tcp");
        assert_eq!(configuration.firebase.len(), 2);
        assert_eq!(configuration.firebase["app"], serde_yaml::Value::String("my-app".into()));
        assert!(configuration.settings_summary().contains("my-app"));
    }

    #[test]
    fn unknown_facilities_are_refused() {
        let result = serde_yaml::from_str::<Configuration>(indoc! {"
            logging:
              syslog:
                host: 127.0.0.1
                facility: nowhere
        "});
        assert!(result.is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = get_configuration(Some(Path::new("/nonexistent/stilgar-firebase.yml")));
        assert!(result.is_err());
    }
}
