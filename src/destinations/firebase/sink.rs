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

//! The Firebase SDK as seen from the destination: a handful of calls

use crate::destinations::DestinationError;
use crate::destinations::firebase::params::Params;

use std::any::Any;
use std::io::Write;
use std::sync::{Arc, Mutex};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Opaque handle on the underlying analytics instance
pub type InstanceHandle = Arc<dyn Any + Send + Sync>;

/// The calls the destination makes to the Firebase SDK
pub trait FirebaseSink: Send + Sync {
    /// Whether configure() already succeeded
    fn is_configured(&self) -> bool;
    /// Initialises the SDK, subsequent calls are no-ops
    fn configure(&self) -> Result<(), DestinationError>;
    fn set_user_id(&self, id: Option<&str>);
    fn set_user_property(&self, value: Option<&str>, name: &str);
    fn log_event(&self, name: &str, params: &Params);
    /// The SDK instance, only once configured
    fn instance(&self) -> Option<InstanceHandle>;
}

/// A call made to the sink
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum SinkCall {
    SetUserId { id: Option<String> },
    SetUserProperty { name: String, value: Option<String> },
    LogEvent { name: String, params: Params },
}

/// Configuration behaviour of a RecordingSink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Configured,
    Unconfigured,
    Failing,
}

/// Keeps every call in memory, used in tests
pub struct RecordingSink {
    readiness: Mutex<Readiness>,
    configure_calls: Mutex<usize>,
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    fn with_readiness(readiness: Readiness) -> Arc<Self> {
        Arc::new(Self {
            readiness: Mutex::new(readiness),
            configure_calls: Mutex::new(0),
            calls: Mutex::new(vec!()),
        })
    }

    /// A sink which is ready from the start
    pub fn new() -> Arc<Self> {
        Self::with_readiness(Readiness::Configured)
    }

    /// A sink which needs to be configured first
    pub fn unconfigured() -> Arc<Self> {
        Self::with_readiness(Readiness::Unconfigured)
    }

    /// A sink which refuses to be configured
    pub fn failing() -> Arc<Self> {
        Self::with_readiness(Readiness::Failing)
    }

    /// All calls recorded so far
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().expect("recording sink lock poisoned").clone()
    }

    /// Only the logged events, as (name, params)
    pub fn logged_events(&self) -> Vec<(String, Params)> {
        self.calls().into_iter()
            .filter_map(|c| match c {
                SinkCall::LogEvent { name, params } => Some((name, params)),
                _ => None,
            })
            .collect()
    }

    /// Number of configure() calls received
    pub fn configure_calls(&self) -> usize {
        *self.configure_calls.lock().expect("recording sink lock poisoned")
    }

    fn record(&self, call: SinkCall) {
        self.calls.lock().expect("recording sink lock poisoned").push(call);
    }
}

impl FirebaseSink for RecordingSink {
    fn is_configured(&self) -> bool {
        *self.readiness.lock().expect("recording sink lock poisoned") == Readiness::Configured
    }

    fn configure(&self) -> Result<(), DestinationError> {
        *self.configure_calls.lock().expect("recording sink lock poisoned") += 1;
        let mut readiness = self.readiness.lock().expect("recording sink lock poisoned");
        match *readiness {
            Readiness::Failing => Err(DestinationError::Initialisation("recording sink set to fail".into())),
            _ => {
                *readiness = Readiness::Configured;
                Ok(())
            }
        }
    }

    fn set_user_id(&self, id: Option<&str>) {
        self.record(SinkCall::SetUserId { id: id.map(String::from) });
    }

    fn set_user_property(&self, value: Option<&str>, name: &str) {
        self.record(SinkCall::SetUserProperty { name: name.into(), value: value.map(String::from) });
    }

    fn log_event(&self, name: &str, params: &Params) {
        self.record(SinkCall::LogEvent { name: name.into(), params: params.clone() });
    }

    fn instance(&self) -> Option<InstanceHandle> {
        match self.is_configured() {
            true => Some(Arc::new("recording") as InstanceHandle),
            false => None,
        }
    }
}

/// Writes every call as a line of JSON
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    configured: OnceCell<()>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            configured: OnceCell::new(),
        }
    }

    /// Gives the writer back
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_call(&self, call: SinkCall) {
        let line = match serde_json::to_string(&call) {
            Ok(l) => l,
            Err(e) => {
                log::warn!("failed to serialise firebase call: {}", e);
                return;
            }
        };

        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            log::warn!("failed to write firebase call: {}", e);
        }
    }
}

impl<W: Write + Send> FirebaseSink for JsonLinesSink<W> {
    fn is_configured(&self) -> bool {
        self.configured.get().is_some()
    }

    fn configure(&self) -> Result<(), DestinationError> {
        self.configured.get_or_init(|| log::debug!("json lines sink ready"));
        Ok(())
    }

    fn set_user_id(&self, id: Option<&str>) {
        self.write_call(SinkCall::SetUserId { id: id.map(String::from) });
    }

    fn set_user_property(&self, value: Option<&str>, name: &str) {
        self.write_call(SinkCall::SetUserProperty { name: name.into(), value: value.map(String::from) });
    }

    fn log_event(&self, name: &str, params: &Params) {
        self.write_call(SinkCall::LogEvent { name: name.into(), params: params.clone() });
    }

    fn instance(&self) -> Option<InstanceHandle> {
        match self.is_configured() {
            true => Some(Arc::new("json-lines") as InstanceHandle),
            false => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    #[test]
    fn json_lines_sink_writes_one_line_per_call() {
        let sink = JsonLinesSink::new(Vec::<u8>::new());
        sink.set_user_id(Some("u1"));
        sink.set_user_property(Some("gold"), "tier");
        sink.log_event("app_open", &Params::from([("source".to_string(), json!("x"))]));
        sink.set_user_id(None);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![
            json!({ "call": "setUserId", "id": "u1" }),
            json!({ "call": "setUserProperty", "name": "tier", "value": "gold" }),
            json!({ "call": "logEvent", "name": "app_open", "params": { "source": "x" } }),
            json!({ "call": "setUserId", "id": null }),
        ]);
    }

    #[test]
    fn json_lines_sink_configures_once_across_threads() {
        let sink = Arc::new(JsonLinesSink::new(std::io::sink()));
        assert!(!sink.is_configured());
        assert!(sink.instance().is_none());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                thread::spawn(move || sink.configure())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        assert!(sink.is_configured());
        assert!(sink.instance().is_some());
    }

    #[test]
    fn recording_sink_readiness() {
        let sink = RecordingSink::unconfigured();
        assert!(!sink.is_configured());
        assert!(sink.configure().is_ok());
        assert!(sink.is_configured());

        let sink = RecordingSink::failing();
        assert!(sink.configure().is_err());
        assert!(!sink.is_configured());
        assert!(sink.instance().is_none());
        assert_eq!(sink.configure_calls(), 1);
    }
}
