// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Declarative descriptions of where formatted output goes.
//!
//! A [`Transport`] is plain data: a kind, a target name and an option map. Nothing here opens a
//! file or a stream; the [`Engine`](crate::Engine) materializes descriptors into appenders when a
//! logger is constructed.
//!
//! Every preset takes a map of overrides that is merged shallowly over the preset's defaults:
//! keys given by the caller replace the defaults, all other defaults stay.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::Error;
use crate::config::Tier;

/// The broad class of a transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Human-oriented console output.
    Console,
    /// A plain file.
    File,
    /// A standard stream.
    Stream,
    /// Anything else, e.g. a rotating file.
    Custom,
}

/// Target name of the pretty console transport.
pub const TARGET_PRETTY: &str = "pretty";
/// Target name of file transports.
pub const TARGET_FILE: &str = "file";
/// Target name of the rotating file transport.
pub const TARGET_ROLL: &str = "roll";
/// Target name of the JSON standard output transport.
pub const TARGET_STDOUT: &str = "stdout";
/// Target name of the JSON standard error transport.
pub const TARGET_STDERR: &str = "stderr";

/// A single output destination and its options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    /// The broad class of the transport.
    pub kind: TransportKind,
    /// The target the engine materializes, e.g. `pretty`, `file` or `roll`.
    pub target: String,
    /// Target-specific options.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl Transport {
    /// Create a transport descriptor.
    pub fn new(kind: TransportKind, target: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            kind,
            target: target.into(),
            options,
        }
    }

    /// The minimum level of this target, read from the `level` option.
    pub fn level(&self) -> Option<&str> {
        self.options.get("level").and_then(Value::as_str)
    }

    /// Set the minimum level of this target.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.options.insert("level".to_string(), level.into().into());
        self
    }

    /// Decode the option map into a typed option struct.
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|err| {
            Error::from_json_error(err).with_context("target", self.target.as_str())
        })
    }
}

/// One transport or several.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportConfig {
    /// Everything goes to one target.
    Single(Transport),
    /// Every record goes to each target whose level admits it.
    Multi {
        /// The targets.
        targets: Vec<Transport>,
    },
}

impl TransportConfig {
    /// All targets of this configuration.
    pub fn targets(&self) -> &[Transport] {
        match self {
            TransportConfig::Single(transport) => std::slice::from_ref(transport),
            TransportConfig::Multi { targets } => targets,
        }
    }
}

impl From<Transport> for TransportConfig {
    fn from(transport: Transport) -> Self {
        TransportConfig::Single(transport)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn overlay(mut defaults: Map<String, Value>, overrides: Map<String, Value>) -> Map<String, Value> {
    defaults.extend(overrides);
    defaults
}

/// Pretty, colorized console output.
///
/// Defaults: `colorize: true`, `translateTime: "%Y-%m-%d %H:%M:%S%.3f"`,
/// `ignore: "pid,hostname"`, `singleLine: false`, `hideObject: false`, `messageFormat: "{msg}"`.
///
/// # Examples
///
/// ```
/// use logshape::transport::console_transport;
/// use serde_json::Map;
/// use serde_json::json;
///
/// let mut overrides = Map::new();
/// overrides.insert("colorize".to_string(), json!(false));
/// let transport = console_transport(overrides);
///
/// assert_eq!(transport.options["colorize"], json!(false));
/// assert_eq!(transport.options["ignore"], json!("pid,hostname"));
/// ```
pub fn console_transport(overrides: Map<String, Value>) -> Transport {
    let defaults = object(json!({
        "colorize": true,
        "translateTime": "%Y-%m-%d %H:%M:%S%.3f",
        "ignore": "pid,hostname",
        "singleLine": false,
        "hideObject": false,
        "messageFormat": "{msg}",
    }));
    Transport::new(TransportKind::Console, TARGET_PRETTY, overlay(defaults, overrides))
}

/// Append to a file, creating missing directories. Defaults: `mkdir: true`, `append: true`.
pub fn file_transport(destination: impl Into<String>, overrides: Map<String, Value>) -> Transport {
    let defaults = object(json!({
        "destination": destination.into(),
        "mkdir": true,
        "append": true,
    }));
    Transport::new(TransportKind::File, TARGET_FILE, overlay(defaults, overrides))
}

/// A file rotated by period and size.
///
/// `%DATE%` in the filename is replaced with the period start formatted by `dateFormat`.
/// Defaults: `frequency: "daily"`, `size: "10M"`, `limit: 7`, `dateFormat: "%Y-%m-%d"`.
pub fn rotating_file_transport(
    filename: impl Into<String>,
    overrides: Map<String, Value>,
) -> Transport {
    let defaults = object(json!({
        "file": filename.into(),
        "frequency": "daily",
        "size": "10M",
        "limit": 7,
        "dateFormat": "%Y-%m-%d",
    }));
    Transport::new(TransportKind::Custom, TARGET_ROLL, overlay(defaults, overrides))
}

/// Append JSON lines to a file. Defaults: `mkdir: true`, `append: true`.
pub fn json_file_transport(
    destination: impl Into<String>,
    overrides: Map<String, Value>,
) -> Transport {
    file_transport(destination, overrides)
}

/// JSON lines on standard output.
pub fn stdout_transport() -> Transport {
    Transport::new(TransportKind::Stream, TARGET_STDOUT, Map::new())
}

/// JSON lines on standard error.
pub fn stderr_transport() -> Transport {
    Transport::new(TransportKind::Stream, TARGET_STDERR, Map::new())
}

/// Send every record to several targets.
pub fn multi_transport(transports: impl IntoIterator<Item = Transport>) -> TransportConfig {
    TransportConfig::Multi {
        targets: transports.into_iter().collect(),
    }
}

/// The development preset: pretty console output prefixed with the logger name.
pub fn development_transport() -> TransportConfig {
    let overrides = object(json!({
        "colorize": true,
        "translateTime": "%y-%m-%d %H:%M:%S%.3f",
        "ignore": "pid,hostname",
        "singleLine": false,
        "messageFormat": "{name}: {msg}",
    }));
    console_transport(overrides).into()
}

/// The production preset: all records as JSON to `./logs/app.json`, errors and above
/// additionally to `./logs/error.log`.
pub fn production_transport() -> TransportConfig {
    multi_transport([
        json_file_transport("./logs/app.json", Map::new()),
        file_transport("./logs/error.log", Map::new()).with_level("error"),
    ])
}

/// Select the transport preset for a tier. The test tier has none.
pub fn environment_transport(tier: Tier) -> Option<TransportConfig> {
    match tier {
        Tier::Production => Some(production_transport()),
        Tier::Test => None,
        Tier::Development => Some(development_transport()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_keys() {
        let transport = console_transport(object(json!({"singleLine": true, "extra": 1})));
        assert_eq!(transport.kind, TransportKind::Console);
        assert_eq!(transport.options["singleLine"], json!(true));
        assert_eq!(transport.options["extra"], json!(1));
        assert_eq!(transport.options["colorize"], json!(true));
        assert_eq!(transport.options["hideObject"], json!(false));
    }

    #[test]
    fn test_environment_selection() {
        assert_eq!(environment_transport(Tier::Test), None);

        let dev = environment_transport(Tier::Development).unwrap();
        assert_eq!(dev.targets().len(), 1);
        assert_eq!(dev.targets()[0].target, TARGET_PRETTY);
        assert_eq!(dev.targets()[0].options["colorize"], json!(true));

        let prod = environment_transport(Tier::Production).unwrap();
        let targets = prod.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].options["destination"], json!("./logs/app.json"));
        assert_eq!(targets[0].level(), None);
        assert_eq!(targets[1].options["destination"], json!("./logs/error.log"));
        assert_eq!(targets[1].level(), Some("error"));
    }

    #[test]
    fn test_rotating_defaults() {
        let transport = rotating_file_transport("./logs/app-%DATE%.log", Map::new());
        assert_eq!(transport.kind, TransportKind::Custom);
        assert_eq!(transport.target, TARGET_ROLL);
        assert_eq!(transport.options["frequency"], json!("daily"));
        assert_eq!(transport.options["size"], json!("10M"));
        assert_eq!(transport.options["limit"], json!(7));
    }

    #[test]
    fn test_descriptor_is_plain_data() {
        let config = production_transport();
        let encoded = serde_json::to_value(&config).unwrap();
        assert_eq!(encoded["targets"][1]["kind"], json!("file"));
        let decoded: TransportConfig = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, config);
    }
}
