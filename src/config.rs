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

//! Layered logger configuration.
//!
//! The effective [`Config`] is resolved from four [`LoggerConfig`] layers, lowest precedence
//! first:
//!
//! 1. built-in defaults ([`default_config`]);
//! 2. the tier defaults selected by the environment ([`tier_config`]);
//! 3. the recognized environment variables ([`env_var_config`]);
//! 4. the caller's configuration, with the logger name argument injected.
//!
//! Layers are merged shallowly: a field present in a later layer replaces the earlier value as a
//! whole, nested maps included.

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::formatter::Formatters;
use crate::serializer::Serializers;
use crate::transport::TransportConfig;
use crate::transport::environment_transport;

/// Environment variable naming the deployment tier.
pub const ENV_TIER: &str = "APP_ENV";
/// Environment variable overriding the minimum level.
pub const ENV_LEVEL: &str = "LOG_LEVEL";
/// Environment variable overriding the logger name.
pub const ENV_NAME: &str = "LOG_NAME";

/// The name of loggers that were not given one.
pub const DEFAULT_NAME: &str = "logshape";

/// A deployment tier selecting a bundle of defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// `development`, `dev`, or anything unrecognized.
    Development,
    /// `test` or `testing`.
    Test,
    /// `production` or `prod`.
    Production,
}

impl Tier {
    /// Classify a tier name. Unknown names fall back to [`Tier::Development`].
    pub fn from_name(name: &str) -> Tier {
        match name {
            "production" | "prod" => Tier::Production,
            "test" | "testing" => Tier::Test,
            _ => Tier::Development,
        }
    }
}

/// A snapshot of the recognized environment variables.
///
/// Empty values are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    tier: Option<String>,
    level: Option<String>,
    name: Option<String>,
}

impl Environment {
    /// Read the process environment.
    ///
    /// Only the recognized variables are read; a value that is not valid Unicode counts as unset.
    pub fn from_env() -> Self {
        let vars = [ENV_TIER, ENV_LEVEL, ENV_NAME].into_iter().filter_map(|key| {
            let value = std::env::var_os(key)?.into_string().ok()?;
            Some((key, value))
        });
        Self::from_vars(vars)
    }

    /// Build from key/value pairs; unrecognized keys are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use logshape::config::Environment;
    /// use logshape::config::Tier;
    ///
    /// let env = Environment::from_vars([("APP_ENV", "prod"), ("LOG_LEVEL", "")]);
    /// assert_eq!(env.tier(), Tier::Production);
    /// assert_eq!(env.level(), None);
    /// ```
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env = Environment::default();
        for (key, value) in vars {
            let value = value.into();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                ENV_TIER => env.tier = Some(value),
                ENV_LEVEL => env.level = Some(value),
                ENV_NAME => env.name = Some(value),
                _ => {}
            }
        }
        env
    }

    /// The tier name, `development` if unset.
    pub fn tier_name(&self) -> &str {
        self.tier.as_deref().unwrap_or("development")
    }

    /// The classified tier.
    pub fn tier(&self) -> Tier {
        Tier::from_name(self.tier_name())
    }

    /// The level override, if any.
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// The name override, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Paths to censor in payloads and bindings.
///
/// A path is a dot-separated list of keys; `*` matches every key at its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redact {
    paths: Vec<String>,
    censor: String,
}

impl Redact {
    /// Censor the given paths with `[Redacted]`.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            censor: "[Redacted]".to_string(),
        }
    }

    /// Replace the censor string.
    pub fn censor(mut self, censor: impl Into<String>) -> Self {
        self.censor = censor.into();
        self
    }

    /// The configured paths.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Censor every configured path present in `fields`.
    pub fn apply(&self, fields: &mut Map<String, Value>) {
        for path in &self.paths {
            let segments = path.split('.').collect::<Vec<_>>();
            redact_path(fields, &segments, &self.censor);
        }
    }
}

fn redact_path(fields: &mut Map<String, Value>, segments: &[&str], censor: &str) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    for (key, value) in fields.iter_mut() {
        if *head != "*" && key.as_str() != *head {
            continue;
        }
        if rest.is_empty() {
            *value = Value::String(censor.to_string());
        } else if let Value::Object(inner) = value {
            redact_path(inner, rest, censor);
        }
    }
}

/// A partial configuration; every field is optional.
///
/// # Examples
///
/// ```
/// use logshape::LoggerConfig;
///
/// let config = LoggerConfig::new().level("debug").name("api").timestamp(false);
/// ```
#[derive(Clone, Default)]
pub struct LoggerConfig {
    /// Minimum level label, or `silent`.
    pub level: Option<String>,
    /// Logger name, written as the `name` binding.
    pub name: Option<String>,
    /// Whether records carry a timestamp.
    pub timestamp: Option<bool>,
    /// Paths to censor.
    pub redact: Option<Redact>,
    /// Base bindings of every record; an empty map disables them.
    pub base: Option<Map<String, Value>>,
    /// Key of the message in JSON output.
    pub message_key: Option<String>,
    /// Key errors are attached under.
    pub error_key: Option<String>,
    /// Field serializers; replaces the default set as a whole.
    pub serializers: Option<Serializers>,
    /// Formatter hooks.
    pub formatters: Option<Formatters>,
    /// Output destination.
    pub transport: Option<TransportConfig>,
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("level", &self.level)
            .field("name", &self.name)
            .field("timestamp", &self.timestamp)
            .field("redact", &self.redact)
            .field("base", &self.base)
            .field("message_key", &self.message_key)
            .field("error_key", &self.error_key)
            .field("serializers", &self.serializers.is_some())
            .field("formatters", &self.formatters.is_some())
            .field("transport", &self.transport)
            .finish()
    }
}

impl LoggerConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set the logger name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable timestamps.
    pub fn timestamp(mut self, enabled: bool) -> Self {
        self.timestamp = Some(enabled);
        self
    }

    /// Set the redaction paths.
    pub fn redact(mut self, redact: Redact) -> Self {
        self.redact = Some(redact);
        self
    }

    /// Set the base bindings.
    pub fn base(mut self, base: Map<String, Value>) -> Self {
        self.base = Some(base);
        self
    }

    /// Set the message key.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }

    /// Set the error key.
    pub fn error_key(mut self, key: impl Into<String>) -> Self {
        self.error_key = Some(key.into());
        self
    }

    /// Set the field serializers.
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = Some(serializers);
        self
    }

    /// Set the formatter hooks.
    pub fn formatters(mut self, formatters: Formatters) -> Self {
        self.formatters = Some(formatters);
        self
    }

    /// Set the transport.
    pub fn transport(mut self, transport: impl Into<TransportConfig>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    /// Overlay `other` on `self`: every field present in `other` wins.
    pub fn merge(self, other: LoggerConfig) -> LoggerConfig {
        LoggerConfig {
            level: other.level.or(self.level),
            name: other.name.or(self.name),
            timestamp: other.timestamp.or(self.timestamp),
            redact: other.redact.or(self.redact),
            base: other.base.or(self.base),
            message_key: other.message_key.or(self.message_key),
            error_key: other.error_key.or(self.error_key),
            serializers: other.serializers.or(self.serializers),
            formatters: other.formatters.or(self.formatters),
            transport: other.transport.or(self.transport),
        }
    }
}

/// Merge configurations in order over the built-in defaults.
pub fn merge_configs(configs: impl IntoIterator<Item = LoggerConfig>) -> LoggerConfig {
    configs.into_iter().fold(default_config(), LoggerConfig::merge)
}

/// The built-in defaults.
pub fn default_config() -> LoggerConfig {
    let mut base = Map::new();
    base.insert("pid".to_string(), std::process::id().into());
    base.insert("hostname".to_string(), hostname().into());

    LoggerConfig::new()
        .level("info")
        .timestamp(true)
        .name(DEFAULT_NAME)
        .message_key("msg")
        .error_key("err")
        .base(base)
}

/// Development defaults: verbose, pretty console.
pub fn development_config() -> LoggerConfig {
    LoggerConfig {
        transport: environment_transport(Tier::Development),
        ..LoggerConfig::new().level("debug")
    }
}

/// Production defaults: credentials censored, JSON files.
pub fn production_config() -> LoggerConfig {
    LoggerConfig {
        transport: environment_transport(Tier::Production),
        ..LoggerConfig::new()
            .level("info")
            .redact(Redact::new(["password", "token", "authorization", "cookie"]))
    }
}

/// Test defaults: warnings and above, no transport.
pub fn test_config() -> LoggerConfig {
    LoggerConfig::new().level("warn")
}

/// The defaults of a tier.
pub fn tier_config(tier: Tier) -> LoggerConfig {
    match tier {
        Tier::Production => production_config(),
        Tier::Test => test_config(),
        Tier::Development => development_config(),
    }
}

/// The layer contributed by environment variables.
pub fn env_var_config(env: &Environment) -> LoggerConfig {
    LoggerConfig {
        level: env.level().map(str::to_string),
        name: env.name().map(str::to_string),
        ..LoggerConfig::default()
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// The effective configuration of one logger; immutable once resolved.
#[derive(Clone, Debug)]
pub struct Config {
    /// Minimum level label, or `silent`.
    pub level: String,
    /// Logger name.
    pub name: String,
    /// Whether records carry a timestamp.
    pub timestamp: bool,
    /// Paths to censor.
    pub redact: Option<Redact>,
    /// Base bindings.
    pub base: Map<String, Value>,
    /// Key of the message in JSON output.
    pub message_key: String,
    /// Key errors are attached under.
    pub error_key: String,
    /// Field serializers.
    pub serializers: Serializers,
    /// Formatter hooks.
    pub formatters: Formatters,
    /// Output destination; `None` writes JSON lines to standard output.
    pub transport: Option<TransportConfig>,
}

impl Config {
    /// Resolve the effective configuration.
    ///
    /// A non-empty `name` is injected into the caller's configuration before merging, so it
    /// overrides both the environment and any `name` inside `config`.
    pub fn resolve(env: &Environment, name: Option<&str>, config: LoggerConfig) -> Config {
        let mut caller = config;
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            caller.name = Some(name.to_string());
        }

        let merged = merge_configs([tier_config(env.tier()), env_var_config(env), caller]);
        Config::from_merged(merged)
    }

    fn from_merged(merged: LoggerConfig) -> Config {
        Config {
            level: merged.level.unwrap_or_else(|| "info".to_string()),
            name: merged.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            timestamp: merged.timestamp.unwrap_or(true),
            redact: merged.redact,
            base: merged.base.unwrap_or_default(),
            message_key: merged.message_key.unwrap_or_else(|| "msg".to_string()),
            error_key: merged.error_key.unwrap_or_else(|| "err".to_string()),
            serializers: merged.serializers.unwrap_or_else(Serializers::defaults),
            formatters: merged.formatters.unwrap_or_default(),
            transport: merged.transport,
        }
    }
}

impl Default for Config {
    /// The built-in defaults alone, without tier, environment or transport.
    fn default() -> Self {
        Config::from_merged(default_config())
    }
}
