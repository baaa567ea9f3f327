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

//! Route records of the `log` crate into a [`Logger`].

use serde_json::Map;
use serde_json::Value;

use crate::Level;
use crate::args::Arg;
use crate::global;
use crate::logger::Logger;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// A `log::Log` implementation forwarding to a fixed logger, or to the default logger.
///
/// The record target is written under `target`; key-values become payload fields.
#[derive(Debug, Default)]
pub struct LogBridge {
    logger: Option<Logger>,
}

impl LogBridge {
    /// Forward to the default logger as it is at the time of each record.
    pub fn global() -> Self {
        Self { logger: None }
    }

    /// Forward to the given logger.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    fn logger(&self) -> Logger {
        match &self.logger {
            Some(logger) => logger.clone(),
            None => global::logger(),
        }
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut Map<String, Value>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for FieldVisitor<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.fields.insert(key.as_str().to_string(), to_json(&value));
        Ok(())
    }
}

fn to_json(value: &log::kv::Value) -> Value {
    if let Some(b) = value.to_bool() {
        Value::Bool(b)
    } else if let Some(n) = value.to_i64() {
        n.into()
    } else if let Some(n) = value.to_u64() {
        n.into()
    } else if let Some(n) = value.to_f64() {
        n.into()
    } else {
        Value::String(value.to_string())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger().is_level_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let logger = self.logger();
        let level = Level::from(record.level());
        if !logger.is_level_enabled(level) {
            return;
        }

        let mut fields = Map::new();
        fields.insert("target".to_string(), record.target().into());
        let mut visitor = FieldVisitor {
            fields: &mut fields,
        };
        // a failing source still leaves the pairs visited so far
        let _ = record.key_values().visit(&mut visitor);

        let message = record.args().to_string();
        logger.log(level, [Arg::Fields(fields), Arg::Message(message)]);
    }

    fn flush(&self) {
        self.logger().flush();
    }
}

/// Set up the log crate global logger to forward to the default logger.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
pub fn try_setup_log_crate() -> Result<(), log::SetLoggerError> {
    static BRIDGE: LogBridge = LogBridge { logger: None };
    log::set_logger(&BRIDGE)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger to forward to the default logger.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// logshape::bridge::setup_log_crate();
/// log::info!(user = 7; "signed in");
/// ```
pub fn setup_log_crate() {
    try_setup_log_crate().expect(
        "logshape::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}

#[cfg(test)]
mod tests {
    use log::Log;
    use serde_json::json;

    use super::*;
    use crate::LevelFilter;
    use crate::append::Memory;
    use crate::engine::Engine;

    #[test]
    fn test_forwards_record_with_kvs() {
        let memory = Memory::default();
        let engine = Engine::builder()
            .level(LevelFilter::MoreSevereEqual(Level::Info))
            .append(memory.clone())
            .build();
        let bridge = LogBridge::new(Logger::new(engine));

        let kvs = [("user", log::kv::Value::from(7)), ("ok", log::kv::Value::from(true))];
        bridge.log(
            &log::Record::builder()
                .args(format_args!("signed in"))
                .level(log::Level::Info)
                .target("auth")
                .key_values(&kvs)
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .args(format_args!("hidden"))
                .level(log::Level::Debug)
                .build(),
        );

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), Some("signed in"));
        assert_eq!(
            Value::Object(records[0].fields().cloned().unwrap()),
            json!({"target": "auth", "user": 7, "ok": true})
        );
        assert!(!bridge.enabled(&log::Metadata::builder().level(log::Level::Trace).build()));
    }
}
