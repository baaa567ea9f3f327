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

//! Formatter hooks shaping the JSON line written by [`JsonLayout`](crate::layout::JsonLayout).

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

use crate::serializer::panic_message;

type LevelFn = dyn Fn(&str, u32) -> Map<String, Value> + Send + Sync;
type MapFn = dyn Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync;

/// The three formatter hooks.
///
/// * `level` turns a level label and number into the fields describing the level.
/// * `bindings` shapes the logger bindings (name, base fields, child bindings).
/// * `log` shapes the whole line right before it is encoded.
///
/// Every hook is guarded: if it fails, the unformatted input is kept and a `formatError` field
/// describes the failure.
#[derive(Clone)]
pub struct Formatters {
    level: Arc<LevelFn>,
    bindings: Arc<MapFn>,
    log: Arc<MapFn>,
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters").finish_non_exhaustive()
    }
}

impl Default for Formatters {
    fn default() -> Self {
        Formatters {
            level: Arc::new(guard_level_formatter(level_formatter)),
            bindings: Arc::new(guard_formatter(bindings_formatter)),
            log: Arc::new(guard_formatter(log_formatter)),
        }
    }
}

impl Formatters {
    /// Hooks that leave everything as is: level as `{level: number}`, bindings and line unchanged.
    pub fn identity() -> Self {
        Formatters {
            level: Arc::new(guard_level_formatter(level_formatter)),
            bindings: Arc::new(|bindings: Map<String, Value>| bindings),
            log: Arc::new(|line: Map<String, Value>| line),
        }
    }

    /// Replace the level hook.
    pub fn with_level<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32) -> anyhow::Result<Map<String, Value>> + Send + Sync + 'static,
    {
        self.level = Arc::new(guard_level_formatter(f));
        self
    }

    /// Replace the bindings hook.
    pub fn with_bindings<F>(mut self, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Map<String, Value>> + Send + Sync + 'static,
    {
        self.bindings = Arc::new(guard_formatter(f));
        self
    }

    /// Replace the log hook.
    pub fn with_log<F>(mut self, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Map<String, Value>> + Send + Sync + 'static,
    {
        self.log = Arc::new(guard_formatter(f));
        self
    }

    /// Run the level hook.
    pub fn format_level(&self, label: &str, number: u32) -> Map<String, Value> {
        (self.level)(label, number)
    }

    /// Run the bindings hook.
    pub fn format_bindings(&self, bindings: Map<String, Value>) -> Map<String, Value> {
        (self.bindings)(bindings)
    }

    /// Run the log hook.
    pub fn format_log(&self, line: Map<String, Value>) -> Map<String, Value> {
        (self.log)(line)
    }
}

/// Wrap a fallible object formatter. On failure the input is returned with a `formatError`
/// field added.
pub fn guard_formatter<F>(
    f: F,
) -> impl Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Map<String, Value>> + Send + Sync + 'static,
{
    move |object| {
        let reason = match catch_unwind(AssertUnwindSafe(|| f(object.clone()))) {
            Ok(Ok(formatted)) => return formatted,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()).to_string(),
        };
        let mut object = object;
        object.insert("formatError".to_string(), reason.into());
        object
    }
}

fn guard_level_formatter<F>(
    f: F,
) -> impl Fn(&str, u32) -> Map<String, Value> + Send + Sync + 'static
where
    F: Fn(&str, u32) -> anyhow::Result<Map<String, Value>> + Send + Sync + 'static,
{
    move |label, number| {
        let reason = match catch_unwind(AssertUnwindSafe(|| f(label, number))) {
            Ok(Ok(formatted)) => return formatted,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()).to_string(),
        };
        let mut object = Map::new();
        object.insert("level".to_string(), number.into());
        object.insert("formatError".to_string(), reason.into());
        object
    }
}

/// Describe the level by its number only.
pub fn level_formatter(_label: &str, number: u32) -> anyhow::Result<Map<String, Value>> {
    let mut object = Map::new();
    object.insert("level".to_string(), number.into());
    Ok(object)
}

/// Keep bindings concise: process id and host name are dropped.
pub fn bindings_formatter(
    mut bindings: Map<String, Value>,
) -> anyhow::Result<Map<String, Value>> {
    bindings.shift_remove("pid");
    bindings.shift_remove("hostname");
    Ok(bindings)
}

/// Put `@timestamp`, `level` and `message` first, renaming `time` and `msg`.
pub fn log_formatter(mut line: Map<String, Value>) -> anyhow::Result<Map<String, Value>> {
    let mut out = Map::new();
    if let Some(time) = line.shift_remove("time") {
        out.insert("@timestamp".to_string(), time);
    }
    if let Some(level) = line.shift_remove("level") {
        out.insert("level".to_string(), level);
    }
    if let Some(msg) = line.shift_remove("msg") {
        out.insert("message".to_string(), msg);
    }
    out.extend(line);
    Ok(out)
}

/// Normalize `err` (or `error`) into an `error` object with name, message, stack and HTTP status.
pub fn error_formatter(mut line: Map<String, Value>) -> anyhow::Result<Map<String, Value>> {
    let Some(err) = line.get("err").or_else(|| line.get("error")).cloned() else {
        return Ok(line);
    };

    let mut error = Map::new();
    for key in ["name", "message", "stack", "status", "statusCode"] {
        if let Some(value) = err.get(key).filter(|v| !v.is_null()) {
            error.insert(key.to_string(), value.clone());
        }
    }
    line.insert("error".to_string(), Value::Object(error));
    Ok(line)
}

/// The current time as an RFC 3339 `timestamp` field.
pub fn timestamp_formatter() -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("timestamp".to_string(), Timestamp::now().to_string().into());
    object
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_log_formatter_reorders() {
        let line = object(json!({"name": "X", "msg": "hi", "time": 1, "level": 30, "a": 1}));
        let out = Value::Object(log_formatter(line).unwrap());
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"@timestamp":1,"level":30,"message":"hi","name":"X","a":1}"#
        );
    }

    #[test]
    fn test_bindings_formatter_drops_process_info() {
        let bindings = object(json!({"pid": 1, "hostname": "h", "name": "X", "a": 1}));
        assert_eq!(
            bindings_formatter(bindings).unwrap(),
            object(json!({"name": "X", "a": 1}))
        );
    }

    #[test]
    fn test_error_formatter() {
        let line = object(json!({"err": {"name": "E", "message": "m", "code": 1, "statusCode": 500}}));
        let out = error_formatter(line).unwrap();
        assert_eq!(out["error"], json!({"name": "E", "message": "m", "statusCode": 500}));
    }

    #[test]
    fn test_guarded_formatter_keeps_input() {
        let formatters = Formatters::default()
            .with_log(|_| anyhow::bail!("no way"))
            .with_level(|_, _| anyhow::bail!("bad level"));
        let out = formatters.format_log(object(json!({"msg": "hi"})));
        assert_eq!(out, object(json!({"msg": "hi", "formatError": "no way"})));
        let level = formatters.format_level("info", 30);
        assert_eq!(level, object(json!({"level": 30, "formatError": "bad level"})));
    }

    #[test]
    fn test_timestamp_formatter() {
        let ts = timestamp_formatter();
        let parsed: Timestamp = ts["timestamp"].as_str().unwrap().parse().unwrap();
        assert!(parsed <= Timestamp::now());
    }
}
