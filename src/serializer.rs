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

//! Field serializers shaping well-known payload fields before they are written.
//!
//! A serializer is keyed by field name and applied to the field's value whenever a payload or a
//! set of child bindings carries that field. Serializers never break a log call: a failing or
//! panicking serializer is replaced by a `"[Serialization Error: ...]"` marker.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::args::is_error_like;

type SerializeFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A guarded serializer for one field.
#[derive(Clone)]
pub struct Serializer(Arc<SerializeFn>);

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Serializer")
    }
}

impl Serializer {
    /// Wrap a fallible serializing function. Failures and panics degrade to a marker string.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Serializer(Arc::new(guard(f)))
    }

    /// Serialize a value.
    pub fn serialize(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

/// Wrap a fallible serializing function so that it always yields a value.
pub fn guard<F>(f: F) -> impl Fn(&Value) -> Value + Send + Sync + 'static
where
    F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    move |value| match catch_unwind(AssertUnwindSafe(|| f(value))) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => Value::String(format!("[Serialization Error: {err}]")),
        Err(panic) => Value::String(format!(
            "[Serialization Error: {}]",
            panic_message(panic.as_ref())
        )),
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Unknown"
    }
}

/// Serializers keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct Serializers {
    entries: BTreeMap<String, Serializer>,
}

impl Serializers {
    /// An empty set; no field is transformed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default set: `err`, `req`, `res`, `user` and `query`.
    pub fn defaults() -> Self {
        Self::new()
            .with("err", error_serializer)
            .with("req", request_serializer)
            .with("res", response_serializer)
            .with("user", user_serializer)
            .with("query", query_serializer)
    }

    /// Register a serializer for the given field, replacing any previous one.
    pub fn with<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.entries.insert(key.into(), Serializer::new(f));
        self
    }

    /// Look up the serializer for a field.
    pub fn get(&self, key: &str) -> Option<&Serializer> {
        self.entries.get(key)
    }

    /// Whether no serializer is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply every matching serializer to the fields in place.
    pub fn apply(&self, fields: &mut Map<String, Value>) {
        if self.entries.is_empty() {
            return;
        }
        for (key, value) in fields.iter_mut() {
            if let Some(serializer) = self.entries.get(key) {
                *value = serializer.serialize(value);
            }
        }
    }
}

fn pick(obj: &Map<String, Value>, out: &mut Map<String, Value>, key: &str) {
    if let Some(value) = obj.get(key).filter(|v| !v.is_null()) {
        out.insert(key.to_string(), value.clone());
    }
}

fn shape_error(value: &Value) -> Value {
    let Some(obj) = value.as_object().filter(|_| is_error_like(value)) else {
        return value.clone();
    };

    let mut out = Map::new();
    let name = obj
        .get("name")
        .or_else(|| obj.get("type"))
        .cloned()
        .unwrap_or_else(|| Value::from("Error"));
    out.insert("type".to_string(), name.clone());
    pick(obj, &mut out, "message");
    pick(obj, &mut out, "stack");
    for (k, v) in obj {
        if !matches!(k.as_str(), "type" | "name" | "message" | "stack") {
            out.insert(k.clone(), v.clone());
        }
    }
    out.insert("name".to_string(), name);
    Value::Object(out)
}

/// Shape an error, or an array of errors, into `type`, `message`, `stack`, extra properties
/// (such as `status` or `statusCode`) and `name`.
pub fn error_serializer(value: &Value) -> anyhow::Result<Value> {
    Ok(match value {
        Value::Array(items) => Value::Array(items.iter().map(shape_error).collect()),
        other => shape_error(other),
    })
}

/// Keep the identifying parts of an HTTP request and a safe subset of its headers.
pub fn request_serializer(value: &Value) -> anyhow::Result<Value> {
    let Some(req) = value.as_object() else {
        return Ok(value.clone());
    };

    let mut out = Map::new();
    for key in ["id", "method", "url", "path", "parameters", "query"] {
        pick(req, &mut out, key);
    }

    let mut headers = Map::new();
    if let Some(src) = req.get("headers").and_then(Value::as_object) {
        for key in [
            "content-type",
            "user-agent",
            "accept",
            "accept-encoding",
            "accept-language",
        ] {
            pick(src, &mut headers, key);
        }
    }
    out.insert("headers".to_string(), Value::Object(headers));

    let socket = req.get("socket").and_then(Value::as_object).unwrap_or(req);
    pick(socket, &mut out, "remoteAddress");
    pick(socket, &mut out, "remotePort");
    Ok(Value::Object(out))
}

/// Keep the status code and the content headers of an HTTP response.
pub fn response_serializer(value: &Value) -> anyhow::Result<Value> {
    let Some(res) = value.as_object() else {
        return Ok(value.clone());
    };

    let mut out = Map::new();
    pick(res, &mut out, "statusCode");
    let mut headers = Map::new();
    if let Some(src) = res.get("headers").and_then(Value::as_object) {
        pick(src, &mut headers, "content-type");
        pick(src, &mut headers, "content-length");
    }
    out.insert("headers".to_string(), Value::Object(headers));
    Ok(Value::Object(out))
}

/// Drop credentials from a user record.
pub fn user_serializer(value: &Value) -> anyhow::Result<Value> {
    let Some(user) = value.as_object() else {
        return Ok(value.clone());
    };

    let safe = user
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "password" | "token" | "secret"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(Value::Object(safe))
}

/// Describe a database query without its parameter values.
pub fn query_serializer(value: &Value) -> anyhow::Result<Value> {
    let Some(query) = value.as_object() else {
        return Ok(value.clone());
    };

    let mut out = Map::new();
    for key in ["sql", "duration", "rowCount"] {
        pick(query, &mut out, key);
    }
    let has_parameters = query
        .get("parameters")
        .and_then(Value::as_array)
        .is_some_and(|p| !p.is_empty());
    out.insert("hasParameters".to_string(), has_parameters.into());
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_serializer_shapes_error() {
        let err = json!({"name": "HttpError", "message": "nope", "stack": "at a", "statusCode": 404});
        let out = error_serializer(&err).unwrap();
        assert_eq!(
            out,
            json!({
                "type": "HttpError",
                "message": "nope",
                "stack": "at a",
                "statusCode": 404,
                "name": "HttpError"
            })
        );
    }

    #[test]
    fn test_error_serializer_maps_arrays() {
        let errs = json!([{"name": "A", "message": "1"}, "plain"]);
        let out = error_serializer(&errs).unwrap();
        assert_eq!(out[0]["type"], json!("A"));
        assert_eq!(out[1], json!("plain"));
    }

    #[test]
    fn test_request_serializer() {
        let req = json!({
            "id": 1,
            "method": "GET",
            "url": "/users?id=2",
            "body": "secret",
            "headers": {"user-agent": "curl", "cookie": "s=1"},
            "socket": {"remoteAddress": "10.0.0.1", "remotePort": 5555}
        });
        let out = request_serializer(&req).unwrap();
        assert_eq!(
            out,
            json!({
                "id": 1,
                "method": "GET",
                "url": "/users?id=2",
                "headers": {"user-agent": "curl"},
                "remoteAddress": "10.0.0.1",
                "remotePort": 5555
            })
        );
    }

    #[test]
    fn test_response_serializer() {
        let res = json!({"statusCode": 200, "headers": {"content-type": "text/plain", "x-a": 1}});
        let out = response_serializer(&res).unwrap();
        assert_eq!(out, json!({"statusCode": 200, "headers": {"content-type": "text/plain"}}));
    }

    #[test]
    fn test_user_serializer_drops_secrets() {
        let user = json!({"id": 3, "password": "p", "token": "t", "secret": "s", "name": "ann"});
        assert_eq!(user_serializer(&user).unwrap(), json!({"id": 3, "name": "ann"}));
        assert_eq!(user_serializer(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_query_serializer_hides_parameters() {
        let query = json!({"sql": "select ?", "parameters": ["pw"], "duration": 3, "rowCount": 1});
        let out = query_serializer(&query).unwrap();
        assert_eq!(
            out,
            json!({"sql": "select ?", "duration": 3, "rowCount": 1, "hasParameters": true})
        );
    }

    #[test]
    fn test_failing_serializer_falls_back() {
        let serializers = Serializers::new()
            .with("bad", |_| anyhow::bail!("malformed record"))
            .with("worse", |_| panic!("exploded"));
        let mut fields = json!({"bad": 1, "worse": 2, "ok": 3})
            .as_object()
            .cloned()
            .unwrap();
        serializers.apply(&mut fields);
        assert_eq!(fields["bad"], json!("[Serialization Error: malformed record]"));
        assert_eq!(fields["worse"], json!("[Serialization Error: exploded]"));
        assert_eq!(fields["ok"], json!(3));
    }
}
