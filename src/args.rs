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

//! Call-site arguments and their normalization into a payload and a message.
//!
//! Every leveled call accepts a small closed set of argument shapes: a message, an error, a
//! map of fields, or nothing. [`normalize`] folds any sequence of them into an [`Emission`]:
//!
//! 1. A leading message is the message; everything after it is merged.
//! 2. A leading error is attached under the error key; a message right after it is the message.
//! 3. Leading fields are merged; a message right after them is the message.
//! 4. Anything else leading is skipped; a message right after it is the message.
//!
//! Merging follows one rule everywhere: field maps are merged shallowly with the later argument
//! winning on key collisions, while errors accumulate, turning the error field into an array as
//! soon as a second error shows up. Surplus messages and scalar values are dropped.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt::Write;

use serde_json::Map;
use serde_json::Value;

/// A structural description of an error.
///
/// Values are recognized as errors by shape rather than by type: any JSON object with a string
/// `message` plus a string `name` or `stack` is error-like, so errors that went through a
/// serialization boundary are still treated as errors.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorLike {
    name: String,
    message: String,
    stack: Option<String>,
    extra: Map<String, Value>,
}

impl ErrorLike {
    /// Create an error-like value from its name and message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            extra: Map::new(),
        }
    }

    /// Capture a Rust error. The name is the error's type name, the stack is its source chain.
    pub fn from_error<E: StdError>(err: &E) -> Self {
        let name = short_type_name(type_name::<E>());
        Self::from_dyn_error(err).with_name(name)
    }

    /// Capture a type-erased Rust error. The name is always `Error`.
    pub fn from_dyn_error(err: &(dyn StdError + '_)) -> Self {
        let message = err.to_string();
        let mut stack = format!("Error: {message}");
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = write!(&mut stack, "\n    caused by: {cause}");
            source = cause.source();
        }

        Self {
            name: "Error".to_string(),
            message,
            stack: Some(stack),
            extra: Map::new(),
        }
    }

    /// Recognize an error-like JSON value; `None` if the value does not have the error shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !is_error_like(value) {
            return None;
        }

        let message = obj.get("message")?.as_str()?.to_string();
        let name = obj
            .get("name")
            .or_else(|| obj.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("Error")
            .to_string();
        let stack = obj.get("stack").and_then(Value::as_str).map(str::to_string);
        let extra = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "name" | "type" | "message" | "stack"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            name,
            message,
            stack,
            extra,
        })
    }

    /// Override the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the stack description.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach an extra property, e.g. `statusCode`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The error name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stack description, if any.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Extra properties.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Convert into the JSON object attached to a payload.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), self.name.clone().into());
        obj.insert("message".to_string(), self.message.clone().into());
        if let Some(stack) = &self.stack {
            obj.insert("stack".to_string(), stack.clone().into());
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// Whether a value has the structural shape of an error.
pub fn is_error_like(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has_str = |key: &str| obj.get(key).is_some_and(Value::is_string);
    has_str("message") && (has_str("name") || has_str("stack"))
}

fn short_type_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// One argument of a leveled logging call.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A human-readable message.
    Message(String),
    /// An error attached under the error key.
    Error(ErrorLike),
    /// Structured fields merged into the payload.
    Fields(Map<String, Value>),
    /// An explicitly missing argument.
    Absent,
    /// Any other value; never a message, never merged.
    Other(Value),
}

impl Arg {
    /// Classify a JSON value by its shape.
    pub fn classify(value: Value) -> Arg {
        match value {
            Value::Null => Arg::Absent,
            Value::String(s) => Arg::Message(s),
            Value::Object(_) if is_error_like(&value) => match ErrorLike::from_value(&value) {
                Some(err) => Arg::Error(err),
                None => Arg::Other(value),
            },
            Value::Object(obj) => Arg::Fields(obj),
            other => Arg::Other(other),
        }
    }

    /// Capture a Rust error as an argument.
    pub fn error<E: StdError>(err: &E) -> Arg {
        Arg::Error(ErrorLike::from_error(err))
    }
}

impl From<&str> for Arg {
    fn from(message: &str) -> Self {
        Arg::Message(message.to_string())
    }
}

impl From<String> for Arg {
    fn from(message: String) -> Self {
        Arg::Message(message)
    }
}

impl From<&String> for Arg {
    fn from(message: &String) -> Self {
        Arg::Message(message.clone())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::classify(value)
    }
}

impl From<Map<String, Value>> for Arg {
    fn from(fields: Map<String, Value>) -> Self {
        Arg::classify(Value::Object(fields))
    }
}

impl From<ErrorLike> for Arg {
    fn from(err: ErrorLike) -> Self {
        Arg::Error(err)
    }
}

impl From<&anyhow::Error> for Arg {
    fn from(err: &anyhow::Error) -> Self {
        let chain = format!("{err:?}");
        Arg::Error(ErrorLike::from_dyn_error(err.as_ref()).with_stack(chain))
    }
}

impl From<anyhow::Error> for Arg {
    fn from(err: anyhow::Error) -> Self {
        Arg::from(&err)
    }
}

impl From<std::io::Error> for Arg {
    fn from(err: std::io::Error) -> Self {
        Arg::error(&err)
    }
}

impl From<&std::io::Error> for Arg {
    fn from(err: &std::io::Error) -> Self {
        Arg::error(err)
    }
}

impl From<crate::Error> for Arg {
    fn from(err: crate::Error) -> Self {
        Arg::error(&err)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Absent, Into::into)
    }
}

/// The canonical shape every leveled call collapses to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emission {
    /// Context overlaid with call-site fields and errors.
    pub payload: Map<String, Value>,
    /// The message, if any argument supplied one.
    pub message: Option<String>,
}

impl Emission {
    /// Split into the payload and the message. An empty payload is returned as `None` so that
    /// no empty object reaches the engine.
    pub fn into_parts(self) -> (Option<Map<String, Value>>, Option<String>) {
        let payload = if self.payload.is_empty() {
            None
        } else {
            Some(self.payload)
        };
        (payload, self.message)
    }
}

/// Fold call-site arguments over the accumulated context.
///
/// # Examples
///
/// ```
/// use logshape::args::Arg;
/// use logshape::args::normalize;
/// use serde_json::Map;
/// use serde_json::json;
///
/// let context = Map::new();
/// let args = [Arg::from(json!({"user": 7})), Arg::from("signed in")];
/// let emission = normalize(&context, "err", args);
///
/// assert_eq!(emission.message.as_deref(), Some("signed in"));
/// assert_eq!(emission.payload["user"], json!(7));
/// ```
pub fn normalize<I>(context: &Map<String, Value>, error_key: &str, args: I) -> Emission
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut fields = Map::new();
    let mut message = None;

    match args.next() {
        Some(Arg::Message(m)) => message = Some(m),
        Some(first) => {
            merge_arg(&mut fields, error_key, first);
            match args.next() {
                Some(Arg::Message(m)) => message = Some(m),
                Some(second) => merge_arg(&mut fields, error_key, second),
                None => {}
            }
        }
        None => {}
    }

    for arg in args {
        merge_arg(&mut fields, error_key, arg);
    }

    let mut payload = context.clone();
    payload.extend(fields);
    Emission { payload, message }
}

fn merge_arg(fields: &mut Map<String, Value>, error_key: &str, arg: Arg) {
    match arg {
        Arg::Error(err) => attach_error(fields, error_key, err.to_value()),
        Arg::Fields(map) => fields.extend(map),
        Arg::Message(_) | Arg::Absent | Arg::Other(_) => {}
    }
}

fn attach_error(fields: &mut Map<String, Value>, error_key: &str, err: Value) {
    match fields.get_mut(error_key) {
        None => {
            fields.insert(error_key.to_string(), err);
        }
        Some(Value::Array(errors)) => errors.push(err),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, err]);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    fn run(context: Value, args: Vec<Arg>) -> Emission {
        normalize(&fields(context), "err", args)
    }

    #[test]
    fn test_message_only_yields_empty_payload() {
        let emission = run(json!({}), vec!["hello".into()]);
        let (payload, message) = emission.into_parts();
        assert_eq!(payload, None);
        assert_eq!(message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_fields_then_message() {
        let emission = run(json!({}), vec![json!({"a": 1, "b": "x"}).into(), "hi".into()]);
        assert_eq!(emission.message.as_deref(), Some("hi"));
        assert_eq!(emission.payload, fields(json!({"a": 1, "b": "x"})));
    }

    #[test]
    fn test_message_then_fields_later_wins() {
        let emission = run(
            json!({}),
            vec![
                "msg".into(),
                json!({"k": 1, "a": true}).into(),
                json!({"k": 2}).into(),
            ],
        );
        assert_eq!(emission.payload, fields(json!({"k": 2, "a": true})));
    }

    #[test]
    fn test_message_then_error() {
        let err = ErrorLike::new("TypeError", "E");
        let emission = run(json!({}), vec!["boom".into(), err.into()]);
        assert_eq!(emission.message.as_deref(), Some("boom"));
        assert_eq!(emission.payload["err"]["message"], json!("E"));
        assert_eq!(emission.payload["err"]["name"], json!("TypeError"));
    }

    #[test]
    fn test_error_first_then_message() {
        let err = ErrorLike::new("Error", "disk full").with_field("statusCode", 507);
        let emission = run(json!({}), vec![err.into(), "write failed".into()]);
        assert_eq!(emission.message.as_deref(), Some("write failed"));
        assert_eq!(emission.payload["err"]["statusCode"], json!(507));
    }

    #[test]
    fn test_two_errors_accumulate_in_call_order() {
        let first = ErrorLike::new("Error", "one");
        let second = ErrorLike::new("Error", "two");
        let emission = run(json!({}), vec!["many".into(), first.into(), second.into()]);
        let errors = emission.payload["err"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["message"], json!("one"));
        assert_eq!(errors[1]["message"], json!("two"));
    }

    #[test]
    fn test_three_errors_extend_the_array() {
        let args = vec![
            ErrorLike::new("Error", "a").into(),
            ErrorLike::new("Error", "b").into(),
            ErrorLike::new("Error", "c").into(),
        ];
        let emission = run(json!({}), args);
        assert_eq!(emission.message, None);
        assert_eq!(emission.payload["err"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_error_with_extra_fields() {
        let err = ErrorLike::new("Error", "timeout");
        let emission = run(
            json!({}),
            vec![
                "request failed".into(),
                err.into(),
                json!({"requestId": "req-123", "retry": 3}).into(),
            ],
        );
        assert_eq!(emission.payload["requestId"], json!("req-123"));
        assert_eq!(emission.payload["retry"], json!(3));
        assert_eq!(emission.payload["err"]["message"], json!("timeout"));
    }

    #[test]
    fn test_absent_first_takes_second_as_message() {
        let emission = run(json!({}), vec![Arg::Absent, "late".into(), json!({"x": 1}).into()]);
        assert_eq!(emission.message.as_deref(), Some("late"));
        assert_eq!(emission.payload, fields(json!({"x": 1})));
    }

    #[test]
    fn test_no_arguments() {
        let emission = run(json!({"ctx": 1}), vec![]);
        assert_eq!(emission.message, None);
        assert_eq!(emission.payload, fields(json!({"ctx": 1})));
    }

    #[test]
    fn test_call_site_overrides_context() {
        let emission = run(
            json!({"requestId": "r1", "user": "ann"}),
            vec![json!({"user": "bob"}).into(), "hi".into()],
        );
        assert_eq!(emission.payload["requestId"], json!("r1"));
        assert_eq!(emission.payload["user"], json!("bob"));
    }

    #[test]
    fn test_surplus_messages_and_scalars_are_dropped() {
        let emission = run(json!({}), vec!["a".into(), "b".into(), json!(42).into()]);
        assert_eq!(emission.message.as_deref(), Some("a"));
        assert!(emission.payload.is_empty());
    }

    #[test]
    fn test_fields_after_error_can_replace_error_key() {
        let emission = run(
            json!({}),
            vec![
                ErrorLike::new("Error", "hidden").into(),
                "msg".into(),
                json!({"err": "replaced"}).into(),
            ],
        );
        assert_eq!(emission.payload["err"], json!("replaced"));
    }

    #[test]
    fn test_error_after_error_field_map_accumulates() {
        let existing = ErrorLike::new("Error", "first").to_value();
        let emission = run(
            json!({}),
            vec![
                json!({ "err": existing }).into(),
                "msg".into(),
                ErrorLike::new("Error", "second").into(),
            ],
        );
        let errors = emission.payload["err"].as_array().unwrap();
        assert_eq!(errors[0]["message"], json!("first"));
        assert_eq!(errors[1]["message"], json!("second"));
    }

    #[test]
    fn test_structural_detection() {
        assert!(is_error_like(&json!({"message": "m", "name": "Error"})));
        assert!(is_error_like(&json!({"message": "m", "stack": "at x"})));
        assert!(!is_error_like(&json!({"message": "m"})));
        assert!(!is_error_like(&json!({"message": 1, "name": "Error"})));

        let arg = Arg::from(json!({"name": "RangeError", "message": "out", "code": 7}));
        let Arg::Error(err) = arg else {
            panic!("expected an error argument");
        };
        assert_eq!(err.name(), "RangeError");
        assert_eq!(err.extra()["code"], json!(7));
    }

    #[test]
    fn test_error_shaped_map_goes_under_error_key() {
        let shaped = fields(json!({"name": "TypeError", "message": "E", "stack": "at x"}));
        let from_map = run(json!({}), vec![shaped.clone().into(), "failed".into()]);
        let from_value = run(json!({}), vec![Value::Object(shaped).into(), "failed".into()]);

        assert_eq!(from_map, from_value);
        assert_eq!(from_map.payload.len(), 1);
        assert_eq!(from_map.payload["err"]["name"], json!("TypeError"));
        assert_eq!(from_map.message.as_deref(), Some("failed"));
    }

    #[test]
    fn test_rust_error_capture() {
        let io = std::io::Error::other("disk on fire");
        let err = ErrorLike::from_error(&io);
        assert_eq!(err.name(), "Error");
        assert_eq!(err.message(), "disk on fire");

        let any = anyhow::anyhow!("root").context("outer");
        let Arg::Error(err) = Arg::from(&any) else {
            panic!("expected an error argument");
        };
        assert_eq!(err.message(), "outer");
        assert!(err.stack().unwrap().contains("root"));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("my::Wrapper<alloc::string::String>"), "Wrapper");
    }
}
