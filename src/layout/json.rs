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

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::formatter::Formatters;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that writes one JSON object per record.
///
/// The object is assembled in this order, later keys replacing earlier ones:
///
/// 1. the output of the level formatter, `{"level": 30}` by default;
/// 2. `time` as milliseconds since the Unix epoch, unless timestamps are off;
/// 3. the logger bindings after the bindings formatter;
/// 4. the call-site payload;
/// 5. the message under the message key.
///
/// The log formatter then shapes the complete object.
///
/// # Examples
///
/// ```
/// use logshape::layout::JsonLayout;
///
/// let layout = JsonLayout::default().timestamp(false);
/// ```
#[derive(Debug, Clone)]
pub struct JsonLayout {
    formatters: Formatters,
    message_key: String,
    timestamp: bool,
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self {
            formatters: Formatters::default(),
            message_key: "msg".to_string(),
            timestamp: true,
        }
    }
}

impl JsonLayout {
    /// Set the formatter hooks.
    pub fn formatters(mut self, formatters: Formatters) -> Self {
        self.formatters = formatters;
        self
    }

    /// Set the key the message is written under. Default to `msg`.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    /// Whether to write the `time` field. Default to `true`.
    pub fn timestamp(mut self, enabled: bool) -> Self {
        self.timestamp = enabled;
        self
    }

    fn assemble(&self, record: &Record) -> Result<Map<String, Value>, Error> {
        let level = record.level();
        let mut line = self.formatters.format_level(level.as_str(), level.value());

        if self.timestamp {
            let ts = Timestamp::try_from(record.time())
                .map_err(|err| Error::new("record time out of range").with_source(err))?;
            line.insert("time".to_string(), ts.as_millisecond().into());
        }

        line.extend(self.formatters.format_bindings(record.bindings().clone()));
        if let Some(fields) = record.fields() {
            line.extend(fields.clone());
        }
        if let Some(message) = record.message() {
            line.insert(self.message_key.clone(), message.into());
        }

        Ok(self.formatters.format_log(line))
    }
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let line = self.assemble(record)?;
        serde_json::to_vec(&line).map_err(Error::from_json_error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use std::time::SystemTime;

    use serde_json::json;

    use super::*;
    use crate::Level;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn record() -> Record {
        Record::builder()
            .time(SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123))
            .level(Level::Warn)
            .message(Some("hi".to_string()))
            .bindings(Arc::new(object(json!({"pid": 7, "hostname": "h", "name": "X"}))))
            .fields(Some(object(json!({"a": 1}))))
            .build()
    }

    #[test]
    fn test_default_shape() {
        let bytes = JsonLayout::default().format(&record()).unwrap();
        insta::assert_snapshot!(
            String::from_utf8(bytes).unwrap(),
            @r#"{"@timestamp":1700000000123,"level":40,"message":"hi","name":"X","a":1}"#
        );
    }

    #[test]
    fn test_identity_formatters_keep_bindings() {
        let layout = JsonLayout::default()
            .formatters(Formatters::identity())
            .message_key("text")
            .timestamp(false);
        let bytes = layout.format(&record()).unwrap();
        let line: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            line,
            json!({"level": 40, "pid": 7, "hostname": "h", "name": "X", "a": 1, "text": "hi"})
        );
    }

    #[test]
    fn test_no_message() {
        let record = Record::builder().fields(Some(object(json!({"a": 1})))).build();
        let bytes = JsonLayout::default().timestamp(false).format(&record).unwrap();
        assert_eq!(bytes, br#"{"level":30,"a":1}"#);
    }
}
