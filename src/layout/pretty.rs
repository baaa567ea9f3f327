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

use colored::Color;
use colored::Colorize;
use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Level;
use crate::layout::Layout;
use crate::record::Record;

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Whether and how the record time is printed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TranslateTime {
    /// `true` prints the time in the default format, `false` hides it.
    Enabled(bool),
    /// A `strftime`-style format, rendered in the system time zone.
    Format(String),
}

impl Default for TranslateTime {
    fn default() -> Self {
        TranslateTime::Format(DEFAULT_TIME_FORMAT.to_string())
    }
}

/// Options of the pretty console transport, read from its option map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrettyOptions {
    /// Color the level label.
    pub colorize: bool,
    /// Time rendering.
    pub translate_time: TranslateTime,
    /// Comma-separated keys left out of the printed object.
    pub ignore: String,
    /// Print the object on the header line as compact JSON.
    pub single_line: bool,
    /// Do not print the object at all.
    pub hide_object: bool,
    /// Template of the message part. `{msg}`, `{level}` and any bound or payload key are
    /// substituted; unknown keys render empty.
    pub message_format: String,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            colorize: true,
            translate_time: TranslateTime::default(),
            ignore: "pid,hostname".to_string(),
            single_line: false,
            hide_object: false,
            message_format: "{msg}".to_string(),
        }
    }
}

/// A human-oriented layout: `[time] LEVEL: message` followed by the remaining fields.
///
/// The logger name is never printed as a field; reference it with `{name}` in the message
/// format.
///
/// # Examples
///
/// ```
/// use logshape::layout::PrettyLayout;
/// use logshape::layout::PrettyOptions;
///
/// let layout = PrettyLayout::new(PrettyOptions {
///     colorize: false,
///     single_line: true,
///     ..PrettyOptions::default()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct PrettyLayout {
    options: PrettyOptions,
    ignore: Vec<String>,
    timezone: TimeZone,
}

impl Default for PrettyLayout {
    fn default() -> Self {
        Self::new(PrettyOptions::default())
    }
}

impl PrettyLayout {
    /// Create a layout from options.
    pub fn new(options: PrettyOptions) -> Self {
        let ignore = options
            .ignore
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            options,
            ignore,
            timezone: TimeZone::system(),
        }
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    fn format_time(&self, record: &Record) -> Result<Option<String>, Error> {
        let format = match &self.options.translate_time {
            TranslateTime::Enabled(false) => return Ok(None),
            TranslateTime::Enabled(true) => DEFAULT_TIME_FORMAT,
            TranslateTime::Format(format) => format.as_str(),
        };
        let ts = Timestamp::try_from(record.time())
            .map_err(|err| Error::new("record time out of range").with_source(err))?;
        let zoned = ts.to_zoned(self.timezone.clone());
        jiff::fmt::strtime::format(format, &zoned)
            .map(Some)
            .map_err(|err| {
                Error::new("failed to format record time")
                    .with_context("format", format)
                    .with_source(err)
            })
    }

    fn format_level(&self, level: Level) -> String {
        let label = format!("{:>5}", level.name());
        if self.options.colorize {
            label.color(level_color(level)).to_string()
        } else {
            label
        }
    }

    fn format_message(&self, record: &Record, merged: &Map<String, Value>) -> String {
        let template = self.options.message_format.as_str();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = &after[..end];
            match key {
                "msg" => out.push_str(record.message().unwrap_or_default()),
                "level" => out.push_str(record.level().as_str()),
                _ => match merged.get(key) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {}
                },
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn object(&self, mut merged: Map<String, Value>) -> Map<String, Value> {
        merged.shift_remove("name");
        for key in &self.ignore {
            merged.shift_remove(key);
        }
        merged
    }
}

impl Layout for PrettyLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let merged = record.merged();

        let mut text = String::new();
        if let Some(time) = self.format_time(record)? {
            text.push_str(&format!("[{time}] "));
        }
        let level = self.format_level(record.level());
        let message = self.format_message(record, &merged);
        text.push_str(&format!("{level}: {message}"));

        if self.options.hide_object {
            return Ok(text.into_bytes());
        }

        let object = self.object(merged);
        if object.is_empty() {
            return Ok(text.into_bytes());
        }

        if self.options.single_line {
            let json = serde_json::to_string(&object).map_err(Error::from_json_error)?;
            text.push(' ');
            text.push_str(&json);
        } else {
            for (key, value) in &object {
                let value = serde_json::to_string_pretty(value).map_err(Error::from_json_error)?;
                let value = value.replace('\n', "\n    ");
                text.push_str(&format!("\n    {key}: {value}"));
            }
        }

        Ok(text.into_bytes())
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Fatal => Color::BrightRed,
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Magenta,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use std::time::SystemTime;

    use serde_json::json;

    use super::*;

    fn record() -> Record {
        let bindings = json!({"pid": 1, "hostname": "h", "name": "api", "reqId": 7});
        let fields = json!({"user": {"id": 3}, "ok": true});
        Record::builder()
            .time(SystemTime::UNIX_EPOCH + Duration::from_millis(86_400_123))
            .level(Level::Info)
            .message(Some("served".to_string()))
            .bindings(Arc::new(bindings.as_object().cloned().unwrap()))
            .fields(fields.as_object().cloned())
            .build()
    }

    fn render(options: PrettyOptions) -> String {
        let layout = PrettyLayout::new(options).timezone(TimeZone::UTC);
        String::from_utf8(layout.format(&record()).unwrap()).unwrap()
    }

    #[test]
    fn test_multi_line() {
        let text = render(PrettyOptions {
            colorize: false,
            message_format: "{name}: {msg}".to_string(),
            ..PrettyOptions::default()
        });
        insta::assert_snapshot!(text, @r#"
        [1970-01-02 00:00:00.123]  INFO: api: served
            reqId: 7
            user: {
              "id": 3
            }
            ok: true
        "#);
    }

    #[test]
    fn test_single_line_without_time() {
        let text = render(PrettyOptions {
            colorize: false,
            translate_time: TranslateTime::Enabled(false),
            single_line: true,
            ignore: "pid,hostname,reqId".to_string(),
            ..PrettyOptions::default()
        });
        assert_eq!(text, r#" INFO: served {"user":{"id":3},"ok":true}"#);
    }

    #[test]
    fn test_hide_object_and_template() {
        let text = render(PrettyOptions {
            colorize: false,
            translate_time: TranslateTime::Format("%H:%M".to_string()),
            hide_object: true,
            message_format: "{level} #{reqId} {missing}{msg".to_string(),
            ..PrettyOptions::default()
        });
        assert_eq!(text, "[00:00]  INFO: info #7 {msg");
    }

    #[test]
    fn test_options_from_map() {
        let options: PrettyOptions = serde_json::from_value(json!({
            "translateTime": false,
            "singleLine": true,
            "level": "warn"
        }))
        .unwrap();
        assert_eq!(options.translate_time, TranslateTime::Enabled(false));
        assert!(options.single_line);
        assert!(options.colorize);
    }
}
