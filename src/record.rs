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

//! Log record handed from the engine to appenders and layouts.

use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Map;
use serde_json::Value;

use crate::Level;

/// One emitted log line, after serializers and redaction have run.
#[derive(Clone, Debug)]
pub struct Record {
    // the observed time
    now: SystemTime,

    level: Level,
    message: Option<String>,

    // logger name, base fields and child bindings
    bindings: Arc<Map<String, Value>>,

    // call-site payload; `None` when empty
    fields: Option<Map<String, Value>>,
}

impl Record {
    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> SystemTime {
        self.now
    }

    /// The severity.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message, if the call supplied one.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The bindings of the emitting logger.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    /// The call-site payload, `None` if it had no keys.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.fields.as_ref()
    }

    /// Look up a key in the payload first, then in the bindings.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .as_ref()
            .and_then(|f| f.get(key))
            .or_else(|| self.bindings.get(key))
    }

    /// Bindings overlaid with the payload.
    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = Map::clone(&self.bindings);
        if let Some(fields) = &self.fields {
            merged.extend(fields.clone());
        }
        merged
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                now: SystemTime::now(),
                level: Level::Info,
                message: None,
                bindings: Arc::default(),
                fields: None,
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, now: SystemTime) -> Self {
        self.record.now = now;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: Option<String>) -> Self {
        self.record.message = message;
        self
    }

    /// Set [`bindings`](Record::bindings).
    pub fn bindings(mut self, bindings: Arc<Map<String, Value>>) -> Self {
        self.record.bindings = bindings;
        self
    }

    /// Set [`fields`](Record::fields). An empty map is stored as `None`.
    pub fn fields(mut self, fields: Option<Map<String, Value>>) -> Self {
        self.record.fields = fields.filter(|f| !f.is_empty());
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}
