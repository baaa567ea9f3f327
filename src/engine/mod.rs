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

//! The engine behind every [`Logger`](crate::Logger): level gate, serializers, redaction and
//! dispatch to appenders.

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Level;
use crate::LevelFilter;
use crate::append::Append;
use crate::append::File;
use crate::append::FileOptions;
use crate::append::RollingFile;
use crate::append::RollingOptions;
use crate::append::Stderr;
use crate::append::Stdout;
use crate::config::Config;
use crate::config::Redact;
use crate::layout::JsonLayout;
use crate::layout::PrettyLayout;
use crate::layout::PrettyOptions;
use crate::record::Record;
use crate::serializer::Serializers;
use crate::transport::TARGET_FILE;
use crate::transport::TARGET_PRETTY;
use crate::transport::TARGET_ROLL;
use crate::transport::TARGET_STDERR;
use crate::transport::TARGET_STDOUT;
use crate::transport::Transport;
use crate::trap::Trap;

mod builder;

pub use self::builder::DispatchBuilder;
pub use self::builder::EngineBuilder;

#[derive(Debug)]
pub(crate) struct Dispatch {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(crate) fn new(filter: LevelFilter, appends: Vec<Box<dyn Append>>) -> Self {
        Self { filter, appends }
    }

    fn log(&self, record: &Record, trap: &dyn Trap) {
        if !self.filter.test(record.level()) {
            return;
        }
        for append in &self.appends {
            if let Err(err) = append.append(record) {
                trap.trap(&err);
            }
        }
    }

    fn flush(&self, trap: &dyn Trap) {
        for append in &self.appends {
            if let Err(err) = append.flush() {
                trap.trap(&err);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) filter: LevelFilter,
    pub(crate) error_key: String,
    pub(crate) serializers: Serializers,
    pub(crate) redact: Option<Redact>,
    pub(crate) dispatches: Vec<Dispatch>,
    pub(crate) trap: Box<dyn Trap>,
}

/// A handle to a configured output pipeline.
///
/// Cloning is cheap: clones and children share the dispatches, and each handle carries its own
/// bindings.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
    bindings: Arc<Map<String, Value>>,
}

impl Engine {
    /// Start building an engine by hand.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Materialize an effective configuration.
    ///
    /// The bindings are the base fields followed by `name`. Without a transport, JSON lines go
    /// to standard output.
    ///
    /// # Errors
    ///
    /// Return an error if the level is unknown, a transport target is unknown, its options do
    /// not parse, or its file cannot be opened.
    pub fn new(config: &Config) -> Result<Engine, Error> {
        let filter = config
            .level
            .parse::<LevelFilter>()
            .map_err(|err| err.with_context("option", "level"))?;

        let json = JsonLayout::default()
            .formatters(config.formatters.clone())
            .message_key(config.message_key.clone())
            .timestamp(config.timestamp);

        let mut builder = Engine::builder()
            .level(filter)
            .error_key(config.error_key.clone())
            .serializers(config.serializers.clone());
        if let Some(redact) = &config.redact {
            builder = builder.redact(redact.clone());
        }

        let mut bindings = config.base.clone();
        bindings.insert("name".to_string(), config.name.clone().into());
        builder = builder.bindings(bindings);

        match &config.transport {
            None => builder = builder.append(Stdout::default().with_layout(json)),
            Some(transport) => {
                for target in transport.targets() {
                    let filter = match target.level() {
                        Some(level) => level.parse::<LevelFilter>().map_err(|err| {
                            err.with_context("target", target.target.as_str())
                        })?,
                        None => LevelFilter::All,
                    };
                    let append = materialize(target, &json)?;
                    builder = builder.dispatch(|d| d.filter(filter).append(append));
                }
            }
        }

        Ok(builder.build())
    }

    /// An engine that writes JSON lines at `info` and above to standard output.
    ///
    /// Used where constructing a configured engine failed and logging must go on.
    pub fn fallback(name: &str) -> Engine {
        let mut bindings = Map::new();
        bindings.insert("name".to_string(), name.into());
        Engine::builder()
            .level(LevelFilter::MoreSevereEqual(Level::Info))
            .bindings(bindings)
            .append(Stdout::default())
            .build()
    }

    pub(crate) fn from_shared(shared: Shared, bindings: Map<String, Value>) -> Engine {
        let mut engine = Engine {
            shared: Arc::new(shared),
            bindings: Arc::default(),
        };
        engine.bindings = Arc::new(engine.prepare(bindings));
        engine
    }

    fn prepare(&self, mut fields: Map<String, Value>) -> Map<String, Value> {
        self.shared.serializers.apply(&mut fields);
        if let Some(redact) = &self.shared.redact {
            redact.apply(&mut fields);
        }
        fields
    }

    /// Emit one record. Appender failures go to the trap.
    pub fn log(&self, level: Level, fields: Option<Map<String, Value>>, message: Option<String>) {
        self.log_with(level, || (fields, message));
    }

    /// Emit one record whose fields and message are built only if `level` passes the level gate.
    pub fn log_with<F>(&self, level: Level, build: F)
    where
        F: FnOnce() -> (Option<Map<String, Value>>, Option<String>),
    {
        if !self.is_level_enabled(level) {
            return;
        }

        let (fields, message) = build();
        let fields = fields.map(|fields| self.prepare(fields));
        let record = Record::builder()
            .level(level)
            .message(message)
            .bindings(self.bindings.clone())
            .fields(fields)
            .build();

        let trap = self.shared.trap.as_ref();
        for dispatch in &self.shared.dispatches {
            dispatch.log(&record, trap);
        }
    }

    /// A child engine sharing this engine's pipeline, with extra bindings on every record.
    pub fn child(&self, bindings: Map<String, Value>) -> Engine {
        let mut merged = Map::clone(&self.bindings);
        merged.extend(self.prepare(bindings));
        Engine {
            shared: self.shared.clone(),
            bindings: Arc::new(merged),
        }
    }

    /// Flush every appender. Failures go to the trap.
    pub fn flush(&self) {
        let trap = self.shared.trap.as_ref();
        for dispatch in &self.shared.dispatches {
            dispatch.flush(trap);
        }
    }

    /// Whether a record at `level` would pass the level gate.
    pub fn is_level_enabled(&self, level: Level) -> bool {
        self.shared.filter.test(level)
    }

    /// The minimum level.
    pub fn level(&self) -> LevelFilter {
        self.shared.filter
    }

    /// The key errors are attached under.
    pub fn error_key(&self) -> &str {
        &self.shared.error_key
    }

    /// The bindings written with every record.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }
}

fn materialize(target: &Transport, json: &JsonLayout) -> Result<Box<dyn Append>, Error> {
    let append: Box<dyn Append> = match target.target.as_str() {
        TARGET_PRETTY => {
            let layout = PrettyLayout::new(target.options_as::<PrettyOptions>()?);
            Box::new(Stdout::default().with_layout(layout))
        }
        TARGET_FILE => {
            let file = File::new(target.options_as::<FileOptions>()?)?;
            Box::new(file.with_layout(json.clone()))
        }
        TARGET_ROLL => {
            let file = RollingFile::new(target.options_as::<RollingOptions>()?)?;
            Box::new(file.with_layout(json.clone()))
        }
        TARGET_STDOUT => Box::new(Stdout::default().with_layout(json.clone())),
        TARGET_STDERR => Box::new(Stderr::default().with_layout(json.clone())),
        other => {
            return Err(Error::new("unknown transport target").with_context("target", other));
        }
    };
    Ok(append)
}
