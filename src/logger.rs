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

//! The logger facade: context, children and the six leveled operations.

use serde_json::Map;
use serde_json::Value;

use crate::Level;
use crate::args::Arg;
use crate::args::normalize;
use crate::engine::Engine;

/// Values that can be merged into a logger's context or bindings.
pub trait IntoFields {
    /// Convert into a field map.
    fn into_fields(self) -> Map<String, Value>;
}

impl IntoFields for Map<String, Value> {
    fn into_fields(self) -> Map<String, Value> {
        self
    }
}

impl IntoFields for &Map<String, Value> {
    fn into_fields(self) -> Map<String, Value> {
        self.clone()
    }
}

/// Objects contribute their keys; every other value contributes nothing.
impl IntoFields for Value {
    fn into_fields(self) -> Map<String, Value> {
        match self {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// A leveled logger carrying accumulated context.
///
/// Every call is normalized into a payload and an optional message: arguments may be a message,
/// an error, a field map, or a combination in either order. The context is the base layer of
/// every payload; call-site fields win on collisions.
///
/// # Examples
///
/// ```
/// use logshape::Arg;
/// use logshape::LoggerConfig;
/// use logshape::create_logger;
/// use serde_json::json;
///
/// let mut logger = create_logger("api", LoggerConfig::new().level("warn")).unwrap();
/// logger.set_context(json!({"requestId": "r-1"}));
/// logger.info(["request received"]);
/// logger.warn([Arg::from(json!({"retry": 2})), Arg::from("slow upstream")]);
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    engine: Engine,
    context: Map<String, Value>,
}

impl Logger {
    /// Wrap an engine with an empty context.
    pub fn new(engine: Engine) -> Self {
        Self::with_context(engine, Map::new())
    }

    /// Wrap an engine with an initial context.
    pub fn with_context(engine: Engine, context: impl IntoFields) -> Self {
        Self {
            engine,
            context: context.into_fields(),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The accumulated context.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Merge fields into the context; later calls win per key.
    pub fn set_context(&mut self, context: impl IntoFields) -> &mut Self {
        self.context.extend(context.into_fields());
        self
    }

    /// A child logger whose engine binds the current context and `bindings` to every record.
    ///
    /// The child starts with a snapshot of this logger's context; the bindings are not part of
    /// it, and later context changes on either side do not propagate.
    pub fn child(&self, bindings: impl IntoFields) -> Logger {
        let mut seeded = self.context.clone();
        seeded.extend(bindings.into_fields());
        Logger {
            engine: self.engine.child(seeded),
            context: self.context.clone(),
        }
    }

    /// Normalize the arguments and emit them at `level`.
    ///
    /// Arguments are only normalized if the engine's level gate admits `level`.
    pub fn log<I>(&self, level: Level, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.engine.log_with(level, || {
            normalize(&self.context, self.engine.error_key(), args).into_parts()
        });
    }

    /// Log at `fatal`.
    pub fn fatal<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Fatal, args)
    }

    /// Log at `error`.
    pub fn error<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Error, args)
    }

    /// Log at `warn`.
    pub fn warn<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Warn, args)
    }

    /// Log at `info`.
    pub fn info<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Info, args)
    }

    /// Log at `debug`.
    pub fn debug<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Debug, args)
    }

    /// Log at `trace`.
    pub fn trace<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.log(Level::Trace, args)
    }

    /// Flush buffered output, best effort.
    pub fn flush(&self) {
        self.engine.flush();
    }

    /// Whether a record at `level` would be emitted.
    pub fn is_level_enabled(&self, level: Level) -> bool {
        self.engine.is_level_enabled(level)
    }
}
