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

use serde_json::Map;
use serde_json::Value;

use crate::LevelFilter;
use crate::append::Append;
use crate::config::Redact;
use crate::engine::Dispatch;
use crate::engine::Engine;
use crate::engine::Shared;
use crate::serializer::Serializers;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A builder for an [`Engine`] assembled by hand rather than from a configuration.
///
/// # Examples
///
/// ```
/// use logshape::Engine;
/// use logshape::Level;
/// use logshape::LevelFilter;
/// use logshape::append;
///
/// let engine = Engine::builder()
///     .level(LevelFilter::MoreSevereEqual(Level::Info))
///     .dispatch(|d| {
///         d.filter(LevelFilter::MoreSevereEqual(Level::Error))
///             .append(append::Stderr::default())
///     })
///     .append(append::Stdout::default())
///     .build();
/// ```
#[must_use = "call `build` to construct an engine"]
#[derive(Debug)]
pub struct EngineBuilder {
    filter: LevelFilter,
    error_key: String,
    serializers: Serializers,
    redact: Option<Redact>,
    bindings: Map<String, Value>,
    dispatches: Vec<Dispatch>,
    trap: Box<dyn Trap>,
}

impl EngineBuilder {
    pub(crate) fn new() -> Self {
        EngineBuilder {
            filter: LevelFilter::All,
            error_key: "err".to_string(),
            serializers: Serializers::new(),
            redact: None,
            bindings: Map::new(),
            dispatches: vec![],
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the minimum level. Default to all levels.
    pub fn level(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the key errors are attached under. Default to `err`.
    pub fn error_key(mut self, key: impl Into<String>) -> Self {
        self.error_key = key.into();
        self
    }

    /// Set the field serializers. Default to none.
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    /// Censor paths in payloads and bindings.
    pub fn redact(mut self, redact: Redact) -> Self {
        self.redact = Some(redact);
        self
    }

    /// Set the bindings written with every record.
    pub fn bindings(mut self, bindings: Map<String, Value>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Register a new dispatch.
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Register a dispatch with a single appender and no filter.
    pub fn append(self, append: impl Into<Box<dyn Append>>) -> Self {
        self.dispatch(|d| d.append(append))
    }

    /// Set the trap for errors raised by appenders.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`Engine`].
    pub fn build(self) -> Engine {
        let shared = Shared {
            filter: self.filter,
            error_key: self.error_key,
            serializers: self.serializers,
            redact: self.redact,
            dispatches: self.dispatches,
            trap: self.trap,
        };
        Engine::from_shared(shared, self.bindings)
    }
}

/// A builder for one dispatch: an optional level filter and at least one appender.
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            filter: LevelFilter::All,
            appends: vec![],
        }
    }

    /// Only pass records the filter admits to this dispatch.
    pub fn filter(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.filter = filter.into();
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.filter, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            filter: self.filter,
            appends: self.appends,
        }
    }
}
