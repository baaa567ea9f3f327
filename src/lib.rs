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

//! Logshape is a thin, environment-aware layer for structured logging.
//!
//! # Overview
//!
//! A [`Logger`] accepts a message, an error, a field map, or a combination in either order, and
//! always emits the same canonical shape: a payload built over the logger's context plus an
//! optional message. Configuration is resolved from built-in defaults, the tier named by
//! `APP_ENV`, the `LOG_LEVEL` and `LOG_NAME` variables, and the caller's [`LoggerConfig`], in
//! increasing precedence. Outputs are described by [`Transport`] presets and materialized by the
//! [`Engine`].
//!
//! # Examples
//!
//! ```
//! use logshape::LoggerConfig;
//! use serde_json::json;
//!
//! let mut logger = logshape::create_logger("api", LoggerConfig::new().level("info")).unwrap();
//! logger.set_context(json!({"requestId": "r-1"}));
//!
//! logshape::info!(logger, json!({"user": 7}), "signed in");
//! logshape::error!(logger, "upstream failed", std::io::Error::other("timeout"));
//!
//! let child = logger.child(json!({"component": "billing"}));
//! child.warn(["quota almost used"]);
//! ```
//!
//! The process-wide default logger:
//!
//! ```
//! logshape::global::info(["service started"]);
//! logshape::global::set_context(serde_json::json!({"region": "eu-1"}));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod args;
#[cfg(feature = "bridge-log")]
pub mod bridge;
pub mod config;
pub mod engine;
pub mod factory;
pub mod formatter;
pub mod global;
pub mod layout;
pub mod record;
pub mod serializer;
pub mod transport;
pub mod trap;

mod error;
mod level;
mod logger;

pub use self::append::Append;
pub use self::args::Arg;
pub use self::args::Emission;
pub use self::args::ErrorLike;
pub use self::config::Config;
pub use self::config::Environment;
pub use self::config::LoggerConfig;
pub use self::config::Redact;
pub use self::config::Tier;
pub use self::engine::Engine;
pub use self::error::Error;
pub use self::factory::create_child_logger;
pub use self::factory::create_logger;
pub use self::factory::create_logger_in;
pub use self::factory::create_logger_with_context;
pub use self::formatter::Formatters;
pub use self::layout::Layout;
pub use self::level::Level;
pub use self::level::LevelFilter;
pub use self::logger::IntoFields;
pub use self::logger::Logger;
pub use self::record::Record;
pub use self::serializer::Serializers;
pub use self::transport::Transport;
pub use self::transport::TransportConfig;
pub use self::trap::Trap;

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {
        $logger.log($level, [$($crate::Arg::from($arg)),+])
    };
}

/// Log at `fatal` with arguments of mixed types.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Fatal, $($arg),+)
    };
}

/// Log at `error` with arguments of mixed types.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Error, $($arg),+)
    };
}

/// Log at `warn` with arguments of mixed types.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Warn, $($arg),+)
    };
}

/// Log at `info` with arguments of mixed types.
///
/// # Examples
///
/// ```
/// use logshape::Engine;
/// use logshape::Logger;
/// use logshape::append::Memory;
/// use serde_json::json;
///
/// let memory = Memory::default();
/// let logger = Logger::new(Engine::builder().append(memory.clone()).build());
/// logshape::info!(logger, json!({"port": 8080}), "listening");
///
/// let record = &memory.records()[0];
/// assert_eq!(record.message(), Some("listening"));
/// assert_eq!(record.get("port"), Some(&json!(8080)));
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Info, $($arg),+)
    };
}

/// Log at `debug` with arguments of mixed types.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Debug, $($arg),+)
    };
}

/// Log at `trace` with arguments of mixed types.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::__log!($logger, $crate::Level::Trace, $($arg),+)
    };
}
