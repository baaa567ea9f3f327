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

//! The process-wide default logger.
//!
//! The slot is filled lazily with a logger named `Global` on first use. Each function here is
//! atomic on its own; sequences of calls from different threads are not coordinated.

use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use crate::Error;
use crate::Level;
use crate::args::Arg;
use crate::config::LoggerConfig;
use crate::engine::Engine;
use crate::factory::create_logger;
use crate::logger::IntoFields;
use crate::logger::Logger;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Name of the lazily created default logger.
pub const GLOBAL_NAME: &str = "Global";

static GLOBAL: RwLock<Option<Logger>> = RwLock::new(None);

fn read() -> RwLockReadGuard<'static, Option<Logger>> {
    GLOBAL.read().unwrap_or_else(|e| e.into_inner())
}

fn write() -> RwLockWriteGuard<'static, Option<Logger>> {
    GLOBAL.write().unwrap_or_else(|e| e.into_inner())
}

fn init() -> Logger {
    create_logger(GLOBAL_NAME, LoggerConfig::new()).unwrap_or_else(|err| {
        DefaultTrap::default().trap(&err);
        Logger::new(Engine::fallback(GLOBAL_NAME))
    })
}

fn with_logger<R>(f: impl FnOnce(&mut Logger) -> R) -> R {
    let mut slot = write();
    let logger = slot.get_or_insert_with(init);
    f(logger)
}

/// The default logger, created on first use.
///
/// If the environment describes an unusable configuration, the error goes to the default trap
/// and a logger writing JSON lines to standard output is installed instead.
pub fn logger() -> Logger {
    if let Some(logger) = read().as_ref() {
        return logger.clone();
    }
    with_logger(|logger| logger.clone())
}

/// Replace the default logger.
pub fn set_logger(logger: Logger) {
    *write() = Some(logger);
}

/// Clear the default logger; the next use creates a fresh one.
pub fn reset_logger() {
    *write() = None;
}

/// Create a logger, install it as the default and return it.
///
/// `name` defaults to `Global`.
///
/// # Errors
///
/// Return an error if the logger cannot be constructed; the current default stays in place.
pub fn configure_logger<'a>(
    name: impl Into<Option<&'a str>>,
    config: impl Into<Option<LoggerConfig>>,
) -> Result<Logger, Error> {
    let name = name.into().unwrap_or(GLOBAL_NAME);
    let logger = create_logger(name, config)?;
    set_logger(logger.clone());
    Ok(logger)
}

/// Log at `fatal` on the default logger.
pub fn fatal<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Fatal, args)
}

/// Log at `error` on the default logger.
pub fn error<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Error, args)
}

/// Log at `warn` on the default logger.
pub fn warn<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Warn, args)
}

/// Log at `info` on the default logger.
pub fn info<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Info, args)
}

/// Log at `debug` on the default logger.
pub fn debug<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Debug, args)
}

/// Log at `trace` on the default logger.
pub fn trace<I>(args: I)
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    logger().log(Level::Trace, args)
}

/// A child of the default logger.
pub fn child(bindings: impl IntoFields) -> Logger {
    logger().child(bindings)
}

/// Merge fields into the default logger's context.
pub fn set_context(context: impl IntoFields) {
    with_logger(|logger| {
        logger.set_context(context);
    });
}

/// Flush the default logger.
pub fn flush() {
    logger().flush()
}

/// Whether the default logger emits records at `level`.
pub fn is_level_enabled(level: Level) -> bool {
    logger().is_level_enabled(level)
}
