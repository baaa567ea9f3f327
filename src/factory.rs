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

//! Constructors resolving configuration and building loggers.

use crate::Error;
use crate::config::Config;
use crate::config::Environment;
use crate::config::LoggerConfig;
use crate::engine::Engine;
use crate::logger::IntoFields;
use crate::logger::Logger;

/// Create a logger from the process environment.
///
/// Configuration is resolved from the built-in defaults, the tier named by `APP_ENV`, the
/// `LOG_LEVEL` and `LOG_NAME` variables and finally `config`. A non-empty `name` overrides
/// every other name.
///
/// # Errors
///
/// Return an error if the engine cannot be constructed; see [`Engine::new`].
///
/// # Examples
///
/// ```
/// use logshape::LoggerConfig;
/// use logshape::create_logger;
///
/// let logger = create_logger("worker", LoggerConfig::new().level("error")).unwrap();
/// logger.error(["job failed"]);
/// ```
pub fn create_logger<'a>(
    name: impl Into<Option<&'a str>>,
    config: impl Into<Option<LoggerConfig>>,
) -> Result<Logger, Error> {
    create_logger_in(&Environment::from_env(), name, config)
}

/// Create a logger from an explicit environment snapshot.
pub fn create_logger_in<'a>(
    env: &Environment,
    name: impl Into<Option<&'a str>>,
    config: impl Into<Option<LoggerConfig>>,
) -> Result<Logger, Error> {
    let config = Config::resolve(env, name.into(), config.into().unwrap_or_default());
    let engine = Engine::new(&config)?;
    Ok(Logger::new(engine))
}

/// Create a logger and seed its context.
pub fn create_logger_with_context<'a>(
    name: impl Into<Option<&'a str>>,
    context: impl IntoFields,
    config: impl Into<Option<LoggerConfig>>,
) -> Result<Logger, Error> {
    let mut logger = create_logger(name, config)?;
    logger.set_context(context);
    Ok(logger)
}

/// Create a child of `parent` with extra bindings.
pub fn create_child_logger(parent: &Logger, bindings: impl IntoFields) -> Logger {
    parent.child(bindings)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Level;

    #[test]
    fn test_resolves_in_environment() {
        let env = Environment::from_vars([("APP_ENV", "production"), ("LOG_NAME", "env-name")]);
        let logger = create_logger_in(
            &env,
            "explicit",
            LoggerConfig::new().transport(crate::transport::stdout_transport()),
        )
        .unwrap();
        assert_eq!(logger.engine().bindings()["name"], json!("explicit"));
        assert!(logger.is_level_enabled(Level::Info));
        assert!(!logger.is_level_enabled(Level::Debug));
    }

    #[test]
    fn test_invalid_level_fails() {
        let env = Environment::from_vars([("LOG_LEVEL", "chatty")]);
        assert!(create_logger_in(&env, "x", LoggerConfig::new()).is_err());
    }

    #[test]
    fn test_with_context_and_child() {
        let logger = create_logger_with_context(
            "ctx",
            json!({"tenant": "t1"}),
            LoggerConfig::new().level("silent"),
        )
        .unwrap();
        assert_eq!(logger.context()["tenant"], json!("t1"));
        assert!(!logger.is_level_enabled(Level::Fatal));

        let child = create_child_logger(&logger, json!({"job": 9}));
        assert_eq!(child.engine().bindings()["job"], json!(9));
        assert_eq!(child.engine().bindings()["tenant"], json!("t1"));
        assert!(child.context().get("job").is_none());
    }
}
