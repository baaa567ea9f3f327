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

//! Severity levels and level thresholds.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The severity of a log record, ordered from most to least severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// The application is about to abort.
    Fatal,
    /// Designates very serious errors.
    Error,
    /// Designates hazardous situations.
    Warn,
    /// Designates useful information.
    Info,
    /// Designates lower priority information.
    Debug,
    /// Designates very low priority, often extremely verbose, information.
    Trace,
}

impl Level {
    /// All levels, most severe first.
    pub const ALL: [Level; 6] = [
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// The lowercase label, as accepted by [`FromStr`] and used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        }
    }

    /// The uppercase name used by human-readable layouts.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// The numeric value written by JSON layouts: 60 for fatal down to 10 for trace.
    pub fn value(&self) -> u32 {
        match self {
            Level::Fatal => 60,
            Level::Error => 50,
            Level::Warn => 40,
            Level::Info => 30,
            Level::Debug => 20,
            Level::Trace => 10,
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in Level::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }

        Err(Error::new(format!("unknown level: {s:?}")))
    }
}

/// A threshold deciding which levels are emitted.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LevelFilter {
    /// Disables all levels.
    Off,
    /// Enables if the target level is more severe than or equal to the filter level.
    MoreSevereEqual(Level),
    /// Enables all levels.
    All,
}

impl LevelFilter {
    /// Checks the given level if satisfies the filter condition.
    ///
    /// # Examples
    ///
    /// ```
    /// use logshape::Level;
    /// use logshape::LevelFilter;
    ///
    /// let filter = LevelFilter::MoreSevereEqual(Level::Info);
    ///
    /// assert!(!filter.test(Level::Debug));
    /// assert!(filter.test(Level::Info));
    /// assert!(filter.test(Level::Fatal));
    /// ```
    pub fn test(&self, level: Level) -> bool {
        match self {
            LevelFilter::Off => false,
            LevelFilter::MoreSevereEqual(l) => level <= *l,
            LevelFilter::All => true,
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::MoreSevereEqual(level)
    }
}

impl FromStr for LevelFilter {
    type Err = Error;

    /// Parses a level label, or `silent`/`off` to disable output.
    fn from_str(s: &str) -> Result<LevelFilter, Self::Err> {
        if s.eq_ignore_ascii_case("silent") || s.eq_ignore_ascii_case("off") {
            return Ok(LevelFilter::Off);
        }
        s.parse::<Level>().map(LevelFilter::MoreSevereEqual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_ignores_case() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("trace".parse::<Level>().unwrap(), Level::Trace);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("silent".parse::<LevelFilter>().unwrap(), LevelFilter::Off);
        let filter = "warn".parse::<LevelFilter>().unwrap();
        assert!(filter.test(Level::Error));
        assert!(!filter.test(Level::Info));
        assert!(!LevelFilter::Off.test(Level::Fatal));
    }

    #[test]
    fn test_numeric_values_descend_with_severity() {
        let values = Level::ALL.map(|l| l.value());
        assert_eq!(values, [60, 50, 40, 30, 20, 10]);
    }
}
