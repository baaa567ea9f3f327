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

#![cfg(unix)]

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use logshape::Environment;
use logshape::Level;
use logshape::LoggerConfig;
use logshape::create_logger;

// one test function: the process environment is shared state
#[test]
fn test_unrelated_non_unicode_variable_is_ignored() {
    let invalid = OsStr::from_bytes(&[0x66, 0xff, 0x6f]);
    // SAFETY: this binary runs a single test, so no other thread reads the environment.
    unsafe {
        std::env::set_var("LOGSHAPE_UNRELATED", invalid);
        std::env::set_var("LOG_NAME", invalid);
        std::env::set_var("LOG_LEVEL", "warn");
        std::env::remove_var("APP_ENV");
    }

    let env = Environment::from_env();
    assert_eq!(env.level(), Some("warn"));
    assert_eq!(env.name(), None);
    assert_eq!(env.tier_name(), "development");

    let logger = create_logger("worker", LoggerConfig::new().level("info")).unwrap();
    assert!(logger.is_level_enabled(Level::Error));
    assert!(!logger.is_level_enabled(Level::Debug));
}
