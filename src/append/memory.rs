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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::append::Append;
use crate::record::Record;

/// An appender that keeps every record in memory.
///
/// Clones share the same storage, so one clone can be handed to a logger while another
/// inspects what was emitted.
///
/// # Examples
///
/// ```
/// use logshape::append::Memory;
/// use logshape::Engine;
///
/// let memory = Memory::default();
/// let engine = Engine::builder().append(memory.clone()).build();
/// engine.log(logshape::Level::Info, None, Some("hi".to_string()));
/// assert_eq!(memory.records()[0].message(), Some("hi"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Memory {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Memory {
    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A copy of the records appended so far.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Remove and return the records appended so far.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.lock())
    }
}

impl Append for Memory {
    fn append(&self, record: &Record) -> Result<(), Error> {
        self.lock().push(record.clone());
        Ok(())
    }
}
