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

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;

use crate::Error;
use crate::Layout;
use crate::append::Append;
use crate::layout::JsonLayout;
use crate::record::Record;

/// Options of the file transport, read from its option map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// The file to write.
    pub destination: PathBuf,
    /// Create missing parent directories.
    pub mkdir: bool,
    /// Append to an existing file instead of truncating it.
    pub append: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::new(),
            mkdir: true,
            append: true,
        }
    }
}

/// An appender that writes log records to a single file.
#[derive(Debug)]
pub struct File {
    path: PathBuf,
    writer: Mutex<fs::File>,
    layout: Box<dyn Layout>,
}

impl File {
    /// Open the destination file.
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The destination is empty.
    /// * The parent directory cannot be created.
    /// * The file cannot be opened for writing.
    pub fn new(options: FileOptions) -> Result<File, Error> {
        let path = options.destination;
        if path.as_os_str().is_empty() {
            return Err(Error::new("file destination is empty"));
        }

        if options.mkdir {
            create_parent_dir(&path)?;
        }

        let mut open = OpenOptions::new();
        open.create(true);
        if options.append {
            open.append(true);
        } else {
            open.write(true).truncate(true);
        }
        let file = open.open(&path).map_err(|err| {
            Error::new("failed to open log file")
                .with_context("path", path.display())
                .with_source(err)
        })?;

        Ok(File {
            path,
            writer: Mutex::new(file),
            layout: Box::new(JsonLayout::default()),
        })
    }

    /// Set the layout for the logs. Default to [`JsonLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// The path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, fs::File> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) fn create_parent_dir(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|err| {
            Error::new("failed to create log directory")
                .with_context("path", dir.display())
                .with_source(err)
        }),
        _ => Ok(()),
    }
}

impl Append for File {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        let mut writer = self.writer();
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(Error::from_io_error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Level;

    fn record(message: &str) -> Record {
        Record::builder()
            .level(Level::Error)
            .message(Some(message.to_string()))
            .build()
    }

    #[test]
    fn test_creates_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/app.json");

        let options = FileOptions {
            destination: path.clone(),
            ..FileOptions::default()
        };
        let file = File::new(options.clone()).unwrap();
        file.append(&record("one")).unwrap();
        drop(file);

        let file = File::new(options).unwrap();
        file.append(&record("two")).unwrap();
        file.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], json!("one"));
        assert_eq!(lines[1]["level"], json!(50));
    }

    #[test]
    fn test_truncates_without_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "stale\n").unwrap();

        let file = File::new(FileOptions {
            destination: path.clone(),
            mkdir: false,
            append: false,
        })
        .unwrap();
        file.append(&record("fresh")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("fresh"));
    }

    #[test]
    fn test_empty_destination() {
        let err = File::new(FileOptions::default()).unwrap_err();
        assert_eq!(err.message(), "file destination is empty");
    }
}
