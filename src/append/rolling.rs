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

use std::collections::VecDeque;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;
use serde::Deserialize;

use crate::Error;
use crate::Layout;
use crate::append::Append;
use crate::append::file::create_parent_dir;
use crate::layout::JsonLayout;
use crate::record::Record;

const DATE_PLACEHOLDER: &str = "%DATE%";

/// How often a new file is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// A new file every calendar day.
    #[default]
    Daily,
    /// A new file every hour.
    Hourly,
    /// A new file every minute.
    Minutely,
}

impl Frequency {
    fn period_format(self) -> &'static str {
        match self {
            Frequency::Daily => "%Y-%m-%d",
            Frequency::Hourly => "%Y-%m-%dT%H",
            Frequency::Minutely => "%Y-%m-%dT%H:%M",
        }
    }
}

/// A number given either as a JSON number or as text, e.g. `7`, `"7"` or `"10M"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// A plain number.
    Number(u64),
    /// A number as text, optionally with a `K`, `M` or `G` suffix for sizes.
    Text(String),
}

impl Quantity {
    fn count(&self) -> Result<usize, Error> {
        let n = match self {
            Quantity::Number(n) => *n,
            Quantity::Text(s) => s.trim().parse::<u64>().map_err(|err| {
                Error::new("invalid file limit")
                    .with_context("limit", s)
                    .with_source(err)
            })?,
        };
        usize::try_from(n).map_err(|err| Error::new("file limit out of range").with_source(err))
    }

    fn bytes(&self) -> Result<u64, Error> {
        let text = match self {
            Quantity::Number(n) => return Ok(*n),
            Quantity::Text(s) => s.trim(),
        };

        let upper = text.to_ascii_uppercase();
        let digits = upper.strip_suffix('B').unwrap_or(&upper);
        let (digits, unit) = match digits.char_indices().last() {
            Some((i, 'K')) => (&digits[..i], 1u64 << 10),
            Some((i, 'M')) => (&digits[..i], 1u64 << 20),
            Some((i, 'G')) => (&digits[..i], 1u64 << 30),
            _ => (digits, 1),
        };
        let n = digits.trim().parse::<u64>().map_err(|err| {
            Error::new("invalid file size")
                .with_context("size", text)
                .with_source(err)
        })?;
        n.checked_mul(unit)
            .ok_or_else(|| Error::new("file size out of range").with_context("size", text))
    }
}

/// Options of the rotating file transport, read from its option map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingOptions {
    /// The file name; `%DATE%` is replaced with the current period.
    pub file: String,
    /// How often a new file is started.
    pub frequency: Frequency,
    /// Start a numbered sibling once a file would exceed this size.
    pub size: Option<Quantity>,
    /// The maximum number of files kept; older files are removed.
    pub limit: Option<Quantity>,
    /// `strftime`-style format `%DATE%` is rendered with.
    pub date_format: String,
    /// Create missing parent directories.
    pub mkdir: bool,
}

impl Default for RollingOptions {
    fn default() -> Self {
        Self {
            file: String::new(),
            frequency: Frequency::Daily,
            size: Some(Quantity::Text("10M".to_string())),
            limit: Some(Quantity::Number(7)),
            date_format: "%Y-%m-%d".to_string(),
            mkdir: true,
        }
    }
}

#[derive(Debug)]
struct State {
    file: String,
    frequency: Frequency,
    max_size: Option<u64>,
    max_files: Option<usize>,
    date_format: String,
    mkdir: bool,

    period: String,
    base: String,
    index: usize,
    size: u64,
    writer: Option<fs::File>,
    created: VecDeque<PathBuf>,
}

impl State {
    fn path(&self) -> PathBuf {
        match self.index {
            0 => PathBuf::from(&self.base),
            n => PathBuf::from(format!("{}.{n}", self.base)),
        }
    }

    fn format(format: &str, now: &Zoned) -> Result<String, Error> {
        jiff::fmt::strtime::format(format, now).map_err(|err| {
            Error::new("failed to format file date")
                .with_context("format", format)
                .with_source(err)
        })
    }

    fn open(&mut self) -> Result<(), Error> {
        let path = self.path();
        if self.mkdir {
            create_parent_dir(&path)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;
        self.size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(file);

        if !self.created.contains(&path) {
            self.created.push_back(path);
        }
        self.delete_oldest()
    }

    fn delete_oldest(&mut self) -> Result<(), Error> {
        let Some(max_files) = self.max_files else {
            return Ok(());
        };
        while self.created.len() > max_files {
            let Some(oldest) = self.created.pop_front() else {
                break;
            };
            if let Err(err) = fs::remove_file(&oldest) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(Error::new("failed to remove old log file")
                        .with_context("path", oldest.display())
                        .with_source(err));
                }
            }
        }
        Ok(())
    }

    fn rotate_if_needed(&mut self, now: &Zoned, incoming: u64) -> Result<(), Error> {
        let period = Self::format(self.frequency.period_format(), now)?;
        if self.writer.is_none() || period != self.period {
            let date = Self::format(&self.date_format, now)?;
            self.base = self.file.replace(DATE_PLACEHOLDER, &date);
            self.period = period;
            self.index = 0;
            return self.open();
        }

        if let Some(max_size) = self.max_size {
            if self.size > 0 && self.size + incoming > max_size {
                self.index += 1;
                return self.open();
            }
        }
        Ok(())
    }

    fn write_at(&mut self, now: &Zoned, bytes: &[u8]) -> Result<(), Error> {
        self.rotate_if_needed(now, bytes.len() as u64)?;
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::new("log file is not open"));
        };
        writer.write_all(bytes).map_err(Error::from_io_error)?;
        self.size += bytes.len() as u64;
        Ok(())
    }
}

/// An appender that writes log records to a file rotated by period and size.
///
/// The file is opened on the first record. Only files this appender created count towards
/// the `limit`.
#[derive(Debug)]
pub struct RollingFile {
    state: Mutex<State>,
    layout: Box<dyn Layout>,
    timezone: TimeZone,
}

impl RollingFile {
    /// Validate the options and create the appender.
    ///
    /// # Errors
    ///
    /// Return an error if the file name is empty, the size or limit cannot be parsed, or
    /// the limit is zero.
    pub fn new(options: RollingOptions) -> Result<RollingFile, Error> {
        if options.file.is_empty() {
            return Err(Error::new("rolling file name is empty"));
        }
        let max_size = options.size.as_ref().map(Quantity::bytes).transpose()?;
        let max_files = options.limit.as_ref().map(Quantity::count).transpose()?;
        if max_files == Some(0) {
            return Err(Error::new("file limit must be at least 1"));
        }

        let state = State {
            file: options.file,
            frequency: options.frequency,
            max_size: max_size.filter(|n| *n > 0),
            max_files,
            date_format: options.date_format,
            mkdir: options.mkdir,
            period: String::new(),
            base: String::new(),
            index: 0,
            size: 0,
            writer: None,
            created: VecDeque::new(),
        };

        Ok(RollingFile {
            state: Mutex::new(state),
            layout: Box::new(JsonLayout::default()),
            timezone: TimeZone::system(),
        })
    }

    /// Set the layout for the logs. Default to [`JsonLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the timezone periods are computed in.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append_at(&self, now: &Zoned, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        self.state().write_at(now, &bytes)
    }
}

impl Append for RollingFile {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let now = Timestamp::try_from(record.time())
            .unwrap_or_else(|_| Timestamp::now())
            .to_zoned(self.timezone.clone());
        self.append_at(&now, record)
    }

    fn flush(&self) -> Result<(), Error> {
        let mut state = self.state();
        match state.writer.as_mut() {
            Some(writer) => writer.flush().map_err(Error::from_io_error),
            None => Ok(()),
        }
    }
}
