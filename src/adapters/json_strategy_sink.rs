//! Writes accepted strategies as pretty-printed JSON files.

use crate::domain::error::EngineError;
use crate::domain::walk_forward::StrategyRecord;
use crate::ports::strategy_sink::StrategySink;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Existing files are never replaced: a record whose file name is taken is
/// written as `<name>-2.json`, `<name>-3.json` and so on.
pub struct JsonStrategySink {
    output_dir: PathBuf,
    last_written: Mutex<Option<PathBuf>>,
}

impl JsonStrategySink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            last_written: Mutex::new(None),
        }
    }

    /// `<output_dir>/<name>.json` with the name reduced to `[A-Za-z0-9_-]`.
    pub fn path_for(&self, record: &StrategyRecord) -> PathBuf {
        self.output_dir.join(format!("{}.json", Self::stem(record)))
    }

    /// Where the most recent `persist` wrote.
    pub fn last_written(&self) -> Option<PathBuf> {
        self.last_written.lock().ok().and_then(|path| path.clone())
    }

    fn stem(record: &StrategyRecord) -> String {
        record
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Create the first free file for `record`.
    fn create_unique(&self, record: &StrategyRecord) -> Result<(PathBuf, fs::File), EngineError> {
        let stem = Self::stem(record);
        let mut suffix = 1usize;
        loop {
            let path = if suffix == 1 {
                self.output_dir.join(format!("{}.json", stem))
            } else {
                self.output_dir.join(format!("{}-{}.json", stem, suffix))
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl StrategySink for JsonStrategySink {
    fn persist(&self, record: &StrategyRecord) -> Result<(), EngineError> {
        fs::create_dir_all(&self.output_dir)?;
        let json = serde_json::to_string_pretty(record)?;
        let (path, mut file) = self.create_unique(record)?;
        file.write_all(json.as_bytes())?;
        if let Ok(mut last) = self.last_written.lock() {
            *last = Some(path);
        }
        Ok(())
    }
}
