//! Activity log.
//!
//! Every facade operation appends one entry here so the HOD can audit what
//! the console did and when. Entries are JSON lines in the same data dir as
//! the session document. Callers discard the write `Result`: a broken log
//! must never fail the operation that triggered it.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{DeptError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One audited console action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Scope the event acted on: `student`, `professor`, `class` or `hod`.
    pub entity: Option<String>,
    pub event: String,
    pub details: Option<String>,
}

pub struct ActivityLogger {
    log_path: PathBuf,
}

impl ActivityLogger {
    pub fn new() -> Result<Self> {
        let proj = ProjectDirs::from("io", "deptctl", "deptctl").ok_or_else(|| {
            DeptError::storage_error("initialization", "could not resolve data dir")
        })?;
        let root = proj.data_local_dir();
        fs::create_dir_all(root)?;
        Ok(Self {
            log_path: root.join("activity.jsonl"),
        })
    }

    pub fn log(
        &self,
        level: LogLevel,
        entity: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            entity: entity.map(str::to_string),
            event: event.to_string(),
            details: details.map(str::to_string),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Entries matching the filters, most recent first. Lines that do not
    /// parse (torn writes, older formats) are skipped.
    pub fn read_logs(&self, entity: Option<&str>, errors_only: bool) -> Result<Vec<LogEntry>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }
        let reader = BufReader::new(fs::File::open(&self.log_path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let Ok(entry) = serde_json::from_str::<LogEntry>(&line?) else {
                continue;
            };
            if errors_only && entry.level != LogLevel::Error {
                continue;
            }
            if entity.is_some() && entry.entity.as_deref() != entity {
                continue;
            }
            entries.push(entry);
        }
        entries.reverse();
        Ok(entries)
    }

    pub fn info(&self, entity: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Info, entity, event, details)
    }

    pub fn error(&self, entity: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Error, entity, event, details)
    }
}
