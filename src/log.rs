use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{EstudioError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub match_id: Option<String>,
    pub event: String,
    pub details: Option<String>,
}

pub struct ActivityLogger {
    log_path: PathBuf,
}

impl ActivityLogger {
    pub fn new() -> Result<Self> {
        let user_dirs = directories::UserDirs::new()
            .ok_or_else(|| EstudioError::Other("could not determine home directory".into()))?;
        let home = user_dirs.home_dir();
        let estudio_dir = home.join(".estudio");
        fs::create_dir_all(&estudio_dir)?;

        Ok(Self {
            log_path: estudio_dir.join("activity.log"),
        })
    }

    pub fn log(
        &self,
        level: LogLevel,
        match_id: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            match_id: match_id.map(|m| m.to_string()),
            event: event.to_string(),
            details: details.map(|d| d.to_string()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let level_str = match entry.level {
            LogLevel::Info => "🟢",
            LogLevel::Error => "🔴",
        };

        let match_str = entry.match_id.as_deref().unwrap_or("*");
        let details_str = entry.details.as_deref().unwrap_or("");

        writeln!(
            file,
            "{} {} {} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            level_str,
            entry.event,
            match_str,
            details_str
        )?;

        Ok(())
    }

    pub fn read_logs(&self, match_filter: Option<&str>, errors_only: bool) -> Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let file = std::fs::File::open(&self.log_path)?;
        let reader = BufReader::new(file);
        let mut matching_lines = Vec::new();

        for line in reader.lines() {
            let line = line?;

            if errors_only && !line.contains("🔴") {
                continue;
            }

            if let Some(id) = match_filter {
                if !line.contains(id) {
                    continue;
                }
            }

            matching_lines.push(line);
        }

        // Return most recent entries first (reverse chronological)
        matching_lines.reverse();
        Ok(matching_lines)
    }

    pub fn info(&self, match_id: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Info, match_id, event, details)
    }

    pub fn error(&self, match_id: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Error, match_id, event, details)
    }
}

/* Best-effort helpers: logging must never break the main operation. */

pub fn log_info(match_id: Option<&str>, event: &str, details: Option<&str>) {
    if let Ok(logger) = ActivityLogger::new() {
        let _ = logger.info(match_id, event, details);
    }
}

pub fn log_error(match_id: Option<&str>, event: &str, details: Option<&str>) {
    if let Ok(logger) = ActivityLogger::new() {
        let _ = logger.error(match_id, event, details);
    }
}
