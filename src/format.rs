//! Record rendering
//!
//! Turns a raw message into the single pre-formatted line the sink stores. The sink
//! itself treats that line as opaque.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::Level;

/// A log record ready to be rendered
#[derive(Debug, Clone, Serialize)]
pub struct Record<'a> {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub name: &'a str,
    pub message: String,
}

impl<'a> Record<'a> {
    /// Create a record, sanitizing the raw message
    pub fn new(timestamp: DateTime<Local>, level: Level, name: &'a str, message: &str) -> Self {
        Self {
            timestamp,
            level,
            name,
            message: sanitize(message),
        }
    }

    /// Render as `[2026-01-21 14:30:45] [INFO] [name] message`
    pub fn to_human(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.name,
            self.message
        )
    }

    /// Render as a single-line JSON object
    pub fn to_json(&self) -> String {
        let line = JsonLine {
            timestamp: self.timestamp.to_rfc3339(),
            level: self.level,
            name: self.name,
            message: &self.message,
        };
        // Serializing plain strings into a String cannot fail
        serde_json::to_string(&line).unwrap_or_default()
    }

    pub fn render(&self, json: bool) -> String {
        if json {
            self.to_json()
        } else {
            self.to_human()
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: Level,
    name: &'a str,
    message: &'a str,
}

/// Strip ANSI escape sequences and control characters
///
/// Line breaks and tabs become spaces so one record is always one line in the file.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                // CSI: ESC [ params final-byte
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                } else {
                    chars.next();
                }
            }
            '\n' | '\r' | '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}
