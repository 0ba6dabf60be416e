use crate::app::progress::Progress;
use crate::history::{Chat, Principal};
use crate::out::OutputMode;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Reports archive progress, one line per event, on stderr by default.
pub struct ConsoleProgress<W: Write + Send = io::Stderr> {
    mode: OutputMode,
    out: Mutex<W>,
}

impl ConsoleProgress<io::Stderr> {
    pub fn new(mode: OutputMode) -> Self {
        Self::with_writer(mode, io::stderr())
    }
}

impl<W: Write + Send> ConsoleProgress<W> {
    pub fn with_writer(mode: OutputMode, out: W) -> Self {
        Self {
            mode,
            out: Mutex::new(out),
        }
    }

    fn emit(&self, text: impl FnOnce() -> String, json: impl FnOnce() -> serde_json::Value) {
        let line = match self.mode {
            OutputMode::Text => text(),
            OutputMode::Json => serde_json::to_string(&json()).unwrap_or_default(),
            OutputMode::None => return,
        };
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(out, "{}", line);
    }
}

impl<W: Write + Send> Progress for ConsoleProgress<W> {
    fn logged_in(&self, principal: &Principal) {
        self.emit(
            || format!("Logged in as {} ({})", principal.name, principal.id),
            || serde_json::json!({"event": "logged_in", "id": principal.id, "name": principal.name}),
        );
    }

    fn channel_resolved(&self, chat: &Chat, dir: &Path) {
        self.emit(
            || format!("Archiving \"{}\" ({}) into {}", chat.title, chat.id, dir.display()),
            || {
                serde_json::json!({
                    "event": "channel",
                    "id": chat.id,
                    "title": chat.title,
                    "dir": dir.display().to_string(),
                })
            },
        );
    }

    fn fetching(&self, offset: Option<i32>) {
        self.emit(
            || match offset {
                Some(o) => format!("Fetching messages older than {}…", o),
                None => "Fetching newest messages…".to_string(),
            },
            || serde_json::json!({"event": "fetching", "offset": offset}),
        );
    }

    fn fetched(&self, count: usize) {
        self.emit(
            || format!("Fetched {} messages", count),
            || serde_json::json!({"event": "fetched", "count": count}),
        );
    }

    fn group_saved(&self, id: i32, date: DateTime<Utc>, files: usize, elapsed: Duration) {
        self.emit(
            || {
                format!(
                    "Saved message {} from {} ({} files, {:.1}s)",
                    id,
                    date.format("%Y-%m-%d %H:%M:%S"),
                    files,
                    elapsed.as_secs_f64()
                )
            },
            || {
                serde_json::json!({
                    "event": "saved",
                    "id": id,
                    "date": date.to_rfc3339(),
                    "files": files,
                    "elapsed_ms": elapsed.as_millis() as u64,
                })
            },
        );
    }

    fn group_deferred(&self, max_id: i32) {
        self.emit(
            || format!("Album ending at {} continues on the next page", max_id),
            || serde_json::json!({"event": "deferred", "max_id": max_id}),
        );
    }

    fn complete(&self, archived: usize) {
        self.emit(
            || format!("History complete: {} messages archived", archived),
            || serde_json::json!({"event": "complete", "archived": archived}),
        );
    }

    fn cancelled(&self, archived: usize) {
        self.emit(
            || format!("Stopped: {} messages archived so far", archived),
            || serde_json::json!({"event": "cancelled", "archived": archived}),
        );
    }
}
