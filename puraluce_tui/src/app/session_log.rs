use puraluce_core::redact_sensitive_text;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_EVENT_BYTES: usize = 4096;
const MAX_BLOCK_BYTES: usize = 65536;

/// Per-session transcript: submissions, generated pages and failures.
pub struct SessionLogger {
    path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl SessionLogger {
    pub fn new() -> Self {
        let Some(log_path) = logs_dir().map(|dir| dir.join(format!("session-{}.log", now_millis())))
        else {
            return Self::disabled();
        };
        if let Some(parent) = log_path.parent() {
            let _ = create_dir_all(parent);
        }
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok()
            .map(BufWriter::new);

        match writer {
            Some(writer) => Self {
                path: Some(log_path),
                writer: Mutex::new(Some(writer)),
            },
            None => Self::disabled(),
        }
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
        }
    }

    pub fn display_path(&self) -> Option<String> {
        self.path.as_ref().map(|p| p.display().to_string())
    }

    pub fn event(&self, label: &str, message: &str) {
        let bounded = truncate_with_notice(&redact_sensitive_text(message), MAX_EVENT_BYTES);
        self.append_line(&format!("[{}] {} {}", now_millis(), label, bounded));
    }

    pub fn block(&self, label: &str, body: &str) {
        self.append_line(&format!("[{}] {} BEGIN", now_millis(), label));
        let bounded = truncate_with_notice(&redact_sensitive_text(body), MAX_BLOCK_BYTES);
        for line in bounded.lines() {
            self.append_line(line);
        }
        self.append_line(&format!("[{}] {} END", now_millis(), label));
    }

    fn append_line(&self, line: &str) {
        let Ok(mut guard) = self.writer.lock() else {
            return;
        };
        let Some(writer) = guard.as_mut() else {
            return;
        };
        if writeln!(writer, "{}", line).is_ok() {
            let _ = writer.flush();
        }
    }
}

/// `<data_dir>/puraluce/logs`, shared with the tracing file sink.
pub fn logs_dir() -> Option<PathBuf> {
    let base = dirs::data_dir().or_else(|| std::env::current_dir().ok())?;
    Some(base.join("puraluce").join("logs"))
}

fn truncate_with_notice(input: &str, limit: usize) -> String {
    if input.len() <= limit {
        return input.to_string();
    }

    let mut out = String::new();
    for ch in input.chars() {
        if out.len() + ch.len_utf8() > limit.saturating_sub(64) {
            break;
        }
        out.push(ch);
    }
    let omitted = input.len().saturating_sub(out.len());
    out.push_str(&format!("\n...[truncated {} bytes]", omitted));
    out
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_adds_notice_when_over_limit() {
        let s = "à".repeat(1000);
        let out = truncate_with_notice(&s, 120);
        assert!(out.contains("[truncated"));
        assert!(out.len() < 260);
    }

    #[test]
    fn short_text_is_kept_whole() {
        assert_eq!(truncate_with_notice("Paura del futuro", 120), "Paura del futuro");
    }

    #[test]
    fn disabled_logger_swallows_writes() {
        let logger = SessionLogger::disabled();
        logger.event("SUBMIT", "x-goog-api-key: secret");
        logger.block("RESULT", "# Titolo");
        assert!(logger.display_path().is_none());
    }
}
