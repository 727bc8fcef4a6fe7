use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use anyhow::Context;

use crate::{
    domain::track::NotificationPayload,
    notify::{DispatchError, DispatchSink},
};

/// Writes one JSON object per announcement
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn append_to(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
        Ok(Self::new(Box::new(file)))
    }
}

impl DispatchSink for JsonLinesSink {
    fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');

        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        out.write_all(&line)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::JsonLinesSink;
    use crate::{domain::track::NotificationPayload, notify::DispatchSink};

    #[test]
    fn test_appends_one_line_per_notification() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("now-playing.jsonl");
        std::fs::write(&path, "{\"earlier\":true}\n")?;

        let sink = JsonLinesSink::append_to(&path)?;
        for title in ["One", "Two"] {
            sink.notify(&NotificationPayload {
                song_title: title.to_string(),
                ..Default::default()
            })?;
        }

        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let last: serde_json::Value = serde_json::from_str(lines[2])?;
        assert_eq!(last["song_title"], "Two");
        assert_eq!(last["art_url"], "");
        Ok(())
    }
}
