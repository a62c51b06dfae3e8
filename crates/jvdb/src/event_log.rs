//! Append-only JSON-lines event log.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Serialize)]
struct Record<'a> {
    ts: String,
    event: &'a str,
    #[serde(flatten)]
    fields: IndexMap<&'a str, &'a str>,
}

pub struct EventLog {
    writer: Box<dyn Write>,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").finish_non_exhaustive()
    }
}

impl EventLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(Box::new(BufWriter::new(file))))
    }

    #[must_use]
    pub fn from_writer(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    /// Append one `{"ts":..,"event":..,..fields}` line and flush.
    ///
    /// Write failures are logged and dropped.
    pub fn record(&mut self, event: &str, fields: &[(&str, &str)]) {
        let record = Record {
            ts: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            event,
            fields: fields.iter().copied().collect(),
        };
        if let Err(err) = self.write_record(&record) {
            debug!("event log write failed: {err}");
        }
    }

    fn write_record(&mut self, record: &Record<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::OutputBuffer;

    #[test]
    fn records_are_json_lines_with_escaping() {
        let buffer = OutputBuffer::default();
        let mut log = EventLog::from_writer(Box::new(buffer.clone()));
        log.record("BreakpointEvent", &[("location", "Demo.run(Demo.java:10)")]);
        log.record("trace", &[("msg", r#"say "hi" \ bye"#)]);

        let text = buffer.contents();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "BreakpointEvent");
        assert_eq!(lines[0]["location"], "Demo.run(Demo.java:10)");
        assert!(lines[0]["ts"].as_str().unwrap().contains('T'));
        assert_eq!(lines[1]["msg"], r#"say "hi" \ bye"#);
        assert!(text.contains(r#"say \"hi\" \\ bye"#));
    }

    #[test]
    fn field_order_follows_ts_then_event() {
        let buffer = OutputBuffer::default();
        let mut log = EventLog::from_writer(Box::new(buffer.clone()));
        log.record("VMAttached", &[("host", "localhost"), ("port", "5005")]);
        let text = buffer.contents();
        let ts_end = text.find(",\"event\"").unwrap();
        assert!(text.starts_with("{\"ts\":"));
        assert!(text[ts_end..].starts_with(",\"event\":\"VMAttached\",\"host\":\"localhost\",\"port\":\"5005\"}"));
    }
}
