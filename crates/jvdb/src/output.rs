//! Operator-facing console output.

use std::io::Write;

use tracing::debug;

use crate::event_log::EventLog;

const PROMPT: &str = "dbg> ";

/// Writes console lines and, while tracing, mirrors them to the event log.
pub struct Printer {
    out: Box<dyn Write>,
    log: Option<EventLog>,
    tracing: bool,
}

impl Printer {
    #[must_use]
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out,
            log: None,
            tracing: false,
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    #[must_use]
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn tracing(&self) -> bool {
        self.tracing
    }

    pub fn set_tracing(&mut self, on: bool) {
        self.tracing = on;
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if let Err(err) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            debug!("console write failed: {err}");
        }
        if self.tracing {
            self.record("trace", &[("msg", text)]);
        }
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line);
        }
    }

    pub fn prompt(&mut self) {
        if let Err(err) = write!(self.out, "{PROMPT}").and_then(|()| self.out.flush()) {
            debug!("console write failed: {err}");
        }
    }

    /// Structured event; a no-op without a log.
    pub fn record(&mut self, event: &str, fields: &[(&str, &str)]) {
        if let Some(log) = self.log.as_mut() {
            log.record(event, fields);
        }
    }

    /// Drop the event log, flushing it.
    pub fn close_log(&mut self) {
        self.log = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::OutputBuffer;

    #[test]
    fn tracing_mirrors_lines_to_log() {
        let out = OutputBuffer::default();
        let log = OutputBuffer::default();
        let mut printer = Printer::new(Box::new(out.clone()))
            .with_log(EventLog::from_writer(Box::new(log.clone())));

        printer.line("quiet");
        printer.set_tracing(true);
        printer.line("[Breakpoint] Demo.run(Demo.java:10)");

        assert_eq!(
            out.contents(),
            "quiet\n[Breakpoint] Demo.run(Demo.java:10)\n"
        );
        let logged = log.contents();
        assert_eq!(logged.lines().count(), 1);
        assert!(logged.contains("\"event\":\"trace\""));
        assert!(logged.contains("\"msg\":\"[Breakpoint] Demo.run(Demo.java:10)\""));
    }
}
