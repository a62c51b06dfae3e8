use jvdb::harness::{OutputBuffer, ScriptedTarget, StateHandle};
use jvdb::{CommandConsole, DebugSession, EventLog, Printer};

/// A session over a scripted target, with console and event log captured.
pub struct Harness {
    pub session: DebugSession,
    pub out: OutputBuffer,
    pub log: OutputBuffer,
    pub state: StateHandle,
}

impl Harness {
    pub fn new(target: ScriptedTarget) -> Self {
        let out = OutputBuffer::default();
        let log = OutputBuffer::default();
        let state = target.state();
        let printer = Printer::new(Box::new(out.clone()))
            .with_log(EventLog::from_writer(Box::new(log.clone())));
        Self {
            session: DebugSession::new(Box::new(target), printer),
            out,
            log,
            state,
        }
    }

    pub fn run(&mut self, script: &str) {
        self.session
            .run(&mut CommandConsole::scripted(script))
            .expect("session run");
    }

    /// `event` of every log record, in order.
    #[allow(dead_code)]
    pub fn logged_events(&self) -> Vec<String> {
        self.log_records()
            .iter()
            .map(|record| record["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn log_records(&self) -> Vec<serde_json::Value> {
        self.log
            .contents()
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is JSON"))
            .collect()
    }
}
