//! CLI definitions for jvdb.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser, ValueEnum};
use jvdb::ExceptionPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "jvdb",
    version,
    about = "Line-oriented JVM debugger",
    group(ArgGroup::new("target").required(true).args(["launch", "attach"])),
    after_help = "Examples:\n  jvdb --launch ExampleApp --cp demos --bp demos/breakpoints.json\n  jvdb --attach 127.0.0.1:5005 --script demos/commands.txt --log events.jsonl"
)]
pub struct Cli {
    /// Main class to launch under the debugger.
    #[arg(long, value_name = "MAIN")]
    pub launch: Option<String>,
    /// Attach to a JVM listening for a debugger.
    #[arg(long, value_name = "HOST:PORT")]
    pub attach: Option<String>,
    /// Classpath of the launched JVM.
    #[arg(long, env = "CLASSPATH")]
    pub cp: Option<String>,
    /// Breakpoint config file (JSON).
    #[arg(long, value_name = "FILE")]
    pub bp: Option<PathBuf>,
    /// Exception pause policy; overrides the config file.
    #[arg(long, value_enum)]
    pub exception: Option<ExceptionPolicy>,
    /// Read console commands from a file instead of stdin.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
    /// Append structured events to a JSON-lines file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
    /// Mirror console output to the event log.
    #[arg(long, value_enum, ignore_case = true)]
    pub trace: Option<Toggle>,
    /// Program arguments, split on whitespace.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub app_args: String,
    /// JVM options, split on whitespace.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub vm_opts: String,
    /// The `java` executable.
    #[arg(long, default_value = "java")]
    pub java: PathBuf,
    /// How long to wait for the target connection, in milliseconds.
    #[arg(long, default_value = "10000", value_name = "MS")]
    pub connect_timeout: u64,
    /// Show debug diagnostics on stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl Cli {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub fn app_args(&self) -> Vec<String> {
        split_words(&self.app_args)
    }

    pub fn vm_opts(&self) -> Vec<String> {
        split_words(&self.vm_opts)
    }
}

fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_and_attach_are_exclusive() {
        assert!(Cli::try_parse_from(["jvdb"]).is_err());
        assert!(Cli::try_parse_from(["jvdb", "--launch", "A", "--attach", "h:1"]).is_err());
    }

    #[test]
    fn launch_flags_parse() {
        let cli = Cli::try_parse_from([
            "jvdb",
            "--launch",
            "ExampleApp",
            "--cp",
            "demos",
            "--exception",
            "all",
            "--trace",
            "ON",
            "--app-args",
            "a  b",
            "--vm-opts",
            "-Xmx64m -ea",
        ])
        .unwrap();
        assert_eq!(cli.launch.as_deref(), Some("ExampleApp"));
        assert_eq!(cli.cp.as_deref(), Some("demos"));
        assert_eq!(cli.exception, Some(ExceptionPolicy::All));
        assert_eq!(cli.trace, Some(Toggle::On));
        assert_eq!(cli.app_args(), ["a", "b"]);
        assert_eq!(cli.vm_opts(), ["-Xmx64m", "-ea"]);
        assert_eq!(cli.connect_timeout(), Duration::from_secs(10));
    }
}
