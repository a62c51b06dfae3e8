use std::path::PathBuf;

use jvdb::{BreakpointSpec, DebugConfig, Error, ExceptionPolicy};

struct TempFile(PathBuf);

impl TempFile {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("jvdb-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp file");
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[test]
fn loads_breakpoints_and_policy_from_disk() {
    let file = TempFile::new(
        "breakpoints.json",
        r#"{
            "pauseOnException": "all",
            "breakpoints": [
                {"class": "ExampleApp", "line": 18},
                {"class": "ExampleApp", "method": "fib"},
                {"class": "ExampleApp"}
            ]
        }"#,
    );

    let config = DebugConfig::load(&file.0).unwrap();

    assert_eq!(config.pause_on_exception, ExceptionPolicy::All);
    assert_eq!(
        config.breakpoints,
        [
            BreakpointSpec::line("ExampleApp", 18),
            BreakpointSpec::method("ExampleApp", "fib"),
        ]
    );
}

#[test]
fn missing_file_is_io_error() {
    let err = DebugConfig::load(&std::env::temp_dir().join("jvdb-no-such-config.json"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn unknown_policy_is_malformed() {
    let file = TempFile::new("bad-policy.json", r#"{"pauseOnException": "sometimes"}"#);
    let err = DebugConfig::load(&file.0).unwrap_err();
    assert!(matches!(err, Error::MalformedSpec(_)), "{err}");
}
