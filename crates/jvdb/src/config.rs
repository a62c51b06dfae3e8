//! Breakpoint configuration file.
//!
//! ```json
//! {"pauseOnException": "uncaught",
//!  "breakpoints": [{"class": "Demo", "line": 10}, {"class": "Demo", "method": "run"}]}
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::spec::BreakpointSpec;

/// Which thrown exceptions pause the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExceptionPolicy {
    None,
    Caught,
    #[default]
    Uncaught,
    All,
}

impl ExceptionPolicy {
    /// `(caught, uncaught)` flags of the exception watch.
    #[must_use]
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::None => (false, false),
            Self::Caught => (true, false),
            Self::Uncaught => (false, true),
            Self::All => (true, true),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Caught => "caught",
            Self::Uncaught => "uncaught",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ExceptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionPolicy {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text {
            "none" => Ok(Self::None),
            "caught" => Ok(Self::Caught),
            "uncaught" => Ok(Self::Uncaught),
            "all" => Ok(Self::All),
            other => Err(Error::MalformedSpec(format!(
                "unknown exception policy {other:?} (expected none|caught|uncaught|all)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    pause_on_exception: Option<String>,
    #[serde(default)]
    breakpoints: Vec<RawBreakpoint>,
}

#[derive(Debug, Deserialize)]
struct RawBreakpoint {
    class: String,
    line: Option<u32>,
    method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugConfig {
    pub pause_on_exception: ExceptionPolicy,
    pub breakpoints: Vec<BreakpointSpec>,
}

impl DebugConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let pause_on_exception = raw
            .pause_on_exception
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        let mut breakpoints = Vec::with_capacity(raw.breakpoints.len());
        for entry in raw.breakpoints {
            match (entry.line, entry.method) {
                (Some(line), _) => breakpoints.push(BreakpointSpec::line(entry.class, line)),
                (None, Some(method)) => {
                    breakpoints.push(BreakpointSpec::method(entry.class, method));
                }
                (None, None) => debug!(class = %entry.class, "breakpoint entry without line or method ignored"),
            }
        }
        Ok(Self {
            pause_on_exception,
            breakpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = DebugConfig::from_json(
            r#"{"pauseOnException": "all",
                "breakpoints": [{"class": "Demo", "line": 10},
                                {"class": "Demo", "method": "loopBody"}]}"#,
        )
        .unwrap();
        assert_eq!(config.pause_on_exception, ExceptionPolicy::All);
        let specs: Vec<String> = config.breakpoints.iter().map(ToString::to_string).collect();
        assert_eq!(specs, ["Demo:10", "Demo#loopBody"]);
    }

    #[test]
    fn keys_are_optional() {
        let config = DebugConfig::from_json("{}").unwrap();
        assert_eq!(config, DebugConfig::default());
        assert_eq!(config.pause_on_exception, ExceptionPolicy::Uncaught);
    }

    #[test]
    fn line_wins_and_empty_entries_are_skipped() {
        let config = DebugConfig::from_json(
            r#"{"breakpoints": [{"class": "A", "line": 3, "method": "m"}, {"class": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(config.breakpoints, vec![BreakpointSpec::line("A", 3)]);
    }

    #[test]
    fn unknown_policy_is_malformed() {
        let err = DebugConfig::from_json(r#"{"pauseOnException": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedSpec(_)));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = DebugConfig::from_json("{breakpoints").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn policy_flags() {
        assert_eq!(ExceptionPolicy::None.flags(), (false, false));
        assert_eq!(ExceptionPolicy::Caught.flags(), (true, false));
        assert_eq!(ExceptionPolicy::Uncaught.flags(), (false, true));
        assert_eq!(ExceptionPolicy::All.flags(), (true, true));
    }
}
