//! Breakpoint location intents: `Class:line` and `Class#method`.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BreakpointKind {
    /// Pause when execution reaches this source line.
    Line(u32),
    /// Pause when this method is entered.
    MethodEntry(SmolStr),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakpointSpec {
    class_name: SmolStr,
    kind: BreakpointKind,
}

impl BreakpointSpec {
    pub fn line(class_name: impl Into<SmolStr>, line: u32) -> Self {
        Self {
            class_name: class_name.into(),
            kind: BreakpointKind::Line(line),
        }
    }

    pub fn method(class_name: impl Into<SmolStr>, method: impl Into<SmolStr>) -> Self {
        Self {
            class_name: class_name.into(),
            kind: BreakpointKind::MethodEntry(method.into()),
        }
    }

    /// Parse `pkg.Class:42` or `pkg.Class#method`.
    ///
    /// A `#` after the first character wins over any `:`; otherwise the last
    /// `:` splits class from line.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Some(hash) = text.find('#').filter(|pos| *pos > 0) {
            let class = text[..hash].trim();
            let method = text[hash + 1..].trim();
            if class.is_empty() || method.is_empty() {
                return Err(Error::MalformedSpec(format!(
                    "invalid method breakpoint: {text}"
                )));
            }
            return Ok(Self::method(class, method));
        }
        if let Some(colon) = text.rfind(':').filter(|pos| *pos > 0) {
            let class = text[..colon].trim();
            let line = text[colon + 1..].trim();
            let line = line.parse::<u32>().map_err(|err| {
                Error::MalformedSpec(format!("invalid line {line:?} in {text}: {err}"))
            })?;
            return Ok(Self::line(class, line));
        }
        Err(Error::MalformedSpec(format!(
            "expected Class:line or Class#method, got: {text}"
        )))
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn kind(&self) -> &BreakpointKind {
        &self.kind
    }
}

impl fmt::Display for BreakpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BreakpointKind::Line(line) => write!(f, "{}:{line}", self.class_name),
            BreakpointKind::MethodEntry(method) => write!(f, "{}#{method}", self.class_name),
        }
    }
}

impl FromStr for BreakpointSpec {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}
