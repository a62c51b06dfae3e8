//! Session error taxonomy.

use thiserror::Error;

use crate::target::TargetError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A breakpoint spec, policy name or config entry that does not parse.
    #[error("malformed spec: {0}")]
    MalformedSpec(String),

    /// The target could not be launched or attached to.
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),

    /// The class was compiled without line or variable tables.
    #[error("debug info absent for {0}")]
    DebugInfoAbsent(String),

    /// No executable code on the requested line.
    #[error("no code at {0}")]
    NoCodeAtLocation(String),

    #[error("thread not suspended")]
    ThreadNotSuspended,

    /// A thread-scoped command with no pausing event to scope it to.
    #[error("no current thread: wait for a breakpoint/step")]
    NoCurrentThread,

    #[error("target terminated")]
    TargetTerminated,

    #[error("target disconnected")]
    TargetDisconnected,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the session cannot continue after this error.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TargetTerminated | Self::TargetDisconnected)
    }
}

impl From<TargetError> for Error {
    fn from(err: TargetError) -> Self {
        match err {
            TargetError::AbsentInformation(what) => Self::DebugInfoAbsent(what),
            TargetError::ThreadNotSuspended => Self::ThreadNotSuspended,
            TargetError::Terminated => Self::TargetTerminated,
            TargetError::Disconnected => Self::TargetDisconnected,
            TargetError::Protocol(message) => Self::TargetUnavailable(message),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_errors_map_into_taxonomy() {
        assert!(matches!(
            Error::from(TargetError::ThreadNotSuspended),
            Error::ThreadNotSuspended
        ));
        assert!(Error::from(TargetError::Disconnected).is_terminal());
        assert!(Error::from(TargetError::Terminated).is_terminal());
        assert_eq!(
            Error::from(TargetError::AbsentInformation("Demo".into())).to_string(),
            "debug info absent for Demo"
        );
        assert_eq!(
            Error::NoCurrentThread.to_string(),
            "no current thread: wait for a breakpoint/step"
        );
    }
}
