//! Wire-level errors.

use thiserror::Error;

pub type WireResult<T> = std::result::Result<T, WireError>;

/// JDWP error codes the client inspects.
pub mod error_codes {
    pub const INVALID_THREAD: u16 = 10;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const VM_DEAD: u16 = 112;
    pub const NATIVE_METHOD: u16 = 511;
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("JDWP error {code} for command {command_set}.{command}")]
    Jdwp {
        code: u16,
        command_set: u8,
        command: u8,
    },

    #[error("connection closed")]
    Closed,
}

impl WireError {
    /// The JDWP error code, if the reply carried one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Jdwp { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_absent_information(&self) -> bool {
        self.code() == Some(error_codes::ABSENT_INFORMATION)
    }

    #[must_use]
    pub fn is_thread_not_suspended(&self) -> bool {
        self.code() == Some(error_codes::THREAD_NOT_SUSPENDED)
    }

    #[must_use]
    pub fn is_native_method(&self) -> bool {
        self.code() == Some(error_codes::NATIVE_METHOD)
    }

    /// Whether the VM is gone (dead or connection closed).
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Closed) || self.code() == Some(error_codes::VM_DEAD)
    }
}
