//! Line-oriented JVM debugger session controller.
//!
//! A [`DebugSession`] drains event batches from a [`Target`], pauses on the
//! events the operator asked for, and runs console commands until one of
//! them resumes the target.

pub mod config;
pub mod connect;
mod console;
mod error;
mod event_log;
pub mod harness;
pub mod inspect;
mod jdwp;
mod output;
mod registry;
mod session;
pub mod spec;
pub mod target;

pub use config::{DebugConfig, ExceptionPolicy};
pub use connect::{attach, launch, LaunchOptions, LaunchedVm};
pub use console::{Command, CommandConsole, HELP};
pub use error::{Error, Result};
pub use event_log::EventLog;
pub use jdwp::JdwpTarget;
pub use output::Printer;
pub use registry::{Binding, BreakpointRegistry, InstalledBreakpoint};
pub use session::{Cursor, DebugSession};
pub use spec::{BreakpointKind, BreakpointSpec};
pub use target::{Target, TargetError, TargetEvent};
