//! Debug target facade for the session controller.
//! - Target: the narrow interface the controller drives
//! - TargetEvent/EventBatch: the closed set of events it reacts to
//! - Value/CodeLocation/...: inspection data, already resolved to names

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

pub use jvdb_wire::{Location as LocationHandle, StepDepth, SuspendPolicy, ThreadStatus};

pub type ThreadId = u64;
pub type ObjectId = u64;

/// Kind of an installed event request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Breakpoint,
    MethodEntry,
    ClassPrepare,
    Exception,
    Step,
}

/// Handle of an installed event request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    pub kind: RequestKind,
    pub id: i32,
}

impl RequestId {
    #[must_use]
    pub fn new(kind: RequestKind, id: i32) -> Self {
        Self { kind, id }
    }
}

/// An event request to install. Every request suspends the whole target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRequest {
    Breakpoint { location: CodeLocation },
    /// Entry into any method of the class.
    MethodEntry { class_name: SmolStr },
    ClassPrepare { class_name: SmolStr },
    Exception { caught: bool, uncaught: bool },
    /// One-shot line step on a thread.
    Step { thread: ThreadId, depth: StepDepth },
}

impl WatchRequest {
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Breakpoint { .. } => RequestKind::Breakpoint,
            Self::MethodEntry { .. } => RequestKind::MethodEntry,
            Self::ClassPrepare { .. } => RequestKind::ClassPrepare,
            Self::Exception { .. } => RequestKind::Exception,
            Self::Step { .. } => RequestKind::Step,
        }
    }
}

/// A loaded reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadedType {
    pub id: u64,
    pub name: SmolStr,
}

/// A code location resolved to names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub declaring_type: SmolStr,
    pub method: SmolStr,
    /// `None` when compiled without source file info.
    pub source: Option<SmolStr>,
    /// `None` when the method has no line table.
    pub line: Option<u32>,
    pub handle: LocationHandle,
}

impl CodeLocation {
    pub fn new(
        declaring_type: impl Into<SmolStr>,
        method: impl Into<SmolStr>,
        source: Option<&str>,
        line: Option<u32>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
            source: source.map(SmolStr::from),
            line,
            handle: LocationHandle::default(),
        }
    }

    #[must_use]
    pub fn with_handle(mut self, handle: LocationHandle) -> Self {
        self.handle = handle;
        self
    }

    /// `(Source.java:12)`, with fallbacks for missing debug info.
    #[must_use]
    pub fn source_position(&self) -> String {
        let source = self.source.as_deref().unwrap_or("UnknownSource");
        match self.line {
            Some(line) => format!("({source}:{line})"),
            None => format!("({source}:?)"),
        }
    }

    /// `Type#method(Source.java:12)`, used for method-entry stops.
    #[must_use]
    pub fn entry_label(&self) -> String {
        format!(
            "{}#{}{}",
            self.declaring_type,
            self.method,
            self.source_position()
        )
    }
}

/// `Type.method(Source.java:12)`.
impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.declaring_type,
            self.method,
            self.source_position()
        )
    }
}

/// Events delivered together; the target stays suspended per
/// `suspend_policy` until resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub suspend_policy: SuspendPolicy,
    pub events: Vec<TargetEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetEvent {
    VmStart {
        thread: ThreadId,
    },
    Breakpoint {
        request: RequestId,
        thread: ThreadId,
        location: CodeLocation,
    },
    Step {
        request: RequestId,
        thread: ThreadId,
        location: CodeLocation,
    },
    MethodEntry {
        request: RequestId,
        thread: ThreadId,
        location: CodeLocation,
    },
    Exception {
        request: RequestId,
        thread: ThreadId,
        location: CodeLocation,
        exception_type: SmolStr,
        caught: bool,
    },
    ClassPrepare {
        request: RequestId,
        loaded: LoadedType,
    },
    VmDeath,
    VmDisconnected,
}

/// A runtime value, materialized for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// `elements` holds a leading preview, not necessarily all `length` items.
    Array {
        type_name: SmolStr,
        length: usize,
        elements: Vec<Value>,
    },
    Object {
        type_name: SmolStr,
        id: ObjectId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub status: ThreadStatus,
    pub suspended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// Line or variable tables missing for the named type.
    #[error("absent information for {0}")]
    AbsentInformation(String),

    #[error("thread not suspended")]
    ThreadNotSuspended,

    #[error("target terminated")]
    Terminated,

    #[error("target disconnected")]
    Disconnected,

    #[error("{0}")]
    Protocol(String),
}

impl TargetError {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Disconnected)
    }
}

pub type TargetResult<T> = Result<T, TargetError>;

/// Narrow interface for the session controller.
///
/// Frames are addressed by index, 0 being the innermost.
pub trait Target {
    /// Block for the next event batch.
    fn next_batch(&mut self) -> TargetResult<EventBatch>;
    /// Resume all threads. Resuming a running target is a no-op.
    fn resume(&mut self) -> TargetResult<()>;
    /// Loaded types with exactly this name.
    fn classes_by_name(&mut self, name: &str) -> TargetResult<Vec<LoadedType>>;
    /// Code locations on `line`, at most one per method.
    fn locations_of_line(&mut self, ty: &LoadedType, line: u32)
        -> TargetResult<Vec<CodeLocation>>;
    fn create_request(&mut self, request: &WatchRequest) -> TargetResult<RequestId>;
    fn delete_request(&mut self, request: RequestId) -> TargetResult<()>;
    fn threads(&mut self) -> TargetResult<Vec<ThreadInfo>>;
    fn frames(&mut self, thread: ThreadId) -> TargetResult<Vec<CodeLocation>>;
    /// Locals in scope at the frame's current location, `this` excluded.
    fn visible_locals(&mut self, thread: ThreadId, frame: usize)
        -> TargetResult<Vec<LocalVariable>>;
    fn this_object(&mut self, thread: ThreadId, frame: usize) -> TargetResult<Option<ObjectId>>;
    /// Field by name, searching superclasses; `None` if no such field.
    fn field_value(&mut self, object: ObjectId, field: &str) -> TargetResult<Option<Value>>;
    /// Release the target. Called once, failures swallowed.
    fn dispose(&mut self);
}
