//! Read-only views over a paused target.
//! - format: bounded value rendering
//! - stack: call stack and locals of a suspended thread

pub mod format;
pub mod stack;

pub use format::{format_value, ARRAY_PREVIEW_LIMIT};
pub use stack::StackInspector;
