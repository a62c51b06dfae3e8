//! JDWP data types.

use crate::commands::{modifier_kinds, tags};

pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type ReferenceTypeId = u64;

/// Variable-width identifier sizes reported by `VirtualMachine.IDSizes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    pub field_id: usize,
    pub method_id: usize,
    pub object_id: usize,
    pub reference_type_id: usize,
    pub frame_id: usize,
}

impl Default for IdSizes {
    fn default() -> Self {
        Self {
            field_id: 8,
            method_id: 8,
            object_id: 8,
            reference_type_id: 8,
            frame_id: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Class,
    Interface,
    Array,
}

impl TypeTag {
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Class),
            2 => Some(Self::Interface),
            3 => Some(Self::Array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Class => 1,
            Self::Interface => 2,
            Self::Array => 3,
        }
    }
}

/// Executable code location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub type_tag: u8,
    pub class_id: ReferenceTypeId,
    pub method_id: u64,
    pub index: u64,
}

impl Location {
    /// Catch locations use an all-zero location for "not caught".
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.class_id == 0 && self.method_id == 0 && self.index == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendPolicy {
    None,
    EventThread,
    All,
}

impl SuspendPolicy {
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::EventThread),
            2 => Some(Self::All),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::EventThread => 1,
            Self::All => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSize {
    Min,
    Line,
}

impl StepSize {
    fn as_i32(self) -> i32 {
        match self {
            Self::Min => 0,
            Self::Line => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

impl StepDepth {
    fn as_i32(self) -> i32 {
        match self {
            Self::Into => 0,
            Self::Over => 1,
            Self::Out => 2,
        }
    }
}

/// `EventRequest.Set` filter modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Count(i32),
    ThreadOnly(ThreadId),
    ClassMatch(String),
    LocationOnly(Location),
    ExceptionOnly {
        /// Zero matches every exception type.
        ref_type: ReferenceTypeId,
        caught: bool,
        uncaught: bool,
    },
    Step {
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
    },
}

impl Modifier {
    pub(crate) fn kind(&self) -> u8 {
        match self {
            Self::Count(_) => modifier_kinds::COUNT,
            Self::ThreadOnly(_) => modifier_kinds::THREAD_ONLY,
            Self::ClassMatch(_) => modifier_kinds::CLASS_MATCH,
            Self::LocationOnly(_) => modifier_kinds::LOCATION_ONLY,
            Self::ExceptionOnly { .. } => modifier_kinds::EXCEPTION_ONLY,
            Self::Step { .. } => modifier_kinds::STEP,
        }
    }

    pub(crate) fn step_args(&self) -> Option<(ThreadId, i32, i32)> {
        match self {
            Self::Step {
                thread,
                size,
                depth,
            } => Some((*thread, size.as_i32(), depth.as_i32())),
            _ => None,
        }
    }
}

/// A value as carried on the wire: primitives inline, references by id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaggedValue {
    Void,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Any reference; `tag` distinguishes strings, arrays, threads, ...
    Object { tag: u8, id: ObjectId },
}

impl TaggedValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Object { id: 0, .. })
    }

    #[must_use]
    pub fn is_primitive_tag(tag: u8) -> bool {
        matches!(
            tag,
            tags::BYTE
                | tags::CHAR
                | tags::FLOAT
                | tags::DOUBLE
                | tags::INT
                | tags::LONG
                | tags::SHORT
                | tags::BOOLEAN
                | tags::VOID
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Zombie,
    Running,
    Sleeping,
    Monitor,
    Wait,
    Unknown(i32),
}

impl ThreadStatus {
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Zombie,
            1 => Self::Running,
            2 => Self::Sleeping,
            3 => Self::Monitor,
            4 => Self::Wait,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Zombie => "zombie".to_string(),
            Self::Running => "running".to_string(),
            Self::Sleeping => "sleeping".to_string(),
            Self::Monitor => "monitor".to_string(),
            Self::Wait => "wait".to_string(),
            Self::Unknown(value) => format!("unknown({value})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub code_index: u64,
    pub line: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub code_index: u64,
    pub name: String,
    pub signature: String,
    pub length: u32,
    pub slot: i32,
}

impl VariableInfo {
    /// Whether the variable is in scope at `index`.
    #[must_use]
    pub fn is_visible_at(&self, index: u64) -> bool {
        index >= self.code_index && index < self.code_index + u64::from(self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_id: u64,
    pub location: Location,
}

/// Convert a JNI type signature to a Java-style type name.
///
/// `Lcom/example/Demo;` becomes `com.example.Demo`, `[I` becomes `int[]`.
#[must_use]
pub fn signature_to_type_name(signature: &str) -> String {
    let dims = signature.chars().take_while(|ch| *ch == '[').count();
    let element = &signature[dims..];
    let base = match element.as_bytes().first() {
        Some(b'Z') => "boolean".to_string(),
        Some(b'B') => "byte".to_string(),
        Some(b'C') => "char".to_string(),
        Some(b'S') => "short".to_string(),
        Some(b'I') => "int".to_string(),
        Some(b'J') => "long".to_string(),
        Some(b'F') => "float".to_string(),
        Some(b'D') => "double".to_string(),
        Some(b'V') => "void".to_string(),
        Some(b'L') => element
            .trim_start_matches('L')
            .trim_end_matches(';')
            .replace('/', "."),
        _ => element.to_string(),
    };
    let mut name = base;
    for _ in 0..dims {
        name.push_str("[]");
    }
    name
}

/// Convert a class name (`com.example.Demo`) to a class signature.
#[must_use]
pub fn type_name_to_signature(name: &str) -> String {
    format!("L{};", name.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_map_to_java_names() {
        assert_eq!(signature_to_type_name("Lcom/example/Demo;"), "com.example.Demo");
        assert_eq!(signature_to_type_name("I"), "int");
        assert_eq!(signature_to_type_name("[[J"), "long[][]");
        assert_eq!(
            signature_to_type_name("[Ljava/lang/String;"),
            "java.lang.String[]"
        );
    }

    #[test]
    fn class_names_map_to_signatures() {
        assert_eq!(type_name_to_signature("Demo"), "LDemo;");
        assert_eq!(
            type_name_to_signature("com.example.Outer$Inner"),
            "Lcom/example/Outer$Inner;"
        );
    }

    #[test]
    fn variable_visibility_is_half_open() {
        let var = VariableInfo {
            code_index: 4,
            name: "i".into(),
            signature: "I".into(),
            length: 6,
            slot: 1,
        };
        assert!(!var.is_visible_at(3));
        assert!(var.is_visible_at(4));
        assert!(var.is_visible_at(9));
        assert!(!var.is_visible_at(10));
    }
}
