//! Error types for schema compilation, loading and validation.

use std::fmt;
use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors that abort compilation of a schema.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("field '{message}.{field}' references unknown type '{type_name}'")]
    UnresolvedTypeReference {
        message: String,
        field: String,
        type_name: String,
    },

    #[error("message '{message}' declares field '{field}' more than once")]
    DuplicateFieldName { message: String, field: String },

    #[error("oneof '{group}' in message '{message}' lists '{field}' more than once")]
    DuplicateOneofMember {
        message: String,
        group: String,
        field: String,
    },

    #[error("'{name}' is declared more than once in {scope}")]
    DuplicateTypeName { scope: String, name: String },

    #[error("enum '{name}' declares value '{value}' more than once")]
    DuplicateEnumValue { name: String, value: String },

    #[error("default '{literal}' of field '{message}.{field}' is not a valid {expected}")]
    InvalidDefault {
        message: String,
        field: String,
        literal: String,
        expected: String,
    },
}

impl CompileError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading a schema or payload.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors during validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("schema has no top-level message named '{name}'")]
    UnknownMessage { name: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<Violation> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Compile(e) => e.exit_code(),
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::UnknownMessage { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }

    /// The violations, if this is a validation failure.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidateError::Invalid { errors } => errors,
            _ => &[],
        }
    }
}

/// One step from a parent value into a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a value inside a payload, rendered as `list[0].num`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Which way a oneof group was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OneofFailure {
    NoneProvided,
    MultipleProvided,
}

/// What went wrong at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    BelowMinimum {
        minimum: i64,
    },
    InvalidEnumValue {
        value: String,
        allowed: Vec<String>,
    },
    RequiredFieldMissing,
    UnknownField,
    OneofViolation {
        kind: OneofFailure,
        group: String,
        members: Vec<String>,
    },
    /// A lazy reference whose target rule was never supplied.
    MissingRule {
        message: String,
    },
}

impl ViolationKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::TypeMismatch { .. } => "type_mismatch",
            ViolationKind::BelowMinimum { .. } => "below_minimum",
            ViolationKind::InvalidEnumValue { .. } => "invalid_enum_value",
            ViolationKind::RequiredFieldMissing => "required",
            ViolationKind::UnknownField => "unknown_field",
            ViolationKind::OneofViolation {
                kind: OneofFailure::NoneProvided,
                ..
            } => "oneof_none",
            ViolationKind::OneofViolation {
                kind: OneofFailure::MultipleProvided,
                ..
            } => "oneof_multiple",
            ViolationKind::MissingRule { .. } => "missing_rule",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::TypeMismatch { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ViolationKind::BelowMinimum { minimum } => {
                write!(f, "must be greater than or equal to {}", minimum)
            }
            ViolationKind::InvalidEnumValue { value, allowed } => {
                write!(f, "\"{}\" is not one of [{}]", value, allowed.join(", "))
            }
            ViolationKind::RequiredFieldMissing => f.write_str("is required"),
            ViolationKind::UnknownField => f.write_str("is not allowed"),
            ViolationKind::OneofViolation {
                kind: OneofFailure::NoneProvided,
                group,
                members,
            } => write!(
                f,
                "oneof '{}' requires exactly one of [{}], none provided",
                group,
                members.join(", ")
            ),
            ViolationKind::OneofViolation {
                kind: OneofFailure::MultipleProvided,
                group,
                members,
            } => write!(
                f,
                "oneof '{}' allows exactly one of [{}], several provided",
                group,
                members.join(", ")
            ),
            ViolationKind::MissingRule { message } => {
                write!(f, "no compiled rule for message '{}'", message)
            }
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: FieldPath,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: FieldPath, kind: ViolationKind) -> Self {
        Self { path, kind }
    }

    /// Human-readable error message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl Serialize for Violation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Violation", 3)?;
        state.serialize_field("path", &self.path.to_string())?;
        state.serialize_field("code", self.kind.code())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}
