//! Primitive type table and compile options.

use serde_json::{Number, Value};

use crate::rule::RuleKind;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar types the IDL knows without a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Float,
    Double,
    Uint32,
    Uint64,
    Int32,
    Sint32,
    Int64,
    Sint64,
    Bytes,
    String,
    /// Accepted without key/value typing. Map entries are not checked.
    Map,
}

impl Primitive {
    /// Look up a primitive by its IDL name.
    ///
    /// Returns `None` for anything else; the name then goes to reference
    /// resolution.
    pub fn parse(type_name: &str) -> Option<Self> {
        let primitive = match type_name {
            "bool" => Primitive::Bool,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "uint32" => Primitive::Uint32,
            "uint64" => Primitive::Uint64,
            "int32" => Primitive::Int32,
            "sint32" => Primitive::Sint32,
            "int64" => Primitive::Int64,
            "sint64" => Primitive::Sint64,
            "bytes" => Primitive::Bytes,
            "string" => Primitive::String,
            "map" => Primitive::Map,
            _ => return None,
        };
        Some(primitive)
    }

    /// The rule kind a value of this type must satisfy.
    pub fn rule_kind(self) -> RuleKind {
        match self {
            Primitive::Bool => RuleKind::Boolean,
            Primitive::Float | Primitive::Double => RuleKind::Number,
            Primitive::Uint32 | Primitive::Uint64 => RuleKind::Integer { unsigned: true },
            Primitive::Int32 | Primitive::Sint32 | Primitive::Int64 | Primitive::Sint64 => {
                RuleKind::Integer { unsigned: false }
            }
            Primitive::Bytes => RuleKind::Binary,
            Primitive::String => RuleKind::String,
            Primitive::Map => RuleKind::Any,
        }
    }

    /// How a default literal for this type is turned into a value.
    pub fn coercion(self) -> Coercion {
        match self {
            Primitive::Bool => Coercion::Bool,
            Primitive::Float | Primitive::Double => Coercion::Float,
            Primitive::Uint32 | Primitive::Uint64 => Coercion::Integer { unsigned: true },
            Primitive::Int32 | Primitive::Sint32 | Primitive::Int64 | Primitive::Sint64 => {
                Coercion::Integer { unsigned: false }
            }
            Primitive::Bytes | Primitive::String | Primitive::Map => Coercion::Text,
        }
    }
}

/// Default-literal coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Bool,
    Float,
    Integer { unsigned: bool },
    Text,
}

impl Coercion {
    /// Convert a literal, or `None` if it does not fit.
    pub fn apply(self, literal: &str) -> Option<Value> {
        match self {
            Coercion::Bool => Some(Value::Bool(truthy(literal))),
            Coercion::Float => {
                let parsed: f64 = literal.trim().parse().ok()?;
                Number::from_f64(parsed).map(Value::Number)
            }
            Coercion::Integer { unsigned: true } => {
                literal.trim().parse::<u64>().ok().map(Value::from)
            }
            Coercion::Integer { unsigned: false } => {
                literal.trim().parse::<i64>().ok().map(Value::from)
            }
            Coercion::Text => Some(Value::String(literal.to_string())),
        }
    }
}

fn truthy(literal: &str) -> bool {
    !matches!(literal.trim(), "" | "0" | "false" | "FALSE" | "False")
}

/// Options for schema compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Values treated as "not provided" on every field. Empty means no
    /// matcher is attached.
    pub empty_equivalents: Vec<Value>,
    /// When true, keys that are not declared fields pass through instead of
    /// failing with `UnknownField`.
    pub allow_unknown: bool,
}

impl CompileOptions {
    /// Options with no empty matcher and unknown keys rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `value` as equivalent to an absent field.
    pub fn empty_equivalent(mut self, value: Value) -> Self {
        self.empty_equivalents.push(value);
        self
    }

    /// Treat every value in `values` as equivalent to an absent field.
    pub fn empty_equivalents(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.empty_equivalents.extend(values);
        self
    }

    /// Let undeclared keys pass through validation.
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }
}
