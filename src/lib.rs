//! Proto Rules
//!
//! Compiles protobuf-style message schemas into runtime validators.
//!
//! A schema (messages with typed fields, nested messages, enums and oneof
//! groups, as produced by an IDL parser) is compiled once into a
//! [`ValidatorRegistry`]. Each top-level message gets a [`Validator`] that
//! checks JSON payloads and fills in declared defaults.
//!
//! # Example
//!
//! ```
//! use proto_rules::{compile_schema, CompileOptions, Field, Message, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new().message(
//!     Message::new("Defaults")
//!         .field(Field::new("num", "int32").default_value("42"))
//!         .field(Field::new("name", "string").required()),
//! );
//!
//! let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
//! let validator = registry.get("Defaults").unwrap();
//!
//! let value = validator.validate(&json!({ "name": "x" })).unwrap();
//! assert_eq!(value, json!({ "name": "x", "num": 42 }));
//!
//! let err = validator.validate(&json!({ "num": "nope" })).unwrap_err();
//! assert_eq!(err.violations().len(), 2);
//! ```
//!
//! # Field modifiers
//!
//! | Modifier | Effect |
//! |----------|--------|
//! | `[default = x]` | Filled in when the field is absent |
//! | `repeated` | Array of the element rule; `[]` always passes |
//! | `required` | Must be present, even when a default exists |
//! | `oneof` | Exactly one member of the group must be present |
//! | empty equivalents | Configured values count as absent |
//!
//! A default on a repeated field applies to the element rule, not to the
//! array.
//!
//! # Type resolution
//!
//! Symbolic type names are looked up, first match wins, in: the enclosing
//! message's enums, top-level enums, the enclosing message's nested messages,
//! top-level messages. A name found nowhere fails compilation.

mod check;
mod compiler;
mod compose;
mod error;
mod index;
mod loader;
mod oneof;
mod rule;
mod schema;
mod types;
mod validator;

pub use check::check_schema;
pub use compiler::compile_schema;
pub use compose::{compose_field, DefaultPolicy};
pub use error::{
    CompileError, FieldPath, LoadError, OneofFailure, PathSegment, ValidateError, Violation,
    ViolationKind,
};
pub use index::{Resolution, SchemaIndex};
pub use loader::{load_payload, load_schema, load_schema_str};
pub use oneof::oneof_constraints;
pub use rule::{MessageId, ObjectRule, OneofConstraint, Rule, RuleArena, RuleKind};
pub use schema::{Enum, EnumValue, Field, FieldOptions, Literal, Message, Schema};
pub use types::{json_type_name, Coercion, CompileOptions, Primitive};
pub use validator::{validate, Validator, ValidatorRegistry};
