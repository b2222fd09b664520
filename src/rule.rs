//! Rule algebra and the validation interpreter.
//!
//! A compiled message is a tree of [`Rule`]s. Every variant is plain data, so
//! a rule graph can be serialized for inspection; one recursive function
//! interprets it against a payload.
//!
//! Error policy: every failing field of an object is reported, but an array
//! stops at its first failing element.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{FieldPath, OneofFailure, Violation, ViolationKind};
use crate::types::json_type_name;

/// Identity of a message within one schema, stable for the schema's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub usize);

/// Completed object rules reachable through lazy references, by identity.
pub type RuleArena = HashMap<MessageId, ObjectRule>;

/// A value shape plus the modifiers attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Filled in when the value is absent and not required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Values treated exactly like an absent value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub empty: Vec<Value>,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            default: None,
            required: false,
            empty: Vec::new(),
        }
    }
}

/// Value shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Boolean,
    /// Any finite number.
    Number,
    Integer {
        unsigned: bool,
    },
    /// A string, or an array of byte values.
    Binary,
    String,
    /// Accepts anything.
    Any,
    /// A string naming one of the enum's values.
    Enum {
        name: String,
        members: Vec<String>,
    },
    Object(ObjectRule),
    Array {
        element: Box<Rule>,
    },
    /// Defers to the arena entry for a message still being compiled when the
    /// reference was made.
    Lazy {
        message: String,
        id: MessageId,
    },
}

/// A message's fields and the exclusivity constraints over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRule {
    pub message: String,
    pub fields: Vec<(String, Rule)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub oneofs: Vec<OneofConstraint>,
    pub allow_unknown: bool,
}

impl ObjectRule {
    pub fn field(&self, name: &str) -> Option<&Rule> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, rule)| rule)
    }

    fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }
}

/// Exactly one of `members` must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneofConstraint {
    pub group: String,
    pub members: Vec<String>,
}

impl OneofConstraint {
    /// `provided` holds the fields that carried a value, valid or not.
    fn check(&self, provided: &HashSet<&str>, path: &FieldPath, errors: &mut Vec<Violation>) {
        let present = self
            .members
            .iter()
            .filter(|member| provided.contains(member.as_str()))
            .count();

        let kind = match present {
            1 => return,
            0 => OneofFailure::NoneProvided,
            _ => OneofFailure::MultipleProvided,
        };
        errors.push(Violation::new(
            path.clone(),
            ViolationKind::OneofViolation {
                kind,
                group: self.group.clone(),
                members: self.members.clone(),
            },
        ));
    }
}

/// Walks a rule graph against one payload, collecting violations.
pub(crate) struct Interpreter<'a> {
    arena: &'a RuleArena,
    errors: Vec<Violation>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(arena: &'a RuleArena) -> Self {
        Self {
            arena,
            errors: Vec::new(),
        }
    }

    /// Validate a payload against a message's object rule.
    ///
    /// Returns the normalized value (defaults filled in, empty equivalents
    /// dropped) or every violation found.
    pub(crate) fn run(
        mut self,
        root: &ObjectRule,
        value: &Value,
    ) -> Result<Value, Vec<Violation>> {
        let out = self.object(root, value, &FieldPath::root());
        match out {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(self.errors),
        }
    }

    /// Apply a rule to a possibly-absent value. `None` means the value stays
    /// absent (or failed).
    fn slot(&mut self, rule: &Rule, value: Option<&Value>, path: &FieldPath) -> Option<Value> {
        let value = value.filter(|v| !rule.empty.contains(v));

        let Some(value) = value else {
            if rule.required {
                self.errors.push(Violation::new(
                    path.clone(),
                    ViolationKind::RequiredFieldMissing,
                ));
                return None;
            }
            return rule.default.clone();
        };

        self.shape(&rule.kind, value, path)
    }

    fn shape(&mut self, kind: &RuleKind, value: &Value, path: &FieldPath) -> Option<Value> {
        match kind {
            RuleKind::Boolean => self.expect(value.is_boolean(), "boolean", value, path),
            RuleKind::Number => self.expect(value.is_number(), "number", value, path),
            RuleKind::Integer { unsigned } => self.integer(*unsigned, value, path),
            RuleKind::Binary => self.expect(is_binary(value), "bytes", value, path),
            RuleKind::String => self.expect(value.is_string(), "string", value, path),
            RuleKind::Any => Some(value.clone()),
            RuleKind::Enum { members, .. } => self.enum_member(members, value, path),
            RuleKind::Object(object) => self.object(object, value, path),
            RuleKind::Array { element } => self.array(element, value, path),
            RuleKind::Lazy { id, message } => match self.arena.get(id) {
                Some(object) => self.object(object, value, path),
                // The compiler fills the arena for every lazy target before
                // returning, so a miss means a hand-built rule graph.
                None => {
                    tracing::warn!(
                        target_message = %message,
                        "lazy reference without arena entry"
                    );
                    self.errors.push(Violation::new(
                        path.clone(),
                        ViolationKind::MissingRule {
                            message: message.clone(),
                        },
                    ));
                    None
                }
            },
        }
    }

    fn expect(
        &mut self,
        ok: bool,
        expected: &'static str,
        value: &Value,
        path: &FieldPath,
    ) -> Option<Value> {
        if ok {
            Some(value.clone())
        } else {
            self.mismatch(expected, value, path)
        }
    }

    fn mismatch(
        &mut self,
        expected: &'static str,
        value: &Value,
        path: &FieldPath,
    ) -> Option<Value> {
        self.errors.push(Violation::new(
            path.clone(),
            ViolationKind::TypeMismatch {
                expected,
                actual: json_type_name(value),
            },
        ));
        None
    }

    fn integer(&mut self, unsigned: bool, value: &Value, path: &FieldPath) -> Option<Value> {
        let Value::Number(number) = value else {
            return self.mismatch("integer", value, path);
        };
        if !is_integral(number) {
            return self.mismatch("integer", value, path);
        }

        let negative = number.as_f64().map(|n| n < 0.0).unwrap_or(false);
        if unsigned && negative {
            self.errors.push(Violation::new(
                path.clone(),
                ViolationKind::BelowMinimum { minimum: 0 },
            ));
            return None;
        }
        Some(value.clone())
    }

    fn enum_member(
        &mut self,
        members: &[String],
        value: &Value,
        path: &FieldPath,
    ) -> Option<Value> {
        let Some(s) = value.as_str() else {
            return self.mismatch("string", value, path);
        };
        if members.iter().any(|m| m == s) {
            return Some(value.clone());
        }
        self.errors.push(Violation::new(
            path.clone(),
            ViolationKind::InvalidEnumValue {
                value: s.to_string(),
                allowed: members.to_vec(),
            },
        ));
        None
    }

    fn array(&mut self, element: &Rule, value: &Value, path: &FieldPath) -> Option<Value> {
        let Some(items) = value.as_array() else {
            return self.mismatch("array", value, path);
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let before = self.errors.len();
            let checked = self.slot(element, Some(item), &path.index(i));
            if self.errors.len() > before {
                return None;
            }
            // Element rules carry no empty matcher, so a clean slot always
            // yields a value; null only guards hand-built rules.
            out.push(checked.unwrap_or(Value::Null));
        }
        Some(Value::Array(out))
    }

    fn object(&mut self, rule: &ObjectRule, value: &Value, path: &FieldPath) -> Option<Value> {
        let Some(input) = value.as_object() else {
            return self.mismatch("object", value, path);
        };

        let before = self.errors.len();
        let mut out = Map::new();
        let mut provided = HashSet::new();

        for (name, field_rule) in &rule.fields {
            let value = input.get(name).filter(|v| !field_rule.empty.contains(v));
            let checked = self.slot(field_rule, value, &path.field(name));
            if value.is_some() || checked.is_some() {
                provided.insert(name.as_str());
            }
            if let Some(checked) = checked {
                out.insert(name.clone(), checked);
            }
        }

        for (key, extra) in input {
            if rule.declares(key) {
                continue;
            }
            if rule.allow_unknown {
                out.insert(key.clone(), extra.clone());
            } else {
                self.errors.push(Violation::new(
                    path.field(key),
                    ViolationKind::UnknownField,
                ));
            }
        }

        for constraint in &rule.oneofs {
            constraint.check(&provided, path, &mut self.errors);
        }

        if self.errors.len() > before {
            None
        } else {
            Some(Value::Object(out))
        }
    }
}

fn is_integral(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
}

fn is_binary(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Array(items) => items
            .iter()
            .all(|b| b.as_u64().map(|b| b <= u8::MAX as u64).unwrap_or(false)),
        _ => false,
    }
}
