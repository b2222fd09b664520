//! Compiled validators and payload validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::compiler::compile_schema;
use crate::error::ValidateError;
use crate::rule::{Interpreter, MessageId, ObjectRule, Rule, RuleArena, RuleKind};
use crate::schema::Schema;
use crate::types::CompileOptions;

/// Validate a payload against one top-level message of a schema.
///
/// Compiles the schema, then validates `payload` against `message`.
/// On success returns the payload with defaults filled in.
///
/// # Errors
///
/// Returns `ValidateError::Compile` if the schema does not compile,
/// `ValidateError::UnknownMessage` if `message` is not a top-level message,
/// or `ValidateError::Invalid` if the payload doesn't match.
pub fn validate(
    schema: &Schema,
    message: &str,
    payload: &Value,
    options: &CompileOptions,
) -> Result<Value, ValidateError> {
    // First compile the schema
    let registry = compile_schema(schema, options)?;

    // Then validate against the message's validator
    registry.validate(message, payload)
}

/// The fully composed rule tree for one top-level message.
///
/// Cheap to clone; the recursive-rule arena is shared with every other
/// validator from the same registry.
#[derive(Debug, Clone)]
pub struct Validator {
    name: String,
    root: ObjectRule,
    arena: Arc<RuleArena>,
}

impl Validator {
    pub(crate) fn new(name: String, root: ObjectRule, arena: Arc<RuleArena>) -> Self {
        Self { name, root, arena }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message's root object rule.
    pub fn rule(&self) -> &ObjectRule {
        &self.root
    }

    /// Validate a payload.
    ///
    /// Returns the payload with defaults filled in and empty equivalents
    /// removed. Validation never mutates the validator, so one validator can
    /// serve many threads.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::Invalid` with every violation found.
    pub fn validate(&self, payload: &Value) -> Result<Value, ValidateError> {
        Interpreter::new(&self.arena)
            .run(&self.root, payload)
            .map_err(|errors| ValidateError::Invalid { errors })
    }

    /// Arena rules reachable from this validator through lazy references.
    pub fn recursive_rules(&self) -> BTreeMap<MessageId, &ObjectRule> {
        let mut found = BTreeSet::new();
        let mut pending = Vec::new();
        collect_lazy(&self.root, &mut pending);

        while let Some(id) = pending.pop() {
            if !found.insert(id) {
                continue;
            }
            if let Some(rule) = self.arena.get(&id) {
                collect_lazy(rule, &mut pending);
            }
        }

        found
            .into_iter()
            .filter_map(|id| self.arena.get(&id).map(|rule| (id, rule)))
            .collect()
    }

    /// JSON view of the rule graph, for inspection.
    pub fn describe(&self) -> Value {
        let recursive: Map<String, Value> = self
            .recursive_rules()
            .into_iter()
            .map(|(id, rule)| (id.0.to_string(), json!(rule)))
            .collect();

        json!({
            "message": self.name,
            "rule": self.root,
            "recursive": recursive,
        })
    }
}

fn collect_lazy(object: &ObjectRule, out: &mut Vec<MessageId>) {
    for (_, rule) in &object.fields {
        collect_lazy_rule(rule, out);
    }
}

fn collect_lazy_rule(rule: &Rule, out: &mut Vec<MessageId>) {
    match &rule.kind {
        RuleKind::Lazy { id, .. } => out.push(*id),
        RuleKind::Object(object) => collect_lazy(object, out),
        RuleKind::Array { element } => collect_lazy_rule(element, out),
        _ => {}
    }
}

/// Validators for every top-level message of a schema, by name.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Validator>,
}

impl ValidatorRegistry {
    pub(crate) fn new(validators: impl IntoIterator<Item = Validator>) -> Self {
        Self {
            validators: validators
                .into_iter()
                .map(|v| (v.name.clone(), v))
                .collect(),
        }
    }

    pub fn get(&self, message: &str) -> Option<&Validator> {
        self.validators.get(message)
    }

    /// Message names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validate a payload against the named message.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::UnknownMessage` if no such message was
    /// compiled, or `ValidateError::Invalid` if the payload doesn't match.
    pub fn validate(&self, message: &str, payload: &Value) -> Result<Value, ValidateError> {
        let validator = self
            .get(message)
            .ok_or_else(|| ValidateError::UnknownMessage {
                name: message.to_string(),
            })?;
        validator.validate(payload)
    }

    /// JSON view of every validator, keyed by message name.
    pub fn describe(&self) -> Value {
        let described: Map<String, Value> = self
            .validators
            .iter()
            .map(|(name, v)| (name.clone(), v.describe()))
            .collect();
        Value::Object(described)
    }
}
