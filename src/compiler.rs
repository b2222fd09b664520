//! Schema-to-validator compilation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::check::check_schema;
use crate::compose::{compose_field, DefaultPolicy};
use crate::error::CompileError;
use crate::index::{Resolution, SchemaIndex};
use crate::oneof::oneof_constraints;
use crate::rule::{MessageId, ObjectRule, Rule, RuleArena, RuleKind};
use crate::schema::{Field, Schema};
use crate::types::{CompileOptions, Primitive};
use crate::validator::{Validator, ValidatorRegistry};

/// Compile every top-level message of `schema` into a validator.
///
/// Structural checks run first, then the index is built once and each
/// top-level message is compiled with an empty recursion stack. Enums and
/// nested messages are only reachable through the messages that use them.
///
/// # Errors
///
/// Returns the first `CompileError` encountered; nothing is compiled
/// partially.
pub fn compile_schema(
    schema: &Schema,
    options: &CompileOptions,
) -> Result<ValidatorRegistry, CompileError> {
    check_schema(schema)?;
    let index = SchemaIndex::build(schema)?;

    let mut compiler = MessageCompiler::new(&index, options);
    let mut roots = Vec::new();
    for (id, message) in index.top_level() {
        let mut visiting = Vec::new();
        let rule = compiler.compile(id, &mut visiting)?;
        roots.push((message.name.clone(), rule));
    }

    let arena = Arc::new(compiler.into_arena());
    tracing::debug!(
        messages = roots.len(),
        recursive = arena.len(),
        "compiled schema"
    );

    Ok(ValidatorRegistry::new(roots.into_iter().map(|(name, root)| {
        Validator::new(name, root, Arc::clone(&arena))
    })))
}

/// Compiles messages into object rules, breaking cycles with lazy references.
pub(crate) struct MessageCompiler<'a, 's> {
    index: &'a SchemaIndex<'s>,
    options: &'a CompileOptions,
    /// Messages some lazy reference points at.
    lazy_targets: HashSet<MessageId>,
    /// Completed rules for `lazy_targets`, filled as each one finishes.
    arena: RuleArena,
}

impl<'a, 's> MessageCompiler<'a, 's> {
    pub(crate) fn new(index: &'a SchemaIndex<'s>, options: &'a CompileOptions) -> Self {
        Self {
            index,
            options,
            lazy_targets: HashSet::new(),
            arena: RuleArena::new(),
        }
    }

    pub(crate) fn into_arena(self) -> RuleArena {
        self.arena
    }

    /// Compile one message. `visiting` holds the messages whose compilation
    /// is in progress above this call.
    pub(crate) fn compile(
        &mut self,
        id: MessageId,
        visiting: &mut Vec<MessageId>,
    ) -> Result<ObjectRule, CompileError> {
        let message = self.index.message(id);
        tracing::debug!(name = %message.name, depth = visiting.len(), "compiling message");

        visiting.push(id);
        let mut fields = Vec::with_capacity(message.fields.len());
        for field in &message.fields {
            match self.compile_field(id, field, visiting) {
                Ok(rule) => fields.push((field.name.clone(), rule)),
                Err(e) => {
                    visiting.pop();
                    return Err(e);
                }
            }
        }
        visiting.pop();

        let rule = ObjectRule {
            message: message.name.clone(),
            fields,
            oneofs: oneof_constraints(message),
            allow_unknown: self.options.allow_unknown,
        };

        if self.lazy_targets.contains(&id) && !self.arena.contains_key(&id) {
            self.arena.insert(id, rule.clone());
        }

        Ok(rule)
    }

    fn compile_field(
        &mut self,
        enclosing: MessageId,
        field: &Field,
        visiting: &mut Vec<MessageId>,
    ) -> Result<Rule, CompileError> {
        let message = self.index.message(enclosing);

        let (base, policy) = match Primitive::parse(&field.type_name) {
            Some(primitive) => (
                primitive.rule_kind(),
                DefaultPolicy::Coerce(primitive.coercion()),
            ),
            None => match self.index.resolve(&field.type_name, enclosing) {
                Resolution::Enum(e) => (
                    RuleKind::Enum {
                        name: e.name.clone(),
                        members: e.names().map(String::from).collect(),
                    },
                    DefaultPolicy::EnumMember,
                ),
                Resolution::Message(target) => {
                    (self.message_rule(target, visiting)?, DefaultPolicy::Rejected)
                }
                Resolution::Unresolved => {
                    return Err(CompileError::UnresolvedTypeReference {
                        message: message.name.clone(),
                        field: field.name.clone(),
                        type_name: field.type_name.clone(),
                    })
                }
            },
        };

        compose_field(message, field, base, policy, self.options)
    }

    fn message_rule(
        &mut self,
        target: MessageId,
        visiting: &mut Vec<MessageId>,
    ) -> Result<RuleKind, CompileError> {
        if visiting.contains(&target) {
            let name = &self.index.message(target).name;
            tracing::trace!(target_message = %name, "recursive reference, deferring");
            self.lazy_targets.insert(target);
            return Ok(RuleKind::Lazy {
                message: name.clone(),
                id: target,
            });
        }

        Ok(RuleKind::Object(self.compile(target, visiting)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Enum, Message};
    use serde_json::json;

    #[test]
    fn registry_holds_only_top_level_messages() {
        let schema = Schema::new()
            .enumeration(Enum::new("FOO").value("A", 0))
            .message(
                Message::new("Outer")
                    .field(Field::new("inner", "Inner"))
                    .message(Message::new("Inner").field(Field::new("x", "int32"))),
            )
            .message(Message::new("Basic").field(Field::new("num", "double")));

        let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["Basic", "Outer"]);
        assert!(registry.get("Inner").is_none());
        assert!(registry.get("FOO").is_none());
    }

    #[test]
    fn nested_messages_compile_inline() {
        let schema = Schema::new().message(
            Message::new("Outer")
                .field(Field::new("inner", "Inner"))
                .message(Message::new("Inner").field(Field::new("x", "int32"))),
        );
        let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
        let outer = registry.get("Outer").unwrap();

        let Some(Rule {
            kind: RuleKind::Object(inner),
            ..
        }) = outer.rule().field("inner")
        else {
            panic!("expected inline object rule");
        };
        assert_eq!(inner.message, "Inner");
        assert!(outer.recursive_rules().is_empty());
    }

    #[test]
    fn self_reference_becomes_lazy() {
        let schema = Schema::new().message(
            Message::new("Nested")
                .field(Field::new("num", "int32"))
                .field(Field::new("meh", "Nested")),
        );
        let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
        let nested = registry.get("Nested").unwrap();

        assert_eq!(
            nested.rule().field("meh").map(|r| &r.kind),
            Some(&RuleKind::Lazy {
                message: "Nested".into(),
                id: MessageId(0),
            })
        );
        assert_eq!(nested.recursive_rules().len(), 1);
    }

    #[test]
    fn mutual_recursion_terminates() {
        let schema = Schema::new()
            .message(
                Message::new("Tree")
                    .field(Field::new("value", "string"))
                    .field(Field::new("children", "Forest")),
            )
            .message(Message::new("Forest").field(Field::new("trees", "Tree").repeated()));

        let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
        let tree = registry.get("Tree").unwrap();

        let ok = json!({
            "value": "root",
            "children": { "trees": [
                { "value": "a" },
                { "value": "b", "children": { "trees": [] } }
            ] }
        });
        assert_eq!(tree.validate(&ok).unwrap(), ok);

        let bad = json!({
            "value": "root",
            "children": { "trees": [ { "value": "a", "children": { "trees": [ { "value": 1 } ] } } ] }
        });
        let err = tree.validate(&bad).unwrap_err();
        assert_eq!(
            err.violations()[0].path.to_string(),
            "children.trees[0].children.trees[0].value"
        );

        let forest = registry.get("Forest").unwrap();
        assert!(forest
            .validate(&json!({ "trees": [ { "value": "x", "children": { "trees": [] } } ] }))
            .is_ok());
    }

    #[test]
    fn unresolved_reference_fails_compile() {
        let schema = Schema::new().message(
            Message::new("Broken").field(Field::new("thing", "DoesNotExist")),
        );
        let err = compile_schema(&schema, &CompileOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedTypeReference { message, field, type_name }
                if message == "Broken" && field == "thing" && type_name == "DoesNotExist"
        ));
    }

    #[test]
    fn unresolved_inside_nested_message_fails_compile() {
        let schema = Schema::new().message(
            Message::new("Outer")
                .field(Field::new("inner", "Inner"))
                .message(Message::new("Inner").field(Field::new("x", "Nowhere"))),
        );
        let err = compile_schema(&schema, &CompileOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedTypeReference { message, .. } if message == "Inner"
        ));
    }

    #[test]
    fn structural_errors_surface_before_resolution() {
        let schema = Schema::new().message(
            Message::new("Basic")
                .field(Field::new("num", "Missing"))
                .field(Field::new("num", "int32")),
        );
        let err = compile_schema(&schema, &CompileOptions::new()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFieldName { .. }));
    }

    #[test]
    fn enum_fields_compile_to_membership() {
        let schema = Schema::new()
            .enumeration(Enum::new("FOO").value("A", 1).value("B", 2))
            .message(Message::new("Defaults").field(Field::new("foo", "FOO")));
        let registry = compile_schema(&schema, &CompileOptions::new()).unwrap();
        assert_eq!(
            registry
                .get("Defaults")
                .unwrap()
                .rule()
                .field("foo")
                .map(|r| &r.kind),
            Some(&RuleKind::Enum {
                name: "FOO".into(),
                members: vec!["A".into(), "B".into()],
            })
        );
    }

    #[test]
    fn options_flow_into_every_object() {
        let schema = Schema::new().message(
            Message::new("Outer")
                .field(Field::new("inner", "Inner"))
                .message(Message::new("Inner").field(Field::new("x", "int32"))),
        );
        let options = CompileOptions::new().allow_unknown(true);
        let registry = compile_schema(&schema, &options).unwrap();
        let outer = registry.get("Outer").unwrap();
        assert!(outer
            .validate(&json!({ "inner": { "x": 1, "extra": true }, "other": 2 }))
            .is_ok());
    }
}
