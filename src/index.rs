//! Scoped name lookup for enums and messages.
//!
//! The index is built once per schema. Every message, top-level or nested,
//! gets a [`MessageId`] in depth-first declaration order; that id is the
//! message's identity for cycle detection and lazy references.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::rule::MessageId;
use crate::schema::{Enum, Message, Schema};

/// What a symbolic type name refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'s> {
    Enum(&'s Enum),
    Message(MessageId),
    Unresolved,
}

#[derive(Debug, Default)]
struct Scope<'s> {
    enums: HashMap<&'s str, &'s Enum>,
    messages: HashMap<&'s str, MessageId>,
}

impl<'s> Scope<'s> {
    fn add_enum(&mut self, e: &'s Enum, scope: &str) -> Result<(), CompileError> {
        if self.enums.insert(e.name.as_str(), e).is_some() {
            return Err(CompileError::DuplicateTypeName {
                scope: scope.to_string(),
                name: e.name.clone(),
            });
        }
        Ok(())
    }

    fn add_message(
        &mut self,
        name: &'s str,
        id: MessageId,
        scope: &str,
    ) -> Result<(), CompileError> {
        if self.messages.insert(name, id).is_some() {
            return Err(CompileError::DuplicateTypeName {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Entry<'s> {
    message: &'s Message,
    local: Scope<'s>,
}

/// Per-scope lookup tables over a borrowed schema.
#[derive(Debug)]
pub struct SchemaIndex<'s> {
    entries: Vec<Entry<'s>>,
    top_level: Vec<MessageId>,
    global: Scope<'s>,
}

impl<'s> SchemaIndex<'s> {
    /// Index every message and enum in `schema`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::DuplicateTypeName` when two enums, or two
    /// messages, share a name within one scope.
    pub fn build(schema: &'s Schema) -> Result<Self, CompileError> {
        let mut index = SchemaIndex {
            entries: Vec::new(),
            top_level: Vec::new(),
            global: Scope::default(),
        };

        let mut global = Scope::default();
        for e in &schema.enums {
            global.add_enum(e, "the schema")?;
        }
        for message in &schema.messages {
            let id = index.register(message)?;
            global.add_message(&message.name, id, "the schema")?;
            index.top_level.push(id);
        }
        index.global = global;

        Ok(index)
    }

    fn register(&mut self, message: &'s Message) -> Result<MessageId, CompileError> {
        let id = MessageId(self.entries.len());
        self.entries.push(Entry {
            message,
            local: Scope::default(),
        });

        let scope = format!("message '{}'", message.name);
        let mut local = Scope::default();
        for e in &message.enums {
            local.add_enum(e, &scope)?;
        }
        for nested in &message.messages {
            let nested_id = self.register(nested)?;
            local.add_message(&nested.name, nested_id, &scope)?;
        }
        self.entries[id.0].local = local;

        Ok(id)
    }

    /// Resolve `type_name` as seen from inside `enclosing`.
    ///
    /// First match wins, enums before messages and local before global:
    /// nested enums, top-level enums, nested messages, top-level messages.
    /// A nested message can therefore be shadowed by a top-level enum of the
    /// same name.
    pub fn resolve(&self, type_name: &str, enclosing: MessageId) -> Resolution<'s> {
        let local = &self.entries[enclosing.0].local;

        if let Some(e) = local.enums.get(type_name) {
            return Resolution::Enum(*e);
        }
        if let Some(e) = self.global.enums.get(type_name) {
            return Resolution::Enum(*e);
        }
        if let Some(id) = local.messages.get(type_name) {
            return Resolution::Message(*id);
        }
        if let Some(id) = self.global.messages.get(type_name) {
            return Resolution::Message(*id);
        }
        Resolution::Unresolved
    }

    pub fn message(&self, id: MessageId) -> &'s Message {
        self.entries[id.0].message
    }

    /// Top-level messages in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = (MessageId, &'s Message)> + '_ {
        self.top_level.iter().map(|id| (*id, self.message(*id)))
    }

    /// Every indexed message, top-level and nested.
    pub fn messages(&self) -> impl Iterator<Item = (MessageId, &'s Message)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (MessageId(i), entry.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn schema() -> Schema {
        Schema::new()
            .enumeration(Enum::new("Shared").value("A", 0))
            .enumeration(Enum::new("Kind").value("GLOBAL", 0))
            .message(
                Message::new("Outer")
                    .field(Field::new("kind", "Kind"))
                    .enumeration(Enum::new("Kind").value("LOCAL", 0))
                    .message(Message::new("Shared"))
                    .message(Message::new("Inner").field(Field::new("x", "int32"))),
            )
            .message(Message::new("Other"))
    }

    #[test]
    fn ids_are_depth_first() {
        let schema = schema();
        let index = SchemaIndex::build(&schema).unwrap();
        let names: Vec<_> = index.messages().map(|(_, m)| m.name.as_str()).collect();
        assert_eq!(names, ["Outer", "Shared", "Inner", "Other"]);

        let top: Vec<_> = index.top_level().map(|(id, _)| id).collect();
        assert_eq!(top, [MessageId(0), MessageId(3)]);
    }

    #[test]
    fn local_enum_beats_global_enum() {
        let schema = schema();
        let index = SchemaIndex::build(&schema).unwrap();
        match index.resolve("Kind", MessageId(0)) {
            Resolution::Enum(e) => assert_eq!(e.values[0].name, "LOCAL"),
            other => panic!("expected enum, got {:?}", other),
        }
        // From a message without a local Kind, the global one wins.
        match index.resolve("Kind", MessageId(3)) {
            Resolution::Enum(e) => assert_eq!(e.values[0].name, "GLOBAL"),
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn global_enum_shadows_nested_message() {
        let schema = schema();
        let index = SchemaIndex::build(&schema).unwrap();
        assert!(matches!(
            index.resolve("Shared", MessageId(0)),
            Resolution::Enum(e) if e.name == "Shared"
        ));
    }

    #[test]
    fn nested_then_global_messages() {
        let schema = schema();
        let index = SchemaIndex::build(&schema).unwrap();
        assert_eq!(
            index.resolve("Inner", MessageId(0)),
            Resolution::Message(MessageId(2))
        );
        assert_eq!(
            index.resolve("Other", MessageId(0)),
            Resolution::Message(MessageId(3))
        );
        // Nested messages are only visible from their parent.
        assert_eq!(index.resolve("Inner", MessageId(3)), Resolution::Unresolved);
        assert_eq!(index.resolve("Missing", MessageId(0)), Resolution::Unresolved);
    }

    #[test]
    fn duplicate_names_in_scope_rejected() {
        let schema = Schema::new()
            .message(Message::new("A"))
            .message(Message::new("A"));
        let err = SchemaIndex::build(&schema).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateTypeName { name, .. } if name == "A"));

        let schema = Schema::new().message(
            Message::new("Outer")
                .enumeration(Enum::new("E"))
                .enumeration(Enum::new("E")),
        );
        let err = SchemaIndex::build(&schema).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateTypeName { scope, .. } if scope == "message 'Outer'"
        ));
    }

    #[test]
    fn same_name_enum_and_message_allowed() {
        let schema = Schema::new()
            .enumeration(Enum::new("Thing"))
            .message(Message::new("Thing"));
        assert!(SchemaIndex::build(&schema).is_ok());
    }
}
