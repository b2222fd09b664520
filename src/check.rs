//! Structural checks run once before any rule is compiled.

use std::collections::{HashMap, HashSet};

use crate::error::CompileError;
use crate::schema::{Enum, Message, Schema};

/// Reject schemas whose shape makes field or value names ambiguous.
///
/// # Errors
///
/// Returns the first `DuplicateOneofMember`, `DuplicateFieldName` or
/// `DuplicateEnumValue` found, walking messages depth-first.
pub fn check_schema(schema: &Schema) -> Result<(), CompileError> {
    for e in &schema.enums {
        check_enum(e)?;
    }
    for message in &schema.messages {
        check_message(message)?;
    }
    Ok(())
}

fn check_message(message: &Message) -> Result<(), CompileError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut groups: HashMap<&str, HashSet<&str>> = HashMap::new();

    for field in &message.fields {
        if let Some(group) = field.oneof.as_deref() {
            if !groups.entry(group).or_default().insert(field.name.as_str()) {
                return Err(CompileError::DuplicateOneofMember {
                    message: message.name.clone(),
                    group: group.to_string(),
                    field: field.name.clone(),
                });
            }
        }
        if !seen.insert(field.name.as_str()) {
            return Err(CompileError::DuplicateFieldName {
                message: message.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    for e in &message.enums {
        check_enum(e)?;
    }
    for nested in &message.messages {
        check_message(nested)?;
    }
    Ok(())
}

fn check_enum(e: &Enum) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for name in e.names() {
        if !seen.insert(name) {
            return Err(CompileError::DuplicateEnumValue {
                name: e.name.clone(),
                value: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn accepts_well_formed_schema() {
        let schema = Schema::new().message(
            Message::new("Property")
                .field(Field::new("name", "string"))
                .field(Field::new("int_value", "int32").oneof("value"))
                .field(Field::new("string_value", "string").oneof("value")),
        );
        assert!(check_schema(&schema).is_ok());
    }

    #[test]
    fn duplicate_field_name() {
        let schema = Schema::new().message(
            Message::new("Basic")
                .field(Field::new("num", "int32"))
                .field(Field::new("num", "string")),
        );
        let err = check_schema(&schema).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateFieldName { message, field } if message == "Basic" && field == "num"
        ));
    }

    #[test]
    fn duplicate_oneof_member() {
        let schema = Schema::new().message(
            Message::new("Property")
                .field(Field::new("v", "int32").oneof("value"))
                .field(Field::new("v", "string").oneof("value")),
        );
        let err = check_schema(&schema).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateOneofMember { group, field, .. } if group == "value" && field == "v"
        ));
    }

    #[test]
    fn duplicate_in_nested_message() {
        let schema = Schema::new().message(
            Message::new("Outer").message(
                Message::new("Inner")
                    .field(Field::new("x", "int32"))
                    .field(Field::new("x", "int32")),
            ),
        );
        let err = check_schema(&schema).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFieldName { message, .. } if message == "Inner"));
    }

    #[test]
    fn duplicate_enum_value() {
        let schema = Schema::new().enumeration(Enum::new("FOO").value("A", 1).value("A", 2));
        let err = check_schema(&schema).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateEnumValue { name, value } if name == "FOO" && value == "A"
        ));
    }
}
