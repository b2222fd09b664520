//! Parsed IDL schema model.
//!
//! These types mirror the JSON produced by common protobuf schema parsers, so a
//! parser's output can be fed straight through `serde_json`. Keys the compiler
//! has no use for (`tag`, `map`, `package`, `syntax`, ...) are ignored.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// A parsed, self-contained schema.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub enums: Vec<Enum>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level message.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Add a top-level enum.
    pub fn enumeration(mut self, enumeration: Enum) -> Self {
        self.enums.push(enumeration);
        self
    }
}

/// A named record type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, alias = "nestedMessages")]
    pub messages: Vec<Message>,
    #[serde(default, alias = "nestedEnums")]
    pub enums: Vec<Enum>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a nested message.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Add a nested enum.
    pub fn enumeration(mut self, enumeration: Enum) -> Self {
        self.enums.push(enumeration);
        self
    }
}

/// One member of a message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
    pub name: String,
    /// Primitive type name or a symbolic reference to an enum or message.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub oneof: Option<String>,
    #[serde(default)]
    pub options: FieldOptions,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            repeated: false,
            required: false,
            oneof: None,
            options: FieldOptions::default(),
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Place the field in a oneof group.
    pub fn oneof(mut self, group: impl Into<String>) -> Self {
        self.oneof = Some(group.into());
        self
    }

    /// Declare a default literal, as written in the IDL.
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.options.default = Some(Literal(literal.into()));
        self
    }
}

/// Field options the compiler understands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldOptions {
    #[serde(default)]
    pub default: Option<Literal>,
}

/// A default literal, kept as the text it was written with.
///
/// Parsers disagree on whether `[default = 42]` arrives as `"42"` or `42`,
/// so strings, numbers and booleans are all accepted and normalized to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal(pub String);

impl Literal {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Bool(bool),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Literal(s),
            Raw::Bool(b) => Literal(b.to_string()),
            Raw::Number(n) => Literal(n.to_string()),
        })
    }
}

/// A named set of symbolic values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Enum {
    pub name: String,
    /// Declaration-ordered values. Duplicate names are kept here and rejected
    /// by the structural check.
    #[serde(default, deserialize_with = "deserialize_enum_values")]
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, number: i64) -> Self {
        self.values.push(EnumValue {
            name: name.into(),
            number,
        });
        self
    }

    /// Value names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i64,
}

/// Accepts `{"A": 0}` and the parser form `{"A": {"value": 0, "options": {}}}`.
fn deserialize_enum_values<'de, D>(deserializer: D) -> Result<Vec<EnumValue>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Plain(i64),
        Detailed { value: i64 },
    }

    struct ValuesVisitor;

    impl<'de> Visitor<'de> for ValuesVisitor {
        type Value = Vec<EnumValue>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of enum value names to numbers")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut values = Vec::new();
            while let Some((name, number)) = map.next_entry::<String, Number>()? {
                let number = match number {
                    Number::Plain(n) | Number::Detailed { value: n } => n,
                };
                values.push(EnumValue { name, number });
            }
            Ok(values)
        }
    }

    deserializer.deserialize_map(ValuesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_parser_output() {
        let raw = json!({
            "syntax": 2,
            "package": null,
            "messages": [{
                "name": "Defaults",
                "fields": [
                    { "name": "num", "type": "int32", "tag": 1, "map": null, "oneof": null,
                      "required": false, "repeated": false, "options": { "default": "42" } },
                    { "name": "foo1", "type": "FOO", "tag": 2, "options": {} }
                ],
                "enums": [],
                "messages": []
            }],
            "enums": [{
                "name": "FOO",
                "values": { "A": { "value": 1, "options": {} }, "B": { "value": 2, "options": {} } }
            }]
        });

        let schema: Schema = serde_json::from_value(raw).unwrap();
        let message = &schema.messages[0];
        assert_eq!(message.fields[0].options.default, Some(Literal("42".into())));
        assert_eq!(message.fields[1].type_name, "FOO");
        assert!(message.fields[1].options.default.is_none());
        assert_eq!(schema.enums[0].names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(schema.enums[0].values[1].number, 2);
    }

    #[test]
    fn enum_values_plain_numbers_keep_order() {
        let e: Enum = serde_json::from_value(json!({
            "name": "Color",
            "values": { "RED": 0, "GREEN": 1, "BLUE": 2 }
        }))
        .unwrap();
        assert_eq!(e.names().collect::<Vec<_>>(), ["RED", "GREEN", "BLUE"]);
    }

    #[test]
    fn default_literal_accepts_numbers_and_bools() {
        let field: Field = serde_json::from_value(json!({
            "name": "n", "type": "int32", "options": { "default": 7 }
        }))
        .unwrap();
        assert_eq!(field.options.default.unwrap().as_str(), "7");

        let field: Field = serde_json::from_value(json!({
            "name": "b", "type": "bool", "options": { "default": true }
        }))
        .unwrap();
        assert_eq!(field.options.default.unwrap().as_str(), "true");
    }

    #[test]
    fn nested_aliases() {
        let message: Message = serde_json::from_value(json!({
            "name": "Outer",
            "nestedMessages": [{ "name": "Inner" }],
            "nestedEnums": [{ "name": "Kind", "values": { "A": 0 } }]
        }))
        .unwrap();
        assert_eq!(message.messages[0].name, "Inner");
        assert_eq!(message.enums[0].name, "Kind");
    }

    #[test]
    fn builders_compose() {
        let field = Field::new("tags", "string")
            .repeated()
            .required()
            .oneof("value")
            .default_value("x");
        assert!(field.repeated && field.required);
        assert_eq!(field.oneof.as_deref(), Some("value"));
        assert_eq!(field.options.default, Some(Literal("x".into())));
    }
}
