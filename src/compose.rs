//! Field modifier composition.
//!
//! Modifiers are applied in a fixed order:
//!
//! 1. default attachment
//! 2. repeated wrapping
//! 3. required marking
//! 4. empty-value matcher
//!
//! Because the default is attached before wrapping, a default on a repeated
//! field lands on the element rule. It never fills in a missing array.

use crate::error::CompileError;
use crate::rule::{Rule, RuleKind};
use crate::schema::{Field, Message};
use crate::types::{Coercion, CompileOptions};

/// How a field's default literal is coerced, by resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    Coerce(Coercion),
    /// Text that must name one of the enum's values.
    EnumMember,
    /// Message-typed fields take no default.
    Rejected,
}

/// Wrap a field's base rule with its modifiers.
///
/// # Errors
///
/// Returns `CompileError::InvalidDefault` when the default literal does not
/// coerce to the field's type.
pub fn compose_field(
    message: &Message,
    field: &Field,
    base: RuleKind,
    policy: DefaultPolicy,
    options: &CompileOptions,
) -> Result<Rule, CompileError> {
    let mut rule = Rule::new(base);

    if let Some(literal) = &field.options.default {
        rule.default = Some(coerce_default(
            message,
            field,
            &rule.kind,
            policy,
            literal.as_str(),
        )?);
    }

    if field.repeated {
        rule = Rule::new(RuleKind::Array {
            element: Box::new(rule),
        });
    }

    rule.required = field.required;

    if !options.empty_equivalents.is_empty() {
        rule.empty = options.empty_equivalents.clone();
    }

    Ok(rule)
}

fn coerce_default(
    message: &Message,
    field: &Field,
    kind: &RuleKind,
    policy: DefaultPolicy,
    literal: &str,
) -> Result<serde_json::Value, CompileError> {
    let coerced = match (policy, kind) {
        (DefaultPolicy::Coerce(coercion), _) => coercion.apply(literal),
        (DefaultPolicy::EnumMember, RuleKind::Enum { members, .. }) => members
            .iter()
            .any(|m| m == literal)
            .then(|| serde_json::Value::String(literal.to_string())),
        _ => None,
    };

    coerced.ok_or_else(|| CompileError::InvalidDefault {
        message: message.name.clone(),
        field: field.name.clone(),
        literal: literal.to_string(),
        expected: field.type_name.clone(),
    })
}
