//! Oneof grouping.

use crate::rule::OneofConstraint;
use crate::schema::Message;

/// Group a message's fields by oneof tag.
///
/// Groups appear in the order their first member is declared; members keep
/// field declaration order. Fields without a tag are ignored.
pub fn oneof_constraints(message: &Message) -> Vec<OneofConstraint> {
    let mut constraints: Vec<OneofConstraint> = Vec::new();

    for field in &message.fields {
        let Some(group) = field.oneof.as_deref() else {
            continue;
        };
        match constraints.iter_mut().find(|c| c.group == group) {
            Some(constraint) => constraint.members.push(field.name.clone()),
            None => constraints.push(OneofConstraint {
                group: group.to_string(),
                members: vec![field.name.clone()],
            }),
        }
    }

    constraints
}
