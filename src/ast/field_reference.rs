use pest::iterators::Pair;

use super::{Expression, Position, Rule};

/// `expr.field`, readable and assignable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference<T> {
    pub object: Box<Expression<T>>,
    pub field: String,
    pub position: Position,
    pub info: T,
}

/// `this.field`, only meaningful inside a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThisFieldReference<T> {
    pub field: String,
    pub position: Position,
    pub info: T,
}

impl ThisFieldReference<()> {
    pub fn from_pair(pair: Pair<Rule>) -> ThisFieldReference<()> {
        let position = pair.line_col();
        let Some(field) = pair
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::ident)
        else {
            unreachable!("a this-reference always names a field")
        };
        ThisFieldReference {
            field: field.as_str().to_owned(),
            position,
            info: (),
        }
    }
}
