use pest::iterators::Pair;

use super::{Expression, FieldReference, Position, Rule};
use crate::error::{CompileError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<T> {
    pub target: AssignTarget<T>,
    /// The `: Type` annotation, if the author wrote one.
    pub declared_type: Option<String>,
    pub value: Expression<T>,
    pub position: Position,
}

/// The left side of an assignment. Store emission is only defined for these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignTarget<T> {
    Var { name: String, position: Position },
    ThisField { field: String, position: Position },
    Field(FieldReference<T>),
}

impl<T> AssignTarget<T> {
    pub fn position(&self) -> Position {
        match self {
            AssignTarget::Var { position, .. } => *position,
            AssignTarget::ThisField { position, .. } => *position,
            AssignTarget::Field(field) => field.position,
        }
    }
}

impl Assignment<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<Assignment<()>, CompileError> {
        let position = pair.line_col();
        let mut target = None;
        let mut declared_type = None;
        let mut value = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::lexpr => {
                    let Some(postfix) = inner.into_inner().next() else {
                        unreachable!("an lexpr always wraps a postfix expression")
                    };
                    target = Some(into_target(Expression::from_pair(postfix)?)?);
                }
                Rule::declared_type => {
                    let Some(ident) = inner.into_inner().next() else {
                        unreachable!("a type annotation always names a class")
                    };
                    declared_type = Some(ident.as_str().to_owned());
                }
                Rule::assign_op => {}
                Rule::rexp => value = Some(Expression::from_pair(inner)?),
                rule => unreachable!("unexpected rule {rule:?} in an assignment"),
            }
        }

        let Some(target) = target else {
            unreachable!("an assignment always has a target")
        };
        let Some(value) = value else {
            unreachable!("an assignment always has a value")
        };

        Ok(Assignment {
            target,
            declared_type,
            value,
            position,
        })
    }
}

fn into_target(expr: Expression<()>) -> Result<AssignTarget<()>, CompileError> {
    match expr {
        Expression::VarReference(var) => Ok(AssignTarget::Var {
            name: var.name,
            position: var.position,
        }),
        Expression::ThisField(this_field) => Ok(AssignTarget::ThisField {
            field: this_field.field,
            position: this_field.position,
        }),
        Expression::FieldReference(field) => Ok(AssignTarget::Field(field)),
        expr => Err(CompileError::at(
            ErrorKind::ParseError,
            "left side of an assignment must be a variable or a field",
            expr.position(),
        )),
    }
}
