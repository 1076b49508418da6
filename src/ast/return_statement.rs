use pest::iterators::Pair;

use super::{Expression, Position, Rule};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStatement<T> {
    pub value: Expression<T>,
    pub position: Position,
}

impl ReturnStatement<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<ReturnStatement<()>, CompileError> {
        let position = pair.line_col();
        let Some(rexp) = pair
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::rexp)
        else {
            unreachable!("a return always carries an expression")
        };
        Ok(ReturnStatement {
            value: Expression::from_pair(rexp)?,
            position,
        })
    }
}
