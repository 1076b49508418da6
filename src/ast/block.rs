use pest::iterators::Pair;

use super::{Position, Rule, Statement};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBlock<T> {
    pub statements: Vec<Statement<T>>,
    pub position: Position,
}

impl StatementBlock<()> {
    /// Build from a `statement_block` or `constructor_block` pair.
    pub fn from_pair(pair: Pair<Rule>) -> Result<StatementBlock<()>, CompileError> {
        let position = pair.line_col();
        let mut statements = vec![];
        for statement in pair.into_inner() {
            statements.push(Statement::from_pair(statement)?);
        }
        Ok(StatementBlock {
            statements,
            position,
        })
    }
}
