use pest::iterators::Pair;

use super::{Expression, Position, Rule, StatementBlock};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While<T> {
    pub condition: Expression<T>,
    pub block: StatementBlock<T>,
    pub position: Position,
}

impl While<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<While<()>, CompileError> {
        let position = pair.line_col();
        let mut condition = None;
        let mut block = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::kw_while => {}
                Rule::rexp => condition = Some(Expression::from_pair(inner)?),
                Rule::statement_block => block = Some(StatementBlock::from_pair(inner)?),
                rule => unreachable!("unexpected rule {rule:?} in a while statement"),
            }
        }

        let Some(condition) = condition else {
            unreachable!("a while always has a condition")
        };
        let Some(block) = block else {
            unreachable!("a while always has a body")
        };

        Ok(While {
            condition,
            block,
            position,
        })
    }
}
