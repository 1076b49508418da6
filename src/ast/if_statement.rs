use pest::iterators::Pair;

use super::{Expression, Position, Rule, Statement, StatementBlock};
use crate::error::CompileError;

/// Two- or three-arm `if`. An `elif` chain is folded into a nested `If`
/// wrapped in a synthetic else-block at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If<T> {
    pub condition: Expression<T>,
    pub then_block: StatementBlock<T>,
    pub else_block: Option<StatementBlock<T>>,
    pub position: Position,
}

impl If<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<If<()>, CompileError> {
        let position = pair.line_col();
        let mut condition = None;
        let mut then_block = None;
        let mut elifs = vec![];
        let mut else_block = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::kw_if => {}
                Rule::rexp => condition = Some(Expression::from_pair(inner)?),
                Rule::statement_block => then_block = Some(StatementBlock::from_pair(inner)?),
                Rule::elif_clause => {
                    let elif_position = inner.line_col();
                    let mut parts = inner.into_inner();
                    parts.next(); // kw_elif
                    let Some(elif_condition) = parts.next() else {
                        unreachable!("an elif always has a condition")
                    };
                    let Some(elif_block) = parts.next() else {
                        unreachable!("an elif always has a block")
                    };
                    elifs.push((
                        Expression::from_pair(elif_condition)?,
                        StatementBlock::from_pair(elif_block)?,
                        elif_position,
                    ));
                }
                Rule::else_clause => {
                    let Some(block) = inner.into_inner().find(|p| p.as_rule() == Rule::statement_block)
                    else {
                        unreachable!("an else always has a block")
                    };
                    else_block = Some(StatementBlock::from_pair(block)?);
                }
                rule => unreachable!("unexpected rule {rule:?} in an if statement"),
            }
        }

        let Some(condition) = condition else {
            unreachable!("an if always has a condition")
        };
        let Some(then_block) = then_block else {
            unreachable!("an if always has a then block")
        };

        // Fold elif arms from the inside out.
        let mut else_arm = else_block;
        for (elif_condition, elif_block, elif_position) in elifs.into_iter().rev() {
            let nested = If {
                condition: elif_condition,
                then_block: elif_block,
                else_block: else_arm,
                position: elif_position,
            };
            else_arm = Some(StatementBlock {
                statements: vec![Statement::If(nested)],
                position: elif_position,
            });
        }

        Ok(If {
            condition,
            then_block,
            else_block: else_arm,
            position,
        })
    }
}
