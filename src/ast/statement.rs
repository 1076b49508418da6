use pest::iterators::Pair;

use super::{lower_typecase, Assignment, Expression, If, ReturnStatement, Rule, While};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<T> {
    Assignment(Assignment<T>),
    If(If<T>),
    While(While<T>),
    Return(ReturnStatement<T>),
    /// A bare right expression, evaluated for effect.
    Expression(Expression<T>),
}

impl Statement<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<Statement<()>, CompileError> {
        match pair.as_rule() {
            Rule::assignment => Ok(Statement::Assignment(Assignment::from_pair(pair)?)),
            Rule::if_stmt => Ok(Statement::If(If::from_pair(pair)?)),
            Rule::while_stmt => Ok(Statement::While(While::from_pair(pair)?)),
            Rule::return_stmt => Ok(Statement::Return(ReturnStatement::from_pair(pair)?)),
            Rule::typecase_stmt => lower_typecase(pair),
            Rule::bare_stmt => {
                let Some(rexp) = pair.into_inner().next() else {
                    unreachable!("a bare statement always wraps an expression")
                };
                Ok(Statement::Expression(Expression::from_pair(rexp)?))
            }
            rule => unreachable!("can not build a statement from rule {rule:?}"),
        }
    }
}
