use pest::iterators::Pair;

use super::{call_args, Expression, Position, Rule};
use crate::error::CompileError;

/// `Name(args)` — allocate and run `$constructor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorCall<T> {
    pub class_name: String,
    pub args: Vec<Expression<T>>,
    pub position: Position,
    pub info: T,
}

impl ConstructorCall<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<ConstructorCall<()>, CompileError> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();

        let Some(class_name) = inner.next() else {
            unreachable!("a constructor call always names a class")
        };
        let args = match inner.next() {
            Some(args) => call_args(args)?,
            None => vec![],
        };

        Ok(ConstructorCall {
            class_name: class_name.as_str().to_owned(),
            args,
            position,
            info: (),
        })
    }
}
