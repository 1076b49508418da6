use pest::iterators::Pair;

use super::{FormalArgs, Position, Rule, StatementBlock};
use crate::error::CompileError;
use crate::typechecker::TypeScope;

/// `def name(args)[: Type] { ... }`. A missing return annotation means the
/// method returns `Nothing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl<T> {
    pub name: String,
    pub args: FormalArgs,
    pub ret_type: String,
    pub block: StatementBlock<T>,
    /// Fixpointed variable scope, filled in by the type checker; drives the
    /// `.local` declaration at emission.
    pub scope: TypeScope,
    pub position: Position,
}

impl MethodDecl<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<MethodDecl<()>, CompileError> {
        let position = pair.line_col();
        let mut name = None;
        let mut args = FormalArgs::default();
        let mut ret_type = None;
        let mut block = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::kw_def => {}
                Rule::ident => name = Some(inner.as_str().to_owned()),
                Rule::formal_args => args = FormalArgs::from_pair(inner),
                Rule::return_type => {
                    let Some(ident) = inner.into_inner().next() else {
                        unreachable!("a return annotation always names a class")
                    };
                    ret_type = Some(ident.as_str().to_owned());
                }
                Rule::statement_block => block = Some(StatementBlock::from_pair(inner)?),
                rule => unreachable!("unexpected rule {rule:?} in a method declaration"),
            }
        }

        let Some(name) = name else {
            unreachable!("a method always has a name")
        };
        let Some(block) = block else {
            unreachable!("a method always has a body")
        };

        Ok(MethodDecl {
            name,
            args,
            ret_type: ret_type.unwrap_or_else(|| "Nothing".to_owned()),
            block,
            scope: TypeScope::default(),
            position,
        })
    }
}
