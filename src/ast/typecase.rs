use pest::iterators::Pair;

use super::{
    Assignment, AssignTarget, Expression, If, IsInstance, Position, Rule, Statement,
    StatementBlock,
};
use crate::error::CompileError;

/// One `name: Type { ... }` arm of a typecase, before lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAlternative {
    pub name: String,
    pub type_name: String,
    pub block: StatementBlock<()>,
    pub position: Position,
}

impl TypeAlternative {
    fn from_pair(pair: Pair<Rule>) -> Result<TypeAlternative, CompileError> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            unreachable!("a type alternative always has a binder name")
        };
        let Some(type_name) = inner.next() else {
            unreachable!("a type alternative always has a class name")
        };
        let Some(block) = inner.next() else {
            unreachable!("a type alternative always has a block")
        };
        Ok(TypeAlternative {
            name: name.as_str().to_owned(),
            type_name: type_name.as_str().to_owned(),
            block: StatementBlock::from_pair(block)?,
            position,
        })
    }
}

/// Lower `typecase E { a1: T1 S1 ... an: Tn Sn }` into a right-nested chain
/// of `is_instance`-guarded ifs. Each arm starts with `a_i: T_i = E`, so the
/// binder carries the narrowed type inside the arm and nowhere else.
pub fn lower_typecase(pair: Pair<Rule>) -> Result<Statement<()>, CompileError> {
    let mut subject = None;
    let mut alternatives = vec![];

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::kw_typecase => {}
            Rule::rexp => subject = Some(Expression::from_pair(inner)?),
            Rule::type_alternative => alternatives.push(TypeAlternative::from_pair(inner)?),
            rule => unreachable!("unexpected rule {rule:?} in a typecase"),
        }
    }

    let Some(subject) = subject else {
        unreachable!("a typecase always has a subject expression")
    };

    // No arms: nothing to guard, just evaluate the subject for effect.
    if alternatives.is_empty() {
        return Ok(Statement::Expression(subject));
    }

    let mut lowered: Option<If<()>> = None;
    for alternative in alternatives.into_iter().rev() {
        let TypeAlternative {
            name,
            type_name,
            mut block,
            position,
        } = alternative;

        let binder = Assignment {
            target: AssignTarget::Var {
                name,
                position,
            },
            declared_type: Some(type_name.clone()),
            value: subject.clone(),
            position,
        };
        block.statements.insert(0, Statement::Assignment(binder));

        let else_block = lowered.take().map(|inner| StatementBlock {
            position: inner.position,
            statements: vec![Statement::If(inner)],
        });

        lowered = Some(If {
            condition: Expression::IsInstance(IsInstance {
                object: Box::new(subject.clone()),
                class_name: type_name,
                position,
                info: (),
            }),
            then_block: block,
            else_block,
            position,
        });
    }

    let Some(lowered) = lowered else {
        unreachable!("at least one alternative was folded")
    };
    Ok(Statement::If(lowered))
}
