//! AST for Quack programs.
//!
//! One file per node family; `from_pair` constructors fold the concrete parse
//! into the tagged variants, desugaring operators into dunder method calls
//! and lowering `typecase` on the way. Every node is generic over an info
//! parameter: `()` straight out of the parser, `TypeInfo` once the type
//! checker has rebuilt the tree.
mod assignment;
mod block;
mod class_decl;
mod class_signature;
mod constructor_call;
mod expression;
mod field_reference;
mod formal_args;
mod if_statement;
mod is_instance;
mod literal;
mod logic;
mod method;
mod method_call;
mod parser;
mod return_statement;
mod statement;
mod typecase;
mod var_reference;
mod while_loop;

pub use self::assignment::*;
pub use self::block::*;
pub use self::class_decl::*;
pub use self::class_signature::*;
pub use self::constructor_call::*;
pub use self::expression::*;
pub use self::field_reference::*;
pub use self::formal_args::*;
pub use self::if_statement::*;
pub use self::is_instance::*;
pub use self::literal::*;
pub use self::logic::*;
pub use self::method::*;
pub use self::method_call::*;
pub use self::parser::*;
pub use self::return_statement::*;
pub use self::statement::*;
pub use self::typecase::*;
pub use self::var_reference::*;
pub use self::while_loop::*;

use pest::iterators::Pair;

use crate::error::CompileError;
use crate::typechecker::TypeScope;

/// A position within a source file (line and column).
pub type Position = (usize, usize);

/// A whole Quack program: class declarations followed by the bare statements
/// that become the synthetic main module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program<T> {
    pub classes: Vec<ClassDecl<T>>,
    pub bare: BareBlock<T>,
}

/// The top-level statements outside any class. The scope is filled in by the
/// type checker and drives the `.local` declaration of the main module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BareBlock<T> {
    pub statements: Vec<Statement<T>>,
    pub scope: TypeScope,
}

impl Program<()> {
    /// Parse and build a program in one step.
    pub fn parse(source: &str) -> Result<Program<()>, CompileError> {
        let program = QuackParser::parse_program(source)?;
        Self::from_pair(program)
    }

    pub fn from_pair(pair: Pair<Rule>) -> Result<Program<()>, CompileError> {
        let mut classes = vec![];
        let mut statements = vec![];

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::class_decl => classes.push(ClassDecl::from_pair(inner)?),
                Rule::EOI => {}
                _ => statements.push(Statement::from_pair(inner)?),
            }
        }

        Ok(Program {
            classes,
            bare: BareBlock {
                statements,
                scope: TypeScope::default(),
            },
        })
    }
}
