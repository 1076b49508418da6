#[macro_use]
extern crate pest_derive;

pub mod asm;
pub mod ast;
pub mod checker;
pub mod compiler;
pub mod depgraph;
pub mod error;
pub mod hierarchy;
pub mod typechecker;
