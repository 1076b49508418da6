use pest::iterators::Pair;
use pest::Parser;

use crate::error::{CompileError, ErrorKind};

/// Parser over the Quack grammar.
#[derive(Parser)]
#[grammar = "quack.pest"]
pub struct QuackParser;

impl QuackParser {
    /// Parse a whole source file, mapping grammar rejections into the
    /// compiler's error type.
    pub fn parse_program(source: &str) -> Result<Pair<'_, Rule>, CompileError> {
        let mut pairs = Self::parse(Rule::program, source).map_err(|error| {
            let position = match error.line_col {
                pest::error::LineColLocation::Pos(pos) => pos,
                pest::error::LineColLocation::Span(pos, _) => pos,
            };
            CompileError::at(ErrorKind::ParseError, error.variant.message(), position)
        })?;

        let Some(program) = pairs.next() else {
            unreachable!("a successful parse always yields a program pair")
        };
        Ok(program)
    }
}
