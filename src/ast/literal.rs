use pest::iterators::Pair;
use unescape::unescape;

use super::{Position, Rule};
use crate::error::{CompileError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral<T> {
    pub value: i64,
    pub position: Position,
    pub info: T,
}

impl IntLiteral<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<IntLiteral<()>, CompileError> {
        let position = pair.line_col();
        let value = pair.as_str().parse::<i64>().map_err(|_| {
            CompileError::at(
                ErrorKind::ParseError,
                format!("integer literal '{}' is out of range", pair.as_str()),
                position,
            )
        })?;
        Ok(IntLiteral {
            value,
            position,
            info: (),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral<T> {
    /// The decoded value; emission re-escapes it.
    pub value: String,
    pub position: Position,
    pub info: T,
}

impl StringLiteral<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<StringLiteral<()>, CompileError> {
        let position = pair.line_col();
        let Some(inner) = pair.clone().into_inner().next() else {
            unreachable!("a string literal always wraps its inner text")
        };
        let Some(value) = unescape(inner.as_str()) else {
            return Err(CompileError::at(
                ErrorKind::ParseError,
                format!("string literal {} has an invalid escape", pair.as_str()),
                position,
            ));
        };
        Ok(StringLiteral {
            value,
            position,
            info: (),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolLiteral<T> {
    pub value: bool,
    pub position: Position,
    pub info: T,
}

impl BoolLiteral<()> {
    pub fn from_pair(pair: Pair<Rule>) -> BoolLiteral<()> {
        let position = pair.line_col();
        let Some(keyword) = pair.into_inner().next() else {
            unreachable!("a boolean literal is always one of the two keywords")
        };
        BoolLiteral {
            value: keyword.as_rule() == Rule::kw_true,
            position,
            info: (),
        }
    }
}
