use pest::iterators::Pair;

use super::{Position, Rule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarReference<T> {
    pub name: String,
    pub position: Position,
    pub info: T,
}

impl VarReference<()> {
    pub fn from_pair(pair: Pair<Rule>) -> VarReference<()> {
        VarReference {
            name: pair.as_str().to_owned(),
            position: pair.line_col(),
            info: (),
        }
    }
}
