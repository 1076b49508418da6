use pest::iterators::Pair;

use super::{Position, Rule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_name: String,
    pub position: Position,
}

/// The parameter list of a constructor or method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormalArgs {
    pub args: Vec<Param>,
}

impl FormalArgs {
    pub fn from_pair(pair: Pair<Rule>) -> FormalArgs {
        let mut args = vec![];
        for arg in pair.into_inner() {
            let position = arg.line_col();
            let mut parts = arg.into_inner();
            let Some(name) = parts.next() else {
                unreachable!("a formal argument always has a name")
            };
            let Some(type_name) = parts.next() else {
                unreachable!("a formal argument always has a type")
            };
            args.push(Param {
                name: name.as_str().to_owned(),
                type_name: type_name.as_str().to_owned(),
                position,
            });
        }
        FormalArgs { args }
    }

    pub fn names(&self) -> Vec<String> {
        self.args.iter().map(|param| param.name.clone()).collect()
    }

    pub fn types(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|param| param.type_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
