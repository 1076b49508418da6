use pest::iterators::Pair;

use super::{FormalArgs, Position, Rule};

/// `class Name(args) [extends Parent]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub name: String,
    pub super_class: String,
    pub args: FormalArgs,
    pub position: Position,
}

impl ClassSignature {
    pub fn from_pair(pair: Pair<Rule>) -> ClassSignature {
        let position = pair.line_col();
        let mut name = None;
        let mut super_class = None;
        let mut args = FormalArgs::default();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::kw_class => {}
                Rule::ident => name = Some(inner.as_str().to_owned()),
                Rule::formal_args => args = FormalArgs::from_pair(inner),
                Rule::extends_clause => {
                    let Some(parent) = inner
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::ident)
                    else {
                        unreachable!("an extends clause always names a class")
                    };
                    super_class = Some(parent.as_str().to_owned());
                }
                rule => unreachable!("unexpected rule {rule:?} in a class signature"),
            }
        }

        let Some(name) = name else {
            unreachable!("a class signature always has a name")
        };

        ClassSignature {
            name,
            super_class: super_class.unwrap_or_else(|| "Obj".to_owned()),
            args,
            position,
        }
    }
}
