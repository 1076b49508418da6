use std::collections::HashMap;

use once_cell::sync::Lazy;
use pest::iterators::Pair;

use super::{
    And, BoolLiteral, ConstructorCall, FieldReference, IntLiteral, IsInstance, MethodCall, Not,
    Or, Position, Rule, StringLiteral, ThisFieldReference, VarReference,
};
use crate::error::CompileError;

/// Surface operators and the dunder methods they desugar to.
static OPERATOR_METHODS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("+", "PLUS"),
        ("-", "MINUS"),
        ("*", "TIMES"),
        ("/", "DIVIDE"),
        ("==", "EQUALS"),
        ("<", "LESS"),
        (">", "MORE"),
        ("<=", "ATMOST"),
        (">=", "ATLEAST"),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression<T> {
    IntLiteral(IntLiteral<T>),
    StringLiteral(StringLiteral<T>),
    BoolLiteral(BoolLiteral<T>),
    VarReference(VarReference<T>),
    ThisField(ThisFieldReference<T>),
    FieldReference(FieldReference<T>),
    MethodCall(MethodCall<T>),
    ConstructorCall(ConstructorCall<T>),
    And(And<T>),
    Or(Or<T>),
    Not(Not<T>),
    IsInstance(IsInstance<T>),
}

impl Expression<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        match pair.as_rule() {
            Rule::rexp => Self::from_or(pair),
            Rule::and_expr => Self::from_and(pair),
            Rule::not_expr => Self::from_not(pair),
            Rule::comparison => Self::from_comparison(pair),
            Rule::arith => Self::from_arith(pair),
            Rule::product => Self::from_product(pair),
            Rule::unary => Self::from_unary(pair),
            Rule::postfix => Self::from_postfix(pair),
            rule => unreachable!("can not build an expression from rule {rule:?}"),
        }
    }

    fn from_or(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        let position = pair.line_col();
        let mut operands = pair
            .into_inner()
            .filter(|inner| inner.as_rule() == Rule::and_expr);

        let Some(first) = operands.next() else {
            unreachable!("an or-chain always has a first operand")
        };
        let mut expr = Self::from_and(first)?;

        for operand in operands {
            expr = Expression::Or(Or {
                lhs: Box::new(expr),
                rhs: Box::new(Self::from_and(operand)?),
                position,
                info: (),
            });
        }
        Ok(expr)
    }

    fn from_and(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        let position = pair.line_col();
        let mut operands = pair
            .into_inner()
            .filter(|inner| inner.as_rule() == Rule::not_expr);

        let Some(first) = operands.next() else {
            unreachable!("an and-chain always has a first operand")
        };
        let mut expr = Self::from_not(first)?;

        for operand in operands {
            expr = Expression::And(And {
                lhs: Box::new(expr),
                rhs: Box::new(Self::from_not(operand)?),
                position,
                info: (),
            });
        }
        Ok(expr)
    }

    fn from_not(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let Some(first) = inner.next() else {
            unreachable!("a not-expression always has an operand")
        };

        match first.as_rule() {
            Rule::kw_not => {
                let Some(operand) = inner.next() else {
                    unreachable!("'not' always has an operand")
                };
                Ok(Expression::Not(Not {
                    operand: Box::new(Self::from_not(operand)?),
                    position,
                    info: (),
                }))
            }
            Rule::comparison => Self::from_comparison(first),
            rule => unreachable!("unexpected rule {rule:?} in a not-expression"),
        }
    }

    fn from_comparison(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        Self::fold_operators(pair, Self::from_arith)
    }

    fn from_arith(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        Self::fold_operators(pair, Self::from_product)
    }

    fn from_product(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        Self::fold_operators(pair, Self::from_unary)
    }

    /// Left-fold an `operand (op operand)*` chain into nested method calls on
    /// the left operand.
    fn fold_operators(
        pair: Pair<Rule>,
        operand: fn(Pair<Rule>) -> Result<Expression<()>, CompileError>,
    ) -> Result<Expression<()>, CompileError> {
        let mut inner = pair.into_inner();
        let Some(first) = inner.next() else {
            unreachable!("an operator chain always has a first operand")
        };
        let mut expr = operand(first)?;

        while let Some(op) = inner.next() {
            let position = op.line_col();
            let Some(method) = OPERATOR_METHODS.get(op.as_str()) else {
                unreachable!("unknown operator '{}'", op.as_str())
            };
            let Some(rhs) = inner.next() else {
                unreachable!("operator '{}' is missing its right operand", op.as_str())
            };
            expr = Expression::MethodCall(MethodCall {
                receiver: Box::new(expr),
                method: (*method).to_owned(),
                args: vec![operand(rhs)?],
                defining_class: None,
                position,
                info: (),
            });
        }
        Ok(expr)
    }

    fn from_unary(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let Some(first) = inner.next() else {
            unreachable!("a unary expression always has an operand")
        };

        match first.as_rule() {
            Rule::neg_op => {
                let Some(operand) = inner.next() else {
                    unreachable!("unary minus always has an operand")
                };
                // -e lowers to 0.MINUS(e).
                Ok(Expression::MethodCall(MethodCall {
                    receiver: Box::new(Expression::IntLiteral(IntLiteral {
                        value: 0,
                        position,
                        info: (),
                    })),
                    method: "MINUS".to_owned(),
                    args: vec![Self::from_unary(operand)?],
                    defining_class: None,
                    position,
                    info: (),
                }))
            }
            Rule::postfix => Self::from_postfix(first),
            rule => unreachable!("unexpected rule {rule:?} in a unary expression"),
        }
    }

    fn from_postfix(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        let mut inner = pair.into_inner();
        let Some(first) = inner.next() else {
            unreachable!("a postfix expression always has a primary")
        };
        let mut expr = Self::from_primary(first)?;

        for op in inner {
            let position = op.line_col();
            let mut parts = op.into_inner();
            let Some(name) = parts.next() else {
                unreachable!("a postfix operator always names a member")
            };
            let name = name.as_str().to_owned();

            expr = match parts.next() {
                Some(args) => Expression::MethodCall(MethodCall {
                    receiver: Box::new(expr),
                    method: name,
                    args: call_args(args)?,
                    defining_class: None,
                    position,
                    info: (),
                }),
                None => Expression::FieldReference(FieldReference {
                    object: Box::new(expr),
                    field: name,
                    position,
                    info: (),
                }),
            };
        }
        Ok(expr)
    }

    fn from_primary(pair: Pair<Rule>) -> Result<Expression<()>, CompileError> {
        match pair.as_rule() {
            Rule::bool_lit => Ok(Expression::BoolLiteral(BoolLiteral::from_pair(pair))),
            Rule::this_field => Ok(Expression::ThisField(ThisFieldReference::from_pair(pair))),
            Rule::constructor_call => Ok(Expression::ConstructorCall(ConstructorCall::from_pair(pair)?)),
            Rule::var_ref => Ok(Expression::VarReference(VarReference::from_pair(pair))),
            Rule::int_lit => Ok(Expression::IntLiteral(IntLiteral::from_pair(pair)?)),
            Rule::string_lit => Ok(Expression::StringLiteral(StringLiteral::from_pair(pair)?)),
            Rule::rexp => Self::from_or(pair),
            rule => unreachable!("can not build a primary expression from rule {rule:?}"),
        }
    }
}

/// Build the argument list of a call from a `call_args` pair.
pub(crate) fn call_args(pair: Pair<Rule>) -> Result<Vec<Expression<()>>, CompileError> {
    let mut args = vec![];
    for arg in pair.into_inner() {
        args.push(Expression::from_pair(arg)?);
    }
    Ok(args)
}

impl<T> Expression<T>
where
    T: Clone,
{
    pub fn info(&self) -> T {
        match self {
            Expression::IntLiteral(node) => node.info.clone(),
            Expression::StringLiteral(node) => node.info.clone(),
            Expression::BoolLiteral(node) => node.info.clone(),
            Expression::VarReference(node) => node.info.clone(),
            Expression::ThisField(node) => node.info.clone(),
            Expression::FieldReference(node) => node.info.clone(),
            Expression::MethodCall(node) => node.info.clone(),
            Expression::ConstructorCall(node) => node.info.clone(),
            Expression::And(node) => node.info.clone(),
            Expression::Or(node) => node.info.clone(),
            Expression::Not(node) => node.info.clone(),
            Expression::IsInstance(node) => node.info.clone(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Expression::IntLiteral(IntLiteral { position, .. })
            | Expression::StringLiteral(StringLiteral { position, .. })
            | Expression::BoolLiteral(BoolLiteral { position, .. })
            | Expression::VarReference(VarReference { position, .. })
            | Expression::ThisField(ThisFieldReference { position, .. })
            | Expression::FieldReference(FieldReference { position, .. })
            | Expression::MethodCall(MethodCall { position, .. })
            | Expression::ConstructorCall(ConstructorCall { position, .. })
            | Expression::And(And { position, .. })
            | Expression::Or(Or { position, .. })
            | Expression::Not(Not { position, .. })
            | Expression::IsInstance(IsInstance { position, .. }) => *position,
        }
    }
}
