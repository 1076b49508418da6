use super::{Expression, Position};

/// Short-circuit `and`. Kept as its own node (not a method call) so branch
/// emission can jump instead of materializing a boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct And<T> {
    pub lhs: Box<Expression<T>>,
    pub rhs: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}

/// Short-circuit `or`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Or<T> {
    pub lhs: Box<Expression<T>>,
    pub rhs: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Not<T> {
    pub operand: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}
