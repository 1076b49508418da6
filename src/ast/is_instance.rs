use super::{Expression, Position};

/// The runtime type test a `typecase` alternative lowers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsInstance<T> {
    pub object: Box<Expression<T>>,
    pub class_name: String,
    pub position: Position,
    pub info: T,
}
