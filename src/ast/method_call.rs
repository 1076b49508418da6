use super::{Expression, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall<T> {
    pub receiver: Box<Expression<T>>,
    pub method: String,
    pub args: Vec<Expression<T>>,
    /// The class that actually defines the method, resolved by the type
    /// checker so emission can route calls to inherited methods correctly.
    pub defining_class: Option<String>,
    pub position: Position,
    pub info: T,
}
