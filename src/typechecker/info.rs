/// Type information attached to every expression by the check pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    /// The inferred class of the expression.
    pub ty: String,
}

impl TypeInfo {
    pub fn new(ty: impl Into<String>) -> Self {
        Self { ty: ty.into() }
    }
}
