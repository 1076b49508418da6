//! The class hierarchy: a tree of class descriptors rooted at `Obj`.
//!
//! Built once from the builtin catalog, extended with user classes while they
//! are type checked, and consulted read-only by every later query.
mod builtins;

pub use self::builtins::load_builtins;

use crate::error::{CompileError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<String>,
    pub ret: String,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<String>, ret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params,
            ret: ret.into(),
        }
    }
}

/// A single class: identity, superclass by name, fields in declaration order,
/// methods in declaration order (the constructor first), and owned children.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub super_class: String,
    pub fields: Vec<(String, String)>,
    pub methods: Vec<MethodDescriptor>,
    children: Vec<ClassDescriptor>,
}

impl ClassDescriptor {
    pub fn new(
        name: impl Into<String>,
        super_class: impl Into<String>,
        fields: Vec<(String, String)>,
        methods: Vec<MethodDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            super_class: super_class.into(),
            fields,
            methods,
            children: vec![],
        }
    }

    pub fn field_type(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, ty)| ty.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    root: ClassDescriptor,
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassHierarchy {
    /// A hierarchy containing only the synthetic root `Obj`, which is its own
    /// superclass and exposes `STR`, `PRINT` and `EQUALS`.
    pub fn new() -> Self {
        let methods = vec![
            MethodDescriptor::new("STR", vec![], "String"),
            MethodDescriptor::new("PRINT", vec![], "Nothing"),
            MethodDescriptor::new("EQUALS", vec!["Obj".to_owned()], "Boolean"),
        ];
        Self {
            root: ClassDescriptor::new("Obj", "Obj", vec![], methods),
        }
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDescriptor> {
        Self::find_helper(&self.root, name)
    }

    fn find_helper<'a>(node: &'a ClassDescriptor, name: &str) -> Option<&'a ClassDescriptor> {
        if node.name == name {
            return Some(node);
        }
        for child in &node.children {
            if let Some(found) = Self::find_helper(child, name) {
                return Some(found);
            }
        }
        None
    }

    fn find_helper_mut<'a>(
        node: &'a mut ClassDescriptor,
        name: &str,
    ) -> Option<&'a mut ClassDescriptor> {
        if node.name == name {
            return Some(node);
        }
        for child in &mut node.children {
            if let Some(found) = Self::find_helper_mut(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Attach a new class under its superclass.
    pub fn add_class(&mut self, descriptor: ClassDescriptor) -> Result<(), CompileError> {
        if self.find_class(&descriptor.name).is_some() {
            return Err(CompileError::new(
                ErrorKind::InvalidType,
                format!("class '{}' is already defined", descriptor.name),
            ));
        }
        let Some(parent) = Self::find_helper_mut(&mut self.root, &descriptor.super_class) else {
            return Err(CompileError::new(
                ErrorKind::InvalidType,
                format!(
                    "'{}' specifies '{}' as its superclass but it does not exist",
                    descriptor.name, descriptor.super_class
                ),
            ));
        };
        parent.children.push(descriptor);
        Ok(())
    }

    /// The chain of class names from `Obj` down to `name`, inclusive.
    pub fn path_from_root(&self, name: &str) -> Result<Vec<String>, CompileError> {
        let mut path = vec![];
        if Self::path_helper(&self.root, name, &mut path) {
            Ok(path)
        } else {
            Err(CompileError::new(
                ErrorKind::InvalidType,
                format!("'{name}' is not a known class"),
            ))
        }
    }

    fn path_helper(node: &ClassDescriptor, name: &str, path: &mut Vec<String>) -> bool {
        path.push(node.name.clone());
        if node.name == name {
            return true;
        }
        for child in &node.children {
            if Self::path_helper(child, name, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Least common ancestor of two classes, the join used by inference when
    /// two control-flow branches assign the same variable.
    pub fn lca(&self, a: &str, b: &str) -> Result<String, CompileError> {
        let path_a = self.path_from_root(a)?;
        let path_b = self.path_from_root(b)?;

        let mut last_common = 0;
        for (index, (left, right)) in path_a.iter().zip(path_b.iter()).enumerate() {
            if left != right {
                break;
            }
            last_common = index;
        }
        Ok(path_a[last_common].clone())
    }

    /// True iff `actual` can be used where `expected` is required, i.e. the
    /// path to `expected` is a prefix of the path to `actual`.
    pub fn is_subtype(&self, expected: &str, actual: &str) -> Result<bool, CompileError> {
        let path_expected = self.path_from_root(expected)?;
        let path_actual = self.path_from_root(actual)?;
        Ok(path_actual.len() >= path_expected.len()
            && path_actual[..path_expected.len()] == path_expected[..])
    }

    /// Walk from `class_name` towards the root and return the first class
    /// defining `method`, together with its descriptor.
    pub fn resolve_method(
        &self,
        class_name: &str,
        method: &str,
    ) -> Result<(String, &MethodDescriptor), CompileError> {
        let path = self.path_from_root(class_name)?;
        for class in path.iter().rev() {
            let descriptor = self
                .find_class(class)
                .unwrap_or_else(|| unreachable!("class '{class}' is on a path but not in the tree"));
            if let Some(found) = descriptor.methods.iter().find(|m| m.name == method) {
                return Ok((class.clone(), found));
            }
        }
        Err(CompileError::new(
            ErrorKind::MethodNotFound,
            format!("'{method}' is not defined for '{class_name}' or any of its superclasses"),
        ))
    }

    /// Resolve a call and verify arity and argument subtyping. Returns the
    /// declared return type.
    pub fn check_call(
        &self,
        class_name: &str,
        method: &str,
        arg_types: &[String],
    ) -> Result<String, CompileError> {
        if self.find_class(class_name).is_none() {
            return Err(CompileError::new(
                ErrorKind::InvalidType,
                format!("call to '{method}' on unknown class '{class_name}'"),
            ));
        }
        let (_, descriptor) = self.resolve_method(class_name, method)?;

        if descriptor.params.len() != arg_types.len() {
            return Err(CompileError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "'{method}' on '{class_name}' expects {} arguments but received {}",
                    descriptor.params.len(),
                    arg_types.len()
                ),
            ));
        }

        for (index, (expected, actual)) in descriptor.params.iter().zip(arg_types.iter()).enumerate() {
            if !self.is_subtype(expected, actual)? {
                return Err(CompileError::new(
                    ErrorKind::ArgumentTypeMismatch,
                    format!(
                        "argument {index} of '{method}' on '{class_name}' expects '{expected}' but received '{actual}'"
                    ),
                ));
            }
        }

        Ok(descriptor.ret.clone())
    }

    /// Height of the hierarchy, the bound on inference fixpoint rounds.
    pub fn depth(&self) -> usize {
        Self::depth_helper(&self.root)
    }

    fn depth_helper(node: &ClassDescriptor) -> usize {
        1 + node
            .children
            .iter()
            .map(Self::depth_helper)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hierarchy() -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::new();
        hierarchy
            .add_class(ClassDescriptor::new("Int", "Obj", vec![], vec![]))
            .unwrap();
        hierarchy
            .add_class(ClassDescriptor::new(
                "A",
                "Obj",
                vec![],
                vec![MethodDescriptor::new("size", vec![], "Int")],
            ))
            .unwrap();
        hierarchy
            .add_class(ClassDescriptor::new("B", "A", vec![], vec![]))
            .unwrap();
        hierarchy
            .add_class(ClassDescriptor::new("C", "A", vec![], vec![]))
            .unwrap();
        hierarchy
    }

    #[test]
    fn test_path_starts_at_obj_and_ends_at_class() {
        let hierarchy = sample_hierarchy();
        let path = hierarchy.path_from_root("B").unwrap();
        assert_eq!(path, vec!["Obj", "A", "B"]);
    }

    #[test]
    fn test_subtype_is_reflexive_and_transitive() {
        let hierarchy = sample_hierarchy();
        assert!(hierarchy.is_subtype("B", "B").unwrap());
        assert!(hierarchy.is_subtype("A", "B").unwrap());
        assert!(hierarchy.is_subtype("Obj", "B").unwrap());
        assert!(!hierarchy.is_subtype("B", "A").unwrap());
        assert!(!hierarchy.is_subtype("Int", "B").unwrap());
    }

    #[test]
    fn test_lca_of_siblings_is_their_parent() {
        let hierarchy = sample_hierarchy();
        assert_eq!(hierarchy.lca("B", "C").unwrap(), "A");
        assert_eq!(hierarchy.lca("B", "Int").unwrap(), "Obj");
        assert_eq!(hierarchy.lca("B", "A").unwrap(), "A");
        assert_eq!(hierarchy.lca("B", "B").unwrap(), "B");
    }

    #[test]
    fn test_lca_is_an_upper_bound() {
        let hierarchy = sample_hierarchy();
        let join = hierarchy.lca("B", "C").unwrap();
        assert!(hierarchy.is_subtype(&join, "B").unwrap());
        assert!(hierarchy.is_subtype(&join, "C").unwrap());
    }

    #[test]
    fn test_resolve_method_walks_to_the_root() {
        let hierarchy = sample_hierarchy();
        let (defining, descriptor) = hierarchy.resolve_method("B", "size").unwrap();
        assert_eq!(defining, "A");
        assert_eq!(descriptor.ret, "Int");

        let (defining, _) = hierarchy.resolve_method("B", "PRINT").unwrap();
        assert_eq!(defining, "Obj");
    }

    #[test]
    fn test_resolve_method_reports_missing() {
        let hierarchy = sample_hierarchy();
        let error = hierarchy.resolve_method("B", "volume").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MethodNotFound);
    }

    #[test]
    fn test_check_call_verifies_arity_and_types() {
        let hierarchy = sample_hierarchy();
        let ret = hierarchy.check_call("B", "size", &[]).unwrap();
        assert_eq!(ret, "Int");

        let error = hierarchy
            .check_call("B", "size", &["Int".to_owned()])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::ArityMismatch);

        let ret = hierarchy
            .check_call("B", "EQUALS", &["Int".to_owned()])
            .unwrap();
        assert_eq!(ret, "Boolean");

        let error = hierarchy
            .check_call("Obj", "EQUALS", &["Missing".to_owned()])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }

    #[test]
    fn test_duplicate_class_is_rejected() {
        let mut hierarchy = sample_hierarchy();
        let error = hierarchy
            .add_class(ClassDescriptor::new("A", "Obj", vec![], vec![]))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }

    #[test]
    fn test_missing_superclass_is_rejected() {
        let mut hierarchy = sample_hierarchy();
        let error = hierarchy
            .add_class(ClassDescriptor::new("D", "Ghost", vec![], vec![]))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }

    #[test]
    fn test_depth_counts_the_longest_chain() {
        let hierarchy = sample_hierarchy();
        assert_eq!(hierarchy.depth(), 3);
    }
}
