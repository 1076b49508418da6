use std::collections::HashMap;

/// An insertion-ordered variable scope.
///
/// Keys are plain names, constructor/method parameters, or `this.field`
/// entries. A binding of `None` means the name is definitely assigned
/// somewhere in the carrier but no type has been inferred yet (the bottom of
/// the subtype lattice). Order is preserved so `.field` and `.local`
/// declarations come out deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeScope {
    names: Vec<String>,
    bindings: HashMap<String, Option<String>>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name with no inferred type yet. Existing bindings are kept.
    pub fn seed(&mut self, name: &str) {
        if !self.bindings.contains_key(name) {
            self.names.push(name.to_owned());
            self.bindings.insert(name.to_owned(), None);
        }
    }

    /// Bind a name to a type, inserting the name if it is new.
    pub fn bind(&mut self, name: &str, ty: impl Into<String>) {
        if !self.bindings.contains_key(name) {
            self.names.push(name.to_owned());
        }
        self.bindings.insert(name.to_owned(), Some(ty.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// The inferred type of a name, if one has been assigned.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).and_then(|binding| binding.as_deref())
    }

    /// The raw binding: `None` if the name is unknown, `Some(None)` while the
    /// name is still at bottom.
    pub fn binding(&self, name: &str) -> Option<Option<String>> {
        self.bindings.get(name).cloned()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn remove(&mut self, name: &str) {
        self.names.retain(|n| n != name);
        self.bindings.remove(name);
    }

    /// Copy of the scope for speculative checking of a branch.
    pub fn snapshot(&self) -> TypeScope {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut scope = TypeScope::new();
        scope.bind("b", "Int");
        scope.seed("a");
        scope.bind("c", "String");
        assert_eq!(scope.names(), ["b", "a", "c"]);
    }

    #[test]
    fn test_seed_keeps_existing_binding() {
        let mut scope = TypeScope::new();
        scope.bind("x", "Int");
        scope.seed("x");
        assert_eq!(scope.lookup("x"), Some("Int"));
        assert_eq!(scope.names().len(), 1);
    }

    #[test]
    fn test_bottom_binding_is_distinguished_from_missing() {
        let mut scope = TypeScope::new();
        scope.seed("x");
        assert!(scope.contains("x"));
        assert_eq!(scope.lookup("x"), None);
        assert_eq!(scope.binding("x"), Some(None));
        assert_eq!(scope.binding("y"), None);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut scope = TypeScope::new();
        scope.bind("x", "Int");
        let mut copy = scope.snapshot();
        copy.bind("x", "Obj");
        copy.bind("y", "Int");
        assert_eq!(scope.lookup("x"), Some("Int"));
        assert!(!scope.contains("y"));
    }
}
