use pest::iterators::Pair;

use super::{ClassSignature, MethodDecl, Position, Rule, StatementBlock};
use crate::error::CompileError;
use crate::typechecker::TypeScope;

/// A whole class: signature, constructor statements, methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl<T> {
    pub signature: ClassSignature,
    pub constructor: StatementBlock<T>,
    pub methods: Vec<MethodDecl<T>>,
    /// Fixpointed constructor scope, filled in by the type checker. The
    /// `this.*` entries become the class's field list.
    pub ctor_scope: TypeScope,
    pub position: Position,
}

impl ClassDecl<()> {
    pub fn from_pair(pair: Pair<Rule>) -> Result<ClassDecl<()>, CompileError> {
        let position = pair.line_col();
        let mut signature = None;
        let mut constructor = None;
        let mut methods = vec![];

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::class_signature => signature = Some(ClassSignature::from_pair(inner)),
                Rule::constructor_block => constructor = Some(StatementBlock::from_pair(inner)?),
                Rule::method_block => {
                    for method in inner.into_inner() {
                        methods.push(MethodDecl::from_pair(method)?);
                    }
                }
                rule => unreachable!("unexpected rule {rule:?} in a class declaration"),
            }
        }

        let Some(signature) = signature else {
            unreachable!("a class always has a signature")
        };
        let Some(constructor) = constructor else {
            unreachable!("a class always has a constructor block")
        };

        Ok(ClassDecl {
            signature,
            constructor,
            methods,
            ctor_scope: TypeScope::default(),
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;

    #[test]
    fn test_class_splits_constructor_and_methods() {
        let source = r#"
            class Pt(a: Int, b: Int) extends Obj {
                this.x = a;
                this.y = b;
                def dist(): Int { return this.x * this.x + this.y * this.y; }
                def shift(dx: Int) { this.x.PRINT(); }
            }
        "#;
        let program = Program::parse(source).unwrap();
        assert_eq!(program.classes.len(), 1);

        let class = &program.classes[0];
        assert_eq!(class.signature.name, "Pt");
        assert_eq!(class.signature.super_class, "Obj");
        assert_eq!(class.signature.args.names(), ["a", "b"]);
        assert_eq!(class.constructor.statements.len(), 2);
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].name, "dist");
        assert_eq!(class.methods[0].ret_type, "Int");
        assert_eq!(class.methods[1].ret_type, "Nothing");
    }

    #[test]
    fn test_superclass_defaults_to_obj() {
        let program = Program::parse("class A() { }").unwrap();
        assert_eq!(program.classes[0].signature.super_class, "Obj");
    }
}
