//! Definite-assignment pass.
//!
//! One traversal over the untyped AST that computes, for every scope carrier
//! (constructor, method, bare block), the set of names that are surely
//! initialized on every path. The snapshots seed the type checker's scopes.
use std::collections::HashMap;

use log::debug;

use crate::ast::{
    AssignTarget, Assignment, ClassDecl, Expression, If, Program, Statement, While,
};
use crate::error::{CompileError, ErrorKind};

/// Ordered set of names that are surely initialized at a program point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitSet {
    names: Vec<String>,
}

impl InitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_owned());
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.names.retain(|n| n != name);
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    /// Names present in both sets, in this set's order.
    fn intersect(&self, other: &InitSet) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| other.contains(name))
            .cloned()
            .collect()
    }
}

/// Definite-assignment snapshots per scope carrier.
#[derive(Debug, Default)]
pub struct InitTable {
    /// Class name → names initialized at the end of its constructor.
    pub constructors: HashMap<String, Vec<String>>,
    /// (class name, method name) → names initialized in the method scope.
    pub methods: HashMap<(String, String), Vec<String>>,
    /// Names initialized in the bare statement block.
    pub bare: Vec<String>,
}

pub fn check_program(program: &Program<()>) -> Result<InitTable, CompileError> {
    let mut table = InitTable::default();

    for class in &program.classes {
        check_class(class, &mut table)?;
    }

    let mut bare = InitSet::new();
    let mut declared = vec![];
    check_statements(&program.bare.statements, &mut bare, false, &mut declared)?;
    table.bare = bare.into_names();

    Ok(table)
}

fn check_class(class: &ClassDecl<()>, table: &mut InitTable) -> Result<(), CompileError> {
    let class_name = &class.signature.name;
    debug!("definite-assignment check for class '{class_name}'");

    let mut ctor = InitSet::new();
    for name in class.signature.args.names() {
        ctor.insert(&name);
    }
    let mut declared = vec![];
    check_statements(&class.constructor.statements, &mut ctor, true, &mut declared)?;

    // Fields accumulated by the constructor seed every method scope.
    let mut method_base = InitSet::new();
    for name in ctor.names() {
        if name.starts_with("this.") {
            method_base.insert(name);
        }
    }

    table
        .constructors
        .insert(class_name.clone(), ctor.into_names());

    for method in &class.methods {
        let mut scope = method_base.clone();
        for name in method.args.names() {
            scope.insert(&name);
        }
        let mut declared = vec![];
        check_statements(&method.block.statements, &mut scope, false, &mut declared)?;
        table
            .methods
            .insert((class_name.clone(), method.name.clone()), scope.into_names());
    }

    Ok(())
}

fn check_statements(
    statements: &[Statement<()>],
    set: &mut InitSet,
    in_ctor: bool,
    declared: &mut Vec<String>,
) -> Result<(), CompileError> {
    for statement in statements {
        check_statement(statement, set, in_ctor, declared)?;
    }
    Ok(())
}

fn check_statement(
    statement: &Statement<()>,
    set: &mut InitSet,
    in_ctor: bool,
    declared: &mut Vec<String>,
) -> Result<(), CompileError> {
    match statement {
        Statement::Assignment(assignment) => check_assignment(assignment, set, in_ctor, declared),
        Statement::If(if_statement) => check_if(if_statement, set, in_ctor),
        Statement::While(while_loop) => check_while(while_loop, set, in_ctor),
        Statement::Return(ret) => {
            if in_ctor {
                return Err(CompileError::at(
                    ErrorKind::ReturnInCtor,
                    "'return' is not allowed inside a constructor block",
                    ret.position,
                ));
            }
            check_expression(&ret.value, set)
        }
        Statement::Expression(expression) => check_expression(expression, set),
    }
}

fn check_assignment(
    assignment: &Assignment<()>,
    set: &mut InitSet,
    in_ctor: bool,
    declared: &mut Vec<String>,
) -> Result<(), CompileError> {
    // The right side is checked against the set before the target joins it.
    check_expression(&assignment.value, set)?;

    match &assignment.target {
        AssignTarget::Var { name, .. } => {
            if assignment.declared_type.is_some() && !set.contains(name) {
                declared.push(name.clone());
            }
            set.insert(name);
        }
        AssignTarget::ThisField { field, position } => {
            if !in_ctor {
                return Err(CompileError::at(
                    ErrorKind::AssignFieldOutsideCtor,
                    format!("field 'this.{field}' can only be assigned inside the constructor"),
                    *position,
                ));
            }
            set.insert(&format!("this.{field}"));
        }
        AssignTarget::Field(field) => check_expression(&field.object, set)?,
    }

    Ok(())
}

fn check_if(if_statement: &If<()>, set: &mut InitSet, in_ctor: bool) -> Result<(), CompileError> {
    check_expression(&if_statement.condition, set)?;

    let mut after_then = set.clone();
    let mut declared_then = vec![];
    check_statements(
        &if_statement.then_block.statements,
        &mut after_then,
        in_ctor,
        &mut declared_then,
    )?;
    // Declarations are scoped to their arm.
    for name in &declared_then {
        after_then.remove(name);
    }

    match &if_statement.else_block {
        // A single arm guarantees nothing: the post-set is the pre-set.
        None => {}
        Some(else_block) => {
            let mut after_else = set.clone();
            let mut declared_else = vec![];
            check_statements(
                &else_block.statements,
                &mut after_else,
                in_ctor,
                &mut declared_else,
            )?;
            for name in &declared_else {
                after_else.remove(name);
            }

            // A name survives iff both arms initialize it.
            for name in after_then.intersect(&after_else) {
                set.insert(&name);
            }
        }
    }

    Ok(())
}

fn check_while(while_loop: &While<()>, set: &mut InitSet, in_ctor: bool) -> Result<(), CompileError> {
    check_expression(&while_loop.condition, set)?;

    // The body may run zero times, so nothing it binds survives.
    let mut after_block = set.clone();
    let mut declared_in_block = vec![];
    check_statements(
        &while_loop.block.statements,
        &mut after_block,
        in_ctor,
        &mut declared_in_block,
    )?;

    Ok(())
}

fn check_expression(expression: &Expression<()>, set: &InitSet) -> Result<(), CompileError> {
    match expression {
        Expression::IntLiteral(_) | Expression::StringLiteral(_) | Expression::BoolLiteral(_) => {
            Ok(())
        }
        Expression::VarReference(var) => {
            if set.contains(&var.name) {
                Ok(())
            } else {
                Err(CompileError::at(
                    ErrorKind::UseBeforeInit,
                    format!("'{}' is referenced before assignment", var.name),
                    var.position,
                ))
            }
        }
        Expression::ThisField(this_field) => {
            let key = format!("this.{}", this_field.field);
            if set.contains(&key) {
                Ok(())
            } else {
                Err(CompileError::at(
                    ErrorKind::UseBeforeInit,
                    format!("'{key}' is referenced before assignment"),
                    this_field.position,
                ))
            }
        }
        Expression::FieldReference(field) => check_expression(&field.object, set),
        Expression::MethodCall(call) => {
            check_expression(&call.receiver, set)?;
            for arg in &call.args {
                check_expression(arg, set)?;
            }
            Ok(())
        }
        Expression::ConstructorCall(call) => {
            for arg in &call.args {
                check_expression(arg, set)?;
            }
            Ok(())
        }
        Expression::And(and) => {
            check_expression(&and.lhs, set)?;
            check_expression(&and.rhs, set)
        }
        Expression::Or(or) => {
            check_expression(&or.lhs, set)?;
            check_expression(&or.rhs, set)
        }
        Expression::Not(not) => check_expression(&not.operand, set),
        Expression::IsInstance(is_instance) => check_expression(&is_instance.object, set),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;

    fn check(source: &str) -> Result<InitTable, CompileError> {
        check_program(&Program::parse(source).unwrap())
    }

    #[test]
    fn test_use_before_assignment_is_rejected() {
        let error = check("y = x;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_self_reference_in_first_assignment_is_rejected() {
        let error = check("x = x;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_single_if_guarantees_nothing() {
        let error = check("if true { x = 1; } y = x;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_both_arms_guarantee_a_binding() {
        let table = check("if true { x = 1; } else { x = 2; } y = x;").unwrap();
        assert!(table.bare.contains(&"x".to_owned()));
        assert!(table.bare.contains(&"y".to_owned()));
    }

    #[test]
    fn test_declared_bindings_stay_in_their_arm() {
        // Both arms bind x, but with declarations, so neither escapes.
        let error =
            check("if true { x: Int = 1; } else { x: String = \"a\"; } y = x;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_while_bindings_do_not_escape() {
        let error = check("b = true; while b { x = 1; } y = x;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_while_condition_is_checked() {
        let error = check("while b { b = false; }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_call_arguments_are_checked() {
        let error = check("x = 1; x.PLUS(y);").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }

    #[test]
    fn test_return_in_constructor_is_rejected() {
        let error = check("class A() { return 1; }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::ReturnInCtor);
    }

    #[test]
    fn test_field_assignment_outside_constructor_is_rejected() {
        let error = check("class A() { this.x = 1; def poke() { this.x = 2; } }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::AssignFieldOutsideCtor);
    }

    #[test]
    fn test_method_scope_sees_fields_and_params() {
        let table = check(
            "class A(n: Int) { this.x = n; def get(d: Int): Int { y = d; return this.x; } }",
        )
        .unwrap();
        let method = &table.methods[&("A".to_owned(), "get".to_owned())];
        assert!(method.contains(&"this.x".to_owned()));
        assert!(method.contains(&"d".to_owned()));
        assert!(method.contains(&"y".to_owned()));
    }

    #[test]
    fn test_constructor_snapshot_has_params_first() {
        let table = check("class A(n: Int) { this.x = n; z = 1; }").unwrap();
        let ctor = &table.constructors["A"];
        assert_eq!(ctor, &["n", "this.x", "z"]);
    }

    #[test]
    fn test_field_use_before_assignment_in_ctor() {
        let error = check("class A() { y = this.x; this.x = 1; }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UseBeforeInit);
    }
}
