//! Type inference and checking for Quack.
//!
//! The checker rebuilds the untyped AST into a typed one, inferring a class
//! for every expression. Inference per scope carrier is an ascending join
//! over the subtype lattice, iterated to fixpoint: every assignment joins the
//! new type into the variable's binding via the least common ancestor, so
//! bindings only ever move up and the iteration terminates within the height
//! of the hierarchy. Classes are visited in topological order of inheritance
//! and registered in the hierarchy as soon as their constructor is checked.
mod info;
mod scope;

pub use self::info::TypeInfo;
pub use self::scope::TypeScope;

use log::debug;

use crate::ast::{
    AssignTarget, Assignment, BareBlock, ClassDecl, Expression, FieldReference, If, MethodDecl,
    Position, Program, ReturnStatement, Statement, StatementBlock, While,
};
use crate::checker::InitTable;
use crate::depgraph::DependencyGraph;
use crate::error::{CompileError, ErrorKind};
use crate::hierarchy::{ClassDescriptor, ClassHierarchy, MethodDescriptor};

/// Result of type checking a node within the AST.
type TResult<T> = Result<T, CompileError>;

struct CheckedStatements {
    statements: Vec<Statement<TypeInfo>>,
    /// The return type this sequence contributes to its enclosing method.
    ret_type: Option<String>,
    /// Names introduced by annotated assignments directly in this sequence;
    /// they are scoped to the block when it is a branch arm.
    declared: Vec<String>,
}

/// Struct for type checking a program against (and extending) a hierarchy.
pub struct Typechecker<'a> {
    hierarchy: &'a mut ClassHierarchy,
    init: &'a InitTable,
}

impl<'a> Typechecker<'a> {
    pub fn new(hierarchy: &'a mut ClassHierarchy, init: &'a InitTable) -> Self {
        Self { hierarchy, init }
    }

    /// Check the whole program and return it with type information attached.
    /// Classes come back in topological order of inheritance, which is also
    /// the emission order.
    pub fn check(&mut self, program: &Program<()>) -> TResult<Program<TypeInfo>> {
        let ordered = self.class_order(program);

        let mut classes = vec![];
        for class in ordered {
            classes.push(self.check_class(class)?);
        }

        let bare = self.check_bare(&program.bare)?;

        Ok(Program { classes, bare })
    }

    fn class_order<'p>(&self, program: &'p Program<()>) -> Vec<&'p ClassDecl<()>> {
        let mut graph = DependencyGraph::new();
        for class in &program.classes {
            graph.add_edge(&class.signature.super_class, &class.signature.name);
        }
        let order = graph.topological_sort();
        let position =
            |name: &str| order.iter().position(|v| v == name).unwrap_or(usize::MAX);

        let mut classes: Vec<&ClassDecl<()>> = program.classes.iter().collect();
        classes.sort_by_key(|class| position(&class.signature.name));
        classes
    }

    fn check_class(&mut self, class: &ClassDecl<()>) -> TResult<ClassDecl<TypeInfo>> {
        let signature = &class.signature;
        let class_name = &signature.name;
        debug!("type checking class '{class_name}'");

        if self.hierarchy.find_class(&signature.super_class).is_none() {
            return Err(CompileError::at(
                ErrorKind::InvalidType,
                format!(
                    "'{class_name}' specifies '{}' as its superclass but it does not exist",
                    signature.super_class
                ),
                signature.position,
            ));
        }
        for param in &signature.args.args {
            if self.hierarchy.find_class(&param.type_name).is_none() {
                return Err(CompileError::at(
                    ErrorKind::InvalidType,
                    format!(
                        "constructor parameter '{}' of '{class_name}' has unknown type '{}'",
                        param.name, param.type_name
                    ),
                    param.position,
                ));
            }
        }

        let Some(init_names) = self.init.constructors.get(class_name) else {
            unreachable!("definite-assignment ran before type checking")
        };
        let mut ctor_scope = TypeScope::new();
        for name in init_names {
            ctor_scope.seed(name);
        }
        for param in &signature.args.args {
            ctor_scope.bind(&param.name, param.type_name.clone());
        }

        let (ctor_statements, _) = self.fixpoint_statements(
            &class.constructor.statements,
            &mut ctor_scope,
            &format!("constructor of '{class_name}'"),
        )?;

        // The `this.*` entries of the settled constructor scope are the
        // class's fields, in assignment order.
        let mut fields: Vec<(String, String)> = vec![];
        for name in ctor_scope.names().to_vec() {
            if let Some(field) = name.strip_prefix("this.") {
                let Some(ty) = ctor_scope.lookup(&name) else {
                    unreachable!("field '{name}' settled without an inferred type")
                };
                fields.push((field.to_owned(), ty.to_owned()));
            }
        }

        // Every field of the superclass must be re-established compatibly.
        let Some(parent) = self.hierarchy.find_class(&signature.super_class) else {
            unreachable!("superclass existence was checked above")
        };
        let parent_fields = parent.fields.clone();
        for (parent_field, parent_type) in &parent_fields {
            let Some((_, own_type)) = fields.iter().find(|(name, _)| name == parent_field) else {
                return Err(CompileError::at(
                    ErrorKind::MissingSuperField,
                    format!(
                        "superclass '{}' defines field '{parent_field}' but '{class_name}' does not initialize it",
                        signature.super_class
                    ),
                    signature.position,
                ));
            };
            if !self.hierarchy.is_subtype(parent_type, own_type)? {
                return Err(CompileError::at(
                    ErrorKind::TypeMismatch,
                    format!(
                        "field '{parent_field}' of '{class_name}' is '{own_type}' but superclass '{}' declares it as '{parent_type}'",
                        signature.super_class
                    ),
                    signature.position,
                ));
            }
        }

        // Register the class before its method bodies (or even its method
        // signatures) are validated, so methods may mention their own class.
        let mut methods = vec![MethodDescriptor::new(
            "$constructor",
            signature.args.types(),
            class_name.clone(),
        )];
        for method in &class.methods {
            methods.push(MethodDescriptor::new(
                &method.name,
                method.args.types(),
                &method.ret_type,
            ));
        }

        self.hierarchy
            .add_class(ClassDescriptor::new(
                class_name.clone(),
                signature.super_class.clone(),
                fields.clone(),
                methods,
            ))
            .map_err(|error| error.with_position(signature.position))?;

        let mut typed_methods = vec![];
        for method in &class.methods {
            debug!("type checking method '{class_name}.{}'", method.name);
            for param in &method.args.args {
                if self.hierarchy.find_class(&param.type_name).is_none() {
                    return Err(CompileError::at(
                        ErrorKind::InvalidType,
                        format!(
                            "parameter '{}' of '{class_name}.{}' has unknown type '{}'",
                            param.name, method.name, param.type_name
                        ),
                        param.position,
                    ));
                }
            }
            if self.hierarchy.find_class(&method.ret_type).is_none() {
                return Err(CompileError::at(
                    ErrorKind::InvalidType,
                    format!(
                        "'{class_name}.{}' has unknown return type '{}'",
                        method.name, method.ret_type
                    ),
                    method.position,
                ));
            }
            self.check_override(class_name, &signature.super_class, method)?;
            let Some(init_names) = self
                .init
                .methods
                .get(&(class_name.clone(), method.name.clone()))
            else {
                unreachable!("definite-assignment ran before type checking")
            };

            let mut method_scope = TypeScope::new();
            for name in init_names {
                method_scope.seed(name);
            }
            for (field, ty) in &fields {
                method_scope.bind(&format!("this.{field}"), ty.clone());
            }
            for param in &method.args.args {
                method_scope.bind(&param.name, param.type_name.clone());
            }

            let (statements, ret_type) = self.fixpoint_statements(
                &method.block.statements,
                &mut method_scope,
                &format!("method '{class_name}.{}'", method.name),
            )?;

            match &ret_type {
                Some(ret) => {
                    if !self.hierarchy.is_subtype(&method.ret_type, ret)? {
                        return Err(CompileError::at(
                            ErrorKind::TypeMismatch,
                            format!(
                                "'{class_name}.{}' declares return type '{}' but returns '{ret}'",
                                method.name, method.ret_type
                            ),
                            method.position,
                        ));
                    }
                }
                None => {
                    if method.ret_type != "Obj" && method.ret_type != "Nothing" {
                        return Err(CompileError::at(
                            ErrorKind::TypeMismatch,
                            format!(
                                "'{class_name}.{}' declares return type '{}' but never returns",
                                method.name, method.ret_type
                            ),
                            method.position,
                        ));
                    }
                }
            }

            typed_methods.push(MethodDecl {
                name: method.name.clone(),
                args: method.args.clone(),
                ret_type: method.ret_type.clone(),
                block: StatementBlock {
                    statements,
                    position: method.block.position,
                },
                scope: method_scope,
                position: method.position,
            });
        }

        Ok(ClassDecl {
            signature: signature.clone(),
            constructor: StatementBlock {
                statements: ctor_statements,
                position: class.constructor.position,
            },
            methods: typed_methods,
            ctor_scope,
            position: class.position,
        })
    }

    /// Parameters are contravariant and the return type covariant with
    /// respect to an overridden superclass method.
    fn check_override(
        &self,
        class_name: &str,
        super_class: &str,
        method: &MethodDecl<()>,
    ) -> TResult<()> {
        let Ok((parent_class, parent)) = self.hierarchy.resolve_method(super_class, &method.name)
        else {
            return Ok(());
        };
        let parent_params = parent.params.clone();
        let parent_ret = parent.ret.clone();

        if parent_params.len() != method.args.len() {
            return Err(CompileError::at(
                ErrorKind::BadOverride,
                format!(
                    "'{class_name}.{}' overrides '{parent_class}.{}' with a different arity",
                    method.name, method.name
                ),
                method.position,
            ));
        }
        for (param, parent_param) in method.args.args.iter().zip(parent_params.iter()) {
            if !self.hierarchy.is_subtype(&param.type_name, parent_param)? {
                return Err(CompileError::at(
                    ErrorKind::BadOverride,
                    format!(
                        "parameter '{}' of '{class_name}.{}' must be a supertype of '{parent_param}' declared by '{parent_class}'",
                        param.name, method.name
                    ),
                    param.position,
                ));
            }
        }
        if !self.hierarchy.is_subtype(&parent_ret, &method.ret_type)? {
            return Err(CompileError::at(
                ErrorKind::BadOverride,
                format!(
                    "return type of '{class_name}.{}' must be a subtype of '{parent_ret}' declared by '{parent_class}'",
                    method.name
                ),
                method.position,
            ));
        }
        Ok(())
    }

    fn check_bare(&self, bare: &BareBlock<()>) -> TResult<BareBlock<TypeInfo>> {
        let mut scope = TypeScope::new();
        for name in &self.init.bare {
            scope.seed(name);
        }

        let (statements, _) =
            self.fixpoint_statements(&bare.statements, &mut scope, "the bare statement block")?;

        Ok(BareBlock { statements, scope })
    }

    /// Re-run inference over a carrier's statements until the scope settles.
    /// Monotone joins over a lattice of height `depth(hierarchy)` guarantee
    /// this takes at most `depth + 1` changing rounds; more is a bug.
    fn fixpoint_statements(
        &self,
        statements: &[Statement<()>],
        scope: &mut TypeScope,
        what: &str,
    ) -> TResult<(Vec<Statement<TypeInfo>>, Option<String>)> {
        let bound = self.hierarchy.depth() + 1;
        let mut round = 0;

        loop {
            round += 1;
            debug!("type inference for {what}: round {round}");
            let before = scope.snapshot();
            let checked = self.check_statements(statements, scope)?;

            if *scope == before {
                debug!("type inference for {what}: settled after {round} rounds");
                return Ok((checked.statements, checked.ret_type));
            }
            if round > bound {
                unreachable!("type inference for {what} did not stabilize within {bound} rounds");
            }
        }
    }

    fn check_statements(
        &self,
        statements: &[Statement<()>],
        scope: &mut TypeScope,
    ) -> TResult<CheckedStatements> {
        let mut typed = vec![];
        let mut ret_type: Option<String> = None;
        let mut declared = vec![];

        for statement in statements {
            let (statement, contributed) = self.check_statement(statement, scope, &mut declared)?;
            if let Some(contributed) = contributed {
                ret_type = Some(match ret_type {
                    Some(prior) => self.hierarchy.lca(&prior, &contributed)?,
                    None => contributed,
                });
            }
            typed.push(statement);
        }

        Ok(CheckedStatements {
            statements: typed,
            ret_type,
            declared,
        })
    }

    fn check_statement(
        &self,
        statement: &Statement<()>,
        scope: &mut TypeScope,
        declared: &mut Vec<String>,
    ) -> TResult<(Statement<TypeInfo>, Option<String>)> {
        match statement {
            Statement::Assignment(assignment) => Ok((
                Statement::Assignment(self.check_assignment(assignment, scope, declared)?),
                None,
            )),
            Statement::If(if_statement) => {
                let (if_statement, ret) = self.check_if(if_statement, scope)?;
                Ok((Statement::If(if_statement), ret))
            }
            Statement::While(while_loop) => {
                let (while_loop, ret) = self.check_while(while_loop, scope)?;
                Ok((Statement::While(while_loop), ret))
            }
            Statement::Return(ret) => {
                let value = self.check_expression(&ret.value, scope)?;
                let ty = value.info().ty;
                Ok((
                    Statement::Return(ReturnStatement {
                        value,
                        position: ret.position,
                    }),
                    Some(ty),
                ))
            }
            Statement::Expression(expression) => Ok((
                Statement::Expression(self.check_expression(expression, scope)?),
                None,
            )),
        }
    }

    fn check_assignment(
        &self,
        assignment: &Assignment<()>,
        scope: &mut TypeScope,
        declared: &mut Vec<String>,
    ) -> TResult<Assignment<TypeInfo>> {
        let value = self.check_expression(&assignment.value, scope)?;
        let actual = value.info().ty;

        let target = match &assignment.target {
            AssignTarget::Var { name, position } => {
                self.bind_target(
                    name,
                    &actual,
                    assignment.declared_type.as_deref(),
                    scope,
                    Some(declared),
                    *position,
                )?;
                AssignTarget::Var {
                    name: name.clone(),
                    position: *position,
                }
            }
            AssignTarget::ThisField { field, position } => {
                let key = format!("this.{field}");
                self.bind_target(
                    &key,
                    &actual,
                    assignment.declared_type.as_deref(),
                    scope,
                    None,
                    *position,
                )?;
                AssignTarget::ThisField {
                    field: field.clone(),
                    position: *position,
                }
            }
            AssignTarget::Field(field) => {
                let object = self.check_expression(&field.object, scope)?;
                let object_type = object.info().ty;
                let Some(descriptor) = self.hierarchy.find_class(&object_type) else {
                    unreachable!("inferred class '{object_type}' is not in the hierarchy")
                };
                let Some(field_type) = descriptor.field_type(&field.field) else {
                    return Err(CompileError::at(
                        ErrorKind::FieldNotFound,
                        format!("'{object_type}' has no field '{}'", field.field),
                        field.position,
                    ));
                };
                let field_type = field_type.to_owned();
                if !self.hierarchy.is_subtype(&field_type, &actual)? {
                    return Err(CompileError::at(
                        ErrorKind::TypeMismatch,
                        format!(
                            "can not assign '{actual}' to field '{}' of '{object_type}', which is declared as '{field_type}'",
                            field.field
                        ),
                        assignment.position,
                    ));
                }
                AssignTarget::Field(FieldReference {
                    object: Box::new(object),
                    field: field.field.clone(),
                    position: field.position,
                    info: TypeInfo::new(field_type),
                })
            }
        };

        Ok(Assignment {
            target,
            declared_type: assignment.declared_type.clone(),
            value,
            position: assignment.position,
        })
    }

    /// Join an assigned type into a variable binding, honoring a declared
    /// type when present. `declared` is the block-declaration record used to
    /// scope annotated bindings to branch arms; `this.*` keys never track it.
    fn bind_target(
        &self,
        name: &str,
        actual: &str,
        declared_type: Option<&str>,
        scope: &mut TypeScope,
        declared: Option<&mut Vec<String>>,
        position: Position,
    ) -> TResult<()> {
        let new_binding = match scope.binding(name) {
            Some(Some(prior)) => self.hierarchy.lca(&prior, actual)?,
            Some(None) => actual.to_owned(),
            None => {
                if declared_type.is_some() {
                    if let Some(declared) = declared {
                        declared.push(name.to_owned());
                    }
                }
                actual.to_owned()
            }
        };

        if let Some(declared_type) = declared_type {
            if self.hierarchy.find_class(declared_type).is_none() {
                return Err(CompileError::at(
                    ErrorKind::InvalidType,
                    format!("declared type '{declared_type}' is not a known class"),
                    position,
                ));
            }
            if !self.hierarchy.is_subtype(declared_type, &new_binding)? {
                return Err(CompileError::at(
                    ErrorKind::TypeMismatch,
                    format!("assignment declares '{declared_type}' but '{new_binding}' was inferred"),
                    position,
                ));
            }
            scope.bind(name, declared_type);
        } else {
            scope.bind(name, new_binding);
        }
        Ok(())
    }

    fn check_if(&self, if_statement: &If<()>, scope: &mut TypeScope) -> TResult<(If<TypeInfo>, Option<String>)> {
        let condition = self.check_expression(&if_statement.condition, scope)?;
        let condition_type = condition.info().ty;
        if condition_type != "Boolean" {
            return Err(CompileError::at(
                ErrorKind::TypeMismatch,
                format!("if condition must be a 'Boolean' but is a '{condition_type}'"),
                if_statement.condition.position(),
            ));
        }

        let mut then_scope = scope.snapshot();
        let then_checked =
            self.check_statements(&if_statement.then_block.statements, &mut then_scope)?;
        for name in &then_checked.declared {
            then_scope.remove(name);
        }
        let then_block = StatementBlock {
            statements: then_checked.statements,
            position: if_statement.then_block.position,
        };

        match &if_statement.else_block {
            None => {
                // A single arm adds no names; it can only lift existing ones.
                self.merge_branch(scope, &then_scope)?;
                Ok((
                    If {
                        condition,
                        then_block,
                        else_block: None,
                        position: if_statement.position,
                    },
                    then_checked.ret_type,
                ))
            }
            Some(else_block) => {
                let mut else_scope = scope.snapshot();
                let else_checked =
                    self.check_statements(&else_block.statements, &mut else_scope)?;
                for name in &else_checked.declared {
                    else_scope.remove(name);
                }

                self.merge_branches(scope, &then_scope, &else_scope)?;

                let ret_type = match (then_checked.ret_type, else_checked.ret_type) {
                    (Some(then_ret), Some(else_ret)) => Some(self.hierarchy.lca(&then_ret, &else_ret)?),
                    (Some(then_ret), None) => Some(then_ret),
                    (None, else_ret) => else_ret,
                };

                Ok((
                    If {
                        condition,
                        then_block,
                        else_block: Some(StatementBlock {
                            statements: else_checked.statements,
                            position: else_block.position,
                        }),
                        position: if_statement.position,
                    },
                    ret_type,
                ))
            }
        }
    }

    fn check_while(&self, while_loop: &While<()>, scope: &mut TypeScope) -> TResult<(While<TypeInfo>, Option<String>)> {
        let mut body_scope = scope.snapshot();
        let body_checked = self.check_statements(&while_loop.block.statements, &mut body_scope)?;

        // The body may not run at all: it refines existing bindings upward
        // but introduces nothing.
        self.merge_branch(scope, &body_scope)?;

        let condition = self.check_expression(&while_loop.condition, scope)?;
        let condition_type = condition.info().ty;
        if condition_type != "Boolean" {
            return Err(CompileError::at(
                ErrorKind::TypeMismatch,
                format!("while condition must be a 'Boolean' but is a '{condition_type}'"),
                while_loop.condition.position(),
            ));
        }

        Ok((
            While {
                condition,
                block: StatementBlock {
                    statements: body_checked.statements,
                    position: while_loop.block.position,
                },
                position: while_loop.position,
            },
            body_checked.ret_type,
        ))
    }

    /// Join a single speculative branch back into the outer scope: only
    /// names the outer scope already has are lifted.
    fn merge_branch(&self, outer: &mut TypeScope, branch: &TypeScope) -> TResult<()> {
        for name in branch.names().to_vec() {
            let Some(outer_binding) = outer.binding(&name) else {
                continue;
            };
            let Some(branch_binding) = branch.binding(&name) else {
                unreachable!("'{name}' was taken from the branch scope's own names")
            };
            if let Some(joined) = self.join(outer_binding, branch_binding)? {
                outer.bind(&name, joined);
            }
        }
        Ok(())
    }

    /// Join both arms of an if-else into the outer scope: the intersection of
    /// the two post-scopes, with the LCA taken elementwise.
    fn merge_branches(
        &self,
        outer: &mut TypeScope,
        then_scope: &TypeScope,
        else_scope: &TypeScope,
    ) -> TResult<()> {
        for name in then_scope.names().to_vec() {
            let Some(else_binding) = else_scope.binding(&name) else {
                continue;
            };
            let Some(then_binding) = then_scope.binding(&name) else {
                unreachable!("'{name}' was taken from the then scope's own names")
            };
            match self.join(then_binding, else_binding)? {
                Some(joined) => outer.bind(&name, joined),
                None => outer.seed(&name),
            }
        }
        Ok(())
    }

    /// LCA lifted over bottom: an absent type is below everything.
    fn join(&self, a: Option<String>, b: Option<String>) -> TResult<Option<String>> {
        match (a, b) {
            (Some(a), Some(b)) => Ok(Some(self.hierarchy.lca(&a, &b)?)),
            (Some(a), None) => Ok(Some(a)),
            (None, b) => Ok(b),
        }
    }

    fn check_expression(&self, expression: &Expression<()>, scope: &TypeScope) -> TResult<Expression<TypeInfo>> {
        use crate::ast::{
            And, BoolLiteral, ConstructorCall, IntLiteral, IsInstance, MethodCall, Not, Or,
            StringLiteral, ThisFieldReference, VarReference,
        };

        Ok(match expression {
            Expression::IntLiteral(node) => Expression::IntLiteral(IntLiteral {
                value: node.value,
                position: node.position,
                info: TypeInfo::new("Int"),
            }),
            Expression::StringLiteral(node) => Expression::StringLiteral(StringLiteral {
                value: node.value.clone(),
                position: node.position,
                info: TypeInfo::new("String"),
            }),
            Expression::BoolLiteral(node) => Expression::BoolLiteral(BoolLiteral {
                value: node.value,
                position: node.position,
                info: TypeInfo::new("Boolean"),
            }),
            Expression::VarReference(var) => match scope.binding(&var.name) {
                Some(Some(ty)) => Expression::VarReference(VarReference {
                    name: var.name.clone(),
                    position: var.position,
                    info: TypeInfo::new(ty),
                }),
                Some(None) => {
                    unreachable!("'{}' passed definite assignment but has no type", var.name)
                }
                None => {
                    return Err(CompileError::at(
                        ErrorKind::UseBeforeInit,
                        format!("'{}' is referenced before assignment", var.name),
                        var.position,
                    ))
                }
            },
            Expression::ThisField(this_field) => {
                let key = format!("this.{}", this_field.field);
                match scope.binding(&key) {
                    Some(Some(ty)) => Expression::ThisField(ThisFieldReference {
                        field: this_field.field.clone(),
                        position: this_field.position,
                        info: TypeInfo::new(ty),
                    }),
                    Some(None) => {
                        unreachable!("'{key}' passed definite assignment but has no type")
                    }
                    None => {
                        return Err(CompileError::at(
                            ErrorKind::UseBeforeInit,
                            format!("'{key}' is referenced before assignment"),
                            this_field.position,
                        ))
                    }
                }
            }
            Expression::FieldReference(field) => {
                let object = self.check_expression(&field.object, scope)?;
                let object_type = object.info().ty;
                let Some(descriptor) = self.hierarchy.find_class(&object_type) else {
                    unreachable!("inferred class '{object_type}' is not in the hierarchy")
                };
                let Some(field_type) = descriptor.field_type(&field.field) else {
                    return Err(CompileError::at(
                        ErrorKind::FieldNotFound,
                        format!("'{object_type}' has no field '{}'", field.field),
                        field.position,
                    ));
                };
                let info = TypeInfo::new(field_type);
                Expression::FieldReference(FieldReference {
                    object: Box::new(object),
                    field: field.field.clone(),
                    position: field.position,
                    info,
                })
            }
            Expression::MethodCall(call) => {
                let receiver = self.check_expression(&call.receiver, scope)?;
                let receiver_type = receiver.info().ty;

                let mut args = vec![];
                let mut arg_types = vec![];
                for arg in &call.args {
                    let arg = self.check_expression(arg, scope)?;
                    arg_types.push(arg.info().ty);
                    args.push(arg);
                }

                let (defining_class, _) = self
                    .hierarchy
                    .resolve_method(&receiver_type, &call.method)
                    .map_err(|error| error.with_position(call.position))?;
                let ret = self
                    .hierarchy
                    .check_call(&receiver_type, &call.method, &arg_types)
                    .map_err(|error| error.with_position(call.position))?;

                Expression::MethodCall(MethodCall {
                    receiver: Box::new(receiver),
                    method: call.method.clone(),
                    args,
                    defining_class: Some(defining_class),
                    position: call.position,
                    info: TypeInfo::new(ret),
                })
            }
            Expression::ConstructorCall(call) => {
                if self.hierarchy.find_class(&call.class_name).is_none() {
                    return Err(CompileError::at(
                        ErrorKind::InvalidType,
                        format!("'{}' is not a known class", call.class_name),
                        call.position,
                    ));
                }

                let mut args = vec![];
                let mut arg_types = vec![];
                for arg in &call.args {
                    let arg = self.check_expression(arg, scope)?;
                    arg_types.push(arg.info().ty);
                    args.push(arg);
                }

                self.hierarchy
                    .check_call(&call.class_name, "$constructor", &arg_types)
                    .map_err(|error| error.with_position(call.position))?;

                Expression::ConstructorCall(ConstructorCall {
                    class_name: call.class_name.clone(),
                    args,
                    position: call.position,
                    info: TypeInfo::new(call.class_name.clone()),
                })
            }
            Expression::And(and) => {
                let lhs = self.check_expression(&and.lhs, scope)?;
                let rhs = self.check_expression(&and.rhs, scope)?;
                self.require_boolean("and", &lhs)?;
                self.require_boolean("and", &rhs)?;
                Expression::And(And {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    position: and.position,
                    info: TypeInfo::new("Boolean"),
                })
            }
            Expression::Or(or) => {
                let lhs = self.check_expression(&or.lhs, scope)?;
                let rhs = self.check_expression(&or.rhs, scope)?;
                self.require_boolean("or", &lhs)?;
                self.require_boolean("or", &rhs)?;
                Expression::Or(Or {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    position: or.position,
                    info: TypeInfo::new("Boolean"),
                })
            }
            Expression::Not(not) => {
                let operand = self.check_expression(&not.operand, scope)?;
                self.require_boolean("not", &operand)?;
                Expression::Not(Not {
                    operand: Box::new(operand),
                    position: not.position,
                    info: TypeInfo::new("Boolean"),
                })
            }
            Expression::IsInstance(is_instance) => {
                let object = self.check_expression(&is_instance.object, scope)?;
                if self.hierarchy.find_class(&is_instance.class_name).is_none() {
                    return Err(CompileError::at(
                        ErrorKind::InvalidType,
                        format!("'{}' is not a known class", is_instance.class_name),
                        is_instance.position,
                    ));
                }
                Expression::IsInstance(IsInstance {
                    object: Box::new(object),
                    class_name: is_instance.class_name.clone(),
                    position: is_instance.position,
                    info: TypeInfo::new("Boolean"),
                })
            }
        })
    }

    fn require_boolean(&self, operator: &str, operand: &Expression<TypeInfo>) -> TResult<()> {
        let ty = operand.info().ty;
        if ty != "Boolean" {
            return Err(CompileError::at(
                ErrorKind::TypeMismatch,
                format!("operands of '{operator}' must be 'Boolean' but got '{ty}'"),
                operand.position(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use crate::checker::check_program;
    use crate::hierarchy::load_builtins;

    const CATALOG: &str = include_str!("../../builtinclass.json");

    fn typecheck(source: &str) -> Result<(Program<TypeInfo>, ClassHierarchy), CompileError> {
        let program = Program::parse(source).unwrap();
        let init = check_program(&program)?;
        let mut hierarchy = load_builtins(CATALOG).unwrap();
        let mut typechecker = Typechecker::new(&mut hierarchy, &init);
        let typed = typechecker.check(&program)?;
        Ok((typed, hierarchy))
    }

    #[test]
    fn test_arithmetic_infers_int() {
        let (typed, _) = typecheck("x: Int = 3 + 4 * 2;").unwrap();
        assert_eq!(typed.bare.scope.lookup("x"), Some("Int"));
    }

    #[test]
    fn test_branch_join_is_the_lca() {
        let source = r#"
            class A() { }
            class B() extends A { this.x = 1; }
            class C() extends A { this.x = 2; }
            if true { v = B(); } else { v = C(); }
            v.PRINT();
        "#;
        let (typed, _) = typecheck(source).unwrap();
        assert_eq!(typed.bare.scope.lookup("v"), Some("A"));
    }

    #[test]
    fn test_while_inference_is_stable() {
        let (typed, _) = typecheck("n: Int = 10; while n > 0 { n = n - 1; }").unwrap();
        assert_eq!(typed.bare.scope.lookup("n"), Some("Int"));
    }

    #[test]
    fn test_defining_class_is_recorded_for_inherited_methods() {
        let (typed, _) = typecheck("x = 1; x.PRINT(); x.STR();").unwrap();
        let Statement::Expression(Expression::MethodCall(print)) = &typed.bare.statements[1]
        else {
            panic!("expected a method call")
        };
        // PRINT is redefined on Int itself.
        assert_eq!(print.defining_class.as_deref(), Some("Int"));

        let source = r#"
            class A() { }
            a = A();
            a.PRINT();
        "#;
        let (typed, _) = typecheck(source).unwrap();
        let Statement::Expression(Expression::MethodCall(print)) = &typed.bare.statements[1]
        else {
            panic!("expected a method call")
        };
        assert_eq!(print.defining_class.as_deref(), Some("Obj"));
    }

    #[test]
    fn test_method_not_found() {
        let error = typecheck("x = 1; x.FOO();").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MethodNotFound);
    }

    #[test]
    fn test_arity_mismatch() {
        let error = typecheck("x = 1; x.PLUS();").unwrap_err();
        assert_eq!(error.kind, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_argument_type_mismatch() {
        let error = typecheck("x = 1; y = x.PLUS(true);").unwrap_err();
        assert_eq!(error.kind, ErrorKind::ArgumentTypeMismatch);
    }

    #[test]
    fn test_declared_type_rejects_incompatible_value() {
        let error = typecheck(r#"x: Int = "a";"#).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_unknown_declared_type() {
        let error = typecheck("x: Ghost = 1;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }

    #[test]
    fn test_field_not_found() {
        let source = r#"
            class Pt(a: Int) { this.x = a; }
            p = Pt(3);
            p.z;
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::FieldNotFound);
    }

    #[test]
    fn test_field_reference_types_resolve() {
        let source = r#"
            class Pt(a: Int) { this.x = a; }
            p = Pt(3);
            y = p.x;
        "#;
        let (typed, _) = typecheck(source).unwrap();
        assert_eq!(typed.bare.scope.lookup("y"), Some("Int"));
    }

    #[test]
    fn test_bad_override_narrows_a_parameter() {
        let source = r#"
            class A() { def m(x: Obj): Int { return 1; } }
            class B() extends A { def m(x: Int): Int { return 2; } }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::BadOverride);
    }

    #[test]
    fn test_bad_override_widens_the_return() {
        let source = r#"
            class A() { def m(): Int { return 1; } }
            class B() extends A { def m(): Obj { return 2; } }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::BadOverride);
    }

    #[test]
    fn test_widening_a_parameter_is_a_legal_override() {
        let source = r#"
            class A() { def m(x: Int): Obj { return 1; } }
            class B() extends A { def m(x: Obj): Int { return 2; } }
        "#;
        assert!(typecheck(source).is_ok());
    }

    #[test]
    fn test_missing_super_field() {
        let source = r#"
            class A() { this.x = 1; }
            class B() extends A { }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MissingSuperField);
    }

    #[test]
    fn test_incompatible_super_field() {
        let source = r#"
            class A() { this.x = 1; }
            class B() extends A { this.x = "a"; }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_classes_are_checked_in_inheritance_order() {
        let source = r#"
            class B() extends A { this.x = 2; }
            class A() { this.x = 1; }
        "#;
        let (typed, _) = typecheck(source).unwrap();
        assert_eq!(typed.classes[0].signature.name, "A");
        assert_eq!(typed.classes[1].signature.name, "B");
    }

    #[test]
    fn test_typecase_binder_is_scoped_to_its_arm() {
        let source = r#"
            x = 1;
            typecase x {
                a: Int { y = a.PLUS(1); }
            }
        "#;
        let (typed, _) = typecheck(source).unwrap();
        assert!(!typed.bare.scope.contains("a"));
        assert!(!typed.bare.scope.contains("y"));
        assert_eq!(typed.bare.scope.lookup("x"), Some("Int"));
    }

    #[test]
    fn test_boolean_operands_are_required() {
        let error = typecheck("x = 1; b = x and true;").unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let error = typecheck("if 1 { x = 1; }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_method_return_type_is_checked() {
        let source = r#"
            class A() { def m(): Int { return "a"; } }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_method_without_return_must_declare_nothing_or_obj() {
        let error = typecheck("class A() { def m(): Int { x = 1; } }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeMismatch);

        assert!(typecheck("class A() { def m() { x = 1; } }").is_ok());
        assert!(typecheck("class A() { def m(): Obj { x = 1; } }").is_ok());
    }

    #[test]
    fn test_constructor_scope_records_fields_in_order() {
        let source = r#"
            class Pt(a: Int, b: Int) { this.x = a; this.y = b; }
        "#;
        let (_, hierarchy) = typecheck(source).unwrap();
        let pt = hierarchy.find_class("Pt").unwrap();
        let field_names: Vec<&str> = pt.fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(field_names, ["x", "y"]);
    }

    #[test]
    fn test_unknown_superclass() {
        let error = typecheck("class A() extends Ghost { }").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }

    #[test]
    fn test_inheritance_cycle_is_rejected() {
        let source = r#"
            class A() extends B { }
            class B() extends A { }
        "#;
        let error = typecheck(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidType);
    }
}
