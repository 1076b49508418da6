use crate::asm::{Instruction, LabelGenerator, Operand};
use crate::ast::{AssignTarget, Expression, If, Statement, StatementBlock, While};
use crate::typechecker::TypeInfo;

/// Emits instruction streams for typed statements and expressions.
///
/// `r_eval` leaves exactly one value on the operand stack, `c_eval` leaves
/// nothing and ends in a jump to one of two labels, `l_eval` consumes the
/// value on top of the stack into an assignable target.
pub struct CodeGen<'a> {
    labels: &'a mut LabelGenerator,
}

impl<'a> CodeGen<'a> {
    pub fn new(labels: &'a mut LabelGenerator) -> Self {
        Self { labels }
    }

    pub fn block(&mut self, block: &StatementBlock<TypeInfo>) -> Vec<Instruction> {
        self.statements(&block.statements)
    }

    pub fn statements(&mut self, statements: &[Statement<TypeInfo>]) -> Vec<Instruction> {
        let mut instructions = vec![];
        for statement in statements {
            instructions.append(&mut self.statement(statement));
        }
        instructions
    }

    pub fn statement(&mut self, statement: &Statement<TypeInfo>) -> Vec<Instruction> {
        match statement {
            Statement::Assignment(assignment) => {
                let mut instructions = self.r_eval(&assignment.value);
                instructions.append(&mut self.l_eval(&assignment.target));
                instructions
            }
            Statement::If(if_statement) => self.if_statement(if_statement),
            Statement::While(while_loop) => self.while_loop(while_loop),
            Statement::Return(ret) => {
                // The arity is filled in by the enclosing method.
                let mut instructions = self.r_eval(&ret.value);
                instructions.push(Instruction::Return(None));
                instructions
            }
            Statement::Expression(expression) => {
                let mut instructions = self.r_eval(expression);
                instructions.push(Instruction::Pop);
                instructions
            }
        }
    }

    fn if_statement(&mut self, if_statement: &If<TypeInfo>) -> Vec<Instruction> {
        let index = self.labels.next_index();
        let then_label = format!("then_{index}");
        let else_label = format!("else_{index}");
        let endif_label = format!("endif_{index}");

        let mut instructions = self.c_eval(&if_statement.condition, &then_label, &else_label);
        instructions.push(Instruction::Label(then_label));
        instructions.append(&mut self.block(&if_statement.then_block));
        instructions.push(Instruction::Jump(endif_label.clone()));
        instructions.push(Instruction::Label(else_label));
        if let Some(else_block) = &if_statement.else_block {
            instructions.append(&mut self.block(else_block));
        }
        instructions.push(Instruction::Label(endif_label));
        instructions
    }

    fn while_loop(&mut self, while_loop: &While<TypeInfo>) -> Vec<Instruction> {
        let index = self.labels.next_index();
        let head_label = format!("loop_head_{index}");
        let test_label = format!("loop_test_{index}");
        let done_label = format!("done_{index}");

        let mut instructions = vec![
            Instruction::Jump(test_label.clone()),
            Instruction::Label(head_label.clone()),
        ];
        instructions.append(&mut self.block(&while_loop.block));
        instructions.push(Instruction::Label(test_label));
        instructions.append(&mut self.c_eval(&while_loop.condition, &head_label, &done_label));
        instructions.push(Instruction::Label(done_label));
        instructions
    }

    /// Emit code that leaves the expression's value on the operand stack.
    pub fn r_eval(&mut self, expression: &Expression<TypeInfo>) -> Vec<Instruction> {
        match expression {
            Expression::IntLiteral(node) => vec![Instruction::Const(Operand::Int(node.value))],
            Expression::StringLiteral(node) => {
                vec![Instruction::Const(Operand::Str(node.value.clone()))]
            }
            Expression::BoolLiteral(node) => vec![Instruction::Const(Operand::Bool(node.value))],
            Expression::VarReference(var) => vec![Instruction::Load(var.name.clone())],
            Expression::ThisField(this_field) => vec![
                Instruction::Load("$".to_owned()),
                Instruction::LoadField {
                    class: "$".to_owned(),
                    field: this_field.field.clone(),
                },
            ],
            Expression::FieldReference(field) => {
                let mut instructions = self.r_eval(&field.object);
                instructions.push(Instruction::LoadField {
                    class: field.object.info().ty,
                    field: field.field.clone(),
                });
                instructions
            }
            Expression::MethodCall(call) => {
                // Receiver first, then arguments left to right; the callee
                // finds its last argument on top of the stack.
                let mut instructions = self.r_eval(&call.receiver);
                for arg in &call.args {
                    instructions.append(&mut self.r_eval(arg));
                }
                let Some(defining_class) = &call.defining_class else {
                    unreachable!("method call reached emission without being resolved")
                };
                instructions.push(Instruction::Call {
                    class: defining_class.clone(),
                    method: call.method.clone(),
                });
                instructions
            }
            Expression::ConstructorCall(call) => {
                let mut instructions = vec![];
                for arg in &call.args {
                    instructions.append(&mut self.r_eval(arg));
                }
                instructions.push(Instruction::New(call.class_name.clone()));
                instructions.push(Instruction::Call {
                    class: call.class_name.clone(),
                    method: "$constructor".to_owned(),
                });
                instructions
            }
            Expression::And(and) => {
                let mut instructions = self.r_eval(&and.lhs);
                instructions.append(&mut self.r_eval(&and.rhs));
                instructions.push(Instruction::Call {
                    class: "Boolean".to_owned(),
                    method: "AND".to_owned(),
                });
                instructions
            }
            Expression::Or(or) => {
                let mut instructions = self.r_eval(&or.lhs);
                instructions.append(&mut self.r_eval(&or.rhs));
                instructions.push(Instruction::Call {
                    class: "Boolean".to_owned(),
                    method: "OR".to_owned(),
                });
                instructions
            }
            Expression::Not(not) => {
                let mut instructions = self.r_eval(&not.operand);
                instructions.push(Instruction::Call {
                    class: "Boolean".to_owned(),
                    method: "NOT".to_owned(),
                });
                instructions
            }
            Expression::IsInstance(is_instance) => {
                let mut instructions = self.r_eval(&is_instance.object);
                instructions.push(Instruction::IsInstance(is_instance.class_name.clone()));
                instructions
            }
        }
    }

    /// Emit a conditional branch ending in a jump to one of the two labels.
    pub fn c_eval(
        &mut self,
        expression: &Expression<TypeInfo>,
        true_label: &str,
        false_label: &str,
    ) -> Vec<Instruction> {
        match expression {
            Expression::And(and) => {
                let continue_label = self.labels.fresh("and");
                let mut instructions = self.c_eval(&and.lhs, &continue_label, false_label);
                instructions.push(Instruction::Label(continue_label));
                instructions.append(&mut self.c_eval(&and.rhs, true_label, false_label));
                instructions
            }
            Expression::Or(or) => {
                let continue_label = self.labels.fresh("and");
                let mut instructions = self.c_eval(&or.lhs, true_label, &continue_label);
                instructions.push(Instruction::Label(continue_label));
                instructions.append(&mut self.c_eval(&or.rhs, true_label, false_label));
                instructions
            }
            Expression::Not(not) => self.c_eval(&not.operand, false_label, true_label),
            expression => {
                let mut instructions = self.r_eval(expression);
                instructions.push(Instruction::JumpIf(true_label.to_owned()));
                instructions.push(Instruction::Jump(false_label.to_owned()));
                instructions
            }
        }
    }

    /// Emit code that stores the value on top of the stack into the target.
    pub fn l_eval(&mut self, target: &AssignTarget<TypeInfo>) -> Vec<Instruction> {
        match target {
            AssignTarget::Var { name, .. } => vec![Instruction::Store(name.clone())],
            AssignTarget::ThisField { field, .. } => vec![
                Instruction::Load("$".to_owned()),
                Instruction::StoreField {
                    class: "$".to_owned(),
                    field: field.clone(),
                },
            ],
            AssignTarget::Field(field) => {
                let mut instructions = self.r_eval(&field.object);
                instructions.push(Instruction::StoreField {
                    class: field.object.info().ty,
                    field: field.field.clone(),
                });
                instructions
            }
        }
    }
}
