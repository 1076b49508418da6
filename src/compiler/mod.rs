//! Code emission for type-correct Quack programs.
//!
//! Every class becomes one assembly module and the bare statements become a
//! synthetic main module. You should run the definite-assignment and type
//! checking passes beforehand; [`compile`] wires the whole middle end
//! together.
mod codegen;

pub use self::codegen::CodeGen;

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use log::{debug, info};

use crate::asm::{Instruction, LabelGenerator, Operand};
use crate::ast::{BareBlock, ClassDecl, MethodDecl, Program};
use crate::checker::check_program;
use crate::error::CompileError;
use crate::hierarchy::ClassHierarchy;
use crate::typechecker::{TypeInfo, TypeScope, Typechecker};

/// One emitted assembly module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl Module {
    /// The textual form the downstream assembler consumes.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for instruction in &self.instructions {
            text.push_str(&instruction.to_string());
            text.push('\n');
        }
        text
    }
}

/// Run the whole middle end: parse, definite assignment, type check, emit.
pub fn compile(
    source: &str,
    hierarchy: &mut ClassHierarchy,
    main_name: &str,
) -> Result<Vec<Module>, CompileError> {
    let program = Program::parse(source)?;
    let init = check_program(&program)?;
    let typed = Typechecker::new(hierarchy, &init).check(&program)?;
    let mut compiler = Compiler::new(hierarchy);
    Ok(compiler.compile_program(&typed, main_name))
}

pub struct Compiler<'a> {
    hierarchy: &'a ClassHierarchy,
    labels: LabelGenerator,
}

impl<'a> Compiler<'a> {
    pub fn new(hierarchy: &'a ClassHierarchy) -> Self {
        Self {
            hierarchy,
            labels: LabelGenerator::new(),
        }
    }

    /// Emit one module per class (already in inheritance order) plus the
    /// synthetic main module, which always comes last.
    pub fn compile_program(&mut self, program: &Program<TypeInfo>, main_name: &str) -> Vec<Module> {
        let mut modules = vec![];
        for class in &program.classes {
            modules.push(self.compile_class(class));
        }
        modules.push(self.compile_main(&program.bare, main_name));
        modules
    }

    fn compile_class(&mut self, class: &ClassDecl<TypeInfo>) -> Module {
        let class_name = &class.signature.name;
        debug!("emitting module for class '{class_name}'");

        let mut instructions = vec![Instruction::Class {
            name: class_name.clone(),
            super_class: class.signature.super_class.clone(),
        }];

        let Some(descriptor) = self.hierarchy.find_class(class_name) else {
            unreachable!("class '{class_name}' was type checked but never registered")
        };
        for (field, _) in &descriptor.fields {
            instructions.push(Instruction::Field(field.clone()));
        }
        for method in &class.methods {
            instructions.push(Instruction::MethodForward(method.name.clone()));
        }

        instructions.push(Instruction::Method("$constructor".to_owned()));
        let params = class.signature.args.names();
        if !params.is_empty() {
            instructions.push(Instruction::Args(params.clone()));
        }

        let mut codegen = CodeGen::new(&mut self.labels);
        let body = codegen.block(&class.constructor);
        let locals = local_declaration(&class.ctor_scope, &params, &body);
        if !locals.is_empty() {
            instructions.push(Instruction::Local(locals));
        }
        instructions.extend(body);
        instructions.push(Instruction::Load("$".to_owned()));
        instructions.push(Instruction::Return(Some(params.len())));

        for method in &class.methods {
            instructions.append(&mut self.compile_method(method));
        }

        Module {
            name: class_name.clone(),
            instructions: rewrite_self_references(class_name, instructions),
        }
    }

    fn compile_method(&mut self, method: &MethodDecl<TypeInfo>) -> Vec<Instruction> {
        let mut instructions = vec![Instruction::Method(method.name.clone())];
        let params = method.args.names();
        if !params.is_empty() {
            instructions.push(Instruction::Args(params.clone()));
        }

        let mut codegen = CodeGen::new(&mut self.labels);
        let mut body = codegen.block(&method.block);

        let locals = local_declaration(&method.scope, &params, &body);
        if !locals.is_empty() {
            instructions.push(Instruction::Local(locals));
        }

        // Either rewrite the arity of existing returns, or fall off the end
        // with a nothing value.
        let arity = params.len();
        if body
            .iter()
            .any(|instruction| matches!(instruction, Instruction::Return(_)))
        {
            fill_return_arity(&mut body, arity);
        } else {
            body.push(Instruction::Const(Operand::Nothing));
            body.push(Instruction::Return(Some(arity)));
        }

        instructions.extend(body);
        instructions
    }

    fn compile_main(&mut self, bare: &BareBlock<TypeInfo>, main_name: &str) -> Module {
        let name = format!("{main_name}_main");
        debug!("emitting main module '{name}'");

        let mut instructions = vec![
            Instruction::Class {
                name: name.clone(),
                super_class: "Obj".to_owned(),
            },
            Instruction::Method("$constructor".to_owned()),
        ];

        let mut codegen = CodeGen::new(&mut self.labels);
        let mut body = codegen.statements(&bare.statements);

        let locals = local_declaration(&bare.scope, &[], &body);
        if !locals.is_empty() {
            instructions.push(Instruction::Local(locals));
        }

        // A return inside the bare block is legal and takes no arguments.
        fill_return_arity(&mut body, 0);
        instructions.extend(body);
        instructions.push(Instruction::Const(Operand::Nothing));
        instructions.push(Instruction::Return(Some(0)));

        Module { name, instructions }
    }
}

/// The `.local` list of a body: scope names that are neither parameters nor
/// fields, followed by branch-scoped names that only exist inside the body
/// (typecase binders, annotated bindings in arms), in first-store order.
fn local_declaration(scope: &TypeScope, params: &[String], body: &[Instruction]) -> Vec<String> {
    let mut locals: Vec<String> = scope
        .names()
        .iter()
        .filter(|name| !params.contains(name) && !name.starts_with("this."))
        .cloned()
        .collect();

    for instruction in body {
        if let Instruction::Store(name) = instruction {
            if !params.contains(name) && !locals.contains(name) {
                locals.push(name.clone());
            }
        }
    }

    locals
}

fn fill_return_arity(instructions: &mut [Instruction], arity: usize) {
    for instruction in instructions {
        if let Instruction::Return(slot) = instruction {
            if slot.is_none() {
                *slot = Some(arity);
            }
        }
    }
}

/// Within class `C`'s module the assembler expects `$` wherever the class
/// refers to itself; references to other classes stay fully qualified.
pub fn rewrite_self_references(class_name: &str, instructions: Vec<Instruction>) -> Vec<Instruction> {
    let rewrite = |name: String| {
        if name == class_name {
            "$".to_owned()
        } else {
            name
        }
    };

    instructions
        .into_iter()
        .map(|instruction| match instruction {
            Instruction::New(class) => Instruction::New(rewrite(class)),
            Instruction::LoadField { class, field } => Instruction::LoadField {
                class: rewrite(class),
                field,
            },
            Instruction::StoreField { class, field } => Instruction::StoreField {
                class: rewrite(class),
                field,
            },
            Instruction::Call { class, method } => Instruction::Call {
                class: rewrite(class),
                method,
            },
            Instruction::IsInstance(class) => Instruction::IsInstance(rewrite(class)),
            instruction => instruction,
        })
        .collect()
}

/// Write each module to `<directory>/<name>.asm` plus a `manifest` file
/// listing the module base names in emission order.
pub fn write_modules(modules: &[Module], directory: &Path) -> std::io::Result<()> {
    for module in modules {
        let path = directory.join(format!("{}.asm", module.name));
        info!("writing '{}'", path.to_string_lossy());
        let mut file = File::create(path)?;
        file.write_all(module.render().as_bytes())?;
    }

    let names: Vec<&str> = modules.iter().map(|module| module.name.as_str()).collect();
    let mut manifest = File::create(directory.join("manifest"))?;
    manifest.write_all(names.join(" ").as_bytes())?;
    manifest.write_all(b"\n")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::load_builtins;

    const CATALOG: &str = include_str!("../../builtinclass.json");

    fn compile_source(source: &str, main_name: &str) -> Vec<Module> {
        let mut hierarchy = load_builtins(CATALOG).unwrap();
        compile(source, &mut hierarchy, main_name).unwrap()
    }

    fn lines(module: &Module) -> Vec<String> {
        module.render().lines().map(|line| line.to_owned()).collect()
    }

    #[test]
    fn test_arithmetic_emission_order() {
        let modules = compile_source("x: Int = 3 + 4 * 2;", "Main");
        assert_eq!(modules.len(), 1);
        let main = &modules[0];
        assert_eq!(main.name, "Main_main");
        assert_eq!(
            lines(main),
            vec![
                ".class Main_main:Obj",
                ".method $constructor",
                ".local x",
                "\tconst 3",
                "\tconst 4",
                "\tconst 2",
                "\tcall Int:TIMES",
                "\tcall Int:PLUS",
                "\tstore x",
                "\tconst nothing",
                "\treturn 0",
            ]
        );
    }

    #[test]
    fn test_while_labels() {
        let modules = compile_source("n: Int = 10; while n > 0 { n = n - 1; }", "Main");
        let rendered = modules[0].render();
        assert!(rendered.contains("\tjump loop_test_1\nloop_head_1:"));
        assert!(rendered.contains(
            "loop_test_1:\n\tload n\n\tconst 0\n\tcall Int:MORE\n\tjump_if loop_head_1\n\tjump done_1\ndone_1:"
        ));
    }

    #[test]
    fn test_class_module_layout() {
        let source = r#"
            class Pt(a: Int, b: Int) {
                this.x = a;
                this.y = b;
                def dist(): Int { return this.x * this.x + this.y * this.y; }
            }
            p: Pt = Pt(3, 4);
            p.dist();
        "#;
        let modules = compile_source(source, "Main");
        assert_eq!(modules.len(), 2);

        let pt = &modules[0];
        assert_eq!(pt.name, "Pt");
        assert_eq!(
            lines(pt),
            vec![
                ".class Pt:Obj",
                ".field x",
                ".field y",
                ".method dist forward",
                ".method $constructor",
                ".args a,b",
                "\tload a",
                "\tload $",
                "\tstore_field $:x",
                "\tload b",
                "\tload $",
                "\tstore_field $:y",
                "\tload $",
                "\treturn 2",
                ".method dist",
                "\tload $",
                "\tload_field $:x",
                "\tload $",
                "\tload_field $:x",
                "\tcall Int:TIMES",
                "\tload $",
                "\tload_field $:y",
                "\tload $",
                "\tload_field $:y",
                "\tcall Int:TIMES",
                "\tcall Int:PLUS",
                "\treturn 0",
            ]
        );

        let main = &modules[1];
        assert_eq!(main.name, "Main_main");
        assert_eq!(
            lines(main),
            vec![
                ".class Main_main:Obj",
                ".method $constructor",
                ".local p",
                "\tconst 3",
                "\tconst 4",
                "\tnew Pt",
                "\tcall Pt:$constructor",
                "\tstore p",
                "\tload p",
                "\tcall Pt:dist",
                "\tpop",
                "\tconst nothing",
                "\treturn 0",
            ]
        );
    }

    #[test]
    fn test_typecase_emission() {
        let source = r#"
            x = 1;
            typecase x {
                a: Int { a.PRINT(); }
                b: String { b.PRINT(); }
            }
        "#;
        let modules = compile_source(source, "Main");
        let rendered = modules[0].render();

        // Binders are locals of the main module.
        assert!(rendered.contains(".local x,a,b"));
        assert!(rendered.contains("\tload x\n\tis_instance Int\n\tjump_if then_1\n\tjump else_1"));
        assert!(rendered.contains("\tload x\n\tis_instance String\n\tjump_if then_2"));
    }

    #[test]
    fn test_self_references_are_rewritten() {
        let source = r#"
            class Node(v: Int) {
                this.v = v;
                def twin(): Node { return Node(this.v); }
                def value(): Int { return this.v; }
                def twice(n: Node): Int { return n.value() + n.value(); }
            }
            n = Node(1);
        "#;
        let modules = compile_source(source, "Main");
        let node = &modules[0];
        let rendered = node.render();

        // Self construction and self calls go through `$`.
        assert!(rendered.contains("\tnew $"));
        assert!(rendered.contains("\tcall $:$constructor"));
        assert!(rendered.contains("\tcall $:value"));

        // Outside the class's own module the name stays qualified.
        let main = &modules[1];
        assert!(main.render().contains("\tnew Node"));
        assert!(main.render().contains("\tcall Node:$constructor"));

        // Property check: no self reference survives outside the header.
        for line in rendered.lines().skip(1) {
            assert!(!line.contains(":Node"), "unrewritten reference in {line}");
            assert!(!line.ends_with(" Node"), "unrewritten reference in {line}");
        }
    }

    #[test]
    fn test_branch_context_boolean_operators() {
        let source = "a = true; b = false; if a and b { x = 1; } else { x = 2; } x.PRINT();";
        let modules = compile_source(source, "Main");
        let rendered = modules[0].render();

        // and: left falls through to a continue label, right decides.
        assert!(rendered.contains(
            "\tload a\n\tjump_if and_2\n\tjump else_1\nand_2:\n\tload b\n\tjump_if then_1\n\tjump else_1\nthen_1:"
        ));
    }

    #[test]
    fn test_value_context_boolean_operators() {
        let modules = compile_source("b = true and not false;", "Main");
        let rendered = modules[0].render();
        assert!(rendered.contains(
            "\tconst true\n\tconst false\n\tcall Boolean:NOT\n\tcall Boolean:AND\n\tstore b"
        ));
    }

    #[test]
    fn test_method_without_return_gets_nothing() {
        let modules = compile_source("class A() { def poke(n: Int) { n.PRINT(); } }", "Main");
        let rendered = modules[0].render();
        assert!(rendered.contains(".method poke\n.args n\n\tload n\n\tcall Int:PRINT\n\tpop\n\tconst nothing\n\treturn 1"));
    }

    #[test]
    fn test_return_arity_matches_parameters() {
        let modules = compile_source(
            "class A() { def pick(a: Int, b: Int): Int { return a; } }",
            "Main",
        );
        let rendered = modules[0].render();
        assert!(rendered.contains(".method pick\n.args a,b\n\tload a\n\treturn 2"));
    }

    #[test]
    fn test_labels_are_unique_per_module() {
        let source = r#"
            a = true;
            if a { x = 1; } else { x = 2; }
            while a { a = false; }
            if a and a { y = 1; } else { y = 2; }
            y = 3;
        "#;
        let modules = compile_source(source, "Main");
        let mut seen = vec![];
        for instruction in &modules[0].instructions {
            if let Instruction::Label(label) = instruction {
                assert!(!seen.contains(label), "duplicate label {label}");
                seen.push(label.clone());
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_return_in_bare_block_has_arity_zero() {
        let modules = compile_source("x = 1; return x;", "Main");
        let rendered = modules[0].render();
        assert!(rendered.contains("\tload x\n\treturn 0"));
    }

    #[test]
    fn test_manifest_order_is_emission_order() {
        let source = r#"
            class B() extends A { this.x = 2; }
            class A() { this.x = 1; }
        "#;
        let modules = compile_source(source, "Main");
        let names: Vec<&str> = modules.iter().map(|module| module.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "Main_main"]);
    }
}
