//! Cross-cutting properties of emitted modules: declaration soundness,
//! evaluation order, self-reference rewriting and label uniqueness.
use quack_lang::asm::Instruction;
use quack_lang::compiler::{compile, Module};
use quack_lang::hierarchy::load_builtins;

const CATALOG: &str = include_str!("../builtinclass.json");

fn compile_source(source: &str) -> Vec<Module> {
    let mut hierarchy = load_builtins(CATALOG).unwrap();
    compile(source, &mut hierarchy, "Main").unwrap()
}

const EXERCISE: &str = r#"
    class Shape(tag: Int) {
        this.tag = tag;
        def describe(): Int { return this.tag; }
    }
    class Circle(tag: Int, r: Int) extends Shape {
        this.tag = tag;
        this.r = r;
        def describe(): Int { return this.r * this.tag; }
        def grow(by: Int): Circle { return Circle(this.tag, this.r + by); }
    }
    s = Shape(1);
    c = Circle(2, 10);
    if true { v = Shape(3); } else { v = c.grow(1); }
    while v.describe() > 0 { v = s; }
    typecase v {
        sh: Shape { sh.describe(); }
        any: Obj { any.PRINT(); }
    }
"#;

/// Every `load`/`store` name appears in the module's `.local`, `.args` or
/// `.field` declarations (`$` refers to the receiver itself).
#[test]
fn declaration_soundness() {
    for module in compile_source(EXERCISE) {
        let mut declared: Vec<String> = vec![];
        for instruction in &module.instructions {
            match instruction {
                Instruction::Field(name) => declared.push(name.clone()),
                Instruction::Args(names) | Instruction::Local(names) => {
                    declared.extend(names.iter().cloned())
                }
                _ => {}
            }
        }
        for instruction in &module.instructions {
            match instruction {
                Instruction::Load(name) | Instruction::Store(name) => {
                    assert!(
                        name == "$" || declared.contains(name),
                        "'{name}' is not declared in module '{}'",
                        module.name
                    );
                }
                Instruction::LoadField { field, .. } | Instruction::StoreField { field, .. } => {
                    // Field access on the receiver itself must be declared.
                    if module.name != "Main_main" {
                        assert!(
                            declared.contains(field) || !module_owns_field(&module, field),
                            "field '{field}' is not declared in module '{}'",
                            module.name
                        );
                    }
                }
                _ => {}
            }
        }
    }
}

fn module_owns_field(module: &Module, field: &str) -> bool {
    module.instructions.iter().any(|instruction| {
        matches!(instruction, Instruction::StoreField { class, field: f } if class == "$" && f == field)
    })
}

/// The receiver's instructions precede all argument instructions, and
/// argument i precedes argument i + 1.
#[test]
fn call_evaluation_order() {
    let modules = compile_source("x = 1; y = 2; z = 3; r = x.PLUS(y).PLUS(z);");
    let rendered = modules[0].render();
    assert!(rendered.contains("\tload x\n\tload y\n\tcall Int:PLUS\n\tload z\n\tcall Int:PLUS"));

    // Constructor arguments evaluate left to right before the allocation.
    let modules = compile_source(
        "class P(a: Int, b: Int, c: Int) { this.a = a; this.b = b; this.c = c; } p = P(1, 2, 3);",
    );
    let rendered = modules[1].render();
    assert!(rendered.contains("\tconst 1\n\tconst 2\n\tconst 3\n\tnew P\n\tcall P:$constructor"));
}

/// Within class C's module, no instruction mentions C outside the header.
#[test]
fn self_reference_rewrite() {
    for module in compile_source(EXERCISE) {
        if module.name == "Main_main" {
            continue;
        }
        for instruction in module.instructions.iter().skip(1) {
            match instruction {
                Instruction::New(class)
                | Instruction::IsInstance(class)
                | Instruction::LoadField { class, .. }
                | Instruction::StoreField { class, .. }
                | Instruction::Call { class, .. } => {
                    assert_ne!(
                        class, &module.name,
                        "unrewritten self reference in module '{}'",
                        module.name
                    );
                }
                _ => {}
            }
        }
    }
}

/// All label definitions within a module are distinct.
#[test]
fn label_uniqueness() {
    for module in compile_source(EXERCISE) {
        let mut seen: Vec<&String> = vec![];
        for instruction in &module.instructions {
            if let Instruction::Label(label) = instruction {
                assert!(
                    !seen.contains(&label),
                    "label '{label}' defined twice in module '{}'",
                    module.name
                );
                seen.push(label);
            }
        }
    }
}

/// Emission is deterministic for identical input.
#[test]
fn deterministic_output() {
    let first: Vec<String> = compile_source(EXERCISE)
        .iter()
        .map(|module| module.render())
        .collect();
    let second: Vec<String> = compile_source(EXERCISE)
        .iter()
        .map(|module| module.render())
        .collect();
    assert_eq!(first, second);
}
