use serde::Deserialize;

use super::{ClassDescriptor, ClassHierarchy, MethodDescriptor};
use crate::error::{CompileError, ErrorKind};

#[derive(Debug, Deserialize)]
struct CatalogClass {
    #[serde(rename = "super")]
    super_class: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    methods: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CatalogMethod {
    #[serde(default)]
    params: Vec<String>,
    #[serde(default = "nothing")]
    ret: String,
}

fn nothing() -> String {
    "Nothing".to_owned()
}

const REQUIRED_CLASSES: [&str; 5] = ["Obj", "Int", "String", "Boolean", "Nothing"];

fn malformed(detail: impl std::fmt::Display) -> CompileError {
    CompileError::new(
        ErrorKind::InvalidType,
        format!("malformed builtin catalog: {detail}"),
    )
}

/// Build the hierarchy from the JSON catalog of builtin classes.
///
/// The root `Obj` is seeded by [`ClassHierarchy::new`]; a catalog entry named
/// `Obj` is ignored. Entries are registered in catalog order, so a class must
/// appear after its superclass.
pub fn load_builtins(json: &str) -> Result<ClassHierarchy, CompileError> {
    let catalog: serde_json::Value = serde_json::from_str(json).map_err(malformed)?;
    let Some(entries) = catalog.as_object() else {
        return Err(malformed("top level must be an object of classes"));
    };

    let mut hierarchy = ClassHierarchy::new();

    for (name, value) in entries {
        if name == "Obj" {
            continue;
        }
        let class: CatalogClass = serde_json::from_value(value.clone()).map_err(malformed)?;

        let mut fields = vec![];
        for (field, ty) in &class.fields {
            let Some(ty) = ty.as_str() else {
                return Err(malformed(format!("field '{field}' of '{name}' must name a class")));
            };
            fields.push((field.clone(), ty.to_owned()));
        }

        let mut methods = vec![];
        for (method, signature) in &class.methods {
            let signature: CatalogMethod =
                serde_json::from_value(signature.clone()).map_err(malformed)?;
            methods.push(MethodDescriptor::new(method, signature.params, signature.ret));
        }

        hierarchy.add_class(ClassDescriptor::new(name, &class.super_class, fields, methods))?;
    }

    for required in REQUIRED_CLASSES {
        if hierarchy.find_class(required).is_none() {
            return Err(CompileError::new(
                ErrorKind::InvalidType,
                format!("builtin catalog must define class '{required}'"),
            ));
        }
    }

    Ok(hierarchy)
}
