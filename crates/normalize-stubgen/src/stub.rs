//! Signature normalization: interface IR to template-ready stub data.

use crate::ir::{InterfaceDecl, MethodSignature, Parameter, StubMethodData, StubSpec, TypeExpr};
use crate::helpers::joinl;
use crate::printer::{print_param_type, print_type};
use std::collections::BTreeSet;
use tracing::warn;

/// Placeholder name for an unnamed parameter.
pub const BLANK: &str = "_";

impl StubSpec {
    /// Build the stub data for an interface.
    ///
    /// Imports whose package name appears in a method type are kept, and so
    /// are dot imports the extractor let through. While some qualifier
    /// matches no import name, every import whose name is only guessed from
    /// its path is kept as well.
    pub fn from_interface(decl: &InterfaceDecl) -> Self {
        let methods: Vec<StubMethodData> = decl.methods.iter().map(StubMethodData::from).collect();

        let mut used = BTreeSet::new();
        for method in &decl.methods {
            for param in method.parameters.iter().chain(&method.results) {
                collect_packages(&param.ty, &mut used);
            }
        }
        let named: BTreeSet<&str> = decl.imports.iter().map(|imp| imp.package_name()).collect();
        let unresolved: Vec<&String> = used.iter().filter(|pkg| !named.contains(pkg.as_str())).collect();
        if !unresolved.is_empty() {
            warn!(
                "stub: no import is named {}, keeping imports whose name is only guessed",
                joinl(", ", &unresolved)
            );
        }
        let imports = decl
            .imports
            .iter()
            .filter(|imp| {
                imp.is_dot()
                    || used.contains(imp.package_name())
                    || (!unresolved.is_empty() && imp.name_is_guessed())
            })
            .cloned()
            .collect();

        Self {
            package_name: decl.package_name.clone(),
            interface_name: decl.name.clone(),
            stub_name: format!("Stub{}", decl.name),
            imports,
            methods,
        }
    }
}

impl From<&MethodSignature> for StubMethodData {
    fn from(method: &MethodSignature) -> Self {
        let mut data = StubMethodData {
            name: method.name.clone(),
            param_decls: Vec::new(),
            param_names: Vec::new(),
            param_types: Vec::new(),
            variadic: method.parameters.last().is_some_and(|p| p.variadic),
            result_decls: Vec::new(),
            result_names: Vec::new(),
        };

        for param in &method.parameters {
            let decl_type = print_param_type(param);
            let recorded = recorded_type(param);
            for name in field_names(param, BLANK) {
                data.param_decls.push(if name == BLANK {
                    decl_type.clone()
                } else {
                    format!("{} {}", name, decl_type)
                });
                data.param_names.push(name);
                data.param_types.push(recorded.clone());
            }
        }

        for (index, result) in method.results.iter().enumerate() {
            let ty = print_type(&result.ty);
            for name in field_names(result, &format!("R{}", index)) {
                data.result_decls.push(ty.clone());
                data.result_names.push(name);
            }
        }

        data
    }
}

/// Declared names of a field, or a single synthesized one.
fn field_names(param: &Parameter, fallback: &str) -> Vec<String> {
    if param.names.is_empty() {
        vec![fallback.to_string()]
    } else {
        param.names.clone()
    }
}

/// Type under which an argument is stored: a variadic `...T` arrives as `[]T`.
fn recorded_type(param: &Parameter) -> String {
    if param.variadic {
        format!("[]{}", print_type(&param.ty))
    } else {
        print_type(&param.ty)
    }
}

fn collect_packages(ty: &TypeExpr, out: &mut BTreeSet<String>) {
    match ty {
        TypeExpr::Qualified { package, .. } => {
            out.insert(package.clone());
        }
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => collect_packages(inner, out),
        TypeExpr::Array { elem, .. } | TypeExpr::Channel { elem, .. } => {
            collect_packages(elem, out)
        }
        TypeExpr::Map { key, value } => {
            collect_packages(key, out);
            collect_packages(value, out);
        }
        TypeExpr::Func { params, results } => {
            for p in params.iter().chain(results) {
                collect_packages(&p.ty, out);
            }
        }
        TypeExpr::Generic { base, args } => {
            collect_packages(base, out);
            for arg in args {
                collect_packages(arg, out);
            }
        }
        TypeExpr::Unknown { text, .. } => {
            // Best effort: any `pkg.` prefix in the raw text.
            for word in text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')) {
                if let Some((pkg, _)) = word.split_once('.')
                    && !pkg.is_empty()
                {
                    out.insert(pkg.to_string());
                }
            }
        }
        TypeExpr::Ident(_) | TypeExpr::EmptyInterface => {}
    }
}
