//! Type-expression printer.
//!
//! Renders [`TypeExpr`] back to Go type syntax. Every arm is explicit; an
//! [`TypeExpr::Unknown`] prints its source text verbatim and logs the node
//! kind so the printer can be extended.

use crate::helpers::join;
use crate::ir::{ChannelDir, Parameter, TypeExpr};
use tracing::warn;

/// Print a type expression as Go source.
pub fn print_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Ident(name) => name.clone(),
        TypeExpr::Qualified { package, name } => format!("{}.{}", package, name),
        TypeExpr::Pointer(inner) => format!("*{}", print_type(inner)),
        TypeExpr::Slice(elem) => format!("[]{}", print_type(elem)),
        TypeExpr::Array { len, elem } => format!("[{}]{}", len, print_type(elem)),
        TypeExpr::Map { key, value } => {
            format!("map[{}]{}", print_type(key), print_type(value))
        }
        TypeExpr::Channel { dir, elem } => match dir {
            ChannelDir::Both => format!("chan {}", print_type(elem)),
            ChannelDir::Send => format!("chan<- {}", print_type(elem)),
            ChannelDir::Receive => format!("<-chan {}", print_type(elem)),
        },
        TypeExpr::Func { params, results } => {
            let mut out = format!("func({})", join(&print_fields(params), ", "));
            let results_text = print_results(results);
            if !results_text.is_empty() {
                out.push(' ');
                out.push_str(&results_text);
            }
            out
        }
        TypeExpr::EmptyInterface => "interface{}".to_string(),
        TypeExpr::Generic { base, args } => {
            let args: Vec<String> = args.iter().map(print_type).collect();
            format!("{}[{}]", print_type(base), join(&args, ", "))
        }
        TypeExpr::Unknown { kind, text } => {
            warn!("printer: no rule for `{}`, using source text `{}`", kind, text);
            text.clone()
        }
    }
}

/// Print the type of a parameter field, with `...` for a variadic one.
pub fn print_param_type(param: &Parameter) -> String {
    if param.variadic {
        format!("...{}", print_type(&param.ty))
    } else {
        print_type(&param.ty)
    }
}

/// Print a field list as declarations: `name type` per name, or just the
/// type for an unnamed field.
pub fn print_fields(fields: &[Parameter]) -> Vec<String> {
    let mut out = Vec::new();
    for field in fields {
        let ty = print_param_type(field);
        if field.names.is_empty() {
            out.push(ty);
        } else {
            for name in &field.names {
                out.push(format!("{} {}", name, ty));
            }
        }
    }
    out
}

/// Print a result list the way it follows a signature: nothing, a bare
/// unnamed type, or a parenthesized list.
pub fn print_results(results: &[Parameter]) -> String {
    match results {
        [] => String::new(),
        [single] if single.names.is_empty() => print_param_type(single),
        _ => format!("({})", join(&print_fields(results), ", ")),
    }
}
