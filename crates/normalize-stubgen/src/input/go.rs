//! Go interface extraction.
//!
//! Finds a package-level `type Name interface { ... }` declaration in a
//! loaded package and converts its method list into the IR.

use super::loader::{ProjectUnit, SourceFile};
use crate::ir::{ChannelDir, Import, InterfaceDecl, MethodSignature, Parameter, TypeExpr};
use crate::syntax::{first_named_child, node_text};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use tree_sitter::Node;

/// Error locating or reading an interface.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("interface {0} not found")]
    NotFound(String),

    #[error("{name} is a {kind}, not an interface")]
    NotAnInterface { name: String, kind: String },

    #[error("interface {interface} embeds {member}; embedded interfaces are not supported")]
    Embedded { interface: String, member: String },

    #[error("interface {0} has type parameters; generic interfaces are not supported")]
    Generic(String),

    #[error("malformed {what} in {file}")]
    Malformed { what: String, file: String },
}

/// Find the interface `name` in `unit`.
///
/// Files are searched in loader order and declarations in source order;
/// the first declaration with a matching name is used.
#[tracing::instrument(level = "debug", skip(unit))]
pub fn find_interface(unit: &ProjectUnit, name: &str) -> Result<InterfaceDecl, ExtractError> {
    let mut found: Option<(&SourceFile, Node)> = None;
    for file in &unit.files {
        for spec in type_specs(file) {
            let Some(spec_name) = spec.child_by_field_name("name") else {
                continue;
            };
            if node_text(spec_name, &file.source) != name {
                continue;
            }
            if let Some((first, _)) = &found {
                warn!(
                    "extract: {} declared again in {}, using the declaration in {}",
                    name,
                    file.display_path(),
                    first.display_path()
                );
            } else {
                found = Some((file, spec));
            }
        }
    }

    let Some((file, spec)) = found else {
        return Err(ExtractError::NotFound(name.to_string()));
    };
    let ctx = ExtractContext::new(file, name);
    let mut decl = ctx.extract_interface(spec, &unit.package_name)?;
    if decl.imports.iter().any(Import::is_dot) && !needs_dot_imports(unit, &decl) {
        debug!("extract: no method of {} refers to a dot import", decl.name);
        decl.imports.retain(|imp| !imp.is_dot());
    }
    debug!(
        "extract: {} has {} method(s) in {}",
        decl.name,
        decl.methods.len(),
        decl.file
    );
    Ok(decl)
}

/// Predeclared type names of the universe block.
const PREDECLARED: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

/// Whether a method type names an identifier that is neither predeclared
/// nor declared in the package, so it can only come from a dot import.
fn needs_dot_imports(unit: &ProjectUnit, decl: &InterfaceDecl) -> bool {
    let mut local: BTreeSet<&str> = PREDECLARED.iter().copied().collect();
    for file in &unit.files {
        for spec in type_specs(file) {
            if let Some(name) = spec.child_by_field_name("name") {
                local.insert(node_text(name, &file.source));
            }
        }
    }
    let mut names = BTreeSet::new();
    for method in &decl.methods {
        for param in method.parameters.iter().chain(&method.results) {
            unqualified_names(&param.ty, &mut names);
        }
    }
    names.iter().any(|name| !local.contains(name.as_str()))
}

fn unqualified_names(ty: &TypeExpr, out: &mut BTreeSet<String>) {
    match ty {
        TypeExpr::Ident(name) => {
            out.insert(name.clone());
        }
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => unqualified_names(inner, out),
        TypeExpr::Array { elem, .. } | TypeExpr::Channel { elem, .. } => {
            unqualified_names(elem, out)
        }
        TypeExpr::Map { key, value } => {
            unqualified_names(key, out);
            unqualified_names(value, out);
        }
        TypeExpr::Func { params, results } => {
            for p in params.iter().chain(results) {
                unqualified_names(&p.ty, out);
            }
        }
        TypeExpr::Generic { base, args } => {
            unqualified_names(base, out);
            for arg in args {
                unqualified_names(arg, out);
            }
        }
        TypeExpr::Qualified { .. } | TypeExpr::EmptyInterface | TypeExpr::Unknown { .. } => {}
    }
}

/// Package-level `type_spec` and `type_alias` nodes of a file, in order.
fn type_specs(file: &SourceFile) -> Vec<Node<'_>> {
    let root = file.tree.root_node();
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for decl in root.children(&mut cursor) {
        if decl.kind() != "type_declaration" {
            continue;
        }
        let mut inner = decl.walk();
        for spec in decl.named_children(&mut inner) {
            if matches!(spec.kind(), "type_spec" | "type_alias") {
                out.push(spec);
            }
        }
    }
    out
}

struct ExtractContext<'a> {
    file: &'a SourceFile,
    interface: &'a str,
}

impl<'a> ExtractContext<'a> {
    fn new(file: &'a SourceFile, interface: &'a str) -> Self {
        Self { file, interface }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node_text(node, &self.file.source)
    }

    fn malformed(&self, what: &str) -> ExtractError {
        ExtractError::Malformed {
            what: what.to_string(),
            file: self.file.display_path(),
        }
    }

    fn extract_interface(&self, spec: Node, package_name: &str) -> Result<InterfaceDecl, ExtractError> {
        let ty = spec
            .child_by_field_name("type")
            .ok_or_else(|| self.malformed("type declaration"))?;
        if ty.kind() != "interface_type" {
            return Err(ExtractError::NotAnInterface {
                name: self.interface.to_string(),
                kind: describe_kind(ty.kind()).to_string(),
            });
        }
        if spec.child_by_field_name("type_parameters").is_some() {
            return Err(ExtractError::Generic(self.interface.to_string()));
        }

        let mut methods = Vec::new();
        let mut cursor = ty.walk();
        for elem in ty.named_children(&mut cursor) {
            match elem.kind() {
                "comment" => {}
                "method_elem" | "method_spec" => methods.push(self.extract_method(elem)?),
                _ => {
                    return Err(ExtractError::Embedded {
                        interface: self.interface.to_string(),
                        member: self.node_text(elem).trim().to_string(),
                    });
                }
            }
        }

        Ok(InterfaceDecl {
            name: self.interface.to_string(),
            package_name: package_name.to_string(),
            file: self.file.display_path(),
            methods,
            imports: self.extract_imports(),
        })
    }

    fn extract_method(&self, node: Node) -> Result<MethodSignature, ExtractError> {
        let name = node
            .child_by_field_name("name")
            .ok_or_else(|| self.malformed("method name"))?;
        let params = node
            .child_by_field_name("parameters")
            .ok_or_else(|| self.malformed("method parameters"))?;

        Ok(MethodSignature {
            name: self.node_text(name).to_string(),
            parameters: self.extract_parameter_list(params),
            results: self.extract_result(node.child_by_field_name("result")),
        })
    }

    /// A `result` field is either a parameter list or a single bare type.
    fn extract_result(&self, result: Option<Node>) -> Vec<Parameter> {
        match result {
            None => Vec::new(),
            Some(node) if node.kind() == "parameter_list" => self.extract_parameter_list(node),
            Some(node) => vec![Parameter::unnamed(self.extract_type(node))],
        }
    }

    fn extract_parameter_list(&self, node: Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "parameter_declaration" => params.push(self.extract_parameter(child, false)),
                "variadic_parameter_declaration" => params.push(self.extract_parameter(child, true)),
                _ => {}
            }
        }
        params
    }

    fn extract_parameter(&self, node: Node, variadic: bool) -> Parameter {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.node_text(n).to_string())
            .collect();
        let ty = match node.child_by_field_name("type") {
            Some(ty) => self.extract_type(ty),
            None => self.unknown(node),
        };
        Parameter {
            names,
            ty,
            variadic,
        }
    }

    fn extract_type(&self, node: Node) -> TypeExpr {
        match node.kind() {
            "type_identifier" | "identifier" => TypeExpr::Ident(self.node_text(node).to_string()),

            "qualified_type" => {
                match (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) {
                    (Some(package), Some(name)) => TypeExpr::Qualified {
                        package: self.node_text(package).to_string(),
                        name: self.node_text(name).to_string(),
                    },
                    _ => self.unknown(node),
                }
            }

            "pointer_type" => match first_named_child(node) {
                Some(inner) => TypeExpr::Pointer(Box::new(self.extract_type(inner))),
                None => self.unknown(node),
            },

            "slice_type" => match node.child_by_field_name("element") {
                Some(elem) => TypeExpr::Slice(Box::new(self.extract_type(elem))),
                None => self.unknown(node),
            },

            "array_type" => {
                match (
                    node.child_by_field_name("length"),
                    node.child_by_field_name("element"),
                ) {
                    (Some(len), Some(elem)) => TypeExpr::Array {
                        len: self.node_text(len).to_string(),
                        elem: Box::new(self.extract_type(elem)),
                    },
                    _ => self.unknown(node),
                }
            }

            "map_type" => {
                match (
                    node.child_by_field_name("key"),
                    node.child_by_field_name("value"),
                ) {
                    (Some(key), Some(value)) => TypeExpr::Map {
                        key: Box::new(self.extract_type(key)),
                        value: Box::new(self.extract_type(value)),
                    },
                    _ => self.unknown(node),
                }
            }

            "channel_type" => match node.child_by_field_name("value") {
                Some(elem) => TypeExpr::Channel {
                    dir: self.channel_dir(node),
                    elem: Box::new(self.extract_type(elem)),
                },
                None => self.unknown(node),
            },

            "function_type" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.extract_parameter_list(p))
                    .unwrap_or_default();
                TypeExpr::Func {
                    params,
                    results: self.extract_result(node.child_by_field_name("result")),
                }
            }

            "interface_type" if first_named_child(node).is_none() => TypeExpr::EmptyInterface,

            "generic_type" => {
                match (
                    node.child_by_field_name("type"),
                    node.child_by_field_name("type_arguments"),
                ) {
                    (Some(base), Some(args)) => {
                        let mut cursor = args.walk();
                        let args = args
                            .named_children(&mut cursor)
                            .filter(|n| n.kind() != "comment")
                            .map(|n| self.extract_type(n))
                            .collect();
                        TypeExpr::Generic {
                            base: Box::new(self.extract_type(base)),
                            args,
                        }
                    }
                    _ => self.unknown(node),
                }
            }

            // Type arguments wrap each argument in a single-term type_elem.
            "type_elem" | "parenthesized_type" => {
                let mut cursor = node.walk();
                let terms: Vec<Node> = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                match terms.as_slice() {
                    [single] => self.extract_type(*single),
                    _ => self.unknown(node),
                }
            }

            _ => self.unknown(node),
        }
    }

    fn channel_dir(&self, node: Node) -> ChannelDir {
        let mut cursor = node.walk();
        let tokens: Vec<&str> = node.children(&mut cursor).take(2).map(|n| n.kind()).collect();
        match tokens.as_slice() {
            ["<-", ..] => ChannelDir::Receive,
            ["chan", "<-"] => ChannelDir::Send,
            _ => ChannelDir::Both,
        }
    }

    /// Source text of a type with no IR form. Line endings become `\n` so a
    /// CRLF source does not leak `\r` into generated code.
    fn unknown(&self, node: Node) -> TypeExpr {
        TypeExpr::Unknown {
            kind: node.kind().to_string(),
            text: self.node_text(node).replace("\r\n", "\n").replace('\r', "\n"),
        }
    }

    /// Imports of the declaring file. Blank imports are dropped since
    /// generated code never refers to them.
    fn extract_imports(&self) -> Vec<Import> {
        let root = self.file.tree.root_node();
        let mut imports = Vec::new();
        let mut cursor = root.walk();
        for decl in root.children(&mut cursor) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            let mut inner = decl.walk();
            for child in decl.named_children(&mut inner) {
                match child.kind() {
                    "import_spec" => imports.extend(self.extract_import_spec(child)),
                    "import_spec_list" => {
                        let mut list_cursor = child.walk();
                        for spec in child.named_children(&mut list_cursor) {
                            if spec.kind() == "import_spec" {
                                imports.extend(self.extract_import_spec(spec));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        imports
    }

    fn extract_import_spec(&self, node: Node) -> Option<Import> {
        let path = node.child_by_field_name("path")?;
        let path = self
            .node_text(path)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();
        let alias = node.child_by_field_name("name").map(|n| self.node_text(n));
        match alias {
            Some("_") => {
                debug!("extract: skip import {:?} of {}", alias, path);
                None
            }
            _ => Some(Import {
                alias: alias.map(str::to_string),
                path,
            }),
        }
    }
}

/// Human-readable name of a type node kind for error messages.
fn describe_kind(kind: &str) -> &str {
    match kind {
        "struct_type" => "struct",
        "type_identifier" | "qualified_type" | "generic_type" => "named type",
        "pointer_type" => "pointer type",
        "slice_type" => "slice type",
        "array_type" => "array type",
        "map_type" => "map type",
        "channel_type" => "channel type",
        "function_type" => "function type",
        other => other,
    }
}
