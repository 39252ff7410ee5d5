//! Intermediate representation for interface extraction and stub synthesis.
//!
//! The Go reader produces an [`InterfaceDecl`]; the synthesizer derives a
//! [`StubSpec`] from it, which the output writer renders.

use serde::Serialize;

/// A type expression as written in source.
///
/// This is a closed set of the node kinds the printer knows how to render.
/// Anything else lands in [`TypeExpr::Unknown`] together with its source
/// text so that it is never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeExpr {
    /// A bare identifier (`int`, `error`, `Thing`).
    Ident(String),
    /// A package-qualified name (`context.Context`).
    Qualified { package: String, name: String },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`, the length kept as written.
    Array { len: String, elem: Box<TypeExpr> },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `chan<- T`, `<-chan T`
    Channel {
        dir: ChannelDir,
        elem: Box<TypeExpr>,
    },
    /// `func(params) results`
    Func {
        params: Vec<Parameter>,
        results: Vec<Parameter>,
    },
    /// `interface{}`
    EmptyInterface,
    /// `Base[A, B]`
    Generic {
        base: Box<TypeExpr>,
        args: Vec<TypeExpr>,
    },
    /// A node kind without a dedicated arm.
    Unknown { kind: String, text: String },
}

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelDir {
    Both,
    Send,
    Receive,
}

/// One field of a parameter or result list.
///
/// `names` is empty when the source left the field unnamed and holds every
/// name of a grouped declaration such as `a, b int`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Declared with `...`; `ty` is the element type.
    pub variadic: bool,
}

impl Parameter {
    pub fn unnamed(ty: TypeExpr) -> Self {
        Self {
            names: Vec::new(),
            ty,
            variadic: false,
        }
    }

    pub fn named(names: &[&str], ty: TypeExpr) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ty,
            variadic: false,
        }
    }
}

/// A method of an interface, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub results: Vec<Parameter>,
}

/// An import of the file that declares the interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// Explicit import name (`yaml "gopkg.in/yaml.v3"`).
    pub alias: Option<String>,
    pub path: String,
}

impl Import {
    /// The identifier the import is referred to by in source.
    ///
    /// Without an alias the name is guessed from the path the way goimports
    /// does: the last element, skipping a major-version element
    /// (`github.com/foo/bar/v2` is `bar`), without a `.vN` suffix
    /// (`gopkg.in/yaml.v3` is `yaml`), a `go-` or `go.` prefix or a `-go`
    /// suffix (`github.com/mattn/go-isatty` is `isatty`), cut at the first
    /// character that cannot appear in an identifier.
    pub fn package_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        let mut segments = self.path.rsplit('/');
        let last = segments.next().unwrap_or(&self.path);
        let mut name = if is_major_version(last) {
            segments.next().unwrap_or(last)
        } else {
            last
        };
        if let Some((base, version)) = name.rsplit_once(".v")
            && !base.is_empty()
            && is_digits(version)
        {
            name = base;
        }
        for prefix in ["go-", "go."] {
            if let Some(rest) = name.strip_prefix(prefix)
                && !rest.is_empty()
            {
                name = rest;
            }
        }
        if let Some(rest) = name.strip_suffix("-go")
            && !rest.is_empty()
        {
            name = rest;
        }
        match name.find(|c: char| !(c.is_alphanumeric() || c == '_')) {
            Some(end) if end > 0 => &name[..end],
            _ => name,
        }
    }

    /// The name differs from the last path element, so the package may
    /// declare another one.
    pub fn name_is_guessed(&self) -> bool {
        self.alias.is_none() && self.path.rsplit('/').next() != Some(self.package_name())
    }

    /// `import . "path"`: the package's names are used unqualified.
    pub fn is_dot(&self) -> bool {
        self.alias.as_deref() == Some(".")
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.strip_prefix('v').is_some_and(is_digits)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A located interface and its method set.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub package_name: String,
    /// File the declaration was found in.
    pub file: String,
    pub methods: Vec<MethodSignature>,
    /// Imports of the declaring file.
    pub imports: Vec<Import>,
}

/// Template-ready data for one method.
///
/// Invariant: `param_decls`, `param_names` and `param_types` have equal
/// length, as do `result_decls` and `result_names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubMethodData {
    pub name: String,
    /// `"name type"` per parameter, `"...T"` for a variadic one.
    pub param_decls: Vec<String>,
    /// Declared names, `_` where the source had none.
    pub param_names: Vec<String>,
    /// Printed types; a variadic parameter is recorded as `[]T`.
    pub param_types: Vec<String>,
    /// The last parameter is variadic.
    pub variadic: bool,
    pub result_decls: Vec<String>,
    /// Declared names, `R<n>` where the source had none.
    pub result_names: Vec<String>,
}

/// Everything the stub writer needs.
#[derive(Debug, Clone, Serialize)]
pub struct StubSpec {
    pub package_name: String,
    pub interface_name: String,
    pub stub_name: String,
    pub imports: Vec<Import>,
    pub methods: Vec<StubMethodData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(path: &str) -> Import {
        Import {
            alias: None,
            path: path.to_string(),
        }
    }

    #[test]
    fn import_names() {
        assert_eq!(import("context").package_name(), "context");
        assert_eq!(import("net/http").package_name(), "http");
        assert_eq!(import("github.com/foo/bar/v2").package_name(), "bar");
        assert_eq!(import("gopkg.in/yaml.v3").package_name(), "yaml");
        assert_eq!(import("v2").package_name(), "v2");
        assert_eq!(import("github.com/mattn/go-isatty").package_name(), "isatty");
        assert_eq!(import("github.com/satori/go.uuid").package_name(), "uuid");
        assert_eq!(import("github.com/foo/bar-go").package_name(), "bar");
        assert_eq!(import("github.com/foo/pkg-utils").package_name(), "pkg");
    }

    #[test]
    fn guessed_import_names() {
        assert!(!import("net/http").name_is_guessed());
        assert!(import("github.com/mattn/go-isatty").name_is_guessed());
        assert!(import("gopkg.in/yaml.v3").name_is_guessed());
        assert!(
            !Import {
                alias: Some("uuid".into()),
                path: "github.com/satori/go.uuid".into(),
            }
            .name_is_guessed()
        );
    }

    #[test]
    fn import_alias_wins() {
        let imp = Import {
            alias: Some("refstubs".into()),
            path: "stubz/ref/stubs".into(),
        };
        assert_eq!(imp.package_name(), "refstubs");
    }
}
