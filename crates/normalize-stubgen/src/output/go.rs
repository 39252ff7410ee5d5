//! Go writer for stub data.
//!
//! One file per stub: the recording struct, then for every method a call
//! record, a result tuple, an `On<Method>()` builder whose `Return` queues
//! tuples, and the method itself. Identifiers are checked and local names
//! are picked so they cannot clash with the interface's own names.

use super::RenderError;
use crate::helpers::{join, joinl, zip};
use crate::ir::{StubMethodData, StubSpec};
use crate::options::{ExhaustedPolicy, StubOptions};
use crate::stub::BLANK;
use std::collections::BTreeSet;

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by stubgen. DO NOT EDIT.";

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Predeclared functions the generated bodies call.
const BUILTINS: &[&str] = &["append", "len"];

/// Render a stub file without formatting it.
pub fn render_stub(spec: &StubSpec, options: &StubOptions) -> Result<String, RenderError> {
    GoStubWriter::emit(spec, options)
}

/// Generated names for one method.
struct MethodNames {
    call_type: String,
    return_type: String,
    on_type: String,
    on_method: String,
    calls_field: String,
    returns_field: String,
    /// Parameter names of the stub method.
    params: Vec<String>,
    /// Call record fields, `Arg1..ArgN`.
    arg_fields: Vec<String>,
    /// Result tuple fields, also the `Return` parameters.
    result_fields: Vec<String>,
}

/// Receiver and local variable names, shared by every method.
struct Locals {
    stub: String,
    on: String,
    index: String,
    result: String,
}

/// Emits a [`StubSpec`] as Go source.
pub struct GoStubWriter<'a> {
    spec: &'a StubSpec,
    options: &'a StubOptions,
    output: String,
    indent: usize,
}

impl<'a> GoStubWriter<'a> {
    pub fn new(spec: &'a StubSpec, options: &'a StubOptions) -> Self {
        Self {
            spec,
            options,
            output: String::new(),
            indent: 0,
        }
    }

    /// Emit a whole stub file.
    pub fn emit(spec: &'a StubSpec, options: &'a StubOptions) -> Result<String, RenderError> {
        let mut writer = Self::new(spec, options);
        writer.write_file()?;
        Ok(writer.output)
    }

    fn write_file(&mut self) -> Result<(), RenderError> {
        let spec = self.spec;
        check_identifier("package name", &spec.package_name)?;
        check_identifier("interface name", &spec.interface_name)?;
        let names = spec
            .methods
            .iter()
            .map(|method| method_names(spec, method))
            .collect::<Result<Vec<_>, _>>()?;
        check_collisions(spec, &names)?;
        let locals = choose_locals(&names);

        self.line(HEADER);
        self.blank();
        self.line(&format!("package {}", spec.package_name));
        self.blank();
        self.write_imports();
        self.blank();
        self.write_stub_struct(&names);
        self.blank();
        self.line(&format!(
            "var _ {} = (*{})(nil)",
            spec.interface_name, spec.stub_name
        ));
        self.blank();
        self.line(&format!(
            "// New{0} returns a {0} with no calls recorded and no results queued.",
            spec.stub_name
        ));
        self.line(&format!("func New{0}() *{0} {{", spec.stub_name));
        self.indent += 1;
        self.line(&format!("return &{}{{}}", spec.stub_name));
        self.indent -= 1;
        self.line("}");

        for (method, method_names) in spec.methods.iter().zip(&names) {
            self.write_method(method, method_names, &locals)?;
        }
        Ok(())
    }

    fn write_imports(&mut self) {
        let spec = self.spec;
        let mut imports: Vec<(&str, Option<&str>)> = spec
            .imports
            .iter()
            .map(|imp| (imp.path.as_str(), imp.alias.as_deref()))
            .collect();
        imports.push(("sync", None));
        imports.sort();
        imports.dedup();

        self.line("import (");
        self.indent += 1;
        for (path, alias) in imports {
            match alias {
                Some(alias) => self.line(&format!("{} \"{}\"", alias, path)),
                None => self.line(&format!("\"{}\"", path)),
            }
        }
        self.indent -= 1;
        self.line(")");
    }

    fn write_stub_struct(&mut self, names: &[MethodNames]) {
        let spec = self.spec;
        let exhausted = match self.options.exhausted {
            ExhaustedPolicy::RepeatLast => "// the last queued tuple is repeated.",
            ExhaustedPolicy::ZeroValue => "// zero values are returned.",
        };
        self.line(&format!(
            "// {} is a recording stub for {}.",
            spec.stub_name, spec.interface_name
        ));
        self.line("//");
        self.line("// Every call is appended to the method's Calls slice. Results queued with");
        self.line("// On<Method>().Return are handed out in call order. Once they run out,");
        self.line(exhausted);
        self.line("// A method with no queued results returns zero values.");
        self.line(&format!("type {} struct {{", spec.stub_name));
        self.indent += 1;
        self.line("mu sync.Mutex");
        for method_names in names {
            self.blank();
            self.line(&format!(
                "{} []{}",
                method_names.calls_field, method_names.call_type
            ));
            self.line(&format!(
                "{} []{}",
                method_names.returns_field, method_names.return_type
            ));
        }
        self.indent -= 1;
        self.line("}");
    }

    fn write_method(
        &mut self,
        method: &StubMethodData,
        names: &MethodNames,
        locals: &Locals,
    ) -> Result<(), RenderError> {
        let spec = self.spec;
        let record = zip(&names.arg_fields, &method.param_types, |field, ty| {
            format!("{} {}", field, ty)
        })?;
        let tuple = zip(&names.result_fields, &method.result_decls, |field, ty| {
            format!("{} {}", field, ty)
        })?;

        self.blank();
        self.line(&format!(
            "// {} records the arguments of one {} call.",
            names.call_type, method.name
        ));
        self.write_struct(&names.call_type, &record);

        self.blank();
        self.line(&format!(
            "// {} holds the results of one {} call.",
            names.return_type, method.name
        ));
        self.write_struct(&names.return_type, &tuple);

        self.blank();
        self.line(&format!(
            "// {} queues results for {}.",
            names.on_type, method.name
        ));
        self.write_struct(&names.on_type, &[format!("stub *{}", spec.stub_name)]);

        self.blank();
        self.line(&format!(
            "// {} configures the results of successive {} calls.",
            names.on_method, method.name
        ));
        self.line(&format!(
            "func ({} *{}) {}() *{} {{",
            locals.stub, spec.stub_name, names.on_method, names.on_type
        ));
        self.indent += 1;
        self.line(&format!("return &{}{{stub: {}}}", names.on_type, locals.stub));
        self.indent -= 1;
        self.line("}");

        let values = zip(&names.result_fields, &names.result_fields, |field, param| {
            format!("{}: {}", field, param)
        })?;
        let target = format!("{}.stub", locals.on);
        self.blank();
        self.line(&format!(
            "// Return queues the results of the next unconfigured {} call.",
            method.name
        ));
        self.line(&format!(
            "func ({} *{}) Return({}) *{} {{",
            locals.on,
            names.on_type,
            join(&tuple, ", "),
            names.on_type
        ));
        self.indent += 1;
        self.line(&format!("{}.mu.Lock()", target));
        self.line(&format!("defer {}.mu.Unlock()", target));
        self.line(&format!(
            "{0}.{1} = append({0}.{1}, {2}{{{3}}})",
            target,
            names.returns_field,
            names.return_type,
            join(&values, ", ")
        ));
        self.line(&format!("return {}", locals.on));
        self.indent -= 1;
        self.line("}");

        self.blank();
        self.write_stub_method(method, names, locals)
    }

    fn write_stub_method(
        &mut self,
        method: &StubMethodData,
        names: &MethodNames,
        locals: &Locals,
    ) -> Result<(), RenderError> {
        let spec = self.spec;
        let mut signature_types = method.param_types.clone();
        if method.variadic
            && let Some(last) = signature_types.last_mut()
        {
            let elem = last.strip_prefix("[]").unwrap_or(last.as_str()).to_string();
            *last = format!("...{}", elem);
        }
        let params = zip(&names.params, &signature_types, |name, ty| {
            format!("{} {}", name, ty)
        })?;
        let record = zip(&names.arg_fields, &names.params, |field, name| {
            format!("{}: {}", field, name)
        })?;
        let results = match method.result_decls.as_slice() {
            [] => String::new(),
            [single] => format!(" {}", single),
            many => format!(" ({})", join(many, ", ")),
        };

        let s = &locals.stub;
        self.line(&format!(
            "// {} implements {}.{}({}).",
            method.name,
            spec.interface_name,
            method.name,
            single_line(&join(&method.param_decls, ", "))
        ));
        self.line(&format!(
            "func ({} *{}) {}({}){} {{",
            s,
            spec.stub_name,
            method.name,
            join(&params, ", "),
            results
        ));
        self.indent += 1;
        self.line(&format!("{}.mu.Lock()", s));
        self.line(&format!("defer {}.mu.Unlock()", s));
        self.line(&format!(
            "{0}.{1} = append({0}.{1}, {2}{{{3}}})",
            s,
            names.calls_field,
            names.call_type,
            join(&record, ", ")
        ));

        if !method.result_decls.is_empty() {
            let r = &locals.result;
            let n = &locals.index;
            let queue = format!("{}.{}", s, names.returns_field);
            self.line(&format!("var {} {}", r, names.return_type));
            self.line(&format!(
                "if {0} := len({1}.{2}) - 1; {0} < len({3}) {{",
                n, s, names.calls_field, queue
            ));
            self.indent += 1;
            self.line(&format!("{} = {}[{}]", r, queue, n));
            self.indent -= 1;
            if self.options.exhausted == ExhaustedPolicy::RepeatLast {
                self.line(&format!("}} else if len({}) > 0 {{", queue));
                self.indent += 1;
                self.line(&format!("{0} = {1}[len({1})-1]", r, queue));
                self.indent -= 1;
            }
            self.line("}");
            let returned: Vec<String> = names
                .result_fields
                .iter()
                .map(|field| format!("{}.{}", r, field))
                .collect();
            self.line(&format!("return {}", joinl(", ", &returned)));
        }

        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn write_struct(&mut self, name: &str, fields: &[String]) {
        if fields.is_empty() {
            self.line(&format!("type {} struct{{}}", name));
            return;
        }
        self.line(&format!("type {} struct {{", name));
        self.indent += 1;
        for field in fields {
            self.line(field);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push('\t');
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn blank(&mut self) {
        self.output.push('\n');
    }
}

fn method_names(spec: &StubSpec, method: &StubMethodData) -> Result<MethodNames, RenderError> {
    check_identifier("method name", &method.name)?;
    let prefix = format!("{}{}", spec.stub_name, method.name);
    let call_type = format!("{}Call", prefix);
    let return_type = format!("{}Return", prefix);
    let on_type = format!("{}On", prefix);

    let mut params: Vec<String> = Vec::with_capacity(method.param_names.len());
    for (index, declared) in method.param_names.iter().enumerate() {
        let usable = declared != BLANK
            && is_identifier(declared)
            && !BUILTINS.contains(&declared.as_str())
            && *declared != call_type
            && *declared != return_type;
        let base = if usable {
            declared.clone()
        } else {
            format!("arg{}", index + 1)
        };
        let taken: BTreeSet<String> = params.iter().cloned().collect();
        params.push(fresh(&base, &taken));
    }

    let mut result_fields: Vec<String> = Vec::with_capacity(method.result_names.len());
    for (index, declared) in method.result_names.iter().enumerate() {
        let base = if declared == BLANK {
            format!("R{}", index)
        } else {
            check_identifier("result name", declared)?;
            if BUILTINS.contains(&declared.as_str()) || *declared == return_type {
                return Err(RenderError::Collision {
                    name: declared.clone(),
                });
            }
            declared.clone()
        };
        let taken: BTreeSet<String> = result_fields.iter().cloned().collect();
        result_fields.push(fresh(&base, &taken));
    }

    Ok(MethodNames {
        on_method: format!("On{}", method.name),
        calls_field: format!("{}Calls", method.name),
        returns_field: format!("{}Returns", lower_first(&method.name)),
        arg_fields: (1..=method.param_names.len())
            .map(|i| format!("Arg{}", i))
            .collect(),
        call_type,
        return_type,
        on_type,
        params,
        result_fields,
    })
}

/// Top-level type names and stub members must each be declared once.
fn check_collisions(spec: &StubSpec, names: &[MethodNames]) -> Result<(), RenderError> {
    let mut types: BTreeSet<&str> = BTreeSet::new();
    claim(&mut types, &spec.interface_name)?;
    claim(&mut types, &spec.stub_name)?;
    let constructor = format!("New{}", spec.stub_name);
    claim(&mut types, &constructor)?;

    let mut members: BTreeSet<&str> = BTreeSet::from(["mu"]);
    for (method, method_names) in spec.methods.iter().zip(names) {
        claim(&mut types, &method_names.call_type)?;
        claim(&mut types, &method_names.return_type)?;
        claim(&mut types, &method_names.on_type)?;
        claim(&mut members, &method.name)?;
        claim(&mut members, &method_names.on_method)?;
        claim(&mut members, &method_names.calls_field)?;
        claim(&mut members, &method_names.returns_field)?;
    }
    Ok(())
}

fn claim<'n>(set: &mut BTreeSet<&'n str>, name: &'n str) -> Result<(), RenderError> {
    if set.insert(name) {
        Ok(())
    } else {
        Err(RenderError::Collision {
            name: name.to_string(),
        })
    }
}

fn choose_locals(names: &[MethodNames]) -> Locals {
    let mut taken: BTreeSet<String> = BUILTINS.iter().map(|s| s.to_string()).collect();
    for method_names in names {
        taken.extend(method_names.params.iter().cloned());
        taken.extend(method_names.result_fields.iter().cloned());
    }
    let mut pick = |base: &str| {
        let name = fresh(base, &taken);
        taken.insert(name.clone());
        name
    };
    Locals {
        stub: pick("s"),
        on: pick("o"),
        index: pick("n"),
        result: pick("r"),
    }
}

/// `base`, with underscores appended until it is not taken.
fn fresh(base: &str, taken: &BTreeSet<String>) -> String {
    let mut name = base.to_string();
    while taken.contains(&name) {
        name.push('_');
    }
    name
}

fn check_identifier(role: &'static str, name: &str) -> Result<(), RenderError> {
    if name != BLANK && is_identifier(name) {
        Ok(())
    } else {
        Err(RenderError::InvalidIdentifier {
            role,
            name: name.to_string(),
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&name)
}

/// Collapse every whitespace run to one space so the text fits in a `//` comment.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
