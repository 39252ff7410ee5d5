//! Source loader: reads and parses the Go package rooted at a directory.

use crate::syntax::{Diagnostic, node_text, parse_go, syntax_errors};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tree_sitter::Tree;
use walkdir::WalkDir;

/// Error loading a package.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("no Go package in {0}")]
    NoPackage(PathBuf),

    #[error("found packages {first} ({first_file}) and {second} ({second_file}) in {dir}")]
    MixedPackages {
        dir: PathBuf,
        first: String,
        first_file: String,
        second: String,
        second_file: String,
    },

    #[error("package has syntax errors:\n{}", crate::syntax::render_diagnostics(.0))]
    Syntax(Vec<Diagnostic>),

    #[error("grammar: {0}")]
    Grammar(String),
}

/// One parsed file of a package.
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl SourceFile {
    /// Path for messages.
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// A loaded package: every file parsed, all sharing one package name.
pub struct ProjectUnit {
    pub dir: PathBuf,
    pub package_name: String,
    pub files: Vec<SourceFile>,
}

/// Load the package in `dir`.
///
/// All files are parsed before any error is reported, so a single
/// [`LoadError::Syntax`] carries the diagnostics of the whole package.
#[tracing::instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub fn load_package(dir: &Path) -> Result<ProjectUnit, LoadError> {
    let meta = fs::metadata(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let paths = package_files(dir)?;
    if paths.is_empty() {
        return Err(LoadError::NoPackage(dir.to_path_buf()));
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut diagnostics = Vec::new();
    for path in paths {
        let source = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let tree = parse_go(&source).map_err(LoadError::Grammar)?;
        let file = SourceFile { path, source, tree };
        let constraint = build_constraint(&file);
        if constraint.as_deref() == Some("ignore") {
            debug!("loader: skip {} (build constraint ignore)", file.display_path());
            continue;
        }
        diagnostics.extend(syntax_errors(&file.tree, &file.source, &file.display_path()));
        debug!("loader: parsed {}", file.display_path());
        files.push((file, constraint.is_some()));
    }

    let mut clauses = Vec::with_capacity(files.len());
    for (file, constrained) in &files {
        match package_clause(file) {
            Some(name) => clauses.push(Some((name, *constrained))),
            None => {
                diagnostics.push(Diagnostic {
                    path: file.display_path(),
                    line: 1,
                    column: 1,
                    message: "expected package clause".into(),
                });
                clauses.push(None);
            }
        }
    }
    if !diagnostics.is_empty() {
        return Err(LoadError::Syntax(diagnostics));
    }

    // Unconstrained files decide the package; a constrained file of another
    // package belongs to a build this tool does not model.
    let decider = clauses
        .iter()
        .position(|c| c.as_ref().is_some_and(|(_, constrained)| !constrained))
        .or_else(|| clauses.iter().position(Option::is_some));
    let Some((package_name, first_file)) = decider.and_then(|i| {
        let (name, _) = clauses[i].as_ref()?;
        Some((name.clone(), file_name(&files[i].0.path)))
    }) else {
        return Err(LoadError::NoPackage(dir.to_path_buf()));
    };

    let mut kept: Vec<SourceFile> = Vec::with_capacity(files.len());
    for ((file, constrained), clause) in files.into_iter().zip(clauses) {
        let Some((name, _)) = clause else {
            continue;
        };
        if name == package_name {
            kept.push(file);
        } else if constrained {
            debug!(
                "loader: skip {} (constrained file of package {})",
                file.display_path(),
                name
            );
        } else {
            return Err(LoadError::MixedPackages {
                dir: dir.to_path_buf(),
                first: package_name,
                first_file,
                second: name,
                second_file: file_name(&file.path),
            });
        }
    }
    let files = kept;

    info!(
        "loader: package {} with {} file(s) from {}",
        package_name,
        files.len(),
        dir.display()
    );
    Ok(ProjectUnit {
        dir: dir.to_path_buf(),
        package_name,
        files,
    })
}

/// Package files of `dir` in file-name order.
fn package_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|err| LoadError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf()),
            source: err.into(),
        })?;
        if entry.file_type().is_file() && is_package_file(&entry.file_name().to_string_lossy()) {
            out.push(entry.into_path());
        } else {
            debug!("loader: skip {}", entry.path().display());
        }
    }
    Ok(out)
}

/// Whether the go tool would build this file as part of the package.
fn is_package_file(name: &str) -> bool {
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('.')
        && !name.starts_with('_')
}

/// Expression of the `//go:build` (or legacy `// +build`) line in the
/// comments above the package clause.
fn build_constraint(file: &SourceFile) -> Option<String> {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "comment" {
            break;
        }
        let text = node_text(node, &file.source).trim_end();
        if let Some(expr) = text
            .strip_prefix("//go:build ")
            .or_else(|| text.strip_prefix("// +build "))
        {
            return Some(expr.trim().to_string());
        }
    }
    None
}

fn package_clause(file: &SourceFile) -> Option<String> {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    let clause = root
        .children(&mut cursor)
        .find(|n| n.kind() == "package_clause")?;
    let mut inner = clause.walk();
    let name = clause
        .named_children(&mut inner)
        .find(|n| n.kind() == "package_identifier" || n.kind() == "identifier")?;
    Some(node_text(name, &file.source).to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_package_file_filter() {
        assert!(is_package_file("thinger.go"));
        assert!(!is_package_file("thinger_test.go"));
        assert!(!is_package_file("_scratch.go"));
        assert!(!is_package_file(".hidden.go"));
        assert!(!is_package_file("README.md"));
    }

    #[test]
    fn test_loads_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.go", "package ref\n");
        write(dir.path(), "a.go", "package ref\n");
        write(dir.path(), "a_test.go", "package ref_test\n");
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub"), "c.go", "package sub\n");

        let unit = load_package(dir.path()).unwrap();
        assert_eq!(unit.package_name, "ref");
        let names: Vec<String> = unit.files.iter().map(|f| file_name(&f.path)).collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_package(&dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package ref\n");
        let err = load_package(&dir.path().join("a.go")).err().unwrap();
        assert!(matches!(err, LoadError::NotADirectory(_)));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "hello");
        let err = load_package(dir.path()).err().unwrap();
        assert!(matches!(err, LoadError::NoPackage(_)));
    }

    #[test]
    fn test_mixed_packages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package one\n");
        write(dir.path(), "b.go", "package two\n");
        let err = load_package(dir.path()).err().unwrap();
        match err {
            LoadError::MixedPackages { first, second, .. } => {
                assert_eq!(first, "one");
                assert_eq!(second, "two");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_syntax_errors_are_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package ref\n\nfunc (\n");
        write(dir.path(), "b.go", "package ref\n\ntype T struct {\n");
        let err = load_package(dir.path()).err().unwrap();
        match err {
            LoadError::Syntax(diagnostics) => {
                assert!(diagnostics.iter().any(|d| d.path.ends_with("a.go")));
                assert!(diagnostics.iter().any(|d| d.path.ends_with("b.go")));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_ignored_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package p\n\ntype I interface {\n\tM()\n}\n");
        write(dir.path(), "gen.go", "//go:build ignore\n\npackage main\n\nfunc main() {}\n");
        write(dir.path(), "old.go", "// +build ignore\n\npackage main\n");
        let unit = load_package(dir.path()).unwrap();
        assert_eq!(unit.package_name, "p");
        let names: Vec<String> = unit.files.iter().map(|f| file_name(&f.path)).collect();
        assert_eq!(names, vec!["a.go"]);
    }

    #[test]
    fn test_constrained_file_of_another_package_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a_tool.go", "//go:build tools\n\npackage tools\n");
        write(dir.path(), "b.go", "package p\n");
        write(dir.path(), "c_linux.go", "//go:build linux\n\npackage p\n");
        let unit = load_package(dir.path()).unwrap();
        assert_eq!(unit.package_name, "p");
        let names: Vec<String> = unit.files.iter().map(|f| file_name(&f.path)).collect();
        assert_eq!(names, vec!["b.go", "c_linux.go"]);
    }

    #[test]
    fn test_syntax_errors_come_before_mixed_packages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package one\n");
        write(dir.path(), "b.go", "package two\n");
        write(dir.path(), "c.go", "package one\n\nfunc (\n");
        let err = load_package(dir.path()).err().unwrap();
        match err {
            LoadError::Syntax(diagnostics) => {
                assert!(diagnostics.iter().all(|d| d.path.ends_with("c.go")));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
