//! Tree-sitter plumbing shared by the reader and the formatter.

use serde::Serialize;
use std::fmt;
use tree_sitter::{Node, Parser, Tree};

/// A syntax problem at a source position (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.path, self.line, self.column, self.message)
    }
}

/// Render diagnostics one per line for error messages.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse Go source.
///
/// Fails only when the grammar cannot be loaded or the parser gives up;
/// syntax errors are left in the tree for [`syntax_errors`].
pub fn parse_go(source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_go::language().into())
        .map_err(|e| format!("tree-sitter init: {}", e))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "failed to parse Go".to_string())
}

/// Collect every `ERROR` and `MISSING` node of a tree.
pub fn syntax_errors(tree: &Tree, source: &str, path: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if tree.root_node().has_error() {
        collect_errors(tree.root_node(), source, path, &mut out);
    }
    out
}

fn collect_errors(node: Node, source: &str, path: &str, out: &mut Vec<Diagnostic>) {
    if node.is_missing() {
        out.push(diagnostic(node, path, format!("missing `{}`", node.kind())));
        return;
    }
    if node.is_error() {
        let text = node_text(node, source);
        let snippet: String = text.chars().take(40).collect();
        out.push(diagnostic(node, path, format!("unexpected `{}`", snippet.trim())));
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, source, path, out);
    }
}

fn diagnostic(node: Node, path: &str, message: String) -> Diagnostic {
    let pos = node.start_position();
    Diagnostic {
        path: path.to_string(),
        line: pos.row + 1,
        column: pos.column + 1,
        message,
    }
}

/// Source text of a node.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// First named child that is not a comment.
pub fn first_named_child<'tree>(node: Node<'tree>) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}
