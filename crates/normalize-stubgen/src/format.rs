//! Canonical formatting of generated Go source.
//!
//! The source is parsed, reprinted token by token and parsed again. The
//! printer keeps the line structure of its input and only decides what
//! goes between tokens on a line:
//!
//! - indentation is one tab per line that opened a still-unclosed bracket
//! - runs of blank lines collapse to one; blank lines next to brackets go
//! - spacing follows the token kinds (`a, b`, `x[i-1]`, `T{A: 1}`, `*T`)
//! - struct field types and trailing comments are aligned in columns
//!
//! The reprinted source must parse to the same tree as the input
//! (see [`StructureEq`]), otherwise formatting fails.

use crate::syntax::{Diagnostic, node_text, parse_go, render_diagnostics, syntax_errors};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use tree_sitter::Node;

/// Error formatting Go source.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("source does not parse:\n{}", render_diagnostics(.0))]
    Reparse(Vec<Diagnostic>),

    #[error("formatted source is not equivalent to its input")]
    NotEquivalent,

    #[error("grammar: {0}")]
    Grammar(String),
}

/// Nodes printed as a single token even though the grammar splits them.
const ATOMIC: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "rune_literal",
    "comment",
];

/// Parents whose operator token is an assignment-like infix.
const ASSIGNMENTS: &[&str] = &[
    "assignment_statement",
    "short_var_declaration",
    "var_spec",
    "const_spec",
    "type_alias",
    "range_clause",
    "send_statement",
];

/// Character pairs that would lex as a different token if printed together.
const FUSING: &[&str] = &[
    "++", "--", "&&", "||", "<-", "<<", ">>", "&^", "==", "!=", "<=", ">=", ":=", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "//", "/*", "..",
];

/// Format Go source canonically.
///
/// Formatting is deterministic and idempotent: formatting the output again
/// returns it unchanged.
pub fn format_go(source: &str) -> Result<String, FormatError> {
    let tree = parse_go(source).map_err(FormatError::Grammar)?;
    let diagnostics = syntax_errors(&tree, source, "<generated>");
    if !diagnostics.is_empty() {
        return Err(FormatError::Reparse(diagnostics));
    }

    let leaves = collect_leaves(tree.root_node(), source);
    let output = Printer::default().print(&leaves);

    let reparsed = parse_go(&output).map_err(FormatError::Grammar)?;
    let before = SyntaxView::new(tree.root_node(), source);
    let after = SyntaxView::new(reparsed.root_node(), &output);
    if reparsed.root_node().has_error() || !before.structure_eq(&after) {
        return Err(FormatError::NotEquivalent);
    }
    debug!(
        "format: {} token(s), {} -> {} bytes",
        leaves.len(),
        source.len(),
        output.len()
    );
    Ok(output)
}

/// Structural equality of syntax trees.
///
/// Two trees are equal when they have the same node kinds in the same
/// shape and the same token text. Whitespace and terminator newlines are
/// ignored.
pub trait StructureEq {
    fn structure_eq(&self, other: &Self) -> bool;
}

/// A node together with the source it was parsed from.
#[derive(Clone, Copy)]
pub struct SyntaxView<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> SyntaxView<'a> {
    pub fn new(node: Node<'a>, source: &'a str) -> Self {
        Self { node, source }
    }

    fn text(&self) -> &'a str {
        node_text(self.node, self.source)
    }

    fn children(&self) -> Vec<SyntaxView<'a>> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|child| SyntaxView::new(child, self.source))
            .filter(|child| child.node.is_named() || !child.text().trim().is_empty())
            .collect()
    }
}

impl StructureEq for SyntaxView<'_> {
    fn structure_eq(&self, other: &Self) -> bool {
        if self.node.kind() != other.node.kind() {
            return false;
        }
        if is_atomic(self.node) || is_atomic(other.node) {
            return self.text() == other.text();
        }
        let ours = self.children();
        let theirs = other.children();
        ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| a.structure_eq(b))
    }
}

fn is_atomic(node: Node) -> bool {
    node.child_count() == 0 || ATOMIC.contains(&node.kind())
}

/// One printed token and the syntax around it.
struct Leaf<'s> {
    text: &'s str,
    kind: &'static str,
    parent: &'static str,
    grandparent: &'static str,
    named: bool,
    first_in_parent: bool,
    start_row: usize,
    end_row: usize,
    /// First token of a named struct field's type.
    field_type: bool,
    /// `{` of a struct or interface type closed on the same row.
    tight_body: bool,
}

impl Leaf<'_> {
    fn is_opener(&self) -> bool {
        !self.named && matches!(self.text, "(" | "[" | "{")
    }

    fn is_closer(&self) -> bool {
        !self.named && matches!(self.text, ")" | "]" | "}")
    }

    fn is_binary(&self) -> bool {
        self.parent == "binary_expression" && !self.named
    }

    /// Operator with a space on both sides.
    fn is_infix(&self) -> bool {
        !self.named
            && self.text != ","
            && self.text.chars().all(|c| c.is_ascii_punctuation())
            && (self.is_binary() || ASSIGNMENTS.contains(&self.parent))
    }

    /// Operator bound to the token that follows it.
    fn is_prefix(&self) -> bool {
        if self.named {
            return false;
        }
        match self.text {
            "*" => matches!(self.parent, "pointer_type" | "unary_expression"),
            "..." | "~" => true,
            "<-" => {
                self.first_in_parent && matches!(self.parent, "unary_expression" | "channel_type")
            }
            _ => self.parent == "unary_expression" && self.first_in_parent,
        }
    }

    fn is_case_label(&self) -> bool {
        matches!(self.kind, "case" | "default")
            && matches!(
                self.parent,
                "expression_case" | "default_case" | "type_case" | "communication_case"
            )
    }
}

fn collect_leaves<'s>(root: Node, source: &'s str) -> Vec<Leaf<'s>> {
    let mut out = Vec::new();
    let mut field_types = HashSet::new();
    visit(root, source, &mut field_types, &mut out);
    out
}

fn visit<'s>(node: Node, source: &'s str, field_types: &mut HashSet<usize>, out: &mut Vec<Leaf<'s>>) {
    if node.kind() == "field_declaration"
        && node.child_by_field_name("name").is_some()
        && let Some(ty) = node.child_by_field_name("type")
    {
        field_types.insert(ty.start_byte());
    }

    if is_atomic(node) {
        let text = node_text(node, source);
        if text.trim().is_empty() {
            return;
        }
        let parent = node.parent();
        let tight_body = text == "{"
            && parent.is_some_and(|p| {
                matches!(p.kind(), "field_declaration_list" | "interface_type")
                    && (p.named_child_count() == 0
                        || p.end_position().row == node.start_position().row)
            });
        out.push(Leaf {
            text,
            kind: node.kind(),
            parent: parent.map(|p| p.kind()).unwrap_or(""),
            grandparent: parent.and_then(|p| p.parent()).map(|g| g.kind()).unwrap_or(""),
            named: node.is_named(),
            first_in_parent: node.prev_sibling().is_none(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
            field_type: field_types.contains(&node.start_byte()),
            tight_body,
        });
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, field_types, out);
    }
}

/// Whether two tokens printed on one line need a space between them.
fn wants_space(prev: &Leaf, next: &Leaf, in_index: bool) -> bool {
    if prev.kind == "comment" || next.kind == "comment" {
        return true;
    }
    if prev.parent == "import_spec" && next.parent == "import_spec" {
        return true;
    }
    if fuses(prev.text, next.text) {
        return true;
    }
    if next.is_infix() {
        return !(next.is_binary() && in_index);
    }
    if prev.is_infix() {
        return !(prev.is_binary() && in_index);
    }
    if matches!(next.text, "," | ";" | ")" | "]" | "." | ":") {
        return false;
    }
    if matches!(next.text, "++" | "--") {
        return false;
    }
    if matches!(prev.text, "(" | "[" | ".") || prev.is_prefix() {
        return false;
    }
    match prev.text {
        "," | ";" => return true,
        ":" => return prev.parent != "slice_expression",
        "{" => return !(next.text == "}" || prev.parent == "literal_value"),
        _ => {}
    }
    match next.text {
        "}" => return next.parent != "literal_value",
        "{" => return !(next.parent == "literal_value" || next.tight_body),
        _ => {}
    }
    match prev.text {
        "map" => return false,
        "chan" => return next.text != "<-",
        "]" => return prev.parent == "type_parameter_list" && next.text != "(",
        _ => {}
    }
    match next.text {
        "(" => match next.parent {
            "argument_list" => false,
            "parameter_list" => {
                prev.text == ")" || (prev.text == "func" && next.grandparent == "method_declaration")
            }
            _ => true,
        },
        "[" => matches!(
            next.parent,
            "slice_type" | "array_type" | "implicit_length_array_type"
        ),
        "..." => next.parent == "variadic_parameter_declaration",
        _ => true,
    }
}

/// Two words, or two operator characters that would lex as one token.
fn fuses(prev: &str, next: &str) -> bool {
    let (Some(a), Some(b)) = (prev.chars().last(), next.chars().next()) else {
        return false;
    };
    let word = |c: char| c.is_alphanumeric() || c == '_';
    if word(a) && word(b) {
        return true;
    }
    let pair: String = [a, b].iter().collect();
    FUSING.contains(&pair.as_str())
}

/// An open bracket and the source row it was opened on.
struct Open<'s> {
    text: &'s str,
    row: usize,
}

/// A printed line: indentation and the cells aligned across lines.
#[derive(Default)]
struct Line {
    indent: usize,
    cells: Vec<String>,
}

#[derive(Default)]
struct Printer<'s> {
    lines: Vec<Line>,
    stack: Vec<Open<'s>>,
}

impl<'s> Printer<'s> {
    fn print(mut self, leaves: &[Leaf<'s>]) -> String {
        let mut prev: Option<&Leaf<'s>> = None;
        for leaf in leaves {
            let mut popped = false;
            match prev {
                Some(p) if leaf.start_row <= p.end_row => {
                    let in_index = self.stack.last().is_some_and(|open| open.text == "[");
                    let starts_cell = leaf.field_type || leaf.kind == "comment";
                    let line = self.current();
                    if starts_cell {
                        line.cells.push(String::new());
                    } else if wants_space(p, leaf, in_index) {
                        push_text(line, " ");
                    }
                }
                _ => {
                    if let Some(p) = prev
                        && leaf.start_row - p.end_row > 1
                        && !p.is_opener()
                        && !leaf.is_closer()
                    {
                        self.lines.push(Line::default());
                    }
                    let mut indent = if leaf.is_closer() {
                        popped = true;
                        self.close_indent()
                    } else {
                        self.open_rows()
                    };
                    if leaf.is_case_label() {
                        indent = indent.saturating_sub(1);
                    }
                    if prev.is_some_and(|p| p.is_infix()) {
                        indent += 1;
                    }
                    self.lines.push(Line {
                        indent,
                        cells: vec![String::new()],
                    });
                }
            }

            push_text(self.current(), leaf.text);
            if leaf.is_opener() {
                self.stack.push(Open {
                    text: leaf.text,
                    row: leaf.start_row,
                });
            } else if leaf.is_closer() && !popped {
                self.stack.pop();
            }
            prev = Some(leaf);
        }
        render_lines(&self.lines)
    }

    fn current(&mut self) -> &mut Line {
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    /// Indentation inside the open brackets: one level per opening row.
    fn open_rows(&self) -> usize {
        self.stack
            .iter()
            .map(|open| open.row)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Indentation of a line that starts by closing a bracket.
    fn close_indent(&mut self) -> usize {
        let Some(closed) = self.stack.pop() else {
            return 0;
        };
        self.stack
            .iter()
            .filter(|open| open.row < closed.row)
            .map(|open| open.row)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

fn push_text(line: &mut Line, text: &str) {
    if line.cells.is_empty() {
        line.cells.push(String::new());
    }
    if let Some(cell) = line.cells.last_mut() {
        cell.push_str(text);
    }
}

fn render_lines(lines: &[Line]) -> String {
    let mut widths: Vec<Vec<usize>> = lines
        .iter()
        .map(|line| vec![0; line.cells.len().saturating_sub(1)])
        .collect();
    align_column(lines, &mut widths, 0, lines.len(), 0);

    let mut out = String::new();
    for (line, widths) in lines.iter().zip(&widths) {
        if !line.cells.is_empty() {
            for _ in 0..line.indent {
                out.push('\t');
            }
        }
        for (i, cell) in line.cells.iter().enumerate() {
            out.push_str(cell);
            if let Some(width) = widths.get(i) {
                let pad = width.saturating_sub(cell.chars().count()) + 1;
                out.extend(std::iter::repeat_n(' ', pad));
            }
        }
        out.push('\n');
    }
    out
}

/// Align column `column` over runs of consecutive lines that have a cell
/// after it and share an indentation, then align the next column within
/// each run.
fn align_column(lines: &[Line], widths: &mut [Vec<usize>], start: usize, end: usize, column: usize) {
    let mut i = start;
    while i < end {
        if lines[i].cells.len() <= column + 1 {
            i += 1;
            continue;
        }
        let indent = lines[i].indent;
        let mut j = i;
        let mut width = 0;
        while j < end && lines[j].cells.len() > column + 1 && lines[j].indent == indent {
            width = width.max(lines[j].cells[column].chars().count());
            j += 1;
        }
        for row in widths.iter_mut().take(j).skip(i) {
            row[column] = width;
        }
        align_column(lines, widths, i, j, column + 1);
        i = j;
    }
}
