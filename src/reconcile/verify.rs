//! Structural equivalence of two Python sources, using tree-sitter.
//!
//! Both documents are parsed with tree-sitter-python and flattened into a
//! stream of normalized tokens. Two documents are equivalent when their
//! streams are equal. The normalization absorbs what a code formatter is
//! allowed to change:
//!
//! - whitespace, blank lines, comments and backslash continuations
//! - redundant parentheses around expressions and tuples, so a bare
//!   `a, b` matches `(a, b)` both as a value and as an assignment target
//! - commas and semicolons used as separators (magic trailing commas),
//!   except the comma that turns `x[i,]` into a tuple index
//! - string quote style, prefix case, the `u` prefix and escaped quotes
//! - docstring indentation and surrounding blank space
//! - the case of numeric literals (`0XFF` vs `0xff`, `1E5` vs `1e5`)

use std::fmt;

use thiserror::Error;
use tree_sitter::{Node, Parser};

use crate::model::TextDocument;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Which side of a comparison failed to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Original,
    Merged,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Result of comparing a merged document against the original target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Equivalence {
    Equivalent,
    NotEquivalent,
    ParseFailure(Side),
}

impl Equivalence {
    #[must_use]
    pub const fn is_equivalent(self) -> bool {
        matches!(self, Self::Equivalent)
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equivalent => write!(f, "equivalent"),
            Self::NotEquivalent => write!(f, "not equivalent"),
            Self::ParseFailure(side) => write!(f, "{side} does not parse"),
        }
    }
}

/// The tree-sitter grammar could not be loaded.
#[derive(Debug, Error)]
#[error("python parser setup failed: {0}")]
pub struct ParserSetupError(String);

// ---------------------------------------------------------------------------
// Token stream
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    /// Start of a named interior node.
    Open(&'static str),
    Close,
    /// A named leaf: identifier, number, keyword constant.
    Leaf(&'static str, String),
    /// A string literal, reduced to its normalized prefix and body.
    Str { prefix: String, body: String },
    /// An anonymous token: keyword, operator or punctuation.
    Op(&'static str),
}

/// Anonymous tokens a formatter may add or remove freely.
const SEPARATORS: &[&str] = &[",", ";", "(", ")"];

/// Marks a subscript whose index is a tuple: `x[1,]` is not `x[1]`.
const TUPLE_INDEX: &str = "tuple_index";

/// Node kinds that differ only by optional parentheses.
fn canonical_kind(kind: &'static str) -> &'static str {
    match kind {
        "expression_list" => "tuple",
        "pattern_list" => "tuple_pattern",
        _ => kind,
    }
}

fn python_parser() -> Result<Parser, ParserSetupError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParserSetupError(format!("{e}")))?;
    Ok(parser)
}

/// Parse `doc` into its normalized token stream, or `None` if it contains
/// syntax errors.
fn tokenize(parser: &mut Parser, doc: &TextDocument) -> Option<Vec<Token>> {
    // Layout is irrelevant to structure, so always parse with LF endings.
    let mut source = doc.lines().join("\n");
    source.push('\n');
    let tree = parser.parse(&source, None)?;
    let root = tree.root_node();
    if root.has_error() || !indentation_is_consistent(root) {
        return None;
    }
    let mut tokens = Vec::new();
    push_tokens(root, source.as_bytes(), &mut tokens);
    Some(tokens)
}

/// Clauses that must line up with the statement they belong to.
const CLAUSES: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
];

/// Check the indentation rules tree-sitter-python does not enforce.
///
/// The grammar's scanner silently accepts an unexpected indent or a dedent
/// to a column matching no enclosing block, both of which CPython rejects.
/// A statement that starts a line must line up with its siblings, module
/// level statements start at column 0, and clauses line up with their
/// statement.
fn indentation_is_consistent(node: Node<'_>) -> bool {
    let kind = node.kind();
    let aligned = matches!(kind, "module" | "block" | "decorated_definition");
    let mut expected = match kind {
        "module" => Some(0),
        "decorated_definition" => Some(node.start_position().column),
        _ => None,
    };
    let mut prev_end_row = match kind {
        "module" | "decorated_definition" => None,
        _ => Some(node.parent().unwrap_or(node).start_position().row),
    };

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect();
    for child in children {
        let start = child.start_position();
        let starts_line = prev_end_row.is_none_or(|row| start.row > row);
        if aligned && starts_line && *expected.get_or_insert(start.column) != start.column {
            return false;
        }
        if starts_line
            && CLAUSES.contains(&child.kind())
            && start.column != node.start_position().column
        {
            return false;
        }
        prev_end_row = Some(child.end_position().row);
        if !indentation_is_consistent(child) {
            return false;
        }
    }
    true
}

fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

fn push_tokens(node: Node<'_>, source: &[u8], out: &mut Vec<Token>) {
    if node.is_extra() {
        return;
    }
    let kind = node.kind();

    if !node.is_named() {
        if !SEPARATORS.contains(&kind) {
            out.push(Token::Op(kind));
        }
        return;
    }

    match kind {
        "comment" | "line_continuation" => {}
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                push_tokens(child, source, out);
            }
        }
        "string" => out.push(normalize_string(
            node_text(node, source),
            is_docstring(node),
        )),
        "integer" | "float" => {
            out.push(Token::Leaf(kind, node_text(node, source).to_ascii_lowercase()));
        }
        _ if node.child_count() == 0 => {
            out.push(Token::Leaf(kind, node_text(node, source).to_owned()));
        }
        _ => {
            out.push(Token::Open(canonical_kind(kind)));
            if kind == "subscript" && has_comma(node) {
                out.push(Token::Op(TUPLE_INDEX));
            }
            for i in 0..node.child_count() {
                let Some(child) = node.child(i) else { continue };
                push_tokens(child, source, out);
            }
            out.push(Token::Close);
        }
    }
}

fn has_comma(node: Node<'_>) -> bool {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .any(|child| !child.is_named() && child.kind() == ",")
}

/// Whether `node` is the lone string of the first statement of a module or
/// block.
fn is_docstring(node: Node<'_>) -> bool {
    let Some(stmt) = node.parent() else {
        return false;
    };
    if stmt.kind() != "expression_statement" || stmt.named_child_count() != 1 {
        return false;
    }
    let Some(body) = stmt.parent() else {
        return false;
    };
    if !matches!(body.kind(), "module" | "block") {
        return false;
    }
    let mut cursor = body.walk();
    let first_statement = body
        .named_children(&mut cursor)
        .find(|child| !child.is_extra());
    first_statement.is_some_and(|first| first.id() == stmt.id())
}

fn normalize_string(text: &str, docstring: bool) -> Token {
    let quote_at = text.find(['\'', '"']).unwrap_or(text.len());
    let (raw_prefix, quoted) = text.split_at(quote_at);

    let prefix: String = raw_prefix
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|&c| c != 'u')
        .collect();

    let delimiter = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    let body = if quoted.len() >= 2 * delimiter {
        &quoted[delimiter..quoted.len() - delimiter]
    } else {
        quoted
    };

    let mut body = if prefix.contains('r') {
        body.to_owned()
    } else {
        unescape_quotes(body)
    };

    if docstring {
        body = body
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_owned();
    }

    Token::Str { prefix, body }
}

/// Replace `\'` and `\"` with the bare quote, leaving every other escape
/// sequence untouched.
fn unescape_quotes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(q @ ('\'' | '"')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// AstVerifier
// ---------------------------------------------------------------------------

/// Compares merged documents against one original.
///
/// The original's token stream is computed once, so verifying several
/// candidate merges of the same file only parses each merge.
pub struct AstVerifier {
    parser: Parser,
    baseline: Option<Vec<Token>>,
}

impl AstVerifier {
    /// Parse `original` and keep its token stream.
    ///
    /// # Errors
    /// Fails only if the Python grammar cannot be loaded. An original with
    /// syntax errors is not an error here; see [`Self::original_parses`].
    pub fn new(original: &TextDocument) -> Result<Self, ParserSetupError> {
        let mut parser = python_parser()?;
        let baseline = tokenize(&mut parser, original);
        Ok(Self { parser, baseline })
    }

    /// Whether the original document parsed cleanly.
    #[must_use]
    pub const fn original_parses(&self) -> bool {
        self.baseline.is_some()
    }

    /// Compare `merged` against the original.
    pub fn verify(&mut self, merged: &TextDocument) -> Equivalence {
        let Some(baseline) = &self.baseline else {
            return Equivalence::ParseFailure(Side::Original);
        };
        let Some(tokens) = tokenize(&mut self.parser, merged) else {
            return Equivalence::ParseFailure(Side::Merged);
        };
        if *baseline == tokens {
            return Equivalence::Equivalent;
        }
        if tracing::enabled!(tracing::Level::TRACE) {
            let at = baseline
                .iter()
                .zip(&tokens)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| baseline.len().min(tokens.len()));
            tracing::trace!(
                token = at,
                original = ?baseline.get(at),
                merged = ?tokens.get(at),
                "token streams diverge"
            );
        }
        Equivalence::NotEquivalent
    }
}

impl fmt::Debug for AstVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AstVerifier")
            .field("original_parses", &self.original_parses())
            .field("baseline_tokens", &self.baseline.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Compare `merged` against `original` in one call.
///
/// # Errors
/// Fails only if the Python grammar cannot be loaded.
pub fn verify(original: &TextDocument, merged: &TextDocument) -> Result<Equivalence, ParserSetupError> {
    Ok(AstVerifier::new(original)?.verify(merged))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn check(original: &str, merged: &str) -> Equivalence {
        verify(
            &TextDocument::from_text(original).unwrap(),
            &TextDocument::from_text(merged).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn identical_sources_are_equivalent() {
        assert_eq!(check("x = 1\n", "x = 1\n"), Equivalence::Equivalent);
    }

    #[test]
    fn whitespace_and_blank_lines_are_ignored() {
        assert_eq!(
            check("x=1\ny  =  [1,2]\n", "x = 1\n\n\ny = [1, 2]\n"),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn single_line_block_equals_split_block() {
        assert_eq!(
            check(
                "if True: print('hi')\nif False: print('there')\n",
                "if True:\n    print(\"hi\")\nif False: print('there')\n",
            ),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn comments_are_ignored() {
        assert_eq!(
            check("x = 1  # one\n", "# header\nx = 1\n"),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn redundant_parentheses_are_ignored() {
        assert_eq!(check("return_value = (a + b)\n", "return_value = a + b\n"), Equivalence::Equivalent);
        assert_eq!(check("x = ((1))\n", "x = 1\n"), Equivalence::Equivalent);
    }

    #[test]
    fn magic_trailing_comma_is_ignored() {
        assert_eq!(
            check("f(a, b)\n", "f(\n    a,\n    b,\n)\n"),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn tuple_parentheses_are_ignored() {
        let pairs = [
            ("for (x, y) in z:\n    pass\n", "for x, y in z:\n    pass\n"),
            ("del (a, b)\n", "del a, b\n"),
            ("(a, b) = c\n", "a, b = c\n"),
            ("x = (a, b)\n", "x = a, b\n"),
            (
                "def f():\n    return a, b\n",
                "def f():\n    return (\n        a,\n        b,\n    )\n",
            ),
            ("for x in (a, b,):\n    pass\n", "for x in a, b:\n    pass\n"),
        ];
        for (original, merged) in pairs {
            assert_eq!(check(original, merged), Equivalence::Equivalent, "{merged:?}");
        }
    }

    #[test]
    fn meaningful_commas_are_kept() {
        assert_eq!(check("y = x[1,]\n", "y = x[1]\n"), Equivalence::NotEquivalent);
        assert_eq!(check("y = x[1, 2]\n", "y = x[1, 2,]\n"), Equivalence::Equivalent);
        assert_eq!(check("x = 1,\n", "x = 1\n"), Equivalence::NotEquivalent);
        assert_eq!(check("x = (1,)\n", "x = 1,\n"), Equivalence::Equivalent);
        assert_eq!(check("x = (1,)\n", "x = (1)\n"), Equivalence::NotEquivalent);
    }

    #[test]
    fn backslash_continuation_is_ignored() {
        assert_eq!(check("x = 1 + \\\n    2\n", "x = 1 + 2\n"), Equivalence::Equivalent);
    }

    #[test]
    fn semicolons_are_ignored() {
        assert_eq!(check("a = 1; b = 2\n", "a = 1\nb = 2\n"), Equivalence::Equivalent);
    }

    #[test]
    fn string_normalization() {
        assert_eq!(check("s = 'it\\'s'\n", "s = \"it's\"\n"), Equivalence::Equivalent);
        assert_eq!(check("s = U'x'\n", "s = 'x'\n"), Equivalence::Equivalent);
        assert_eq!(check("s = B'x'\n", "s = b'x'\n"), Equivalence::Equivalent);
        assert_eq!(check("s = 'a'\n", "s = 'b'\n"), Equivalence::NotEquivalent);
        assert_eq!(check("s = b'x'\n", "s = 'x'\n"), Equivalence::NotEquivalent);
    }

    #[test]
    fn raw_strings_keep_escapes() {
        assert_eq!(check("s = r'\\''\n", "s = r\"'\"\n"), Equivalence::NotEquivalent);
    }

    #[test]
    fn docstring_indentation_is_ignored() {
        let original = "def f():\n  '''Summary.\n\n    Details.\n    '''\n  return 1\n";
        let merged = "def f():\n    \"\"\"Summary.\n\n    Details.\n    \"\"\"\n    return 1\n";
        assert_eq!(check(original, merged), Equivalence::Equivalent);
    }

    #[test]
    fn non_docstring_whitespace_is_significant() {
        let original = "x = 1\ns = '''a\n  b'''\n";
        let merged = "x = 1\ns = '''a\nb'''\n";
        assert_eq!(check(original, merged), Equivalence::NotEquivalent);
    }

    #[test]
    fn numeric_case_is_ignored() {
        assert_eq!(check("x = 0XFF + 1E5\n", "x = 0xff + 1e5\n"), Equivalence::Equivalent);
    }

    #[test]
    fn different_structure_is_not_equivalent() {
        assert_eq!(
            check("if a:\n    x = 1\n    y = 2\n", "if a:\n    x = 1\ny = 2\n"),
            Equivalence::NotEquivalent
        );
        assert_eq!(check("x = a + b\n", "x = a - b\n"), Equivalence::NotEquivalent);
    }

    #[test]
    fn broken_merge_is_a_merged_parse_failure() {
        assert_eq!(
            check("if True:\n  x = 1\n", "if True:\nx = 1\n"),
            Equivalence::ParseFailure(Side::Merged)
        );
    }

    #[test]
    fn unexpected_indent_is_a_parse_failure() {
        assert_eq!(
            check("if a:\n  x = 1\n  y = 2\n", "if a:\n  x = 1\n    y = 2\n"),
            Equivalence::ParseFailure(Side::Merged)
        );
    }

    #[test]
    fn unmatched_dedent_is_a_parse_failure() {
        assert_eq!(
            check(
                "if a:\n    x = 1\n    y = 2\n",
                "if a:\n    x = 1\n  y = 2\n",
            ),
            Equivalence::ParseFailure(Side::Merged)
        );
    }

    #[test]
    fn misaligned_else_is_a_parse_failure() {
        assert_eq!(
            check(
                "if a:\n    x = 1\nelse:\n    x = 2\n",
                "if a:\n    x = 1\n  else:\n    x = 2\n",
            ),
            Equivalence::ParseFailure(Side::Merged)
        );
    }

    #[test]
    fn inline_bodies_are_not_misaligned() {
        assert_eq!(
            check("if a: x = 1\nelse: x = 2\n", "if a:\n    x = 1\nelse:\n    x = 2\n"),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn broken_original_is_reported() {
        let mut verifier = AstVerifier::new(&TextDocument::from_text("def (:\n").unwrap()).unwrap();
        assert!(!verifier.original_parses());
        assert_eq!(
            verifier.verify(&TextDocument::from_text("x = 1\n").unwrap()),
            Equivalence::ParseFailure(Side::Original)
        );
    }

    #[test]
    fn crlf_and_lf_sources_compare_equal() {
        assert_eq!(check("x = 1\r\ny = 2\r\n", "x = 1\ny = 2\n"), Equivalence::Equivalent);
    }

    #[test]
    fn verifier_is_reusable() {
        let mut verifier = AstVerifier::new(&TextDocument::from_text("x=1\n").unwrap()).unwrap();
        for merged in ["x = 1\n", "x  =  1\n", "x = (1)\n"] {
            let doc = TextDocument::from_text(merged).unwrap();
            assert_eq!(verifier.verify(&doc), Equivalence::Equivalent, "{merged:?}");
        }
        let doc = TextDocument::from_text("x = 2\n").unwrap();
        assert_eq!(verifier.verify(&doc), Equivalence::NotEquivalent);
    }

    #[test]
    fn unescape_leaves_other_escapes() {
        assert_eq!(unescape_quotes(r"a\'b\nc\\"), r"a'b\nc\\");
    }
}
