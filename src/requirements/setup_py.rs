//! Dependency declarations in `setup.py` build scripts
//!
//! The script is parsed into a syntax tree and never executed. Every
//! keyword argument named `requires` or `install_requires` is inspected and
//! all string literals below its value are collected, whatever shape the
//! value has (list, tuple, concatenation, nested call). Adjacent literals
//! (`'zope' '.interface'`) count as one string.
//!
//! Statements the grammar cannot parse, such as the Python 2 form
//! `exec code in ns`, are skipped. Keyword arguments outside the damaged
//! region are still collected; one that overlaps it is ignored.

use crate::MirrorError;
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

/// Keyword arguments that declare dependencies
const REQUIREMENT_KEYWORDS: &[&str] = &["requires", "install_requires"];

/// Collects the raw requirement strings declared by a `setup.py`
///
/// # Returns
///
/// * `Ok(BTreeSet<String>)` - Every string literal under an intact requirement keyword
/// * `Err(MirrorError::DeclarationParseFailed)` - The parser could not be set up
pub fn parse_setup_py(source: &[u8]) -> Result<BTreeSet<String>, MirrorError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| parse_failed(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_failed("parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(
            "setup.py has a syntax error near line {}, scanning the intact parts",
            first_error_line(root).unwrap_or(0) + 1
        );
    }

    let mut requirements = BTreeSet::new();
    let mut stack = vec![(root, false)];
    while let Some((node, damaged)) = stack.pop() {
        let damaged = damaged || node.is_error() || node.is_missing();
        if !damaged
            && node.kind() == "keyword_argument"
            && !node.has_error()
            && is_requirement_keyword(node, source)
        {
            if let Some(value) = node.child_by_field_name("value") {
                collect_strings(value, source, &mut requirements);
            }
        }
        stack.extend(children(node).into_iter().rev().map(|child| (child, damaged)));
    }

    Ok(requirements)
}

fn parse_failed(message: String) -> MirrorError {
    MirrorError::DeclarationParseFailed {
        file: "setup.py".to_string(),
        message,
    }
}

fn is_requirement_keyword(node: Node<'_>, source: &[u8]) -> bool {
    node.child_by_field_name("name")
        .and_then(|name| name.utf8_text(source).ok())
        .is_some_and(|name| REQUIREMENT_KEYWORDS.contains(&name))
}

/// Collects the contents of every string literal in the subtree
fn collect_strings(value: Node<'_>, source: &[u8], out: &mut BTreeSet<String>) {
    let mut stack = vec![value];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "string" => {
                out.insert(string_contents(node, source));
            }
            "concatenated_string" => {
                let joined: String = children(node)
                    .into_iter()
                    .filter(|part| part.kind() == "string")
                    .map(|part| string_contents(part, source))
                    .collect();
                out.insert(joined);
            }
            _ => stack.extend(children(node).into_iter().rev()),
        }
    }
}

/// Returns the literal text of a string node without prefix and quotes
fn string_contents(node: Node<'_>, source: &[u8]) -> String {
    children(node)
        .into_iter()
        .filter(|child| matches!(child.kind(), "string_content" | "escape_sequence"))
        .filter_map(|child| child.utf8_text(source).ok())
        .collect()
}

/// Direct children of a node, in source order
fn children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row);
        }
        if node.has_error() {
            stack.extend(children(node).into_iter().rev());
        }
    }
    None
}
