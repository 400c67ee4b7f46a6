//! Completion support.
//!
//! Candidates come from the cell's own scope, then the accumulated
//! declarations, then globals and keywords, in that order. Matches are
//! re-ranked into three coarse buckets (exact prefix, case-insensitive
//! prefix, case-insensitive substring); within a bucket the native scope
//! order is kept, so ties stay stable across repeated queries.

use indexmap::IndexSet;
use inklet_foundation::span::Span;

use crate::{
    host::Program,
    inspect::identifier_at,
    mapper::{pad_offset, unpad_span},
};

const GLOBALS: &[&str] = &["console", "Math", "JSON"];

const KEYWORDS: &[&str] = &[
    "async", "await", "class", "const", "let", "function", "interface", "type", "enum", "import",
    "export", "from", "as", "return", "if", "else", "while", "new", "extends", "true", "false",
    "null",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionList {
    /// The range the completion replaces, in raw cell coordinates. Empty at
    /// the cursor when there is no identifier to replace.
    pub replace_span: Span,
    pub entries: Vec<String>,
}

/// Completion candidates at a raw cell offset.
pub fn complete_at(program: &Program, offset: usize) -> CompletionList {
    let padded = pad_offset(offset);
    let (prefix, replace_span) =
        match identifier_at(&program.cell.source, program, padded) {
            Some(token) => (
                token.span.get_input(&program.cell.source).to_owned(),
                unpad_span(token.span),
            ),
            None => (String::new(), unpad_span(Span::new(padded, padded))),
        };

    let mut candidates = IndexSet::new();
    for name in program.cell.analysis.scope.names() {
        candidates.insert(name.to_owned());
    }
    for name in program.decls.analysis.scope.names() {
        candidates.insert(name.to_owned());
    }
    for name in GLOBALS.iter().chain(KEYWORDS) {
        candidates.insert((*name).to_owned());
    }

    let mut ranked: Vec<(u8, String)> = candidates
        .into_iter()
        .filter_map(|candidate| bucket(&candidate, &prefix).map(|rank| (rank, candidate)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    CompletionList {
        replace_span,
        entries: ranked.into_iter().map(|(_, candidate)| candidate).collect(),
    }
}

fn bucket(candidate: &str, prefix: &str) -> Option<u8> {
    if prefix.is_empty() || candidate.starts_with(prefix) {
        return Some(0);
    }
    let candidate_lower = candidate.to_lowercase();
    let prefix_lower = prefix.to_lowercase();
    if candidate_lower.starts_with(&prefix_lower) {
        Some(1)
    } else if candidate_lower.contains(&prefix_lower) {
        Some(2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::{session::Session, vfs::MemoryFs};

    use super::*;

    #[test]
    fn buckets_rank_exact_before_case_insensitive_before_substring() {
        assert_eq!(bucket("alpha", "al"), Some(0));
        assert_eq!(bucket("Alps", "al"), Some(1));
        assert_eq!(bucket("metal", "al"), Some(2));
        assert_eq!(bucket("beta", "al"), None);
    }

    #[test]
    fn completion_is_ranked_and_stable() {
        let mut session = Session::new(MemoryFs::new());
        session
            .apply_cell("let metal = 1;\nlet alpha = 2;\nlet Alps = 3;\nal")
            .unwrap();
        let source = "let metal = 1;\nlet alpha = 2;\nlet Alps = 3;\nal";
        let list = session.complete(source.len()).unwrap();
        assert_eq!(&list.entries[..3], &["alpha", "Alps", "metal"]);
    }

    #[test]
    fn empty_prefix_keeps_native_scope_order() {
        let mut session = Session::new(MemoryFs::new());
        session.apply_cell("let zebra = 1;\nlet aardvark = 2;").unwrap();
        session.apply_cell("let local = 3;").unwrap();
        let list = session.complete("let local = 3;".len()).unwrap();
        let local = list.entries.iter().position(|e| e == "local").unwrap();
        let zebra = list.entries.iter().position(|e| e == "zebra").unwrap();
        let aardvark = list.entries.iter().position(|e| e == "aardvark").unwrap();
        assert!(local < zebra);
        assert!(zebra < aardvark);
    }
}
