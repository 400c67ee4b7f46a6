//! Translation between the padded synthetic coordinate space and the user's
//! raw cell coordinates.
//!
//! Every synthetic file is prefixed with [`CELL_HEADER`] so that even a
//! single-statement cell is its own module scope. The header is exactly one
//! line, so translation subtracts one line and the header's byte length and
//! leaves columns alone. All diagnostic and query paths go through this
//! module; nothing else may do offset arithmetic.

use inklet_foundation::{
    errors,
    source::{SourceFileSet, SourceFileId},
    span::{Position, Span},
};
use inklet_analysis::diagnostics::AWAIT_OUTSIDE_ASYNC;

/// The module-scope marker prefixed to every synthetic file.
pub const CELL_HEADER: &str = "export {};\n";

/// Prefixes raw cell or declarations text with the synthetic header.
pub fn pad(source: &str) -> String {
    format!("{CELL_HEADER}{source}")
}

/// Translates a padded offset back into raw cell coordinates.
pub fn unpad_offset(offset: usize) -> usize {
    offset.saturating_sub(CELL_HEADER.len())
}

/// Translates a raw cell offset into the padded coordinate space.
pub fn pad_offset(offset: usize) -> usize {
    offset + CELL_HEADER.len()
}

pub fn unpad_span(span: Span) -> Span {
    span.shifted_left(CELL_HEADER.len())
}

fn unpad_position(position: Position) -> Position {
    Position {
        offset: position.offset.saturating_sub(CELL_HEADER.len()),
        line: position.line.saturating_sub(1),
        column: position.column,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl From<errors::Severity> for Severity {
    fn from(severity: errors::Severity) -> Self {
        match severity {
            errors::Severity::Bug | errors::Severity::Error => Severity::Error,
            errors::Severity::Warning => Severity::Warning,
            errors::Severity::Note | errors::Severity::Help => Severity::Info,
        }
    }
}

/// A diagnostic as handed to the session's caller, in raw coordinates.
#[derive(Debug, Clone)]
pub struct CellDiagnostic {
    pub start: Position,
    pub end: Position,
    pub message: String,
    pub severity: Severity,
    pub code: u32,
    /// `None` for the cell itself; the dependency's path otherwise.
    pub source_file: Option<String>,
}

impl CellDiagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Maps one compiler diagnostic into caller coordinates. `synthetic` selects
/// whether the header contribution is subtracted.
pub fn map_diagnostic(
    diagnostic: &errors::Diagnostic,
    files: &SourceFileSet,
    file: SourceFileId,
    synthetic: bool,
    source_file: Option<&str>,
) -> CellDiagnostic {
    let span = diagnostic.primary_span().unwrap_or(Span::new(0, 0));
    let source = files.get(file);
    let mut start = source.position_at(span.start);
    let mut end = source.position_at(span.end);
    if synthetic {
        start = unpad_position(start);
        end = unpad_position(end);
    }
    CellDiagnostic {
        start,
        end,
        message: diagnostic.message.clone(),
        severity: diagnostic.severity.into(),
        code: diagnostic.code.unwrap_or(0),
        source_file: source_file.map(str::to_owned),
    }
}

/// Removes the "await outside async" diagnostics whose offending `await` is
/// lexically at the cell's top level. Those are a permitted construct; the
/// caller learns about them through the returned flag instead.
pub fn intercept_top_level_suspend<'a>(
    diagnostics: &'a [errors::Diagnostic],
    top_level_awaits: &[Span],
) -> (Vec<&'a errors::Diagnostic>, bool) {
    let mut has_top_level_suspend = false;
    let kept = diagnostics
        .iter()
        .filter(|diagnostic| {
            let intercepted = diagnostic.code == Some(AWAIT_OUTSIDE_ASYNC)
                && diagnostic
                    .primary_span()
                    .is_some_and(|span| top_level_awaits.contains(&span));
            if intercepted {
                has_top_level_suspend = true;
            }
            !intercepted
        })
        .collect();
    (kept, has_top_level_suspend)
}

#[cfg(test)]
mod tests {
    use inklet_foundation::source::SourceFile;

    use super::*;

    #[test]
    fn header_is_one_full_line() {
        assert!(CELL_HEADER.ends_with('\n'));
        assert_eq!(CELL_HEADER.matches('\n').count(), 1);
    }

    #[test]
    fn offsets_round_trip_through_the_header() {
        for offset in [0, 1, 7, 42] {
            assert_eq!(unpad_offset(pad_offset(offset)), offset);
        }
    }

    #[test]
    fn mapped_positions_lose_the_header_line() {
        let raw = "let a = 1;\nlet b = 2;";
        let padded = pad(raw);
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("__cell__.ink", padded));
        // Offset of `b` in the raw text.
        let raw_offset = raw.find('b').unwrap();
        let diagnostic = errors::Diagnostic::error(id, "test")
            .with_label(errors::Label::primary(
                Span::new(pad_offset(raw_offset), pad_offset(raw_offset + 1)),
                "",
            ));
        let mapped = map_diagnostic(&diagnostic, &files, id, true, None);
        assert_eq!(mapped.start.offset, raw_offset);
        assert_eq!(mapped.start.line, 1);
        assert_eq!(mapped.start.column, 4);
    }
}
