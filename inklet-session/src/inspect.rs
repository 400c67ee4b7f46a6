//! Hover support: what is the name under the cursor, and what is its type?

use inklet_analysis::{
    binding::{Binding, BindingKind},
    types::Type,
};
use inklet_foundation::span::Span;
use inklet_syntax::{
    lexer::Lexer,
    token::{Token, TokenKind},
};

use crate::{
    host::Program,
    mapper::{pad_offset, unpad_span},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    pub text: String,
    /// The hovered identifier's span, in raw cell coordinates.
    pub span: Span,
}

/// Hover information at a raw cell offset.
pub fn quick_info_at(program: &Program, offset: usize) -> Option<QuickInfo> {
    let token = identifier_at(&program.cell.source, program, pad_offset(offset))?;
    let name = token.span.get_input(&program.cell.source);
    let binding = program
        .cell
        .analysis
        .scope
        .get(name)
        .or_else(|| program.decls.analysis.scope.get(name))?;
    Some(QuickInfo {
        text: describe(binding),
        span: unpad_span(token.span),
    })
}

fn describe(binding: &Binding) -> String {
    let name = &binding.name;
    match &binding.kind {
        BindingKind::Var { kind } => format!("{} {name}: {}", kind.keyword(), binding.ty),
        BindingKind::Function => match &binding.ty {
            Type::Function(signature) => {
                let mut text = String::new();
                if signature.is_async {
                    text.push_str("async ");
                }
                text.push_str(&format!("function {name}("));
                for (i, (param, ty)) in signature.params.iter().enumerate() {
                    if i > 0 {
                        text.push_str(", ");
                    }
                    text.push_str(&format!("{param}: {ty}"));
                }
                text.push_str(&format!("): {}", signature.ret));
                text
            }
            other => format!("function {name}: {other}"),
        },
        BindingKind::Class => format!("class {name}"),
        BindingKind::Interface => format!("interface {name}"),
        BindingKind::TypeAlias => format!("type {name} = {}", binding.ty),
        BindingKind::Enum => format!("enum {name}"),
        BindingKind::ImportedName { module, .. } | BindingKind::ImportedNamespace { module } => {
            format!("import {name} from \"{module}\": {}", binding.ty)
        }
    }
}

/// The identifier token under the cursor, or the one ending exactly at it.
/// The latter matters because a cursor at a token's end is the common hover
/// position right after typing.
pub(crate) fn identifier_at(source: &str, program: &Program, offset: usize) -> Option<Token> {
    let tokens = Lexer::new(program.cell.file, source).lex(&mut ());
    tokens
        .into_iter()
        .filter(|token| token.kind == TokenKind::Ident)
        .find(|token| token.span.contains(offset) || token.span.end == offset)
}

#[cfg(test)]
mod tests {
    use crate::{session::Session, vfs::MemoryFs};

    use super::*;

    #[test]
    fn hovering_a_variable_shows_its_type() {
        let mut session = Session::new(MemoryFs::new());
        session.apply_cell("let answer = 42;").unwrap();
        let source = "let answer = 42;";
        let offset = source.find("answer").unwrap() + 3;
        let info = session.quick_info(offset).unwrap().unwrap();
        assert_eq!(info.text, "let answer: number");
        assert_eq!(info.span, Span::new(4, 10));
    }

    #[test]
    fn names_from_prior_cells_resolve_through_the_declarations() {
        let mut session = Session::new(MemoryFs::new());
        session.apply_cell("function greet(who: string): string;").unwrap();
        session.apply_cell("greet").unwrap();
        let info = session.quick_info(5).unwrap().unwrap();
        assert_eq!(info.text, "function greet(who: string): string");
    }

    #[test]
    fn hovering_whitespace_yields_nothing() {
        let mut session = Session::new(MemoryFs::new());
        session.apply_cell("let a = 1;   let b = 2;").unwrap();
        assert_eq!(session.quick_info(11).unwrap(), None);
    }
}
