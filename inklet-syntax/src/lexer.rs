use inklet_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::SourceFileId,
    span::Span,
};

use crate::{
    diagnostics,
    token::{Token, TokenKind},
};

pub struct Lexer<'a> {
    pub file: SourceFileId,
    pub input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: SourceFileId, input: &'a str) -> Self {
        Self {
            file,
            input,
            position: 0,
        }
    }

    /// Lexes the entire input into a token vector terminated by `EndOfFile`.
    ///
    /// Unrecognized input produces `Error` tokens alongside diagnostics; the
    /// parser skips over them.
    pub fn lex(mut self, diagnostics: &mut dyn DiagnosticSink) -> Vec<Token> {
        let mut tokens = vec![];
        loop {
            let token = self.next_token(diagnostics);
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_char2(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.position += c.len_utf8();
        }
    }

    fn skip_trivia(&mut self, diagnostics: &mut dyn DiagnosticSink) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some('/') if self.peek_char2() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_char2() == Some('*') => {
                    let start = self.position;
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.peek_char() {
                        if c == '*' && self.peek_char2() == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        diagnostics.emit(
                            Diagnostic::error(self.file, "unterminated block comment")
                                .with_code(diagnostics::UNRECOGNIZED_CHARACTER)
                                .with_label(Label::primary(
                                    Span::new(start, self.position),
                                    "comment opened here",
                                )),
                        );
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self, diagnostics: &mut dyn DiagnosticSink) -> Token {
        self.skip_trivia(diagnostics);
        let start = self.position;
        let Some(c) = self.peek_char() else {
            return Token {
                kind: TokenKind::EndOfFile,
                span: Span::new(start, start),
            };
        };

        let kind = match c {
            c if c.is_ascii_alphabetic() || c == '_' => return self.ident_or_keyword(start),
            c if c.is_ascii_digit() => return self.number(start, diagnostics),
            '"' | '\'' => return self.string(start, c, diagnostics),
            '+' => self.single_or_assign(TokenKind::Add, TokenKind::AddAssign),
            '-' => self.single_or_assign(TokenKind::Sub, TokenKind::SubAssign),
            '*' => self.single_or_assign(TokenKind::Mul, TokenKind::MulAssign),
            '/' => self.single_or_assign(TokenKind::Div, TokenKind::DivAssign),
            '%' => {
                self.advance();
                TokenKind::Rem
            }
            '!' => self.single_or_assign(TokenKind::Not, TokenKind::NotEqual),
            '=' => self.single_or_assign(TokenKind::Assign, TokenKind::Equal),
            '<' => self.single_or_assign(TokenKind::Less, TokenKind::LessEqual),
            '>' => self.single_or_assign(TokenKind::Greater, TokenKind::GreaterEqual),
            '&' if self.peek_char2() == Some('&') => {
                self.advance();
                self.advance();
                TokenKind::And
            }
            '|' if self.peek_char2() == Some('|') => {
                self.advance();
                self.advance();
                TokenKind::Or
            }
            '(' => {
                self.advance();
                TokenKind::LeftParen
            }
            ')' => {
                self.advance();
                TokenKind::RightParen
            }
            '[' => {
                self.advance();
                TokenKind::LeftBracket
            }
            ']' => {
                self.advance();
                TokenKind::RightBracket
            }
            '{' => {
                self.advance();
                TokenKind::LeftBrace
            }
            '}' => {
                self.advance();
                TokenKind::RightBrace
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            other => {
                self.advance();
                diagnostics.emit(
                    Diagnostic::error(self.file, format!("unrecognized character `{other}`"))
                        .with_code(diagnostics::UNRECOGNIZED_CHARACTER)
                        .with_label(Label::primary(
                            Span::new(start, self.position),
                            "this character is not part of ink's syntax",
                        )),
                );
                TokenKind::Error
            }
        };
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    fn single_or_assign(&mut self, single: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('=') {
            self.advance();
            with_eq
        } else {
            single
        }
    }

    fn ident_or_keyword(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let span = Span::new(start, self.position);
        let kind =
            TokenKind::keyword(span.get_input(self.input)).unwrap_or(TokenKind::Ident);
        Token { kind, span }
    }

    fn number(&mut self, start: usize, diagnostics: &mut dyn DiagnosticSink) -> Token {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') && self.peek_char2().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let span = Span::new(start, self.position);
        if span.get_input(self.input).parse::<f64>().is_err() {
            diagnostics.emit(
                Diagnostic::error(self.file, "malformed number literal")
                    .with_code(diagnostics::MALFORMED_NUMBER)
                    .with_label(Label::primary(span, "")),
            );
            return Token {
                kind: TokenKind::Error,
                span,
            };
        }
        Token {
            kind: TokenKind::Number,
            span,
        }
    }

    fn string(
        &mut self,
        start: usize,
        quote: char,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Token {
        self.advance();
        loop {
            match self.peek_char() {
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\n') | None => {
                    let span = Span::new(start, self.position);
                    diagnostics.emit(
                        Diagnostic::error(self.file, "unterminated string literal")
                            .with_code(diagnostics::UNTERMINATED_STRING)
                            .with_label(Label::primary(span, "string opened here")),
                    );
                    return Token {
                        kind: TokenKind::Error,
                        span,
                    };
                }
                Some(_) => self.advance(),
            }
        }
        Token {
            kind: TokenKind::String,
            span: Span::new(start, self.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use inklet_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    fn lex(input: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut set = SourceFileSet::new();
        let id = set.add(SourceFile::new("test.ink", input));
        let mut diagnostics = vec![];
        let tokens = Lexer::new(id, input).lex(&mut diagnostics);
        (tokens, diagnostics)
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).0.into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            kinds("let letter await x"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Await,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("== = += <= && ||"),
            vec![
                TokenKind::Equal,
                TokenKind::Assign,
                TokenKind::AddAssign,
                TokenKind::LessEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("1 // comment\n/* block */ 2"),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let (tokens, diagnostics) = lex("\"oops");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(diagnostics::UNTERMINATED_STRING));
    }

    #[test]
    fn spans_are_byte_accurate() {
        let (tokens, _) = lex("let abc");
        assert_eq!(tokens[1].span, Span::new(4, 7));
    }
}
