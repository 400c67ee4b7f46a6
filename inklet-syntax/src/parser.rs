use inklet_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::SourceFileId,
    span::{Span, Spanned},
};

use crate::{
    ast::*,
    diagnostics,
    lexer::Lexer,
    token::{Token, TokenKind},
};

/// The AST node could not be parsed. A diagnostic has already been emitted;
/// this only carries the span to recover from.
pub struct ParseError {
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

/// Parses a whole module. Statements that fail to parse are dropped after
/// emitting a diagnostic; the parser resynchronizes on `;` and `}`.
pub fn parse_file(
    file: SourceFileId,
    input: &str,
    diagnostics: &mut dyn DiagnosticSink,
) -> File {
    let tokens = Lexer::new(file, input).lex(diagnostics);
    let mut parser = Parser {
        file,
        input,
        tokens,
        cursor: 0,
        diagnostics,
    };
    parser.file()
}

struct Parser<'a> {
    file: SourceFileId,
    input: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    diagnostics: &'a mut dyn DiagnosticSink,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn peek2(&self) -> Token {
        self.tokens[(self.cursor + 1).min(self.tokens.len() - 1)]
    }

    fn next_token(&mut self) -> Token {
        let token = self.peek();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.next_token())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if let Some(token) = self.eat(kind) {
            Ok(token)
        } else {
            let token = self.peek();
            self.diagnostics.emit(
                Diagnostic::error(self.file, format!("{what} expected"))
                    .with_code(diagnostics::EXPECTED_TOKEN)
                    .with_label(Label::primary(token.span, format!("{what} expected here"))),
            );
            Err(ParseError::new(token.span))
        }
    }

    fn text(&self, token: Token) -> &'a str {
        token.span.get_input(self.input)
    }

    fn ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.expect(TokenKind::Ident, "identifier")?;
        Ok(Ident {
            text: self.text(token).to_owned(),
            span: token.span,
        })
    }

    /// Skips ahead to just past the next `;`, or to a `}`/end of file,
    /// whichever comes first.
    fn resync(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.next_token();
                    break;
                }
                TokenKind::RightBrace | TokenKind::EndOfFile => break,
                _ => {
                    self.next_token();
                }
            }
        }
    }

    fn file(&mut self) -> File {
        let mut statements = vec![];
        while !self.at(TokenKind::EndOfFile) {
            match self.statement() {
                Ok(statement) => statements.push(statement),
                Err(_) => {
                    self.resync();
                    // `resync` leaves a `}` for the enclosing block to
                    // consume; at the top level there is none.
                    self.eat(TokenKind::RightBrace);
                }
            }
        }
        File { statements }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Let | TokenKind::Const => self.var_statement().map(Stmt::Var),
            TokenKind::Function => self.function_decl(false).map(Stmt::Function),
            TokenKind::Async if self.peek2().kind == TokenKind::Function => {
                self.next_token();
                let mut decl = self.function_decl(true)?;
                decl.span = token.span.join(&decl.span);
                Ok(Stmt::Function(decl))
            }
            TokenKind::Class => self.class_decl().map(Stmt::Class),
            TokenKind::Interface => self.interface_decl().map(Stmt::Interface),
            TokenKind::Type => self.type_alias().map(Stmt::TypeAlias),
            TokenKind::Enum => self.enum_decl().map(Stmt::Enum),
            TokenKind::Import => self.import_decl().map(Stmt::Import),
            TokenKind::Export => self.export_list().map(Stmt::ExportList),
            TokenKind::Return => self.return_statement().map(Stmt::Return),
            TokenKind::If => self.if_statement().map(Stmt::If),
            TokenKind::While => self.while_statement().map(Stmt::While),
            TokenKind::LeftBrace => self.block().map(Stmt::Block),
            TokenKind::Semicolon => {
                self.next_token();
                Ok(Stmt::Empty(token.span))
            }
            TokenKind::RightBrace => {
                self.diagnostics.emit(
                    Diagnostic::error(self.file, "statement expected")
                        .with_code(diagnostics::EXPECTED_STATEMENT)
                        .with_label(Label::primary(token.span, "statement expected here")),
                );
                Err(ParseError::new(token.span))
            }
            _ => self.expr_statement().map(Stmt::Expr),
        }
    }

    fn var_statement(&mut self) -> Result<VarStmt, ParseError> {
        let keyword = self.next_token();
        let kind = match keyword.kind {
            TokenKind::Const => VarKind::Const,
            _ => VarKind::Let,
        };
        let mut declarators = vec![];
        loop {
            let name = self.ident()?;
            let annotation = self.annotation()?;
            let init = if self.eat(TokenKind::Assign).is_some() {
                Some(self.expression()?)
            } else {
                None
            };
            let end = init
                .as_ref()
                .map(|expr| expr.span)
                .or(annotation.as_ref().map(|a| a.span))
                .unwrap_or(name.span);
            declarators.push(Declarator {
                span: name.span.join(&end),
                name,
                annotation,
                init,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(VarStmt {
            span: keyword.span.join(&semi.span),
            kind,
            declarators,
        })
    }

    fn annotation(&mut self) -> Result<Option<TypeAnnotation>, ParseError> {
        let Some(colon) = self.eat(TokenKind::Colon) else {
            return Ok(None);
        };
        let ty = self.type_expr()?;
        Ok(Some(TypeAnnotation {
            span: colon.span.join(&ty.span()),
            ty,
        }))
    }

    fn type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Ident && token.kind != TokenKind::Null {
            self.diagnostics.emit(
                Diagnostic::error(self.file, "type expected")
                    .with_code(diagnostics::EXPECTED_TYPE)
                    .with_label(Label::primary(token.span, "type expected here")),
            );
            return Err(ParseError::new(token.span));
        }
        let token = self.next_token();
        let mut ty = TypeExpr::Named(Ident {
            text: self.text(token).to_owned(),
            span: token.span,
        });
        while self.at(TokenKind::LeftBracket) && self.peek2().kind == TokenKind::RightBracket {
            self.next_token();
            let close = self.next_token();
            ty = TypeExpr::Array(Box::new(ty), token.span.join(&close.span));
        }
        Ok(ty)
    }

    fn function_decl(&mut self, is_async: bool) -> Result<FunctionDecl, ParseError> {
        let keyword = self.expect(TokenKind::Function, "`function`")?;
        let name = self.ident()?;
        self.expect(TokenKind::LeftParen, "`(`")?;
        let mut params = vec![];
        while !self.at(TokenKind::RightParen) {
            let name = self.ident()?;
            let annotation = self.annotation()?;
            let end = annotation.as_ref().map(|a| a.span).unwrap_or(name.span);
            params.push(Param {
                span: name.span.join(&end),
                name,
                annotation,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "`)`")?;
        let return_annotation = self.annotation()?;
        let (body, end) = if self.at(TokenKind::LeftBrace) {
            let block = self.block()?;
            let span = block.span;
            (Some(block), span)
        } else {
            let semi = self.expect(TokenKind::Semicolon, "`{` or `;`")?;
            (None, semi.span)
        };
        Ok(FunctionDecl {
            span: keyword.span.join(&end),
            is_async,
            name,
            params,
            return_annotation,
            body,
        })
    }

    fn class_decl(&mut self) -> Result<ClassDecl, ParseError> {
        let keyword = self.next_token();
        let name = self.ident()?;
        let extends = if self.eat(TokenKind::Extends).is_some() {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut members = vec![];
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            members.push(self.class_member()?);
        }
        let close = self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(ClassDecl {
            span: keyword.span.join(&close.span),
            name,
            extends,
            members,
        })
    }

    fn class_member(&mut self) -> Result<ClassMember, ParseError> {
        let is_async =
            self.at(TokenKind::Async) && self.peek2().kind == TokenKind::Ident;
        if is_async {
            self.next_token();
        }
        let name = self.ident()?;
        if self.at(TokenKind::LeftParen) {
            // Method: reuse the function machinery past the name.
            self.next_token();
            let mut params = vec![];
            while !self.at(TokenKind::RightParen) {
                let param_name = self.ident()?;
                let annotation = self.annotation()?;
                let end = annotation
                    .as_ref()
                    .map(|a| a.span)
                    .unwrap_or(param_name.span);
                params.push(Param {
                    span: param_name.span.join(&end),
                    name: param_name,
                    annotation,
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RightParen, "`)`")?;
            let return_annotation = self.annotation()?;
            let (body, end) = if self.at(TokenKind::LeftBrace) {
                let block = self.block()?;
                let span = block.span;
                (Some(block), span)
            } else {
                let semi = self.expect(TokenKind::Semicolon, "`{` or `;`")?;
                (None, semi.span)
            };
            Ok(ClassMember::Method(FunctionDecl {
                span: name.span.join(&end),
                is_async,
                name,
                params,
                return_annotation,
                body,
            }))
        } else {
            let annotation = self.annotation()?;
            let init = if self.eat(TokenKind::Assign).is_some() {
                Some(self.expression()?)
            } else {
                None
            };
            let semi = self.expect(TokenKind::Semicolon, "`;`")?;
            Ok(ClassMember::Field(FieldMember {
                span: name.span.join(&semi.span),
                name,
                annotation,
                init,
            }))
        }
    }

    fn interface_decl(&mut self) -> Result<InterfaceDecl, ParseError> {
        let keyword = self.next_token();
        let name = self.ident()?;
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut members = vec![];
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            let member_name = self.ident()?;
            let colon = self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.type_expr()?;
            let annotation = TypeAnnotation {
                span: colon.span.join(&ty.span()),
                ty,
            };
            let semi = self.expect(TokenKind::Semicolon, "`;`")?;
            members.push(InterfaceMember {
                span: member_name.span.join(&semi.span),
                name: member_name,
                annotation,
            });
        }
        let close = self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(InterfaceDecl {
            span: keyword.span.join(&close.span),
            name,
            members,
        })
    }

    fn type_alias(&mut self) -> Result<TypeAliasDecl, ParseError> {
        let keyword = self.next_token();
        let name = self.ident()?;
        self.expect(TokenKind::Assign, "`=`")?;
        let ty = self.type_expr()?;
        let semi = self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(TypeAliasDecl {
            span: keyword.span.join(&semi.span),
            name,
            ty,
        })
    }

    fn enum_decl(&mut self) -> Result<EnumDecl, ParseError> {
        let keyword = self.next_token();
        let name = self.ident()?;
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut variants = vec![];
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            variants.push(self.ident()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(EnumDecl {
            span: keyword.span.join(&close.span),
            name,
            variants,
        })
    }

    fn import_decl(&mut self) -> Result<ImportDecl, ParseError> {
        let keyword = self.next_token();
        let clause = if self.eat(TokenKind::Mul).is_some() {
            self.expect(TokenKind::As, "`as`")?;
            ImportClause::Namespace(self.ident()?)
        } else {
            self.expect(TokenKind::LeftBrace, "`{`")?;
            let mut specifiers = vec![];
            while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
                let imported = self.ident()?;
                let local = if self.eat(TokenKind::As).is_some() {
                    self.ident()?
                } else {
                    imported.clone()
                };
                specifiers.push(ImportSpecifier {
                    span: imported.span.join(&local.span),
                    imported,
                    local,
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RightBrace, "`}`")?;
            ImportClause::Named(specifiers)
        };
        self.expect(TokenKind::From, "`from`")?;
        let module_token = self.expect(TokenKind::String, "module specifier")?;
        let module_text = self.text(module_token);
        let semi = self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(ImportDecl {
            span: keyword.span.join(&semi.span),
            module: module_text[1..module_text.len() - 1].to_owned(),
            module_span: module_token.span,
            clause,
        })
    }

    fn export_list(&mut self) -> Result<ExportList, ParseError> {
        let keyword = self.next_token();
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut names = vec![];
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            names.push(self.ident()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "`}`")?;
        let semi = self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(ExportList {
            span: keyword.span.join(&semi.span),
            names,
        })
    }

    fn return_statement(&mut self) -> Result<ReturnStmt, ParseError> {
        let keyword = self.next_token();
        let value = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        let semi = self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(ReturnStmt {
            span: keyword.span.join(&semi.span),
            value,
        })
    }

    fn if_statement(&mut self) -> Result<IfStmt, ParseError> {
        let keyword = self.next_token();
        self.expect(TokenKind::LeftParen, "`(`")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "`)`")?;
        let then_branch = Box::new(self.statement()?);
        let (else_branch, end) = if self.eat(TokenKind::Else).is_some() {
            let branch = self.statement()?;
            let span = branch.span();
            (Some(Box::new(branch)), span)
        } else {
            (None, then_branch.span())
        };
        Ok(IfStmt {
            span: keyword.span.join(&end),
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<WhileStmt, ParseError> {
        let keyword = self.next_token();
        self.expect(TokenKind::LeftParen, "`(`")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "`)`")?;
        let body = Box::new(self.statement()?);
        Ok(WhileStmt {
            span: keyword.span.join(&body.span()),
            condition,
            body,
        })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut statements = vec![];
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            match self.statement() {
                Ok(statement) => statements.push(statement),
                Err(_) => self.resync(),
            }
        }
        let close = self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(Block {
            span: open.span.join(&close.span),
            statements,
        })
    }

    fn expr_statement(&mut self) -> Result<ExprStmt, ParseError> {
        let expr = self.expression()?;
        let next = self.peek();
        let at_boundary = self.at(TokenKind::RightBrace)
            || self.at(TokenKind::EndOfFile)
            || self.input[expr.span.end..next.span.start].contains('\n');
        let end = if let Some(semi) = self.eat(TokenKind::Semicolon) {
            semi.span
        } else if at_boundary {
            // Tolerate a missing semicolon at a statement boundary; cells
            // frequently end in a bare expression.
            expr.span
        } else {
            let token = self.peek();
            self.diagnostics.emit(
                Diagnostic::error(self.file, "`;` expected")
                    .with_code(diagnostics::EXPECTED_TOKEN)
                    .with_label(Label::primary(token.span, "`;` expected here")),
            );
            return Err(ParseError::new(token.span));
        };
        Ok(ExprStmt {
            span: expr.span.join(&end),
            expr,
        })
    }

    // --- Expressions ---

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.logical_or()?;
        let op = match self.peek().kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::AddAssign => AssignOp::Add,
            TokenKind::SubAssign => AssignOp::Sub,
            TokenKind::MulAssign => AssignOp::Mul,
            TokenKind::DivAssign => AssignOp::Div,
            _ => return Ok(lhs),
        };
        let op_token = self.next_token();
        if !matches!(lhs.kind, ExprKind::Ident(_) | ExprKind::Member { .. }) {
            self.diagnostics.emit(
                Diagnostic::error(self.file, "invalid assignment target")
                    .with_code(diagnostics::EXPECTED_EXPRESSION)
                    .with_label(Label::primary(lhs.span, "cannot assign to this expression")),
            );
            return Err(ParseError::new(op_token.span));
        }
        let value = self.assignment()?;
        Ok(Expr {
            span: lhs.span.join(&value.span),
            kind: ExprKind::Assign {
                op,
                target: Box::new(lhs),
                value: Box::new(value),
            },
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.logical_and()?;
        while self.eat(TokenKind::Or).is_some() {
            let rhs = self.logical_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality()?;
        while self.eat(TokenKind::And).is_some() {
            let rhs = self.equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.next_token();
            let rhs = self.relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.next_token();
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Add => BinaryOp::Add,
                TokenKind::Sub => BinaryOp::Sub,
                _ => break,
            };
            self.next_token();
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Mul => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Rem => BinaryOp::Rem,
                _ => break,
            };
            self.next_token();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Sub | TokenKind::Not => {
                self.next_token();
                let operand = self.unary()?;
                let op = if token.kind == TokenKind::Sub {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                };
                Ok(Expr {
                    span: token.span.join(&operand.span),
                    kind: ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                })
            }
            TokenKind::Await => {
                self.next_token();
                let operand = self.unary()?;
                Ok(Expr {
                    span: token.span.join(&operand.span),
                    kind: ExprKind::Await(Box::new(operand)),
                })
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(TokenKind::Dot).is_some() {
                let property = self.ident()?;
                expr = Expr {
                    span: expr.span.join(&property.span),
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                };
            } else if self.at(TokenKind::LeftParen) {
                let (args, end) = self.arguments()?;
                expr = Expr {
                    span: expr.span.join(&end),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<(Vec<Expr>, Span), ParseError> {
        self.expect(TokenKind::LeftParen, "`(`")?;
        let mut args = vec![];
        while !self.at(TokenKind::RightParen) {
            args.push(self.expression()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RightParen, "`)`")?;
        Ok((args, close.span))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number => {
                self.next_token();
                let value = self
                    .text(token)
                    .parse::<f64>()
                    .expect("lexer only produces parseable number literals");
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Number(value),
                })
            }
            TokenKind::String => {
                self.next_token();
                let text = self.text(token);
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::String(text[1..text.len() - 1].to_owned()),
                })
            }
            TokenKind::True | TokenKind::False => {
                self.next_token();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Bool(token.kind == TokenKind::True),
                })
            }
            TokenKind::Null => {
                self.next_token();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Null,
                })
            }
            TokenKind::Ident => {
                self.next_token();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Ident(self.text(token).to_owned()),
                })
            }
            TokenKind::New => {
                self.next_token();
                let class = self.ident()?;
                let (args, end) = if self.at(TokenKind::LeftParen) {
                    self.arguments()?
                } else {
                    (vec![], class.span)
                };
                Ok(Expr {
                    span: token.span.join(&end),
                    kind: ExprKind::New { class, args },
                })
            }
            TokenKind::LeftParen => {
                self.next_token();
                let inner = self.expression()?;
                let close = self.expect(TokenKind::RightParen, "`)`")?;
                Ok(Expr {
                    span: token.span.join(&close.span),
                    kind: ExprKind::Paren(Box::new(inner)),
                })
            }
            _ => {
                self.diagnostics.emit(
                    Diagnostic::error(self.file, "expression expected")
                        .with_code(diagnostics::EXPECTED_EXPRESSION)
                        .with_label(Label::primary(token.span, "expression expected here")),
                );
                Err(ParseError::new(token.span))
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        span: lhs.span.join(&rhs.span),
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use inklet_foundation::source::{SourceFile, SourceFileSet};

    use super::*;

    fn parse(input: &str) -> (File, Vec<Diagnostic>) {
        let mut set = SourceFileSet::new();
        let id = set.add(SourceFile::new("test.ink", input));
        let mut diagnostics = vec![];
        let file = parse_file(id, input, &mut diagnostics);
        (file, diagnostics)
    }

    fn parse_clean(input: &str) -> File {
        let (file, diagnostics) = parse(input);
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            diagnostics
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        file
    }

    #[test]
    fn multi_declarator_let() {
        let file = parse_clean("let x = 3, y: string = \"hi\";");
        let Stmt::Var(var) = &file.statements[0] else {
            panic!("expected a var statement");
        };
        assert_eq!(var.declarators.len(), 2);
        assert_eq!(var.declarators[0].name.text, "x");
        assert!(var.declarators[1].annotation.is_some());
    }

    #[test]
    fn signature_form_function() {
        let file = parse_clean("function add(a: number, b: number): number;");
        let Stmt::Function(decl) = &file.statements[0] else {
            panic!("expected a function declaration");
        };
        assert!(decl.body.is_none());
        assert_eq!(decl.params.len(), 2);
    }

    #[test]
    fn class_with_fields_and_methods() {
        let file = parse_clean(indoc! {r#"
            class Point {
                x: number;
                y: number = 0;
                length(): number {
                    return this_is_fine;
                }
            }
        "#});
        let Stmt::Class(class) = &file.statements[0] else {
            panic!("expected a class declaration");
        };
        assert_eq!(class.members.len(), 3);
    }

    #[test]
    fn imports_with_aliases() {
        let file = parse_clean("import { a, b as c } from \"mod\";\nimport * as m from \"other\";");
        let Stmt::Import(named) = &file.statements[0] else {
            panic!("expected an import");
        };
        assert_eq!(named.module, "mod");
        let ImportClause::Named(specifiers) = &named.clause else {
            panic!("expected a named clause");
        };
        assert!(specifiers[1].is_aliased());
        let Stmt::Import(namespace) = &file.statements[1] else {
            panic!("expected an import");
        };
        assert!(matches!(namespace.clause, ImportClause::Namespace(_)));
    }

    #[test]
    fn export_list_allows_empty_braces() {
        let file = parse_clean("export {};\nexport { a, b };");
        let Stmt::ExportList(marker) = &file.statements[0] else {
            panic!("expected an export list");
        };
        assert!(marker.names.is_empty());
        let Stmt::ExportList(list) = &file.statements[1] else {
            panic!("expected an export list");
        };
        assert_eq!(list.names.len(), 2);
    }

    #[test]
    fn compound_assignment_parses() {
        let file = parse_clean("z -= 2;");
        let Stmt::Expr(stmt) = &file.statements[0] else {
            panic!("expected an expression statement");
        };
        assert!(matches!(
            stmt.expr.kind,
            ExprKind::Assign {
                op: AssignOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn await_is_a_unary_operator() {
        let file = parse_clean("await fetchData();");
        let Stmt::Expr(stmt) = &file.statements[0] else {
            panic!("expected an expression statement");
        };
        assert!(matches!(stmt.expr.kind, ExprKind::Await(_)));
    }

    #[test]
    fn recovery_skips_to_semicolon() {
        let (file, diagnostics) = parse("let = 3;\nlet ok = 1;");
        assert!(!diagnostics.is_empty());
        assert_eq!(file.statements.len(), 1);
        assert!(matches!(file.statements[0], Stmt::Var(_)));
    }

    #[test]
    fn trailing_expression_without_semicolon() {
        let file = parse_clean("x * y");
        assert!(matches!(file.statements[0], Stmt::Expr(_)));
    }

    #[test]
    fn stray_top_level_brace_is_consumed() {
        let (file, diagnostics) = parse("}");
        assert!(file.statements.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(diagnostics::EXPECTED_STATEMENT));

        let (file, diagnostics) = parse("}\nlet x = 1;");
        assert!(!diagnostics.is_empty());
        assert_eq!(file.statements.len(), 1);
        assert!(matches!(file.statements[0], Stmt::Var(_)));
    }

    #[test]
    fn newline_terminates_an_expression_statement() {
        let file = parse_clean("x * y\nexport { x };");
        assert!(matches!(file.statements[0], Stmt::Expr(_)));
        assert!(matches!(file.statements[1], Stmt::ExportList(_)));

        let (_, diagnostics) = parse("x * y z;");
        assert!(!diagnostics.is_empty());
    }
}
