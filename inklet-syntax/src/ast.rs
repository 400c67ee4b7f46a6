use inklet_foundation::span::{Span, Spanned};

/// One parsed module: a cell, the accumulated-declarations file, or an
/// on-disk/in-memory module.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Var(VarStmt),
    Function(FunctionDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Enum(EnumDecl),
    Import(ImportDecl),
    ExportList(ExportList),
    Expr(ExprStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    Block(Block),
    Empty(Span),
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Var(stmt) => stmt.span,
            Stmt::Function(decl) => decl.span,
            Stmt::Class(decl) => decl.span,
            Stmt::Interface(decl) => decl.span,
            Stmt::TypeAlias(decl) => decl.span,
            Stmt::Enum(decl) => decl.span,
            Stmt::Import(decl) => decl.span,
            Stmt::ExportList(list) => list.span,
            Stmt::Expr(stmt) => stmt.span,
            Stmt::Return(stmt) => stmt.span,
            Stmt::If(stmt) => stmt.span,
            Stmt::While(stmt) => stmt.span,
            Stmt::Block(block) => block.span,
            Stmt::Empty(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Spanned for Ident {
    fn span(&self) -> Span {
        self.span
    }
}

/// A `: Type` annotation. `span` covers the colon through the end of the
/// type, which is exactly the range the emitter erases.
#[derive(Debug, Clone)]
pub struct TypeAnnotation {
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Named(Ident),
    Array(Box<TypeExpr>, Span),
}

impl Spanned for TypeExpr {
    fn span(&self) -> Span {
        match self {
            TypeExpr::Named(ident) => ident.span,
            TypeExpr::Array(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
}

impl VarKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarStmt {
    pub span: Span,
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub span: Span,
    pub name: Ident,
    pub annotation: Option<TypeAnnotation>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub annotation: Option<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub span: Span,
    pub is_async: bool,
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_annotation: Option<TypeAnnotation>,
    /// `None` for the body-less signature form (`function f(): number;`).
    pub body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub span: Span,
    pub name: Ident,
    pub extends: Option<Ident>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Field(FieldMember),
    Method(FunctionDecl),
}

#[derive(Debug, Clone)]
pub struct FieldMember {
    pub span: Span,
    pub name: Ident,
    pub annotation: Option<TypeAnnotation>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub span: Span,
    pub name: Ident,
    pub members: Vec<InterfaceMember>,
}

#[derive(Debug, Clone)]
pub struct InterfaceMember {
    pub span: Span,
    pub name: Ident,
    pub annotation: TypeAnnotation,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub span: Span,
    pub name: Ident,
    pub variants: Vec<Ident>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub span: Span,
    /// The module specifier with quotes stripped.
    pub module: String,
    pub module_span: Span,
    pub clause: ImportClause,
}

#[derive(Debug, Clone)]
pub enum ImportClause {
    Named(Vec<ImportSpecifier>),
    Namespace(Ident),
}

#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub span: Span,
    /// The exported name in the source module.
    pub imported: Ident,
    /// The local binding; equal to `imported` unless aliased with `as`.
    pub local: Ident,
}

impl ImportSpecifier {
    pub fn is_aliased(&self) -> bool {
        self.imported.text != self.local.text
    }
}

/// `export { a, b };` - also covers the bare `export {};` module marker.
#[derive(Debug, Clone)]
pub struct ExportList {
    pub span: Span,
    pub names: Vec<Ident>,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub span: Span,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub span: Span,
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub span: Span,
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    /// The literal's text with quotes stripped but escapes unprocessed.
    String(String),
    Bool(bool),
    Null,
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Ident,
    },
    New {
        class: Ident,
        args: Vec<Expr>,
    },
    Await(Box<Expr>),
    Paren(Box<Expr>),
}

impl Expr {
    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, ExprKind::Assign { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}
