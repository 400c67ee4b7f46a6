use indexmap::IndexMap;
use inklet_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::SourceFileId,
    span::Span,
};
use inklet_syntax::ast::*;
use tracing::trace;

use crate::{
    binding::{Binding, BindingKind, Capabilities, ModuleScope},
    diagnostics,
    types::{assignable, ClassShape, Shape, Type},
};

/// Everything the session needs to know about one compiled module: its
/// scope table, nominal shapes, and where top-level `await`s occur.
#[derive(Debug, Clone, Default)]
pub struct ModuleAnalysis {
    pub scope: ModuleScope,
    pub shapes: IndexMap<String, Shape>,
    pub top_level_awaits: Vec<Span>,
}

impl ModuleAnalysis {
    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }
}

/// Resolves import specifiers to already-analyzed modules. The session's
/// program builder implements this over its loaded dependency set.
pub trait ModuleResolver {
    fn resolve(&self, specifier: &str) -> Option<&ModuleAnalysis>;
}

/// Resolves nothing; for modules that are not allowed to import.
impl ModuleResolver for () {
    fn resolve(&self, _specifier: &str) -> Option<&ModuleAnalysis> {
        None
    }
}

/// Type of a global ambient value, if the name is one.
fn builtin_value(name: &str) -> Option<Type> {
    match name {
        "console" | "Math" | "JSON" => Some(Type::Any),
        _ => None,
    }
}

fn builtin_type(name: &str) -> Option<Type> {
    Some(match name {
        "number" => Type::Number,
        "string" => Type::String,
        "boolean" => Type::Boolean,
        "any" => Type::Any,
        "void" => Type::Void,
        "null" => Type::Null,
        _ => return None,
    })
}

/// Binds and checks one module.
///
/// `ambient` is the accumulated-declarations scope a cell compiles against;
/// names not found in the module's own scope fall through to it.
pub fn analyze(
    file: SourceFileId,
    ast: &File,
    ambient: Option<&ModuleAnalysis>,
    modules: &dyn ModuleResolver,
    diagnostics: &mut dyn DiagnosticSink,
) -> ModuleAnalysis {
    let mut checker = Checker {
        file,
        ambient,
        modules,
        diagnostics,
        analysis: ModuleAnalysis::default(),
        function: vec![],
        locals: vec![],
    };
    checker.hoist(ast);
    checker.resolve_signatures(ast);
    checker.check_file(ast);
    trace!(bindings = checker.analysis.scope.len(), "module analyzed");
    checker.analysis
}

struct FunctionContext {
    is_async: bool,
    return_type: Option<Type>,
}

struct Checker<'a> {
    file: SourceFileId,
    ambient: Option<&'a ModuleAnalysis>,
    modules: &'a dyn ModuleResolver,
    diagnostics: &'a mut dyn DiagnosticSink,
    analysis: ModuleAnalysis,
    function: Vec<FunctionContext>,
    locals: Vec<IndexMap<String, Type>>,
}

impl<'a> Checker<'a> {
    fn error(&mut self, code: u32, span: Span, message: impl Into<String>) {
        self.diagnostics.emit(
            Diagnostic::error(self.file, message)
                .with_code(code)
                .with_label(Label::primary(span, "")),
        );
    }

    fn declare(&mut self, binding: Binding) {
        let name = binding.name.clone();
        let span = binding.span;
        if let Some(previous) = self.analysis.scope.get(&name) {
            if previous.caps.intersects(binding.caps) {
                let previous_span = previous.span;
                self.analysis.scope.insert(binding);
                self.diagnostics.emit(
                    Diagnostic::error(
                        self.file,
                        format!("duplicate declaration of `{name}`"),
                    )
                    .with_code(diagnostics::DUPLICATE_DECLARATION)
                    .with_label(Label::primary(span, "redeclared here"))
                    .with_label(Label::secondary(previous_span, "first declared here")),
                );
                return;
            }
            // Disjoint levels merge: `let Foo: any;` alongside
            // `interface Foo { ... }` declares one name that is both a value
            // and a type. The value side's kind and type win the binding slot
            // (value lookups read them); the type side is reachable through
            // the capability flag and the shape table.
            let merged_caps = previous.caps | binding.caps;
            let value_side = if binding.caps.contains(Capabilities::VALUE) {
                binding
            } else {
                previous.clone()
            };
            self.analysis.scope.insert(Binding {
                caps: merged_caps,
                ..value_side
            });
            return;
        }
        self.analysis.scope.insert(binding);
    }

    // --- Pass 1: hoist module-scope names and capabilities ---

    fn hoist(&mut self, ast: &File) {
        for (stmt_index, stmt) in ast.statements.iter().enumerate() {
            match stmt {
                Stmt::Var(var) => {
                    for declarator in &var.declarators {
                        self.declare(Binding {
                            name: declarator.name.text.clone(),
                            caps: Capabilities::VALUE,
                            kind: BindingKind::Var { kind: var.kind },
                            ty: Type::Any,
                            span: declarator.name.span,
                            stmt_index,
                        });
                    }
                }
                Stmt::Function(decl) => self.declare(Binding {
                    name: decl.name.text.clone(),
                    caps: Capabilities::VALUE,
                    kind: BindingKind::Function,
                    ty: Type::Any,
                    span: decl.name.span,
                    stmt_index,
                }),
                Stmt::Class(decl) => self.declare(Binding {
                    name: decl.name.text.clone(),
                    caps: Capabilities::VALUE | Capabilities::TYPE,
                    kind: BindingKind::Class,
                    ty: Type::Any,
                    span: decl.name.span,
                    stmt_index,
                }),
                Stmt::Interface(decl) => self.declare(Binding {
                    name: decl.name.text.clone(),
                    caps: Capabilities::TYPE,
                    kind: BindingKind::Interface,
                    ty: Type::Any,
                    span: decl.name.span,
                    stmt_index,
                }),
                Stmt::TypeAlias(decl) => self.declare(Binding {
                    name: decl.name.text.clone(),
                    caps: Capabilities::TYPE,
                    kind: BindingKind::TypeAlias,
                    ty: Type::Any,
                    span: decl.name.span,
                    stmt_index,
                }),
                Stmt::Enum(decl) => self.declare(Binding {
                    name: decl.name.text.clone(),
                    caps: Capabilities::VALUE | Capabilities::TYPE,
                    kind: BindingKind::Enum,
                    ty: Type::Named(decl.name.text.clone()),
                    span: decl.name.span,
                    stmt_index,
                }),
                Stmt::Import(decl) => self.hoist_import(decl, stmt_index),
                _ => {}
            }
        }
    }

    fn hoist_import(&mut self, decl: &ImportDecl, stmt_index: usize) {
        let Some(module) = self.modules.resolve(&decl.module) else {
            self.error(
                diagnostics::MODULE_NOT_FOUND,
                decl.module_span,
                format!("cannot find module `{}`", decl.module),
            );
            // Bind the locals as `any` values so the rest of the cell does
            // not cascade into unknown-name errors.
            match &decl.clause {
                ImportClause::Named(specifiers) => {
                    for specifier in specifiers {
                        self.declare(Binding {
                            name: specifier.local.text.clone(),
                            caps: Capabilities::VALUE,
                            kind: BindingKind::ImportedName {
                                module: decl.module.clone(),
                                imported: specifier.imported.text.clone(),
                            },
                            ty: Type::Any,
                            span: specifier.local.span,
                            stmt_index,
                        });
                    }
                }
                ImportClause::Namespace(local) => self.declare(Binding {
                    name: local.text.clone(),
                    caps: Capabilities::VALUE,
                    kind: BindingKind::ImportedNamespace {
                        module: decl.module.clone(),
                    },
                    ty: Type::Any,
                    span: local.span,
                    stmt_index,
                }),
            }
            return;
        };

        match &decl.clause {
            ImportClause::Named(specifiers) => {
                let mut bindings = vec![];
                for specifier in specifiers {
                    match module.scope.get(&specifier.imported.text) {
                        Some(origin) => bindings.push(Binding {
                            name: specifier.local.text.clone(),
                            caps: origin.caps,
                            kind: BindingKind::ImportedName {
                                module: decl.module.clone(),
                                imported: specifier.imported.text.clone(),
                            },
                            ty: origin.ty.clone(),
                            span: specifier.local.span,
                            stmt_index,
                        }),
                        None => {
                            let imported = &specifier.imported;
                            self.error(
                                diagnostics::UNKNOWN_EXPORT,
                                imported.span,
                                format!(
                                    "module `{}` has no exported member `{}`",
                                    decl.module, imported.text
                                ),
                            );
                            bindings.push(Binding {
                                name: specifier.local.text.clone(),
                                caps: Capabilities::VALUE,
                                kind: BindingKind::ImportedName {
                                    module: decl.module.clone(),
                                    imported: imported.text.clone(),
                                },
                                ty: Type::Any,
                                span: specifier.local.span,
                                stmt_index,
                            });
                        }
                    }
                }
                for binding in bindings {
                    self.declare(binding);
                }
            }
            ImportClause::Namespace(local) => self.declare(Binding {
                name: local.text.clone(),
                caps: Capabilities::VALUE,
                kind: BindingKind::ImportedNamespace {
                    module: decl.module.clone(),
                },
                ty: Type::Any,
                span: local.span,
                stmt_index,
            }),
        }
    }

    // --- Pass 2: resolve signatures and shapes ---

    fn resolve_signatures(&mut self, ast: &File) {
        for stmt in &ast.statements {
            match stmt {
                Stmt::TypeAlias(decl) => {
                    let ty = self.resolve_type(&decl.ty);
                    if let Some(binding) = self.analysis.scope.get_mut(&decl.name.text) {
                        binding.ty = ty;
                    }
                }
                Stmt::Function(decl) => {
                    let ty = self.function_type(decl);
                    if let Some(binding) = self.analysis.scope.get_mut(&decl.name.text) {
                        binding.ty = ty;
                    }
                }
                Stmt::Class(decl) => {
                    let shape = self.class_shape(decl);
                    self.analysis
                        .shapes
                        .insert(decl.name.text.clone(), Shape::Class(shape));
                }
                Stmt::Interface(decl) => {
                    let mut shape = ClassShape::default();
                    for member in &decl.members {
                        let ty = self.resolve_type(&member.annotation.ty);
                        shape.fields.push((member.name.text.clone(), ty));
                    }
                    self.analysis
                        .shapes
                        .insert(decl.name.text.clone(), Shape::Interface(shape));
                }
                Stmt::Enum(decl) => {
                    self.analysis.shapes.insert(
                        decl.name.text.clone(),
                        Shape::Enum(
                            decl.variants
                                .iter()
                                .map(|variant| variant.text.clone())
                                .collect(),
                        ),
                    );
                }
                _ => {}
            }
        }
    }

    fn function_type(&mut self, decl: &FunctionDecl) -> Type {
        let params = decl
            .params
            .iter()
            .map(|param| {
                let ty = param
                    .annotation
                    .as_ref()
                    .map(|annotation| self.resolve_type(&annotation.ty))
                    .unwrap_or(Type::Any);
                (param.name.text.clone(), ty)
            })
            .collect();
        let ret = decl
            .return_annotation
            .as_ref()
            .map(|annotation| self.resolve_type(&annotation.ty))
            .unwrap_or(Type::Any);
        Type::function(params, ret, decl.is_async)
    }

    fn class_shape(&mut self, decl: &ClassDecl) -> ClassShape {
        let mut shape = ClassShape {
            extends: decl.extends.as_ref().map(|ident| ident.text.clone()),
            ..Default::default()
        };
        for member in &decl.members {
            match member {
                ClassMember::Field(field) => {
                    let ty = field
                        .annotation
                        .as_ref()
                        .map(|annotation| self.resolve_type(&annotation.ty))
                        .unwrap_or(Type::Any);
                    shape.fields.push((field.name.text.clone(), ty));
                }
                ClassMember::Method(method) => {
                    let Type::Function(signature) = self.function_type(method) else {
                        unreachable!("function_type always returns Type::Function");
                    };
                    shape.methods.push((method.name.text.clone(), *signature));
                }
            }
        }
        shape
    }

    fn resolve_type(&mut self, ty: &TypeExpr) -> Type {
        match ty {
            TypeExpr::Named(ident) => {
                if let Some(builtin) = builtin_type(&ident.text) {
                    return builtin;
                }
                let binding = self
                    .analysis
                    .scope
                    .get(&ident.text)
                    .or_else(|| self.ambient.and_then(|ambient| ambient.scope.get(&ident.text)));
                match binding {
                    Some(binding) if binding.caps.contains(Capabilities::TYPE) => {
                        match binding.kind {
                            BindingKind::TypeAlias => binding.ty.clone(),
                            _ => Type::Named(ident.text.clone()),
                        }
                    }
                    // A name with only value meaning degrades to `any` in
                    // type position; this is what lets a shadowed class be
                    // referenced without erroring.
                    Some(_) => Type::Any,
                    None => {
                        self.error(
                            diagnostics::UNKNOWN_TYPE,
                            ident.span,
                            format!("cannot find type `{}`", ident.text),
                        );
                        Type::Any
                    }
                }
            }
            TypeExpr::Array(element, _) => Type::Array(Box::new(self.resolve_type(element))),
        }
    }

    // --- Pass 3: check statements and expressions ---

    fn check_file(&mut self, ast: &File) {
        for stmt in &ast.statements {
            self.check_stmt(stmt);
        }
    }

    fn at_module_level(&self) -> bool {
        self.function.is_empty() && self.locals.is_empty()
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(var) => self.check_var(var),
            Stmt::Function(decl) => {
                if !self.at_module_level() {
                    let ty = self.function_type(decl);
                    if let Some(scope) = self.locals.last_mut() {
                        scope.insert(decl.name.text.clone(), ty);
                    }
                }
                self.check_function_body(decl);
            }
            Stmt::Class(decl) => self.check_class(decl),
            Stmt::Interface(_) | Stmt::TypeAlias(_) | Stmt::Enum(_) | Stmt::Import(_) => {}
            Stmt::ExportList(list) => {
                for name in &list.names {
                    let known = self.analysis.scope.contains(&name.text)
                        || self
                            .ambient
                            .is_some_and(|ambient| ambient.scope.contains(&name.text));
                    if !known {
                        self.error(
                            diagnostics::UNKNOWN_NAME,
                            name.span,
                            format!("cannot export unknown name `{}`", name.text),
                        );
                    }
                }
            }
            Stmt::Expr(stmt) => {
                self.check_expr(&stmt.expr);
            }
            Stmt::Return(stmt) => {
                let ty = stmt
                    .value
                    .as_ref()
                    .map(|value| self.check_expr(value))
                    .unwrap_or(Type::Void);
                if let Some(function) = self.function.last() {
                    if let Some(expected) = function.return_type.clone() {
                        if !self.is_assignable(&ty, &expected) {
                            let span =
                                stmt.value.as_ref().map(|v| v.span).unwrap_or(stmt.span);
                            self.error(
                                diagnostics::TYPE_MISMATCH,
                                span,
                                format!(
                                    "type `{ty}` is not assignable to return type `{expected}`"
                                ),
                            );
                        }
                    }
                }
            }
            Stmt::If(stmt) => {
                self.check_expr(&stmt.condition);
                self.check_nested(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.check_nested(else_branch);
                }
            }
            Stmt::While(stmt) => {
                self.check_expr(&stmt.condition);
                self.check_nested(&stmt.body);
            }
            Stmt::Block(block) => {
                self.locals.push(IndexMap::new());
                for stmt in &block.statements {
                    self.check_stmt(stmt);
                }
                self.locals.pop();
            }
            Stmt::Empty(_) => {}
        }
    }

    fn check_nested(&mut self, stmt: &Stmt) {
        self.locals.push(IndexMap::new());
        self.check_stmt(stmt);
        self.locals.pop();
    }

    fn check_var(&mut self, var: &VarStmt) {
        for declarator in &var.declarators {
            let annotated = declarator
                .annotation
                .as_ref()
                .map(|annotation| self.resolve_type(&annotation.ty));
            let inferred = declarator.init.as_ref().map(|init| self.check_expr(init));
            if let (Some(annotated), Some(inferred)) = (&annotated, &inferred) {
                if !self.is_assignable(inferred, annotated) {
                    let span = declarator
                        .init
                        .as_ref()
                        .map(|init| init.span)
                        .unwrap_or(declarator.span);
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        span,
                        format!("type `{inferred}` is not assignable to type `{annotated}`"),
                    );
                }
            }
            let ty = annotated.or(inferred).unwrap_or(Type::Any);
            if self.at_module_level() {
                if let Some(binding) = self.analysis.scope.get_mut(&declarator.name.text) {
                    binding.ty = ty;
                }
            } else if let Some(scope) = self.locals.last_mut() {
                scope.insert(declarator.name.text.clone(), ty);
            }
        }
    }

    fn check_function_body(&mut self, decl: &FunctionDecl) {
        let Some(body) = &decl.body else { return };
        let return_type = decl
            .return_annotation
            .as_ref()
            .map(|annotation| self.resolve_type(&annotation.ty));
        self.function.push(FunctionContext {
            is_async: decl.is_async,
            return_type,
        });
        let mut params = IndexMap::new();
        for param in &decl.params {
            let ty = param
                .annotation
                .as_ref()
                .map(|annotation| self.resolve_type(&annotation.ty))
                .unwrap_or(Type::Any);
            params.insert(param.name.text.clone(), ty);
        }
        self.locals.push(params);
        for stmt in &body.statements {
            self.check_stmt(stmt);
        }
        self.locals.pop();
        self.function.pop();
    }

    fn check_class(&mut self, decl: &ClassDecl) {
        for member in &decl.members {
            match member {
                ClassMember::Field(field) => {
                    let annotated = field
                        .annotation
                        .as_ref()
                        .map(|annotation| self.resolve_type(&annotation.ty));
                    if let Some(init) = &field.init {
                        let inferred = self.check_expr(init);
                        if let Some(annotated) = &annotated {
                            if !self.is_assignable(&inferred, annotated) {
                                self.error(
                                    diagnostics::TYPE_MISMATCH,
                                    init.span,
                                    format!(
                                        "type `{inferred}` is not assignable to type `{annotated}`"
                                    ),
                                );
                            }
                        }
                    }
                }
                ClassMember::Method(method) => self.check_function_body(method),
            }
        }
    }

    fn lookup_value(&mut self, name: &str, span: Span) -> Type {
        for scope in self.locals.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return ty.clone();
            }
        }
        let binding = self
            .analysis
            .scope
            .get(name)
            .or_else(|| self.ambient.and_then(|ambient| ambient.scope.get(name)));
        match binding {
            Some(binding) if binding.caps.contains(Capabilities::VALUE) => binding.ty.clone(),
            Some(binding) => {
                let kind = binding.kind.describe();
                self.error(
                    diagnostics::UNKNOWN_NAME,
                    span,
                    format!("`{name}` only refers to a {kind}, but is used as a value"),
                );
                Type::Any
            }
            None => {
                if let Some(ty) = builtin_value(name) {
                    return ty;
                }
                self.error(
                    diagnostics::UNKNOWN_NAME,
                    span,
                    format!("cannot find name `{name}`"),
                );
                Type::Any
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Number(_) => Type::Number,
            ExprKind::String(_) => Type::String,
            ExprKind::Bool(_) => Type::Boolean,
            ExprKind::Null => Type::Null,
            ExprKind::Ident(name) => self.lookup_value(name, expr.span),
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand);
                match op {
                    UnaryOp::Neg => {
                        if !ty.is_numeric() {
                            self.error(
                                diagnostics::TYPE_MISMATCH,
                                operand.span,
                                format!("unary `-` cannot be applied to type `{ty}`"),
                            );
                        }
                        Type::Number
                    }
                    UnaryOp::Not => Type::Boolean,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.check_expr(lhs);
                let right = self.check_expr(rhs);
                self.check_binary(*op, &left, &right, expr.span)
            }
            ExprKind::Assign { op, target, value } => self.check_assign(*op, target, value),
            ExprKind::Call { callee, args } => {
                let callee_ty = self.check_expr(callee);
                let arg_types: Vec<(Type, Span)> = args
                    .iter()
                    .map(|arg| (self.check_expr(arg), arg.span))
                    .collect();
                match callee_ty {
                    Type::Function(signature) => {
                        if arg_types.len() != signature.params.len() {
                            self.error(
                                diagnostics::WRONG_ARGUMENT_COUNT,
                                expr.span,
                                format!(
                                    "expected {} argument(s), but got {}",
                                    signature.params.len(),
                                    arg_types.len()
                                ),
                            );
                        }
                        for ((arg, span), (name, expected)) in
                            arg_types.iter().zip(&signature.params)
                        {
                            if !self.is_assignable(arg, expected) {
                                self.error(
                                    diagnostics::TYPE_MISMATCH,
                                    *span,
                                    format!(
                                        "argument of type `{arg}` is not assignable to \
                                         parameter `{name}: {expected}`"
                                    ),
                                );
                            }
                        }
                        signature.ret.clone()
                    }
                    Type::Any => Type::Any,
                    other => {
                        self.error(
                            diagnostics::NOT_CALLABLE,
                            callee.span,
                            format!("type `{other}` is not callable"),
                        );
                        Type::Any
                    }
                }
            }
            ExprKind::Member { object, property } => self.check_member(object, property),
            ExprKind::New { class, args } => self.check_new(class, args, expr.span),
            ExprKind::Await(operand) => {
                let ty = self.check_expr(operand);
                match self.function.last() {
                    Some(function) if function.is_async => {}
                    Some(_) => {
                        self.error(
                            diagnostics::AWAIT_OUTSIDE_ASYNC,
                            expr.span,
                            "`await` is only allowed inside an async function",
                        );
                    }
                    None => {
                        // Lexically at the cell's top level; the session's
                        // diagnostic filter may turn this into a top-level
                        // suspend instead of an error.
                        self.analysis.top_level_awaits.push(expr.span);
                        self.error(
                            diagnostics::AWAIT_OUTSIDE_ASYNC,
                            expr.span,
                            "`await` is only allowed inside an async function",
                        );
                    }
                }
                ty
            }
            ExprKind::Paren(inner) => self.check_expr(inner),
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Type, right: &Type, span: Span) -> Type {
        if op.is_comparison() {
            return Type::Boolean;
        }
        if op.is_logical() {
            return if left == right {
                left.clone()
            } else {
                Type::Any
            };
        }
        if left.is_any() || right.is_any() {
            return if op == BinaryOp::Add {
                Type::Any
            } else {
                Type::Number
            };
        }
        match op {
            BinaryOp::Add => match (left, right) {
                (Type::String, Type::String | Type::Number)
                | (Type::Number, Type::String) => Type::String,
                (Type::Number, Type::Number) => Type::Number,
                _ => {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        span,
                        format!("operator `+` cannot be applied to `{left}` and `{right}`"),
                    );
                    Type::Any
                }
            },
            _ => {
                if *left == Type::Number && *right == Type::Number {
                    Type::Number
                } else {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        span,
                        format!("arithmetic operator cannot be applied to `{left}` and `{right}`"),
                    );
                    Type::Number
                }
            }
        }
    }

    fn check_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> Type {
        let target_ty = match &target.kind {
            ExprKind::Ident(name) => self.check_assign_target(name, target.span),
            ExprKind::Member { object, property } => self.check_member(object, property),
            _ => unreachable!("parser only accepts identifiers and members as targets"),
        };
        let value_ty = self.check_expr(value);
        match op {
            AssignOp::Assign => {
                if !self.is_assignable(&value_ty, &target_ty) {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        value.span,
                        format!("type `{value_ty}` is not assignable to type `{target_ty}`"),
                    );
                }
            }
            AssignOp::Add => {
                let ok = match &target_ty {
                    Type::Any => true,
                    Type::String => {
                        matches!(value_ty, Type::String | Type::Number | Type::Any)
                    }
                    Type::Number => value_ty.is_numeric(),
                    _ => false,
                };
                if !ok {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        value.span,
                        format!("operator `+=` cannot be applied to `{target_ty}` and `{value_ty}`"),
                    );
                }
            }
            AssignOp::Sub | AssignOp::Mul | AssignOp::Div => {
                if !(target_ty.is_numeric() && value_ty.is_numeric()) {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        value.span,
                        format!(
                            "compound assignment cannot be applied to `{target_ty}` and `{value_ty}`"
                        ),
                    );
                }
            }
        }
        target_ty
    }

    fn check_assign_target(&mut self, name: &str, span: Span) -> Type {
        for scope in self.locals.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return ty.clone();
            }
        }
        let binding = self
            .analysis
            .scope
            .get(name)
            .or_else(|| self.ambient.and_then(|ambient| ambient.scope.get(name)));
        match binding {
            Some(binding) if binding.caps.contains(Capabilities::VALUE) => {
                match &binding.kind {
                    BindingKind::Var {
                        kind: VarKind::Const,
                    } => {
                        let ty = binding.ty.clone();
                        self.error(
                            diagnostics::ASSIGNMENT_TO_CONST,
                            span,
                            format!("cannot assign to `{name}` because it is a constant"),
                        );
                        ty
                    }
                    BindingKind::ImportedName { .. } | BindingKind::ImportedNamespace { .. } => {
                        let ty = binding.ty.clone();
                        self.error(
                            diagnostics::ASSIGNMENT_TO_CONST,
                            span,
                            format!("cannot assign to `{name}` because it is an import"),
                        );
                        ty
                    }
                    _ => binding.ty.clone(),
                }
            }
            Some(_) => {
                self.error(
                    diagnostics::UNKNOWN_NAME,
                    span,
                    format!("`{name}` is not a value and cannot be assigned to"),
                );
                Type::Any
            }
            None => {
                self.error(
                    diagnostics::UNKNOWN_NAME,
                    span,
                    format!("cannot assign to undeclared name `{name}`"),
                );
                Type::Any
            }
        }
    }

    fn shape_of(&self, name: &str) -> Option<&Shape> {
        self.analysis
            .shape(name)
            .or_else(|| self.ambient.and_then(|ambient| ambient.shape(name)))
    }

    /// The type of `name.property` for an instance of the nominal type
    /// `type_name`, walking the `extends` chain. `None` means the property
    /// exists on no class along the chain.
    fn member_type(&self, type_name: &str, property: &str) -> Option<Type> {
        let mut seen = vec![type_name.to_owned()];
        let mut current = type_name.to_owned();
        loop {
            let Some(shape) = self.shape_of(&current) else {
                // Imported nominal types have no shape table here.
                return Some(Type::Any);
            };
            match shape {
                Shape::Class(shape) | Shape::Interface(shape) => {
                    if let Some(ty) = shape.member_type(property) {
                        return Some(ty);
                    }
                    match &shape.extends {
                        Some(base) if !seen.contains(base) => {
                            seen.push(base.clone());
                            current = base.clone();
                        }
                        _ => return None,
                    }
                }
                Shape::Enum(variants) => {
                    return variants
                        .iter()
                        .any(|variant| variant == property)
                        .then(|| Type::Named(current.clone()));
                }
            }
        }
    }

    /// `assignable` plus the nominal subtype relation: a value of a derived
    /// class type may flow into a slot typed as any class it extends.
    fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if assignable(from, to) {
            return true;
        }
        let (Type::Named(from), Type::Named(to)) = (from, to) else {
            return false;
        };
        let mut seen = vec![from.clone()];
        let mut current = from.clone();
        while let Some(Shape::Class(shape) | Shape::Interface(shape)) = self.shape_of(&current) {
            let Some(base) = &shape.extends else {
                return false;
            };
            if base == to {
                return true;
            }
            if seen.contains(base) {
                return false;
            }
            seen.push(base.clone());
            current = base.clone();
        }
        false
    }

    fn check_member(&mut self, object: &Expr, property: &Ident) -> Type {
        // Namespace imports resolve members through the source module's
        // scope rather than a shape.
        if let ExprKind::Ident(name) = &object.kind {
            let namespace_module = self
                .analysis
                .scope
                .get(name)
                .or_else(|| self.ambient.and_then(|ambient| ambient.scope.get(name)))
                .and_then(|binding| match &binding.kind {
                    BindingKind::ImportedNamespace { module } => Some(module.clone()),
                    _ => None,
                });
            if let Some(module) = namespace_module {
                let member = self
                    .modules
                    .resolve(&module)
                    .and_then(|analysis| analysis.scope.get(&property.text))
                    .map(|binding| binding.ty.clone());
                return match member {
                    Some(ty) => ty,
                    None => {
                        self.error(
                            diagnostics::UNKNOWN_PROPERTY,
                            property.span,
                            format!(
                                "module `{module}` has no exported member `{}`",
                                property.text
                            ),
                        );
                        Type::Any
                    }
                };
            }
        }

        let object_ty = self.check_expr(object);
        match &object_ty {
            Type::Named(type_name) => match self.member_type(type_name, &property.text) {
                Some(ty) => ty,
                None => {
                    self.error(
                        diagnostics::UNKNOWN_PROPERTY,
                        property.span,
                        format!(
                            "property `{}` does not exist on type `{type_name}`",
                            property.text
                        ),
                    );
                    Type::Any
                }
            },
            _ => Type::Any,
        }
    }

    fn check_new(&mut self, class: &Ident, args: &[Expr], span: Span) -> Type {
        let arg_types: Vec<(Type, Span)> = args
            .iter()
            .map(|arg| (self.check_expr(arg), arg.span))
            .collect();
        let binding = self
            .analysis
            .scope
            .get(&class.text)
            .or_else(|| self.ambient.and_then(|ambient| ambient.scope.get(&class.text)));
        let Some(binding) = binding else {
            self.error(
                diagnostics::UNKNOWN_NAME,
                class.span,
                format!("cannot find name `{}`", class.text),
            );
            return Type::Any;
        };
        match &binding.kind {
            BindingKind::Class => {}
            BindingKind::ImportedName { .. }
                if binding.caps.contains(Capabilities::TYPE | Capabilities::VALUE) => {}
            _ => {
                self.error(
                    diagnostics::NOT_CONSTRUCTIBLE,
                    span,
                    format!("`{}` is not constructible", class.text),
                );
                return Type::Any;
            }
        }
        let constructor = self
            .analysis
            .shape(&class.text)
            .or_else(|| self.ambient.and_then(|ambient| ambient.shape(&class.text)))
            .and_then(|shape| match shape {
                Shape::Class(shape) => shape
                    .methods
                    .iter()
                    .find(|(name, _)| name == "constructor")
                    .map(|(_, signature)| signature.clone()),
                _ => None,
            });
        if let Some(constructor) = constructor {
            if arg_types.len() != constructor.params.len() {
                self.error(
                    diagnostics::WRONG_ARGUMENT_COUNT,
                    span,
                    format!(
                        "expected {} argument(s), but got {}",
                        constructor.params.len(),
                        arg_types.len()
                    ),
                );
            }
            for ((arg, arg_span), (name, expected)) in arg_types.iter().zip(&constructor.params) {
                if !self.is_assignable(arg, expected) {
                    self.error(
                        diagnostics::TYPE_MISMATCH,
                        *arg_span,
                        format!(
                            "argument of type `{arg}` is not assignable to \
                             parameter `{name}: {expected}`"
                        ),
                    );
                }
            }
        }
        Type::Named(class.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use inklet_foundation::source::{SourceFile, SourceFileSet};
    use inklet_syntax::parse_file;

    use super::*;

    fn analyze_cell(input: &str) -> (ModuleAnalysis, Vec<Diagnostic>) {
        analyze_with_ambient(input, None)
    }

    fn analyze_with_ambient(
        input: &str,
        ambient: Option<&ModuleAnalysis>,
    ) -> (ModuleAnalysis, Vec<Diagnostic>) {
        let mut set = SourceFileSet::new();
        let id = set.add(SourceFile::new("cell.ink", input));
        let mut diagnostics = vec![];
        let ast = parse_file(id, input, &mut diagnostics);
        let analysis = analyze(id, &ast, ambient, &(), &mut diagnostics);
        (analysis, diagnostics)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
        diagnostics.iter().filter_map(|d| d.code).collect()
    }

    #[test]
    fn infers_number_from_initializer() {
        let (analysis, diagnostics) = analyze_cell("let x = 3, y = 4;");
        assert!(diagnostics.is_empty());
        assert_eq!(analysis.scope.get("x").unwrap().ty, Type::Number);
        assert_eq!(analysis.scope.get("y").unwrap().ty, Type::Number);
    }

    #[test]
    fn annotation_wins_and_mismatch_is_reported() {
        let (analysis, diagnostics) = analyze_cell("let s: string = 3;");
        assert_eq!(codes(&diagnostics), vec![diagnostics::TYPE_MISMATCH]);
        assert_eq!(analysis.scope.get("s").unwrap().ty, Type::String);
    }

    #[test]
    fn unknown_name_is_reported() {
        let (_, diagnostics) = analyze_cell("let x = missing;");
        assert_eq!(codes(&diagnostics), vec![diagnostics::UNKNOWN_NAME]);
    }

    #[test]
    fn duplicate_declaration_in_one_cell() {
        let (_, diagnostics) = analyze_cell("let x = 1;\nlet x = 2;");
        assert_eq!(codes(&diagnostics), vec![diagnostics::DUPLICATE_DECLARATION]);
    }

    #[test]
    fn value_and_type_declarations_of_one_name_merge() {
        let (analysis, diagnostics) =
            analyze_cell("let Foo: any;\ninterface Foo { y: string; }\nlet v: Foo = Foo;");
        assert!(diagnostics.is_empty());
        let merged = analysis.scope.get("Foo").unwrap();
        assert!(merged
            .caps
            .contains(Capabilities::VALUE | Capabilities::TYPE));
    }

    #[test]
    fn cell_scope_shadows_ambient() {
        let (ambient, _) = analyze_cell("let x: string = \"hi\";");
        let (analysis, diagnostics) = analyze_with_ambient("let x = 5;\nx * 2;", Some(&ambient));
        assert!(diagnostics.is_empty());
        assert_eq!(analysis.scope.get("x").unwrap().ty, Type::Number);
    }

    #[test]
    fn ambient_names_resolve() {
        let (ambient, _) = analyze_cell("let x: number;\nlet y: number;");
        let (analysis, diagnostics) =
            analyze_with_ambient("let z = x * y;", Some(&ambient));
        assert!(diagnostics.is_empty());
        assert_eq!(analysis.scope.get("z").unwrap().ty, Type::Number);
    }

    #[test]
    fn top_level_await_is_error_and_recorded() {
        let (analysis, diagnostics) = analyze_cell("let p = 1;\nawait p;");
        assert_eq!(codes(&diagnostics), vec![diagnostics::AWAIT_OUTSIDE_ASYNC]);
        assert_eq!(analysis.top_level_awaits.len(), 1);
    }

    #[test]
    fn await_inside_plain_function_is_error_but_not_top_level() {
        let (analysis, diagnostics) =
            analyze_cell("function f(x: number) { return await x; }");
        assert_eq!(codes(&diagnostics), vec![diagnostics::AWAIT_OUTSIDE_ASYNC]);
        assert!(analysis.top_level_awaits.is_empty());
    }

    #[test]
    fn await_inside_async_function_is_fine() {
        let (_, diagnostics) = analyze_cell("async function f(x: number) { return await x; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn const_assignment_is_rejected() {
        let (_, diagnostics) = analyze_cell("const k = 1;\nk = 2;");
        assert_eq!(codes(&diagnostics), vec![diagnostics::ASSIGNMENT_TO_CONST]);
    }

    #[test]
    fn class_instances_expose_members() {
        let (_, diagnostics) = analyze_cell(
            "class Point { x: number; y: number; }\nlet p: Point = new Point();\nlet n = p.x * 2;",
        );
        assert!(diagnostics.is_empty());
        let (_, diagnostics) = analyze_cell(
            "class Point { x: number; }\nlet p: Point = new Point();\np.z;",
        );
        assert_eq!(codes(&diagnostics), vec![diagnostics::UNKNOWN_PROPERTY]);
    }

    #[test]
    fn inherited_members_resolve_through_the_extends_chain() {
        let (_, diagnostics) = analyze_cell(
            "class A { x: number; }\nclass B extends A { y: number; }\n\
             let b: B = new B();\nlet n = b.x + b.y;",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_inherited_member_is_still_reported() {
        let (_, diagnostics) = analyze_cell(
            "class A { x: number; }\nclass B extends A { }\nlet b: B = new B();\nb.z;",
        );
        assert_eq!(codes(&diagnostics), vec![diagnostics::UNKNOWN_PROPERTY]);
    }

    #[test]
    fn derived_values_flow_into_base_slots() {
        let (_, diagnostics) = analyze_cell(
            "class A { x: number; }\nclass B extends A { }\nlet a: A = new B();",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn cyclic_extends_chains_terminate() {
        let (_, diagnostics) = analyze_cell(
            "class A extends B { }\nclass B extends A { }\nlet a: A = new A();\na.missing;",
        );
        assert_eq!(codes(&diagnostics), vec![diagnostics::UNKNOWN_PROPERTY]);
    }

    #[test]
    fn value_only_name_in_type_position_degrades_to_any() {
        let (analysis, diagnostics) = analyze_cell("let Foo = 5;\nlet other: Foo = \"x\";");
        assert!(diagnostics.is_empty());
        assert_eq!(analysis.scope.get("other").unwrap().ty, Type::Any);
    }

    #[test]
    fn arity_is_checked() {
        let (_, diagnostics) =
            analyze_cell("function f(a: number): number { return a; }\nf(1, 2);");
        assert_eq!(codes(&diagnostics), vec![diagnostics::WRONG_ARGUMENT_COUNT]);
    }
}
