//! Code emission: type erasure plus translation into the execution
//! collaborator's module convention.
//!
//! The emitter splices the original source text, cutting out exactly the
//! annotation ranges the parser recorded, so runtime output keeps the user's
//! own formatting. Imports become `require` destructurings, enums become
//! plain objects, and exported bindings become `exports.name` assignments.

use indexmap::IndexSet;
use inklet_foundation::span::{Span, Spanned};
use inklet_syntax::ast::*;

pub struct EmitOptions {
    /// Statement index and binding name of the final bare expression to
    /// capture, if any.
    pub capture: Option<(usize, String)>,
    /// Export every module-scope binding, as modules do; cells export only
    /// what their explicit export lists name.
    pub export_all: bool,
}

/// The output path a compiled source file materializes at.
pub fn output_path(source_path: &str) -> String {
    match source_path.strip_suffix(".ink") {
        Some(stem) => format!("{stem}.inkx"),
        None => format!("{source_path}.inkx"),
    }
}

/// The index of the final bare, non-assignment expression statement, if the
/// module ends in one (ignoring export lists and empty statements).
pub fn last_expression_statement(ast: &File) -> Option<usize> {
    let mut last = None;
    for (index, stmt) in ast.statements.iter().enumerate() {
        match stmt {
            Stmt::ExportList(_) | Stmt::Empty(_) => {}
            _ => last = Some((index, stmt)),
        }
    }
    match last {
        Some((index, Stmt::Expr(stmt))) if !stmt.expr.is_assignment() => Some(index),
        _ => None,
    }
}

/// Picks a binding name for the captured last expression that does not
/// collide with anything in scope.
pub fn capture_binding_name(taken: &dyn Fn(&str) -> bool) -> String {
    if !taken("__last__") {
        return "__last__".to_owned();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("__last__{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn emit_module(source: &str, ast: &File, options: &EmitOptions) -> String {
    let mut out = String::new();
    let mut exports: Vec<String> = vec![];
    for (index, stmt) in ast.statements.iter().enumerate() {
        match stmt {
            Stmt::Import(decl) => out.push_str(&lower_import(decl)),
            Stmt::Interface(_) | Stmt::TypeAlias(_) => {}
            Stmt::Enum(decl) => {
                out.push_str(&lower_enum(decl));
                if options.export_all {
                    exports.push(decl.name.text.clone());
                }
            }
            Stmt::ExportList(list) => {
                for name in &list.names {
                    exports.push(name.text.clone());
                }
            }
            Stmt::Expr(expr_stmt)
                if options
                    .capture
                    .as_ref()
                    .is_some_and(|(capture_index, _)| *capture_index == index) =>
            {
                let (_, name) = options.capture.as_ref().unwrap();
                let mut erase = vec![];
                erasure_spans(stmt, &mut erase);
                let text = splice(source, expr_stmt.expr.span, &erase);
                out.push_str(&format!("const {name} = {text};\n"));
                exports.push(name.clone());
            }
            _ => {
                let mut erase = vec![];
                erasure_spans(stmt, &mut erase);
                out.push_str(&splice(source, stmt.span(), &erase));
                out.push('\n');
                if options.export_all {
                    collect_value_names(stmt, &mut exports);
                }
            }
        }
    }
    let mut seen = IndexSet::new();
    exports.retain(|name| seen.insert(name.clone()));
    for name in &exports {
        out.push_str(&format!("exports.{name} = {name};\n"));
    }
    out
}

fn lower_import(decl: &ImportDecl) -> String {
    match &decl.clause {
        ImportClause::Named(specifiers) => {
            let mut names = String::new();
            for (i, specifier) in specifiers.iter().enumerate() {
                if i > 0 {
                    names.push_str(", ");
                }
                if specifier.is_aliased() {
                    names.push_str(&format!(
                        "{}: {}",
                        specifier.imported.text, specifier.local.text
                    ));
                } else {
                    names.push_str(&specifier.imported.text);
                }
            }
            format!("const {{ {names} }} = require(\"{}\");\n", decl.module)
        }
        ImportClause::Namespace(local) => {
            format!("const {} = require(\"{}\");\n", local.text, decl.module)
        }
    }
}

fn lower_enum(decl: &EnumDecl) -> String {
    let mut out = format!("const {} = {{ ", decl.name.text);
    for (value, variant) in decl.variants.iter().enumerate() {
        if value > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{}: {value}", variant.text));
    }
    out.push_str(" };\n");
    out
}

fn collect_value_names(stmt: &Stmt, names: &mut Vec<String>) {
    match stmt {
        Stmt::Var(var) => {
            for declarator in &var.declarators {
                names.push(declarator.name.text.clone());
            }
        }
        Stmt::Function(decl) => names.push(decl.name.text.clone()),
        Stmt::Class(decl) => names.push(decl.name.text.clone()),
        _ => {}
    }
}

/// Collects every annotation range inside a statement, recursively.
fn erasure_spans(stmt: &Stmt, spans: &mut Vec<Span>) {
    match stmt {
        Stmt::Var(var) => {
            for declarator in &var.declarators {
                if let Some(annotation) = &declarator.annotation {
                    spans.push(annotation.span);
                }
            }
        }
        Stmt::Function(decl) => function_erasure_spans(decl, spans),
        Stmt::Class(decl) => {
            for member in &decl.members {
                match member {
                    ClassMember::Field(field) => {
                        if let Some(annotation) = &field.annotation {
                            spans.push(annotation.span);
                        }
                    }
                    ClassMember::Method(method) => function_erasure_spans(method, spans),
                }
            }
        }
        Stmt::If(stmt) => {
            erasure_spans(&stmt.then_branch, spans);
            if let Some(else_branch) = &stmt.else_branch {
                erasure_spans(else_branch, spans);
            }
        }
        Stmt::While(stmt) => erasure_spans(&stmt.body, spans),
        Stmt::Block(block) => {
            for stmt in &block.statements {
                erasure_spans(stmt, spans);
            }
        }
        _ => {}
    }
}

fn function_erasure_spans(decl: &FunctionDecl, spans: &mut Vec<Span>) {
    for param in &decl.params {
        if let Some(annotation) = &param.annotation {
            spans.push(annotation.span);
        }
    }
    if let Some(annotation) = &decl.return_annotation {
        spans.push(annotation.span);
    }
    if let Some(body) = &decl.body {
        for stmt in &body.statements {
            erasure_spans(stmt, spans);
        }
    }
}

/// Copies `span`'s slice of the source, skipping the erased subranges.
fn splice(source: &str, span: Span, erase: &[Span]) -> String {
    let mut cuts: Vec<Span> = erase
        .iter()
        .filter(|cut| cut.start >= span.start && cut.end <= span.end)
        .copied()
        .collect();
    cuts.sort_by_key(|cut| cut.start);
    let mut out = String::new();
    let mut position = span.start;
    for cut in cuts {
        out.push_str(&source[position..cut.start]);
        position = cut.end;
    }
    out.push_str(&source[position..span.end]);
    out
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use inklet_foundation::source::{SourceFile, SourceFileSet};
    use inklet_syntax::parse_file;

    use super::*;

    fn emit(source: &str, options: &EmitOptions) -> String {
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("test.ink", source));
        let mut diagnostics = vec![];
        let ast = parse_file(id, source, &mut diagnostics);
        emit_module(source, &ast, options)
    }

    fn plain(source: &str) -> String {
        emit(
            source,
            &EmitOptions {
                capture: None,
                export_all: false,
            },
        )
    }

    #[test]
    fn annotations_are_erased() {
        assert_eq!(plain("let x: number = 3;"), "let x = 3;\n");
        assert_eq!(
            plain("function f(a: number): number { let b: number = a; return b; }"),
            "function f(a) { let b = a; return b; }\n"
        );
    }

    #[test]
    fn interfaces_and_aliases_vanish() {
        assert_eq!(
            plain("interface Named { name: string; }\ntype Id = number;\nlet x = 1;"),
            "let x = 1;\n"
        );
    }

    #[test]
    fn imports_become_require() {
        assert_eq!(
            plain("import { a, b as c } from \"util\";"),
            "const { a, b: c } = require(\"util\");\n"
        );
        assert_eq!(
            plain("import * as u from \"util\";"),
            "const u = require(\"util\");\n"
        );
    }

    #[test]
    fn enums_become_objects() {
        assert_eq!(
            plain("enum Color { Red, Green, Blue }"),
            "const Color = { Red: 0, Green: 1, Blue: 2 };\n"
        );
    }

    #[test]
    fn export_lists_become_exports_assignments() {
        assert_eq!(
            plain("export {};\nlet x = 1;\nexport { x };"),
            "let x = 1;\nexports.x = x;\n"
        );
    }

    #[test]
    fn the_last_expression_is_captured() {
        let source = "let x = 3;\nx * 2";
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("test.ink", source));
        let mut diagnostics = vec![];
        let ast = parse_file(id, source, &mut diagnostics);
        let index = last_expression_statement(&ast).unwrap();
        let emitted = emit_module(
            source,
            &ast,
            &EmitOptions {
                capture: Some((index, "__last__".to_owned())),
                export_all: false,
            },
        );
        assert_eq!(
            emitted,
            indoc! {"
                let x = 3;
                const __last__ = x * 2;
                exports.__last__ = __last__;
            "}
        );
    }

    #[test]
    fn assignments_are_not_captured() {
        let source = "let x = 3;\nx = 4;";
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("test.ink", source));
        let mut diagnostics = vec![];
        let ast = parse_file(id, source, &mut diagnostics);
        assert_eq!(last_expression_statement(&ast), None);
    }

    #[test]
    fn modules_export_every_binding() {
        let emitted = emit(
            "let a = 1;\nfunction f(): number { return a; }",
            &EmitOptions {
                capture: None,
                export_all: true,
            },
        );
        assert!(emitted.ends_with("exports.a = a;\nexports.f = f;\n"));
    }

    #[test]
    fn output_paths_swap_the_extension() {
        assert_eq!(output_path("util.ink"), "util.inkx");
        assert_eq!(output_path("memmodule"), "memmodule.inkx");
    }

    #[test]
    fn capture_names_avoid_collisions() {
        assert_eq!(capture_binding_name(&|_| false), "__last__");
        assert_eq!(
            capture_binding_name(&|name| name == "__last__"),
            "__last__1"
        );
    }
}
