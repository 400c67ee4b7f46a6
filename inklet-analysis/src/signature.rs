//! Prints a module's declaration signatures, as accumulated between cells.
//!
//! Value declarations are rewritten to annotated, initializer-free forms
//! (`let x: number;`); purely structural statements (interfaces, type
//! aliases, enums, imports) are kept verbatim.

use inklet_foundation::span::Span;
use inklet_syntax::ast::*;

use crate::{
    check::ModuleAnalysis,
    types::{ClassShape, FunctionType, Shape, Type},
};

pub fn print_declarations(source: &str, ast: &File, analysis: &ModuleAnalysis) -> String {
    let mut out = String::new();
    for stmt in &ast.statements {
        match stmt {
            Stmt::Var(var) => {
                for declarator in &var.declarators {
                    let ty = analysis
                        .scope
                        .get(&declarator.name.text)
                        .map(|binding| binding.ty.clone())
                        .unwrap_or(Type::Any);
                    out.push_str(&format!(
                        "{} {}: {};\n",
                        var.kind.keyword(),
                        declarator.name.text,
                        ty
                    ));
                }
            }
            Stmt::Function(decl) => {
                let ty = analysis
                    .scope
                    .get(&decl.name.text)
                    .map(|binding| binding.ty.clone());
                if let Some(Type::Function(signature)) = ty {
                    out.push_str(&print_function_signature(
                        &decl.name.text,
                        &signature,
                        "",
                        true,
                    ));
                }
            }
            Stmt::Class(decl) => {
                if let Some(Shape::Class(shape)) = analysis.shape(&decl.name.text) {
                    out.push_str(&print_class_signature(&decl.name.text, shape));
                }
            }
            Stmt::Interface(decl) => push_verbatim(&mut out, source, decl.span),
            Stmt::TypeAlias(decl) => push_verbatim(&mut out, source, decl.span),
            Stmt::Enum(decl) => push_verbatim(&mut out, source, decl.span),
            Stmt::Import(decl) => push_verbatim(&mut out, source, decl.span),
            _ => {}
        }
    }
    out
}

/// A single `let name: any;` line, used when only the value half of a
/// declaration survives into the next cell.
pub fn print_any_fallback(name: &str) -> String {
    format!("let {name}: any;\n")
}

fn push_verbatim(out: &mut String, source: &str, span: Span) {
    out.push_str(span.get_input(source));
    out.push('\n');
}

fn print_function_signature(
    name: &str,
    signature: &FunctionType,
    indent: &str,
    with_keyword: bool,
) -> String {
    let mut out = String::from(indent);
    if signature.is_async {
        out.push_str("async ");
    }
    if with_keyword {
        out.push_str("function ");
    }
    out.push_str(name);
    out.push('(');
    for (i, (param, ty)) in signature.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{param}: {ty}"));
    }
    out.push_str(&format!("): {};\n", signature.ret));
    out
}

fn print_class_signature(name: &str, shape: &ClassShape) -> String {
    let mut out = format!("class {name}");
    if let Some(base) = &shape.extends {
        out.push_str(&format!(" extends {base}"));
    }
    out.push_str(" {\n");
    for (field, ty) in &shape.fields {
        out.push_str(&format!("    {field}: {ty};\n"));
    }
    for (method, signature) in &shape.methods {
        out.push_str(&print_function_signature(method, signature, "    ", false));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use inklet_foundation::source::{SourceFile, SourceFileSet};
    use inklet_syntax::parse_file;

    use super::*;
    use crate::check::analyze;

    fn declarations_of(input: &str) -> String {
        let mut set = SourceFileSet::new();
        let id = set.add(SourceFile::new("cell.ink", input));
        let mut diagnostics = vec![];
        let ast = parse_file(id, input, &mut diagnostics);
        let analysis = analyze(id, &ast, None, &(), &mut diagnostics);
        print_declarations(input, &ast, &analysis)
    }

    #[test]
    fn vars_get_one_line_per_declarator() {
        assert_eq!(
            declarations_of("let x = 3, y = 4;"),
            "let x: number;\nlet y: number;\n"
        );
    }

    #[test]
    fn functions_print_as_signatures() {
        assert_eq!(
            declarations_of("async function fetch(url: string): string { return url; }"),
            "async function fetch(url: string): string;\n"
        );
    }

    #[test]
    fn classes_print_field_and_method_lines() {
        let printed = declarations_of(indoc! {"
            class Point {
                x: number;
                y: number;
                norm(): number { return this_is_unused; }
            }
        "});
        assert_eq!(
            printed,
            indoc! {"
                class Point {
                    x: number;
                    y: number;
                    norm(): number;
                }
            "}
        );
    }

    #[test]
    fn structural_statements_are_kept_verbatim() {
        let input = "interface Named { name: string; }\ntype Id = number;\nenum Color { Red, Green }";
        let printed = declarations_of(input);
        assert!(printed.contains("interface Named { name: string; }"));
        assert!(printed.contains("type Id = number;"));
        assert!(printed.contains("enum Color { Red, Green }"));
    }

    #[test]
    fn expressions_do_not_appear() {
        assert_eq!(declarations_of("let x = 1;\nx + 2;"), "let x: number;\n");
    }
}
