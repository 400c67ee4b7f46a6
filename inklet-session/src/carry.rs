//! The declaration carry-forward resolver.
//!
//! Given the previous accumulated-declarations file and the freshly compiled
//! cell, decides which prior declarations remain visible to the next cell
//! and at what semantic level (type, value, or both). The output is the
//! previous file's text with superseded statements removed and partially
//! superseded ones pruned, never mutated in place.

use inklet_analysis::{
    binding::Capabilities,
    check::ModuleAnalysis,
    signature::print_any_fallback,
};
use inklet_syntax::ast::{File, ImportClause, Stmt};
use tracing::trace;

use crate::session::SessionError;

#[derive(Debug, Clone, Copy)]
struct Keep {
    as_type: bool,
    as_value: bool,
}

impl Keep {
    fn any(&self) -> bool {
        self.as_type || self.as_value
    }
}

/// Filters the previous declarations against the new cell's scope.
///
/// Returns the retained text, with `let name: any;` fallbacks appended for
/// value halves that cannot be re-expressed standalone. The caller appends
/// the new cell's own signatures afterwards.
pub fn carry_forward(
    prev_source: &str,
    prev_ast: &File,
    prev_analysis: &ModuleAnalysis,
    cell_analysis: &ModuleAnalysis,
) -> Result<String, SessionError> {
    let keep_for = |name: &str| -> Keep {
        let Some(prev) = prev_analysis.scope.get(name) else {
            return Keep {
                as_type: true,
                as_value: true,
            };
        };
        // For imports, `prev.caps` was derived from the origin symbol when
        // the declarations file was compiled, so shadowing an aliased import
        // is judged against what the alias actually referred to.
        match cell_analysis.scope.get(name) {
            None => Keep {
                as_type: prev.caps.contains(Capabilities::TYPE),
                as_value: prev.caps.contains(Capabilities::VALUE),
            },
            Some(new) => Keep {
                as_type: prev.caps.contains(Capabilities::TYPE)
                    && !new.caps.contains(Capabilities::TYPE),
                as_value: prev.caps.contains(Capabilities::VALUE)
                    && !new.caps.contains(Capabilities::VALUE),
            },
        }
    };

    let mut out = String::new();
    let mut fallbacks = String::new();
    for stmt in &prev_ast.statements {
        match stmt {
            Stmt::Var(var) => {
                let kept: Vec<_> = var
                    .declarators
                    .iter()
                    .filter(|declarator| keep_for(&declarator.name.text).as_value)
                    .collect();
                if kept.len() == var.declarators.len() {
                    push_line(&mut out, var.span.get_input(prev_source));
                } else if !kept.is_empty() {
                    let mut rebuilt = format!("{} ", var.kind.keyword());
                    for (i, declarator) in kept.iter().enumerate() {
                        if i > 0 {
                            rebuilt.push_str(", ");
                        }
                        rebuilt.push_str(declarator.span.get_input(prev_source));
                    }
                    rebuilt.push(';');
                    push_line(&mut out, &rebuilt);
                }
            }
            Stmt::Function(decl) => {
                if keep_for(&decl.name.text).as_value {
                    push_line(&mut out, decl.span.get_input(prev_source));
                }
            }
            Stmt::Interface(decl) => {
                if keep_for(&decl.name.text).as_type {
                    push_line(&mut out, decl.span.get_input(prev_source));
                }
            }
            Stmt::TypeAlias(decl) => {
                if keep_for(&decl.name.text).as_type {
                    push_line(&mut out, decl.span.get_input(prev_source));
                }
            }
            // Classes and enums occupy both levels and have no partial
            // printed form. If only the value half survives, it degrades to
            // an `any` binding; a surviving type half alone is dropped, and
            // later type uses of the name degrade to `any` in the checker.
            Stmt::Class(decl) => {
                let keep = keep_for(&decl.name.text);
                if keep.as_type && keep.as_value {
                    push_line(&mut out, decl.span.get_input(prev_source));
                } else if keep.as_value {
                    trace!(name = %decl.name.text, "class degraded to `any` fallback");
                    fallbacks.push_str(&print_any_fallback(&decl.name.text));
                }
            }
            Stmt::Enum(decl) => {
                let keep = keep_for(&decl.name.text);
                if keep.as_type && keep.as_value {
                    push_line(&mut out, decl.span.get_input(prev_source));
                } else if keep.as_value {
                    fallbacks.push_str(&print_any_fallback(&decl.name.text));
                }
            }
            Stmt::Import(decl) => match &decl.clause {
                ImportClause::Named(specifiers) => {
                    if specifiers.is_empty() {
                        return Err(SessionError::EmptyImportCarry {
                            module: decl.module.clone(),
                        });
                    }
                    let kept: Vec<_> = specifiers
                        .iter()
                        .filter(|specifier| keep_for(&specifier.local.text).any())
                        .collect();
                    if kept.len() == specifiers.len() {
                        push_line(&mut out, decl.span.get_input(prev_source));
                    } else if !kept.is_empty() {
                        let mut rebuilt = String::from("import { ");
                        for (i, specifier) in kept.iter().enumerate() {
                            if i > 0 {
                                rebuilt.push_str(", ");
                            }
                            rebuilt.push_str(specifier.span.get_input(prev_source));
                        }
                        rebuilt.push_str(&format!(" }} from \"{}\";", decl.module));
                        push_line(&mut out, &rebuilt);
                    }
                }
                ImportClause::Namespace(local) => {
                    if keep_for(&local.text).as_value {
                        push_line(&mut out, decl.span.get_input(prev_source));
                    }
                }
            },
            // The synthetic header and anything else that declares no names.
            _ => {}
        }
    }
    out.push_str(&fallbacks);
    Ok(out)
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use inklet_analysis::{analyze, check::ModuleResolver};
    use inklet_foundation::source::{SourceFile, SourceFileSet};
    use inklet_syntax::parse_file;

    use super::*;

    struct Stub(IndexMap<String, ModuleAnalysis>);

    impl ModuleResolver for Stub {
        fn resolve(&self, specifier: &str) -> Option<&ModuleAnalysis> {
            self.0.get(specifier)
        }
    }

    fn compile(source: &str, resolver: &dyn ModuleResolver) -> (File, ModuleAnalysis) {
        let mut files = SourceFileSet::new();
        let id = files.add(SourceFile::new("test.ink", source));
        let mut diagnostics = vec![];
        let ast = parse_file(id, source, &mut diagnostics);
        let analysis = analyze(id, &ast, None, resolver, &mut diagnostics);
        (ast, analysis)
    }

    fn carry_with(resolver: &dyn ModuleResolver, prev: &str, cell: &str) -> String {
        let (prev_ast, prev_analysis) = compile(prev, resolver);
        let (_, cell_analysis) = compile(cell, resolver);
        carry_forward(prev, &prev_ast, &prev_analysis, &cell_analysis).unwrap()
    }

    fn carry(prev: &str, cell: &str) -> String {
        carry_with(&(), prev, cell)
    }

    fn stub_module() -> Stub {
        let (_, analysis) = compile("interface I { x: number; }\nlet v = 1;", &());
        let mut modules = IndexMap::new();
        modules.insert("m".to_owned(), analysis);
        Stub(modules)
    }

    #[test]
    fn unshadowed_declarations_are_kept_verbatim() {
        assert_eq!(
            carry("let x: number;\nlet y: number;", "let z = 1;"),
            "let x: number;\nlet y: number;\n"
        );
    }

    #[test]
    fn shadowed_variable_is_dropped() {
        assert_eq!(carry("let x: number;", "let x = \"s\";"), "");
    }

    #[test]
    fn variable_statements_are_pruned_per_declarator() {
        assert_eq!(
            carry("let x: number, y: number;", "let y = 2;"),
            "let x: number;\n"
        );
    }

    #[test]
    fn value_shadow_drops_the_whole_class() {
        // The new `let` supplies the value; the unprintable type half is
        // dropped and later type uses degrade to `any`.
        assert_eq!(carry("class Foo { x: number; }", "let Foo = 5;"), "");
    }

    #[test]
    fn type_shadow_degrades_class_to_any_fallback() {
        assert_eq!(
            carry("class Foo { x: number; }", "interface Foo { y: string; }"),
            "let Foo: any;\n"
        );
    }

    #[test]
    fn functions_are_kept_or_dropped_wholesale() {
        let prev = "function f(a: number): number;";
        assert_eq!(carry(prev, "let g = 1;"), format!("{prev}\n"));
        assert_eq!(carry(prev, "let f = 1;"), "");
    }

    #[test]
    fn aliased_import_is_pruned_by_origin_capability() {
        let stub = stub_module();
        assert_eq!(
            carry_with(&stub, "import { I as J, v } from \"m\";", "interface J { }"),
            "import { v } from \"m\";\n"
        );
    }

    #[test]
    fn fully_shadowed_import_is_dropped() {
        let stub = stub_module();
        assert_eq!(
            carry_with(
                &stub,
                "import { I as J, v } from \"m\";",
                "interface J { }\nlet v = 9;"
            ),
            ""
        );
    }

    #[test]
    fn import_with_empty_clause_is_an_invariant_violation() {
        let (prev_ast, prev_analysis) = compile("import { } from \"m\";", &());
        let (_, cell_analysis) = compile("let x = 1;", &());
        let result = carry_forward(
            "import { } from \"m\";",
            &prev_ast,
            &prev_analysis,
            &cell_analysis,
        );
        assert!(matches!(
            result,
            Err(SessionError::EmptyImportCarry { .. })
        ));
    }
}
