use indoc::indoc;
use inklet_session::{MemoryFs, Session, SessionError};

fn session() -> Session<MemoryFs> {
    Session::new(MemoryFs::new())
}

#[test]
fn three_cells_accumulate_declarations() {
    let mut session = session();

    let first = session.apply_cell("let x = 3, y = 4;").unwrap();
    assert!(first.diagnostics.is_empty());
    assert_eq!(
        first.declarations_output.as_deref(),
        Some("let x: number;\nlet y: number;\n")
    );

    let second = session.apply_cell("let z = x * y;\nz -= 2;").unwrap();
    assert!(second.diagnostics.is_empty());
    assert_eq!(
        second.declarations_output.as_deref(),
        Some("let x: number;\nlet y: number;\nlet z: number;\n")
    );

    let third = session.apply_cell("y = x * z;").unwrap();
    assert!(third.diagnostics.is_empty());
    // No new name was introduced.
    assert_eq!(
        third.declarations_output.as_deref(),
        Some("let x: number;\nlet y: number;\nlet z: number;\n")
    );
}

#[test]
fn a_lone_closing_brace_is_a_diagnostic_not_a_hang() {
    let mut session = session();
    let result = session.apply_cell("}").unwrap();
    assert!(result.diagnostics.iter().any(|d| d.is_error()));
    assert!(result.primary_output.is_none());
}

#[test]
fn redeclaring_a_name_replaces_its_type() {
    let mut session = session();
    session.apply_cell("let x = 3;").unwrap();
    let result = session.apply_cell("let x = \"words\";").unwrap();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.declarations_output.as_deref(), Some("let x: string;\n"));
}

#[test]
fn value_shadow_of_a_class_keeps_the_value_only() {
    let mut session = session();
    session.apply_cell("class Foo { x: number; }").unwrap();
    let result = session.apply_cell("let Foo = 5;").unwrap();
    assert!(result.diagnostics.is_empty());
    let declarations = result.declarations_output.unwrap();
    assert_eq!(declarations, "let Foo: number;\n");

    // A later type use of `Foo` degrades to `any` instead of erroring.
    let later = session.apply_cell("let other: Foo = \"anything\";").unwrap();
    assert!(later.diagnostics.is_empty());
}

#[test]
fn type_shadow_of_a_class_synthesizes_an_any_fallback() {
    let mut session = session();
    session.apply_cell("class Foo { x: number; }").unwrap();
    let result = session
        .apply_cell("interface Foo { y: string; }")
        .unwrap();
    assert!(result.diagnostics.is_empty());
    let declarations = result.declarations_output.unwrap();
    assert!(declarations.contains("let Foo: any;"));
    assert!(declarations.contains("interface Foo { y: string; }"));
    assert!(!declarations.contains("class Foo"));
}

#[test]
fn enums_survive_across_cells() {
    let mut session = session();
    session.apply_cell("enum Color { Red, Green }").unwrap();
    let result = session.apply_cell("let c = Color.Red;").unwrap();
    assert!(result.diagnostics.is_empty());
    assert!(result
        .declarations_output
        .unwrap()
        .contains("enum Color { Red, Green }"));
}

#[test]
fn converted_dependencies_are_not_re_emitted() {
    let storage = MemoryFs::new();
    storage.insert("mathutil.ink", "let twelve: number = 12;");
    let mut session = Session::new(storage);

    let cell = "import { twelve } from \"mathutil\";\nlet t = twelve + 1;";
    let first = session.apply_cell(cell).unwrap();
    assert!(first.diagnostics.is_empty());
    assert_eq!(first.side_outputs.len(), 1);
    assert_eq!(first.side_outputs[0].path, "mathutil.inkx");
    assert!(first.side_outputs[0].code.contains("exports.twelve"));

    let second = session.apply_cell(cell).unwrap();
    assert!(second.diagnostics.is_empty());
    assert!(second.side_outputs.is_empty());
    assert_eq!(second.primary_output, first.primary_output);
}

#[test]
fn a_change_event_re_emits_the_dependency() {
    let storage = MemoryFs::new();
    storage.insert("mathutil.ink", "let twelve: number = 12;");
    let mut session = Session::new(storage.clone());

    let cell = "import { twelve } from \"mathutil\";\nlet t = twelve + 1;";
    let first = session.apply_cell(cell).unwrap();
    assert!(first.side_outputs[0].code.contains("12"));

    storage.insert("mathutil.ink", "let twelve: number = 13;");
    session.notify_file_changed("mathutil.ink");

    let second = session.apply_cell(cell).unwrap();
    assert_eq!(second.side_outputs.len(), 1);
    assert!(second.side_outputs[0].code.contains("13"));
}

#[test]
fn diagnostic_positions_are_in_raw_cell_coordinates() {
    let mut session = session();
    let cell = "let a = 1;\nlet b = missing;";
    let result = session.apply_cell(cell).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.start.offset, cell.find("missing").unwrap());
    assert_eq!(diagnostic.start.line, 1);
    assert_eq!(diagnostic.start.column, 8);
    assert_eq!(diagnostic.source_file, None);
}

#[test]
fn top_level_await_is_a_suspension_not_an_error() {
    let mut session = session();
    let result = session.apply_cell("let p = 1;\nawait p;").unwrap();
    assert!(result.diagnostics.is_empty());
    assert!(result.has_top_level_suspend);
    assert!(result.primary_output.is_some());
}

#[test]
fn await_inside_a_function_is_still_an_error() {
    let mut session = session();
    let result = session
        .apply_cell("function f(x: number) { return await x; }")
        .unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, 2007);
    assert!(!result.has_top_level_suspend);
    assert!(result.primary_output.is_none());
}

#[test]
fn the_final_bare_expression_is_captured() {
    let mut session = session();
    let result = session.apply_cell("let x = 3;\nx * 2").unwrap();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.last_expression_binding_name.as_deref(), Some("__last__"));
    assert!(result
        .primary_output
        .unwrap()
        .contains("const __last__ = x * 2;"));
}

#[test]
fn errors_block_emission_and_leave_state_untouched() {
    let mut session = session();
    session.apply_cell("let x = 3;").unwrap();
    let declarations_before = session.accumulated_declarations().to_owned();

    let result = session.apply_cell("let q = missing;").unwrap();
    assert!(result.diagnostics.iter().any(|d| d.is_error()));
    assert!(result.primary_output.is_none());
    assert!(result.declarations_output.is_none());
    assert!(result.side_outputs.is_empty());
    assert_eq!(session.accumulated_declarations(), declarations_before);

    // The next cell still compiles against the old declarations.
    let next = session.apply_cell("let y = x + 1;").unwrap();
    assert!(next.diagnostics.is_empty());
}

#[test]
fn in_memory_modules_are_registered_and_checked() {
    let mut session = session();
    let diagnostics = session
        .add_module("util", "let a: number = 1;")
        .unwrap();
    assert!(diagnostics.is_empty());

    let result = session
        .apply_cell("import { a } from \"util\";\nlet b = a + 1;")
        .unwrap();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.side_outputs.len(), 1);
    assert_eq!(result.side_outputs[0].path, "util.inkx");
}

#[test]
fn broken_modules_report_diagnostics_against_their_own_name() {
    let mut session = session();
    let diagnostics = session.add_module("bad", "let x = missing;").unwrap();
    assert!(!diagnostics.is_empty());
    assert_eq!(diagnostics[0].source_file.as_deref(), Some("bad"));
}

#[test]
fn invalid_module_names_are_fatal() {
    let mut session = session();
    assert!(matches!(
        session.add_module("__reserved", "let a = 1;"),
        Err(SessionError::InvalidModuleName { .. })
    ));
    assert!(matches!(
        session.add_module("a/b", "let a = 1;"),
        Err(SessionError::InvalidModuleName { .. })
    ));
}

#[test]
fn replacing_a_module_re_emits_it() {
    let mut session = session();
    session.add_module("util", "let a: number = 1;").unwrap();
    let cell = "import { a } from \"util\";\nlet b = a + 1;";
    let first = session.apply_cell(cell).unwrap();
    assert_eq!(first.side_outputs.len(), 1);

    session.add_module("util", "let a: number = 2;").unwrap();
    let second = session.apply_cell(cell).unwrap();
    assert_eq!(second.side_outputs.len(), 1);
    assert!(second.side_outputs[0].code.contains('2'));
}

#[test]
fn carried_imports_are_pruned_when_shadowed() {
    let mut session = session();
    session
        .add_module("shapes", "interface I { x: number; }\nlet v: number = 1;")
        .unwrap();
    session
        .apply_cell("import { I as J, v } from \"shapes\";")
        .unwrap();
    assert!(session
        .accumulated_declarations()
        .contains("import { I as J, v } from \"shapes\";"));

    let result = session.apply_cell("interface J { y: string; }").unwrap();
    assert!(result.diagnostics.is_empty());
    let declarations = result.declarations_output.unwrap();
    assert!(declarations.contains("import { v } from \"shapes\";"));
    assert!(!declarations.contains("I as J"));
}

#[test]
fn dependency_errors_invalidate_the_cell() {
    let mut session = session();
    session.add_module("broken", "let a: string = 5;").unwrap();
    let result = session
        .apply_cell("import { a } from \"broken\";")
        .unwrap();
    assert!(result.diagnostics.iter().any(|d| d.is_error()));
    assert_eq!(
        result.diagnostics[0].source_file.as_deref(),
        Some("broken")
    );
    assert!(result.primary_output.is_none());
}

#[test]
fn reset_clears_all_session_state() {
    let mut session = session();
    session.apply_cell("let x = 3;").unwrap();
    session.reset();
    assert_eq!(session.accumulated_declarations(), "");
    let result = session.apply_cell("let y = x;").unwrap();
    assert!(result.diagnostics.iter().any(|d| d.is_error()));
}

#[test]
fn declaration_files_resolve_types_but_are_never_emitted() {
    let storage = MemoryFs::new();
    storage.insert("vendor.d.ink", "function vendorCall(n: number): number;");
    let mut session = Session::new(storage);

    let result = session
        .apply_cell(indoc! {"
            import { vendorCall } from \"vendor\";
            let n = vendorCall(2);
        "})
        .unwrap();
    assert!(result.diagnostics.is_empty());
    assert!(result.side_outputs.is_empty());
}
