//! Dependency tracking and side-output emission.
//!
//! A cell's transitive compiled-source dependencies are emitted at most once
//! per session; a dependency is re-emitted only after a file-watch change
//! event invalidates it.

use indexmap::IndexSet;

use crate::{
    emit::{emit_module, output_path, EmitOptions},
    host::{ModuleUnit, Program},
};

/// Compiled code for a dependency, to be materialized before the primary
/// output runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideOutput {
    pub path: String,
    pub code: String,
}

/// Every compiled-source dependency reachable from the cell, in load order.
/// Pure type-declaration files are excluded.
pub fn collect_dependencies(program: &Program) -> Vec<&ModuleUnit> {
    program
        .modules
        .values()
        .filter(|unit| !unit.declaration_only)
        .collect()
}

/// Emits each dependency not yet in `converted`, marking it converted.
/// Outputs are sorted by output path for determinism.
pub fn emit_side_outputs(program: &Program, converted: &mut IndexSet<String>) -> Vec<SideOutput> {
    let mut outputs = vec![];
    for unit in collect_dependencies(program) {
        if converted.insert(unit.source_path.clone()) {
            let code = emit_module(
                &unit.source,
                &unit.ast,
                &EmitOptions {
                    capture: None,
                    export_all: true,
                },
            );
            outputs.push(SideOutput {
                path: output_path(&unit.source_path),
                code,
            });
        }
    }
    outputs.sort_by(|a, b| a.path.cmp(&b.path));
    outputs
}
