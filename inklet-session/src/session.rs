//! The compilation session: the single owner of cross-cell state.
//!
//! `apply_cell` presents a purely synchronous contract: it writes the two
//! synthetic files, drains the host's pending rebuild, runs diagnostics over
//! the cell and its dependencies, and on success emits code and rolls the
//! accumulated declarations forward. User code errors are reported, never
//! thrown; a [`SessionError`] always means an internal invariant broke.

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{info_span, trace, warn};

use inklet_analysis::{binding::Capabilities, signature::print_declarations};

use crate::{
    carry::carry_forward,
    complete::{complete_at, CompletionList},
    deps::{emit_side_outputs, SideOutput},
    emit::{self, EmitOptions},
    host::{check_module, WatchHost},
    inspect::{quick_info_at, QuickInfo},
    mapper::{self, CellDiagnostic},
    vfs::FileSystem,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no rebuild is pending; the watch host and the session have desynchronized")]
    NoPendingRebuild,
    #[error("no compiled program is available after a forced rebuild")]
    MissingProgram,
    #[error("carried import of `{module}` was pruned to an empty clause")]
    EmptyImportCarry { module: String },
    #[error("invalid module name `{name}`")]
    InvalidModuleName { name: String },
}

/// Everything one cell compile attempt produced.
#[derive(Debug, Default)]
pub struct CompiledCellResult {
    pub primary_output: Option<String>,
    pub declarations_output: Option<String>,
    pub diagnostics: Vec<CellDiagnostic>,
    pub last_expression_binding_name: Option<String>,
    pub has_top_level_suspend: bool,
    pub side_outputs: Vec<SideOutput>,
}

pub struct Session<F> {
    host: WatchHost<F>,
    accumulated_declarations: String,
    converted_dependency_paths: IndexSet<String>,
}

impl<F: FileSystem> Session<F> {
    pub fn new(storage: F) -> Self {
        Self {
            host: WatchHost::new(storage),
            accumulated_declarations: String::new(),
            converted_dependency_paths: IndexSet::new(),
        }
    }

    pub fn accumulated_declarations(&self) -> &str {
        &self.accumulated_declarations
    }

    /// Queues a file-watch change event for a dependency path. Its converted
    /// state is invalidated at the start of the next `apply_cell`.
    pub fn notify_file_changed(&mut self, path: &str) {
        self.host.vfs_mut().notify_changed(path);
    }

    /// Drops all cross-cell state, including registered in-memory modules.
    pub fn reset(&mut self) {
        self.accumulated_declarations.clear();
        self.converted_dependency_paths.clear();
        self.host.vfs_mut().clear_modules();
    }

    /// Registers an in-memory module and reports its diagnostics. An invalid
    /// name is a programmer error, not a diagnostic.
    pub fn add_module(
        &mut self,
        name: &str,
        content: &str,
    ) -> Result<Vec<CellDiagnostic>, SessionError> {
        validate_module_name(name)?;
        self.host.vfs_mut().add_module(name, content.to_owned());
        let (files, unit) = check_module(self.host.vfs(), name);
        Ok(match unit {
            Some((file, diagnostics)) => diagnostics
                .iter()
                .map(|diagnostic| {
                    mapper::map_diagnostic(diagnostic, &files, file, false, Some(name))
                })
                .collect(),
            None => vec![],
        })
    }

    /// Compiles one cell against the accumulated declarations.
    pub fn apply_cell(&mut self, cell_source: &str) -> Result<CompiledCellResult, SessionError> {
        let _span = info_span!("apply_cell").entered();

        for path in self.host.vfs_mut().take_changed() {
            if self.converted_dependency_paths.shift_remove(&path) {
                trace!(%path, "converted dependency invalidated");
            }
        }

        self.host
            .write_decls(mapper::pad(&self.accumulated_declarations));
        self.host.write_cell(mapper::pad(cell_source));
        self.host.force_rebuild_now()?;

        // Cells do not name their exports; every value they bind must leak
        // into the session, which can only be known after a first compile.
        // Type-only bindings stay out of the list because they have no
        // runtime representation to export.
        let locals: Vec<String> = {
            let program = self.host.program()?;
            program
                .cell
                .analysis
                .scope
                .iter()
                .filter(|binding| binding.caps.contains(Capabilities::VALUE))
                .map(|binding| binding.name.clone())
                .collect()
        };
        if !locals.is_empty() {
            let exported = format!("{cell_source}\nexport {{ {} }};", locals.join(", "));
            self.host.write_cell(mapper::pad(&exported));
            self.host.force_rebuild_now()?;
        }

        let program = self.host.program()?;

        // The declarations file is synthesized by the session itself, so an
        // error in it means the carry-forward logic is unsound, not the user.
        for diagnostic in &program.decls.diagnostics {
            warn!(
                message = %diagnostic.message,
                "diagnostic in accumulated declarations"
            );
        }

        let (kept, has_top_level_suspend) = mapper::intercept_top_level_suspend(
            &program.cell.diagnostics,
            &program.cell.analysis.top_level_awaits,
        );
        let mut diagnostics: Vec<CellDiagnostic> = kept
            .into_iter()
            .map(|diagnostic| {
                mapper::map_diagnostic(diagnostic, &program.files, program.cell.file, true, None)
            })
            .collect();
        // A cell is invalidated by an error anywhere in its dependency set,
        // not just in its own text.
        for unit in program.modules.values() {
            for diagnostic in &unit.diagnostics {
                diagnostics.push(mapper::map_diagnostic(
                    diagnostic,
                    &program.files,
                    unit.file,
                    false,
                    Some(&unit.source_path),
                ));
            }
        }

        if diagnostics.iter().any(CellDiagnostic::is_error) {
            return Ok(CompiledCellResult {
                diagnostics,
                has_top_level_suspend,
                ..Default::default()
            });
        }

        let capture = emit::last_expression_statement(&program.cell.ast).map(|index| {
            let name = emit::capture_binding_name(&|candidate| {
                program.cell.analysis.scope.contains(candidate)
                    || program.decls.analysis.scope.contains(candidate)
            });
            (index, name)
        });
        let last_expression_binding_name = capture.as_ref().map(|(_, name)| name.clone());
        let primary_output = emit::emit_module(
            &program.cell.source,
            &program.cell.ast,
            &EmitOptions {
                capture,
                export_all: false,
            },
        );
        let side_outputs = emit_side_outputs(program, &mut self.converted_dependency_paths);

        let carried = carry_forward(
            &program.decls.source,
            &program.decls.ast,
            &program.decls.analysis,
            &program.cell.analysis,
        )?;
        let new_declarations =
            print_declarations(&program.cell.source, &program.cell.ast, &program.cell.analysis);
        let next_declarations = format!("{carried}{new_declarations}");
        trace!(
            bytes = next_declarations.len(),
            "accumulated declarations rolled forward"
        );
        self.accumulated_declarations = next_declarations.clone();

        Ok(CompiledCellResult {
            primary_output: Some(primary_output),
            declarations_output: Some(next_declarations),
            diagnostics,
            last_expression_binding_name,
            has_top_level_suspend,
            side_outputs,
        })
    }

    /// Hover information at a raw cell offset, against the last compiled
    /// program.
    pub fn quick_info(&self, offset: usize) -> Result<Option<QuickInfo>, SessionError> {
        Ok(quick_info_at(self.host.program()?, offset))
    }

    /// Completion candidates at a raw cell offset, against the last compiled
    /// program.
    pub fn complete(&self, offset: usize) -> Result<CompletionList, SessionError> {
        Ok(complete_at(self.host.program()?, offset))
    }
}

fn validate_module_name(name: &str) -> Result<(), SessionError> {
    let valid = !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with("__");
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidModuleName {
            name: name.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_are_validated() {
        assert!(validate_module_name("utils").is_ok());
        assert!(validate_module_name("").is_err());
        assert!(validate_module_name("a/b").is_err());
        assert!(validate_module_name("a\\b").is_err());
        assert!(validate_module_name("__cell__").is_err());
    }
}
