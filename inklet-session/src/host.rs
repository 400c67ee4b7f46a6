//! The persistent watch-style compilation host.
//!
//! The host owns the VFS and a single pending-rebuild slot. Writing either
//! synthetic file schedules a rebuild; [`WatchHost::force_rebuild_now`]
//! drains the slot synchronously. No timers are involved anywhere.

use indexmap::IndexMap;
use inklet_analysis::{
    analyze,
    check::{ModuleAnalysis, ModuleResolver},
    diagnostics::CIRCULAR_IMPORT,
};
use inklet_foundation::{
    errors::{Diagnostic, Label},
    source::{SourceFile, SourceFileId, SourceFileSet},
};
use inklet_syntax::{ast, parse_file};
use tracing::{info_span, trace};

use crate::{
    session::SessionError,
    vfs::{FileSystem, Vfs, CELL_FILE, DECLS_FILE},
};

/// One compiled module: the cell, the declarations file, or a dependency.
pub struct ModuleUnit {
    /// The import specifier this unit was resolved from; for synthetic files,
    /// the synthetic file name.
    pub specifier: String,
    /// The path the source was read from (`{specifier}.ink`,
    /// `{specifier}.d.ink`, or the in-memory module name).
    pub source_path: String,
    pub file: SourceFileId,
    pub source: String,
    pub ast: ast::File,
    pub analysis: ModuleAnalysis,
    pub diagnostics: Vec<Diagnostic>,
    /// Type-declaration files are consulted for types only; they are never
    /// emitted or listed as dependencies.
    pub declaration_only: bool,
}

/// The result of one rebuild. Read-only consumers (hover, completion) query
/// it between cells; a new rebuild replaces it wholesale.
pub struct Program {
    pub files: SourceFileSet,
    pub cell: ModuleUnit,
    pub decls: ModuleUnit,
    /// Transitive module dependencies in load order, keyed by specifier.
    pub modules: IndexMap<String, ModuleUnit>,
}

pub struct WatchHost<F> {
    vfs: Vfs<F>,
    pending_rebuild: bool,
    program: Option<Program>,
}

impl<F: FileSystem> WatchHost<F> {
    pub fn new(storage: F) -> Self {
        Self {
            vfs: Vfs::new(storage),
            pending_rebuild: false,
            program: None,
        }
    }

    pub fn vfs(&self) -> &Vfs<F> {
        &self.vfs
    }

    pub fn vfs_mut(&mut self) -> &mut Vfs<F> {
        &mut self.vfs
    }

    /// Writes the padded cell source and schedules a rebuild.
    pub fn write_cell(&mut self, padded: String) {
        self.vfs.set_cell(padded);
        self.schedule_rebuild(CELL_FILE);
    }

    /// Writes the padded declarations source and schedules a rebuild.
    pub fn write_decls(&mut self, padded: String) {
        self.vfs.set_decls(padded);
        self.schedule_rebuild(DECLS_FILE);
    }

    fn schedule_rebuild(&mut self, path: &str) {
        trace!(path, "rebuild scheduled");
        self.pending_rebuild = true;
    }

    /// Drains the pending-rebuild slot synchronously. Calling this without a
    /// scheduled rebuild means the host and the session have desynchronized.
    pub fn force_rebuild_now(&mut self) -> Result<(), SessionError> {
        if !self.pending_rebuild {
            return Err(SessionError::NoPendingRebuild);
        }
        self.pending_rebuild = false;
        let _span = info_span!("rebuild").entered();
        self.program = Some(rebuild(&self.vfs));
        Ok(())
    }

    pub fn program(&self) -> Result<&Program, SessionError> {
        self.program.as_ref().ok_or(SessionError::MissingProgram)
    }
}

fn rebuild<F: FileSystem>(vfs: &Vfs<F>) -> Program {
    let mut loader = Loader::new(vfs);

    let decls_source = vfs.decls().to_owned();
    let decls_file = loader
        .files
        .add(SourceFile::new(DECLS_FILE, decls_source.clone()));
    let mut decls_diagnostics = vec![];
    let decls_ast = parse_file(decls_file, &decls_source, &mut decls_diagnostics);

    let cell_source = vfs.cell().to_owned();
    let cell_file = loader
        .files
        .add(SourceFile::new(CELL_FILE, cell_source.clone()));
    let mut cell_diagnostics = vec![];
    let cell_ast = parse_file(cell_file, &cell_source, &mut cell_diagnostics);

    loader.load_imports(&decls_ast);
    loader.load_imports(&cell_ast);

    let decls_analysis = analyze(
        decls_file,
        &decls_ast,
        None,
        &LoadedModules(&loader.modules),
        &mut decls_diagnostics,
    );
    let cell_analysis = analyze(
        cell_file,
        &cell_ast,
        Some(&decls_analysis),
        &LoadedModules(&loader.modules),
        &mut cell_diagnostics,
    );

    Program {
        files: loader.files,
        cell: ModuleUnit {
            specifier: CELL_FILE.to_owned(),
            source_path: CELL_FILE.to_owned(),
            file: cell_file,
            source: cell_source,
            ast: cell_ast,
            analysis: cell_analysis,
            diagnostics: cell_diagnostics,
            declaration_only: false,
        },
        decls: ModuleUnit {
            specifier: DECLS_FILE.to_owned(),
            source_path: DECLS_FILE.to_owned(),
            file: decls_file,
            source: decls_source,
            ast: decls_ast,
            analysis: decls_analysis,
            diagnostics: decls_diagnostics,
            declaration_only: false,
        },
        modules: loader.modules,
    }
}

struct LoadedModules<'a>(&'a IndexMap<String, ModuleUnit>);

impl ModuleResolver for LoadedModules<'_> {
    fn resolve(&self, specifier: &str) -> Option<&ModuleAnalysis> {
        self.0.get(specifier).map(|unit| &unit.analysis)
    }
}

/// Recursively loads and analyzes module dependencies, depth-first so that a
/// module's own imports are analyzed before it is.
pub(crate) struct Loader<'v, F> {
    vfs: &'v Vfs<F>,
    pub(crate) files: SourceFileSet,
    pub(crate) modules: IndexMap<String, ModuleUnit>,
    loading: Vec<String>,
}

impl<'v, F: FileSystem> Loader<'v, F> {
    pub(crate) fn new(vfs: &'v Vfs<F>) -> Self {
        Self {
            vfs,
            files: SourceFileSet::new(),
            modules: IndexMap::new(),
            loading: vec![],
        }
    }

    fn load_imports(&mut self, ast: &ast::File) {
        for stmt in &ast.statements {
            if let ast::Stmt::Import(import) = stmt {
                self.load(&import.module);
            }
        }
    }

    /// Loads one module by specifier, unless already loaded. Unresolvable
    /// specifiers are left to the checker, which reports them against the
    /// importing statement.
    pub(crate) fn load(&mut self, specifier: &str) {
        if self.modules.contains_key(specifier) || self.loading.iter().any(|s| s == specifier) {
            return;
        }
        let Some((source_path, source, declaration_only)) = self.resolve(specifier) else {
            return;
        };
        trace!(specifier, %source_path, "loading module");
        self.loading.push(specifier.to_owned());

        let file = self.files.add(SourceFile::new(&*source_path, source.clone()));
        let mut diagnostics = vec![];
        let ast = parse_file(file, &source, &mut diagnostics);

        for stmt in &ast.statements {
            if let ast::Stmt::Import(import) = stmt {
                if self.loading.iter().any(|s| s == &import.module) {
                    diagnostics.push(
                        Diagnostic::error(
                            file,
                            format!("circular import of module `{}`", import.module),
                        )
                        .with_code(CIRCULAR_IMPORT)
                        .with_label(Label::primary(import.module_span, "")),
                    );
                } else {
                    self.load(&import.module);
                }
            }
        }

        let analysis = analyze(
            file,
            &ast,
            None,
            &LoadedModules(&self.modules),
            &mut diagnostics,
        );
        self.loading.pop();
        self.modules.insert(
            specifier.to_owned(),
            ModuleUnit {
                specifier: specifier.to_owned(),
                source_path,
                file,
                source,
                ast,
                analysis,
                diagnostics,
                declaration_only,
            },
        );
    }

    /// In-memory modules win over `{specifier}.ink`, which wins over the
    /// type-only `{specifier}.d.ink`.
    fn resolve(&self, specifier: &str) -> Option<(String, String, bool)> {
        if let Some(content) = self.vfs.module(specifier) {
            return Some((specifier.to_owned(), content.to_owned(), false));
        }
        let compiled = format!("{specifier}.ink");
        if let Some(content) = self.vfs.read_file(&compiled) {
            return Some((compiled, content, false));
        }
        let declaration = format!("{specifier}.d.ink");
        if let Some(content) = self.vfs.read_file(&declaration) {
            return Some((declaration, content, true));
        }
        None
    }
}

/// Compiles a single registered module in isolation, for the diagnostics
/// returned by module registration.
pub(crate) fn check_module<F: FileSystem>(
    vfs: &Vfs<F>,
    name: &str,
) -> (SourceFileSet, Option<(SourceFileId, Vec<Diagnostic>)>) {
    let mut loader = Loader::new(vfs);
    loader.load(name);
    let unit = loader.modules.shift_remove(name);
    (
        loader.files,
        unit.map(|unit| (unit.file, unit.diagnostics)),
    )
}
