use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use inklet_foundation::{
    errors::{self, Label},
    source::{SourceFile, SourceFileSet},
    span::Span,
};
use inklet_session::{CellDiagnostic, RealFs, Session, Severity};
use tracing::{error, info, info_span, metadata::LevelFilter, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use walkdir::WalkDir;

#[derive(Debug, Parser)]
pub struct Args {
    /// Script files to run, each as one cell, in order. With no files, an
    /// interactive session reads cells from stdin (submit with a blank line).
    scripts: Vec<Utf8PathBuf>,

    /// Directory of `.ink` files to register as in-memory modules before the
    /// first cell, importable by file stem.
    #[clap(short = 'm', long)]
    modules: Option<Utf8PathBuf>,

    /// Print the compiled output of each cell.
    #[clap(long)]
    dump_output: bool,

    /// Print the accumulated declarations after each cell.
    #[clap(long)]
    dump_declarations: bool,
}

pub fn fallible_main(args: Args) -> anyhow::Result<()> {
    let _span = info_span!("inklet").entered();

    let mut session = Session::new(RealFs);

    if let Some(modules_dir) = &args.modules {
        let _span = info_span!("register_modules").entered();
        let mut count = 0;
        for path in list_module_files(modules_dir)? {
            let name = path
                .file_stem()
                .context("module file has no stem")?
                .to_owned();
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read module file at {path:?}"))?;
            let diagnostics = session
                .add_module(&name, &content)
                .with_context(|| format!("cannot register module `{name}`"))?;
            print_diagnostics(&name, &content, &diagnostics)?;
            count += 1;
        }
        info!(module_count = count);
    }

    if args.scripts.is_empty() {
        repl(&mut session, &args)
    } else {
        for path in &args.scripts {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read script at {path:?}"))?;
            run_cell(&mut session, &source, &args)?;
        }
        Ok(())
    }
}

fn repl(session: &mut Session<RealFs>, args: &Args) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut cell = String::new();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.is_empty() {
            if !cell.trim().is_empty() {
                run_cell(session, &cell, args)?;
            }
            cell.clear();
            print!("> ");
        } else {
            cell.push_str(&line);
            cell.push('\n');
            print!(". ");
        }
        io::stdout().flush()?;
    }
    if !cell.trim().is_empty() {
        run_cell(session, &cell, args)?;
    }
    Ok(())
}

fn run_cell(session: &mut Session<RealFs>, source: &str, args: &Args) -> anyhow::Result<()> {
    let result = session.apply_cell(source)?;
    print_diagnostics("cell", source, &result.diagnostics)?;
    if result.has_top_level_suspend {
        info!("cell suspends at top level");
    }
    if args.dump_output {
        for side_output in &result.side_outputs {
            println!("// {}", side_output.path);
            println!("{}", side_output.code);
        }
        if let Some(primary) = &result.primary_output {
            println!("{primary}");
        }
    }
    if args.dump_declarations {
        println!("// declarations");
        println!("{}", session.accumulated_declarations());
    }
    Ok(())
}

/// Renders diagnostics that point into `source` through codespan-reporting.
/// Diagnostics against other files (dependencies of the cell) fall back to a
/// one-line form, since their sources are not at hand here.
fn print_diagnostics(
    file_name: &str,
    source: &str,
    diagnostics: &[CellDiagnostic],
) -> anyhow::Result<()> {
    let mut files = SourceFileSet::new();
    let file = files.add(SourceFile::new(file_name, source));
    for diagnostic in diagnostics {
        let local = diagnostic.source_file.as_deref().unwrap_or(file_name) == file_name;
        if local {
            let severity = match diagnostic.severity {
                Severity::Error => errors::Severity::Error,
                Severity::Warning => errors::Severity::Warning,
                Severity::Info => errors::Severity::Note,
            };
            errors::Diagnostic::new(severity, file, diagnostic.message.clone())
                .with_code(diagnostic.code)
                .with_label(Label::primary(
                    Span::new(diagnostic.start.offset, diagnostic.end.offset),
                    "",
                ))
                .emit_to_stderr(&files)?;
        } else {
            let severity = match diagnostic.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            let file = diagnostic.source_file.as_deref().unwrap_or(file_name);
            eprintln!(
                "{severity}[E{:04}] {file}:{}:{}: {}",
                diagnostic.code,
                diagnostic.start.line + 1,
                diagnostic.start.column + 1,
                diagnostic.message
            );
        }
    }
    Ok(())
}

fn list_module_files(dir: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        bail!("{dir:?} is not a directory");
    }
    let mut paths = vec![];
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        let path = entry.path();
        if let Some(path) = Utf8Path::from_path(path) {
            if path.is_file() && path.extension() == Some("ink") {
                paths.push(path.to_owned());
            }
        } else {
            warn!("path contains invalid UTF-8: {path:?}");
        }
    }
    paths.sort();
    Ok(paths)
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_writer(std::io::stderr)
            .with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            ),
    );

    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    match fallible_main(args) {
        Ok(_) => (),
        Err(error) => error!("{error:?}"),
    }
}
