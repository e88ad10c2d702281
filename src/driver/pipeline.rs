//! Compilation pipeline orchestration.
//!
//! Runs the phases in order with gating between them: any syntax error
//! skips evaluation's gate, any semantic error skips emission, and only a
//! clean program is declared, emitted, and persisted.

use std::io::stderr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ast::Program;
use crate::backend::emit_program;
use crate::backend::il::Assembler;
use crate::backend::image::ImageAssembler;
use crate::diag::DiagSink;
use crate::parser::Parser;
use crate::reflect::{Registry, TypeProvider, CORE_LIBRARY};
use crate::scanner::{ScanError, Scanner};
use crate::sema::evaluate;

use super::io::{write_image_file, write_listing_file};

/// Conditions that abort compilation outright; everything else accumulates
/// in the sink.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot write artifact: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct CompileOutcome {
    pub errors: usize,
    pub warnings: usize,
    pub artifact: Option<PathBuf>,
}

/// Parse and evaluate. Returns `None` when either phase recorded errors;
/// the sink holds the diagnostics either way.
pub fn analyze(
    scanner: Scanner,
    libraries: &[String],
    provider: &dyn TypeProvider,
    diag: &mut DiagSink,
) -> Result<Option<Program>, ScanError> {
    let parser = Parser::new(scanner, libraries.to_vec(), diag);
    let mut program = parser.parse()?;
    if diag.error_count() > 0 {
        return Ok(None);
    }
    evaluate(&mut program, provider, diag);
    if diag.error_count() > 0 {
        return Ok(None);
    }
    Ok(Some(program))
}

/// `analyze` over in-memory source with the implicit standard-library
/// reference prepended.
pub fn analyze_source(
    source: &str,
    libraries: &[String],
    provider: &dyn TypeProvider,
    diag: &mut DiagSink,
) -> Result<Option<Program>, ScanError> {
    let scanner = Scanner::from_source(source)?;
    let mut libs = vec![CORE_LIBRARY.to_string()];
    libs.extend(libraries.iter().cloned());
    analyze(scanner, &libs, provider, diag)
}

/// Compile one source file and persist `<program>.exe` (and an `.il`
/// listing) beside it. Diagnostics are printed to stderr in discovery
/// order; a gated compilation prints `Compilation aborted` and yields no
/// artifact.
pub fn compile_file(
    source: &Path,
    libraries: &[String],
    diag: &mut DiagSink,
) -> Result<CompileOutcome, FatalError> {
    let scanner = Scanner::from_file(source)?;
    let mut libs = vec![CORE_LIBRARY.to_string()];
    libs.extend(libraries.iter().cloned());
    let provider = Registry::standard();

    let program = match analyze(scanner, &libs, &provider, diag)? {
        Some(p) => p,
        None => {
            let _ = diag.print_to(&mut stderr());
            eprintln!("Compilation aborted");
            return Ok(CompileOutcome {
                errors: diag.error_count(),
                warnings: diag.warning_count(),
                artifact: None,
            });
        }
    };

    let mut asm = ImageAssembler::new();
    emit_program(&program, &mut asm);
    let bytes = asm.finish();

    let dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
    let artifact = write_image_file(&dir, program.name.as_str(), &bytes)?;
    if let Err(e) = write_listing_file(&dir, program.name.as_str(), &asm.listing()) {
        eprintln!("Warning: failed to write listing: {e}");
    }

    let _ = diag.print_to(&mut stderr());
    Ok(CompileOutcome {
        errors: diag.error_count(),
        warnings: diag.warning_count(),
        artifact: Some(artifact),
    })
}
