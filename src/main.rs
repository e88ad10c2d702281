use std::env;
use std::path::Path;

use v_compiler::diag::DiagSink;
use v_compiler::driver::{self, FatalError};
use v_compiler::scanner::ScanError;

const USAGE: &str = "Usage: compiler <source-file> {<library-reference>}";

fn is_help(arg: &str) -> bool {
    let bare = arg.trim_start_matches(['-', '/']);
    bare.eq_ignore_ascii_case("help") || bare == "?"
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || is_help(&args[0]) {
        println!("{USAGE}");
        return;
    }

    let source = Path::new(&args[0]);
    let libraries: Vec<String> = args[1..].to_vec();
    let mut diag = DiagSink::new();

    match driver::compile_file(source, &libraries, &mut diag) {
        Ok(outcome) => {
            if let Some(artifact) = outcome.artifact {
                println!("Compiled {} -> {}", source.display(), artifact.display());
            }
        }
        Err(FatalError::Scan(ScanError::CannotOpen(path))) => {
            println!("Source file '{path}' not found");
        }
        Err(err) => {
            eprintln!("Error: {err}");
        }
    }
    // The exit code stays zero even when compilation fails, for parity with
    // the historical front-end; embedders can read the error count from the
    // sink instead.
}
