//! V_compiler: a compiler for the V imperative language targeting a typed,
//! managed stack-machine IL.
//!
//! # Architecture
//! - `types`: cross-cutting type model used across all compilation phases
//! - `diag`: chronological diagnostic sink (errors and warnings interleaved)
//! - `scanner`: tokenization with positions and a peek buffer
//! - `parser`: token stream → syntax tree + scope tree
//! - `ast`: arena-backed syntax tree and pretty printer
//! - `scope`: scope chain, overload resolution, reflective lookup caches
//! - `reflect`: type-provider capability over external libraries
//! - `sema`: semantic analysis, constant folding, dead-code removal
//! - `backend`: declaration and code emission over an assembler capability
//! - `driver`: compilation orchestration, gating, and file output

pub mod ast;
pub mod backend;
pub mod diag;
pub mod driver;
pub mod parser;
pub mod reflect;
pub mod scanner;
pub mod scope;
pub mod sema;
pub mod types;
