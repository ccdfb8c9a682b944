#![warn(rust_2018_idioms)]
#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! The `MiniJava` compilation pipeline.
//!
//! A [`Program`](ast::Program) is checked (hierarchy resolution plus the
//! declaration, override and method body passes), laid out and finally
//! lowered to LLVM IR. Semantic errors are reported into the
//! [`Diagnostics`](diagnostics::Diagnostics) of the [`Context`]; the
//! pipeline stops between passes and never emits IR for a program that
//! reported an error.
//!
//! [`Context`]: compiler_shared::context::Context

mod driver;

pub use crate::driver::{
    analyze, compile, print_error, Analysis, CompileError, CompilerPhase, Options,
};
pub use llvm_construction::FieldLayout;
