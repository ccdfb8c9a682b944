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

//! Lowers the output of the semantic analysis phase (AST, class model, type
//! analysis) into textual LLVM IR.
//!
//! # Generated Names
//!
//! A dot (`.`) is a valid character in an LLVM identifier, but not in
//! `MiniJava`. Methods are therefore emitted as `@Class.method` and vtables
//! as `@.Class_vtable` without any risk of clashing with user names.
//! Parameters arrive as `%.name` and are copied into the stack slot
//! `%Class_method_name` at method entry. Temporaries are `%_N`, numbered
//! from zero in every function.
//!
//! # Object Layout
//!
//! Every object starts with an 8 byte header holding the vtable pointer,
//! fields follow at `8 + offset`. See [`layout`] for how offsets and vtable
//! slots are assigned.

#[macro_use]
extern crate derive_more;

pub mod layout;
mod method_body_generator;
pub mod program_generator;
pub mod runtime;
mod type_translation;
pub mod vtable;

pub use self::{
    layout::{ClassLayout, FieldLayout, Layout},
    program_generator::ProgramGenerator,
    runtime::RuntimeFunction,
    vtable::VTable,
};
use failure::Fail;

/// Inconsistencies between the checked syntax tree and the analysis
/// results. None of these can happen for a program that passed semantic
/// analysis.
#[derive(Debug, Fail)]
pub enum CodegenError {
    #[fail(
        display = "no type information for {} expression in line {}",
        kind, line
    )]
    MissingAnalysis { kind: String, line: usize },

    #[fail(display = "{} expression in line {} was not resolved", kind, line)]
    MissingResolution { kind: String, line: usize },

    #[fail(display = "assignment to {} in line {} was not resolved", name, line)]
    MissingTarget { name: String, line: usize },

    #[fail(display = "field {} has no offset assigned", name)]
    MissingFieldOffset { name: String },

    #[fail(display = "method {}() has no vtable slot assigned", name)]
    MissingSlot { name: String },

    #[fail(display = "class {} was not registered during semantic analysis", name)]
    MissingClass { name: String },

    #[fail(display = "method {}() was not registered during semantic analysis", name)]
    MissingMethod { name: String },
}
