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

//! Semantic analysis of `MiniJava` programs.
//!
//! [`check`] resolves the class hierarchy into a [`ClassModel`] and then
//! runs the declaration, override and method body passes over it. The
//! results are the annotated class model and a [`TypeAnalysis`] holding
//! the type and resolution of every expression.

mod checker;
mod hierarchy;
mod method_body_type_checker;
mod semantic_error;
pub mod type_analysis;
pub mod type_system;

pub use crate::{
    checker::{check, AnalysisStopped, CheckPass, CheckerOptions},
    semantic_error::SemanticError,
    type_analysis::{ExprInfo, RefInfo, TypeAnalysis, VarRef},
    type_system::{
        CheckedType, ClassDef, ClassId, ClassModel, FieldDef, FieldRef, MethodDef, MethodRef,
        VarDef,
    },
};
