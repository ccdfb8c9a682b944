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

//! Syntax tree of a `MiniJava` program as handed to semantic analysis.
//!
//! The tree is produced by an external parser, so every node only records
//! the source line it started on.

pub mod build;
mod spanned;

pub use crate::spanned::Spanned;

use std::fmt;
use strtab::Symbol;
use strum_macros::EnumDiscriminants;

/// This is the top-level AST node. The main class always comes first, the
/// remaining classes follow in declaration order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Program<'src> {
    pub main_class: Spanned<MainClass<'src>>,
    pub classes: Vec<Spanned<ClassDeclaration<'src>>>,
}

/// The class holding `public static void main(String[] param)`. It has no
/// fields, no other methods and cannot be extended or instantiated.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MainClass<'src> {
    pub name: Spanned<Symbol<'src>>,
    pub param_name: Spanned<Symbol<'src>>,
    pub vars: Vec<Spanned<VarDeclaration<'src>>>,
    pub statements: Vec<Spanned<Stmt<'src>>>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassDeclaration<'src> {
    pub name: Spanned<Symbol<'src>>,
    pub superclass: Option<Spanned<Symbol<'src>>>,
    pub fields: Vec<Spanned<VarDeclaration<'src>>>,
    pub methods: Vec<Spanned<MethodDeclaration<'src>>>,
}

/// Declaration of a field, a parameter or a local variable.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VarDeclaration<'src> {
    pub ty: Spanned<Type<'src>>,
    pub name: Spanned<Symbol<'src>>,
}

/// `public T name(params) { vars statements return expr; }`
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodDeclaration<'src> {
    pub return_ty: Spanned<Type<'src>>,
    pub name: Spanned<Symbol<'src>>,
    pub params: Vec<Spanned<VarDeclaration<'src>>>,
    pub vars: Vec<Spanned<VarDeclaration<'src>>>,
    pub statements: Vec<Spanned<Stmt<'src>>>,
    pub return_expr: Box<Spanned<Expr<'src>>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type<'src> {
    Int,
    Boolean,
    IntArray,
    BooleanArray,
    Class(Symbol<'src>),
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::IntArray => write!(f, "int[]"),
            Type::BooleanArray => write!(f, "boolean[]"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

/// A statement is one of
/// * `Block`: `{ statements }`
/// * `Assign`: `name = expr;`
/// * `ArrayAssign`: `name[index] = expr;`
/// * `If`: `if (cond) then else otherwise` (the else branch is mandatory)
/// * `While`: `while (cond) body`
/// * `Print`: `System.out.println(expr);`
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Stmt<'src> {
    Block(Vec<Spanned<Stmt<'src>>>),
    Assign(Spanned<Symbol<'src>>, Box<Spanned<Expr<'src>>>),
    ArrayAssign(
        Spanned<Symbol<'src>>,
        Box<Spanned<Expr<'src>>>,
        Box<Spanned<Expr<'src>>>,
    ),
    If(
        Box<Spanned<Expr<'src>>>,
        Box<Spanned<Stmt<'src>>>,
        Box<Spanned<Stmt<'src>>>,
    ),
    While(Box<Spanned<Expr<'src>>>, Box<Spanned<Stmt<'src>>>),
    Print(Box<Spanned<Expr<'src>>>),
}

/// An expression is either a binary operation (`&&`, `<`, `+`, `-`, `*`),
/// an array lookup `a[i]`, an array length `a.length`, a message send
/// `recv.name(args)` or one of the primary clauses (literals, identifiers,
/// `this`, allocations, `!e` and `(e)`).
#[derive(EnumDiscriminants, Debug, PartialEq, Eq, Clone)]
#[strum_discriminants(derive(strum_macros::Display))]
pub enum Expr<'src> {
    Binary(
        BinaryOp,
        Box<Spanned<Expr<'src>>>,
        Box<Spanned<Expr<'src>>>,
    ),
    ArrayLookup(Box<Spanned<Expr<'src>>>, Box<Spanned<Expr<'src>>>),
    ArrayLength(Box<Spanned<Expr<'src>>>),
    MessageSend(
        Box<Spanned<Expr<'src>>>,
        Spanned<Symbol<'src>>,
        Vec<Spanned<Expr<'src>>>,
    ),

    IntLiteral(i32),
    True,
    False,
    Identifier(Symbol<'src>),
    This,
    NewIntArray(Box<Spanned<Expr<'src>>>),
    NewBooleanArray(Box<Spanned<Expr<'src>>>),
    NewObject(Spanned<Symbol<'src>>),
    Not(Box<Spanned<Expr<'src>>>),
    Bracket(Box<Spanned<Expr<'src>>>),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BinaryOp {
    And,
    Less,
    Add,
    Sub,
    Mul,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::And => "&&",
            BinaryOp::Less => "<",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
        };
        write!(f, "{}", op)
    }
}

impl<'src> Program<'src> {
    pub fn class_count(&self) -> usize {
        self.classes.len() + 1
    }
}
