//! Loads a `MiniJava` syntax tree serialized as JSON.
//!
//! Every node carries the `line` it starts on (defaulting to 1). Types,
//! statements and expressions are externally tagged:
//!
//! ```json
//! { "line": 4, "kind": { "Assign": ["x", { "kind": { "Plus": [
//!     { "kind": { "Int": 1 } },
//!     { "kind": { "Identifier": "y" } }
//! ] } }] } }
//! ```
//!
//! Unit variants are plain strings, e.g. `{ "kind": "This" }` or the
//! type `"Int"`.

use ast::{BinaryOp, Spanned};
use failure::{Error, Fail, ResultExt};
use serde_derive::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use strtab::{StringTable, Symbol};

#[derive(Debug, Fail)]
pub enum AstLoadError {
    #[fail(display = "cannot open input file {:?}", path)]
    OpenInput { path: String },
    #[fail(display = "input file {:?} is not a valid syntax tree", path)]
    Malformed { path: String },
}

fn first_line() -> usize {
    1
}

#[derive(Debug, Deserialize)]
pub struct ProgramDoc {
    main_class: MainClassDoc,
    #[serde(default)]
    classes: Vec<ClassDoc>,
}

#[derive(Debug, Deserialize)]
struct MainClassDoc {
    #[serde(default = "first_line")]
    line: usize,
    name: String,
    param_name: String,
    #[serde(default)]
    vars: Vec<VarDoc>,
    #[serde(default)]
    statements: Vec<StmtDoc>,
}

#[derive(Debug, Deserialize)]
struct ClassDoc {
    #[serde(default = "first_line")]
    line: usize,
    name: String,
    #[serde(default)]
    superclass: Option<String>,
    #[serde(default)]
    fields: Vec<VarDoc>,
    #[serde(default)]
    methods: Vec<MethodDoc>,
}

#[derive(Debug, Deserialize)]
struct VarDoc {
    #[serde(default = "first_line")]
    line: usize,
    ty: TypeDoc,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MethodDoc {
    #[serde(default = "first_line")]
    line: usize,
    return_ty: TypeDoc,
    name: String,
    #[serde(default)]
    params: Vec<VarDoc>,
    #[serde(default)]
    vars: Vec<VarDoc>,
    #[serde(default)]
    statements: Vec<StmtDoc>,
    return_expr: ExprDoc,
}

#[derive(Debug, Deserialize)]
enum TypeDoc {
    Int,
    Boolean,
    IntArray,
    BooleanArray,
    Class(String),
}

#[derive(Debug, Deserialize)]
struct StmtDoc {
    #[serde(default = "first_line")]
    line: usize,
    kind: StmtKind,
}

#[derive(Debug, Deserialize)]
enum StmtKind {
    Block(Vec<StmtDoc>),
    Assign(String, ExprDoc),
    ArrayAssign(String, ExprDoc, ExprDoc),
    If(ExprDoc, Box<StmtDoc>, Box<StmtDoc>),
    While(ExprDoc, Box<StmtDoc>),
    Print(ExprDoc),
}

#[derive(Debug, Deserialize)]
struct ExprDoc {
    #[serde(default = "first_line")]
    line: usize,
    kind: Box<ExprKind>,
}

#[derive(Debug, Deserialize)]
enum ExprKind {
    And(ExprDoc, ExprDoc),
    Less(ExprDoc, ExprDoc),
    Plus(ExprDoc, ExprDoc),
    Minus(ExprDoc, ExprDoc),
    Times(ExprDoc, ExprDoc),
    ArrayLookup(ExprDoc, ExprDoc),
    ArrayLength(ExprDoc),
    MessageSend(ExprDoc, String, Vec<ExprDoc>),
    Int(i32),
    True,
    False,
    Identifier(String),
    This,
    NewIntArray(ExprDoc),
    NewBooleanArray(ExprDoc),
    NewObject(String),
    Not(ExprDoc),
    Bracket(ExprDoc),
}

/// Reads and parses the syntax tree stored at `path`.
pub fn read(path: &Path) -> Result<ProgramDoc, Error> {
    let display_path = path.display().to_string();
    let file = File::open(path).context(AstLoadError::OpenInput {
        path: display_path.clone(),
    })?;
    let doc = serde_json::from_reader(BufReader::new(file))
        .context(AstLoadError::Malformed { path: display_path })?;
    Ok(doc)
}

impl ProgramDoc {
    /// Interns all identifiers into `strtab` and builds the syntax tree.
    pub fn lower<'doc>(&'doc self, strtab: &mut StringTable<'doc>) -> ast::Program<'doc> {
        let mut lowering = Lowering { strtab };
        let main = &self.main_class;
        let main_class = Spanned::new(
            main.line,
            ast::MainClass {
                name: lowering.name(main.line, &main.name),
                param_name: lowering.name(main.line, &main.param_name),
                vars: lowering.vars(&main.vars),
                statements: lowering.stmts(&main.statements),
            },
        );
        let classes = self
            .classes
            .iter()
            .map(|class| lowering.class(class))
            .collect();

        ast::Program {
            main_class,
            classes,
        }
    }
}

struct Lowering<'a, 'doc> {
    strtab: &'a mut StringTable<'doc>,
}

impl<'a, 'doc> Lowering<'a, 'doc> {
    fn symbol(&mut self, name: &'doc str) -> Symbol<'doc> {
        self.strtab.intern(name)
    }

    fn name(&mut self, line: usize, name: &'doc str) -> Spanned<Symbol<'doc>> {
        Spanned::new(line, self.symbol(name))
    }

    fn class(&mut self, class: &'doc ClassDoc) -> Spanned<ast::ClassDeclaration<'doc>> {
        Spanned::new(
            class.line,
            ast::ClassDeclaration {
                name: self.name(class.line, &class.name),
                superclass: class
                    .superclass
                    .as_ref()
                    .map(|superclass| self.name(class.line, superclass)),
                fields: self.vars(&class.fields),
                methods: class
                    .methods
                    .iter()
                    .map(|method| self.method(method))
                    .collect(),
            },
        )
    }

    fn method(&mut self, method: &'doc MethodDoc) -> Spanned<ast::MethodDeclaration<'doc>> {
        Spanned::new(
            method.line,
            ast::MethodDeclaration {
                return_ty: Spanned::new(method.line, self.ty(&method.return_ty)),
                name: self.name(method.line, &method.name),
                params: self.vars(&method.params),
                vars: self.vars(&method.vars),
                statements: self.stmts(&method.statements),
                return_expr: Box::new(self.expr(&method.return_expr)),
            },
        )
    }

    fn vars(&mut self, vars: &'doc [VarDoc]) -> Vec<Spanned<ast::VarDeclaration<'doc>>> {
        vars.iter()
            .map(|var| {
                Spanned::new(
                    var.line,
                    ast::VarDeclaration {
                        ty: Spanned::new(var.line, self.ty(&var.ty)),
                        name: self.name(var.line, &var.name),
                    },
                )
            })
            .collect()
    }

    fn ty(&mut self, ty: &'doc TypeDoc) -> ast::Type<'doc> {
        match ty {
            TypeDoc::Int => ast::Type::Int,
            TypeDoc::Boolean => ast::Type::Boolean,
            TypeDoc::IntArray => ast::Type::IntArray,
            TypeDoc::BooleanArray => ast::Type::BooleanArray,
            TypeDoc::Class(name) => ast::Type::Class(self.symbol(name)),
        }
    }

    fn stmts(&mut self, stmts: &'doc [StmtDoc]) -> Vec<Spanned<ast::Stmt<'doc>>> {
        stmts.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    fn stmt(&mut self, stmt: &'doc StmtDoc) -> Spanned<ast::Stmt<'doc>> {
        use ast::Stmt;
        let line = stmt.line;
        let data = match &stmt.kind {
            StmtKind::Block(stmts) => Stmt::Block(self.stmts(stmts)),
            StmtKind::Assign(target, value) => {
                Stmt::Assign(self.name(line, target), self.boxed(value))
            }
            StmtKind::ArrayAssign(target, index, value) => Stmt::ArrayAssign(
                self.name(line, target),
                self.boxed(index),
                self.boxed(value),
            ),
            StmtKind::If(cond, then, otherwise) => Stmt::If(
                self.boxed(cond),
                Box::new(self.stmt(then)),
                Box::new(self.stmt(otherwise)),
            ),
            StmtKind::While(cond, body) => Stmt::While(self.boxed(cond), Box::new(self.stmt(body))),
            StmtKind::Print(value) => Stmt::Print(self.boxed(value)),
        };
        Spanned::new(line, data)
    }

    fn boxed(&mut self, expr: &'doc ExprDoc) -> Box<Spanned<ast::Expr<'doc>>> {
        Box::new(self.expr(expr))
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &'doc ExprDoc,
        rhs: &'doc ExprDoc,
    ) -> ast::Expr<'doc> {
        ast::Expr::Binary(op, self.boxed(lhs), self.boxed(rhs))
    }

    fn expr(&mut self, expr: &'doc ExprDoc) -> Spanned<ast::Expr<'doc>> {
        use ast::Expr;
        let line = expr.line;
        let data = match &*expr.kind {
            ExprKind::And(lhs, rhs) => self.binary(BinaryOp::And, lhs, rhs),
            ExprKind::Less(lhs, rhs) => self.binary(BinaryOp::Less, lhs, rhs),
            ExprKind::Plus(lhs, rhs) => self.binary(BinaryOp::Add, lhs, rhs),
            ExprKind::Minus(lhs, rhs) => self.binary(BinaryOp::Sub, lhs, rhs),
            ExprKind::Times(lhs, rhs) => self.binary(BinaryOp::Mul, lhs, rhs),
            ExprKind::ArrayLookup(array, index) => {
                Expr::ArrayLookup(self.boxed(array), self.boxed(index))
            }
            ExprKind::ArrayLength(array) => Expr::ArrayLength(self.boxed(array)),
            ExprKind::MessageSend(receiver, name, args) => Expr::MessageSend(
                self.boxed(receiver),
                self.name(line, name),
                args.iter().map(|arg| self.expr(arg)).collect(),
            ),
            ExprKind::Int(value) => Expr::IntLiteral(*value),
            ExprKind::True => Expr::True,
            ExprKind::False => Expr::False,
            ExprKind::Identifier(name) => Expr::Identifier(self.symbol(name)),
            ExprKind::This => Expr::This,
            ExprKind::NewIntArray(size) => Expr::NewIntArray(self.boxed(size)),
            ExprKind::NewBooleanArray(size) => Expr::NewBooleanArray(self.boxed(size)),
            ExprKind::NewObject(class) => Expr::NewObject(self.name(line, class)),
            ExprKind::Not(operand) => Expr::Not(self.boxed(operand)),
            ExprKind::Bracket(inner) => Expr::Bracket(self.boxed(inner)),
        };
        Spanned::new(line, data)
    }
}
