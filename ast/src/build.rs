//! Constructor helpers for syntax trees.
//!
//! Front ends and tests assemble trees through these functions instead of
//! spelling out the boxing. Every node starts on line 1; use
//! [`Spanned::at`] to move it.

use crate::*;

const DEFAULT_LINE: usize = 1;

fn spanned<T>(data: T) -> Spanned<T> {
    Spanned::new(DEFAULT_LINE, data)
}

fn boxed<'src>(expr: Spanned<Expr<'src>>) -> Box<Spanned<Expr<'src>>> {
    Box::new(expr)
}

pub fn program<'src>(
    main_class: Spanned<MainClass<'src>>,
    classes: Vec<Spanned<ClassDeclaration<'src>>>,
) -> Program<'src> {
    Program {
        main_class,
        classes,
    }
}

pub fn main_class<'src>(
    name: Symbol<'src>,
    param_name: Symbol<'src>,
    vars: Vec<Spanned<VarDeclaration<'src>>>,
    statements: Vec<Spanned<Stmt<'src>>>,
) -> Spanned<MainClass<'src>> {
    spanned(MainClass {
        name: spanned(name),
        param_name: spanned(param_name),
        vars,
        statements,
    })
}

pub fn class<'src>(
    name: Symbol<'src>,
    superclass: Option<Symbol<'src>>,
    fields: Vec<Spanned<VarDeclaration<'src>>>,
    methods: Vec<Spanned<MethodDeclaration<'src>>>,
) -> Spanned<ClassDeclaration<'src>> {
    spanned(ClassDeclaration {
        name: spanned(name),
        superclass: superclass.map(spanned),
        fields,
        methods,
    })
}

pub fn var<'src>(ty: Type<'src>, name: Symbol<'src>) -> Spanned<VarDeclaration<'src>> {
    spanned(VarDeclaration {
        ty: spanned(ty),
        name: spanned(name),
    })
}

pub fn method<'src>(
    return_ty: Type<'src>,
    name: Symbol<'src>,
    params: Vec<Spanned<VarDeclaration<'src>>>,
    vars: Vec<Spanned<VarDeclaration<'src>>>,
    statements: Vec<Spanned<Stmt<'src>>>,
    return_expr: Spanned<Expr<'src>>,
) -> Spanned<MethodDeclaration<'src>> {
    spanned(MethodDeclaration {
        return_ty: spanned(return_ty),
        name: spanned(name),
        params,
        vars,
        statements,
        return_expr: boxed(return_expr),
    })
}

// Statements

pub fn block<'src>(statements: Vec<Spanned<Stmt<'src>>>) -> Spanned<Stmt<'src>> {
    spanned(Stmt::Block(statements))
}

pub fn assign<'src>(name: Symbol<'src>, value: Spanned<Expr<'src>>) -> Spanned<Stmt<'src>> {
    spanned(Stmt::Assign(spanned(name), boxed(value)))
}

pub fn array_assign<'src>(
    name: Symbol<'src>,
    index: Spanned<Expr<'src>>,
    value: Spanned<Expr<'src>>,
) -> Spanned<Stmt<'src>> {
    spanned(Stmt::ArrayAssign(spanned(name), boxed(index), boxed(value)))
}

pub fn if_else<'src>(
    cond: Spanned<Expr<'src>>,
    then: Spanned<Stmt<'src>>,
    otherwise: Spanned<Stmt<'src>>,
) -> Spanned<Stmt<'src>> {
    spanned(Stmt::If(boxed(cond), Box::new(then), Box::new(otherwise)))
}

pub fn while_loop<'src>(
    cond: Spanned<Expr<'src>>,
    body: Spanned<Stmt<'src>>,
) -> Spanned<Stmt<'src>> {
    spanned(Stmt::While(boxed(cond), Box::new(body)))
}

pub fn print<'src>(value: Spanned<Expr<'src>>) -> Spanned<Stmt<'src>> {
    spanned(Stmt::Print(boxed(value)))
}

// Expressions

pub fn binary<'src>(
    op: BinaryOp,
    lhs: Spanned<Expr<'src>>,
    rhs: Spanned<Expr<'src>>,
) -> Spanned<Expr<'src>> {
    spanned(Expr::Binary(op, boxed(lhs), boxed(rhs)))
}

pub fn and<'src>(lhs: Spanned<Expr<'src>>, rhs: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    binary(BinaryOp::And, lhs, rhs)
}

pub fn less<'src>(lhs: Spanned<Expr<'src>>, rhs: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    binary(BinaryOp::Less, lhs, rhs)
}

pub fn add<'src>(lhs: Spanned<Expr<'src>>, rhs: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    binary(BinaryOp::Add, lhs, rhs)
}

pub fn sub<'src>(lhs: Spanned<Expr<'src>>, rhs: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    binary(BinaryOp::Sub, lhs, rhs)
}

pub fn mul<'src>(lhs: Spanned<Expr<'src>>, rhs: Spanned<Expr<'src>>) -> Spanned<Expr<'src>> {
    binary(BinaryOp::Mul, lhs, rhs)
}

pub fn not(operand: Spanned<Expr<'_>>) -> Spanned<Expr<'_>> {
    spanned(Expr::Not(boxed(operand)))
}

pub fn lookup<'src>(
    array: Spanned<Expr<'src>>,
    index: Spanned<Expr<'src>>,
) -> Spanned<Expr<'src>> {
    spanned(Expr::ArrayLookup(boxed(array), boxed(index)))
}

pub fn length(array: Spanned<Expr<'_>>) -> Spanned<Expr<'_>> {
    spanned(Expr::ArrayLength(boxed(array)))
}

pub fn call<'src>(
    receiver: Spanned<Expr<'src>>,
    name: Symbol<'src>,
    args: Vec<Spanned<Expr<'src>>>,
) -> Spanned<Expr<'src>> {
    spanned(Expr::MessageSend(boxed(receiver), spanned(name), args))
}

pub fn int(value: i32) -> Spanned<Expr<'static>> {
    spanned(Expr::IntLiteral(value))
}

pub fn tru() -> Spanned<Expr<'static>> {
    spanned(Expr::True)
}

pub fn fals() -> Spanned<Expr<'static>> {
    spanned(Expr::False)
}

pub fn ident(name: Symbol<'_>) -> Spanned<Expr<'_>> {
    spanned(Expr::Identifier(name))
}

pub fn this() -> Spanned<Expr<'static>> {
    spanned(Expr::This)
}

pub fn new_int_array(size: Spanned<Expr<'_>>) -> Spanned<Expr<'_>> {
    spanned(Expr::NewIntArray(boxed(size)))
}

pub fn new_boolean_array(size: Spanned<Expr<'_>>) -> Spanned<Expr<'_>> {
    spanned(Expr::NewBooleanArray(boxed(size)))
}

pub fn new_object(class: Symbol<'_>) -> Spanned<Expr<'_>> {
    spanned(Expr::NewObject(spanned(class)))
}

pub fn bracket(inner: Spanned<Expr<'_>>) -> Spanned<Expr<'_>> {
    spanned(Expr::Bracket(boxed(inner)))
}
