use crate::type_system::*;
use ast::{ClassDeclaration, Expr, MethodDeclaration, Spanned};
use std::collections::HashMap;
use strtab::Symbol;
use utils::ref_eq::RefEq;

/// What a name in a method body resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    /// Index into the locals of the enclosing method (parameters first).
    Local(usize),
    Field(FieldRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefInfo {
    Var(VarRef),
    /// The statically resolved callee of a message send.
    Method(MethodRef),
    /// The class instantiated by `new C()`.
    Class(ClassId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprInfo<'src> {
    pub ty: CheckedType<'src>,
    pub ref_info: Option<RefInfo>,
}

impl<'src> ExprInfo<'src> {
    pub fn new(ty: CheckedType<'src>, ref_info: RefInfo) -> Self {
        ExprInfo {
            ty,
            ref_info: Some(ref_info),
        }
    }
}

impl<'src> From<CheckedType<'src>> for ExprInfo<'src> {
    fn from(ty: CheckedType<'src>) -> ExprInfo<'src> {
        ExprInfo { ty, ref_info: None }
    }
}

/// Results of semantic analysis attached to syntax tree nodes by identity.
#[derive(Default)]
pub struct TypeAnalysis<'src, 'ast> {
    class_ids: HashMap<RefEq<&'ast Spanned<ClassDeclaration<'src>>>, ClassId>,
    method_refs: HashMap<RefEq<&'ast Spanned<MethodDeclaration<'src>>>, MethodRef>,
    expr_info: HashMap<RefEq<&'ast Spanned<Expr<'src>>>, ExprInfo<'src>>,
    targets: HashMap<RefEq<&'ast Spanned<Symbol<'src>>>, VarRef>,
}

impl<'src, 'ast> TypeAnalysis<'src, 'ast> {
    pub fn new() -> TypeAnalysis<'src, 'ast> {
        TypeAnalysis::default()
    }

    pub fn expr_info(&self, expr: &'ast Spanned<Expr<'src>>) -> Option<&ExprInfo<'src>> {
        self.expr_info.get(&RefEq(expr))
    }

    pub fn set_expr_info(&mut self, expr: &'ast Spanned<Expr<'src>>, expr_info: ExprInfo<'src>) {
        self.expr_info.insert(RefEq(expr), expr_info);
    }

    /// Resolution of the name on the left-hand side of an assignment.
    pub fn target(&self, name: &'ast Spanned<Symbol<'src>>) -> Option<VarRef> {
        self.targets.get(&RefEq(name)).cloned()
    }

    pub fn set_target(&mut self, name: &'ast Spanned<Symbol<'src>>, var: VarRef) {
        self.targets.insert(RefEq(name), var);
    }

    pub fn decl_set_class_id(
        &mut self,
        class_decl: &'ast Spanned<ClassDeclaration<'src>>,
        id: ClassId,
    ) {
        self.class_ids.insert(RefEq(class_decl), id);
    }

    pub fn decl_get_class_id(
        &self,
        class_decl: &'ast Spanned<ClassDeclaration<'src>>,
    ) -> Option<ClassId> {
        self.class_ids.get(&RefEq(class_decl)).cloned()
    }

    pub fn decl_set_method_ref(
        &mut self,
        method_decl: &'ast Spanned<MethodDeclaration<'src>>,
        method: MethodRef,
    ) {
        self.method_refs.insert(RefEq(method_decl), method);
    }

    pub fn decl_get_method_ref(
        &self,
        method_decl: &'ast Spanned<MethodDeclaration<'src>>,
    ) -> Option<MethodRef> {
        self.method_refs.get(&RefEq(method_decl)).cloned()
    }
}
