use crate::{
    checker::SemanticContext,
    semantic_error::{did_you_mean, SemanticError},
    type_analysis::*,
    type_system::*,
};
use ast::{BinaryOp, Expr, Program, Spanned, Stmt};
use strtab::Symbol;

#[derive(Debug)]
pub struct CouldNotDetermineType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrentMethod {
    Main,
    Method(MethodRef),
}

/// Statement and expression pass over the method bodies.
///
/// Bodies are visited in declaration order and initialization is tracked in
/// plain program order: an assignment anywhere before a read (including in
/// an earlier branch of an `if`) makes the read valid.
pub struct MethodBodyTypeChecker<'ctx, 'src, 'ast, 'm> {
    context: &'ctx SemanticContext<'ctx>,
    model: &'m mut ClassModel<'src>,
    type_analysis: &'m mut TypeAnalysis<'src, 'ast>,
    current_class: ClassId,
    current_method: CurrentMethod,
}

impl<'ctx, 'src, 'ast, 'm> MethodBodyTypeChecker<'ctx, 'src, 'ast, 'm> {
    pub fn check_program(
        program: &'ast Program<'src>,
        model: &'m mut ClassModel<'src>,
        type_analysis: &'m mut TypeAnalysis<'src, 'ast>,
        context: &'ctx SemanticContext<'ctx>,
    ) {
        let mut checker = MethodBodyTypeChecker {
            context,
            model,
            type_analysis,
            current_class: ClassId::main(),
            current_method: CurrentMethod::Main,
        };

        log::debug!("checking {}.main", program.main_class.name.data);
        checker.check_stmts(&program.main_class.statements);

        for class_decl in &program.classes {
            let class_id = match checker.type_analysis.decl_get_class_id(class_decl) {
                Some(id) => id,
                None => continue,
            };
            checker.current_class = class_id;

            for method_decl in &class_decl.methods {
                if checker.context.limit_reached() {
                    return;
                }
                let method_ref = match checker.type_analysis.decl_get_method_ref(method_decl) {
                    Some(method_ref) => method_ref,
                    None => continue,
                };
                checker.current_method = CurrentMethod::Method(method_ref);
                log::debug!(
                    "checking {}.{}",
                    class_decl.name.data,
                    method_decl.name.data
                );

                checker.check_stmts(&method_decl.statements);
                if !checker.context.limit_reached() {
                    checker.check_return(&method_decl.return_expr, method_ref);
                }
            }
        }
    }

    fn check_stmts(&mut self, stmts: &'ast [Spanned<Stmt<'src>>]) {
        for stmt in stmts {
            if self.context.limit_reached() {
                return;
            }
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &'ast Spanned<Stmt<'src>>) {
        match &stmt.data {
            Stmt::Block(stmts) => self.check_stmts(stmts),
            Stmt::Assign(target, value) => {
                let value_ty = self.type_expr(value).ok().map(|info| info.ty);
                if let Ok((var, target_ty)) = self.resolve_name(target.data, stmt.line) {
                    self.type_analysis.set_target(target, var);
                    if let Some(value_ty) = value_ty {
                        if !self.model.is_assignable(&target_ty, &value_ty) {
                            self.context.report_error(
                                stmt.line,
                                SemanticError::IncompatibleTypes {
                                    expected: target_ty.to_string(),
                                    actual: value_ty.to_string(),
                                },
                            );
                        }
                    }
                    self.mark_initialized(var);
                }
            }
            Stmt::ArrayAssign(target, index, value) => {
                let _ = self.check_array_assign(stmt.line, target, index, value);
            }
            Stmt::If(cond, then, otherwise) => {
                self.check_condition(stmt.line, cond);
                self.check_stmt(then);
                self.check_stmt(otherwise);
            }
            Stmt::While(cond, body) => {
                self.check_condition(stmt.line, cond);
                self.check_stmt(body);
            }
            Stmt::Print(value) => {
                let _ = self.expect_type(stmt.line, value, CheckedType::Int, |ty| {
                    SemanticError::PrintRequiresInt { ty }
                });
            }
        }
    }

    fn check_array_assign(
        &mut self,
        line: usize,
        target: &'ast Spanned<Symbol<'src>>,
        index: &'ast Spanned<Expr<'src>>,
        value: &'ast Spanned<Expr<'src>>,
    ) -> Result<(), CouldNotDetermineType> {
        let (var, array_ty) = self.resolve_name(target.data, line)?;
        self.type_analysis.set_target(target, var);
        // the array itself is read, not written
        self.check_initialized(var, target.data, line);

        let element_ty = match array_ty.element_type() {
            Some(ty) => ty,
            None => {
                self.context.report_error(
                    line,
                    SemanticError::NotAnArray {
                        ty: array_ty.to_string(),
                    },
                );
                return Err(CouldNotDetermineType);
            }
        };

        self.expect_type(line, index, CheckedType::Int, |ty| {
            SemanticError::IndexMustBeInt { ty }
        })?;
        self.expect_type(line, value, element_ty, |actual| {
            SemanticError::IncompatibleTypes {
                expected: element_ty.to_string(),
                actual,
            }
        })
    }

    fn check_condition(&mut self, line: usize, cond: &'ast Spanned<Expr<'src>>) {
        let _ = self.expect_type(line, cond, CheckedType::Boolean, |ty| {
            SemanticError::ConditionMustBeBoolean { ty }
        });
    }

    fn check_return(&mut self, expr: &'ast Spanned<Expr<'src>>, method_ref: MethodRef) {
        let (name, return_ty) = {
            let method = self.model.method(method_ref);
            (method.name, method.return_ty)
        };
        if let Ok(info) = self.type_expr(expr) {
            if !self.model.is_assignable(&return_ty, &info.ty) {
                self.context.report_error(
                    expr.line,
                    SemanticError::ReturnTypeMismatch {
                        method: name.to_string(),
                        expected: return_ty.to_string(),
                        actual: info.ty.to_string(),
                    },
                );
            }
        }
    }

    /// Types `expr` and reports `error` at `line` if it is not exactly
    /// `expected`.
    fn expect_type<F>(
        &mut self,
        line: usize,
        expr: &'ast Spanned<Expr<'src>>,
        expected: CheckedType<'src>,
        error: F,
    ) -> Result<(), CouldNotDetermineType>
    where
        F: FnOnce(String) -> SemanticError,
    {
        let actual = self.type_expr(expr)?.ty;
        if actual == expected {
            Ok(())
        } else {
            self.context.report_error(line, error(actual.to_string()));
            Err(CouldNotDetermineType)
        }
    }

    fn type_expr(
        &mut self,
        expr: &'ast Spanned<Expr<'src>>,
    ) -> Result<ExprInfo<'src>, CouldNotDetermineType> {
        let info = self.type_expr_internal(expr)?;
        self.type_analysis.set_expr_info(expr, info);
        Ok(info)
    }

    fn type_expr_internal(
        &mut self,
        expr: &'ast Spanned<Expr<'src>>,
    ) -> Result<ExprInfo<'src>, CouldNotDetermineType> {
        match &expr.data {
            Expr::Binary(op, lhs, rhs) => self.check_binary_expr(expr.line, *op, lhs, rhs),
            Expr::Not(operand) => {
                let ty = self.type_expr(operand)?.ty;
                if ty != CheckedType::Boolean {
                    self.context.report_error(
                        expr.line,
                        SemanticError::InvalidNotOperand { ty: ty.to_string() },
                    );
                    return Err(CouldNotDetermineType);
                }
                Ok(CheckedType::Boolean.into())
            }
            Expr::ArrayLookup(array, index) => {
                let element_ty = self.array_element_type(expr.line, array)?;
                self.expect_type(expr.line, index, CheckedType::Int, |ty| {
                    SemanticError::IndexMustBeInt { ty }
                })?;
                Ok(element_ty.into())
            }
            Expr::ArrayLength(array) => {
                self.array_element_type(expr.line, array)?;
                Ok(CheckedType::Int.into())
            }
            Expr::MessageSend(receiver, name, args) => {
                self.check_method_invocation(expr.line, receiver, name, args)
            }
            Expr::IntLiteral(_) => Ok(CheckedType::Int.into()),
            Expr::True | Expr::False => Ok(CheckedType::Boolean.into()),
            Expr::Identifier(name) => {
                let (var, ty) = self.resolve_name(*name, expr.line)?;
                self.check_initialized(var, *name, expr.line);
                Ok(ExprInfo::new(ty, RefInfo::Var(var)))
            }
            Expr::This => match self.current_method {
                CurrentMethod::Main => {
                    self.context
                        .report_error(expr.line, SemanticError::ThisInMainMethod);
                    Err(CouldNotDetermineType)
                }
                CurrentMethod::Method(_) => {
                    Ok(CheckedType::Class(self.model.class(self.current_class).name).into())
                }
            },
            Expr::NewIntArray(size) => {
                self.expect_type(expr.line, size, CheckedType::Int, |ty| {
                    SemanticError::ArraySizeMustBeInt { ty }
                })?;
                Ok(CheckedType::IntArray.into())
            }
            Expr::NewBooleanArray(size) => {
                self.expect_type(expr.line, size, CheckedType::Int, |ty| {
                    SemanticError::ArraySizeMustBeInt { ty }
                })?;
                Ok(CheckedType::BooleanArray.into())
            }
            Expr::NewObject(name) => {
                let class_id = match self.model.lookup(name.data) {
                    Some(id) => id,
                    None => {
                        let suggestion = strtab::closest_match(
                            name.data,
                            self.model.classes().map(|(_, class)| class.name),
                        );
                        self.context.report_error(
                            expr.line,
                            SemanticError::UnknownType {
                                name: name.data.to_string(),
                                hint: did_you_mean(suggestion),
                            },
                        );
                        return Err(CouldNotDetermineType);
                    }
                };
                if self.model.class(class_id).is_main() {
                    self.context.report_error(
                        expr.line,
                        SemanticError::CannotInstantiateMainClass {
                            name: name.data.to_string(),
                        },
                    );
                    return Err(CouldNotDetermineType);
                }
                Ok(ExprInfo::new(
                    CheckedType::Class(name.data),
                    RefInfo::Class(class_id),
                ))
            }
            Expr::Bracket(inner) => self.type_expr(inner),
        }
    }

    fn check_binary_expr(
        &mut self,
        line: usize,
        op: BinaryOp,
        lhs: &'ast Spanned<Expr<'src>>,
        rhs: &'ast Spanned<Expr<'src>>,
    ) -> Result<ExprInfo<'src>, CouldNotDetermineType> {
        // type both sides before giving up so both report their errors
        let lhs_info = self.type_expr(lhs);
        let rhs_info = self.type_expr(rhs);
        let lhs_ty = lhs_info?.ty;
        let rhs_ty = rhs_info?.ty;

        let (operand_ty, result_ty) = match op {
            BinaryOp::And => (CheckedType::Boolean, CheckedType::Boolean),
            BinaryOp::Less => (CheckedType::Int, CheckedType::Boolean),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => (CheckedType::Int, CheckedType::Int),
        };

        if lhs_ty != operand_ty || rhs_ty != operand_ty {
            self.context.report_error(
                line,
                SemanticError::InvalidOperands {
                    op: op.to_string(),
                    lhs: lhs_ty.to_string(),
                    rhs: rhs_ty.to_string(),
                },
            );
            return Err(CouldNotDetermineType);
        }

        Ok(result_ty.into())
    }

    fn array_element_type(
        &mut self,
        line: usize,
        array: &'ast Spanned<Expr<'src>>,
    ) -> Result<CheckedType<'src>, CouldNotDetermineType> {
        let ty = self.type_expr(array)?.ty;
        ty.element_type().ok_or_else(|| {
            self.context
                .report_error(line, SemanticError::NotAnArray { ty: ty.to_string() });
            CouldNotDetermineType
        })
    }

    fn check_method_invocation(
        &mut self,
        line: usize,
        receiver: &'ast Spanned<Expr<'src>>,
        name: &'ast Spanned<Symbol<'src>>,
        args: &'ast [Spanned<Expr<'src>>],
    ) -> Result<ExprInfo<'src>, CouldNotDetermineType> {
        let receiver_ty = self.type_expr(receiver)?.ty;
        let class_id = match receiver_ty.class_name().and_then(|n| self.model.lookup(n)) {
            Some(id) => id,
            None => {
                self.context.report_error(
                    line,
                    SemanticError::CannotDereference {
                        ty: receiver_ty.to_string(),
                    },
                );
                return Err(CouldNotDetermineType);
            }
        };

        let method_ref = match self.model.find_method(class_id, name.data) {
            Some(method_ref) => method_ref,
            None => {
                let suggestion = strtab::closest_match(
                    name.data,
                    self.model.visible_methods(class_id).map(|method| method.name),
                );
                self.context.report_error(
                    line,
                    SemanticError::MethodDoesNotExistOnType {
                        method: name.data.to_string(),
                        ty: receiver_ty.to_string(),
                        hint: did_you_mean(suggestion),
                    },
                );
                return Err(CouldNotDetermineType);
            }
        };

        let (param_types, return_ty) = {
            let method = self.model.method(method_ref);
            let param_types: Vec<CheckedType<'src>> = method.param_types().cloned().collect();
            (param_types, method.return_ty)
        };

        if param_types.len() != args.len() {
            self.context.report_error(
                line,
                SemanticError::ArgCountMismatch {
                    method: name.data.to_string(),
                    expected: param_types.len(),
                    actual: args.len(),
                },
            );
            return Err(CouldNotDetermineType);
        }

        let mut all_args_typed = true;
        for (position, (arg, param_ty)) in args.iter().zip(param_types.iter()).enumerate() {
            match self.type_expr(arg) {
                Ok(info) if self.model.is_assignable(param_ty, &info.ty) => {}
                Ok(info) => {
                    self.context.report_error(
                        line,
                        SemanticError::ArgTypeMismatch {
                            method: name.data.to_string(),
                            position: position + 1,
                            expected: param_ty.to_string(),
                            actual: info.ty.to_string(),
                        },
                    );
                    all_args_typed = false;
                }
                Err(CouldNotDetermineType) => all_args_typed = false,
            }
        }

        if all_args_typed {
            Ok(ExprInfo::new(return_ty, RefInfo::Method(method_ref)))
        } else {
            Err(CouldNotDetermineType)
        }
    }

    fn locals(&self) -> &[VarDef<'src>] {
        match self.current_method {
            CurrentMethod::Main => self
                .model
                .class(self.current_class)
                .main_method
                .as_ref()
                .map(|main| &main.locals[..])
                .unwrap_or(&[]),
            CurrentMethod::Method(method_ref) => &self.model.method(method_ref).locals,
        }
    }

    fn local_mut(&mut self, index: usize) -> Option<&mut VarDef<'src>> {
        match self.current_method {
            CurrentMethod::Main => self
                .model
                .class_mut(self.current_class)
                .main_method
                .as_mut()
                .and_then(|main| main.locals.get_mut(index)),
            CurrentMethod::Method(method_ref) => {
                self.model.method_mut(method_ref).locals.get_mut(index)
            }
        }
    }

    /// Resolves a bare name: local variable or parameter first, then an own
    /// field, then the field of the nearest ancestor.
    fn resolve_name(
        &self,
        name: Symbol<'src>,
        line: usize,
    ) -> Result<(VarRef, CheckedType<'src>), CouldNotDetermineType> {
        if let Some(index) = self.locals().iter().position(|local| local.name == name) {
            return Ok((VarRef::Local(index), self.locals()[index].ty));
        }

        if let CurrentMethod::Main = self.current_method {
            let main_param = self
                .model
                .class(self.current_class)
                .main_method
                .as_ref()
                .map(|main| main.param_name);
            if main_param == Some(name) {
                self.context.report_error(
                    line,
                    SemanticError::MainMethodParamUsed {
                        name: name.to_string(),
                    },
                );
                return Err(CouldNotDetermineType);
            }
        }

        if let Some(field_ref) = self.model.find_field(self.current_class, name) {
            return Ok((VarRef::Field(field_ref), self.model.field(field_ref).ty));
        }

        let visible = self
            .locals()
            .iter()
            .map(|local| local.name)
            .chain(
                self.model
                    .visible_fields(self.current_class)
                    .map(|field| field.name),
            );
        let suggestion = strtab::closest_match(name, visible);
        self.context.report_error(
            line,
            SemanticError::UnknownIdentifier {
                name: name.to_string(),
                hint: did_you_mean(suggestion),
            },
        );
        Err(CouldNotDetermineType)
    }

    fn is_initialized(&self, var: VarRef) -> bool {
        match var {
            VarRef::Local(index) => self
                .locals()
                .get(index)
                .map_or(false, |local| local.initialized),
            VarRef::Field(field_ref) => self.model.field(field_ref).initialized,
        }
    }

    fn check_initialized(&self, var: VarRef, name: Symbol<'src>, line: usize) {
        if !self.is_initialized(var) {
            self.context.report_error(
                line,
                SemanticError::Uninitialized {
                    name: name.to_string(),
                },
            );
        }
    }

    fn mark_initialized(&mut self, var: VarRef) {
        match var {
            VarRef::Local(index) => {
                if let Some(local) = self.local_mut(index) {
                    local.initialized = true;
                }
            }
            VarRef::Field(field_ref) => self.model.field_mut(field_ref).initialized = true,
        }
    }
}
