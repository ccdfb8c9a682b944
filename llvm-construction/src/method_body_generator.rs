use crate::{
    layout::{Layout, HEADER_SIZE},
    runtime::RuntimeFunction,
    type_translation::{llvm_type, method_signature},
    CodegenError,
};
use ast::{BinaryOp, Expr, ExprDiscriminants, Spanned, Stmt};
use itertools::Itertools;
use std::{fmt, io::Write};
use strtab::Symbol;
use type_checking::{
    CheckedType, ClassId, ClassModel, ExprInfo, MethodDef, RefInfo, TypeAnalysis, VarDef, VarRef,
};

/// A numbered temporary, `%_N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "%_{}", _0)]
pub struct Register(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Operand {
    #[display(fmt = "{}", _0)]
    Register(Register),
    #[display(fmt = "{}", _0)]
    Int(i32),
    #[display(fmt = "{}", _0)]
    Bool(bool),
    #[display(fmt = "%this")]
    This,
}

impl From<Register> for Operand {
    fn from(register: Register) -> Operand {
        Operand::Register(register)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "{}_{}", name, index)]
struct Label {
    name: &'static str,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
enum Construct {
    If,
    Loop,
    BoundsCheck,
    ArraySize,
    And,
}

/// Label numbering for the whole module, so every label is unique even
/// across functions.
#[derive(Debug, Default)]
pub struct LabelCounters {
    ifs: usize,
    loops: usize,
    bounds_checks: usize,
    array_sizes: usize,
    ands: usize,
}

impl LabelCounters {
    fn next(&mut self, construct: Construct) -> usize {
        let counter = match construct {
            Construct::If => &mut self.ifs,
            Construct::Loop => &mut self.loops,
            Construct::BoundsCheck => &mut self.bounds_checks,
            Construct::ArraySize => &mut self.array_sizes,
            Construct::And => &mut self.ands,
        };
        let index = *counter;
        *counter += 1;
        index
    }
}

type GenResult<T> = Result<T, failure::Error>;

/// Emits the IR of a single function. Every local variable and parameter
/// lives in a stack slot, fields are addressed relative to `%this`.
pub struct MethodBodyGenerator<'ir, 'src, 'ast> {
    model: &'ir ClassModel<'src>,
    layout: &'ir Layout<'src>,
    type_analysis: &'ir TypeAnalysis<'src, 'ast>,
    labels: &'ir mut LabelCounters,
    out: &'ir mut dyn Write,
    /// `Class_method`, the prefix of all stack slot names.
    slot_prefix: String,
    locals: &'ir [VarDef<'src>],
    next_register: usize,
    current_block: String,
}

impl<'ir, 'src, 'ast> MethodBodyGenerator<'ir, 'src, 'ast> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        model: &'ir ClassModel<'src>,
        layout: &'ir Layout<'src>,
        type_analysis: &'ir TypeAnalysis<'src, 'ast>,
        labels: &'ir mut LabelCounters,
        out: &'ir mut dyn Write,
        class: Symbol<'src>,
        method_name: &str,
        locals: &'ir [VarDef<'src>],
    ) -> Self {
        MethodBodyGenerator {
            model,
            layout,
            type_analysis,
            labels,
            out,
            slot_prefix: format!("{}_{}", class, method_name),
            locals,
            next_register: 0,
            current_block: "entry".to_owned(),
        }
    }

    /// `public static void main` becomes the `main` function of the module.
    pub fn gen_main(mut self, statements: &'ast [Spanned<Stmt<'src>>]) -> GenResult<()> {
        writeln!(self.out, "define i32 @main() {{")?;
        writeln!(self.out, "entry:")?;
        self.gen_stack_slots(0)?;

        for stmt in statements {
            self.gen_stmt(stmt)?;
        }

        self.emit("ret i32 0")?;
        writeln!(self.out, "}}\n")?;
        Ok(())
    }

    pub fn gen_method(
        mut self,
        method: &MethodDef<'src>,
        statements: &'ast [Spanned<Stmt<'src>>],
        return_expr: &'ast Spanned<Expr<'src>>,
    ) -> GenResult<()> {
        let owner = self.model.class(method.owner).name;
        let params = method
            .params()
            .iter()
            .map(|param| format!("{} %.{}", llvm_type(&param.ty), param.name));
        writeln!(
            self.out,
            "define {} @{}.{}({}) {{",
            llvm_type(&method.return_ty),
            owner,
            method.name,
            std::iter::once("i8* %this".to_owned()).chain(params).join(", ")
        )?;
        writeln!(self.out, "entry:")?;
        self.gen_stack_slots(method.param_count)?;

        for stmt in statements {
            self.gen_stmt(stmt)?;
        }

        let value = self.gen_expr(return_expr)?;
        self.emit(format!("ret {} {}", llvm_type(&method.return_ty), value))?;
        writeln!(self.out, "}}\n")?;
        Ok(())
    }

    /// Allocates a slot for every local and copies the first `param_count`
    /// locals, the parameters, into theirs.
    fn gen_stack_slots(&mut self, param_count: usize) -> GenResult<()> {
        let locals = self.locals;
        for local in locals {
            self.emit(format!("{} = alloca {}", self.slot_name(local), llvm_type(&local.ty)))?;
        }
        for param in &locals[..param_count] {
            let ty = llvm_type(&param.ty);
            self.emit(format!(
                "store {} %.{}, {}* {}",
                ty,
                param.name,
                ty,
                self.slot_name(param)
            ))?;
        }
        Ok(())
    }

    fn slot_name(&self, local: &VarDef<'src>) -> String {
        format!("%{}_{}", self.slot_prefix, local.name)
    }

    fn emit(&mut self, instruction: impl fmt::Display) -> GenResult<()> {
        writeln!(self.out, "\t{}", instruction)?;
        Ok(())
    }

    /// Emits `instruction` into a fresh register.
    fn emit_value(&mut self, instruction: impl fmt::Display) -> GenResult<Register> {
        let register = Register(self.next_register);
        self.next_register += 1;
        writeln!(self.out, "\t{} = {}", register, instruction)?;
        Ok(register)
    }

    fn start_block(&mut self, label: Label) -> GenResult<()> {
        writeln!(self.out, "{}:", label)?;
        self.current_block = label.to_string();
        Ok(())
    }

    fn info(&self, expr: &'ast Spanned<Expr<'src>>) -> Result<ExprInfo<'src>, CodegenError> {
        self.type_analysis
            .expr_info(expr)
            .cloned()
            .ok_or_else(|| CodegenError::MissingAnalysis {
                kind: ExprDiscriminants::from(&expr.data).to_string(),
                line: expr.line,
            })
    }

    fn unresolved(expr: &Spanned<Expr<'_>>) -> CodegenError {
        CodegenError::MissingResolution {
            kind: ExprDiscriminants::from(&expr.data).to_string(),
            line: expr.line,
        }
    }

    fn gen_stmt(&mut self, stmt: &'ast Spanned<Stmt<'src>>) -> GenResult<()> {
        match &stmt.data {
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.gen_stmt(stmt)?;
                }
            }
            Stmt::Assign(target, value) => {
                let value = self.gen_expr(value)?;
                let var = self.target(target)?;
                self.store_var(var, value)?;
            }
            Stmt::ArrayAssign(target, index, value) => {
                let var = self.target(target)?;
                let array_ty = self.var_type(var);
                let array = self.load_var(var)?;
                let index = self.gen_expr(index)?;
                let value = self.gen_expr(value)?;
                let element = self.element_pointer(array, array_ty, index)?;
                self.store_element(array_ty, element, value)?;
            }
            Stmt::If(cond, then, otherwise) => {
                let cond = self.gen_expr(cond)?;
                let index = self.labels.next(Construct::If);
                let then_label = Label { name: "if_then", index };
                let else_label = Label { name: "if_else", index };
                let end_label = Label { name: "if_end", index };

                self.emit(format!(
                    "br i1 {}, label %{}, label %{}",
                    cond, then_label, else_label
                ))?;
                self.start_block(then_label)?;
                self.gen_stmt(then)?;
                self.emit(format!("br label %{}", end_label))?;
                self.start_block(else_label)?;
                self.gen_stmt(otherwise)?;
                self.emit(format!("br label %{}", end_label))?;
                self.start_block(end_label)?;
            }
            Stmt::While(cond, body) => {
                let index = self.labels.next(Construct::Loop);
                let cond_label = Label { name: "loop_cond", index };
                let body_label = Label { name: "loop_body", index };
                let end_label = Label { name: "loop_end", index };

                self.emit(format!("br label %{}", cond_label))?;
                self.start_block(cond_label)?;
                let cond = self.gen_expr(cond)?;
                self.emit(format!(
                    "br i1 {}, label %{}, label %{}",
                    cond, body_label, end_label
                ))?;
                self.start_block(body_label)?;
                self.gen_stmt(body)?;
                self.emit(format!("br label %{}", cond_label))?;
                self.start_block(end_label)?;
            }
            Stmt::Print(value) => {
                let value = self.gen_expr(value)?;
                self.emit(format!(
                    "call void (i32) @{}(i32 {})",
                    RuntimeFunction::PrintInt,
                    value
                ))?;
            }
        }
        Ok(())
    }

    fn target(&self, target: &'ast Spanned<Symbol<'src>>) -> Result<VarRef, CodegenError> {
        self.type_analysis
            .target(target)
            .ok_or_else(|| CodegenError::MissingTarget {
                name: target.data.to_string(),
                line: target.line,
            })
    }

    fn var_type(&self, var: VarRef) -> CheckedType<'src> {
        match var {
            VarRef::Local(index) => self.locals[index].ty,
            VarRef::Field(field) => self.model.field(field).ty,
        }
    }

    /// A typed pointer to the storage of `var`: its stack slot, or the field
    /// at `this + 8 + offset`.
    fn var_pointer(&mut self, var: VarRef) -> GenResult<String> {
        match var {
            VarRef::Local(index) => Ok(self.slot_name(&self.locals[index])),
            VarRef::Field(field_ref) => {
                let model = self.model;
                let field = model.field(field_ref);
                let offset = field.offset.ok_or_else(|| CodegenError::MissingFieldOffset {
                    name: field.name.to_string(),
                })?;
                let ty = llvm_type(&field.ty);
                let address = self.emit_value(format!(
                    "getelementptr i8, i8* %this, i32 {}",
                    HEADER_SIZE + offset
                ))?;
                let typed = self.emit_value(format!("bitcast i8* {} to {}*", address, ty))?;
                Ok(typed.to_string())
            }
        }
    }

    fn load_var(&mut self, var: VarRef) -> GenResult<Operand> {
        let ty = llvm_type(&self.var_type(var));
        let pointer = self.var_pointer(var)?;
        let value = self.emit_value(format!("load {}, {}* {}", ty, ty, pointer))?;
        Ok(value.into())
    }

    fn store_var(&mut self, var: VarRef, value: Operand) -> GenResult<()> {
        let ty = llvm_type(&self.var_type(var));
        let pointer = self.var_pointer(var)?;
        self.emit(format!("store {} {}, {}* {}", ty, value, ty, pointer))
    }

    fn gen_expr(&mut self, expr: &'ast Spanned<Expr<'src>>) -> GenResult<Operand> {
        let value = match &expr.data {
            Expr::Binary(BinaryOp::And, lhs, rhs) => self.gen_and(lhs, rhs)?.into(),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.gen_expr(lhs)?;
                let rhs = self.gen_expr(rhs)?;
                let instruction = match op {
                    BinaryOp::Add => "add i32",
                    BinaryOp::Sub => "sub i32",
                    BinaryOp::Mul => "mul i32",
                    BinaryOp::Less => "icmp slt i32",
                    BinaryOp::And => unreachable!("lowered with short circuit"),
                };
                self.emit_value(format!("{} {}, {}", instruction, lhs, rhs))?
                    .into()
            }
            Expr::Not(operand) => {
                let operand = self.gen_expr(operand)?;
                self.emit_value(format!("xor i1 1, {}", operand))?.into()
            }
            Expr::ArrayLookup(array, index) => {
                let array_ty = self.info(array)?.ty;
                let array = self.gen_expr(array)?;
                let index = self.gen_expr(index)?;
                let element = self.element_pointer(array, array_ty, index)?;
                self.load_element(array_ty, element)?.into()
            }
            Expr::ArrayLength(array) => {
                let array_ty = self.info(array)?.ty;
                let array = self.gen_expr(array)?;
                self.array_length(array, array_ty)?.into()
            }
            Expr::MessageSend(receiver, _, args) => {
                self.gen_method_invocation(expr, receiver, args)?.into()
            }
            Expr::IntLiteral(value) => Operand::Int(*value),
            Expr::True => Operand::Bool(true),
            Expr::False => Operand::Bool(false),
            Expr::Identifier(_) => match self.info(expr)?.ref_info {
                Some(RefInfo::Var(var)) => self.load_var(var)?,
                _ => return Err(Self::unresolved(expr).into()),
            },
            Expr::This => Operand::This,
            Expr::NewIntArray(size) => {
                let size = self.gen_expr(size)?;
                self.gen_new_array(size, CheckedType::IntArray)?.into()
            }
            Expr::NewBooleanArray(size) => {
                let size = self.gen_expr(size)?;
                self.gen_new_array(size, CheckedType::BooleanArray)?.into()
            }
            Expr::NewObject(_) => match self.info(expr)?.ref_info {
                Some(RefInfo::Class(class)) => self.gen_new_object(class)?.into(),
                _ => return Err(Self::unresolved(expr).into()),
            },
            Expr::Bracket(inner) => self.gen_expr(inner)?,
        };
        Ok(value)
    }

    /// `false` if the left operand is, the right operand's value otherwise.
    fn gen_and(
        &mut self,
        lhs: &'ast Spanned<Expr<'src>>,
        rhs: &'ast Spanned<Expr<'src>>,
    ) -> GenResult<Register> {
        let lhs = self.gen_expr(lhs)?;
        let index = self.labels.next(Construct::And);
        let rhs_label = Label { name: "and_rhs", index };
        let end_label = Label { name: "and_end", index };

        let short_circuit_from = self.current_block.clone();
        self.emit(format!(
            "br i1 {}, label %{}, label %{}",
            lhs, rhs_label, end_label
        ))?;

        self.start_block(rhs_label)?;
        let rhs = self.gen_expr(rhs)?;
        let rhs_from = self.current_block.clone();
        self.emit(format!("br label %{}", end_label))?;

        self.start_block(end_label)?;
        self.emit_value(format!(
            "phi i1 [ false, %{} ], [ {}, %{} ]",
            short_circuit_from, rhs, rhs_from
        ))
    }

    fn gen_method_invocation(
        &mut self,
        expr: &'ast Spanned<Expr<'src>>,
        receiver: &'ast Spanned<Expr<'src>>,
        args: &'ast [Spanned<Expr<'src>>],
    ) -> GenResult<Register> {
        let method_ref = match self.info(expr)?.ref_info {
            Some(RefInfo::Method(method_ref)) => method_ref,
            _ => return Err(Self::unresolved(expr).into()),
        };
        let model = self.model;
        let method = model.method(method_ref);
        let slot = method.slot().ok_or_else(|| CodegenError::MissingSlot {
            name: method.name.to_string(),
        })?;

        let receiver = self.gen_expr(receiver)?;
        let mut call_args = vec![format!("i8* {}", receiver)];
        for (arg, param_ty) in args.iter().zip(method.param_types()) {
            let value = self.gen_expr(arg)?;
            call_args.push(format!("{} {}", llvm_type(param_ty), value));
        }

        let vtable_pointer = self.emit_value(format!("bitcast i8* {} to i8***", receiver))?;
        let vtable = self.emit_value(format!("load i8**, i8*** {}", vtable_pointer))?;
        let slot_pointer =
            self.emit_value(format!("getelementptr i8*, i8** {}, i32 {}", vtable, slot))?;
        let function = self.emit_value(format!("load i8*, i8** {}", slot_pointer))?;
        let typed_function = self.emit_value(format!(
            "bitcast i8* {} to {}*",
            function,
            method_signature(method)
        ))?;

        self.emit_value(format!(
            "call {} {}({})",
            llvm_type(&method.return_ty),
            typed_function,
            call_args.join(", ")
        ))
    }

    /// Allocates the object and installs the vtable pointer in its header.
    fn gen_new_object(&mut self, class: ClassId) -> GenResult<Register> {
        let layouts = self.layout;
        let layout = layouts.class(class);
        let object = self.emit_value(format!(
            "call i8* @{}(i32 1, i32 {})",
            RuntimeFunction::Calloc,
            layout.alloc_size
        ))?;
        let header = self.emit_value(format!("bitcast i8* {} to i8***", object))?;
        let array_type = layout.vtable.array_type();
        let vtable = self.emit_value(format!(
            "getelementptr {}, {}* {}, i32 0, i32 0",
            array_type,
            array_type,
            layout.vtable.global_name()
        ))?;
        self.emit(format!("store i8** {}, i8*** {}", vtable, header))?;
        Ok(object)
    }

    /// `int[]` holds the count in element 0 and the data from element 1 on,
    /// `boolean[]` holds a 4 byte count followed by one byte per element.
    fn gen_new_array(&mut self, size: Operand, array_ty: CheckedType<'src>) -> GenResult<Register> {
        let header_size = 4;
        let data_size = match array_ty {
            CheckedType::IntArray => self.emit_value(format!("mul i32 {}, 4", size))?.into(),
            _ => size,
        };
        let total = self.emit_value(format!("add i32 {}, {}", data_size, header_size))?;
        let valid = self.emit_value(format!("icmp sge i32 {}, {}", total, header_size))?;

        let index = self.labels.next(Construct::ArraySize);
        let ok_label = Label { name: "nsz_ok", index };
        let err_label = Label { name: "nsz_err", index };
        self.emit(format!(
            "br i1 {}, label %{}, label %{}",
            valid, ok_label, err_label
        ))?;
        self.start_block(err_label)?;
        self.emit(format!("call void @{}()", RuntimeFunction::NegativeArraySize))?;
        self.emit("unreachable")?;
        self.start_block(ok_label)?;

        let memory = self.emit_value(format!(
            "call i8* @{}(i32 1, i32 {})",
            RuntimeFunction::Calloc,
            total
        ))?;
        let count = self.emit_value(format!("bitcast i8* {} to i32*", memory))?;
        self.emit(format!("store i32 {}, i32* {}", size, count))?;

        Ok(match array_ty {
            CheckedType::IntArray => count,
            _ => memory,
        })
    }

    fn array_length(&mut self, array: Operand, array_ty: CheckedType<'src>) -> GenResult<Register> {
        let count = match array_ty {
            CheckedType::IntArray => array.to_string(),
            _ => self
                .emit_value(format!("bitcast i8* {} to i32*", array))?
                .to_string(),
        };
        self.emit_value(format!("load i32, i32* {}", count))
    }

    /// Checks `0 <= index < length` and computes the address of the
    /// element, trapping if the index is out of bounds.
    fn element_pointer(
        &mut self,
        array: Operand,
        array_ty: CheckedType<'src>,
        index: Operand,
    ) -> GenResult<Register> {
        let length = self.array_length(array, array_ty)?;
        let not_negative = self.emit_value(format!("icmp sge i32 {}, 0", index))?;
        let below_length = self.emit_value(format!("icmp slt i32 {}, {}", index, length))?;
        let in_bounds =
            self.emit_value(format!("and i1 {}, {}", not_negative, below_length))?;

        let label_index = self.labels.next(Construct::BoundsCheck);
        let ok_label = Label {
            name: "oob_ok",
            index: label_index,
        };
        let err_label = Label {
            name: "oob_err",
            index: label_index,
        };
        self.emit(format!(
            "br i1 {}, label %{}, label %{}",
            in_bounds, ok_label, err_label
        ))?;
        self.start_block(err_label)?;
        self.emit(format!("call void @{}()", RuntimeFunction::ArrayOutOfBounds))?;
        self.emit("unreachable")?;
        self.start_block(ok_label)?;

        match array_ty {
            CheckedType::IntArray => {
                let position = self.emit_value(format!("add i32 {}, 1", index))?;
                self.emit_value(format!(
                    "getelementptr i32, i32* {}, i32 {}",
                    array, position
                ))
            }
            _ => {
                let position = self.emit_value(format!("add i32 {}, 4", index))?;
                self.emit_value(format!("getelementptr i8, i8* {}, i32 {}", array, position))
            }
        }
    }

    fn load_element(&mut self, array_ty: CheckedType<'src>, element: Register) -> GenResult<Register> {
        match array_ty {
            CheckedType::IntArray => self.emit_value(format!("load i32, i32* {}", element)),
            _ => {
                let byte = self.emit_value(format!("load i8, i8* {}", element))?;
                self.emit_value(format!("trunc i8 {} to i1", byte))
            }
        }
    }

    fn store_element(
        &mut self,
        array_ty: CheckedType<'src>,
        element: Register,
        value: Operand,
    ) -> GenResult<()> {
        match array_ty {
            CheckedType::IntArray => self.emit(format!("store i32 {}, i32* {}", value, element)),
            _ => {
                let byte = self.emit_value(format!("zext i1 {} to i8", value))?;
                self.emit(format!("store i8 {}, i8* {}", byte, element))
            }
        }
    }
}
