use crate::{
    hierarchy,
    method_body_type_checker::MethodBodyTypeChecker,
    semantic_error::{did_you_mean, SemanticError},
    type_analysis::TypeAnalysis,
    type_system::*,
};
use ast::{Program, Spanned, Type, VarDeclaration};
use compiler_shared::{context::Context, timed_scope};
use failure::Fail;
use std::cell::Cell;
use strtab::Symbol;
use strum_macros::Display;

#[derive(Debug, Clone, Default)]
pub struct CheckerOptions {
    /// Stop a pass after this many errors. `Some(1)` stops at the first one.
    pub max_errors: Option<usize>,
    /// Let fields take part in the definite initialization check. Otherwise
    /// fields count as initialized since objects are zero-filled.
    pub strict_field_initialization: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CheckPass {
    #[strum(serialize = "class hierarchy")]
    Hierarchy,
    #[strum(serialize = "declaration")]
    Declarations,
    #[strum(serialize = "override")]
    Overrides,
    #[strum(serialize = "method body")]
    MethodBodies,
}

#[derive(Debug, Fail)]
#[fail(display = "semantic analysis stopped after the {} pass", pass)]
pub struct AnalysisStopped {
    pub pass: CheckPass,
}

/// Runs the hierarchy resolver and the three checker passes. Every pass
/// reports all errors it finds (up to `max_errors`); the next pass only
/// runs if the previous one reported none.
pub fn check<'src, 'ast>(
    program: &'ast Program<'src>,
    context: &Context,
    options: &CheckerOptions,
) -> Result<(ClassModel<'src>, TypeAnalysis<'src, 'ast>), AnalysisStopped> {
    let sem_context = SemanticContext::new(context, options.max_errors);
    let mut type_analysis = TypeAnalysis::new();

    let stop_if_errored = |pass: CheckPass| {
        if context.diagnostics.errored() {
            log::info!("stopping after the {} pass", pass);
            Err(AnalysisStopped { pass })
        } else {
            log::debug!("{} pass finished", pass);
            Ok(())
        }
    };

    let mut model = {
        timed_scope!("hierarchy");
        hierarchy::resolve(program, &mut type_analysis, &sem_context)
    };
    stop_if_errored(CheckPass::Hierarchy)?;

    {
        timed_scope!("declarations");
        check_declarations(program, &mut model, &type_analysis, &sem_context, options);
    }
    stop_if_errored(CheckPass::Declarations)?;

    {
        timed_scope!("overrides");
        check_overrides(&model, &sem_context);
    }
    stop_if_errored(CheckPass::Overrides)?;

    {
        timed_scope!("method bodies");
        MethodBodyTypeChecker::check_program(program, &mut model, &mut type_analysis, &sem_context);
    }
    stop_if_errored(CheckPass::MethodBodies)?;

    Ok((model, type_analysis))
}

pub struct SemanticContext<'ctx> {
    pub context: &'ctx Context,
    max_errors: Option<usize>,
    reported: Cell<usize>,
}

impl<'ctx> SemanticContext<'ctx> {
    pub fn new(context: &'ctx Context, max_errors: Option<usize>) -> SemanticContext<'ctx> {
        SemanticContext {
            context,
            max_errors,
            reported: Cell::new(0),
        }
    }

    /// Errors past `max_errors` are dropped.
    pub fn report_error(&self, line: usize, error: SemanticError) {
        if self.limit_reached() {
            log::debug!("dropping error in line {}: {}", line, error);
            return;
        }
        self.context.diagnostics.error_at_line(line, &error);
        self.reported.set(self.reported.get() + 1);
    }

    /// True once `max_errors` errors were reported through this context.
    pub fn limit_reached(&self) -> bool {
        self.max_errors
            .map_or(false, |max| self.reported.get() >= max)
    }
}

/// Validates a declared type against the primitives and the declared
/// classes.
fn checked_type_from_ty<'src>(
    ty: &Spanned<Type<'src>>,
    line: usize,
    model: &ClassModel<'src>,
    context: &SemanticContext<'_>,
) -> CheckedType<'src> {
    let checked = CheckedType::from_ast(&ty.data);
    if let CheckedType::Class(name) = checked {
        if model.lookup(name).is_none() {
            let suggestion = strtab::closest_match(name, model.classes().map(|(_, c)| c.name));
            context.report_error(
                line,
                SemanticError::UnknownType {
                    name: name.to_string(),
                    hint: did_you_mean(suggestion),
                },
            );
        }
    }
    checked
}

/// Collects parameters and local variables, rejecting names that are
/// already in use in the same method.
fn collect_locals<'src>(
    method_name: &str,
    taken: &[Symbol<'src>],
    decls: &[Spanned<VarDeclaration<'src>>],
    locals: &mut Vec<VarDef<'src>>,
    model: &ClassModel<'src>,
    context: &SemanticContext<'_>,
    initialized: bool,
) {
    for decl in decls {
        let name = decl.name.data;
        let ty = checked_type_from_ty(&decl.ty, decl.line, model, context);
        if taken.contains(&name) || locals.iter().any(|local| local.name == name) {
            context.report_error(
                decl.line,
                SemanticError::NameAlreadyUsed {
                    name: name.to_string(),
                    method: method_name.to_string(),
                },
            );
            continue;
        }
        locals.push(VarDef {
            name,
            ty,
            line: decl.line,
            initialized,
        });
    }
}

/// Declaration pass: validates field, parameter, variable and return types
/// and records parameters and locals in the class model.
fn check_declarations<'src, 'ast>(
    program: &'ast Program<'src>,
    model: &mut ClassModel<'src>,
    type_analysis: &TypeAnalysis<'src, 'ast>,
    context: &SemanticContext<'_>,
    options: &CheckerOptions,
) {
    let main_id = ClassId::main();
    let taken: Vec<Symbol<'src>> = model
        .class(main_id)
        .main_method
        .as_ref()
        .map(|main| main.param_name)
        .into_iter()
        .collect();
    let mut main_locals = Vec::new();
    collect_locals(
        "main",
        &taken,
        &program.main_class.vars,
        &mut main_locals,
        model,
        context,
        false,
    );
    if let Some(main) = model.class_mut(main_id).main_method.as_mut() {
        main.locals = main_locals;
    }

    for class_decl in &program.classes {
        if context.limit_reached() {
            return;
        }
        let class_id = match type_analysis.decl_get_class_id(class_decl) {
            Some(id) => id,
            None => continue,
        };

        for field_decl in &class_decl.fields {
            checked_type_from_ty(&field_decl.ty, field_decl.line, model, context);
        }
        for field in &mut model.class_mut(class_id).fields {
            field.initialized = !options.strict_field_initialization;
        }

        for method_decl in &class_decl.methods {
            let method_ref = match type_analysis.decl_get_method_ref(method_decl) {
                Some(method_ref) => method_ref,
                None => continue,
            };
            let name = method_decl.name.data.as_str();

            checked_type_from_ty(&method_decl.return_ty, method_decl.line, model, context);

            let mut locals = Vec::new();
            collect_locals(name, &[], &method_decl.params, &mut locals, model, context, true);
            let param_count = locals.len();
            collect_locals(name, &[], &method_decl.vars, &mut locals, model, context, false);

            let method = model.method_mut(method_ref);
            method.param_count = param_count;
            method.locals = locals;
        }
    }
}

/// Override pass: an overriding method must repeat the return type and
/// the parameter types of the nearest ancestor method with the same name.
fn check_overrides(model: &ClassModel<'_>, context: &SemanticContext<'_>) {
    for (_, class_def) in model.classes() {
        let parent = match class_def.parent {
            Some(parent) => parent,
            None => continue,
        };

        for method in &class_def.methods {
            if context.limit_reached() {
                return;
            }
            let ancestor_ref = match model.find_method(parent, method.name) {
                Some(found) => found,
                None => continue,
            };
            let ancestor = model.method(ancestor_ref);
            let ancestor_name = model.class(ancestor_ref.class).name.to_string();
            log::trace!(
                "{}.{} overrides {}.{}",
                class_def.name,
                method.name,
                ancestor_name,
                ancestor.name
            );

            if method.return_ty != ancestor.return_ty {
                context.report_error(
                    method.line,
                    SemanticError::OverrideReturnType {
                        method: method.name.to_string(),
                        ancestor: ancestor_name.clone(),
                        expected: ancestor.return_ty.to_string(),
                        actual: method.return_ty.to_string(),
                    },
                );
            }

            if method.param_count != ancestor.param_count {
                context.report_error(
                    method.line,
                    SemanticError::OverrideParamCount {
                        method: method.name.to_string(),
                        ancestor: ancestor_name,
                        expected: ancestor.param_count,
                        actual: method.param_count,
                    },
                );
                continue;
            }

            let mismatch = method
                .param_types()
                .zip(ancestor.param_types())
                .enumerate()
                .find(|(_, (own, inherited))| own != inherited);
            if let Some((position, (own, inherited))) = mismatch {
                context.report_error(
                    method.line,
                    SemanticError::OverrideParamType {
                        method: method.name.to_string(),
                        ancestor: ancestor_name,
                        position: position + 1,
                        expected: inherited.to_string(),
                        actual: own.to_string(),
                    },
                );
            }
        }
    }
}
