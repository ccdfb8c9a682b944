use ast::Program;
use compiler_shared::{context::Context, timed_scope};
use diagnostics::MessageLevel;
use failure::{Error, Fail};
use llvm_construction::{FieldLayout, Layout, ProgramGenerator};
use std::io;
use strum_macros::Display;
use type_checking::{check, CheckPass, CheckerOptions, ClassModel, TypeAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CompilerPhase {
    #[strum(serialize = "semantic analysis")]
    Semantics,
    #[strum(serialize = "code generation")]
    Codegen,
}

impl Default for CompilerPhase {
    fn default() -> Self {
        CompilerPhase::Codegen
    }
}

/// Enable or disable behaviour of the individual compiler phases
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Stop a pass after this many errors. `Some(1)` aborts on the first
    /// error.
    pub max_errors: Option<usize>,
    pub strict_field_initialization: bool,
    pub field_layout: FieldLayout,
    /// Write the offset and vtable slot table of every class to the
    /// diagnostics writer.
    pub dump_class_layouts: bool,
    /// Following phases will not be executed.
    pub stop_after: CompilerPhase,
}

impl Options {
    pub fn fail_fast(mut self) -> Self {
        self.max_errors = Some(1);
        self
    }

    fn checker_options(&self) -> CheckerOptions {
        CheckerOptions {
            max_errors: self.max_errors,
            strict_field_initialization: self.strict_field_initialization,
        }
    }
}

#[derive(Debug, Fail)]
pub enum CompileError {
    #[fail(
        display = "compilation aborted after the {} pass due to {} error(s)",
        pass, errors
    )]
    Aborted { pass: CheckPass, errors: usize },
}

/// The checked program, ready for code generation.
pub struct Analysis<'src, 'ast> {
    pub model: ClassModel<'src>,
    pub type_analysis: TypeAnalysis<'src, 'ast>,
    pub layout: Layout<'src>,
}

fn run_checker<'src, 'ast>(
    program: &'ast Program<'src>,
    context: &Context,
    options: &Options,
) -> Result<(ClassModel<'src>, TypeAnalysis<'src, 'ast>), CompileError> {
    timed_scope!("semantic analysis");
    check(program, context, &options.checker_options()).map_err(|stopped| {
        CompileError::Aborted {
            pass: stopped.pass,
            errors: context.diagnostics.count(MessageLevel::Error),
        }
    })
}

/// Runs semantic analysis and assigns field offsets and vtable slots.
pub fn analyze<'src, 'ast>(
    program: &'ast Program<'src>,
    context: &Context,
    options: &Options,
) -> Result<Analysis<'src, 'ast>, Error> {
    let (mut model, type_analysis) = run_checker(program, context, options)?;

    let layout = {
        timed_scope!("layout");
        Layout::compute(&mut model, options.field_layout)?
    };

    if options.dump_class_layouts {
        let mut table = Vec::new();
        layout.dump(&model, &mut table)?;
        context.diagnostics.note(&String::from_utf8_lossy(&table));
    }

    Ok(Analysis {
        model,
        type_analysis,
        layout,
    })
}

/// Compiles `program` and writes the resulting module to `out`. Nothing is
/// written if semantic analysis reports an error.
pub fn compile(
    program: &Program<'_>,
    context: &Context,
    options: &Options,
    out: &mut dyn io::Write,
) -> Result<(), Error> {
    if options.stop_after == CompilerPhase::Semantics {
        run_checker(program, context, options)?;
        log::info!("stopping after {}", CompilerPhase::Semantics);
        return Ok(());
    }

    let analysis = analyze(program, context, options)?;

    timed_scope!("code generation");
    ProgramGenerator::new(
        program,
        &analysis.model,
        &analysis.layout,
        &analysis.type_analysis,
    )
    .generate(out)?;
    log::info!("generated {} classes", analysis.model.len());

    Ok(())
}

/// Print error objects in a format intended for end users
pub fn print_error(writer: &mut dyn io::Write, err: &Error) -> Result<(), Error> {
    writeln!(writer, "error: {}", err.as_fail())?;
    for cause in err.iter_causes() {
        writeln!(writer, "caused by: {}", cause)?;
    }
    Ok(())
}
