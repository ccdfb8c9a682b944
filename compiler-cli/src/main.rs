#![warn(rust_2018_idioms)]
#![warn(clippy::print_stdout)]

mod ast_json;

use compiler_lib::{print_error, CompilerPhase, FieldLayout, Options};
use compiler_shared::{context::Context, timing};
use failure::{Error, Fail, ResultExt};
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    process::exit,
};
use strtab::StringTable;
use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream};
use utils::OutputSpecification;

#[derive(Debug, Fail)]
pub enum CliError {
    #[fail(display = "cannot write output file {:?}", path)]
    WriteOutput { path: PathBuf },
    #[fail(display = "cannot write to stdout")]
    WriteStdout,
}

/// Checks a `MiniJava` program and translates it to LLVM IR.
#[derive(StructOpt, Debug)]
#[structopt(name = "compiler-cli")]
pub struct CliCommand {
    /// JSON serialized syntax tree of the program.
    #[structopt(name = "FILE", parse(from_os_str))]
    input: PathBuf,
    /// Where to write the IR. Defaults to the input path with a `.ll`
    /// extension, `-` writes to stdout.
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Stop after semantic analysis.
    #[structopt(long = "check")]
    check: bool,
    /// Stop every analysis pass after this many errors.
    #[structopt(long = "max-errors")]
    max_errors: Option<usize>,
    /// Stop at the first error, same as `--max-errors 1`.
    #[structopt(long = "fail-fast")]
    fail_fast: bool,
    /// Fields must be assigned before they are read, like locals.
    #[structopt(long = "strict-field-init")]
    strict_field_init: bool,
    /// Start the fields and vtable slots of every class after those of its
    /// parent instead of sharing one counter per inheritance tree.
    #[structopt(long = "parent-prefix-layout")]
    parent_prefix_layout: bool,
    /// Print field offsets and vtable slots of every class to stderr.
    #[structopt(long = "dump-class-layouts")]
    dump_class_layouts: bool,
}

impl CliCommand {
    fn options(&self) -> Options {
        Options {
            max_errors: if self.fail_fast {
                Some(1)
            } else {
                self.max_errors
            },
            strict_field_initialization: self.strict_field_init,
            field_layout: if self.parent_prefix_layout {
                FieldLayout::ParentPrefix
            } else {
                FieldLayout::SharedRootCounter
            },
            dump_class_layouts: self.dump_class_layouts,
            stop_after: if self.check {
                CompilerPhase::Semantics
            } else {
                CompilerPhase::Codegen
            },
        }
    }

    fn output(&self) -> OutputSpecification {
        match &self.output {
            Some(path) => OutputSpecification::from_arg(path),
            None => OutputSpecification::derived_from_input(&self.input),
        }
    }
}

fn main() {
    env_logger::init();
    let cmd = CliCommand::from_args();
    log::debug!("{:?}", cmd);

    let result = run_compiler(&cmd);

    if let Err(err) = timing::print() {
        log::warn!("could not write timing report: {}", err);
    }
    if let Err(msg) = result {
        exit_with_error(&msg);
    }
}

fn run_compiler(cmd: &CliCommand) -> Result<(), Error> {
    let doc = ast_json::read(&cmd.input)?;
    let mut strtab = StringTable::new();
    let program = doc.lower(&mut strtab);

    let stderr = StandardStream::stderr(ColorChoice::Auto);
    let context = Context::new(Box::new(stderr));

    // the module is only written once it is complete
    let mut ir = Vec::new();
    if let Err(err) = compiler_lib::compile(&program, &context, &cmd.options(), &mut ir) {
        context.diagnostics.write_statistics();
        return Err(err);
    }
    if cmd.check {
        return Ok(());
    }

    match cmd.output() {
        OutputSpecification::Stdout => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(&ir).context(CliError::WriteStdout)?;
        }
        OutputSpecification::File(path) => {
            File::create(&path)
                .and_then(|mut file| file.write_all(&ir))
                .context(CliError::WriteOutput { path })?;
        }
    }
    Ok(())
}

/// Print an error in a format intended for end users and terminate
/// the program.
fn exit_with_error(err: &Error) -> ! {
    let mut stderr = io::stderr();
    print_error(&mut stderr, err).expect("unable to print error");
    exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> CliCommand {
        CliCommand::from_iter(std::iter::once("compiler-cli").chain(args.iter().cloned()))
    }

    #[test]
    fn defaults_compile_next_to_the_input() {
        let cmd = command(&["tree.json"]);
        assert_eq!(
            cmd.output(),
            OutputSpecification::File(PathBuf::from("tree.ll"))
        );

        let options = cmd.options();
        assert_eq!(options.max_errors, None);
        assert_eq!(options.field_layout, FieldLayout::SharedRootCounter);
        assert_eq!(options.stop_after, CompilerPhase::Codegen);
        assert!(!options.dump_class_layouts);
    }

    #[test]
    fn flags_map_to_options() {
        let cmd = command(&[
            "--fail-fast",
            "--max-errors",
            "5",
            "--strict-field-init",
            "--parent-prefix-layout",
            "--check",
            "-o",
            "-",
            "tree.json",
        ]);
        assert_eq!(cmd.output(), OutputSpecification::Stdout);

        let options = cmd.options();
        assert_eq!(options.max_errors, Some(1));
        assert!(options.strict_field_initialization);
        assert_eq!(options.field_layout, FieldLayout::ParentPrefix);
        assert_eq!(options.stop_after, CompilerPhase::Semantics);
    }
}
