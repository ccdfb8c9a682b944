//! The runtime prelude emitted at the top of every module: libc
//! declarations, the format strings and the helpers that generated code
//! calls for printing and for runtime errors.

use std::io::{self, Write};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum RuntimeFunction {
    #[strum(serialize = "calloc")]
    Calloc,
    #[strum(serialize = "printf")]
    Printf,
    #[strum(serialize = "exit")]
    Exit,
    #[strum(serialize = "print_int")]
    PrintInt,
    #[strum(serialize = "throw_oob")]
    ArrayOutOfBounds,
    #[strum(serialize = "throw_nsz")]
    NegativeArraySize,
}

impl RuntimeFunction {
    /// The libc functions the prelude only declares.
    pub fn is_external(self) -> bool {
        match self {
            RuntimeFunction::Calloc | RuntimeFunction::Printf | RuntimeFunction::Exit => true,
            RuntimeFunction::PrintInt
            | RuntimeFunction::ArrayOutOfBounds
            | RuntimeFunction::NegativeArraySize => false,
        }
    }

    /// The declaration, for external functions, or the full definition.
    fn definition(self) -> &'static str {
        match self {
            RuntimeFunction::Calloc => "declare i8* @calloc(i32, i32)\n",
            RuntimeFunction::Printf => "declare i32 @printf(i8*, ...)\n",
            RuntimeFunction::Exit => "declare void @exit(i32)\n",
            RuntimeFunction::PrintInt => {
                "define void @print_int(i32 %i) {\n\
                 \t%_str = bitcast [4 x i8]* @_cint to i8*\n\
                 \tcall i32 (i8*, ...) @printf(i8* %_str, i32 %i)\n\
                 \tret void\n\
                 }\n"
            }
            RuntimeFunction::ArrayOutOfBounds => {
                "define void @throw_oob() {\n\
                 \t%_str = bitcast [15 x i8]* @_cOOB to i8*\n\
                 \tcall i32 (i8*, ...) @printf(i8* %_str)\n\
                 \tcall void @exit(i32 1)\n\
                 \tret void\n\
                 }\n"
            }
            RuntimeFunction::NegativeArraySize => {
                "define void @throw_nsz() {\n\
                 \t%_str = bitcast [15 x i8]* @_cNSZ to i8*\n\
                 \tcall i32 (i8*, ...) @printf(i8* %_str)\n\
                 \tcall void @exit(i32 1)\n\
                 \tret void\n\
                 }\n"
            }
        }
    }
}

const FORMAT_STRINGS: &str = "@_cint = constant [4 x i8] c\"%d\\0a\\00\"\n\
                              @_cOOB = constant [15 x i8] c\"Out of bounds\\0a\\00\"\n\
                              @_cNSZ = constant [15 x i8] c\"Negative size\\0a\\00\"\n";

pub fn write_prelude(out: &mut dyn Write) -> io::Result<()> {
    for function in RuntimeFunction::iter().filter(|f| f.is_external()) {
        out.write_all(function.definition().as_bytes())?;
    }
    writeln!(out)?;
    out.write_all(FORMAT_STRINGS.as_bytes())?;
    for function in RuntimeFunction::iter().filter(|f| !f.is_external()) {
        writeln!(out)?;
        out.write_all(function.definition().as_bytes())?;
    }
    writeln!(out)
}
