//! All state shared by the semantic analysis and code generation phases.
use diagnostics::Diagnostics;
use termcolor::WriteColor;

pub struct Context {
    pub diagnostics: Diagnostics,
}

impl Context {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            diagnostics: Diagnostics::new(writer),
        }
    }

    pub fn dummy() -> Self {
        Self::new(Box::new(dummy_writer()))
    }
}

// dummy_writer returns a WriteColor meant for use in tests.
pub fn dummy_writer() -> impl termcolor::WriteColor {
    termcolor::NoColor::new(std::io::sink())
}
