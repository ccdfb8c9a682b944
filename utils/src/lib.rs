pub mod color;
pub mod ref_eq;

use std::path::{Path, PathBuf};

#[macro_export]
macro_rules! assert_matches {
    ($expression: expr, $( $pattern: pat )|*) => {{
        match $expression {
            $( $pattern )|* => (),
            expression => panic!(
                r#"assertion failed: `(if let pattern = expression), {}:{}:{}`
pattern: `{}`,
expression: `{:?}`"#,
                file!(),
                line!(),
                column!(),
                stringify!($( $pattern )|*),
                expression
            ),
        }
    }};
}

/// Where generated IR text goes. `-` on the command line selects stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpecification {
    Stdout,
    File(PathBuf),
}

impl OutputSpecification {
    pub fn from_arg(arg: &Path) -> Self {
        if arg == Path::new("-") {
            OutputSpecification::Stdout
        } else {
            OutputSpecification::File(arg.to_path_buf())
        }
    }

    /// The default output path is the input path with its extension
    /// replaced by `.ll`.
    pub fn derived_from_input(input: &Path) -> Self {
        OutputSpecification::File(input.with_extension("ll"))
    }
}
