#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! The diagnostics object controls the output of errors generated by the
//! compiler during semantic analysis.
//! It also tracks the number of errors generated for flow control.
//!
//! Messages carry the source line of the offending syntax tree node. There
//! are no column positions: the syntax tree handed to the compiler only
//! records lines.
//!
//! This implementation is NOT thread-safe.

use failure::AsFail;
use std::{cell::RefCell, collections::HashMap, fmt};
use termcolor::{Color, WriteColor};
use utils::color::ColorOutput;

/// Instead of writing errors generated in the different
/// compiler stages directly to stderr, they are collected in this object.
///
/// This has several advantages:
/// - the output level can be adapted by users.
/// - we have a single source responsible for formatting compiler messages.
/// - tests can inspect what was reported through [`Diagnostics::messages`].
pub struct Diagnostics {
    message_count: RefCell<HashMap<MessageLevel, usize>>,
    history: RefCell<Vec<RecordedMessage>>,
    writer: RefCell<Box<dyn WriteColor>>,
}

/// A plain-text copy of an emitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub level: MessageLevel,
    pub line: usize,
    pub text: String,
}

impl fmt::Display for RecordedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.level.name(), self.text)
    }
}

impl Diagnostics {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            writer: RefCell::new(writer),
            history: RefCell::new(Vec::new()),
            message_count: RefCell::new(HashMap::new()),
        }
    }

    /// True when an error message was emitted.
    pub fn errored(&self) -> bool {
        self.message_count
            .borrow()
            .get(&MessageLevel::Error)
            .is_some()
    }

    pub fn count(&self, level: MessageLevel) -> usize {
        self.message_count
            .borrow()
            .get(&level)
            .cloned()
            .unwrap_or(0)
    }

    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.history.borrow().clone()
    }

    pub fn write_statistics(&self) {
        let (color, summary) = if self.errored() {
            (
                MessageLevel::Error.color(),
                match self.count(MessageLevel::Error) {
                    1 => "Compilation aborted due to an error".to_string(),
                    n => format!("Compilation aborted due to {} errors", n),
                },
            )
        } else {
            (
                Some(Color::Green),
                "Compilation finished successfully".to_string(),
            )
        };

        let mut writer = self.writer.borrow_mut();
        ColorOutput::new(&mut **writer)
            .styled(color, true, format_args!("{}\n", summary))
            .ok();
    }

    /// Generate a message that is printed to the writer given in the `new`
    /// constructor. Most of the time this will be stderr.
    fn emit(&self, level: MessageLevel, line: usize, kind: &dyn AsFail) {
        let msg = Message {
            level,
            line,
            text: kind.as_fail().to_string(),
        };

        {
            let mut writer = self.writer.borrow_mut();
            msg.write_colored(&mut **writer);
        }
        self.history.borrow_mut().push(msg.into_record());
        self.increment_level_count(level);
    }

    pub fn error_at_line(&self, line: usize, kind: &dyn AsFail) {
        self.emit(MessageLevel::Error, line, kind)
    }

    /// Write free-form informational text (no level, not counted).
    pub fn note(&self, text: &str) {
        let mut writer = self.writer.borrow_mut();
        write!(writer, "{}", text).ok();
    }

    fn increment_level_count(&self, level: MessageLevel) {
        let mut message_count = self.message_count.borrow_mut();
        let counter = message_count.entry(level).or_insert(0);
        *counter += 1;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MessageLevel {
    Error,
}

impl MessageLevel {
    fn color(self) -> Option<Color> {
        // Don't be confused by the return type. `None` means default color!
        match self {
            MessageLevel::Error => Some(Color::Red),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageLevel::Error => "error",
        }
    }
}

struct Message {
    level: MessageLevel,
    line: usize,
    text: String,
}

impl Message {
    fn write_colored(&self, writer: &mut dyn WriteColor) {
        let mut output = ColorOutput::new(writer);

        output
            .styled(None, true, format_args!("line {}: ", self.line))
            .ok();
        output
            .styled(self.level.color(), true, format_args!("{}: ", self.level.name()))
            .ok();
        output.plain(format_args!("{}\n", self.text)).ok();
    }

    fn into_record(self) -> RecordedMessage {
        RecordedMessage {
            level: self.level,
            line: self.line,
            text: self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failure::Fail;
    use std::{cell::RefCell, io, rc::Rc};
    use termcolor::{ColorSpec, NoColor};

    #[derive(Debug, Fail)]
    enum TestError {
        #[fail(display = "the name {} is already being used", name)]
        Duplicate { name: String },
    }

    /// Shares its buffer with the test so the output can be inspected after
    /// the diagnostics object took ownership of the writer.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteColor for SharedBuffer {
        fn supports_color(&self) -> bool {
            false
        }

        fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
            Ok(())
        }

        fn reset(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture() -> (Diagnostics, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Diagnostics::new(Box::new(buffer.clone())), buffer)
    }

    fn output(buffer: &SharedBuffer) -> String {
        String::from_utf8(buffer.0.borrow().clone()).unwrap()
    }

    #[test]
    fn error_is_prefixed_with_line() {
        let (diagnostics, buffer) = capture();
        diagnostics.error_at_line(
            7,
            &TestError::Duplicate {
                name: "x".to_string(),
            },
        );

        assert_eq!(
            output(&buffer),
            "line 7: error: the name x is already being used\n"
        );
        assert!(diagnostics.errored());
        assert_eq!(diagnostics.count(MessageLevel::Error), 1);
    }

    #[test]
    fn history_keeps_messages_in_order() {
        let (diagnostics, _buffer) = capture();
        diagnostics.error_at_line(
            1,
            &TestError::Duplicate {
                name: "a".to_string(),
            },
        );
        diagnostics.error_at_line(
            2,
            &TestError::Duplicate {
                name: "b".to_string(),
            },
        );

        let rendered: Vec<String> = diagnostics
            .messages()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            rendered,
            vec![
                "line 1: error: the name a is already being used",
                "line 2: error: the name b is already being used",
            ]
        );
    }

    #[test]
    fn statistics_summarize_errors() {
        let (diagnostics, buffer) = capture();
        diagnostics.write_statistics();
        assert_eq!(
            output(&buffer),
            "Compilation finished successfully\n"
        );

        let (diagnostics, buffer) = capture();
        for (line, name) in [(3, "a"), (4, "b")].iter() {
            diagnostics.error_at_line(
                *line,
                &TestError::Duplicate {
                    name: name.to_string(),
                },
            );
        }
        diagnostics.write_statistics();
        assert!(output(&buffer).ends_with("Compilation aborted due to 2 errors\n"));
    }

    #[test]
    fn no_color_writer_is_accepted() {
        let diagnostics = Diagnostics::new(Box::new(NoColor::new(Vec::new())));
        diagnostics.note("class layouts\n");
        assert!(!diagnostics.errored());
    }
}
