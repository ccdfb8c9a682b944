//! Styled writes to a terminal.
//!
//! Every styled write sets its own color and weight and resets the
//! terminal afterwards, so a failed or interrupted message never leaks its
//! style into following output. Styling failures are ignored, the text
//! itself is always written.
use std::{fmt, io};
use termcolor::{Color, ColorSpec, WriteColor};

pub struct ColorOutput<'a> {
    writer: &'a mut dyn WriteColor,
}

impl<'a> ColorOutput<'a> {
    pub fn new(writer: &'a mut dyn WriteColor) -> Self {
        writer.reset().ok();
        Self { writer }
    }

    /// Writes `text` in `color` (the terminal default for `None`).
    pub fn styled(
        &mut self,
        color: Option<Color>,
        bold: bool,
        text: fmt::Arguments<'_>,
    ) -> io::Result<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        self.writer.set_color(&spec).ok();
        let written = self.writer.write_fmt(text);
        self.writer.reset().ok();
        written
    }

    pub fn plain(&mut self, text: fmt::Arguments<'_>) -> io::Result<()> {
        self.writer.write_fmt(text)
    }
}

impl<'a> Drop for ColorOutput<'a> {
    fn drop(&mut self) {
        self.writer.reset().ok();
    }
}
