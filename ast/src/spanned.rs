use std::{fmt, ops::Deref};

/// A syntax tree node together with the source line it starts on.
#[derive(Debug, Clone, Copy)]
pub struct Spanned<T> {
    pub line: usize,
    pub data: T,
}

impl<T> Eq for Spanned<T> where T: Eq {}
impl<T> PartialEq for Spanned<T>
where
    T: PartialEq,
{
    /// This only compares the `data`! I.e. two `Spanned`s are equal even if
    /// they start on different lines, as long as the content is the same.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> fmt::Display for Spanned<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.data, self.line)
    }
}

impl<T> Spanned<T> {
    pub fn new(line: usize, data: T) -> Self {
        Spanned { line, data }
    }

    /// Moves the node to `line`.
    pub fn at(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn map<U, F>(&self, f: F) -> Spanned<U>
    where
        F: FnOnce(&T) -> U,
    {
        Spanned {
            line: self.line,
            data: f(&self.data),
        }
    }
}
