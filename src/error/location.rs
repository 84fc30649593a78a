use std::fmt::{Debug, Display};
use std::ops::Deref;

/// Describes the location of a token or an AST node in source code
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Length of the spanned text in bytes
    pub len: usize,
    /// 1-based line number of the first character
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, len: usize, line: usize) -> Self {
        Self { start, len, line }
    }

    /// The smallest span covering both `self` and `other`
    /// The line number is taken from the leftmost of the two
    pub fn merge(self, other: Span) -> Span {
        let (first, last) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: first.start,
            len: (last.start + last.len).saturating_sub(first.start),
            line: first.line,
        }
    }

    /// Slice the spanned text out of the source buffer
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.start..self.start + self.len]
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{}~{} @ line {}",
            self.start,
            self.start + self.len,
            self.line
        )
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line)
    }
}

/// A wrapper for attaching a source location to a token or AST node
#[derive(Clone, Copy, PartialEq)]
pub struct Traced<T>(T, Span);

impl<T> Traced<T> {
    pub fn new(inner: T, span: Span) -> Self {
        Self(inner, span)
    }
    pub fn inner(&self) -> &T {
        &self.0
    }
    pub fn into_inner(self) -> T {
        self.0
    }
    pub fn span(&self) -> Span {
        self.1
    }
}

impl<T> Deref for Traced<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> Debug for Traced<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner().fmt(f)
    }
}

impl<T> Display for Traced<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner().fmt(f)
    }
}
