pub mod location;

use std::fmt::{self, Display};

use colored::Colorize;

/// Errors detected during lexical analysis
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    InvalidCharacter { ch: char, line: usize },
    InvalidNumber { text: String, line: usize },
    UnterminatedChar { line: usize },
    CharLiteralTooLong { line: usize },
    EmptyChar { line: usize },
    UnterminatedString { line: usize },
}

impl Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacter { ch, line } => {
                write!(
                    f,
                    "invalid character `{}` at line {}",
                    ch.escape_default(),
                    line
                )
            }
            Self::InvalidNumber { text, line } => {
                write!(f, "invalid numeric value `{}` at line {}", text, line)
            }
            Self::UnterminatedChar { line } => {
                write!(f, "unclosed character literal at line {}", line)
            }
            Self::CharLiteralTooLong { line } => {
                write!(f, "too many characters in character literal at line {}", line)
            }
            Self::EmptyChar { line } => {
                write!(f, "empty character literal at line {}", line)
            }
            Self::UnterminatedString { line } => {
                write!(f, "unclosed string literal at line {}", line)
            }
        }
    }
}

/// Errors detected while parsing and resolving names
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        found: String,
        line: usize,
    },
    ExpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
    },
    MismatchedParens {
        line: usize,
    },
    InvalidExpression {
        line: usize,
    },
    UndeclaredVariable {
        name: String,
        line: usize,
    },
    UndeclaredFunction {
        name: String,
        line: usize,
    },
    /// A name declared twice in the same scope; `first_line` is where the
    /// previous declaration lives
    Redeclaration {
        name: String,
        line: usize,
        first_line: usize,
    },
    /// `let` with a name that already names a function
    FunctionAsVariable {
        name: String,
        line: usize,
        first_line: usize,
    },
    /// Call syntax on a name that resolves to a variable
    NotCallable {
        name: String,
        line: usize,
    },
    /// Assignment to a name that resolves to a function
    NotAssignable {
        name: String,
        line: usize,
    },
    UnknownType {
        name: String,
        line: usize,
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, line } => {
                write!(f, "unexpected token `{}` at line {}", found, line)
            }
            Self::ExpectedToken {
                expected,
                found,
                line,
            } => {
                write!(
                    f,
                    "expected {} but found `{}` at line {}",
                    expected, found, line
                )
            }
            Self::MismatchedParens { line } => {
                write!(f, "mismatched parentheses at line {}", line)
            }
            Self::InvalidExpression { line } => {
                write!(f, "invalid expression at line {}", line)
            }
            Self::UndeclaredVariable { name, line } => {
                write!(f, "use of undeclared variable \"{}\" at line {}", name, line)
            }
            Self::UndeclaredFunction { name, line } => {
                write!(f, "use of undeclared function \"{}\" at line {}", name, line)
            }
            Self::Redeclaration {
                name,
                line,
                first_line,
            } => {
                write!(
                    f,
                    "redeclaration of \"{}\" at line {}\n\"{}\" was first defined at line {}",
                    name, line, name, first_line
                )
            }
            Self::FunctionAsVariable {
                name,
                line,
                first_line,
            } => {
                write!(
                    f,
                    "\"{}\" is a function and cannot be declared as a variable at line {}\n\
                     function \"{}\" was first defined at line {}",
                    name, line, name, first_line
                )
            }
            Self::NotCallable { name, line } => {
                write!(
                    f,
                    "variable \"{}\" cannot be called as a function at line {}",
                    name, line
                )
            }
            Self::NotAssignable { name, line } => {
                write!(
                    f,
                    "function \"{}\" cannot be used as a variable at line {}",
                    name, line
                )
            }
            Self::UnknownType { name, line } => {
                write!(f, "unknown data type \"{}\" at line {}", name, line)
            }
        }
    }
}

/// Errors raised when code generation reaches a construct the backend does
/// not lower yet
#[derive(Debug, Clone, PartialEq)]
pub enum CodegenError {
    UnimplementedOp { op: &'static str, line: usize },
    UnimplementedCall { name: String, line: usize },
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnimplementedOp { op, line } => {
                write!(
                    f,
                    "operator `{}` is not implemented in code generation (line {})",
                    op, line
                )
            }
            Self::UnimplementedCall { name, line } => {
                write!(
                    f,
                    "call to \"{}\" is not implemented in code generation (line {})",
                    name, line
                )
            }
        }
    }
}

/// Any fatal error of the pipeline; compilation aborts on the first one
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Codegen(CodegenError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
            Self::Codegen(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}
impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
impl From<CodegenError> for CompileError {
    fn from(e: CodegenError) -> Self {
        Self::Codegen(e)
    }
}

/// Render a fatal diagnostic to stderr in its final presentation form
pub fn report_fatal(path: &str, err: &CompileError) {
    eprintln!(
        "{} {}\n{}",
        "-->".blue().bold(),
        path.bold(),
        err.to_string().red().bold()
    );
}
