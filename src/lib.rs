//! katc — a compiler for the kat toy language.
//!
//! The pipeline is a single-threaded batch run over small, composable
//! stages:
//! - `token::tokenizer` turns the source buffer into an Eof-terminated
//!   token stream.
//! - `ast::parser` builds the AST in one pass, resolving every identifier
//!   against the scope stack as it goes; there is no separate semantic
//!   phase.
//! - `gen` lowers the resolved tree into AT&T 32-bit x86 assembly text.
//!
//! Identifier and string payloads are slices of the source buffer, so the
//! buffer outlives every intermediate structure of a compilation run. All
//! errors are fatal: the first one aborts the run.

pub mod ast;
pub mod error;
pub mod gen;
pub mod scope;
pub mod symbol;
pub mod token;

pub use error::{CodegenError, CompileError, LexError, ParseError};

/// Compile a kat source buffer into assembly text
pub fn compile(source: &str) -> Result<String, CompileError> {
    let tokens = token::tokenizer::lex(source)?;
    let mut program = ast::parser::parse(tokens)?;
    let asm = gen::generate(&mut program)?;
    Ok(asm)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pipeline_compiles_a_whole_program() {
        let source = "func add_one() => int {
    let n: int = 41;
    n = n + 1;
    return n;
}
func main() {
    print(3 * (2 + 5));
    return 0;
}";
        let asm = compile(source).unwrap();
        assert!(asm.contains("add_one:"), "{}", asm);
        assert!(asm.contains("main:"), "{}", asm);
        assert!(asm.contains("  call print"), "{}", asm);
    }

    #[test]
    fn errors_carry_their_stage() {
        assert!(matches!(
            compile("func main() { let x: int = 'ab'; }"),
            Err(CompileError::Lex(LexError::CharLiteralTooLong { line: 1 }))
        ));
        assert!(matches!(
            compile("func main() { y = 1; }"),
            Err(CompileError::Parse(ParseError::UndeclaredVariable { .. }))
        ));
        assert!(matches!(
            compile("func main() { let b: int = 1 < 2; }"),
            Err(CompileError::Codegen(CodegenError::UnimplementedOp { .. }))
        ));
    }

    #[test]
    fn diagnostics_render_with_line_numbers() {
        let err = compile("func main() {\n    let x: int = 1;\n    let x: int = 2;\n}")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "redeclaration of \"x\" at line 3\n\"x\" was first defined at line 2"
        );
    }
}
