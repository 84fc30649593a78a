//! Code generation: lower the resolved AST into AT&T 32-bit x86 assembly.
//!
//! The emitter is a stack machine: every expression leaves one value on the
//! stack, binary operators pop two values and push the result, statements
//! pop what they consume. Locals live on the stack frame addressed relative
//! to `%ebp`; their offsets are assigned by a frame-layout pass before any
//! code is emitted.

use crate::ast::parser::Program;
use crate::ast::{Ast, AstNode, BinOp, NodeRef};
use crate::error::CodegenError;
use crate::symbol::Symbols;

macro_rules! emit {
    ($self:expr, $($arg:tt)*) => {{
        $self.out.push_str(&format!($($arg)*));
        $self.out.push('\n');
    }};
}

/// Emit assembly for a whole program
///
/// Variable stack offsets are written into the symbol pool as a side
/// effect of frame layout
pub fn generate(program: &mut Program) -> Result<String, CodegenError> {
    let frame_sizes: Vec<usize> = program
        .ast
        .root_nodes
        .iter()
        .map(|&func| layout_frame(&program.ast, &mut program.symbols, func))
        .collect();

    let mut codegen = Codegen {
        ast: &program.ast,
        symbols: &program.symbols,
        out: String::new(),
    };
    codegen.gen_data();
    codegen.gen_text(&frame_sizes)?;
    Ok(codegen.out)
}

/// Sum the slot sizes of every declaration in the function body and assign
/// each variable its offset as the running negative total
///
/// The walk is textual order, not scope-aware: a declaration inside a
/// nested `if`/`while` block still consumes frame space even after its
/// name goes out of scope
fn layout_frame(ast: &Ast, symbols: &mut Symbols, func: NodeRef) -> usize {
    let mut stack_size = 0usize;
    if let AstNode::FnDef { body, .. } = ast.node(func).inner() {
        layout_block(ast, symbols, body, &mut stack_size);
    }
    stack_size
}

fn layout_block(ast: &Ast, symbols: &mut Symbols, stmts: &[NodeRef], stack_size: &mut usize) {
    for &stmt in stmts {
        match ast.node(stmt).inner() {
            AstNode::Let { var, .. } => {
                let size = symbols[*var].var_type().map_or(0, |ty| ty.size);
                *stack_size += size;
                symbols.set_offset(*var, -(*stack_size as i32));
            }
            AstNode::If {
                then_block,
                else_block,
                ..
            } => {
                layout_block(ast, symbols, then_block, stack_size);
                if let Some(else_block) = else_block {
                    layout_block(ast, symbols, else_block, stack_size);
                }
            }
            AstNode::While { body, .. } => {
                layout_block(ast, symbols, body, stack_size);
            }
            _ => (),
        }
    }
}

struct Codegen<'a, 'src> {
    ast: &'a Ast,
    symbols: &'a Symbols<'src>,
    out: String,
}

impl<'a, 'src> Codegen<'a, 'src> {
    fn gen_data(&mut self) {
        emit!(self, ".section .data");
        emit!(self, "msg:");
        emit!(self, "  .asciz \"hello, friends :^)\\n\"");
        emit!(self, "number_formatter:");
        emit!(self, "  .asciz \"%d\\n\"");
        emit!(self, "");
    }

    fn gen_text(&mut self, frame_sizes: &[usize]) -> Result<(), CodegenError> {
        emit!(self, ".section .text");
        self.gen_runtime_print();
        for (&func, &frame_size) in self.ast.root_nodes.iter().zip(frame_sizes) {
            self.gen_func(func, frame_size)?;
        }
        Ok(())
    }

    /// The runtime routine behind the built-in `print`: takes one integer
    /// stack argument and prints it through `number_formatter`
    fn gen_runtime_print(&mut self) {
        emit!(self, ".type print, @function");
        emit!(self, ".globl print");
        emit!(self, "print:");
        emit!(self, "  pushl %ebp");
        emit!(self, "  movl %esp, %ebp");
        emit!(self, "  pushl 8(%ebp)");
        emit!(self, "  pushl $number_formatter");
        emit!(self, "  call printf");
        emit!(self, "  add $8, %esp");
        emit!(self, "  movl %ebp, %esp");
        emit!(self, "  popl %ebp");
        emit!(self, "  ret");
        emit!(self, "");
    }

    fn gen_func(&mut self, func: NodeRef, frame_size: usize) -> Result<(), CodegenError> {
        let AstNode::FnDef { func: sym, body, .. } = self.ast.node(func).inner() else {
            return Ok(());
        };
        let name = self.symbols[*sym].name;

        emit!(self, ".type {}, @function", name);
        emit!(self, ".globl {}", name);
        emit!(self, "{}:", name);

        // prologue
        emit!(self, "  pushl %ebp");
        emit!(self, "  movl %esp, %ebp");
        if frame_size > 0 {
            emit!(self, "  subl ${}, %esp", frame_size);
        }

        // every kat program greets on entry
        if name == "main" {
            emit!(self, "  push $msg");
            emit!(self, "  call printf");
            emit!(self, "  add $4, %esp");
        }

        self.gen_block(body)?;

        // epilogue; also rebalances anything expression statements left on
        // the stack
        emit!(self, "  movl %ebp, %esp");
        emit!(self, "  popl %ebp");
        emit!(self, "  ret");
        Ok(())
    }

    fn gen_block(&mut self, stmts: &[NodeRef]) -> Result<(), CodegenError> {
        for &stmt in stmts {
            match self.ast.node(stmt).inner() {
                AstNode::Let { var, init } => {
                    if let Some(init) = init {
                        self.gen_expr(*init)?;
                        emit!(self, "  popl %eax");
                        emit!(self, "  movl %eax, {}(%ebp)", self.symbols[*var].offset());
                    }
                }
                AstNode::Assign { target, value } => {
                    self.gen_expr(*value)?;
                    emit!(self, "  popl %eax");
                    emit!(self, "  movl %eax, {}(%ebp)", self.symbols[*target].offset());
                }
                AstNode::ExprStmt(expr) => {
                    self.gen_expr(*expr)?;
                }
                AstNode::If { .. } => self.gen_if_stmt(stmt),
                AstNode::While { .. } => self.gen_while_stmt(stmt),
                AstNode::Return(value) => {
                    self.gen_expr(*value)?;
                    emit!(self, "  popl %eax");
                    emit!(self, "  movl %ebp, %esp");
                    emit!(self, "  popl %ebp");
                    emit!(self, "  ret");
                }
                other => unreachable!("non-statement node in block: {:?}", other),
            }
        }
        Ok(())
    }

    // TODO: lower the condition, branch over the taken block, wire up the
    // else block
    fn gen_if_stmt(&mut self, _node: NodeRef) {}

    // TODO: lower the condition, loop label, back edge
    fn gen_while_stmt(&mut self, _node: NodeRef) {}

    fn gen_expr(&mut self, node: NodeRef) -> Result<(), CodegenError> {
        let line = self.ast.node(node).span().line;
        match self.ast.node(node).inner() {
            AstNode::Num(value) => {
                emit!(self, "  pushl ${}", value);
            }
            AstNode::Var(id) => {
                emit!(self, "  pushl {}(%ebp)", self.symbols[*id].offset());
            }
            AstNode::Call(..) => self.gen_fncall(node)?,
            AstNode::Unary(..) => {
                // no grammar rule produces these yet
                return Err(CodegenError::UnimplementedOp {
                    op: "unary sign",
                    line,
                });
            }
            AstNode::Binary(op, lhs, rhs) => {
                self.gen_expr(*lhs)?;
                self.gen_expr(*rhs)?;
                emit!(self, "  popl %edi");
                emit!(self, "  popl %eax");
                match op {
                    BinOp::Add => emit!(self, "  addl %edi, %eax"),
                    BinOp::Sub => emit!(self, "  subl %edi, %eax"),
                    BinOp::Mul => emit!(self, "  imull %edi, %eax"),
                    BinOp::Div => {
                        emit!(self, "  cltd");
                        emit!(self, "  idivl %edi");
                    }
                    BinOp::LogAnd
                    | BinOp::LogOr
                    | BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Lt
                    | BinOp::Le
                    | BinOp::Gt
                    | BinOp::Ge => {
                        return Err(CodegenError::UnimplementedOp {
                            op: op.text(),
                            line,
                        });
                    }
                }
                emit!(self, "  pushl %eax");
            }
            other => unreachable!("statement node in expression position: {:?}", other),
        }
        Ok(())
    }

    /// Only the built-in `print` lowers today; it takes its single argument
    /// on the stack
    fn gen_fncall(&mut self, node: NodeRef) -> Result<(), CodegenError> {
        let line = self.ast.node(node).span().line;
        let AstNode::Call(func, args) = self.ast.node(node).inner() else {
            return Ok(());
        };
        let name = self.symbols[*func].name;
        if name == "print" {
            if let Some(&arg) = args.first() {
                self.gen_expr(arg)?;
            }
            emit!(self, "  call print");
            Ok(())
        } else {
            // TODO: argument passing and a real calling convention for
            // user-defined functions
            Err(CodegenError::UnimplementedCall {
                name: name.to_string(),
                line,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::parser::parse;
    use crate::token::tokenizer::lex;

    fn compile(source: &str) -> Result<String, CodegenError> {
        let tokens = lex(source).unwrap();
        let mut program = parse(tokens).unwrap();
        generate(&mut program)
    }

    #[test]
    fn end_to_end_main_program() {
        let asm = compile("func main() { let x: int = 1 + 2; print(x); return 0; }").unwrap();

        // frame reservation covers x's slot
        assert!(asm.contains("main:"), "{}", asm);
        assert!(asm.contains("  subl $4, %esp"), "{}", asm);

        // x's value is pushed before invoking the print routine
        assert!(asm.contains("  pushl -4(%ebp)\n  call print"), "{}", asm);

        // initializer is computed on the stack and stored to x
        assert!(asm.contains("  pushl $1\n  pushl $2\n"), "{}", asm);
        assert!(asm.contains("  movl %eax, -4(%ebp)"), "{}", asm);

        // standard epilogue
        assert!(asm.contains("  movl %ebp, %esp\n  popl %ebp\n  ret"), "{}", asm);
    }

    #[test]
    fn main_greets_on_entry() {
        let asm = compile("func main() { return 0; }").unwrap();
        assert!(asm.contains("  push $msg\n  call printf\n  add $4, %esp"), "{}", asm);
        assert!(asm.contains(".asciz \"hello, friends :^)\\n\""), "{}", asm);

        let other = compile("func helper() { return 0; }").unwrap();
        assert!(!other.contains("push $msg"), "{}", other);
    }

    #[test]
    fn runtime_print_routine_is_always_present() {
        let asm = compile("func main() { return 0; }").unwrap();
        assert!(asm.contains(".globl print"), "{}", asm);
        assert!(asm.contains("  pushl 8(%ebp)\n  pushl $number_formatter\n  call printf"), "{}", asm);
    }

    #[test]
    fn frame_layout_is_textual_order_not_scope_aware() {
        let source = "func main() {
    let x: int = 1;
    if 1 {
        let x: int = 2;
        x = 3;
    }
    x = 4;
}";
        let tokens = lex(source).unwrap();
        let mut program = parse(tokens).unwrap();
        let asm = generate(&mut program).unwrap();

        // both slots are reserved even though the inner x dies with its
        // block, and the shadowed variable got its own offset
        assert!(asm.contains("  subl $8, %esp"), "{}", asm);
        let root = program.ast.root_nodes[0];
        let AstNode::FnDef { body, .. } = program.ast.node(root).inner() else {
            panic!("root is not a function");
        };
        let AstNode::Let { var: outer, .. } = program.ast.node(body[0]).inner() else {
            panic!("expected outer declaration");
        };
        let AstNode::If { then_block, .. } = program.ast.node(body[1]).inner() else {
            panic!("expected if statement");
        };
        let AstNode::Let { var: inner, .. } = program.ast.node(then_block[0]).inner() else {
            panic!("expected inner declaration");
        };
        assert_eq!(program.symbols[*outer].offset(), -4);
        assert_eq!(program.symbols[*inner].offset(), -8);

        // the if body itself is not lowered yet, so only the outer
        // assignments reach the output
        assert!(asm.contains("  movl %eax, -4(%ebp)"), "{}", asm);
        assert!(!asm.contains("-8(%ebp)"), "{}", asm);
    }

    #[test]
    fn division_uses_sign_extended_32_bit_sequence() {
        let asm = compile("func main() { let x: int = 8 / 2; }").unwrap();
        assert!(asm.contains("  popl %edi\n  popl %eax\n  cltd\n  idivl %edi"), "{}", asm);
    }

    #[test]
    fn if_and_while_lower_to_nothing_yet() {
        let asm = compile("func main() { let x: int = 1; while 1 { x = 2; } }").unwrap();
        // the condition is not lowered and no branching is emitted
        assert!(!asm.contains("cmp"), "{}", asm);
        assert!(!asm.contains("jmp"), "{}", asm);
    }

    #[test]
    fn comparison_in_expression_is_a_hard_error() {
        assert_eq!(
            compile("func main() { let x: int = 1 == 2; }").unwrap_err(),
            CodegenError::UnimplementedOp { op: "==", line: 1 }
        );
        assert_eq!(
            compile("func main() { let x: int = 1 && 2; }").unwrap_err(),
            CodegenError::UnimplementedOp { op: "&&", line: 1 }
        );
    }

    #[test]
    fn call_to_user_function_is_a_hard_error() {
        assert_eq!(
            compile("func f() { return 0; }\nfunc main() { f(); }").unwrap_err(),
            CodegenError::UnimplementedCall {
                name: "f".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn uninitialized_declaration_reserves_but_stores_nothing() {
        let asm = compile("func main() { let x: int; }").unwrap();
        assert!(asm.contains("  subl $4, %esp"), "{}", asm);
        assert!(!asm.contains("movl %eax, -4(%ebp)"), "{}", asm);
    }
}
