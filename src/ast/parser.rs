//! Single-pass parser for kat
//!
//! Every identifier reference is resolved against the scope stack while the
//! tree is built; there is no separate semantic-analysis phase. The grammar:
//!
//! ```text
//! program      = {function} ;
//! function     = "func" identifier "(" [param {"," param}] ")" ["=>" type] block ;
//! param        = identifier ":" type ;
//! block        = "{" {statement} "}" ;
//! statement    = decl_stmt | if_stmt | while_stmt | return_stmt | expr_stmt ;
//! decl_stmt    = "let" identifier ":" type ["=" expression] ";" ;
//! if_stmt      = "if" expression block ["else" block] ;
//! while_stmt   = "while" expression block ;
//! return_stmt  = "return" expression ";" ;
//! expr_stmt    = [identifier "="] expression ";" ;
//! expression   = primary {binary_op primary} | "(" expression ")" ;
//! ```

use crate::ast::{Ast, AstNode, BinOp, NodeRef};
use crate::error::location::{Span, Traced};
use crate::error::ParseError;
use crate::scope::Scopes;
use crate::symbol::{Symbol, Symbols, Type, TypeKind};
use crate::token::{NumValue, Token};

/// A parsed compilation unit: the tree plus the symbol pool its nodes
/// refer into
#[derive(Debug, Clone)]
pub struct Program<'src> {
    pub ast: Ast,
    pub symbols: Symbols<'src>,
}

/// Entry on the operator stack of the expression engine
#[derive(Debug, Clone, Copy)]
enum OpEntry {
    /// Sentinel for an open parenthesis; discarded by the matching close
    /// paren, never reduced
    LParen(Span),
    Bin(BinOp, Span),
}

struct Parser<'src> {
    tokens: Vec<Traced<Token<'src>>>,
    pos: usize,
    ast: Ast,
    symbols: Symbols<'src>,
    scopes: Scopes<'src>,
}

/// Parse a token stream into a `Program`
///
/// The stream must be `Eof`-terminated, as produced by `tokenizer::lex`.
/// Parsing is fail-fast: the first syntax or resolution error aborts.
pub fn parse(tokens: Vec<Traced<Token<'_>>>) -> Result<Program<'_>, ParseError> {
    Parser::new(tokens).run()
}

impl<'src> Parser<'src> {
    fn new(tokens: Vec<Traced<Token<'src>>>) -> Self {
        debug_assert!(matches!(tokens.last().map(Traced::inner), Some(Token::Eof)));
        let mut parser = Self {
            tokens,
            pos: 0,
            ast: Ast::default(),
            symbols: Symbols::default(),
            scopes: Scopes::default(),
        };
        parser.seed_builtins();
        parser
    }

    /// Register the runtime built-ins before any user code is parsed
    ///
    /// `print` takes one int and returns nothing; its body is supplied by
    /// the code generator, so programs can call it without defining it
    fn seed_builtins(&mut self) {
        let span = Span::new(0, 0, 0);
        let id = self.symbols.add(Symbol::func(
            "print",
            span,
            Type::nil(),
            vec![Type::of(TypeKind::Int)],
        ));
        self.scopes.declare_func("print", id);
    }

    fn run(mut self) -> Result<Program<'src>, ParseError> {
        while !self.current().is_eof() {
            let func = self.parse_func()?;
            self.ast.root_nodes.push(func);
        }
        Ok(Program {
            ast: self.ast,
            symbols: self.symbols,
        })
    }

    // --- Token cursor

    fn current(&self) -> &Traced<Token<'src>> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Traced<Token<'src>> {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn line(&self) -> usize {
        self.current().span().line
    }

    /// Advance the cursor; the final `Eof` token is never stepped over
    fn advance(&mut self) {
        if !self.current().is_eof() {
            self.pos += 1;
        }
    }

    /// Consume the current token if it matches, otherwise do nothing
    fn consume(&mut self, expected: Token) -> bool {
        if *self.current().inner() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it matches, otherwise fail with an
    /// expected-X-found-Y diagnostic
    fn expect(&mut self, expected: Token, what: &'static str) -> Result<Span, ParseError> {
        let span = self.current().span();
        if *self.current().inner() == expected {
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::ExpectedToken {
                expected: what,
                found: self.current().to_string(),
                line: span.line,
            })
        }
    }

    /// Consume the current token as an identifier
    fn expect_identifier(&mut self, what: &'static str) -> Result<(&'src str, Span), ParseError> {
        let span = self.current().span();
        match self.current().expect_identifier() {
            Some(name) => {
                self.advance();
                Ok((name, span))
            }
            None => Err(ParseError::ExpectedToken {
                expected: what,
                found: self.current().to_string(),
                line: span.line,
            }),
        }
    }

    // --- Declarations

    /// function = "func" identifier "(" [param {"," param}] ")" ["=>" type] block ;
    fn parse_func(&mut self) -> Result<NodeRef, ParseError> {
        self.expect(Token::Func, "`func`")?;
        let (name, name_span) = self.expect_identifier("function name")?;

        // parameters and body locals share one scope; the body block below
        // does not open another one
        self.scopes.enter_block();

        let mut params = Vec::new();
        let mut param_types = Vec::new();
        self.expect(Token::RoundParenOpen, "`(`")?;
        if !self.consume(Token::RoundParenClose) {
            loop {
                let (param_name, param_span) = self.expect_identifier("parameter name")?;
                self.expect(Token::Colon, "`:`")?;
                let ty = self.parse_type()?;

                if let Some(first) = self.scopes.declared_in_current(param_name) {
                    return Err(ParseError::Redeclaration {
                        name: param_name.to_string(),
                        line: param_span.line,
                        first_line: self.symbols[first].decl_line(),
                    });
                }
                let id = self.symbols.add(Symbol::var(param_name, param_span, ty));
                self.scopes.declare_var(param_name, id);
                params.push(id);
                param_types.push(ty);

                if self.consume(Token::RoundParenClose) {
                    break;
                }
                self.expect(Token::Comma, "`)` or `,`")?;
            }
        }

        let return_type = if self.consume(Token::FatArrow) {
            self.parse_type()?
        } else {
            Type::nil()
        };

        // the function registers before its body parses, so a recursive
        // call inside the body resolves; a call to a function defined
        // further down the file does not
        if let Some(first) = self.scopes.lookup_func(name) {
            return Err(ParseError::Redeclaration {
                name: name.to_string(),
                line: name_span.line,
                first_line: self.symbols[first].decl_line(),
            });
        }
        let func_id = self
            .symbols
            .add(Symbol::func(name, name_span, return_type, param_types));
        self.scopes.declare_func(name, func_id);

        let body = self.parse_block(false)?;
        self.scopes.leave_block();

        let node = AstNode::FnDef {
            func: func_id,
            params,
            body,
        };
        Ok(self.ast.add_node(Traced::new(node, name_span)))
    }

    /// Read the current token as a type annotation
    ///
    /// Only the four concrete primitives are valid; `float` is reserved
    /// but not yet a usable type
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let token = self.current();
        let span = token.span();
        let kind = match token.inner() {
            Token::Int => TypeKind::Int,
            Token::Char => TypeKind::Char,
            Token::Str => TypeKind::Str,
            Token::Bool => TypeKind::Bool,
            t if t.is_keyword() || t.expect_identifier().is_some() => {
                return Err(ParseError::UnknownType {
                    name: t.to_string(),
                    line: span.line,
                })
            }
            t => {
                return Err(ParseError::ExpectedToken {
                    expected: "type name",
                    found: t.to_string(),
                    line: span.line,
                })
            }
        };
        self.advance();
        Ok(Type::of(kind))
    }

    // --- Statements

    /// block = "{" {statement} "}" ;
    ///
    /// `new_scope` is false for function bodies, which reuse the parameter
    /// scope opened by `parse_func`
    fn parse_block(&mut self, new_scope: bool) -> Result<Vec<NodeRef>, ParseError> {
        self.expect(Token::BraceOpen, "`{`")?;
        if new_scope {
            self.scopes.enter_block();
        }

        let mut stmts = Vec::new();
        while !self.consume(Token::BraceClose) {
            if self.current().is_eof() {
                return Err(ParseError::ExpectedToken {
                    expected: "`}`",
                    found: self.current().to_string(),
                    line: self.line(),
                });
            }
            stmts.push(self.parse_stmt()?);
        }

        if new_scope {
            self.scopes.leave_block();
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<NodeRef, ParseError> {
        match self.current().inner() {
            Token::Let => self.parse_decl_stmt(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Return => self.parse_return(),
            _ => self.parse_expr_stmt(),
        }
    }

    /// decl_stmt = "let" identifier ":" type ["=" expression] ";" ;
    fn parse_decl_stmt(&mut self) -> Result<NodeRef, ParseError> {
        self.expect(Token::Let, "`let`")?;
        let (name, name_span) = self.expect_identifier("variable name")?;
        self.expect(Token::Colon, "`:`")?;

        // same-scope duplicates and function names are redeclarations;
        // a name from an outer block is shadowed instead
        if let Some(first) = self.scopes.declared_in_current(name) {
            return Err(ParseError::Redeclaration {
                name: name.to_string(),
                line: name_span.line,
                first_line: self.symbols[first].decl_line(),
            });
        }
        if let Some(first) = self.scopes.lookup_func(name) {
            return Err(ParseError::FunctionAsVariable {
                name: name.to_string(),
                line: name_span.line,
                first_line: self.symbols[first].decl_line(),
            });
        }

        let ty = self.parse_type()?;
        let id = self.symbols.add(Symbol::var(name, name_span, ty));
        self.scopes.declare_var(name, id);

        let init = if self.consume(Token::Eq) {
            // TODO: type checking
            // * whether the initializer type is consistent with the
            //   declared type
            Some(self.parse_expr(None)?)
        } else {
            None
        };
        self.expect(Token::Semicolon, "`;`")?;

        let node = AstNode::Let { var: id, init };
        Ok(self.ast.add_node(Traced::new(node, name_span)))
    }

    /// if_stmt = "if" expression block ["else" block] ;
    fn parse_if(&mut self) -> Result<NodeRef, ParseError> {
        let span = self.expect(Token::If, "`if`")?;
        let cond = self.parse_expr(None)?;
        let then_block = self.parse_block(true)?;
        let else_block = if self.consume(Token::Else) {
            Some(self.parse_block(true)?)
        } else {
            None
        };
        let node = AstNode::If {
            cond,
            then_block,
            else_block,
        };
        Ok(self.ast.add_node(Traced::new(node, span)))
    }

    /// while_stmt = "while" expression block ;
    fn parse_while(&mut self) -> Result<NodeRef, ParseError> {
        let span = self.expect(Token::While, "`while`")?;
        let cond = self.parse_expr(None)?;
        let body = self.parse_block(true)?;
        let node = AstNode::While { cond, body };
        Ok(self.ast.add_node(Traced::new(node, span)))
    }

    /// return_stmt = "return" expression ";" ;
    fn parse_return(&mut self) -> Result<NodeRef, ParseError> {
        let span = self.expect(Token::Return, "`return`")?;
        let value = self.parse_expr(None)?;
        self.expect(Token::Semicolon, "`;`")?;
        let node = AstNode::Return(value);
        Ok(self.ast.add_node(Traced::new(node, span)))
    }

    /// expr_stmt = [identifier "="] expression ";" ;
    ///
    /// kat has no compound assignment and no assignment inside
    /// expressions; an assignment is a statement form with a plain
    /// identifier on the left
    fn parse_expr_stmt(&mut self) -> Result<NodeRef, ParseError> {
        if let Some(name) = self.current().expect_identifier() {
            if *self.peek_next().inner() == Token::Eq {
                let name_span = self.current().span();
                let target = match self.scopes.lookup_var(name) {
                    Some(id) => id,
                    None => {
                        if self.scopes.lookup_func(name).is_some() {
                            return Err(ParseError::NotAssignable {
                                name: name.to_string(),
                                line: name_span.line,
                            });
                        }
                        return Err(ParseError::UndeclaredVariable {
                            name: name.to_string(),
                            line: name_span.line,
                        });
                    }
                };
                self.advance();
                self.advance();

                let value = self.parse_expr(None)?;
                self.expect(Token::Semicolon, "`;`")?;

                let node = AstNode::Assign { target, value };
                return Ok(self.ast.add_node(Traced::new(node, name_span)));
            }
        }

        let span = self.current().span();
        let expr = self.parse_expr(None)?;
        self.expect(Token::Semicolon, "`;`")?;
        let node = AstNode::ExprStmt(expr);
        Ok(self.ast.add_node(Traced::new(node, span)))
    }

    // --- Expressions

    /// expression = primary {binary_op primary} | "(" expression ")" ;
    ///
    /// Operator-precedence parsing with two explicit stacks. The scan runs
    /// until `,`, `{`, `;`, end of input, or the caller-supplied `end`
    /// token index that bounds a call argument. An incoming operator first
    /// reduces every stacked operator of greater or equal precedence
    /// (equal precedence therefore groups left-to-right), then pushes
    /// itself.
    fn parse_expr(&mut self, end: Option<usize>) -> Result<NodeRef, ParseError> {
        let mut operands: Vec<NodeRef> = Vec::new();
        let mut operators: Vec<OpEntry> = Vec::new();
        let start_line = self.line();

        loop {
            if end == Some(self.pos) {
                break;
            }
            let span = self.current().span();
            match *self.current().inner() {
                Token::Comma | Token::BraceOpen | Token::Semicolon | Token::Eof => break,

                Token::RoundParenOpen => {
                    operators.push(OpEntry::LParen(span));
                    self.advance();
                }

                Token::RoundParenClose => {
                    loop {
                        match operators.pop() {
                            None => {
                                return Err(ParseError::MismatchedParens { line: span.line })
                            }
                            Some(OpEntry::LParen(_)) => break,
                            Some(OpEntry::Bin(op, op_span)) => {
                                self.reduce(&mut operands, op, op_span)?
                            }
                        }
                    }
                    self.advance();
                }

                Token::Number(NumValue::I(value)) => {
                    operands.push(self.ast.add_node(Traced::new(AstNode::Num(value), span)));
                    self.advance();
                }
                // expressions only carry integer values so far; a float
                // literal has nowhere to go
                Token::Number(NumValue::F(_)) => {
                    return Err(ParseError::UnexpectedToken {
                        found: self.current().to_string(),
                        line: span.line,
                    })
                }

                Token::Identifier(name) => {
                    if *self.peek_next().inner() == Token::RoundParenOpen {
                        let call = self.parse_fncall()?;
                        operands.push(call);
                    } else {
                        let id = self.scopes.lookup_var(name).ok_or_else(|| {
                            ParseError::UndeclaredVariable {
                                name: name.to_string(),
                                line: span.line,
                            }
                        })?;
                        operands.push(self.ast.add_node(Traced::new(AstNode::Var(id), span)));
                        self.advance();
                    }
                }

                ref token => {
                    let op = bin_op_of(token).ok_or_else(|| ParseError::UnexpectedToken {
                        found: token.to_string(),
                        line: span.line,
                    })?;
                    loop {
                        match operators.last() {
                            Some(&OpEntry::Bin(top, top_span))
                                if top.precedence() >= op.precedence() =>
                            {
                                operators.pop();
                                self.reduce(&mut operands, top, top_span)?;
                            }
                            _ => break,
                        }
                    }
                    operators.push(OpEntry::Bin(op, span));
                    self.advance();
                }
            }
        }

        // drain whatever is still stacked; a leftover sentinel means a
        // parenthesis was never closed
        while let Some(entry) = operators.pop() {
            match entry {
                OpEntry::LParen(span) => {
                    return Err(ParseError::MismatchedParens { line: span.line })
                }
                OpEntry::Bin(op, op_span) => self.reduce(&mut operands, op, op_span)?,
            }
        }

        if operands.len() == 1 {
            Ok(operands[0])
        } else {
            Err(ParseError::InvalidExpression { line: start_line })
        }
    }

    /// Pop two operands and one operator, push the combined node
    ///
    /// Reduction is strictly binary; an operator in unary position runs
    /// the operand stack dry and is rejected here
    fn reduce(
        &mut self,
        operands: &mut Vec<NodeRef>,
        op: BinOp,
        op_span: Span,
    ) -> Result<(), ParseError> {
        let underflow = ParseError::InvalidExpression { line: op_span.line };
        let rhs = operands.pop().ok_or_else(|| underflow.clone())?;
        let lhs = operands.pop().ok_or(underflow)?;

        // TODO: type checking
        // * whether lhs and rhs have consistent types
        // * whether the operand types of op match lhs and rhs

        let span = self.ast.node(lhs).span().merge(self.ast.node(rhs).span());
        operands.push(
            self.ast
                .add_node(Traced::new(AstNode::Binary(op, lhs, rhs), span)),
        );
        Ok(())
    }

    /// function-call = identifier "(" [expression {"," expression}] ")" ;
    ///
    /// The callee resolves against the function table at parse time; the
    /// argument list is bounded by the matching close paren so nested
    /// parenthesized arguments parse correctly
    fn parse_fncall(&mut self) -> Result<NodeRef, ParseError> {
        let (name, name_span) = self.expect_identifier("function name")?;
        if self.scopes.lookup_var(name).is_some() {
            return Err(ParseError::NotCallable {
                name: name.to_string(),
                line: name_span.line,
            });
        }
        let func = self
            .scopes
            .lookup_func(name)
            .ok_or_else(|| ParseError::UndeclaredFunction {
                name: name.to_string(),
                line: name_span.line,
            })?;

        let open = self.pos;
        self.expect(Token::RoundParenOpen, "`(`")?;
        let close = self.find_matching_paren(open)?;

        // TODO: check that the argument types match the parameter types

        let mut args = Vec::new();
        if self.pos != close {
            loop {
                args.push(self.parse_expr(Some(close))?);
                if !self.consume(Token::Comma) {
                    break;
                }
            }
        }
        let close_span = self.expect(Token::RoundParenClose, "`)`")?;

        let node = AstNode::Call(func, args);
        Ok(self
            .ast
            .add_node(Traced::new(node, name_span.merge(close_span))))
    }

    /// Index of the close paren matching the open paren at `open`,
    /// found with a counting scan that handles nesting
    fn find_matching_paren(&self, open: usize) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            match self.tokens[i].inner() {
                Token::RoundParenOpen => depth += 1,
                Token::RoundParenClose => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                Token::Eof => break,
                _ => (),
            }
        }
        Err(ParseError::ExpectedToken {
            expected: "`)`",
            found: Token::Eof.to_string(),
            line: self.tokens[open].span().line,
        })
    }
}

/// Classify a token as a binary operator
///
/// The operator vocabulary also contains the unary signs (`UnaryOp`), but
/// the grammar never asks for them: a sign directly before a digit is
/// folded into the number literal by the tokenizer, and any other unary
/// position fails reduction
fn bin_op_of(token: &Token) -> Option<BinOp> {
    let op = match token {
        Token::Add => BinOp::Add,
        Token::Sub => BinOp::Sub,
        Token::Mul => BinOp::Mul,
        Token::Div => BinOp::Div,
        Token::AndAnd => BinOp::LogAnd,
        Token::OrOr => BinOp::LogOr,
        Token::EqEq => BinOp::Eq,
        Token::ExcEq => BinOp::Ne,
        Token::Le => BinOp::Lt,
        Token::LeEq => BinOp::Le,
        Token::Gr => BinOp::Gt,
        Token::GrEq => BinOp::Ge,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::token::tokenizer::lex;

    fn parse_source(source: &str) -> Result<Program<'_>, ParseError> {
        parse(lex(source).unwrap())
    }

    /// Render an expression sub-tree as an s-expression for shape asserts
    fn sexpr(program: &Program, node: NodeRef) -> String {
        match program.ast.node(node).inner() {
            AstNode::Num(n) => n.to_string(),
            AstNode::Var(id) => program.symbols[*id].name.to_string(),
            AstNode::Binary(op, lhs, rhs) => format!(
                "({} {} {})",
                op.text(),
                sexpr(program, *lhs),
                sexpr(program, *rhs)
            ),
            AstNode::Call(id, args) => {
                let mut s = format!("(call {}", program.symbols[*id].name);
                for arg in args {
                    s.push(' ');
                    s.push_str(&sexpr(program, *arg));
                }
                s.push(')');
                s
            }
            other => panic!("not an expression node: {:?}", other),
        }
    }

    /// Parse `expr` as the initializer of a declaration and render it
    fn init_sexpr(expr: &str) -> String {
        let source = format!("func main() {{ let x: int = {}; }}", expr);
        let program = parse_source(&source).unwrap();
        let root = program.ast.root_nodes[0];
        let AstNode::FnDef { body, .. } = program.ast.node(root).inner() else {
            panic!("root is not a function");
        };
        let AstNode::Let {
            init: Some(init), ..
        } = program.ast.node(body[0]).inner()
        else {
            panic!("first statement is not an initialized declaration");
        };
        sexpr(&program, *init)
    }

    fn parse_err(source: &str) -> ParseError {
        parse_source(source).unwrap_err()
    }

    #[test]
    fn precedence_binds_mul_tighter_than_add() {
        assert_eq!(init_sexpr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(init_sexpr("1 * 2 + 3"), "(+ (* 1 2) 3)");
    }

    #[test]
    fn equal_precedence_is_left_associative() {
        assert_eq!(init_sexpr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(init_sexpr("8 / 4 / 2"), "(/ (/ 8 4) 2)");
    }

    #[test]
    fn parens_group_before_precedence() {
        assert_eq!(init_sexpr("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    }

    #[test]
    fn comparisons_bind_looser_than_arithmetic() {
        assert_eq!(init_sexpr("1 + 2 == 3"), "(== (+ 1 2) 3)");
        assert_eq!(init_sexpr("1 < 2 && 3 < 4"), "(&& (< 1 2) (< 3 4))");
    }

    #[test]
    fn unmatched_open_paren_is_rejected() {
        assert_eq!(
            parse_err("func main() { let x: int = (1 + 2; }"),
            ParseError::MismatchedParens { line: 1 }
        );
    }

    #[test]
    fn unmatched_close_paren_is_rejected() {
        assert_eq!(
            parse_err("func main() { let x: int = 1 + 2); }"),
            ParseError::MismatchedParens { line: 1 }
        );
    }

    #[test]
    fn operator_in_unary_position_is_rejected() {
        // `- x` cannot fold into a literal, and reduction is binary-only
        let err = parse_err("func main() { let x: int = 1; let y: int = -x; }");
        assert_eq!(err, ParseError::InvalidExpression { line: 1 });
    }

    #[test]
    fn undeclared_variable_reference() {
        assert_eq!(
            parse_err("func main() {\n    y = 1;\n}"),
            ParseError::UndeclaredVariable {
                name: "y".to_string(),
                line: 2,
            }
        );
        assert_eq!(
            parse_err("func main() { let x: int = y; }"),
            ParseError::UndeclaredVariable {
                name: "y".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn undeclared_function_call() {
        assert_eq!(
            parse_err("func main() { foo(); }"),
            ParseError::UndeclaredFunction {
                name: "foo".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn forward_reference_is_rejected_but_recursion_parses() {
        assert_eq!(
            parse_err("func main() { later(); }\nfunc later() { }"),
            ParseError::UndeclaredFunction {
                name: "later".to_string(),
                line: 1,
            }
        );
        assert!(parse_source("func f() { f(); }").is_ok());
    }

    #[test]
    fn variable_is_not_callable() {
        assert_eq!(
            parse_err("func main() { let x: int = 1; x(); }"),
            ParseError::NotCallable {
                name: "x".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn function_is_not_assignable() {
        assert_eq!(
            parse_err("func f() { }\nfunc main() { f = 1; }"),
            ParseError::NotAssignable {
                name: "f".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn same_scope_redeclaration_reports_first_definition() {
        assert_eq!(
            parse_err("func main() {\n    let x: int = 1;\n    let x: int = 2;\n}"),
            ParseError::Redeclaration {
                name: "x".to_string(),
                line: 3,
                first_line: 2,
            }
        );
    }

    #[test]
    fn parameter_redeclaration_is_rejected() {
        assert_eq!(
            parse_err("func f(a: int, a: int) { }"),
            ParseError::Redeclaration {
                name: "a".to_string(),
                line: 1,
                first_line: 1,
            }
        );
        // the body shares the parameter scope, so this is a redeclaration
        // rather than shadowing
        assert!(matches!(
            parse_err("func f(a: int) { let a: int = 1; }"),
            ParseError::Redeclaration { .. }
        ));
    }

    #[test]
    fn nested_blocks_shadow_and_restore() {
        let source = "func main() {
    let x: int = 1;
    if 1 {
        let x: int = 2;
        x = 3;
    }
    x = 4;
}";
        let program = parse_source(source).unwrap();
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
        let AstNode::Assign {
            target: inner_target,
            ..
        } = program.ast.node(then_block[1]).inner()
        else {
            panic!("expected inner assignment");
        };
        let AstNode::Assign {
            target: outer_target,
            ..
        } = program.ast.node(body[2]).inner()
        else {
            panic!("expected outer assignment");
        };

        assert_ne!(outer, inner);
        assert_eq!(inner_target, inner);
        assert_eq!(outer_target, outer);
        assert_eq!(program.symbols[*inner].decl_line(), 4);
        assert_eq!(program.symbols[*outer].decl_line(), 2);
    }

    #[test]
    fn function_redeclaration_is_rejected() {
        assert_eq!(
            parse_err("func f() { }\nfunc f() { }"),
            ParseError::Redeclaration {
                name: "f".to_string(),
                line: 2,
                first_line: 1,
            }
        );
    }

    #[test]
    fn declaring_a_function_name_as_variable_is_rejected() {
        assert!(matches!(
            parse_err("func f() { }\nfunc main() { let f: int = 1; }"),
            ParseError::FunctionAsVariable { first_line: 1, .. }
        ));
    }

    #[test]
    fn float_is_not_a_valid_annotation() {
        assert_eq!(
            parse_err("func main() { let x: float = 1; }"),
            ParseError::UnknownType {
                name: "float".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn call_arguments_allow_nested_parens() {
        let source = "func main() { let x: int = 1; print((x + 1) * 2); }";
        let program = parse_source(source).unwrap();
        let root = program.ast.root_nodes[0];
        let AstNode::FnDef { body, .. } = program.ast.node(root).inner() else {
            panic!("root is not a function");
        };
        let AstNode::ExprStmt(expr) = program.ast.node(body[1]).inner() else {
            panic!("expected expression statement");
        };
        assert_eq!(sexpr(&program, *expr), "(call print (* (+ x 1) 2))");
    }

    #[test]
    fn print_is_predeclared() {
        let program = parse_source("func main() { print(42); }").unwrap();
        let root = program.ast.root_nodes[0];
        let AstNode::FnDef { body, .. } = program.ast.node(root).inner() else {
            panic!("root is not a function");
        };
        let AstNode::ExprStmt(expr) = program.ast.node(body[0]).inner() else {
            panic!("expected expression statement");
        };
        assert_eq!(sexpr(&program, *expr), "(call print 42)");
    }

    #[test]
    fn end_to_end_main_shape() {
        let source = "func main() { let x: int = 1 + 2; print(x); return 0; }";
        let program = parse_source(source).unwrap();
        assert_eq!(program.ast.root_nodes.len(), 1);

        let root = program.ast.root_nodes[0];
        let AstNode::FnDef { func, params, body } = program.ast.node(root).inner() else {
            panic!("root is not a function");
        };
        assert_eq!(program.symbols[*func].name, "main");
        assert!(params.is_empty());
        assert_eq!(body.len(), 3);

        let AstNode::Let {
            var,
            init: Some(init),
        } = program.ast.node(body[0]).inner()
        else {
            panic!("expected initialized declaration");
        };
        assert_eq!(program.symbols[*var].name, "x");
        assert_eq!(sexpr(&program, *init), "(+ 1 2)");

        let AstNode::ExprStmt(call) = program.ast.node(body[1]).inner() else {
            panic!("expected expression statement");
        };
        assert_eq!(sexpr(&program, *call), "(call print x)");

        let AstNode::Return(value) = program.ast.node(body[2]).inner() else {
            panic!("expected return statement");
        };
        assert_eq!(sexpr(&program, *value), "0");
    }

    #[test]
    fn missing_semicolon_is_rejected() {
        // `}` is not an expression terminator, so the scan trips over it
        assert!(matches!(
            parse_err("func main() { let x: int = 1 }"),
            ParseError::UnexpectedToken { .. }
        ));
        // a terminator the expression scan does stop at surfaces the
        // missing `;` itself
        assert!(matches!(
            parse_err("func main() { let x: int = 1, }"),
            ParseError::ExpectedToken { expected: "`;`", .. }
        ));
    }
}
