use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::location::{Span, Traced};
use crate::error::LexError;
use crate::token::{NumValue, Token};

trait CharCustomFuncs {
    fn is_alphabetic_or_underscore(self) -> bool;
    fn is_alphanumeric_or_underscore(self) -> bool;
}

impl CharCustomFuncs for char {
    fn is_alphabetic_or_underscore(self) -> bool {
        self.is_alphabetic() || self == '_'
    }
    fn is_alphanumeric_or_underscore(self) -> bool {
        self.is_alphanumeric() || self == '_'
    }
}

/// Scans a source buffer into tokens one at a time
///
/// All identifier and string payloads are slices of the source buffer, so
/// the buffer must outlive every token produced from it
#[derive(Debug)]
struct Tokenizer<'src> {
    source: &'src str,
    iter: Peekable<CharIndices<'src>>,
    line: usize,
}

/// Tokenize a whole source buffer
///
/// The returned stream is always terminated by an explicit `Token::Eof`.
/// Lexing is fail-fast: the first malformed construct aborts the scan.
pub fn lex(source: &str) -> Result<Vec<Traced<Token<'_>>>, LexError> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    let eof_span = Span::new(source.len(), 0, tokenizer.line);
    tokens.push(Token::Eof.wrap(eof_span));
    Ok(tokens)
}

impl<'src> Tokenizer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            iter: source.char_indices().peekable(),
            line: 1,
        }
    }

    fn next_token(&mut self) -> Result<Option<Traced<Token<'src>>>, LexError> {
        loop {
            let (i, c) = match self.iter.next() {
                Some(x) => x,
                None => return Ok(None),
            };
            break match c {
                ' ' | '\t' | '\x0c' | '\r' => continue,
                '\n' => {
                    self.line += 1;
                    continue;
                }

                // A leading sign is part of the literal when a digit follows
                // directly, so `-5` is one token but `x - 5` is three
                c if c.is_ascii_digit() => self.number(i).map(Some),
                '+' | '-' if matches!(self.iter.peek(), Some(&(_, c)) if c.is_ascii_digit()) => {
                    self.number(i).map(Some)
                }

                '\'' => self.char_literal(i).map(Some),
                '"' => self.string_literal(i).map(Some),

                c if c.is_alphabetic_or_underscore() => Ok(Some(self.identifier(i))),
                c if c.is_ascii_punctuation() => Ok(Some(self.punctuator(i, c))),

                c => Err(LexError::InvalidCharacter { ch: c, line: self.line }),
            };
        }
    }

    /// Scan a numeric literal starting at `start` (first character already
    /// consumed); greedy over digits and decimal points, so a malformed
    /// literal like `1.2.3` is caught by the numeric parse afterwards
    fn number(&mut self, start: usize) -> Result<Traced<Token<'src>>, LexError> {
        let mut end = self.source.len();
        while let Some(&(i, c)) = self.iter.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.iter.next();
            } else {
                end = i;
                break;
            }
        }
        let text = &self.source[start..end];
        let span = Span::new(start, end - start, self.line);
        let value = if text.contains('.') {
            text.parse::<f64>().map(NumValue::F).map_err(|_| ())
        } else {
            text.parse::<i64>().map(NumValue::I).map_err(|_| ())
        };
        match value {
            Ok(v) => Ok(Token::Number(v).wrap(span)),
            Err(_) => Err(LexError::InvalidNumber {
                text: text.to_string(),
                line: self.line,
            }),
        }
    }

    /// Scan a character literal, starting after the opening quote
    ///
    /// Escape sequences are not interpreted; the literal must hold exactly
    /// one character
    fn char_literal(&mut self, start: usize) -> Result<Traced<Token<'src>>, LexError> {
        let line = self.line;
        let mut value = None;
        let mut count = 0usize;
        loop {
            match self.iter.next() {
                None => return Err(LexError::UnterminatedChar { line }),
                Some((end, '\'')) => {
                    return match count {
                        0 => Err(LexError::EmptyChar { line }),
                        1 => {
                            let span = Span::new(start, end + 1 - start, line);
                            // value is always set once count is 1
                            let c = value.ok_or(LexError::EmptyChar { line })?;
                            Ok(Token::Character(c).wrap(span))
                        }
                        _ => Err(LexError::CharLiteralTooLong { line }),
                    };
                }
                Some((_, c)) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    if count == 0 {
                        value = Some(c);
                    }
                    count += 1;
                }
            }
        }
    }

    /// Scan a string literal, starting after the opening quote
    ///
    /// The payload is sliced verbatim from the source; there is no escape
    /// processing
    fn string_literal(&mut self, start: usize) -> Result<Traced<Token<'src>>, LexError> {
        let line = self.line;
        loop {
            match self.iter.next() {
                None => return Err(LexError::UnterminatedString { line }),
                Some((end, '"')) => {
                    let span = Span::new(start, end + 1 - start, line);
                    let contents = &self.source[start + 1..end];
                    return Ok(Token::String(contents).wrap(span));
                }
                Some((_, '\n')) => self.line += 1,
                Some(_) => (),
            }
        }
    }

    /// Scan an identifier or a keyword, starting from the second character
    fn identifier(&mut self, start: usize) -> Traced<Token<'src>> {
        let mut end = self.source.len();
        while let Some(&(i, c)) = self.iter.peek() {
            if c.is_alphanumeric_or_underscore() {
                self.iter.next();
            } else {
                end = i;
                break;
            }
        }
        let text = &self.source[start..end];
        let span = Span::new(start, end - start, self.line);
        let token = match text {
            "if" => Token::If,
            "else" => Token::Else,
            "elif" => Token::Elif,
            "while" => Token::While,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "func" => Token::Func,
            "return" => Token::Return,
            "let" => Token::Let,
            "int" => Token::Int,
            "float" => Token::Float,
            "char" => Token::Char,
            "str" => Token::Str,
            "bool" => Token::Bool,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Identifier(text),
        };
        token.wrap(span)
    }

    /// Scan a punctuator with longest-match over the two-character operators
    fn punctuator(&mut self, start: usize, first: char) -> Traced<Token<'src>> {
        macro_rules! two_chars {
            ($token: tt) => {{
                self.iter.next();
                Token::$token.wrap(Span::new(start, 2, self.line))
            }};
        }
        let single = |token: Token<'src>| token.wrap(Span::new(start, 1, self.line));
        match first {
            '+' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(AddEq),
                _ => single(Token::Add),
            },
            '-' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(SubEq),
                _ => single(Token::Sub),
            },
            '*' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(MulEq),
                _ => single(Token::Mul),
            },
            '/' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(DivEq),
                _ => single(Token::Div),
            },
            '>' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(GrEq),
                _ => single(Token::Gr),
            },
            '<' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(LeEq),
                _ => single(Token::Le),
            },
            '=' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(EqEq),
                Some(&(_, '>')) => two_chars!(FatArrow),
                _ => single(Token::Eq),
            },
            '!' => match self.iter.peek() {
                Some(&(_, '=')) => two_chars!(ExcEq),
                _ => single(Token::Unknown('!')),
            },
            '&' => match self.iter.peek() {
                Some(&(_, '&')) => two_chars!(AndAnd),
                _ => single(Token::Unknown('&')),
            },
            '|' => match self.iter.peek() {
                Some(&(_, '|')) => two_chars!(OrOr),
                _ => single(Token::Unknown('|')),
            },
            '(' => single(Token::RoundParenOpen),
            ')' => single(Token::RoundParenClose),
            '{' => single(Token::BraceOpen),
            '}' => single(Token::BraceClose),
            ':' => single(Token::Colon),
            ';' => single(Token::Semicolon),
            ',' => single(Token::Comma),
            c => single(Token::Unknown(c)),
        }
    }
}
