use crate::{
    expr::{BinaryOperation, Builtin},
    Equation, Expression, VariableTable,
};
use std::{convert::TryFrom, iter::Peekable, ops::Range};
use thiserror::Error;

/// Parse an [`Expression`] tree from some text, adding any new variables to
/// the table.
///
/// The text may contain a single top-level `=`, in which case the result is
/// an [`BinaryOperation::Equals`] node.
pub fn parse(
    src: &str,
    variables: &mut VariableTable,
) -> Result<Expression, ParseError> {
    Parser::new(src, variables).parse()
}

/// Parse an equation like `v - a*t = 0`.
pub fn parse_equation(
    src: &str,
    variables: &mut VariableTable,
) -> Result<Equation, ParseError> {
    let expr = parse(src, variables)?;

    Equation::try_from(expr).map_err(|_| ParseError::MissingEquals)
}

/// A simple recursive descent parser (`LL(1)`) for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// equation       := expression "=" expression
///                 | expression
///
/// expression     := term (("+" | "-") term)*
///
/// term           := unary (("*" | "/") unary)*
///
/// unary          := "-" unary
///                 | power
///
/// power          := factor "^" unary
///                 | factor
///
/// factor         := variable_or_function_call
///                 | "(" expression ")"
///                 | NUMBER
///
/// variable_or_function_call = IDENTIFIER "(" expression ")"
///                           | IDENTIFIER
/// ```
#[derive(Debug)]
pub(crate) struct Parser<'a, 't> {
    tokens: Peekable<Tokens<'a>>,
    variables: &'t mut VariableTable,
}

impl<'a, 't> Parser<'a, 't> {
    pub(crate) fn new(src: &'a str, variables: &'t mut VariableTable) -> Self {
        Parser {
            tokens: Tokens::new(src).peekable(),
            variables,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let left = self.expression()?;

        let expr = if self.peek() == Some(TokenKind::Equals) {
            let _ = self.advance()?;
            let right = self.expression()?;
            Expression::binary(BinaryOperation::Equals, left, right)
        } else {
            left
        };

        match self.tokens.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: &[TokenKind::Equals],
            }),
            Some(Err(e)) => Err(e),
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.left_associative(&[TokenKind::Plus, TokenKind::Minus], |p| {
            p.term()
        })
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        self.left_associative(&[TokenKind::Times, TokenKind::Divide], |p| {
            p.unary()
        })
    }

    /// Parse a chain of operands separated by any of the `expected` operators,
    /// so `a - b - c` becomes `(a - b) - c`.
    fn left_associative<F>(
        &mut self,
        expected: &[TokenKind],
        mut operand: F,
    ) -> Result<Expression, ParseError>
    where
        F: FnMut(&mut Self) -> Result<Expression, ParseError>,
    {
        let mut left = operand(self)?;

        while let Some(kind) = self.peek() {
            if !expected.contains(&kind) {
                break;
            }

            // skip past the operator
            let _ = self.advance()?;
            // and parse the second bit
            let right = operand(self)?;

            left = Expression::binary(kind.as_binary_op(), left, right);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(TokenKind::Minus) {
            let _ = self.advance()?;
            let operand = self.unary()?;
            return Ok(-operand);
        }

        self.power()
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.factor()?;

        if self.peek() == Some(TokenKind::Caret) {
            let _ = self.advance()?;
            let exponent = self.unary()?;
            return Ok(Expression::power(base, exponent));
        }

        Ok(base)
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let expected = &[
            TokenKind::Number,
            TokenKind::Identifier,
            TokenKind::Minus,
            TokenKind::OpenParen,
        ];

        match self.peek() {
            Some(TokenKind::Number) => {
                return self.number();
            },
            Some(TokenKind::Identifier) => {
                return self.variable_or_function_call()
            },
            Some(TokenKind::OpenParen) => {
                let _ = self.advance()?;
                let expr = self.expression()?;
                let close_paren = self.advance()?;

                if close_paren.kind == TokenKind::CloseParen {
                    return Ok(expr);
                } else {
                    return Err(ParseError::UnexpectedToken {
                        found: close_paren.kind,
                        span: close_paren.span,
                        expected: &[TokenKind::CloseParen],
                    });
                }
            },
            _ => {},
        }

        // we couldn't parse the factor, return a nice error
        match self.tokens.next() {
            Some(Ok(Token { span, kind, .. })) => {
                Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected,
                    span,
                })
            },
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn variable_or_function_call(&mut self) -> Result<Expression, ParseError> {
        let ident = self.advance()?;
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            self.function_call(ident)
        } else {
            let index = self.variables.intern(ident.text);
            let dim = self
                .variables
                .get(index)
                .map(|variable| variable.dimension)
                .unwrap_or_default();

            Ok(Expression::variable(index, dim))
        }
    }

    fn function_call(
        &mut self,
        identifier: Token<'a>,
    ) -> Result<Expression, ParseError> {
        let function = Builtin::from_name(identifier.text).ok_or_else(|| {
            ParseError::UnknownFunction {
                name: identifier.text.to_string(),
                span: identifier.span.clone(),
            }
        })?;

        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let argument = self.expression()?;

        let Token { kind, span, .. } = self.advance()?;

        if kind == TokenKind::CloseParen {
            Ok(Expression::call(function, argument))
        } else {
            Err(ParseError::UnexpectedToken {
                found: kind,
                span,
                expected: &[TokenKind::CloseParen],
            })
        }
    }

    fn number(&mut self) -> Result<Expression, ParseError> {
        let token = self
            .tokens
            .next()
            .ok_or(ParseError::UnexpectedEndOfInput)??;

        debug_assert_eq!(token.kind, TokenKind::Number);

        match token.text.parse() {
            Ok(number) => Ok(Expression::number(number)),
            Err(_) => Err(ParseError::InvalidNumber { span: token.span }),
        }
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid character, {character:?}, at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("found {found:?} at {span:?} but expected one of {expected:?}")]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    #[error("\"{name}\" at {span:?} isn't a known function")]
    UnknownFunction { name: String, span: Range<usize> },
    #[error("unable to parse the number at {span:?}")]
    InvalidNumber { span: Range<usize> },
    #[error("an equation needs an \"=\"")]
    MissingEquals,
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn peek_second(&self) -> Option<char> { self.rest().chars().nth(1) }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        let tok = Token {
            text: &self.src[start..end],
            span: start..end,
            kind,
        };

        Some(Ok(tok))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_integer(&mut self) { self.take_while(|c| c.is_ascii_digit()); }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.chomp_integer();

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.chomp_integer();
        }

        if let Some('e') | Some('E') = self.peek() {
            let digits_to_go = match self.peek_second() {
                Some(c) if c.is_ascii_digit() => true,
                Some('-') | Some('+') => self
                    .rest()
                    .chars()
                    .nth(2)
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false),
                _ => false,
            };

            if digits_to_go {
                // the "e" and its sign
                self.advance();
                if let Some('-') | Some('+') = self.peek() {
                    self.advance();
                }
                self.chomp_integer();
            }
        }

        let end = self.cursor;

        Token::from_text(self.src, start..end, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let mut seen_first_character = false;

        let span = self.take_while(|c| {
            if seen_first_character {
                c.is_alphanumeric() || c == '_'
            } else {
                seen_first_character = true;
                c.is_alphabetic() || c == '_'
            }
        });

        Token::from_text(self.src, span, TokenKind::Identifier)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                '=' => self.chomp(TokenKind::Equals),
                '_' | 'a'..='z' | 'A'..='Z' => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' => Some(Ok(self.chomp_number())),
                other => Some(Err(ParseError::InvalidCharacter {
                    character: other,
                    index: self.cursor,
                })),
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
    Equals,
}

impl TokenKind {
    fn as_binary_op(self) -> BinaryOperation {
        match self {
            TokenKind::Plus => BinaryOperation::Plus,
            TokenKind::Minus => BinaryOperation::Minus,
            TokenKind::Times => BinaryOperation::Times,
            TokenKind::Divide => BinaryOperation::Divide,
            TokenKind::Caret => BinaryOperation::Power,
            TokenKind::Equals => BinaryOperation::Equals,
            other => unreachable!("{:?} is not a binary op", other),
        }
    }
}
