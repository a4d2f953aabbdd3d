use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

type Result<T> = std::result::Result<T, ParserError>;

type PrefixParseFn<'a> = fn(&mut Parser<'a>) -> Result<Expression>;
type InfixParseFn<'a> = fn(&mut Parser<'a>, Expression) -> Result<Expression>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("expected next token to be {expected}, got {got} instead")]
    UnexpectedToken { expected: TokenKind, got: TokenKind },
    #[error("no prefix parse function for {0} found")]
    NoPrefixParseFn(TokenKind),
    #[error("could not parse {0:?} as integer")]
    InvalidInteger(String),
}

/// Binding power of an operator, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParserError>,

    prefix_parse_fns: HashMap<TokenKind, PrefixParseFn<'a>>,
    infix_parse_fns: HashMap<TokenKind, InfixParseFn<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        let mut p = Parser {
            lexer,
            cur_token: Token::eof(),
            peek_token: Token::eof(),
            errors: vec![],
            prefix_parse_fns: HashMap::new(),
            infix_parse_fns: HashMap::new(),
        };

        p.register_prefix(TokenKind::Ident, Self::parse_identifier);
        p.register_prefix(TokenKind::Int, Self::parse_integer_literal);
        p.register_prefix(TokenKind::True, Self::parse_boolean);
        p.register_prefix(TokenKind::False, Self::parse_boolean);
        p.register_prefix(TokenKind::Bang, Self::parse_prefix_expression);
        p.register_prefix(TokenKind::Minus, Self::parse_prefix_expression);
        p.register_prefix(TokenKind::LParen, Self::parse_grouped_expression);
        p.register_prefix(TokenKind::If, Self::parse_if_expression);
        p.register_prefix(TokenKind::Function, Self::parse_function_literal);

        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Eq,
            TokenKind::NotEq,
        ] {
            p.register_infix(kind, Self::parse_infix_expression);
        }
        p.register_infix(TokenKind::LParen, Self::parse_call_expression);

        // Read 2 tokens so that cur_token and peek_token are both initialised
        p.next_token();
        p.next_token();

        p
    }

    fn register_prefix(&mut self, kind: TokenKind, f: PrefixParseFn<'a>) {
        self.prefix_parse_fns.insert(kind, f);
    }

    fn register_infix(&mut self, kind: TokenKind, f: InfixParseFn<'a>) {
        self.infix_parse_fns.insert(kind, f);
    }

    pub fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    /// Errors collected while parsing, in the order they were found. The program
    /// returned by `parse_program` should not be evaluated unless this is empty.
    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = vec![];

        while !self.cur_token.is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement_recording() {
                trace!(%stmt, "parsed statement");
                statements.push(stmt);
            }
            self.next_token();
        }

        Program { statements }
    }

    fn parse_statement_recording(&mut self) -> Option<Statement> {
        match self.parse_statement() {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                debug!(%err, "parser error");
                self.errors.push(err);
                None
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement> {
        self.expect_peek(TokenKind::Ident)?;
        let name = self.cur_token.literal.clone();

        self.expect_peek(TokenKind::Assign)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Let(name, value))
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let exp = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Expression(exp))
    }

    fn skip_semicolon(&mut self) {
        if self.peek_token.is(TokenKind::Semicolon) {
            self.next_token();
        }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression> {
        let prefix = self
            .prefix_parse_fns
            .get(&self.cur_token.kind)
            .copied()
            .ok_or(ParserError::NoPrefixParseFn(self.cur_token.kind))?;

        let mut left = prefix(self)?;

        while !self.peek_token.is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_parse_fns.get(&self.peek_token.kind).copied() {
                Some(infix) => infix,
                None => return Ok(left),
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Ok(left)
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek_token.kind)
    }

    fn cur_precedence(&self) -> Precedence {
        precedence_of(self.cur_token.kind)
    }

    fn parse_identifier(&mut self) -> Result<Expression> {
        Ok(Expression::Identifier(self.cur_token.literal.clone()))
    }

    fn parse_integer_literal(&mut self) -> Result<Expression> {
        let literal = &self.cur_token.literal;

        literal
            .parse()
            .map(Expression::IntegerLiteral)
            .map_err(|_| ParserError::InvalidInteger(literal.clone()))
    }

    fn parse_boolean(&mut self) -> Result<Expression> {
        Ok(Expression::Boolean(self.cur_token.is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Result<Expression> {
        let operator = PrefixOperator::from_token(self.cur_token.kind)
            .ok_or(ParserError::NoPrefixParseFn(self.cur_token.kind))?;

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Ok(Expression::Prefix(operator, Box::new(right)))
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Result<Expression> {
        let operator = InfixOperator::from_token(self.cur_token.kind)
            .ok_or(ParserError::NoPrefixParseFn(self.cur_token.kind))?;
        let precedence = self.cur_precedence();

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Ok(Expression::Infix(operator, Box::new(left), Box::new(right)))
    }

    fn parse_grouped_expression(&mut self) -> Result<Expression> {
        self.next_token();

        let exp = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;

        Ok(exp)
    }

    fn parse_if_expression(&mut self) -> Result<Expression> {
        self.expect_peek(TokenKind::LParen)?;
        self.next_token();

        let condition = self.parse_expression(Precedence::Lowest)?;

        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::LBrace)?;

        let consequence = self.parse_block_statement();

        let alternative = if self.peek_token.is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block_statement())
        } else {
            None
        };

        Ok(Expression::If(Box::new(condition), consequence, alternative))
    }

    /// Parses statements up to the closing brace. A missing brace simply ends
    /// the block at end of input.
    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut statements = vec![];

        self.next_token();

        while !self.cur_token.is(TokenKind::RBrace) && !self.cur_token.is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement_recording() {
                statements.push(stmt);
            }
            self.next_token();
        }

        BlockStatement { statements }
    }

    fn parse_function_literal(&mut self) -> Result<Expression> {
        self.expect_peek(TokenKind::LParen)?;

        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block_statement();

        Ok(Expression::FunctionLiteral(parameters, body))
    }

    fn parse_function_parameters(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![];

        if self.peek_token.is(TokenKind::RParen) {
            self.next_token();
            return Ok(identifiers);
        }

        self.expect_peek(TokenKind::Ident)?;
        identifiers.push(self.cur_token.literal.clone());

        while self.peek_token.is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Ident)?;
            identifiers.push(self.cur_token.literal.clone());
        }

        self.expect_peek(TokenKind::RParen)?;

        Ok(identifiers)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Result<Expression> {
        let arguments = self.parse_call_arguments()?;

        Ok(Expression::Call(Box::new(function), arguments))
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut args = vec![];

        if self.peek_token.is(TokenKind::RParen) {
            self.next_token();
            return Ok(args);
        }

        self.next_token();
        args.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token.is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            args.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(TokenKind::RParen)?;

        Ok(args)
    }

    /// Advances only when the peek token is of the expected kind.
    fn expect_peek(&mut self, kind: TokenKind) -> Result<()> {
        if !self.peek_token.is(kind) {
            return Err(ParserError::UnexpectedToken {
                expected: kind,
                got: self.peek_token.kind,
            });
        }

        self.next_token();
        Ok(())
    }
}
