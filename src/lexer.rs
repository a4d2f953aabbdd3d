use std::iter::Peekable;
use std::str::Chars;

use crate::token;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &str) -> Lexer {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    // Running off the end yields `None`, never a character that could also
    // appear in the source.
    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn peek_if<F>(&mut self, mut predicate: F) -> bool
    where
        F: FnMut(char) -> bool,
    {
        match self.peek_char() {
            Some(ch) => predicate(ch),
            None => false,
        }
    }

    fn read_while<F>(&mut self, first: char, predicate: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut res = String::new();
        res.push(first);

        while self.peek_if(&predicate) {
            if let Some(ch) = self.read_char() {
                res.push(ch);
            }
        }

        res
    }

    fn skip_whitespace(&mut self) {
        while self.peek_if(is_whitespace) {
            self.read_char();
        }
    }

    /// Reads `first`, and if the next character is `second` consumes it too and
    /// produces the two-character token instead.
    fn either(&mut self, first: char, second: char, one: TokenKind, two: TokenKind) -> Token {
        if self.peek_char() == Some(second) {
            self.read_char();
            Token::new(two, format!("{}{}", first, second))
        } else {
            Token::new(one, first.to_string())
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.read_char() {
            Some(c) => c,
            None => return Token::eof(),
        };

        let single = |kind| Token::new(kind, c.to_string());

        match c {
            '=' => self.either('=', '=', TokenKind::Assign, TokenKind::Eq),
            '!' => self.either('!', '=', TokenKind::Bang, TokenKind::NotEq),
            '+' => single(TokenKind::Plus),
            '-' => single(TokenKind::Minus),
            '*' => single(TokenKind::Asterisk),
            '/' => single(TokenKind::Slash),
            '<' => single(TokenKind::Lt),
            '>' => single(TokenKind::Gt),
            '(' => single(TokenKind::LParen),
            ')' => single(TokenKind::RParen),
            '{' => single(TokenKind::LBrace),
            '}' => single(TokenKind::RBrace),
            ',' => single(TokenKind::Comma),
            ';' => single(TokenKind::Semicolon),
            c if is_letter(c) => {
                let ident = self.read_while(c, is_letter);
                Token::new(token::lookup_ident(&ident), ident)
            }
            c if c.is_ascii_digit() => {
                Token::new(TokenKind::Int, self.read_while(c, |c| c.is_ascii_digit()))
            }
            _ => single(TokenKind::Illegal),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let tok = self.next_token();
        if tok.is(TokenKind::Eof) {
            None
        } else {
            Some(tok)
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
