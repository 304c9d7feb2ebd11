use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use super::token::Token;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexerError {
    #[error("unterminated string constant: {0}")]
    UnterminatedString(String),
    #[error("integer constant is out of range: {0}")]
    IntegerOutOfRange(String),
    #[error("unexpected character: {0:?}")]
    UnexpectedChar(char),
}

pub type LexerResult = Result<Token, LexerError>;

/// A hand-written tokenizer for the query language. `--` starts a comment
/// that runs to the end of the line.
pub struct Lexer<'a> {
    text: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    cur: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            iter: text.char_indices().peekable(),
            start: 0,
            cur: 0,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.iter.next()?;
        self.cur = pos + ch.len_utf8();
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|(_, c)| *c)
    }

    fn window(&self, start: usize, end: usize) -> &str {
        &self.text[start..end]
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn scan_number(&mut self) -> LexerResult {
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.advance();
        }

        let text = self.window(self.start, self.cur);
        text.parse::<i64>()
            .map(Token::IntegerConst)
            .map_err(|_| LexerError::IntegerOutOfRange(text.to_string()))
    }

    fn scan_string(&mut self) -> LexerResult {
        loop {
            match self.advance() {
                Some('\'') => break,
                Some(_) => {}
                None => {
                    return Err(LexerError::UnterminatedString(
                        self.window(self.start, self.cur).to_string(),
                    ))
                }
            }
        }
        Ok(Token::StringConst(
            self.window(self.start + 1, self.cur - 1).to_string(),
        ))
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some(ch) = self.peek() {
            if !ch.is_alphanumeric() && ch != '_' {
                break;
            }
            self.advance();
        }

        let val = self.window(self.start, self.cur);
        match val.to_lowercase().as_str() {
            "and" => Token::And,
            "as" => Token::As,
            "create" => Token::Create,
            "delete" => Token::Delete,
            "from" => Token::From,
            "insert" => Token::Insert,
            "int" => Token::Int,
            "into" => Token::Into,
            "select" => Token::Select,
            "set" => Token::Set,
            "table" => Token::Table,
            "uint" => Token::Uint,
            "update" => Token::Update,
            "values" => Token::Values,
            "varchar" => Token::Varchar,
            "view" => Token::View,
            "where" => Token::Where,
            _ => Token::Identifier(val.to_string()),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexerResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.start = self.cur;
            let ch = self.advance()?;
            let token = match ch {
                c if c.is_whitespace() => continue,
                '-' => {
                    if self.peek() == Some('-') {
                        self.skip_comment();
                        continue;
                    }
                    Ok(Token::Minus)
                }
                ',' => Ok(Token::Comma),
                '=' => Ok(Token::Equal),
                '(' => Ok(Token::LeftParen),
                ')' => Ok(Token::RightParen),
                '\'' => self.scan_string(),
                c if c.is_ascii_digit() => self.scan_number(),
                c if c.is_alphabetic() || c == '_' => Ok(self.scan_identifier()),
                c => Err(LexerError::UnexpectedChar(c)),
            };
            return Some(token);
        }
    }
}
