mod lexer;
mod parser;
mod token;

pub use lexer::{Lexer, LexerError};
pub use parser::{
    parse, CreateTableStatement, CreateViewStatement, DeleteStatement, InsertStatement,
    ParseError, SelectStatement, Statement, UpdateStatement,
};
pub use token::Token;
