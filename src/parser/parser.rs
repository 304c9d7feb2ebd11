use core::fmt;
use std::iter::Peekable;

use thiserror::Error;

use super::lexer::{Lexer, LexerError};
use super::token::Token;
use crate::query::{Constant, Expression, Predicate, Term};
use crate::schema::Schema;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(String),
    #[error("trailing input after the statement: {0}")]
    TrailingInput(String),
}

#[derive(Debug, PartialEq)]
pub struct SelectStatement {
    pub fields: Vec<String>,
    pub tables: Vec<String>,
    pub predicate: Option<Predicate>,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT {} FROM {}",
            self.fields.join(", "),
            self.tables.join(", ")
        )?;
        if let Some(pred) = &self.predicate {
            write!(f, " WHERE {}", pred)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub fields: Vec<String>,
    pub values: Vec<Constant>,
}

#[derive(Debug, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub field: String,
    pub value: Expression,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, PartialEq)]
pub struct CreateTableStatement {
    pub table: String,
    pub schema: Schema,
}

#[derive(Debug, PartialEq)]
pub struct CreateViewStatement {
    pub view: String,
    pub query: SelectStatement,
}

/// A parsed statement tree.
#[derive(Debug, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
    Update(UpdateStatement),
    CreateTable(CreateTableStatement),
    CreateView(CreateViewStatement),
}

/// Parse one statement.
pub fn parse(text: &str) -> Result<Statement, ParseError> {
    let mut parser = Parser::new(Lexer::new(text));
    let stmt = parser.parse_statement()?;
    if let Some(tok) = parser.next_token_opt()? {
        return Err(ParseError::TrailingInput(format!("{:?}", tok)));
    }
    Ok(stmt)
}

struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer: lexer.peekable(),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.next_token("a statement")? {
            Token::Select => Ok(Statement::Select(self.parse_select()?)),
            Token::Insert => Ok(Statement::Insert(self.parse_insert()?)),
            Token::Delete => Ok(Statement::Delete(self.parse_delete()?)),
            Token::Update => Ok(Statement::Update(self.parse_update()?)),
            Token::Create => match self.next_token("TABLE or VIEW")? {
                Token::Table => Ok(Statement::CreateTable(self.parse_create_table()?)),
                Token::View => Ok(Statement::CreateView(self.parse_create_view()?)),
                tok => Err(Self::unexpected("TABLE or VIEW", &tok)),
            },
            tok => Err(Self::unexpected("a statement", &tok)),
        }
    }

    // select := SELECT field (, field)* FROM table (, table)* [WHERE predicate]
    fn parse_select(&mut self) -> Result<SelectStatement, ParseError> {
        let fields = self.parse_identifier_list()?;
        self.expect(Token::From)?;
        let tables = self.parse_identifier_list()?;
        let predicate = self.parse_optional_where()?;

        Ok(SelectStatement {
            fields,
            tables,
            predicate,
        })
    }

    // insert := INSERT INTO table ( field (, field)* ) VALUES ( constant (, constant)* )
    fn parse_insert(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect(Token::Into)?;
        let table = self.parse_identifier()?;
        self.expect(Token::LeftParen)?;
        let fields = self.parse_identifier_list()?;
        self.expect(Token::RightParen)?;
        self.expect(Token::Values)?;
        self.expect(Token::LeftParen)?;
        let mut values = vec![self.parse_constant()?];
        while self.eat(&Token::Comma)? {
            values.push(self.parse_constant()?);
        }
        self.expect(Token::RightParen)?;

        Ok(InsertStatement {
            table,
            fields,
            values,
        })
    }

    // delete := DELETE FROM table [WHERE predicate]
    fn parse_delete(&mut self) -> Result<DeleteStatement, ParseError> {
        self.expect(Token::From)?;
        let table = self.parse_identifier()?;
        let predicate = self.parse_optional_where()?;

        Ok(DeleteStatement { table, predicate })
    }

    // update := UPDATE table SET field = expression [WHERE predicate]
    fn parse_update(&mut self) -> Result<UpdateStatement, ParseError> {
        let table = self.parse_identifier()?;
        self.expect(Token::Set)?;
        let field = self.parse_identifier()?;
        self.expect(Token::Equal)?;
        let value = self.parse_expression()?;
        let predicate = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table,
            field,
            value,
            predicate,
        })
    }

    // create_table := CREATE TABLE table ( field type (, field type)* )
    fn parse_create_table(&mut self) -> Result<CreateTableStatement, ParseError> {
        let table = self.parse_identifier()?;
        self.expect(Token::LeftParen)?;

        let mut schema = Schema::new();
        loop {
            let field = self.parse_identifier()?;
            match self.next_token("a field type")? {
                Token::Int => schema.add_i64_field(&field),
                Token::Uint => schema.add_u64_field(&field),
                Token::Varchar => {
                    self.expect(Token::LeftParen)?;
                    let len = match self.next_token("a varchar length")? {
                        Token::IntegerConst(n) if n > 0 => n as usize,
                        tok => return Err(Self::unexpected("a varchar length", &tok)),
                    };
                    self.expect(Token::RightParen)?;
                    schema.add_string_field(&field, len)
                }
                tok => return Err(Self::unexpected("a field type", &tok)),
            };
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RightParen)?;

        Ok(CreateTableStatement { table, schema })
    }

    // create_view := CREATE VIEW view AS select
    fn parse_create_view(&mut self) -> Result<CreateViewStatement, ParseError> {
        let view = self.parse_identifier()?;
        self.expect(Token::As)?;
        self.expect(Token::Select)?;
        let query = self.parse_select()?;

        Ok(CreateViewStatement { view, query })
    }

    fn parse_optional_where(&mut self) -> Result<Option<Predicate>, ParseError> {
        if !self.eat(&Token::Where)? {
            return Ok(None);
        }
        let mut terms = vec![self.parse_term()?];
        while self.eat(&Token::And)? {
            terms.push(self.parse_term()?);
        }
        Ok(Some(Predicate::from_terms(terms)))
    }

    fn parse_term(&mut self) -> Result<Term, ParseError> {
        let lhs = self.parse_expression()?;
        self.expect(Token::Equal)?;
        let rhs = self.parse_expression()?;
        Ok(Term::new(lhs, rhs))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        match self.next_token("an expression")? {
            Token::Identifier(name) => Ok(Expression::Field(name)),
            Token::StringConst(v) => Ok(Expression::Constant(Constant::String(v))),
            Token::IntegerConst(v) => Ok(Expression::Constant(Constant::Int64(v))),
            Token::Minus => match self.next_token("an integer constant")? {
                Token::IntegerConst(v) => Ok(Expression::Constant(Constant::Int64(-v))),
                tok => Err(Self::unexpected("an integer constant", &tok)),
            },
            tok => Err(Self::unexpected("an expression", &tok)),
        }
    }

    fn parse_constant(&mut self) -> Result<Constant, ParseError> {
        match self.parse_expression()? {
            Expression::Constant(c) => Ok(c),
            Expression::Field(name) => Err(Self::unexpected("a constant", &Token::Identifier(name))),
        }
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut ids = vec![self.parse_identifier()?];
        while self.eat(&Token::Comma)? {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        match self.next_token("an identifier")? {
            Token::Identifier(name) => Ok(name),
            tok => Err(Self::unexpected("an identifier", &tok)),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let tok = self.next_token(&format!("{:?}", expected))?;
        if tok != expected {
            return Err(Self::unexpected(&format!("{:?}", expected), &tok));
        }
        Ok(())
    }

    /// Consume the next token if it equals `tok`.
    fn eat(&mut self, tok: &Token) -> Result<bool, ParseError> {
        match self.lexer.peek() {
            Some(Ok(t)) if t == tok => {
                self.lexer.next();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn next_token(&mut self, expected: &str) -> Result<Token, ParseError> {
        self.next_token_opt()?
            .ok_or_else(|| ParseError::UnexpectedEnd(expected.to_string()))
    }

    fn next_token_opt(&mut self) -> Result<Option<Token>, ParseError> {
        match self.lexer.next() {
            Some(Ok(tok)) => Ok(Some(tok)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn unexpected(expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{:?}", found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let stmt = parse("SELECT sid, sname FROM student WHERE grad_year = 2021 AND sname = 'amy'")
            .unwrap();
        let Statement::Select(sel) = stmt else {
            panic!("expected a select statement");
        };
        assert_eq!(sel.fields, vec!["sid", "sname"]);
        assert_eq!(sel.tables, vec!["student"]);
        let pred = sel.predicate.unwrap();
        assert_eq!(pred.terms().len(), 2);
        assert_eq!(
            pred.equates_with_constant("sname"),
            Some(&Constant::String("amy".to_string()))
        );
    }

    #[test]
    fn test_select_roundtrips_through_display() {
        let text = "SELECT sname FROM student WHERE grad_year = 2021";
        let Statement::Select(sel) = parse(text).unwrap() else {
            panic!("expected a select statement");
        };
        assert_eq!(sel.to_string(), text);
        assert_eq!(parse(&sel.to_string()).unwrap(), Statement::Select(sel));
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse("INSERT INTO student (sid, sname) VALUES (-7, 'joe')").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert(InsertStatement {
                table: "student".to_string(),
                fields: vec!["sid".to_string(), "sname".to_string()],
                values: vec![Constant::Int64(-7), Constant::String("joe".to_string())],
            })
        );
    }

    #[test]
    fn test_parse_delete_and_update() {
        let stmt = parse("DELETE FROM student WHERE sid = 3").unwrap();
        assert!(matches!(stmt, Statement::Delete(_)));

        let stmt = parse("UPDATE student SET sname = 'bob' WHERE sid = 3").unwrap();
        let Statement::Update(upd) = stmt else {
            panic!("expected an update statement");
        };
        assert_eq!(upd.table, "student");
        assert_eq!(upd.field, "sname");
        assert_eq!(
            upd.value,
            Expression::Constant(Constant::String("bob".to_string()))
        );
        assert!(upd.predicate.is_some());
    }

    #[test]
    fn test_parse_create_table() {
        let stmt =
            parse("CREATE TABLE student (sid int, grad_year uint, sname varchar(10))").unwrap();
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected a create table statement");
        };
        assert_eq!(ct.table, "student");
        assert_eq!(ct.schema.field_names(), vec!["sid", "grad_year", "sname"]);
    }

    #[test]
    fn test_parse_create_view() {
        let stmt =
            parse("CREATE VIEW grads AS SELECT sname FROM student WHERE grad_year = 2021").unwrap();
        let Statement::CreateView(cv) = stmt else {
            panic!("expected a create view statement");
        };
        assert_eq!(cv.view, "grads");
        assert_eq!(cv.query.tables, vec!["student"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("SELECT FROM student"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("SELECT sid"),
            Err(ParseError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            parse("SELECT sid FROM student extra"),
            Err(ParseError::TrailingInput(_))
        ));
    }
}
