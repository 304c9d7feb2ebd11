/// The tokens of the query language. Keywords are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    // keywords
    And,
    As,
    Create,
    Delete,
    From,
    Insert,
    Int,
    Into,
    Select,
    Set,
    Table,
    Uint,
    Update,
    Values,
    Varchar,
    View,
    Where,

    Identifier(String),
    IntegerConst(i64),
    StringConst(String),

    Comma,
    Equal,
    LeftParen,
    RightParen,
    Minus,
}
