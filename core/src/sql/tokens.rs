/// SQL keywords and punctuation used by the query renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Token {
    // Statements and clauses
    SELECT,
    DISTINCT,
    FROM,
    WHERE,
    ORDER,
    BY,
    LIMIT,
    OFFSET,
    AS,

    // Joins
    LEFT,
    INNER,
    JOIN,
    ON,

    // Ordering
    ASC,
    DESC,

    // Logical
    AND,
    OR,
    NOT,
    IN,
    IS,
    NULL,
    LIKE,
    ESCAPE,

    // Punctuation
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
    SEMI,
    STAR,

    // Comparison
    EQ,
    NE,
    LT,
    GT,
    LE,
    GE,
}

impl Token {
    /// Returns the SQL text for this token
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::DISTINCT => "DISTINCT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::ORDER => "ORDER",
            Token::BY => "BY",
            Token::LIMIT => "LIMIT",
            Token::OFFSET => "OFFSET",
            Token::AS => "AS",
            Token::LEFT => "LEFT",
            Token::INNER => "INNER",
            Token::JOIN => "JOIN",
            Token::ON => "ON",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::IN => "IN",
            Token::IS => "IS",
            Token::NULL => "NULL",
            Token::LIKE => "LIKE",
            Token::ESCAPE => "ESCAPE",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::DOT => ".",
            Token::SEMI => ";",
            Token::STAR => "*",
            Token::EQ => "=",
            Token::NE => "<>",
            Token::LT => "<",
            Token::GT => ">",
            Token::LE => "<=",
            Token::GE => ">=",
        }
    }

    /// Comparison operators get a space on both sides
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::EQ | Token::NE | Token::LT | Token::GT | Token::LE | Token::GE
        )
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
