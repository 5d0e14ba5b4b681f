use serde::{Deserialize, Serialize};

/// 1-based source position of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Special
    End,
    Unknown,

    // Keywords
    Func,
    Return,
    Let,
    Print,
    If,
    While,
    True,
    False,
    Integer,
    Boolean,

    // Delimiters
    Semicolon,
    Colon,
    Comma,
    LParen,
    RParen,
    LCurly,
    RCurly,

    // Operators
    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Literals and names
    Number,
    Name,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "let" => TokenKind::Let,
            "print" => TokenKind::Print,
            "if" => TokenKind::If,
            "while" => TokenKind::While,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "integer" => TokenKind::Integer,
            "boolean" => TokenKind::Boolean,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Func | Return | Let | Print | If | While | True | False | Integer | Boolean
        )
    }

    pub fn is_delimiter(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Semicolon | Colon | Comma | LParen | RParen | LCurly | RCurly
        )
    }

    pub fn is_operator(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal
                | Plus
                | Minus
                | Star
                | Slash
                | DoubleEqual
                | NotEqual
                | Less
                | LessEqual
                | Greater
                | GreaterEqual
        )
    }
}

impl std::fmt::Display for TokenKind {
    /// Describes the kind the way diagnostics name an expected token.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::End => "end of input",
            TokenKind::Unknown => "unknown character",
            TokenKind::Func => "'func'",
            TokenKind::Return => "'return'",
            TokenKind::Let => "'let'",
            TokenKind::Print => "'print'",
            TokenKind::If => "'if'",
            TokenKind::While => "'while'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Integer => "'integer'",
            TokenKind::Boolean => "'boolean'",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LCurly => "'{'",
            TokenKind::RCurly => "'}'",
            TokenKind::Equal => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleEqual => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::Number => "number",
            TokenKind::Name => "name",
        };
        f.write_str(text)
    }
}

/// A lexed token. Names compare by lexeme text, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn end(span: Span) -> Self {
        Token::new(TokenKind::End, "", span)
    }

    pub fn same_name(&self, other: &Token) -> bool {
        self.lexeme == other.lexeme
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::End => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}
