use crate::frontend::token::{Span, Token, TokenKind};

/// Where the compiler pulls its tokens from.
///
/// Both methods yield an `End` token once the input is exhausted, and keep
/// yielding it on every further call.
pub trait TokenSource {
    /// Returns the next token without consuming it.
    fn peek(&mut self) -> &Token;

    /// Consumes and returns the next token.
    fn advance(&mut self) -> Token;

    /// Line of the token most recently peeked or consumed, for diagnostics.
    fn line(&self) -> usize;
}

/// On-demand scanner with a single token of lookahead.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    peeked: Option<Token>,
    last_line: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            peeked: None,
            last_line: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !keep(ch) {
                break;
            }
            text.push(ch);
            self.advance_char();
        }
        text
    }

    fn read_number(&mut self, span: Span) -> Token {
        let digits = self.read_while(|c| c.is_ascii_digit());
        Token::new(TokenKind::Number, digits, span)
    }

    fn read_identifier(&mut self, span: Span) -> Token {
        let ident = self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Name);
        Token::new(kind, ident, span)
    }

    fn read_symbol(&mut self, span: Span) -> Token {
        let Some(ch) = self.advance_char() else {
            return Token::end(span);
        };

        let two_char = match (ch, self.current()) {
            ('=', Some('=')) => Some(TokenKind::DoubleEqual),
            ('!', Some('=')) => Some(TokenKind::NotEqual),
            ('<', Some('=')) => Some(TokenKind::LessEqual),
            ('>', Some('=')) => Some(TokenKind::GreaterEqual),
            _ => None,
        };
        if let Some(kind) = two_char {
            let second = self.advance_char().unwrap_or_default();
            return Token::new(kind, format!("{}{}", ch, second), span);
        }

        let kind = match ch {
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LCurly,
            '}' => TokenKind::RCurly,
            '=' => TokenKind::Equal,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            _ => TokenKind::Unknown,
        };
        Token::new(kind, ch.to_string(), span)
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace();
        let span = self.span();

        match self.current() {
            None => Token::end(span),
            Some(ch) if ch.is_ascii_digit() => self.read_number(span),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.read_identifier(span),
            Some(_) => self.read_symbol(span),
        }
    }

    /// Scans the whole input, ending with a single `End` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.advance();
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

impl TokenSource for Lexer {
    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            let token = self.scan();
            self.last_line = token.span.line;
            self.peeked = Some(token);
        }
        self.peeked.get_or_insert_with(|| Token::end(Span::default()))
    }

    fn advance(&mut self) -> Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        };
        self.last_line = token.span.line;
        token
    }

    fn line(&self) -> usize {
        self.last_line
    }
}

/// Token source over an already-scanned token list.
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
    end: Token,
    last_line: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end_span = tokens.last().map(|t| t.span).unwrap_or_default();
        TokenStream {
            tokens,
            pos: 0,
            end: Token::end(end_span),
            last_line: 1,
        }
    }
}

impl TokenSource for TokenStream {
    fn peek(&mut self) -> &Token {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.last_line = token.span.line;
                token
            }
            None => &self.end,
        }
    }

    fn advance(&mut self) -> Token {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                self.last_line = token.span.line;
                token.clone()
            }
            None => self.end.clone(),
        }
    }

    fn line(&self) -> usize {
        self.last_line
    }
}
