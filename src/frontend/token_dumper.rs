use std::fmt::Write;

use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            let colr = if self.color { self.color(token.kind) } else { "" };
            let reset = if self.color { Self::RESET } else { "" };
            let _ = writeln!(
                out,
                "[{:02}:{:02}] {}{:<10} {}{}",
                token.span.line,
                token.span.col,
                colr,
                category(token.kind),
                token,
                reset
            );
        }
        out
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::End => Self::DIM,
            TokenKind::Unknown => Self::RED,
            TokenKind::Number => Self::CYN,
            TokenKind::Name => Self::YEL,
            k if k.is_operator() => Self::MAG,
            _ => Self::RESET,
        }
    }
}

fn category(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::End => "END",
        TokenKind::Unknown => "UNKNOWN",
        TokenKind::Number => "NUMBER",
        TokenKind::Name => "NAME",
        k if k.is_keyword() => "KEYWORD",
        k if k.is_delimiter() => "DELIMITER",
        _ => "OPERATOR",
    }
}
