//=====================================================
// File: tokenizer.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: VesperScript lexical analysis
// Objective: Turn source text into the ordered token stream consumed by the parser
//=====================================================

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::source::{Position, SourceText};
use crate::symbol::{intern, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Identifier(Symbol),
    IntLiteral(i32),
    Int64Literal(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    // Keywords (matched case-insensitively)
    Var,
    Const,
    New,
    Print,
    Func,
    Async,
    Await,
    Return,
    Class,
    Interface,
    Abstract,
    Implements,
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
    Import,
    From,
    Package,
    This,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Is,
    As,
    // Punctuation and operators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    DotDot,
    Ellipsis,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    Bang,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    // Layout tokens are kept in the stream so the token lexemes
    // concatenate back to the original source.
    Whitespace,
    Newline,
    Comment,
    Unknown,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("var", Var),
        ("const", Const),
        ("new", New),
        ("print", Print),
        ("func", Func),
        ("async", Async),
        ("await", Await),
        ("return", Return),
        ("class", Class),
        ("interface", Interface),
        ("abstract", Abstract),
        ("implements", Implements),
        ("if", If),
        ("else", Else),
        ("while", While),
        ("for", For),
        ("in", In),
        ("break", Break),
        ("continue", Continue),
        ("try", Try),
        ("catch", Catch),
        ("finally", Finally),
        ("throw", Throw),
        ("import", Import),
        ("from", From),
        ("package", Package),
        ("this", This),
        ("true", True),
        ("false", False),
        ("null", Null),
        ("and", And),
        ("or", Or),
        ("not", Not),
        ("is", Is),
        ("as", As),
    ])
});

/// Hand-written scanner. Scans left to right, longest match first, and
/// never aborts: lexical problems go to the diagnostics sink and the
/// scan picks up at the next character.
pub struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    source: &'a SourceText,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceText, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            chars: source.text().chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            source,
            diagnostics,
        }
    }

    /// Produce the full token stream. The stream always ends with
    /// exactly one Eof token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !self.at_end() {
            tokens.push(self.scan_token());
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            position: self.here(),
        });
        tokens
    }

    fn scan_token(&mut self) -> Token {
        let position = self.here();
        let start = self.index;
        let c = self.advance();
        let kind = match c {
            ' ' | '\t' | '\r' => {
                while matches!(self.peek(), Some(' ' | '\t'))
                    || (self.peek() == Some('\r') && self.peek_next() != Some('\n'))
                {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            '\n' => TokenKind::Newline,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '.' => {
                // Longest match: `...` before `..` before `.`
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else if self.peek() == Some('.') {
                    self.advance();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                    TokenKind::Comment
                } else {
                    TokenKind::Slash
                }
            }
            '=' => self.two_char('=', TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.two_char('=', TokenKind::BangEqual, TokenKind::Bang),
            '<' => self.two_char('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.two_char('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    self.unexpected(c, &position)
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    self.unexpected(c, &position)
                }
            }
            '"' => self.scan_string(&position),
            c if c.is_ascii_digit() => self.scan_number(&position),
            c if c.is_alphabetic() || c == '_' => self.scan_word(start),
            other => self.unexpected(other, &position),
        };
        let lexeme: String = self.chars[start..self.index].iter().collect();
        Token {
            kind,
            lexeme,
            position,
        }
    }

    fn scan_string(&mut self, position: &Position) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    // Unterminated literal: record and resume scanning
                    // after the consumed prefix instead of aborting.
                    self.diagnostics.report(
                        DiagnosticKind::Lexical,
                        "unterminated string literal",
                        Some(position.clone()),
                    );
                    return TokenKind::StringLiteral(value);
                }
                Some('"') => {
                    self.advance();
                    return TokenKind::StringLiteral(value);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(other) => {
                            self.diagnostics.report(
                                DiagnosticKind::Lexical,
                                format!("unknown escape sequence '\\{other}'"),
                                Some(position.clone()),
                            );
                            value.push(other);
                        }
                        None => continue,
                    }
                    self.advance();
                }
                Some(other) => {
                    value.push(other);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self, position: &Position) -> TokenKind {
        let start = self.index - 1;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        // A fraction only when a digit follows the dot; `1..3` stays a
        // range expression.
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text: String = self.chars[start..self.index].iter().collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => TokenKind::FloatLiteral(value),
                Err(_) => {
                    self.diagnostics.report(
                        DiagnosticKind::Lexical,
                        format!("malformed float literal '{text}'"),
                        Some(position.clone()),
                    );
                    TokenKind::FloatLiteral(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => match i32::try_from(value) {
                    Ok(narrow) => TokenKind::IntLiteral(narrow),
                    Err(_) => TokenKind::Int64Literal(value),
                },
                Err(_) => {
                    self.diagnostics.report(
                        DiagnosticKind::Lexical,
                        format!("integer literal '{text}' is out of range"),
                        Some(position.clone()),
                    );
                    TokenKind::Int64Literal(i64::MAX)
                }
            }
        }
    }

    fn scan_word(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text: String = self.chars[start..self.index].iter().collect();
        let lowered = text.to_ascii_lowercase();
        match KEYWORDS.get(lowered.as_str()) {
            Some(kind) => kind.clone(),
            None => TokenKind::Identifier(intern(&text)),
        }
    }

    fn two_char(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            single
        }
    }

    fn unexpected(&mut self, c: char, position: &Position) -> TokenKind {
        self.diagnostics.report(
            DiagnosticKind::Lexical,
            format!("unexpected character '{c}'"),
            Some(position.clone()),
        );
        TokenKind::Unknown
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.index];
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn here(&self) -> Position {
        self.source.position(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> (Vec<Token>, Diagnostics) {
        let source = SourceText::new("test.vsp", text);
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(&source, &mut diagnostics).tokenize();
        (tokens, diagnostics)
    }

    #[test]
    fn lexemes_reconstruct_the_source() {
        let text = "var total = 1 + 2.5   // sum\nprint total\n";
        let (tokens, diagnostics) = lex(text);
        assert!(!diagnostics.has_errors());
        let rebuilt: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn stream_ends_with_exactly_one_eof() {
        let (tokens, _) = lex("print 1");
        let eofs = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Eof)
            .count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let (tokens, _) = lex("VAR Print WHILE");
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[2].kind, TokenKind::Print);
        assert_eq!(tokens[4].kind, TokenKind::While);
    }

    #[test]
    fn longest_match_wins_for_dots() {
        let (tokens, _) = lex("... .. .");
        let kinds: Vec<_> = tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Eof))
            .map(|t| t.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ellipsis, TokenKind::DotDot, TokenKind::Dot]
        );
    }

    #[test]
    fn range_between_integers_is_not_a_fraction() {
        let (tokens, _) = lex("1..3");
        let kinds: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::DotDot,
                TokenKind::IntLiteral(3)
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_non_fatal_error() {
        let (tokens, diagnostics) = lex("var s = \"oops\nprint 1");
        assert!(diagnostics.has_errors());
        // Scanning continued past the broken literal.
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Print));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn wide_integers_spill_to_int64() {
        let (tokens, _) = lex("5000000000");
        assert_eq!(tokens[0].kind, TokenKind::Int64Literal(5_000_000_000));
    }

    #[test]
    fn newlines_are_preserved_as_tokens() {
        let (tokens, _) = lex("print 1\nprint 2");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Newline));
    }
}

//=====================================================
// End of file
//=====================================================
