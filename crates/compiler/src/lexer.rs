//! DFA scanner turning BPL source text into a token stream.
//!
//! Six states — START, COMMENT, STRING, IDENT, NUMBER, SYMBOL — mirror the
//! states of the original scanner this language was distilled from. Unlike
//! that scanner, a pending IDENT/NUMBER/SYMBOL token is always flushed
//! before EOF is emitted, rather than silently dropped.

use std::path::{Path, PathBuf};

use crate::error::CompileError;
use crate::token::{keyword, Token, TokenKind};

/// Two-character operators recognized by maximal munch, longest first so a
/// prefix scan never has to backtrack.
const TWO_CHAR_SYMBOLS: &[(&str, TokenKind)] = &[
    ("<=", TokenKind::LessEqual),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::NotEqual),
    (">=", TokenKind::GreaterEqual),
];

const ONE_CHAR_SYMBOLS: &[(char, TokenKind)] = &[
    ('=', TokenKind::Equal),
    (';', TokenKind::Semi),
    (',', TokenKind::Comma),
    ('[', TokenKind::LSquare),
    (']', TokenKind::RSquare),
    ('{', TokenKind::LCurly),
    ('}', TokenKind::RCurly),
    ('(', TokenKind::LParen),
    (')', TokenKind::RParen),
    ('<', TokenKind::Less),
    ('>', TokenKind::Greater),
    ('+', TokenKind::Plus),
    ('-', TokenKind::Minus),
    ('*', TokenKind::Star),
    ('/', TokenKind::Slash),
    ('%', TokenKind::Percent),
    ('&', TokenKind::Amp),
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    file: PathBuf,
}

impl Lexer {
    pub fn new(source: &str, file: impl AsRef<Path>) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            file: file.as_ref().to_path_buf(),
        }
    }

    /// Scans the entire source into a token vector, terminated by exactly
    /// one `Eof` token.
    pub fn lex(source: &str, file: impl AsRef<Path>) -> Result<Vec<Token>, CompileError> {
        let mut lexer = Lexer::new(source, file);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn err(&self, line: usize, col: usize, message: impl Into<String>) -> CompileError {
        CompileError::Lex {
            file: self.file.clone(),
            line,
            col,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace_and_comments()?;

        let start_line = self.line;
        let start_col = self.col;

        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start_line, start_col));
        };

        if c == '"' {
            return self.scan_string(start_line, start_col);
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_ident(start_line, start_col));
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number(start_line, start_col));
        }
        if let Some(tok) = self.scan_symbol(start_line, start_col) {
            return Ok(tok);
        }

        self.advance();
        Err(self.err(
            start_line,
            start_col,
            format!("unknown character '{}'", c),
        ))
    }

    /// Consumes whitespace and `/* ... */` comments (which may themselves
    /// span multiple lines) until real token text or EOF is reached.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => return Err(self.err(line, col, "unterminated comment")),
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_string(&mut self, line: usize, col: usize) -> Result<Token, CompileError> {
        self.advance(); // opening quote
        let mut body = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err(line, col, "unterminated string literal")),
                Some('\n') => return Err(self.err(self.line, self.col, "newline in string literal")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => body.push('\n'),
                        Some('t') => body.push('\t'),
                        Some('"') => body.push('"'),
                        Some('\\') => body.push('\\'),
                        Some(other) => body.push(other),
                        None => return Err(self.err(line, col, "unterminated string literal")),
                    }
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::StringLit, body, line, col))
    }

    fn scan_ident(&mut self, line: usize, col: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = keyword(&lexeme).unwrap_or(TokenKind::Ident);
        Token::new(kind, lexeme, line, col)
    }

    fn scan_number(&mut self, line: usize, col: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, lexeme, line, col)
    }

    fn scan_symbol(&mut self, line: usize, col: usize) -> Option<Token> {
        if let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) {
            let two: String = [a, b].iter().collect();
            for (sym, kind) in TWO_CHAR_SYMBOLS {
                if *sym == two {
                    self.advance();
                    self.advance();
                    return Some(Token::new(*kind, two, line, col));
                }
            }
        }
        let c = self.peek()?;
        for (sym, kind) in ONE_CHAR_SYMBOLS {
            if *sym == c {
                self.advance();
                return Some(Token::new(*kind, c.to_string(), line, col));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::lex(src, "test.bpl")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn maximal_munch_prefers_two_char_operator() {
        assert_eq!(
            kinds("<="),
            vec![TokenKind::LessEqual, TokenKind::Eof]
        );
        assert_eq!(
            kinds("< ="),
            vec![TokenKind::Less, TokenKind::Equal, TokenKind::Eof]
        );
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(kinds("int x"), vec![TokenKind::Int, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn flushes_trailing_token_without_whitespace_before_eof() {
        // A file ending directly in a symbol/number/identifier with no
        // trailing whitespace must still yield that final token.
        assert_eq!(
            kinds("return 0;"),
            vec![
                TokenKind::Return,
                TokenKind::Number,
                TokenKind::Semi,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn line_numbers_track_newlines_including_in_comments() {
        let toks = Lexer::lex("/* a\nb */\nx", "t.bpl").unwrap();
        let ident = toks.iter().find(|t| t.kind == TokenKind::Ident).unwrap();
        assert_eq!(ident.line, 3);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::lex("\"abc", "t.bpl").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn newline_inside_string_is_an_error() {
        let err = Lexer::lex("\"abc\ndef\"", "t.bpl").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = Lexer::lex("/* never closed", "t.bpl").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = Lexer::lex("@", "t.bpl").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn string_literal_unescapes_body() {
        let toks = Lexer::lex("\"a\\nb\"", "t.bpl").unwrap();
        assert_eq!(toks[0].lexeme, "a\nb");
    }
}
