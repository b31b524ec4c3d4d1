//! Tokenizer for SDL source text.
//!
//! Whitespace, commas and `#` comments are insignificant and never become
//! tokens. Every token records its [`Span`].

use crate::error::ParseError;

use super::ast::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    String(String),
    BlockString(String),
    Bang,
    Amp,
    LParen,
    RParen,
    Colon,
    Equals,
    At,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    Eof,
}

impl TokenKind {
    /// Short human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Name(name) => format!("Name \"{name}\""),
            Self::Int(value) => format!("Int \"{value}\""),
            Self::Float(value) => format!("Float \"{value}\""),
            Self::String(_) => "String".to_string(),
            Self::BlockString(_) => "BlockString".to_string(),
            Self::Bang => "\"!\"".to_string(),
            Self::Amp => "\"&\"".to_string(),
            Self::LParen => "\"(\"".to_string(),
            Self::RParen => "\")\"".to_string(),
            Self::Colon => "\":\"".to_string(),
            Self::Equals => "\"=\"".to_string(),
            Self::At => "\"@\"".to_string(),
            Self::LBracket => "\"[\"".to_string(),
            Self::RBracket => "\"]\"".to_string(),
            Self::LBrace => "\"{\"".to_string(),
            Self::RBrace => "\"}\"".to_string(),
            Self::Pipe => "\"|\"".to_string(),
            Self::Eof => "<EOF>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: usize,
    line_start: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// Tokenizes the whole source. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(source: &'src str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_ignored();

        let start = self.pos;
        let line = self.line;
        let column = start - self.line_start + 1;
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start, line, column),
            });
        };

        let kind = match byte {
            b'!' => self.single(TokenKind::Bang),
            b'&' => self.single(TokenKind::Amp),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b':' => self.single(TokenKind::Colon),
            b'=' => self.single(TokenKind::Equals),
            b'@' => self.single(TokenKind::At),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'|' => self.single(TokenKind::Pipe),
            b'"' => {
                if self.source[self.pos..].starts_with("\"\"\"") {
                    self.read_block_string(line, column)?
                } else {
                    self.read_string(line, column)?
                }
            }
            b'-' | b'0'..=b'9' => self.read_number(line, column)?,
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.read_name(),
            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::new(
                    format!("Unexpected character {ch:?}."),
                    line,
                    column,
                ));
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos, line, column),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn skip_ignored(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b' ' | b'\t' | b',' | b'\r' => self.pos += 1,
                // byte order mark
                0xEF if self.source[self.pos..].starts_with('\u{feff}') => self.pos += 3,
                b'\n' => self.newline(),
                b'#' => {
                    while let Some(&b) = self.bytes.get(self.pos) {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn newline(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    fn read_name(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'_' || b.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        TokenKind::Name(self.source[start..self.pos].to_string())
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut is_float = false;

        if self.bytes.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        match self.bytes.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                if self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                    return Err(ParseError::new(
                        "Invalid number, unexpected digit after 0.",
                        line,
                        column,
                    ));
                }
            }
            Some(b) if b.is_ascii_digit() => self.read_digits(),
            _ => {
                return Err(ParseError::new(
                    "Invalid number, expected digit.",
                    line,
                    column,
                ));
            }
        }

        if self.bytes.get(self.pos) == Some(&b'.') {
            is_float = true;
            self.pos += 1;
            self.expect_digits(line, column)?;
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            self.expect_digits(line, column)?;
        }
        if self
            .bytes
            .get(self.pos)
            .is_some_and(|b| *b == b'_' || b.is_ascii_alphabetic() || *b == b'.')
        {
            return Err(ParseError::new(
                "Invalid number, expected digit.",
                line,
                column,
            ));
        }

        let text = &self.source[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|err| ParseError::new(format!("Invalid float {text}: {err}."), line, column))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|err| ParseError::new(format!("Invalid int {text}: {err}."), line, column))
        }
    }

    fn read_digits(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
    }

    fn expect_digits(&mut self, line: usize, column: usize) -> Result<(), ParseError> {
        if !self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            return Err(ParseError::new(
                "Invalid number, expected digit.",
                line,
                column,
            ));
        }
        self.read_digits();
        Ok(())
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.source[self.pos..].chars().next() else {
                return Err(ParseError::new("Unterminated string.", line, column));
            };
            match ch {
                '"' => {
                    self.pos += 1;
                    return Ok(TokenKind::String(value));
                }
                '\n' | '\r' => {
                    return Err(ParseError::new("Unterminated string.", line, column));
                }
                '\\' => {
                    self.pos += 1;
                    value.push(self.read_escape(line, column)?);
                }
                other => {
                    self.pos += other.len_utf8();
                    value.push(other);
                }
            }
        }
    }

    fn read_escape(&mut self, line: usize, column: usize) -> Result<char, ParseError> {
        let Some(&esc) = self.bytes.get(self.pos) else {
            return Err(ParseError::new("Unterminated string.", line, column));
        };
        self.pos += 1;
        let ch = match esc {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let hex = self
                    .source
                    .get(self.pos..self.pos + 4)
                    .ok_or_else(|| ParseError::new("Invalid Unicode escape sequence.", line, column))?;
                let code = Some(hex)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        ParseError::new(
                            format!("Invalid Unicode escape sequence: \\u{hex}."),
                            line,
                            column,
                        )
                    })?;
                self.pos += 4;
                code
            }
            other => {
                return Err(ParseError::new(
                    format!("Invalid character escape sequence: \\{}.", other as char),
                    line,
                    column,
                ));
            }
        };
        Ok(ch)
    }

    fn read_block_string(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        self.pos += 3;
        let mut raw = String::new();
        loop {
            let rest = &self.source[self.pos..];
            if rest.starts_with("\"\"\"") {
                self.pos += 3;
                return Ok(TokenKind::BlockString(dedent_block_string(&raw)));
            }
            if rest.starts_with("\\\"\"\"") {
                self.pos += 4;
                raw.push_str("\"\"\"");
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                return Err(ParseError::new("Unterminated string.", line, column));
            };
            if ch == '\n' {
                self.newline();
            } else {
                self.pos += ch.len_utf8();
            }
            raw.push(ch);
        }
    }
}

/// Removes common indentation and leading/trailing blank lines from the raw
/// contents of a block string.
pub fn dedent_block_string(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 {
                return *line;
            }
            line.get(common_indent..)
                .unwrap_or_else(|| line.trim_start_matches([' ', '\t']))
        })
        .collect();

    while out.first().is_some_and(|line| line.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|line| line.trim().is_empty()) {
        out.pop();
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_skips_commas_and_comments() {
        let tokens = kinds("data Hello = A, | B # trailing\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("data".into()),
                TokenKind::Name("Hello".into()),
                TokenKind::Equals,
                TokenKind::Name("A".into()),
                TokenKind::Pipe,
                TokenKind::Name("B".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("-7")[0], TokenKind::Int(-7));
        assert_eq!(kinds("1.5e2")[0], TokenKind::Float(150.0));
        assert!(Lexer::tokenize("012").is_err());
        assert!(Lexer::tokenize("1.").is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"bA\n""#)[0],
            TokenKind::String("a\"bA\n".into())
        );
        assert!(Lexer::tokenize("\"open").is_err());
    }

    #[test]
    fn test_unicode_escape_requires_four_hex_digits() {
        assert_eq!(kinds(r#""\u0041""#)[0], TokenKind::String("A".into()));
        assert!(Lexer::tokenize(r#""\u+041""#).is_err());
        assert!(Lexer::tokenize(r#""\u-041""#).is_err());
        assert!(Lexer::tokenize(r#""\u00G1""#).is_err());
        assert!(Lexer::tokenize(r#""\u00""#).is_err());
    }

    #[test]
    fn test_block_string_dedents() {
        let tokens = kinds("\"\"\"\n    Hello\n      world\n  \"\"\"");
        assert_eq!(tokens[0], TokenKind::BlockString("Hello\n  world".into()));
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = Lexer::tokenize("type\n  Query").unwrap();
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_rejects_unknown_character() {
        let err = Lexer::tokenize("type ?").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
    }
}
