//! Tokenizer for the serialized item format
//!
//! A serialized file is a sequence of records framed by fixed separator
//! lines (`----item----`, `----version----`, `----field----`), followed by
//! `key: value` property lines, a blank line, and for fields the raw value.
//!
//! Recognition order at the start of a line is: separators, then a known
//! property name (longest first, case-insensitive, terminated by `": "`).
//! Anywhere else the input is either a content run or a newline.

use regex::Regex;

use crate::error::{line_column, ItemsError, Result};

/// Marker framing an item record
pub const ITEM_SEPARATOR: &str = "----item----";
/// Marker framing a language version record
pub const VERSION_SEPARATOR: &str = "----version----";
/// Marker framing a field record
pub const FIELD_SEPARATOR: &str = "----field----";

const PROPERTY_TERMINATOR: &str = ": ";

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `----item----`
    ItemSeparator,
    /// `----version----`
    VersionSeparator,
    /// `----field----`
    FieldSeparator,
    /// A known property key followed by `": "`
    PropertyName,
    /// Any run of characters up to the end of the line
    Content,
    /// CRLF, LFCR or LF
    NewLine,
}

impl TokenKind {
    /// Human-readable token description for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::ItemSeparator => "item separator",
            TokenKind::VersionSeparator => "version separator",
            TokenKind::FieldSeparator => "field separator",
            TokenKind::PropertyName => "property name",
            TokenKind::Content => "content",
            TokenKind::NewLine => "newline",
        }
    }
}

/// A token borrowing its raw text from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token kind
    pub kind: TokenKind,
    /// Raw source text of the token
    pub text: &'a str,
    /// Byte offset of the token in the source
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Key of a property-name token, lowercased and without the terminator
    pub fn property_key(&self) -> Option<String> {
        match self.kind {
            TokenKind::PropertyName => Some(
                self.text
                    .trim_end_matches(PROPERTY_TERMINATOR)
                    .to_ascii_lowercase(),
            ),
            _ => None,
        }
    }
}

/// Token stream over a source text
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
}

impl<'a> TokenStream<'a> {
    /// The tokenized source text
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Tokens in source order
    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether there are no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Tokenizer configured with a closed set of property names
#[derive(Debug, Clone)]
pub struct Lexer {
    property_pattern: Regex,
}

impl Lexer {
    /// Build a lexer recognizing the given property names
    pub fn new<S: AsRef<str>>(property_names: &[S]) -> Result<Self> {
        let mut names: Vec<&str> = property_names
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ItemsError::Configuration(
                "at least one property name is required".to_string(),
            ));
        }

        // Alternation is leftmost-first, so longer keys must come first.
        names.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
        });
        names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!("^(?i:{}){}", alternation, regex::escape(PROPERTY_TERMINATOR));
        let property_pattern =
            Regex::new(&pattern).map_err(|e| ItemsError::Configuration(e.to_string()))?;

        Ok(Self { property_pattern })
    }

    /// Tokenize raw bytes, rejecting invalid UTF-8
    pub fn tokenize_bytes<'a>(&self, bytes: &'a [u8], scope: &str) -> Result<TokenStream<'a>> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.tokenize(text, scope),
            Err(e) => {
                let valid = e.valid_up_to();
                // The prefix up to `valid` is valid UTF-8 by construction.
                let prefix = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                let (line, column) = line_column(prefix, valid);
                Err(ItemsError::Tokenization {
                    scope: scope.to_string(),
                    line,
                    column,
                    message: "invalid UTF-8 sequence".to_string(),
                })
            }
        }
    }

    /// Tokenize a source text
    pub fn tokenize<'a>(&self, text: &'a str, scope: &str) -> Result<TokenStream<'a>> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut at_line_start = true;

        while offset < text.len() {
            let rest = &text[offset..];

            if at_line_start {
                if let Some(token) = self.separator(rest, offset) {
                    offset += token.text.len();
                    tokens.push(token);
                    at_line_start = false;
                    continue;
                }

                if let Some(found) = self.property_pattern.find(rest) {
                    tokens.push(Token {
                        kind: TokenKind::PropertyName,
                        text: &rest[..found.end()],
                        offset,
                    });
                    offset += found.end();
                    at_line_start = false;
                    continue;
                }
            }

            if let Some(len) = newline_len(rest) {
                tokens.push(Token {
                    kind: TokenKind::NewLine,
                    text: &rest[..len],
                    offset,
                });
                offset += len;
                at_line_start = true;
                continue;
            }

            let end = rest.find(['\r', '\n']).unwrap_or(rest.len());
            if end == 0 {
                // Only a lone carriage return can get here.
                return Err(self.error(text, offset, scope, "unexpected carriage return"));
            }
            let run = &rest[..end];
            if let Some(pos) = run.find('\0') {
                return Err(self.error(text, offset + pos, scope, "unexpected NUL character"));
            }

            tokens.push(Token {
                kind: TokenKind::Content,
                text: run,
                offset,
            });
            offset += end;
            at_line_start = false;
        }

        Ok(TokenStream {
            source: text,
            tokens,
        })
    }

    fn separator<'a>(&self, rest: &'a str, offset: usize) -> Option<Token<'a>> {
        [
            (ITEM_SEPARATOR, TokenKind::ItemSeparator),
            (VERSION_SEPARATOR, TokenKind::VersionSeparator),
            (FIELD_SEPARATOR, TokenKind::FieldSeparator),
        ]
        .into_iter()
        .find(|(marker, _)| rest.starts_with(marker))
        .map(|(marker, kind)| Token {
            kind,
            text: &rest[..marker.len()],
            offset,
        })
    }

    fn error(&self, text: &str, offset: usize, scope: &str, message: &str) -> ItemsError {
        let (line, column) = line_column(text, offset);
        ItemsError::Tokenization {
            scope: scope.to_string(),
            line,
            column,
            message: message.to_string(),
        }
    }
}

fn newline_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    match bytes {
        [b'\r', b'\n', ..] | [b'\n', b'\r', ..] => Some(2),
        [b'\n', ..] => Some(1),
        _ => None,
    }
}
