//! Lexical tokens produced by the tokenizer.

use derive_more::Display;

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenKind {
    /// Starts with `-`: an option such as `-H` or `--data`.
    #[display("flag")]
    Flag,
    /// Any other argument.
    #[display("value")]
    Value,
    /// A `scheme://...` argument.
    #[display("url")]
    Url,
    /// An argument after the `--` end-of-options marker; taken verbatim.
    #[display("literal")]
    Literal,
}

/// One lexical unit of a curl command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    raw: String,
    position: usize,
}

impl Token {
    /// Creates a token.
    #[must_use]
    pub fn new(kind: TokenKind, raw: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            raw: raw.into(),
            position,
        }
    }

    /// Creates a token, deriving its kind from the text.
    #[must_use]
    pub fn classify(raw: impl Into<String>, position: usize) -> Self {
        let raw = raw.into();
        let kind = if is_flag(&raw) {
            TokenKind::Flag
        } else if is_url_like(&raw) {
            TokenKind::Url
        } else {
            TokenKind::Value
        };
        Self {
            kind,
            raw,
            position,
        }
    }

    /// Token kind.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Token text after quote removal.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Byte offset in the original input (or argument index for split input).
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Consume into the token text.
    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Returns `true` if this token may be rewritten by variable expansion.
    #[must_use]
    pub const fn is_expandable(&self) -> bool {
        matches!(self.kind, TokenKind::Value | TokenKind::Url)
    }

    pub(crate) fn set_raw(&mut self, raw: String) {
        self.raw = raw;
        if self.kind == TokenKind::Value && is_url_like(&self.raw) {
            self.kind = TokenKind::Url;
        }
    }
}

/// A lone `-` is a value (stdin in curl), not a flag.
fn is_flag(text: &str) -> bool {
    text.len() > 1 && text.starts_with('-')
}

/// Matches `scheme://rest` where scheme is `[A-Za-z][A-Za-z0-9+.-]*`.
#[must_use]
pub fn is_url_like(text: &str) -> bool {
    let Some((scheme, rest)) = text.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}
