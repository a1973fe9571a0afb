//! Explicit variable substitution for token text.
//!
//! `${name}` and `$name` are replaced from a caller-supplied [`Variables`] map.
//! `\${name}` and `\$name` produce the literal text without the backslash.
//! A reference to a name missing from the map is an error: expansion never
//! falls back to an empty string or to the process environment.

use std::collections::HashMap;

use crate::token::Token;
use crate::{Error, Result};

/// Name to value mapping used by [`Variables::expand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, returning the map for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Looks up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no variables are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute every unescaped reference in `text`.
    ///
    /// # Errors
    ///
    /// - [`Error::UndefinedVariable`] when a referenced name is not in the map
    /// - [`Error::Parse`] for a `${` without its closing brace or with an
    ///   invalid name
    ///
    /// # Example
    ///
    /// ```
    /// use curlkit_core::Variables;
    ///
    /// let vars = Variables::new().with("host", "example.com");
    /// assert_eq!(vars.expand("https://${host}/$host").unwrap(), "https://example.com/example.com");
    /// assert_eq!(vars.expand(r"\$host").unwrap(), "$host");
    /// assert!(vars.expand("$missing").is_err());
    /// ```
    pub fn expand(&self, text: &str) -> Result<String> {
        if !text.contains('$') {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '\\' if matches!(chars.peek(), Some(&(_, '$'))) => {
                    // Escaped reference: emit `$` and copy the reference verbatim.
                    chars.next();
                    out.push('$');
                    if let Some(&(_, '{')) = chars.peek() {
                        for (_, c) in chars.by_ref() {
                            out.push(c);
                            if c == '}' {
                                break;
                            }
                        }
                    }
                }
                '$' => match chars.peek().copied() {
                    Some((_, '{')) => {
                        chars.next();
                        let mut name = String::new();
                        let mut closed = false;
                        for (_, c) in chars.by_ref() {
                            if c == '}' {
                                closed = true;
                                break;
                            }
                            name.push(c);
                        }
                        if !closed {
                            return Err(Error::parse("unterminated `${`", text, position));
                        }
                        if !is_valid_name(&name) {
                            return Err(Error::parse(
                                format!("invalid variable name `{name}`"),
                                text,
                                position,
                            ));
                        }
                        out.push_str(self.lookup(&name, position)?);
                    }
                    Some((_, next)) if is_name_start(next) => {
                        let mut name = String::new();
                        while let Some(&(_, c)) = chars.peek() {
                            if !is_name_char(c) {
                                break;
                            }
                            name.push(c);
                            chars.next();
                        }
                        out.push_str(self.lookup(&name, position)?);
                    }
                    // `$` not followed by a name is plain text.
                    _ => out.push('$'),
                },
                c => out.push(c),
            }
        }

        Ok(out)
    }

    /// Expand the text of every expandable token (values and URLs, never
    /// flags or literals) in place.
    ///
    /// Error positions are rebased onto the token's position.
    ///
    /// # Errors
    ///
    /// Returns the first expansion failure.
    pub fn expand_tokens(&self, tokens: &mut [Token]) -> Result<()> {
        for token in tokens.iter_mut().filter(|t| t.is_expandable()) {
            let expanded = self.expand(token.raw()).map_err(|err| rebase(err, token))?;
            token.set_raw(expanded);
        }
        Ok(())
    }

    fn lookup(&self, name: &str, position: usize) -> Result<&str> {
        self.get(name).ok_or_else(|| Error::UndefinedVariable {
            name: name.to_string(),
            position,
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn rebase(err: Error, token: &Token) -> Error {
    match err {
        Error::UndefinedVariable { name, position } => Error::UndefinedVariable {
            name,
            position: token.position() + position,
        },
        Error::Parse {
            message,
            snippet,
            position,
        } => Error::Parse {
            message,
            snippet,
            position: token.position() + position,
        },
        other => other,
    }
}

const fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}
